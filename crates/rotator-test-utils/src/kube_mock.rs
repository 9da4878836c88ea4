//! Mock Kubernetes API server for end-to-end rotation tests
//!
//! Provides `KubeApiMock`, a wiremock server that keeps one Secret in memory
//! and answers GET, POST and strategic-merge PATCH the way the API server
//! does for the subset of behavior the rotator relies on.

use crate::fixtures::{TEST_NAMESPACE, TEST_SECRET};
use base64::{engine::general_purpose::STANDARD, Engine};
use common::secret::SecretString;
use jwks_rotator::store::kube::KubeSecretStore;
use jwks_rotator::store::SecretData;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const TEST_SA_TOKEN: &str = "test-service-account-token";

const STRATEGIC_MERGE_PATCH: &str = "application/strategic-merge-patch+json";

fn collection_path() -> String {
    format!("/api/v1/namespaces/{}/secrets", TEST_NAMESPACE)
}

fn secret_path() -> String {
    format!("{}/{}", collection_path(), TEST_SECRET)
}

fn status_body(code: u16, reason: &str, message: &str) -> Value {
    json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "reason": reason,
        "message": message,
        "code": code,
    })
}

#[derive(Default)]
struct ApiState {
    secret: Option<BTreeMap<String, String>>,
    requests: Vec<String>,
}

impl ApiState {
    fn secret_object(&self) -> Value {
        let data: serde_json::Map<String, Value> = self
            .secret
            .iter()
            .flatten()
            .map(|(k, v)| (k.clone(), Value::String(STANDARD.encode(v))))
            .collect();
        json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "metadata": {"name": TEST_SECRET, "namespace": TEST_NAMESPACE},
            "type": "Opaque",
            "data": data,
        })
    }
}

fn string_data(request: &Request) -> Option<BTreeMap<String, String>> {
    let body: Value = serde_json::from_slice(&request.body).ok()?;
    let fields = body.get("stringData")?.as_object()?;
    fields
        .iter()
        .map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
        .collect()
}

/// Stateful responder shared by every route of the mock
#[derive(Clone)]
struct SecretApi(Arc<Mutex<ApiState>>);

impl Respond for SecretApi {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let mut state = self.0.lock().unwrap();
        let verb = request.method.as_str().to_string();
        state.requests.push(verb.clone());

        match verb.as_str() {
            "GET" => match state.secret {
                Some(_) => ResponseTemplate::new(200).set_body_json(state.secret_object()),
                None => ResponseTemplate::new(404).set_body_json(status_body(
                    404,
                    "NotFound",
                    &format!("secrets \"{}\" not found", TEST_SECRET),
                )),
            },
            "POST" => {
                if state.secret.is_some() {
                    return ResponseTemplate::new(409).set_body_json(status_body(
                        409,
                        "AlreadyExists",
                        &format!("secrets \"{}\" already exists", TEST_SECRET),
                    ));
                }
                let Some(fields) = string_data(request) else {
                    return ResponseTemplate::new(400)
                        .set_body_json(status_body(400, "BadRequest", "invalid stringData"));
                };
                state.secret = Some(fields);
                ResponseTemplate::new(201).set_body_json(state.secret_object())
            }
            "PATCH" => {
                let content_type = request
                    .headers
                    .get("content-type")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default();
                if content_type != STRATEGIC_MERGE_PATCH {
                    return ResponseTemplate::new(415).set_body_json(status_body(
                        415,
                        "UnsupportedMediaType",
                        &format!("unsupported patch type {}", content_type),
                    ));
                }
                let Some(fields) = string_data(request) else {
                    return ResponseTemplate::new(400)
                        .set_body_json(status_body(400, "BadRequest", "invalid stringData"));
                };
                match state.secret.as_mut() {
                    Some(existing) => {
                        existing.extend(fields);
                        let body = state.secret_object();
                        ResponseTemplate::new(200).set_body_json(body)
                    }
                    None => ResponseTemplate::new(404).set_body_json(status_body(
                        404,
                        "NotFound",
                        &format!("secrets \"{}\" not found", TEST_SECRET),
                    )),
                }
            }
            other => ResponseTemplate::new(405).set_body_json(status_body(
                405,
                "MethodNotAllowed",
                &format!("{} not supported", other),
            )),
        }
    }
}

/// In-memory Kubernetes Secret API for `TEST_NAMESPACE`/`TEST_SECRET`
///
/// # Example
/// ```rust,ignore
/// let api = KubeApiMock::start().await;
/// let rotator = Rotator::new(config, Arc::new(api.store()), clock);
/// rotator.rotate().await?;
/// assert_eq!(api.requests(), vec!["GET", "POST", "PATCH"]);
/// ```
pub struct KubeApiMock {
    server: MockServer,
    state: Arc<Mutex<ApiState>>,
}

impl KubeApiMock {
    /// Start a server with no Secret present
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let state = Arc::new(Mutex::new(ApiState::default()));
        let api = SecretApi(state.clone());

        Mock::given(method("GET"))
            .and(path(secret_path()))
            .respond_with(api.clone())
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path(secret_path()))
            .respond_with(api.clone())
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(collection_path()))
            .respond_with(api)
            .mount(&server)
            .await;

        Self { server, state }
    }

    /// Start a server already holding `data`
    pub async fn with_secret(data: &SecretData) -> Self {
        let mock = Self::start().await;
        mock.state.lock().unwrap().secret = Some(
            data.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        mock
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Store client pointed at this server
    pub fn store(&self) -> KubeSecretStore {
        KubeSecretStore::new(
            self.uri(),
            SecretString::from(TEST_SA_TOKEN),
            reqwest::Client::new(),
        )
    }

    /// Current Secret contents, decoded
    pub fn secret_data(&self) -> Option<SecretData> {
        self.state.lock().unwrap().secret.as_ref().map(|fields| {
            fields
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        })
    }

    /// HTTP verbs received so far, in order
    pub fn requests(&self) -> Vec<String> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Answer every PATCH with `status` and a Status body carrying `message`
    pub async fn fail_patches(&self, status: u16, reason: &str, message: &str) {
        Mock::given(method("PATCH"))
            .and(path(secret_path()))
            .respond_with(
                ResponseTemplate::new(status).set_body_json(status_body(status, reason, message)),
            )
            .with_priority(1)
            .mount(&self.server)
            .await;
    }

    /// Answer every GET with `status` and a Status body carrying `message`
    pub async fn fail_gets(&self, status: u16, reason: &str, message: &str) {
        Mock::given(method("GET"))
            .and(path(secret_path()))
            .respond_with(
                ResponseTemplate::new(status).set_body_json(status_body(status, reason, message)),
            )
            .with_priority(1)
            .mount(&self.server)
            .await;
    }
}
