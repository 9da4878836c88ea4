//! Kubernetes Secret adapter for the [`SecretStore`] capability.
//!
//! Talks to the API server's core/v1 Secret endpoints with `reqwest`,
//! authenticating with the pod's service-account token.
//!
//! # Wire format
//!
//! - Reads decode the base64 `data` map of the Secret object.
//! - Writes send plain strings through `stringData`, which the API server
//!   encodes itself.
//! - Patches use `application/strategic-merge-patch+json`, so only the
//!   fields named in the patch change.
//!
//! Non-2xx responses become [`StoreError::Api`] carrying the status code, the
//! `message` from the Kubernetes `Status` object and the raw body.

use super::{SecretData, SecretStore, StoreError};
use base64::{engine::general_purpose, Engine as _};
use common::secret::{ExposeSecret, SecretString};
use reqwest::{header::CONTENT_TYPE, StatusCode};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::env;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, instrument, trace, warn};

/// Mount point of the pod's service-account credentials.
pub const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

/// Default HTTP request timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

const STRATEGIC_MERGE_PATCH: &str = "application/strategic-merge-patch+json";

/// Subset of a core/v1 Secret the adapter reads.
#[derive(Debug, Deserialize)]
struct SecretObject {
    #[serde(default)]
    data: Option<BTreeMap<String, String>>,
}

/// Subset of a meta/v1 Status returned on failures.
#[derive(Debug, Deserialize)]
struct KubeStatus {
    #[serde(default)]
    message: Option<String>,
}

/// Secret store backed by the Kubernetes API server.
pub struct KubeSecretStore {
    http_client: reqwest::Client,
    api_server: String,
    token: SecretString,
}

impl std::fmt::Debug for KubeSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeSecretStore")
            .field("api_server", &self.api_server)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl KubeSecretStore {
    /// Create a store for an explicit API server URL and bearer token.
    pub fn new(api_server: impl Into<String>, token: SecretString, http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            api_server: api_server.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Create a store from the in-cluster environment and service-account mount.
    pub fn in_cluster() -> Result<Self, StoreError> {
        Self::in_cluster_from(&env::vars().collect(), Path::new(SERVICE_ACCOUNT_DIR))
    }

    /// Create a store from the given variables and service-account directory
    /// (for testing).
    pub fn in_cluster_from(
        vars: &HashMap<String, String>,
        service_account_dir: &Path,
    ) -> Result<Self, StoreError> {
        let host = vars
            .get("KUBERNETES_SERVICE_HOST")
            .filter(|h| !h.is_empty())
            .ok_or_else(|| {
                StoreError::Configuration(
                    "KUBERNETES_SERVICE_HOST is not set; not running in a cluster?".to_string(),
                )
            })?;
        let port = vars
            .get("KUBERNETES_SERVICE_PORT")
            .map(String::as_str)
            .unwrap_or("443");

        // IPv6 service hosts need brackets in a URL
        let api_server = if host.contains(':') {
            format!("https://[{}]:{}", host, port)
        } else {
            format!("https://{}:{}", host, port)
        };

        let token_path = service_account_dir.join("token");
        let token = std::fs::read_to_string(&token_path).map_err(|e| {
            StoreError::Configuration(format!(
                "Failed to read service account token {}: {}",
                token_path.display(),
                e
            ))
        })?;

        let ca_path = service_account_dir.join("ca.crt");
        let ca_pem = std::fs::read(&ca_path).map_err(|e| {
            StoreError::Configuration(format!(
                "Failed to read cluster CA {}: {}",
                ca_path.display(),
                e
            ))
        })?;
        let ca = reqwest::Certificate::from_pem(&ca_pem)
            .map_err(|e| StoreError::Configuration(format!("Invalid cluster CA: {}", e)))?;

        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .add_root_certificate(ca)
            .build()
            .map_err(|e| {
                StoreError::Configuration(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self::new(
            api_server,
            SecretString::from(token.trim().to_string()),
            http_client,
        ))
    }

    fn collection_url(&self, namespace: &str) -> String {
        format!("{}/api/v1/namespaces/{}/secrets", self.api_server, namespace)
    }

    fn secret_url(&self, namespace: &str, name: &str) -> String {
        format!("{}/{}", self.collection_url(namespace), name)
    }

    /// Read a Secret; `Ok(None)` on 404.
    #[instrument(skip_all, fields(namespace = %namespace, secret = %name))]
    pub async fn get_secret(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<SecretData>, StoreError> {
        let url = self.secret_url(namespace, name);
        debug!(target: "rotator.store.kube", url = %url, "Reading secret");

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(self.token.expose_secret())
            .send()
            .await
            .map_err(connection_error)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(target: "rotator.store.kube", "Secret not found");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(api_error(response).await);
        }

        let secret: SecretObject = response.json().await.map_err(|e| {
            warn!(target: "rotator.store.kube", error = %e, "Failed to parse secret");
            StoreError::InvalidResponse(e.to_string())
        })?;

        decode_data(secret.data.unwrap_or_default()).map(Some)
    }

    /// Create an Opaque Secret holding `data`.
    #[instrument(skip_all, fields(namespace = %namespace, secret = %name))]
    pub async fn create_secret(
        &self,
        namespace: &str,
        name: &str,
        data: SecretData,
    ) -> Result<SecretData, StoreError> {
        let url = self.collection_url(namespace);
        debug!(
            target: "rotator.store.kube",
            url = %url,
            fields = ?data.field_names(),
            "Creating secret"
        );

        let body = serde_json::json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "metadata": {
                "name": name,
                "namespace": namespace,
            },
            "type": "Opaque",
            "stringData": string_data(&data),
        });

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(self.token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(connection_error)?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let secret: SecretObject = response.json().await.map_err(|e| {
            warn!(target: "rotator.store.kube", error = %e, "Failed to parse created secret");
            StoreError::InvalidResponse(e.to_string())
        })?;

        decode_data(secret.data.unwrap_or_default())
    }

    /// Strategic-merge-patch the given fields into an existing Secret.
    #[instrument(skip_all, fields(namespace = %namespace, secret = %name))]
    pub async fn patch_secret(
        &self,
        namespace: &str,
        name: &str,
        fields: SecretData,
    ) -> Result<(), StoreError> {
        let url = self.secret_url(namespace, name);
        debug!(
            target: "rotator.store.kube",
            url = %url,
            fields = ?fields.field_names(),
            "Patching secret"
        );

        let body = serde_json::json!({ "stringData": string_data(&fields) });

        let response = self
            .http_client
            .patch(&url)
            .bearer_auth(self.token.expose_secret())
            .header(CONTENT_TYPE, STRATEGIC_MERGE_PATCH)
            .body(body.to_string())
            .send()
            .await
            .map_err(connection_error)?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl SecretStore for KubeSecretStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<SecretData>, StoreError> {
        self.get_secret(namespace, name).await
    }

    async fn create(
        &self,
        namespace: &str,
        name: &str,
        data: SecretData,
    ) -> Result<SecretData, StoreError> {
        self.create_secret(namespace, name, data).await
    }

    async fn patch(
        &self,
        namespace: &str,
        name: &str,
        fields: SecretData,
    ) -> Result<(), StoreError> {
        self.patch_secret(namespace, name, fields).await
    }
}

fn string_data(data: &SecretData) -> serde_json::Map<String, serde_json::Value> {
    data.iter()
        .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
        .collect()
}

fn decode_data(data: BTreeMap<String, String>) -> Result<SecretData, StoreError> {
    data.into_iter()
        .map(|(field, encoded)| {
            let bytes = general_purpose::STANDARD.decode(&encoded).map_err(|e| {
                StoreError::InvalidResponse(format!("Field {} is not valid base64: {}", field, e))
            })?;
            // Non-UTF-8 bytes cannot be JSON; the loader reports them as malformed
            let value = String::from_utf8_lossy(&bytes).into_owned();
            Ok((field, value))
        })
        .collect()
}

fn connection_error(e: reqwest::Error) -> StoreError {
    debug!(target: "rotator.store.kube", error = %e, "HTTP request failed");
    StoreError::Connection(e.to_string())
}

async fn api_error(response: reqwest::Response) -> StoreError {
    let status = response.status();
    let body = response.text().await.unwrap_or_else(|e| {
        trace!(target: "rotator.store.kube", error = %e, "Failed to read error response body");
        String::new()
    });

    let message = serde_json::from_str::<KubeStatus>(&body)
        .ok()
        .and_then(|s| s.message)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown status")
                .to_string()
        });

    warn!(
        target: "rotator.store.kube",
        status = %status,
        message = %message,
        "API server rejected request"
    );

    StoreError::Api {
        status: status.as_u16(),
        message,
        body,
    }
}
