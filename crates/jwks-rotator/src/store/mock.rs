//! In-memory secret store for testing.
//!
//! Behaves like the Kubernetes adapter (create fails on an existing record,
//! patch fails on a missing one) and counts every call so tests can assert
//! how many requests a rotation cycle issued.

use super::{SecretData, SecretStore, StoreError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

type SecretKey = (String, String);

/// Mock secret store backed by a `HashMap`.
#[derive(Default)]
pub struct InMemorySecretStore {
    secrets: Mutex<HashMap<SecretKey, SecretData>>,
    get_calls: AtomicUsize,
    create_calls: AtomicUsize,
    patch_calls: AtomicUsize,
    get_error: Mutex<Option<StoreError>>,
    create_error: Mutex<Option<StoreError>>,
    patch_error: Mutex<Option<StoreError>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn key(namespace: &str, name: &str) -> SecretKey {
    (namespace.to_string(), name.to_string())
}

fn not_found(name: &str) -> StoreError {
    StoreError::Api {
        status: 404,
        message: format!("secrets \"{}\" not found", name),
        body: format!(
            r#"{{"kind":"Status","status":"Failure","reason":"NotFound","code":404,"message":"secrets \"{}\" not found"}}"#,
            name
        ),
    }
}

fn already_exists(name: &str) -> StoreError {
    StoreError::Api {
        status: 409,
        message: format!("secrets \"{}\" already exists", name),
        body: format!(
            r#"{{"kind":"Status","status":"Failure","reason":"AlreadyExists","code":409,"message":"secrets \"{}\" already exists"}}"#,
            name
        ),
    }
}

impl InMemorySecretStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with one secret.
    pub fn with_secret(namespace: &str, name: &str, data: SecretData) -> Self {
        let store = Self::new();
        store.insert(namespace, name, data);
        store
    }

    /// Insert or replace a secret without counting it as a call.
    pub fn insert(&self, namespace: &str, name: &str, data: SecretData) {
        lock(&self.secrets).insert(key(namespace, name), data);
    }

    /// Current contents of a secret, bypassing call counting.
    pub fn snapshot(&self, namespace: &str, name: &str) -> Option<SecretData> {
        lock(&self.secrets).get(&key(namespace, name)).cloned()
    }

    /// Make every subsequent `get` fail with `error`.
    pub fn fail_get_with(&self, error: StoreError) {
        *lock(&self.get_error) = Some(error);
    }

    /// Make every subsequent `create` fail with `error`.
    pub fn fail_create_with(&self, error: StoreError) {
        *lock(&self.create_error) = Some(error);
    }

    /// Make every subsequent `patch` fail with `error`.
    pub fn fail_patch_with(&self, error: StoreError) {
        *lock(&self.patch_error) = Some(error);
    }

    /// Stop injecting failures.
    pub fn clear_failures(&self) {
        *lock(&self.get_error) = None;
        *lock(&self.create_error) = None;
        *lock(&self.patch_error) = None;
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn patch_calls(&self) -> usize {
        self.patch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SecretStore for InMemorySecretStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<SecretData>, StoreError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(err) = lock(&self.get_error).clone() {
            return Err(err);
        }

        Ok(self.snapshot(namespace, name))
    }

    async fn create(
        &self,
        namespace: &str,
        name: &str,
        data: SecretData,
    ) -> Result<SecretData, StoreError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(err) = lock(&self.create_error).clone() {
            return Err(err);
        }

        let mut secrets = lock(&self.secrets);
        let k = key(namespace, name);
        if secrets.contains_key(&k) {
            return Err(already_exists(name));
        }
        secrets.insert(k, data.clone());
        Ok(data)
    }

    async fn patch(
        &self,
        namespace: &str,
        name: &str,
        fields: SecretData,
    ) -> Result<(), StoreError> {
        self.patch_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(err) = lock(&self.patch_error).clone() {
            return Err(err);
        }

        let mut secrets = lock(&self.secrets);
        match secrets.get_mut(&key(namespace, name)) {
            Some(existing) => {
                existing.merge(fields);
                Ok(())
            }
            None => Err(not_found(name)),
        }
    }
}
