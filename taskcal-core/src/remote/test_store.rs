//! In-memory [`DocumentStore`] double for unit tests, with failure
//! injection, artificial latency and call counting.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;

use crate::error::{FailureKind, TaskcalResult};
use crate::remote::DocumentStore;
use crate::remote::protocol::{DocumentHandle, TokenGrant};

const DOC_ID: &str = "doc-1";

#[derive(Default)]
struct State {
    document: Option<Value>,
    fail_with: Option<FailureKind>,
    read_delay: Duration,
    write_delay: Duration,
    find_calls: usize,
    read_calls: usize,
    create_calls: usize,
    update_calls: usize,
    revoke_calls: usize,
    auth_calls: usize,
}

#[derive(Clone, Default)]
pub(crate) struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_document(document: Value) -> Self {
        let store = Self::default();
        store.state.lock().unwrap().document = Some(document);
        store
    }

    pub(crate) fn set_document(&self, document: Value) {
        self.state.lock().unwrap().document = Some(document);
    }

    pub(crate) fn fail_with(&self, kind: FailureKind) {
        self.state.lock().unwrap().fail_with = Some(kind);
    }

    pub(crate) fn clear_failure(&self) {
        self.state.lock().unwrap().fail_with = None;
    }

    pub(crate) fn set_read_delay(&self, delay: Duration) {
        self.state.lock().unwrap().read_delay = delay;
    }

    pub(crate) fn set_write_delay(&self, delay: Duration) {
        self.state.lock().unwrap().write_delay = delay;
    }

    pub(crate) fn document(&self) -> Option<Value> {
        self.state.lock().unwrap().document.clone()
    }

    pub(crate) fn find_calls(&self) -> usize {
        self.state.lock().unwrap().find_calls
    }

    pub(crate) fn create_calls(&self) -> usize {
        self.state.lock().unwrap().create_calls
    }

    pub(crate) fn update_calls(&self) -> usize {
        self.state.lock().unwrap().update_calls
    }

    pub(crate) fn revoke_calls(&self) -> usize {
        self.state.lock().unwrap().revoke_calls
    }

    pub(crate) fn auth_calls(&self) -> usize {
        self.state.lock().unwrap().auth_calls
    }

    fn check_failure(&self) -> TaskcalResult<()> {
        let kind = self.state.lock().unwrap().fail_with;
        match kind {
            Some(kind) => Err(kind.into_error("injected failure")),
            None => Ok(()),
        }
    }

    async fn delay(&self, read: bool) {
        let delay = {
            let state = self.state.lock().unwrap();
            if read { state.read_delay } else { state.write_delay }
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

impl DocumentStore for MemoryStore {
    async fn authenticate(
        &self,
        _client_id: Option<&str>,
        _scope: &str,
    ) -> TaskcalResult<TokenGrant> {
        self.state.lock().unwrap().auth_calls += 1;
        self.check_failure()?;
        Ok(TokenGrant {
            access_token: "test-token".to_string(),
            expires_at: None,
            expires_in: Some(3600),
        })
    }

    async fn find_document(
        &self,
        _credential: &str,
        _name: &str,
    ) -> TaskcalResult<Option<DocumentHandle>> {
        self.state.lock().unwrap().find_calls += 1;
        self.delay(true).await;
        self.check_failure()?;
        let exists = self.state.lock().unwrap().document.is_some();
        Ok(exists.then(|| DocumentHandle {
            id: DOC_ID.to_string(),
        }))
    }

    async fn read_document(&self, _credential: &str, _id: &str) -> TaskcalResult<Value> {
        self.state.lock().unwrap().read_calls += 1;
        self.delay(true).await;
        self.check_failure()?;
        self.state
            .lock()
            .unwrap()
            .document
            .clone()
            .ok_or_else(|| crate::error::TaskcalError::Provider("no such document".into()))
    }

    async fn create_document(
        &self,
        _credential: &str,
        _name: &str,
        content: Value,
    ) -> TaskcalResult<DocumentHandle> {
        self.state.lock().unwrap().create_calls += 1;
        self.delay(false).await;
        self.check_failure()?;
        self.state.lock().unwrap().document = Some(content);
        Ok(DocumentHandle {
            id: DOC_ID.to_string(),
        })
    }

    async fn update_document(
        &self,
        _credential: &str,
        _id: &str,
        content: Value,
    ) -> TaskcalResult<()> {
        self.state.lock().unwrap().update_calls += 1;
        self.delay(false).await;
        self.check_failure()?;
        self.state.lock().unwrap().document = Some(content);
        Ok(())
    }

    async fn revoke(&self, _credential: &str) -> TaskcalResult<()> {
        self.state.lock().unwrap().revoke_calls += 1;
        self.check_failure()?;
        Ok(())
    }
}
