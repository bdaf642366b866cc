//! Remote document-store client.
//!
//! Wraps a [`DocumentStore`] (in production, a provider subprocess) behind
//! the minimal contract the sync engine needs: authenticate, load the one
//! document, store the one document, revoke. This layer owns the transfer
//! discipline: concurrent loads collapse onto one network operation,
//! concurrent writes are dropped rather than queued, and successive calls
//! are spaced out to stay under provider rate limits.

pub mod protocol;
pub mod provider;
#[cfg(test)]
pub(crate) mod test_store;

pub use provider::Provider;

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::watch;
use tokio::time::{sleep, timeout};
use tracing::debug;

use crate::dataset::Dataset;
use crate::error::{FailureKind, TaskcalError, TaskcalResult};
use crate::remote::protocol::{
    Authenticate, CreateDocument, DocumentHandle, FindDocument, ReadDocument, Revoke, TokenGrant,
    UpdateDocument,
};

/// Client-side bound on every remote data call; hitting it surfaces as a
/// network-class failure.
const REMOTE_CALL_TIMEOUT: Duration = Duration::from_secs(10);
/// Loads requested closer together than this are a no-op, not an error.
const MIN_LOAD_SPACING: Duration = Duration::from_secs(2);
/// Writes keep at least this gap; enforced by sleeping on the calling path.
const MIN_WRITE_GAP: Duration = Duration::from_millis(500);

const SYNCED_FROM: &str = "taskcal";

/// The document-store contract. `Provider` is the production implementation;
/// tests substitute an in-memory double. Only used as a generic bound, so
/// the auto-trait caveat behind the lint doesn't apply.
#[allow(async_fn_in_trait)]
pub trait DocumentStore {
    async fn authenticate(
        &self,
        client_id: Option<&str>,
        scope: &str,
    ) -> TaskcalResult<TokenGrant>;
    async fn find_document(
        &self,
        credential: &str,
        name: &str,
    ) -> TaskcalResult<Option<DocumentHandle>>;
    async fn read_document(&self, credential: &str, id: &str) -> TaskcalResult<Value>;
    async fn create_document(
        &self,
        credential: &str,
        name: &str,
        content: Value,
    ) -> TaskcalResult<DocumentHandle>;
    async fn update_document(&self, credential: &str, id: &str, content: Value)
    -> TaskcalResult<()>;
    async fn revoke(&self, credential: &str) -> TaskcalResult<()>;
}

impl DocumentStore for Provider {
    async fn authenticate(
        &self,
        client_id: Option<&str>,
        scope: &str,
    ) -> TaskcalResult<TokenGrant> {
        self.call_interactive(Authenticate {
            client_id: client_id.map(str::to_string),
            scope: scope.to_string(),
        })
        .await
    }

    async fn find_document(
        &self,
        credential: &str,
        name: &str,
    ) -> TaskcalResult<Option<DocumentHandle>> {
        self.call(FindDocument {
            credential: credential.to_string(),
            name: name.to_string(),
        })
        .await
    }

    async fn read_document(&self, credential: &str, id: &str) -> TaskcalResult<Value> {
        self.call(ReadDocument {
            credential: credential.to_string(),
            id: id.to_string(),
        })
        .await
    }

    async fn create_document(
        &self,
        credential: &str,
        name: &str,
        content: Value,
    ) -> TaskcalResult<DocumentHandle> {
        self.call(CreateDocument {
            credential: credential.to_string(),
            name: name.to_string(),
            content,
        })
        .await
    }

    async fn update_document(
        &self,
        credential: &str,
        id: &str,
        content: Value,
    ) -> TaskcalResult<()> {
        self.call(UpdateDocument {
            credential: credential.to_string(),
            id: id.to_string(),
            content,
        })
        .await
    }

    async fn revoke(&self, credential: &str) -> TaskcalResult<()> {
        self.call(Revoke {
            credential: credential.to_string(),
        })
        .await
    }
}

/// Outcome of a remote write attempt that didn't fail.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    Stored { at: DateTime<Utc>, version: u32 },
    /// Another write was in flight; this one was dropped, not queued.
    Skipped,
}

/// Result shared with callers that joined an in-flight load. Carries the
/// failure class rather than the error itself so it stays cloneable.
type SharedLoad = Result<Option<Dataset>, FailureKind>;

struct TransferGuards {
    is_loading: bool,
    pending_load: Option<watch::Receiver<Option<SharedLoad>>>,
    last_load_started: Option<Instant>,
    is_saving: bool,
    last_write_finished: Option<Instant>,
    sync_version: u32,
}

pub struct RemoteClient<S> {
    store: S,
    document_name: String,
    // Flags are only checked and set in sections with no await in them;
    // the lock is never held across a suspension point.
    guards: Arc<Mutex<TransferGuards>>,
}

impl<S: DocumentStore> RemoteClient<S> {
    pub fn new(store: S, document_name: &str) -> Self {
        RemoteClient {
            store,
            document_name: document_name.to_string(),
            guards: Arc::new(Mutex::new(TransferGuards {
                is_loading: false,
                pending_load: None,
                last_load_started: None,
                is_saving: false,
                last_write_finished: None,
                sync_version: 0,
            })),
        }
    }

    pub async fn authenticate(
        &self,
        client_id: Option<&str>,
        scope: &str,
    ) -> TaskcalResult<TokenGrant> {
        self.store.authenticate(client_id, scope).await
    }

    pub async fn revoke(&self, credential: &str) -> TaskcalResult<()> {
        bounded(self.store.revoke(credential)).await
    }

    /// Load the remote dataset.
    ///
    /// Concurrent callers collapse onto the single in-flight fetch and all
    /// observe its result. A load requested within the minimum spacing of
    /// the previous one returns `Ok(None)` without touching the network.
    /// `Ok(None)` also means no remote document exists yet.
    pub async fn load_document(&self, credential: &str) -> TaskcalResult<Option<Dataset>> {
        self.load_document_inner(credential, false).await
    }

    /// Load the remote dataset, bypassing the minimum-spacing check. Used by
    /// the recovery path; still collapses with any in-flight load.
    pub async fn load_document_now(&self, credential: &str) -> TaskcalResult<Option<Dataset>> {
        self.load_document_inner(credential, true).await
    }

    async fn load_document_inner(
        &self,
        credential: &str,
        bypass_spacing: bool,
    ) -> TaskcalResult<Option<Dataset>> {
        let publish = {
            let mut guards = self.guards.lock().unwrap();

            if guards.is_loading {
                let pending = guards.pending_load.clone();
                drop(guards);
                return match pending {
                    Some(rx) => join_load(rx).await,
                    None => Ok(None),
                };
            }

            if !bypass_spacing {
                if let Some(started) = guards.last_load_started {
                    if started.elapsed() < MIN_LOAD_SPACING {
                        debug!("remote load requested too soon after the previous one; skipping");
                        return Ok(None);
                    }
                }
            }

            guards.is_loading = true;
            guards.last_load_started = Some(Instant::now());
            let (tx, rx) = watch::channel(None);
            guards.pending_load = Some(rx);
            tx
        };

        let result = self.fetch_document(credential).await;

        {
            let mut guards = self.guards.lock().unwrap();
            guards.is_loading = false;
            guards.pending_load = None;
            if let Ok(Some(dataset)) = &result {
                if let Some(version) = dataset.meta.sync_version {
                    guards.sync_version = guards.sync_version.max(version);
                }
            }
        }

        let shared: SharedLoad = match &result {
            Ok(dataset) => Ok(dataset.clone()),
            Err(e) => Err(e.failure_kind()),
        };
        let _ = publish.send(Some(shared));

        result
    }

    async fn fetch_document(&self, credential: &str) -> TaskcalResult<Option<Dataset>> {
        let handle = bounded(self.store.find_document(credential, &self.document_name)).await?;
        let Some(handle) = handle else {
            debug!(name = %self.document_name, "no remote document exists yet");
            return Ok(None);
        };

        let content = bounded(self.store.read_document(credential, &handle.id)).await?;
        Ok(Some(Dataset::from_remote_value(content)))
    }

    /// Write the dataset to the remote store.
    ///
    /// A write requested while another is in flight is dropped (`Skipped`);
    /// the caller relies on the next natural save. Otherwise the write waits
    /// out the minimum inter-call gap, wraps the dataset with sync metadata,
    /// and searches by name to decide create-vs-update.
    pub async fn store_document(
        &self,
        credential: &str,
        dataset: &Dataset,
    ) -> TaskcalResult<WriteOutcome> {
        let (wait, version) = {
            let mut guards = self.guards.lock().unwrap();
            if guards.is_saving {
                debug!("remote write already in flight; dropping this one");
                return Ok(WriteOutcome::Skipped);
            }
            guards.is_saving = true;
            let wait = guards
                .last_write_finished
                .map(|t| MIN_WRITE_GAP.saturating_sub(t.elapsed()))
                .unwrap_or(Duration::ZERO);
            (wait, guards.sync_version + 1)
        };

        if !wait.is_zero() {
            sleep(wait).await;
        }

        let now = Utc::now();
        let mut payload = dataset.clone();
        payload.meta.last_synced_at = Some(now);
        payload.meta.synced_from = Some(SYNCED_FROM.to_string());
        payload.meta.sync_version = Some(version);
        if payload.meta.local_timestamp.is_none() {
            payload.meta.local_timestamp = Some(now);
        }

        let result = self.push_content(credential, payload.to_value()).await;

        let mut guards = self.guards.lock().unwrap();
        guards.is_saving = false;
        guards.last_write_finished = Some(Instant::now());
        match result {
            Ok(()) => {
                guards.sync_version = version;
                Ok(WriteOutcome::Stored { at: now, version })
            }
            Err(e) => Err(e),
        }
    }

    async fn push_content(&self, credential: &str, content: Value) -> TaskcalResult<()> {
        let handle = bounded(self.store.find_document(credential, &self.document_name)).await?;
        match handle {
            Some(handle) => {
                bounded(self.store.update_document(credential, &handle.id, content)).await
            }
            None => bounded(self.store.create_document(credential, &self.document_name, content))
                .await
                .map(|_| ()),
        }
    }
}

async fn join_load(
    mut rx: watch::Receiver<Option<SharedLoad>>,
) -> TaskcalResult<Option<Dataset>> {
    loop {
        let current = rx.borrow().clone();
        if let Some(result) = current {
            return result.map_err(|kind| kind.into_error("shared remote load failed"));
        }
        if rx.changed().await.is_err() {
            return Err(TaskcalError::Provider("remote load was abandoned".into()));
        }
    }
}

async fn bounded<T>(
    fut: impl std::future::Future<Output = TaskcalResult<T>>,
) -> TaskcalResult<T> {
    match timeout(REMOTE_CALL_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => Err(TaskcalError::Timeout(REMOTE_CALL_TIMEOUT.as_secs())),
    }
}
