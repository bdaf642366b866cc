//! The sync orchestrator: sequences local and remote reads/writes and owns
//! the never-break-local policy.
//!
//! Local storage is synchronous and authoritative. The remote store is
//! advisory: every remote failure is classified, recorded for backoff,
//! logged, and swallowed here — callers always get a dataset built from
//! whatever sources succeeded.

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::dataset::Dataset;
use crate::error::{FailureKind, TaskcalResult};
use crate::merge::merge_datasets;
use crate::remote::{DocumentStore, RemoteClient, WriteOutcome};
use crate::store::{CredentialState, CredentialStore, KeyValue, LocalStore};
use crate::sync::coordinator::SyncCoordinator;
use crate::sync::status::{SyncStatus, SyncStatusReport};

/// What happened to the remote half of a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteWriteStatus {
    /// Sync disabled or signed out; nothing was attempted.
    Disabled,
    Stored,
    /// Another write was in flight; this one was dropped.
    Skipped,
    /// The write failed; local data is still safe.
    Failed,
}

/// Result of `save_data`. The local write already succeeded when this is
/// returned; the remote half never fails the save.
#[derive(Debug, Clone)]
pub struct SaveReport {
    pub stored_at: chrono::DateTime<Utc>,
    pub remote: RemoteWriteStatus,
}

pub struct Orchestrator<S: DocumentStore, K: KeyValue> {
    local: LocalStore<K>,
    credentials: CredentialStore<K>,
    remote: RemoteClient<S>,
    coordinator: SyncCoordinator,
    client_id: Option<String>,
    scope: String,
}

impl<S: DocumentStore, K: KeyValue> Orchestrator<S, K> {
    /// Build an orchestrator over one key-value space and one document
    /// store, restoring any persisted sign-in state (expired credentials
    /// were already discarded by the credential store).
    pub fn new(
        kv: K,
        store: S,
        document_name: &str,
        client_id: Option<String>,
        scope: String,
    ) -> TaskcalResult<Self> {
        let credentials = CredentialStore::new(kv.clone());
        let restored = credentials.load()?;
        let coordinator =
            SyncCoordinator::restore(restored.is_valid(Utc::now()), restored.last_sync_time);

        Ok(Orchestrator {
            local: LocalStore::new(kv),
            credentials,
            remote: RemoteClient::new(store, document_name),
            coordinator,
            client_id,
            scope,
        })
    }

    /// Load the dataset.
    ///
    /// With sync disabled (or signed out) this is just the local read. With
    /// sync enabled, a remote load is attempted only when the state machine
    /// allows one; on success the remote copy is merged with local data and
    /// the merged result is persisted and returned. Remote failure falls
    /// back to local data and never surfaces to the caller.
    pub async fn load_data(&self) -> TaskcalResult<Dataset> {
        let local = self.read_local()?;

        let creds = self.credentials.load()?;
        if !self.coordinator.sync_enabled() {
            return Ok(local.unwrap_or_default());
        }
        if !creds.is_valid(Utc::now()) {
            debug!("sync enabled but signed out; serving local data");
            self.coordinator.mark_auth_required();
            return Ok(local.unwrap_or_default());
        }

        if !self.coordinator.begin_remote_load(Utc::now()) {
            return Ok(local.unwrap_or_default());
        }

        self.coordinator.set_status(SyncStatus::Syncing);
        self.merge_remote_into(local, &creds, false).await
    }

    /// Save the dataset: local write first (synchronous, authoritative; its
    /// failure propagates), then a best-effort remote write that can only
    /// affect the status, never the save.
    pub async fn save_data(&self, dataset: &Dataset) -> TaskcalResult<SaveReport> {
        let stored_at = self.local.write(dataset)?;

        let creds = self.credentials.load().unwrap_or_default();
        if !self.coordinator.sync_enabled() || !creds.is_valid(Utc::now()) {
            return Ok(SaveReport {
                stored_at,
                remote: RemoteWriteStatus::Disabled,
            });
        }

        let credential = creds.credential.as_deref().unwrap_or_default();
        let remote = match self.remote.store_document(credential, dataset).await {
            Ok(WriteOutcome::Stored { at, version }) => {
                debug!(version, "remote write stored");
                self.coordinator.set_status(SyncStatus::Connected);
                self.coordinator.note_sync_time(at);
                RemoteWriteStatus::Stored
            }
            Ok(WriteOutcome::Skipped) => RemoteWriteStatus::Skipped,
            Err(e) => {
                warn!(error = %e, "remote write failed; local save already succeeded");
                self.coordinator.set_status(SyncStatus::Error);
                RemoteWriteStatus::Failed
            }
        };

        Ok(SaveReport { stored_at, remote })
    }

    /// Turn sync on: acquire a credential through the document store's
    /// sign-in flow, persist it, and run one reconciliation pass (remote
    /// load, merge, local persist, remote write-back) before reporting
    /// `Connected`.
    pub async fn enable_sync(&self) -> TaskcalResult<SyncStatusReport> {
        self.coordinator.set_enabled(true);
        self.coordinator.set_status(SyncStatus::Connecting);

        let grant = match self
            .remote
            .authenticate(self.client_id.as_deref(), &self.scope)
            .await
        {
            Ok(grant) => grant,
            Err(e) => {
                warn!(error = %e, "sign-in failed; sync stays off");
                self.coordinator.set_enabled(false);
                return Err(e);
            }
        };

        let now = Utc::now();
        let creds = CredentialState::signed_in(grant.access_token.clone(), grant.expiry(now));
        self.credentials.save(&creds)?;

        self.coordinator.reset();
        self.coordinator.set_status(SyncStatus::Syncing);

        let local = self.read_local()?;
        let merged = self.merge_remote_into(local, &creds, true).await?;

        // Write the reconciled dataset back so both sides converge; failure
        // here only affects status, the merged data is already safe locally.
        let credential = creds.credential.as_deref().unwrap_or_default();
        if let Err(e) = self.remote.store_document(credential, &merged).await {
            warn!(error = %e, "initial write-back failed");
            self.coordinator.set_status(SyncStatus::Error);
        }

        info!("sync enabled");
        Ok(self.get_sync_status())
    }

    /// Turn sync off: revoke the credential (best-effort), clear persisted
    /// credential state, and disable.
    pub async fn disable_sync(&self) -> TaskcalResult<()> {
        let creds = self.credentials.load().unwrap_or_default();
        if let Some(credential) = creds.credential.as_deref() {
            if let Err(e) = self.remote.revoke(credential).await {
                warn!(error = %e, "revoke failed; clearing local state anyway");
            }
        }

        self.credentials.clear()?;
        self.coordinator.set_enabled(false);
        self.coordinator.reset();
        info!("sync disabled");
        Ok(())
    }

    pub fn get_sync_status(&self) -> SyncStatusReport {
        self.coordinator.snapshot(Utc::now())
    }

    /// Clear the failure counter and load state so the next load attempts
    /// the remote again.
    pub fn reset_sync_state(&self) {
        self.coordinator.reset();
    }

    /// Manual retry: reset the failure state and load immediately, ignoring
    /// the minimum load spacing.
    pub async fn force_sync_retry(&self) -> TaskcalResult<Dataset> {
        self.coordinator.reset();

        let local = self.read_local()?;
        let creds = self.credentials.load()?;
        if !self.coordinator.sync_enabled() || !creds.is_valid(Utc::now()) {
            return Ok(local.unwrap_or_default());
        }
        if !self.coordinator.begin_remote_load(Utc::now()) {
            return Ok(local.unwrap_or_default());
        }

        self.coordinator.set_status(SyncStatus::Syncing);
        self.merge_remote_into(local, &creds, true).await
    }

    /// Recovery for stalled sync: force a fresh remote load bypassing the
    /// spacing and backoff machinery, merge with current local data, and
    /// persist the result.
    pub async fn emergency_recovery(&self) -> TaskcalResult<Dataset> {
        info!("emergency recovery: forcing a fresh remote load");
        self.coordinator.reset();
        self.coordinator.set_status(SyncStatus::Syncing);

        let local = self.read_local()?;
        let creds = self.credentials.load()?;
        if !creds.is_valid(Utc::now()) {
            self.coordinator.mark_auth_required();
            return Ok(local.unwrap_or_default());
        }

        self.merge_remote_into(local, &creds, true).await
    }

    /// Read local data, treating corruption as "no usable local data" (the
    /// log line is the only difference from a first run).
    fn read_local(&self) -> TaskcalResult<Option<Dataset>> {
        match self.local.read() {
            Ok(found) => Ok(found),
            Err(crate::error::TaskcalError::CorruptData(e)) => {
                warn!(error = %e, "local dataset is corrupt; starting from empty");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Fetch the remote document, merge it with local data, persist and
    /// return the result. Remote failure is recorded and falls back to
    /// local data.
    async fn merge_remote_into(
        &self,
        local: Option<Dataset>,
        creds: &CredentialState,
        force: bool,
    ) -> TaskcalResult<Dataset> {
        let credential = creds.credential.as_deref().unwrap_or_default();
        let fetched = if force {
            self.remote.load_document_now(credential).await
        } else {
            self.remote.load_document(credential).await
        };

        match fetched {
            Ok(Some(remote)) => {
                let now = Utc::now();
                let merged = merge_datasets(&local.unwrap_or_default(), &remote, now);
                if let Some(info) = &merged.meta.merge_info {
                    debug!(
                        local = info.local_task_count,
                        remote = info.remote_task_count,
                        merged = info.final_task_count,
                        added = info.tasks_added,
                        updated = info.tasks_updated,
                        blocked = info.cross_week_blocks,
                        "merged remote dataset"
                    );
                }
                if let Err(e) = self.local.write(&merged) {
                    warn!(error = %e, "could not cache merged dataset locally");
                }
                self.coordinator.record_load_success(now);
                self.persist_sync_time(creds, now);
                Ok(merged)
            }
            Ok(None) => {
                // Nothing remote yet (or the load was throttled to a no-op);
                // local data stands.
                self.coordinator.record_load_success(Utc::now());
                Ok(local.unwrap_or_default())
            }
            Err(e) => {
                warn!(error = %e, "remote load failed; falling back to local data");
                self.coordinator.record_load_failure(e.failure_kind(), Utc::now());
                if e.failure_kind() == FailureKind::Auth {
                    debug!("remote rejected the credential; re-auth required");
                }
                Ok(local.unwrap_or_default())
            }
        }
    }

    fn persist_sync_time(&self, creds: &CredentialState, at: chrono::DateTime<Utc>) {
        let mut updated = creds.clone();
        updated.last_sync_time = Some(at);
        if let Err(e) = self.credentials.save(&updated) {
            warn!(error = %e, "could not persist last sync time");
        }
    }
}
