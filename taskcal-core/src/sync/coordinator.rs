//! Process-wide sync state behind one owned, injectable object.
//!
//! The original design here is a set of module-global flags; this struct is
//! the same state made explicit so it can be constructed per process and
//! unit-tested. The mutex is never held across an await: flags are only
//! checked and set in sections with no suspension point in them.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use crate::error::FailureKind;
use crate::sync::status::{RemoteLoadState, SyncStatus, SyncStatusReport, status_message};

/// After this many consecutive remote-load failures, automatic retries stop
/// until a manual reset.
pub const MAX_AUTO_RETRY_FAILURES: u32 = 5;

const BASE_RETRY_DELAY_SECS: i64 = 30;
const MAX_RETRY_DELAY_SECS: i64 = 600;

#[derive(Default)]
struct CoordinatorState {
    sync_enabled: bool,
    status: SyncStatus,
    load_state: RemoteLoadState,
    failure_count: u32,
    retry_after: Option<DateTime<Utc>>,
    last_sync_time: Option<DateTime<Utc>>,
}

impl CoordinatorState {
    fn cooldown_elapsed(&self, now: DateTime<Utc>) -> bool {
        self.retry_after.is_none_or(|t| now >= t)
    }

    fn retries_blocked(&self) -> bool {
        self.failure_count >= MAX_AUTO_RETRY_FAILURES
            || self.load_state == RemoteLoadState::AuthError
    }
}

#[derive(Default)]
pub struct SyncCoordinator {
    state: Mutex<CoordinatorState>,
}

impl SyncCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild session state from persisted credentials at startup.
    pub fn restore(sync_enabled: bool, last_sync_time: Option<DateTime<Utc>>) -> Self {
        SyncCoordinator {
            state: Mutex::new(CoordinatorState {
                sync_enabled,
                status: if sync_enabled {
                    SyncStatus::Connected
                } else {
                    SyncStatus::Disconnected
                },
                last_sync_time,
                ..Default::default()
            }),
        }
    }

    pub fn sync_enabled(&self) -> bool {
        self.state.lock().unwrap().sync_enabled
    }

    pub fn set_enabled(&self, enabled: bool) {
        let mut state = self.state.lock().unwrap();
        state.sync_enabled = enabled;
        if !enabled {
            state.status = SyncStatus::Disconnected;
        }
    }

    pub fn set_status(&self, status: SyncStatus) {
        self.state.lock().unwrap().status = status;
    }

    pub fn note_sync_time(&self, at: DateTime<Utc>) {
        self.state.lock().unwrap().last_sync_time = Some(at);
    }

    /// Decide whether a remote load may start now, flipping to `Loading` if
    /// so. A load is attempted from `NeverAttempted`, or from a failed state
    /// once the retry cooldown has elapsed and the failure cap hasn't been
    /// hit. Auth failures block until a new sign-in resets the state.
    pub fn begin_remote_load(&self, now: DateTime<Utc>) -> bool {
        let mut state = self.state.lock().unwrap();
        let allowed = match state.load_state {
            RemoteLoadState::NeverAttempted => true,
            RemoteLoadState::Failed | RemoteLoadState::NetworkError => {
                state.failure_count < MAX_AUTO_RETRY_FAILURES && state.cooldown_elapsed(now)
            }
            RemoteLoadState::Loading
            | RemoteLoadState::Success
            | RemoteLoadState::AuthError => false,
        };
        if allowed {
            state.load_state = RemoteLoadState::Loading;
        }
        allowed
    }

    pub fn record_load_success(&self, now: DateTime<Utc>) {
        let mut state = self.state.lock().unwrap();
        state.load_state = RemoteLoadState::Success;
        state.failure_count = 0;
        state.retry_after = None;
        state.status = SyncStatus::Connected;
        state.last_sync_time = Some(now);
    }

    /// Record a failed remote load: bump the counter, schedule the next
    /// retry with exponential backoff capped at ten minutes, and surface the
    /// failure class in the load state.
    pub fn record_load_failure(&self, kind: FailureKind, now: DateTime<Utc>) {
        let mut state = self.state.lock().unwrap();
        state.failure_count += 1;

        let exponent = (state.failure_count - 1).min(10);
        let delay = (BASE_RETRY_DELAY_SECS << exponent).min(MAX_RETRY_DELAY_SECS);
        state.retry_after = Some(now + Duration::seconds(delay));

        state.load_state = match kind {
            FailureKind::Auth => RemoteLoadState::AuthError,
            FailureKind::Network => RemoteLoadState::NetworkError,
            FailureKind::Generic => RemoteLoadState::Failed,
        };
        state.status = SyncStatus::Error;
    }

    /// Flag that remote access needs a fresh sign-in, without counting it as
    /// a retry-able failure.
    pub fn mark_auth_required(&self) {
        let mut state = self.state.lock().unwrap();
        state.load_state = RemoteLoadState::AuthError;
        state.status = SyncStatus::Error;
    }

    /// Manual reset: clear the failure counter and return the load state to
    /// `NeverAttempted` so the next load attempts the remote again.
    pub fn reset(&self) {
        let mut state = self.state.lock().unwrap();
        state.failure_count = 0;
        state.retry_after = None;
        state.load_state = RemoteLoadState::NeverAttempted;
        if state.status == SyncStatus::Error {
            state.status = if state.sync_enabled {
                SyncStatus::Connected
            } else {
                SyncStatus::Disconnected
            };
        }
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> SyncStatusReport {
        let state = self.state.lock().unwrap();
        let retry_eligible = matches!(
            state.load_state,
            RemoteLoadState::Failed | RemoteLoadState::NetworkError
        ) && !state.retries_blocked()
            && state.cooldown_elapsed(now);

        SyncStatusReport {
            sync_enabled: state.sync_enabled,
            status: state.status,
            last_sync_time: state.last_sync_time,
            load_state: state.load_state,
            failure_count: state.failure_count,
            retry_eligible,
            retry_after: state.retry_after,
            message: status_message(
                state.sync_enabled,
                state.status,
                state.load_state,
                state.retries_blocked(),
            ),
        }
    }
}
