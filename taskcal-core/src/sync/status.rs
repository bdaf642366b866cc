//! User-facing sync status types.

use std::fmt;

use chrono::{DateTime, Utc};

/// State of the remote-load half of the sync state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemoteLoadState {
    #[default]
    NeverAttempted,
    Loading,
    Success,
    Failed,
    NetworkError,
    AuthError,
}

/// User-facing connection status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Syncing,
    Error,
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            SyncStatus::Disconnected => "disconnected",
            SyncStatus::Connecting => "connecting",
            SyncStatus::Connected => "connected",
            SyncStatus::Syncing => "syncing",
            SyncStatus::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// Everything `get_sync_status` exposes to callers.
#[derive(Debug, Clone)]
pub struct SyncStatusReport {
    pub sync_enabled: bool,
    pub status: SyncStatus,
    pub last_sync_time: Option<DateTime<Utc>>,
    pub load_state: RemoteLoadState,
    pub failure_count: u32,
    pub retry_eligible: bool,
    pub retry_after: Option<DateTime<Utc>>,
    pub message: String,
}

/// Derive the human-readable status line. Pure function of the state.
pub(crate) fn status_message(
    sync_enabled: bool,
    status: SyncStatus,
    load_state: RemoteLoadState,
    retries_blocked: bool,
) -> String {
    if !sync_enabled {
        return "Local storage only".to_string();
    }

    match status {
        SyncStatus::Disconnected => "Local storage only".to_string(),
        SyncStatus::Connecting => "Connecting...".to_string(),
        SyncStatus::Syncing => "Syncing...".to_string(),
        SyncStatus::Connected => "Synced".to_string(),
        SyncStatus::Error => match load_state {
            RemoteLoadState::AuthError => {
                "Sign-in required - using local storage".to_string()
            }
            _ if retries_blocked => {
                "Sync paused after repeated failures - using local storage".to_string()
            }
            RemoteLoadState::NetworkError => {
                "Network problem - using local storage, will retry".to_string()
            }
            _ => "Sync error - using local storage".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_sync_always_reads_local_only() {
        let msg = status_message(false, SyncStatus::Error, RemoteLoadState::AuthError, true);
        assert_eq!(msg, "Local storage only");
    }

    #[test]
    fn error_messages_distinguish_auth_network_and_exhaustion() {
        let auth = status_message(true, SyncStatus::Error, RemoteLoadState::AuthError, false);
        assert!(auth.contains("Sign-in required"));

        let network =
            status_message(true, SyncStatus::Error, RemoteLoadState::NetworkError, false);
        assert!(network.contains("Network problem"));

        let blocked =
            status_message(true, SyncStatus::Error, RemoteLoadState::NetworkError, true);
        assert!(blocked.contains("paused"));
    }
}
