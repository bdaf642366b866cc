//! Persisted credential state for the remote document store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::TaskcalResult;
use crate::store::kv::KeyValue;

/// The fixed key holding serialized credential state, next to the dataset
/// in the same key-space.
pub const CREDENTIALS_KEY: &str = "taskcal-credentials";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CredentialState {
    pub signed_in: bool,
    pub credential: Option<String>,
    pub expiry: Option<DateTime<Utc>>,
    pub last_sync_time: Option<DateTime<Utc>>,
}

impl CredentialState {
    pub fn signed_in(credential: String, expiry: DateTime<Utc>) -> Self {
        CredentialState {
            signed_in: true,
            credential: Some(credential),
            expiry: Some(expiry),
            last_sync_time: None,
        }
    }

    /// Usable for remote calls right now.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.signed_in
            && self.credential.is_some()
            && self.expiry.is_some_and(|e| e > now)
    }
}

#[derive(Clone)]
pub struct CredentialStore<K: KeyValue> {
    kv: K,
}

impl<K: KeyValue> CredentialStore<K> {
    pub fn new(kv: K) -> Self {
        CredentialStore { kv }
    }

    /// Restore persisted credential state. Missing or unreadable state reads
    /// as signed-out; an expired credential is discarded and also reads as
    /// signed-out.
    pub fn load(&self) -> TaskcalResult<CredentialState> {
        let Some(text) = self.kv.get(CREDENTIALS_KEY)? else {
            return Ok(CredentialState::default());
        };

        let state: CredentialState = match serde_json::from_str(&text) {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "credential state is unreadable; treating as signed out");
                return Ok(CredentialState::default());
            }
        };

        if state.signed_in && !state.is_valid(Utc::now()) {
            debug!("stored credential is expired; discarding");
            self.kv.remove(CREDENTIALS_KEY)?;
            return Ok(CredentialState::default());
        }

        Ok(state)
    }

    pub fn save(&self, state: &CredentialState) -> TaskcalResult<()> {
        let text = serde_json::to_string(state)
            .map_err(|e| crate::error::TaskcalError::Serialization(e.to_string()))?;
        self.kv.set(CREDENTIALS_KEY, &text)
    }

    pub fn clear(&self) -> TaskcalResult<()> {
        self.kv.remove(CREDENTIALS_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::kv::MemoryKv;
    use chrono::Duration;

    #[test]
    fn roundtrips_signed_in_state() {
        let store = CredentialStore::new(MemoryKv::new());
        let state =
            CredentialState::signed_in("token-abc".to_string(), Utc::now() + Duration::hours(1));
        store.save(&state).unwrap();

        let restored = store.load().unwrap();
        assert!(restored.signed_in);
        assert_eq!(restored.credential.as_deref(), Some("token-abc"));
        assert!(restored.is_valid(Utc::now()));
    }

    #[test]
    fn expired_credentials_read_as_signed_out() {
        let kv = MemoryKv::new();
        let store = CredentialStore::new(kv.clone());
        let state =
            CredentialState::signed_in("stale".to_string(), Utc::now() - Duration::minutes(1));
        store.save(&state).unwrap();

        let restored = store.load().unwrap();
        assert!(!restored.signed_in);
        assert_eq!(
            kv.get(CREDENTIALS_KEY).unwrap(),
            None,
            "expired state is discarded, not kept around"
        );
    }

    #[test]
    fn garbage_state_reads_as_signed_out() {
        let kv = MemoryKv::new();
        kv.set(CREDENTIALS_KEY, "###").unwrap();
        let store = CredentialStore::new(kv);
        assert!(!store.load().unwrap().signed_in);
    }
}
