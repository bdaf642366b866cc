//! Defines the JSON protocol used for communication between taskcal and
//! document-store provider binaries over stdin/stdout.
//!
//! Providers wrap a third-party document API (e.g. a drive). They own the
//! interactive sign-in flow; taskcal holds only the resulting bearer
//! credential and passes it back on every call.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use chrono::{DateTime, Utc};

pub trait ProviderCommand: Serialize {
    type Response: DeserializeOwned;
    fn command() -> Command;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Authenticate,
    FindDocument,
    ReadDocument,
    CreateDocument,
    UpdateDocument,
    Revoke,
}

/// Request sent from taskcal to the provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Request {
    pub command: Command,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Failure class a provider can attach to an error so the caller can pick
/// the right retry policy. Anything missing or unknown reads as `Generic`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    Auth,
    Network,
    #[default]
    #[serde(other)]
    Generic,
}

/// Response sent from the provider to taskcal.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response<T> {
    Success {
        data: T,
    },
    Error {
        error: String,
        #[serde(default)]
        kind: ErrorClass,
    },
}

impl<T: Serialize> Response<T> {
    pub fn success(data: T) -> String {
        serde_json::to_string(&Response::Success { data }).unwrap()
    }
}

impl Response<()> {
    pub fn error(msg: &str, kind: ErrorClass) -> String {
        serde_json::to_string(&Response::<()>::Error {
            error: msg.to_string(),
            kind,
        })
        .unwrap()
    }
}

/// Run the provider's sign-in flow and return a bearer credential.
#[derive(Debug, Serialize, Deserialize)]
pub struct Authenticate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    pub scope: String,
}

/// A granted credential. `expires_in` (seconds) is used when the provider
/// doesn't report an absolute expiry; with neither, the caller assumes the
/// conventional one-hour token lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
}

impl TokenGrant {
    pub fn expiry(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.expires_at
            .unwrap_or_else(|| now + chrono::Duration::seconds(self.expires_in.unwrap_or(3600)))
    }
}

impl ProviderCommand for Authenticate {
    type Response = TokenGrant;
    fn command() -> Command {
        Command::Authenticate
    }
}

/// Handle of a document that exists in the remote store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentHandle {
    pub id: String,
}

/// Look up a document by its fixed name.
#[derive(Debug, Serialize, Deserialize)]
pub struct FindDocument {
    pub credential: String,
    pub name: String,
}

impl ProviderCommand for FindDocument {
    type Response = Option<DocumentHandle>;
    fn command() -> Command {
        Command::FindDocument
    }
}

/// Fetch a document's JSON content.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReadDocument {
    pub credential: String,
    pub id: String,
}

impl ProviderCommand for ReadDocument {
    type Response = serde_json::Value;
    fn command() -> Command {
        Command::ReadDocument
    }
}

/// Create a new named document.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateDocument {
    pub credential: String,
    pub name: String,
    pub content: serde_json::Value,
}

impl ProviderCommand for CreateDocument {
    type Response = DocumentHandle;
    fn command() -> Command {
        Command::CreateDocument
    }
}

/// Replace an existing document's content.
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateDocument {
    pub credential: String,
    pub id: String,
    pub content: serde_json::Value,
}

impl ProviderCommand for UpdateDocument {
    type Response = ();
    fn command() -> Command {
        Command::UpdateDocument
    }
}

/// Invalidate a credential on the provider side.
#[derive(Debug, Serialize, Deserialize)]
pub struct Revoke {
    pub credential: String,
}

impl ProviderCommand for Revoke {
    type Response = ();
    fn command() -> Command {
        Command::Revoke
    }
}
