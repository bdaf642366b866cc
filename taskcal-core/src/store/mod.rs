//! Local persistence: a small synchronous key-value contract and the two
//! fixed keys taskcal owns on top of it (the dataset and credential state).

mod credentials;
mod kv;
mod local;

pub use credentials::{CREDENTIALS_KEY, CredentialState, CredentialStore};
pub use kv::{FileKv, KeyValue, MemoryKv};
pub use local::{DATA_KEY, LocalStore};
