//! Core engine for taskcal.
//!
//! This crate provides everything below the UI:
//! - the task model and the raw→validated input boundary
//! - local persistence of the day-keyed dataset
//! - the remote document-store client (provider subprocess protocol)
//! - the merge engine reconciling local and remote datasets
//! - the sync orchestrator and its state machine

pub mod config;
pub mod dataset;
pub mod date;
pub mod error;
pub mod merge;
pub mod remote;
pub mod store;
pub mod sync;
pub mod task;

pub use config::TaskcalConfig;
pub use dataset::{Dataset, MergeInfo, SyncMeta};
pub use date::DateKey;
pub use error::{FailureKind, TaskcalError, TaskcalResult};
pub use task::{Completion, Step, StepStatus, Task, TaskKind};
