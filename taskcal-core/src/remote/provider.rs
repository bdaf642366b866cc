//! Provider subprocess transport.
//!
//! This module handles communication with external document-store provider
//! binaries (e.g., `taskcal-provider-gdrive`) using JSON over stdin/stdout.
//!
//! The protocol is designed to be language-agnostic: any executable that
//! speaks the JSON protocol can be a provider. Providers own their API
//! specifics and the interactive part of sign-in; taskcal passes the bearer
//! credential with each request.

use crate::error::{TaskcalError, TaskcalResult};
use crate::remote::protocol::{Command, ErrorClass, ProviderCommand, Request, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;

const PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);
/// Generous timeout for authenticate, which involves user interaction.
const AUTH_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Provider(String);

impl Provider {
    pub fn from_name(name: &str) -> Self {
        Provider(name.to_string())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    fn binary_path(&self) -> TaskcalResult<std::path::PathBuf> {
        let binary_name = format!("taskcal-provider-{}", self.0);
        let binary_path = which::which(&binary_name).map_err(|_| {
            TaskcalError::ProviderNotInstalled(format!(
                "Provider '{}' not found. Install it with:\n  cargo install {}",
                self.0, binary_name
            ))
        })?;
        Ok(binary_path)
    }

    /// Call a typed provider command and return the result.
    ///
    /// The response type is inferred from the command's associated type. A
    /// hung provider surfaces as a timeout, which callers treat as a network
    /// failure.
    pub async fn call<C: ProviderCommand>(&self, cmd: C) -> TaskcalResult<C::Response> {
        timeout(PROVIDER_TIMEOUT, self.call_raw(C::command(), cmd))
            .await
            .map_err(|_| TaskcalError::Timeout(PROVIDER_TIMEOUT.as_secs()))?
    }

    /// Call a typed provider command with the long auth timeout.
    pub async fn call_interactive<C: ProviderCommand>(&self, cmd: C) -> TaskcalResult<C::Response> {
        timeout(AUTH_TIMEOUT, self.call_raw(C::command(), cmd))
            .await
            .map_err(|_| TaskcalError::Timeout(AUTH_TIMEOUT.as_secs()))?
    }

    /// Low-level call that sends a command with params and deserializes the
    /// response.
    async fn call_raw<P: Serialize, R: serde::de::DeserializeOwned>(
        &self,
        command: Command,
        params: P,
    ) -> TaskcalResult<R> {
        let params = serde_json::to_value(params)
            .map_err(|e| TaskcalError::Serialization(e.to_string()))?;
        let request = Request { command, params };
        let request_json = serde_json::to_string(&request)
            .map_err(|e| TaskcalError::Serialization(e.to_string()))?;

        let binary_path = self.binary_path()?;

        let mut child = TokioCommand::new(&binary_path)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::inherit())
            .spawn()
            .map_err(|e| {
                TaskcalError::Provider(format!("Failed to spawn {}: {}", binary_path.display(), e))
            })?;

        // Write request to stdin (unwrap safe: we piped stdin above)
        let mut stdin = child.stdin.take().unwrap();
        stdin
            .write_all(format!("{request_json}\n").as_bytes())
            .await?;
        drop(stdin);

        // Wait for process and collect output
        let output = child.wait_with_output().await?;

        if !output.status.success() {
            return Err(TaskcalError::Provider(format!(
                "Provider exited with status: {}",
                output.status.code().unwrap_or(-1)
            )));
        }

        let response_str = String::from_utf8_lossy(&output.stdout);
        if response_str.is_empty() {
            return Err(TaskcalError::Provider(
                "Provider returned no response".into(),
            ));
        }

        let response: Response<R> = serde_json::from_str(&response_str)
            .map_err(|e| TaskcalError::Provider(format!("Failed to parse response: {}", e)))?;

        match response {
            Response::Success { data } => Ok(data),
            Response::Error { error, kind } => Err(match kind {
                ErrorClass::Auth => TaskcalError::Auth(error),
                ErrorClass::Network => TaskcalError::Network(error),
                ErrorClass::Generic => TaskcalError::Provider(error),
            }),
        }
    }
}
