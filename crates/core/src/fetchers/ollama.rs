use anyhow::{Context, Result};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{FetchOutcome, Fetcher};
use crate::inventory::LocalInventory;
use crate::models::CompositeKey;

pub const DEFAULT_PROGRAM: &str = "ollama";

/// Drives the `ollama` command line: `pull` to fetch, `show` to describe,
/// `list` for the local inventory.
#[derive(Debug, Clone)]
pub struct OllamaCli {
    program: String,
}

impl OllamaCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    async fn capture(&self, args: &[&str]) -> Result<String> {
        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| format!("Failed to run `{} {}`", self.program, args.join(" ")))?;

        if !output.status.success() {
            anyhow::bail!(
                "`{} {}` exited with {}: {}",
                self.program,
                args.join(" "),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Models already available locally. Failures only cost the annotation.
    pub async fn inventory(&self) -> LocalInventory {
        match self.capture(&["list"]).await {
            Ok(stdout) => LocalInventory::parse(&stdout),
            Err(e) => {
                warn!("Could not list local models: {:#}", e);
                LocalInventory::default()
            }
        }
    }
}

impl Default for OllamaCli {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}

#[async_trait]
impl Fetcher for OllamaCli {
    async fn fetch(&self, key: &CompositeKey) -> FetchOutcome {
        let key = key.to_string();
        // Progress output goes straight to the terminal.
        let status = Command::new(&self.program)
            .args(["pull", key.as_str()])
            .stdin(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => FetchOutcome::Success,
            Ok(status) => {
                debug!(model = %key, %status, "pull failed");
                FetchOutcome::Failure
            }
            Err(e) => {
                warn!(model = %key, "Failed to run {} pull: {}", self.program, e);
                FetchOutcome::Failure
            }
        }
    }

    async fn describe(&self, key: &CompositeKey) -> Result<String> {
        self.capture(&["show", &key.to_string()]).await
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_program_is_a_failure_not_an_error() {
        let cli = OllamaCli::new("modelpull-test-no-such-program");
        let key = CompositeKey::new("llama3", "8b");
        assert_eq!(cli.fetch(&key).await, FetchOutcome::Failure);
        assert!(cli.describe(&key).await.is_err());
        assert!(cli.inventory().await.is_empty());
    }

    #[tokio::test]
    async fn exit_status_maps_to_outcome() {
        let key = CompositeKey::new("llama3", "8b");
        assert_eq!(OllamaCli::new("true").fetch(&key).await, FetchOutcome::Success);
        assert_eq!(OllamaCli::new("false").fetch(&key).await, FetchOutcome::Failure);
    }

    #[tokio::test]
    async fn describe_captures_stdout() {
        // `echo show llama3:8b` stands in for the real tool.
        let details = OllamaCli::new("echo")
            .describe(&CompositeKey::new("llama3", "8b"))
            .await
            .unwrap();
        assert_eq!(details.trim(), "show llama3:8b");
    }
}
