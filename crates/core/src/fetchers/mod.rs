pub mod ollama;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::CompositeKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Success,
    Failure,
}

/// Fetches one item at a time. The outcome is opaque: the scheduler decides
/// whether a failure belongs to the item or to the network.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, key: &CompositeKey) -> FetchOutcome;

    /// Informational details shown after a successful fetch.
    async fn describe(&self, key: &CompositeKey) -> Result<String>;
}

/// Network reachability. Implementations must swallow every error and
/// report `false` instead.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn is_online(&self) -> bool;
}

pub use ollama::OllamaCli;
