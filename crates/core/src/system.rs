//! Host-level collaborators: network reachability and system suspend.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

use crate::fetchers::ConnectivityProbe;

pub const DEFAULT_PROBE_URL: &str = "https://ollama.com";

/// Reachability check by HTTP request against a fixed host. Any response,
/// whatever its status, counts as online.
pub struct HttpProbe {
    client: Client,
    url: String,
}

impl HttpProbe {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl ConnectivityProbe for HttpProbe {
    async fn is_online(&self) -> bool {
        match self.client.head(&self.url).send().await {
            Ok(_) => true,
            Err(e) => {
                debug!(url = %self.url, "connectivity probe failed: {}", e);
                false
            }
        }
    }
}

/// Put the machine into hibernation.
pub async fn hibernate() -> std::io::Result<()> {
    let mut command = if cfg!(windows) {
        let mut c = tokio::process::Command::new("shutdown");
        c.arg("/h");
        c
    } else {
        let mut c = tokio::process::Command::new("systemctl");
        c.arg("hibernate");
        c
    };

    info!("Hibernating now");
    let status = command.status().await?;
    if !status.success() {
        return Err(std::io::Error::other(format!(
            "hibernate command exited with {}",
            status
        )));
    }
    Ok(())
}
