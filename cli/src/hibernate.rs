use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

use crate::render;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Countdown {
    Suspended,
    Cancelled,
    /// The suspend command failed; the session carries on.
    Failed,
}

/// Count down, then run `suspend`. `cancel` resolving first skips the suspend.
pub async fn countdown<C, S>(duration: Duration, cancel: C, suspend: S) -> Result<Countdown>
where
    C: Future<Output = ()>,
    S: Future<Output = std::io::Result<()>>,
{
    let secs = duration.as_secs();
    println!("\nPress Ctrl+C to cancel hibernation...");

    let pb = ProgressBar::new(secs);
    pb.set_style(ProgressStyle::with_template("Hibernating in {msg} seconds... {wide_bar}")?);

    let ticker = async {
        for remaining in (1..=secs).rev() {
            pb.set_message(remaining.to_string());
            tokio::time::sleep(Duration::from_secs(1)).await;
            pb.inc(1);
        }
    };

    let elapsed = tokio::select! {
        _ = ticker => true,
        _ = cancel => false,
    };

    if !elapsed {
        pb.abandon();
        println!("\nHibernate cancelled.");
        info!("hibernate cancelled by user");
        return Ok(Countdown::Cancelled);
    }

    pb.finish_and_clear();
    println!("Hibernating now...");
    match suspend.await {
        Ok(()) => Ok(Countdown::Suspended),
        Err(e) => {
            warn!("hibernate failed: {}", e);
            println!("{}", render::error(&format!("Failed to hibernate: {e}")));
            Ok(Countdown::Failed)
        }
    }
}
