//! Batch fetch queue with retry, requeue and connectivity handling.
//!
//! One item is in flight at a time. The front item is only popped once it
//! succeeds (or is abandoned); item-level failures are retried in place until
//! the retry threshold, after which the item moves to the back of the queue so
//! the rest of the batch can make progress. Every failure counts once. When the
//! network is down at that point the scheduler blocks until connectivity comes
//! back, without counting again, then backs off and retries or requeues as
//! usual.
//!
//! With no `max_total_attempts` configured, an item that keeps failing is
//! requeued forever.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::fetchers::{ConnectivityProbe, FetchOutcome, Fetcher};
use crate::models::CompositeKey;

pub const DEFAULT_RETRY_THRESHOLD: u32 = 3;
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(10);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Failures after which an item moves to the back of the queue.
    pub retry_threshold: u32,
    /// Pause after every item-level failure.
    pub backoff: Duration,
    /// Interval between connectivity polls while offline.
    pub poll_interval: Duration,
    /// Charged failures after which an item is dropped from the batch.
    pub max_total_attempts: Option<u32>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            retry_threshold: DEFAULT_RETRY_THRESHOLD,
            backoff: DEFAULT_BACKOFF,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_total_attempts: None,
        }
    }
}

/// Pending items plus the failure count of each.
#[derive(Debug, Default)]
pub struct FetchQueue {
    items: VecDeque<CompositeKey>,
    retries: HashMap<CompositeKey, u32>,
    total: usize,
}

impl FetchQueue {
    /// Build a queue, dropping repeated keys.
    pub fn new(keys: impl IntoIterator<Item = CompositeKey>) -> Self {
        let mut seen = HashSet::new();
        let items: VecDeque<_> = keys.into_iter().filter(|k| seen.insert(k.clone())).collect();
        let total = items.len();
        Self {
            items,
            retries: HashMap::new(),
            total,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn remaining(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn front(&self) -> Option<&CompositeKey> {
        self.items.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompositeKey> {
        self.items.iter()
    }

    pub fn retry_count(&self, key: &CompositeKey) -> Option<u32> {
        self.retries.get(key).copied()
    }

    /// 1-based position of the front item within the batch.
    pub fn current(&self) -> usize {
        self.total - self.items.len() + 1
    }

    fn charge(&mut self, key: &CompositeKey) -> u32 {
        let count = self.retries.entry(key.clone()).or_insert(0);
        *count += 1;
        *count
    }

    fn finish_front(&mut self) -> Option<CompositeKey> {
        let key = self.items.pop_front()?;
        self.retries.remove(&key);
        Some(key)
    }

    fn requeue_front(&mut self) {
        if let Some(key) = self.items.pop_front() {
            self.items.push_back(key);
        }
    }
}

/// Progress notifications, in the order they happen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchEvent {
    Started {
        key: CompositeKey,
        current: usize,
        total: usize,
        attempt: u32,
    },
    Succeeded {
        key: CompositeKey,
        attempts: u32,
        details: Option<String>,
    },
    Failed {
        key: CompositeKey,
        failures: u32,
    },
    ConnectivityLost {
        key: CompositeKey,
    },
    ConnectivityRestored {
        polls: u32,
    },
    Retrying {
        key: CompositeKey,
        delay: Duration,
    },
    Requeued {
        key: CompositeKey,
        delay: Duration,
    },
    Abandoned {
        key: CompositeKey,
        failures: u32,
    },
}

pub trait FetchObserver {
    fn on_event(&mut self, event: &FetchEvent);
}

impl<F: FnMut(&FetchEvent)> FetchObserver for F {
    fn on_event(&mut self, event: &FetchEvent) {
        self(event)
    }
}

/// Outcome of a finished batch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub succeeded: Vec<CompositeKey>,
    pub abandoned: Vec<CompositeKey>,
    /// Fetch invocations per item, including ones lost to connectivity.
    pub attempts: HashMap<CompositeKey, u32>,
}

impl BatchReport {
    pub fn attempts_for(&self, key: &CompositeKey) -> u32 {
        self.attempts.get(key).copied().unwrap_or(0)
    }
}

pub struct FetchScheduler<'a> {
    fetcher: &'a dyn Fetcher,
    probe: &'a dyn ConnectivityProbe,
    config: SchedulerConfig,
}

impl<'a> FetchScheduler<'a> {
    pub fn new(
        fetcher: &'a dyn Fetcher,
        probe: &'a dyn ConnectivityProbe,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            fetcher,
            probe,
            config,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Drain the queue. Returns once every item has succeeded or been
    /// abandoned.
    pub async fn run(
        &self,
        queue: &mut FetchQueue,
        observer: &mut dyn FetchObserver,
    ) -> BatchReport {
        let mut report = BatchReport::default();
        info!(total = queue.total(), "starting batch");

        while let Some(key) = queue.front().cloned() {
            let attempt = queue.retry_count(&key).unwrap_or(0) + 1;
            observer.on_event(&FetchEvent::Started {
                key: key.clone(),
                current: queue.current(),
                total: queue.total(),
                attempt,
            });

            let calls = report.attempts.entry(key.clone()).or_insert(0);
            *calls += 1;
            let calls = *calls;

            match self.fetcher.fetch(&key).await {
                FetchOutcome::Success => {
                    queue.finish_front();
                    info!(model = %key, attempts = calls, "fetch succeeded");

                    let details = match self.fetcher.describe(&key).await {
                        Ok(details) => Some(details),
                        Err(e) => {
                            warn!(model = %key, "Failed to show model details: {:#}", e);
                            None
                        }
                    };
                    observer.on_event(&FetchEvent::Succeeded {
                        key: key.clone(),
                        attempts: calls,
                        details,
                    });
                    report.succeeded.push(key);
                }
                FetchOutcome::Failure => {
                    let failures = queue.charge(&key);
                    debug!(model = %key, failures, "fetch failed");
                    observer.on_event(&FetchEvent::Failed {
                        key: key.clone(),
                        failures,
                    });

                    // Blocked time is not charged again; one failure is one count.
                    if !self.probe.is_online().await {
                        observer.on_event(&FetchEvent::ConnectivityLost { key: key.clone() });
                        let polls = self.wait_for_connectivity().await;
                        observer.on_event(&FetchEvent::ConnectivityRestored { polls });
                    }

                    self.handle_item_failure(queue, key, failures, observer, &mut report)
                        .await;
                }
            }
        }

        info!(
            succeeded = report.succeeded.len(),
            abandoned = report.abandoned.len(),
            "batch finished"
        );
        report
    }

    async fn handle_item_failure(
        &self,
        queue: &mut FetchQueue,
        key: CompositeKey,
        failures: u32,
        observer: &mut dyn FetchObserver,
        report: &mut BatchReport,
    ) {
        if let Some(max) = self.config.max_total_attempts {
            if failures >= max {
                queue.finish_front();
                warn!(model = %key, failures, "giving up on model");
                observer.on_event(&FetchEvent::Abandoned {
                    key: key.clone(),
                    failures,
                });
                report.abandoned.push(key);
                return;
            }
        }

        let delay = self.config.backoff;
        if failures < self.config.retry_threshold {
            observer.on_event(&FetchEvent::Retrying { key, delay });
        } else {
            queue.requeue_front();
            observer.on_event(&FetchEvent::Requeued { key, delay });
        }
        tokio::time::sleep(delay).await;
    }

    /// Block until the probe reports the network is back. Returns how many
    /// polls that took.
    async fn wait_for_connectivity(&self) -> u32 {
        warn!("Network appears to be down, waiting for it to come back");
        let mut polls = 0;
        loop {
            tokio::time::sleep(self.config.poll_interval).await;
            polls += 1;
            if self.probe.is_online().await {
                info!(polls, "network is back");
                return polls;
            }
        }
    }
}
