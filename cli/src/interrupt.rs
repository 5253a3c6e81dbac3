//! Ctrl+C handling.
//!
//! Once a signal listener is registered SIGINT no longer ends the process on
//! its own, so a single listener owns the signal for the whole session: it
//! cancels a running hibernate countdown, and otherwise exits.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;

type Waiter = Option<oneshot::Sender<()>>;

#[derive(Clone, Default)]
pub struct Interrupts {
    waiter: Arc<Mutex<Waiter>>,
}

impl Interrupts {
    pub fn install() -> Self {
        let interrupts = Self::default();

        let listener = interrupts.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if !listener.deliver() {
                    eprintln!();
                    std::process::exit(130);
                }
            }
        });

        interrupts
    }

    /// Route the next Ctrl+C to the returned future instead of exiting.
    ///
    /// Each call gets its own channel, so a signal meant for an earlier
    /// countdown can never resolve a later one.
    pub fn arm(&self) -> impl Future<Output = ()> + Send + 'static {
        let (tx, rx) = oneshot::channel();
        *self.waiter() = Some(tx);
        async move {
            if rx.await.is_err() {
                // Disarmed without a signal.
                std::future::pending::<()>().await;
            }
        }
    }

    /// Drop the current waiter; Ctrl+C exits again.
    pub fn disarm(&self) {
        self.waiter().take();
    }

    /// Hand one Ctrl+C to the armed waiter. `false` if nobody is listening.
    fn deliver(&self) -> bool {
        match self.waiter().take() {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }

    fn waiter(&self) -> MutexGuard<'_, Waiter> {
        self.waiter.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
