//! Cooperative cancellation driven by Ctrl+C.
//!
//! The first interrupt sets the flag and the run stops at the next file or
//! request boundary. A second one exits right away, printing the latest
//! published summary if the run has not printed it yet.

use crate::error::{Error, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::warn;

#[derive(Debug, Default)]
struct Shared {
    cancelled: AtomicBool,
    interrupts: AtomicUsize,
    summary_claimed: AtomicBool,
    summary: Mutex<String>,
}

/// Whether an interrupt was the first one or came on top of another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Interrupt {
    First,
    Repeated,
}

/// Shared flag the run polls between files and between model requests.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<Shared>);

impl CancellationFlag {
    /// Creates an unset flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.cancelled.load(Ordering::SeqCst)
    }

    /// Records one interrupt and requests cancellation.
    pub(crate) fn interrupt(&self) -> Interrupt {
        self.cancel();
        if self.0.interrupts.fetch_add(1, Ordering::SeqCst) == 0 {
            Interrupt::First
        } else {
            Interrupt::Repeated
        }
    }

    /// Stores the summary a forced exit would print.
    pub(crate) fn publish_summary(&self, summary: String) {
        if let Ok(mut slot) = self.0.summary.lock() {
            *slot = summary;
        }
    }

    /// Returns true for exactly one caller, the one that prints the summary.
    pub(crate) fn claim_summary(&self) -> bool {
        self.0
            .summary_claimed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    #[cfg(test)]
    pub(crate) fn published_summary(&self) -> String {
        self.0.summary.lock().unwrap().clone()
    }

    fn print_published_summary(&self) {
        if !self.claim_summary() {
            return;
        }
        if let Ok(summary) = self.0.summary.lock() {
            if !summary.is_empty() {
                println!("{summary}");
            }
        }
    }
}

/// Installs a Ctrl+C handler that sets the returned flag.
///
/// A second Ctrl+C exits the process with status 0 without waiting for the
/// request in flight.
///
/// # Errors
///
/// Returns an error if a handler is already installed for this process.
pub fn install_ctrlc_handler() -> Result<CancellationFlag> {
    let flag = CancellationFlag::new();
    let handler_flag = flag.clone();

    ctrlc::set_handler(move || match handler_flag.interrupt() {
        Interrupt::First => {
            warn!("Interrupt received, stopping after the current step (Ctrl+C again exits now)");
        }
        Interrupt::Repeated => {
            warn!("Second interrupt received, exiting now");
            handler_flag.print_published_summary();
            std::process::exit(0);
        }
    })
    .map_err(|e| Error::config(format!("Failed to install Ctrl+C handler: {e}")))?;

    Ok(flag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_is_shared_between_clones() {
        let flag = CancellationFlag::new();
        let other = flag.clone();
        assert!(!other.is_cancelled());

        flag.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn test_second_interrupt_is_repeated() {
        let flag = CancellationFlag::new();

        assert_eq!(flag.interrupt(), Interrupt::First);
        assert!(flag.is_cancelled());
        assert_eq!(flag.clone().interrupt(), Interrupt::Repeated);
        assert_eq!(flag.interrupt(), Interrupt::Repeated);
    }

    #[test]
    fn test_programmatic_cancel_is_not_an_interrupt() {
        let flag = CancellationFlag::new();
        flag.cancel();

        assert_eq!(flag.interrupt(), Interrupt::First);
    }

    #[test]
    fn test_summary_claimed_once() {
        let flag = CancellationFlag::new();
        let other = flag.clone();
        flag.publish_summary("Processed 2 files".to_string());

        assert!(other.claim_summary());
        assert!(!flag.claim_summary());
        assert_eq!(flag.published_summary(), "Processed 2 files");
    }
}
