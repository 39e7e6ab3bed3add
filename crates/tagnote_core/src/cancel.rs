//! Cooperative cancellation for service operations.
//!
//! # Responsibility
//! - Provide a clonable, thread-safe flag callers can trip to abandon work.
//! - Give services a single checkpoint primitive between storage phases.
//!
//! # Invariants
//! - Cancellation is observed only at checkpoints; a storage transaction
//!   that has started is never interrupted and either commits or rolls back
//!   as a whole.
//! - Once tripped, a token never resets.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag handed to every service operation.
///
/// Clones observe the same flag, so a caller can keep one handle and pass
/// clones into worker threads.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Trips the flag; every clone sees the cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns whether the flag has been tripped.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Checkpoint used by services between storage phases.
    pub fn checkpoint(&self) -> Result<(), OperationCancelled> {
        if self.is_cancelled() {
            Err(OperationCancelled)
        } else {
            Ok(())
        }
    }
}

/// Raised by [`CancellationToken::checkpoint`] when the flag is tripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationCancelled;

impl Display for OperationCancelled {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "operation cancelled by caller")
    }
}

impl Error for OperationCancelled {}

#[cfg(test)]
mod tests {
    use super::CancellationToken;

    #[test]
    fn fresh_token_is_not_cancelled() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        assert!(token.checkpoint().is_ok());
    }

    #[test]
    fn cancel_is_visible_through_clones() {
        let token = CancellationToken::new();
        let observer = token.clone();

        token.cancel();
        assert!(observer.is_cancelled());
        assert!(observer.checkpoint().is_err());
    }
}
