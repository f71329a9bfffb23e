//! Batched transactional context
//!
//! Backend operations are asynchronous requests; the batch context is the
//! engine's only suspension point during apply. Operations queued inside a
//! context are not considered complete until `drain()` has resolved every
//! one of them, which is what imposes ordering on an otherwise
//! non-deterministic asynchronous subsystem.

use crate::error::NetstateResult;
use futures::future::BoxFuture;
use tracing::{debug, warn};

/// A scoped batching window for queued backend operations
///
/// `drain()` must be called before the context goes out of scope; dropping
/// a context with pending operations leaves their completion unobserved and
/// logs a warning.
pub struct BatchContext<'a> {
    label: String,
    pending: Vec<BoxFuture<'a, NetstateResult<()>>>,
}

impl<'a> BatchContext<'a> {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            pending: Vec::new(),
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Queue an asynchronous backend request into this batch
    pub fn queue<F>(&mut self, fut: F)
    where
        F: std::future::Future<Output = NetstateResult<()>> + Send + 'a,
    {
        self.pending.push(Box::pin(fut));
    }

    /// Block until every queued operation has completed
    ///
    /// All operations are driven to completion even when one fails, so the
    /// backend's change queue is drained either way; the first failure is
    /// returned.
    pub async fn drain(&mut self) -> NetstateResult<()> {
        let queued = std::mem::take(&mut self.pending);
        if queued.is_empty() {
            return Ok(());
        }
        debug!("batch '{}': draining {} queued operation(s)", self.label, queued.len());
        let results = futures::future::join_all(queued).await;
        for result in results {
            result?;
        }
        Ok(())
    }
}

impl Drop for BatchContext<'_> {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            warn!(
                "batch '{}' dropped with {} undrained operation(s)",
                self.label,
                self.pending.len()
            );
        }
    }
}
