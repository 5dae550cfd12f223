// Capabilities shared by every transaction kind and by whoever listens to them

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

use crate::transactions::types::{TransactionResult, TransactionState};

/// Receives the single outcome of a transaction.
///
/// Exactly one of the two callbacks is invoked per transaction, on the transaction's
/// serialized executor.
pub trait CompletionListener: Send + Sync {
    /// The transaction's work reported a result (successful or not)
    fn on_completed(&self, result: TransactionResult, name: &str);

    /// The transaction's watchdog fired before the work reported
    fn on_timeout(&self, name: &str);
}

/// A named unit of asynchronous work with exactly-once completion and a watchdog
pub trait Transaction: Send + Sync {
    fn name(&self) -> &str;

    fn state(&self) -> TransactionState;

    /// Replace the listener. Must happen before `start()`.
    fn set_complete_listener(&self, listener: Arc<dyn CompletionListener>);

    /// Begin the work and arm the watchdog. Called exactly once per instance.
    fn start(self: Arc<Self>);
}

/// The actual work performed by a transaction once it is scheduled
#[async_trait]
pub trait TransactionWork: Send + Sync {
    async fn perform(&self) -> TransactionResult;
}

/// Adapter turning an async closure into `TransactionWork`
pub struct FnWork<F> {
    f: F,
}

impl<F> FnWork<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> TransactionWork for FnWork<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = TransactionResult> + Send + 'static,
{
    async fn perform(&self) -> TransactionResult {
        (self.f)().await
    }
}

/// Work that succeeds immediately. Default finalization step of a serial chain.
pub struct Succeed;

#[async_trait]
impl TransactionWork for Succeed {
    async fn perform(&self) -> TransactionResult {
        TransactionResult::succeeded()
    }
}
