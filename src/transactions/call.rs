// Leaf transaction: one unit of asynchronous call work under a watchdog

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::transactions::base::{TransactionContext, TransactionCore};
use crate::transactions::traits::{CompletionListener, FnWork, Transaction, TransactionWork};
use crate::transactions::types::{TransactionResult, TransactionState};

pub struct CallTransaction {
    core: Arc<TransactionCore>,
    work: Arc<dyn TransactionWork>,
}

impl CallTransaction {
    pub fn new<W>(name: impl Into<String>, work: W, context: &TransactionContext) -> Arc<Self>
    where
        W: TransactionWork + 'static,
    {
        Arc::new(Self {
            core: Arc::new(TransactionCore::new(name.into(), context)),
            work: Arc::new(work),
        })
    }

    /// Build a transaction whose work is an async closure
    pub fn from_fn<F, Fut>(name: impl Into<String>, context: &TransactionContext, f: F) -> Arc<Self>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TransactionResult> + Send + 'static,
    {
        Self::new(name, FnWork::new(f), context)
    }

    pub fn correlation_id(&self) -> &str {
        self.core.correlation_id()
    }

    pub fn timeout_limit(&self) -> Duration {
        self.core.timeout_limit()
    }

    fn schedule_transaction(&self) {
        let core = self.core.clone();
        self.core
            .run_work(self.work.clone(), move |result| core.deliver(result));
    }
}

impl Transaction for CallTransaction {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn state(&self) -> TransactionState {
        self.core.state()
    }

    fn set_complete_listener(&self, listener: Arc<dyn CompletionListener>) {
        self.core.set_listener(listener);
    }

    fn start(self: Arc<Self>) {
        if !self.core.begin() {
            return;
        }

        let core = self.core.clone();
        self.core.arm_watchdog(move || core.deliver_timeout());
        self.schedule_transaction();
    }
}

impl std::fmt::Debug for CallTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallTransaction")
            .field("name", &self.core.name())
            .field("state", &self.core.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transactions::executor::SerialExecutor;
    use crate::transactions::listeners::{ChannelListener, ListenerEvent};

    fn context(timeout_ms: u64) -> TransactionContext {
        let executor = SerialExecutor::spawn("call-tests").unwrap();
        TransactionContext::new(executor, Duration::from_millis(timeout_ms))
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_reported_once() {
        let ctx = context(1000);
        let (listener, mut events) = ChannelListener::new();
        let tx = CallTransaction::from_fn("answer", &ctx, || async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            TransactionResult::succeeded()
        });
        tx.set_complete_listener(listener);
        assert_eq!(tx.state(), TransactionState::NotStarted);

        tx.clone().start();
        assert_eq!(tx.state(), TransactionState::Running);

        let event = events.recv().await.unwrap();
        assert_eq!(
            event,
            ListenerEvent::Completed {
                result: TransactionResult::succeeded(),
                name: "answer".to_string()
            }
        );
        assert_eq!(tx.state(), TransactionState::Completed);

        // the disarmed watchdog must stay silent
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(events.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_still_completes() {
        let ctx = context(1000);
        let (listener, mut events) = ChannelListener::new();
        let tx = CallTransaction::from_fn("hold", &ctx, || async {
            TransactionResult::failed("bad state")
        });
        tx.set_complete_listener(listener);
        tx.clone().start();

        match events.recv().await.unwrap() {
            ListenerEvent::Completed { result, name } => {
                assert_eq!(name, "hold");
                assert!(!result.is_success());
                assert_eq!(result.message(), Some("bad state"));
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(tx.state(), TransactionState::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watchdog_wins_over_slow_work() {
        let ctx = context(100);
        let (listener, mut events) = ChannelListener::new();
        let tx = CallTransaction::from_fn("disconnect", &ctx, || async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            TransactionResult::succeeded()
        });
        tx.set_complete_listener(listener);
        tx.clone().start();

        assert_eq!(
            events.recv().await.unwrap(),
            ListenerEvent::TimedOut {
                name: "disconnect".to_string()
            }
        );

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(events.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_start_is_ignored() {
        let ctx = context(1000);
        let (listener, mut events) = ChannelListener::new();
        let runs = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = runs.clone();
        let tx = CallTransaction::from_fn("answer", &ctx, move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                TransactionResult::succeeded()
            }
        });
        tx.set_complete_listener(listener);
        tx.clone().start();
        tx.clone().start();

        events.recv().await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(events.try_recv().is_err());
        assert_eq!(runs.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_uses_context_timeout() {
        let ctx = context(2500);
        let tx = CallTransaction::from_fn("answer", &ctx, || async {
            TransactionResult::succeeded()
        });
        assert_eq!(tx.timeout_limit(), Duration::from_millis(2500));
        assert!(!tx.correlation_id().is_empty());
    }
}
