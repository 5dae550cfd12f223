// Shared bookkeeping for every transaction kind: completion guard, watchdog, listener slot

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn, Instrument};

use crate::config::TransactionConfig;
use crate::observability::{transaction_metrics, OperationTimer};
use crate::telemetry::{create_transaction_span, generate_correlation_id};
use crate::transactions::executor::SerialExecutor;
use crate::transactions::traits::{CompletionListener, TransactionWork};
use crate::transactions::types::{TransactionResult, TransactionState};

/// Settings handed to every transaction built for one orchestrator
#[derive(Debug, Clone)]
pub struct TransactionContext {
    executor: SerialExecutor,
    timeout_limit: Duration,
}

impl TransactionContext {
    pub fn new(executor: SerialExecutor, timeout_limit: Duration) -> Self {
        Self {
            executor,
            timeout_limit,
        }
    }

    pub fn from_config(executor: SerialExecutor, config: &TransactionConfig) -> Self {
        Self::new(executor, config.timeout_limit())
    }

    pub fn executor(&self) -> &SerialExecutor {
        &self.executor
    }

    pub fn timeout_limit(&self) -> Duration {
        self.timeout_limit
    }

    /// Same executor, different watchdog. Used to bound a composite differently from its
    /// children.
    pub fn with_timeout_limit(&self, timeout_limit: Duration) -> Self {
        Self {
            executor: self.executor.clone(),
            timeout_limit,
        }
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) struct TransactionCore {
    name: String,
    correlation_id: String,
    executor: SerialExecutor,
    timeout_limit: Duration,
    started: AtomicBool,
    // completion guard: whoever flips it first owns the outcome
    completed: AtomicBool,
    listener: Mutex<Option<Arc<dyn CompletionListener>>>,
    watchdog: Mutex<Option<JoinHandle<()>>>,
    work_task: Mutex<Option<JoinHandle<()>>>,
    timer: Mutex<Option<OperationTimer>>,
}

impl TransactionCore {
    pub(crate) fn new(name: String, context: &TransactionContext) -> Self {
        Self {
            name,
            correlation_id: generate_correlation_id(),
            executor: context.executor.clone(),
            timeout_limit: context.timeout_limit,
            started: AtomicBool::new(false),
            completed: AtomicBool::new(false),
            listener: Mutex::new(None),
            watchdog: Mutex::new(None),
            work_task: Mutex::new(None),
            timer: Mutex::new(None),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub(crate) fn executor(&self) -> &SerialExecutor {
        &self.executor
    }

    pub(crate) fn timeout_limit(&self) -> Duration {
        self.timeout_limit
    }

    pub(crate) fn state(&self) -> TransactionState {
        if self.completed.load(Ordering::Acquire) {
            TransactionState::Completed
        } else if self.started.load(Ordering::Acquire) {
            TransactionState::Running
        } else {
            TransactionState::NotStarted
        }
    }

    pub(crate) fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    pub(crate) fn set_listener(&self, listener: Arc<dyn CompletionListener>) {
        *lock(&self.listener) = Some(listener);
    }

    /// Move to `Running`. Returns false if the transaction was already started.
    pub(crate) fn begin(&self) -> bool {
        if self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!(transaction = %self.name, "start() called more than once; ignoring");
            return false;
        }

        transaction_metrics().record_started();
        *lock(&self.timer) = Some(OperationTimer::new(&self.name));
        info!(
            transaction = %self.name,
            correlation.id = %self.correlation_id,
            timeout_ms = self.timeout_limit.as_millis() as u64,
            "Transaction started"
        );
        true
    }

    /// Arm the watchdog. `on_fire` runs on the serialized executor after `timeout_limit`.
    pub(crate) fn arm_watchdog<F>(&self, on_fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = self.executor.post_delayed(self.timeout_limit, on_fire);
        *lock(&self.watchdog) = Some(handle);
    }

    /// Run `work` on the runtime and hand its result to `on_done` on the serialized executor
    pub(crate) fn run_work<F>(&self, work: Arc<dyn TransactionWork>, on_done: F)
    where
        F: FnOnce(TransactionResult) + Send + 'static,
    {
        let span = create_transaction_span("perform", &self.name, &self.correlation_id);
        let executor = self.executor.clone();
        let name = self.name.clone();

        let handle = self.executor.spawn_task(async move {
            let result = work.perform().instrument(span).await;
            if let Err(e) = executor.post(move || on_done(result)) {
                warn!(transaction = %name, "Work result could not be delivered: {}", e);
            }
        });
        *lock(&self.work_task) = Some(handle);
    }

    fn try_complete(&self) -> bool {
        self.completed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn current_listener(&self) -> Option<Arc<dyn CompletionListener>> {
        lock(&self.listener).clone()
    }

    /// Report a work result, unless the transaction already completed
    pub(crate) fn deliver(&self, result: TransactionResult) {
        if !self.try_complete() {
            self.drop_late("completion");
            return;
        }

        let outcome = if result.is_success() {
            transaction_metrics().record_succeeded();
            info!(transaction = %self.name, "Transaction succeeded");
            "succeeded"
        } else {
            transaction_metrics().record_failed();
            warn!(
                transaction = %self.name,
                message = result.message().unwrap_or_default(),
                "Transaction failed"
            );
            "failed"
        };

        match self.current_listener() {
            Some(listener) => listener.on_completed(result, &self.name),
            None => warn!(transaction = %self.name, "No listener attached; result discarded"),
        }
        self.finish(outcome);
    }

    /// Report a watchdog expiry, unless the transaction already completed
    pub(crate) fn deliver_timeout(&self) {
        if !self.try_complete() {
            self.drop_late("timeout");
            return;
        }

        transaction_metrics().record_timed_out();
        warn!(
            transaction = %self.name,
            timeout_ms = self.timeout_limit.as_millis() as u64,
            "Transaction timed out"
        );

        match self.current_listener() {
            Some(listener) => listener.on_timeout(&self.name),
            None => warn!(transaction = %self.name, "No listener attached; timeout discarded"),
        }
        self.finish("timed_out");
    }

    /// The losing path of the completion race lands here
    pub(crate) fn drop_late(&self, path: &str) {
        transaction_metrics().record_late_completion();
        debug!(
            transaction = %self.name,
            path = path,
            "Transaction already completed; dropping late report"
        );
    }

    // Runs once, right after the winning path reported
    fn finish(&self, outcome: &str) {
        if let Some(watchdog) = lock(&self.watchdog).take() {
            watchdog.abort();
        }
        if let Some(work) = lock(&self.work_task).take() {
            work.abort();
        }
        if let Some(timer) = lock(&self.timer).take() {
            timer.finish(outcome);
        }
    }
}
