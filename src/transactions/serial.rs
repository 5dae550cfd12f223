//! Composite transaction running its sub transactions one after another.
//!
//! The chain owns a single internal listener that is attached to whichever child is in
//! flight. Child reports are marshalled onto the chain's serialized executor, so the pending
//! queue is only ever drained from there. The chain's own watchdog is armed once and bounds
//! the whole run; each child additionally enforces its own watchdog.

use statig::prelude::*;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::transactions::base::{lock, TransactionContext, TransactionCore};
use crate::transactions::errors::TransactionFailure;
use crate::transactions::state_machine::{ChainEvent, ChainTracker, SerialProgress};
use crate::transactions::traits::{CompletionListener, Succeed, Transaction, TransactionWork};
use crate::transactions::types::{TransactionResult, TransactionState};

pub struct SerialTransaction {
    core: Arc<TransactionCore>,
    pending: Mutex<VecDeque<Arc<dyn Transaction>>>,
    current: Mutex<Option<Arc<dyn Transaction>>>,
    progress: Mutex<StateMachine<ChainTracker>>,
    final_step: Arc<dyn TransactionWork>,
    chain_listener: Arc<dyn CompletionListener>,
}

impl SerialTransaction {
    pub fn new(
        name: impl Into<String>,
        sub_transactions: Vec<Arc<dyn Transaction>>,
        context: &TransactionContext,
    ) -> Arc<Self> {
        Self::with_final_step(name, sub_transactions, Succeed, context)
    }

    /// Like `new`, but `final_step` runs once every child has succeeded and decides the
    /// chain's result
    pub fn with_final_step<W>(
        name: impl Into<String>,
        sub_transactions: Vec<Arc<dyn Transaction>>,
        final_step: W,
        context: &TransactionContext,
    ) -> Arc<Self>
    where
        W: TransactionWork + 'static,
    {
        let name = name.into();
        Arc::new_cyclic(|chain: &Weak<SerialTransaction>| Self {
            core: Arc::new(TransactionCore::new(name.clone(), context)),
            pending: Mutex::new(sub_transactions.into_iter().collect()),
            current: Mutex::new(None),
            progress: Mutex::new(ChainTracker::new(name).state_machine()),
            final_step: Arc::new(final_step),
            chain_listener: Arc::new(ChainListener {
                chain: chain.clone(),
            }),
        })
    }

    /// Queue another child behind everything already pending. Safe from any thread, including
    /// while earlier children are running.
    pub fn append_transaction(&self, transaction: Arc<dyn Transaction>) {
        if self.core.is_completed() {
            warn!(
                chain = %self.core.name(),
                child = %transaction.name(),
                "Appending to a completed chain; the transaction will never run"
            );
        }
        let mut pending = lock(&self.pending);
        pending.push_back(transaction);
        debug!(chain = %self.core.name(), pending = pending.len(), "Sub transaction appended");
    }

    /// Children not yet started
    pub fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }

    pub fn progress(&self) -> SerialProgress {
        SerialProgress::from(lock(&self.progress).state())
    }

    pub fn correlation_id(&self) -> &str {
        self.core.correlation_id()
    }

    pub fn timeout_limit(&self) -> Duration {
        self.core.timeout_limit()
    }

    fn track(&self, event: ChainEvent) {
        lock(&self.progress).handle(&event);
    }

    // Pop the next child, or finalize once nothing is left
    fn advance(self: &Arc<Self>) {
        if self.core.is_completed() {
            return;
        }

        let next = lock(&self.pending).pop_front();
        match next {
            Some(child) => self.launch(child),
            None => self.schedule_transaction(),
        }
    }

    fn launch(&self, child: Arc<dyn Transaction>) {
        self.track(ChainEvent::Launch {
            child: child.name().to_string(),
        });
        info!(chain = %self.core.name(), child = %child.name(), "Starting sub transaction");

        child.set_complete_listener(self.chain_listener.clone());
        *lock(&self.current) = Some(child.clone());
        child.start();
    }

    fn schedule_transaction(self: &Arc<Self>) {
        self.track(ChainEvent::Drained);
        debug!(chain = %self.core.name(), "All sub transactions done; running final step");

        let chain = self.clone();
        self.core
            .run_work(self.final_step.clone(), move |result| chain.settle(result));
    }

    fn on_child_completed(self: &Arc<Self>, result: TransactionResult, child: &str) {
        if self.core.is_completed() {
            self.core.drop_late("sub transaction completion");
            return;
        }
        lock(&self.current).take();

        if result.is_success() {
            debug!(chain = %self.core.name(), child = %child, "Sub transaction succeeded");
            self.advance();
        } else {
            self.track(ChainEvent::ChildFailed {
                child: child.to_string(),
            });
            self.abort(TransactionFailure::SubTransactionFailed {
                child: child.to_string(),
                message: result.message().unwrap_or("no diagnostic").to_string(),
            });
        }
    }

    fn on_child_timeout(&self, child: &str) {
        if self.core.is_completed() {
            self.core.drop_late("sub transaction timeout");
            return;
        }
        lock(&self.current).take();

        self.track(ChainEvent::ChildTimedOut {
            child: child.to_string(),
        });
        self.abort(TransactionFailure::SubTransactionTimedOut {
            child: child.to_string(),
        });
    }

    fn abort(&self, failure: TransactionFailure) {
        warn!(chain = %self.core.name(), reason = %failure, "Aborting serial chain");
        self.settle(TransactionResult::failed(failure.to_string()));
    }

    fn settle(&self, result: TransactionResult) {
        self.track(ChainEvent::Settled {
            succeeded: result.is_success(),
        });
        self.core.deliver(result);
        self.release();
    }

    fn on_watchdog(&self) {
        self.track(ChainEvent::WatchdogFired);
        self.core.deliver_timeout();
        self.release();
    }

    // Nothing further will run; let go of the remaining children
    fn release(&self) {
        let dropped = {
            let mut pending = lock(&self.pending);
            let count = pending.len();
            pending.clear();
            count
        };
        lock(&self.current).take();
        if dropped > 0 {
            debug!(chain = %self.core.name(), dropped = dropped, "Discarded unstarted sub transactions");
        }
    }
}

impl Transaction for SerialTransaction {
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

        let chain = self.clone();
        self.core.arm_watchdog(move || chain.on_watchdog());

        let chain = self.clone();
        if let Err(e) = self.core.executor().post(move || chain.advance()) {
            warn!(chain = %self.core.name(), "Serial chain could not be scheduled: {}", e);
        }
    }
}

impl std::fmt::Debug for SerialTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransaction")
            .field("name", &self.core.name())
            .field("state", &self.core.state())
            .field("progress", &self.progress())
            .field("pending", &self.pending_count())
            .finish()
    }
}

/// Listener handed to each child in turn. Holds the chain weakly: once the chain has
/// reported and been dropped, late child reports go nowhere.
struct ChainListener {
    chain: Weak<SerialTransaction>,
}

impl CompletionListener for ChainListener {
    fn on_completed(&self, result: TransactionResult, name: &str) {
        let Some(chain) = self.chain.upgrade() else {
            debug!(child = %name, "Chain gone; ignoring sub transaction result");
            return;
        };
        let child = name.to_string();
        let executor = chain.core.executor().clone();
        if let Err(e) = executor.post(move || chain.on_child_completed(result, &child)) {
            warn!(child = %name, "Sub transaction result could not be delivered: {}", e);
        }
    }

    fn on_timeout(&self, name: &str) {
        let Some(chain) = self.chain.upgrade() else {
            debug!(child = %name, "Chain gone; ignoring sub transaction timeout");
            return;
        };
        let child = name.to_string();
        let executor = chain.core.executor().clone();
        if let Err(e) = executor.post(move || chain.on_child_timeout(&child)) {
            warn!(child = %name, "Sub transaction timeout could not be delivered: {}", e);
        }
    }
}
