//! Top-level scheduler: runs submitted transactions strictly one at a time.
//!
//! Each submission resolves once its transaction reports. The next queued transaction starts
//! only after the current one completed or timed out.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::transactions::base::lock;
use crate::transactions::errors::TransactionError;
use crate::transactions::executor::SerialExecutor;
use crate::transactions::traits::{CompletionListener, Transaction};
use crate::transactions::types::TransactionResult;

pub type TransactionOutcome = Result<TransactionResult, TransactionError>;

struct Queued {
    transaction: Arc<dyn Transaction>,
    reply: oneshot::Sender<TransactionOutcome>,
}

struct Running {
    ticket: u64,
    name: String,
    reply: oneshot::Sender<TransactionOutcome>,
}

struct ManagerInner {
    executor: SerialExecutor,
    queue: Mutex<VecDeque<Queued>>,
    current: Mutex<Option<Running>>,
    next_ticket: AtomicU64,
}

pub struct TransactionManager {
    inner: Arc<ManagerInner>,
}

impl TransactionManager {
    pub fn new(executor: SerialExecutor) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                executor,
                queue: Mutex::new(VecDeque::new()),
                current: Mutex::new(None),
                next_ticket: AtomicU64::new(1),
            }),
        }
    }

    /// Queue `transaction` and wait for its outcome. A failed result comes back as
    /// `TransactionError::Failed`, a watchdog expiry as `TransactionError::TimedOut`.
    pub async fn submit(&self, transaction: Arc<dyn Transaction>) -> TransactionOutcome {
        let name = transaction.name().to_string();
        let (reply, outcome) = oneshot::channel();

        let inner = self.inner.clone();
        self.inner
            .executor
            .post(move || inner.enqueue(Queued { transaction, reply }))?;

        outcome
            .await
            .map_err(|_| TransactionError::ManagerDropped { name })?
    }

    /// Transactions waiting behind the current one
    pub fn pending_count(&self) -> usize {
        lock(&self.inner.queue).len()
    }

    pub fn is_busy(&self) -> bool {
        lock(&self.inner.current).is_some()
    }
}

impl ManagerInner {
    fn enqueue(self: &Arc<Self>, queued: Queued) {
        debug!(transaction = %queued.transaction.name(), "Transaction queued");
        lock(&self.queue).push_back(queued);
        if lock(&self.current).is_none() {
            self.start_next();
        }
    }

    fn start_next(self: &Arc<Self>) {
        let Some(Queued { transaction, reply }) = lock(&self.queue).pop_front() else {
            return;
        };

        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let name = transaction.name().to_string();
        *lock(&self.current) = Some(Running {
            ticket,
            name: name.clone(),
            reply,
        });

        info!(transaction = %name, ticket = ticket, "Starting top-level transaction");
        transaction.set_complete_listener(Arc::new(ManagerListener {
            manager: Arc::downgrade(self),
            ticket,
        }));
        transaction.start();
    }

    fn on_report(self: &Arc<Self>, ticket: u64, outcome: TransactionOutcome) {
        let running = {
            let mut current = lock(&self.current);
            if current.as_ref().is_some_and(|running| running.ticket == ticket) {
                current.take()
            } else {
                None
            }
        };

        let Some(running) = running else {
            debug!(ticket = ticket, "Report for a transaction that is no longer current");
            return;
        };

        if running.reply.send(outcome).is_err() {
            debug!(transaction = %running.name, "Submitter stopped waiting; outcome dropped");
        }
        self.start_next();
    }
}

struct ManagerListener {
    manager: Weak<ManagerInner>,
    ticket: u64,
}

impl ManagerListener {
    fn report(&self, name: &str, outcome: TransactionOutcome) {
        let Some(manager) = self.manager.upgrade() else {
            debug!(transaction = %name, "Manager gone; dropping outcome");
            return;
        };
        let ticket = self.ticket;
        let executor = manager.executor.clone();
        if let Err(e) = executor.post(move || manager.on_report(ticket, outcome)) {
            warn!(transaction = %name, "Outcome could not be delivered: {}", e);
        }
    }
}

impl CompletionListener for ManagerListener {
    fn on_completed(&self, result: TransactionResult, name: &str) {
        let outcome = if result.is_success() {
            Ok(result)
        } else {
            Err(TransactionError::Failed {
                name: name.to_string(),
                message: result.message().unwrap_or_default().to_string(),
            })
        };
        self.report(name, outcome);
    }

    fn on_timeout(&self, name: &str) {
        self.report(
            name,
            Err(TransactionError::TimedOut {
                name: name.to_string(),
            }),
        );
    }
}
