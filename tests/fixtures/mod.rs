//! Scripted sub transactions for exercising serial chains deterministically.
//!
//! Every step records `start:<name>` when its work begins and `end:<name>` when it reports, so
//! tests can assert both ordering and that no step overlapped another.
#![allow(dead_code)]

use call_transactions::{
    CallTransaction, SerialExecutor, Transaction, TransactionContext, TransactionResult,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How a scripted step behaves once started
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Succeed { delay_ms: u64 },
    Fail { delay_ms: u64, message: String },
    Hang,
}

impl Step {
    pub fn ok(delay_ms: u64) -> Self {
        Step::Succeed { delay_ms }
    }

    pub fn fail(delay_ms: u64, message: &str) -> Self {
        Step::Fail {
            delay_ms,
            message: message.to_string(),
        }
    }
}

/// Shared record of step activity
#[derive(Debug, Clone, Default)]
pub struct ActivityLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: String) {
        self.entries.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    /// Names of steps whose work began, in order
    pub fn started(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter_map(|entry| entry.strip_prefix("start:").map(str::to_string))
            .collect()
    }

    /// True when every start is followed by its own end before the next start
    pub fn is_strictly_serial(&self) -> bool {
        let entries = self.entries();
        let mut running: Option<String> = None;
        for entry in entries {
            if let Some(name) = entry.strip_prefix("start:") {
                if running.is_some() {
                    return false;
                }
                running = Some(name.to_string());
            } else if let Some(name) = entry.strip_prefix("end:") {
                if running.as_deref() != Some(name) {
                    return false;
                }
                running = None;
            }
        }
        true
    }
}

/// Fresh executor plus context. Must be called from inside a tokio runtime.
pub fn context(timeout_ms: u64) -> TransactionContext {
    let executor = SerialExecutor::spawn("integration-tests").unwrap();
    TransactionContext::new(executor, Duration::from_millis(timeout_ms))
}

pub fn scripted(
    name: &str,
    step: Step,
    context: &TransactionContext,
    log: &ActivityLog,
) -> Arc<dyn Transaction> {
    let label = name.to_string();
    let log = log.clone();
    CallTransaction::from_fn(name, context, move || {
        let label = label.clone();
        let log = log.clone();
        let step = step.clone();
        async move {
            log.record(format!("start:{label}"));
            let result = match step {
                Step::Succeed { delay_ms } => {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    TransactionResult::succeeded()
                }
                Step::Fail { delay_ms, message } => {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    TransactionResult::failed(message)
                }
                Step::Hang => std::future::pending().await,
            };
            log.record(format!("end:{label}"));
            result
        }
    })
}
