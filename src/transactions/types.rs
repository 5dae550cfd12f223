// Core value types for call transactions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome code carried by every transaction result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultCode {
    Succeeded,
    Failed,
}

/// Immutable outcome of exactly one transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResult {
    code: ResultCode,
    message: Option<String>,
}

impl TransactionResult {
    pub fn new(code: ResultCode, message: Option<String>) -> Self {
        Self { code, message }
    }

    pub fn succeeded() -> Self {
        Self::new(ResultCode::Succeeded, None)
    }

    pub fn succeeded_with(message: impl Into<String>) -> Self {
        Self::new(ResultCode::Succeeded, Some(message.into()))
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(ResultCode::Failed, Some(message.into()))
    }

    pub fn code(&self) -> ResultCode {
        self.code
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn is_success(&self) -> bool {
        self.code == ResultCode::Succeeded
    }
}

impl fmt::Display for TransactionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.code, &self.message) {
            (ResultCode::Succeeded, None) => write!(f, "succeeded"),
            (ResultCode::Succeeded, Some(msg)) => write!(f, "succeeded: {msg}"),
            (ResultCode::Failed, None) => write!(f, "failed"),
            (ResultCode::Failed, Some(msg)) => write!(f, "failed: {msg}"),
        }
    }
}

/// Lifecycle of a single transaction. `Completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionState {
    NotStarted,
    Running,
    Completed,
}

impl TransactionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionState::Completed)
    }
}
