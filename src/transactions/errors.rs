use thiserror::Error;

/// Errors surfaced to callers of the engine (manager and executor level)
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("Transaction {name} failed: {message}")]
    Failed { name: String, message: String },
    #[error("Transaction {name} timed out")]
    TimedOut { name: String },
    #[error("Serial executor {executor} is no longer accepting work")]
    ExecutorClosed { executor: String },
    #[error("No tokio runtime available to drive transactions")]
    NoRuntime,
    #[error("Transaction manager dropped before {name} reported")]
    ManagerDropped { name: String },
}

/// Why a serial chain aborted. The Display text becomes the composite's failure message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransactionFailure {
    #[error("sub transaction {child} failed: {message}")]
    SubTransactionFailed { child: String, message: String },
    #[error("sub transaction {child} timed out")]
    SubTransactionTimedOut { child: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_messages_name_the_child() {
        let failed = TransactionFailure::SubTransactionFailed {
            child: "B".to_string(),
            message: "bad state".to_string(),
        };
        assert_eq!(failed.to_string(), "sub transaction B failed: bad state");

        let timed_out = TransactionFailure::SubTransactionTimedOut {
            child: "hold-call".to_string(),
        };
        assert_eq!(timed_out.to_string(), "sub transaction hold-call timed out");
    }

    #[test]
    fn test_error_display() {
        let err = TransactionError::TimedOut {
            name: "answer".to_string(),
        };
        assert_eq!(err.to_string(), "Transaction answer timed out");
    }
}
