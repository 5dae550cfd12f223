// Call Transactions Library - exactly-once asynchronous call operations
// This exposes the core components for testing and integration

pub mod config;
pub mod observability;
pub mod routing;
pub mod telemetry;
pub mod transactions;

// Re-export key types for easy access
pub use config::{config, init_config, CallTransactionsConfig};
pub use observability::{transaction_metrics, OperationTimer, TransactionMetrics, TransactionStats};
pub use routing::{EventDispatcher, RouteEvent, RouteSink};
pub use telemetry::{
    create_transaction_span, generate_correlation_id, init_telemetry, shutdown_telemetry,
};
pub use transactions::{
    CallTransaction, ChannelListener, CompletionListener, ListenerEvent, ResultCode,
    SerialExecutor, SerialProgress, SerialTransaction, Transaction, TransactionContext,
    TransactionError, TransactionManager, TransactionResult, TransactionState, TransactionWork,
};
