// Transaction engine: exactly-once asynchronous units of call work and their serial composition

pub mod base;
pub mod call;
pub mod errors;
pub mod executor;
pub mod listeners;
pub mod manager;
pub mod serial;
pub mod state_machine;
pub mod traits;
pub mod types;

pub use base::TransactionContext;
pub use call::CallTransaction;
pub use errors::{TransactionError, TransactionFailure};
pub use executor::SerialExecutor;
pub use listeners::{ChannelListener, ListenerEvent};
pub use manager::{TransactionManager, TransactionOutcome};
pub use serial::SerialTransaction;
pub use state_machine::SerialProgress;
pub use traits::{CompletionListener, FnWork, Succeed, Transaction, TransactionWork};
pub use types::{ResultCode, TransactionResult, TransactionState};
