//! Serialized execution context shared by a group of transactions.
//!
//! Every callback that touches transaction state (work completion, watchdog expiry, child
//! reports) is posted here and runs one job at a time, in posting order. Timers and work
//! futures run elsewhere on the runtime and only marshal their outcome onto the queue.

use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::transactions::errors::TransactionError;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Handle to a single-worker job queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SerialExecutor {
    name: Arc<str>,
    jobs: mpsc::UnboundedSender<Job>,
    runtime: Handle,
}

impl SerialExecutor {
    /// Spawn the worker on the current tokio runtime
    pub fn spawn(name: impl Into<String>) -> Result<Self, TransactionError> {
        let runtime = Handle::try_current().map_err(|_| TransactionError::NoRuntime)?;
        let name: Arc<str> = Arc::from(name.into());
        let (jobs, mut queue) = mpsc::unbounded_channel::<Job>();

        let worker_name = name.clone();
        runtime.spawn(async move {
            debug!(executor = %worker_name, "Serial executor started");
            while let Some(job) = queue.recv().await {
                job();
            }
            debug!(executor = %worker_name, "Serial executor stopped");
        });

        Ok(Self {
            name,
            jobs,
            runtime,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queue a job behind everything already posted
    pub fn post<F>(&self, job: F) -> Result<(), TransactionError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.jobs
            .send(Box::new(job))
            .map_err(|_| TransactionError::ExecutorClosed {
                executor: self.name.to_string(),
            })
    }

    /// Queue a job once `delay` has elapsed. Aborting the returned handle before the delay
    /// expires cancels the job.
    pub fn post_delayed<F>(&self, delay: Duration, job: F) -> JoinHandle<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let executor = self.clone();
        self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = executor.post(job) {
                warn!(executor = %executor.name, "Dropping delayed job: {}", e);
            }
        })
    }

    /// Run a future on the runtime backing this executor
    pub(crate) fn spawn_task<F>(&self, future: F) -> JoinHandle<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        self.runtime.spawn(future)
    }
}
