//! Region control executor
//!
//! A single-consumer FIFO task queue: tasks run to completion, one at a
//! time, in enqueue order. Stopping closes intake, drains everything already
//! queued, then joins the worker — the command log is authoritative, not the
//! queue, so queued work must not be dropped.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub type ControlTask = Pin<Box<dyn Future<Output = ()> + Send>>;

pub struct ControlExecutor {
    name: String,
    available: AtomicBool,
    tx: Mutex<Option<mpsc::UnboundedSender<ControlTask>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ControlExecutor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            available: AtomicBool::new(false),
            tx: Mutex::new(None),
            worker: Mutex::new(None),
        }
    }

    /// Start the consumer. Must be called before `execute`.
    pub fn init(&self) {
        let (tx, mut rx) = mpsc::unbounded_channel::<ControlTask>();
        let name = self.name.clone();
        let worker = tokio::spawn(async move {
            while let Some(task) = rx.recv().await {
                task.await;
            }
            debug!("control executor {} drained", name);
        });
        *self.tx.lock() = Some(tx);
        *self.worker.lock() = Some(worker);
        self.available.store(true, Ordering::Release);
    }

    /// Enqueue a task. Fails once the executor is stopped.
    pub fn execute(&self, task: ControlTask) -> bool {
        if !self.available.load(Ordering::Acquire) {
            warn!("control executor {} is not available", self.name);
            return false;
        }
        let tx = self.tx.lock();
        match tx.as_ref() {
            Some(tx) => tx.send(task).is_ok(),
            None => false,
        }
    }

    /// Stop intake, drain already-enqueued tasks, then join the worker.
    pub async fn stop(&self) {
        self.available.store(false, Ordering::Release);
        // Dropping the sender closes the channel once queued tasks drain.
        self.tx.lock().take();
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                warn!("control executor {} worker join failed: {}", self.name, e);
            }
        }
    }
}
