use crate::types::Target;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::time;
use tokio_util::sync::CancellationToken;

/// Create a bounded FIFO of targets with one producer half and a consumer half
/// shared by all workers.
///
/// `wait` is the slice a worker blocks on an idle queue before re-checking. The queue
/// only reports exhaustion once the producer has been dropped and every queued target
/// has been handed out, so transient emptiness during population is tolerated.
pub fn task_queue(capacity: usize, wait: Duration) -> (TaskSender, TaskQueue) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        TaskSender { tx },
        TaskQueue {
            rx: Mutex::new(rx),
            wait,
        },
    )
}

/// Producer half. Dropping it marks population as finished.
#[derive(Debug)]
pub struct TaskSender {
    tx: mpsc::Sender<Target>,
}

impl TaskSender {
    /// Enqueue one target, waiting for room. Returns false if cancelled or if every
    /// consumer is gone.
    pub async fn push(&self, target: Target, cancel: &CancellationToken) -> bool {
        tokio::select! {
            _ = cancel.cancelled() => false,
            res = self.tx.send(target) => res.is_ok(),
        }
    }
}

/// Consumer half. Each target is delivered to exactly one caller of [`TaskQueue::pop`].
#[derive(Debug)]
pub struct TaskQueue {
    rx: Mutex<mpsc::Receiver<Target>>,
    wait: Duration,
}

impl TaskQueue {
    /// Take the next target.
    ///
    /// Returns `None` when the queue is exhausted or the scan is cancelled.
    pub async fn pop(&self, cancel: &CancellationToken) -> Option<Target> {
        tokio::select! {
            _ = cancel.cancelled() => None,
            next = self.next() => next,
        }
    }

    async fn next(&self) -> Option<Target> {
        loop {
            let mut rx = self.rx.lock().await;
            match time::timeout(self.wait, rx.recv()).await {
                Ok(next) => return next,
                Err(_) => {
                    // Producer still alive but slow; let other workers at the lock.
                    drop(rx);
                    tracing::trace!("task queue idle, population still running");
                    tokio::task::yield_now().await;
                }
            }
        }
    }
}
