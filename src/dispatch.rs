use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace};

use crate::reply::Reply;

/// A finished request waiting for its caller to be resolved.
#[derive(Debug)]
pub struct Completion {
    tx: oneshot::Sender<Reply>,
    reply: Reply,
}

impl Completion {
    pub fn new(tx: oneshot::Sender<Reply>, reply: Reply) -> Self {
        Self { tx, reply }
    }

    fn complete(self) {
        // The caller may have stopped waiting; nothing is left to resolve then.
        if self.tx.send(self.reply).is_err() {
            trace!("caller dropped before its reply was delivered");
        }
    }
}

/// Resolves callers on a fixed set of worker tasks instead of the task that read the reply.
///
/// Completions go to workers round robin. Each worker resolves its completions in the order it
/// received them; nothing is ordered across workers. Workers exit once every handle to the
/// dispatcher is dropped.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    workers: Arc<[mpsc::UnboundedSender<Completion>]>,
    next: Arc<AtomicUsize>,
}

impl Dispatcher {
    /// Spawns `workers` worker tasks, at least one. Must be called from within a tokio runtime.
    pub fn new(workers: usize) -> Dispatcher {
        let workers: Vec<_> = (0..workers.max(1))
            .map(|id| {
                let (tx, rx) = mpsc::unbounded_channel();
                tokio::spawn(run_worker(id, rx));
                tx
            })
            .collect();

        Dispatcher {
            workers: Arc::from(workers),
            next: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers.len()
    }

    pub fn dispatch(&self, completion: Completion) {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.workers.len();
        if let Err(mpsc::error::SendError(completion)) = self.workers[index].send(completion) {
            // The worker is gone (runtime shutting down); resolve in place.
            completion.complete();
        }
    }
}

async fn run_worker(id: usize, mut rx: mpsc::UnboundedReceiver<Completion>) {
    while let Some(completion) = rx.recv().await {
        completion.complete();
    }
    debug!(worker = id, "dispatch worker stopped");
}
