//! Fire-and-forget persistence of collection snapshots.
//!
//! # Responsibility
//! - Accept one serialized snapshot per mutation without blocking the caller.
//! - Write snapshots to the key-value store on a single background writer.
//! - Report write failures through logging and an optional hook.
//!
//! # Invariants
//! - Snapshots are written in submission order, so the last submitted
//!   snapshot is the last one written.
//! - Failed writes are never retried.

use crate::storage::{KeyValueStore, StorageError};
use log::{debug, error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

const WORKER_THREAD_NAME: &str = "lifelog-persist";

/// Why a snapshot did not reach the store.
#[derive(Debug)]
pub enum PersistError {
    Storage(StorageError),
    /// Writer thread is gone; the snapshot was dropped.
    WorkerUnavailable,
}

impl Display for PersistError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Storage(err) => write!(f, "{err}"),
            Self::WorkerUnavailable => write!(f, "persist worker is not running"),
        }
    }
}

impl Error for PersistError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            Self::WorkerUnavailable => None,
        }
    }
}

/// Failure delivered to a [`PersistFailureHook`].
#[derive(Debug)]
pub struct PersistFailure {
    /// Submission sequence number of the failed snapshot (1-based).
    pub sequence: u64,
    pub key: String,
    pub error: PersistError,
}

/// Callback invoked for every failed snapshot write.
///
/// Runs on the writer thread, or on the submitting thread once the writer is
/// gone. Hooks must not panic; a panic is caught, logged and otherwise ignored.
pub type PersistFailureHook = Arc<dyn Fn(&PersistFailure) + Send + Sync>;

#[derive(Debug, Default)]
struct Counters {
    written: AtomicU64,
    failed: AtomicU64,
}

enum Job {
    Write { sequence: u64, bytes: Vec<u8> },
    Flush(Sender<()>),
}

/// Single-writer queue issuing one store write per submitted snapshot.
pub struct PersistQueue {
    key: String,
    sender: Option<Sender<Job>>,
    worker: Option<JoinHandle<()>>,
    next_sequence: u64,
    counters: Arc<Counters>,
    hook: Option<PersistFailureHook>,
}

impl PersistQueue {
    /// Starts the background writer for `key`.
    ///
    /// # Errors
    /// - Returns the OS error when the writer thread cannot be spawned.
    pub fn spawn(
        store: Arc<dyn KeyValueStore>,
        key: impl Into<String>,
        hook: Option<PersistFailureHook>,
    ) -> std::io::Result<Self> {
        let key = key.into();
        let counters = Arc::new(Counters::default());
        let (sender, receiver) = mpsc::channel();

        let worker = {
            let key = key.clone();
            let counters = Arc::clone(&counters);
            let hook = hook.clone();
            std::thread::Builder::new()
                .name(WORKER_THREAD_NAME.to_string())
                .spawn(move || run_writer(receiver, store, key, counters, hook))?
        };

        Ok(Self {
            key,
            sender: Some(sender),
            worker: Some(worker),
            next_sequence: 0,
            counters,
            hook,
        })
    }

    /// Queues `bytes` for writing and returns immediately.
    ///
    /// Returns the snapshot's sequence number.
    pub fn submit(&mut self, bytes: Vec<u8>) -> u64 {
        self.next_sequence += 1;
        let sequence = self.next_sequence;

        let sent = self
            .sender
            .as_ref()
            .is_some_and(|sender| sender.send(Job::Write { sequence, bytes }).is_ok());
        if !sent {
            self.report_local_failure(sequence);
        }
        sequence
    }

    /// Blocks until every snapshot submitted so far has been attempted.
    ///
    /// Returns `false` when the writer is no longer running.
    pub fn flush(&self) -> bool {
        let Some(sender) = self.sender.as_ref() else {
            return false;
        };
        let (ack_tx, ack_rx) = mpsc::channel();
        if sender.send(Job::Flush(ack_tx)).is_err() {
            return false;
        }
        ack_rx.recv().is_ok()
    }

    /// Drains outstanding snapshots and stops the writer. Idempotent.
    pub fn shutdown(&mut self) {
        // Dropping the sender ends the writer loop after the queue drains.
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("event=persist_shutdown module=persist status=error reason=worker_panicked");
                return;
            }
            info!(
                "event=persist_shutdown module=persist status=ok submitted={} written={} failed={}",
                self.submitted(),
                self.written(),
                self.failed()
            );
        }
    }

    /// Number of snapshots submitted so far.
    pub fn submitted(&self) -> u64 {
        self.next_sequence
    }

    /// Number of snapshots written successfully.
    pub fn written(&self) -> u64 {
        self.counters.written.load(Ordering::SeqCst)
    }

    /// Number of snapshots that failed to reach the store.
    pub fn failed(&self) -> u64 {
        self.counters.failed.load(Ordering::SeqCst)
    }

    fn report_local_failure(&self, sequence: u64) {
        let failure = PersistFailure {
            sequence,
            key: self.key.clone(),
            error: PersistError::WorkerUnavailable,
        };
        record_failure(&self.counters, self.hook.as_ref(), &failure);
    }
}

impl Drop for PersistQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_writer(
    receiver: Receiver<Job>,
    store: Arc<dyn KeyValueStore>,
    key: String,
    counters: Arc<Counters>,
    hook: Option<PersistFailureHook>,
) {
    for job in receiver {
        match job {
            Job::Write { sequence, bytes } => match store.set(&key, &bytes) {
                Ok(()) => {
                    counters.written.fetch_add(1, Ordering::SeqCst);
                    debug!(
                        "event=persist_write module=persist status=ok sequence={sequence} bytes={}",
                        bytes.len()
                    );
                }
                Err(err) => {
                    let failure = PersistFailure {
                        sequence,
                        key: key.clone(),
                        error: PersistError::Storage(err),
                    };
                    record_failure(&counters, hook.as_ref(), &failure);
                }
            },
            Job::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
}

fn record_failure(counters: &Counters, hook: Option<&PersistFailureHook>, failure: &PersistFailure) {
    counters.failed.fetch_add(1, Ordering::SeqCst);
    error!(
        "event=persist_write module=persist status=error sequence={} error={}",
        failure.sequence, failure.error
    );
    if let Some(hook) = hook {
        if panic::catch_unwind(AssertUnwindSafe(|| hook(failure))).is_err() {
            error!(
                "event=persist_failure_hook module=persist status=error sequence={} reason=hook_panicked",
                failure.sequence
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PersistFailure, PersistFailureHook, PersistQueue};
    use crate::storage::{KeyValueStore, MemoryKvStore, StorageError, StorageResult};
    use std::sync::{Arc, Mutex};

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> StorageResult<Option<Vec<u8>>> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &[u8]) -> StorageResult<()> {
            Err(StorageError::Poisoned)
        }
    }

    #[test]
    fn last_submitted_snapshot_wins() {
        let store = Arc::new(MemoryKvStore::new());
        let mut queue = PersistQueue::spawn(store.clone(), "k", None).unwrap();

        for round in 0..50_u32 {
            queue.submit(round.to_string().into_bytes());
        }
        assert!(queue.flush());

        assert_eq!(store.get("k").unwrap(), Some(b"49".to_vec()));
        assert_eq!(queue.submitted(), 50);
        assert_eq!(queue.written(), 50);
    }

    #[test]
    fn failures_reach_hook_and_are_not_retried() {
        let seen: Arc<Mutex<Vec<u64>>> = Arc::default();
        let hook: PersistFailureHook = {
            let seen = Arc::clone(&seen);
            Arc::new(move |failure: &PersistFailure| {
                seen.lock().unwrap().push(failure.sequence);
            })
        };
        let mut queue = PersistQueue::spawn(Arc::new(FailingStore), "k", Some(hook)).unwrap();

        queue.submit(b"a".to_vec());
        queue.submit(b"b".to_vec());
        assert!(queue.flush());

        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
        assert_eq!(queue.failed(), 2);
        assert_eq!(queue.written(), 0);
    }

    #[test]
    fn submit_after_shutdown_reports_failure() {
        let mut queue = PersistQueue::spawn(Arc::new(MemoryKvStore::new()), "k", None).unwrap();
        queue.shutdown();
        queue.shutdown();

        queue.submit(b"late".to_vec());
        assert!(!queue.flush());
        assert_eq!(queue.failed(), 1);
    }

    #[test]
    fn panicking_hook_does_not_stop_writer() {
        let hook: PersistFailureHook = Arc::new(|_: &PersistFailure| panic!("hook failed"));
        let mut queue = PersistQueue::spawn(Arc::new(FailingStore), "k", Some(hook)).unwrap();

        queue.submit(b"a".to_vec());
        queue.submit(b"b".to_vec());
        assert!(queue.flush());
        assert_eq!(queue.failed(), 2);
    }

    #[test]
    fn panicking_hook_does_not_reach_submitting_thread() {
        let hook: PersistFailureHook = Arc::new(|_: &PersistFailure| panic!("hook failed"));
        let mut queue =
            PersistQueue::spawn(Arc::new(MemoryKvStore::new()), "k", Some(hook)).unwrap();
        queue.shutdown();

        assert_eq!(queue.submit(b"late".to_vec()), 1);
        assert_eq!(queue.failed(), 1);
    }
}
