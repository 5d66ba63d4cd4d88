//! Worker run loop: pumps candidates from a [`Source`] into a [`Backend`],
//! tracks local stats, and reacts to the global terminate signal.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{error, warn};

use crate::backend::{Backend, TryOutcome};
use crate::source::{CandidateSource, Source, SourceDescriptor, WORD_BUFFER_SIZE};

/// Outcome of one worker's run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// The backend reported `Completed` — a target is solved.
    Success,
    /// The candidate source was exhausted, or the global terminate counter
    /// reached `total` before exhaustion.
    Completed,
    /// `source.init` failed; the worker never started its loop.
    Failure,
}

/// Worker 0's own phrase counters, the only ones ever printed by a STATS
/// request — mirrors the original tool's per-process `static nphrases`:
/// every worker keeps its own local count, but only worker 0 answers the
/// stats signal, so only worker 0's local count (extrapolated by the
/// worker count) is ever surfaced.
struct WorkerZeroStats {
    latest_word: Vec<u8>,
    nphrases: usize,
    kphrases: u64,
}

/// Shared, process-wide coordination state every worker holds a clone of.
pub struct SharedState {
    pub terminate: AtomicUsize,
    pub total_workers: usize,
    pub stdout: Mutex<()>,
    worker_zero_stats: Mutex<WorkerZeroStats>,
}

impl SharedState {
    pub fn new(total_workers: usize) -> Arc<Self> {
        Arc::new(SharedState {
            terminate: AtomicUsize::new(0),
            total_workers,
            stdout: Mutex::new(()),
            worker_zero_stats: Mutex::new(WorkerZeroStats {
                latest_word: Vec::new(),
                nphrases: 0,
                kphrases: 0,
            }),
        })
    }

    pub fn should_stop(&self) -> bool {
        self.terminate.load(Ordering::SeqCst) >= self.total_workers
    }

    /// Broadcasts termination to every worker: the thread-model translation
    /// of sending SIGTERM to the whole process group.
    pub fn broadcast_terminate(&self) {
        self.terminate.store(self.total_workers, Ordering::SeqCst);
    }

    /// Updates worker 0's local phrase count. A no-op for every other
    /// worker, matching the original's `worker_id == 0` print guard — other
    /// workers keep no counters worth recording here at all.
    fn record_candidate(&self, id: usize, candidate: &[u8]) {
        if id != 0 {
            return;
        }
        let mut stats = self.worker_zero_stats.lock();
        stats.latest_word.clear();
        stats.latest_word.extend_from_slice(candidate);
        stats.nphrases += 1;
        if stats.nphrases * self.total_workers > 1000 {
            stats.kphrases += 1;
            stats.nphrases = 0;
        }
    }

    /// Formats and prints the stats line worker 0 responds with on a STATS
    /// request. Guarded by `stdout` so concurrent prints never interleave.
    pub fn print_stats(&self) {
        let _guard = self.stdout.lock();
        let stats = self.worker_zero_stats.lock();
        let latest = String::from_utf8_lossy(&stats.latest_word);
        if stats.kphrases == 0 {
            println!(
                "{} phrases ({} workers)  latest: {}",
                stats.nphrases * self.total_workers,
                self.total_workers,
                latest
            );
        } else {
            println!(
                "{}k phrases ({} workers)  latest: {}",
                stats.kphrases, self.total_workers, latest
            );
        }
    }
}

/// Runs one worker's main loop to completion.
pub fn run_worker(
    id: usize,
    total: usize,
    descriptor: Option<&SourceDescriptor>,
    charmap_override: Option<&str>,
    backend: Arc<dyn Backend>,
    shared: Arc<SharedState>,
) -> WorkerOutcome {
    let source_result = match descriptor {
        Some(d) => Source::build(d, id, total, charmap_override),
        None => Source::build_default(id, total, charmap_override),
    };
    let mut source = match source_result {
        Ok(s) => s,
        Err(e) => {
            error!(worker = id, error = %e, "source initialization failed");
            return WorkerOutcome::Failure;
        }
    };

    let mut buf: Vec<Vec<u8>> = (0..WORD_BUFFER_SIZE)
        .map(|_| Vec::with_capacity(crate::source::MAX_WORD_LENGTH + 1))
        .collect();

    if let Err(e) = backend.worker_init(id) {
        error!(worker = id, error = %e, "backend worker_init failed");
        return WorkerOutcome::Failure;
    }

    loop {
        let n = source.get_words(&mut buf);
        if n == 0 || shared.should_stop() {
            break;
        }

        for candidate in &buf[..n] {
            match backend.try_phrase(id, candidate) {
                TryOutcome::Completed => {
                    shared.broadcast_terminate();
                    backend.worker_finish(id);
                    return WorkerOutcome::Success;
                }
                TryOutcome::Fail(msg) => {
                    warn!(worker = id, backend = backend.name(), error = %msg, "candidate attempt failed");
                }
                TryOutcome::Continue => {}
            }
            shared.record_candidate(id, candidate);
        }
    }

    backend.worker_finish(id);
    WorkerOutcome::Completed
}
