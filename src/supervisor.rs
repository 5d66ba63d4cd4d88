//! Supervisor: spawns the worker threads, installs signal handlers, and
//! waits for completion or termination.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;

use signal_hook::consts::{SIGINT, SIGTERM, SIGUSR1};
use signal_hook::iterator::Signals;
use tracing::{error, info};

use crate::backend::Backend;
use crate::error::EngineResult;
use crate::source::SourceDescriptor;
use crate::worker::{run_worker, SharedState, WorkerOutcome};

/// Aggregate result of running every worker to completion.
pub struct RunReport {
    pub outcomes: Vec<WorkerOutcome>,
}

impl RunReport {
    /// True if any worker found a passphrase.
    pub fn solved(&self) -> bool {
        self.outcomes.iter().any(|o| *o == WorkerOutcome::Success)
    }

    /// True if every worker that started came up cleanly (none hit a
    /// resource failure during initialization).
    pub fn all_workers_initialized(&self) -> bool {
        self.outcomes.iter().all(|o| *o != WorkerOutcome::Failure)
    }
}

/// Spawns `total` workers against `descriptor`/`backend`, installs signal
/// handling for cooperative termination and stats requests, and blocks
/// until every worker has exited.
pub fn run(
    total: usize,
    descriptor: Option<SourceDescriptor>,
    charmap_override: Option<String>,
    backend: Arc<dyn Backend>,
) -> EngineResult<RunReport> {
    let total = total.max(1);
    backend.init(total)?;

    let shared = SharedState::new(total);

    let signals_shared = Arc::clone(&shared);
    let mut signals = Signals::new([SIGINT, SIGTERM, SIGUSR1]).map_err(|e| {
        crate::error::EngineError::resource("installing signal handlers", e)
    })?;
    let signal_thread = thread::spawn(move || {
        for sig in signals.forever() {
            match sig {
                SIGINT | SIGTERM => {
                    info!("termination signal received, stopping workers");
                    signals_shared.terminate.store(signals_shared.total_workers, Ordering::SeqCst);
                    break;
                }
                SIGUSR1 => signals_shared.print_stats(),
                _ => {}
            }
        }
    });

    let mut handles = Vec::with_capacity(total);
    for id in 0..total {
        let backend = Arc::clone(&backend);
        let shared = Arc::clone(&shared);
        let descriptor = descriptor.clone();
        let charmap_override = charmap_override.clone();
        handles.push(thread::spawn(move || {
            run_worker(
                id,
                total,
                descriptor.as_ref(),
                charmap_override.as_deref(),
                backend,
                shared,
            )
        }));
    }

    let mut outcomes = Vec::with_capacity(total);
    for handle in handles {
        match handle.join() {
            Ok(outcome) => outcomes.push(outcome),
            Err(_) => {
                error!("a worker thread panicked");
                outcomes.push(WorkerOutcome::Failure);
            }
        }
    }

    // The signal thread blocks forever on `signals.forever()`; there is no
    // portable way to unblock it once every worker has already exited on
    // its own, so it is left detached rather than joined.
    drop(signal_thread);

    backend.finish();

    Ok(RunReport { outcomes })
}
