//! Backend interface: the contract every cracking backend satisfies.
//!
//! Candidate generation (the `source` module) and credential verification
//! (this trait) are deliberately split so the engine core never needs to
//! know anything about a target's protocol.

use std::sync::Arc;

use crate::error::EngineResult;

/// Outcome of one [`Backend::try_phrase`] call.
#[derive(Debug, Clone)]
pub enum TryOutcome {
    /// The candidate was rejected; keep trying the rest of the batch.
    Continue,
    /// The backend has nothing further to try; this worker should exit
    /// successfully.
    Completed,
    /// The candidate itself could not be evaluated (a transient/protocol
    /// failure). Logged and otherwise ignored.
    Fail(String),
}

/// A hook backends call to report a discovered passphrase. Shared across
/// all workers so the callback can serialize output regardless of which
/// worker found the match.
pub type RegisterPassword = Arc<dyn Fn(&str, &[u8]) + Send + Sync>;

/// Contract every cracking backend satisfies. Implementations must be safe
/// to call concurrently from distinct worker threads — the engine hands
/// every worker the same `Arc<dyn Backend>` rather than one instance each,
/// so any mutable state a backend needs must live behind its own
/// thread-safe primitive.
pub trait Backend: Send + Sync {
    /// Plug-in name, used for CLI lookup and log prefixes.
    fn name(&self) -> &str;

    /// Option letters this backend's `accept_option` understands. Letters
    /// that collide with the engine's own (`h`, `v`, `i`, `d`, `w`, `r`) are
    /// dropped by the CLI layer with a warning before this is consulted.
    fn option_letters(&self) -> &[char] {
        &[]
    }

    /// Called once in the supervisor before any worker starts. May validate
    /// configuration, open target files, resolve hostnames.
    fn init(&self, total_workers: usize) -> EngineResult<()>;

    /// Called once per worker, after the worker thread starts but before
    /// the first candidate is tried.
    fn worker_init(&self, id: usize) -> EngineResult<()>;

    /// Tests one candidate. Must not block indefinitely; network backends
    /// should apply a connect timeout.
    fn try_phrase(&self, id: usize, candidate: &[u8]) -> TryOutcome;

    /// Called once per worker on clean shutdown (never called if
    /// `worker_init` or the source never came up).
    fn worker_finish(&self, id: usize);

    /// Called once by the supervisor after every worker has exited.
    fn finish(&self);

    /// Parameter-capture hook for backend-specific CLI options, receiving
    /// the option character and its argument (`None` for a bare flag).
    fn accept_option(&self, opt: char, arg: Option<&str>) -> EngineResult<()>;

    /// Receives the free-form trailing argv the engine did not otherwise
    /// recognize (a target path, a credentials string, ...). Most backends
    /// only ever need a single positional value here.
    fn set_target(&self, args: &[String]) -> EngineResult<()> {
        let _ = args;
        Ok(())
    }
}
