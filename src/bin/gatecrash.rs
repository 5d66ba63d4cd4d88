//! CLI entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use gatecrash::backends::BackendRegistry;
use gatecrash::cli::Cli;
use gatecrash::error::EngineError;
use gatecrash::supervisor;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Ok(plugins) = std::env::var("PD_PLUGINS") {
        tracing::debug!(%plugins, "PD_PLUGINS set; dynamic backend loading is not implemented");
    }

    let registry = BackendRegistry::with_defaults();

    let (config, backend) = match cli.resolve(&registry) {
        Ok(resolved) => resolved,
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(exit_code(&e));
        }
    };

    let charmap_override = std::env::var("PD_CHARMAP").ok();

    let report = match supervisor::run(
        config.worker_count,
        config.source,
        charmap_override,
        backend,
    ) {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(exit_code(&e));
        }
    };

    if !report.all_workers_initialized() {
        std::process::exit(74);
    }

    // Exhaustion without a match is a clean run, not a CLI failure.
    std::process::exit(0);
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .init();
}

fn exit_code(err: &EngineError) -> i32 {
    match err {
        EngineError::Config(_) => 64,
        EngineError::Resource { .. } => 74,
        EngineError::Protocol(_) => 76,
        EngineError::Logic(_) => 70,
    }
}
