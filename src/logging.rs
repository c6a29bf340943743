//! Logging configuration and initialization

use tracing::{debug, trace};

/// Filter directive for a verbosity level
pub fn log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info,analytics_result=debug",
        2 => "debug,analytics_result=trace",
        _ => "trace",
    }
}

/// Install a stderr fmt subscriber. Later calls are no-ops.
pub fn init_logging(verbose: u8) {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(log_level(verbose))
        .with_writer(std::io::stderr)
        .with_target(verbose >= 2) // Show target module for -vv and above
        .with_thread_ids(verbose >= 3)
        .with_line_number(verbose >= 3)
        .try_init()
        .is_ok();

    if installed {
        debug!("analytics-result started with verbosity level: {}", verbose);
        trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());
    }
}
