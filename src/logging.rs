use std::env;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Install the stderr subscriber.
///
/// `SMARTSORT_LOG` takes precedence; otherwise `verbose` selects debug over
/// info for the smartsort crates.
pub fn init_logger(verbose: bool) {
    let default = if verbose {
        "smartsort=debug,smartsort_engine=debug,smartsort_scan=debug,smartsort_analyze=debug,smartsort_cache=debug"
    } else {
        "info"
    };
    let filter = env::var("SMARTSORT_LOG").unwrap_or_else(|_| default.to_string());
    let filter_layer = EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .with(filter_layer)
        .init();
}
