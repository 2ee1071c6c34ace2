//! Logging setup.

use tracing_subscriber::{Layer, filter::Targets, layer::SubscriberExt, util::SubscriberInitExt};

/// Crates whose events are shown at debug level when debugging is enabled.
const DEBUG_TARGETS: &[&str] = &["ddp_validator", "ddp_validator_harness"];

/// Installs the global tracing subscriber, writing to standard error.
///
/// Informational events are always shown; debug events from this tool are shown only
/// if `debug` is set.
pub fn init(debug: bool) {
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .with_filter(compose_filter(debug));

    if tracing_subscriber::registry().with(layer).try_init().is_err() {
        // Something went wrong; proceed on anyway but complain audibly.
        eprintln!("warning: failed to initialize tracing.");
    }
}

fn compose_filter(debug: bool) -> Targets {
    let filter = Targets::new().with_default(tracing_subscriber::filter::LevelFilter::INFO);

    if debug {
        filter.with_targets(
            DEBUG_TARGETS
                .iter()
                .map(|target| (*target, tracing::Level::DEBUG)),
        )
    } else {
        filter
    }
}
