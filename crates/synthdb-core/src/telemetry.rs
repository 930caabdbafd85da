//! Log output for the `synthdb` binary.
//!
//! Everything goes to stderr: `check` prints its report and `augment` its
//! summary table on stdout, and both are piped into other tools.
//!
//! Closing a `synthdb.db` span logs its busy/idle time, which gives one
//! timing line per augmentation run and per quality evaluation. The HTTP
//! stack under the oracle client is held at `warn` unless `RUST_LOG` says
//! otherwise; at `debug` it logs every pooled connection.

use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Crates whose logs stay at `warn` under the default filter.
const QUIET_DEPENDENCIES: &[&str] = &["hyper", "hyper_util", "h2", "reqwest", "rustls"];

/// Filter directives used when `RUST_LOG` is unset or unparsable.
pub fn default_directives(level: Level) -> String {
    let mut directives = level.as_str().to_ascii_lowercase();
    for krate in QUIET_DEPENDENCIES {
        directives.push_str(&format!(",{krate}=warn"));
    }
    directives
}

fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(level)))
}

/// Install the global subscriber. `json` switches to one JSON object per line
/// with the enclosing dbid span attached.
///
/// Only the first call in a process has any effect.
pub fn init_tracing(json: bool, level: Level) {
    let registry = tracing_subscriber::registry().with(env_filter(level));

    if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_span_events(FmtSpan::CLOSE)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .ok();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_span_events(FmtSpan::CLOSE)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .ok();
    }
}
