pub mod config;
pub mod metrics;
pub mod pipeline;
pub mod retry;

pub use config::{AppConfig, OperationMode};
pub use pipeline::{GraphBuild, Pipeline};

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. `RUST_LOG` picks the filter
/// (default `info`); `LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").map(|v| v.eq_ignore_ascii_case("json")).unwrap_or(false);

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
