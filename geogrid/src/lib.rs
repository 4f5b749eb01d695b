//! Local search visibility tracking across a geographic grid.
//!
//! A scan geocodes a business address, lays a grid of sample points around it, and at every point
//! checks where the business ranks for each keyword in Google's organic results, the local pack,
//! and Google Maps.

use tracing_subscriber::EnvFilter;

pub mod geo;
pub mod grid;
pub mod maps;
pub mod report;
pub mod scan;
pub mod serp;
pub mod store;
pub mod summary;

/// Install a global `tracing` subscriber.
///
/// Filtering is controlled by `RUST_LOG` and defaults to `info`. Calling this more than once is
/// harmless; only the first call installs a subscriber.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}

/// The directory containing the fixture data shipped with this repository.
#[cfg(any(test, feature = "testing"))]
pub fn fixtures_dir() -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .map(|workspace| workspace.join("fixtures"))
        .unwrap_or_else(|| "fixtures".into())
}
