//! Shared test support for the `dagbelief-*` crates: graph-literal builders,
//! conversions between the plain-`f64` maps the oracles work with and the
//! engine's `Prob`-keyed maps, and the two reference oracles in
//! [`oracle`]. Plays the role `csvizmo-test` plays for the teacher's CLI
//! crates, minus anything CLI-specific (there is no binary here to drive).

pub mod builders;
pub mod oracle;

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Install a `tracing-subscriber` filtered by `RUST_LOG` (default `warn`),
/// so `cargo test -- --nocapture` surfaces the engine's `debug!`/`trace!`
/// spans. Safe to call from every test that wants logging; only the first
/// call takes effect.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    });
}
