use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Install a formatting subscriber filtered by `RUST_LOG`.
///
/// Does nothing unless `RUST_LOG` is set, and only ever runs once per process,
/// so embedders that install their own subscriber are left alone.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
