//! Log output setup for bridge binaries.
//!
//! The library only emits `tracing` events; installing a subscriber is up to
//! the binary. `RUST_LOG` overrides the default filter.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "gazebo_sitl=info,gazebo_bridge=info";

/// Install a formatted subscriber on stderr.
///
/// `verbosity` raises the default filter: 0 keeps [`DEFAULT_FILTER`], 1 is
/// debug and 2 or more is trace. Calling it twice is harmless.
pub fn init_tracing(verbosity: u8) {
    let default = match verbosity {
        0 => DEFAULT_FILTER.to_string(),
        1 => "gazebo_sitl=debug,gazebo_bridge=debug".to_string(),
        _ => "gazebo_sitl=trace,gazebo_bridge=trace".to_string(),
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_timer(fmt::time::uptime()),
        )
        .with(filter)
        .try_init();
}
