//! Tracing infrastructure for bbq.
//!
//! Enabled by the default `tracing` feature. All trace macros become no-ops
//! when the feature is disabled.

/// Initialize the tracing subscriber with timestamps and thread names.
///
/// The filter is read from `RUST_LOG` and defaults to `bbq=info`.
/// Does nothing if the `tracing` feature is not enabled.
#[cfg(feature = "tracing")]
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bbq=info"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(true)
                .with_thread_names(true)
                .with_timer(fmt::time::uptime()),
        )
        .with(filter)
        .init();
}

#[cfg(not(feature = "tracing"))]
pub const fn init_tracing() {}

#[cfg(feature = "tracing")]
pub(crate) use tracing::{debug, info, trace, warn};

// When tracing is disabled, format-style calls still borrow their arguments
// so that values only logged do not trigger unused warnings. Field-style
// calls are dropped.
#[cfg(not(feature = "tracing"))]
macro_rules! trace_noop {
    ($fmt:literal $(, $arg:expr)*) => {{ $(let _ = &$arg;)* }};
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
macro_rules! debug_noop {
    ($fmt:literal $(, $arg:expr)*) => {{ $(let _ = &$arg;)* }};
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
macro_rules! info_noop {
    ($fmt:literal $(, $arg:expr)*) => {{ $(let _ = &$arg;)* }};
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
macro_rules! warn_noop {
    ($fmt:literal $(, $arg:expr)*) => {{ $(let _ = &$arg;)* }};
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
pub(crate) use debug_noop as debug;
#[cfg(not(feature = "tracing"))]
pub(crate) use info_noop as info;
#[cfg(not(feature = "tracing"))]
pub(crate) use trace_noop as trace;
#[cfg(not(feature = "tracing"))]
pub(crate) use warn_noop as warn;
