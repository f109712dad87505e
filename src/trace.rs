//! Feature-gated tracing macros.
//!
//! With the `tracing` feature the macros below are the `tracing` crate's own.
//! Without it they expand to nothing, so instrumented code in the executor,
//! the transformer and the evaluator adapter costs nothing in default builds.
//!
//! ```rust,ignore
//! use crate::trace::{debug, debug_span};
//!
//! let _span = debug_span!("symex", outputs = n).entered();
//! debug!(groups = groups.len(), "partitioned meta output");
//! ```

#[cfg(feature = "tracing")]
pub use tracing::{debug, debug_span, info, info_span, trace, warn, Level, Span};

#[cfg(not(feature = "tracing"))]
mod noop {
    /// Span stand-in.
    pub struct Span;

    impl Span {
        pub fn none() -> Self {
            Span
        }

        pub fn entered(self) -> SpanGuard {
            SpanGuard
        }

        pub fn enter(&self) -> SpanGuard {
            SpanGuard
        }
    }

    pub struct SpanGuard;

    impl Drop for SpanGuard {
        fn drop(&mut self) {}
    }

    #[derive(Clone, Copy, Debug)]
    pub struct Level;

    impl Level {
        pub const TRACE: Level = Level;
        pub const DEBUG: Level = Level;
        pub const INFO: Level = Level;
        pub const WARN: Level = Level;
    }

    #[macro_export]
    macro_rules! trace {
        ($($tt:tt)*) => {};
    }

    #[macro_export]
    macro_rules! debug {
        ($($tt:tt)*) => {};
    }

    #[macro_export]
    macro_rules! info {
        ($($tt:tt)*) => {};
    }

    #[macro_export]
    macro_rules! warn {
        ($($tt:tt)*) => {};
    }

    #[macro_export]
    macro_rules! debug_span {
        ($($tt:tt)*) => {
            $crate::trace::Span::none()
        };
    }

    #[macro_export]
    macro_rules! info_span {
        ($($tt:tt)*) => {
            $crate::trace::Span::none()
        };
    }

    pub use crate::{debug, debug_span, info, info_span, trace, warn};
}

#[cfg(not(feature = "tracing"))]
pub use noop::*;

/// Install a stderr `fmt` subscriber filtered by `RUST_LOG`.
///
/// Falls back to `default_filter` when `RUST_LOG` is unset or invalid.
/// Calling it more than once is harmless.
#[cfg(feature = "tracing")]
pub fn init_subscriber_with(default_filter: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true)
                .with_ansi(false),
        )
        .with(filter)
        .try_init()
        .ok();
}

#[cfg(not(feature = "tracing"))]
pub fn init_subscriber_with(_default_filter: &str) {}

/// Install the subscriber at `info`.
pub fn init_subscriber() {
    init_subscriber_with("info");
}

#[cfg(test)]
#[path = "tests/trace.rs"]
mod tests;
