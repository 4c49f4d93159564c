//! Logging shorthands shared by every crate in the workspace.
//!
//! They forward to `tracing`; the front end decides how events are rendered.

#[doc(hidden)]
pub use tracing as __tracing;

/// Marks a positive outcome. Rendered like `info`, but filterable by target.
#[macro_export]
macro_rules! success {
    ($($arg:tt)*) => {
        $crate::logging::__tracing::info!(target: "portr::success", $($arg)*)
    };
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::logging::__tracing::info!($($arg)*)
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::logging::__tracing::warn!($($arg)*)
    };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::logging::__tracing::error!($($arg)*)
    };
}
