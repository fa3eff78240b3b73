//! Crate-internal logging macros.
//!
//! With the `tracing` feature every macro forwards to the matching `tracing` macro under the
//! `transfer_scanner` target. Without it the arguments are evaluated by reference and dropped.

#[cfg(feature = "tracing")]
#[allow(unused_macros)]
macro_rules! error {
    ($($arg:tt)*) => { tracing::error!(target: "transfer_scanner", $($arg)*) };
}

#[cfg(feature = "tracing")]
#[allow(unused_macros)]
macro_rules! warn {
    ($($arg:tt)*) => { tracing::warn!(target: "transfer_scanner", $($arg)*) };
}

#[cfg(feature = "tracing")]
#[allow(unused_macros)]
macro_rules! info {
    ($($arg:tt)*) => { tracing::info!(target: "transfer_scanner", $($arg)*) };
}

#[cfg(feature = "tracing")]
#[allow(unused_macros)]
macro_rules! debug {
    ($($arg:tt)*) => { tracing::debug!(target: "transfer_scanner", $($arg)*) };
}

#[cfg(feature = "tracing")]
#[allow(unused_macros)]
macro_rules! trace {
    ($($arg:tt)*) => { tracing::trace!(target: "transfer_scanner", $($arg)*) };
}

#[cfg(not(feature = "tracing"))]
#[allow(unused_macros)]
macro_rules! error {
    ($($arg:tt)*) => { $crate::__log_discard!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
#[allow(unused_macros)]
macro_rules! warn {
    ($($arg:tt)*) => { $crate::__log_discard!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
#[allow(unused_macros)]
macro_rules! info {
    ($($arg:tt)*) => { $crate::__log_discard!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
#[allow(unused_macros)]
macro_rules! debug {
    ($($arg:tt)*) => { $crate::__log_discard!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
#[allow(unused_macros)]
macro_rules! trace {
    ($($arg:tt)*) => { $crate::__log_discard!($($arg)*) };
}

#[doc(hidden)]
#[macro_export]
#[cfg(not(feature = "tracing"))]
macro_rules! __log_discard {
    ($field:ident = % $value:expr $(, $($rest:tt)*)?) => {{
        let _ = &$value;
        $($crate::__log_discard!($($rest)*);)?
    }};
    ($field:ident = ? $value:expr $(, $($rest:tt)*)?) => {{
        let _ = &$value;
        $($crate::__log_discard!($($rest)*);)?
    }};
    ($field:ident = $value:expr $(, $($rest:tt)*)?) => {{
        let _ = &$value;
        $($crate::__log_discard!($($rest)*);)?
    }};
    ($lit:literal $(, $arg:expr)* $(,)?) => {{
        $(let _ = &$arg;)*
    }};
    () => {};
}
