// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Calibration Logging
//!
//! The `log_*!` macro family used across the crate. With the `log` feature
//! (on by default) every record goes to the `log` facade under the
//! [`LOG_TARGET`] target, so the logger installed by the kernel decides
//! where it ends up. Without the feature the macros compile away; their
//! arguments are still type-checked.
//!
//! # Usage
//!
//! ```ignore
//! use crate::{log_debug, log_warn};
//!
//! log_debug!("attempt {}: raw bus {} Hz", attempt, raw_bus_freq);
//! log_warn!("no convergence after {} attempts", attempts);
//! ```

/// Target attached to every record emitted by this crate
pub const LOG_TARGET: &str = "clockspeed";

#[doc(hidden)]
#[cfg(feature = "log")]
pub use log as __log;

#[doc(hidden)]
#[cfg(feature = "log")]
#[macro_export]
macro_rules! __log_record {
    ($level:ident, $($arg:tt)*) => {
        $crate::debug::__log::log!(
            target: $crate::debug::LOG_TARGET,
            $crate::debug::__log::Level::$level,
            $($arg)*
        )
    };
}

#[doc(hidden)]
#[cfg(not(feature = "log"))]
#[macro_export]
macro_rules! __log_record {
    ($level:ident, $($arg:tt)*) => {{
        let _ = ::core::format_args!($($arg)*);
    }};
}

/// Log a trace message
#[macro_export]
macro_rules! log_trace {
    ($($arg:tt)*) => {
        $crate::__log_record!(Trace, $($arg)*)
    };
}

/// Log a debug message
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::__log_record!(Debug, $($arg)*)
    };
}

/// Log an info message
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::__log_record!(Info, $($arg)*)
    };
}

/// Log a warning message
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::__log_record!(Warn, $($arg)*)
    };
}

/// Log an error message
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::__log_record!(Error, $($arg)*)
    };
}
