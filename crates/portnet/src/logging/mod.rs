// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Compile-time configurable logging system.
//!
//! Four severity levels are provided as crate macros:
//! - `debug!()` - development/debugging information
//! - `info!()` - general operational information
//! - `warn!()` - warning conditions
//! - `error!()` - error conditions
//!
//! When the `logging` Cargo feature is disabled all macros expand to empty
//! expressions with zero runtime overhead. Operator-facing diagnostics from
//! the arbitration engine (the "Success:"/"Failure:" lines) go through
//! these macros and are additionally suppressed per-operation by
//! [`ContactStyle::quiet`](crate::ContactStyle).
//!
//! ## Example
//!
//! ```ignore
//! use portnet::logging::{init_logger, ConsoleOutput, LogLevel};
//! use std::sync::Arc;
//!
//! init_logger(Arc::new(ConsoleOutput::new(LogLevel::Debug)), LogLevel::Debug);
//! info!("name service at {}", addr);
//! ```

#[cfg(feature = "logging")]
pub mod logger;

#[cfg(feature = "logging")]
pub use logger::{flush_logger, init_logger, ConsoleOutput, FileOutput, LogLevel, Output};

/// Debug-level log message. Formatted the same as `println!()`.
#[macro_export]
#[cfg(feature = "logging")]
macro_rules! debug {
    ($($arg:tt)*) => {
        let _ = $crate::logging::logger::log_message(
            $crate::logging::LogLevel::Debug,
            &format!($($arg)*),
        );
    };
}

/// Info-level log message. Formatted the same as `println!()`.
#[macro_export]
#[cfg(feature = "logging")]
macro_rules! info {
    ($($arg:tt)*) => {
        let _ = $crate::logging::logger::log_message(
            $crate::logging::LogLevel::Info,
            &format!($($arg)*),
        );
    };
}

/// Warning-level log message. Formatted the same as `println!()`.
#[macro_export]
#[cfg(feature = "logging")]
macro_rules! warn {
    ($($arg:tt)*) => {
        let _ = $crate::logging::logger::log_message(
            $crate::logging::LogLevel::Warning,
            &format!($($arg)*),
        );
    };
}

/// Error-level log message. Formatted the same as `println!()`.
#[macro_export]
#[cfg(feature = "logging")]
macro_rules! error {
    ($($arg:tt)*) => {
        let _ = $crate::logging::logger::log_message(
            $crate::logging::LogLevel::Error,
            &format!($($arg)*),
        );
    };
}

/// No-op debug macro (when logging feature disabled).
#[macro_export]
#[cfg(not(feature = "logging"))]
macro_rules! debug {
    ($($arg:tt)*) => {};
}

/// No-op info macro (when logging feature disabled).
#[macro_export]
#[cfg(not(feature = "logging"))]
macro_rules! info {
    ($($arg:tt)*) => {};
}

/// No-op warn macro (when logging feature disabled).
#[macro_export]
#[cfg(not(feature = "logging"))]
macro_rules! warn {
    ($($arg:tt)*) => {};
}

/// No-op error macro (when logging feature disabled).
#[macro_export]
#[cfg(not(feature = "logging"))]
macro_rules! error {
    ($($arg:tt)*) => {};
}
