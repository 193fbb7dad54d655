// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Global logger instance and output backends.
//!
//! A thread-safe singleton logger with pluggable outputs, lazily
//! initialized so that an application which never calls
//! [`init_logger`] pays nothing beyond a `OnceLock` check.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, OnceLock};

static LOGGER: OnceLock<Arc<Mutex<GlobalLogger>>> = OnceLock::new();

/// Log level enumeration for filtering and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Debug: detailed development information
    Debug = 0,
    /// Info: general information about normal operation
    Info = 1,
    /// Warning: potentially harmful situations
    Warning = 2,
    /// Error: error conditions
    Error = 3,
}

impl LogLevel {
    /// Returns the string representation of the log level.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO ",
            Self::Warning => "WARN ",
            Self::Error => "ERROR",
        }
    }

    /// Map a numeric verbosity (from the environment) to a level filter.
    ///
    /// `0` keeps the default (`Info`), positive values open up `Debug`,
    /// negative values restrict to warnings and errors.
    pub fn from_verbosity(verbosity: i32) -> Self {
        if verbosity > 0 {
            Self::Debug
        } else if verbosity < 0 {
            Self::Warning
        } else {
            Self::Info
        }
    }
}

/// Output destination trait for log messages.
///
/// Implementations must be thread-safe and handle errors gracefully.
pub trait Output: Send + Sync {
    /// Write a formatted log message to the output.
    fn write(&self, level: LogLevel, message: &str) -> io::Result<()>;

    /// Flush any buffered output.
    fn flush(&self) -> io::Result<()>;
}

/// Console output: writes to stderr with a level prefix.
pub struct ConsoleOutput {
    level_filter: LogLevel,
}

impl ConsoleOutput {
    /// Create a new console output with the specified minimum level.
    pub fn new(level_filter: LogLevel) -> Self {
        Self { level_filter }
    }
}

impl Output for ConsoleOutput {
    fn write(&self, level: LogLevel, message: &str) -> io::Result<()> {
        if level < self.level_filter {
            return Ok(());
        }
        eprint!("[{}] {}\n", level.as_str(), message);
        Ok(())
    }

    fn flush(&self) -> io::Result<()> {
        io::stderr().flush()
    }
}

/// File output: appends log messages to a file with a level prefix.
///
/// Thread-safe via internal mutex protecting the file handle.
pub struct FileOutput {
    file: Mutex<std::fs::File>,
    level_filter: LogLevel,
}

impl FileOutput {
    /// Create a new file output, creating/truncating the file at `path`.
    ///
    /// # Errors
    /// Returns `Err(io::Error)` if the file cannot be created.
    pub fn new(path: &str, level_filter: LogLevel) -> io::Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            file: Mutex::new(file),
            level_filter,
        })
    }
}

impl Output for FileOutput {
    fn write(&self, level: LogLevel, message: &str) -> io::Result<()> {
        if level < self.level_filter {
            return Ok(());
        }
        let mut file = self
            .file
            .lock()
            .map_err(|_| io::Error::other("file output mutex poisoned"))?;
        file.write_all(format!("[{}] {}\n", level.as_str(), message).as_bytes())
    }

    fn flush(&self) -> io::Result<()> {
        self.file
            .lock()
            .map_err(|_| io::Error::other("file output mutex poisoned"))?
            .flush()
    }
}

/// Global logger state: active output plus the global level filter.
struct GlobalLogger {
    output: Option<Arc<dyn Output>>,
    level_filter: LogLevel,
}

impl GlobalLogger {
    fn log(&self, level: LogLevel, message: &str) -> io::Result<()> {
        if level < self.level_filter {
            return Ok(());
        }
        if let Some(ref output) = self.output {
            output.write(level, message)?;
        }
        Ok(())
    }
}

/// Initialize the global logger with the given output.
///
/// Only the first call takes effect; subsequent calls are ignored.
/// Call this early, before any logging macro fires.
pub fn init_logger(output: Arc<dyn Output>, level: LogLevel) {
    let _ = LOGGER.get_or_init(|| {
        Arc::new(Mutex::new(GlobalLogger {
            output: Some(output),
            level_filter: level,
        }))
    });
}

/// Internal: execute a log operation with the global logger.
///
/// If the logger is not initialized, this is a silent no-op.
/// Called by the logging macros.
#[inline]
pub(crate) fn log_message(level: LogLevel, message: &str) -> io::Result<()> {
    match LOGGER.get() {
        Some(logger) => {
            let guard = logger
                .lock()
                .map_err(|_| io::Error::other("global logger mutex poisoned"))?;
            guard.log(level, message)
        }
        None => Ok(()),
    }
}

/// Flush the global logger's output. Safe to call before initialization.
pub fn flush_logger() -> io::Result<()> {
    match LOGGER.get() {
        Some(logger) => {
            let guard = logger
                .lock()
                .map_err(|_| io::Error::other("global logger mutex poisoned"))?;
            match guard.output {
                Some(ref output) => output.flush(),
                None => Ok(()),
            }
        }
        None => Ok(()),
    }
}
