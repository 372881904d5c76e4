// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Logging output backends (console and file).
//!
//! Outputs format one full line per message and hand it to the sink in a
//! single write, so concurrent writers never interleave within a line.

use parking_lot::Mutex;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

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
}

/// Output destination trait for log messages.
///
/// Implementations must be thread-safe and handle errors gracefully.
pub trait Output: Send + Sync {
    /// Write one formatted log message to the output.
    fn write(&self, level: LogLevel, message: &str) -> io::Result<()>;

    /// Flush any buffered output.
    fn flush(&self) -> io::Result<()>;
}

/// Console output writing line-buffered to stderr.
pub struct ConsoleOutput {
    level_filter: LogLevel,
    lock: Mutex<()>,
}

impl ConsoleOutput {
    /// Create a new console output with the specified minimum level.
    pub fn new(level_filter: LogLevel) -> Self {
        Self {
            level_filter,
            lock: Mutex::new(()),
        }
    }
}

impl Output for ConsoleOutput {
    fn write(&self, level: LogLevel, message: &str) -> io::Result<()> {
        if level < self.level_filter {
            return Ok(());
        }
        let line = format!("[{}] {}\n", level.as_str(), message);
        let _guard = self.lock.lock();
        io::stderr().write_all(line.as_bytes())
    }

    fn flush(&self) -> io::Result<()> {
        io::stderr().flush()
    }
}

/// File output appending one line per message.
pub struct FileOutput {
    file: Mutex<std::fs::File>,
    level_filter: LogLevel,
}

impl FileOutput {
    /// Create a new file output, truncating the file at the given path.
    pub fn new(path: &Path, level_filter: LogLevel) -> io::Result<Self> {
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
        let line = format!("[{}] {}\n", level.as_str(), message);
        self.file.lock().write_all(line.as_bytes())
    }

    fn flush(&self) -> io::Result<()> {
        self.file.lock().flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Error);
    }

    #[test]
    fn log_level_str() {
        assert_eq!(LogLevel::Debug.as_str(), "DEBUG");
        assert_eq!(LogLevel::Info.as_str(), "INFO ");
        assert_eq!(LogLevel::Warning.as_str(), "WARN ");
        assert_eq!(LogLevel::Error.as_str(), "ERROR");
    }

    #[test]
    fn console_output_write_and_flush() {
        let output = ConsoleOutput::new(LogLevel::Info);
        assert!(output.write(LogLevel::Error, "test").is_ok());
        assert!(output.write(LogLevel::Debug, "filtered").is_ok());
        assert!(output.flush().is_ok());
    }

    #[test]
    fn file_output_write() {
        let path = std::env::temp_dir().join("driveline_logging_output_test.log");
        let output = FileOutput::new(&path, LogLevel::Debug).unwrap();
        assert!(output.write(LogLevel::Info, "test message").is_ok());
        assert!(output.flush().is_ok());
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("test message"));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn file_output_level_filter() {
        let path = std::env::temp_dir().join("driveline_logging_filter_test.log");
        let output = FileOutput::new(&path, LogLevel::Warning).unwrap();
        output.write(LogLevel::Debug, "debug").unwrap();
        output.write(LogLevel::Warning, "warning").unwrap();
        output.flush().unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(!contents.contains("debug"));
        assert!(contents.contains("warning"));
        let _ = std::fs::remove_file(&path);
    }
}
