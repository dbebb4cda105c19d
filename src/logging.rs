//! Explicit, named logger handed to each root.
//!
//! This module provides a logger that outputs to multiple backends:
//! - CLI/stderr/file via tracing
//! - an optional in-memory record buffer that embedding code can inspect
//!
//! There is no process-wide logger registry; every root owns a `Logger`.

use serde_json::Value;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicU8, Ordering},
};
use tracing::Level;

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

/// Atomic level filter shared between clones of a logger.
///
/// The level is stored as a u8: 0=Debug, 1=Info, 2=Warning, 3=Error
pub struct LogLevelFilter(AtomicU8);

impl LogLevelFilter {
    /// Create a new filter with the given minimum level.
    pub fn new(level: LogLevel) -> Self {
        Self(AtomicU8::new(level_to_u8(level)))
    }

    /// Get the current minimum level.
    pub fn get(&self) -> LogLevel {
        u8_to_level(self.0.load(Ordering::Relaxed))
    }

    /// Set the minimum level.
    pub fn set(&self, level: LogLevel) {
        self.0.store(level_to_u8(level), Ordering::Relaxed);
    }

    /// Check if a message at the given level should be logged.
    pub fn should_log(&self, level: LogLevel) -> bool {
        level_to_u8(level) >= self.0.load(Ordering::Relaxed)
    }
}

impl Default for LogLevelFilter {
    fn default() -> Self {
        Self::new(LogLevel::Debug)
    }
}

fn level_to_u8(level: LogLevel) -> u8 {
    match level {
        LogLevel::Debug => 0,
        LogLevel::Info => 1,
        LogLevel::Warning => 2,
        LogLevel::Error => 3,
    }
}

fn u8_to_level(val: u8) -> LogLevel {
    match val {
        0 => LogLevel::Debug,
        1 => LogLevel::Info,
        2 => LogLevel::Warning,
        3 => LogLevel::Error,
        _ => LogLevel::Debug,
    }
}

/// Convert a LogLevel to a tracing Level.
pub fn log_level_to_tracing(level: LogLevel) -> Level {
    match level {
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Info => Level::INFO,
        LogLevel::Warning => Level::WARN,
        LogLevel::Error => Level::ERROR,
    }
}

/// One captured log line.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub level: LogLevel,
    pub logger: Option<String>,
    pub message: String,
    pub data: Option<Value>,
}

/// Logger that outputs to multiple backends.
///
/// Outputs to:
/// 1. tracing (stderr/file) - always
/// 2. the capture buffer - if capture is enabled
#[derive(Clone)]
pub struct Logger {
    /// Minimum level to log.
    level_filter: Arc<LogLevelFilter>,
    /// Logger name/category.
    name: Option<String>,
    /// Captured records, shared between clones.
    capture: Option<Arc<Mutex<Vec<LogRecord>>>>,
}

impl Logger {
    /// Create a new logger with default settings.
    pub fn new() -> Self {
        Self {
            level_filter: Arc::new(LogLevelFilter::default()),
            name: None,
            capture: None,
        }
    }

    /// Set the level filter.
    pub fn with_level_filter(mut self, filter: Arc<LogLevelFilter>) -> Self {
        self.level_filter = filter;
        self
    }

    /// Set the logger name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Keep every emitted record in memory as well.
    pub fn with_capture(mut self) -> Self {
        self.capture = Some(Arc::new(Mutex::new(Vec::new())));
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn level_filter(&self) -> &Arc<LogLevelFilter> {
        &self.level_filter
    }

    /// Captured records, oldest first. Empty when capture is off.
    pub fn records(&self) -> Vec<LogRecord> {
        match self.capture {
            Some(ref buffer) => buffer.lock().map(|r| r.clone()).unwrap_or_default(),
            None => Vec::new(),
        }
    }

    /// Drop all captured records.
    pub fn clear_records(&self) {
        if let Some(ref buffer) = self.capture
            && let Ok(mut records) = buffer.lock()
        {
            records.clear();
        }
    }

    /// Log a message to all configured endpoints.
    pub fn log(&self, level: LogLevel, message: &str, data: Option<Value>) {
        if !self.level_filter.should_log(level) {
            return;
        }

        // 1. Output to tracing (stderr/file)
        let name = self.name.as_deref().unwrap_or("hotmarkup");
        match log_level_to_tracing(level) {
            Level::ERROR => tracing::error!(logger = %name, "{}", message),
            Level::WARN => tracing::warn!(logger = %name, "{}", message),
            Level::INFO => tracing::info!(logger = %name, "{}", message),
            Level::DEBUG => tracing::debug!(logger = %name, "{}", message),
            Level::TRACE => tracing::trace!(logger = %name, "{}", message),
        }

        // 2. Output to the capture buffer; a poisoned buffer is skipped
        if let Some(ref buffer) = self.capture
            && let Ok(mut records) = buffer.lock()
        {
            records.push(LogRecord {
                level,
                logger: self.name.clone(),
                message: message.to_string(),
                data,
            });
        }
    }

    /// Log a message with structured data.
    pub fn log_with_data(&self, level: LogLevel, message: &str, data: Value) {
        self.log(level, message, Some(data));
    }

    /// Log a debug message.
    pub fn debug(&self, msg: &str) {
        self.log(LogLevel::Debug, msg, None);
    }

    /// Log an info message.
    pub fn info(&self, msg: &str) {
        self.log(LogLevel::Info, msg, None);
    }

    /// Log a warning message.
    pub fn warning(&self, msg: &str) {
        self.log(LogLevel::Warning, msg, None);
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        self.log(LogLevel::Error, msg, None);
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("level", &self.level_filter.get())
            .field("capture", &self.capture.is_some())
            .finish()
    }
}
