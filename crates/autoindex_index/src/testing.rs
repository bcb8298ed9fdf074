//! Test helpers shared by the unit tests.

use autoindex_logging::Logger;
use parking_lot::Mutex;
use std::fmt;

/// Keeps every line as `[LEVEL] message`.
#[derive(Default)]
pub(crate) struct RecordingLogger {
    lines: Mutex<Vec<String>>,
}

impl RecordingLogger {
    fn push(&self, level: &str, args: fmt::Arguments<'_>) {
        self.lines.lock().push(format!("[{}] {}", level, args));
    }

    pub(crate) fn contains(&self, needle: &str) -> bool {
        self.lines.lock().iter().any(|line| line.contains(needle))
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }
}

impl Logger for RecordingLogger {
    fn debug(&self, args: fmt::Arguments<'_>) {
        self.push("DEBUG", args);
    }
    fn info(&self, args: fmt::Arguments<'_>) {
        self.push("INFO", args);
    }
    fn warn(&self, args: fmt::Arguments<'_>) {
        self.push("WARN", args);
    }
    fn error(&self, args: fmt::Arguments<'_>) {
        self.push("ERROR", args);
    }
}
