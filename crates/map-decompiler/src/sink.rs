//! Injected logging for decompilation jobs.
//!
//! The decompilers never talk to a global logger directly. They write through
//! a [`LogSink`] handed in by the caller, which decides whether events go to
//! the `log` facade, a per-job transcript, or both.

use std::fmt;
use std::sync::Mutex;

use log::Level;

/// Destination for decompiler log events.
pub trait LogSink {
    /// Records one event.
    fn log(&self, level: Level, args: fmt::Arguments<'_>);

    fn error(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Error, args);
    }

    fn warn(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Warn, args);
    }

    fn info(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Info, args);
    }

    fn debug(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Debug, args);
    }

    fn trace(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Trace, args);
    }
}

/// Forwards events to the global [`log`] logger.
#[derive(Debug, Clone)]
pub struct LogForwarder {
    target: String,
}

impl LogForwarder {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

impl Default for LogForwarder {
    fn default() -> Self {
        Self::new(module_path!().split("::").next().unwrap_or("map_decompiler"))
    }
}

impl LogSink for LogForwarder {
    fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        log::logger().log(
            &log::Record::builder()
                .level(level)
                .target(&self.target)
                .args(args)
                .build(),
        );
    }
}

/// Keeps every event in memory, in order.
///
/// Useful as a per-job transcript a front end can show once the job is done.
#[derive(Debug, Default)]
pub struct Transcript {
    lines: Mutex<Vec<(Level, String)>>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded lines.
    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }

    /// Returns `true` if any line at `level` contains `needle`.
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.lines()
            .iter()
            .any(|(l, line)| *l == level && line.contains(needle))
    }
}

impl LogSink for Transcript {
    fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push((level, args.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_keeps_order_and_levels() {
        let transcript = Transcript::new();
        transcript.info(format_args!("first {}", 1));
        transcript.warn(format_args!("second"));

        let lines = transcript.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], (Level::Info, "first 1".to_string()));
        assert_eq!(lines[1].0, Level::Warn);
        assert!(transcript.contains(Level::Warn, "second"));
        assert!(!transcript.contains(Level::Error, "second"));
    }

    #[test]
    fn forwarder_defaults_to_crate_target() {
        let forwarder = LogForwarder::default();
        assert_eq!(forwarder.target, "map_decompiler");
        // No logger installed; forwarding must still be a no-op rather than panic.
        forwarder.info(format_args!("ignored"));
    }
}
