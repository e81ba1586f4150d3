//! Line-based output for measurement sessions
//!
//! Everything the bench reports flows through an [`OutputSink`]. Workers,
//! the progress sampler and the endpoint resolver may all write
//! concurrently, so every sink serialises its own writes.

mod formatter;
mod renderer;

pub use formatter::ResultFormatter;
pub use renderer::{PlainRenderer, TerminalRenderer};

use std::io::IsTerminal;
use std::sync::{Arc, Mutex};

/// Destination for status, progress and result lines
pub trait OutputSink: Send + Sync {
    /// Start a new section
    fn header(&self, title: &str);

    /// Informational line
    fn info(&self, line: &str);

    /// Non-fatal problem
    fn warn(&self, line: &str);

    /// Live progress for a running pass. `label` identifies the pass.
    fn progress(&self, label: &str, line: &str);

    /// Final measurement line
    fn result(&self, line: &str);
}

/// Output sink factory choosing between the terminal and plain renderers
pub struct OutputFactory;

impl OutputFactory {
    /// Terminal renderer when stdout is a TTY, plain lines on stderr otherwise
    pub fn create(enable_color: bool) -> Arc<dyn OutputSink> {
        if Self::is_tty() {
            Arc::new(TerminalRenderer::new(enable_color))
        } else {
            Arc::new(PlainRenderer::stderr())
        }
    }

    /// Whether both stdout and stderr are attached to a terminal
    pub fn is_tty() -> bool {
        std::io::stdout().is_terminal() && std::io::stderr().is_terminal()
    }
}

/// Event recorded by [`MemorySink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputEvent {
    Header(String),
    Info(String),
    Warn(String),
    Progress { label: String, line: String },
    Result(String),
}

/// Sink that keeps every event in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<OutputEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events so far
    pub fn events(&self) -> Vec<OutputEvent> {
        self.lock().clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                OutputEvent::Warn(line) => Some(line.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn infos(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                OutputEvent::Info(line) => Some(line.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of progress lines emitted for `label`
    pub fn progress_count(&self, label: &str) -> usize {
        self.lock()
            .iter()
            .filter(|e| matches!(e, OutputEvent::Progress { label: l, .. } if l == label))
            .count()
    }

    fn push(&self, event: OutputEvent) {
        self.lock().push(event);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<OutputEvent>> {
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl OutputSink for MemorySink {
    fn header(&self, title: &str) {
        self.push(OutputEvent::Header(title.to_string()));
    }

    fn info(&self, line: &str) {
        self.push(OutputEvent::Info(line.to_string()));
    }

    fn warn(&self, line: &str) {
        self.push(OutputEvent::Warn(line.to_string()));
    }

    fn progress(&self, label: &str, line: &str) {
        self.push(OutputEvent::Progress {
            label: label.to_string(),
            line: line.to_string(),
        });
    }

    fn result(&self, line: &str) {
        self.push(OutputEvent::Result(line.to_string()));
    }
}
