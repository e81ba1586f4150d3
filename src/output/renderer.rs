//! Terminal and plain-text renderers

use super::OutputSink;
use colored::*;
use std::io::{self, Write};
use std::sync::Mutex;

const INFO_MARK: &str = "[i]";
const WARN_MARK: &str = "[!]";
const RESULT_MARK: &str = "[\u{2713}]";
const PROGRESS_MARK: &str = "[~]";

/// Line-per-event renderer for pipes, log files and tests
pub struct PlainRenderer<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> PlainRenderer<W> {
    pub fn new(writer: W) -> Self {
        Self {
            out: Mutex::new(writer),
        }
    }

    /// Consume the renderer and return the writer
    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|e| e.into_inner())
    }

    fn write_line(&self, line: &str) {
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        let _ = writeln!(out, "{}", line);
        let _ = out.flush();
    }
}

impl PlainRenderer<io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl PlainRenderer<Vec<u8>> {
    /// Everything written so far
    pub fn contents(&self) -> String {
        let out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        String::from_utf8_lossy(&out).into_owned()
    }
}

impl<W: Write + Send> OutputSink for PlainRenderer<W> {
    fn header(&self, title: &str) {
        self.write_line(&format!("\n== {} ==", title));
    }

    fn info(&self, line: &str) {
        self.write_line(&format!("  {} {}", INFO_MARK, line));
    }

    fn warn(&self, line: &str) {
        self.write_line(&format!("  {} {}", WARN_MARK, line));
    }

    fn progress(&self, label: &str, line: &str) {
        self.write_line(&format!("  {} {}: {}", PROGRESS_MARK, label, line));
    }

    fn result(&self, line: &str) {
        self.write_line(&format!("  {} {}", RESULT_MARK, line));
    }
}

#[derive(Default)]
struct TerminalState {
    /// A progress line is on screen without a trailing newline
    progress_open: bool,
}

/// Colored renderer for interactive terminals.
///
/// Progress lines are redrawn in place; any other event first terminates
/// the open progress line.
pub struct TerminalRenderer {
    use_color: bool,
    state: Mutex<TerminalState>,
}

impl TerminalRenderer {
    pub fn new(use_color: bool) -> Self {
        Self {
            use_color,
            state: Mutex::new(TerminalState::default()),
        }
    }

    fn paint(&self, text: &str, color: Color, bold: bool) -> String {
        if !self.use_color {
            return text.to_string();
        }
        let painted = text.color(color);
        if bold {
            painted.bold().to_string()
        } else {
            painted.to_string()
        }
    }

    fn emit(&self, text: &str) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let mut out = io::stdout().lock();
        if state.progress_open {
            let _ = writeln!(out);
            state.progress_open = false;
        }
        let _ = writeln!(out, "{}", text);
        let _ = out.flush();
    }
}

impl OutputSink for TerminalRenderer {
    fn header(&self, title: &str) {
        self.emit(&format!("\n  {}", self.paint(title, Color::Cyan, true)));
    }

    fn info(&self, line: &str) {
        self.emit(&format!("  {} {}", self.paint(INFO_MARK, Color::Cyan, false), line));
    }

    fn warn(&self, line: &str) {
        self.emit(&format!(
            "  {} {}",
            self.paint(WARN_MARK, Color::Yellow, true),
            self.paint(line, Color::Yellow, false)
        ));
    }

    fn progress(&self, label: &str, line: &str) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let mut out = io::stdout().lock();
        let _ = write!(
            out,
            "\r\x1b[2K  {} {:<9} {}",
            self.paint(PROGRESS_MARK, Color::Blue, false),
            self.paint(label, Color::White, true),
            line
        );
        let _ = out.flush();
        state.progress_open = true;
    }

    fn result(&self, line: &str) {
        self.emit(&format!(
            "  {} {}",
            self.paint(RESULT_MARK, Color::Green, true),
            self.paint(line, Color::Green, false)
        ));
    }
}
