//! Progress reporting
//!
//! The pipeline talks to the outside world through the
//! [`ProgressReporter`] trait: phase boundaries, per-file notices,
//! warnings, errors, and a final summary. Three implementations ship:
//! a console reporter, a JSON event reporter for tooling, and a null
//! reporter for embedding.

// The console reporter is the one place the library writes to stderr.
#![allow(clippy::print_stderr)]

use crate::error::Error;
use crate::pipeline::MigrationSummary;
use serde_json::json;
use std::io::Write;

/// Pipeline phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Discovery,
    Parsing,
    Analysis,
    Generation,
    Writing,
    Validation,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Discovery => "discovery",
            Phase::Parsing => "parsing",
            Phase::Analysis => "analysis",
            Phase::Generation => "generation",
            Phase::Writing => "writing",
            Phase::Validation => "validation",
        }
    }
}

/// Callback surface the pipeline drives.
pub trait ProgressReporter {
    fn start_phase(&mut self, phase: Phase, description: &str);
    fn update_progress(&mut self, current: usize, total: usize);
    fn report_file(&mut self, filename: &str);
    fn report_warning(&mut self, message: &str);
    fn report_error(&mut self, error: &Error);
    fn finish_phase(&mut self, success: bool);
    fn report_summary(&mut self, summary: &MigrationSummary);
}

/// Discards everything; for library embedding and tests.
#[derive(Debug, Default)]
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn start_phase(&mut self, _phase: Phase, _description: &str) {}
    fn update_progress(&mut self, _current: usize, _total: usize) {}
    fn report_file(&mut self, _filename: &str) {}
    fn report_warning(&mut self, _message: &str) {}
    fn report_error(&mut self, _error: &Error) {}
    fn finish_phase(&mut self, _success: bool) {}
    fn report_summary(&mut self, _summary: &MigrationSummary) {}
}

/// Human-oriented console output on stderr.
pub struct ConsoleReporter {
    use_color: bool,
    show_files: bool,
    quiet: bool,
}

impl ConsoleReporter {
    pub fn new(use_color: bool, show_files: bool, quiet: bool) -> Self {
        Self {
            use_color,
            show_files,
            quiet,
        }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.use_color {
            format!("\x1b[{}m{}\x1b[0m", code, text)
        } else {
            text.to_string()
        }
    }
}

impl ProgressReporter for ConsoleReporter {
    fn start_phase(&mut self, _phase: Phase, description: &str) {
        if !self.quiet {
            eprintln!("{} {}", self.paint("1", "==>"), description);
        }
    }

    fn update_progress(&mut self, current: usize, total: usize) {
        if !self.quiet && self.show_files {
            eprint!("\r  [{}/{}]", current, total);
            let _ = std::io::stderr().flush();
        }
    }

    fn report_file(&mut self, filename: &str) {
        if !self.quiet && self.show_files {
            eprintln!(" {}", filename);
        }
    }

    fn report_warning(&mut self, message: &str) {
        if !self.quiet {
            eprintln!("{}: {}", self.paint("33", "warning"), message);
        }
    }

    fn report_error(&mut self, error: &Error) {
        // Errors print even in quiet mode.
        eprint!("{}", error.render_human());
    }

    fn finish_phase(&mut self, success: bool) {
        if !self.quiet && !success {
            eprintln!("{}", self.paint("31", "  phase finished with errors"));
        }
    }

    fn report_summary(&mut self, summary: &MigrationSummary) {
        if self.quiet {
            return;
        }
        eprintln!(
            "{} {} files, {} targets, {} errors, {} warnings in {}ms",
            self.paint("1", "done:"),
            summary.files_processed,
            summary.targets_generated,
            summary.errors_encountered,
            summary.warnings.len(),
            summary.duration_ms
        );
    }
}

/// Machine-readable event lines, one JSON object per line.
pub struct JsonReporter<W: Write> {
    out: W,
}

impl<W: Write> JsonReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    fn emit(&mut self, value: serde_json::Value) {
        let _ = writeln!(self.out, "{}", value);
    }
}

impl<W: Write> ProgressReporter for JsonReporter<W> {
    fn start_phase(&mut self, phase: Phase, description: &str) {
        self.emit(json!({"event": "phase_start", "phase": phase.name(), "description": description}));
    }

    fn update_progress(&mut self, current: usize, total: usize) {
        self.emit(json!({"event": "progress", "current": current, "total": total}));
    }

    fn report_file(&mut self, filename: &str) {
        self.emit(json!({"event": "file", "path": filename}));
    }

    fn report_warning(&mut self, message: &str) {
        self.emit(json!({"event": "warning", "message": message}));
    }

    fn report_error(&mut self, error: &Error) {
        self.emit(json!({
            "event": "error",
            "kind": error.kind_name(),
            "message": error.message(),
            "location": error.location().map(|l| l.to_string()),
        }));
    }

    fn finish_phase(&mut self, success: bool) {
        self.emit(json!({"event": "phase_end", "success": success}));
    }

    fn report_summary(&mut self, summary: &MigrationSummary) {
        self.emit(json!({
            "event": "summary",
            "files_processed": summary.files_processed,
            "targets_generated": summary.targets_generated,
            "errors_encountered": summary.errors_encountered,
            "warnings": summary.warnings,
            "duration_ms": summary.duration_ms,
        }));
    }
}
