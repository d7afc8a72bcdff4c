//! Diagnostic collection and reporting.
//!
//! Mirrors the teacher's separation of a `DiagnosticsHandler` from the rest
//! of the session: generation code never formats or prints directly, it
//! just hands a [`Diagnostic`] to the handler, which owns presentation
//! policy (here: structured logging via the `log` facade).

use std::sync::atomic::{AtomicUsize, Ordering};

use latticec_symbol::Symbol;

/// A location in a single source file, as produced by the external parser.
///
/// Analogous to the original's `source_t`: a file + line/column tuple. The
/// middle-end never interprets these beyond carrying them through to
/// diagnostics and to null-check instructions (`Load`/`Store`/`Member`/
/// `ArrayAccess`, per spec.md §3 `IrInstr`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceSpan {
    pub file: Symbol,
    pub line: u32,
    pub column: u32,
}

impl SourceSpan {
    /// A span for IR constructed without a corresponding source location
    /// (autogenerated `__defer__`/`__pass__`/`__assign__` bodies, synthetic
    /// `return 0` in `main`, etc).
    pub fn unknown() -> Self {
        SourceSpan { file: Symbol::intern("<generated>"), line: 0, column: 0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Note,
    Warning,
    Error,
    Bug,
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub labels: Vec<(SourceSpan, String)>,
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self { severity: Severity::Error, message: message.into(), labels: Vec::new(), notes: Vec::new() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { severity: Severity::Warning, message: message.into(), labels: Vec::new(), notes: Vec::new() }
    }

    pub fn bug(message: impl Into<String>) -> Self {
        Self { severity: Severity::Bug, message: message.into(), labels: Vec::new(), notes: Vec::new() }
    }

    pub fn with_label(mut self, span: SourceSpan, label: impl Into<String>) -> Self {
        self.labels.push((span, label.into()));
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

/// Collects diagnostics emitted during IR generation and tracks whether any
/// error-or-worse diagnostic has been reported, which callers use to decide
/// whether to abandon the module (spec.md §7: "on failure, intermediate IR
/// is abandoned").
#[derive(Default)]
pub struct DiagnosticsHandler {
    error_count: AtomicUsize,
    warning_count: AtomicUsize,
}

impl DiagnosticsHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error | Severity::Bug => {
                self.error_count.fetch_add(1, Ordering::Relaxed);
                log::error!(target: "latticec::diagnostics", "{}", render(&diagnostic));
            }
            Severity::Warning => {
                self.warning_count.fetch_add(1, Ordering::Relaxed);
                log::warn!(target: "latticec::diagnostics", "{}", render(&diagnostic));
            }
            Severity::Note => {
                log::info!(target: "latticec::diagnostics", "{}", render(&diagnostic));
            }
        }
    }

    pub fn has_errors(&self) -> bool {
        self.error_count.load(Ordering::Relaxed) > 0
    }

    pub fn error_count(&self) -> usize {
        self.error_count.load(Ordering::Relaxed)
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count.load(Ordering::Relaxed)
    }
}

fn render(diagnostic: &Diagnostic) -> String {
    let mut out = diagnostic.message.clone();
    for (span, label) in &diagnostic.labels {
        out.push_str(&format!("\n  --> {}:{}:{}: {}", span.file, span.line, span.column, label));
    }
    for note in &diagnostic.notes {
        out.push_str(&format!("\n  note: {note}"));
    }
    out
}
