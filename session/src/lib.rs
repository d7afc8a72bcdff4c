//! Session management for the Latticec compiler middle-end.
//!
//! Bundles everything that is ambient configuration rather than IR data:
//! the options the embedder chose (§6), and the diagnostics handler that
//! all of `latticec-irgen` reports through.

pub mod diagnostics;
mod options;

use std::sync::Arc;

pub use self::{
    diagnostics::{Diagnostic, DiagnosticsHandler, Severity, SourceSpan},
    options::{Checks, Ignore, OptLevel, Options, Traits},
};

/// Per-compilation configuration and collaborators, handed to `ir_gen` and
/// threaded through every lowering routine that needs to consult options or
/// report a diagnostic.
pub struct Session {
    pub options: Options,
    pub diagnostics: Arc<DiagnosticsHandler>,
}

impl Session {
    pub fn new(options: Options) -> Self {
        Self { options, diagnostics: Arc::new(DiagnosticsHandler::new()) }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Options::default())
    }
}
