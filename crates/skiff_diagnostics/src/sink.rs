//! Collects the diagnostics of one build phase.

use std::sync::{Mutex, MutexGuard};

use crate::diagnostic::Diagnostic;

/// Diagnostics gathered while a phase runs, possibly from several threads.
///
/// Diagnostics come back in the order they were emitted. Callers that emit
/// from worker threads sort afterwards if they need a stable order.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl DiagnosticSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Diagnostic>> {
        self.diagnostics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Adds one diagnostic.
    pub fn emit(&self, diag: Diagnostic) {
        self.lock().push(diag);
    }

    /// Adds every diagnostic from `diags`.
    pub fn emit_all(&self, diags: impl IntoIterator<Item = Diagnostic>) {
        self.lock().extend(diags);
    }

    /// Returns `true` if an error-severity diagnostic was emitted and not yet
    /// taken.
    pub fn has_errors(&self) -> bool {
        self.lock().iter().any(|d| d.severity.is_error())
    }

    /// Files that received at least one error, in first-seen order.
    pub fn files_with_errors(&self) -> Vec<String> {
        let mut files: Vec<String> = Vec::new();
        for file in self
            .lock()
            .iter()
            .filter(|d| d.severity.is_error())
            .filter_map(Diagnostic::file)
        {
            if !files.iter().any(|seen| seen == file) {
                files.push(file.to_string());
            }
        }
        files
    }

    /// Drains the sink.
    pub fn take_all(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.lock())
    }
}
