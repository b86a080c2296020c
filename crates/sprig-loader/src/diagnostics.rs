//! Where load failures are reported.

use std::sync::{Arc, Mutex, PoisonError};

use sprig_core::LoadError;
use tracing::error;

/// Receives every failed definition load.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, source_key: &str, error: &LoadError);
}

/// Default sink: one `error!` event per failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, source_key: &str, error: &LoadError) {
        error!(source = %source_key, error = %error, "component failed to load");
    }
}

/// A reported failure, rendered to text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub source_key: String,
    pub message: String,
}

/// Sink that keeps every report. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    diagnostics: Arc<Mutex<Vec<Diagnostic>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&self, source_key: &str, error: &LoadError) {
        self.diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Diagnostic {
                source_key: source_key.to_string(),
                message: error.to_string(),
            });
    }
}
