//! The `console.log` sink.

use std::sync::{Arc, Mutex, PoisonError};

use sprig_core::Value;
use tracing::info;

/// Receives `console.log` output.
///
/// Every line is emitted as an `info` event with target `sprig::console`.
/// A console built with [`Console::capturing`] also keeps the lines, and its
/// clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct Console {
    lines: Option<Arc<Mutex<Vec<String>>>>,
}

impl Console {
    /// A console that only emits tracing events.
    pub fn new() -> Self {
        Self::default()
    }

    /// A console that also records every line for [`lines`](Self::lines) and
    /// [`take`](Self::take).
    pub fn capturing() -> Self {
        Self {
            lines: Some(Arc::default()),
        }
    }

    pub fn is_capturing(&self) -> bool {
        self.lines.is_some()
    }

    /// Log values separated by spaces.
    pub fn log(&self, args: &[Value]) {
        let line = args
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        info!(target: "sprig::console", "{line}");
        if let Some(lines) = &self.lines {
            lines
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(line);
        }
    }

    /// Lines captured so far. Always empty for a non-capturing console.
    pub fn lines(&self) -> Vec<String> {
        self.lines.as_ref().map_or_else(Vec::new, |lines| {
            lines
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        })
    }

    /// Drain and return the captured lines.
    pub fn take(&self) -> Vec<String> {
        self.lines.as_ref().map_or_else(Vec::new, |lines| {
            std::mem::take(&mut *lines.lock().unwrap_or_else(PoisonError::into_inner))
        })
    }
}
