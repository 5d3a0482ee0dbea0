//! Diagnostic channel shared by the runtime.
//!
//! Everything that degrades to "stay on the current view" ends up here: failed
//! requests, malformed responses, markup that could not be mounted. Messages go
//! to the browser console on wasm32 and to stderr elsewhere; warnings and errors
//! are also kept (bounded) so the page and tests can inspect them.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

/// Set to true to log every dispatched event and processed response.
pub const LOG_EVENTS: bool = false;

const RETAINED_ENTRIES: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

#[derive(Clone, Default)]
pub struct Diagnostics {
    retained: Rc<RefCell<VecDeque<Diagnostic>>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&self, message: impl fmt::Display) {
        emit(Severity::Info, &message.to_string());
    }

    pub fn warn(&self, message: impl fmt::Display) {
        self.record(Severity::Warning, message.to_string());
    }

    pub fn error(&self, message: impl fmt::Display) {
        self.record(Severity::Error, message.to_string());
    }

    /// Retained warnings and errors, oldest first.
    pub fn entries(&self) -> Vec<Diagnostic> {
        self.retained.borrow().iter().cloned().collect()
    }

    pub fn errors(&self) -> Vec<Diagnostic> {
        self.retained
            .borrow()
            .iter()
            .filter(|diagnostic| diagnostic.severity == Severity::Error)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.retained.borrow_mut().clear();
    }

    fn record(&self, severity: Severity, message: String) {
        emit(severity, &message);
        let mut retained = self.retained.borrow_mut();
        if retained.len() == RETAINED_ENTRIES {
            retained.pop_front();
        }
        retained.push_back(Diagnostic { severity, message });
    }
}

fn emit(severity: Severity, message: &str) {
    #[cfg(target_arch = "wasm32")]
    match severity {
        Severity::Info => zoon::println!("[bran] {message}"),
        Severity::Warning | Severity::Error => zoon::eprintln!("[bran {severity}] {message}"),
    }
    #[cfg(not(target_arch = "wasm32"))]
    match severity {
        Severity::Info => {
            if LOG_EVENTS {
                println!("[bran] {message}");
            }
        }
        Severity::Warning | Severity::Error => eprintln!("[bran {severity}] {message}"),
    }
}
