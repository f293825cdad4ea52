use std::fmt::Display;

use thiserror::Error;

/// Checkpoints at which the compiler consults its [`CompilationHandler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelEvent {
    /// Consulted once, before any work is done.
    CompilationStarted,
    /// Consulted once per case split, before the split is performed.
    ShannonExpansion,
}

impl Display for CancelEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CancelEvent::CompilationStarted => write!(f, "compilation start"),
            CancelEvent::ShannonExpansion => write!(f, "Shannon expansion"),
        }
    }
}

/// Compilation was canceled by the installed handler. Distinct from both a
/// successful result and logical falsum; partial work is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("d-DNNF compilation canceled at {event}")]
pub struct Canceled {
    /// The checkpoint that triggered the cancellation.
    pub event: CancelEvent,
}

/// Cooperative cancellation hooks. Compilation is purely synchronous; these
/// are the only points at which it can be stopped. Returning `false` from a
/// hook cancels the compilation.
pub trait CompilationHandler {
    fn compilation_started(&mut self) -> bool {
        true
    }

    fn shannon_expansion(&mut self) -> bool {
        true
    }
}

/// Handler that never cancels.
pub struct NopHandler;

impl CompilationHandler for NopHandler {}
