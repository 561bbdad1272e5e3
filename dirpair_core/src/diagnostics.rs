use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Non-fatal conditions noticed while comparing directories
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Collation failed; the run now orders names bytewise
    CollationFallback {
        name: OsString,
        other: Option<OsString>,
        reason: String,
    },
    /// A directory could not be opened or enumerated
    ReadFailed { path: PathBuf, reason: String },
    /// Both sides lead back into a directory already being compared
    RecursiveLoop { path: PathBuf },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::CollationFallback { name, other: Some(other), reason } => write!(
                f,
                "cannot compare file names '{}' and '{}': {}",
                name.to_string_lossy(),
                other.to_string_lossy(),
                reason
            ),
            Diagnostic::CollationFallback { name, other: None, reason } => write!(
                f,
                "cannot compare file name '{}': {}",
                name.to_string_lossy(),
                reason
            ),
            Diagnostic::ReadFailed { path, reason } => write!(f, "{}: {}", path.display(), reason),
            Diagnostic::RecursiveLoop { path } => {
                write!(f, "{}: recursive directory loop", path.display())
            }
        }
    }
}

/// Receiver for [`Diagnostic`]s.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Forwards diagnostics to `tracing` at warn level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic) {
        warn!("{}", diagnostic);
    }
}

/// Buffers diagnostics in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    inner: Arc<Mutex<Vec<Diagnostic>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything reported so far
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.inner
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn len(&self) -> usize {
        self.diagnostics().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&self, diagnostic: Diagnostic) {
        warn!("{}", diagnostic);
        match self.inner.lock() {
            Ok(mut guard) => guard.push(diagnostic),
            Err(poisoned) => poisoned.into_inner().push(diagnostic),
        }
    }
}
