//! Error types for manifest loading.

use std::backtrace::Backtrace;
use std::fmt;

use camino::Utf8PathBuf;

/// Error type for reading and validating a generation manifest.
///
/// Uses the same struct-plus-kind layout as the other schemagen crates:
/// the variants stay private and callers classify with `is_xxx()`.
#[derive(Debug)]
pub struct ManifestError {
    kind: ManifestErrorKind,
    backtrace: Backtrace,
}

/// Internal error variants. Not exposed publicly; use `is_xxx()` methods.
#[derive(Debug)]
pub(crate) enum ManifestErrorKind {
    /// The manifest file could not be read.
    Io {
        path: Utf8PathBuf,
        source: std::io::Error,
    },
    /// The manifest file is not a valid manifest document.
    Parse {
        path: Utf8PathBuf,
        source: serde_json::Error,
    },
    /// The manifest parsed but violates an invariant.
    Invalid(String),
}

impl ManifestError {
    /// Creates an error from an error kind, capturing a backtrace.
    pub(crate) fn new(kind: ManifestErrorKind) -> Self {
        Self {
            kind,
            backtrace: Backtrace::capture(),
        }
    }

    pub(crate) fn invalid(message: String) -> Self {
        Self::new(ManifestErrorKind::Invalid(message))
    }

    /// Returns true if the manifest file could not be read.
    pub fn is_io(&self) -> bool {
        matches!(self.kind, ManifestErrorKind::Io { .. })
    }

    /// Returns true if the manifest file is malformed JSON or has the wrong
    /// shape.
    pub fn is_parse(&self) -> bool {
        matches!(self.kind, ManifestErrorKind::Parse { .. })
    }

    /// Returns true if the manifest violates a structural invariant.
    pub fn is_invalid(&self) -> bool {
        matches!(self.kind, ManifestErrorKind::Invalid(_))
    }

    /// Returns the backtrace captured when this error was created.
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }
}

impl fmt::Display for ManifestErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestErrorKind::Io { path, source } => {
                write!(f, "failed to read manifest {path}: {source}")
            }
            ManifestErrorKind::Parse { path, source } => {
                write!(f, "failed to parse manifest {path}: {source}")
            }
            ManifestErrorKind::Invalid(message) => {
                write!(f, "invalid manifest: {message}")
            }
        }
    }
}

impl fmt::Display for ManifestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Summary of what happened.
        writeln!(f, "{}", self.kind)?;

        // Backtrace (will be empty unless RUST_BACKTRACE is set).
        write!(f, "{}", self.backtrace)
    }
}

impl std::error::Error for ManifestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ManifestErrorKind::Io { source, .. } => Some(source),
            ManifestErrorKind::Parse { source, .. } => Some(source),
            ManifestErrorKind::Invalid(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn test_io() {
        let err = ManifestError::new(ManifestErrorKind::Io {
            path: "schemagen.json".into(),
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "file not found",
            ),
        });

        assert!(err.is_io());
        assert!(!err.is_parse());
        assert!(!err.is_invalid());
        assert!(err.to_string().contains("failed to read manifest"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_invalid_has_no_source() {
        let err = ManifestError::invalid("bad output".to_string());
        assert!(err.is_invalid());
        assert!(err.to_string().contains("bad output"));
        assert!(err.source().is_none());
    }

    #[test]
    fn test_backtrace_captured() {
        let err = ManifestError::invalid("x".to_string());
        // Content depends on RUST_BACKTRACE; just make sure it's reachable.
        let _ = err.backtrace();
    }
}
