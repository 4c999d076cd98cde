//! Error types for the schemagen-compile crate.
//!
//! Two layers, matching the batch's failure policy: [`CompileError`] aborts
//! the whole run, [`JobError`] is caught at the job boundary and counted.

use std::backtrace::Backtrace;
use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use schemagen_extract::ExtractError;
use schemagen_schemas::SchemaSource;

/// Fatal error for a generation run.
///
/// Raised only while preparing the output directory, before any job runs.
#[derive(Debug)]
pub struct CompileError {
    kind: CompileErrorKind,
    backtrace: Backtrace,
}

/// Internal error variants. Not exposed publicly; use `is_xxx()` methods.
#[derive(Debug)]
pub(crate) enum CompileErrorKind {
    /// The output directory could not be removed or recreated.
    Directory {
        path: Utf8PathBuf,
        action: &'static str,
        source: std::io::Error,
    },
    /// Resetting the output directory would delete generator inputs.
    UnsafeReset {
        output_dir: Utf8PathBuf,
        input: Utf8PathBuf,
    },
}

impl CompileError {
    /// Creates an error from an error kind, capturing a backtrace.
    pub(crate) fn new(kind: CompileErrorKind) -> Self {
        Self {
            kind,
            backtrace: Backtrace::capture(),
        }
    }

    pub(crate) fn directory(
        path: &Utf8Path,
        action: &'static str,
        source: std::io::Error,
    ) -> Self {
        Self::new(CompileErrorKind::Directory {
            path: path.to_owned(),
            action,
            source,
        })
    }

    /// Returns true if the output directory could not be reset.
    pub fn is_directory(&self) -> bool {
        matches!(self.kind, CompileErrorKind::Directory { .. })
    }

    /// Returns true if the reset was refused because the output directory
    /// contains an input of the run.
    pub fn is_unsafe_reset(&self) -> bool {
        matches!(self.kind, CompileErrorKind::UnsafeReset { .. })
    }

    /// Returns the backtrace captured when this error was created.
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }
}

impl fmt::Display for CompileErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileErrorKind::Directory {
                path,
                action,
                source,
            } => {
                write!(f, "failed to {action} output directory {path}: {source}")
            }
            CompileErrorKind::UnsafeReset { output_dir, input } => {
                write!(
                    f,
                    "refusing to reset output directory {output_dir}: it contains {input}"
                )
            }
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Summary of what happened.
        writeln!(f, "{}", self.kind)?;

        // Backtrace (will be empty unless RUST_BACKTRACE is set).
        write!(f, "{}", self.backtrace)
    }
}

impl std::error::Error for CompileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            CompileErrorKind::Directory { source, .. } => Some(source),
            CompileErrorKind::UnsafeReset { .. } => None,
        }
    }
}

/// Failure of a single generation job.
///
/// The orchestrator records these and moves on to the next job.
#[derive(Debug)]
pub struct JobError {
    kind: JobErrorKind,
    backtrace: Backtrace,
}

/// Internal error variants. Not exposed publicly; use `is_xxx()` methods.
#[derive(Debug)]
pub(crate) enum JobErrorKind {
    /// The job's source does not map to a file.
    MissingSource(SchemaSource),
    /// The type could not be extracted.
    Extraction(ExtractError),
    /// The document could not be rendered as JSON.
    Serialization(serde_json::Error),
    /// The document could not be written.
    Write {
        path: Utf8PathBuf,
        source: std::io::Error,
    },
}

impl JobError {
    /// Creates an error from an error kind, capturing a backtrace.
    pub(crate) fn new(kind: JobErrorKind) -> Self {
        Self {
            kind,
            backtrace: Backtrace::capture(),
        }
    }

    pub(crate) fn write(path: &Utf8Path, source: std::io::Error) -> Self {
        Self::new(JobErrorKind::Write {
            path: path.to_owned(),
            source,
        })
    }

    /// Returns true if the job's source could not be resolved to a file.
    pub fn is_missing_source(&self) -> bool {
        matches!(self.kind, JobErrorKind::MissingSource(_))
    }

    /// Returns true if type extraction failed.
    pub fn is_extraction(&self) -> bool {
        matches!(self.kind, JobErrorKind::Extraction(_))
    }

    /// Returns true if the document could not be serialized.
    pub fn is_serialization(&self) -> bool {
        matches!(self.kind, JobErrorKind::Serialization(_))
    }

    /// Returns true if writing the document failed.
    pub fn is_write(&self) -> bool {
        matches!(self.kind, JobErrorKind::Write { .. })
    }

    /// Returns the extraction error, if that is what failed.
    pub fn as_extraction(&self) -> Option<&ExtractError> {
        match &self.kind {
            JobErrorKind::Extraction(err) => Some(err),
            _ => None,
        }
    }

    /// Returns the backtrace captured when this error was created.
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }
}

impl fmt::Display for JobErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobErrorKind::MissingSource(source) => {
                write!(f, "no file configured for source {source}")
            }
            JobErrorKind::Extraction(err) => write!(f, "{err}"),
            JobErrorKind::Serialization(err) => {
                write!(f, "failed to serialize document: {err}")
            }
            JobErrorKind::Write { path, source } => {
                write!(f, "failed to write {path}: {source}")
            }
        }
    }
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            // Already carries the backtrace captured at extraction.
            JobErrorKind::Extraction(err) => write!(f, "{err}"),
            kind => {
                // Summary of what happened.
                writeln!(f, "{kind}")?;

                // Backtrace (will be empty unless RUST_BACKTRACE is set).
                write!(f, "{}", self.backtrace)
            }
        }
    }
}

impl std::error::Error for JobError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            JobErrorKind::MissingSource(_) => None,
            JobErrorKind::Extraction(err) => Some(err),
            JobErrorKind::Serialization(err) => Some(err),
            JobErrorKind::Write { source, .. } => Some(source),
        }
    }
}

impl From<ExtractError> for JobError {
    fn from(err: ExtractError) -> Self {
        Self::new(JobErrorKind::Extraction(err))
    }
}

impl From<serde_json::Error> for JobError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(JobErrorKind::Serialization(err))
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn test_directory() {
        let err = CompileError::directory(
            Utf8Path::new("public/v1"),
            "create",
            std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "permission denied",
            ),
        );

        assert!(err.is_directory());
        assert!(!err.is_unsafe_reset());
        let message = err.to_string();
        assert!(message.contains("failed to create output directory"));
        assert!(message.contains("public/v1"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_unsafe_reset() {
        let err = CompileError::new(CompileErrorKind::UnsafeReset {
            output_dir: "repo".into(),
            input: "repo/types".into(),
        });
        assert!(err.is_unsafe_reset());
        assert!(err.to_string().contains("refusing to reset"));
        assert!(err.source().is_none());
    }

    #[test]
    fn test_write() {
        let err = JobError::write(
            Utf8Path::new("out/runs/retry.json"),
            std::io::Error::other("disk full"),
        );
        assert!(err.is_write());
        assert!(!err.is_extraction());
        assert!(err.as_extraction().is_none());
        assert!(err.to_string().contains("out/runs/retry.json"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_serialization_from() {
        let json_err =
            serde_json::from_str::<String>("not valid json").unwrap_err();
        let err = JobError::from(json_err);
        assert!(err.is_serialization());
        assert!(err.to_string().contains("failed to serialize document"));
    }

    #[test]
    fn test_missing_source() {
        let err = JobError::new(JobErrorKind::MissingSource(
            SchemaSource::Helper,
        ));
        assert!(err.is_missing_source());
        assert!(err.to_string().contains("@helper"));
        assert!(err.source().is_none());
    }

    #[test]
    fn test_backtrace_captured() {
        let err = JobError::new(JobErrorKind::MissingSource(
            SchemaSource::Helper,
        ));
        // Content depends on RUST_BACKTRACE; just make sure it's reachable.
        let _ = err.backtrace();
    }

    #[test]
    fn test_debug_impl() {
        let err = CompileError::directory(
            Utf8Path::new("out"),
            "remove",
            std::io::Error::other("busy"),
        );
        assert!(format!("{err:?}").contains("CompileError"));
    }
}
