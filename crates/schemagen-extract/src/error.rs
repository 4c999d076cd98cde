//! Error types for the schemagen-extract crate.

use std::backtrace::Backtrace;
use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};

/// Error type for type extraction.
///
/// Every variant names the source file or type it concerns, so a failed job
/// can be reported without extra context from the caller.
#[derive(Debug)]
pub struct ExtractError {
    kind: ExtractErrorKind,
    backtrace: Backtrace,
}

/// Internal error variants. Not exposed publicly; use `is_xxx()` methods instead.
#[derive(Debug)]
pub(crate) enum ExtractErrorKind {
    /// A source file could not be read.
    Io {
        path: Utf8PathBuf,
        source: std::io::Error,
    },
    /// A source file is not syntactically valid.
    Parse {
        path: Utf8PathBuf,
        line: usize,
        col: usize,
        message: String,
    },
    /// An import specifier does not resolve to a readable file.
    ModuleNotFound {
        from: Utf8PathBuf,
        specifier: String,
    },
    /// A type name is not declared, imported, or built in.
    UnknownType { name: String, path: Utf8PathBuf },
    /// A type construct the extractor cannot lower to JSON Schema.
    Unsupported { construct: String, context: String },
    /// A generic type instantiates itself.
    RecursiveGeneric { name: String },
    /// A chain of plain aliases (`type A = B`) leads back to its start.
    CyclicAlias { name: String },
    /// Failed to serialize output to JSON.
    Serialization(serde_json::Error),
    /// I/O error when writing output.
    Output(std::io::Error),
}

impl ExtractError {
    /// Creates an error from an error kind, capturing a backtrace.
    pub(crate) fn new(kind: ExtractErrorKind) -> Self {
        Self {
            kind,
            backtrace: Backtrace::capture(),
        }
    }

    pub(crate) fn io(path: &Utf8Path, source: std::io::Error) -> Self {
        Self::new(ExtractErrorKind::Io {
            path: path.to_owned(),
            source,
        })
    }

    pub(crate) fn parse(
        path: &Utf8Path,
        line: usize,
        col: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ExtractErrorKind::Parse {
            path: path.to_owned(),
            line,
            col,
            message: message.into(),
        })
    }

    pub(crate) fn module_not_found(from: &Utf8Path, specifier: &str) -> Self {
        Self::new(ExtractErrorKind::ModuleNotFound {
            from: from.to_owned(),
            specifier: specifier.to_owned(),
        })
    }

    pub(crate) fn unknown_type(name: &str, path: &Utf8Path) -> Self {
        Self::new(ExtractErrorKind::UnknownType {
            name: name.to_owned(),
            path: path.to_owned(),
        })
    }

    pub(crate) fn unsupported(
        construct: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self::new(ExtractErrorKind::Unsupported {
            construct: construct.into(),
            context: context.into(),
        })
    }

    pub(crate) fn recursive_generic(name: &str) -> Self {
        Self::new(ExtractErrorKind::RecursiveGeneric {
            name: name.to_owned(),
        })
    }

    pub(crate) fn cyclic_alias(name: &str) -> Self {
        Self::new(ExtractErrorKind::CyclicAlias {
            name: name.to_owned(),
        })
    }

    /// Returns true if a source file could not be read.
    pub fn is_io(&self) -> bool {
        matches!(self.kind, ExtractErrorKind::Io { .. })
    }

    /// Returns true if a source file failed to parse.
    pub fn is_parse(&self) -> bool {
        matches!(self.kind, ExtractErrorKind::Parse { .. })
    }

    /// Returns true if an import could not be resolved to a file.
    pub fn is_module_not_found(&self) -> bool {
        matches!(self.kind, ExtractErrorKind::ModuleNotFound { .. })
    }

    /// Returns true if a referenced type could not be found.
    pub fn is_unknown_type(&self) -> bool {
        matches!(self.kind, ExtractErrorKind::UnknownType { .. })
    }

    /// Returns true if the type uses a construct with no JSON Schema
    /// equivalent (conditional types, mapped types, ...).
    pub fn is_unsupported(&self) -> bool {
        matches!(self.kind, ExtractErrorKind::Unsupported { .. })
    }

    /// Returns true if a generic type refers to itself while being
    /// instantiated.
    pub fn is_recursive_generic(&self) -> bool {
        matches!(self.kind, ExtractErrorKind::RecursiveGeneric { .. })
    }

    /// Returns true if a type alias resolves to itself through other
    /// aliases.
    pub fn is_cyclic_alias(&self) -> bool {
        matches!(self.kind, ExtractErrorKind::CyclicAlias { .. })
    }

    /// Returns true if this error is due to serialization failure.
    pub fn is_serialization(&self) -> bool {
        matches!(self.kind, ExtractErrorKind::Serialization(_))
    }

    /// Returns true if writing the output failed.
    pub fn is_output(&self) -> bool {
        matches!(self.kind, ExtractErrorKind::Output(_))
    }

    /// Returns the backtrace captured when this error was created.
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }
}

impl fmt::Display for ExtractErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractErrorKind::Io { path, source } => {
                write!(f, "failed to read {path}: {source}")
            }
            ExtractErrorKind::Parse {
                path,
                line,
                col,
                message,
            } => write!(f, "{path}:{line}:{col}: {message}"),
            ExtractErrorKind::ModuleNotFound { from, specifier } => {
                write!(f, "cannot resolve module '{specifier}' from {from}")
            }
            ExtractErrorKind::UnknownType { name, path } => {
                write!(f, "type `{name}` not found in {path}")
            }
            ExtractErrorKind::Unsupported { construct, context } => {
                write!(f, "unsupported {construct} in {context}")
            }
            ExtractErrorKind::RecursiveGeneric { name } => {
                write!(f, "generic type `{name}` instantiates itself")
            }
            ExtractErrorKind::CyclicAlias { name } => {
                write!(f, "type alias `{name}` refers to itself")
            }
            ExtractErrorKind::Serialization(err) => {
                write!(f, "failed to serialize output: {err}")
            }
            ExtractErrorKind::Output(err) => {
                write!(f, "I/O error: {err}")
            }
        }
    }
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Summary of what happened.
        writeln!(f, "{}", self.kind)?;

        // Backtrace (will be empty unless RUST_BACKTRACE is set).
        write!(f, "{}", self.backtrace)
    }
}

impl std::error::Error for ExtractError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ExtractErrorKind::Io { source, .. } => Some(source),
            ExtractErrorKind::Serialization(err) => Some(err),
            ExtractErrorKind::Output(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ExtractError {
    fn from(err: std::io::Error) -> Self {
        Self::new(ExtractErrorKind::Output(err))
    }
}

impl From<serde_json::Error> for ExtractError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(ExtractErrorKind::Serialization(err))
    }
}
