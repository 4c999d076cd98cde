//! JSON Schema extraction from TypeScript type declarations.
//!
//! This crate parses `.ts`/`.d.ts` sources with the tree-sitter TypeScript
//! grammar and lowers a named type (interface, type alias or enum) into a
//! [`RawSchema`] tree. Referenced named types are placed in a shared
//! `definitions` table; generic instantiations are inlined.
//!
//! ## Usage
//!
//! ```no_run
//! use schemagen_extract::run;
//!
//! let mut output = Vec::new();
//! run("protocol/runs/retry.ts", "Retry", &mut output).unwrap();
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports types from `schemagen_schemas` for convenience.
//! See [`schemagen_schemas`] for schema documentation.

mod ast;
mod error;
mod jsdoc;
mod lower;
mod parser;
mod program;

use std::io::Write;

use camino::Utf8Path;
// Re-export schema types for convenience.
#[doc(inline)]
pub use schemagen_schemas::{RawSchema, SchemaKind, SchemaNode};
use tracing::instrument;

#[doc(inline)]
pub use crate::error::ExtractError;
use crate::program::Program;

/// Produces a structural schema for a named type in a source file.
///
/// This is the seam between the batch pipeline and the type analysis: the
/// pipeline only ever calls `extract`, so tests can substitute a stub.
pub trait TypeExtractor {
    /// Extracts `type_name` as declared or re-exported by `source`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError`] when the source cannot be read or parsed,
    /// the type cannot be found, or the type uses a construct with no JSON
    /// Schema equivalent. The error names the offending file or type.
    fn extract(
        &mut self,
        source: &Utf8Path,
        type_name: &str,
    ) -> Result<RawSchema, ExtractError>;
}

/// [`TypeExtractor`] for TypeScript sources.
///
/// Parsed modules are cached for the lifetime of the extractor, so a batch
/// of jobs over the same files parses each file once.
#[derive(Debug, Default)]
pub struct TypeScriptExtractor {
    program: Program,
}

impl TypeScriptExtractor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TypeExtractor for TypeScriptExtractor {
    #[instrument(skip(self), fields(source = %source))]
    fn extract(
        &mut self,
        source: &Utf8Path,
        type_name: &str,
    ) -> Result<RawSchema, ExtractError> {
        lower::lower_root(&mut self.program, source, type_name)
    }
}

/// Run the extract operation.
///
/// Extracts `type_name` from the TypeScript file at `source` and writes the
/// raw schema to the provided output writer as pretty-printed JSON.
///
/// # Errors
///
/// Returns [`ExtractError`] if:
/// - The source or one of its imports cannot be read
///   ([`ExtractError::is_io`], [`ExtractError::is_module_not_found`])
/// - A source file has a syntax error ([`ExtractError::is_parse`])
/// - The type cannot be lowered ([`ExtractError::is_unknown_type`],
///   [`ExtractError::is_unsupported`], [`ExtractError::is_recursive_generic`])
/// - Writing to the output fails ([`ExtractError::is_output`])
///
/// # Example
///
/// ```no_run
/// use std::io::stdout;
/// use schemagen_extract::run;
///
/// let mut out = stdout().lock();
/// run("protocol/runs/retry.ts", "Retry", &mut out).unwrap();
/// ```
pub fn run(
    source: impl AsRef<Utf8Path>,
    type_name: &str,
    output: &mut dyn Write,
) -> Result<(), ExtractError> {
    // Step 1: parse and lower the requested type.
    let mut extractor = TypeScriptExtractor::new();
    let schema = extractor.extract(source.as_ref(), type_name)?;

    // Step 2: stream to output.
    serde_json::to_writer_pretty(&mut *output, &schema)?;
    writeln!(output)?;

    Ok(())
}
