//! Shared data model for the schemagen pipeline.
//!
//! This crate contains the types every phase agrees on:
//!
//! - [`Manifest`] and [`SchemaJob`]: the configuration resource listing
//!   which types to extract and where to write them
//! - [`SchemaNode`]: a typed JSON Schema tree, produced by the extractor,
//!   rewritten by the redactor, and serialized by the assembler
//! - [`SchemaDocument`]: a schema wrapped with interchange metadata
//!
//! The manifest format is itself described by a JSON Schema derived from
//! these Rust types (`schemars::schema_for!(Manifest)`).

mod document;
mod error;
mod manifest;
mod node;
#[cfg(test)]
mod testutil;

#[doc(inline)]
pub use document::*;
#[doc(inline)]
pub use error::ManifestError;
#[doc(inline)]
pub use manifest::*;
#[doc(inline)]
pub use node::*;
