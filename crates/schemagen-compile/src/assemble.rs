//! Schema assembly: interchange metadata and file output.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use schemagen_schemas::{Manifest, RawSchema, SchemaDocument, SchemaJob};

use crate::error::JobError;

/// Wraps a redacted schema with the document metadata for `job`.
///
/// The job's title and description always replace whatever the extractor
/// derived from doc comments.
pub fn assemble(
    job: &SchemaJob,
    manifest: &Manifest,
    body: RawSchema,
) -> SchemaDocument {
    SchemaDocument {
        dialect: manifest.dialect.clone(),
        id: manifest.schema_id(&job.output),
        title: job.title.clone(),
        description: job.description.clone(),
        body,
    }
}

/// Writes `document` to `<root>/<output>`, creating parent directories.
///
/// Returns the path written.
pub fn write_document(
    root: &Utf8Path,
    output: &str,
    document: &SchemaDocument,
) -> Result<Utf8PathBuf, JobError> {
    let path = root.join(output);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| JobError::write(parent, e))?;
    }
    let json = document.to_pretty_json()?;
    fs::write(&path, json).map_err(|e| JobError::write(&path, e))?;
    Ok(path)
}
