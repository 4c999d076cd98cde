//! Destructive reset of the output directory.

use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use crate::error::{CompileError, CompileErrorKind};

/// Removes `output_dir` (if present) and recreates it empty.
///
/// Refuses to touch the directory when it is, or contains, one of `inputs`.
pub(crate) fn reset_output_dir<'a>(
    output_dir: &Utf8Path,
    inputs: impl IntoIterator<Item = &'a Utf8Path>,
) -> Result<(), CompileError> {
    let resolved_output = resolve(output_dir);
    for input in inputs {
        if resolve(input).starts_with(&resolved_output) {
            return Err(CompileError::new(CompileErrorKind::UnsafeReset {
                output_dir: output_dir.to_owned(),
                input: input.to_owned(),
            }));
        }
    }

    match fs::remove_dir_all(output_dir) {
        Ok(()) => debug!(%output_dir, "removed previous output"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(CompileError::directory(output_dir, "remove", e)),
    }
    fs::create_dir_all(output_dir)
        .map_err(|e| CompileError::directory(output_dir, "create", e))
}

/// Canonicalizes `path` when it exists; otherwise makes it absolute against
/// the working directory.
fn resolve(path: &Utf8Path) -> Utf8PathBuf {
    if let Ok(canonical) = path.canonicalize_utf8() {
        return canonical;
    }
    std::path::absolute(path)
        .ok()
        .and_then(|p| Utf8PathBuf::from_path_buf(p).ok())
        .unwrap_or_else(|| path.to_owned())
}
