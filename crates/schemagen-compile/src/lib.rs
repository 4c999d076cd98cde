//! Batch compilation of a schema manifest.
//!
//! This crate drives a generation run. For every job in a
//! [`Manifest`](schemagen_schemas::Manifest) it extracts the named type,
//! strips callback properties, wraps the result with interchange metadata
//! and writes it below the output root. A final index document references
//! every job's output.
//!
//! ## Failure policy
//!
//! Only the output directory reset is fatal ([`CompileError`]). Every
//! per-job failure ([`JobError`]) is logged with the job's output path,
//! recorded in the [`GenerationReport`], and the batch moves on.
//!
//! ## Usage
//!
//! ```no_run
//! use camino::Utf8Path;
//! use schemagen_compile::run;
//! use schemagen_extract::TypeScriptExtractor;
//! use schemagen_schemas::Manifest;
//!
//! let manifest = Manifest::load(Utf8Path::new("schemagen.json")).unwrap();
//! let report = run(&manifest, &mut TypeScriptExtractor::new()).unwrap();
//! println!("{}/{}", report.succeeded, report.total);
//! ```

mod assemble;
mod error;
mod index;
mod redact;
mod reset;

use camino::Utf8PathBuf;
use schemagen_extract::TypeExtractor;
use schemagen_schemas::{Manifest, SchemaJob};
use tracing::{debug_span, error, info, warn};

pub use crate::assemble::{assemble, write_document};
#[doc(inline)]
pub use crate::error::{CompileError, JobError};
use crate::error::JobErrorKind;
pub use crate::index::build_index;
pub use crate::redact::Redactor;
use crate::reset::reset_output_dir;

/// Outcome of a generation run.
#[derive(Debug, Default)]
pub struct GenerationReport {
    /// Number of documents attempted: one per job, plus the index.
    pub total: usize,
    /// Number of documents written.
    pub succeeded: usize,
    /// Output paths written, relative to the output root, in write order.
    pub written: Vec<String>,
    /// Failed documents, in manifest order.
    pub failures: Vec<JobFailure>,
}

/// A document that could not be generated.
#[derive(Debug)]
pub struct JobFailure {
    /// Output path of the failed document, relative to the output root.
    pub output: String,
    pub error: JobError,
}

impl GenerationReport {
    /// Returns the number of documents that failed.
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Returns true if every document was written.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, output: &str, result: Result<(), JobError>) {
        self.total += 1;
        match result {
            Ok(()) => {
                self.succeeded += 1;
                self.written.push(output.to_string());
            }
            Err(err) => {
                error!(output, error = %err, "schema generation failed");
                self.failures.push(JobFailure {
                    output: output.to_string(),
                    error: err,
                });
            }
        }
    }
}

/// Run a generation batch.
///
/// Resets the output directory, then processes jobs strictly in manifest
/// order: extract, redact, assemble, write. The index document is written
/// last, whether or not jobs failed.
///
/// # Errors
///
/// Returns [`CompileError`] if the output directory cannot be reset
/// ([`CompileError::is_directory`]) or if it contains one of the run's
/// inputs ([`CompileError::is_unsafe_reset`]). No job runs in that case.
/// Job failures are not errors; see [`GenerationReport::failures`].
///
/// # Example
///
/// ```no_run
/// use camino::Utf8Path;
/// use schemagen_compile::run;
/// use schemagen_extract::TypeScriptExtractor;
/// use schemagen_schemas::Manifest;
///
/// let manifest = Manifest::load(Utf8Path::new("schemagen.json")).unwrap();
/// let report = run(&manifest, &mut TypeScriptExtractor::new()).unwrap();
/// assert!(report.is_success());
/// ```
pub fn run(
    manifest: &Manifest,
    extractor: &mut dyn TypeExtractor,
) -> Result<GenerationReport, CompileError> {
    let _span =
        debug_span!("run", output_dir = %manifest.output_dir).entered();

    // Step 1: start from an empty output root.
    reset_output_dir(&manifest.output_dir, manifest.inputs())?;

    for output in manifest.duplicate_outputs() {
        warn!(output, "several jobs write this output; the last one wins");
    }

    // Step 2: one document per job.
    let redactor = Redactor::new(manifest.denylist.clone());
    let mut report = GenerationReport::default();
    for job in &manifest.jobs {
        let _span = debug_span!("job", output = %job.output).entered();
        let result = generate(manifest, job, extractor, &redactor);
        report.record(&job.output, result);
    }

    // Step 3: the index, regardless of job failures.
    let _span = debug_span!("index").entered();
    let index = build_index(manifest);
    let result =
        write_document(&manifest.output_dir, &manifest.index.file, &index)
            .map(|path| info!(%path, "wrote index"));
    report.record(&manifest.index.file, result);

    Ok(report)
}

/// Generates and writes the document for one job.
fn generate(
    manifest: &Manifest,
    job: &SchemaJob,
    extractor: &mut dyn TypeExtractor,
    redactor: &Redactor,
) -> Result<(), JobError> {
    let source: Utf8PathBuf =
        manifest.source_path(&job.source).ok_or_else(|| {
            JobError::new(JobErrorKind::MissingSource(job.source.clone()))
        })?;

    let raw = extractor.extract(&source, &job.type_name)?;
    let body = redactor.redact(raw);
    let document = assemble(job, manifest, body);
    let path = write_document(&manifest.output_dir, &job.output, &document)?;
    info!(%path, type_name = %job.type_name, "wrote schema");
    Ok(())
}
