//! Generation manifest: the configuration resource naming every schema job.
//!
//! A manifest is a JSON file checked into the repository next to the type
//! catalog. Relative paths inside it are resolved against the directory that
//! contains the manifest, so the generator can be run from anywhere.
//!
//! ```json
//! {
//!   "base_url": "https://osprotocol.dev/v1",
//!   "source_root": "packages/schema",
//!   "helper": "scripts/schema-types.ts",
//!   "output_dir": "public/v1",
//!   "jobs": [
//!     {
//!       "source": "runs/retry.ts",
//!       "type": "Retry",
//!       "output": "runs/retry.json",
//!       "title": "Retry Schema",
//!       "description": "Retry configuration for workflow runs"
//!     }
//!   ]
//! }
//! ```

use std::borrow::Cow;
use std::collections::HashSet;

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use indexmap::IndexSet;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{ManifestError, ManifestErrorKind};

/// Marker used in a job's `source` to select the manifest's helper file.
pub const HELPER_MARKER: &str = "@helper";

/// Default `$schema` dialect marker.
pub const DEFAULT_DIALECT: &str = "http://json-schema.org/draft-07/schema#";

/// Property names whose declared type is a callback signature.
pub const DEFAULT_CALLBACKS: &[&str] = &[
    "onComplete",
    "onFailed",
    "onStatusChange",
    "onTimeoutCallback",
    "onRetry",
    "shouldRetry",
    "beforeCancel",
    "afterCancel",
];

fn default_dialect() -> String {
    DEFAULT_DIALECT.to_string()
}

/// Top-level manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Base URL that `$id`s are derived from: `<base_url>/<output>`.
    pub base_url: String,

    /// `$schema` dialect marker written into every document.
    #[serde(default = "default_dialect")]
    pub dialect: String,

    /// Directory that job sources are relative to.
    #[schemars(with = "String")]
    pub source_root: Utf8PathBuf,

    /// File that instantiates generic types with concrete parameters.
    /// Selected by jobs whose `source` is `@helper`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<String>")]
    pub helper: Option<Utf8PathBuf>,

    /// Output root. Deleted and recreated on every run.
    #[schemars(with = "String")]
    pub output_dir: Utf8PathBuf,

    /// Callback property names stripped from every schema.
    #[serde(default)]
    pub denylist: Denylist,

    /// Settings for the cross-referencing index document.
    #[serde(default)]
    pub index: IndexSettings,

    /// Generation jobs, processed in order.
    pub jobs: Vec<SchemaJob>,

    /// File this manifest was loaded from, if any.
    #[serde(skip)]
    #[schemars(skip)]
    pub origin: Option<Utf8PathBuf>,
}

/// One generation job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SchemaJob {
    /// Source file relative to `source_root`, or `@helper`.
    #[schemars(with = "String")]
    pub source: SchemaSource,

    /// Exported type or interface to extract.
    #[serde(rename = "type")]
    pub type_name: String,

    /// Output path relative to the output root (may include directories).
    pub output: String,

    /// Document title.
    pub title: String,

    /// Document description.
    pub description: String,

    /// Index group. Defaults to the title-cased first directory of
    /// `output`, or `General` for files at the output root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    /// Index key. Defaults to the file stem of `output`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl SchemaJob {
    /// Returns the index group this job is listed under.
    pub fn group_name(&self) -> Cow<'_, str> {
        if let Some(group) = &self.group {
            return Cow::Borrowed(group);
        }
        match self.output.split_once('/') {
            Some((dir, _)) => Cow::Owned(title_case(dir)),
            None => Cow::Borrowed("General"),
        }
    }

    /// Returns the key this job is listed under within its index group.
    pub fn index_key(&self) -> &str {
        if let Some(key) = &self.key {
            return key;
        }
        let file = self.output.rsplit('/').next().unwrap_or(&self.output);
        file.strip_suffix(".json").unwrap_or(file)
    }
}

/// Title-cases a directory name: `runs` becomes `Runs`, `mcp-servers`
/// becomes `McpServers`.
fn title_case(dir: &str) -> String {
    dir.split(['-', '_'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect()
}

/// Where a job's type declaration lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SchemaSource {
    /// The manifest's helper file.
    Helper,
    /// A file relative to the source root.
    File(Utf8PathBuf),
}

impl TryFrom<String> for SchemaSource {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == HELPER_MARKER {
            Ok(SchemaSource::Helper)
        } else if value.is_empty() {
            Err("job source must not be empty".to_string())
        } else {
            Ok(SchemaSource::File(Utf8PathBuf::from(value)))
        }
    }
}

impl From<SchemaSource> for String {
    fn from(source: SchemaSource) -> Self {
        match source {
            SchemaSource::Helper => HELPER_MARKER.to_string(),
            SchemaSource::File(path) => path.into_string(),
        }
    }
}

impl std::fmt::Display for SchemaSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaSource::Helper => f.write_str(HELPER_MARKER),
            SchemaSource::File(path) => write!(f, "{path}"),
        }
    }
}

/// Immutable set of callback property names.
///
/// Matching is by property name only, regardless of the type that declares
/// the property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Denylist(IndexSet<String>);

impl Denylist {
    /// Builds a denylist from property names.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    /// Returns true if `name` is a denylisted property.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    /// Iterates over the names in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for Denylist {
    fn default() -> Self {
        Self::new(DEFAULT_CALLBACKS.iter().copied())
    }
}

/// Settings for the index document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct IndexSettings {
    /// Index file name relative to the output root.
    pub file: String,
    pub title: String,
    pub description: String,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            file: "schema.json".to_string(),
            title: "OS Protocol v1".to_string(),
            description: "JSON Schema index for the Agentic OS Protocol"
                .to_string(),
        }
    }
}

impl Manifest {
    /// Loads and validates a manifest, resolving its relative paths against
    /// the manifest's directory.
    pub fn load(path: &Utf8Path) -> Result<Self, ManifestError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            ManifestError::new(ManifestErrorKind::Io {
                path: path.to_owned(),
                source: e,
            })
        })?;
        let mut manifest: Manifest =
            serde_json::from_str(&json).map_err(|e| {
                ManifestError::new(ManifestErrorKind::Parse {
                    path: path.to_owned(),
                    source: e,
                })
            })?;
        manifest.validate()?;

        let base = path.parent().unwrap_or(Utf8Path::new(""));
        manifest.resolve_paths(base);
        manifest.origin = Some(path.to_owned());
        Ok(manifest)
    }

    /// Joins relative `source_root`, `helper` and `output_dir` onto `base`.
    pub fn resolve_paths(&mut self, base: &Utf8Path) {
        let resolve = |p: &Utf8Path| {
            if p.is_absolute() {
                p.to_owned()
            } else {
                base.join(p)
            }
        };
        self.source_root = resolve(&self.source_root);
        self.output_dir = resolve(&self.output_dir);
        self.helper = self.helper.as_deref().map(resolve);
    }

    /// Checks structural invariants that serde cannot express.
    ///
    /// Output paths must be relative and stay inside the output root, and
    /// `@helper` jobs require a configured helper file. No job may write
    /// the index file. Duplicate outputs are permitted (the later job overwrites the earlier file); see
    /// [`Manifest::duplicate_outputs`].
    pub fn validate(&self) -> Result<(), ManifestError> {
        check_output_path(&self.index.file, "index file")?;
        let index = normalized(&self.index.file);
        for job in &self.jobs {
            check_output_path(&job.output, &job.output)?;
            if normalized(&job.output) == index {
                return Err(ManifestError::invalid(format!(
                    "job output `{}` collides with the index file",
                    job.output
                )));
            }
            if job.type_name.is_empty() {
                return Err(ManifestError::invalid(format!(
                    "job `{}` has an empty type name",
                    job.output
                )));
            }
            if job.source == SchemaSource::Helper && self.helper.is_none() {
                return Err(ManifestError::invalid(format!(
                    "job `{}` uses {HELPER_MARKER} but no helper file is configured",
                    job.output
                )));
            }
        }
        Ok(())
    }

    /// Returns output paths that more than one job writes to, in manifest
    /// order of their second occurrence.
    pub fn duplicate_outputs(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.jobs
            .iter()
            .map(|job| job.output.as_str())
            .filter(|output| !seen.insert(*output))
            .collect()
    }

    /// Paths the run reads from: the source root, the helper file and the
    /// manifest itself. The output directory must not contain any of them.
    pub fn inputs(&self) -> impl Iterator<Item = &Utf8Path> {
        std::iter::once(self.source_root.as_path())
            .chain(self.helper.as_deref())
            .chain(self.origin.as_deref())
    }

    /// Resolves a job's source to a filesystem path.
    ///
    /// Returns `None` for `@helper` sources when no helper is configured.
    pub fn source_path(&self, source: &SchemaSource) -> Option<Utf8PathBuf> {
        match source {
            SchemaSource::Helper => self.helper.clone(),
            SchemaSource::File(path) if path.is_absolute() => Some(path.clone()),
            SchemaSource::File(path) => Some(self.source_root.join(path)),
        }
    }

    /// Returns the `$id` for a document written at `output`.
    pub fn schema_id(&self, output: &str) -> String {
        format!("{}/{output}", self.base_url.trim_end_matches('/'))
    }
}

fn check_output_path(output: &str, what: &str) -> Result<(), ManifestError> {
    let path = Utf8Path::new(output);
    let escapes = path
        .components()
        .any(|c| !matches!(c, Utf8Component::Normal(_) | Utf8Component::CurDir));
    if output.is_empty() || escapes {
        return Err(ManifestError::invalid(format!(
            "output path `{output}` for {what} must be relative to the output root"
        )));
    }
    Ok(())
}

/// Output path components with `.` segments dropped.
fn normalized(output: &str) -> Vec<&str> {
    Utf8Path::new(output)
        .components()
        .filter(|c| !matches!(c, Utf8Component::CurDir))
        .map(|c| c.as_str())
        .collect()
}
