//! End-to-end tests for a generation run.
//!
//! Jobs run against a small on-disk type catalog with the real TypeScript
//! extractor; output goes to a temporary directory.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use schemagen_compile::{GenerationReport, run};
use schemagen_extract::{
    ExtractError, RawSchema, TypeExtractor, TypeScriptExtractor,
};
use schemagen_schemas::{
    DEFAULT_DIALECT, Denylist, IndexSettings, Manifest, SchemaJob,
    SchemaNode, SchemaSource,
};
use serde_json::{Value, json};
use tempfile::TempDir;

fn types_dir() -> Utf8PathBuf {
    Utf8PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/types")
}

fn job(source: &str, type_name: &str, output: &str, title: &str) -> SchemaJob {
    SchemaJob {
        source: if source == "@helper" {
            SchemaSource::Helper
        } else {
            SchemaSource::File(source.into())
        },
        type_name: type_name.to_string(),
        output: output.to_string(),
        title: title.to_string(),
        description: format!("{title} description"),
        group: None,
        key: None,
    }
}

fn manifest(out: &Utf8Path, jobs: Vec<SchemaJob>) -> Manifest {
    Manifest {
        base_url: "https://osprotocol.dev/v1".to_string(),
        dialect: DEFAULT_DIALECT.to_string(),
        source_root: types_dir(),
        helper: Some(types_dir().join("helper.ts")),
        output_dir: out.to_owned(),
        denylist: Denylist::default(),
        index: IndexSettings::default(),
        jobs,
        origin: None,
    }
}

fn catalog_jobs() -> Vec<SchemaJob> {
    vec![
        job("runs/retry.ts", "Retry", "runs/retry.json", "Retry Schema"),
        job("runs/cancel.ts", "Cancel", "runs/cancel.json", "Cancel Schema"),
        job("@helper", "EnvEntrySchema", "system/env.json", "Env Schema"),
    ]
}

fn out_dir(tmp: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(tmp.path().join("public/v1")).unwrap()
}

fn generate(manifest: &Manifest) -> GenerationReport {
    run(manifest, &mut TypeScriptExtractor::new()).expect("run")
}

fn read_json(path: &Utf8Path) -> Value {
    let text = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("reading {path}: {e}"));
    serde_json::from_str(&text).expect("valid JSON")
}

/// The concrete Retry scenario: callbacks removed, required untouched,
/// title from the job.
#[test]
fn retry_document() {
    let tmp = TempDir::new().unwrap();
    let out = out_dir(&tmp);
    let m = manifest(&out, catalog_jobs());

    let report = generate(&m);
    assert!(report.is_success(), "{:?}", report.failures);

    let value = read_json(&out.join("runs/retry.json"));
    let keys: Vec<_> = value.as_object().unwrap().keys().take(4).collect();
    assert_eq!(keys, ["$schema", "$id", "title", "description"]);
    assert_eq!(value["$schema"], DEFAULT_DIALECT);
    assert_eq!(value["$id"], "https://osprotocol.dev/v1/runs/retry.json");
    assert_eq!(value["title"], "Retry Schema");
    assert_eq!(value["description"], "Retry Schema description");

    let props: Vec<_> =
        value["properties"].as_object().unwrap().keys().collect();
    assert_eq!(props, ["attempts", "delayMs", "backoff", "maxDelayMs"]);
    assert_eq!(value["required"], json!(["attempts", "delayMs"]));
}

/// `reason` is not a callback and survives; the cancel hooks do not.
#[test]
fn cancel_document_keeps_reason() {
    let tmp = TempDir::new().unwrap();
    let out = out_dir(&tmp);
    generate(&manifest(&out, catalog_jobs()));

    let value = read_json(&out.join("runs/cancel.json"));
    let props = value["properties"].as_object().unwrap();
    assert!(props.contains_key("reason"));
    assert!(!props.contains_key("beforeCancel"));
    assert!(!props.contains_key("afterCancel"));
}

/// Helper-sourced jobs resolve through the manifest's helper file.
#[test]
fn helper_job() {
    let tmp = TempDir::new().unwrap();
    let out = out_dir(&tmp);
    generate(&manifest(&out, catalog_jobs()));

    let value = read_json(&out.join("system/env.json"));
    assert_eq!(value["properties"]["value"], json!({
        "type": "string",
        "description": "Variable value"
    }));
    assert_eq!(value["required"], json!(["key", "value"]));
}

#[test]
fn report_counts_index() {
    let tmp = TempDir::new().unwrap();
    let out = out_dir(&tmp);
    let report = generate(&manifest(&out, catalog_jobs()));

    assert_eq!(report.total, 4);
    assert_eq!(report.succeeded, 4);
    assert_eq!(
        report.written,
        [
            "runs/retry.json",
            "runs/cancel.json",
            "system/env.json",
            "schema.json"
        ]
    );
}

#[test]
fn idempotent_output() {
    let tmp = TempDir::new().unwrap();
    let out = out_dir(&tmp);
    let m = manifest(&out, catalog_jobs());

    generate(&m);
    let first: Vec<String> = ["runs/retry.json", "system/env.json", "schema.json"]
        .iter()
        .map(|p| fs::read_to_string(out.join(p)).unwrap())
        .collect();
    generate(&m);
    let second: Vec<String> = ["runs/retry.json", "system/env.json", "schema.json"]
        .iter()
        .map(|p| fs::read_to_string(out.join(p)).unwrap())
        .collect();
    assert_eq!(first, second);
}

#[test]
fn partial_failure_is_isolated() {
    let tmp = TempDir::new().unwrap();
    let out = out_dir(&tmp);
    let mut jobs = catalog_jobs();
    jobs.insert(
        1,
        job("runs/retry.ts", "DoesNotExist", "runs/missing.json", "Missing"),
    );
    let m = manifest(&out, jobs);

    let report = generate(&m);
    assert_eq!(report.total, 5);
    assert_eq!(report.succeeded, 4);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.failures[0].output, "runs/missing.json");
    let error = &report.failures[0].error;
    assert!(error.is_extraction());
    assert!(error.as_extraction().is_some_and(ExtractError::is_unknown_type));

    assert!(!out.join("runs/missing.json").exists());
    assert!(out.join("runs/retry.json").exists());
    assert!(out.join("runs/cancel.json").exists());

    // The index is still written and still references the failed output.
    let index = read_json(&out.join("schema.json"));
    assert_eq!(
        index["$defs"]["Runs"]["properties"]["missing"],
        json!({"$ref": "runs/missing.json"})
    );
}

#[test]
fn stale_files_are_removed() {
    let tmp = TempDir::new().unwrap();
    let out = out_dir(&tmp);
    fs::create_dir_all(out.join("legacy")).unwrap();
    fs::write(out.join("legacy/old.json"), "{}").unwrap();
    fs::write(out.join("notes.txt"), "hand-written").unwrap();

    generate(&manifest(&out, catalog_jobs()));
    assert!(!out.join("legacy").exists());
    assert!(!out.join("notes.txt").exists());
}

#[test]
fn index_lists_every_job() {
    let tmp = TempDir::new().unwrap();
    let out = out_dir(&tmp);
    generate(&manifest(&out, catalog_jobs()));

    let index = read_json(&out.join("schema.json"));
    assert_eq!(index["$id"], "https://osprotocol.dev/v1/schema.json");
    assert_eq!(index["title"], "OS Protocol v1");
    assert_eq!(index["type"], "object");
    assert!(index.get("properties").is_none());
    assert_eq!(
        index["$defs"],
        json!({
            "Runs": {
                "type": "object",
                "properties": {
                    "retry": {"$ref": "runs/retry.json"},
                    "cancel": {"$ref": "runs/cancel.json"}
                }
            },
            "System": {
                "type": "object",
                "properties": {
                    "env": {"$ref": "system/env.json"}
                }
            }
        })
    );
}

#[test]
fn output_directory_containing_sources_is_refused() {
    let tmp = TempDir::new().unwrap();
    let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap();
    let types = root.join("types");
    fs::create_dir_all(&types).unwrap();
    fs::write(types.join("a.ts"), "export type A = string").unwrap();

    let mut m = manifest(&root, vec![]);
    m.source_root = types.clone();
    m.helper = None;

    let err = run(&m, &mut TypeScriptExtractor::new()).unwrap_err();
    assert!(err.is_unsafe_reset());
    assert!(types.join("a.ts").exists());
}

#[test]
fn uncreatable_output_directory_is_fatal() {
    let tmp = TempDir::new().unwrap();
    let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap();
    let blocker = root.join("file");
    fs::write(&blocker, "").unwrap();

    let mut extractor = CountingExtractor::default();
    let m = manifest(&blocker.join("out"), catalog_jobs());
    let err = run(&m, &mut extractor).unwrap_err();
    assert!(err.is_directory());
    assert_eq!(extractor.calls, 0, "no job may run after a fatal error");
}

/// Extractor stub that returns a fixed schema with its own title and
/// description and counts invocations.
#[derive(Default)]
struct CountingExtractor {
    calls: usize,
}

impl TypeExtractor for CountingExtractor {
    fn extract(
        &mut self,
        _source: &Utf8Path,
        _type_name: &str,
    ) -> Result<RawSchema, ExtractError> {
        self.calls += 1;
        Ok(SchemaNode::from_value(json!({
            "type": "object",
            "title": "Extracted title",
            "description": "Extracted description",
            "properties": {
                "nested": {
                    "type": "object",
                    "properties": {"onFailed": {}, "ok": {}},
                    "required": ["onFailed", "ok"]
                }
            },
            "definitions": {
                "Hooks": {
                    "type": "object",
                    "properties": {"onStatusChange": {}, "onTimeoutCallback": {}}
                }
            }
        }))
        .expect("valid schema"))
    }
}

#[test]
fn job_metadata_wins_and_stub_output_is_redacted() {
    let tmp = TempDir::new().unwrap();
    let out = out_dir(&tmp);
    let mut extractor = CountingExtractor::default();
    let report = run(&manifest(&out, catalog_jobs()), &mut extractor).unwrap();
    assert!(report.is_success());
    assert_eq!(extractor.calls, 3);

    let value = read_json(&out.join("runs/cancel.json"));
    assert_eq!(value["title"], "Cancel Schema");
    assert_eq!(value["description"], "Cancel Schema description");
    assert_eq!(
        value["properties"]["nested"],
        json!({"type": "object", "properties": {"ok": {}}, "required": ["ok"]})
    );
    assert_eq!(value["definitions"]["Hooks"]["properties"], json!({}));
}
