//! The repository's own manifest must stay loadable.

use camino::Utf8PathBuf;
use indexmap::IndexSet;
use schemagen_schemas::{Manifest, SchemaSource};

fn repository_manifest() -> Manifest {
    let path = Utf8PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../schemagen.json");
    Manifest::load(&path).unwrap_or_else(|e| panic!("{e}"))
}

#[test]
fn loads_and_validates() {
    let manifest = repository_manifest();
    assert_eq!(manifest.jobs.len(), 32);
    assert!(manifest.duplicate_outputs().is_empty());
    assert!(manifest.helper.is_some());
    assert!(
        manifest
            .jobs
            .iter()
            .any(|job| job.source == SchemaSource::Helper)
    );
}

#[test]
fn groups_follow_output_directories() {
    let manifest = repository_manifest();
    let groups: IndexSet<_> =
        manifest.jobs.iter().map(|job| job.group_name()).collect();
    let groups: Vec<&str> = groups.iter().map(|group| &**group).collect();
    assert_eq!(
        groups,
        [
            "Workflows",
            "Runs",
            "System",
            "Context",
            "Actions",
            "Checks",
            "Apps"
        ]
    );
}
