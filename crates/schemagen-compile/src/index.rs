//! The cross-referencing index document.
//!
//! The index lists every job's output under its group, one `$ref` per
//! document. It is built from the manifest alone: referenced files are not
//! read back or checked for existence, so a failed job leaves a dangling
//! reference.

use schemagen_schemas::{
    DefinitionsKeyword, Manifest, ObjectSchema, PrimitiveType, SchemaDocument,
    SchemaNode,
};

/// Builds the index document for `manifest`.
///
/// Groups appear in the order their first job appears; within a group, keys
/// follow job order. A later job with the same group and key replaces the
/// earlier reference in place.
pub fn build_index(manifest: &Manifest) -> SchemaDocument {
    let mut body = SchemaNode::primitive(PrimitiveType::Object);
    let groups = &mut body.definitions_mut(DefinitionsKeyword::Defs).entries;

    for job in &manifest.jobs {
        let group = groups
            .entry(job.group_name().into_owned())
            .or_insert_with(|| SchemaNode::object(ObjectSchema::default()));
        if let Some(object) = group.as_object_mut() {
            object.insert(
                job.index_key().to_string(),
                SchemaNode::reference(job.output.as_str()),
                false,
            );
        }
    }

    SchemaDocument {
        dialect: manifest.dialect.clone(),
        id: manifest.schema_id(&manifest.index.file),
        title: manifest.index.title.clone(),
        description: manifest.index.description.clone(),
        body,
    }
}
