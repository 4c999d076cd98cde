//! Finalized interchange documents.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::node::SchemaNode;

/// A schema wrapped with interchange metadata, ready to be written.
///
/// Serializes `$schema`, `$id`, `title` and `description` first, followed
/// by every key of `body` in its own order. Any `title` or `description`
/// the body carries is dropped: the document's values always win.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDocument {
    /// `$schema` dialect marker.
    pub dialect: String,
    /// `$id` identifier URI.
    pub id: String,
    pub title: String,
    pub description: String,
    pub body: SchemaNode,
}

impl SchemaDocument {
    /// Converts the document into a JSON value.
    pub fn to_value(&self) -> Value {
        let mut map = serde_json::Map::new();
        map.insert("$schema".into(), Value::String(self.dialect.clone()));
        map.insert("$id".into(), Value::String(self.id.clone()));
        map.insert("title".into(), Value::String(self.title.clone()));
        map.insert(
            "description".into(),
            Value::String(self.description.clone()),
        );
        for (key, value) in self.body_entries() {
            map.insert(key, value);
        }
        Value::Object(map)
    }

    /// Renders the document as pretty-printed JSON with a trailing newline.
    ///
    /// The output is a pure function of the document, so unchanged inputs
    /// reproduce byte-identical files.
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    fn body_entries(&self) -> impl Iterator<Item = (String, Value)> {
        self.body.to_map().into_iter().filter(|(key, _)| {
            !matches!(
                key.as_str(),
                "$schema" | "$id" | "title" | "description"
            )
        })
    }
}

impl Serialize for SchemaDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("$schema", &self.dialect)?;
        map.serialize_entry("$id", &self.id)?;
        map.serialize_entry("title", &self.title)?;
        map.serialize_entry("description", &self.description)?;
        for (key, value) in self.body_entries() {
            map.serialize_entry(&key, &value)?;
        }
        map.end()
    }
}
