//! Callback redaction.
//!
//! Function-valued properties (completion hooks, retry predicates, ...)
//! cannot be represented in an interchange schema. The redactor removes
//! every property whose name is on the [`Denylist`] from every `properties`
//! map in the tree, and drops the same names from `required`.
//!
//! Matching is by property name alone. A data-valued property that happens
//! to share a denylisted name is removed as well.

use schemagen_schemas::{
    AdditionalProperties, Denylist, ObjectSchema, RawSchema, SchemaKind,
    SchemaNode,
};
use serde_json::{Map, Value};
use tracing::trace;

/// Removes denylisted properties from schema trees.
#[derive(Debug, Clone)]
pub struct Redactor {
    denylist: Denylist,
}

impl Redactor {
    pub fn new(denylist: Denylist) -> Self {
        Self { denylist }
    }

    pub fn denylist(&self) -> &Denylist {
        &self.denylist
    }

    /// Returns `schema` with every denylisted property removed.
    ///
    /// The walk covers property values, every definitions entry (whatever
    /// its key), array and tuple items, union and intersection members, map
    /// values and `additionalProperties` schemas. Keywords the node model
    /// does not interpret are walked as plain JSON.
    ///
    /// Termination relies on the tree being finite: recursive types appear
    /// only as `$ref` strings, which are never followed.
    #[must_use]
    pub fn redact(&self, mut schema: RawSchema) -> RawSchema {
        self.redact_node(&mut schema);
        schema
    }

    fn redact_node(&self, node: &mut SchemaNode) {
        match &mut node.kind {
            SchemaKind::Object(object) => self.redact_object(object),
            SchemaKind::Map { values } => self.redact_node(values),
            SchemaKind::Array { items } => self.redact_node(items),
            SchemaKind::Tuple { items } => {
                items.iter_mut().for_each(|item| self.redact_node(item));
            }
            SchemaKind::Union { variants: nodes }
            | SchemaKind::Intersection { parts: nodes } => {
                nodes.iter_mut().for_each(|n| self.redact_node(n));
            }
            SchemaKind::Enum { .. }
            | SchemaKind::Const { .. }
            | SchemaKind::Primitive { .. }
            | SchemaKind::Any
            | SchemaKind::Never
            | SchemaKind::Ref { .. }
            | SchemaKind::Function { .. } => {}
        }

        // Definition names are type names, not properties: never filtered,
        // only descended into.
        if let Some(definitions) = &mut node.definitions {
            for entry in definitions.entries.values_mut() {
                self.redact_node(entry);
            }
        }

        // Keywords outside the node model can still carry `properties` or
        // `required`, e.g. next to a `$ref` or on an object with no
        // declared properties.
        self.redact_keywords(&mut node.extra);
    }

    fn redact_object(&self, object: &mut ObjectSchema) {
        let denied: Vec<String> = object
            .properties
            .keys()
            .filter(|name| self.denylist.contains(name))
            .cloned()
            .collect();
        for name in &denied {
            trace!(property = %name, "redacting callback property");
            object.properties.shift_remove(name);
        }
        object.required.retain(|name| !self.denylist.contains(name));

        for property in object.properties.values_mut() {
            self.redact_node(property);
        }
        if let AdditionalProperties::Schema(schema) = &mut object.additional {
            self.redact_node(schema);
        }
    }

    /// Applies the property rules to the keywords of a JSON schema object,
    /// then descends into every subschema it contains.
    fn redact_keywords(&self, keywords: &mut Map<String, Value>) {
        if let Some(Value::Object(properties)) = keywords.get_mut("properties")
        {
            properties.retain(|name, _| {
                let denied = self.denylist.contains(name);
                if denied {
                    trace!(property = %name, "redacting callback property");
                }
                !denied
            });
        }
        if let Some(Value::Array(required)) = keywords.get_mut("required") {
            required.retain(|name| {
                name.as_str()
                    .is_none_or(|name| !self.denylist.contains(name))
            });
        }

        for (keyword, value) in keywords.iter_mut() {
            match (keyword.as_str(), value) {
                // Maps from names to subschemas, not schemas themselves.
                (
                    "properties" | "patternProperties" | "definitions" | "$defs",
                    Value::Object(entries),
                ) => {
                    for entry in entries.values_mut() {
                        self.redact_value(entry);
                    }
                }
                (_, value) => self.redact_value(value),
            }
        }
    }

    /// Applies the same rules to an uninterpreted JSON subtree, e.g. the
    /// body of an `if`/`then` keyword.
    fn redact_value(&self, value: &mut Value) {
        match value {
            Value::Object(map) => self.redact_keywords(map),
            Value::Array(items) => {
                items.iter_mut().for_each(|item| self.redact_value(item));
            }
            Value::Null
            | Value::Bool(_)
            | Value::Number(_)
            | Value::String(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use schemagen_schemas::{
        Definitions, DefinitionsKeyword, PrimitiveType,
    };
    use serde_json::json;

    use super::*;

    fn redactor() -> Redactor {
        Redactor::new(Denylist::default())
    }

    fn node(value: Value) -> SchemaNode {
        SchemaNode::from_value(value).expect("valid schema")
    }

    #[test]
    fn retry_scenario() {
        let raw = node(json!({
            "type": "object",
            "properties": {
                "attempts": {"type": "number"},
                "delayMs": {"type": "number"},
                "backoff": {"$ref": "#/definitions/Backoff"},
                "maxDelayMs": {"type": "number"},
                "onRetry": {"$comment": "(error: Error, attempt: number) => void"},
                "shouldRetry": {"$comment": "(error: Error) => boolean"}
            },
            "required": ["attempts", "delayMs"],
            "additionalProperties": false,
            "definitions": {
                "Backoff": {"type": "string", "enum": ["none", "linear", "exponential"]}
            }
        }));

        let value = redactor().redact(raw).to_value();
        let keys: Vec<_> =
            value["properties"].as_object().unwrap().keys().collect();
        assert_eq!(keys, ["attempts", "delayMs", "backoff", "maxDelayMs"]);
        assert_eq!(value["required"], json!(["attempts", "delayMs"]));
        assert_eq!(value["definitions"]["Backoff"]["enum"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn reason_survives_and_stays_required() {
        let raw = node(json!({
            "type": "object",
            "properties": {
                "beforeCancel": {"$comment": "() => boolean"},
                "afterCancel": {"$comment": "() => void"},
                "reason": {"type": "string"}
            },
            "required": ["beforeCancel", "reason"]
        }));
        let value = redactor().redact(raw).to_value();
        assert_eq!(value["properties"], json!({"reason": {"type": "string"}}));
        assert_eq!(value["required"], json!(["reason"]));
    }

    #[test]
    fn properties_next_to_a_ref_are_filtered() {
        let raw = node(json!({
            "$ref": "#/definitions/Base",
            "properties": {"onRetry": {}, "keep": {}},
            "required": ["onRetry", "keep"]
        }));
        assert!(matches!(raw.kind, SchemaKind::Ref { .. }));

        let value = redactor().redact(raw).to_value();
        assert_eq!(value["$ref"], "#/definitions/Base");
        assert_eq!(value["properties"], json!({"keep": {}}));
        assert_eq!(value["required"], json!(["keep"]));
    }

    #[test]
    fn required_without_properties_is_filtered() {
        let raw = node(json!({
            "type": "object",
            "additionalProperties": false,
            "required": ["onComplete", "id"]
        }));
        let value = redactor().redact(raw).to_value();
        assert_eq!(value["required"], json!(["id"]));
    }

    #[test]
    fn uninterpreted_property_maps_are_not_treated_as_schemas() {
        let raw = node(json!({
            "type": "string",
            "if": {
                "properties": {
                    "required": {"type": "boolean"},
                    "nested": {"properties": {"shouldRetry": {}}}
                }
            }
        }));
        let value = redactor().redact(raw).to_value();
        assert_eq!(
            value["if"]["properties"]["required"],
            json!({"type": "boolean"})
        );
        assert_eq!(value["if"]["properties"]["nested"]["properties"], json!({}));
    }

    #[test]
    fn descends_into_definitions_and_nested_shapes() {
        let raw = node(json!({
            "type": "object",
            "properties": {
                "options": {
                    "type": "object",
                    "properties": {
                        "onComplete": {"$comment": "() => void"},
                        "id": {"type": "string"}
                    },
                    "required": ["onComplete", "id"]
                },
                "steps": {
                    "type": "array",
                    "items": {
                        "anyOf": [
                            {"type": "object", "properties": {"onFailed": {}}},
                            {"type": "string"}
                        ]
                    }
                }
            },
            "definitions": {
                "onRetry": {
                    "type": "object",
                    "properties": {"onRetry": {}, "kept": {}},
                    "required": ["onRetry"]
                }
            }
        }));
        let value = redactor().redact(raw).to_value();
        assert_eq!(
            value["properties"]["options"]["required"],
            json!(["id"])
        );
        assert!(value["properties"]["options"]["properties"]
            .get("onComplete")
            .is_none());
        assert_eq!(
            value["properties"]["steps"]["items"]["anyOf"][0]["properties"],
            json!({})
        );
        // Definition keys are not filtered, only their contents.
        let def = &value["definitions"]["onRetry"];
        assert_eq!(def["properties"], json!({"kept": {}}));
        assert!(def.get("required").is_none());
    }

    #[test]
    fn defs_keyword_and_uninterpreted_keywords() {
        let mut root = SchemaNode::primitive(PrimitiveType::Object);
        root.extra.insert(
            "if".into(),
            json!({"properties": {"onStatusChange": {}, "x": {}}, "required": ["onStatusChange"]}),
        );
        let mut defs = Definitions::new(DefinitionsKeyword::Defs);
        defs.entries.insert(
            "Group".into(),
            node(json!({"type": "object", "properties": {"shouldRetry": {}}})),
        );
        root.definitions = Some(defs);

        let value = redactor().redact(root).to_value();
        assert_eq!(
            value["if"],
            json!({"properties": {"x": {}}, "required": []})
        );
        assert_eq!(value["$defs"]["Group"]["properties"], json!({}));
    }

    #[test]
    fn custom_denylist() {
        let raw = node(json!({
            "type": "object",
            "properties": {"onRetry": {}, "metadata": {}}
        }));
        let value = Redactor::new(Denylist::new(["metadata"]))
            .redact(raw)
            .to_value();
        assert_eq!(value["properties"], json!({"onRetry": {}}));
    }

    #[test]
    fn trees_without_callbacks_are_unchanged() {
        let raw = node(json!({
            "type": "object",
            "properties": {"a": {"type": ["string", "null"]}},
            "required": ["a"],
            "additionalProperties": {"type": "number"}
        }));
        assert_eq!(redactor().redact(raw.clone()), raw);
    }

    const NAMES: &[&str] = &[
        "id",
        "reason",
        "status",
        "onComplete",
        "onFailed",
        "onRetry",
        "shouldRetry",
        "afterCancel",
    ];

    fn name() -> impl Strategy<Value = String> {
        proptest::sample::select(NAMES).prop_map(str::to_string)
    }

    fn leaf() -> impl Strategy<Value = SchemaNode> {
        prop_oneof![
            Just(SchemaNode::any()),
            Just(SchemaNode::primitive(PrimitiveType::String)),
            Just(SchemaNode::reference("#/definitions/X")),
            name().prop_map(|n| SchemaNode::new(SchemaKind::Function {
                signature: format!("({n}) => void")
            })),
        ]
    }

    fn tree() -> impl Strategy<Value = SchemaNode> {
        leaf().prop_recursive(4, 48, 4, |inner| {
            prop_oneof![
                (
                    proptest::collection::vec((name(), inner.clone()), 0..4),
                    proptest::collection::vec(name(), 0..3),
                )
                    .prop_map(|(props, required)| {
                        let mut object = ObjectSchema::default();
                        for (name, node) in props {
                            object.insert(name, node, false);
                        }
                        object.required = required;
                        SchemaNode::object(object)
                    }),
                inner.clone().prop_map(|items| SchemaNode::new(
                    SchemaKind::Array {
                        items: Box::new(items)
                    }
                )),
                proptest::collection::vec(inner.clone(), 1..3).prop_map(
                    |variants| SchemaNode::new(SchemaKind::Union { variants })
                ),
                (inner.clone(), proptest::collection::vec((name(), inner), 1..3))
                    .prop_map(|(mut root, defs)| {
                        let mut table =
                            Definitions::new(DefinitionsKeyword::Definitions);
                        table.entries.extend(defs);
                        root.definitions = Some(table);
                        root
                    }),
            ]
        })
    }

    /// Collects every property name and `required` entry in a JSON tree.
    fn property_names(value: &Value, out: &mut Vec<String>) {
        match value {
            Value::Object(map) => {
                if let Some(Value::Object(props)) = map.get("properties") {
                    out.extend(props.keys().cloned());
                }
                if let Some(Value::Array(required)) = map.get("required") {
                    out.extend(
                        required.iter().filter_map(Value::as_str).map(str::to_string),
                    );
                }
                map.values().for_each(|v| property_names(v, out));
            }
            Value::Array(items) => {
                items.iter().for_each(|v| property_names(v, out));
            }
            _ => {}
        }
    }

    proptest! {
        #[test]
        fn no_denylisted_name_survives(schema in tree()) {
            let denylist = Denylist::default();
            let value = Redactor::new(denylist.clone()).redact(schema).to_value();
            let mut names = Vec::new();
            property_names(&value, &mut names);
            for name in names {
                prop_assert!(!denylist.contains(&name), "{name} survived");
            }
        }

        #[test]
        fn redaction_is_idempotent(schema in tree()) {
            let once = redactor().redact(schema);
            prop_assert_eq!(redactor().redact(once.clone()), once);
        }
    }
}
