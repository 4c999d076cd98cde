//! Typed JSON Schema trees.
//!
//! Extracted schemas are modelled as a tagged recursive variant rather than
//! an untyped JSON map, so passes such as callback redaction pattern-match on
//! node shape instead of probing for key presence.
//!
//! ## Key order
//!
//! Conversion to JSON is deterministic. Every node emits, in order:
//!
//! 1. the keywords that define its kind (`type`, `properties`, `items`, ...)
//! 2. annotations (`title`, `description`, `format`, bounds, `default`, ...)
//! 3. unrecognized keywords, in the order they were read
//! 4. the definitions table (`definitions` or `$defs`), if any
//!
//! Property maps keep the order the extractor produced them in.

use std::fmt;

use indexmap::IndexMap;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};

/// A root schema as returned by a type extractor.
///
/// Structurally identical to any other node; the alias names the role a
/// node plays when it carries the shared definitions table.
pub type RawSchema = SchemaNode;

/// JSON Schema primitive type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    String,
    Number,
    Integer,
    Boolean,
    Null,
    Object,
    Array,
}

impl PrimitiveType {
    /// Returns the keyword spelling of this type.
    pub fn as_str(self) -> &'static str {
        match self {
            PrimitiveType::String => "string",
            PrimitiveType::Number => "number",
            PrimitiveType::Integer => "integer",
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Null => "null",
            PrimitiveType::Object => "object",
            PrimitiveType::Array => "array",
        }
    }

    /// Parses a `type` keyword value.
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "string" => PrimitiveType::String,
            "number" => PrimitiveType::Number,
            "integer" => PrimitiveType::Integer,
            "boolean" => PrimitiveType::Boolean,
            "null" => PrimitiveType::Null,
            "object" => PrimitiveType::Object,
            "array" => PrimitiveType::Array,
            _ => return None,
        })
    }

    /// Returns the primitive type of a JSON literal.
    pub fn of_literal(value: &Value) -> Self {
        match value {
            Value::Null => PrimitiveType::Null,
            Value::Bool(_) => PrimitiveType::Boolean,
            Value::Number(_) => PrimitiveType::Number,
            Value::String(_) => PrimitiveType::String,
            Value::Array(_) => PrimitiveType::Array,
            Value::Object(_) => PrimitiveType::Object,
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an object schema treats properties it does not list.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AdditionalProperties {
    /// No `additionalProperties` keyword.
    #[default]
    Unspecified,
    /// `additionalProperties: false`.
    Forbidden,
    /// `additionalProperties: true`.
    Allowed,
    /// `additionalProperties: <schema>`, e.g. from an index signature.
    Schema(Box<SchemaNode>),
}

/// An object schema with named properties.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectSchema {
    /// Property schemas in declaration order.
    pub properties: IndexMap<String, SchemaNode>,
    /// Names of required properties, in declaration order.
    pub required: Vec<String>,
    pub additional: AdditionalProperties,
}

impl ObjectSchema {
    /// Inserts a property, recording it as required when `required` is set.
    ///
    /// Re-inserting an existing name replaces its schema in place (later
    /// declarations win, as with interface merging) and updates `required`.
    pub fn insert(&mut self, name: String, node: SchemaNode, required: bool) {
        self.required.retain(|r| *r != name);
        if required {
            self.required.push(name.clone());
        }
        self.properties.insert(name, node);
    }

    /// Removes a property and its `required` entry.
    pub fn remove(&mut self, name: &str) -> Option<SchemaNode> {
        self.required.retain(|r| r != name);
        self.properties.shift_remove(name)
    }
}

/// The shape-defining part of a schema node.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    /// `type: object` with `properties`.
    Object(ObjectSchema),
    /// `type: object` whose values all share one schema (`Record<string, V>`).
    Map { values: Box<SchemaNode> },
    /// Homogeneous array.
    Array { items: Box<SchemaNode> },
    /// Fixed-length array with positional item schemas.
    Tuple { items: Vec<SchemaNode> },
    /// `anyOf`.
    Union { variants: Vec<SchemaNode> },
    /// `allOf`.
    Intersection { parts: Vec<SchemaNode> },
    /// `enum`, optionally constrained by `type`.
    Enum {
        types: Vec<PrimitiveType>,
        values: Vec<Value>,
    },
    /// A single literal value.
    Const { value: Value },
    /// One or more bare primitive types.
    Primitive { types: Vec<PrimitiveType> },
    /// Accepts anything (`{}`).
    Any,
    /// Accepts nothing (`{"not": {}}`).
    Never,
    /// A pointer into a definitions table or another document.
    Ref { pointer: String },
    /// A function-valued member. Has no data representation; emitted as a
    /// `$comment` carrying the signature.
    Function { signature: String },
}

/// Descriptive and validation keywords that do not affect node shape.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Annotations {
    pub title: Option<String>,
    pub description: Option<String>,
    pub format: Option<String>,
    pub pattern: Option<String>,
    pub minimum: Option<Number>,
    pub maximum: Option<Number>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub default: Option<Value>,
    pub examples: Vec<Value>,
    pub deprecated: bool,
}

impl Annotations {
    /// Returns true if no annotation is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn write_into(&self, map: &mut Map<String, Value>) {
        if let Some(title) = &self.title {
            map.insert("title".into(), Value::String(title.clone()));
        }
        if let Some(description) = &self.description {
            map.insert("description".into(), Value::String(description.clone()));
        }
        if let Some(format) = &self.format {
            map.insert("format".into(), Value::String(format.clone()));
        }
        if let Some(pattern) = &self.pattern {
            map.insert("pattern".into(), Value::String(pattern.clone()));
        }
        if let Some(minimum) = &self.minimum {
            map.insert("minimum".into(), Value::Number(minimum.clone()));
        }
        if let Some(maximum) = &self.maximum {
            map.insert("maximum".into(), Value::Number(maximum.clone()));
        }
        if let Some(min_length) = self.min_length {
            map.insert("minLength".into(), Value::from(min_length));
        }
        if let Some(max_length) = self.max_length {
            map.insert("maxLength".into(), Value::from(max_length));
        }
        if let Some(default) = &self.default {
            map.insert("default".into(), default.clone());
        }
        if !self.examples.is_empty() {
            map.insert("examples".into(), Value::Array(self.examples.clone()));
        }
        if self.deprecated {
            map.insert("deprecated".into(), Value::Bool(true));
        }
    }

    /// Moves well-typed annotation keywords out of `map`.
    ///
    /// Keywords with an unexpected JSON type stay in the map and end up as
    /// unrecognized keywords on the node.
    fn take_from(map: &mut Map<String, Value>) -> Self {
        let mut out = Annotations::default();
        if let Some(Value::String(s)) = take_if(map, "title", Value::is_string) {
            out.title = Some(s);
        }
        if let Some(Value::String(s)) =
            take_if(map, "description", Value::is_string)
        {
            out.description = Some(s);
        }
        if let Some(Value::String(s)) = take_if(map, "format", Value::is_string)
        {
            out.format = Some(s);
        }
        if let Some(Value::String(s)) = take_if(map, "pattern", Value::is_string)
        {
            out.pattern = Some(s);
        }
        if let Some(Value::Number(n)) = take_if(map, "minimum", Value::is_number)
        {
            out.minimum = Some(n);
        }
        if let Some(Value::Number(n)) = take_if(map, "maximum", Value::is_number)
        {
            out.maximum = Some(n);
        }
        if let Some(v) = take_if(map, "minLength", Value::is_u64) {
            out.min_length = v.as_u64();
        }
        if let Some(v) = take_if(map, "maxLength", Value::is_u64) {
            out.max_length = v.as_u64();
        }
        out.default = map.shift_remove("default");
        if let Some(Value::Array(examples)) =
            take_if(map, "examples", Value::is_array)
        {
            out.examples = examples;
        }
        if let Some(Value::Bool(b)) = take_if(map, "deprecated", Value::is_boolean)
        {
            out.deprecated = b;
        }
        out
    }
}

/// Which keyword a definitions table is serialized under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DefinitionsKeyword {
    /// `definitions` (draft-07 spelling, used by extracted schemas).
    #[default]
    Definitions,
    /// `$defs` (2019-09 spelling, used by the index document).
    Defs,
}

impl DefinitionsKeyword {
    /// Returns the keyword spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            DefinitionsKeyword::Definitions => "definitions",
            DefinitionsKeyword::Defs => "$defs",
        }
    }
}

/// A table of named auxiliary schemas referenced via `$ref`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Definitions {
    pub keyword: DefinitionsKeyword,
    pub entries: IndexMap<String, SchemaNode>,
}

impl Definitions {
    /// Creates an empty table serialized under `keyword`.
    pub fn new(keyword: DefinitionsKeyword) -> Self {
        Self {
            keyword,
            entries: IndexMap::new(),
        }
    }
}

/// One node of a JSON Schema tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    pub kind: SchemaKind,
    pub annotations: Annotations,
    /// Definitions table carried by this node (normally only the root).
    pub definitions: Option<Definitions>,
    /// Keywords this model does not interpret, preserved verbatim.
    pub extra: Map<String, Value>,
}

impl From<SchemaKind> for SchemaNode {
    fn from(kind: SchemaKind) -> Self {
        Self::new(kind)
    }
}

impl SchemaNode {
    /// Creates a node of the given kind with no annotations.
    pub fn new(kind: SchemaKind) -> Self {
        Self {
            kind,
            annotations: Annotations::default(),
            definitions: None,
            extra: Map::new(),
        }
    }

    /// `{}`.
    pub fn any() -> Self {
        Self::new(SchemaKind::Any)
    }

    /// `{"not": {}}`.
    pub fn never() -> Self {
        Self::new(SchemaKind::Never)
    }

    /// A single primitive type.
    pub fn primitive(ty: PrimitiveType) -> Self {
        Self::new(SchemaKind::Primitive { types: vec![ty] })
    }

    /// An object schema.
    pub fn object(object: ObjectSchema) -> Self {
        Self::new(SchemaKind::Object(object))
    }

    /// A `$ref` pointer.
    pub fn reference(pointer: impl Into<String>) -> Self {
        Self::new(SchemaKind::Ref {
            pointer: pointer.into(),
        })
    }

    /// Sets the description annotation.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.annotations.description = Some(description.into());
        self
    }

    /// Returns the object schema if this node is one.
    pub fn as_object(&self) -> Option<&ObjectSchema> {
        match &self.kind {
            SchemaKind::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Returns the object schema mutably if this node is one.
    pub fn as_object_mut(&mut self) -> Option<&mut ObjectSchema> {
        match &mut self.kind {
            SchemaKind::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Returns the definitions table, creating it under `keyword` if absent.
    pub fn definitions_mut(
        &mut self,
        keyword: DefinitionsKeyword,
    ) -> &mut Definitions {
        self.definitions.get_or_insert_with(|| Definitions::new(keyword))
    }

    /// Looks up a local `#/definitions/<name>` or `#/$defs/<name>` pointer
    /// in this node's definitions table.
    pub fn resolve_local(&self, pointer: &str) -> Option<&SchemaNode> {
        let defs = self.definitions.as_ref()?;
        let prefix = format!("#/{}/", defs.keyword.as_str());
        let name = pointer.strip_prefix(&prefix)?;
        defs.entries.get(name)
    }

    /// Converts the node into a JSON value.
    pub fn to_value(&self) -> Value {
        Value::Object(self.to_map())
    }

    /// Converts the node into a JSON object map with deterministic key order.
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        self.write_kind(&mut map);
        self.annotations.write_into(&mut map);
        for (key, value) in &self.extra {
            map.insert(key.clone(), value.clone());
        }
        if let Some(defs) = &self.definitions {
            let entries = defs
                .entries
                .iter()
                .map(|(name, node)| (name.clone(), node.to_value()))
                .collect();
            map.insert(defs.keyword.as_str().into(), Value::Object(entries));
        }
        map
    }

    fn write_kind(&self, map: &mut Map<String, Value>) {
        match &self.kind {
            SchemaKind::Object(object) => {
                map.insert("type".into(), "object".into());
                let properties = object
                    .properties
                    .iter()
                    .map(|(name, node)| (name.clone(), node.to_value()))
                    .collect();
                map.insert("properties".into(), Value::Object(properties));
                if !object.required.is_empty() {
                    let required =
                        object.required.iter().cloned().map(Value::String);
                    map.insert("required".into(), required.collect());
                }
                match &object.additional {
                    AdditionalProperties::Unspecified => {}
                    AdditionalProperties::Forbidden => {
                        map.insert("additionalProperties".into(), false.into());
                    }
                    AdditionalProperties::Allowed => {
                        map.insert("additionalProperties".into(), true.into());
                    }
                    AdditionalProperties::Schema(node) => {
                        map.insert(
                            "additionalProperties".into(),
                            node.to_value(),
                        );
                    }
                }
            }
            SchemaKind::Map { values } => {
                map.insert("type".into(), "object".into());
                map.insert("additionalProperties".into(), values.to_value());
            }
            SchemaKind::Array { items } => {
                map.insert("type".into(), "array".into());
                map.insert("items".into(), items.to_value());
            }
            SchemaKind::Tuple { items } => {
                map.insert("type".into(), "array".into());
                map.insert(
                    "items".into(),
                    items.iter().map(SchemaNode::to_value).collect(),
                );
                map.insert("minItems".into(), Value::from(items.len()));
                map.insert("maxItems".into(), Value::from(items.len()));
            }
            SchemaKind::Union { variants } => {
                map.insert(
                    "anyOf".into(),
                    variants.iter().map(SchemaNode::to_value).collect(),
                );
            }
            SchemaKind::Intersection { parts } => {
                map.insert(
                    "allOf".into(),
                    parts.iter().map(SchemaNode::to_value).collect(),
                );
            }
            SchemaKind::Enum { types, values } => {
                if let Some(ty) = types_value(types) {
                    map.insert("type".into(), ty);
                }
                map.insert("enum".into(), Value::Array(values.clone()));
            }
            SchemaKind::Const { value } => {
                map.insert(
                    "type".into(),
                    PrimitiveType::of_literal(value).as_str().into(),
                );
                map.insert("const".into(), value.clone());
            }
            SchemaKind::Primitive { types } => {
                if let Some(ty) = types_value(types) {
                    map.insert("type".into(), ty);
                }
            }
            SchemaKind::Any => {}
            SchemaKind::Never => {
                map.insert("not".into(), Value::Object(Map::new()));
            }
            SchemaKind::Ref { pointer } => {
                map.insert("$ref".into(), Value::String(pointer.clone()));
            }
            SchemaKind::Function { signature } => {
                map.insert("$comment".into(), Value::String(signature.clone()));
            }
        }
    }

    /// Parses a JSON value into a typed node.
    ///
    /// `true` and `false` schemas become [`SchemaKind::Any`] and
    /// [`SchemaKind::Never`]. Keywords that do not select a kind or
    /// annotation are preserved in [`SchemaNode::extra`].
    pub fn from_value(value: Value) -> Result<Self, SchemaShapeError> {
        Self::from_value_at(value, "#")
    }

    fn from_value_at(value: Value, at: &str) -> Result<Self, SchemaShapeError> {
        let mut map = match value {
            Value::Object(map) => map,
            Value::Bool(true) => return Ok(Self::any()),
            Value::Bool(false) => return Ok(Self::never()),
            other => {
                return Err(SchemaShapeError::new(
                    at,
                    format!(
                        "expected a schema object, found {}",
                        PrimitiveType::of_literal(&other)
                    ),
                ));
            }
        };

        let definitions = take_definitions(&mut map, at)?;
        let annotations = Annotations::take_from(&mut map);
        let kind = take_kind(&mut map, at)?;
        Ok(Self {
            kind,
            annotations,
            definitions,
            extra: map,
        })
    }
}

impl Serialize for SchemaNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_map().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SchemaNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        SchemaNode::from_value(value).map_err(D::Error::custom)
    }
}

/// A JSON value that does not have the shape of a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaShapeError {
    /// JSON pointer of the offending node.
    pub pointer: String,
    pub message: String,
}

impl SchemaShapeError {
    fn new(pointer: &str, message: impl Into<String>) -> Self {
        Self {
            pointer: pointer.to_owned(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SchemaShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid schema at {}: {}", self.pointer, self.message)
    }
}

impl std::error::Error for SchemaShapeError {}

fn types_value(types: &[PrimitiveType]) -> Option<Value> {
    match types {
        [] => None,
        [single] => Some(single.as_str().into()),
        many => Some(many.iter().map(|t| Value::from(t.as_str())).collect()),
    }
}

fn take_if(
    map: &mut Map<String, Value>,
    key: &str,
    accept: impl Fn(&Value) -> bool,
) -> Option<Value> {
    if map.get(key).is_some_and(accept) {
        map.shift_remove(key)
    } else {
        None
    }
}

fn take_definitions(
    map: &mut Map<String, Value>,
    at: &str,
) -> Result<Option<Definitions>, SchemaShapeError> {
    let keyword = if map.contains_key("definitions") {
        DefinitionsKeyword::Definitions
    } else if map.contains_key("$defs") {
        DefinitionsKeyword::Defs
    } else {
        return Ok(None);
    };
    let Some(Value::Object(table)) = map.shift_remove(keyword.as_str()) else {
        return Err(SchemaShapeError::new(
            at,
            format!("`{}` must be an object", keyword.as_str()),
        ));
    };
    let mut defs = Definitions::new(keyword);
    for (name, value) in table {
        let child = format!("{at}/{}/{name}", keyword.as_str());
        defs.entries
            .insert(name, SchemaNode::from_value_at(value, &child)?);
    }
    Ok(Some(defs))
}

fn take_types(
    map: &mut Map<String, Value>,
    at: &str,
) -> Result<Vec<PrimitiveType>, SchemaShapeError> {
    let parse = |v: &Value| {
        v.as_str().and_then(PrimitiveType::parse).ok_or_else(|| {
            SchemaShapeError::new(at, format!("unknown type keyword {v}"))
        })
    };
    match map.shift_remove("type") {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => items.iter().map(parse).collect(),
        Some(single) => Ok(vec![parse(&single)?]),
    }
}

fn take_children(
    map: &mut Map<String, Value>,
    key: &str,
    at: &str,
) -> Result<Vec<SchemaNode>, SchemaShapeError> {
    let Some(Value::Array(items)) = map.shift_remove(key) else {
        return Err(SchemaShapeError::new(
            at,
            format!("`{key}` must be an array"),
        ));
    };
    items
        .into_iter()
        .enumerate()
        .map(|(i, v)| SchemaNode::from_value_at(v, &format!("{at}/{key}/{i}")))
        .collect()
}

fn take_kind(
    map: &mut Map<String, Value>,
    at: &str,
) -> Result<SchemaKind, SchemaShapeError> {
    if let Some(Value::String(pointer)) = take_if(map, "$ref", Value::is_string)
    {
        return Ok(SchemaKind::Ref { pointer });
    }
    if map.contains_key("properties") {
        return take_object(map, at).map(SchemaKind::Object);
    }
    if map.contains_key("anyOf") {
        let variants = take_children(map, "anyOf", at)?;
        return Ok(SchemaKind::Union { variants });
    }
    if map.contains_key("allOf") {
        let parts = take_children(map, "allOf", at)?;
        return Ok(SchemaKind::Intersection { parts });
    }
    if let Some(Value::Array(values)) = take_if(map, "enum", Value::is_array) {
        let types = take_types(map, at)?;
        return Ok(SchemaKind::Enum { types, values });
    }
    if let Some(value) = map.shift_remove("const") {
        map.shift_remove("type");
        return Ok(SchemaKind::Const { value });
    }
    if map.get("not").is_some_and(|v| v.as_object().is_some_and(Map::is_empty))
    {
        map.shift_remove("not");
        return Ok(SchemaKind::Never);
    }

    let types = take_types(map, at)?;
    match types.as_slice() {
        [PrimitiveType::Array] if map.get("items").is_some_and(Value::is_array) => {
            let items = take_children(map, "items", at)?;
            map.shift_remove("minItems");
            map.shift_remove("maxItems");
            Ok(SchemaKind::Tuple { items })
        }
        [PrimitiveType::Array] if map.contains_key("items") => {
            let items = map.shift_remove("items").unwrap_or(Value::Bool(true));
            let items = SchemaNode::from_value_at(items, &format!("{at}/items"))?;
            Ok(SchemaKind::Array {
                items: Box::new(items),
            })
        }
        [PrimitiveType::Object]
            if map.get("additionalProperties").is_some_and(Value::is_object) =>
        {
            let values =
                map.shift_remove("additionalProperties").unwrap_or_default();
            let values = SchemaNode::from_value_at(
                values,
                &format!("{at}/additionalProperties"),
            )?;
            Ok(SchemaKind::Map {
                values: Box::new(values),
            })
        }
        [PrimitiveType::Object]
            if map.get("additionalProperties") == Some(&Value::Bool(false)) =>
        {
            map.shift_remove("additionalProperties");
            Ok(SchemaKind::Object(ObjectSchema {
                additional: AdditionalProperties::Forbidden,
                ..ObjectSchema::default()
            }))
        }
        [] => {
            let only_comment = map.len() == 1
                && map.get("$comment").is_some_and(Value::is_string);
            if only_comment {
                if let Some(Value::String(signature)) = map.shift_remove("$comment")
                {
                    return Ok(SchemaKind::Function { signature });
                }
            }
            Ok(SchemaKind::Any)
        }
        _ => Ok(SchemaKind::Primitive { types }),
    }
}

fn take_object(
    map: &mut Map<String, Value>,
    at: &str,
) -> Result<ObjectSchema, SchemaShapeError> {
    if map.get("type").is_some_and(|t| t == "object") {
        map.shift_remove("type");
    }
    let Some(Value::Object(props)) = map.shift_remove("properties") else {
        return Err(SchemaShapeError::new(at, "`properties` must be an object"));
    };

    let mut object = ObjectSchema::default();
    for (name, value) in props {
        let child = format!("{at}/properties/{name}");
        object
            .properties
            .insert(name, SchemaNode::from_value_at(value, &child)?);
    }

    if let Some(required) = map.shift_remove("required") {
        let Value::Array(names) = required else {
            return Err(SchemaShapeError::new(at, "`required` must be an array"));
        };
        for name in names {
            let Value::String(name) = name else {
                return Err(SchemaShapeError::new(
                    at,
                    "`required` entries must be strings",
                ));
            };
            object.required.push(name);
        }
    }

    object.additional = match map.shift_remove("additionalProperties") {
        None => AdditionalProperties::Unspecified,
        Some(Value::Bool(false)) => AdditionalProperties::Forbidden,
        Some(Value::Bool(true)) => AdditionalProperties::Allowed,
        Some(other) => {
            let child = format!("{at}/additionalProperties");
            AdditionalProperties::Schema(Box::new(SchemaNode::from_value_at(
                other, &child,
            )?))
        }
    };
    Ok(object)
}
