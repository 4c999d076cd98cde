//! Shared proptest strategies for schema tests.

use proptest::collection::vec;
use proptest::prelude::*;
use serde_json::Value;

use crate::node::{
    AdditionalProperties, ObjectSchema, PrimitiveType, SchemaKind, SchemaNode,
};

/// Strategy for generating arbitrary identifier-like names.
pub fn arb_name() -> impl Strategy<Value = String> {
    "[a-z][a-zA-Z0-9]{0,11}"
}

fn arb_primitive() -> impl Strategy<Value = PrimitiveType> {
    prop_oneof![
        Just(PrimitiveType::String),
        Just(PrimitiveType::Number),
        Just(PrimitiveType::Boolean),
        Just(PrimitiveType::Null),
    ]
}

fn arb_leaf() -> impl Strategy<Value = SchemaNode> {
    let kind = prop_oneof![
        Just(SchemaKind::Any),
        Just(SchemaKind::Never),
        arb_primitive().prop_map(|ty| SchemaKind::Primitive { types: vec![ty] }),
        arb_name().prop_map(|name| SchemaKind::Ref {
            pointer: format!("#/definitions/{name}"),
        }),
        vec(arb_name(), 1..4).prop_map(|values| SchemaKind::Enum {
            types: vec![PrimitiveType::String],
            values: values.into_iter().map(Value::String).collect(),
        }),
        arb_name().prop_map(|value| SchemaKind::Const {
            value: Value::String(value),
        }),
        Just(SchemaKind::Function {
            signature: "(error: Error) => void".to_string(),
        }),
    ];
    (kind, proptest::option::of(arb_name())).prop_map(|(kind, description)| {
        let mut node = SchemaNode::new(kind);
        node.annotations.description = description;
        node
    })
}

/// Strategy for generating arbitrary schema trees up to a few levels deep.
pub fn arb_schema_node() -> impl Strategy<Value = SchemaNode> {
    arb_leaf().prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            vec((arb_name(), inner.clone(), any::<bool>()), 0..4).prop_map(
                |props| {
                    let mut object = ObjectSchema {
                        additional: AdditionalProperties::Forbidden,
                        ..ObjectSchema::default()
                    };
                    for (name, node, required) in props {
                        object.insert(name, node, required);
                    }
                    SchemaNode::object(object)
                }
            ),
            inner.clone().prop_map(|values| SchemaNode::new(SchemaKind::Map {
                values: Box::new(values),
            })),
            inner.clone().prop_map(|items| SchemaNode::new(SchemaKind::Array {
                items: Box::new(items),
            })),
            vec(inner.clone(), 0..3)
                .prop_map(|items| SchemaNode::new(SchemaKind::Tuple { items })),
            vec(inner.clone(), 0..3).prop_map(|variants| SchemaNode::new(
                SchemaKind::Union { variants }
            )),
            vec(inner, 0..3).prop_map(|parts| SchemaNode::new(
                SchemaKind::Intersection { parts }
            )),
        ]
    })
}
