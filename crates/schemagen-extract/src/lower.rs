//! Lowering of parsed TypeScript types to [`SchemaNode`] trees.
//!
//! Named, non-generic declarations are lowered once into a shared
//! `definitions` table and referenced by `$ref`; a placeholder entry is
//! reserved before the body is lowered, so self-referential types terminate.
//! Generic declarations are instantiated inline: type arguments are lowered
//! in the caller's scope and bound by name while the body is lowered.
//!
//! The result never nests a type inside itself literally. Cycles only ever
//! appear as `$ref` strings, which keeps every later tree walk finite.

use std::collections::{HashMap, HashSet};

use camino::Utf8Path;
use indexmap::IndexMap;
use schemagen_schemas::{
    AdditionalProperties, Definitions, DefinitionsKeyword, ObjectSchema,
    PrimitiveType, SchemaKind, SchemaNode,
};
use serde_json::Value;
use tracing::debug;

use crate::ast::{DeclarationBody, EnumMember, Keyword, Literal, Member, Type};
use crate::error::ExtractError;
use crate::jsdoc::Doc;
use crate::program::{DeclKey, ModuleId, Program};

/// Type parameters bound to their lowered arguments.
type Env = HashMap<String, SchemaNode>;

/// Where a type expression is being lowered: the module whose imports
/// resolve its names, and the type parameters in scope.
#[derive(Clone, Copy)]
struct Scope<'e> {
    module: ModuleId,
    env: &'e Env,
}

const DEFINITIONS_PREFIX: &str = "#/definitions/";

/// Lowers the declaration `type_name` exported from `path`.
///
/// The root is lowered inline (never a bare `$ref`); an alias that merely
/// names another declaration is followed to that declaration.
pub(crate) fn lower_root(
    program: &mut Program,
    path: &Utf8Path,
    type_name: &str,
) -> Result<SchemaNode, ExtractError> {
    let module = program.load(path)?;
    let requested = program
        .resolve_export(module, type_name, &mut HashSet::new())?
        .ok_or_else(|| ExtractError::unknown_type(type_name, path))?;

    let mut lowerer = Lowerer::new(program);
    let (key, outer_doc) = lowerer.follow_aliases(requested)?;
    let mut root = lowerer.instantiate_guarded(&key, Vec::new(), type_name)?;
    if let Some(doc) = outer_doc {
        doc.apply(&mut root.annotations);
    }

    if !lowerer.definitions.is_empty() {
        let mut definitions = Definitions::new(DefinitionsKeyword::Definitions);
        definitions.entries = lowerer.definitions;
        root.definitions = Some(definitions);
    }
    Ok(root)
}

struct Lowerer<'p> {
    program: &'p mut Program,
    /// The shared definitions table, in first-reference order.
    definitions: IndexMap<String, SchemaNode>,
    /// Definition name assigned to each non-generic declaration.
    names: HashMap<DeclKey, String>,
    /// Definitions whose body is still being lowered.
    pending: HashSet<String>,
    /// Declarations currently being instantiated inline.
    instantiating: Vec<DeclKey>,
    /// Human-readable names of the declarations being lowered, innermost
    /// last. Used as error context.
    context: Vec<String>,
}

impl<'p> Lowerer<'p> {
    fn new(program: &'p mut Program) -> Self {
        Self {
            program,
            definitions: IndexMap::new(),
            names: HashMap::new(),
            pending: HashSet::new(),
            instantiating: Vec::new(),
            context: Vec::new(),
        }
    }

    fn unsupported(&self, construct: impl Into<String>) -> ExtractError {
        let context = match self.context.last() {
            Some(name) => name.clone(),
            None => "root type".to_string(),
        };
        ExtractError::unsupported(construct, context)
    }

    /// Follows `type A = B` chains where `B` names another declaration
    /// without type arguments. Returns the final declaration and the doc
    /// comment of the first one, if the chain was followed at all.
    fn follow_aliases(
        &mut self,
        mut key: DeclKey,
    ) -> Result<(DeclKey, Option<Doc>), ExtractError> {
        let first_doc = self
            .program
            .module(key.module)
            .declaration(&key.name)
            .and_then(|decl| decl.doc.clone());
        let mut seen = HashSet::new();
        loop {
            if !seen.insert(key.clone()) {
                return Err(ExtractError::cyclic_alias(&key.name));
            }
            let module = self.program.module(key.module);
            let Some(decl) = module.declaration(&key.name) else {
                break;
            };
            let DeclarationBody::Alias(Type::Reference { name, args }) =
                &decl.body
            else {
                break;
            };
            if !decl.params.is_empty() || !args.is_empty() {
                break;
            }
            match self.program.resolve(key.module, name)? {
                Some(next) => key = next,
                None => break,
            }
        }
        let followed = seen.len() > 1;
        Ok((key, if followed { first_doc } else { None }))
    }

    /// Instantiates a declaration inline, failing if it is already being
    /// instantiated further up the stack.
    fn instantiate_guarded(
        &mut self,
        key: &DeclKey,
        args: Vec<SchemaNode>,
        display_name: &str,
    ) -> Result<SchemaNode, ExtractError> {
        if self.instantiating.contains(key) {
            return Err(ExtractError::recursive_generic(display_name));
        }
        self.instantiating.push(key.clone());
        let result = self.instantiate(key, args);
        self.instantiating.pop();
        result
    }

    /// Lowers a declaration body with its type parameters bound to `args`,
    /// falling back to declared defaults for missing arguments.
    fn instantiate(
        &mut self,
        key: &DeclKey,
        args: Vec<SchemaNode>,
    ) -> Result<SchemaNode, ExtractError> {
        let module = self.program.module(key.module);
        let Some(decl) = module.declaration(&key.name) else {
            return Err(ExtractError::unknown_type(&key.name, &module.path));
        };

        let mut args = args.into_iter();
        let mut env = Env::new();
        for param in &decl.params {
            let node = match (args.next(), &param.default) {
                (Some(arg), _) => arg,
                (None, Some(default)) => {
                    let scope = Scope {
                        module: key.module,
                        env: &env,
                    };
                    self.lower(default, scope)?
                }
                (None, None) => {
                    return Err(self.unsupported(format!(
                        "generic type `{}` without type arguments",
                        decl.name
                    )));
                }
            };
            env.insert(param.name.clone(), node);
        }

        let scope = Scope {
            module: key.module,
            env: &env,
        };
        self.context
            .push(format!("`{}` ({})", decl.name, module.path));
        let result = match &decl.body {
            DeclarationBody::Interface { extends, members } => {
                self.interface(extends, members, scope)
            }
            DeclarationBody::Alias(ty) => self.lower(ty, scope),
            DeclarationBody::Enum(members) => Ok(enumeration(members)),
        };
        self.context.pop();

        let mut node = result?;
        if let Some(doc) = &decl.doc {
            doc.apply(&mut node.annotations);
        }
        Ok(node)
    }

    /// Returns a `$ref` to the definition of a non-generic declaration,
    /// lowering it into the table on first use.
    fn definition_ref(
        &mut self,
        key: &DeclKey,
    ) -> Result<SchemaNode, ExtractError> {
        if let Some(name) = self.names.get(key) {
            return Ok(SchemaNode::reference(format!(
                "{DEFINITIONS_PREFIX}{name}"
            )));
        }

        let name = self.unique_name(&key.name);
        debug!(definition = %name, "lowering definition");
        self.names.insert(key.clone(), name.clone());
        self.pending.insert(name.clone());
        // Reserve the slot so the table keeps first-reference order.
        self.definitions.insert(name.clone(), SchemaNode::any());

        let result = self.instantiate(key, Vec::new());
        self.pending.remove(&name);
        let node = result?;
        self.definitions.insert(name.clone(), node);
        Ok(SchemaNode::reference(format!("{DEFINITIONS_PREFIX}{name}")))
    }

    /// Picks a definitions key for `base` that no other declaration holds.
    fn unique_name(&self, base: &str) -> String {
        if !self.definitions.contains_key(base) {
            return base.to_string();
        }
        (2..)
            .map(|n| format!("{base}_{n}"))
            .find(|name| !self.definitions.contains_key(name))
            .unwrap_or_else(|| base.to_string())
    }

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------

    fn lower(
        &mut self,
        ty: &Type,
        scope: Scope<'_>,
    ) -> Result<SchemaNode, ExtractError> {
        match ty {
            Type::Keyword(keyword) => self.keyword(*keyword),
            Type::Literal(literal) => Ok(SchemaKind::Const {
                value: literal_value(literal),
            }
            .into()),
            Type::Template => Ok(SchemaNode::primitive(PrimitiveType::String)),
            Type::Reference { name, args } => {
                self.reference(name, args, scope)
            }
            Type::Array(item) => Ok(array_of(self.lower(item, scope)?)),
            Type::Tuple(items) => Ok(SchemaKind::Tuple {
                items: self.lower_all(items, scope)?,
            }
            .into()),
            Type::Union(variants) => self.union(variants, scope),
            Type::Intersection(parts) => self.intersection(parts, scope),
            Type::Object(members) => {
                let mut object = ObjectSchema {
                    additional: AdditionalProperties::Forbidden,
                    ..ObjectSchema::default()
                };
                self.members(&mut object, members, scope)?;
                Ok(SchemaNode::object(object))
            }
            Type::Function { signature } => Ok(SchemaKind::Function {
                signature: signature.clone(),
            }
            .into()),
            Type::Unsupported { construct } => Err(self.unsupported(*construct)),
        }
    }

    fn lower_all(
        &mut self,
        types: &[Type],
        scope: Scope<'_>,
    ) -> Result<Vec<SchemaNode>, ExtractError> {
        types.iter().map(|ty| self.lower(ty, scope)).collect()
    }

    /// Lowers a type argument, defaulting to `{}` when it is omitted.
    fn lower_arg(
        &mut self,
        args: &[Type],
        index: usize,
        scope: Scope<'_>,
    ) -> Result<SchemaNode, ExtractError> {
        match args.get(index) {
            Some(ty) => self.lower(ty, scope),
            None => Ok(SchemaNode::any()),
        }
    }

    /// Like [`lower`](Self::lower), but a reference to a declaration is
    /// expanded in place instead of becoming a `$ref`. Used where the shape
    /// is consumed immediately (`extends`, utility types).
    fn lower_inline(
        &mut self,
        ty: &Type,
        scope: Scope<'_>,
    ) -> Result<SchemaNode, ExtractError> {
        if let Type::Reference { name, args } = ty {
            let is_param = args.is_empty() && scope.env.contains_key(name);
            if !is_param {
                if let Some(key) = self.program.resolve(scope.module, name)? {
                    let args = self.lower_all(args, scope)?;
                    return self.instantiate_guarded(&key, args, name);
                }
            }
        }
        self.lower(ty, scope)
    }

    fn keyword(&self, keyword: Keyword) -> Result<SchemaNode, ExtractError> {
        Ok(match keyword {
            Keyword::String => SchemaNode::primitive(PrimitiveType::String),
            Keyword::Number => SchemaNode::primitive(PrimitiveType::Number),
            Keyword::BigInt => SchemaNode::primitive(PrimitiveType::Integer),
            Keyword::Boolean => SchemaNode::primitive(PrimitiveType::Boolean),
            Keyword::Null => SchemaNode::primitive(PrimitiveType::Null),
            Keyword::Object => SchemaNode::primitive(PrimitiveType::Object),
            Keyword::Unknown | Keyword::Any => SchemaNode::any(),
            Keyword::Undefined | Keyword::Void | Keyword::Never => {
                SchemaNode::never()
            }
            Keyword::Symbol => return Err(self.unsupported("symbol type")),
        })
    }

    fn reference(
        &mut self,
        name: &str,
        args: &[Type],
        scope: Scope<'_>,
    ) -> Result<SchemaNode, ExtractError> {
        if args.is_empty() {
            if let Some(bound) = scope.env.get(name) {
                return Ok(bound.clone());
            }
        }

        let Some(key) = self.program.resolve(scope.module, name)? else {
            return self.builtin(name, args, scope);
        };
        let generic = self
            .program
            .module(key.module)
            .declaration(&key.name)
            .is_some_and(|decl| !decl.params.is_empty());
        if generic {
            let args = self.lower_all(args, scope)?;
            self.instantiate_guarded(&key, args, name)
        } else {
            self.definition_ref(&key)
        }
    }

    /// Global types from the TypeScript standard library.
    fn builtin(
        &mut self,
        name: &str,
        args: &[Type],
        scope: Scope<'_>,
    ) -> Result<SchemaNode, ExtractError> {
        match name {
            "Array" | "ReadonlyArray" => {
                Ok(array_of(self.lower_arg(args, 0, scope)?))
            }
            "Set" | "ReadonlySet" => {
                let mut node = array_of(self.lower_arg(args, 0, scope)?);
                node.extra.insert("uniqueItems".into(), Value::Bool(true));
                Ok(node)
            }
            "Map" | "ReadonlyMap" => Ok(SchemaKind::Map {
                values: Box::new(self.lower_arg(args, 1, scope)?),
            }
            .into()),
            "Record" => self.record(args, scope),
            "Partial" | "Required" | "Readonly" | "Pick" | "Omit" => {
                self.utility(name, args, scope)
            }
            "Promise" | "PromiseLike" | "Awaited" => {
                self.lower_arg(args, 0, scope)
            }
            "NonNullable" => Ok(without_null(self.lower_arg(args, 0, scope)?)),
            "Date" => {
                let mut node = SchemaNode::primitive(PrimitiveType::String);
                node.annotations.format = Some("date-time".into());
                Ok(node)
            }
            "RegExp" => {
                let mut node = SchemaNode::primitive(PrimitiveType::String);
                node.annotations.format = Some("regex".into());
                Ok(node)
            }
            "Error" => {
                let mut object = ObjectSchema {
                    additional: AdditionalProperties::Forbidden,
                    ..ObjectSchema::default()
                };
                let string = || SchemaNode::primitive(PrimitiveType::String);
                object.insert("name".into(), string(), true);
                object.insert("message".into(), string(), true);
                object.insert("stack".into(), string(), false);
                Ok(SchemaNode::object(object))
            }
            "String" => Ok(SchemaNode::primitive(PrimitiveType::String)),
            "Number" => Ok(SchemaNode::primitive(PrimitiveType::Number)),
            "Boolean" => Ok(SchemaNode::primitive(PrimitiveType::Boolean)),
            "Object" => Ok(SchemaNode::primitive(PrimitiveType::Object)),
            "Function" => Ok(SchemaKind::Function {
                signature: "Function".into(),
            }
            .into()),
            _ => Err(ExtractError::unknown_type(
                name,
                &self.program.module(scope.module).path,
            )),
        }
    }

    /// `Record<K, V>`: a map for open key types, an object for literal keys.
    fn record(
        &mut self,
        args: &[Type],
        scope: Scope<'_>,
    ) -> Result<SchemaNode, ExtractError> {
        let key = self.lower_arg(args, 0, scope)?;
        let value = self.lower_arg(args, 1, scope)?;

        if let SchemaKind::Primitive { types } = &key.kind {
            if types.iter().all(|t| {
                matches!(t, PrimitiveType::String | PrimitiveType::Number)
            }) {
                return Ok(SchemaKind::Map {
                    values: Box::new(value),
                }
                .into());
            }
        }
        let Some(keys) = literal_keys(&key) else {
            return Err(self.unsupported("`Record` key type"));
        };
        let mut object = ObjectSchema {
            additional: AdditionalProperties::Forbidden,
            ..ObjectSchema::default()
        };
        for name in keys {
            object.insert(name, value.clone(), true);
        }
        Ok(SchemaNode::object(object))
    }

    /// `Partial`, `Required`, `Readonly`, `Pick` and `Omit`.
    fn utility(
        &mut self,
        name: &str,
        args: &[Type],
        scope: Scope<'_>,
    ) -> Result<SchemaNode, ExtractError> {
        let Some(target) = args.first() else {
            return Err(self.unsupported(format!("`{name}` without arguments")));
        };
        let target = self.lower_inline(target, scope)?;
        if name == "Readonly" {
            return Ok(target);
        }
        let Some(mut object) = self.object_shape(&target) else {
            return Err(self.unsupported(format!("`{name}` of a non-object type")));
        };

        match name {
            "Partial" => object.required.clear(),
            "Required" => {
                object.required = object.properties.keys().cloned().collect();
            }
            _ => {
                let keys = self.lower_arg(args, 1, scope)?;
                let Some(keys) = literal_keys(&keys) else {
                    return Err(self.unsupported(format!("`{name}` key type")));
                };
                let keep_listed = name == "Pick";
                let names: Vec<String> =
                    object.properties.keys().cloned().collect();
                for property in names {
                    if keys.contains(&property) != keep_listed {
                        object.remove(&property);
                    }
                }
            }
        }
        Ok(SchemaNode::object(object))
    }

    /// The object shape of a node, looking through `$ref`s into the
    /// definitions table. Returns `None` for non-objects and for
    /// definitions that are still being lowered.
    fn object_shape(&self, node: &SchemaNode) -> Option<ObjectSchema> {
        match &node.kind {
            SchemaKind::Object(object) => Some(object.clone()),
            SchemaKind::Ref { pointer } => {
                let name = pointer.strip_prefix(DEFINITIONS_PREFIX)?;
                if self.pending.contains(name) {
                    return None;
                }
                self.object_shape(self.definitions.get(name)?)
            }
            _ => None,
        }
    }

    fn union(
        &mut self,
        variants: &[Type],
        scope: Scope<'_>,
    ) -> Result<SchemaNode, ExtractError> {
        let mut nodes = Vec::new();
        for variant in variants {
            if *variant == Type::Keyword(Keyword::Undefined) {
                continue;
            }
            let node = self.lower(variant, scope)?;
            let bare = is_bare(&node);
            match node.kind {
                SchemaKind::Union { variants } if bare => {
                    nodes.extend(variants);
                }
                kind => nodes.push(SchemaNode { kind, ..node }),
            }
        }
        Ok(merge_union(nodes))
    }

    fn intersection(
        &mut self,
        parts: &[Type],
        scope: Scope<'_>,
    ) -> Result<SchemaNode, ExtractError> {
        let nodes = self.lower_all(parts, scope)?;
        let shapes: Option<Vec<ObjectSchema>> =
            nodes.iter().map(|node| self.object_shape(node)).collect();
        let Some(shapes) = shapes else {
            return Ok(SchemaKind::Intersection { parts: nodes }.into());
        };

        let mut merged = ObjectSchema::default();
        let all_forbidden = shapes
            .iter()
            .all(|s| s.additional == AdditionalProperties::Forbidden);
        for shape in shapes {
            if matches!(shape.additional, AdditionalProperties::Schema(_)) {
                merged.additional = shape.additional.clone();
            }
            for (name, node) in shape.properties {
                let required = shape.required.contains(&name)
                    || merged.required.contains(&name);
                merged.insert(name, node, required);
            }
        }
        if all_forbidden {
            merged.additional = AdditionalProperties::Forbidden;
        }
        Ok(SchemaNode::object(merged))
    }

    fn interface(
        &mut self,
        extends: &[Type],
        members: &[Member],
        scope: Scope<'_>,
    ) -> Result<SchemaNode, ExtractError> {
        let mut object = ObjectSchema {
            additional: AdditionalProperties::Forbidden,
            ..ObjectSchema::default()
        };
        for base in extends {
            let node = self.lower_inline(base, scope)?;
            let Some(shape) = self.object_shape(&node) else {
                return Err(self.unsupported("`extends` of a non-object type"));
            };
            for (name, property) in shape.properties {
                let required = shape.required.contains(&name);
                object.insert(name, property, required);
            }
            if let AdditionalProperties::Schema(_) = shape.additional {
                object.additional = shape.additional;
            }
        }
        self.members(&mut object, members, scope)?;
        Ok(SchemaNode::object(object))
    }

    fn members(
        &mut self,
        object: &mut ObjectSchema,
        members: &[Member],
        scope: Scope<'_>,
    ) -> Result<(), ExtractError> {
        for member in members {
            match member {
                Member::Property {
                    name,
                    optional,
                    ty,
                    doc,
                } => {
                    let mut node = self.lower(ty, scope)?;
                    if let Some(doc) = doc {
                        doc.apply(&mut node.annotations);
                    }
                    let required = !optional && !admits_undefined(ty);
                    object.insert(name.clone(), node, required);
                }
                Member::Index { key, value, doc } => {
                    let key = self.lower(key, scope)?;
                    if !is_index_key(&key) {
                        return Err(self.unsupported("index signature key type"));
                    }
                    let mut node = self.lower(value, scope)?;
                    if let Some(doc) = doc {
                        doc.apply(&mut node.annotations);
                    }
                    object.additional =
                        AdditionalProperties::Schema(Box::new(node));
                }
                Member::Method { .. } | Member::Signature => {}
            }
        }
        Ok(())
    }
}

fn array_of(items: SchemaNode) -> SchemaNode {
    SchemaKind::Array {
        items: Box::new(items),
    }
    .into()
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::String(s) => Value::String(s.clone()),
        Literal::Number(n) => Value::Number(n.clone()),
        Literal::Bool(b) => Value::Bool(*b),
    }
}

/// Enum members become an `enum`; members without an initializer count up
/// from the previous numeric value, starting at zero.
fn enumeration(members: &[EnumMember]) -> SchemaNode {
    let mut values = Vec::new();
    let mut next = 0i64;
    for member in members {
        let value = match &member.value {
            Some(Literal::Number(n)) => {
                if let Some(i) = n.as_i64() {
                    next = i + 1;
                }
                Value::Number(n.clone())
            }
            Some(literal) => literal_value(literal),
            None => {
                next += 1;
                Value::from(next - 1)
            }
        };
        if !values.contains(&value) {
            values.push(value);
        }
    }
    enum_node(values)
}

fn enum_node(values: Vec<Value>) -> SchemaNode {
    let mut types = Vec::new();
    for value in &values {
        let ty = PrimitiveType::of_literal(value);
        if !types.contains(&ty) {
            types.push(ty);
        }
    }
    SchemaKind::Enum { types, values }.into()
}

/// True if the node carries nothing but its kind.
fn is_bare(node: &SchemaNode) -> bool {
    node.annotations.is_empty()
        && node.extra.is_empty()
        && node.definitions.is_none()
}

/// True if `undefined` is one of the type's union members.
fn admits_undefined(ty: &Type) -> bool {
    match ty {
        Type::Keyword(Keyword::Undefined) => true,
        Type::Union(variants) => variants.iter().any(admits_undefined),
        _ => false,
    }
}

fn is_index_key(key: &SchemaNode) -> bool {
    match &key.kind {
        SchemaKind::Primitive { types } => types.iter().all(|t| {
            matches!(t, PrimitiveType::String | PrimitiveType::Number)
        }),
        _ => literal_keys(key).is_some(),
    }
}

/// The property names denoted by a string literal or literal union.
fn literal_keys(node: &SchemaNode) -> Option<Vec<String>> {
    let values = match &node.kind {
        SchemaKind::Const { value } => std::slice::from_ref(value),
        SchemaKind::Enum { values, .. } => values.as_slice(),
        SchemaKind::Never => &[],
        _ => return None,
    };
    values
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}

fn without_null(mut node: SchemaNode) -> SchemaNode {
    match &mut node.kind {
        SchemaKind::Primitive { types } if types.len() > 1 => {
            types.retain(|t| *t != PrimitiveType::Null);
        }
        SchemaKind::Union { variants } => {
            variants.retain(|v| {
                !matches!(&v.kind, SchemaKind::Primitive { types }
                    if types.as_slice() == [PrimitiveType::Null])
            });
            if variants.len() == 1 {
                return variants.remove(0);
            }
        }
        _ => {}
    }
    node
}

/// Combines lowered union members into the most compact schema:
///
/// - only literals: one `enum` (`true | false` becomes `boolean`)
/// - only bare primitives: one `type` list
/// - anything else: `anyOf`
fn merge_union(mut nodes: Vec<SchemaNode>) -> SchemaNode {
    collapse_booleans(&mut nodes);
    match nodes.len() {
        0 => return SchemaNode::never(),
        1 => return nodes.remove(0),
        _ => {}
    }

    let literals: Option<Vec<&Value>> = nodes
        .iter()
        .filter(|node| is_bare(node))
        .map(|node| match &node.kind {
            SchemaKind::Const { value } => Some(vec![value]),
            SchemaKind::Enum { values, .. } => Some(values.iter().collect()),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()
        .map(|groups| groups.into_iter().flatten().collect());
    if let Some(literals) = literals {
        if nodes.iter().all(is_bare) {
            let mut values = Vec::new();
            for value in literals {
                if !values.contains(value) {
                    values.push(value.clone());
                }
            }
            return enum_node(values);
        }
    }

    if nodes.iter().all(|node| {
        is_bare(node) && matches!(node.kind, SchemaKind::Primitive { .. })
    }) {
        let mut types = Vec::new();
        for node in &nodes {
            if let SchemaKind::Primitive { types: these } = &node.kind {
                for ty in these {
                    if !types.contains(ty) {
                        types.push(*ty);
                    }
                }
            }
        }
        return SchemaKind::Primitive { types }.into();
    }

    SchemaKind::Union { variants: nodes }.into()
}

/// Replaces a bare `true` and `false` pair with one `boolean`.
fn collapse_booleans(nodes: &mut Vec<SchemaNode>) {
    let position = |b: bool| {
        nodes.iter().position(|node| {
            is_bare(node)
                && matches!(&node.kind, SchemaKind::Const { value }
                    if *value == Value::Bool(b))
        })
    };
    let (Some(t), Some(f)) = (position(true), position(false)) else {
        return;
    };
    let (first, second) = (t.min(f), t.max(f));
    nodes.remove(second);
    nodes[first] = SchemaNode::primitive(PrimitiveType::Boolean);
}

#[cfg(test)]
mod tests {
    use std::fs;

    use camino::Utf8PathBuf;
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    /// Writes `source` to a temporary `types.ts` and lowers `type_name`.
    fn lower_source(
        source: &str,
        type_name: &str,
    ) -> Result<SchemaNode, ExtractError> {
        let tmp = TempDir::new().unwrap();
        let path =
            Utf8PathBuf::from_path_buf(tmp.path().join("types.ts")).unwrap();
        fs::write(&path, source).unwrap();
        lower_root(&mut Program::default(), &path, type_name)
    }

    fn lower_value(source: &str, type_name: &str) -> Value {
        lower_source(source, type_name).unwrap().to_value()
    }

    #[test]
    fn interface_with_named_union_and_callback() {
        let source = r"
/** Backoff strategy */
export type Backoff = 'none' | 'linear'

/** Retry configuration */
export interface Retry {
  /** Attempts */
  attempts: number
  backoff?: Backoff
  onRetry?: (error: Error) => void
  cancel(): void
}
";
        assert_eq!(
            lower_value(source, "Retry"),
            json!({
                "type": "object",
                "properties": {
                    "attempts": {"type": "number", "description": "Attempts"},
                    "backoff": {"$ref": "#/definitions/Backoff"},
                    "onRetry": {"$comment": "(error: Error) => void"}
                },
                "required": ["attempts"],
                "additionalProperties": false,
                "description": "Retry configuration",
                "definitions": {
                    "Backoff": {
                        "type": "string",
                        "enum": ["none", "linear"],
                        "description": "Backoff strategy"
                    }
                }
            })
        );
    }

    #[test]
    fn generic_instantiation_is_inlined() {
        let source = r"
export interface EnvEntry<T = string> {
  key: string
  value: T
}
export type EnvEntrySchema = EnvEntry<number>
export type Defaulted = EnvEntry
";
        let value = lower_value(source, "EnvEntrySchema");
        assert_eq!(value["properties"]["value"], json!({"type": "number"}));
        assert!(value.get("definitions").is_none());

        let value = lower_value(source, "Defaulted");
        assert_eq!(value["properties"]["value"], json!({"type": "string"}));
    }

    #[test]
    fn union_shapes() {
        let source = r"
export interface U {
  a?: string | undefined
  b: string | undefined
  c: true | false
  d: string | number | null
  e: 'x' | 1
  f: string | { n: number }
}
";
        let value = lower_value(source, "U");
        let props = &value["properties"];
        assert_eq!(value["required"], json!(["c", "d", "e", "f"]));
        assert_eq!(props["a"], json!({"type": "string"}));
        assert_eq!(props["c"], json!({"type": "boolean"}));
        assert_eq!(props["d"], json!({"type": ["string", "number", "null"]}));
        assert_eq!(props["e"], json!({"type": ["string", "number"], "enum": ["x", 1]}));
        assert_eq!(props["f"]["anyOf"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn builtin_generics() {
        let source = r"
interface Base { a: string; b?: number; c: boolean }
export interface B {
  record: Record<string, unknown>
  keyed: Record<'x' | 'y', number>
  partial: Partial<Base>
  picked: Pick<Base, 'a' | 'b'>
  omitted: Omit<Base, 'a'>
  promised: Promise<string[]>
  when: Date
}
";
        let value = lower_value(source, "B");
        let props = &value["properties"];
        assert_eq!(
            props["record"],
            json!({"type": "object", "additionalProperties": {}})
        );
        assert_eq!(props["keyed"]["required"], json!(["x", "y"]));
        assert_eq!(props["partial"].get("required"), None);
        assert_eq!(
            props["picked"]["properties"].as_object().unwrap().len(),
            2
        );
        assert_eq!(props["picked"]["required"], json!(["a"]));
        assert_eq!(props["omitted"]["required"], json!(["c"]));
        assert_eq!(
            props["promised"],
            json!({"type": "array", "items": {"type": "string"}})
        );
        assert_eq!(
            props["when"],
            json!({"type": "string", "format": "date-time"})
        );
        // Utility arguments are expanded in place, not referenced.
        assert!(value.get("definitions").is_none());
    }

    #[test]
    fn extends_puts_base_members_first() {
        let source = r"
interface Base { id: string }
export interface Child extends Base { name?: string }
";
        let value = lower_value(source, "Child");
        let keys: Vec<_> =
            value["properties"].as_object().unwrap().keys().collect();
        assert_eq!(keys, ["id", "name"]);
        assert_eq!(value["required"], json!(["id"]));
    }

    #[test]
    fn self_reference_goes_through_definitions() {
        let source = "export interface Tree { children: Tree[] }";
        let value = lower_value(source, "Tree");
        assert_eq!(
            value["properties"]["children"]["items"],
            json!({"$ref": "#/definitions/Tree"})
        );
        assert_eq!(value["definitions"]["Tree"]["type"], "object");
    }

    #[test]
    fn aliases_of_references_are_followed() {
        let source = r"
/** The real thing */
interface Target { x: number }
export type Alias = Target
";
        let value = lower_value(source, "Alias");
        assert_eq!(value["type"], "object");
        assert!(value.get("$ref").is_none());
    }

    #[test]
    fn jsdoc_tags_become_keywords() {
        let source = r"
export interface Limits {
  /**
   * Maximum attempts
   * @minimum 1
   * @default 3
   */
  attempts: number
}
";
        let value = lower_value(source, "Limits");
        assert_eq!(
            value["properties"]["attempts"],
            json!({
                "type": "number",
                "description": "Maximum attempts",
                "minimum": 1,
                "default": 3
            })
        );
    }

    #[test]
    fn enums_count_up_from_initializers() {
        let source = "export enum Level { A, B = 5, C }";
        assert_eq!(
            lower_value(source, "Level"),
            json!({"type": "number", "enum": [0, 5, 6]})
        );
    }

    #[test]
    fn conditional_type_is_unsupported() {
        let source = r"
export interface Workflow<Output> { run(): Output }
export type Infer<T> = T extends Workflow<infer O> ? O : never
export type Concrete = Infer<Workflow<string>>
";
        let err = lower_source(source, "Concrete").unwrap_err();
        assert!(err.is_unsupported(), "{err}");
        assert!(err.to_string().contains("conditional type"));
    }

    #[test]
    fn generic_root_without_defaults_is_unsupported() {
        let source = "export interface Box<T> { value: T }";
        let err = lower_source(source, "Box").unwrap_err();
        assert!(err.is_unsupported());
        assert!(err.to_string().contains("without type arguments"));
    }

    #[test]
    fn self_instantiating_generic_is_an_error() {
        let source = "export type Loop<T = string> = { next: Loop<T> }";
        let err = lower_source(source, "Loop").unwrap_err();
        assert!(err.is_recursive_generic(), "{err}");
    }

    #[test]
    fn alias_cycle_is_reported_as_such() {
        let source = "export type A = B\ntype B = A";
        let err = lower_source(source, "A").unwrap_err();
        assert!(err.is_cyclic_alias(), "{err}");
        assert!(!err.is_recursive_generic());
        assert!(err.to_string().contains("type alias `A` refers to itself"));
    }

    #[test]
    fn unknown_names_are_reported() {
        let err = lower_source("export type A = Missing", "A").unwrap_err();
        assert!(err.is_unknown_type());

        let err = lower_source("export type A = string", "Nope").unwrap_err();
        assert!(err.is_unknown_type());
        assert!(err.to_string().contains("`Nope`"));
    }
}
