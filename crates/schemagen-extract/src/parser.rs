//! Conversion of TypeScript syntax trees into [`ast::Module`](crate::ast::Module).
//!
//! Sources are parsed with the tree-sitter TypeScript grammar. Interfaces,
//! type aliases, enums, imports and exports are converted; every other
//! statement (values, functions, classes, namespaces) is ignored, so both
//! ordinary `.ts` modules and `.d.ts` files are accepted.

use serde_json::Number;
use tree_sitter::{Node, Parser};

use crate::ast::{
    Declaration, DeclarationBody, EnumMember, Import, ImportedName, Keyword,
    Literal, Member, Module, ReExport, Type, TypeParam,
};
use crate::jsdoc::{self, Doc};

/// A syntax error at a 1-based line and column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SyntaxError {
    pub line: usize,
    pub col: usize,
    pub message: String,
}

type PResult<T> = Result<T, SyntaxError>;

/// Parses a whole source file.
pub(crate) fn parse_module(source: &str) -> PResult<Module> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into())
        .map_err(|e| SyntaxError {
            line: 1,
            col: 1,
            message: format!("failed to load TypeScript grammar: {e}"),
        })?;
    let tree = parser.parse(source, None).ok_or_else(|| SyntaxError {
        line: 1,
        col: 1,
        message: "parser returned no syntax tree".to_string(),
    })?;

    let root = tree.root_node();
    if root.has_error() {
        return Err(first_error(root, source));
    }

    let mut builder = Builder {
        source,
        module: Module::default(),
    };
    builder.statements(root)?;
    Ok(builder.module)
}

/// Locates the first error or missing node in document order.
fn first_error(node: Node<'_>, source: &str) -> SyntaxError {
    for child in children(node) {
        if child.is_error() || child.is_missing() {
            return describe_error(child, source);
        }
        if child.has_error() {
            return first_error(child, source);
        }
    }
    describe_error(node, source)
}

fn describe_error(node: Node<'_>, source: &str) -> SyntaxError {
    let position = node.start_position();
    let message = if node.is_missing() {
        format!("expected `{}`", node.kind())
    } else {
        let text = source
            .get(node.byte_range())
            .and_then(|text| text.lines().next())
            .unwrap_or("")
            .trim();
        if text.is_empty() {
            "unexpected end of input".to_string()
        } else {
            format!("unexpected `{text}`")
        }
    };
    SyntaxError {
        line: position.row + 1,
        col: position.column + 1,
        message,
    }
}

/// All children, named and anonymous, comments included.
fn children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

/// Named children without comments.
fn named(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

fn first_named(node: Node<'_>) -> Option<Node<'_>> {
    named(node).into_iter().next()
}

fn has_token(node: Node<'_>, token: &str) -> bool {
    children(node)
        .iter()
        .any(|child| !child.is_named() && child.kind() == token)
}

fn error_at(node: Node<'_>, message: String) -> SyntaxError {
    let position = node.start_position();
    SyntaxError {
        line: position.row + 1,
        col: position.column + 1,
        message,
    }
}

struct Builder<'s> {
    source: &'s str,
    module: Module,
}

impl Builder<'_> {
    fn text(&self, node: Node<'_>) -> &str {
        &self.source[node.byte_range()]
    }

    /// Source text with runs of whitespace collapsed to single spaces.
    fn normalized_text(&self, node: Node<'_>) -> String {
        self.text(node).split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn string_value(&self, node: Node<'_>) -> String {
        unescape_string(self.text(node))
    }

    /// The parsed JSDoc block, if `node` is a `/** ... */` comment.
    fn jsdoc(&self, node: Node<'_>) -> Option<Doc> {
        let text = self.text(node);
        let body = text.strip_prefix("/**")?.strip_suffix("*/")?;
        Some(jsdoc::parse(body))
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn statements(&mut self, root: Node<'_>) -> PResult<()> {
        let mut doc = None;
        let mut cursor = root.walk();
        let statements: Vec<_> = root.named_children(&mut cursor).collect();
        for statement in statements {
            if statement.kind() == "comment" {
                if let Some(parsed) = self.jsdoc(statement) {
                    doc = Some(parsed);
                }
                continue;
            }
            let doc = doc.take();
            match statement.kind() {
                "import_statement" => self.import(statement),
                "export_statement" => self.export(statement, doc)?,
                _ => self.declaration(statement, doc)?,
            }
        }
        Ok(())
    }

    fn import(&mut self, node: Node<'_>) {
        let Some(source) = node.child_by_field_name("source") else {
            return;
        };
        let specifier = self.string_value(source);
        let Some(clause) =
            named(node).into_iter().find(|c| c.kind() == "import_clause")
        else {
            // Side-effect import: `import './polyfill'`
            return;
        };

        let mut bindings = Vec::new();
        for part in named(clause) {
            match part.kind() {
                "identifier" => {
                    bindings.push((self.text(part).to_string(), ImportedName::Default));
                }
                "namespace_import" => {
                    if let Some(local) = first_named(part) {
                        bindings.push((
                            self.text(local).to_string(),
                            ImportedName::Namespace,
                        ));
                    }
                }
                "named_imports" => {
                    for entry in named(part) {
                        let Some(name) = entry.child_by_field_name("name")
                        else {
                            continue;
                        };
                        let name = self.export_name(name);
                        let local = entry
                            .child_by_field_name("alias")
                            .map_or_else(|| name.clone(), |alias| self.export_name(alias));
                        bindings.push((local, ImportedName::Named(name)));
                    }
                }
                _ => {}
            }
        }

        for (local, imported) in bindings {
            self.module.imports.insert(
                local,
                Import {
                    specifier: specifier.clone(),
                    imported,
                },
            );
        }
    }

    /// A name in an import or export list; may be a string literal.
    fn export_name(&self, node: Node<'_>) -> String {
        if node.kind() == "string" {
            self.string_value(node)
        } else {
            self.text(node).to_string()
        }
    }

    fn export(&mut self, node: Node<'_>, doc: Option<Doc>) -> PResult<()> {
        if has_token(node, "default") {
            return Ok(());
        }
        if let Some(declaration) = node.child_by_field_name("declaration") {
            // A JSDoc block between `export` and the keyword also counts.
            let doc = doc.or_else(|| {
                children(node)
                    .into_iter()
                    .filter(|c| c.kind() == "comment")
                    .find_map(|c| self.jsdoc(c))
            });
            return self.declaration(declaration, doc);
        }

        let source = node
            .child_by_field_name("source")
            .map(|source| self.string_value(source));
        let parts = named(node);
        if parts.iter().any(|c| c.kind() == "namespace_export") {
            // `export * as ns from '...'` re-exports a namespace object,
            // which no type reference can name without a qualifier.
            return Ok(());
        }
        let Some(clause) = parts.iter().find(|c| c.kind() == "export_clause")
        else {
            if let Some(specifier) = source {
                self.module.reexports.push(ReExport::All { specifier });
            }
            return Ok(());
        };

        for entry in named(*clause) {
            let Some(name) = entry.child_by_field_name("name") else {
                continue;
            };
            let name = self.export_name(name);
            let exported = entry
                .child_by_field_name("alias")
                .map_or_else(|| name.clone(), |alias| self.export_name(alias));
            match &source {
                Some(specifier) => self.module.reexports.push(ReExport::Named {
                    specifier: specifier.clone(),
                    name,
                    exported,
                }),
                None => {
                    self.module.local_exports.insert(exported, name);
                }
            }
        }
        Ok(())
    }

    /// Converts a type declaration; other statements are ignored.
    fn declaration(&mut self, node: Node<'_>, doc: Option<Doc>) -> PResult<()> {
        let (params, body) = match node.kind() {
            "ambient_declaration" => {
                return match first_named(node) {
                    Some(inner) => self.declaration(inner, doc),
                    None => Ok(()),
                };
            }
            "interface_declaration" => (self.type_params(node)?, self.interface(node)?),
            "type_alias_declaration" => {
                let value = node
                    .child_by_field_name("value")
                    .ok_or_else(|| error_at(node, "type alias without a value".to_string()))?;
                (self.type_params(node)?, DeclarationBody::Alias(self.ty(value)?))
            }
            "enum_declaration" => (Vec::new(), self.enumeration(node)?),
            _ => return Ok(()),
        };
        let Some(name) = node.child_by_field_name("name") else {
            return Ok(());
        };
        let name = self.text(name).to_string();

        let declaration = Declaration {
            name: name.clone(),
            doc,
            params,
            body,
        };
        match self.module.declarations.get_mut(&name) {
            Some(existing) => merge_declaration(existing, declaration),
            None => {
                self.module.declarations.insert(name, declaration);
            }
        }
        Ok(())
    }

    fn interface(&self, node: Node<'_>) -> PResult<DeclarationBody> {
        let mut extends = Vec::new();
        for clause in named(node)
            .into_iter()
            .filter(|c| c.kind() == "extends_type_clause")
        {
            for base in named(clause) {
                extends.push(self.ty(base)?);
            }
        }
        let members = match node.child_by_field_name("body") {
            Some(body) => match self.object_members(body)? {
                Some(members) => members,
                None => {
                    return Err(error_at(
                        body,
                        "mapped type in an interface body".to_string(),
                    ));
                }
            },
            None => Vec::new(),
        };
        Ok(DeclarationBody::Interface { extends, members })
    }

    fn enumeration(&self, node: Node<'_>) -> PResult<DeclarationBody> {
        let mut members = Vec::new();
        let Some(body) = node.child_by_field_name("body") else {
            return Ok(DeclarationBody::Enum(members));
        };
        for entry in named(body) {
            let (name, value) = if entry.kind() == "enum_assignment" {
                let name = entry
                    .child_by_field_name("name")
                    .ok_or_else(|| error_at(entry, "enum member without a name".to_string()))?;
                let value = match entry.child_by_field_name("value") {
                    Some(value) => Some(self.enum_value(value)?),
                    None => None,
                };
                (name, value)
            } else {
                (entry, None)
            };
            members.push(EnumMember {
                name: self.export_name(name),
                value,
            });
        }
        Ok(DeclarationBody::Enum(members))
    }

    fn enum_value(&self, node: Node<'_>) -> PResult<Literal> {
        match node.kind() {
            "string" => Ok(Literal::String(self.string_value(node))),
            "number" | "unary_expression" => self.number(node),
            _ => Err(error_at(node, "unsupported enum initializer".to_string())),
        }
    }

    fn type_params(&self, node: Node<'_>) -> PResult<Vec<TypeParam>> {
        let Some(list) = node.child_by_field_name("type_parameters") else {
            return Ok(Vec::new());
        };
        let mut params = Vec::new();
        for param in named(list) {
            let Some(name) = param.child_by_field_name("name") else {
                continue;
            };
            let default = match param
                .child_by_field_name("value")
                .and_then(first_named)
            {
                Some(default) => Some(self.ty(default)?),
                None => None,
            };
            params.push(TypeParam {
                name: self.text(name).to_string(),
                default,
            });
        }
        Ok(params)
    }

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------

    fn ty(&self, node: Node<'_>) -> PResult<Type> {
        let unsupported = |construct: &'static str| -> PResult<Type> {
            Ok(Type::Unsupported { construct })
        };
        match node.kind() {
            "predefined_type" => {
                let text = self.normalized_text(node);
                Ok(match Keyword::parse(&text) {
                    Some(keyword) => Type::Keyword(keyword),
                    None if text.ends_with("symbol") => Type::Keyword(Keyword::Symbol),
                    None => Type::Reference {
                        name: text,
                        args: Vec::new(),
                    },
                })
            }
            "type_identifier" => {
                let name = self.text(node);
                Ok(match Keyword::parse(name) {
                    Some(keyword) => Type::Keyword(keyword),
                    None => Type::Reference {
                        name: name.to_string(),
                        args: Vec::new(),
                    },
                })
            }
            "nested_type_identifier" => Ok(Type::Reference {
                name: self.text(node).split_whitespace().collect(),
                args: Vec::new(),
            }),
            "generic_type" => {
                let name = node
                    .child_by_field_name("name")
                    .map(|name| self.text(name).split_whitespace().collect())
                    .unwrap_or_default();
                let mut args = Vec::new();
                if let Some(list) = node.child_by_field_name("type_arguments") {
                    for arg in named(list) {
                        args.push(self.ty(arg)?);
                    }
                }
                Ok(Type::Reference { name, args })
            }
            "literal_type" => match first_named(node) {
                Some(literal) => self.literal(literal),
                None => Err(error_at(node, "empty literal type".to_string())),
            },
            "template_literal_type" => Ok(Type::Template),
            "parenthesized_type" | "readonly_type" | "array_type" => {
                let inner = first_named(node)
                    .ok_or_else(|| error_at(node, "expected a type".to_string()))?;
                let inner = self.ty(inner)?;
                Ok(if node.kind() == "array_type" {
                    Type::Array(Box::new(inner))
                } else {
                    inner
                })
            }
            "tuple_type" => self.tuple(node),
            "union_type" => {
                let mut variants = Vec::new();
                self.flatten(node, "union_type", &mut variants)?;
                Ok(single_or(variants, Type::Union))
            }
            "intersection_type" => {
                let mut parts = Vec::new();
                self.flatten(node, "intersection_type", &mut parts)?;
                Ok(single_or(parts, Type::Intersection))
            }
            "object_type" => Ok(match self.object_members(node)? {
                Some(members) => Type::Object(members),
                None => Type::Unsupported {
                    construct: "mapped type",
                },
            }),
            "function_type" | "constructor_type" => Ok(Type::Function {
                signature: self.normalized_text(node),
            }),
            "conditional_type" => unsupported("conditional type"),
            "index_type_query" => unsupported("keyof type"),
            "type_query" => unsupported("typeof type"),
            "lookup_type" => unsupported("indexed access type"),
            "infer_type" => unsupported("infer type"),
            "this_type" | "this" => unsupported("`this` type"),
            other => unsupported(other),
        }
    }

    /// Collects the members of a left-nested union or intersection chain.
    /// A leading `|` or `&` leaves a chain node with a single operand.
    fn flatten(
        &self,
        node: Node<'_>,
        kind: &str,
        out: &mut Vec<Type>,
    ) -> PResult<()> {
        for operand in named(node) {
            if operand.kind() == kind {
                self.flatten(operand, kind, out)?;
            } else {
                out.push(self.ty(operand)?);
            }
        }
        Ok(())
    }

    fn literal(&self, node: Node<'_>) -> PResult<Type> {
        Ok(match node.kind() {
            "string" => Type::Literal(Literal::String(self.string_value(node))),
            "number" | "unary_expression" => Type::Literal(self.number(node)?),
            "true" => Type::Literal(Literal::Bool(true)),
            "false" => Type::Literal(Literal::Bool(false)),
            "null" => Type::Keyword(Keyword::Null),
            "undefined" => Type::Keyword(Keyword::Undefined),
            other => Type::Unsupported { construct: other },
        })
    }

    /// A numeric literal, optionally signed.
    fn number(&self, node: Node<'_>) -> PResult<Literal> {
        let text: String = self.text(node).split_whitespace().collect();
        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(&text)),
        };
        parse_number(digits, negative)
            .map(Literal::Number)
            .ok_or_else(|| error_at(node, format!("invalid number literal `{text}`")))
    }

    fn tuple(&self, node: Node<'_>) -> PResult<Type> {
        let mut elements = Vec::new();
        for element in named(node) {
            let ty = match element.kind() {
                "rest_type" => {
                    return Ok(Type::Unsupported {
                        construct: "variadic tuple type",
                    });
                }
                "optional_type" => match first_named(element) {
                    Some(inner) => self.ty(inner)?,
                    None => Type::Keyword(Keyword::Any),
                },
                // Labeled element: `name: T` or `name?: T`
                "required_parameter"
                | "optional_parameter"
                | "tuple_parameter"
                | "optional_tuple_parameter" => {
                    match element.child_by_field_name("type") {
                        Some(annotation) => self.annotation(annotation)?,
                        None => Type::Keyword(Keyword::Any),
                    }
                }
                _ => self.ty(element)?,
            };
            elements.push(ty);
        }
        Ok(Type::Tuple(elements))
    }

    /// The type inside a `: T` annotation.
    fn annotation(&self, node: Node<'_>) -> PResult<Type> {
        match first_named(node) {
            Some(inner) => self.ty(inner),
            None => Ok(Type::Keyword(Keyword::Any)),
        }
    }

    /// Members of an object type or interface body, or `None` for a mapped
    /// type (`{ [K in T]: V }`).
    fn object_members(&self, node: Node<'_>) -> PResult<Option<Vec<Member>>> {
        let mut members = Vec::new();
        let mut doc = None;
        let mut cursor = node.walk();
        let entries: Vec<_> = node.named_children(&mut cursor).collect();
        for entry in entries {
            if entry.kind() == "comment" {
                if let Some(parsed) = self.jsdoc(entry) {
                    doc = Some(parsed);
                }
                continue;
            }
            let doc = doc.take();
            let member = match entry.kind() {
                "property_signature" => {
                    let Some(name) = entry
                        .child_by_field_name("name")
                        .and_then(|name| self.member_name(name))
                    else {
                        members.push(Member::Signature);
                        continue;
                    };
                    let ty = match entry.child_by_field_name("type") {
                        Some(annotation) => self.annotation(annotation)?,
                        None => Type::Keyword(Keyword::Any),
                    };
                    Member::Property {
                        name,
                        optional: has_token(entry, "?"),
                        ty,
                        doc,
                    }
                }
                "method_signature" => match entry
                    .child_by_field_name("name")
                    .and_then(|name| self.member_name(name))
                {
                    Some(name) => Member::Method { name },
                    None => Member::Signature,
                },
                "index_signature" => {
                    if named(entry).iter().any(|c| c.kind() == "mapped_type_clause") {
                        return Ok(None);
                    }
                    let key = match entry.child_by_field_name("index_type") {
                        Some(key) => self.ty(key)?,
                        None => Type::Keyword(Keyword::String),
                    };
                    let value = match entry.child_by_field_name("type") {
                        Some(annotation) => self.annotation(annotation)?,
                        None => Type::Keyword(Keyword::Any),
                    };
                    Member::Index { key, value, doc }
                }
                "call_signature" | "construct_signature" => Member::Signature,
                _ => continue,
            };
            members.push(member);
        }
        Ok(Some(members))
    }

    /// A property name. Computed names (`[Symbol.iterator]`) have none.
    fn member_name(&self, node: Node<'_>) -> Option<String> {
        match node.kind() {
            "string" => Some(self.string_value(node)),
            "computed_property_name" => None,
            _ => Some(self.text(node).to_string()),
        }
    }
}

fn single_or(mut types: Vec<Type>, wrap: fn(Vec<Type>) -> Type) -> Type {
    if types.len() == 1 {
        types.remove(0)
    } else {
        wrap(types)
    }
}

fn parse_number(text: &str, negative: bool) -> Option<Number> {
    let digits: String = text.chars().filter(|c| *c != '_').collect();
    let sign = if negative { -1 } else { 1 };
    if let Some(hex) =
        digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X"))
    {
        return i64::from_str_radix(hex, 16).ok().map(|n| Number::from(sign * n));
    }
    if let Ok(n) = digits.parse::<i64>() {
        return Some(Number::from(sign * n));
    }
    let value: f64 = digits.parse().ok()?;
    Number::from_f64(if negative { -value } else { value })
}

/// Decodes a string literal, quotes included.
fn unescape_string(raw: &str) -> String {
    let inner = raw
        .get(1..raw.len().saturating_sub(1))
        .unwrap_or_default();
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32)
                {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            // Line continuation.
            Some('\n') => {}
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Merges a redeclaration into an existing declaration of the same name.
///
/// Interfaces merge their members and heritage clauses; any other
/// redeclaration replaces the earlier one.
fn merge_declaration(existing: &mut Declaration, later: Declaration) {
    match (&mut existing.body, later.body) {
        (
            DeclarationBody::Interface { extends, members },
            DeclarationBody::Interface {
                extends: more_extends,
                members: more_members,
            },
        ) => {
            extends.extend(more_extends);
            members.extend(more_members);
            if existing.doc.is_none() {
                existing.doc = later.doc;
            }
        }
        (_, body) => {
            *existing = Declaration {
                name: later.name,
                doc: later.doc,
                params: later.params,
                body,
            };
        }
    }
}
