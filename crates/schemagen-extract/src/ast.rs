//! Syntax tree for the subset of TypeScript the extractor understands.
//!
//! Only type-level constructs are kept. Values, function bodies and class
//! declarations are ignored by the parser and never appear here.

use indexmap::IndexMap;
use serde_json::Number;

use crate::jsdoc::Doc;

/// A parsed source file.
#[derive(Debug, Clone, Default)]
pub(crate) struct Module {
    /// Top-level type declarations by name, exported or not.
    pub declarations: IndexMap<String, Declaration>,
    /// Imported bindings by local name.
    pub imports: IndexMap<String, Import>,
    /// `export { Local as Exported }` without a `from` clause, keyed by the
    /// exported name.
    pub local_exports: IndexMap<String, String>,
    /// `export ... from '...'` statements in source order.
    pub reexports: Vec<ReExport>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Import {
    pub specifier: String,
    pub imported: ImportedName,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ImportedName {
    /// `import { Name }` or `import { Name as Local }`
    Named(String),
    /// `import Local from '...'`
    Default,
    /// `import * as Local from '...'`
    Namespace,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ReExport {
    /// `export { name as exported } from '...'`
    Named {
        specifier: String,
        name: String,
        exported: String,
    },
    /// `export * from '...'`
    All { specifier: String },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Declaration {
    pub name: String,
    pub doc: Option<Doc>,
    pub params: Vec<TypeParam>,
    pub body: DeclarationBody,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DeclarationBody {
    Interface {
        extends: Vec<Type>,
        members: Vec<Member>,
    },
    Alias(Type),
    Enum(Vec<EnumMember>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TypeParam {
    pub name: String,
    pub default: Option<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EnumMember {
    pub name: String,
    pub value: Option<Literal>,
}

/// A member of an interface body or object type literal.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Member {
    Property {
        name: String,
        optional: bool,
        ty: Type,
        doc: Option<Doc>,
    },
    /// Method signatures describe behavior, not data, and are dropped when
    /// lowering.
    Method { name: String },
    /// `[key: string]: Value`
    Index {
        key: Type,
        value: Type,
        doc: Option<Doc>,
    },
    /// Call and construct signatures.
    Signature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Keyword {
    String,
    Number,
    Boolean,
    BigInt,
    Null,
    Undefined,
    Void,
    Unknown,
    Any,
    Never,
    Object,
    Symbol,
}

impl Keyword {
    pub(crate) fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "string" => Keyword::String,
            "number" => Keyword::Number,
            "boolean" => Keyword::Boolean,
            "bigint" => Keyword::BigInt,
            "null" => Keyword::Null,
            "undefined" => Keyword::Undefined,
            "void" => Keyword::Void,
            "unknown" => Keyword::Unknown,
            "any" => Keyword::Any,
            "never" => Keyword::Never,
            "object" => Keyword::Object,
            "symbol" => Keyword::Symbol,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Literal {
    String(String),
    Number(Number),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Type {
    Keyword(Keyword),
    Literal(Literal),
    /// A template literal type; always some string.
    Template,
    /// A possibly qualified name (`Foo`, `ns.Foo`) with type arguments.
    Reference { name: String, args: Vec<Type> },
    Array(Box<Type>),
    Tuple(Vec<Type>),
    Union(Vec<Type>),
    Intersection(Vec<Type>),
    Object(Vec<Member>),
    /// A function or constructor type, with its source text normalized to
    /// single spaces.
    Function { signature: String },
    /// A construct that parses but has no JSON Schema lowering, such as
    /// conditional, mapped, `keyof`, `typeof` or indexed access types.
    Unsupported { construct: &'static str },
}
