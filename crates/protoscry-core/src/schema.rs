//! Reconstructed schema trees.
//!
//! A [`SchemaNode`] is built bottom-up in one pass and never mutated
//! afterwards. It carries everything a renderer needs, so nothing
//! downstream has to go back to the metadata.

use serde::Serialize;
use std::collections::BTreeSet;

/// A resolved type name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TypeName {
    /// Schema scalar (`uint32`), schema type name, or unknown placeholder
    pub name: String,
    /// True when the type lives in the schema namespace and must be imported
    pub local: bool,
}

impl TypeName {
    /// A name defined in the schema namespace
    pub fn local(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            local: true,
        }
    }

    /// A scalar, nested, or unknown name
    pub fn external(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            local: false,
        }
    }
}

/// Storage shape of a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum FieldKind {
    /// A scalar or message reference
    Singular {
        /// Field type
        ty: TypeName,
    },
    /// A repeated scalar or message collection
    Repeated {
        /// Element type
        ty: TypeName,
    },
    /// A key/value collection
    Map {
        /// Key type
        key: TypeName,
        /// Value type
        value: TypeName,
    },
    /// A raw member of an enum-shaped node, named after the constant
    EnumValue {
        /// Constant name
        ty: TypeName,
    },
}

/// One field of a message, or one member of an enum-shaped node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    /// Accessor name the tag number was correlated from; empty for enum members
    pub property_name: String,
    /// Field number, or the member value for enum members
    pub tag: i64,
    /// Storage shape
    pub kind: FieldKind,
}

impl Field {
    /// Resolved type names: two for maps, one otherwise
    pub fn type_refs(&self) -> Vec<&TypeName> {
        match &self.kind {
            FieldKind::Singular { ty } | FieldKind::Repeated { ty } | FieldKind::EnumValue { ty } => {
                vec![ty]
            }
            FieldKind::Map { key, value } => vec![key, value],
        }
    }

    /// True for repeated collections
    pub fn is_repeated(&self) -> bool {
        matches!(self.kind, FieldKind::Repeated { .. })
    }

    /// True for key/value collections
    pub fn is_map(&self) -> bool {
        matches!(self.kind, FieldKind::Map { .. })
    }
}

/// `(name, value)` of a constant inside an enum
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumEntry {
    /// Constant name
    pub name: String,
    /// Constant value
    pub value: i64,
}

/// A nested enum
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumNode {
    /// Enum name
    pub name: String,
    /// Entries in declaration order, sentinels removed
    pub entries: Vec<EnumEntry>,
}

/// One member of a one-of group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnionEntry {
    /// Resolved member type
    pub ty: TypeName,
    /// Member (and property) name
    pub member: String,
    /// Discriminator value, equal to the member's field number
    pub discriminant: i64,
}

/// A one-of group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnionGroup {
    /// Discriminator name with the union suffix stripped
    pub name: String,
    /// Members in declaration order
    pub entries: Vec<UnionEntry>,
}

/// A reconstructed message or enum
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaNode {
    /// Simple name of the reflected type
    pub name: String,
    /// Protocol command id from a nested `CmdId` constant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<i64>,
    /// Fields in metadata declaration order
    pub fields: Vec<Field>,
    /// Nested enums
    pub enums: Vec<EnumNode>,
    /// Nested messages
    pub nested: Vec<SchemaNode>,
    /// One-of groups
    pub unions: Vec<UnionGroup>,
    /// Discovered while recursing into a parent
    pub is_nested: bool,
    /// The reflected type derives from the platform enum base
    pub is_enum: bool,
}

impl SchemaNode {
    /// Names of local types referenced anywhere in this tree
    pub fn local_references(&self) -> BTreeSet<&str> {
        let mut refs = BTreeSet::new();
        self.collect_references(&mut refs);
        refs
    }

    fn collect_references<'a>(&'a self, refs: &mut BTreeSet<&'a str>) {
        let field_refs = self.fields.iter().flat_map(|f| f.type_refs());
        let union_refs = self.unions.iter().flat_map(|u| u.entries.iter().map(|e| &e.ty));
        refs.extend(field_refs.chain(union_refs).filter(|t| t.local).map(|t| t.name.as_str()));
        for nested in &self.nested {
            nested.collect_references(refs);
        }
    }

    /// Names of every message and enum defined in this tree, itself included
    pub fn defined_names(&self) -> BTreeSet<&str> {
        let mut names = BTreeSet::new();
        self.collect_definitions(&mut names);
        names
    }

    fn collect_definitions<'a>(&'a self, names: &mut BTreeSet<&'a str>) {
        names.insert(self.name.as_str());
        names.extend(self.enums.iter().map(|e| e.name.as_str()));
        for nested in &self.nested {
            nested.collect_definitions(names);
        }
    }

    /// Names of enums defined in this tree, including an enum-shaped root
    pub fn enum_names(&self) -> BTreeSet<&str> {
        let mut names = BTreeSet::new();
        self.collect_enums(&mut names);
        names
    }

    fn collect_enums<'a>(&'a self, names: &mut BTreeSet<&'a str>) {
        if self.is_enum {
            names.insert(self.name.as_str());
        }
        names.extend(self.enums.iter().map(|e| e.name.as_str()));
        for nested in &self.nested {
            nested.collect_enums(names);
        }
    }

    /// Tag numbers used by more than one field or union member of this node
    ///
    /// Each pair is reported once, as `(tag, first, second)` in declaration
    /// order. Union members count because they share the field number space.
    pub fn duplicate_tags(&self) -> Vec<(i64, &str, &str)> {
        let mut seen: Vec<(i64, &str)> = Vec::new();
        let mut duplicates = Vec::new();
        let fields = self.fields.iter().map(|f| (f.tag, f.property_name.as_str()));
        let members = self
            .unions
            .iter()
            .flat_map(|u| u.entries.iter().map(|e| (e.discriminant, e.member.as_str())));

        for (tag, name) in fields.chain(members) {
            let first = seen.iter().find(|(t, _)| *t == tag).map(|(_, n)| *n);
            match first {
                Some(first) => duplicates.push((tag, first, name)),
                None => seen.push((tag, name)),
            }
        }
        duplicates
    }
}
