//! Reflected type metadata of a compiled module.
//!
//! This is the object model the reconstruction engine queries. It mirrors
//! what a managed-code metadata reader exposes for each type: namespace,
//! simple name, base type, declared fields with their constants, declared
//! properties with their type references, and nested types.
//!
//! Loading a compiled module is not done here. A [`MetadataProvider`]
//! turns some external representation into a [`Module`]; the bundled
//! [`JsonMetadataProvider`] reads a JSON dump produced by any reflection
//! tool that writes this model.
//!
//! The builder methods on [`TypeDef`] double as the fixture mechanism for
//! tests:
//!
//! ```
//! use protoscry_core::metadata::{TypeDef, TypeRef};
//!
//! let ty = TypeDef::class("Proto", "PingReq")
//!     .with_constant("SeqFieldNumber", 1)
//!     .with_property("Seq", TypeRef::new("System", "UInt32"));
//!
//! assert_eq!(ty.full_name(), "Proto.PingReq");
//! assert!(ty.property("Seq").is_some());
//! ```

mod json;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

pub use json::JsonMetadataProvider;

/// Full name of the platform type every plain class derives from
pub const OBJECT_BASE: &str = "System.Object";

/// Full name of the platform enum base type
pub const ENUM_BASE: &str = "System.Enum";

/// Name of the hidden backing field every platform enum declares
pub const ENUM_VALUE_FIELD: &str = "value__";

/// Source of module metadata
///
/// Implement this to plug in a different metadata reader.
pub trait MetadataProvider {
    /// Load the module stored at `path`
    fn load(&self, path: &Path) -> Result<Module>;
}

/// A loaded module: an ordered list of its top-level types
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    /// Module name, for diagnostics only
    #[serde(default)]
    pub name: String,
    /// Top-level types in declaration order
    #[serde(default)]
    pub types: Vec<TypeDef>,
}

impl Module {
    /// Creates an empty module
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            types: Vec::new(),
        }
    }

    /// Adds a top-level type
    pub fn with_type(mut self, ty: TypeDef) -> Self {
        self.types.push(ty);
        self
    }

    /// Find a type by full name
    ///
    /// Nested types are addressed as `Outer/Inner`, the way metadata
    /// readers print them.
    pub fn find_type(&self, full_name: &str) -> Option<&TypeDef> {
        let mut segments = full_name.split('/');
        let head = segments.next()?;
        let mut current = self.types.iter().find(|t| t.full_name() == head)?;
        for segment in segments {
            current = current.nested_types.iter().find(|t| t.name == segment)?;
        }
        Some(current)
    }

    /// Top-level types that belong to `namespace`, in declaration order
    pub fn schema_types<'a>(&'a self, namespace: &'a str) -> impl Iterator<Item = &'a TypeDef> + 'a {
        self.types.iter().filter(move |t| t.namespace == namespace)
    }
}

/// A type definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDef {
    /// Namespace; empty for nested types
    #[serde(default)]
    pub namespace: String,
    /// Simple name
    pub name: String,
    /// Full name of the base type, if any
    #[serde(default)]
    pub base_type: Option<String>,
    /// Declared fields in declaration order
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    /// Declared properties in declaration order
    #[serde(default)]
    pub properties: Vec<PropertyDef>,
    /// Nested types in declaration order
    #[serde(default)]
    pub nested_types: Vec<TypeDef>,
}

impl TypeDef {
    /// A plain class deriving from [`OBJECT_BASE`]
    pub fn class(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            base_type: Some(OBJECT_BASE.to_string()),
            fields: Vec::new(),
            properties: Vec::new(),
            nested_types: Vec::new(),
        }
    }

    /// An enum deriving from [`ENUM_BASE`], carrying the usual `value__` field
    pub fn enumeration(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::class(namespace, name)
            .with_base(ENUM_BASE)
            .with_field(FieldDef::instance(ENUM_VALUE_FIELD))
    }

    /// Replaces the base type
    pub fn with_base(mut self, full_name: impl Into<String>) -> Self {
        self.base_type = Some(full_name.into());
        self
    }

    /// Adds a declared field
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Adds a constant field
    pub fn with_constant(self, name: impl Into<String>, value: i64) -> Self {
        self.with_field(FieldDef::constant(name, value))
    }

    /// Adds a declared property
    pub fn with_property(mut self, name: impl Into<String>, property_type: TypeRef) -> Self {
        self.properties.push(PropertyDef {
            name: name.into(),
            property_type,
        });
        self
    }

    /// Adds a nested type; its namespace is cleared as a metadata reader would
    pub fn with_nested(mut self, mut nested: TypeDef) -> Self {
        nested.namespace.clear();
        self.nested_types.push(nested);
        self
    }

    /// `Namespace.Name`, or just `Name` when there is no namespace
    pub fn full_name(&self) -> String {
        qualify(&self.namespace, &self.name)
    }

    /// True when the base type's full name equals `full_name`
    pub fn derives_from(&self, full_name: &str) -> bool {
        self.base_type.as_deref() == Some(full_name)
    }

    /// Looks up a declared property by exact name
    pub fn property(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Declared fields with an integer constant, as `(name, value)` pairs
    ///
    /// Constants of other kinds, and unsigned values above `i64::MAX`, are
    /// left out.
    pub fn constants(&self) -> impl Iterator<Item = (&str, i64)> {
        self.fields
            .iter()
            .filter_map(|f| f.integer_constant().map(|value| (f.name.as_str(), value)))
    }
}

/// A declared field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name
    pub name: String,
    /// Compile-time constant, for literal fields
    #[serde(default)]
    pub constant: Option<Constant>,
}

impl FieldDef {
    /// A literal field with a constant value
    pub fn constant(name: impl Into<String>, value: i64) -> Self {
        Self {
            name: name.into(),
            constant: Some(Constant::Int(value)),
        }
    }

    /// A field without a constant
    pub fn instance(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constant: None,
        }
    }

    /// Returns true if the field holds a constant of any kind
    pub fn has_constant(&self) -> bool {
        self.constant.is_some()
    }

    /// The constant as an `i64`, if it is an integer that fits
    pub fn integer_constant(&self) -> Option<i64> {
        self.constant.as_ref().and_then(Constant::as_i64)
    }
}

/// Value of a literal field
///
/// Modules declare constants of every primitive type, so anything that is
/// not an integer is kept opaque rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Constant {
    /// Signed integer
    Int(i64),
    /// Unsigned integer above `i64::MAX`
    UInt(u64),
    /// String, float, bool, or anything else
    Other(serde_json::Value),
}

impl Constant {
    /// The value as an `i64`, if it is an integer that fits
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::UInt(v) => i64::try_from(*v).ok(),
            Self::Other(_) => None,
        }
    }
}

/// A declared property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDef {
    /// Property name
    pub name: String,
    /// Declared type of the property
    pub property_type: TypeRef,
}

/// A reference to a type, possibly a generic instantiation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRef {
    /// Namespace; empty for nested types
    #[serde(default)]
    pub namespace: String,
    /// Simple name (generic arity suffix included, e.g. ``MapField`2``)
    pub name: String,
    /// Full name including generic arguments
    pub full_name: String,
    /// Whether the referenced type is declared inside another type
    #[serde(default)]
    pub is_nested: bool,
    /// Generic arguments, in order, for generic instantiations
    #[serde(default)]
    pub generic_arguments: Vec<TypeRef>,
}

impl TypeRef {
    /// A reference to a non-generic, top-level type
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        let namespace = namespace.into();
        let name = name.into();
        Self {
            full_name: qualify(&namespace, &name),
            namespace,
            name,
            is_nested: false,
            generic_arguments: Vec::new(),
        }
    }

    /// A reference to a type nested inside `declaring_type` (a full name)
    pub fn nested(declaring_type: &str, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            full_name: format!("{}/{}", declaring_type, name),
            namespace: String::new(),
            name,
            is_nested: true,
            generic_arguments: Vec::new(),
        }
    }

    /// A generic instantiation such as ``RepeatedField`1<System.Int32>``
    pub fn generic(
        namespace: impl Into<String>,
        name: impl Into<String>,
        arguments: Vec<TypeRef>,
    ) -> Self {
        let mut ty = Self::new(namespace, name);
        let args: Vec<&str> = arguments.iter().map(|a| a.full_name.as_str()).collect();
        ty.full_name = format!("{}<{}>", ty.full_name, args.join(","));
        ty.generic_arguments = arguments;
        ty
    }
}

fn qualify(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", namespace, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_ref_full_names() {
        assert_eq!(TypeRef::new("System", "Int32").full_name, "System.Int32");
        assert_eq!(TypeRef::new("", "Orphan").full_name, "Orphan");

        let nested = TypeRef::nested("Proto.Avatar", "Types");
        assert_eq!(nested.full_name, "Proto.Avatar/Types");
        assert!(nested.is_nested);
        assert!(nested.namespace.is_empty());

        let map = TypeRef::generic(
            "Google.Protobuf.Collections",
            "MapField`2",
            vec![TypeRef::new("System", "UInt32"), TypeRef::new("Proto", "Item")],
        );
        assert_eq!(
            map.full_name,
            "Google.Protobuf.Collections.MapField`2<System.UInt32,Proto.Item>"
        );
        assert_eq!(map.generic_arguments.len(), 2);
    }

    #[test]
    fn test_enumeration_builder() {
        let ty = TypeDef::enumeration("Proto", "Retcode").with_constant("RET_SUCC", 0);
        assert!(ty.derives_from(ENUM_BASE));
        assert_eq!(ty.fields[0].name, ENUM_VALUE_FIELD);
        assert!(!ty.fields[0].has_constant());
        assert_eq!(ty.constants().collect::<Vec<_>>(), vec![("RET_SUCC", 0)]);
    }

    #[test]
    fn test_with_nested_clears_namespace() {
        let ty = TypeDef::class("Proto", "Outer").with_nested(TypeDef::class("Proto", "Types"));
        assert!(ty.nested_types[0].namespace.is_empty());
    }

    #[test]
    fn test_find_type() {
        let module = Module::new("Assembly-CSharp")
            .with_type(TypeDef::class("Proto", "Outer").with_nested(
                TypeDef::class("", "Types").with_nested(TypeDef::class("", "Inner")),
            ))
            .with_type(TypeDef::class("Google.Protobuf", "MessageBase"));

        assert!(module.find_type("Google.Protobuf.MessageBase").is_some());
        assert_eq!(module.find_type("Proto.Outer/Types/Inner").unwrap().name, "Inner");
        assert!(module.find_type("Proto.Outer/Missing").is_none());
        assert!(module.find_type("Proto.Missing").is_none());
    }

    #[test]
    fn test_schema_types_filters_namespace() {
        let module = Module::new("m")
            .with_type(TypeDef::class("Proto", "A"))
            .with_type(TypeDef::class("Other", "B"))
            .with_type(TypeDef::class("Proto", "C"));

        let names: Vec<_> = module.schema_types("Proto").map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["A", "C"]);
    }
}
