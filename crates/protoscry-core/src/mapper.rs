//! Platform type to schema type name mapping.

use std::collections::BTreeMap;
use tracing::trace;

use crate::config::ReconstructorConfig;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::metadata::TypeRef;
use crate::schema::TypeName;

/// Maps type references to schema scalar or message names
///
/// Lookup order:
///
/// 1. Types in the schema namespace, and nested types, keep their simple
///    name. They are cross-references, not scalars.
/// 2. Otherwise the full name is looked up in the scalar table.
/// 3. Otherwise an [`Diagnostic::UnknownType`] is recorded and a
///    placeholder `<prefix><full name>` is returned. This never fails; an
///    incomplete table is expected for a new runtime version.
#[derive(Debug, Clone)]
pub struct TypeNameMapper {
    schema_namespace: String,
    scalars: BTreeMap<String, String>,
    unknown_prefix: String,
}

impl TypeNameMapper {
    /// Creates a mapper from its tables
    pub fn new(
        schema_namespace: impl Into<String>,
        scalars: BTreeMap<String, String>,
        unknown_prefix: impl Into<String>,
    ) -> Self {
        Self {
            schema_namespace: schema_namespace.into(),
            scalars,
            unknown_prefix: unknown_prefix.into(),
        }
    }

    /// Creates a mapper from the relevant parts of `config`
    pub fn from_config(config: &ReconstructorConfig) -> Self {
        Self::new(
            config.schema_namespace.clone(),
            config.scalars.clone(),
            config.unknown_prefix.clone(),
        )
    }

    /// True when `ty` lives in the schema namespace
    pub fn is_local(&self, ty: &TypeRef) -> bool {
        ty.namespace == self.schema_namespace
    }

    /// Schema scalar for a platform full name, if mapped
    pub fn scalar_for(&self, full_name: &str) -> Option<&str> {
        self.scalars.get(full_name).map(String::as_str)
    }

    /// Returns true if `name` is an unknown-type placeholder
    pub fn is_placeholder(&self, name: &str) -> bool {
        name.starts_with(&self.unknown_prefix)
    }

    /// Map `ty` to its schema name
    pub fn map(&self, ty: &TypeRef, diagnostics: &mut Diagnostics) -> String {
        if self.is_local(ty) || ty.is_nested {
            return ty.name.clone();
        }
        if let Some(scalar) = self.scalar_for(&ty.full_name) {
            trace!("Mapped {} -> {}", ty.full_name, scalar);
            return scalar.to_string();
        }
        diagnostics.push(Diagnostic::UnknownType {
            full_name: ty.full_name.clone(),
        });
        format!("{}{}", self.unknown_prefix, ty.full_name)
    }

    /// Map `ty` and tag it with its locality
    pub fn resolve(&self, ty: &TypeRef, diagnostics: &mut Diagnostics) -> TypeName {
        TypeName {
            name: self.map(ty, diagnostics),
            local: self.is_local(ty),
        }
    }
}

impl Default for TypeNameMapper {
    fn default() -> Self {
        Self::from_config(&ReconstructorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_every_table_scalar() {
        let mapper = TypeNameMapper::default();
        let table = [
            ("System", "UInt32", "uint32"),
            ("System", "UInt64", "uint64"),
            ("System", "Boolean", "bool"),
            ("System", "Int32", "int32"),
            ("System", "Int64", "int64"),
            ("System", "String", "string"),
            ("System", "Single", "float"),
            ("System", "Double", "double"),
            ("Google.Protobuf", "ByteString", "bytes"),
        ];

        let mut diags = Diagnostics::new();
        for (ns, name, expected) in table {
            assert_eq!(mapper.map(&TypeRef::new(ns, name), &mut diags), expected);
        }
        assert!(diags.is_empty());
    }

    #[test]
    fn test_unknown_type_emits_one_diagnostic() {
        let mapper = TypeNameMapper::default();
        let mut diags = Diagnostics::new();

        let name = mapper.map(&TypeRef::new("System", "DateTime"), &mut diags);

        assert_eq!(name, "UNK_System.DateTime");
        assert!(mapper.is_placeholder(&name));
        assert_eq!(
            diags.entries(),
            &[Diagnostic::UnknownType {
                full_name: "System.DateTime".to_string()
            }]
        );
    }

    #[test]
    fn test_local_and_nested_keep_simple_name() {
        let mapper = TypeNameMapper::default();
        let mut diags = Diagnostics::new();

        let local = mapper.resolve(&TypeRef::new("Proto", "AvatarInfo"), &mut diags);
        assert_eq!(local, TypeName::local("AvatarInfo"));

        let nested = mapper.resolve(
            &TypeRef::nested("Proto.AvatarInfo/Types", "Stat"),
            &mut diags,
        );
        assert_eq!(nested, TypeName::external("Stat"));
        assert!(diags.is_empty());
    }

    #[test]
    fn test_foreign_type_never_keeps_simple_name() {
        let mapper = TypeNameMapper::default();
        let mut diags = Diagnostics::new();

        for ty in [
            TypeRef::new("System", "Int32"),
            TypeRef::new("UnityEngine", "Vector3"),
            TypeRef::new("", "Global"),
        ] {
            let mapped = mapper.map(&ty, &mut diags);
            assert_ne!(mapped, ty.name);
        }
    }

    #[test]
    fn test_injected_tables() {
        let mut scalars = BTreeMap::new();
        scalars.insert("System.Byte".to_string(), "uint32".to_string());
        let mapper = TypeNameMapper::new("Net", scalars, "MISSING_");
        let mut diags = Diagnostics::new();

        assert_eq!(mapper.map(&TypeRef::new("System", "Byte"), &mut diags), "uint32");
        assert_eq!(
            mapper.map(&TypeRef::new("System", "Int32"), &mut diags),
            "MISSING_System.Int32"
        );
        assert_eq!(mapper.map(&TypeRef::new("Net", "Packet"), &mut diags), "Packet");
        assert_eq!(diags.unknown_type_count(), 1);
    }
}
