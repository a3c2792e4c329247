//! Schema reconstruction from reflected type metadata.
//!
//! ## Algorithm
//!
//! For each type, [`SchemaReconstructor`]:
//!
//! 1. Classifies nested types first. A `*OneofCase` enum becomes a
//!    [`UnionGroup`] and claims the properties named by its constants. The
//!    `Types` container yields nested enums (and the command id, if one of
//!    them declares `CmdId`) and nested messages, which are reconstructed
//!    recursively.
//! 2. Pairs every `*FieldNumber` constant with the property of the same
//!    stem and classifies the property's container type as repeated, map,
//!    or plain. Properties claimed by a union are skipped.
//! 3. Applies configured `(type, property) -> scalar` overrides.
//! 4. For enum-shaped types, turns every non-sentinel constant into an
//!    enum member instead.
//!
//! Missing properties behind tag constants are reported as diagnostics.
//! A union member with no property is an error unless unions are lenient.

use std::collections::HashSet;
use tracing::{debug, trace};

use crate::config::{ContainerNames, ReconstructorConfig};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{Error, Result};
use crate::mapper::TypeNameMapper;
use crate::metadata::{Module, PropertyDef, TypeDef, TypeRef};
use crate::schema::{
    EnumEntry, EnumNode, Field, FieldKind, SchemaNode, TypeName, UnionEntry, UnionGroup,
};

/// Container shape of a property type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerShape<'a> {
    /// Repeated scalar or message collection, with its element type
    Repeated(&'a TypeRef),
    /// Scalar or message map, with key and value types
    Map(&'a TypeRef, &'a TypeRef),
    /// Anything else: scalar, message reference, or an unrecognised container
    Plain,
}

/// Classify a property type by its container's full name
///
/// A recognised container without the expected number of generic arguments
/// is treated as [`ContainerShape::Plain`].
pub fn classify<'a>(ty: &'a TypeRef, containers: &ContainerNames) -> ContainerShape<'a> {
    let is = |prefix: &str| !prefix.is_empty() && ty.full_name.starts_with(prefix);

    if is(&containers.repeated_primitive) || is(&containers.repeated_message) {
        if let [element] = ty.generic_arguments.as_slice() {
            return ContainerShape::Repeated(element);
        }
    } else if is(&containers.map) || is(&containers.message_map) {
        if let [key, value] = ty.generic_arguments.as_slice() {
            return ContainerShape::Map(key, value);
        }
    }
    ContainerShape::Plain
}

/// Output of a reconstruction pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconstruction {
    /// Top-level nodes in module declaration order
    pub nodes: Vec<SchemaNode>,
    /// Recoverable findings, in the order they were made
    pub diagnostics: Diagnostics,
}

impl Reconstruction {
    /// Find a top-level node by name
    pub fn node(&self, name: &str) -> Option<&SchemaNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Names of every enum defined anywhere in the reconstruction
    pub fn enum_names(&self) -> HashSet<&str> {
        self.nodes.iter().flat_map(|n| n.enum_names()).collect()
    }
}

/// Rebuilds [`SchemaNode`] trees from type metadata
#[derive(Debug, Clone)]
pub struct SchemaReconstructor {
    config: ReconstructorConfig,
    mapper: TypeNameMapper,
}

impl Default for SchemaReconstructor {
    fn default() -> Self {
        Self::new(ReconstructorConfig::default())
    }
}

impl SchemaReconstructor {
    /// Creates a reconstructor that owns `config`
    pub fn new(config: ReconstructorConfig) -> Self {
        let mapper = TypeNameMapper::from_config(&config);
        Self { config, mapper }
    }

    /// The configuration in use
    pub fn config(&self) -> &ReconstructorConfig {
        &self.config
    }

    /// The type-name mapper in use
    pub fn mapper(&self) -> &TypeNameMapper {
        &self.mapper
    }

    /// Reconstruct every top-level type of `module` in the schema namespace
    pub fn reconstruct_module(&self, module: &Module) -> Result<Reconstruction> {
        let mut diagnostics = Diagnostics::new();
        let nodes = module
            .schema_types(&self.config.schema_namespace)
            .map(|ty| self.reconstruct(ty, &mut diagnostics))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "Reconstructed {} types from module '{}' ({} diagnostics)",
            nodes.len(),
            module.name,
            diagnostics.len()
        );

        Ok(Reconstruction { nodes, diagnostics })
    }

    /// Reconstruct one top-level type
    pub fn reconstruct(&self, ty: &TypeDef, diagnostics: &mut Diagnostics) -> Result<SchemaNode> {
        self.build_node(ty, false, diagnostics)
    }

    fn build_node(
        &self,
        ty: &TypeDef,
        is_nested: bool,
        diagnostics: &mut Diagnostics,
    ) -> Result<SchemaNode> {
        trace!("Reconstructing {}", ty.full_name());

        let mut command_id = None;
        let mut enums = Vec::new();
        let mut nested = Vec::new();
        let mut unions = Vec::new();
        let mut claimed: HashSet<String> = HashSet::new();

        // Unions must be known before fields so their members can be skipped
        for inner in &ty.nested_types {
            if inner.name.ends_with(&self.config.union_suffix) {
                let group = self.build_union(ty, inner, &mut claimed, diagnostics)?;
                if group.entries.is_empty() {
                    debug!("{}: dropping empty union {}", ty.name, group.name);
                } else {
                    unions.push(group);
                }
            } else if inner.name == self.config.types_container {
                for member in &inner.nested_types {
                    if member.derives_from(&self.config.enum_base) {
                        let (node, cmd) = self.build_enum(member);
                        if cmd.is_some() {
                            command_id = cmd;
                        }
                        enums.push(node);
                    } else {
                        nested.push(self.build_node(member, true, diagnostics)?);
                    }
                }
            }
        }

        let is_enum = ty.derives_from(&self.config.enum_base);
        let fields = if is_enum {
            self.enum_members(ty)
        } else {
            self.message_fields(ty, &claimed, diagnostics)
        };

        let node = SchemaNode {
            name: ty.name.clone(),
            command_id,
            fields,
            enums,
            nested,
            unions,
            is_nested,
            is_enum,
        };

        if !is_enum {
            for (tag, first, second) in node.duplicate_tags() {
                diagnostics.push(Diagnostic::DuplicateTag {
                    owner: node.name.clone(),
                    tag,
                    first: first.to_string(),
                    second: second.to_string(),
                });
            }
        }

        Ok(node)
    }

    fn build_union(
        &self,
        owner: &TypeDef,
        discriminator: &TypeDef,
        claimed: &mut HashSet<String>,
        diagnostics: &mut Diagnostics,
    ) -> Result<UnionGroup> {
        let name = discriminator
            .name
            .strip_suffix(self.config.union_suffix.as_str())
            .unwrap_or(discriminator.name.as_str());

        let mut entries = Vec::new();
        for (member, value) in discriminator.constants() {
            if self.config.is_sentinel(member) {
                continue;
            }
            // Zero is the unset discriminant; its property is still claimed
            if value == 0 {
                if owner.property(member).is_some() {
                    claimed.insert(member.to_string());
                }
                continue;
            }
            match owner.property(member) {
                Some(property) => {
                    claimed.insert(property.name.clone());
                    entries.push(UnionEntry {
                        ty: self.mapper.resolve(&property.property_type, diagnostics),
                        member: member.to_string(),
                        discriminant: value,
                    });
                }
                None if self.config.strict_unions => {
                    return Err(Error::union_member_missing(&owner.name, member));
                }
                None => diagnostics.push(Diagnostic::MissingUnionMember {
                    owner: owner.name.clone(),
                    member: member.to_string(),
                }),
            }
        }

        trace!("{}: union {} with {} members", owner.name, name, entries.len());
        Ok(UnionGroup {
            name: name.to_string(),
            entries,
        })
    }

    /// Returns the enum and the value of its command-id constant, if declared
    fn build_enum(&self, ty: &TypeDef) -> (EnumNode, Option<i64>) {
        let mut command_id = None;
        let mut entries = Vec::new();

        for (name, value) in ty.constants() {
            if self.config.is_sentinel(name) {
                continue;
            }
            if name == self.config.command_id_constant {
                command_id = Some(value);
            }
            entries.push(EnumEntry {
                name: name.to_string(),
                value,
            });
        }

        let node = EnumNode {
            name: ty.name.clone(),
            entries,
        };
        (node, command_id)
    }

    fn enum_members(&self, ty: &TypeDef) -> Vec<Field> {
        ty.constants()
            .filter(|(name, _)| !self.config.is_sentinel(name))
            .map(|(name, value)| Field {
                property_name: String::new(),
                tag: value,
                kind: FieldKind::EnumValue {
                    ty: TypeName::external(name),
                },
            })
            .collect()
    }

    fn message_fields(
        &self,
        ty: &TypeDef,
        claimed: &HashSet<String>,
        diagnostics: &mut Diagnostics,
    ) -> Vec<Field> {
        let mut fields = Vec::new();

        for field in &ty.fields {
            let Some(tag) = field.integer_constant() else {
                continue;
            };
            let Some(stem) = field.name.strip_suffix(self.config.tag_suffix.as_str()) else {
                continue;
            };

            let Some(property) = ty.property(stem) else {
                diagnostics.push(Diagnostic::MissingProperty {
                    owner: ty.name.clone(),
                    property: stem.to_string(),
                    tag,
                });
                continue;
            };

            if claimed.contains(&property.name) {
                trace!("{}: {} belongs to a union", ty.name, property.name);
                continue;
            }

            fields.push(self.build_field(ty, property, tag, diagnostics));
        }

        fields
    }

    fn build_field(
        &self,
        owner: &TypeDef,
        property: &PropertyDef,
        tag: i64,
        diagnostics: &mut Diagnostics,
    ) -> Field {
        let kind = if let Some(scalar) = self.config.override_for(&owner.name, &property.name) {
            trace!("{}.{} forced to {}", owner.name, property.name, scalar);
            FieldKind::Singular {
                ty: TypeName::external(scalar),
            }
        } else {
            match classify(&property.property_type, &self.config.containers) {
                ContainerShape::Repeated(element) => FieldKind::Repeated {
                    ty: self.mapper.resolve(element, diagnostics),
                },
                ContainerShape::Map(key, value) => FieldKind::Map {
                    key: self.mapper.resolve(key, diagnostics),
                    value: self.mapper.resolve(value, diagnostics),
                },
                ContainerShape::Plain => FieldKind::Singular {
                    ty: self.mapper.resolve(&property.property_type, diagnostics),
                },
            }
        };

        Field {
            property_name: property.name.clone(),
            tag,
            kind,
        }
    }
}
