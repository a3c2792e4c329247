//! Binary descriptor output.
//!
//! Converts reconstructed trees into `FileDescriptorProto`s so they can be
//! fed to tooling that consumes descriptor sets instead of `.proto` text.
//! Map fields get the synthetic `<Field>Entry` message with `map_entry`
//! set, exactly as protoc would emit them.

use prost::Message;
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, EnumDescriptorProto, EnumOptions, EnumValueDescriptorProto,
    FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet, MessageOptions,
    OneofDescriptorProto,
};
use std::collections::HashSet;

use super::{has_aliases, to_snake_case, ProtoRenderer};
use crate::error::{Error, Result};
use crate::reconstruct::Reconstruction;
use crate::schema::{EnumEntry, Field, FieldKind, SchemaNode, TypeName};
use crate::MAX_FIELD_NUMBER;

/// Build the descriptor of the file holding `node`
///
/// `enum_names` decides whether a non-scalar reference is typed as an enum
/// or a message.
pub fn build_file(
    node: &SchemaNode,
    package: Option<&str>,
    enum_names: &HashSet<&str>,
) -> Result<FileDescriptorProto> {
    let defined = node.defined_names();
    let dependency = node
        .local_references()
        .into_iter()
        .filter(|name| !defined.contains(name))
        .map(|name| format!("{}.proto", name))
        .collect();

    let mut file = FileDescriptorProto {
        name: Some(ProtoRenderer::filename(node)),
        package: package.map(str::to_string),
        dependency,
        syntax: Some("proto3".to_string()),
        ..Default::default()
    };

    if node.is_enum {
        let entries: Vec<EnumEntry> = node
            .fields
            .iter()
            .filter_map(|f| match &f.kind {
                FieldKind::EnumValue { ty } => Some(EnumEntry {
                    name: ty.name.clone(),
                    value: f.tag,
                }),
                _ => None,
            })
            .collect();
        file.enum_type.push(build_enum(&node.name, &entries)?);
    } else {
        file.message_type.push(build_message(node, enum_names)?);
    }

    Ok(file)
}

/// Build a descriptor set with one file per top-level node
pub fn build_set(reconstruction: &Reconstruction, package: Option<&str>) -> Result<FileDescriptorSet> {
    let enum_names = reconstruction.enum_names();
    let file = reconstruction
        .nodes
        .iter()
        .map(|node| build_file(node, package, &enum_names))
        .collect::<Result<Vec<_>>>()?;
    Ok(FileDescriptorSet { file })
}

/// Encode a descriptor set to protobuf wire format
pub fn encode_set(set: &FileDescriptorSet) -> Vec<u8> {
    set.encode_to_vec()
}

fn build_message(node: &SchemaNode, enum_names: &HashSet<&str>) -> Result<DescriptorProto> {
    let mut message = DescriptorProto {
        name: Some(node.name.clone()),
        ..Default::default()
    };

    for nested in &node.nested {
        message.nested_type.push(build_message(nested, enum_names)?);
    }
    for enum_node in &node.enums {
        message.enum_type.push(build_enum(&enum_node.name, &enum_node.entries)?);
    }

    for (index, union) in node.unions.iter().enumerate() {
        message.oneof_decl.push(OneofDescriptorProto {
            name: Some(to_snake_case(&union.name)),
            options: None,
        });
        for entry in &union.entries {
            let mut field = scalar_field(&entry.member, entry.discriminant, &entry.ty, enum_names)?;
            field.oneof_index = Some(index as i32);
            message.field.push(field);
        }
    }

    for field in &node.fields {
        match &field.kind {
            FieldKind::Singular { ty } => {
                message
                    .field
                    .push(scalar_field(&field.property_name, field.tag, ty, enum_names)?);
            }
            FieldKind::Repeated { ty } => {
                let mut built = scalar_field(&field.property_name, field.tag, ty, enum_names)?;
                built.label = Some(Label::Repeated as i32);
                message.field.push(built);
            }
            FieldKind::Map { key, value } => {
                let entry = map_entry(field, key, value, enum_names)?;
                let mut built = FieldDescriptorProto {
                    name: Some(to_snake_case(&field.property_name)),
                    number: Some(field_number(&field.property_name, field.tag)?),
                    label: Some(Label::Repeated as i32),
                    r#type: Some(Type::Message as i32),
                    ..Default::default()
                };
                built.type_name = entry.name.clone();
                message.nested_type.push(entry);
                message.field.push(built);
            }
            FieldKind::EnumValue { .. } => {}
        }
    }

    Ok(message)
}

fn map_entry(
    field: &Field,
    key: &TypeName,
    value: &TypeName,
    enum_names: &HashSet<&str>,
) -> Result<DescriptorProto> {
    Ok(DescriptorProto {
        name: Some(format!("{}Entry", field.property_name)),
        field: vec![
            scalar_field("Key", 1, key, enum_names)?,
            scalar_field("Value", 2, value, enum_names)?,
        ],
        options: Some(MessageOptions {
            map_entry: Some(true),
            ..Default::default()
        }),
        ..Default::default()
    })
}

fn scalar_field(
    property: &str,
    tag: i64,
    ty: &TypeName,
    enum_names: &HashSet<&str>,
) -> Result<FieldDescriptorProto> {
    let mut field = FieldDescriptorProto {
        name: Some(to_snake_case(property)),
        number: Some(field_number(property, tag)?),
        label: Some(Label::Optional as i32),
        ..Default::default()
    };

    match scalar_type(&ty.name) {
        Some(scalar) => field.r#type = Some(scalar as i32),
        None => {
            let kind = if enum_names.contains(ty.name.as_str()) {
                Type::Enum
            } else {
                Type::Message
            };
            field.r#type = Some(kind as i32);
            field.type_name = Some(ty.name.clone());
        }
    }

    Ok(field)
}

fn build_enum(name: &str, entries: &[EnumEntry]) -> Result<EnumDescriptorProto> {
    let value = entries
        .iter()
        .map(|e| {
            let number = i32::try_from(e.value).map_err(|_| {
                Error::invalid_field_number(&e.name, e.value, i32::MIN as i64, i32::MAX as i64)
            })?;
            Ok(EnumValueDescriptorProto {
                name: Some(e.name.clone()),
                number: Some(number),
                options: None,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let values: Vec<i64> = entries.iter().map(|e| e.value).collect();
    let options = has_aliases(&values).then(|| EnumOptions {
        allow_alias: Some(true),
        ..Default::default()
    });

    Ok(EnumDescriptorProto {
        name: Some(name.to_string()),
        value,
        options,
        ..Default::default()
    })
}

fn field_number(name: &str, tag: i64) -> Result<i32> {
    if (1..=MAX_FIELD_NUMBER as i64).contains(&tag) {
        Ok(tag as i32)
    } else {
        Err(Error::invalid_field_number(name, tag, 1, MAX_FIELD_NUMBER as i64))
    }
}

fn scalar_type(name: &str) -> Option<Type> {
    let ty = match name {
        "double" => Type::Double,
        "float" => Type::Float,
        "int64" => Type::Int64,
        "uint64" => Type::Uint64,
        "int32" => Type::Int32,
        "fixed64" => Type::Fixed64,
        "fixed32" => Type::Fixed32,
        "bool" => Type::Bool,
        "string" => Type::String,
        "bytes" => Type::Bytes,
        "uint32" => Type::Uint32,
        "sfixed32" => Type::Sfixed32,
        "sfixed64" => Type::Sfixed64,
        "sint32" => Type::Sint32,
        "sint64" => Type::Sint64,
        _ => return None,
    };
    Some(ty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::schema::{EnumNode, UnionEntry, UnionGroup};
    use pretty_assertions::assert_eq;

    fn message(name: &str) -> SchemaNode {
        SchemaNode {
            name: name.to_string(),
            command_id: None,
            fields: Vec::new(),
            enums: Vec::new(),
            nested: Vec::new(),
            unions: Vec::new(),
            is_nested: false,
            is_enum: false,
        }
    }

    fn field(property: &str, tag: i64, kind: FieldKind) -> Field {
        Field {
            property_name: property.to_string(),
            tag,
            kind,
        }
    }

    #[test]
    fn test_map_field_gets_entry_message() {
        let mut node = message("Bag");
        node.fields.push(field(
            "ItemMap",
            4,
            FieldKind::Map {
                key: TypeName::external("uint32"),
                value: TypeName::local("Item"),
            },
        ));

        let file = build_file(&node, Some("proto"), &HashSet::new()).unwrap();

        assert_eq!(file.name(), "Bag.proto");
        assert_eq!(file.package(), "proto");
        assert_eq!(file.dependency, vec!["Item.proto".to_string()]);

        let msg = &file.message_type[0];
        let entry = &msg.nested_type[0];
        assert_eq!(entry.name(), "ItemMapEntry");
        assert_eq!(entry.options.as_ref().and_then(|o| o.map_entry), Some(true));
        assert_eq!(entry.field[0].r#type(), Type::Uint32);
        assert_eq!(entry.field[1].r#type(), Type::Message);
        assert_eq!(entry.field[1].type_name(), "Item");

        let map = &msg.field[0];
        assert_eq!(map.name(), "item_map");
        assert_eq!(map.number(), 4);
        assert_eq!(map.label(), Label::Repeated);
        assert_eq!(map.type_name(), "ItemMapEntry");
    }

    #[test]
    fn test_oneof_and_enum_references() {
        let mut node = message("Entity");
        node.enums.push(EnumNode {
            name: "Kind".to_string(),
            entries: vec![EnumEntry {
                name: "KindNone".to_string(),
                value: 0,
            }],
        });
        node.fields.push(field("Kind", 1, FieldKind::Singular { ty: TypeName::external("Kind") }));
        node.fields.push(field("Tags", 2, FieldKind::Repeated { ty: TypeName::external("string") }));
        node.unions.push(UnionGroup {
            name: "Detail".to_string(),
            entries: vec![UnionEntry {
                ty: TypeName::local("Avatar"),
                member: "Avatar".to_string(),
                discriminant: 3,
            }],
        });

        let enum_names: HashSet<&str> = node.enum_names().into_iter().collect();
        let file = build_file(&node, None, &enum_names).unwrap();
        let msg = &file.message_type[0];

        assert_eq!(msg.oneof_decl[0].name(), "detail");
        let avatar = msg.field.iter().find(|f| f.name() == "avatar").unwrap();
        assert_eq!(avatar.oneof_index, Some(0));
        assert_eq!(avatar.r#type(), Type::Message);

        let kind = msg.field.iter().find(|f| f.name() == "kind").unwrap();
        assert_eq!(kind.r#type(), Type::Enum);

        let tags = msg.field.iter().find(|f| f.name() == "tags").unwrap();
        assert_eq!(tags.label(), Label::Repeated);
        assert_eq!(tags.r#type(), Type::String);
    }

    #[test]
    fn test_enum_node_with_aliases() {
        let mut node = message("Retcode");
        node.is_enum = true;
        for (name, value) in [("RetSucc", 0), ("RetOk", 0)] {
            node.fields.push(field("", value, FieldKind::EnumValue { ty: TypeName::external(name) }));
        }

        let file = build_file(&node, None, &HashSet::new()).unwrap();

        assert!(file.message_type.is_empty());
        let e = &file.enum_type[0];
        assert_eq!(e.value.len(), 2);
        assert_eq!(e.options.as_ref().and_then(|o| o.allow_alias), Some(true));
    }

    #[test]
    fn test_out_of_range_field_number() {
        let mut node = message("Bad");
        node.fields.push(field("Zero", 0, FieldKind::Singular { ty: TypeName::external("bool") }));

        let err = build_file(&node, None, &HashSet::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidFieldNumber { number: 0, .. }));
    }

    #[test]
    fn test_build_and_encode_set() {
        let mut ping = message("PingReq");
        ping.fields.push(field("Seq", 1, FieldKind::Singular { ty: TypeName::external("uint32") }));
        let reconstruction = Reconstruction {
            nodes: vec![ping],
            diagnostics: Diagnostics::new(),
        };

        let set = build_set(&reconstruction, Some("proto")).unwrap();
        let bytes = encode_set(&set);
        let decoded = FileDescriptorSet::decode(bytes.as_slice()).unwrap();

        assert_eq!(decoded, set);
        assert_eq!(decoded.file[0].message_type[0].field[0].r#type(), Type::Uint32);
    }
}
