//! Extensible schema visiting traits.
//!
//! This module provides the [`ProtoWriter`] trait for consuming a
//! reconstructed tree element by element, and [`walk_node`] to drive it.

use std::fmt::Result;

use crate::schema::{EnumNode, Field, SchemaNode, UnionGroup};

/// Trait for writing schema elements to output.
///
/// Implement this trait to produce an output format other than `.proto`
/// text, or to gather information about a reconstruction. Every method
/// defaults to doing nothing.
///
/// # Example
///
/// ```
/// use protoscry_core::proto::{walk_node, ProtoWriter};
/// use protoscry_core::schema::SchemaNode;
///
/// #[derive(Default)]
/// struct Names(Vec<String>);
///
/// impl ProtoWriter for Names {
///     fn write_node(&mut self, node: &SchemaNode) -> std::fmt::Result {
///         self.0.push(node.name.clone());
///         Ok(())
///     }
/// }
/// ```
pub trait ProtoWriter {
    /// Write a message or enum-shaped node; called before its children
    fn write_node(&mut self, node: &SchemaNode) -> Result {
        let _ = node;
        Ok(())
    }

    /// Write a field or enum member
    fn write_field(&mut self, field: &Field) -> Result {
        let _ = field;
        Ok(())
    }

    /// Write a nested enum
    fn write_enum(&mut self, enum_node: &EnumNode) -> Result {
        let _ = enum_node;
        Ok(())
    }

    /// Write a one-of group
    fn write_union(&mut self, union: &UnionGroup) -> Result {
        let _ = union;
        Ok(())
    }
}

/// Visit `node` and everything below it, depth first
pub fn walk_node<W: ProtoWriter + ?Sized>(node: &SchemaNode, writer: &mut W) -> Result {
    writer.write_node(node)?;
    for nested in &node.nested {
        walk_node(nested, writer)?;
    }
    for enum_node in &node.enums {
        writer.write_enum(enum_node)?;
    }
    for union in &node.unions {
        writer.write_union(union)?;
    }
    for field in &node.fields {
        writer.write_field(field)?;
    }
    Ok(())
}

/// A no-op writer that discards all output
pub struct NullWriter;

impl ProtoWriter for NullWriter {}

/// A writer that collects statistics about a reconstruction
#[derive(Debug, Default)]
pub struct StatsWriter {
    /// Number of messages, nested ones included
    pub message_count: usize,
    /// Number of enums, enum-shaped nodes included
    pub enum_count: usize,
    /// Number of message fields
    pub field_count: usize,
    /// Number of one-of groups
    pub union_count: usize,
    /// Number of messages carrying a command id
    pub command_count: usize,
}

impl ProtoWriter for StatsWriter {
    fn write_node(&mut self, node: &SchemaNode) -> Result {
        if node.is_enum {
            self.enum_count += 1;
        } else {
            self.message_count += 1;
        }
        if node.command_id.is_some() {
            self.command_count += 1;
        }
        Ok(())
    }

    fn write_field(&mut self, field: &Field) -> Result {
        if !field.property_name.is_empty() {
            self.field_count += 1;
        }
        Ok(())
    }

    fn write_enum(&mut self, _enum_node: &EnumNode) -> Result {
        self.enum_count += 1;
        Ok(())
    }

    fn write_union(&mut self, _union: &UnionGroup) -> Result {
        self.union_count += 1;
        Ok(())
    }
}
