//! Proto definition rendering module.
//!
//! This module turns reconstructed [`SchemaNode`] trees into `.proto`
//! source text, and into binary descriptor sets via [`descriptor`].
//!
//! ## Layout
//!
//! Each top-level node becomes one proto3 file named after it. Local types
//! referenced from the tree but not defined inside it become imports of
//! their own `<Name>.proto`. A message's command id is written as a
//! `// CmdId: N` comment above it, since proto syntax has no place for it.
//!
//! ## Extensibility
//!
//! The [`ProtoWriter`] trait allows other consumers of the tree (statistics,
//! documentation, alternative formats) without touching the renderer.

pub mod descriptor;
mod output;
mod writer;

use std::fmt::Write as FmtWrite;

use crate::schema::{EnumNode, Field, FieldKind, SchemaNode, UnionGroup};

pub use output::{output_path, write_output};
pub use writer::{walk_node, NullWriter, ProtoWriter, StatsWriter};

/// Configuration for proto rendering
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Indentation string (default: 2 spaces)
    pub indent_str: String,
    /// Package declaration, if any
    pub package: Option<String>,
    /// Write command ids as comments
    pub include_command_ids: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            indent_str: "  ".to_string(),
            package: None,
            include_command_ids: true,
        }
    }
}

impl RenderConfig {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the indentation string
    pub fn indent_str(mut self, s: impl Into<String>) -> Self {
        self.indent_str = s.into();
        self
    }

    /// Sets the package declaration
    pub fn package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    /// Sets whether command ids are written as comments
    pub fn include_command_ids(mut self, include: bool) -> Self {
        self.include_command_ids = include;
        self
    }
}

/// Renders schema trees as `.proto` files
#[derive(Debug, Clone, Default)]
pub struct ProtoRenderer {
    config: RenderConfig,
}

impl ProtoRenderer {
    /// Creates a renderer with default config
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a renderer with custom config
    pub fn with_config(config: RenderConfig) -> Self {
        Self { config }
    }

    /// File name for a top-level node
    pub fn filename(node: &SchemaNode) -> String {
        format!("{}.proto", node.name)
    }

    /// Render `node` as a complete `.proto` file
    pub fn render(&self, node: &SchemaNode) -> String {
        let mut output = String::new();
        // Writing into a String cannot fail
        let _ = self.write_to(node, &mut output);
        output
    }

    /// Write `node` as a complete `.proto` file to a writer
    pub fn write_to(&self, node: &SchemaNode, w: &mut impl FmtWrite) -> std::fmt::Result {
        let mut writer = DefaultProtoWriter::new(w, &self.config);
        writer.write_file(node)
    }
}

/// Default text writer
struct DefaultProtoWriter<'a, W: FmtWrite> {
    writer: &'a mut W,
    config: &'a RenderConfig,
    indent_level: usize,
}

impl<'a, W: FmtWrite> DefaultProtoWriter<'a, W> {
    fn new(writer: &'a mut W, config: &'a RenderConfig) -> Self {
        Self {
            writer,
            config,
            indent_level: 0,
        }
    }

    fn indent(&mut self) {
        self.indent_level += 1;
    }

    fn dedent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }

    fn write_indent(&mut self) -> std::fmt::Result {
        for _ in 0..self.indent_level {
            write!(self.writer, "{}", self.config.indent_str)?;
        }
        Ok(())
    }

    fn writeln(&mut self, s: &str) -> std::fmt::Result {
        self.write_indent()?;
        writeln!(self.writer, "{}", s)
    }

    fn write_file(&mut self, node: &SchemaNode) -> std::fmt::Result {
        writeln!(self.writer, "syntax = \"proto3\";")?;
        writeln!(self.writer)?;

        if let Some(package) = &self.config.package {
            writeln!(self.writer, "package {};", package)?;
            writeln!(self.writer)?;
        }

        self.write_imports(node)?;

        if node.is_enum {
            self.write_enum_node(node)
        } else {
            self.write_message(node)
        }
    }

    fn write_imports(&mut self, node: &SchemaNode) -> std::fmt::Result {
        let defined = node.defined_names();
        let imports: Vec<&str> = node
            .local_references()
            .into_iter()
            .filter(|name| !defined.contains(name))
            .collect();

        if imports.is_empty() {
            return Ok(());
        }

        for import in imports {
            writeln!(self.writer, "import \"{}.proto\";", import)?;
        }
        writeln!(self.writer)?;
        Ok(())
    }

    fn write_message(&mut self, node: &SchemaNode) -> std::fmt::Result {
        if self.config.include_command_ids {
            if let Some(cmd_id) = node.command_id {
                self.writeln(&format!("// CmdId: {}", cmd_id))?;
            }
        }
        self.writeln(&format!("message {} {{", node.name))?;
        self.indent();

        for nested in &node.nested {
            self.write_message(nested)?;
        }

        for enum_node in &node.enums {
            self.write_enum(enum_node)?;
        }

        for union in &node.unions {
            self.write_oneof(union)?;
        }

        for field in &node.fields {
            self.write_field(field)?;
        }

        self.dedent();
        self.writeln("}")?;
        if !node.is_nested {
            writeln!(self.writer)?;
        }

        Ok(())
    }

    fn write_oneof(&mut self, union: &UnionGroup) -> std::fmt::Result {
        self.writeln(&format!("oneof {} {{", to_snake_case(&union.name)))?;
        self.indent();

        for entry in &union.entries {
            self.writeln(&format!(
                "{} {} = {};",
                entry.ty.name,
                to_snake_case(&entry.member),
                entry.discriminant
            ))?;
        }

        self.dedent();
        self.writeln("}")
    }

    fn write_field(&mut self, field: &Field) -> std::fmt::Result {
        let name = to_snake_case(&field.property_name);
        let line = match &field.kind {
            FieldKind::Singular { ty } => format!("{} {} = {};", ty.name, name, field.tag),
            FieldKind::Repeated { ty } => {
                format!("repeated {} {} = {};", ty.name, name, field.tag)
            }
            FieldKind::Map { key, value } => {
                format!("map<{}, {}> {} = {};", key.name, value.name, name, field.tag)
            }
            FieldKind::EnumValue { ty } => format!("{} = {};", ty.name, field.tag),
        };
        self.writeln(&line)
    }

    fn write_enum_node(&mut self, node: &SchemaNode) -> std::fmt::Result {
        let values: Vec<i64> = node.fields.iter().map(|f| f.tag).collect();
        self.writeln(&format!("enum {} {{", node.name))?;
        self.indent();

        if has_aliases(&values) {
            self.writeln("option allow_alias = true;")?;
        }
        for field in &node.fields {
            self.write_field(field)?;
        }

        self.dedent();
        self.writeln("}")?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn write_enum(&mut self, enum_node: &EnumNode) -> std::fmt::Result {
        let values: Vec<i64> = enum_node.entries.iter().map(|e| e.value).collect();
        self.writeln(&format!("enum {} {{", enum_node.name))?;
        self.indent();

        if has_aliases(&values) {
            self.writeln("option allow_alias = true;")?;
        }
        for entry in &enum_node.entries {
            self.writeln(&format!("{} = {};", entry.name, entry.value))?;
        }

        self.dedent();
        self.writeln("}")
    }
}

/// True when some value occurs more than once
fn has_aliases(values: &[i64]) -> bool {
    let mut seen = std::collections::HashSet::new();
    values.iter().any(|v| !seen.insert(*v))
}

/// Convert a PascalCase accessor name to snake_case
///
/// Acronym runs stay together: `HTTPPort` becomes `http_port`.
pub fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).map_or(false, |n| n.is_ascii_lowercase());
            if prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_is_lower)
            {
                result.push('_');
            }
        }
        result.push(c.to_ascii_lowercase());
    }

    result
}
