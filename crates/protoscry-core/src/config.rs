//! Reconstruction configuration.
//!
//! Every name the engine keys on lives here rather than in the engine, so
//! metadata from another protobuf runtime (or another game's protocol)
//! only needs a different config. A TOML file names just what differs:
//!
//! ```toml
//! schema_namespace = "Proto"
//!
//! [containers]
//! repeated_message = "Google.Protobuf.Collections.RepeatedMessageField`1"
//!
//! [[overrides]]
//! type_name = "HomeVerifyData"
//! property = "Timestamp"
//! scalar = "fixed32"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{Error, Result};
use crate::metadata::{ENUM_BASE, ENUM_VALUE_FIELD};

/// Configuration for schema reconstruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconstructorConfig {
    /// Namespace holding the schema-generated types
    pub schema_namespace: String,
    /// Full name of the marker base type used for discovery
    pub marker_type: String,
    /// Full name of the platform enum base type
    pub enum_base: String,
    /// Suffix of the constants carrying tag numbers
    pub tag_suffix: String,
    /// Suffix of the nested discriminator enums of one-of groups
    pub union_suffix: String,
    /// Name of the synthetic container of nested enums and messages
    pub types_container: String,
    /// Enum constants that never become entries
    pub sentinels: Vec<String>,
    /// Enum constant whose value is the message's command id
    pub command_id_constant: String,
    /// Generic container type names
    pub containers: ContainerNames,
    /// Platform scalar full name to schema scalar name
    pub scalars: BTreeMap<String, String>,
    /// Prefix of the placeholder emitted for unmapped types
    pub unknown_prefix: String,
    /// Forced scalar types for specific fields
    pub overrides: Vec<FieldOverride>,
    /// Fail on a union member without a property instead of dropping it
    pub strict_unions: bool,
}

impl Default for ReconstructorConfig {
    fn default() -> Self {
        Self {
            schema_namespace: "Proto".to_string(),
            marker_type: "Google.Protobuf.IMessage".to_string(),
            enum_base: ENUM_BASE.to_string(),
            tag_suffix: "FieldNumber".to_string(),
            union_suffix: "OneofCase".to_string(),
            types_container: "Types".to_string(),
            sentinels: vec![ENUM_VALUE_FIELD.to_string(), "None".to_string()],
            command_id_constant: "CmdId".to_string(),
            containers: ContainerNames::default(),
            scalars: default_scalars(),
            unknown_prefix: "UNK_".to_string(),
            overrides: Vec::new(),
            strict_unions: true,
        }
    }
}

impl ReconstructorConfig {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a config from TOML; omitted keys keep their defaults
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Reads and parses a TOML config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path).map_err(|e| Error::config_read(path, e))?;
        Self::from_toml_str(&s)
    }

    /// Sets the schema namespace
    pub fn schema_namespace(mut self, ns: impl Into<String>) -> Self {
        self.schema_namespace = ns.into();
        self
    }

    /// Sets the marker base type
    pub fn marker_type(mut self, name: impl Into<String>) -> Self {
        self.marker_type = name.into();
        self
    }

    /// Sets the repeated-message container name, which varies by runtime
    pub fn repeated_message_container(mut self, name: impl Into<String>) -> Self {
        self.containers.repeated_message = name.into();
        self
    }

    /// Adds or replaces a scalar mapping
    pub fn scalar(mut self, platform: impl Into<String>, schema: impl Into<String>) -> Self {
        self.scalars.insert(platform.into(), schema.into());
        self
    }

    /// Adds a forced scalar type for one field
    pub fn override_field(
        mut self,
        type_name: impl Into<String>,
        property: impl Into<String>,
        scalar: impl Into<String>,
    ) -> Self {
        self.overrides.push(FieldOverride {
            type_name: type_name.into(),
            property: property.into(),
            scalar: scalar.into(),
        });
        self
    }

    /// Sets whether a dangling union member is an error
    pub fn strict_unions(mut self, strict: bool) -> Self {
        self.strict_unions = strict;
        self
    }

    /// Returns true if `name` is a sentinel enum constant
    pub fn is_sentinel(&self, name: &str) -> bool {
        self.sentinels.iter().any(|s| s == name)
    }

    /// The forced scalar for `property` of the type named `type_name`, if any
    pub fn override_for(&self, type_name: &str, property: &str) -> Option<&str> {
        self.overrides
            .iter()
            .find(|o| o.type_name == type_name && o.property == property)
            .map(|o| o.scalar.as_str())
    }
}

/// Full names (without generic arguments) of the runtime's collection types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerNames {
    /// Repeated scalar collection
    pub repeated_primitive: String,
    /// Repeated message collection
    pub repeated_message: String,
    /// Scalar-valued map
    pub map: String,
    /// Message-valued map
    pub message_map: String,
}

impl Default for ContainerNames {
    fn default() -> Self {
        Self {
            repeated_primitive: "Google.Protobuf.Collections.RepeatedPrimitiveField`1".to_string(),
            repeated_message: "Google.Protobuf.Collections.RepeatedField`1".to_string(),
            map: "Google.Protobuf.Collections.MapField`2".to_string(),
            message_map: "Google.Protobuf.Collections.MessageMapField`2".to_string(),
        }
    }
}

/// A `(type, property) -> scalar` substitution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOverride {
    /// Simple name of the owning type
    pub type_name: String,
    /// Property name
    pub property: String,
    /// Schema scalar to force, e.g. `fixed32`
    pub scalar: String,
}

fn default_scalars() -> BTreeMap<String, String> {
    [
        ("System.UInt32", "uint32"),
        ("System.UInt64", "uint64"),
        ("System.Boolean", "bool"),
        ("System.Int32", "int32"),
        ("System.Int64", "int64"),
        ("System.String", "string"),
        ("System.Single", "float"),
        ("System.Double", "double"),
        ("Google.Protobuf.ByteString", "bytes"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}
