//! # protoscry-core
//!
//! A library for reconstructing Protocol Buffer schemas from the compiled
//! type metadata of generated message classes whose `.proto` sources are
//! gone.
//!
//! Generated classes keep enough of the schema in their metadata to
//! rebuild it: a `<Field>FieldNumber` constant per field, a property whose
//! type reveals scalar, message, repeated, or map storage, a
//! `<Name>OneofCase` enum per one-of group, and a `Types` container for
//! nested enums and messages.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`metadata`]: The reflected type model and the provider seam
//! - [`discovery`]: Marker type lookup and the end-to-end driver
//! - [`reconstruct`]: The reconstruction engine
//! - [`mapper`]: Platform type to schema type name mapping
//! - [`schema`]: The reconstructed schema tree
//! - [`proto`]: `.proto` text and descriptor set output
//! - [`config`]: Names, tables, and overrides the engine keys on
//! - [`diagnostics`]: Recoverable findings
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```no_run
//! use protoscry_core::{JsonMetadataProvider, MetadataProvider, ProtoDumper, ProtoRenderer};
//! use std::path::Path;
//!
//! let provider = JsonMetadataProvider::new();
//! let module = provider.load(Path::new("Assembly-CSharp.json"))?;
//! let firstpass = provider.load(Path::new("Assembly-CSharp-firstpass.json"))?;
//!
//! let result = ProtoDumper::default().run(&module, Some(&firstpass))?;
//! let renderer = ProtoRenderer::new();
//! for node in &result.nodes {
//!     println!("{}", renderer.render(node));
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Extensibility
//!
//! The library provides several traits for customization:
//!
//! - [`MetadataProvider`]: Load module metadata from another source
//! - [`ProtoWriter`]: Consume reconstructed trees element by element
//!

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod config;
pub mod diagnostics;
pub mod discovery;
pub mod error;
pub mod mapper;
pub mod metadata;
pub mod proto;
pub mod reconstruct;
pub mod schema;

// Re-export primary types for convenience
pub use config::{ContainerNames, FieldOverride, ReconstructorConfig};
pub use diagnostics::{Diagnostic, Diagnostics};
pub use discovery::{locate_marker, MarkerLocation, ProtoDumper};
pub use error::{Error, Result};
pub use mapper::TypeNameMapper;
pub use metadata::{Constant, JsonMetadataProvider, MetadataProvider, Module, TypeDef, TypeRef};
pub use proto::{NullWriter, ProtoRenderer, ProtoWriter, RenderConfig, StatsWriter};
pub use reconstruct::{Reconstruction, SchemaReconstructor};
pub use schema::{Field, FieldKind, SchemaNode, TypeName, UnionGroup};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum valid protobuf field number (2^29 - 1)
pub const MAX_FIELD_NUMBER: u32 = 536_870_911;
