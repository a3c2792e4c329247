//! JSON dumps of module metadata.

use std::path::Path;
use tracing::{debug, trace};

use super::{MetadataProvider, Module};
use crate::error::{Error, Result};

/// Reads a [`Module`] serialised as JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonMetadataProvider;

impl JsonMetadataProvider {
    /// Creates a new provider
    pub fn new() -> Self {
        Self
    }

    /// Parse a module from a JSON string
    ///
    /// `origin` only labels errors.
    pub fn parse(&self, json: &str, origin: &Path) -> Result<Module> {
        serde_json::from_str(json).map_err(|e| Error::metadata_parse(origin, e))
    }
}

impl MetadataProvider for JsonMetadataProvider {
    fn load(&self, path: &Path) -> Result<Module> {
        trace!("Reading metadata {}", path.display());
        let json = std::fs::read_to_string(path).map_err(|e| Error::metadata_read(path, e))?;
        let module = self.parse(&json, path)?;
        debug!(
            "Loaded module '{}' with {} top-level types from {}",
            module.name,
            module.types.len(),
            path.display()
        );
        Ok(module)
    }
}
