//! Error types for the protoscry-core library.
//!
//! Only two things abort a run: the schema marker type cannot be found, or
//! the metadata contradicts itself in a way the engine refuses to paper
//! over (a union member without a backing property). Everything else is a
//! [`Diagnostic`](crate::diagnostics::Diagnostic), not an error.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for protoscry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for all protoscry operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The schema marker base type is in neither the primary nor the fallback module
    #[error("schema marker type '{marker}' not found in any searched module")]
    RootTypeMissing {
        /// Full name of the marker type that was searched for
        marker: String,
    },

    /// A union discriminator names a member with no matching property
    #[error("union member '{member}' of '{owner}' has no backing property")]
    UnionMemberMissing {
        /// Simple name of the type owning the union
        owner: String,
        /// Discriminator constant name
        member: String,
    },

    /// A field number or enum value cannot be encoded in a descriptor
    #[error("invalid number {number} for '{name}': must be between {min} and {max}")]
    InvalidFieldNumber {
        /// Field or enum value name
        name: String,
        /// The offending number
        number: i64,
        /// Smallest valid number
        min: i64,
        /// Largest valid number
        max: i64,
    },

    /// Failed to read a metadata dump
    #[error("failed to read metadata '{path}': {source}")]
    MetadataRead {
        /// Path to the metadata dump
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A metadata dump is not valid JSON for the module model
    #[error("failed to parse metadata '{path}': {source}")]
    MetadataParse {
        /// Path to the metadata dump
        path: PathBuf,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// Failed to read a configuration file
    #[error("failed to read config '{path}': {source}")]
    ConfigRead {
        /// Path to the configuration file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A configuration file is not valid TOML for [`ReconstructorConfig`](crate::ReconstructorConfig)
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Failed to write output file
    #[error("failed to write file '{path}': {source}")]
    FileWrite {
        /// Path to the file that failed to write
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Refused to replace an existing output file
    #[error("file already exists: '{path}'")]
    FileExists {
        /// Path of the existing file
        path: PathBuf,
    },

    /// Failed to create output directory
    #[error("failed to create directory '{path}': {source}")]
    DirectoryCreate {
        /// Path to the directory that failed to create
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Path traversal attempt detected (security error)
    #[error("path traversal detected: '{path}' would escape output directory")]
    PathTraversal {
        /// The suspicious path
        path: PathBuf,
    },
}

impl Error {
    /// Creates a new missing-marker error
    pub fn root_type_missing(marker: impl Into<String>) -> Self {
        Self::RootTypeMissing {
            marker: marker.into(),
        }
    }

    /// Creates a new missing union member error
    pub fn union_member_missing(owner: impl Into<String>, member: impl Into<String>) -> Self {
        Self::UnionMemberMissing {
            owner: owner.into(),
            member: member.into(),
        }
    }

    /// Creates a new invalid number error
    pub fn invalid_field_number(name: impl Into<String>, number: i64, min: i64, max: i64) -> Self {
        Self::InvalidFieldNumber {
            name: name.into(),
            number,
            min,
            max,
        }
    }

    /// Creates a new metadata read error
    pub fn metadata_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::MetadataRead {
            path: path.into(),
            source,
        }
    }

    /// Creates a new metadata parse error
    pub fn metadata_parse(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::MetadataParse {
            path: path.into(),
            source,
        }
    }

    /// Creates a new config read error
    pub fn config_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ConfigRead {
            path: path.into(),
            source,
        }
    }

    /// Creates a new file write error
    pub fn file_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileWrite {
            path: path.into(),
            source,
        }
    }

    /// Creates a new directory creation error
    pub fn directory_create(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::DirectoryCreate {
            path: path.into(),
            source,
        }
    }

    /// Creates a new path traversal error
    pub fn path_traversal(path: impl Into<PathBuf>) -> Self {
        Self::PathTraversal { path: path.into() }
    }

    /// Creates a new file exists error
    pub fn file_exists(path: impl Into<PathBuf>) -> Self {
        Self::FileExists { path: path.into() }
    }

    /// Returns true if a driver may skip the offending input and keep going
    ///
    /// A missing marker means nothing can be reconstructed at all, so it is
    /// never recoverable.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::UnionMemberMissing { .. } | Self::InvalidFieldNumber { .. } | Self::FileExists { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::path_traversal("/etc/passwd");
        assert!(err.to_string().contains("path traversal"));
        assert!(err.to_string().contains("/etc/passwd"));

        let err = Error::root_type_missing("Google.Protobuf.IMessage");
        assert!(err.to_string().contains("Google.Protobuf.IMessage"));
    }

    #[test]
    fn test_union_member_display() {
        let err = Error::union_member_missing("PlayerLoginReq", "Token");
        assert_eq!(
            err.to_string(),
            "union member 'Token' of 'PlayerLoginReq' has no backing property"
        );
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::union_member_missing("A", "B").is_recoverable());
        assert!(!Error::root_type_missing("Marker").is_recoverable());
        assert!(Error::file_exists("/out/A.proto").is_recoverable());
        assert!(!Error::path_traversal("/test").is_recoverable());
    }
}
