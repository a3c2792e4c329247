//! Recoverable findings made while reconstructing.
//!
//! None of these stop a run. Each is logged once at `warn` when recorded
//! and kept so callers can count or report them afterwards.

use std::fmt;
use tracing::warn;

/// One recoverable finding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A type with no scalar mapping; a placeholder name was emitted
    UnknownType {
        /// Full name of the unmapped type
        full_name: String,
    },
    /// A tag-number constant with no sibling property; no field was emitted
    MissingProperty {
        /// Simple name of the owning type
        owner: String,
        /// Property name derived from the constant
        property: String,
        /// The orphaned tag number
        tag: i64,
    },
    /// Two fields of one node share a tag number; both were kept
    DuplicateTag {
        /// Simple name of the owning type
        owner: String,
        /// The shared tag number
        tag: i64,
        /// Property declared first
        first: String,
        /// Property declared second
        second: String,
    },
    /// A union member with no property, dropped because unions are lenient
    MissingUnionMember {
        /// Simple name of the owning type
        owner: String,
        /// Discriminator constant name
        member: String,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnknownType { full_name } => {
                write!(f, "Unknown type \"{}\" found", full_name)
            }
            Diagnostic::MissingProperty {
                owner,
                property,
                tag,
            } => write!(
                f,
                "{}: tag {} has no property '{}', field skipped",
                owner, tag, property
            ),
            Diagnostic::DuplicateTag {
                owner,
                tag,
                first,
                second,
            } => write!(
                f,
                "{}: tag {} used by both '{}' and '{}'",
                owner, tag, first, second
            ),
            Diagnostic::MissingUnionMember { owner, member } => write!(
                f,
                "{}: union member '{}' has no property, entry dropped",
                owner, member
            ),
        }
    }
}

/// Ordered collection of [`Diagnostic`]s
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Creates an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs and records a diagnostic
    pub fn push(&mut self, diagnostic: Diagnostic) {
        warn!("{}", diagnostic);
        self.entries.push(diagnostic);
    }

    /// Recorded diagnostics in order
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Number of recorded diagnostics
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of unknown-type placeholders emitted
    pub fn unknown_type_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|d| matches!(d, Diagnostic::UnknownType { .. }))
            .count()
    }

    /// Moves all entries of `other` to the end of `self` without re-logging
    pub fn append(&mut self, other: &mut Diagnostics) {
        self.entries.append(&mut other.entries);
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
