//! Marker type discovery and the reconstruction driver.
//!
//! Generated message classes usually live in the main game module, but the
//! protobuf runtime (and with it the marker base type) is often compiled
//! into a separate first-pass module. Discovery looks in the primary
//! module first and falls back to the first-pass module when one is given.

use tracing::{debug, info, warn};

use crate::config::ReconstructorConfig;
use crate::error::{Error, Result};
use crate::metadata::Module;
use crate::reconstruct::{Reconstruction, SchemaReconstructor};

/// Where the marker type was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerLocation {
    /// In the primary module
    Primary,
    /// In the first-pass fallback module
    Fallback,
}

/// Locate the marker type `marker` (a full name)
///
/// Fails with [`Error::RootTypeMissing`] when neither module declares it.
pub fn locate_marker(
    primary: &Module,
    fallback: Option<&Module>,
    marker: &str,
) -> Result<MarkerLocation> {
    if primary.find_type(marker).is_some() {
        debug!("Marker type {} found in '{}'", marker, primary.name);
        return Ok(MarkerLocation::Primary);
    }

    warn!(
        "Could not find marker type {} in '{}', trying first-pass module",
        marker, primary.name
    );

    let Some(fallback) = fallback else {
        warn!("No first-pass module specified");
        return Err(Error::root_type_missing(marker));
    };

    if fallback.find_type(marker).is_some() {
        info!("Marker type {} found in first-pass module '{}'", marker, fallback.name);
        Ok(MarkerLocation::Fallback)
    } else {
        Err(Error::root_type_missing(marker))
    }
}

/// Discovery followed by reconstruction
#[derive(Debug, Clone, Default)]
pub struct ProtoDumper {
    reconstructor: SchemaReconstructor,
}

impl ProtoDumper {
    /// Creates a dumper that owns `config`
    pub fn new(config: ReconstructorConfig) -> Self {
        Self {
            reconstructor: SchemaReconstructor::new(config),
        }
    }

    /// The underlying reconstructor
    pub fn reconstructor(&self) -> &SchemaReconstructor {
        &self.reconstructor
    }

    /// Locate the marker, then reconstruct the schema types of `primary`
    ///
    /// Schema types are always taken from the primary module; the fallback
    /// only serves to prove the marker exists.
    pub fn run(&self, primary: &Module, fallback: Option<&Module>) -> Result<Reconstruction> {
        let marker = &self.reconstructor.config().marker_type;
        locate_marker(primary, fallback, marker)?;
        self.reconstructor.reconstruct_module(primary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{TypeDef, TypeRef};

    const MARKER: &str = "Google.Protobuf.IMessage";

    fn runtime() -> Module {
        Module::new("Assembly-CSharp-firstpass")
            .with_type(TypeDef::class("Google.Protobuf", "IMessage"))
    }

    fn game() -> Module {
        Module::new("Assembly-CSharp").with_type(
            TypeDef::class("Proto", "PingReq")
                .with_constant("SeqFieldNumber", 1)
                .with_property("Seq", TypeRef::new("System", "UInt32")),
        )
    }

    #[test]
    fn test_marker_in_primary() {
        let primary = runtime();
        assert_eq!(locate_marker(&primary, None, MARKER).unwrap(), MarkerLocation::Primary);
    }

    #[test]
    fn test_marker_in_fallback() {
        let fallback = runtime();
        assert_eq!(
            locate_marker(&game(), Some(&fallback), MARKER).unwrap(),
            MarkerLocation::Fallback
        );
    }

    #[test]
    fn test_marker_missing_everywhere() {
        let err = locate_marker(&game(), None, MARKER).unwrap_err();
        assert!(matches!(err, Error::RootTypeMissing { ref marker } if marker == MARKER));

        let other = Module::new("Unrelated");
        assert!(locate_marker(&game(), Some(&other), MARKER).is_err());
    }

    #[test]
    fn test_dumper_reconstructs_primary_only() {
        let fallback = runtime().with_type(TypeDef::class("Proto", "FromFirstpass"));
        let result = ProtoDumper::default().run(&game(), Some(&fallback)).unwrap();

        let names: Vec<_> = result.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["PingReq"]);
    }

    #[test]
    fn test_dumper_stops_without_marker() {
        let err = ProtoDumper::default().run(&game(), None).unwrap_err();
        assert!(!err.is_recoverable());
    }
}
