//! Writing rendered output to disk.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};
use tracing::trace;

use crate::error::{Error, Result};

/// Join `file_name` onto `dir`, refusing anything but a plain file name
///
/// Type names come from untrusted metadata, so a name like `../../x` must
/// not escape the output directory.
pub fn output_path(dir: &Path, file_name: &str) -> Result<PathBuf> {
    let candidate = Path::new(file_name);
    let mut components = candidate.components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(dir.join(candidate)),
        _ => Err(Error::path_traversal(candidate)),
    }
}

/// Write `contents` to `path`, creating parent directories
///
/// An existing file is only replaced when `overwrite` is set.
pub fn write_output(path: &Path, contents: &[u8], overwrite: bool) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::directory_create(parent, e))?;
    }

    trace!("Writing {} bytes to {}", contents.len(), path.display());
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(!overwrite)
        .create(overwrite)
        .truncate(overwrite)
        .open(path)
        .map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => Error::file_exists(path),
            _ => Error::file_write(path, e),
        })?;
    file.write_all(contents)
        .map_err(|e| Error::file_write(path, e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_output_path_accepts_plain_names() {
        let dir = Path::new("/out");
        assert_eq!(
            output_path(dir, "PingReq.proto").unwrap(),
            PathBuf::from("/out/PingReq.proto")
        );
    }

    #[test]
    fn test_output_path_rejects_traversal() {
        let dir = Path::new("/out");
        for name in ["../escape.proto", "/etc/passwd", "a/b.proto", "..", ""] {
            let err = output_path(dir, name).unwrap_err();
            assert!(matches!(err, Error::PathTraversal { .. }), "{name}");
        }
    }

    #[test]
    fn test_write_output_respects_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("PingReq.proto");

        write_output(&path, b"first", false).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "first");

        let err = write_output(&path, b"second", false).unwrap_err();
        assert!(matches!(err, Error::FileExists { .. }));

        write_output(&path, b"second", true).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
    }

    #[test]
    fn test_overwrite_truncates_longer_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("Long.proto");

        write_output(&path, b"a much longer first version", false).unwrap();
        write_output(&path, b"short", true).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "short");
    }

    #[test]
    fn test_existing_file_left_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("Kept.proto");
        fs::write(&path, "original").unwrap();

        let err = write_output(&path, b"replacement", false).unwrap_err();
        assert!(matches!(err, Error::FileExists { .. }));
        assert!(err.is_recoverable());
        assert_eq!(fs::read_to_string(&path).unwrap(), "original");
    }
}
