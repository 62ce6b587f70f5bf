//! Local persistence for the anonymous identity. The app never asks who the
//! user is; it mints a random user id once and keeps it in a small TOML file
//! next to the database so every later run writes to the same library.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::db;
use crate::models::Identity;

/// File name of the identity record inside the application data directory.
const IDENTITY_FILE_NAME: &str = "identity.toml";

/// Resolve the absolute path of the identity file.
pub fn identity_path() -> Result<PathBuf> {
    Ok(db::data_dir()?.join(IDENTITY_FILE_NAME))
}

/// Load the identity persisted by a previous run, or `None` on a fresh
/// installation. A file that exists but does not parse is an error rather than
/// `None`: silently minting a second user would orphan everything the first
/// one owns.
pub fn load_identity() -> Result<Option<Identity>> {
    read_identity(&identity_path()?)
}

/// Persist the identity next to the database so later runs pick up the same
/// user id.
pub fn save_identity(identity: &Identity) -> Result<()> {
    write_identity(&identity_path()?, identity)
}

fn read_identity(path: &Path) -> Result<Option<Identity>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read identity file at {}", path.display()))?;
    let identity = toml::from_str(&content)
        .with_context(|| format!("failed to parse identity file at {}", path.display()))?;
    debug!(path = %path.display(), "loaded identity");
    Ok(Some(identity))
}

fn write_identity(path: &Path, identity: &Identity) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create data directory")?;
    }

    let content = toml::to_string_pretty(identity).context("failed to serialize identity")?;
    fs::write(path, content)
        .with_context(|| format!("failed to write identity file at {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_identity_round_trips_through_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("identity.toml");
        let identity = Identity {
            user_id: "user-1".to_string(),
            reference: "ref-1".to_string(),
        };

        write_identity(&path, &identity).unwrap();

        let loaded = read_identity(&path).unwrap().unwrap();
        assert_eq!(loaded.user_id, "user-1");
        assert_eq!(loaded.reference, "ref-1");
    }

    #[test]
    fn test_missing_identity_file_reads_as_none() {
        let dir = tempdir().unwrap();

        let loaded = read_identity(&dir.path().join("identity.toml")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_corrupt_identity_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("identity.toml");
        fs::write(&path, "user_id = unquoted nonsense").unwrap();

        assert!(read_identity(&path).is_err());
    }

    #[test]
    fn test_write_identity_creates_missing_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("identity.toml");
        let identity = Identity {
            user_id: "u".to_string(),
            reference: "r".to_string(),
        };

        write_identity(&path, &identity).unwrap();

        assert!(read_identity(&path).unwrap().is_some());
    }
}
