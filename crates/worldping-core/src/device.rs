// Device identity for anonymous, login-free posting.
// Format: "wp-<uuid>"

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::storage::data_dir;

const DEVICE_ID_FILE: &str = "device_id.txt";
const DEVICE_ID_PREFIX: &str = "wp-";

/// Error type for device ID operations
#[derive(Debug, thiserror::Error)]
pub enum DeviceIdError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid device ID format: {0}")]
    InvalidFormat(String),
}

/// Opaque, stable identifier for one installation.
///
/// Created once on first run and never rotated. Both the visibility gate
/// and the streak engine key their state by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Wrap an existing identifier without validation.
    ///
    /// Messages fetched from the content store carry author ids from other
    /// installations, which need not follow the local prefix.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh identifier.
    pub fn generate() -> Self {
        Self(format!("{}{}", DEVICE_ID_PREFIX, Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Get or create device ID at the specified path.
/// Creates a new device ID file if it doesn't exist.
///
/// # Arguments
/// * `path` - Directory path where device_id.txt is stored
///
/// # Errors
/// A file with a foreign format is reported, not replaced: replacing it
/// would rotate the identity and orphan all local state.
pub fn get_or_create_device_id_at(path: &Path) -> Result<DeviceId, DeviceIdError> {
    let device_id_path = path.join(DEVICE_ID_FILE);

    if device_id_path.exists() {
        let content = fs::read_to_string(&device_id_path)?;
        let device_id = content.trim().to_string();

        if device_id.starts_with(DEVICE_ID_PREFIX) && device_id.len() > DEVICE_ID_PREFIX.len() {
            return Ok(DeviceId(device_id));
        }
        return Err(DeviceIdError::InvalidFormat(device_id));
    }

    let device_id = DeviceId::generate();

    if !path.exists() {
        fs::create_dir_all(path)?;
    }

    let mut file = fs::File::create(&device_id_path)?;
    writeln!(file, "{}", device_id)?;
    tracing::info!(device = %device_id, "created device identity");

    Ok(device_id)
}

/// Get or create device ID in the default data directory.
pub fn get_or_create_device_id() -> Result<DeviceId, DeviceIdError> {
    let dir = data_dir().map_err(|e| {
        DeviceIdError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Could not determine data directory: {e}"),
        ))
    })?;

    get_or_create_device_id_at(&dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_device_id_format() {
        let temp_dir = TempDir::new().unwrap();
        let device_id = get_or_create_device_id_at(temp_dir.path()).unwrap();

        assert!(device_id.as_str().starts_with(DEVICE_ID_PREFIX));
        assert_eq!(device_id.as_str().len(), DEVICE_ID_PREFIX.len() + 36);
    }

    #[test]
    fn test_device_id_persistence() {
        let temp_dir = TempDir::new().unwrap();

        let first = get_or_create_device_id_at(temp_dir.path()).unwrap();
        let second = get_or_create_device_id_at(temp_dir.path()).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_device_id_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let nested_path = temp_dir.path().join("nested/path");

        assert!(!nested_path.exists());
        get_or_create_device_id_at(&nested_path).unwrap();
        assert!(nested_path.join(DEVICE_ID_FILE).exists());
    }

    #[test]
    fn test_device_id_invalid_format_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let mut file = fs::File::create(temp_dir.path().join(DEVICE_ID_FILE)).unwrap();
        writeln!(file, "legacy-123").unwrap();

        let result = get_or_create_device_id_at(temp_dir.path());
        assert!(matches!(result, Err(DeviceIdError::InvalidFormat(_))));

        // The bad file is left alone.
        let content = fs::read_to_string(temp_dir.path().join(DEVICE_ID_FILE)).unwrap();
        assert_eq!(content.trim(), "legacy-123");
    }

    #[test]
    fn test_device_id_existing_accepted() {
        let temp_dir = TempDir::new().unwrap();
        let mut file = fs::File::create(temp_dir.path().join(DEVICE_ID_FILE)).unwrap();
        writeln!(file, "wp-123e4567-e89b-12d3-a456-426614174000").unwrap();

        let device_id = get_or_create_device_id_at(temp_dir.path()).unwrap();
        assert_eq!(device_id.as_str(), "wp-123e4567-e89b-12d3-a456-426614174000");
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(DeviceId::generate(), DeviceId::generate());
    }
}
