//! File-backed JSON documents, replaced atomically on every write.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::error::StoreError;

pub mod compendium;
pub mod entities;
pub mod settings;

pub use compendium::CompendiumStore;
pub use entities::{EntityFile, EntityStore};
pub use settings::SettingsStore;

pub const COMPENDIUM_FILE: &str = "compendium.json";
pub const ENTITIES_FILE: &str = "entities.json";
pub const SETTINGS_FILE: &str = "settings.json";

/// One JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound { path: self.path.clone() });
            }
            Err(source) => {
                return Err(StoreError::Io { path: self.path.clone(), source });
            }
        };
        serde_json::from_str(&text).map_err(|source| {
            error!(
                path = %self.path.display(),
                %source,
                "store file is corrupt; treating it as missing and leaving it untouched"
            );
            StoreError::Corrupt { path: self.path.clone(), source }
        })
    }

    /// True when a file exists but does not load as a `T`, by the same test `read` uses.
    pub fn is_corrupt<T: DeserializeOwned>(&self) -> bool {
        match fs::read_to_string(&self.path) {
            Ok(text) => serde_json::from_str::<T>(&text).is_err(),
            Err(_) => false,
        }
    }

    /// Write `value` to `<file>.tmp` and rename it over the original.
    ///
    /// An original that does not load as a `T` is never overwritten unless
    /// `force` is set, in which case it is first moved aside to `<file>.corrupt`.
    pub fn write<T: Serialize + DeserializeOwned>(&self, value: &T, force: bool) -> Result<(), StoreError> {
        if self.is_corrupt::<T>() {
            if !force {
                return Err(StoreError::WouldOverwriteCorrupt { path: self.path.clone() });
            }
            let aside = self.path.with_extension("corrupt");
            warn!(from = %self.path.display(), to = %aside.display(), "moving corrupt file aside");
            fs::rename(&self.path, &aside).map_err(|source| StoreError::Io {
                path: aside.clone(),
                source,
            })?;
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let content = serde_json::to_string_pretty(value).map_err(|source| StoreError::Serialize {
            path: self.path.clone(),
            source,
        })?;

        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, content).map_err(|source| StoreError::Io {
            path: temp_path.clone(),
            source,
        })?;
        if let Err(source) = fs::rename(&temp_path, &self.path) {
            let _ = fs::remove_file(&temp_path);
            return Err(StoreError::Io { path: self.path.clone(), source });
        }
        debug!(path = %self.path.display(), "written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonFile::new(dir.path().join("nope.json"));
        let err = file.read::<BTreeMap<String, i32>>().unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn write_creates_parent_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonFile::new(dir.path().join("nested/data.json"));
        let value = BTreeMap::from([("a".to_string(), 1)]);
        file.write(&value, false).unwrap();
        assert_eq!(file.read::<BTreeMap<String, i32>>().unwrap(), value);
        assert!(!dir.path().join("nested/data.tmp").exists());
    }

    #[test]
    fn corrupt_file_is_refused_then_moved_aside_when_forced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        fs::write(&path, "{ not json").unwrap();
        let file = JsonFile::new(&path);

        let err = file.read::<BTreeMap<String, i32>>().unwrap_err();
        assert!(err.is_not_found());

        let value = BTreeMap::from([("a".to_string(), 1)]);
        assert!(matches!(
            file.write(&value, false),
            Err(StoreError::WouldOverwriteCorrupt { .. })
        ));
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");

        file.write(&value, true).unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("data.corrupt")).unwrap(), "{ not json");
        assert_eq!(file.read::<BTreeMap<String, i32>>().unwrap(), value);
    }

    #[test]
    fn valid_json_of_the_wrong_shape_is_refused_too() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        fs::write(&path, r#"{"a": "one"}"#).unwrap();
        let file = JsonFile::new(&path);

        assert!(file.read::<BTreeMap<String, i32>>().is_err());
        assert!(file.is_corrupt::<BTreeMap<String, i32>>());
        let value = BTreeMap::from([("b".to_string(), 2)]);
        assert!(matches!(
            file.write(&value, false),
            Err(StoreError::WouldOverwriteCorrupt { .. })
        ));
        assert_eq!(fs::read_to_string(&path).unwrap(), r#"{"a": "one"}"#);
    }
}
