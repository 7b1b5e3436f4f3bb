//! Storage layout configuration

use std::path::PathBuf;

use crate::filesys::dir::Dir;
use crate::filesys::file::File;

/// Files kept under the data directory
#[derive(Debug, Clone)]
pub struct StorageLayout {
    /// Base directory for all storage
    pub base_dir: PathBuf,
}

impl StorageLayout {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn data_dir(&self) -> Dir {
        Dir::new(self.base_dir.clone())
    }

    /// Job history
    pub fn jobs_file(&self) -> File {
        File::new(self.base_dir.join("jobs.json"))
    }

    /// Saved profiles, credentials sealed
    pub fn profiles_file(&self) -> File {
        File::new(self.base_dir.join("profiles.json"))
    }

    /// Image tag ledger
    pub fn tags_file(&self) -> File {
        File::new(self.base_dir.join("tags.json"))
    }
}

impl Default for StorageLayout {
    fn default() -> Self {
        Self::new("/var/lib/dockhand")
    }
}
