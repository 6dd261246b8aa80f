use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::types::error::DatabaseError;

const FILE_EXTENSION: &str = "db";

/// The database environment: a home directory holding one file per block
/// sequence (every relation and every index).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbEnv {
    home: PathBuf,
}

impl DbEnv {
    /// Open the environment rooted at `home`, creating the directory if
    /// needed.
    pub fn open<P: AsRef<Path>>(home: P) -> Result<Self, DatabaseError> {
        let home = home.as_ref();
        if !home.exists() {
            debug!(home = %home.display(), "creating database environment");
            fs::create_dir_all(home)?;
        } else if !home.is_dir() {
            return Err(DatabaseError::relation(format!(
                "database environment {} is not a directory",
                home.display()
            )));
        }
        Ok(Self {
            home: home.to_path_buf(),
        })
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Path of the file backing the block sequence called `name`.
    pub fn file_path(&self, name: &str) -> PathBuf {
        self.home.join(format!("{}.{}", name, FILE_EXTENSION))
    }

    pub fn file_exists(&self, name: &str) -> bool {
        self.file_path(name).exists()
    }
}
