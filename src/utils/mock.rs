use tempfile::TempDir;

use crate::storage::env::DbEnv;

/// A database environment living in a temporary directory that is removed,
/// together with every block file in it, when the value is dropped.
pub struct TempEnv {
    // Held only so the directory outlives the environment.
    _dir: TempDir,
    env: DbEnv,
}

impl TempEnv {
    pub fn new() -> Self {
        Self::with_prefix("bambang_test")
    }

    pub fn with_prefix(prefix: &str) -> Self {
        let dir = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir()
            .expect("failed to create temporary directory");
        let env = DbEnv::open(dir.path()).expect("failed to open environment");
        Self { _dir: dir, env }
    }

    pub fn env(&self) -> &DbEnv {
        &self.env
    }

    /// Names of the block files currently present, sorted.
    pub fn files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.env.home())
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .map(|entry| entry.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}

impl Default for TempEnv {
    fn default() -> Self {
        Self::new()
    }
}
