use directories::ProjectDirs;
use std::path::PathBuf;

/// Configuration for findex project directories
pub struct FindexDirs {
    project_dirs: Option<ProjectDirs>,
}

impl FindexDirs {
    /// Create a new FindexDirs instance
    pub fn new() -> Self {
        let project_dirs = ProjectDirs::from("com", "findex", "findex");
        Self { project_dirs }
    }

    /// Get the default directory holding the index database
    pub fn default_db_dir(&self) -> PathBuf {
        match &self.project_dirs {
            Some(dirs) => dirs.data_dir().to_path_buf(),
            None => {
                // Fallback to current directory if ProjectDirs fails
                std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
            }
        }
    }

    /// Get the default index database file path
    pub fn default_db_path(&self) -> PathBuf {
        self.default_db_dir().join("index.db")
    }

    /// Ensure the database directory exists
    pub fn ensure_db_dir(&self) -> std::io::Result<PathBuf> {
        let db_dir = self.default_db_dir();
        std::fs::create_dir_all(&db_dir)?;
        Ok(db_dir)
    }
}

impl Default for FindexDirs {
    fn default() -> Self {
        Self::new()
    }
}
