use std::path::PathBuf;

use directories::ProjectDirs;

/// Directory for the SQLite file and the persisted auth token.
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("ESCOLA_DATA_DIR") {
        return PathBuf::from(dir);
    }
    ProjectDirs::from("pt", "escola", "escola")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("data"))
}
