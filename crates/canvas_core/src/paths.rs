use std::path::{Path, PathBuf};

/// Base directory for canvas data (~/.branchcanvas)
pub fn canvas_dir() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir)
        .join(".branchcanvas")
}

/// config.json path
pub fn config_json_path() -> PathBuf {
    canvas_dir().join("config.json")
}

/// Working graph document inside a data directory
pub fn graph_path(data_dir: &Path) -> PathBuf {
    data_dir.join("graph.json")
}

/// Content-addressed blobs inside a data directory
pub fn content_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("content")
}

/// Project registry records inside a data directory
pub fn projects_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("projects")
}

/// Make sure a data directory exists
pub fn ensure_dir(dir: &Path) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    Ok(dir.to_path_buf())
}
