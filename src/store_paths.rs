//! Purpose: Shared data-directory resolution for the CLI and server.
//! Exports: `default_data_dir`, `settings_path`, `content_path`.
//! Role: Keep CLI and server path semantics aligned from one source.
//! Invariants: Default data directory remains `~/.postgrid` (`POSTGRID_DIR` overrides).

use std::path::{Path, PathBuf};

pub fn default_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("POSTGRID_DIR") {
        return PathBuf::from(dir);
    }
    let home = std::env::var_os("HOME").unwrap_or_default();
    PathBuf::from(home).join(".postgrid")
}

pub fn settings_path(data_dir: &Path) -> PathBuf {
    data_dir.join("settings.json")
}

pub fn content_path(data_dir: &Path) -> PathBuf {
    data_dir.join("content.json")
}
