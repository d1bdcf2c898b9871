// ~/Sentinel/sentinel-addons/display/src/history.rs

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use crate::{
    error::{DisplayError, Result},
    utility::wallpaper_history_path,
    warn, DEBUG_NAME,
};

/// Most-recent-first list of wallpapers that were applied, stored as a JSON
/// array of strings. Each call reads and rewrites the file; nothing is cached.
#[derive(Debug, Clone)]
pub struct WallpaperHistory {
    path: PathBuf,
}

impl WallpaperHistory {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Honours the `SENTINEL_WALLPAPER_HISTORY` environment override, then the
    /// configured path, then the Sentinel data directory.
    pub fn from_env(config_override: Option<&str>) -> Self {
        Self::at(wallpaper_history_path(config_override))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> Vec<String> {
        match fs::read_to_string(&self.path) {
            Ok(text) => match serde_json::from_str::<Vec<String>>(&text) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(
                        "[{}][HISTORY] Ignoring unreadable history file {}: {}",
                        DEBUG_NAME,
                        self.path.display(),
                        e
                    );
                    Vec::new()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                warn!(
                    "[{}][HISTORY] Failed to read {}: {}",
                    DEBUG_NAME,
                    self.path.display(),
                    e
                );
                Vec::new()
            }
        }
    }

    /// Moves `entry` to the front, removing any earlier occurrence.
    pub fn add_entry(&self, entry: &str) -> Result<()> {
        let mut entries = self.entries();
        entries.retain(|e| e != entry);
        entries.insert(0, entry.to_string());
        self.save(&entries)
    }

    pub fn remove_entry(&self, entry: &str) -> Result<bool> {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|e| e != entry);
        if entries.len() == before {
            return Ok(false);
        }
        self.save(&entries)?;
        Ok(true)
    }

    pub fn clear(&self) -> Result<()> {
        self.save(&[])
    }

    fn save(&self, entries: &[String]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| DisplayError::History(format!("create {}: {e}", parent.display())))?;
        }

        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| DisplayError::History(format!("serialize: {e}")))?;
        fs::write(&self.path, json)
            .map_err(|e| DisplayError::History(format!("write {}: {e}", self.path.display())))
    }
}
