use std::{
    env,
    path::{Path, PathBuf},
};

use crate::ADDON_NAME;

pub const HISTORY_PATH_ENV: &str = "SENTINEL_WALLPAPER_HISTORY";
const HISTORY_FILE_NAME: &str = "wallpaper-history.json";

#[cfg(windows)]
pub fn to_wstring(s: &str) -> Vec<u16> {
    use std::{ffi::OsStr, os::windows::ffi::OsStrExt};

    OsStr::new(s)
        .encode_wide()
        .chain(std::iter::once(0))
        .collect()
}

/// Decodes a fixed-size, possibly null-terminated UTF-16 buffer.
pub fn from_wide(buffer: &[u16]) -> String {
    let len = buffer.iter().position(|&c| c == 0).unwrap_or(buffer.len());
    String::from_utf16_lossy(&buffer[..len])
}

pub fn user_home_dir() -> Option<PathBuf> {
    env::var("USERPROFILE")
        .or_else(|_| env::var("HOME"))
        .map(PathBuf::from)
        .ok()
}

pub fn addon_root_dir() -> Option<PathBuf> {
    let exe_path = env::current_exe().ok()?;
    let exe_dir = exe_path.parent()?;

    if exe_dir.file_name().and_then(|n| n.to_str()) == Some("bin") {
        return exe_dir.parent().map(Path::to_path_buf);
    }

    Some(exe_dir.to_path_buf())
}

pub fn sentinel_root_dir() -> Option<PathBuf> {
    let mut cursor = addon_root_dir()?;
    loop {
        if cursor.file_name().and_then(|n| n.to_str()) == Some(".Sentinel") {
            return Some(cursor);
        }

        if let Some(parent) = cursor.parent() {
            cursor = parent.to_path_buf();
        } else {
            break;
        }
    }

    user_home_dir().map(|p| p.join(".Sentinel"))
}

pub fn sentinel_addons_dir() -> Option<PathBuf> {
    sentinel_root_dir().map(|p| p.join("Addons"))
}

/// Resolution order: environment override, config override, Sentinel data dir,
/// working directory.
pub fn wallpaper_history_path(config_override: Option<&str>) -> PathBuf {
    if let Some(path) = env::var_os(HISTORY_PATH_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(path);
    }

    if let Some(path) = config_override.map(str::trim).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }

    sentinel_root_dir()
        .map(|root| root.join(ADDON_NAME).join(HISTORY_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(HISTORY_FILE_NAME))
}
