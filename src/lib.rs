// ~/Sentinel/sentinel-addons/display/src/lib.rs

pub mod backend;
pub mod data_loaders;
pub mod error;
pub mod geometry;
pub mod handles;
pub mod history;
pub mod logging;
pub mod model;
pub mod registry_fallback;
pub mod service;
pub mod utility;
pub mod wallpaper_source;
pub mod watcher;

pub use error::{BackendError, BackendResult, DisplayError, Result};
pub use history::WallpaperHistory;
pub use model::*;
pub use service::MonitorService;
pub use watcher::{MonitorEvent, MonitorWatcher};

pub const ADDON_NAME: &str = "display";
pub const DEBUG_NAME: &str = "DISPLAY";
