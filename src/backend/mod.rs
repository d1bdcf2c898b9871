// ~/Sentinel/sentinel-addons/display/src/backend/mod.rs
//
// Capability traits for the two display backends and the registry store.
// The service is generic over these so the fallback policy can be exercised
// without a live desktop.

use crate::{
    error::{BackendResult, Result},
    model::{
        Bounds, Brightness, Color, DisplayDevice, DisplayMode, LogicalMonitor, ModeChange,
        ModeChangeResult, PhysicalMonitor, SlideshowDirection, SlideshowOptions, SlideshowStatus,
        WallpaperPosition,
    },
};

mod memory;

#[cfg(windows)]
mod desktop_wallpaper;
#[cfg(windows)]
mod registry;
#[cfg(windows)]
mod win32;

pub use memory::MemorySettingsStore;

#[cfg(windows)]
pub use desktop_wallpaper::DesktopWallpaperBackend;
#[cfg(windows)]
pub use registry::RegistryStore;
#[cfg(windows)]
pub use win32::Win32DisplayBackend;

/// The platform desktop-wallpaper interface. Every call may fail; failures
/// are reported as [`crate::BackendError`] so the caller can decide whether a
/// fallback exists.
pub trait PrimaryDisplayBackend {
    /// Native ordered collection handed to [`Self::set_slideshow`]. Dropping it
    /// releases the caller's reference.
    type Items;

    fn enable(&self, enable: bool) -> BackendResult<()>;
    fn monitor_path_count(&self) -> BackendResult<u32>;
    fn monitor_path_at(&self, index: u32) -> BackendResult<String>;
    fn wallpaper(&self, device_id: &str) -> BackendResult<String>;
    fn set_wallpaper(&self, device_id: &str, path: &str) -> BackendResult<()>;
    fn monitor_bounds(&self, device_id: &str) -> BackendResult<Bounds>;
    fn background_color(&self) -> BackendResult<Color>;
    fn set_background_color(&self, color: Color) -> BackendResult<()>;
    fn position(&self) -> BackendResult<WallpaperPosition>;
    fn set_position(&self, position: WallpaperPosition) -> BackendResult<()>;
    fn create_item_array(&self, paths: &[String]) -> BackendResult<Self::Items>;
    fn set_slideshow(&self, items: &Self::Items) -> BackendResult<()>;
    fn slideshow(&self) -> BackendResult<Vec<String>>;
    fn slideshow_options(&self) -> BackendResult<SlideshowOptions>;
    fn set_slideshow_options(&self, options: SlideshowOptions) -> BackendResult<()>;
    fn advance_slideshow(&self, device_id: Option<&str>, direction: SlideshowDirection) -> BackendResult<()>;
    fn status(&self) -> BackendResult<SlideshowStatus>;
}

/// Low-level display enumeration, mode changes and DDC/CI brightness.
pub trait NativeDisplayBackend {
    /// Display adapters in enumeration order.
    fn display_devices(&self) -> Result<Vec<DisplayDevice>>;
    fn current_mode(&self, device_name: &str) -> Result<DisplayMode>;
    fn apply_mode(
        &self,
        device_name: &str,
        mode: &DisplayMode,
        change: ModeChange,
        persist: bool,
    ) -> Result<ModeChangeResult>;
    fn logical_monitors(&self) -> Result<Vec<LogicalMonitor>>;
    fn open_physical_monitors(&self, monitor: &LogicalMonitor) -> Result<Vec<PhysicalMonitor>>;
    fn destroy_physical_monitors(&self, monitors: &[PhysicalMonitor]) -> Result<()>;
    fn brightness(&self, monitor: &PhysicalMonitor) -> Result<Brightness>;
    fn set_brightness(&self, monitor: &PhysicalMonitor, value: u32) -> Result<()>;
    /// Desktop-wide wallpaper, used when the per-monitor interface is unavailable.
    fn system_wallpaper(&self) -> Result<String>;
    fn set_system_wallpaper(&self, path: &str) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hive {
    CurrentUser,
    LocalMachine,
}

/// String-valued key/value persistence (the registry on Windows).
pub trait SettingsStore {
    fn read_string(&self, hive: Hive, key: &str, value: &str) -> Result<Option<String>>;
    fn write_string(&self, hive: Hive, key: &str, value: &str, data: &str) -> Result<()>;
}

impl<T: SettingsStore + ?Sized> SettingsStore for &T {
    fn read_string(&self, hive: Hive, key: &str, value: &str) -> Result<Option<String>> {
        (**self).read_string(hive, key, value)
    }

    fn write_string(&self, hive: Hive, key: &str, value: &str, data: &str) -> Result<()> {
        (**self).write_string(hive, key, value, data)
    }
}
