// ~/Sentinel/sentinel-addons/display/src/service.rs

use std::{io::Read, path::Path, time::Duration};

use crate::{
    backend::{NativeDisplayBackend, PrimaryDisplayBackend, SettingsStore},
    debug, error,
    error::{BackendResult, DisplayError, Result},
    geometry::first_exact_bounds_match,
    handles::PhysicalMonitorSet,
    history::WallpaperHistory,
    info,
    model::{
        Brightness, Color, DisplayDevice, LogicalMonitor, ModeChange, ModeChangeResult,
        MonitorDescriptor, Orientation, SlideshowDirection, SlideshowOptions, SlideshowStatus,
        WallpaperPosition,
    },
    registry_fallback::RegistryFallback,
    wallpaper_source, warn, DEBUG_NAME,
};

const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Monitor, wallpaper and display-mode operations over a primary desktop
/// wallpaper backend with native and registry fallbacks.
///
/// Calls are synchronous. The service holds no locks and is meant to be
/// driven from one thread at a time.
pub struct MonitorService<P, N, S> {
    primary: P,
    native: N,
    registry: RegistryFallback<S>,
    history: WallpaperHistory,
    record_history: bool,
    download_timeout: Duration,
}

impl<P, N, S> MonitorService<P, N, S>
where
    P: PrimaryDisplayBackend,
    N: NativeDisplayBackend,
    S: SettingsStore,
{
    pub fn new(primary: P, native: N, store: S, history: WallpaperHistory) -> Self {
        Self {
            primary,
            native,
            registry: RegistryFallback::new(store),
            history,
            record_history: true,
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
        }
    }

    /// When off, applied wallpapers are no longer added to the history.
    pub fn with_history_recording(mut self, enabled: bool) -> Self {
        self.record_history = enabled;
        self
    }

    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }

    pub fn primary(&self) -> &P {
        &self.primary
    }

    pub fn native(&self) -> &N {
        &self.native
    }

    pub fn settings_store(&self) -> &S {
        self.registry.store()
    }

    pub fn wallpaper_history(&self) -> &WallpaperHistory {
        &self.history
    }

    pub fn enable(&self, enable: bool) -> Result<()> {
        Ok(self.primary.enable(enable)?)
    }

    /* =========================
       ENUMERATION
       ========================= */

    /// Every monitor slot, from the primary backend when the whole call
    /// sequence succeeds and from native enumeration otherwise. Never fails;
    /// an empty list means both paths came up empty.
    pub fn get_monitors(&self) -> Vec<MonitorDescriptor> {
        match self.monitors_from_primary() {
            Ok(monitors) => monitors,
            Err(e) => {
                warn!(
                    "[{}][MONITORS] Primary enumeration failed, using native fallback: {}",
                    DEBUG_NAME, e
                );
                match self.monitors_from_native() {
                    Ok(monitors) => monitors,
                    Err(e) => {
                        error!("[{}][MONITORS] Native enumeration failed: {}", DEBUG_NAME, e);
                        Vec::new()
                    }
                }
            }
        }
    }

    pub fn get_monitors_connected(&self) -> Vec<MonitorDescriptor> {
        self.get_monitors()
            .into_iter()
            .filter(MonitorDescriptor::is_connected)
            .collect()
    }

    pub fn get_monitor(&self, device_id: &str) -> Result<MonitorDescriptor> {
        if device_id.is_empty() {
            return Err(DisplayError::not_found("empty monitor device id"));
        }

        self.get_monitors()
            .into_iter()
            .find(|m| m.device_id == device_id)
            .ok_or_else(|| DisplayError::not_found(format!("monitor '{device_id}'")))
    }

    pub fn get_primary_monitor(&self) -> Option<MonitorDescriptor> {
        self.get_monitors().into_iter().find(MonitorDescriptor::is_primary)
    }

    // Slot i is paired with adapter i. The platform does not promise that the
    // two enumerations share an order; nothing better is available to join on.
    fn monitors_from_primary(&self) -> Result<Vec<MonitorDescriptor>> {
        let count = self.primary.monitor_path_count()?;
        let adapters = self.native.display_devices()?;

        let mut monitors = Vec::with_capacity(count as usize);
        for index in 0..count {
            let device_id = self.primary.monitor_path_at(index)?;
            let position = self.primary.position()?;
            let (wallpaper, bounds) = if device_id.is_empty() {
                (String::new(), Default::default())
            } else {
                (
                    self.primary.wallpaper(&device_id)?,
                    self.primary.monitor_bounds(&device_id)?,
                )
            };

            let adapter = adapters.get(index as usize).cloned().unwrap_or_default();
            monitors.push(MonitorDescriptor {
                index: index as usize,
                device_id,
                device_name: adapter.device_name,
                device_string: adapter.device_string,
                state_flags: adapter.state_flags,
                bounds,
                wallpaper,
                wallpaper_position: position,
            });
        }

        debug!("[{}][MONITORS] Primary backend reported {} slot(s)", DEBUG_NAME, monitors.len());
        Ok(monitors)
    }

    fn monitors_from_native(&self) -> Result<Vec<MonitorDescriptor>> {
        let logical = self.native.logical_monitors()?;
        let adapters = self.native.display_devices()?;

        let wallpaper = self.native.system_wallpaper().unwrap_or_else(|e| {
            warn!("[{}][MONITORS] System wallpaper unavailable: {}", DEBUG_NAME, e);
            String::new()
        });
        let position = self.registry.wallpaper_position().unwrap_or_else(|e| {
            warn!("[{}][MONITORS] Registry wallpaper style unavailable: {}", DEBUG_NAME, e);
            WallpaperPosition::Center
        });

        let monitors = logical
            .into_iter()
            .enumerate()
            .map(|(index, monitor)| {
                let adapter = adapters
                    .iter()
                    .find(|a| a.device_name == monitor.device_name)
                    .cloned()
                    .unwrap_or_else(|| DisplayDevice {
                        device_name: monitor.device_name.clone(),
                        ..Default::default()
                    });

                MonitorDescriptor {
                    index,
                    device_id: adapter.device_id,
                    device_name: adapter.device_name,
                    device_string: adapter.device_string,
                    state_flags: adapter.state_flags,
                    bounds: monitor.bounds,
                    wallpaper: wallpaper.clone(),
                    wallpaper_position: position,
                }
            })
            .collect::<Vec<_>>();

        info!("[{}][MONITORS] Native fallback reported {} monitor(s)", DEBUG_NAME, monitors.len());
        Ok(monitors)
    }

    /* =========================
       MODES
       ========================= */

    /// Moves a monitor so its top-left corner lands on (`left`, `top`).
    ///
    /// The adapter is located by matching the monitor's current bounds against
    /// every attached adapter's mode; see [`first_exact_bounds_match`].
    pub fn set_monitor_position(
        &self,
        device_id: &str,
        left: i32,
        top: i32,
        right: i32,
        bottom: i32,
    ) -> Result<()> {
        let monitor = self.get_monitor(device_id)?;

        let mut candidates = Vec::new();
        for adapter in self.native.display_devices()? {
            if !adapter.state_flags.is_attached() {
                continue;
            }
            let mode = self.native.current_mode(&adapter.device_name)?;
            candidates.push((adapter.device_name, mode));
        }

        let (device_name, mut mode) = first_exact_bounds_match(candidates, &monitor.bounds)
            .ok_or_else(|| {
                DisplayError::not_found(format!(
                    "adapter with bounds {} for monitor '{device_id}'",
                    monitor.bounds
                ))
            })?;

        info!(
            "[{}][MODE] Moving {} ({}) to ({}, {}) requested rect=[{}, {}, {}, {}]",
            DEBUG_NAME, device_id, device_name, left, top, left, top, right, bottom
        );

        mode.x = left;
        mode.y = top;
        let result = self
            .native
            .apply_mode(&device_name, &mode, ModeChange::Position, false)?;
        if result != ModeChangeResult::Successful {
            return Err(DisplayError::Unsupported {
                operation: "SetMonitorPosition",
                code: result.code(),
            });
        }
        Ok(())
    }

    pub fn set_monitor_resolution(&self, device_id: &str, width: u32, height: u32) -> Result<()> {
        let device_name = self.adapter_name_for(device_id)?;
        let mut mode = self.native.current_mode(&device_name)?;
        mode.width = width;
        mode.height = height;

        info!(
            "[{}][MODE] Setting {} ({}) resolution to {}x{}",
            DEBUG_NAME, device_id, device_name, width, height
        );
        let result = self
            .native
            .apply_mode(&device_name, &mode, ModeChange::Resolution, true)?;
        check_persisted_change("SetMonitorResolution", result)
    }

    pub fn set_monitor_orientation(&self, device_id: &str, orientation: Orientation) -> Result<()> {
        let device_name = self.adapter_name_for(device_id)?;
        let mode = self.native.current_mode(&device_name)?.rotated(orientation);

        info!(
            "[{}][MODE] Setting {} ({}) orientation to {} ({}x{})",
            DEBUG_NAME, device_id, device_name, orientation, mode.width, mode.height
        );
        let result = self
            .native
            .apply_mode(&device_name, &mode, ModeChange::Orientation, true)?;
        check_persisted_change("SetMonitorOrientation", result)
    }

    fn adapter_name_for(&self, device_id: &str) -> Result<String> {
        let monitor = self.get_monitor(device_id)?;
        if monitor.device_name.is_empty() {
            return Err(DisplayError::not_found(format!(
                "adapter name for monitor '{device_id}'"
            )));
        }
        Ok(monitor.device_name)
    }

    /* =========================
       BRIGHTNESS
       ========================= */

    pub fn get_monitor_brightness(&self, device_id: &str) -> Result<Brightness> {
        let logical = self.logical_monitor_for(device_id)?;
        let handles = PhysicalMonitorSet::open(&self.native, &logical)?;
        if handles.len() > 1 {
            debug!(
                "[{}][BRIGHTNESS] {} has {} physical monitors; reading the first",
                DEBUG_NAME,
                device_id,
                handles.len()
            );
        }
        self.native.brightness(handles.first()?)
    }

    pub fn set_monitor_brightness(&self, device_id: &str, value: u32) -> Result<()> {
        let logical = self.logical_monitor_for(device_id)?;
        let handles = PhysicalMonitorSet::open(&self.native, &logical)?;
        info!("[{}][BRIGHTNESS] Setting {} brightness to {}", DEBUG_NAME, device_id, value);
        self.native.set_brightness(handles.first()?, value)
    }

    fn logical_monitor_for(&self, device_id: &str) -> Result<LogicalMonitor> {
        let device_name = self.adapter_name_for(device_id)?;
        self.native
            .logical_monitors()?
            .into_iter()
            .find(|m| m.device_name == device_name)
            .ok_or_else(|| {
                DisplayError::not_found(format!("monitor handle for '{device_id}' ({device_name})"))
            })
    }

    /* =========================
       WALLPAPER
       ========================= */

    pub fn get_wallpaper(&self, device_id: &str) -> Result<String> {
        match self.primary.wallpaper(device_id) {
            Ok(path) => Ok(path),
            Err(e) => {
                warn!("[{}][WALLPAPER] {}; reading desktop-wide wallpaper", DEBUG_NAME, e);
                Ok(self.native.system_wallpaper().unwrap_or_else(|e| {
                    warn!("[{}][WALLPAPER] Desktop-wide wallpaper unavailable: {}", DEBUG_NAME, e);
                    String::new()
                }))
            }
        }
    }

    /// Sets the wallpaper of one monitor. If the per-monitor call fails the
    /// image is applied to the whole desktop instead. The path is recorded in
    /// the history whatever the outcome.
    pub fn set_wallpaper(&self, device_id: &str, path: &str) -> Result<()> {
        self.apply_wallpaper(device_id, path, path)
    }

    fn apply_wallpaper(&self, device_id: &str, path: &str, history_entry: &str) -> Result<()> {
        let outcome = match self.primary.set_wallpaper(device_id, path) {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(
                    "[{}][WALLPAPER] {}; applying {} to the whole desktop",
                    DEBUG_NAME, e, path
                );
                self.native.set_system_wallpaper(path)
            }
        };

        if self.record_history {
            if let Err(e) = self.history.add_entry(history_entry) {
                warn!("[{}][HISTORY] {}", DEBUG_NAME, e);
            }
        }
        outcome
    }

    /// Applies an image read from `reader`. The temporary file is gone when
    /// this returns, so its history entry names a file that no longer exists.
    pub fn set_wallpaper_from_reader(&self, device_id: &str, reader: impl Read) -> Result<()> {
        let file = wallpaper_source::materialize(reader)?;
        let path = temp_path(file.path());
        self.apply_wallpaper(device_id, &path, &path)
    }

    /// Downloads and applies an http(s) image. The history records the URL.
    pub fn set_wallpaper_from_url(&self, device_id: &str, url: &str) -> Result<()> {
        let url = wallpaper_source::check_url_scheme(url)?;
        let bytes = wallpaper_source::download(&url, self.download_timeout)?;
        let file = wallpaper_source::materialize_bytes(&bytes)?;
        self.apply_wallpaper(device_id, &temp_path(file.path()), url.as_str())
    }

    pub fn get_wallpaper_position(&self) -> WallpaperPosition {
        match self.primary.position() {
            Ok(position) => position,
            Err(e) => {
                warn!("[{}][WALLPAPER] {}; reading style from registry", DEBUG_NAME, e);
                self.registry.wallpaper_position().unwrap_or_else(|e| {
                    warn!("[{}][REGISTRY] {}", DEBUG_NAME, e);
                    WallpaperPosition::Center
                })
            }
        }
    }

    pub fn set_wallpaper_position(&self, position: WallpaperPosition) -> Result<()> {
        self.with_registry_fallback(
            self.primary.set_position(position),
            || self.registry.set_wallpaper_position(position),
        )
    }

    pub fn get_background_color(&self) -> Color {
        match self.primary.background_color() {
            Ok(color) => color,
            Err(e) => {
                warn!("[{}][WALLPAPER] {}; reading color from registry", DEBUG_NAME, e);
                self.registry.background_color().unwrap_or_else(|e| {
                    warn!("[{}][REGISTRY] {}", DEBUG_NAME, e);
                    Color::default()
                })
            }
        }
    }

    pub fn set_background_color(&self, color: Color) -> Result<()> {
        self.with_registry_fallback(
            self.primary.set_background_color(color),
            || self.registry.set_background_color(color),
        )
    }

    /// The lock-screen image only exists as a machine policy value.
    pub fn get_logon_wallpaper(&self) -> Option<String> {
        self.registry.logon_wallpaper().unwrap_or_else(|e| {
            warn!("[{}][REGISTRY] {}", DEBUG_NAME, e);
            None
        })
    }

    pub fn set_logon_wallpaper(&self, path: &str) -> Result<()> {
        self.registry.set_logon_wallpaper(path)
    }

    fn with_registry_fallback(
        &self,
        primary: BackendResult<()>,
        fallback: impl FnOnce() -> Result<()>,
    ) -> Result<()> {
        match primary {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!("[{}][WALLPAPER] {}; writing registry instead", DEBUG_NAME, e);
                fallback()
            }
        }
    }

    /* =========================
       SLIDESHOW
       ========================= */

    /// Starts a slideshow over `paths`. Blank entries are skipped; the rest
    /// are handed over exactly as given.
    pub fn start_wallpaper_slideshow<I, T>(&self, paths: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let paths: Vec<String> = paths
            .into_iter()
            .filter(|p| !p.as_ref().trim().is_empty())
            .map(|p| p.as_ref().to_string())
            .collect();

        info!("[{}][SLIDESHOW] Starting slideshow with {} image(s)", DEBUG_NAME, paths.len());

        let items = self.primary.create_item_array(&paths)?;
        let outcome = self.primary.set_slideshow(&items);
        drop(items);

        Ok(outcome?)
    }

    pub fn get_wallpaper_slideshow(&self) -> Result<Vec<String>> {
        Ok(self.primary.slideshow()?)
    }

    pub fn get_slideshow_options(&self) -> Result<SlideshowOptions> {
        Ok(self.primary.slideshow_options()?)
    }

    pub fn set_slideshow_options(&self, options: SlideshowOptions) -> Result<()> {
        Ok(self.primary.set_slideshow_options(options)?)
    }

    pub fn advance_slideshow(&self, device_id: Option<&str>, direction: SlideshowDirection) -> Result<()> {
        Ok(self.primary.advance_slideshow(device_id, direction)?)
    }

    pub fn slideshow_status(&self) -> Result<SlideshowStatus> {
        Ok(self.primary.status()?)
    }
}

fn temp_path(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn check_persisted_change(operation: &'static str, result: ModeChangeResult) -> Result<()> {
    match result {
        ModeChangeResult::Successful => Ok(()),
        ModeChangeResult::RestartRequired => {
            warn!("[{}][MODE] {} takes effect after a restart", DEBUG_NAME, operation);
            Ok(())
        }
        other => Err(DisplayError::Unsupported {
            operation,
            code: other.code(),
        }),
    }
}

#[cfg(windows)]
mod system {
    use super::*;
    use crate::backend::{DesktopWallpaperBackend, RegistryStore, Win32DisplayBackend};

    pub type SystemMonitorService =
        MonitorService<DesktopWallpaperBackend, Win32DisplayBackend, RegistryStore>;

    impl SystemMonitorService {
        /// Service over the live desktop. A missing desktop wallpaper interface
        /// is not an error; every call then takes its fallback path.
        pub fn system(history: WallpaperHistory) -> Self {
            MonitorService::new(
                DesktopWallpaperBackend::connect(),
                Win32DisplayBackend::new(),
                RegistryStore::new(),
                history,
            )
        }
    }
}

#[cfg(windows)]
pub use system::SystemMonitorService;
