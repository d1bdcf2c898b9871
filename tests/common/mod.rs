// In-memory display backends for integration tests.

#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    ops::Deref,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, Weak,
    },
};

use sentinel_display::{
    backend::{MemorySettingsStore, NativeDisplayBackend, PrimaryDisplayBackend},
    error::{BackendError, BackendResult, DisplayError, Result},
    model::{
        Bounds, Brightness, Color, DisplayDevice, DisplayMode, LogicalMonitor, ModeChange,
        ModeChangeResult, Orientation, PhysicalMonitor, SlideshowDirection, SlideshowOptions,
        SlideshowStatus, StateFlags, WallpaperPosition,
    },
    MonitorService, WallpaperHistory,
};
use tempfile::TempDir;

pub const ID_A: &str = "\\\\?\\DISPLAY#A#{e6f07b5f-ee97-4a90-b076-33f57bf4eaa7}";
pub const ID_B: &str = "\\\\?\\DISPLAY#B#{e6f07b5f-ee97-4a90-b076-33f57bf4eaa7}";

pub const ADAPTER_1: &str = "\\\\.\\DISPLAY1";
pub const ADAPTER_2: &str = "\\\\.\\DISPLAY2";
pub const ADAPTER_3: &str = "\\\\.\\DISPLAY3";

pub const HMONITOR_1: isize = 0x101;
pub const HMONITOR_3: isize = 0x103;
pub const PHYSICAL_1: isize = 0x9001;

/* =========================
   PRIMARY
   ========================= */

#[derive(Debug, Default)]
pub struct PrimaryState {
    pub paths: Vec<String>,
    pub wallpapers: HashMap<String, String>,
    pub bounds: HashMap<String, Bounds>,
    pub color: Color,
    pub position: WallpaperPosition,
    pub slideshow: Vec<String>,
    pub options: SlideshowOptions,
    pub status: SlideshowStatus,
    pub enabled: bool,
    pub set_wallpaper_calls: Vec<(String, String)>,
    pub advanced: Vec<(Option<String>, SlideshowDirection)>,
}

/// Desktop wallpaper fake. `failing` makes every call fail; `fail_set_slideshow`
/// fails only the slideshow hand-off.
#[derive(Default)]
pub struct FakePrimary {
    pub state: Mutex<PrimaryState>,
    pub failing: AtomicBool,
    pub fail_set_slideshow: AtomicBool,
    pub last_items: Mutex<Weak<Vec<String>>>,
}

impl FakePrimary {
    pub fn with_paths(paths: &[&str]) -> Self {
        let primary = Self::default();
        {
            let mut state = primary.state.lock().unwrap();
            state.paths = paths.iter().map(|p| p.to_string()).collect();
            state.bounds.insert(ID_A.into(), Bounds::new(0, 0, 1920, 1080));
            state.bounds.insert(ID_B.into(), Bounds::new(1920, 0, 4480, 1440));
            state.wallpapers.insert(ID_A.into(), "C:\\wall\\a.jpg".into());
            state.wallpapers.insert(ID_B.into(), "C:\\wall\\b.jpg".into());
        }
        primary
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self, operation: &'static str) -> BackendResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(BackendError::new(operation, "0x80004005"));
        }
        Ok(())
    }

    pub fn items_alive(&self) -> bool {
        self.last_items.lock().unwrap().upgrade().is_some()
    }
}

impl PrimaryDisplayBackend for FakePrimary {
    type Items = Arc<Vec<String>>;

    fn enable(&self, enable: bool) -> BackendResult<()> {
        self.check("Enable")?;
        self.state.lock().unwrap().enabled = enable;
        Ok(())
    }

    fn monitor_path_count(&self) -> BackendResult<u32> {
        self.check("GetMonitorDevicePathCount")?;
        Ok(self.state.lock().unwrap().paths.len() as u32)
    }

    fn monitor_path_at(&self, index: u32) -> BackendResult<String> {
        self.check("GetMonitorDevicePathAt")?;
        self.state
            .lock()
            .unwrap()
            .paths
            .get(index as usize)
            .cloned()
            .ok_or_else(|| BackendError::new("GetMonitorDevicePathAt", "index out of range"))
    }

    fn wallpaper(&self, device_id: &str) -> BackendResult<String> {
        self.check("GetWallpaper")?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .wallpapers
            .get(device_id)
            .cloned()
            .unwrap_or_default())
    }

    fn set_wallpaper(&self, device_id: &str, path: &str) -> BackendResult<()> {
        let mut state = self.state.lock().unwrap();
        state
            .set_wallpaper_calls
            .push((device_id.to_string(), path.to_string()));
        drop(state);

        self.check("SetWallpaper")?;
        self.state
            .lock()
            .unwrap()
            .wallpapers
            .insert(device_id.to_string(), path.to_string());
        Ok(())
    }

    fn monitor_bounds(&self, device_id: &str) -> BackendResult<Bounds> {
        self.check("GetMonitorRECT")?;
        self.state
            .lock()
            .unwrap()
            .bounds
            .get(device_id)
            .copied()
            .ok_or_else(|| BackendError::new("GetMonitorRECT", "unknown monitor"))
    }

    fn background_color(&self) -> BackendResult<Color> {
        self.check("GetBackgroundColor")?;
        Ok(self.state.lock().unwrap().color)
    }

    fn set_background_color(&self, color: Color) -> BackendResult<()> {
        self.check("SetBackgroundColor")?;
        self.state.lock().unwrap().color = color;
        Ok(())
    }

    fn position(&self) -> BackendResult<WallpaperPosition> {
        self.check("GetPosition")?;
        Ok(self.state.lock().unwrap().position)
    }

    fn set_position(&self, position: WallpaperPosition) -> BackendResult<()> {
        self.check("SetPosition")?;
        self.state.lock().unwrap().position = position;
        Ok(())
    }

    fn create_item_array(&self, paths: &[String]) -> BackendResult<Self::Items> {
        self.check("SHCreateShellItemArrayFromIDLists")?;
        let items = Arc::new(paths.to_vec());
        *self.last_items.lock().unwrap() = Arc::downgrade(&items);
        Ok(items)
    }

    fn set_slideshow(&self, items: &Self::Items) -> BackendResult<()> {
        self.check("SetSlideshow")?;
        if self.fail_set_slideshow.load(Ordering::SeqCst) {
            return Err(BackendError::new("SetSlideshow", "0x80070057"));
        }
        self.state.lock().unwrap().slideshow = items.as_ref().clone();
        Ok(())
    }

    fn slideshow(&self) -> BackendResult<Vec<String>> {
        self.check("GetSlideshow")?;
        Ok(self.state.lock().unwrap().slideshow.clone())
    }

    fn slideshow_options(&self) -> BackendResult<SlideshowOptions> {
        self.check("GetSlideshowOptions")?;
        Ok(self.state.lock().unwrap().options)
    }

    fn set_slideshow_options(&self, options: SlideshowOptions) -> BackendResult<()> {
        self.check("SetSlideshowOptions")?;
        self.state.lock().unwrap().options = options;
        Ok(())
    }

    fn advance_slideshow(
        &self,
        device_id: Option<&str>,
        direction: SlideshowDirection,
    ) -> BackendResult<()> {
        self.check("AdvanceSlideshow")?;
        self.state
            .lock()
            .unwrap()
            .advanced
            .push((device_id.map(str::to_string), direction));
        Ok(())
    }

    fn status(&self) -> BackendResult<SlideshowStatus> {
        self.check("GetStatus")?;
        Ok(self.state.lock().unwrap().status)
    }
}

/* =========================
   NATIVE
   ========================= */

pub struct NativeState {
    pub adapters: Mutex<Vec<DisplayDevice>>,
    pub modes: Mutex<HashMap<String, DisplayMode>>,
    pub logical: Mutex<Vec<LogicalMonitor>>,
    pub physical: Mutex<HashMap<isize, Vec<PhysicalMonitor>>>,
    pub open_handles: Mutex<HashSet<isize>>,
    pub brightness: Mutex<HashMap<isize, Brightness>>,
    pub applied: Mutex<Vec<(String, DisplayMode, ModeChange, bool)>>,
    pub apply_result: Mutex<ModeChangeResult>,
    pub system_wallpaper: Mutex<String>,
    pub system_wallpaper_calls: Mutex<Vec<String>>,
    pub fail_system_wallpaper: AtomicBool,
    pub fail_enumeration: AtomicBool,
}

/// Native display fake. Clones share state, so a clone can be handed to a
/// snapshot source while the test keeps editing modes.
#[derive(Clone)]
pub struct FakeNative(Arc<NativeState>);

impl Deref for FakeNative {
    type Target = NativeState;

    fn deref(&self) -> &NativeState {
        &self.0
    }
}

fn adapter(name: &str, string: &str, flags: u32, id: &str) -> DisplayDevice {
    DisplayDevice {
        device_name: name.to_string(),
        device_string: string.to_string(),
        state_flags: StateFlags(flags),
        device_id: id.to_string(),
    }
}

pub fn mode(x: i32, y: i32, width: u32, height: u32) -> DisplayMode {
    DisplayMode {
        x,
        y,
        width,
        height,
        orientation: Orientation::Landscape,
        bits_per_pixel: 32,
        frequency: 60,
    }
}

impl FakeNative {
    /// Adapters 1 and 3 drive monitors A and B; adapter 2 is detached.
    pub fn desktop() -> Self {
        let attached = StateFlags::ATTACHED_TO_DESKTOP;
        let adapters = vec![
            adapter(ADAPTER_1, "Fake GPU", attached | StateFlags::PRIMARY_DEVICE, ID_A),
            adapter(ADAPTER_2, "Fake GPU", 0, ""),
            adapter(ADAPTER_3, "Fake GPU", attached, ID_B),
        ];

        let modes = HashMap::from([
            (ADAPTER_1.to_string(), mode(0, 0, 1920, 1080)),
            (ADAPTER_3.to_string(), mode(1920, 0, 2560, 1440)),
        ]);

        let logical = vec![
            LogicalMonitor {
                handle: HMONITOR_1,
                device_name: ADAPTER_1.into(),
                bounds: Bounds::new(0, 0, 1920, 1080),
                primary: true,
            },
            LogicalMonitor {
                handle: HMONITOR_3,
                device_name: ADAPTER_3.into(),
                bounds: Bounds::new(1920, 0, 4480, 1440),
                primary: false,
            },
        ];

        // Monitor B exposes no DDC/CI handle.
        let physical = HashMap::from([(
            HMONITOR_1,
            vec![PhysicalMonitor {
                handle: PHYSICAL_1,
                description: "Generic PnP Monitor".into(),
            }],
        )]);

        let brightness = HashMap::from([(
            PHYSICAL_1,
            Brightness {
                minimum: 0,
                current: 40,
                maximum: 100,
            },
        )]);

        Self(Arc::new(NativeState {
            adapters: Mutex::new(adapters),
            modes: Mutex::new(modes),
            logical: Mutex::new(logical),
            physical: Mutex::new(physical),
            open_handles: Mutex::new(HashSet::new()),
            brightness: Mutex::new(brightness),
            applied: Mutex::new(Vec::new()),
            apply_result: Mutex::new(ModeChangeResult::Successful),
            system_wallpaper: Mutex::new("C:\\Windows\\Web\\img0.jpg".into()),
            system_wallpaper_calls: Mutex::new(Vec::new()),
            fail_system_wallpaper: AtomicBool::new(false),
            fail_enumeration: AtomicBool::new(false),
        }))
    }

    pub fn set_mode(&self, adapter: &str, mode: DisplayMode) {
        self.modes.lock().unwrap().insert(adapter.to_string(), mode);
    }

    pub fn open_handle_count(&self) -> usize {
        self.open_handles.lock().unwrap().len()
    }

    fn check_enumeration(&self, operation: &'static str) -> Result<()> {
        if self.fail_enumeration.load(Ordering::SeqCst) {
            return Err(DisplayError::native(operation, "device gone"));
        }
        Ok(())
    }
}

impl NativeDisplayBackend for FakeNative {
    fn display_devices(&self) -> Result<Vec<DisplayDevice>> {
        self.check_enumeration("EnumDisplayDevicesW")?;
        Ok(self.adapters.lock().unwrap().clone())
    }

    fn current_mode(&self, device_name: &str) -> Result<DisplayMode> {
        self.check_enumeration("EnumDisplaySettingsW")?;
        self.modes
            .lock()
            .unwrap()
            .get(device_name)
            .copied()
            .ok_or_else(|| DisplayError::native("EnumDisplaySettingsW", "no current mode"))
    }

    fn apply_mode(
        &self,
        device_name: &str,
        mode: &DisplayMode,
        change: ModeChange,
        persist: bool,
    ) -> Result<ModeChangeResult> {
        self.applied
            .lock()
            .unwrap()
            .push((device_name.to_string(), *mode, change, persist));
        Ok(*self.apply_result.lock().unwrap())
    }

    fn logical_monitors(&self) -> Result<Vec<LogicalMonitor>> {
        self.check_enumeration("EnumDisplayMonitors")?;
        Ok(self.logical.lock().unwrap().clone())
    }

    fn open_physical_monitors(&self, monitor: &LogicalMonitor) -> Result<Vec<PhysicalMonitor>> {
        let monitors = self
            .physical
            .lock()
            .unwrap()
            .get(&monitor.handle)
            .cloned()
            .unwrap_or_default();

        let mut open = self.open_handles.lock().unwrap();
        for m in &monitors {
            open.insert(m.handle);
        }
        Ok(monitors)
    }

    fn destroy_physical_monitors(&self, monitors: &[PhysicalMonitor]) -> Result<()> {
        let mut open = self.open_handles.lock().unwrap();
        for m in monitors {
            open.remove(&m.handle);
        }
        Ok(())
    }

    fn brightness(&self, monitor: &PhysicalMonitor) -> Result<Brightness> {
        self.brightness
            .lock()
            .unwrap()
            .get(&monitor.handle)
            .copied()
            .ok_or_else(|| DisplayError::native("GetMonitorBrightness", "unsupported"))
    }

    fn set_brightness(&self, monitor: &PhysicalMonitor, value: u32) -> Result<()> {
        let mut brightness = self.brightness.lock().unwrap();
        let entry = brightness
            .get_mut(&monitor.handle)
            .ok_or_else(|| DisplayError::native("SetMonitorBrightness", "unsupported"))?;
        entry.current = value;
        Ok(())
    }

    fn system_wallpaper(&self) -> Result<String> {
        Ok(self.system_wallpaper.lock().unwrap().clone())
    }

    fn set_system_wallpaper(&self, path: &str) -> Result<()> {
        self.system_wallpaper_calls.lock().unwrap().push(path.to_string());
        if self.fail_system_wallpaper.load(Ordering::SeqCst) {
            return Err(DisplayError::native("SystemParametersInfoW", "access denied"));
        }
        *self.system_wallpaper.lock().unwrap() = path.to_string();
        Ok(())
    }
}

/* =========================
   FIXTURE
   ========================= */

pub type TestService = MonitorService<FakePrimary, FakeNative, MemorySettingsStore>;

/// Three slots (A, unbound, B) over the fake desktop, with history in a
/// scratch directory that lives as long as the returned `TempDir`.
pub fn service() -> (TempDir, TestService) {
    service_with_paths(&[ID_A, "", ID_B])
}

pub fn service_with_paths(paths: &[&str]) -> (TempDir, TestService) {
    let dir = TempDir::new().unwrap();
    let history = WallpaperHistory::at(dir.path().join("wallpaper-history.json"));
    let service = MonitorService::new(
        FakePrimary::with_paths(paths),
        FakeNative::desktop(),
        MemorySettingsStore::new(),
        history,
    );
    (dir, service)
}
