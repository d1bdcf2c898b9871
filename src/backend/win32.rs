// ~/Sentinel/sentinel-addons/display/src/backend/win32.rs

use std::{ffi::c_void, mem};

use windows::{
    core::{BOOL, PCWSTR},
    Win32::{
        Devices::Display::{
            DestroyPhysicalMonitors, GetMonitorBrightness, GetNumberOfPhysicalMonitorsFromHMONITOR,
            GetPhysicalMonitorsFromHMONITOR, SetMonitorBrightness, PHYSICAL_MONITOR,
        },
        Foundation::{HANDLE, LPARAM, MAX_PATH, POINTL, RECT},
        Graphics::Gdi::{
            ChangeDisplaySettingsExW, EnumDisplayDevicesW, EnumDisplayMonitors,
            EnumDisplaySettingsW, GetMonitorInfoW, CDS_TYPE, CDS_UPDATEREGISTRY,
            DEVMODE_DISPLAY_ORIENTATION, DEVMODEW, DISPLAY_DEVICEW,
            DM_DISPLAYORIENTATION, DM_PELSHEIGHT, DM_PELSWIDTH, DM_POSITION, ENUM_CURRENT_SETTINGS,
            HDC, HMONITOR, MONITORINFOEXW,
        },
        UI::WindowsAndMessaging::{
            SystemParametersInfoW, EDD_GET_DEVICE_INTERFACE_NAME, SPIF_SENDCHANGE,
            SPIF_UPDATEINIFILE, SPI_GETDESKWALLPAPER, SPI_SETDESKWALLPAPER,
            SYSTEM_PARAMETERS_INFO_UPDATE_FLAGS,
        },
    },
};

use super::NativeDisplayBackend;
use crate::{
    debug,
    error::{DisplayError, Result},
    model::{
        Bounds, Brightness, DisplayDevice, DisplayMode, LogicalMonitor, ModeChange,
        ModeChangeResult, Orientation, PhysicalMonitor, StateFlags,
    },
    utility::{from_wide, to_wstring},
    DEBUG_NAME,
};

const MONITORINFOF_PRIMARY: u32 = 0x1;

/// GDI, user32 and dxva2 calls. Stateless; every call enumerates afresh.
#[derive(Debug, Default, Clone, Copy)]
pub struct Win32DisplayBackend;

impl Win32DisplayBackend {
    pub fn new() -> Self {
        Self
    }
}

fn display_device(adapter: Option<&[u16]>, index: u32, flags: u32) -> Option<DISPLAY_DEVICEW> {
    let mut device = DISPLAY_DEVICEW {
        cb: mem::size_of::<DISPLAY_DEVICEW>() as u32,
        ..Default::default()
    };
    let name = adapter.map(|a| PCWSTR(a.as_ptr())).unwrap_or_else(PCWSTR::null);
    unsafe { EnumDisplayDevicesW(name, index, &mut device, flags) }
        .as_bool()
        .then_some(device)
}

fn read_mode(device_name: &str) -> Result<DEVMODEW> {
    let name = to_wstring(device_name);
    let mut mode = DEVMODEW {
        dmSize: mem::size_of::<DEVMODEW>() as u16,
        ..Default::default()
    };
    let ok = unsafe { EnumDisplaySettingsW(PCWSTR(name.as_ptr()), ENUM_CURRENT_SETTINGS, &mut mode) };
    if !ok.as_bool() {
        return Err(DisplayError::native(
            "EnumDisplaySettingsW",
            format!("no current mode for {device_name}"),
        ));
    }
    Ok(mode)
}

fn physical_monitor_array(monitors: &[PhysicalMonitor]) -> Vec<PHYSICAL_MONITOR> {
    monitors
        .iter()
        .map(|m| PHYSICAL_MONITOR {
            hPhysicalMonitor: HANDLE(m.handle as *mut c_void),
            ..Default::default()
        })
        .collect()
}

impl NativeDisplayBackend for Win32DisplayBackend {
    fn display_devices(&self) -> Result<Vec<DisplayDevice>> {
        let mut devices = Vec::new();
        let mut index = 0;

        while let Some(adapter) = display_device(None, index, 0) {
            index += 1;

            // The first monitor attached to the adapter carries the interface
            // path the desktop wallpaper interface uses as its device id.
            let adapter_name: Vec<u16> = adapter.DeviceName.to_vec();
            let device_id = display_device(Some(&adapter_name), 0, EDD_GET_DEVICE_INTERFACE_NAME)
                .map(|monitor| from_wide(&monitor.DeviceID))
                .unwrap_or_default();

            devices.push(DisplayDevice {
                device_name: from_wide(&adapter.DeviceName),
                device_string: from_wide(&adapter.DeviceString),
                state_flags: StateFlags(adapter.StateFlags.0),
                device_id,
            });
        }

        debug!("[{}][NATIVE] Enumerated {} adapter(s)", DEBUG_NAME, devices.len());
        Ok(devices)
    }

    fn current_mode(&self, device_name: &str) -> Result<DisplayMode> {
        let mode = read_mode(device_name)?;
        let (position, orientation) = unsafe {
            let display = &mode.Anonymous1.Anonymous2;
            (display.dmPosition, display.dmDisplayOrientation)
        };

        Ok(DisplayMode {
            x: position.x,
            y: position.y,
            width: mode.dmPelsWidth,
            height: mode.dmPelsHeight,
            orientation: Orientation::from_native(orientation.0),
            bits_per_pixel: mode.dmBitsPerPel,
            frequency: mode.dmDisplayFrequency,
        })
    }

    fn apply_mode(
        &self,
        device_name: &str,
        mode: &DisplayMode,
        change: ModeChange,
        persist: bool,
    ) -> Result<ModeChangeResult> {
        let mut native = read_mode(device_name)?;

        native.dmFields = match change {
            ModeChange::Position => {
                native.Anonymous1.Anonymous2.dmPosition = POINTL {
                    x: mode.x,
                    y: mode.y,
                };
                DM_POSITION
            }
            ModeChange::Resolution => {
                native.dmPelsWidth = mode.width;
                native.dmPelsHeight = mode.height;
                DM_PELSWIDTH | DM_PELSHEIGHT
            }
            ModeChange::Orientation => {
                native.dmPelsWidth = mode.width;
                native.dmPelsHeight = mode.height;
                native.Anonymous1.Anonymous2.dmDisplayOrientation =
                    DEVMODE_DISPLAY_ORIENTATION(mode.orientation.to_native());
                DM_DISPLAYORIENTATION | DM_PELSWIDTH | DM_PELSHEIGHT
            }
        };

        let flags = if persist { CDS_UPDATEREGISTRY } else { CDS_TYPE(0) };
        let name = to_wstring(device_name);
        let code = unsafe {
            ChangeDisplaySettingsExW(PCWSTR(name.as_ptr()), Some(&native), None, flags, None)
        };

        debug!(
            "[{}][NATIVE] ChangeDisplaySettingsExW({}, {:?}) -> {}",
            DEBUG_NAME, device_name, change, code.0
        );
        Ok(ModeChangeResult::from_code(code.0))
    }

    fn logical_monitors(&self) -> Result<Vec<LogicalMonitor>> {
        unsafe extern "system" fn collect(
            monitor: HMONITOR,
            _hdc: HDC,
            _rect: *mut RECT,
            lparam: LPARAM,
        ) -> BOOL {
            let monitors = &mut *(lparam.0 as *mut Vec<LogicalMonitor>);

            let mut info: MONITORINFOEXW = mem::zeroed();
            info.monitorInfo.cbSize = mem::size_of::<MONITORINFOEXW>() as u32;

            if GetMonitorInfoW(monitor, &mut info as *mut MONITORINFOEXW as *mut _).as_bool() {
                let rect = info.monitorInfo.rcMonitor;
                monitors.push(LogicalMonitor {
                    handle: monitor.0 as isize,
                    device_name: from_wide(&info.szDevice),
                    bounds: Bounds::new(rect.left, rect.top, rect.right, rect.bottom),
                    primary: info.monitorInfo.dwFlags & MONITORINFOF_PRIMARY != 0,
                });
            }

            BOOL(1)
        }

        let mut monitors = Vec::<LogicalMonitor>::new();
        let ok = unsafe {
            EnumDisplayMonitors(
                None,
                None,
                Some(collect),
                LPARAM((&mut monitors as *mut Vec<LogicalMonitor>) as isize),
            )
        };
        if !ok.as_bool() {
            return Err(DisplayError::native("EnumDisplayMonitors", "enumeration aborted"));
        }
        Ok(monitors)
    }

    fn open_physical_monitors(&self, monitor: &LogicalMonitor) -> Result<Vec<PhysicalMonitor>> {
        let hmonitor = HMONITOR(monitor.handle as *mut c_void);

        let mut count = 0u32;
        unsafe { GetNumberOfPhysicalMonitorsFromHMONITOR(hmonitor, &mut count) }
            .map_err(|e| DisplayError::native("GetNumberOfPhysicalMonitorsFromHMONITOR", format!("{e:?}")))?;
        if count == 0 {
            return Ok(Vec::new());
        }

        let mut array = vec![PHYSICAL_MONITOR::default(); count as usize];
        unsafe { GetPhysicalMonitorsFromHMONITOR(hmonitor, &mut array) }
            .map_err(|e| DisplayError::native("GetPhysicalMonitorsFromHMONITOR", format!("{e:?}")))?;

        Ok(array
            .iter()
            .map(|m| PhysicalMonitor {
                handle: m.hPhysicalMonitor.0 as isize,
                description: from_wide(&m.szPhysicalMonitorDescription),
            })
            .collect())
    }

    fn destroy_physical_monitors(&self, monitors: &[PhysicalMonitor]) -> Result<()> {
        let array = physical_monitor_array(monitors);
        unsafe { DestroyPhysicalMonitors(&array) }
            .map_err(|e| DisplayError::native("DestroyPhysicalMonitors", format!("{e:?}")))
    }

    fn brightness(&self, monitor: &PhysicalMonitor) -> Result<Brightness> {
        let handle = HANDLE(monitor.handle as *mut c_void);
        let (mut minimum, mut current, mut maximum) = (0u32, 0u32, 0u32);
        let ok = unsafe { GetMonitorBrightness(handle, &mut minimum, &mut current, &mut maximum) };
        if ok == 0 {
            return Err(DisplayError::native(
                "GetMonitorBrightness",
                format!("{} does not report brightness", monitor.description),
            ));
        }
        Ok(Brightness {
            minimum,
            current,
            maximum,
        })
    }

    fn set_brightness(&self, monitor: &PhysicalMonitor, value: u32) -> Result<()> {
        let handle = HANDLE(monitor.handle as *mut c_void);
        let ok = unsafe { SetMonitorBrightness(handle, value) };
        if ok == 0 {
            return Err(DisplayError::native(
                "SetMonitorBrightness",
                format!("{} rejected brightness {value}", monitor.description),
            ));
        }
        Ok(())
    }

    fn system_wallpaper(&self) -> Result<String> {
        let mut buffer = [0u16; MAX_PATH as usize];
        unsafe {
            SystemParametersInfoW(
                SPI_GETDESKWALLPAPER,
                buffer.len() as u32,
                Some(buffer.as_mut_ptr() as *mut _),
                SYSTEM_PARAMETERS_INFO_UPDATE_FLAGS(0),
            )
        }
        .map_err(|e| DisplayError::native("SystemParametersInfoW", format!("{e:?}")))?;
        Ok(from_wide(&buffer))
    }

    fn set_system_wallpaper(&self, path: &str) -> Result<()> {
        let wide = to_wstring(path);
        unsafe {
            SystemParametersInfoW(
                SPI_SETDESKWALLPAPER,
                0,
                Some(wide.as_ptr() as *mut _),
                SPIF_UPDATEINIFILE | SPIF_SENDCHANGE,
            )
        }
        .map_err(|e| DisplayError::native("SystemParametersInfoW", format!("{e:?}")))
    }
}
