// ~/Sentinel/sentinel-addons/display/src/backend/desktop_wallpaper.rs

use std::{ffi::c_void, time::Duration};

use windows::{
    core::{PCWSTR, PWSTR},
    Win32::{
        Foundation::COLORREF,
        System::Com::{
            CoCreateInstance, CoInitializeEx, CoTaskMemFree, CLSCTX_ALL, COINIT_APARTMENTTHREADED,
        },
        UI::Shell::{
            Common::ITEMIDLIST, DesktopWallpaper, IDesktopWallpaper, ILCreateFromPathW, ILFree,
            IShellItemArray, SHCreateShellItemArrayFromIDLists, DESKTOP_SLIDESHOW_DIRECTION,
            DESKTOP_SLIDESHOW_OPTIONS, DESKTOP_WALLPAPER_POSITION, DSD_BACKWARD, DSD_FORWARD,
            DSO_SHUFFLEIMAGES, SIGDN_FILESYSPATH,
        },
    },
};

use super::PrimaryDisplayBackend;
use crate::{
    error::{BackendError, BackendResult},
    model::{
        Bounds, Color, SlideshowDirection, SlideshowOptions, SlideshowStatus, WallpaperPosition,
    },
    utility::to_wstring,
    warn, DEBUG_NAME,
};

/// `IDesktopWallpaper` on the calling thread's apartment.
///
/// When the COM object cannot be created every call fails, so the service
/// falls back on each operation.
pub struct DesktopWallpaperBackend {
    interface: Option<IDesktopWallpaper>,
}

impl DesktopWallpaperBackend {
    pub fn connect() -> Self {
        let interface = unsafe {
            let _ = CoInitializeEx(None, COINIT_APARTMENTTHREADED);
            CoCreateInstance::<_, IDesktopWallpaper>(&DesktopWallpaper, None, CLSCTX_ALL)
        };

        match interface {
            Ok(interface) => Self {
                interface: Some(interface),
            },
            Err(e) => {
                warn!("[{}][PRIMARY] IDesktopWallpaper unavailable: {:?}", DEBUG_NAME, e);
                Self { interface: None }
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.interface.is_some()
    }

    fn interface(&self, operation: &'static str) -> BackendResult<&IDesktopWallpaper> {
        self.interface
            .as_ref()
            .ok_or_else(|| BackendError::new(operation, "IDesktopWallpaper is not available"))
    }
}

fn wrap(operation: &'static str) -> impl FnOnce(windows::core::Error) -> BackendError {
    move |e| BackendError::new(operation, format!("{e:?}"))
}

/// Copies and frees a string allocated by COM.
fn take_com_string(operation: &'static str, value: PWSTR) -> BackendResult<String> {
    if value.is_null() {
        return Ok(String::new());
    }
    let text = unsafe { value.to_string() };
    unsafe { CoTaskMemFree(Some(value.0 as *const c_void)) };
    text.map_err(|e| BackendError::new(operation, e.to_string()))
}

/// Item ID lists built from file paths, released with `ILFree` on drop.
struct PidlList(Vec<*const ITEMIDLIST>);

impl PidlList {
    fn from_paths(paths: &[String]) -> BackendResult<Self> {
        let mut list = Self(Vec::with_capacity(paths.len()));
        for path in paths {
            let wide = to_wstring(path);
            let pidl = unsafe { ILCreateFromPathW(PCWSTR(wide.as_ptr())) };
            if pidl.is_null() {
                return Err(BackendError::new(
                    "ILCreateFromPathW",
                    format!("no shell item for {path}"),
                ));
            }
            list.0.push(pidl as *const ITEMIDLIST);
        }
        Ok(list)
    }
}

impl Drop for PidlList {
    fn drop(&mut self) {
        for pidl in self.0.drain(..) {
            unsafe { ILFree(Some(pidl)) };
        }
    }
}

impl PrimaryDisplayBackend for DesktopWallpaperBackend {
    type Items = IShellItemArray;

    fn enable(&self, enable: bool) -> BackendResult<()> {
        let interface = self.interface("Enable")?;
        unsafe { interface.Enable(enable) }.map_err(wrap("Enable"))
    }

    fn monitor_path_count(&self) -> BackendResult<u32> {
        let interface = self.interface("GetMonitorDevicePathCount")?;
        unsafe { interface.GetMonitorDevicePathCount() }.map_err(wrap("GetMonitorDevicePathCount"))
    }

    fn monitor_path_at(&self, index: u32) -> BackendResult<String> {
        let interface = self.interface("GetMonitorDevicePathAt")?;
        let path = unsafe { interface.GetMonitorDevicePathAt(index) }
            .map_err(wrap("GetMonitorDevicePathAt"))?;
        take_com_string("GetMonitorDevicePathAt", path)
    }

    fn wallpaper(&self, device_id: &str) -> BackendResult<String> {
        let interface = self.interface("GetWallpaper")?;
        let id = to_wstring(device_id);
        let path = unsafe { interface.GetWallpaper(PCWSTR(id.as_ptr())) }
            .map_err(wrap("GetWallpaper"))?;
        take_com_string("GetWallpaper", path)
    }

    fn set_wallpaper(&self, device_id: &str, path: &str) -> BackendResult<()> {
        let interface = self.interface("SetWallpaper")?;
        let id = to_wstring(device_id);
        let path = to_wstring(path);
        unsafe { interface.SetWallpaper(PCWSTR(id.as_ptr()), PCWSTR(path.as_ptr())) }
            .map_err(wrap("SetWallpaper"))
    }

    fn monitor_bounds(&self, device_id: &str) -> BackendResult<Bounds> {
        let interface = self.interface("GetMonitorRECT")?;
        let id = to_wstring(device_id);
        let rect = unsafe { interface.GetMonitorRECT(PCWSTR(id.as_ptr())) }
            .map_err(wrap("GetMonitorRECT"))?;
        Ok(Bounds::new(rect.left, rect.top, rect.right, rect.bottom))
    }

    fn background_color(&self) -> BackendResult<Color> {
        let interface = self.interface("GetBackgroundColor")?;
        let color = unsafe { interface.GetBackgroundColor() }.map_err(wrap("GetBackgroundColor"))?;
        Ok(Color::from_colorref(color.0))
    }

    fn set_background_color(&self, color: Color) -> BackendResult<()> {
        let interface = self.interface("SetBackgroundColor")?;
        unsafe { interface.SetBackgroundColor(COLORREF(color.to_colorref())) }
            .map_err(wrap("SetBackgroundColor"))
    }

    fn position(&self) -> BackendResult<WallpaperPosition> {
        let interface = self.interface("GetPosition")?;
        let position = unsafe { interface.GetPosition() }.map_err(wrap("GetPosition"))?;
        WallpaperPosition::from_native(position.0).ok_or_else(|| {
            BackendError::new("GetPosition", format!("unknown position {}", position.0))
        })
    }

    fn set_position(&self, position: WallpaperPosition) -> BackendResult<()> {
        let interface = self.interface("SetPosition")?;
        unsafe { interface.SetPosition(DESKTOP_WALLPAPER_POSITION(position.to_native())) }
            .map_err(wrap("SetPosition"))
    }

    fn create_item_array(&self, paths: &[String]) -> BackendResult<IShellItemArray> {
        let pidls = PidlList::from_paths(paths)?;
        unsafe { SHCreateShellItemArrayFromIDLists(&pidls.0) }
            .map_err(wrap("SHCreateShellItemArrayFromIDLists"))
    }

    fn set_slideshow(&self, items: &IShellItemArray) -> BackendResult<()> {
        let interface = self.interface("SetSlideshow")?;
        unsafe { interface.SetSlideshow(items) }.map_err(wrap("SetSlideshow"))
    }

    fn slideshow(&self) -> BackendResult<Vec<String>> {
        let interface = self.interface("GetSlideshow")?;
        let items = unsafe { interface.GetSlideshow() }.map_err(wrap("GetSlideshow"))?;
        let count = unsafe { items.GetCount() }.map_err(wrap("IShellItemArray::GetCount"))?;

        let mut paths = Vec::with_capacity(count as usize);
        for index in 0..count {
            let item = unsafe { items.GetItemAt(index) }.map_err(wrap("IShellItemArray::GetItemAt"))?;
            let name = unsafe { item.GetDisplayName(SIGDN_FILESYSPATH) }
                .map_err(wrap("IShellItem::GetDisplayName"))?;
            paths.push(take_com_string("IShellItem::GetDisplayName", name)?);
        }
        Ok(paths)
    }

    fn slideshow_options(&self) -> BackendResult<SlideshowOptions> {
        let interface = self.interface("GetSlideshowOptions")?;
        let mut options = DESKTOP_SLIDESHOW_OPTIONS::default();
        let mut tick = 0u32;
        unsafe { interface.GetSlideshowOptions(&mut options, &mut tick) }
            .map_err(wrap("GetSlideshowOptions"))?;

        Ok(SlideshowOptions {
            shuffle: options.0 & DSO_SHUFFLEIMAGES.0 != 0,
            tick: Duration::from_millis(u64::from(tick)),
        })
    }

    fn set_slideshow_options(&self, options: SlideshowOptions) -> BackendResult<()> {
        let interface = self.interface("SetSlideshowOptions")?;
        let flags = if options.shuffle {
            DSO_SHUFFLEIMAGES
        } else {
            DESKTOP_SLIDESHOW_OPTIONS(0)
        };
        let tick = u32::try_from(options.tick.as_millis()).unwrap_or(u32::MAX);
        unsafe { interface.SetSlideshowOptions(flags, tick) }.map_err(wrap("SetSlideshowOptions"))
    }

    fn advance_slideshow(
        &self,
        device_id: Option<&str>,
        direction: SlideshowDirection,
    ) -> BackendResult<()> {
        let interface = self.interface("AdvanceSlideshow")?;
        let id = device_id.map(to_wstring);
        let id_ptr = id
            .as_ref()
            .map(|id| PCWSTR(id.as_ptr()))
            .unwrap_or_else(PCWSTR::null);
        let direction: DESKTOP_SLIDESHOW_DIRECTION = match direction {
            SlideshowDirection::Forward => DSD_FORWARD,
            SlideshowDirection::Backward => DSD_BACKWARD,
        };
        unsafe { interface.AdvanceSlideshow(id_ptr, direction) }.map_err(wrap("AdvanceSlideshow"))
    }

    fn status(&self) -> BackendResult<SlideshowStatus> {
        let interface = self.interface("GetStatus")?;
        let state = unsafe { interface.GetStatus() }.map_err(wrap("GetStatus"))?;
        Ok(SlideshowStatus::from_bits(state.0 as u32))
    }
}
