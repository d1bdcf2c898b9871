// ~/Sentinel/sentinel-addons/display/src/watcher/device.rs
//
// Monitor arrival and removal, reported by the device-interface channel.

use super::guid_from_bytes;

pub const GUID_DEVINTERFACE_MONITOR: u128 = 0xe6f07b5f_ee97_4a90_b076_33f57bf4eaa7;

const DBT_DEVICEARRIVAL: u32 = 0x8000;
const DBT_DEVICEREMOVECOMPLETE: u32 = 0x8004;
const DBT_DEVTYP_DEVICEINTERFACE: u32 = 0x0005;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceChange {
    Arrived,
    Removed,
}

/// Arrival or removal of a monitor interface; everything else is ignored.
pub fn classify_device_change(event: u32, device_type: u32, class_guid: u128) -> Option<DeviceChange> {
    if device_type != DBT_DEVTYP_DEVICEINTERFACE || class_guid != GUID_DEVINTERFACE_MONITOR {
        return None;
    }

    match event {
        DBT_DEVICEARRIVAL => Some(DeviceChange::Arrived),
        DBT_DEVICEREMOVECOMPLETE => Some(DeviceChange::Removed),
        _ => None,
    }
}

// DEV_BROADCAST_DEVICEINTERFACE_W: size, device type, reserved, class GUID,
// then a null-terminated UTF-16 name bounded by `size`.
const SIZE_OFFSET: usize = 0;
const DEVICE_TYPE_OFFSET: usize = 4;
const CLASS_GUID_OFFSET: usize = 12;
const NAME_OFFSET: usize = 28;

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let field = bytes.get(offset..offset + 4)?;
    Some(u32::from_le_bytes(field.try_into().ok()?))
}

/// Decodes a device broadcast laid out in `bytes` for `event`. Returns the
/// change and the interface path for monitor interfaces only. The name is
/// read up to its terminator, never past the broadcast's own size.
pub fn decode_device_interface(event: u32, bytes: &[u8]) -> Option<(DeviceChange, String)> {
    let device_type = read_u32(bytes, DEVICE_TYPE_OFFSET)?;
    let class_guid = guid_from_bytes(bytes.get(CLASS_GUID_OFFSET..)?)?;
    let change = classify_device_change(event, device_type, class_guid)?;

    let size = (read_u32(bytes, SIZE_OFFSET)? as usize).min(bytes.len());
    let name: Vec<u16> = bytes
        .get(NAME_OFFSET..size)
        .unwrap_or_default()
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take_while(|&unit| unit != 0)
        .collect();

    Some((change, String::from_utf16_lossy(&name)))
}

#[cfg(windows)]
pub use self::windows_source::DeviceInterfaceSource;

#[cfg(windows)]
mod windows_source {
    use std::{ffi::c_void, mem};

    use windows::{
        core::GUID,
        Win32::{
            Foundation::{HANDLE, HWND, LPARAM, WPARAM},
            UI::WindowsAndMessaging::{RegisterDeviceNotificationW, DEVICE_NOTIFY_WINDOW_HANDLE},
        },
    };

    use super::{
        decode_device_interface, DeviceChange, DBT_DEVTYP_DEVICEINTERFACE, GUID_DEVINTERFACE_MONITOR,
        NAME_OFFSET,
    };
    use crate::{
        error::{DisplayError, Result},
        watcher::{
            message_window::{MessageWindowThread, Registration, WindowSpec},
            Notification, NotificationSink, NotificationSource,
        },
    };

    const WM_DEVICECHANGE: u32 = 0x0219;

    #[repr(C)]
    struct DevBroadcastDeviceInterface {
        size: u32,
        device_type: u32,
        reserved: u32,
        class_guid: GUID,
        name: [u16; 1],
    }

    #[derive(Default)]
    pub struct DeviceInterfaceSource {
        thread: Option<MessageWindowThread>,
    }

    impl DeviceInterfaceSource {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl NotificationSource for DeviceInterfaceSource {
        fn name(&self) -> &'static str {
            "device"
        }

        fn start(&mut self, sink: NotificationSink) -> Result<()> {
            if self.thread.is_some() {
                return Ok(());
            }

            let spec = WindowSpec {
                class_name: "SentinelDisplayDevice",
                message_only: true,
            };
            let thread = MessageWindowThread::spawn(spec, register, move |msg, wparam, lparam| {
                if let Some(notification) = decode(msg, wparam, lparam) {
                    sink(notification);
                }
            })?;

            self.thread = Some(thread);
            Ok(())
        }

        fn stop(&mut self) {
            if let Some(mut thread) = self.thread.take() {
                thread.stop();
            }
        }
    }

    fn register(hwnd: HWND) -> Result<Registration> {
        let filter = DevBroadcastDeviceInterface {
            size: mem::size_of::<DevBroadcastDeviceInterface>() as u32,
            device_type: DBT_DEVTYP_DEVICEINTERFACE,
            reserved: 0,
            class_guid: GUID::from_u128(GUID_DEVINTERFACE_MONITOR),
            name: [0],
        };

        unsafe {
            RegisterDeviceNotificationW(
                HANDLE(hwnd.0),
                &filter as *const DevBroadcastDeviceInterface as *const c_void,
                DEVICE_NOTIFY_WINDOW_HANDLE,
            )
        }
        .map(Registration::Device)
        .map_err(|e| DisplayError::native("RegisterDeviceNotificationW", format!("{e:?}")))
    }

    fn decode(msg: u32, wparam: WPARAM, lparam: LPARAM) -> Option<Notification> {
        if msg != WM_DEVICECHANGE || lparam.0 == 0 {
            return None;
        }

        let bytes = unsafe {
            let base = lparam.0 as *const u8;
            let size = std::ptr::read_unaligned(base as *const u32) as usize;
            if size < NAME_OFFSET {
                return None;
            }
            std::slice::from_raw_parts(base, size)
        };

        Some(match decode_device_interface(wparam.0 as u32, bytes)? {
            (DeviceChange::Arrived, name) => Notification::DeviceArrived(name),
            (DeviceChange::Removed, name) => Notification::DeviceRemoved(name),
        })
    }
}
