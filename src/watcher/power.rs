// ~/Sentinel/sentinel-addons/display/src/watcher/power.rs

use super::guid_from_bytes;

pub const GUID_CONSOLE_DISPLAY_STATE: u128 = 0x6fe69556_704a_47a0_8f24_c28d936fda47;

// POWERBROADCAST_SETTING: PowerSetting GUID, DataLength u32, then Data.
const DATA_LENGTH_OFFSET: usize = 16;
const DATA_OFFSET: usize = 20;

/// Console display state payload: 0 is off, anything else (on, dimmed) is on.
pub fn power_state_from_payload(payload: u32) -> bool {
    payload != 0
}

/// Display on/off from a power-setting broadcast laid out in `bytes`. Other
/// settings, short payloads and truncated buffers yield `None`.
pub fn decode_power_setting(bytes: &[u8]) -> Option<bool> {
    if guid_from_bytes(bytes)? != GUID_CONSOLE_DISPLAY_STATE {
        return None;
    }

    let length = bytes.get(DATA_LENGTH_OFFSET..DATA_OFFSET)?;
    if u32::from_le_bytes(length.try_into().ok()?) < 4 {
        return None;
    }

    let payload = bytes.get(DATA_OFFSET..DATA_OFFSET + 4)?;
    Some(power_state_from_payload(u32::from_le_bytes(payload.try_into().ok()?)))
}

#[cfg(windows)]
pub use self::windows_source::PowerBroadcastSource;

#[cfg(windows)]
mod windows_source {
    use windows::{
        core::GUID,
        Win32::{
            Foundation::{HANDLE, HWND, LPARAM, WPARAM},
            System::Power::RegisterPowerSettingNotification,
            UI::WindowsAndMessaging::DEVICE_NOTIFY_WINDOW_HANDLE,
        },
    };

    use super::{decode_power_setting, DATA_LENGTH_OFFSET, DATA_OFFSET, GUID_CONSOLE_DISPLAY_STATE};
    use crate::{
        error::{DisplayError, Result},
        watcher::{
            message_window::{MessageWindowThread, Registration, WindowSpec},
            Notification, NotificationSink, NotificationSource,
        },
    };

    const WM_POWERBROADCAST: u32 = 0x0218;
    const PBT_POWERSETTINGCHANGE: usize = 0x8013;

    /// Monitor on/off transitions from the console display state power setting.
    #[derive(Default)]
    pub struct PowerBroadcastSource {
        thread: Option<MessageWindowThread>,
    }

    impl PowerBroadcastSource {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl NotificationSource for PowerBroadcastSource {
        fn name(&self) -> &'static str {
            "power"
        }

        fn start(&mut self, sink: NotificationSink) -> Result<()> {
            if self.thread.is_some() {
                return Ok(());
            }

            let spec = WindowSpec {
                class_name: "SentinelDisplayPower",
                message_only: true,
            };
            let thread = MessageWindowThread::spawn(spec, register, move |msg, wparam, lparam| {
                if let Some(on) = decode(msg, wparam, lparam) {
                    sink(Notification::PowerChanged(on));
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
        unsafe {
            RegisterPowerSettingNotification(
                HANDLE(hwnd.0),
                &GUID::from_u128(GUID_CONSOLE_DISPLAY_STATE),
                DEVICE_NOTIFY_WINDOW_HANDLE,
            )
        }
        .map(Registration::Power)
        .map_err(|e| DisplayError::native("RegisterPowerSettingNotification", format!("{e:?}")))
    }

    fn decode(msg: u32, wparam: WPARAM, lparam: LPARAM) -> Option<bool> {
        if msg != WM_POWERBROADCAST || wparam.0 != PBT_POWERSETTINGCHANGE || lparam.0 == 0 {
            return None;
        }

        let bytes = unsafe {
            let base = lparam.0 as *const u8;
            let length = std::ptr::read_unaligned(base.add(DATA_LENGTH_OFFSET) as *const u32);
            std::slice::from_raw_parts(base, DATA_OFFSET + length as usize)
        };
        decode_power_setting(bytes)
    }
}
