// ~/Sentinel/sentinel-addons/display/src/watcher/mod.rs
//
// Monitor change notifications. Platform channels push `Notification`s into
// the watcher, which turns them into `MonitorEvent`s for subscribers.

use std::sync::{Arc, Mutex};

use crate::{
    backend::NativeDisplayBackend,
    debug, error,
    error::Result,
    info,
    model::{MonitorState, Orientation, Snapshot},
    warn, DEBUG_NAME,
};

mod device;
mod power;

#[cfg(windows)]
mod display;
#[cfg(windows)]
mod message_window;

pub use device::{
    classify_device_change, decode_device_interface, DeviceChange, GUID_DEVINTERFACE_MONITOR,
};
pub use power::{decode_power_setting, power_state_from_payload, GUID_CONSOLE_DISPLAY_STATE};

#[cfg(windows)]
pub use device::DeviceInterfaceSource;
#[cfg(windows)]
pub use display::DisplayChangeSource;
#[cfg(windows)]
pub use power::PowerBroadcastSource;

/// Reads a GUID stored in its in-memory layout (three little-endian fields,
/// then eight bytes in order) as the `u128` that `GUID::from_u128` takes.
pub(crate) fn guid_from_bytes(bytes: &[u8]) -> Option<u128> {
    let bytes: &[u8; 16] = bytes.get(..16)?.try_into().ok()?;
    let data1 = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as u128;
    let data2 = u16::from_le_bytes([bytes[4], bytes[5]]) as u128;
    let data3 = u16::from_le_bytes([bytes[6], bytes[7]]) as u128;
    let mut data4 = [0u8; 8];
    data4.copy_from_slice(&bytes[8..]);
    Some(data1 << 96 | data2 << 80 | data3 << 64 | u64::from_be_bytes(data4) as u128)
}

#[cfg(test)]
pub(crate) fn guid_to_bytes(guid: u128) -> [u8; 16] {
    let mut bytes = [0u8; 16];
    bytes[..4].copy_from_slice(&((guid >> 96) as u32).to_le_bytes());
    bytes[4..6].copy_from_slice(&((guid >> 80) as u16).to_le_bytes());
    bytes[6..8].copy_from_slice(&((guid >> 64) as u16).to_le_bytes());
    bytes[8..].copy_from_slice(&(guid as u64).to_be_bytes());
    bytes
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    OrientationChanged {
        device_name: String,
        orientation: Orientation,
    },
    ResolutionChanged {
        device_name: String,
        width: u32,
        height: u32,
    },
    DisplaySettingsChanged,
    MonitorPoweredOn,
    MonitorPoweredOff,
    MonitorConnected {
        device_path: String,
    },
    MonitorDisconnected {
        device_path: String,
    },
}

/// Raw signal from a platform channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    DisplaySettingsChanged,
    PowerChanged(bool),
    DeviceArrived(String),
    DeviceRemoved(String),
}

pub type NotificationSink = Arc<dyn Fn(Notification) + Send + Sync>;
pub type Subscriber = Arc<dyn Fn(&MonitorEvent) + Send + Sync>;

/// A channel that delivers notifications from its own thread until stopped.
/// `stop` must not return while the channel can still call the sink.
pub trait NotificationSource: Send {
    fn name(&self) -> &'static str;
    fn start(&mut self, sink: NotificationSink) -> Result<()>;
    fn stop(&mut self);
}

pub trait SnapshotSource: Send + Sync {
    fn capture(&self) -> Result<Snapshot>;
}

/// Current mode of every adapter attached to the desktop.
pub struct NativeSnapshotSource<N> {
    native: N,
}

impl<N: NativeDisplayBackend> NativeSnapshotSource<N> {
    pub fn new(native: N) -> Self {
        Self { native }
    }
}

impl<N> SnapshotSource for NativeSnapshotSource<N>
where
    N: NativeDisplayBackend + Send + Sync,
{
    fn capture(&self) -> Result<Snapshot> {
        let mut snapshot = Snapshot::new();
        for adapter in self.native.display_devices()? {
            if !adapter.state_flags.is_attached() {
                continue;
            }
            let mode = self.native.current_mode(&adapter.device_name)?;
            snapshot.insert(adapter.device_name, MonitorState::from(&mode));
        }
        Ok(snapshot)
    }
}

impl<F> SnapshotSource for F
where
    F: Fn() -> Result<Snapshot> + Send + Sync,
{
    fn capture(&self) -> Result<Snapshot> {
        self()
    }
}

/// Events implied by moving from `old` to `new`. Adapters that only appear in
/// `new` report both orientation and resolution. Adapters that disappeared
/// produce nothing here; removal is reported by the device channel. The list
/// always ends with [`MonitorEvent::DisplaySettingsChanged`].
pub fn diff_snapshots(old: &Snapshot, new: &Snapshot) -> Vec<MonitorEvent> {
    let mut events = Vec::new();

    for (device_name, state) in new {
        let previous = old.get(device_name);

        if previous.map_or(true, |p| p.orientation != state.orientation) {
            events.push(MonitorEvent::OrientationChanged {
                device_name: device_name.clone(),
                orientation: state.orientation,
            });
        }

        if previous.map_or(true, |p| p.width != state.width || p.height != state.height) {
            events.push(MonitorEvent::ResolutionChanged {
                device_name: device_name.clone(),
                width: state.width,
                height: state.height,
            });
        }
    }

    events.push(MonitorEvent::DisplaySettingsChanged);
    events
}

struct Shared {
    snapshots: Box<dyn SnapshotSource>,
    snapshot: Mutex<Arc<Snapshot>>,
    subscribers: Mutex<Vec<Subscriber>>,
}

impl Shared {
    fn handle(&self, notification: Notification) {
        debug!("[{}][WATCHER] {:?}", DEBUG_NAME, notification);

        match notification {
            Notification::DisplaySettingsChanged => self.refresh(),
            Notification::PowerChanged(true) => self.dispatch(&[MonitorEvent::MonitorPoweredOn]),
            Notification::PowerChanged(false) => self.dispatch(&[MonitorEvent::MonitorPoweredOff]),
            Notification::DeviceArrived(device_path) => {
                self.dispatch(&[MonitorEvent::MonitorConnected { device_path }])
            }
            Notification::DeviceRemoved(device_path) => {
                self.dispatch(&[MonitorEvent::MonitorDisconnected { device_path }])
            }
        }
    }

    fn refresh(&self) {
        let fresh = match self.snapshots.capture() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!("[{}][WATCHER] Snapshot capture failed: {}", DEBUG_NAME, e);
                return;
            }
        };

        let events = {
            let mut current = self
                .snapshot
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let events = diff_snapshots(&current, &fresh);
            *current = Arc::new(fresh);
            events
        };

        self.dispatch(&events);
    }

    fn dispatch(&self, events: &[MonitorEvent]) {
        let subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();

        for event in events {
            for subscriber in &subscribers {
                subscriber(event);
            }
        }
    }
}

/// Turns display, power and device notifications into [`MonitorEvent`]s.
///
/// Subscribers run on whichever thread delivered the notification.
pub struct MonitorWatcher {
    shared: Arc<Shared>,
    sources: Vec<Box<dyn NotificationSource>>,
    running: bool,
}

impl MonitorWatcher {
    /// Takes the initial snapshot straight away. A failed capture starts from
    /// an empty snapshot, so the first change reports every adapter.
    pub fn new(snapshots: impl SnapshotSource + 'static) -> Self {
        let initial = snapshots.capture().unwrap_or_else(|e| {
            warn!("[{}][WATCHER] Initial snapshot failed: {}", DEBUG_NAME, e);
            Snapshot::new()
        });

        Self {
            shared: Arc::new(Shared {
                snapshots: Box::new(snapshots),
                snapshot: Mutex::new(Arc::new(initial)),
                subscribers: Mutex::new(Vec::new()),
            }),
            sources: Vec::new(),
            running: false,
        }
    }

    pub fn with_source(mut self, source: impl NotificationSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn subscribe(&self, subscriber: impl Fn(&MonitorEvent) + Send + Sync + 'static) {
        self.shared
            .subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(Arc::new(subscriber));
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.shared
            .snapshot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Starts every source. If one fails, those already started are stopped
    /// again and the error is returned.
    pub fn start(&mut self) -> Result<()> {
        if self.running {
            return Ok(());
        }

        let shared = Arc::clone(&self.shared);
        let sink: NotificationSink = Arc::new(move |n| shared.handle(n));

        for index in 0..self.sources.len() {
            let source = &mut self.sources[index];
            if let Err(e) = source.start(Arc::clone(&sink)) {
                error!(
                    "[{}][WATCHER] Failed to start {} source: {}",
                    DEBUG_NAME,
                    source.name(),
                    e
                );
                for started in self.sources[..index].iter_mut().rev() {
                    started.stop();
                }
                return Err(e);
            }
            info!("[{}][WATCHER] {} source started", DEBUG_NAME, source.name());
        }

        self.running = true;
        Ok(())
    }

    /// Stops every source. Returns once no source thread is left running.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }

        for source in self.sources.iter_mut().rev() {
            source.stop();
            info!("[{}][WATCHER] {} source stopped", DEBUG_NAME, source.name());
        }
        self.running = false;
    }

    /// Feeds one notification through as if a source had delivered it.
    pub fn handle_notification(&self, notification: Notification) {
        self.shared.handle(notification);
    }
}

impl Drop for MonitorWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(windows)]
impl MonitorWatcher {
    /// Watcher over the live desktop with the channels enabled in `settings`.
    pub fn system(settings: &crate::data_loaders::config::WatcherSettings) -> Self {
        let mut watcher = Self::new(NativeSnapshotSource::new(
            crate::backend::Win32DisplayBackend::new(),
        ));

        if settings.display_events {
            watcher = watcher.with_source(DisplayChangeSource::new());
        }
        if settings.power_events {
            watcher = watcher.with_source(PowerBroadcastSource::new());
        }
        if settings.device_events {
            watcher = watcher.with_source(DeviceInterfaceSource::new());
        }
        watcher
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DisplayError;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn state(width: u32, height: u32, orientation: Orientation) -> MonitorState {
        MonitorState {
            width,
            height,
            orientation,
        }
    }

    fn snapshot(entries: &[(&str, MonitorState)]) -> Snapshot {
        entries
            .iter()
            .map(|(name, state)| (name.to_string(), *state))
            .collect()
    }

    #[test]
    fn guid_bytes_follow_the_native_layout() {
        let bytes = guid_to_bytes(GUID_DEVINTERFACE_MONITOR);
        assert_eq!(
            bytes,
            [
                0x5f, 0x7b, 0xf0, 0xe6, 0x97, 0xee, 0x90, 0x4a, 0xb0, 0x76, 0x33, 0xf5, 0x7b,
                0xf4, 0xea, 0xa7
            ]
        );
        assert_eq!(guid_from_bytes(&bytes), Some(GUID_DEVINTERFACE_MONITOR));
        assert_eq!(guid_from_bytes(&bytes[..15]), None);
    }

    #[test]
    fn new_adapter_reports_orientation_and_resolution() {
        let old = snapshot(&[("A", state(1920, 1080, Orientation::Landscape))]);
        let new = snapshot(&[
            ("A", state(1920, 1080, Orientation::Landscape)),
            ("B", state(2560, 1440, Orientation::Landscape)),
        ]);

        assert_eq!(
            diff_snapshots(&old, &new),
            vec![
                MonitorEvent::OrientationChanged {
                    device_name: "B".into(),
                    orientation: Orientation::Landscape,
                },
                MonitorEvent::ResolutionChanged {
                    device_name: "B".into(),
                    width: 2560,
                    height: 1440,
                },
                MonitorEvent::DisplaySettingsChanged,
            ]
        );
    }

    #[test]
    fn rotation_alone_reports_orientation_only() {
        let old = snapshot(&[("A", state(1920, 1080, Orientation::Landscape))]);
        let new = snapshot(&[("A", state(1920, 1080, Orientation::Portrait))]);

        assert_eq!(
            diff_snapshots(&old, &new),
            vec![
                MonitorEvent::OrientationChanged {
                    device_name: "A".into(),
                    orientation: Orientation::Portrait,
                },
                MonitorEvent::DisplaySettingsChanged,
            ]
        );
    }

    #[test]
    fn unchanged_and_removed_adapters_report_only_settings_changed() {
        let old = snapshot(&[
            ("A", state(1920, 1080, Orientation::Landscape)),
            ("B", state(1280, 1024, Orientation::Landscape)),
        ]);
        let new = snapshot(&[("A", state(1920, 1080, Orientation::Landscape))]);

        assert_eq!(diff_snapshots(&old, &new), vec![MonitorEvent::DisplaySettingsChanged]);
    }

    #[test]
    fn failed_capture_keeps_previous_snapshot() {
        let fail = Arc::new(AtomicBool::new(false));
        let fail_in_source = Arc::clone(&fail);
        let watcher = MonitorWatcher::new(move || {
            if fail_in_source.load(Ordering::SeqCst) {
                Err(DisplayError::native("EnumDisplaySettingsW", "device gone"))
            } else {
                Ok(snapshot(&[("A", state(800, 600, Orientation::Landscape))]))
            }
        });

        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        watcher.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let before = watcher.snapshot();
        fail.store(true, Ordering::SeqCst);
        watcher.handle_notification(Notification::DisplaySettingsChanged);

        assert!(Arc::ptr_eq(&before, &watcher.snapshot()));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn power_and_device_notifications_skip_the_snapshot() {
        let captures = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&captures);
        let watcher = MonitorWatcher::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Snapshot::new())
        });

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        watcher.subscribe(move |event| sink.lock().unwrap().push(event.clone()));

        watcher.handle_notification(Notification::PowerChanged(false));
        watcher.handle_notification(Notification::PowerChanged(true));
        watcher.handle_notification(Notification::DeviceArrived("\\\\?\\DISPLAY#X".into()));
        watcher.handle_notification(Notification::DeviceRemoved("\\\\?\\DISPLAY#X".into()));

        assert_eq!(captures.load(Ordering::SeqCst), 1);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                MonitorEvent::MonitorPoweredOff,
                MonitorEvent::MonitorPoweredOn,
                MonitorEvent::MonitorConnected {
                    device_path: "\\\\?\\DISPLAY#X".into()
                },
                MonitorEvent::MonitorDisconnected {
                    device_path: "\\\\?\\DISPLAY#X".into()
                },
            ]
        );
    }
}
