// ~/Sentinel/sentinel-addons/display/src/handles.rs

use crate::{
    backend::NativeDisplayBackend,
    error::{DisplayError, Result},
    model::{LogicalMonitor, PhysicalMonitor},
    warn, DEBUG_NAME,
};

/// Physical monitor handles opened under one logical monitor.
///
/// The handles are destroyed when the set is dropped, on success and error
/// paths alike. A failed destroy is logged and otherwise ignored.
pub struct PhysicalMonitorSet<'a, N: NativeDisplayBackend> {
    native: &'a N,
    monitors: Vec<PhysicalMonitor>,
}

impl<'a, N: NativeDisplayBackend> PhysicalMonitorSet<'a, N> {
    pub fn open(native: &'a N, monitor: &LogicalMonitor) -> Result<Self> {
        let monitors = native.open_physical_monitors(monitor)?;
        Ok(Self { native, monitors })
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    /// Only the first physical monitor is addressed; logical monitors that
    /// span several panels are not disambiguated.
    pub fn first(&self) -> Result<&PhysicalMonitor> {
        self.monitors
            .first()
            .ok_or_else(|| DisplayError::not_found("physical monitor handle not found"))
    }
}

impl<N: NativeDisplayBackend> Drop for PhysicalMonitorSet<'_, N> {
    fn drop(&mut self) {
        if self.monitors.is_empty() {
            return;
        }

        if let Err(e) = self.native.destroy_physical_monitors(&self.monitors) {
            warn!(
                "[{}][BRIGHTNESS] Failed to destroy {} physical monitor handle(s): {}",
                DEBUG_NAME,
                self.monitors.len(),
                e
            );
        }
        self.monitors.clear();
    }
}
