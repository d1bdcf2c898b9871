// ~/Sentinel/sentinel-addons/display/src/backend/memory.rs

use std::{collections::HashMap, sync::Mutex};

use super::{Hive, SettingsStore};
use crate::error::{DisplayError, Result};

/// In-process settings store. Used where no registry exists and by tests.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    values: Mutex<HashMap<(Hive, String, String), String>>,
    read_only: bool,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose writes fail, mimicking a key the user cannot open for writing.
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Self::default()
        }
    }

    fn key(hive: Hive, key: &str, value: &str) -> (Hive, String, String) {
        (hive, key.to_ascii_lowercase(), value.to_ascii_lowercase())
    }
}

impl SettingsStore for MemorySettingsStore {
    fn read_string(&self, hive: Hive, key: &str, value: &str) -> Result<Option<String>> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(&Self::key(hive, key, value)).cloned())
    }

    fn write_string(&self, hive: Hive, key: &str, value: &str, data: &str) -> Result<()> {
        if self.read_only {
            return Err(DisplayError::Registry(format!("access denied writing {key}\\{value}")));
        }
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(Self::key(hive, key, value), data.to_string());
        Ok(())
    }
}
