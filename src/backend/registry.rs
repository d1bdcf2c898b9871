// ~/Sentinel/sentinel-addons/display/src/backend/registry.rs

use std::io::ErrorKind;

use winreg::{
    enums::{HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE},
    RegKey,
};

use super::{Hive, SettingsStore};
use crate::error::{DisplayError, Result};

/// Windows registry backed settings store.
#[derive(Debug, Default, Clone, Copy)]
pub struct RegistryStore;

impl RegistryStore {
    pub fn new() -> Self {
        Self
    }

    fn root(hive: Hive) -> RegKey {
        match hive {
            Hive::CurrentUser => RegKey::predef(HKEY_CURRENT_USER),
            Hive::LocalMachine => RegKey::predef(HKEY_LOCAL_MACHINE),
        }
    }
}

impl SettingsStore for RegistryStore {
    fn read_string(&self, hive: Hive, key: &str, value: &str) -> Result<Option<String>> {
        let subkey = match Self::root(hive).open_subkey(key) {
            Ok(k) => k,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(DisplayError::Registry(format!("open {key}: {e}"))),
        };

        match subkey.get_value::<String, _>(value) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(DisplayError::Registry(format!("read {key}\\{value}: {e}"))),
        }
    }

    fn write_string(&self, hive: Hive, key: &str, value: &str, data: &str) -> Result<()> {
        let (subkey, _) = Self::root(hive)
            .create_subkey(key)
            .map_err(|e| DisplayError::Registry(format!("create {key}: {e}")))?;

        subkey
            .set_value(value, &data)
            .map_err(|e| DisplayError::Registry(format!("write {key}\\{value}: {e}")))
    }
}
