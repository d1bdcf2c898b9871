use std::path::Path;

use serde_yaml::{Mapping, Value};

use super::yaml::load_yaml;

#[derive(Debug, Clone)]
pub struct DisplayConfig {
    pub debug: bool,
    pub log_level: String,
    pub settings: DisplaySettings,
}

#[derive(Debug, Clone, Default)]
pub struct DisplaySettings {
    pub watcher: WatcherSettings,
    pub history: HistorySettings,
    pub network: NetworkSettings,
    pub runtime: RuntimeSettings,
    pub development: DevelopmentSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatcherSettings {
    pub enabled: bool,
    pub display_events: bool,
    pub power_events: bool,
    pub device_events: bool,
}

#[derive(Debug, Clone)]
pub struct HistorySettings {
    pub enabled: bool,
    pub path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NetworkSettings {
    pub download_timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub tick_sleep_ms: u64,
    pub config_reload: bool,
}

#[derive(Debug, Clone)]
pub struct DevelopmentSettings {
    pub debug: bool,
    pub log_level: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        let settings = DisplaySettings::default();
        Self {
            debug: settings.development.debug,
            log_level: settings.development.log_level.clone(),
            settings,
        }
    }
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            display_events: true,
            power_events: true,
            device_events: true,
        }
    }
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            download_timeout_ms: 30_000,
        }
    }
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            tick_sleep_ms: 50,
            config_reload: true,
        }
    }
}

impl Default for DevelopmentSettings {
    fn default() -> Self {
        Self {
            debug: false,
            log_level: "warn".to_string(),
        }
    }
}

impl DisplayConfig {
    pub fn load(path: &Path) -> Option<Self> {
        let value = load_yaml(path)?;
        Self::from_yaml(&value)
    }

    pub fn from_yaml(root: &Value) -> Option<Self> {
        let map = root.as_mapping()?;

        let settings = parse_settings(map);
        let debug = settings.development.debug;
        let log_level = settings.development.log_level.clone();

        Some(Self {
            debug,
            log_level,
            settings,
        })
    }
}

fn parse_settings(root: &Mapping) -> DisplaySettings {
    let mut settings = DisplaySettings::default();

    settings.development.debug = bool_at(root, "debug").unwrap_or(settings.development.debug);
    settings.development.log_level = str_at(root, "log_level")
        .unwrap_or(&settings.development.log_level)
        .to_lowercase();

    let settings_map = mapping_at(root, "settings");
    let watcher_map = settings_map.and_then(|v| mapping_at(v, "watcher"));
    let history_map = settings_map.and_then(|v| mapping_at(v, "history"));
    let network_map = settings_map.and_then(|v| mapping_at(v, "network"));
    let runtime_map = settings_map.and_then(|v| mapping_at(v, "runtime"));
    let development_map = settings_map.and_then(|v| mapping_at(v, "development"));

    if let Some(watcher) = watcher_map {
        settings.watcher.enabled = bool_any(watcher, &["enabled", "watch", "monitor_changes"])
            .unwrap_or(settings.watcher.enabled);
        settings.watcher.display_events = bool_any(
            watcher,
            &["display_events", "display_changes", "settings_changes"],
        )
        .unwrap_or(settings.watcher.display_events);
        settings.watcher.power_events = bool_any(watcher, &["power_events", "power", "monitor_power"])
            .unwrap_or(settings.watcher.power_events);
        settings.watcher.device_events = bool_any(
            watcher,
            &["device_events", "devices", "connect_events", "hotplug"],
        )
        .unwrap_or(settings.watcher.device_events);
    }

    if let Some(history) = history_map {
        settings.history.enabled = bool_any(history, &["enabled", "record"])
            .unwrap_or(settings.history.enabled);
        settings.history.path = str_any(history, &["path", "file"])
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);
    }

    if let Some(network) = network_map {
        settings.network.download_timeout_ms =
            u64_any(network, &["download_timeout_ms", "timeout_ms", "request_timeout_ms"])
                .unwrap_or(settings.network.download_timeout_ms)
                .max(1_000);
    }

    if let Some(runtime) = runtime_map {
        settings.runtime.tick_sleep_ms = u64_at(runtime, "tick_sleep_ms")
            .unwrap_or(settings.runtime.tick_sleep_ms)
            .max(1);
        settings.runtime.config_reload = bool_any(runtime, &["config_reload", "live_reload", "auto_reload"])
            .unwrap_or(settings.runtime.config_reload);
    }

    if let Some(dev) = development_map {
        settings.development.debug = bool_any(dev, &["debug", "debug_mode"]).unwrap_or(settings.development.debug);
        settings.development.log_level = str_any(dev, &["log_level", "logging"]).unwrap_or("warn").to_lowercase();
    }

    settings
}

fn bool_at(map: &Mapping, key: &str) -> Option<bool> {
    map.get(Value::String(key.to_string()))?.as_bool()
}

fn bool_any(map: &Mapping, keys: &[&str]) -> Option<bool> {
    keys.iter().find_map(|k| bool_at(map, k))
}

fn str_at<'a>(map: &'a Mapping, key: &str) -> Option<&'a str> {
    map.get(Value::String(key.to_string()))?.as_str()
}

fn str_any<'a>(map: &'a Mapping, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| str_at(map, k))
}

fn mapping_at<'a>(map: &'a Mapping, key: &str) -> Option<&'a Mapping> {
    map.get(Value::String(key.to_string()))?.as_mapping()
}

fn u64_at(map: &Mapping, key: &str) -> Option<u64> {
    map.get(Value::String(key.to_string()))?
        .as_i64()
        .and_then(|v| if v >= 0 { Some(v as u64) } else { None })
}

fn u64_any(map: &Mapping, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|k| u64_at(map, k))
}
