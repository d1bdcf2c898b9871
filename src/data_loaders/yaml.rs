// ~/Sentinel/sentinel-addons/display/src/data_loaders/yaml.rs

use std::{
    fs,
    sync::{RwLock, LazyLock},
    time::{Duration, Instant},
    path::Path,
    collections::HashMap,
};

use serde_yaml::Value;

/* =========================
   CONFIG CACHE
========================= */


// Per-file cache for YAML data
static YAML_CACHE: LazyLock<RwLock<HashMap<String, (Value, Instant)>>> = LazyLock::new(|| RwLock::new(HashMap::new()));
const CACHE_TTL: Duration = Duration::from_secs(1);
const CACHE_CAPACITY: usize = 16;

/// YAML loader with a short per-file cache so hot-reload polling does not
/// re-parse an unchanged file on every tick.
pub fn load_yaml(path: &Path) -> Option<Value> {
    let now = Instant::now();
    let key = path.to_string_lossy().to_string();
    {
        let cache = YAML_CACHE.read().unwrap_or_else(|e| e.into_inner());
        if let Some((v, t)) = cache.get(&key) {
            if now.duration_since(*t) < CACHE_TTL {
                return Some(v.clone());
            }
        }
    }

    let txt = fs::read_to_string(path).ok()?;
    let v = parse_yaml(&txt)?;
    let mut cache = YAML_CACHE.write().unwrap_or_else(|e| e.into_inner());

    if cache.len() >= CACHE_CAPACITY {
        if let Some(oldest_key) = cache
            .iter()
            .min_by_key(|(_, (_, t))| t)
            .map(|(k, _)| k.clone())
        {
            cache.remove(&oldest_key);
        }
    }

    cache.insert(key, (v.clone(), now));
    Some(v)
}

pub fn parse_yaml(text: &str) -> Option<Value> {
    serde_yaml::from_str(text).ok()
}

/// Drops any cached copy so the next load re-reads the file.
pub fn invalidate(path: &Path) {
    let key = path.to_string_lossy().to_string();
    let mut cache = YAML_CACHE.write().unwrap_or_else(|e| e.into_inner());
    cache.remove(&key);
}
