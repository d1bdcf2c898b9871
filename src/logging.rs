use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, AtomicU8, Ordering},
        mpsc::{self, Sender},
        Mutex, OnceLock,
    },
    thread,
};

use crate::utility::sentinel_root_dir;

/* =========================
   GLOBAL STATE
   ========================= */

static ENABLED: AtomicBool = AtomicBool::new(false);
static LEVEL: AtomicU8 = AtomicU8::new(LEVEL_WARN);
static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();
static LOG_TX: OnceLock<Mutex<Sender<String>>> = OnceLock::new();

const LEVEL_ERROR: u8 = 0;
const LEVEL_WARN: u8 = 1;
const LEVEL_INFO: u8 = 2;
const LEVEL_DEBUG: u8 = 3;

/* =========================
   PUBLIC API
   ========================= */

/// Starts the file writer thread. Returns `false` if logging was already
/// initialised; the first sink stays in place.
pub fn init(debug: bool, level: &str) -> bool {
    if LOG_TX.get().is_some() {
        return false;
    }

    ENABLED.store(debug, Ordering::Relaxed);
    set_level(level);
    let path = log_path().clone();
    let (tx, rx) = mpsc::channel::<String>();
    if LOG_TX.set(Mutex::new(tx)).is_err() {
        return false;
    }

    thread::spawn(move || {
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }

        let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&path) else {
            return;
        };

        while let Ok(line) = rx.recv() {
            let _ = writeln!(file, "{line}");
            let _ = file.flush();
        }
    });

    true
}

pub fn set_debug(debug: bool) {
    ENABLED.store(debug, Ordering::Relaxed);
}

pub fn set_level(level: &str) {
    let parsed = match level.trim().to_lowercase().as_str() {
        "error" => LEVEL_ERROR,
        "info" => LEVEL_INFO,
        "debug" | "trace" => LEVEL_DEBUG,
        _ => LEVEL_WARN,
    };
    LEVEL.store(parsed, Ordering::Relaxed);
}

#[inline]
pub fn should_log(level: &str) -> bool {
    let wanted = match level {
        "ERROR" => LEVEL_ERROR,
        "WARN" => LEVEL_WARN,
        "INFO" => LEVEL_INFO,
        _ => LEVEL_DEBUG,
    };

    if wanted <= LEVEL_WARN {
        return true;
    }

    if ENABLED.load(Ordering::Relaxed) && wanted == LEVEL_INFO {
        return true;
    }

    wanted <= LEVEL.load(Ordering::Relaxed)
}

/* =========================
   INTERNAL
   ========================= */

#[inline]
pub fn enqueue(level: &str, msg: String) {
    if let Some(tx) = LOG_TX.get() {
        let ts = timestamp();
        if let Ok(tx) = tx.lock() {
            let _ = tx.send(format!("{ts} [{level}] {msg}"));
        }
    }
}

fn timestamp() -> String {
    let now = chrono::Local::now();
    now.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

/* =========================
   MACROS
   ========================= */

#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {{
        if $crate::logging::should_log("DEBUG") {
            $crate::logging::enqueue(
                "DEBUG",
                format!($($arg)*)
            );
        }
    }};
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {{
        if $crate::logging::should_log("INFO") {
            $crate::logging::enqueue(
                "INFO",
                format!($($arg)*)
            );
        }
    }};
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {{
        $crate::logging::enqueue(
            "WARN",
            format!($($arg)*)
        );
    }};
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {{
        $crate::logging::enqueue(
            "ERROR",
            format!($($arg)*)
        );
    }};
}

/* =========================
   PATH
   ========================= */

fn log_path() -> &'static PathBuf {
    LOG_PATH.get_or_init(|| {
        sentinel_root_dir()
            .map(|p| p.join("sentinel.display.log"))
            .unwrap_or_else(|| PathBuf::from("sentinel.display.log"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_and_errors_always_pass() {
        assert!(should_log("WARN"));
        assert!(should_log("ERROR"));
    }
}
