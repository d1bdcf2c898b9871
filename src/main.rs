#![windows_subsystem = "windows"]

use std::path::{Path, PathBuf};

use sentinel_display::{
	data_loaders::config::DisplayConfig,
	logging,
	utility::{addon_root_dir, sentinel_addons_dir},
	ADDON_NAME, DEBUG_NAME,
};

fn addon_config_path() -> PathBuf {
	if let Some(root) = addon_root_dir() {
		let candidate = root.join("config.yaml");
		if candidate.exists() {
			return candidate;
		}
	}

	if let Some(addons_dir) = sentinel_addons_dir() {
		return addons_dir.join(ADDON_NAME).join("config.yaml");
	}

	PathBuf::from("config.yaml")
}

fn load_config(path: &Path) -> DisplayConfig {
	DisplayConfig::load(path).unwrap_or_default()
}

fn apply_logging(config: &DisplayConfig) {
	logging::set_debug(config.debug);
	logging::set_level(&config.log_level);
}

#[cfg(not(windows))]
fn main() {
	logging::init(false, "warn");
	let config = load_config(&addon_config_path());
	apply_logging(&config);

	sentinel_display::error!(
		"[{}] Monitor management needs the Windows desktop; exiting",
		DEBUG_NAME
	);
}

#[cfg(windows)]
fn main() -> windows::core::Result<()> {
	runner::run()
}

#[cfg(windows)]
mod runner {
	use std::{
		fs, thread,
		time::{Duration, Instant, SystemTime},
	};

	use windows::Win32::UI::HiDpi::{
		SetProcessDpiAwarenessContext, DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2,
	};
	use windows::Win32::UI::WindowsAndMessaging::{
		DispatchMessageW, PeekMessageW, TranslateMessage, MSG, PM_REMOVE, WM_QUIT,
	};

	use sentinel_display::{
		data_loaders::config::{DisplayConfig, WatcherSettings},
		error, info,
		service::SystemMonitorService,
		warn, MonitorEvent, MonitorWatcher, WallpaperHistory,
	};

	use super::*;

	const CONFIG_POLL_INTERVAL: Duration = Duration::from_secs(1);

	fn config_modified(path: &Path) -> Option<SystemTime> {
		fs::metadata(path).and_then(|m| m.modified()).ok()
	}

	fn enable_per_monitor_dpi_awareness() {
		unsafe {
			if SetProcessDpiAwarenessContext(DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2).is_err() {
				warn!(
					"[{}] Failed to set process DPI awareness to PerMonitorV2; monitor bounds may be scaled",
					DEBUG_NAME
				);
			}
		}
	}

	fn build_service(config: &DisplayConfig) -> SystemMonitorService {
		let history = WallpaperHistory::from_env(config.settings.history.path.as_deref());
		SystemMonitorService::system(history)
			.with_history_recording(config.settings.history.enabled)
			.with_download_timeout(Duration::from_millis(config.settings.network.download_timeout_ms))
	}

	fn log_inventory(service: &SystemMonitorService) {
		let monitors = service.get_monitors();
		info!("[{}][MONITORS] {} monitor slot(s)", DEBUG_NAME, monitors.len());

		for monitor in &monitors {
			info!(
				"[{}][MONITORS] #{} id='{}' adapter='{}' ({}) bounds={} primary={} wallpaper='{}' position={}",
				DEBUG_NAME,
				monitor.index,
				monitor.device_id,
				monitor.device_name,
				monitor.device_string,
				monitor.bounds,
				monitor.is_primary(),
				monitor.wallpaper,
				monitor.wallpaper_position
			);
		}
	}

	fn log_event(event: &MonitorEvent) {
		match event {
			MonitorEvent::OrientationChanged {
				device_name,
				orientation,
			} => info!("[{}][EVENT] {} orientation -> {}", DEBUG_NAME, device_name, orientation),
			MonitorEvent::ResolutionChanged {
				device_name,
				width,
				height,
			} => info!("[{}][EVENT] {} resolution -> {}x{}", DEBUG_NAME, device_name, width, height),
			MonitorEvent::DisplaySettingsChanged => {
				info!("[{}][EVENT] Display settings changed", DEBUG_NAME)
			}
			MonitorEvent::MonitorPoweredOn => info!("[{}][EVENT] Monitors powered on", DEBUG_NAME),
			MonitorEvent::MonitorPoweredOff => info!("[{}][EVENT] Monitors powered off", DEBUG_NAME),
			MonitorEvent::MonitorConnected { device_path } => {
				warn!("[{}][EVENT] Monitor connected: {}", DEBUG_NAME, device_path)
			}
			MonitorEvent::MonitorDisconnected { device_path } => {
				warn!("[{}][EVENT] Monitor disconnected: {}", DEBUG_NAME, device_path)
			}
		}
	}

	fn start_watcher(settings: &WatcherSettings) -> Option<MonitorWatcher> {
		if !settings.enabled {
			info!("[{}][WATCHER] Disabled by config", DEBUG_NAME);
			return None;
		}

		let mut watcher = MonitorWatcher::system(settings);
		watcher.subscribe(log_event);
		match watcher.start() {
			Ok(()) => Some(watcher),
			Err(e) => {
				error!("[{}][WATCHER] Failed to start: {}", DEBUG_NAME, e);
				None
			}
		}
	}

	pub fn run() -> windows::core::Result<()> {
		logging::init(true, "info");
		enable_per_monitor_dpi_awareness();

		let config_path = addon_config_path();
		let mut config = load_config(&config_path);
		apply_logging(&config);

		std::panic::set_hook(Box::new(|panic_info| {
			error!("[{}] Panic: {}", DEBUG_NAME, panic_info);
		}));

		info!("!---------- [{}] Starting Display Addon ----------!", DEBUG_NAME);
		info!("[{}] Config loaded from {}", DEBUG_NAME, config_path.display());

		let mut service = build_service(&config);
		log_inventory(&service);

		let mut watcher = start_watcher(&config.settings.watcher);

		let mut loop_sleep = Duration::from_millis(config.settings.runtime.tick_sleep_ms);
		let mut last_config_check = Instant::now();
		let mut last_config_modified = config_modified(&config_path);

		loop {
			unsafe {
				let mut msg = MSG::default();
				while PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE).as_bool() {
					if msg.message == WM_QUIT {
						warn!("[{}] WM_QUIT received; stopping watcher", DEBUG_NAME);
						if let Some(mut watcher) = watcher.take() {
							watcher.stop();
						}
						return Ok(());
					}
					let _ = TranslateMessage(&msg);
					DispatchMessageW(&msg);
				}
			}

			if config.settings.runtime.config_reload && last_config_check.elapsed() >= CONFIG_POLL_INTERVAL {
				last_config_check = Instant::now();

				let current_modified = config_modified(&config_path);
				let changed = match (last_config_modified, current_modified) {
					(Some(prev), Some(curr)) => curr > prev,
					(None, Some(_)) => true,
					_ => false,
				};

				if changed {
					sentinel_display::data_loaders::yaml::invalidate(&config_path);
					match DisplayConfig::load(&config_path) {
						Some(new_config) => {
							let watcher_changed = new_config.settings.watcher != config.settings.watcher;
							config = new_config;
							apply_logging(&config);
							service = build_service(&config);
							loop_sleep = Duration::from_millis(config.settings.runtime.tick_sleep_ms);

							if watcher_changed {
								if let Some(mut old) = watcher.take() {
									old.stop();
								}
								watcher = start_watcher(&config.settings.watcher);
							}

							warn!(
								"[{}][CONFIG] Reloaded config from {}",
								DEBUG_NAME,
								config_path.display()
							);
							log_inventory(&service);
						}
						None => {
							warn!(
								"[{}][CONFIG] Detected config change but failed to parse {}; keeping previous config",
								DEBUG_NAME,
								config_path.display()
							);
						}
					}

					last_config_modified = current_modified;
				}
			}

			thread::sleep(loop_sleep);
		}
	}
}
