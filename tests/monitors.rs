//! Monitor enumeration, mode changes and brightness against the fake desktop.

mod common;

use std::sync::atomic::Ordering;

use common::*;
use sentinel_display::{
    model::{Bounds, ModeChange, ModeChangeResult, Orientation},
    DisplayError,
};

#[test]
fn three_slots_yield_two_connected_monitors() {
    let (_dir, service) = service();

    let monitors = service.get_monitors();
    assert_eq!(monitors.len(), 3);
    assert_eq!(monitors[0].device_id, ID_A);
    assert_eq!(monitors[1].device_id, "");
    assert_eq!(monitors[2].device_id, ID_B);

    let connected = service.get_monitors_connected();
    let ids: Vec<_> = connected.iter().map(|m| m.device_id.as_str()).collect();
    assert_eq!(ids, vec![ID_A, ID_B]);
}

#[test]
fn connected_monitors_never_have_empty_ids() {
    let (_dir, service) = service_with_paths(&["", ID_A, "", "", ID_B, ""]);
    service.native().adapters.lock().unwrap().truncate(2);

    let connected = service.get_monitors_connected();
    assert_eq!(connected.len(), 2);
    assert!(connected.iter().all(|m| !m.device_id.is_empty()));
}

#[test]
fn slots_take_adapter_metadata_by_index() {
    let (_dir, service) = service();
    let monitors = service.get_monitors();

    assert_eq!(monitors[0].device_name, ADAPTER_1);
    assert!(monitors[0].is_primary());
    assert_eq!(monitors[0].bounds, Bounds::new(0, 0, 1920, 1080));
    assert_eq!(monitors[0].wallpaper, "C:\\wall\\a.jpg");

    assert_eq!(monitors[1].device_name, ADAPTER_2);
    assert_eq!(monitors[1].bounds, Bounds::default());
    assert!(monitors[1].wallpaper.is_empty());

    assert_eq!(monitors[2].device_name, ADAPTER_3);
    assert_eq!(monitors[2].bounds, Bounds::new(1920, 0, 4480, 1440));
}

#[test]
fn failing_primary_falls_back_to_native_enumeration() {
    let (_dir, service) = service();
    service.primary().fail(true);

    let monitors = service.get_monitors();
    assert_eq!(monitors.len(), 2);
    assert_eq!(monitors[0].device_id, ID_A);
    assert_eq!(monitors[0].device_name, ADAPTER_1);
    assert_eq!(monitors[1].device_id, ID_B);
    assert_eq!(monitors[1].bounds, Bounds::new(1920, 0, 4480, 1440));
    assert!(monitors.iter().all(|m| m.wallpaper == "C:\\Windows\\Web\\img0.jpg"));
}

#[test]
fn get_monitors_swallows_failure_of_both_paths() {
    let (_dir, service) = service();
    service.primary().fail(true);
    service.native().fail_enumeration.store(true, Ordering::SeqCst);

    assert!(service.get_monitors().is_empty());
    assert!(service.get_monitors_connected().is_empty());
    assert!(service.get_primary_monitor().is_none());
}

#[test]
fn adapter_failure_discards_primary_results() {
    let (_dir, service) = service();
    service.native().fail_enumeration.store(true, Ordering::SeqCst);

    // Neither path can complete, so nothing half-built leaks out.
    assert!(service.get_monitors().is_empty());
}

#[test]
fn lookup_by_id() {
    let (_dir, service) = service();

    assert_eq!(service.get_monitor(ID_B).unwrap().device_name, ADAPTER_3);
    assert_eq!(service.get_primary_monitor().unwrap().device_id, ID_A);
    assert!(service.get_monitor("missing").unwrap_err().is_not_found());
    assert!(service.get_monitor("").unwrap_err().is_not_found());
}

#[test]
fn position_change_targets_the_adapter_with_matching_geometry() {
    let (_dir, service) = service();

    service.set_monitor_position(ID_B, -2560, 0, 0, 1440).unwrap();

    let applied = service.native().applied.lock().unwrap().clone();
    assert_eq!(applied.len(), 1);
    let (adapter, mode, change, persist) = &applied[0];
    assert_eq!(adapter, ADAPTER_3);
    assert_eq!((mode.x, mode.y), (-2560, 0));
    assert_eq!((mode.width, mode.height), (2560, 1440));
    assert_eq!(*change, ModeChange::Position);
    assert!(!persist);
}

#[test]
fn position_change_prefers_first_adapter_on_duplicate_geometry() {
    let (_dir, service) = service();
    // Adapter 2 is attached and reports the same geometry as adapter 3.
    service.native().adapters.lock().unwrap()[1].state_flags.0 |=
        sentinel_display::model::StateFlags::ATTACHED_TO_DESKTOP;
    service.native().set_mode(ADAPTER_2, mode(1920, 0, 2560, 1440));

    service.set_monitor_position(ID_B, 0, 1080, 2560, 2520).unwrap();

    let applied = service.native().applied.lock().unwrap().clone();
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].0, ADAPTER_2);
}

#[test]
fn position_change_without_geometry_match_is_not_found() {
    let (_dir, service) = service();
    service.native().set_mode(ADAPTER_3, mode(1920, 0, 1280, 1024));

    let err = service.set_monitor_position(ID_B, 0, 0, 1280, 1024).unwrap_err();
    assert!(err.is_not_found());
    assert!(service.native().applied.lock().unwrap().is_empty());
}

#[test]
fn rejected_position_change_is_an_error() {
    let (_dir, service) = service();
    *service.native().apply_result.lock().unwrap() = ModeChangeResult::RestartRequired;

    let err = service.set_monitor_position(ID_A, 10, 10, 1930, 1090).unwrap_err();
    assert!(matches!(err, DisplayError::Unsupported { code: 1, .. }));
}

#[test]
fn resolution_change_is_persisted() {
    let (_dir, service) = service();

    service.set_monitor_resolution(ID_A, 2560, 1440).unwrap();

    let applied = service.native().applied.lock().unwrap().clone();
    let (adapter, mode, change, persist) = &applied[0];
    assert_eq!(adapter, ADAPTER_1);
    assert_eq!((mode.width, mode.height), (2560, 1440));
    assert_eq!(*change, ModeChange::Resolution);
    assert!(persist);
}

#[test]
fn restart_required_is_accepted_for_persisted_changes() {
    let (_dir, service) = service();
    *service.native().apply_result.lock().unwrap() = ModeChangeResult::RestartRequired;

    assert!(service.set_monitor_resolution(ID_A, 1280, 720).is_ok());
}

#[test]
fn bad_mode_carries_native_code() {
    let (_dir, service) = service();
    *service.native().apply_result.lock().unwrap() = ModeChangeResult::BadMode;

    let err = service.set_monitor_resolution(ID_A, 7, 7).unwrap_err();
    assert!(matches!(
        err,
        DisplayError::Unsupported {
            operation: "SetMonitorResolution",
            code: -2
        }
    ));
}

#[test]
fn rotating_to_portrait_swaps_dimensions() {
    let (_dir, service) = service();

    service.set_monitor_orientation(ID_B, Orientation::Portrait).unwrap();

    let applied = service.native().applied.lock().unwrap().clone();
    let (adapter, mode, change, persist) = &applied[0];
    assert_eq!(adapter, ADAPTER_3);
    assert_eq!(mode.orientation, Orientation::Portrait);
    assert_eq!((mode.width, mode.height), (1440, 2560));
    assert_eq!(*change, ModeChange::Orientation);
    assert!(persist);
}

#[test]
fn flipping_landscape_keeps_dimensions() {
    let (_dir, service) = service();

    service
        .set_monitor_orientation(ID_A, Orientation::LandscapeFlipped)
        .unwrap();

    let applied = service.native().applied.lock().unwrap().clone();
    assert_eq!((applied[0].1.width, applied[0].1.height), (1920, 1080));
}

#[test]
fn unknown_monitor_mode_changes_are_not_found() {
    let (_dir, service) = service();

    assert!(service.set_monitor_resolution("nope", 1, 1).unwrap_err().is_not_found());
    assert!(service
        .set_monitor_orientation("nope", Orientation::Portrait)
        .unwrap_err()
        .is_not_found());
}

#[test]
fn brightness_round_trip_releases_handles() {
    let (_dir, service) = service();

    let before = service.get_monitor_brightness(ID_A).unwrap();
    assert_eq!((before.minimum, before.current, before.maximum), (0, 40, 100));
    assert_eq!(service.native().open_handle_count(), 0);

    service.set_monitor_brightness(ID_A, 75).unwrap();
    assert_eq!(service.native().open_handle_count(), 0);
    assert_eq!(service.get_monitor_brightness(ID_A).unwrap().current, 75);
}

#[test]
fn brightness_without_physical_handle_is_not_found() {
    let (_dir, service) = service();

    let err = service.get_monitor_brightness(ID_B).unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(service.native().open_handle_count(), 0);

    let err = service.set_monitor_brightness(ID_B, 10).unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(service.native().open_handle_count(), 0);
}

#[test]
fn brightness_failure_still_releases_handles() {
    let (_dir, service) = service();
    service.native().brightness.lock().unwrap().clear();

    assert!(service.get_monitor_brightness(ID_A).is_err());
    assert_eq!(service.native().open_handle_count(), 0);
}

#[test]
fn brightness_for_monitor_without_logical_handle_is_not_found() {
    let (_dir, service) = service();
    service.native().logical.lock().unwrap().clear();

    assert!(service.get_monitor_brightness(ID_A).unwrap_err().is_not_found());
    assert_eq!(service.native().open_handle_count(), 0);
}
