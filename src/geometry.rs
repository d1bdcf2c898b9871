// ~/Sentinel/sentinel-addons/display/src/geometry.rs

use crate::model::{Bounds, DisplayMode};

/// Returns the first candidate whose mode covers exactly `target`.
///
/// Monitor paths and adapter names live in separate namespaces, so the only
/// join available is geometry: origin and size must match in all four fields.
/// When two adapters report identical geometry, enumeration order decides.
pub fn first_exact_bounds_match<T>(
    candidates: impl IntoIterator<Item = (T, DisplayMode)>,
    target: &Bounds,
) -> Option<(T, DisplayMode)> {
    candidates
        .into_iter()
        .find(|(_, mode)| mode_matches_bounds(mode, target))
}

pub fn mode_matches_bounds(mode: &DisplayMode, target: &Bounds) -> bool {
    mode.x == target.left
        && mode.y == target.top
        && mode.width == target.width()
        && mode.height == target.height()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mode(x: i32, y: i32, width: u32, height: u32) -> DisplayMode {
        DisplayMode {
            x,
            y,
            width,
            height,
            ..Default::default()
        }
    }

    #[test]
    fn picks_exact_match() {
        let target = Bounds::new(1920, 0, 3840, 1080);
        let found = first_exact_bounds_match(
            vec![("A", mode(0, 0, 1920, 1080)), ("B", mode(1920, 0, 1920, 1080))],
            &target,
        );
        assert_eq!(found.map(|(name, _)| name), Some("B"));
    }

    #[test]
    fn duplicate_geometry_resolves_to_first_enumerated() {
        let target = Bounds::new(0, 0, 1920, 1080);
        let found = first_exact_bounds_match(
            vec![
                ("mirror-1", mode(0, 0, 1920, 1080)),
                ("mirror-2", mode(0, 0, 1920, 1080)),
            ],
            &target,
        );
        assert_eq!(found.map(|(name, _)| name), Some("mirror-1"));
    }

    #[test]
    fn partial_matches_are_rejected() {
        let target = Bounds::new(0, 0, 1920, 1080);
        let found = first_exact_bounds_match(
            vec![
                ("same-origin", mode(0, 0, 2560, 1440)),
                ("same-size", mode(10, 0, 1920, 1080)),
            ],
            &target,
        );
        assert!(found.is_none());
    }
}
