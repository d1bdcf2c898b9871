// ~/Sentinel/sentinel-addons/display/src/registry_fallback.rs
//
// Registry persistence used when the desktop wallpaper interface cannot be
// reached: wallpaper style, background color and the lock-screen image.

use crate::{
    backend::{Hive, SettingsStore},
    error::{DisplayError, Result},
    model::{Color, WallpaperPosition},
};

const DESKTOP_KEY: &str = "Control Panel\\Desktop";
const COLORS_KEY: &str = "Control Panel\\Colors";
const PERSONALIZATION_POLICY_KEY: &str = "SOFTWARE\\Policies\\Microsoft\\Windows\\Personalization";

const STYLE_VALUE: &str = "WallpaperStyle";
const TILE_VALUE: &str = "TileWallpaper";
const BACKGROUND_VALUE: &str = "Background";
const LOCK_SCREEN_VALUE: &str = "LockScreenImage";

pub struct RegistryFallback<S> {
    store: S,
}

impl<S: SettingsStore> RegistryFallback<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn wallpaper_position(&self) -> Result<WallpaperPosition> {
        let style = self.store.read_string(Hive::CurrentUser, DESKTOP_KEY, STYLE_VALUE)?;
        let tile = self.store.read_string(Hive::CurrentUser, DESKTOP_KEY, TILE_VALUE)?;
        Ok(position_from_style(style.as_deref(), tile.as_deref()))
    }

    pub fn set_wallpaper_position(&self, position: WallpaperPosition) -> Result<()> {
        let (style, tile) = style_for_position(position);
        self.store
            .write_string(Hive::CurrentUser, DESKTOP_KEY, STYLE_VALUE, style)?;
        self.store
            .write_string(Hive::CurrentUser, DESKTOP_KEY, TILE_VALUE, tile)
    }

    pub fn background_color(&self) -> Result<Color> {
        let raw = self
            .store
            .read_string(Hive::CurrentUser, COLORS_KEY, BACKGROUND_VALUE)?;
        match raw {
            Some(raw) => parse_rgb_triplet(&raw).ok_or_else(|| {
                DisplayError::Registry(format!("malformed background color '{raw}'"))
            }),
            None => Ok(Color::default()),
        }
    }

    pub fn set_background_color(&self, color: Color) -> Result<()> {
        self.store.write_string(
            Hive::CurrentUser,
            COLORS_KEY,
            BACKGROUND_VALUE,
            &format_rgb_triplet(color),
        )
    }

    pub fn logon_wallpaper(&self) -> Result<Option<String>> {
        Ok(self
            .store
            .read_string(Hive::LocalMachine, PERSONALIZATION_POLICY_KEY, LOCK_SCREEN_VALUE)?
            .filter(|p| !p.trim().is_empty()))
    }

    pub fn set_logon_wallpaper(&self, path: &str) -> Result<()> {
        self.store.write_string(
            Hive::LocalMachine,
            PERSONALIZATION_POLICY_KEY,
            LOCK_SCREEN_VALUE,
            path,
        )
    }
}

/// (WallpaperStyle, TileWallpaper) pair for a position.
pub fn style_for_position(position: WallpaperPosition) -> (&'static str, &'static str) {
    match position {
        WallpaperPosition::Center => ("0", "0"),
        WallpaperPosition::Tile => ("0", "1"),
        WallpaperPosition::Stretch => ("2", "0"),
        WallpaperPosition::Fit => ("6", "0"),
        WallpaperPosition::Fill => ("10", "0"),
        WallpaperPosition::Span => ("22", "0"),
    }
}

/// The tile flag wins over the style value; unknown styles read as Center.
pub fn position_from_style(style: Option<&str>, tile: Option<&str>) -> WallpaperPosition {
    if tile.map(str::trim) == Some("1") {
        return WallpaperPosition::Tile;
    }

    match style.map(str::trim) {
        Some("2") => WallpaperPosition::Stretch,
        Some("6") => WallpaperPosition::Fit,
        Some("10") => WallpaperPosition::Fill,
        Some("22") => WallpaperPosition::Span,
        _ => WallpaperPosition::Center,
    }
}

pub fn format_rgb_triplet(color: Color) -> String {
    format!("{} {} {}", color.r, color.g, color.b)
}

pub fn parse_rgb_triplet(raw: &str) -> Option<Color> {
    let mut parts = raw.split_whitespace().map(|p| p.parse::<u8>());
    let r = parts.next()?.ok()?;
    let g = parts.next()?.ok()?;
    let b = parts.next()?.ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(Color::new(r, g, b))
}
