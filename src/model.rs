// ~/Sentinel/sentinel-addons/display/src/model.rs

use std::{collections::BTreeMap, fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

/* =========================
   GEOMETRY
   ========================= */

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Bounds {
    /// Builds bounds from two corners, swapping edges so right >= left and bottom >= top.
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left: left.min(right),
            top: top.min(bottom),
            right: left.max(right),
            bottom: top.max(bottom),
        }
    }

    pub fn from_origin_size(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self::new(
            x,
            y,
            x.saturating_add(width.min(i32::MAX as u32) as i32),
            y.saturating_add(height.min(i32::MAX as u32) as i32),
        )
    }

    pub fn width(&self) -> u32 {
        (self.right - self.left).max(0) as u32
    }

    pub fn height(&self) -> u32 {
        (self.bottom - self.top).max(0) as u32
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[l={},t={},r={},b={}]",
            self.left, self.top, self.right, self.bottom
        )
    }
}

/* =========================
   DEVICE STATE
   ========================= */

/// Adapter state bits as reported by display device enumeration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateFlags(pub u32);

impl StateFlags {
    pub const ATTACHED_TO_DESKTOP: u32 = 0x0000_0001;
    pub const PRIMARY_DEVICE: u32 = 0x0000_0004;
    pub const MIRRORING_DRIVER: u32 = 0x0000_0008;
    pub const REMOVABLE: u32 = 0x0000_0020;

    pub fn contains(&self, bits: u32) -> bool {
        self.0 & bits == bits
    }

    pub fn is_attached(&self) -> bool {
        self.contains(Self::ATTACHED_TO_DESKTOP)
    }

    pub fn is_primary(&self) -> bool {
        self.contains(Self::PRIMARY_DEVICE)
    }

    pub fn is_removable(&self) -> bool {
        self.contains(Self::REMOVABLE)
    }
}

/* =========================
   WALLPAPER
   ========================= */

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WallpaperPosition {
    #[default]
    Center,
    Tile,
    Stretch,
    Fit,
    Fill,
    Span,
}

impl WallpaperPosition {
    pub const ALL: [WallpaperPosition; 6] = [
        WallpaperPosition::Center,
        WallpaperPosition::Tile,
        WallpaperPosition::Stretch,
        WallpaperPosition::Fit,
        WallpaperPosition::Fill,
        WallpaperPosition::Span,
    ];

    /// Index used by the desktop wallpaper interface (DWPOS_*).
    pub fn to_native(self) -> i32 {
        match self {
            Self::Center => 0,
            Self::Tile => 1,
            Self::Stretch => 2,
            Self::Fit => 3,
            Self::Fill => 4,
            Self::Span => 5,
        }
    }

    pub fn from_native(value: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.to_native() == value)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Center => "Center",
            Self::Tile => "Tile",
            Self::Stretch => "Stretch",
            Self::Fit => "Fit",
            Self::Fill => "Fill",
            Self::Span => "Span",
        }
    }
}

impl fmt::Display for WallpaperPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for WallpaperPosition {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown wallpaper position '{s}'"))
    }
}

/// 24-bit desktop background color.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `0xRRGGBB`; bits above 24 are ignored.
    pub fn from_rgb24(value: u32) -> Self {
        Self {
            r: ((value >> 16) & 0xFF) as u8,
            g: ((value >> 8) & 0xFF) as u8,
            b: (value & 0xFF) as u8,
        }
    }

    pub fn to_rgb24(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    /// Win32 COLORREF layout, `0x00BBGGRR`.
    pub fn to_colorref(self) -> u32 {
        ((self.b as u32) << 16) | ((self.g as u32) << 8) | self.r as u32
    }

    pub fn from_colorref(value: u32) -> Self {
        Self {
            r: (value & 0xFF) as u8,
            g: ((value >> 8) & 0xFF) as u8,
            b: ((value >> 16) & 0xFF) as u8,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideshowOptions {
    pub shuffle: bool,
    pub tick: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlideshowDirection {
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideshowStatus {
    pub enabled: bool,
    pub slideshow: bool,
    pub disabled_by_remote_session: bool,
}

impl SlideshowStatus {
    pub const ENABLED: u32 = 0x1;
    pub const SLIDESHOW: u32 = 0x2;
    pub const DISABLED_BY_REMOTE_SESSION: u32 = 0x4;

    pub fn from_bits(bits: u32) -> Self {
        Self {
            enabled: bits & Self::ENABLED != 0,
            slideshow: bits & Self::SLIDESHOW != 0,
            disabled_by_remote_session: bits & Self::DISABLED_BY_REMOTE_SESSION != 0,
        }
    }
}

/* =========================
   MODES
   ========================= */

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    Landscape,
    Portrait,
    LandscapeFlipped,
    PortraitFlipped,
}

impl Orientation {
    pub fn degrees(self) -> u32 {
        match self {
            Self::Landscape => 0,
            Self::Portrait => 90,
            Self::LandscapeFlipped => 180,
            Self::PortraitFlipped => 270,
        }
    }

    pub fn from_degrees(degrees: u32) -> Option<Self> {
        match degrees % 360 {
            0 => Some(Self::Landscape),
            90 => Some(Self::Portrait),
            180 => Some(Self::LandscapeFlipped),
            270 => Some(Self::PortraitFlipped),
            _ => None,
        }
    }

    /// DMDO_* value stored in a display mode.
    pub fn to_native(self) -> u32 {
        self.degrees() / 90
    }

    pub fn from_native(value: u32) -> Self {
        match value {
            1 => Self::Portrait,
            2 => Self::LandscapeFlipped,
            3 => Self::PortraitFlipped,
            _ => Self::Landscape,
        }
    }

    pub fn is_portrait(self) -> bool {
        matches!(self, Self::Portrait | Self::PortraitFlipped)
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.degrees())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayMode {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub orientation: Orientation,
    pub bits_per_pixel: u32,
    pub frequency: u32,
}

impl DisplayMode {
    pub fn bounds(&self) -> Bounds {
        Bounds::from_origin_size(self.x, self.y, self.width, self.height)
    }

    /// Rotates the mode, swapping width and height when crossing between
    /// landscape and portrait.
    pub fn rotated(mut self, orientation: Orientation) -> Self {
        if self.orientation.is_portrait() != orientation.is_portrait() {
            std::mem::swap(&mut self.width, &mut self.height);
        }
        self.orientation = orientation;
        self
    }
}

/// Which fields of a [`DisplayMode`] a mode change applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeChange {
    Position,
    Resolution,
    Orientation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeChangeResult {
    Successful,
    RestartRequired,
    Failed,
    BadMode,
    NotUpdated,
    BadFlags,
    BadParam,
    BadDualView,
    Other(i32),
}

impl ModeChangeResult {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Successful,
            1 => Self::RestartRequired,
            -1 => Self::Failed,
            -2 => Self::BadMode,
            -3 => Self::NotUpdated,
            -4 => Self::BadFlags,
            -5 => Self::BadParam,
            -6 => Self::BadDualView,
            other => Self::Other(other),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Successful => 0,
            Self::RestartRequired => 1,
            Self::Failed => -1,
            Self::BadMode => -2,
            Self::NotUpdated => -3,
            Self::BadFlags => -4,
            Self::BadParam => -5,
            Self::BadDualView => -6,
            Self::Other(code) => code,
        }
    }
}

/* =========================
   DEVICES
   ========================= */

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayDevice {
    /// Adapter name, e.g. `\\.\DISPLAY1`.
    pub device_name: String,
    pub device_string: String,
    pub state_flags: StateFlags,
    /// Interface path of the first monitor attached to the adapter, empty when none.
    pub device_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogicalMonitor {
    pub handle: isize,
    pub device_name: String,
    pub bounds: Bounds,
    pub primary: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhysicalMonitor {
    pub handle: isize,
    pub description: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brightness {
    pub minimum: u32,
    pub current: u32,
    pub maximum: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorDescriptor {
    pub index: usize,
    pub device_id: String,
    pub device_name: String,
    pub device_string: String,
    pub state_flags: StateFlags,
    pub bounds: Bounds,
    pub wallpaper: String,
    pub wallpaper_position: WallpaperPosition,
}

impl MonitorDescriptor {
    pub fn is_primary(&self) -> bool {
        self.state_flags.is_primary()
    }

    pub fn is_connected(&self) -> bool {
        !self.device_id.is_empty()
    }
}

/* =========================
   WATCHER STATE
   ========================= */

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorState {
    pub width: u32,
    pub height: u32,
    pub orientation: Orientation,
}

impl From<&DisplayMode> for MonitorState {
    fn from(mode: &DisplayMode) -> Self {
        Self {
            width: mode.width,
            height: mode.height,
            orientation: mode.orientation,
        }
    }
}

/// Adapter name to monitor state; ordered so diffs come out deterministically.
pub type Snapshot = BTreeMap<String, MonitorState>;
