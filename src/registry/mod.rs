//! Versioned lookup tables for icons and default theming.
//!
//! Extending the icon set means adding an [`IconSpec`] entry here; no other
//! module branches on icon identity. The same applies to the default colors.

/// Registry version, bumped whenever an entry is added, removed, or redrawn.
///
/// Participates in the project content hash so a registry change invalidates
/// cached generation results.
pub const REGISTRY_VERSION: u32 = 1;

/// Default primary theme color (Material blue 500)
pub const DEFAULT_THEME_COLOR: &str = "#2196F3";
/// Default dark variant (Material blue 700)
pub const DEFAULT_THEME_COLOR_DARK: &str = "#1976D2";
/// Default window background
pub const DEFAULT_BACKGROUND_COLOR: &str = "#FFFFFF";
/// Default icon key
pub const DEFAULT_ICON: &str = "phone";

/// One launcher-icon density bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Density {
    /// Android density qualifier (e.g. `xhdpi`)
    pub qualifier: &'static str,
    /// Icon edge length in pixels at this density
    pub size_px: u32,
}

/// Launcher icon densities, ordered low to high.
pub const DENSITIES: [Density; 5] = [
    Density { qualifier: "mdpi", size_px: 48 },
    Density { qualifier: "hdpi", size_px: 72 },
    Density { qualifier: "xhdpi", size_px: 96 },
    Density { qualifier: "xxhdpi", size_px: 144 },
    Density { qualifier: "xxxhdpi", size_px: 192 },
];

/// Glyph drawn on the icon plate.
///
/// Shapes are expressed in normalized coordinates by
/// [`crate::generator::icons`], so one variant renders identically at every
/// density.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Glyph {
    /// Handset outline
    Phone,
    /// Meridian globe
    Globe,
    /// Lightning bolt
    Bolt,
    /// Shopping cart
    Cart,
    /// Speech bubble
    Chat,
}

/// One registry entry: a selectable launcher icon.
#[derive(Debug, Clone, Copy)]
pub struct IconSpec {
    /// Key accepted in the `iconChoice` request field
    pub key: &'static str,
    /// Glyph to rasterize
    pub glyph: Glyph,
    /// Plate (background) color, RGB
    pub plate: [u8; 3],
    /// Glyph (foreground) color, RGB
    pub ink: [u8; 3],
}

/// The fixed icon set.
pub const ICONS: [IconSpec; 5] = [
    IconSpec { key: "phone", glyph: Glyph::Phone, plate: [0x21, 0x96, 0xF3], ink: [0xFF, 0xFF, 0xFF] },
    IconSpec { key: "globe", glyph: Glyph::Globe, plate: [0x19, 0x76, 0xD2], ink: [0xFF, 0xFF, 0xFF] },
    IconSpec { key: "bolt", glyph: Glyph::Bolt, plate: [0xFF, 0xC1, 0x07], ink: [0x21, 0x21, 0x21] },
    IconSpec { key: "cart", glyph: Glyph::Cart, plate: [0x4C, 0xAF, 0x50], ink: [0xFF, 0xFF, 0xFF] },
    IconSpec { key: "chat", glyph: Glyph::Chat, plate: [0x9C, 0x27, 0xB0], ink: [0xFF, 0xFF, 0xFF] },
];

/// Looks up an icon by request key.
pub fn icon(key: &str) -> Option<&'static IconSpec> {
    ICONS.iter().find(|spec| spec.key == key)
}

/// All accepted `iconChoice` keys, for validation error messages.
pub fn icon_keys() -> Vec<&'static str> {
    ICONS.iter().map(|spec| spec.key).collect()
}
