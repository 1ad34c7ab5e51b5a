//! Colour palettes and bin tables for radar products.

use thiserror::Error;

/// CHMI radar legend colours, one per intensity bin, weakest first.
pub const CHMI_COLORS: [&str; 15] = [
    "#390071", "#3001A9", "#0200FB", "#076CBC", "#00A400", "#00BB03", "#36D700", "#9CDD07",
    "#E0DC01", "#FBB200", "#F78600", "#FF5400", "#FE0100", "#A40003", "#FCFCFC",
];

/// CHMI reflectivity legend: lower bound of each bin in dBZ.
pub const CHMI_DBZ_THRESHOLDS: [f64; 15] = [
    4.0, 8.0, 12.0, 16.0, 20.0, 24.0, 28.0, 32.0, 36.0, 40.0, 44.0, 48.0, 52.0, 56.0, 60.0,
];

/// One-hour precipitation legend: lower bound of each bin in mm.
pub const PRECIP_LEVELS_MM: [f64; 15] = [
    0.1, 0.2, 0.5, 1.0, 2.0, 3.0, 5.0, 7.0, 10.0, 15.0, 20.0, 30.0, 40.0, 60.0, 80.0,
];

#[derive(Debug, Error, PartialEq)]
pub enum PaletteError {
    #[error("Invalid colour '{0}', expected #RRGGBB")]
    InvalidColor(String),

    #[error("Palette must hold between 1 and 255 colours, got {0}")]
    InvalidSize(usize),
}

/// An ordered list of opaque RGB colours; class `i` is drawn as `colors[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<(u8, u8, u8)>,
}

impl Palette {
    /// Build a palette from RGB triples.
    ///
    /// At most 255 colours fit, since indexed PNG output reserves one entry
    /// for the transparent background.
    pub fn new(colors: Vec<(u8, u8, u8)>) -> Result<Self, PaletteError> {
        if colors.is_empty() || colors.len() > 255 {
            return Err(PaletteError::InvalidSize(colors.len()));
        }
        Ok(Self { colors })
    }

    /// Parse a palette from `#RRGGBB` strings.
    pub fn from_hex<S: AsRef<str>>(colors: &[S]) -> Result<Self, PaletteError> {
        let rgb = colors
            .iter()
            .map(|c| {
                let c = c.as_ref();
                hex_to_rgb(c).ok_or_else(|| PaletteError::InvalidColor(c.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(rgb)
    }

    /// The 15-colour CHMI legend.
    pub fn chmi() -> Self {
        Self {
            colors: CHMI_COLORS
                .iter()
                .filter_map(|c| hex_to_rgb(c))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Colour of a class, `None` for `-1` or out-of-range classes.
    #[inline]
    pub fn color(&self, class: i16) -> Option<(u8, u8, u8)> {
        usize::try_from(class).ok().and_then(|i| self.colors.get(i).copied())
    }

    pub fn colors(&self) -> &[(u8, u8, u8)] {
        &self.colors
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::chmi()
    }
}

/// Parse a `#RRGGBB` (or `RRGGBB`) colour.
pub fn hex_to_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    let value = u32::from_str_radix(hex, 16).ok()?;
    Some(((value >> 16) as u8, (value >> 8) as u8, value as u8))
}
