//! Deterministic cursor color assignment.

use std::{fmt, str::FromStr};

use super::{ConnectionId, DomainError};

/// 24-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = DomainError;

    /// Parse `#RRGGBB` (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DomainError::InvalidColor(s.to_string());
        let hex = s.trim().strip_prefix('#').ok_or_else(invalid)?;
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        Ok(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

/// Colors handed out when no palette is configured.
pub const DEFAULT_PALETTE: [Color; 8] = [
    Color::rgb(0xE5, 0x73, 0x73),
    Color::rgb(0x95, 0x75, 0xCD),
    Color::rgb(0x4F, 0xC3, 0xF7),
    Color::rgb(0x81, 0xC7, 0x84),
    Color::rgb(0xFF, 0xF1, 0x76),
    Color::rgb(0xFF, 0x8A, 0x65),
    Color::rgb(0xF0, 0x62, 0x92),
    Color::rgb(0x79, 0x86, 0xCB),
];

/// Fixed, non-empty list of colors.
///
/// A connection always gets `colors[id mod len]`, so every participant renders a
/// given peer with the same color. With more participants than colors, two
/// connections share a color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Color>,
}

impl Palette {
    pub fn new(colors: Vec<Color>) -> Result<Self, DomainError> {
        if colors.is_empty() {
            return Err(DomainError::EmptyPalette);
        }
        Ok(Self { colors })
    }

    pub fn color_of(&self, connection_id: ConnectionId) -> Color {
        let index = connection_id.value() % self.colors.len() as u64;
        self.colors[index as usize]
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: DEFAULT_PALETTE.to_vec(),
        }
    }
}

impl FromStr for Palette {
    type Err = DomainError;

    /// Parse a comma-separated list such as `#FF0000,#00FF00`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let colors = s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(Color::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(colors)
    }
}
