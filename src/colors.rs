//! The hub's fixed LED color table.
//!
//! The byte codes are consumed by the hub firmware and must stay in this order.

use palette::Srgb;

/// A named LED setting of the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[repr(u8)]
pub enum Color {
    Off = 0x00,
    Pink = 0x01,
    Violet = 0x02,
    Blue = 0x03,
    LightBlue = 0x04,
    LightGreen = 0x05,
    DarkGreen = 0x06,
    Yellow = 0x07,
    Orange = 0x08,
    Red = 0x09,
    White = 0x0A,
}

/// A color name that is not part of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UnknownColor;

impl core::fmt::Display for UnknownColor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "unknown color name")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for UnknownColor {}

impl Color {
    /// Every color, ordered by wire code.
    pub const ALL: [Color; 11] = [
        Color::Off,
        Color::Pink,
        Color::Violet,
        Color::Blue,
        Color::LightBlue,
        Color::LightGreen,
        Color::DarkGreen,
        Color::Yellow,
        Color::Orange,
        Color::Red,
        Color::White,
    ];

    /// Wire code sent to the color characteristic.
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Looks up a color by its wire code.
    pub fn from_code(code: u8) -> Option<Color> {
        Color::ALL.get(usize::from(code)).copied()
    }

    /// The client-facing name, e.g. `"light_blue"`.
    pub const fn name(self) -> &'static str {
        match self {
            Color::Off => "off",
            Color::Pink => "pink",
            Color::Violet => "violet",
            Color::Blue => "blue",
            Color::LightBlue => "light_blue",
            Color::LightGreen => "light_green",
            Color::DarkGreen => "dark_green",
            Color::Yellow => "yellow",
            Color::Orange => "orange",
            Color::Red => "red",
            Color::White => "white",
        }
    }

    /// Resolves a client-facing name. Matching is exact and case-sensitive.
    pub fn from_name(name: &str) -> Result<Color, UnknownColor> {
        Color::ALL
            .iter()
            .copied()
            .find(|color| color.name() == name)
            .ok_or(UnknownColor)
    }

    /// Approximate color the hub LED shows for this setting.
    ///
    /// Intended for client-side previews; the hub itself only receives [`code`](Self::code).
    pub const fn preview(self) -> Srgb {
        match self {
            Color::Off => Srgb::new(0.0, 0.0, 0.0),
            Color::Pink => Srgb::new(1.0, 0.41, 0.71),
            Color::Violet => Srgb::new(0.56, 0.0, 1.0),
            Color::Blue => Srgb::new(0.0, 0.0, 1.0),
            Color::LightBlue => Srgb::new(0.0, 0.75, 1.0),
            Color::LightGreen => Srgb::new(0.56, 0.93, 0.56),
            Color::DarkGreen => Srgb::new(0.0, 0.5, 0.0),
            Color::Yellow => Srgb::new(1.0, 1.0, 0.0),
            Color::Orange => Srgb::new(1.0, 0.5, 0.0),
            Color::Red => Srgb::new(1.0, 0.0, 0.0),
            Color::White => Srgb::new(1.0, 1.0, 1.0),
        }
    }

    /// Picks the setting whose preview is closest to `target` (squared RGB distance).
    pub fn nearest(target: Srgb) -> Color {
        let distance = |color: &Color| {
            let p = color.preview();
            let (dr, dg, db) = (p.red - target.red, p.green - target.green, p.blue - target.blue);
            dr * dr + dg * dg + db * db
        };

        let mut best = Color::Off;
        let mut best_distance = f32::MAX;
        for color in Color::ALL.iter() {
            let d = distance(color);
            if d < best_distance {
                best = *color;
                best_distance = d;
            }
        }
        best
    }
}

impl core::str::FromStr for Color {
    type Err = UnknownColor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Color::from_name(s)
    }
}

impl core::fmt::Display for Color {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

impl From<Color> for u8 {
    fn from(color: Color) -> Self {
        color.code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_order_matches_codes() {
        for (index, color) in Color::ALL.iter().enumerate() {
            assert_eq!(usize::from(color.code()), index);
            assert_eq!(Color::from_code(color.code()), Some(*color));
        }
        assert_eq!(Color::from_code(0x0B), None);
    }

    #[test]
    fn lookup_is_case_sensitive() {
        assert_eq!(Color::from_name("light_blue"), Ok(Color::LightBlue));
        assert_eq!(Color::from_name("Light_Blue"), Err(UnknownColor));
        assert_eq!(Color::from_name("lightblue"), Err(UnknownColor));
        assert_eq!(Color::from_name(""), Err(UnknownColor));
    }

    #[test]
    fn nearest_snaps_primaries() {
        assert_eq!(Color::nearest(Srgb::new(0.9, 0.05, 0.0)), Color::Red);
        assert_eq!(Color::nearest(Srgb::new(0.02, 0.02, 0.02)), Color::Off);
        assert_eq!(Color::nearest(Srgb::new(0.1, 0.1, 0.95)), Color::Blue);
    }
}
