use image::Rgba;

use crate::error::ColorParseError;

/// One grid cell: straight (non-premultiplied) RGBA.
pub type Color = Rgba<u8>;

pub const TRANSPARENT: Color = Rgba([0, 0, 0, 0]);
pub const BLACK: Color = Rgba([0, 0, 0, 255]);
pub const WHITE: Color = Rgba([255, 255, 255, 255]);
pub const GRAY: Color = Rgba([128, 128, 128, 255]);
pub const RED: Color = Rgba([255, 0, 0, 255]);
pub const LIME: Color = Rgba([0, 255, 0, 255]);
pub const CYAN: Color = Rgba([0, 255, 255, 255]);
pub const BLUE: Color = Rgba([0, 0, 255, 255]);

/// Swatches offered to hosts, in display order.
pub const DEFAULT_PALETTE: [(&str, Color); 7] = [
    ("black", BLACK),
    ("gray", GRAY),
    ("white", WHITE),
    ("red", RED),
    ("lime", LIME),
    ("cyan", CYAN),
    ("blue", BLUE),
];

/// Look up a palette swatch by (case-insensitive) name.
pub fn color_by_name(name: &str) -> Option<Color> {
    let name = name.trim().to_ascii_lowercase();
    if name == "transparent" {
        return Some(TRANSPARENT);
    }
    DEFAULT_PALETTE
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, c)| *c)
}

/// Parse a palette name, `#RRGGBB` or `#RRGGBBAA`.
pub fn parse_color(s: &str) -> Result<Color, ColorParseError> {
    if let Some(c) = color_by_name(s) {
        return Ok(c);
    }
    let err = || ColorParseError(s.to_string());
    let hex = s.trim().strip_prefix('#').ok_or_else(err)?;
    if !hex.is_ascii() || (hex.len() != 6 && hex.len() != 8) {
        return Err(err());
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());
    let alpha = if hex.len() == 8 { channel(6)? } else { 255 };
    Ok(Rgba([channel(0)?, channel(2)?, channel(4)?, alpha]))
}

/// Format as `#RRGGBBAA`.
pub fn format_color(c: Color) -> String {
    format!("#{:02X}{:02X}{:02X}{:02X}", c[0], c[1], c[2], c[3])
}

/// Pack a straight-alpha color into premultiplied B,G,R,A bytes.
#[inline]
pub fn to_premultiplied_bgra(c: Color) -> [u8; 4] {
    let [r, g, b, a] = c.0;
    match a {
        255 => [b, g, r, 255],
        0 => [0, 0, 0, 0],
        _ => {
            let mul = |v: u8| ((v as u16 * a as u16 + 127) / 255) as u8;
            [mul(b), mul(g), mul(r), a]
        }
    }
}

/// Serde adapter storing colors as `#RRGGBBAA` strings (palette names accepted on input).
pub mod hex {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{Color, format_color, parse_color};

    pub fn serialize<S: Serializer>(color: &Color, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format_color(*color))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Color, D::Error> {
        let raw = String::deserialize(d)?;
        parse_color(&raw).map_err(serde::de::Error::custom)
    }
}
