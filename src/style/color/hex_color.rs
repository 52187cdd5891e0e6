use crate::style::color::Color;
use std::borrow::Cow;

/// A `#rgb`, `#rgba`, `#rrggbb` or `#rrggbbaa` literal.
///
/// Invalid literals resolve to [`Color::TRANSPARENT`], so a typo in a highlight color
/// disables the highlight instead of failing the frame.
pub struct HexColor<'a> {
    raw: Cow<'a, str>,
    value: Option<Color>,
}

impl<'a> HexColor<'a> {
    pub fn new(hex: impl Into<Cow<'a, str>>) -> Self {
        let hex = hex.into();
        let value = Self::parse(hex.as_bytes());
        HexColor { raw: hex, value }
    }

    fn parse(bytes: &[u8]) -> Option<Color> {
        if !Self::validate(bytes) {
            return None;
        }
        let rgba = match bytes.len() {
            4 => {
                let r = hex_1_to_u8(bytes[1]);
                let g = hex_1_to_u8(bytes[2]);
                let b = hex_1_to_u8(bytes[3]);
                [r * 17, g * 17, b * 17, 255]
            }
            5 => {
                let r = hex_1_to_u8(bytes[1]);
                let g = hex_1_to_u8(bytes[2]);
                let b = hex_1_to_u8(bytes[3]);
                let a = hex_1_to_u8(bytes[4]);
                [r * 17, g * 17, b * 17, a * 17]
            }
            7 => {
                let r = hex_2_to_u8(bytes[1], bytes[2]);
                let g = hex_2_to_u8(bytes[3], bytes[4]);
                let b = hex_2_to_u8(bytes[5], bytes[6]);
                [r, g, b, 255]
            }
            9 => {
                let r = hex_2_to_u8(bytes[1], bytes[2]);
                let g = hex_2_to_u8(bytes[3], bytes[4]);
                let b = hex_2_to_u8(bytes[5], bytes[6]);
                let a = hex_2_to_u8(bytes[7], bytes[8]);
                [r, g, b, a]
            }
            _ => return None,
        };
        Some(Color::rgba(rgba[0], rgba[1], rgba[2], rgba[3]))
    }

    fn validate(bytes: &[u8]) -> bool {
        let length = bytes.len();

        if length == 0 || bytes[0] != b'#' {
            return false;
        }

        if length != 4 && length != 5 && length != 7 && length != 9 {
            return false;
        }

        bytes[1..].iter().all(|c| c.is_ascii_hexdigit())
    }

    pub fn is_valid(&self) -> bool {
        self.value.is_some()
    }

    pub fn get_raw(&self) -> &str {
        &self.raw
    }

    pub fn to_color(&self) -> Color {
        self.value.unwrap_or(Color::TRANSPARENT)
    }
}

fn hex_1_to_u8(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        b'A'..=b'F' => c - b'A' + 10,
        _ => 0,
    }
}

fn hex_2_to_u8(c1: u8, c2: u8) -> u8 {
    (hex_1_to_u8(c1) << 4) | hex_1_to_u8(c2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_and_long_forms_expand_to_the_same_color() {
        assert_eq!(Color::hex("#fa0").to_color(), Color::hex("#ffaa00").to_color());
        assert_eq!(Color::hex("#fa08").to_color(), Color::rgba(255, 170, 0, 136));
        assert_eq!(Color::hex("#ffffff33").to_color(), Color::rgba(255, 255, 255, 51));
    }

    #[test]
    fn malformed_literals_resolve_to_transparent() {
        for raw in ["", "fff", "#ff", "#gggggg", "#1234567"] {
            let hex = Color::hex(raw);
            assert!(!hex.is_valid(), "{raw} should be rejected");
            assert!(hex.to_color().is_fully_transparent());
        }
    }
}
