use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::ids::ResourceId;

/// A resource's classification colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unrecognised colour: {0}")]
pub struct ColorParseError(String);

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// The same colour at the given opacity, as a css `rgba(..)` value.
    pub fn with_alpha(&self, alpha: f64) -> String {
        format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, alpha)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = ColorParseError;

    /// Accepts `rgb(r, g, b)`, `rgba(r, g, b, a)` (alpha dropped) and `#rrggbb`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        static RE_RGB: OnceLock<Regex> = OnceLock::new();
        static RE_HEX: OnceLock<Regex> = OnceLock::new();

        let re_rgb = RE_RGB.get_or_init(|| {
            Regex::new(r"^rgba?\(\s*(\d{1,3})\s*,\s*(\d{1,3})\s*,\s*(\d{1,3})\s*(?:,\s*[\d.]+\s*)?\)$")
                .expect("valid rgb pattern")
        });
        let re_hex = RE_HEX.get_or_init(|| {
            Regex::new(r"^#([0-9a-fA-F]{2})([0-9a-fA-F]{2})([0-9a-fA-F]{2})$")
                .expect("valid hex pattern")
        });

        let s = s.trim();
        let err = || ColorParseError(s.to_string());

        if let Some(caps) = re_rgb.captures(s) {
            let channel = |i: usize| caps[i].parse::<u8>().map_err(|_| err());
            return Ok(Rgb::new(channel(1)?, channel(2)?, channel(3)?));
        }
        if let Some(caps) = re_hex.captures(s) {
            let channel = |i: usize| u8::from_str_radix(&caps[i], 16).map_err(|_| err());
            return Ok(Rgb::new(channel(1)?, channel(2)?, channel(3)?));
        }
        Err(err())
    }
}

/// Supplies classification colours for resources.
pub trait ResourceRegistry {
    fn color(&self, resource: &ResourceId) -> Option<Rgb>;
}

impl ResourceRegistry for BTreeMap<ResourceId, Rgb> {
    fn color(&self, resource: &ResourceId) -> Option<Rgb> {
        self.get(resource).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("rgb(200, 40, 40)", Rgb::new(200, 40, 40))]
    #[case("rgba(1,2,3,0.5)", Rgb::new(1, 2, 3))]
    #[case(" #0aff10 ", Rgb::new(10, 255, 16))]
    fn test_parse_colors(#[case] input: &str, #[case] expected: Rgb) {
        assert_eq!(input.parse::<Rgb>().unwrap(), expected);
    }

    #[rstest]
    #[case("red")]
    #[case("rgb(300, 0, 0)")]
    #[case("#12345")]
    fn test_reject_bad_colors(#[case] input: &str) {
        assert!(input.parse::<Rgb>().is_err());
    }

    #[test]
    fn test_alpha_rendering() {
        let color = Rgb::new(10, 20, 30);
        assert_eq!(color.to_string(), "rgb(10, 20, 30)");
        assert_eq!(color.with_alpha(0.4), "rgba(10, 20, 30, 0.4)");
    }
}
