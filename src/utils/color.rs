//! Background color parsing
//!
//! Colors arrive as the optional `background_color` form field and must be
//! exactly `#RRGGBB`. Shorthand (`#RGB`) and bare hex are rejected.

use crate::error::{BgRemovalError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Solid color used as the canvas behind the foreground
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackgroundColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl BackgroundColor {
    /// Opaque color from RGB components
    #[must_use]
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    #[must_use]
    pub fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    #[must_use]
    pub fn white() -> Self {
        Self::new(255, 255, 255)
    }

    #[must_use]
    pub fn black() -> Self {
        Self::new(0, 0, 0)
    }

    #[must_use]
    pub fn rgb(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    /// Lowercase `#rrggbb`
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl std::fmt::Display for BackgroundColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for BackgroundColor {
    type Err = BgRemovalError;

    fn from_str(s: &str) -> Result<Self> {
        ColorParser::parse_hex(s)
    }
}

/// Utility for parsing background colors
pub struct ColorParser;

impl ColorParser {
    /// Parse the optional form value
    ///
    /// Absent or empty text means "no background", not an error.
    ///
    /// # Examples
    /// ```rust
    /// use bgremove_api::utils::ColorParser;
    ///
    /// assert!(ColorParser::parse(None).unwrap().is_none());
    /// assert!(ColorParser::parse(Some("")).unwrap().is_none());
    /// let red = ColorParser::parse(Some("#FF0000")).unwrap().unwrap();
    /// assert_eq!((red.r, red.g, red.b), (255, 0, 0));
    /// ```
    pub fn parse(text: Option<&str>) -> Result<Option<BackgroundColor>> {
        match text {
            None | Some("") => Ok(None),
            Some(hex) => Self::parse_hex(hex).map(Some),
        }
    }

    /// Parse a strict `#RRGGBB` string (case-insensitive)
    pub fn parse_hex(hex: &str) -> Result<BackgroundColor> {
        if !Self::is_valid_hex(hex) {
            return Err(BgRemovalError::invalid_color(format!(
                "Background color must be in hex format (#RRGGBB), got {:?}",
                hex
            )));
        }

        let component = |range: std::ops::Range<usize>| {
            hex.get(range)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| BgRemovalError::invalid_color(format!("Invalid hex color {hex:?}")))
        };

        Ok(BackgroundColor::new(
            component(1..3)?,
            component(3..5)?,
            component(5..7)?,
        ))
    }

    /// Check `^#[0-9A-Fa-f]{6}$` without parsing
    #[must_use]
    pub fn is_valid_hex(hex: &str) -> bool {
        hex.len() == 7
            && hex.starts_with('#')
            && hex.chars().skip(1).all(|c| c.is_ascii_hexdigit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_parse_hex_6_digit() {
        let white = ColorParser::parse_hex("#ffffff").unwrap();
        assert_eq!(white, BackgroundColor::white());

        let red = ColorParser::parse_hex("#FF0000").unwrap();
        assert_eq!((red.r, red.g, red.b, red.a), (255, 0, 0, 255));

        let mixed = ColorParser::parse_hex("#0aFf80").unwrap();
        assert_eq!((mixed.r, mixed.g, mixed.b), (10, 255, 128));
    }

    #[test]
    fn test_absent_color_is_not_an_error() {
        assert_eq!(ColorParser::parse(None).unwrap(), None);
        assert_eq!(ColorParser::parse(Some("")).unwrap(), None);
    }

    #[test]
    fn test_parse_hex_invalid() {
        for bad in ["#ZZZZZZ", "#FFF", "FFFFFF", "#fffffff", "#ff", " #ffffff", "#ff ff f"] {
            let err = ColorParser::parse(Some(bad)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidColorFormat, "input {bad:?}");
        }
    }

    #[test]
    fn test_multibyte_input_does_not_panic() {
        assert!(!ColorParser::is_valid_hex("#ffé0f"));
        assert!(ColorParser::parse_hex("#fféff").is_err());
    }

    #[test]
    fn test_to_hex_and_from_str() {
        let color = BackgroundColor::new(255, 128, 0);
        assert_eq!(color.to_hex(), "#ff8000");
        assert_eq!(color.to_string(), "#ff8000");
        assert_eq!("#FF8000".parse::<BackgroundColor>().unwrap(), color);
        assert_eq!(color.with_alpha(10).a, 10);
    }
}
