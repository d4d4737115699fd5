use std::{fmt, str::FromStr};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ColourParseError {
    #[error("Invalid colour {:?}: expected a hex code such as #f32e6f.", .0)]
    InvalidFormat(String),
}

/// A 24 bit RGB colour as Discord stores role colours.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct HexColour {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl HexColour {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl FromStr for HexColour {
    type Err = ColourParseError;

    /// Accepts `#rrggbb` and `#rgb`, with or without the leading `#`.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let invalid = || ColourParseError::InvalidFormat(input.to_owned());
        let digits = input.trim();
        let digits = digits.strip_prefix('#').unwrap_or(digits);
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let value = u32::from_str_radix(digits, 16).map_err(|_| invalid())?;
        match digits.len() {
            6 => Ok(Self::new((value >> 16) as u8, (value >> 8) as u8, value as u8)),
            3 => {
                let expand = |nibble: u32| ((nibble & 0xF) * 0x11) as u8;
                Ok(Self::new(expand(value >> 8), expand(value >> 4), expand(value)))
            }
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for HexColour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::{ColourParseError, HexColour};

    #[test]
    fn test_parse_long_form() {
        assert_eq!("#F32E6F".parse(), Ok(HexColour::new(0xf3, 0x2e, 0x6f)));
        assert_eq!("0000ff".parse(), Ok(HexColour::new(0, 0, 0xff)));
        assert_eq!(" #ff0000 ".parse(), Ok(HexColour::new(0xff, 0, 0)));
    }

    #[test]
    fn test_parse_short_form() {
        assert_eq!("#f0a".parse(), Ok(HexColour::new(0xff, 0x00, 0xaa)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for input in ["", "#", "#ff00", "#ff00zz", "red", "#+fffff", "#ff0000ff"] {
            assert_eq!(
                input.parse::<HexColour>(),
                Err(ColourParseError::InvalidFormat(input.to_owned())),
                "{:?} should not parse",
                input
            );
        }
    }

    #[test]
    fn test_display_is_lowercase_long_form() {
        assert_eq!(HexColour::new(0xAB, 0x01, 0xFF).to_string(), "#ab01ff");
        assert_eq!("#ABC".parse::<HexColour>().unwrap().to_string(), "#aabbcc");
    }
}
