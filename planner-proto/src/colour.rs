//! Tag colour codec: 8-bit sRGB to and from the OKLCH cylindrical space.
//!
//! Lightness and chroma are normalised (lightness in `[0, 1]`, chroma roughly
//! `[0, 0.4]` for displayable colours) and hue is in degrees, `[0, 360)`.
//! Converting back clamps linear RGB to `[0, 1]` before gamma encoding, so
//! any `Oklch` value maps to a displayable colour. An RGB → OKLCH → RGB
//! round trip reproduces every channel within ±1.

use std::fmt;

use palette::convert::FromColorUnclamped;
use palette::{Clamp, FromColor, LinSrgb, Oklab, Srgb};

/// An 8-bit sRGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

/// A colour in OKLCH: lightness, chroma, hue in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Oklch {
    /// Perceptual lightness, `0.0..=1.0`.
    pub l: f64,
    /// Chroma, `>= 0.0`.
    pub c: f64,
    /// Hue angle in degrees, `0.0..360.0`.
    pub h: f64,
}

/// Error returned when parsing a `#rrggbb` string fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid hex colour: {0:?}")]
pub struct HexError(pub String);

impl Rgb {
    /// Creates a colour from its channels.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#rrggbb` (the leading `#` is optional).
    ///
    /// # Errors
    ///
    /// Returns [`HexError`] if the input is not six hex digits.
    pub fn from_hex(input: &str) -> Result<Self, HexError> {
        let digits = input.strip_prefix('#').unwrap_or(input);
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(HexError(input.to_string()));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16).map_err(|_| HexError(input.to_string()))
        };
        Ok(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }

    /// Formats as lowercase `#rrggbb`.
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Converts to OKLCH.
    #[must_use]
    pub fn to_oklch(self) -> Oklch {
        let srgb = Srgb::new(self.r, self.g, self.b).into_format::<f64>();
        let lab = Oklab::<f64>::from_color(srgb.into_linear::<f64>());
        let lch = palette::Oklch::<f64>::from_color(lab);
        Oklch {
            l: lch.l,
            c: lch.chroma,
            h: normalize_hue(lch.hue.into_positive_degrees()),
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Oklch {
    /// Creates a colour, normalising the hue into `[0, 360)`.
    #[must_use]
    pub fn new(l: f64, c: f64, h: f64) -> Self {
        Self {
            l,
            c,
            h: normalize_hue(h),
        }
    }

    /// Converts to 8-bit sRGB, clamping out-of-gamut values.
    #[must_use]
    pub fn to_rgb(self) -> Rgb {
        let lab = Oklab::<f64>::from_color_unclamped(palette::Oklch::new(self.l, self.c, self.h));
        let linear = LinSrgb::<f64>::from_color_unclamped(lab);
        let linear = if linear.red.is_nan() || linear.green.is_nan() || linear.blue.is_nan() {
            LinSrgb::new(0.0, 0.0, 0.0)
        } else {
            linear.clamp()
        };
        let (r, g, b) = Srgb::<f64>::from_linear(linear)
            .into_format::<u8>()
            .into_components();
        Rgb { r, g, b }
    }
}

impl From<Rgb> for Oklch {
    fn from(rgb: Rgb) -> Self {
        rgb.to_oklch()
    }
}

impl From<Oklch> for Rgb {
    fn from(colour: Oklch) -> Self {
        colour.to_rgb()
    }
}

/// Maps any angle in degrees into `[0, 360)`.
#[must_use]
pub fn normalize_hue(degrees: f64) -> f64 {
    if !degrees.is_finite() {
        return 0.0;
    }
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs.
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}
