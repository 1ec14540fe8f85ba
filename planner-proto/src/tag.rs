//! Colour-coded tags.
//!
//! A tag's colour is persisted as a cylindrical `{ l, c, h }` triple in CSS
//! `oklch()` units: lightness as a percentage, raw chroma, hue in degrees.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::colour::{Oklch, Rgb};
use crate::task::{ValidationError, uuid_id};

/// Maximum allowed tag name length in characters.
pub const MAX_TAG_NAME_LENGTH: usize = 15;

uuid_id!(
    /// Identifier of a tag.
    TagId
);

/// Persisted tag colour: `l` in `[0, 100]`, `c >= 0`, `h` in `[0, 360)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TagColour {
    /// Lightness percentage.
    pub l: f64,
    /// Chroma.
    pub c: f64,
    /// Hue in degrees.
    pub h: f64,
}

impl TagColour {
    /// Checks that every component is within range.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ColourOutOfRange`] naming the first bad component.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(0.0..=100.0).contains(&self.l) {
            return Err(ValidationError::ColourOutOfRange {
                component: 'l',
                value: self.l,
            });
        }
        if !self.c.is_finite() || self.c < 0.0 {
            return Err(ValidationError::ColourOutOfRange {
                component: 'c',
                value: self.c,
            });
        }
        if !(0.0..360.0).contains(&self.h) {
            return Err(ValidationError::ColourOutOfRange {
                component: 'h',
                value: self.h,
            });
        }
        Ok(())
    }

    /// Converts to an 8-bit sRGB colour for display.
    #[must_use]
    pub fn to_rgb(self) -> Rgb {
        Oklch::from(self).to_rgb()
    }
}

impl From<Oklch> for TagColour {
    fn from(colour: Oklch) -> Self {
        Self {
            l: (colour.l * 100.0).clamp(0.0, 100.0),
            c: colour.c.max(0.0),
            h: colour.h,
        }
    }
}

impl From<TagColour> for Oklch {
    fn from(colour: TagColour) -> Self {
        Self::new(colour.l / 100.0, colour.c, colour.h)
    }
}

impl From<Rgb> for TagColour {
    fn from(rgb: Rgb) -> Self {
        rgb.to_oklch().into()
    }
}

/// A named, coloured tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag identifier.
    pub id: TagId,
    /// Display name, at most [`MAX_TAG_NAME_LENGTH`] characters.
    pub name: String,
    /// Persisted colour.
    pub colour: TagColour,
}

impl Tag {
    /// Creates a validated tag with a fresh id.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the name is empty or too long, or the
    /// colour is out of range.
    pub fn new(name: &str, colour: TagColour) -> Result<Self, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyTagName);
        }
        let length = name.chars().count();
        if length > MAX_TAG_NAME_LENGTH {
            return Err(ValidationError::TagNameTooLong {
                actual: length,
                max: MAX_TAG_NAME_LENGTH,
            });
        }
        colour.validate()?;
        Ok(Self {
            id: TagId::new(),
            name: name.to_string(),
            colour,
        })
    }
}
