// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::str::FromStr;

pub use svgtypes::LengthUnit;

use crate::Error;

/// An axis a length is measured along.
///
/// Defines what a percentage is relative to.
#[allow(missing_docs)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Orientation {
    Horizontal,
    Vertical,
    Other,
}

/// A length with a unit and an orientation.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Length {
    /// A raw value.
    pub number: f64,
    /// A value unit.
    pub unit: LengthUnit,
    /// A percentage resolving axis.
    pub orientation: Orientation,
}

impl Length {
    /// Creates a new length.
    #[inline]
    pub fn new(number: f64, unit: LengthUnit, orientation: Orientation) -> Self {
        Length {
            number,
            unit,
            orientation,
        }
    }

    /// Creates a new user space length.
    #[inline]
    pub fn new_number(number: f64, orientation: Orientation) -> Self {
        Length::new(number, LengthUnit::None, orientation)
    }

    /// Creates a zero length.
    #[inline]
    pub fn zero(orientation: Orientation) -> Self {
        Length::new_number(0.0, orientation)
    }

    /// Converts a length into pixels.
    pub fn to_px(&self, ctx: &UnitContext) -> f64 {
        let n = self.number;
        match self.unit {
            LengthUnit::None | LengthUnit::Px => n,
            LengthUnit::Em => n * ctx.font_size,
            LengthUnit::Ex => n * ctx.font_size / 2.0,
            LengthUnit::In => n * ctx.dpi,
            LengthUnit::Cm => n * ctx.dpi / 2.54,
            LengthUnit::Mm => n * ctx.dpi / 25.4,
            LengthUnit::Pt => n * ctx.dpi / 72.0,
            LengthUnit::Pc => n * ctx.dpi / 6.0,
            LengthUnit::Percent => {
                if ctx.object_units {
                    n / 100.0
                } else {
                    let (w, h) = ctx.viewport;
                    match self.orientation {
                        Orientation::Horizontal => w * n / 100.0,
                        Orientation::Vertical => h * n / 100.0,
                        Orientation::Other => {
                            let len = ((w * w + h * h) / 2.0).sqrt();
                            len * n / 100.0
                        }
                    }
                }
            }
        }
    }
}

/// A units resolving context.
///
/// Kept by a render engine per state frame.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct UnitContext {
    /// Target DPI.
    pub dpi: f64,
    /// Current font size in pixels.
    pub font_size: f64,
    /// Current viewport size in pixels.
    pub viewport: (f64, f64),
    /// Percentages are relative to an object bounding box, i.e. to 1.
    pub object_units: bool,
}

impl Default for UnitContext {
    fn default() -> Self {
        UnitContext {
            dpi: 100.0,
            font_size: 10.0,
            viewport: (100.0, 100.0),
            object_units: false,
        }
    }
}

/// Parses a length attribute.
pub fn parse_length(text: &str, orientation: Orientation) -> Result<Length, Error> {
    let length =
        svgtypes::Length::from_str(text.trim()).map_err(|_| Error::parse("length", text))?;
    Ok(Length::new(length.number, length.unit, orientation))
}

/// Parses a length attribute or returns a default one.
pub(crate) fn parse_length_or(
    text: Option<&str>,
    orientation: Orientation,
    default: Length,
) -> Result<Length, Error> {
    match text {
        Some(text) => parse_length(text, orientation),
        None => Ok(default),
    }
}

/// Parses a plain number.
pub fn parse_number(text: &str) -> Result<f64, Error> {
    svgtypes::Number::from_str(text.trim())
        .map(|n| n.0)
        .map_err(|_| Error::parse("number", text))
}

/// Parses a comma or whitespace separated list of numbers.
pub fn parse_number_list(text: &str) -> Result<Vec<f64>, Error> {
    let mut list = Vec::new();
    for n in svgtypes::NumberListParser::from(text) {
        list.push(n.map_err(|_| Error::parse("number list", text))?);
    }

    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> UnitContext {
        UnitContext {
            dpi: 100.0,
            font_size: 10.0,
            viewport: (200.0, 100.0),
            object_units: false,
        }
    }

    #[test]
    fn absolute_units() {
        let ctx = ctx();
        let mm = Length::new(25.4, LengthUnit::Mm, Orientation::Horizontal);
        assert_eq!(mm.to_px(&ctx), 100.0);
        let pt = Length::new(72.0, LengthUnit::Pt, Orientation::Horizontal);
        assert_eq!(pt.to_px(&ctx), 100.0);
        let em = Length::new(2.0, LengthUnit::Em, Orientation::Horizontal);
        assert_eq!(em.to_px(&ctx), 20.0);
        let ex = Length::new(2.0, LengthUnit::Ex, Orientation::Horizontal);
        assert_eq!(ex.to_px(&ctx), 10.0);
    }

    #[test]
    fn percent_follows_orientation() {
        let ctx = ctx();
        let w = parse_length("50%", Orientation::Horizontal).unwrap();
        let h = parse_length("50%", Orientation::Vertical).unwrap();
        assert_eq!(w.to_px(&ctx), 100.0);
        assert_eq!(h.to_px(&ctx), 50.0);

        let bbox_ctx = UnitContext {
            object_units: true,
            ..ctx
        };
        assert_eq!(w.to_px(&bbox_ctx), 0.5);
    }

    #[test]
    fn number_list() {
        assert_eq!(parse_number_list("1, 2 3").unwrap(), vec![1.0, 2.0, 3.0]);
        assert!(parse_number_list("1, q").is_err());
        assert!(parse_length("abc", Orientation::Other).is_err());
    }
}
