// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Code to parse strings into plain numbers or some quantity with a unit.
//! CASA accepts quantities as strings ("0.018arcsec", "2.1mJy"); parsing
//! them here means a typo'd unit is caught before a multi-hour `tclean`
//! is launched with it.

mod error;

pub(crate) use error::UnitParseError;

use itertools::Itertools;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

lazy_static::lazy_static! {
    pub(crate) static ref ANGLE_FORMATS: String = AngleFormat::iter().join(", ");
    pub(crate) static ref FLUX_FORMATS: String = FluxDensityFormat::iter().join(", ");
}

#[derive(Debug, Display, Clone, Copy, PartialEq, EnumIter, EnumString, IntoStaticStr)]
pub(crate) enum AngleFormat {
    /// Degrees
    #[strum(serialize = "deg")]
    Deg,

    /// Arcseconds
    #[strum(serialize = "arcsec")]
    Arcsec,

    /// Milliarcseconds
    #[strum(serialize = "mas")]
    Mas,
}

impl AngleFormat {
    /// Convert a quantity in this unit to arcseconds.
    pub(crate) fn to_arcsec(self, quantity: f64) -> f64 {
        match self {
            AngleFormat::Deg => quantity * 3600.0,
            AngleFormat::Arcsec => quantity,
            AngleFormat::Mas => quantity / 1000.0,
        }
    }
}

#[derive(Debug, Display, Clone, Copy, PartialEq, EnumIter, EnumString, IntoStaticStr)]
#[allow(non_camel_case_types)]
pub(crate) enum FluxDensityFormat {
    /// Janskys
    #[strum(serialize = "Jy")]
    Jy,

    /// Millijanskys
    #[strum(serialize = "mJy")]
    mJy,

    /// Microjanskys
    #[strum(serialize = "uJy")]
    uJy,
}

/// Parse a string that may have an angle unit attached to it. A naked
/// number has no unit and the caller decides what to assume.
pub(crate) fn parse_angle(s: &str) -> Result<(f64, Option<AngleFormat>), UnitParseError> {
    parse_quantity(s, "angle")
}

/// Parse a string that may have a flux-density unit attached to it.
pub(crate) fn parse_flux_density(
    s: &str,
) -> Result<(f64, Option<FluxDensityFormat>), UnitParseError> {
    parse_quantity(s, "flux density")
}

fn parse_quantity<U>(s: &str, unit_type: &'static str) -> Result<(f64, Option<U>), UnitParseError>
where
    U: IntoEnumIterator + Into<&'static str> + Copy,
{
    // Try to parse a naked number.
    if let Ok(number) = s.trim().parse::<f64>() {
        return Ok((number, None));
    }

    // That didn't work; split off the trailing unit and search over the
    // supported formats.
    let trimmed = s.trim();
    let suffix = trimmed
        .trim_start_matches(|c| char::is_numeric(c) || c == '.' || c == '-' || c == '+')
        .trim();
    let prefix = &trimmed[..trimmed.len() - suffix.len()];

    for unit in U::iter() {
        let unit_str: &'static str = unit.into();
        if suffix.eq_ignore_ascii_case(unit_str) {
            let number: f64 = match prefix.trim().parse() {
                Ok(n) => n,
                Err(_) => {
                    return Err(UnitParseError::GotUnitButCantParse {
                        input: s.to_string(),
                        unit: unit_str,
                    })
                }
            };
            return Ok((number, Some(unit)));
        }
    }

    // If we made it this far, we don't know how to parse the string.
    Err(UnitParseError::Unknown {
        input: s.to_string(),
        unit_type,
    })
}
