// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.

All constants *must* be double precision; the scale factors derived from
them end up in image headers and should not lose precision before CASA
sees them.
 */

pub(crate) use std::f64::consts::PI;

/// Speed of light \[m/s\].
pub(crate) const VEL_C: f64 = 299792458.0;

/// Boltzmann constant \[J/K\].
pub(crate) const BOLTZMANN: f64 = 1.380649e-23;

/// Rest frequency of CO(2-1) \[Hz\], the default line for feathering and
/// quicklook products.
pub(crate) const CO_2_1_FREQ_HZ: f64 = 2.30538e11;

/// The minimum signal-to-noise ratio a gain solution must have to be kept.
pub(crate) const DEFAULT_MIN_SNR: f64 = 3.0;

/// Solution intervals swept by the "explore solution intervals" diagnostic
/// steps of the self-calibration pipeline.
pub(crate) const DEFAULT_SOLINT_SWEEP: [&str; 7] = ["int", "20s", "40s", "60s", "80s", "160s", "inf"];
