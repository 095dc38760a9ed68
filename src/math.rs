// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The handful of numbers this crate derives itself rather than asking CASA
//! for: Gaussian-beam unit conversion for feathering, and CASA's notion of
//! an "optimum" image size.

use crate::constants::{BOLTZMANN, PI, VEL_C};

const ARCSEC_TO_RAD: f64 = PI / (180.0 * 3600.0);

/// The solid angle of an elliptical Gaussian beam \[sr\], given its major
/// and minor FWHM in radians.
pub(crate) fn gaussian_beam_solid_angle(theta_maj_rad: f64, theta_min_rad: f64) -> f64 {
    PI / (4.0 * std::f64::consts::LN_2) * theta_maj_rad * theta_min_rad
}

/// The factor converting a brightness temperature \[K\] into \[Jy/beam\]
/// for a Gaussian beam with the given FWHM axes \[arcsec\] at the given
/// frequency \[Hz\]. Single-dish images commonly arrive in K and must be
/// scaled before feathering against an interferometric Jy/beam image.
pub(crate) fn jy_per_beam_per_kelvin(freq_hz: f64, bmaj_arcsec: f64, bmin_arcsec: f64) -> f64 {
    let omega = gaussian_beam_solid_angle(bmaj_arcsec * ARCSEC_TO_RAD, bmin_arcsec * ARCSEC_TO_RAD);
    let lambda = VEL_C / freq_hz;
    2.0 * BOLTZMANN / (lambda * lambda) * 1e26 * omega
}

/// The smallest even integer >= `size` whose prime factors are all in
/// {2, 3, 5}. FFT gridding is fastest on such sizes; this mirrors what
/// `synthesisutils.getOptimumSize` reports for the image sizes used here.
pub(crate) fn optimum_image_size(size: usize) -> usize {
    fn is_smooth(mut n: usize) -> bool {
        for p in [2, 3, 5] {
            while n % p == 0 {
                n /= p;
            }
        }
        n == 1
    }

    let mut candidate = size.max(2);
    if candidate % 2 == 1 {
        candidate += 1;
    }
    while !is_smooth(candidate) {
        candidate += 2;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn test_beam_solid_angle_against_script_values() {
        // The NGC 3351 single-dish beam used in the feathering tutorial.
        let bmaj = 28.0 * ARCSEC_TO_RAD;
        let bmin = 28.0 * ARCSEC_TO_RAD;
        let omega = gaussian_beam_solid_angle(bmaj, bmin);
        assert_relative_eq!(omega, 2.0869e-8, max_relative = 1e-3);
    }

    #[test]
    fn test_jy_per_beam_per_kelvin() {
        // 2k/λ² · 10²⁶ · Ω at the CO(2-1) frequency for a 28" beam.
        let factor = jy_per_beam_per_kelvin(2.30538e11, 28.0, 28.0);
        let lambda = VEL_C / 2.30538e11;
        let expected = 2.0 * BOLTZMANN / (lambda * lambda)
            * 1e26
            * (PI / (4.0 * std::f64::consts::LN_2) * (28.0 * ARCSEC_TO_RAD).powi(2));
        assert_relative_eq!(factor, expected);
        // Sanity: a ~half-arcmin beam at 1.3mm is a few hundred Jy/K.
        assert!(factor > 10.0 && factor < 1e4);
    }

    #[test]
    fn test_optimum_image_size_fixed_points() {
        // Sizes that appear in the tutorials are already optimal.
        for size in [300, 320, 1152, 2304] {
            assert_eq!(optimum_image_size(size), size);
        }
    }

    #[test]
    fn test_optimum_image_size_rounds_up() {
        assert_eq!(optimum_image_size(1), 2);
        assert_eq!(optimum_image_size(7), 8);
        assert_eq!(optimum_image_size(1023), 1024);
        assert_eq!(optimum_image_size(1153), 1200);
        // Odd smooth numbers are rejected; the result must be even.
        assert_eq!(optimum_image_size(81), 90);
    }
}
