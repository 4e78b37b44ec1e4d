//! Unit conversions applied before values are put on the wire.

use core::f64::consts::PI;

const FT_TO_M: f64 = 0.30484;
const KTS_TO_MPS: f64 = 0.514_444_45;
const FTPM_TO_MPS: f64 = 0.00508;

pub fn deg_to_rad(degrees: f64) -> f64 {
    degrees * PI / 180.0
}

pub fn ft_to_m(feet: f64) -> f64 {
    feet * FT_TO_M
}

pub fn kts_to_mps(knots: f64) -> f64 {
    knots * KTS_TO_MPS
}

/// Feet per minute to metres per second.
pub fn ftpm_to_mps(feet_per_minute: f64) -> f64 {
    feet_per_minute * FTPM_TO_MPS
}
