//! Fixed-point math utilities for deterministic simulation.
//!
//! Lane positions, speeds and probabilities use fixed-point arithmetic so
//! that a seeded battle produces the same result on every platform.
//! Floating-point values only cross into the core through
//! [`fixed_from_f64`].

use fixed::types::I32F32;
use rand::Rng;

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// Serde support for fixed-point numbers written as plain decimals.
///
/// Used by human-edited configuration files, where `1.5` is friendlier
/// than a raw bit pattern. Values are converted once at load time.
pub mod fixed_decimal_serde {
    use super::Fixed;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize a fixed-point number as an `f64`.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(value.to_num::<f64>())
    }

    /// Deserialize a fixed-point number from an `f64`.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = f64::deserialize(deserializer)?;
        super::fixed_from_f64(raw)
            .ok_or_else(|| D::Error::custom(format!("{raw} is not representable as a lane value")))
    }
}

/// Convert an external `f64` into [`Fixed`].
///
/// Returns `None` for NaN, infinities and values outside the fixed-point range.
#[must_use]
pub fn fixed_from_f64(value: f64) -> Option<Fixed> {
    if value.is_finite() {
        Fixed::checked_from_num(value)
    } else {
        None
    }
}

/// Draw a uniform value in `[0, 1)` from 32 random bits.
pub fn unit_interval<R: Rng + ?Sized>(rng: &mut R) -> Fixed {
    Fixed::from_bits(i64::from(rng.gen::<u32>()))
}

/// Roll against a probability in `[0, 1]`.
///
/// Consumes exactly one draw, even when the probability is zero, so the
/// random stream stays aligned regardless of hero stats.
pub fn roll_chance<R: Rng + ?Sized>(rng: &mut R, probability: Fixed) -> bool {
    unit_interval(rng) < probability
}

/// Round to the nearest integer (ties away from zero), saturating at the
/// `i32` bounds.
#[must_use]
pub fn round_to_i32(value: Fixed) -> i32 {
    value.saturating_round().saturating_to_num::<i32>()
}

/// Absolute distance between two lane positions.
#[must_use]
pub fn lane_distance(a: Fixed, b: Fixed) -> Fixed {
    if a > b {
        a - b
    } else {
        b - a
    }
}

/// Move `from` toward `to` by at most `step`, never overshooting.
#[must_use]
pub fn step_toward(from: Fixed, to: Fixed, step: Fixed) -> Fixed {
    if lane_distance(from, to) <= step {
        to
    } else if from < to {
        from + step
    } else {
        from - step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    #[test]
    fn test_unit_interval_bounds() {
        let mut low = StepRng::new(0, 0);
        assert_eq!(unit_interval(&mut low), Fixed::ZERO);

        let mut high = StepRng::new(u64::MAX, 0);
        let value = unit_interval(&mut high);
        assert!(value < Fixed::ONE);
        assert!(value > Fixed::from_num(0.999));
    }

    #[test]
    fn test_roll_chance_zero_never_passes() {
        let mut rng = StepRng::new(0, 0);
        assert!(!roll_chance(&mut rng, Fixed::ZERO));
        assert!(roll_chance(&mut rng, Fixed::from_num(0.01)));
    }

    #[test]
    fn test_round_to_i32() {
        assert_eq!(round_to_i32(Fixed::from_num(13.5)), 14);
        assert_eq!(round_to_i32(Fixed::from_num(13.49)), 13);
        assert_eq!(round_to_i32(Fixed::from_num(-2.5)), -3);
        assert_eq!(round_to_i32(Fixed::MAX), i32::MAX);
    }

    #[test]
    fn test_step_toward_does_not_overshoot() {
        let from = Fixed::from_num(10);
        let step = Fixed::from_num(3);
        assert_eq!(step_toward(from, Fixed::from_num(20), step), Fixed::from_num(13));
        assert_eq!(step_toward(from, Fixed::from_num(4), step), Fixed::from_num(7));
        assert_eq!(step_toward(from, Fixed::from_num(11), step), Fixed::from_num(11));
    }

    #[test]
    fn test_fixed_from_f64_rejects_non_finite() {
        assert!(fixed_from_f64(f64::NAN).is_none());
        assert!(fixed_from_f64(f64::INFINITY).is_none());
        assert!(fixed_from_f64(1e20).is_none());
        assert_eq!(fixed_from_f64(12.5), Some(Fixed::from_num(12.5)));
    }
}
