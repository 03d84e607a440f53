//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Bounded random-walk and sticky-status value models."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
//! The two primitives every generator is built from.
//!
//! A [`WalkSpec`] describes the operating envelope of one continuous field:
//! its bounds, the largest change allowed between consecutive ticks, and the
//! number of decimal digits it is published with. [`sticky_status`] does the
//! same job for categorical fields.

use rand::seq::SliceRandom;
use rand::Rng;
use strum::VariantArray;

/// Operating envelope for a random-walk field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkSpec {
    pub min: f64,
    pub max: f64,
    pub max_step: f64,
    pub precision: u32,
}

impl WalkSpec {
    pub const fn new(min: f64, max: f64, max_step: f64, precision: u32) -> Self {
        Self {
            min,
            max,
            max_step,
            precision,
        }
    }

    /// Cold-start draw: uniform over the whole envelope.
    pub fn initial<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        round_to(rng.gen_range(self.min..=self.max), self.precision)
    }

    /// Next value of the walk starting from `current`.
    pub fn step<R: Rng + ?Sized>(&self, rng: &mut R, current: f64) -> f64 {
        bounded_walk(rng, current, self.min, self.max, self.max_step, self.precision)
    }

    /// Walk over whole numbers, for counters published as integers.
    pub fn step_count<R: Rng + ?Sized>(&self, rng: &mut R, current: u32) -> u32 {
        let next = bounded_walk(rng, f64::from(current), self.min, self.max, self.max_step, 0);
        next.max(0.0) as u32
    }

    /// Whether `value` lies inside the envelope.
    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Draw a step from `[-max_step, +max_step]`, add it to `current`, clamp to
/// `[min, max]` and round to `precision` decimal digits.
///
/// `min > max` is a caller bug and panics inside `f64::clamp`.
pub fn bounded_walk<R: Rng + ?Sized>(
    rng: &mut R,
    current: f64,
    min: f64,
    max: f64,
    max_step: f64,
    precision: u32,
) -> f64 {
    let delta = rng.gen_range(-max_step..=max_step);
    round_to((current + delta).clamp(min, max), precision)
}

/// Round half away from zero to `precision` decimal digits.
pub fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).round() / factor
}

/// With probability `change_probability` move to a uniformly chosen member of
/// `allowed` other than `current`; otherwise hold. Falls back to `current` when
/// no alternative exists.
pub fn sticky_status<R, T>(rng: &mut R, current: T, allowed: &[T], change_probability: f64) -> T
where
    R: Rng + ?Sized,
    T: Copy + PartialEq,
{
    if rng.gen::<f64>() >= change_probability {
        return current;
    }
    let alternatives: Vec<T> = allowed.iter().copied().filter(|s| *s != current).collect();
    alternatives.choose(rng).copied().unwrap_or(current)
}

/// Sticky transition over every variant of a status enum.
pub fn sticky_variant<R, T>(rng: &mut R, current: T, change_probability: f64) -> T
where
    R: Rng + ?Sized,
    T: VariantArray + Copy + PartialEq,
{
    sticky_status(rng, current, T::VARIANTS, change_probability)
}

/// Uniform cold-start draw over the variants of a status enum.
pub fn any_variant<R, T>(rng: &mut R) -> T
where
    R: Rng + ?Sized,
    T: VariantArray + Copy,
{
    T::VARIANTS[rng.gen_range(0..T::VARIANTS.len())]
}

/// Monotonic counter: add `0..=max_increment` to `current`.
pub fn accumulate<R: Rng + ?Sized>(rng: &mut R, current: u64, max_increment: u64) -> u64 {
    current.saturating_add(rng.gen_range(0..=max_increment))
}
