// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The backing transforms of continuous scales.

use std::fmt;

use chrono::{DateTime, Utc};
use trellis_data::Value;

use crate::{ScaleError, ticks};

/// A monotonic mapping from domain numbers into a linear "transformed" space.
///
/// [`ContinuousScale`](crate::ContinuousScale) interpolates in transformed space, so a
/// transform only has to describe the curve, the default domain, and how to tick and
/// round its domain.
pub trait Transform: Clone + fmt::Debug + 'static {
    /// The typed domain value (`f64` or a timestamp).
    type Value: Copy + PartialEq + fmt::Debug;

    /// Name used in error messages.
    const NAME: &'static str;

    /// The number a typed domain value stands for.
    fn to_number(value: Self::Value) -> f64;

    /// The typed domain value a number stands for.
    fn from_number(number: f64) -> Self::Value;

    /// The dynamic form of a number, returned by inversion.
    fn to_dynamic(number: f64) -> Value;

    /// Into transformed space.
    fn forward(&self, x: f64) -> f64;

    /// Out of transformed space.
    fn inverse(&self, y: f64) -> f64;

    /// Reject domains the transform cannot represent.
    fn validate(&self, min: f64, max: f64) -> Result<(), ScaleError> {
        if min.is_finite() && max.is_finite() {
            Ok(())
        } else {
            Err(ScaleError::invalid_domain(
                &[min, max],
                "domain values must be finite",
            ))
        }
    }

    /// Domain used when no extents are registered.
    fn default_domain(&self) -> (f64, f64);

    /// Widen a single observed value into a usable domain.
    fn expand_single(&self, value: f64) -> (f64, f64);

    /// Round the domain outward to tick boundaries.
    fn nice(&self, min: f64, max: f64, count: usize) -> (f64, f64);

    /// Tick values inside the domain.
    fn ticks(&self, min: f64, max: f64, count: usize) -> Vec<f64>;

    /// Default tick label.
    fn format(&self, value: f64, min: f64, max: f64, count: usize) -> String {
        let _ = (min, max, count);
        ticks::format_general(value)
    }

    /// Whether auto domains are rounded by default.
    fn snaps_by_default(&self) -> bool {
        true
    }
}

/// Identity transform.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Linear;

impl Transform for Linear {
    type Value = f64;
    const NAME: &'static str = "linear";

    fn to_number(value: f64) -> f64 {
        value
    }

    fn from_number(number: f64) -> f64 {
        number
    }

    fn to_dynamic(number: f64) -> Value {
        Value::Number(number)
    }

    fn forward(&self, x: f64) -> f64 {
        x
    }

    fn inverse(&self, y: f64) -> f64 {
        y
    }

    fn default_domain(&self) -> (f64, f64) {
        (0.0, 1.0)
    }

    fn expand_single(&self, value: f64) -> (f64, f64) {
        (value - 1.0, value + 1.0)
    }

    fn nice(&self, min: f64, max: f64, count: usize) -> (f64, f64) {
        ticks::nice_linear(min, max, count)
    }

    fn ticks(&self, min: f64, max: f64, count: usize) -> Vec<f64> {
        ticks::linear_ticks(min, max, count)
    }
}

/// Logarithmic transform. Domains must be strictly positive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Log {
    base: f64,
}

impl Log {
    /// A log transform in `base`. Bases that are not finite and greater than 1 fall back to 10.
    pub fn new(base: f64) -> Self {
        let base = if base.is_finite() && base > 1.0 {
            base
        } else {
            10.0
        };
        Self { base }
    }

    /// The logarithm base.
    pub fn base(&self) -> f64 {
        self.base
    }
}

impl Default for Log {
    fn default() -> Self {
        Self { base: 10.0 }
    }
}

impl Transform for Log {
    type Value = f64;
    const NAME: &'static str = "log";

    fn to_number(value: f64) -> f64 {
        value
    }

    fn from_number(number: f64) -> f64 {
        number
    }

    fn to_dynamic(number: f64) -> Value {
        Value::Number(number)
    }

    fn forward(&self, x: f64) -> f64 {
        x.ln() / self.base.ln()
    }

    fn inverse(&self, y: f64) -> f64 {
        self.base.powf(y)
    }

    fn validate(&self, min: f64, max: f64) -> Result<(), ScaleError> {
        if !(min.is_finite() && max.is_finite()) {
            return Err(ScaleError::invalid_domain(
                &[min, max],
                "domain values must be finite",
            ));
        }
        if min <= 0.0 || max <= 0.0 {
            return Err(ScaleError::invalid_domain(
                &[min, max],
                "log domains must be strictly positive",
            ));
        }
        Ok(())
    }

    fn default_domain(&self) -> (f64, f64) {
        (1.0, self.base)
    }

    fn expand_single(&self, value: f64) -> (f64, f64) {
        (value / self.base, value * self.base)
    }

    fn nice(&self, min: f64, max: f64, _count: usize) -> (f64, f64) {
        let snap = |v: f64, up: bool| {
            let e = self.forward(v);
            let e = if up { e.ceil() } else { e.floor() };
            self.inverse(e)
        };
        if min <= max {
            (snap(min, false), snap(max, true))
        } else {
            (snap(min, true), snap(max, false))
        }
    }

    fn ticks(&self, min: f64, max: f64, count: usize) -> Vec<f64> {
        ticks::log_ticks(min, max, self.base, count)
    }
}

/// Symmetric log: logarithmic above `pivot`, linear-ish below it, defined for zero and
/// negative values.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModifiedLog {
    base: f64,
    pivot: f64,
}

impl ModifiedLog {
    /// A modified log in `base`, switching to the linear regime below `base`.
    pub fn new(base: f64) -> Self {
        let base = if base.is_finite() && base > 1.0 {
            base
        } else {
            10.0
        };
        Self { base, pivot: base }
    }
}

impl Default for ModifiedLog {
    fn default() -> Self {
        Self::new(10.0)
    }
}

impl Transform for ModifiedLog {
    type Value = f64;
    const NAME: &'static str = "modified log";

    fn to_number(value: f64) -> f64 {
        value
    }

    fn from_number(number: f64) -> f64 {
        number
    }

    fn to_dynamic(number: f64) -> Value {
        Value::Number(number)
    }

    fn forward(&self, x: f64) -> f64 {
        let sign = if x < 0.0 { -1.0 } else { 1.0 };
        let mut x = x * sign;
        if x < self.pivot {
            x += (self.pivot - x) / self.pivot;
        }
        sign * x.ln() / self.base.ln()
    }

    fn inverse(&self, y: f64) -> f64 {
        let sign = if y < 0.0 { -1.0 } else { 1.0 };
        let mut x = self.base.powf(y * sign);
        if x < self.pivot {
            x = self.pivot * (x - 1.0) / (self.pivot - 1.0);
        }
        sign * x
    }

    fn default_domain(&self) -> (f64, f64) {
        (0.0, 1.0)
    }

    fn expand_single(&self, value: f64) -> (f64, f64) {
        (value - 1.0, value + 1.0)
    }

    fn nice(&self, min: f64, max: f64, _count: usize) -> (f64, f64) {
        (min, max)
    }

    fn ticks(&self, min: f64, max: f64, count: usize) -> Vec<f64> {
        ticks::linear_ticks(min, max, count)
    }

    fn snaps_by_default(&self) -> bool {
        false
    }
}

/// Time transform over epoch milliseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Time;

const DAY_MS: f64 = 86_400_000.0;

impl Transform for Time {
    type Value = DateTime<Utc>;
    const NAME: &'static str = "time";

    fn to_number(value: DateTime<Utc>) -> f64 {
        #[allow(
            clippy::cast_precision_loss,
            reason = "millisecond timestamps stay well inside f64's exact integer range"
        )]
        let ms = value.timestamp_millis() as f64;
        ms
    }

    fn from_number(number: f64) -> DateTime<Utc> {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "saturating conversion; out-of-range instants fall back to the epoch"
        )]
        let ms = number.round() as i64;
        DateTime::from_timestamp_millis(ms).unwrap_or_default()
    }

    fn to_dynamic(number: f64) -> Value {
        Value::Time(Self::from_number(number))
    }

    fn forward(&self, x: f64) -> f64 {
        x
    }

    fn inverse(&self, y: f64) -> f64 {
        y
    }

    fn default_domain(&self) -> (f64, f64) {
        (0.0, DAY_MS)
    }

    fn expand_single(&self, value: f64) -> (f64, f64) {
        (value - DAY_MS, value + DAY_MS)
    }

    fn nice(&self, min: f64, max: f64, _count: usize) -> (f64, f64) {
        (min, max)
    }

    fn ticks(&self, min: f64, max: f64, count: usize) -> Vec<f64> {
        ticks::time_ticks(min, max, count)
    }

    fn format(&self, value: f64, min: f64, max: f64, count: usize) -> String {
        ticks::format_time(value, ticks::time_step(max - min, count))
    }

    fn snaps_by_default(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modified_log_is_symmetric_and_invertible() {
        let t = ModifiedLog::default();
        assert_eq!(t.forward(0.0), 0.0);
        for x in [-250.0, -3.0, 0.0, 0.5, 7.0, 1_000.0] {
            assert!((t.inverse(t.forward(x)) - x).abs() < 1e-9, "round trip of {x}");
        }
        assert!((t.forward(-50.0) + t.forward(50.0)).abs() < 1e-12);
    }

    #[test]
    fn log_rejects_non_positive() {
        let t = Log::default();
        assert!(t.validate(0.0, 10.0).is_err());
        assert!(t.validate(-1.0, 10.0).is_err());
        assert!(t.validate(1.0, 10.0).is_ok());
        let (lo, hi) = t.nice(2.0, 300.0, 10);
        assert!((lo - 1.0).abs() < 1e-9 && (hi - 1000.0).abs() < 1e-9, "got {lo}, {hi}");
    }

    #[test]
    fn time_converts_through_millis() {
        let t = Time::from_number(1_000.0);
        assert_eq!(Time::to_number(t), 1_000.0);
        assert!(matches!(Time::to_dynamic(0.0), Value::Time(_)));
    }
}
