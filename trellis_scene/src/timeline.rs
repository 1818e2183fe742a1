// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Attribute tweens and their interpolation.

use std::borrow::Cow;

use trellis_data::{Rgb, Value};

use crate::{ElementId, Timing};

/// One scheduled attribute change.
#[derive(Clone, Debug)]
pub(crate) struct Tween {
    pub(crate) element: ElementId,
    pub(crate) name: Cow<'static, str>,
    /// Captured when the tween becomes due, so chained tweens start where the previous ended.
    pub(crate) from: Option<Value>,
    pub(crate) to: Value,
    pub(crate) timing: Timing,
    /// Insertion order; breaks ties between tweens due at the same instant.
    pub(crate) seq: u64,
    pub(crate) done: bool,
}

impl Tween {
    pub(crate) fn progress(&self, now: f64) -> f64 {
        if self.timing.duration <= 0.0 {
            return 1.0;
        }
        ((now - self.timing.start) / self.timing.duration).clamp(0.0, 1.0)
    }

    pub(crate) fn value_at(&self, now: f64) -> Value {
        let p = self.progress(now);
        match &self.from {
            Some(from) if p < 1.0 => interpolate(from, &self.to, self.timing.easing.apply(p)),
            _ => self.to.clone(),
        }
    }
}

/// Interpolate between two attribute values.
///
/// Numbers interpolate linearly and `#rgb`/`#rrggbb` colours per channel. Anything else keeps
/// the starting value until the end, then switches.
pub fn interpolate(from: &Value, to: &Value, t: f64) -> Value {
    match (from, to) {
        (Value::Number(a), Value::Number(b)) if a.is_finite() && b.is_finite() => {
            Value::Number(a + (b - a) * t)
        }
        (Value::Text(a), Value::Text(b)) => match (Rgb::parse(a), Rgb::parse(b)) {
            (Some(a), Some(b)) => Value::Text(a.lerp(b, t).to_string()),
            _ if t >= 1.0 => to.clone(),
            _ => from.clone(),
        },
        _ if t >= 1.0 => to.clone(),
        _ => from.clone(),
    }
}
