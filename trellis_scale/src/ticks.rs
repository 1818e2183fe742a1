// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tick generation and the default number/time formatters.

use chrono::DateTime;

/// Upper bound on generated ticks; protects against degenerate steps.
const MAX_TICKS: usize = 1_000;

/// Pick a "nice" step (1, 2, 5 or 10 times a power of ten) covering `raw`.
pub(crate) fn nice_step(raw: f64) -> f64 {
    let raw = raw.abs();
    if raw == 0.0 || !raw.is_finite() {
        return 1.0;
    }
    let power = 10_f64.powf(raw.log10().floor());
    let error = raw / power;
    let mult = if error >= 50_f64.sqrt() {
        10.0
    } else if error >= 10_f64.sqrt() {
        5.0
    } else if error >= 2_f64.sqrt() {
        2.0
    } else {
        1.0
    };
    mult * power
}

/// Step between roughly `count` ticks over `[lo, hi]`.
pub(crate) fn tick_step(lo: f64, hi: f64, count: usize) -> f64 {
    #[allow(clippy::cast_precision_loss, reason = "tick counts are small")]
    let count = count.max(1) as f64;
    nice_step((hi - lo) / count)
}

/// Multiples of a nice step inside `[lo, hi]`, in the domain's direction.
pub(crate) fn linear_ticks(lo: f64, hi: f64, count: usize) -> Vec<f64> {
    if !lo.is_finite() || !hi.is_finite() {
        return Vec::new();
    }
    if lo == hi {
        return vec![lo];
    }
    let reversed = lo > hi;
    let (a, b) = if reversed { (hi, lo) } else { (lo, hi) };
    let step = tick_step(a, b, count);
    let first = (a / step).ceil();
    let last = (b / step).floor();
    let mut out = Vec::new();
    let mut k = first;
    while k <= last && out.len() < MAX_TICKS {
        out.push(k * step);
        k += 1.0;
    }
    if reversed {
        out.reverse();
    }
    out
}

/// Widen `[lo, hi]` outward to multiples of the tick step.
pub(crate) fn nice_linear(lo: f64, hi: f64, count: usize) -> (f64, f64) {
    if lo == hi || !lo.is_finite() || !hi.is_finite() {
        return (lo, hi);
    }
    let reversed = lo > hi;
    let (a, b) = if reversed { (hi, lo) } else { (lo, hi) };
    let step = tick_step(a, b, count);
    let (a, b) = ((a / step).floor() * step, (b / step).ceil() * step);
    if reversed { (b, a) } else { (a, b) }
}

/// Integral powers of `base` inside `[lo, hi]`, falling back to linear ticks when fewer than two.
pub(crate) fn log_ticks(lo: f64, hi: f64, base: f64, count: usize) -> Vec<f64> {
    let (a, b) = if lo > hi { (hi, lo) } else { (lo, hi) };
    if a <= 0.0 || !b.is_finite() {
        return Vec::new();
    }
    // Tolerance keeps exact powers whose logarithm lands a hair off an integer.
    let first = (a.ln() / base.ln() - 1e-9).ceil();
    let last = (b.ln() / base.ln() + 1e-9).floor();
    let mut out = Vec::new();
    let mut k = first;
    while k <= last && out.len() < MAX_TICKS {
        #[allow(clippy::cast_possible_truncation, reason = "exponents are small integers")]
        out.push(base.powi(k as i32));
        k += 1.0;
    }
    if out.len() < 2 {
        return linear_ticks(lo, hi, count);
    }
    if lo > hi {
        out.reverse();
    }
    out
}

const SECOND: f64 = 1_000.0;
const MINUTE: f64 = 60.0 * SECOND;
const HOUR: f64 = 60.0 * MINUTE;
const DAY: f64 = 24.0 * HOUR;

/// Calendar-sized steps, smallest first.
const TIME_STEPS: [f64; 18] = [
    SECOND,
    5.0 * SECOND,
    15.0 * SECOND,
    30.0 * SECOND,
    MINUTE,
    5.0 * MINUTE,
    15.0 * MINUTE,
    30.0 * MINUTE,
    HOUR,
    3.0 * HOUR,
    6.0 * HOUR,
    12.0 * HOUR,
    DAY,
    2.0 * DAY,
    7.0 * DAY,
    30.0 * DAY,
    90.0 * DAY,
    365.0 * DAY,
];

/// The smallest calendar step giving at most `count` ticks over `span` milliseconds.
pub(crate) fn time_step(span: f64, count: usize) -> f64 {
    #[allow(clippy::cast_precision_loss, reason = "tick counts are small")]
    let target = span.abs() / count.max(1) as f64;
    TIME_STEPS
        .iter()
        .copied()
        .find(|s| *s >= target)
        .unwrap_or_else(|| (target / (365.0 * DAY)).ceil() * 365.0 * DAY)
}

/// Multiples of a calendar step (milliseconds) inside `[lo, hi]`.
pub(crate) fn time_ticks(lo: f64, hi: f64, count: usize) -> Vec<f64> {
    if !lo.is_finite() || !hi.is_finite() {
        return Vec::new();
    }
    let (a, b) = if lo > hi { (hi, lo) } else { (lo, hi) };
    let step = time_step(b - a, count);
    let mut out = Vec::new();
    let mut t = (a / step).ceil() * step;
    while t <= b && out.len() < MAX_TICKS {
        out.push(t);
        t += step;
    }
    if lo > hi {
        out.reverse();
    }
    out
}

/// General number format: at most three decimals, trailing zeros trimmed.
///
/// ```
/// # use trellis_scale::format_general;
/// assert_eq!(format_general(2.5), "2.5");
/// assert_eq!(format_general(1.0 / 3.0), "0.333");
/// assert_eq!(format_general(-0.0001), "0");
/// ```
pub fn format_general(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let s = format!("{value:.3}");
    let s = if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s.as_str()
    };
    if s == "-0" { "0".to_owned() } else { s.to_owned() }
}

/// Format epoch milliseconds with a precision matched to the tick spacing.
pub(crate) fn format_time(millis: f64, step: f64) -> String {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "finite millisecond timestamps fit in i64"
    )]
    let Some(t) = DateTime::from_timestamp_millis(millis.round() as i64) else {
        return format_general(millis);
    };
    let pattern = if step < MINUTE {
        "%H:%M:%S"
    } else if step < DAY {
        "%H:%M"
    } else if step < 365.0 * DAY {
        "%b %d"
    } else {
        "%Y"
    };
    t.format(pattern).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nice_steps() {
        assert_eq!(nice_step(0.9), 1.0);
        assert_eq!(nice_step(1.5), 2.0);
        assert_eq!(nice_step(3.3), 5.0);
        assert_eq!(nice_step(8.0), 10.0);
        assert_eq!(nice_step(0.0), 1.0);
    }

    #[test]
    fn linear_ticks_cover_domain() {
        assert_eq!(
            linear_ticks(0.0, 10.0, 5),
            vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]
        );
        assert_eq!(linear_ticks(10.0, 0.0, 5).first(), Some(&10.0));
        assert_eq!(linear_ticks(3.0, 3.0, 5), vec![3.0]);
        assert!(linear_ticks(f64::NAN, 1.0, 5).is_empty());
    }

    #[test]
    fn nice_widens_outward() {
        assert_eq!(nice_linear(0.13, 0.97, 10), (0.1, 1.0));
        assert_eq!(nice_linear(0.97, 0.13, 10), (1.0, 0.1));
    }

    #[test]
    fn log_ticks_are_powers() {
        assert_eq!(log_ticks(1.0, 1000.0, 10.0, 10), vec![1.0, 10.0, 100.0, 1000.0]);
        // Not enough powers in range falls back to linear ticks.
        assert!(log_ticks(2.0, 5.0, 10.0, 3).len() >= 2);
    }

    #[test]
    fn time_steps_scale_with_span() {
        assert_eq!(time_step(10.0 * SECOND, 10), SECOND);
        assert_eq!(time_step(DAY, 10), 3.0 * HOUR);
        let ticks = time_ticks(0.0, DAY, 4);
        assert_eq!(ticks.first(), Some(&0.0));
        assert_eq!(ticks.last(), Some(&DAY));
    }

    #[test]
    fn time_format_follows_step() {
        assert_eq!(format_time(0.0, SECOND), "00:00:00");
        assert_eq!(format_time(0.0, HOUR), "00:00");
        assert_eq!(format_time(0.0, DAY), "Jan 01");
        assert_eq!(format_time(0.0, 400.0 * DAY), "1970");
    }
}
