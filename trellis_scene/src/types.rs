// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the scene: element identifiers, flags, and transition timing.

/// Identifier for an element in a [`Scene`](crate::Scene) (generational).
///
/// Ids of removed elements are stale: the scene ignores them, even if the slot has since been
/// reused by a new element.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub(crate) u32, pub(crate) u32);

impl ElementId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

bitflags::bitflags! {
    /// Element flags.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ElementFlags: u8 {
        /// Element is drawn.
        const VISIBLE = 0b0000_0001;
        /// Element is scheduled for removal and only kept alive for an exit transition.
        const EXITING = 0b0000_0010;
    }
}

impl Default for ElementFlags {
    fn default() -> Self {
        Self::VISIBLE
    }
}

/// Easing curves for transitions, mapping progress in `[0, 1]` to eased progress.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Easing {
    /// Constant speed.
    Linear,
    /// Quadratic acceleration.
    QuadIn,
    /// Quadratic deceleration.
    QuadOut,
    /// Quadratic ease in and out.
    QuadInOut,
    /// Cubic acceleration.
    CubicIn,
    /// Cubic deceleration.
    CubicOut,
    /// Cubic ease in and out.
    #[default]
    CubicInOut,
    /// Exponential ease in and out.
    ExpInOut,
}

impl Easing {
    /// Eased progress for `t`, clamped to `[0, 1]`.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::QuadIn => t * t,
            Self::QuadOut => t * (2.0 - t),
            Self::QuadInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Self::CubicIn => t * t * t,
            Self::CubicOut => 1.0 - (1.0 - t).powi(3),
            Self::CubicInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            Self::ExpInOut => {
                if t == 0.0 || t == 1.0 {
                    t
                } else if t < 0.5 {
                    2_f64.powf(20.0 * t - 10.0) / 2.0
                } else {
                    (2.0 - 2_f64.powf(-20.0 * t + 10.0)) / 2.0
                }
            }
        }
    }
}

/// When and how an attribute transition runs, in scene milliseconds.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Timing {
    /// Absolute start time.
    pub start: f64,
    /// Duration; zero applies the value at `start`.
    pub duration: f64,
    /// Easing curve.
    pub easing: Easing,
}

impl Timing {
    /// Apply at `start` with no interpolation.
    pub const fn instant(start: f64) -> Self {
        Self {
            start,
            duration: 0.0,
            easing: Easing::Linear,
        }
    }

    /// The time the transition completes.
    pub fn end(&self) -> f64 {
        self.start + self.duration.max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn easings_hit_endpoints() {
        for e in [
            Easing::Linear,
            Easing::QuadIn,
            Easing::QuadOut,
            Easing::QuadInOut,
            Easing::CubicIn,
            Easing::CubicOut,
            Easing::CubicInOut,
            Easing::ExpInOut,
        ] {
            assert!(e.apply(0.0).abs() < 1e-12, "{e:?} at 0");
            assert!((e.apply(1.0) - 1.0).abs() < 1e-12, "{e:?} at 1");
            assert!((e.apply(2.0) - 1.0).abs() < 1e-12, "{e:?} clamps");
        }
        assert_eq!(Easing::CubicInOut.apply(0.5), 0.5);
    }
}
