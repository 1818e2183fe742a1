// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::borrow::Cow;
use std::collections::BTreeMap;

use trellis_data::Value;
use trellis_scene::{Easing, ElementId, Scene, Timing};

use crate::{AnimationHandle, Animator, AttrValues, DrawError, Selection};

/// Timing parameters for [`EasingAnimator`], in milliseconds.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AnimatorTiming {
    /// Delay before the first element starts.
    pub start_delay: f64,
    /// Duration of each element's transition.
    pub step_duration: f64,
    /// Stagger between consecutive elements.
    pub step_delay: f64,
    /// Upper bound on the whole animation; the stagger shrinks to fit.
    pub max_total_duration: f64,
    /// Easing curve.
    pub easing: Easing,
}

impl Default for AnimatorTiming {
    fn default() -> Self {
        Self {
            start_delay: 0.0,
            step_duration: 300.0,
            step_delay: 15.0,
            max_total_duration: f64::INFINITY,
            easing: Easing::CubicInOut,
        }
    }
}

impl AnimatorTiming {
    /// Set the start delay.
    pub fn with_start_delay(mut self, ms: f64) -> Self {
        self.start_delay = ms;
        self
    }

    /// Set the per-element duration.
    pub fn with_step_duration(mut self, ms: f64) -> Self {
        self.step_duration = ms;
        self
    }

    /// Set the stagger.
    pub fn with_step_delay(mut self, ms: f64) -> Self {
        self.step_delay = ms;
        self
    }

    /// Set the total duration cap.
    pub fn with_max_total_duration(mut self, ms: f64) -> Self {
        self.max_total_duration = ms;
        self
    }

    /// Set the easing curve.
    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Reject negative or NaN parameters. The total cap may be infinite.
    pub fn validate(&self) -> Result<(), DrawError> {
        let finite = [
            ("start_delay", self.start_delay),
            ("step_duration", self.step_duration),
            ("step_delay", self.step_delay),
        ];
        for (name, value) in finite {
            if !value.is_finite() || value < 0.0 {
                return Err(DrawError::InvalidTiming { name, value });
            }
        }
        if self.max_total_duration.is_nan() || self.max_total_duration < 0.0 {
            return Err(DrawError::InvalidTiming {
                name: "max_total_duration",
                value: self.max_total_duration,
            });
        }
        Ok(())
    }

    /// The stagger actually used for `n` elements, shrunk so the total fits the cap.
    pub fn adjusted_step_delay(&self, n: usize) -> f64 {
        #[allow(clippy::cast_precision_loss, reason = "element counts are far below 2^52")]
        let gaps = n.saturating_sub(1).max(1) as f64;
        let room = (self.max_total_duration - self.step_duration).max(0.0);
        self.step_delay.min(room / gaps)
    }

    /// Start offset of the element at `index` out of `n`.
    pub fn delay_for(&self, index: usize, n: usize) -> f64 {
        #[allow(clippy::cast_precision_loss, reason = "element counts are far below 2^52")]
        let index = index as f64;
        self.start_delay + index * self.adjusted_step_delay(n)
    }

    /// Total duration for `n` elements.
    pub fn total_time(&self, n: usize) -> f64 {
        #[allow(clippy::cast_precision_loss, reason = "element counts are far below 2^52")]
        let gaps = n.saturating_sub(1) as f64;
        self.start_delay + self.adjusted_step_delay(n) * gaps + self.step_duration
    }
}

/// Tweens each element to its target attributes with a staggered start.
///
/// Entering elements can be given `start_attrs` (applied instantly at the start of the
/// animation), and exiting elements tween to `exit_attrs` before they are removed.
///
/// ```
/// use trellis_draw::{AnimatorTiming, EasingAnimator};
///
/// let timing = AnimatorTiming::default()
///     .with_step_duration(300.0)
///     .with_step_delay(15.0)
///     .with_max_total_duration(330.0);
/// let animator = EasingAnimator::new(timing).unwrap();
/// // Ten elements would need 435ms; the stagger shrinks to 30/9 ms to fit.
/// assert!((trellis_draw::Animator::total_time(&animator, 10) - 330.0).abs() < 1e-9);
/// ```
#[derive(Clone, Debug, Default)]
pub struct EasingAnimator {
    timing: AnimatorTiming,
    start_attrs: BTreeMap<Cow<'static, str>, Value>,
    exit_attrs: BTreeMap<Cow<'static, str>, Value>,
}

impl EasingAnimator {
    /// An animator with validated `timing`.
    pub fn new(timing: AnimatorTiming) -> Result<Self, DrawError> {
        timing.validate()?;
        Ok(Self {
            timing,
            ..Self::default()
        })
    }

    /// The timing in use.
    pub fn timing(&self) -> &AnimatorTiming {
        &self.timing
    }

    /// Set `name` to `value` on entering elements before they animate.
    pub fn with_start_attr(
        mut self,
        name: impl Into<Cow<'static, str>>,
        value: impl Into<Value>,
    ) -> Self {
        self.start_attrs.insert(name.into(), value.into());
        self
    }

    /// Tween `name` to `value` on exiting elements before removing them.
    pub fn with_exit_attr(
        mut self,
        name: impl Into<Cow<'static, str>>,
        value: impl Into<Value>,
    ) -> Self {
        self.exit_attrs.insert(name.into(), value.into());
        self
    }

    fn timing_for(&self, start: f64, index: usize, n: usize) -> Timing {
        Timing {
            start: start + self.timing.delay_for(index, n),
            duration: self.timing.step_duration,
            easing: self.timing.easing,
        }
    }
}

impl Animator for EasingAnimator {
    fn animate(
        &self,
        scene: &mut Scene,
        selection: &Selection,
        attrs: &AttrValues,
        start: f64,
    ) -> AnimationHandle {
        let n = selection.len();
        for (i, id) in selection.elements.iter().enumerate() {
            if selection.is_entering(i) {
                for (name, value) in &self.start_attrs {
                    scene.transition(*id, name.clone(), value.clone(), Timing::instant(start));
                }
            }
            let timing = self.timing_for(start, i, n);
            for (name, values) in attrs {
                if let Some(v) = values.get(i) {
                    scene.transition(*id, name.clone(), v.clone(), timing);
                }
            }
        }
        AnimationHandle::new(
            start,
            start + self.total_time(n),
            selection.elements.clone(),
        )
    }

    fn total_time(&self, n: usize) -> f64 {
        self.timing.total_time(n)
    }

    fn animate_exit(&self, scene: &mut Scene, exiting: &[ElementId], start: f64) -> f64 {
        if self.exit_attrs.is_empty() || exiting.is_empty() {
            return start;
        }
        let n = exiting.len();
        for (i, id) in exiting.iter().enumerate() {
            let timing = self.timing_for(start, i, n);
            for (name, value) in &self.exit_attrs {
                scene.transition(*id, name.clone(), value.clone(), timing);
            }
        }
        start + self.total_time(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_and_nan_timings_are_rejected() {
        let bad = AnimatorTiming::default().with_step_delay(-1.0);
        assert_eq!(
            EasingAnimator::new(bad).unwrap_err(),
            DrawError::InvalidTiming {
                name: "step_delay",
                value: -1.0
            }
        );
        assert!(
            AnimatorTiming::default()
                .with_max_total_duration(f64::NAN)
                .validate()
                .is_err()
        );
        assert!(AnimatorTiming::default().validate().is_ok());
    }

    #[test]
    fn total_time_uses_default_stagger() {
        let t = AnimatorTiming::default();
        assert_eq!(t.total_time(0), 300.0);
        assert_eq!(t.total_time(1), 300.0);
        assert_eq!(t.total_time(5), 300.0 + 4.0 * 15.0);
        assert_eq!(t.delay_for(2, 5), 30.0);
    }

    #[test]
    fn stagger_shrinks_to_the_cap_but_not_below_zero() {
        let t = AnimatorTiming::default().with_max_total_duration(100.0);
        assert_eq!(t.adjusted_step_delay(10), 0.0);
        assert_eq!(t.total_time(10), 300.0);
    }

    #[test]
    fn entering_elements_start_from_start_attrs() {
        let animator = EasingAnimator::new(
            AnimatorTiming::default()
                .with_easing(Easing::Linear)
                .with_step_delay(0.0),
        )
        .unwrap()
        .with_start_attr("opacity", 0.0);
        let mut scene = Scene::new();
        let old = scene.insert(None, "circle");
        scene.set_attr(old, "opacity", 1.0);
        let new = scene.insert(None, "circle");
        let selection = Selection {
            elements: vec![old, new],
            entering: vec![false, true],
        };
        let mut attrs = AttrValues::new();
        attrs.insert("opacity".into(), vec![Value::Number(0.5), Value::Number(1.0)]);
        animator.animate(&mut scene, &selection, &attrs, 0.0);
        scene.advance_to(150.0);
        assert_eq!(scene.attr_number(old, "opacity"), Some(0.75));
        assert_eq!(scene.attr_number(new, "opacity"), Some(0.5));
    }

    #[test]
    fn exit_tweens_end_at_reported_time() {
        let animator = EasingAnimator::new(AnimatorTiming::default())
            .unwrap()
            .with_exit_attr("opacity", 0.0);
        let mut scene = Scene::new();
        let a = scene.insert(None, "circle");
        let b = scene.insert(None, "circle");
        let end = animator.animate_exit(&mut scene, &[a, b], 10.0);
        assert_eq!(end, 10.0 + 315.0);
        assert_eq!(
            EasingAnimator::default().animate_exit(&mut scene, &[a], 10.0),
            10.0
        );
    }
}
