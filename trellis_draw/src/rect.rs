// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Grow-from-baseline animators for bars.

use trellis_scene::{ElementId, Scene, Timing};

use crate::{AnimationHandle, Animator, AttrValues, EasingAnimator, Selection};

const RECT_ATTRS: [&str; 4] = ["x", "y", "width", "height"];

fn moving_attr(vertical: bool) -> &'static str {
    if vertical { "y" } else { "x" }
}

fn growing_attr(vertical: bool) -> &'static str {
    if vertical { "height" } else { "width" }
}

fn number_at(attrs: &AttrValues, name: &str, i: usize) -> Option<f64> {
    attrs.get(name)?.get(i)?.as_number()
}

/// Force the start state, then hand the final attributes to `inner`.
fn grow(
    inner: &EasingAnimator,
    vertical: bool,
    moving_start: impl Fn(usize) -> Option<f64>,
    scene: &mut Scene,
    selection: &Selection,
    attrs: &AttrValues,
    start: f64,
) -> AnimationHandle {
    let at = Timing::instant(start);
    let (moving, growing) = (moving_attr(vertical), growing_attr(vertical));
    for (i, id) in selection.elements.iter().enumerate() {
        for name in RECT_ATTRS {
            if name == moving || name == growing {
                continue;
            }
            if let Some(v) = attrs.get(name).and_then(|vs| vs.get(i)) {
                scene.transition(*id, name, v.clone(), at);
            }
        }
        if let Some(m) = moving_start(i) {
            scene.transition(*id, moving, m, at);
        }
        scene.transition(*id, growing, 0.0, at);
    }
    inner.animate(scene, selection, attrs, start)
}

/// Bars grow out of their baseline.
///
/// Before tweening to the final attributes, every bar is collapsed: the growing dimension
/// (`height`, or `width` for horizontal bars) is set to zero and the moving position (`y` or
/// `x`) to the bar's far edge, which is the baseline of an upright bar.
#[derive(Clone, Debug)]
pub struct RectAnimator {
    /// Bars are vertical (`y`/`height`) rather than horizontal (`x`/`width`).
    pub vertical: bool,
    /// Bars grow towards decreasing pixel values (e.g. downward vertical bars).
    pub reverse: bool,
    inner: EasingAnimator,
}

impl RectAnimator {
    /// A bar animator using `inner` for the final tween.
    pub fn new(vertical: bool, reverse: bool, inner: EasingAnimator) -> Self {
        Self {
            vertical,
            reverse,
            inner,
        }
    }
}

impl Default for RectAnimator {
    fn default() -> Self {
        Self::new(true, false, EasingAnimator::default())
    }
}

impl Animator for RectAnimator {
    fn animate(
        &self,
        scene: &mut Scene,
        selection: &Selection,
        attrs: &AttrValues,
        start: f64,
    ) -> AnimationHandle {
        let (moving, growing) = (moving_attr(self.vertical), growing_attr(self.vertical));
        let keep_position = self.vertical == self.reverse;
        grow(
            &self.inner,
            self.vertical,
            |i| {
                let m = number_at(attrs, moving, i)?;
                if keep_position {
                    Some(m)
                } else {
                    Some(m + number_at(attrs, growing, i).unwrap_or(0.0))
                }
            },
            scene,
            selection,
            attrs,
            start,
        )
    }

    fn total_time(&self, n: usize) -> f64 {
        self.inner.total_time(n)
    }

    fn animate_exit(&self, scene: &mut Scene, exiting: &[ElementId], start: f64) -> f64 {
        self.inner.animate_exit(scene, exiting, start)
    }
}

/// Bars grow out of a fixed pixel position, such as the plot's zero line.
#[derive(Clone, Debug)]
pub struct MovingRectAnimator {
    /// Pixel the moving position starts from.
    pub start_pixel: f64,
    /// Bars are vertical.
    pub vertical: bool,
    inner: EasingAnimator,
}

impl MovingRectAnimator {
    /// Bars start collapsed at `start_pixel`.
    pub fn new(start_pixel: f64, vertical: bool, inner: EasingAnimator) -> Self {
        Self {
            start_pixel,
            vertical,
            inner,
        }
    }
}

impl Animator for MovingRectAnimator {
    fn animate(
        &self,
        scene: &mut Scene,
        selection: &Selection,
        attrs: &AttrValues,
        start: f64,
    ) -> AnimationHandle {
        let pixel = self.start_pixel;
        grow(
            &self.inner,
            self.vertical,
            |_| Some(pixel),
            scene,
            selection,
            attrs,
            start,
        )
    }

    fn total_time(&self, n: usize) -> f64 {
        self.inner.total_time(n)
    }

    fn animate_exit(&self, scene: &mut Scene, exiting: &[ElementId], start: f64) -> f64 {
        self.inner.animate_exit(scene, exiting, start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AnimatorTiming;
    use trellis_data::Value;
    use trellis_scene::Easing;

    fn bar_attrs() -> AttrValues {
        let mut attrs = AttrValues::new();
        attrs.insert("x".into(), vec![Value::Number(5.0)]);
        attrs.insert("width".into(), vec![Value::Number(10.0)]);
        attrs.insert("y".into(), vec![Value::Number(20.0)]);
        attrs.insert("height".into(), vec![Value::Number(80.0)]);
        attrs
    }

    fn linear() -> EasingAnimator {
        EasingAnimator::new(
            AnimatorTiming::default()
                .with_easing(Easing::Linear)
                .with_step_duration(100.0),
        )
        .unwrap()
    }

    #[test]
    fn upright_bars_start_collapsed_on_the_baseline() {
        let mut scene = Scene::new();
        let bar = scene.insert(None, "rect");
        let sel = Selection::updating(vec![bar]);
        let attrs = bar_attrs();
        RectAnimator::new(true, false, linear()).animate(&mut scene, &sel, &attrs, 0.0);
        assert_eq!(scene.attr_number(bar, "height"), Some(0.0));
        assert_eq!(scene.attr_number(bar, "y"), Some(100.0));
        assert_eq!(scene.attr_number(bar, "x"), Some(5.0));
        scene.advance_to(50.0);
        assert_eq!(scene.attr_number(bar, "height"), Some(40.0));
        assert_eq!(scene.attr_number(bar, "y"), Some(60.0));
        scene.settle();
        assert_eq!(
            (scene.attr_number(bar, "y"), scene.attr_number(bar, "height")),
            (Some(20.0), Some(80.0))
        );
    }

    #[test]
    fn reversed_bars_keep_their_position() {
        let mut scene = Scene::new();
        let bar = scene.insert(None, "rect");
        let sel = Selection::updating(vec![bar]);
        RectAnimator::new(true, true, linear()).animate(&mut scene, &sel, &bar_attrs(), 0.0);
        assert_eq!(scene.attr_number(bar, "y"), Some(20.0));
        assert_eq!(scene.attr_number(bar, "height"), Some(0.0));
    }

    #[test]
    fn moving_rect_starts_at_configured_pixel() {
        let mut scene = Scene::new();
        let bar = scene.insert(None, "rect");
        let sel = Selection::updating(vec![bar]);
        let attrs = bar_attrs();
        MovingRectAnimator::new(60.0, true, linear()).animate(&mut scene, &sel, &attrs, 0.0);
        assert_eq!(scene.attr_number(bar, "y"), Some(60.0));
        scene.settle();
        assert_eq!(scene.attr_number(bar, "y"), Some(20.0));
    }
}
