// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The animator seam plus the instant and sequencing animators.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use trellis_data::Value;
use trellis_scene::{ElementId, Scene, Timing};

/// Per-attribute values for a selection, one entry per element in selection order.
pub type AttrValues = BTreeMap<Cow<'static, str>, Vec<Value>>;

/// The elements an animator acts on, in data order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    /// Elements in data order.
    pub elements: Vec<ElementId>,
    /// Whether each element was created by the current join.
    pub entering: Vec<bool>,
}

impl Selection {
    /// A selection where no element is entering.
    pub fn updating(elements: Vec<ElementId>) -> Self {
        let entering = vec![false; elements.len()];
        Self { elements, entering }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the selection is empty.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Whether the element at `i` entered in this join.
    pub fn is_entering(&self, i: usize) -> bool {
        self.entering.get(i).copied().unwrap_or(false)
    }
}

/// Observable completion of one animation.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationHandle {
    /// Scene time the animation starts.
    pub start: f64,
    /// Scene time the last element settles.
    pub end: f64,
    elements: Vec<ElementId>,
}

impl AnimationHandle {
    /// A handle covering `elements` from `start` to `end`.
    pub fn new(start: f64, end: f64, elements: Vec<ElementId>) -> Self {
        Self {
            start,
            end: end.max(start),
            elements,
        }
    }

    /// Whether the scene clock has passed the end, or every element is gone.
    pub fn is_complete(&self, scene: &Scene) -> bool {
        scene.now() >= self.end || self.elements.iter().all(|e| !scene.is_alive(*e))
    }
}

/// Applies computed attribute values to a selection, instantly or over time.
///
/// Animators schedule work on the scene timeline rather than running it, so a drawer can
/// chain steps by start time and defer exit removal until [`Animator::animate_exit`] reports
/// its end.
pub trait Animator: fmt::Debug {
    /// Schedule `attrs` onto `selection` starting at scene time `start`.
    fn animate(
        &self,
        scene: &mut Scene,
        selection: &Selection,
        attrs: &AttrValues,
        start: f64,
    ) -> AnimationHandle;

    /// Total duration of an animation over `n` elements.
    fn total_time(&self, n: usize) -> f64;

    /// Schedule the exit animation for elements about to be removed, returning when it ends.
    ///
    /// The default has no exit animation, so removal happens at `start`.
    fn animate_exit(&self, scene: &mut Scene, exiting: &[ElementId], start: f64) -> f64 {
        let _ = (scene, exiting);
        start
    }
}

/// Applies attributes with zero duration.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullAnimator;

impl Animator for NullAnimator {
    fn animate(
        &self,
        scene: &mut Scene,
        selection: &Selection,
        attrs: &AttrValues,
        start: f64,
    ) -> AnimationHandle {
        apply_at(scene, &selection.elements, attrs, Timing::instant(start));
        AnimationHandle::new(start, start, selection.elements.clone())
    }

    fn total_time(&self, _n: usize) -> f64 {
        0.0
    }
}

/// Schedules every attribute of every element with the same timing.
pub(crate) fn apply_at(
    scene: &mut Scene,
    elements: &[ElementId],
    attrs: &AttrValues,
    timing: Timing,
) {
    for (i, id) in elements.iter().enumerate() {
        for (name, values) in attrs {
            if let Some(v) = values.get(i) {
                scene.transition(*id, name.clone(), v.clone(), timing);
            }
        }
    }
}

/// Runs a sequence of animators over the same selection, each starting when the previous one
/// ends.
#[derive(Clone, Debug, Default)]
pub struct StepAnimator {
    steps: Vec<Rc<dyn Animator>>,
}

impl StepAnimator {
    /// An empty sequence (behaves like [`NullAnimator`] with zero duration).
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an animator.
    pub fn then(mut self, animator: Rc<dyn Animator>) -> Self {
        self.steps.push(animator);
        self
    }
}

impl Animator for StepAnimator {
    fn animate(
        &self,
        scene: &mut Scene,
        selection: &Selection,
        attrs: &AttrValues,
        start: f64,
    ) -> AnimationHandle {
        let n = selection.len();
        let mut at = start;
        for step in &self.steps {
            step.animate(scene, selection, attrs, at);
            at += step.total_time(n);
        }
        AnimationHandle::new(start, at, selection.elements.clone())
    }

    fn total_time(&self, n: usize) -> f64 {
        self.steps.iter().map(|s| s.total_time(n)).sum()
    }

    fn animate_exit(&self, scene: &mut Scene, exiting: &[ElementId], start: f64) -> f64 {
        self.steps
            .last()
            .map_or(start, |s| s.animate_exit(scene, exiting, start))
    }
}
