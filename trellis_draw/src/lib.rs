// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Trellis Draw: reconcile data against scene elements and animate the result.
//!
//! A [`Drawer`] owns a group element and one primitive per datum. Each
//! [`Drawer::draw`] joins the dataset against the existing primitives by key, creates entering
//! elements, and runs a sequence of [`DrawStep`]s. A step pairs attribute projectors with an
//! [`Animator`], which schedules the computed values on the scene timeline.
//!
//! Animators:
//! - [`NullAnimator`]: zero-duration application, for initial paint and non-animated redraws.
//! - [`EasingAnimator`]: staggered eased tweens configured by [`AnimatorTiming`].
//! - [`StepAnimator`]: a sequence of animators, each starting when the previous ends.
//! - [`RectAnimator`] and [`MovingRectAnimator`]: bars grow from a baseline.
//!
//! Exiting primitives are removed when the last step's exit animation ends. Because removal
//! goes through the scene timeline, a primitive removed mid-animation is never touched again.

mod animator;
mod drawer;
mod easing;
mod error;
mod rect;

pub use animator::{AnimationHandle, Animator, AttrValues, NullAnimator, Selection, StepAnimator};
pub use drawer::{AttrProjector, AttrToProjector, DatumKey, DrawStep, Drawer, Join, KeyFn};
pub use easing::{AnimatorTiming, EasingAnimator};
pub use error::DrawError;
pub use rect::{MovingRectAnimator, RectAnimator};
