// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Trellis Scene: the retained drawing surface charts render into.
//!
//! A [`Scene`] is a generational arena of SVG-like elements. Components and drawers create
//! elements, set attributes, and schedule attribute transitions on the scene's clock; the host
//! advances the clock once per animation frame and mirrors the reported [`Damage`] into its
//! real backend (or serializes with [`Scene::write_svg`]).
//!
//! ## Lifecycle
//!
//! - [`Scene::insert`], [`Scene::remove`], and [`Scene::reparent`] edit structure.
//! - Attributes, classes, text, and translations are set directly.
//! - [`Scene::transition`] schedules a tween; [`Scene::remove_at`] defers a removal.
//! - [`Scene::advance_to`] applies everything due; [`Scene::commit`] reports what changed.
//!
//! Removed element ids stay inert forever: tweens scheduled against them are dropped, setters
//! do nothing, and getters return `None`. Animation callbacks racing a removal therefore never
//! touch a detached element.
//!
//! ## Example
//!
//! ```rust
//! use trellis_scene::Scene;
//!
//! let mut scene = Scene::new();
//! let root = scene.insert(None, "svg");
//! let bar = scene.insert(Some(root), "rect");
//! scene.set_attr(bar, "height", 12.0);
//! scene.remove_at(bar, 300.0);
//!
//! scene.advance_to(300.0);
//! assert!(!scene.is_alive(bar));
//! let damage = scene.commit();
//! assert_eq!(damage.removed, vec![bar]);
//! ```

mod damage;
mod scene;
mod svg;
mod timeline;
mod types;

pub use damage::Damage;
pub use scene::Scene;
pub use timeline::interpolate;
pub use types::{Easing, ElementFlags, ElementId, Timing};
