// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Trellis Layout: the component tree charts are built from.
//!
//! A [`Chart`] owns a forest of components. Leaves implement [`Component`] (plots, axes,
//! labels); tables and groups are containers the chart manages itself. Layout runs in two
//! passes:
//!
//! - **Request**: every component reports the minimum size it wants out of an offer, and
//!   whether that size is fixed. Tables negotiate row and column sizes iteratively, honouring
//!   weights, minimums, and padding. Groups take the per-axis maximum of their children.
//! - **Allocation**: each component gets its final origin and size, aligned inside its cell.
//!
//! Rendering is driven by an [`Environment`]: components (and their listeners) queue render
//! and layout requests, and [`Chart::flush`] runs one coalesced frame. Layout always precedes
//! render, and a layout request anywhere re-lays out the whole tree from its root.
//!
//! Interactions implement [`Interaction`] and are bound to a component with
//! [`Chart::attach_interaction`]. [`Chart::dispatch`] delivers [`InputEvent`]s to live
//! bindings, topmost component first. Bindings on removed components are skipped.
//!
//! ## Minimal example
//!
//! ```
//! use kurbo::{Rect, Size};
//! use trellis_layout::{Chart, Component, Environment, RenderCx, RenderError};
//! use trellis_scene::Scene;
//!
//! #[derive(Debug)]
//! struct Strip(f64);
//!
//! impl Component for Strip {
//!     fn requested_space(&self, _offered: Size) -> Size {
//!         Size::new(self.0, 0.0)
//!     }
//!     fn fixed_width(&self) -> bool {
//!         self.0 > 0.0
//!     }
//!     fn render(&mut self, _cx: &mut RenderCx<'_>) -> Result<(), RenderError> {
//!         Ok(())
//!     }
//! }
//!
//! let mut scene = Scene::new();
//! let surface = scene.insert(None, "svg");
//! let mut chart = Chart::new(Environment::new());
//! let axis = chart.insert(Strip(40.0));
//! let plot = chart.insert(Strip(0.0));
//! let table = chart.add_table(vec![vec![Some(axis), Some(plot)]]).unwrap();
//! chart.render_to(&mut scene, table, surface, Size::new(400.0, 300.0)).unwrap();
//!
//! assert_eq!(chart.bounds(plot), Some(Rect::new(40.0, 0.0, 400.0, 300.0)));
//! ```

mod chart;
mod component;
mod env;
mod error;
mod interaction;
mod table;

pub use chart::{Chart, FrameStats};
pub use component::{
    Component, ComponentElements, Entity, Lifecycle, RenderCx, SetupCx, XAlignment, YAlignment,
};
pub use env::{ComponentId, Environment};
pub use error::{LayoutError, RenderError};
pub use interaction::{
    InputEvent, Interaction, InteractionId, Outcome, PointerButton, Target,
};
