// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Trellis Interaction: gesture recognizers for chart components.
//!
//! Each recognizer implements [`Interaction`] and is bound to one component with
//! [`Chart::attach_interaction`](trellis_layout::Chart::attach_interaction). The chart feeds it
//! raw [`InputEvent`]s in surface coordinates along with a [`Target`] describing the bound
//! component; recognizers translate those into callbacks in the component's local space:
//!
//! - [`ClickInteraction`]: clicks and double clicks, as points.
//! - [`DragInteraction`]: drags, as rectangles from the drag origin to the pointer.
//! - [`PanZoomInteraction`]: drags pan and the wheel zooms continuous scales.
//! - [`KeyInteraction`]: key presses while the pointer is over the component.
//! - [`HoverInteraction`]: the entity nearest the pointer.
//!
//! Recognizers are cheap-clone handles. Keep a clone to register listeners or inspect state
//! after handing one to the chart. A recognizer whose component is removed simply stops
//! receiving events.
//!
//! ## Minimal example
//!
//! ```
//! use kurbo::{Point, Size};
//! use trellis_interaction::{InputEvent, PanZoomInteraction, PointerButton};
//! use trellis_layout::{Chart, Environment};
//! use trellis_plot::ScatterPlot;
//! use trellis_scale::{LinearScale, QuantitativeScale, Scale};
//! use trellis_scene::Scene;
//!
//! let x = LinearScale::new();
//! x.set_domain([0.0, 10.0]).unwrap();
//! let plot = ScatterPlot::new();
//! plot.x("x", &x).y("y", &LinearScale::new());
//!
//! let mut scene = Scene::new();
//! let surface = scene.insert(None, "svg");
//! let mut chart = Chart::new(Environment::new());
//! let id = chart.insert(plot);
//! let pan_zoom = PanZoomInteraction::new();
//! pan_zoom.add_x_scale(&x);
//! chart.attach_interaction(id, pan_zoom).unwrap();
//! chart.render_to(&mut scene, id, surface, Size::new(100.0, 100.0)).unwrap();
//!
//! // Drag 20 pixels to the left: the view moves 2 units to the right.
//! let button = PointerButton::Primary;
//! for event in [
//!     InputEvent::PointerDown { position: Point::new(60.0, 50.0), button, time: 0.0 },
//!     InputEvent::PointerMove { position: Point::new(40.0, 50.0), time: 1.0 },
//!     InputEvent::PointerUp { position: Point::new(40.0, 50.0), button, time: 2.0 },
//! ] {
//!     chart.dispatch(&scene, &event);
//! }
//! let (min, max) = x.numeric_domain();
//! assert!((min - 2.0).abs() < 1e-9 && (max - 12.0).abs() < 1e-9);
//! ```

mod click;
mod drag;
mod hover;
mod key;
mod pan_zoom;

pub use click::{ClickConfig, ClickInteraction};
pub use drag::{DragConstraint, DragInteraction, DragPhase};
pub use hover::HoverInteraction;
pub use key::KeyInteraction;
pub use pan_zoom::{PanZoomInteraction, ZoomLimits};

pub use trellis_layout::{InputEvent, Interaction, Outcome, PointerButton, Target};
