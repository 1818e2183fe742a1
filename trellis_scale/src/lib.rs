// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Trellis Scale: observable mappings from data domains to pixels and colours.
//!
//! A scale is a cheap-clone handle with interior mutability: plots, axes, and interactions
//! all hold clones of the same scale and observe the same domain.
//!
//! - [`Scale`]: the shared capability set (get/set/auto domain, change listeners).
//! - [`QuantitativeScale`]: continuous scales with `invert`, `pan`, `zoom`, and ticks.
//! - [`ProjectionScale`]: the object-safe seam plots use to map dynamic values and register
//!   extents.
//! - Concrete scales: [`LinearScale`], [`LogScale`], [`ModifiedLogScale`], [`TimeScale`],
//!   [`CategoryScale`], [`ColorScale`], [`InterpolatedColorScale`].
//! - [`ScaleDomainCoordinator`]: keeps several scales on one domain without recursing.
//!
//! ## Automatic domains
//!
//! Until a caller pins it with [`Scale::set_domain`], a scale's domain is computed from the
//! extents registered through [`ProjectionScale::update_extent`]. Extents are keyed by
//! [`ExtentKey`] (a provider id plus attribute name), so each plot can replace or withdraw its
//! own contribution. Continuous scales pad the union, optionally round it to tick boundaries,
//! and honour padding exceptions; categorical scales take the unique values in first-seen order.
//!
//! ```
//! use trellis_data::Value;
//! use trellis_scale::{ExtentKey, LinearScale, ProjectionScale, Scale};
//!
//! let y = LinearScale::new();
//! y.set_pad_proportion(0.0).unwrap();
//! y.set_snapping(false);
//! y.update_extent(ExtentKey::new(1, "y"), &[Value::Number(2.0), Value::Number(8.0)]);
//! assert_eq!(y.domain(), [2.0, 8.0]);
//!
//! // Pinning wins over extents until `auto_domain` is called again.
//! y.set_domain([0.0, 1.0]).unwrap();
//! y.update_extent(ExtentKey::new(1, "y"), &[Value::Number(50.0)]);
//! assert_eq!(y.domain(), [0.0, 1.0]);
//! ```

mod category;
mod color;
mod continuous;
mod coordinator;
mod error;
mod scale;
mod ticks;
mod transform;

pub use category::CategoryScale;
pub use color::{ColorScale, DEFAULT_PALETTE, InterpolatedColorScale, UNKNOWN_COLOR};
pub use continuous::{ContinuousScale, LinearScale, LogScale, ModifiedLogScale, TimeScale};
pub use coordinator::ScaleDomainCoordinator;
pub use error::ScaleError;
pub use scale::{ExtentKey, ProjectionScale, QuantitativeScale, Scale, ScaleId, ScaleKind};
pub use ticks::format_general;
pub use transform::{Linear, Log, ModifiedLog, Time, Transform};
