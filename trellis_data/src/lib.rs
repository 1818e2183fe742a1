// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Trellis Data: the data model shared by every Trellis crate.
//!
//! - [`Value`]: a dynamic datum (numbers, text, timestamps, nested records).
//! - [`Dataset`]: a shared, observable handle to an ordered list of records plus metadata.
//! - [`Accessor`]: how a projection reads a value out of a datum (constant, field, or function).
//! - [`Extent`]: the minimal domain covering a set of observed values.
//! - [`CallbackSet`]: the ordered listener list used by datasets and scales.
//! - [`Rgb`]: `#rrggbb` colours, shared by colour scales and attribute tweens.
//!
//! Everything here is single-threaded. Handles are cheap to clone and share state through
//! `Rc`, so a dataset can be bound to several plots at once and every holder sees the same data.
//!
//! ```
//! use trellis_data::{Accessor, Dataset, Extent, record};
//!
//! let ds = Dataset::new(vec![
//!     record! { "x" => 0.0, "y" => 3.0 },
//!     record! { "x" => 1.0, "y" => 5.0 },
//! ]);
//! let y = Accessor::field("y").bind();
//! let values: Vec<_> = ds.data().iter().enumerate().map(|(i, d)| y(d, i, &ds)).collect();
//! assert_eq!(Extent::of_values(&values), Extent::Numeric { min: 3.0, max: 5.0 });
//! ```

mod accessor;
mod callback;
mod color;
mod dataset;
mod extent;
mod value;

pub use accessor::{Accessor, AccessorFn};
pub use callback::{CallbackSet, ListenerId};
pub use color::Rgb;
pub use dataset::{Dataset, Metadata};
pub use extent::Extent;
pub use value::Value;
