// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::borrow::Cow;
use std::fmt;

use trellis_data::{ListenerId, Value};

use crate::ScaleError;

/// Identifies one registered extent: who provided it and for which attribute.
///
/// A plot registers one extent per projected attribute, keyed by its own component id, and
/// removes them again when it is removed or re-projected.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExtentKey {
    /// The provider, usually a component id.
    pub provider: u64,
    /// The attribute the extent was computed for.
    pub attr: Cow<'static, str>,
}

impl ExtentKey {
    /// Construct a key.
    pub fn new(provider: u64, attr: impl Into<Cow<'static, str>>) -> Self {
        Self {
            provider,
            attr: attr.into(),
        }
    }
}

/// Identity of a scale handle, stable across clones.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScaleId(pub(crate) usize);

/// The broad family a scale belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ScaleKind {
    /// Continuous, invertible numeric mapping.
    Quantitative,
    /// Discrete bands.
    Categorical,
    /// Maps to colours rather than pixels.
    Color,
}

/// The capabilities every scale shares: an observable, pinnable domain.
///
/// Scales are cheap-clone handles with interior mutability; every clone sees the same domain
/// and the same listeners.
pub trait Scale: Clone + 'static {
    /// The domain representation (`[min, max]` or an ordered category list).
    type Domain: Clone + PartialEq + fmt::Debug;

    /// The current domain.
    fn domain(&self) -> Self::Domain;

    /// Pin the domain to `domain` and notify listeners exactly once.
    fn set_domain(&self, domain: Self::Domain) -> Result<(), ScaleError>;

    /// Unpin the domain and recompute it from the registered extents.
    fn auto_domain(&self);

    /// Whether the domain is currently computed from extents.
    fn is_auto_domain(&self) -> bool;

    /// Register a domain-change listener.
    fn on_domain_change(&self, callback: impl Fn() + 'static) -> ListenerId;

    /// Remove a domain-change listener.
    fn off_domain_change(&self, id: ListenerId) -> bool;

    /// Identity shared by every clone of this handle.
    fn id(&self) -> ScaleId;
}

/// Continuous scales: invertible, pannable and zoomable numeric mappings.
///
/// Numeric methods take and return the quantitative reading of domain values (timestamps as
/// epoch milliseconds) so interactions and axes can treat every continuous scale alike.
pub trait QuantitativeScale: Scale {
    /// The pixel range.
    fn range(&self) -> (f64, f64);

    /// Set the pixel range. Does not notify listeners.
    fn set_range(&self, start: f64, end: f64) -> Result<(), ScaleError>;

    /// The domain as numbers.
    fn numeric_domain(&self) -> (f64, f64);

    /// Pin the domain, given as numbers.
    fn set_numeric_domain(&self, min: f64, max: f64) -> Result<(), ScaleError>;

    /// Map a numeric domain value to a pixel.
    fn scale_number(&self, value: f64) -> f64;

    /// Map a pixel back to a numeric domain value.
    fn invert_number(&self, pixel: f64) -> f64;

    /// Tick values inside the current domain.
    fn ticks(&self) -> Vec<f64>;

    /// Default label for a tick value.
    fn format_tick(&self, value: f64) -> String;

    /// Translate the domain by `translate` pixels: `domain = range.map(r => invert(r + t))`.
    fn pan(&self, translate: f64) -> Result<(), ScaleError> {
        let (r0, r1) = self.range();
        self.set_numeric_domain(
            self.invert_number(r0 + translate),
            self.invert_number(r1 + translate),
        )
    }

    /// Magnify the domain around the pixel `center`.
    ///
    /// Factors below 1 zoom in, above 1 zoom out:
    /// `domain = range.map(r => invert(center - (center - r) * factor))`.
    fn zoom(&self, factor: f64, center: f64) -> Result<(), ScaleError> {
        let (r0, r1) = self.range();
        self.set_numeric_domain(
            self.invert_number(center - (center - r0) * factor),
            self.invert_number(center - (center - r1) * factor),
        )
    }
}

/// Object-safe view of a scale used by plots for projections.
///
/// Values are dynamic ([`Value`]) because a projection's accessor may produce numbers, text, or
/// timestamps; each scale reads the form it understands and yields `NaN` (or a fallback colour)
/// for anything else.
pub trait ProjectionScale: fmt::Debug {
    /// Which family this scale belongs to.
    fn kind(&self) -> ScaleKind;

    /// Identity shared by every clone of the underlying handle.
    fn id(&self) -> ScaleId;

    /// Map a domain value.
    fn scale_value(&self, value: &Value) -> Value;

    /// Map a pixel back to a domain value. Fails for non-invertible scales.
    fn invert_value(&self, pixel: f64) -> Result<Value, ScaleError>;

    /// Register or replace the values observed by `key`, recomputing the domain if automatic.
    fn update_extent(&self, key: ExtentKey, values: &[Value]);

    /// Forget the values observed by `key`.
    fn remove_extent(&self, key: &ExtentKey);

    /// Keep `value` on the edge of the domain when padding (e.g. a bar baseline).
    fn set_padding_exception(&self, key: ExtentKey, value: Option<f64>) {
        let _ = (key, value);
    }

    /// Assign the pixel range.
    fn set_pixel_range(&self, start: f64, end: f64) -> Result<(), ScaleError>;

    /// Band width for banded scales.
    fn band_width(&self) -> Option<f64> {
        None
    }

    /// Register a domain-change listener.
    fn on_change(&self, callback: Box<dyn Fn()>) -> ListenerId;

    /// Remove a domain-change listener.
    fn off_change(&self, id: ListenerId) -> bool;
}
