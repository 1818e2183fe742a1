// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use trellis_data::{CallbackSet, ListenerId, Rgb, Value};

use crate::category::OrdinalDomain;
use crate::{
    ExtentKey, LinearScale, ProjectionScale, QuantitativeScale, Scale, ScaleError, ScaleId,
    ScaleKind,
};

/// The default categorical palette.
pub const DEFAULT_PALETTE: [&str; 10] = [
    "#5279c7", "#fd373e", "#63c261", "#fad419", "#2c2b6f", "#ff7939", "#db2e65", "#99ce50",
    "#962565", "#06cccc",
];

/// Colour returned for values outside a categorical colour domain.
pub const UNKNOWN_COLOR: &str = "#cccccc";

/// Maps categories to palette colours, cycling when there are more categories than colours.
///
/// ```
/// use trellis_scale::{ColorScale, Scale};
///
/// let c = ColorScale::with_palette(vec!["#000000".into(), "#ffffff".into()]);
/// c.set_domain(vec!["a".into(), "b".into(), "c".into()]).unwrap();
/// assert_eq!(c.scale("a"), "#000000");
/// assert_eq!(c.scale("c"), "#000000");
/// ```
#[derive(Clone)]
pub struct ColorScale {
    inner: Rc<ColorInner>,
}

struct ColorInner {
    palette: Vec<String>,
    domain: RefCell<OrdinalDomain>,
    listeners: CallbackSet<()>,
}

impl ColorScale {
    /// A scale over [`DEFAULT_PALETTE`].
    pub fn new() -> Self {
        Self::with_palette(DEFAULT_PALETTE.iter().map(|c| (*c).to_owned()).collect())
    }

    /// A scale over a custom palette. An empty palette falls back to the default.
    pub fn with_palette(palette: Vec<String>) -> Self {
        let palette = if palette.is_empty() {
            DEFAULT_PALETTE.iter().map(|c| (*c).to_owned()).collect()
        } else {
            palette
        };
        Self {
            inner: Rc::new(ColorInner {
                palette,
                domain: RefCell::new(OrdinalDomain::new()),
                listeners: CallbackSet::new(),
            }),
        }
    }

    /// The colour for `value`, or [`UNKNOWN_COLOR`] outside the domain.
    pub fn scale(&self, value: &str) -> String {
        let index = self.inner.domain.borrow().index_of(value);
        index.map_or_else(
            || UNKNOWN_COLOR.to_owned(),
            |i| self.inner.palette[i % self.inner.palette.len()].clone(),
        )
    }

    /// The palette in use.
    pub fn palette(&self) -> &[String] {
        &self.inner.palette
    }

    fn notify(&self) {
        self.inner.listeners.call(&());
    }
}

impl Default for ColorScale {
    fn default() -> Self {
        Self::new()
    }
}

impl Scale for ColorScale {
    type Domain = Vec<String>;

    fn domain(&self) -> Vec<String> {
        self.inner.domain.borrow().values.clone()
    }

    fn set_domain(&self, domain: Vec<String>) -> Result<(), ScaleError> {
        OrdinalDomain::validate(&domain)?;
        {
            let mut d = self.inner.domain.borrow_mut();
            d.values = domain;
            d.auto = false;
        }
        self.notify();
        Ok(())
    }

    fn auto_domain(&self) {
        {
            let mut d = self.inner.domain.borrow_mut();
            d.auto = true;
            d.recompute();
        }
        self.notify();
    }

    fn is_auto_domain(&self) -> bool {
        self.inner.domain.borrow().auto
    }

    fn on_domain_change(&self, callback: impl Fn() + 'static) -> ListenerId {
        self.inner.listeners.add(move |()| callback())
    }

    fn off_domain_change(&self, id: ListenerId) -> bool {
        self.inner.listeners.remove(id)
    }

    fn id(&self) -> ScaleId {
        ScaleId(Rc::as_ptr(&self.inner).cast::<()>() as usize)
    }
}

impl ProjectionScale for ColorScale {
    fn kind(&self) -> ScaleKind {
        ScaleKind::Color
    }

    fn id(&self) -> ScaleId {
        Scale::id(self)
    }

    fn scale_value(&self, value: &Value) -> Value {
        Value::Text(self.scale(&value.to_string()))
    }

    fn invert_value(&self, _pixel: f64) -> Result<Value, ScaleError> {
        Err(ScaleError::UnsupportedOperation {
            scale: "color",
            operation: "invert",
        })
    }

    fn update_extent(&self, key: ExtentKey, values: &[Value]) {
        let changed = {
            let mut d = self.inner.domain.borrow_mut();
            d.update(key, values);
            d.recompute()
        };
        if changed {
            self.notify();
        }
    }

    fn remove_extent(&self, key: &ExtentKey) {
        let changed = {
            let mut d = self.inner.domain.borrow_mut();
            d.remove(key) && d.recompute()
        };
        if changed {
            self.notify();
        }
    }

    fn set_pixel_range(&self, _start: f64, _end: f64) -> Result<(), ScaleError> {
        Err(ScaleError::UnsupportedOperation {
            scale: "color",
            operation: "set_pixel_range",
        })
    }

    fn on_change(&self, callback: Box<dyn Fn()>) -> ListenerId {
        self.inner.listeners.add(move |()| callback())
    }

    fn off_change(&self, id: ListenerId) -> bool {
        self.inner.listeners.remove(id)
    }
}

impl fmt::Debug for ColorScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColorScale")
            .field("domain", &self.inner.domain.borrow().values)
            .field("palette", &self.inner.palette)
            .finish_non_exhaustive()
    }
}

/// Maps a numeric domain onto a ramp of colour stops.
///
/// The domain behaves like a [`LinearScale`] without padding or snapping; values outside it
/// clamp to the end colours.
#[derive(Clone)]
pub struct InterpolatedColorScale {
    linear: LinearScale,
    stops: Rc<[Rgb]>,
}

impl InterpolatedColorScale {
    /// A ramp through `stops` (`#rrggbb`). Fails on fewer than two stops or unparsable colours.
    pub fn new(stops: &[&str]) -> Result<Self, ScaleError> {
        let parsed: Option<Vec<Rgb>> = stops.iter().map(|s| Rgb::parse(s)).collect();
        let Some(parsed) = parsed.filter(|p| p.len() >= 2) else {
            return Err(ScaleError::invalid_domain(
                &stops,
                "colour ramps need at least two #rrggbb stops",
            ));
        };
        let linear = LinearScale::new();
        linear.set_pad_proportion(0.0)?;
        linear.set_snapping(false);
        linear.set_range(0.0, 1.0)?;
        Ok(Self {
            linear,
            stops: parsed.into(),
        })
    }

    /// The colour for `value`.
    pub fn scale(&self, value: f64) -> String {
        let t = self.linear.scale_number(value);
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        #[allow(clippy::cast_precision_loss, reason = "stop counts are small")]
        let segments = (self.stops.len() - 1) as f64;
        let pos = t * segments;
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "pos is clamped to [0, segments]"
        )]
        let i = (pos.floor() as usize).min(self.stops.len() - 2);
        #[allow(clippy::cast_precision_loss, reason = "stop counts are small")]
        let local = pos - i as f64;
        self.stops[i].lerp(self.stops[i + 1], local).to_string()
    }
}

impl Scale for InterpolatedColorScale {
    type Domain = [f64; 2];

    fn domain(&self) -> [f64; 2] {
        self.linear.domain()
    }

    fn set_domain(&self, domain: [f64; 2]) -> Result<(), ScaleError> {
        self.linear.set_domain(domain)
    }

    fn auto_domain(&self) {
        self.linear.auto_domain();
    }

    fn is_auto_domain(&self) -> bool {
        self.linear.is_auto_domain()
    }

    fn on_domain_change(&self, callback: impl Fn() + 'static) -> ListenerId {
        self.linear.on_domain_change(callback)
    }

    fn off_domain_change(&self, id: ListenerId) -> bool {
        self.linear.off_domain_change(id)
    }

    fn id(&self) -> ScaleId {
        Scale::id(&self.linear)
    }
}

impl ProjectionScale for InterpolatedColorScale {
    fn kind(&self) -> ScaleKind {
        ScaleKind::Color
    }

    fn id(&self) -> ScaleId {
        Scale::id(&self.linear)
    }

    fn scale_value(&self, value: &Value) -> Value {
        Value::Text(self.scale(value.as_number().unwrap_or(f64::NAN)))
    }

    fn invert_value(&self, _pixel: f64) -> Result<Value, ScaleError> {
        Err(ScaleError::UnsupportedOperation {
            scale: "interpolated color",
            operation: "invert",
        })
    }

    fn update_extent(&self, key: ExtentKey, values: &[Value]) {
        self.linear.update_extent(key, values);
    }

    fn remove_extent(&self, key: &ExtentKey) {
        self.linear.remove_extent(key);
    }

    fn set_pixel_range(&self, _start: f64, _end: f64) -> Result<(), ScaleError> {
        Err(ScaleError::UnsupportedOperation {
            scale: "interpolated color",
            operation: "set_pixel_range",
        })
    }

    fn on_change(&self, callback: Box<dyn Fn()>) -> ListenerId {
        self.linear.on_change(callback)
    }

    fn off_change(&self, id: ListenerId) -> bool {
        self.linear.off_change(id)
    }
}

impl fmt::Debug for InterpolatedColorScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterpolatedColorScale")
            .field("domain", &self.linear.numeric_domain())
            .field("stops", &self.stops)
            .finish()
    }
}
