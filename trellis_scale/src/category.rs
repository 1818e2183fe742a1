// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use trellis_data::{CallbackSet, ListenerId, Value};

use crate::{ExtentKey, ProjectionScale, Scale, ScaleError, ScaleId, ScaleKind};

/// An ordered category list that is either pinned or the union of registered extents.
///
/// Shared by [`CategoryScale`] and [`ColorScale`](crate::ColorScale).
#[derive(Debug, Default)]
pub(crate) struct OrdinalDomain {
    pub(crate) values: Vec<String>,
    pub(crate) auto: bool,
    extents: BTreeMap<ExtentKey, Vec<String>>,
}

impl OrdinalDomain {
    pub(crate) fn new() -> Self {
        Self {
            values: Vec::new(),
            auto: true,
            extents: BTreeMap::new(),
        }
    }

    pub(crate) fn validate(domain: &[String]) -> Result<(), ScaleError> {
        for (i, v) in domain.iter().enumerate() {
            if domain[..i].contains(v) {
                return Err(ScaleError::invalid_domain(
                    &domain,
                    "categories must be unique",
                ));
            }
        }
        Ok(())
    }

    /// Record the categories in `values`, in first-seen order.
    pub(crate) fn update(&mut self, key: ExtentKey, values: &[Value]) {
        let mut seen: Vec<String> = Vec::new();
        for v in values.iter().filter(|v| !v.is_null()) {
            let s = v.to_string();
            if !seen.contains(&s) {
                seen.push(s);
            }
        }
        if seen.is_empty() {
            self.extents.remove(&key);
        } else {
            self.extents.insert(key, seen);
        }
    }

    pub(crate) fn remove(&mut self, key: &ExtentKey) -> bool {
        self.extents.remove(key).is_some()
    }

    /// Recompute from extents if automatic. Returns whether the domain was recomputed.
    pub(crate) fn recompute(&mut self) -> bool {
        if !self.auto {
            return false;
        }
        let mut merged: Vec<String> = Vec::new();
        for list in self.extents.values() {
            for v in list {
                if !merged.contains(v) {
                    merged.push(v.clone());
                }
            }
        }
        self.values = merged;
        true
    }

    pub(crate) fn index_of(&self, value: &str) -> Option<usize> {
        self.values.iter().position(|v| v == value)
    }
}

/// A banded scale mapping categories to the centres of evenly spaced bands.
///
/// Padding is expressed in multiples of the band width: `inner_padding` between adjacent
/// bands (default 1) and `outer_padding` before the first and after the last (default 0.5).
///
/// ```
/// use trellis_scale::{CategoryScale, Scale};
///
/// let s = CategoryScale::new();
/// s.set_domain(vec!["a".into(), "b".into()]).unwrap();
/// s.set_range(0.0, 100.0).unwrap();
/// // Two bands of width 25 with a 25px gap and 12.5px outer padding.
/// assert_eq!(s.range_band(), 25.0);
/// assert_eq!(s.scale("a"), 25.0);
/// assert_eq!(s.scale("b"), 75.0);
/// assert!(s.scale("zzz").is_nan());
/// ```
#[derive(Clone)]
pub struct CategoryScale {
    inner: Rc<Inner>,
}

struct Inner {
    state: RefCell<State>,
    listeners: CallbackSet<()>,
}

#[derive(Debug)]
struct State {
    domain: OrdinalDomain,
    range: (f64, f64),
    inner_padding: f64,
    outer_padding: f64,
}

impl CategoryScale {
    /// An empty category scale over range `[0, 1]`.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(Inner {
                state: RefCell::new(State {
                    domain: OrdinalDomain::new(),
                    range: (0.0, 1.0),
                    inner_padding: 1.0,
                    outer_padding: 0.5,
                }),
                listeners: CallbackSet::new(),
            }),
        }
    }

    /// The centre of `value`'s band, or `NaN` for unknown categories.
    pub fn scale(&self, value: &str) -> f64 {
        let state = self.inner.state.borrow();
        let Some(i) = state.domain.index_of(value) else {
            return f64::NAN;
        };
        let (r0, r1) = state.range;
        let dir = if r1 < r0 { -1.0 } else { 1.0 };
        let band = band_of(&state);
        #[allow(clippy::cast_precision_loss, reason = "category counts are small")]
        let i = i as f64;
        r0 + dir
            * (state.outer_padding * band + i * band * (1.0 + state.inner_padding) + band / 2.0)
    }

    /// Width of one band in pixels.
    pub fn range_band(&self) -> f64 {
        band_of(&self.inner.state.borrow())
    }

    /// Distance between the starts of adjacent bands.
    pub fn step_width(&self) -> f64 {
        let state = self.inner.state.borrow();
        band_of(&state) * (1.0 + state.inner_padding)
    }

    /// The pixel range.
    pub fn range(&self) -> (f64, f64) {
        self.inner.state.borrow().range
    }

    /// Set the pixel range. Does not notify listeners.
    pub fn set_range(&self, start: f64, end: f64) -> Result<(), ScaleError> {
        ScaleError::check_range(start, end)?;
        self.inner.state.borrow_mut().range = (start, end);
        Ok(())
    }

    /// Set the padding between bands, in band widths.
    pub fn set_inner_padding(&self, padding: f64) -> Result<(), ScaleError> {
        check_padding("inner padding", padding)?;
        self.inner.state.borrow_mut().inner_padding = padding;
        Ok(())
    }

    /// Set the padding at both ends, in band widths.
    pub fn set_outer_padding(&self, padding: f64) -> Result<(), ScaleError> {
        check_padding("outer padding", padding)?;
        self.inner.state.borrow_mut().outer_padding = padding;
        Ok(())
    }

    fn notify(&self) {
        self.inner.listeners.call(&());
    }
}

fn check_padding(name: &'static str, value: f64) -> Result<(), ScaleError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ScaleError::InvalidParameter { name, value })
    }
}

fn band_of(state: &State) -> f64 {
    let span = (state.range.1 - state.range.0).abs();
    #[allow(clippy::cast_precision_loss, reason = "category counts are small")]
    let n = state.domain.values.len().max(1) as f64;
    span / (n + (n - 1.0) * state.inner_padding + 2.0 * state.outer_padding)
}

impl Default for CategoryScale {
    fn default() -> Self {
        Self::new()
    }
}

impl Scale for CategoryScale {
    type Domain = Vec<String>;

    fn domain(&self) -> Vec<String> {
        self.inner.state.borrow().domain.values.clone()
    }

    fn set_domain(&self, domain: Vec<String>) -> Result<(), ScaleError> {
        OrdinalDomain::validate(&domain)?;
        {
            let mut state = self.inner.state.borrow_mut();
            state.domain.values = domain;
            state.domain.auto = false;
        }
        self.notify();
        Ok(())
    }

    fn auto_domain(&self) {
        {
            let mut state = self.inner.state.borrow_mut();
            state.domain.auto = true;
            state.domain.recompute();
        }
        self.notify();
    }

    fn is_auto_domain(&self) -> bool {
        self.inner.state.borrow().domain.auto
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

impl ProjectionScale for CategoryScale {
    fn kind(&self) -> ScaleKind {
        ScaleKind::Categorical
    }

    fn id(&self) -> ScaleId {
        Scale::id(self)
    }

    fn scale_value(&self, value: &Value) -> Value {
        Value::Number(self.scale(&value.to_string()))
    }

    fn invert_value(&self, _pixel: f64) -> Result<Value, ScaleError> {
        Err(ScaleError::UnsupportedOperation {
            scale: "category",
            operation: "invert",
        })
    }

    fn update_extent(&self, key: ExtentKey, values: &[Value]) {
        let changed = {
            let mut state = self.inner.state.borrow_mut();
            state.domain.update(key, values);
            state.domain.recompute()
        };
        if changed {
            self.notify();
        }
    }

    fn remove_extent(&self, key: &ExtentKey) {
        let changed = {
            let mut state = self.inner.state.borrow_mut();
            state.domain.remove(key) && state.domain.recompute()
        };
        if changed {
            self.notify();
        }
    }

    fn set_pixel_range(&self, start: f64, end: f64) -> Result<(), ScaleError> {
        self.set_range(start, end)
    }

    fn band_width(&self) -> Option<f64> {
        Some(self.range_band())
    }

    fn on_change(&self, callback: Box<dyn Fn()>) -> ListenerId {
        self.inner.listeners.add(move |()| callback())
    }

    fn off_change(&self, id: ListenerId) -> bool {
        self.inner.listeners.remove(id)
    }
}

impl fmt::Debug for CategoryScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("CategoryScale")
            .field("domain", &state.domain.values)
            .field("range", &state.range)
            .field("auto", &state.domain.auto)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invert_is_unsupported() {
        let s = CategoryScale::new();
        let err = s.invert_value(3.0).unwrap_err();
        assert_eq!(
            err,
            ScaleError::UnsupportedOperation {
                scale: "category",
                operation: "invert"
            }
        );
    }

    #[test]
    fn duplicates_are_rejected() {
        let s = CategoryScale::new();
        let err = s.set_domain(vec!["a".into(), "a".into()]).unwrap_err();
        assert!(matches!(err, ScaleError::InvalidDomain { .. }));
        assert!(s.domain().is_empty());
    }

    #[test]
    fn extents_merge_in_first_seen_order() {
        let s = CategoryScale::new();
        s.update_extent(
            ExtentKey::new(1, "x"),
            &[Value::from("b"), Value::from("a"), Value::from("b")],
        );
        s.update_extent(ExtentKey::new(2, "x"), &[Value::from("c"), Value::from("a")]);
        assert_eq!(s.domain(), vec!["b", "a", "c"]);
        s.remove_extent(&ExtentKey::new(1, "x"));
        assert_eq!(s.domain(), vec!["c", "a"]);
    }

    #[test]
    fn reversed_range_mirrors_bands() {
        let s = CategoryScale::new();
        s.set_domain(vec!["a".into(), "b".into()]).unwrap();
        s.set_range(100.0, 0.0).unwrap();
        assert_eq!(s.scale("a"), 75.0);
        assert_eq!(s.scale("b"), 25.0);
        assert_eq!(s.step_width(), 50.0);
    }

    #[test]
    fn numbers_are_categories_by_display() {
        let s = CategoryScale::new();
        s.update_extent(ExtentKey::new(1, "x"), &[Value::Number(1.0), Value::Number(2.0)]);
        assert_eq!(s.domain(), vec!["1", "2"]);
        s.set_range(0.0, 100.0).unwrap();
        assert_eq!(s.scale_value(&Value::Number(2.0)), Value::Number(75.0));
    }
}
