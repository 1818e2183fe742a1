// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use trellis_data::{CallbackSet, ListenerId, Value};

use crate::transform::{Linear, Log, ModifiedLog, Time, Transform};
use crate::{
    ExtentKey, ProjectionScale, QuantitativeScale, Scale, ScaleError, ScaleId, ScaleKind,
};

/// A linear scale over numbers.
pub type LinearScale = ContinuousScale<Linear>;
/// A logarithmic scale over strictly positive numbers.
pub type LogScale = ContinuousScale<Log>;
/// A symmetric log scale, defined for zero and negative numbers.
pub type ModifiedLogScale = ContinuousScale<ModifiedLog>;
/// A linear scale over UTC timestamps.
pub type TimeScale = ContinuousScale<Time>;

const DEFAULT_PAD_PROPORTION: f64 = 0.05;
const DEFAULT_TICK_COUNT: usize = 10;

/// A continuous, invertible scale interpolating in the space of its [`Transform`].
///
/// The domain is automatic until pinned with [`Scale::set_domain`] (or by a pan or zoom):
/// while automatic it is the union of every registered extent, padded by
/// [`pad_proportion`](Self::pad_proportion) and rounded to tick boundaries when snapping is on.
/// Every domain change, automatic or explicit, notifies listeners exactly once.
///
/// ```
/// use trellis_scale::{LinearScale, QuantitativeScale, Scale};
///
/// let x = LinearScale::new();
/// x.set_domain([0.0, 10.0]).unwrap();
/// x.set_range(0.0, 100.0).unwrap();
/// assert_eq!(x.scale(2.5), 25.0);
/// assert_eq!(x.invert(25.0), 2.5);
///
/// // Panning by a full range width shifts the domain by its own span.
/// x.pan(100.0).unwrap();
/// assert_eq!(x.domain(), [10.0, 20.0]);
/// ```
#[derive(Clone)]
pub struct ContinuousScale<T: Transform> {
    inner: Rc<Inner<T>>,
}

struct Inner<T> {
    transform: T,
    state: RefCell<State>,
    listeners: CallbackSet<()>,
}

#[derive(Debug)]
struct State {
    domain: (f64, f64),
    range: (f64, f64),
    auto: bool,
    domain_min: Option<f64>,
    domain_max: Option<f64>,
    pad_proportion: f64,
    snapping: bool,
    tick_count: usize,
    extents: BTreeMap<ExtentKey, (f64, f64)>,
    padding_exceptions: BTreeMap<ExtentKey, f64>,
}

impl<T: Transform + Default> ContinuousScale<T> {
    /// A scale with the transform's default configuration.
    pub fn new() -> Self {
        Self::with_transform(T::default())
    }
}

impl<T: Transform + Default> Default for ContinuousScale<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transform> ContinuousScale<T> {
    /// A scale over `transform`, with its default domain and range `[0, 1]`.
    pub fn with_transform(transform: T) -> Self {
        let state = State {
            domain: transform.default_domain(),
            range: (0.0, 1.0),
            auto: true,
            domain_min: None,
            domain_max: None,
            pad_proportion: DEFAULT_PAD_PROPORTION,
            snapping: transform.snaps_by_default(),
            tick_count: DEFAULT_TICK_COUNT,
            extents: BTreeMap::new(),
            padding_exceptions: BTreeMap::new(),
        };
        Self {
            inner: Rc::new(Inner {
                transform,
                state: RefCell::new(state),
                listeners: CallbackSet::new(),
            }),
        }
    }

    /// Map a typed domain value to a pixel.
    pub fn scale(&self, value: T::Value) -> f64 {
        self.scale_number(T::to_number(value))
    }

    /// Map a pixel back to a typed domain value.
    pub fn invert(&self, pixel: f64) -> T::Value {
        T::from_number(self.invert_number(pixel))
    }

    /// Proportion of the extent added as padding to automatic domains.
    pub fn pad_proportion(&self) -> f64 {
        self.inner.state.borrow().pad_proportion
    }

    /// Set the padding proportion; must be finite and non-negative.
    pub fn set_pad_proportion(&self, proportion: f64) -> Result<(), ScaleError> {
        if !(proportion.is_finite() && proportion >= 0.0) {
            return Err(ScaleError::InvalidParameter {
                name: "pad proportion",
                value: proportion,
            });
        }
        self.inner.state.borrow_mut().pad_proportion = proportion;
        self.recompute();
        Ok(())
    }

    /// Whether automatic domains are rounded outward to tick boundaries.
    pub fn snapping(&self) -> bool {
        self.inner.state.borrow().snapping
    }

    /// Enable or disable snapping of automatic domains.
    pub fn set_snapping(&self, snapping: bool) {
        self.inner.state.borrow_mut().snapping = snapping;
        self.recompute();
    }

    /// Approximate number of ticks produced by [`QuantitativeScale::ticks`].
    pub fn set_tick_count(&self, count: usize) {
        self.inner.state.borrow_mut().tick_count = count.max(1);
    }

    /// Pin the lower bound of automatic domains (`None` unpins it).
    pub fn set_domain_min(&self, min: Option<T::Value>) {
        self.inner.state.borrow_mut().domain_min = min.map(T::to_number);
        self.recompute();
    }

    /// Pin the upper bound of automatic domains (`None` unpins it).
    pub fn set_domain_max(&self, max: Option<T::Value>) {
        self.inner.state.borrow_mut().domain_max = max.map(T::to_number);
        self.recompute();
    }

    /// Values registered through [`ProjectionScale::update_extent`], by key.
    pub fn extents(&self) -> Vec<(ExtentKey, (f64, f64))> {
        let state = self.inner.state.borrow();
        state
            .extents
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }

    fn notify(&self) {
        self.inner.listeners.call(&());
    }

    fn apply_domain(&self, min: f64, max: f64, pin: bool) {
        {
            let mut state = self.inner.state.borrow_mut();
            state.domain = (min, max);
            if pin {
                state.auto = false;
            }
        }
        self.notify();
    }

    fn recompute(&self) {
        let next = {
            let state = self.inner.state.borrow();
            if !state.auto {
                return;
            }
            self.auto_domain_of(&state)
        };
        self.apply_domain(next.0, next.1, false);
    }

    fn auto_domain_of(&self, state: &State) -> (f64, f64) {
        let t = &self.inner.transform;
        let combined = state
            .extents
            .values()
            .copied()
            .reduce(|(a, b), (c, d)| (a.min(c), b.max(d)));
        let (mut lo, mut hi) = match combined {
            None => t.default_domain(),
            Some((a, b)) if a == b => t.expand_single(a),
            Some((a, b)) => {
                let (a, b) = self.pad(state, a, b);
                if state.snapping {
                    t.nice(a, b, state.tick_count)
                } else {
                    (a, b)
                }
            }
        };
        if let Some(min) = state.domain_min {
            lo = min;
        }
        if let Some(max) = state.domain_max {
            hi = max;
        }
        if lo >= hi || t.validate(lo, hi).is_err() {
            let pinned = state.domain_min.or(state.domain_max).unwrap_or(lo);
            tracing::warn!(
                scale = T::NAME,
                lo,
                hi,
                "domain pins produce an empty domain; widening around {pinned}"
            );
            (lo, hi) = t.expand_single(pinned);
        }
        (lo, hi)
    }

    fn pad(&self, state: &State, lo: f64, hi: f64) -> (f64, f64) {
        if state.pad_proportion == 0.0 {
            return (lo, hi);
        }
        let t = &self.inner.transform;
        let p = state.pad_proportion / 2.0;
        let (a, b) = (t.forward(lo), t.forward(hi));
        let span = b - a;
        let keep_lo = state.padding_exceptions.values().any(|v| *v == lo);
        let keep_hi = state.padding_exceptions.values().any(|v| *v == hi);
        (
            if keep_lo { lo } else { t.inverse(a - span * p) },
            if keep_hi { hi } else { t.inverse(b + span * p) },
        )
    }
}

impl<T: Transform> Scale for ContinuousScale<T> {
    type Domain = [T::Value; 2];

    fn domain(&self) -> Self::Domain {
        let (a, b) = self.inner.state.borrow().domain;
        [T::from_number(a), T::from_number(b)]
    }

    fn set_domain(&self, domain: Self::Domain) -> Result<(), ScaleError> {
        self.set_numeric_domain(T::to_number(domain[0]), T::to_number(domain[1]))
    }

    fn auto_domain(&self) {
        self.inner.state.borrow_mut().auto = true;
        self.recompute();
    }

    fn is_auto_domain(&self) -> bool {
        self.inner.state.borrow().auto
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

impl<T: Transform> QuantitativeScale for ContinuousScale<T> {
    fn range(&self) -> (f64, f64) {
        self.inner.state.borrow().range
    }

    fn set_range(&self, start: f64, end: f64) -> Result<(), ScaleError> {
        ScaleError::check_range(start, end)?;
        self.inner.state.borrow_mut().range = (start, end);
        Ok(())
    }

    fn numeric_domain(&self) -> (f64, f64) {
        self.inner.state.borrow().domain
    }

    fn set_numeric_domain(&self, min: f64, max: f64) -> Result<(), ScaleError> {
        self.inner.transform.validate(min, max)?;
        self.apply_domain(min, max, true);
        Ok(())
    }

    fn scale_number(&self, value: f64) -> f64 {
        let state = self.inner.state.borrow();
        let t = &self.inner.transform;
        let (t0, t1) = (t.forward(state.domain.0), t.forward(state.domain.1));
        let (r0, r1) = state.range;
        if t1 == t0 {
            return (r0 + r1) / 2.0;
        }
        r0 + (t.forward(value) - t0) / (t1 - t0) * (r1 - r0)
    }

    fn invert_number(&self, pixel: f64) -> f64 {
        let state = self.inner.state.borrow();
        let t = &self.inner.transform;
        let (t0, t1) = (t.forward(state.domain.0), t.forward(state.domain.1));
        let (r0, r1) = state.range;
        if r1 == r0 {
            return t.inverse((t0 + t1) / 2.0);
        }
        t.inverse(t0 + (pixel - r0) / (r1 - r0) * (t1 - t0))
    }

    fn ticks(&self) -> Vec<f64> {
        let state = self.inner.state.borrow();
        let (lo, hi) = state.domain;
        self.inner.transform.ticks(lo, hi, state.tick_count)
    }

    fn format_tick(&self, value: f64) -> String {
        let state = self.inner.state.borrow();
        let (lo, hi) = state.domain;
        self.inner
            .transform
            .format(value, lo, hi, state.tick_count)
    }
}

impl<T: Transform> ProjectionScale for ContinuousScale<T> {
    fn kind(&self) -> ScaleKind {
        ScaleKind::Quantitative
    }

    fn id(&self) -> ScaleId {
        Scale::id(self)
    }

    fn scale_value(&self, value: &Value) -> Value {
        Value::Number(value.as_number().map_or(f64::NAN, |n| self.scale_number(n)))
    }

    fn invert_value(&self, pixel: f64) -> Result<Value, ScaleError> {
        Ok(T::to_dynamic(self.invert_number(pixel)))
    }

    fn update_extent(&self, key: ExtentKey, values: &[Value]) {
        let t = &self.inner.transform;
        let mut skipped = 0_usize;
        let mut extent: Option<(f64, f64)> = None;
        for v in values {
            let Some(n) = v.as_number() else { continue };
            if t.validate(n, n).is_err() {
                skipped += 1;
                continue;
            }
            extent = Some(extent.map_or((n, n), |(lo, hi)| (lo.min(n), hi.max(n))));
        }
        if skipped > 0 {
            tracing::warn!(
                scale = T::NAME,
                skipped,
                attr = %key.attr,
                "ignoring values this scale cannot represent"
            );
        }
        {
            let mut state = self.inner.state.borrow_mut();
            match extent {
                Some(e) => {
                    state.extents.insert(key, e);
                }
                None => {
                    state.extents.remove(&key);
                }
            }
        }
        self.recompute();
    }

    fn remove_extent(&self, key: &ExtentKey) {
        let removed = self.inner.state.borrow_mut().extents.remove(key).is_some();
        let removed_exception = self
            .inner
            .state
            .borrow_mut()
            .padding_exceptions
            .remove(key)
            .is_some();
        if removed || removed_exception {
            self.recompute();
        }
    }

    fn set_padding_exception(&self, key: ExtentKey, value: Option<f64>) {
        {
            let mut state = self.inner.state.borrow_mut();
            match value {
                Some(v) => {
                    state.padding_exceptions.insert(key, v);
                }
                None => {
                    state.padding_exceptions.remove(&key);
                }
            }
        }
        self.recompute();
    }

    fn set_pixel_range(&self, start: f64, end: f64) -> Result<(), ScaleError> {
        self.set_range(start, end)
    }

    fn on_change(&self, callback: Box<dyn Fn()>) -> ListenerId {
        self.inner.listeners.add(move |()| callback())
    }

    fn off_change(&self, id: ListenerId) -> bool {
        self.inner.listeners.remove(id)
    }
}

impl<T: Transform> fmt::Debug for ContinuousScale<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("ContinuousScale")
            .field("transform", &self.inner.transform)
            .field("domain", &state.domain)
            .field("range", &state.range)
            .field("auto", &state.auto)
            .field("extents", &state.extents.len())
            .finish_non_exhaustive()
    }
}
