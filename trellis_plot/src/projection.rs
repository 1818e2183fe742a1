// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use trellis_data::{Accessor, AccessorFn, Dataset, Value};
use trellis_draw::{AttrProjector, AttrToProjector};
use trellis_scale::ProjectionScale;

/// An attribute binding: where the value comes from, and the scale it goes through.
#[derive(Clone)]
pub struct Projection {
    accessor: AccessorFn,
    scale: Option<Rc<dyn ProjectionScale>>,
}

/// Attribute name to projection.
pub type Projections = BTreeMap<Cow<'static, str>, Projection>;

impl Projection {
    /// Bind `accessor`, optionally through `scale`.
    pub fn new(accessor: impl Into<Accessor>, scale: Option<Rc<dyn ProjectionScale>>) -> Self {
        Self {
            accessor: accessor.into().bind(),
            scale,
        }
    }

    /// The unscaled accessor.
    pub fn accessor(&self) -> &AccessorFn {
        &self.accessor
    }

    /// The bound scale, if any.
    pub fn scale(&self) -> Option<&Rc<dyn ProjectionScale>> {
        self.scale.as_ref()
    }

    /// The accessor composed with the scale.
    pub fn projector(&self) -> AttrProjector {
        match &self.scale {
            None => self.accessor.clone(),
            Some(scale) => {
                let accessor = self.accessor.clone();
                let scale = scale.clone();
                Rc::new(move |d: &Value, i: usize, ds: &Dataset| {
                    scale.scale_value(&accessor(d, i, ds))
                })
            }
        }
    }

    /// Raw accessor output for every datum of `dataset`.
    pub(crate) fn values(&self, dataset: &Dataset) -> Vec<Value> {
        dataset
            .data()
            .iter()
            .enumerate()
            .map(|(i, d)| (self.accessor)(d, i, dataset))
            .collect()
    }
}

impl fmt::Debug for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Projection")
            .field("scale", &self.scale)
            .finish_non_exhaustive()
    }
}

/// Compose every projection with its scale.
pub(crate) fn generate_attr_to_projector(projections: &Projections) -> AttrToProjector {
    projections
        .iter()
        .map(|(name, p)| (name.clone(), p.projector()))
        .collect()
}

/// Evaluate `projector` as a number, `NaN` when it is not numeric.
pub(crate) fn number(projector: &AttrProjector, d: &Value, i: usize, ds: &Dataset) -> f64 {
    projector(d, i, ds).as_number().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_data::record;
    use trellis_scale::{LinearScale, QuantitativeScale, Scale};

    #[test]
    fn projector_applies_scale() {
        let scale = LinearScale::new();
        scale.set_domain([0.0, 10.0]).unwrap();
        scale.set_range(0.0, 100.0).unwrap();
        let ds = Dataset::new(vec![record! { "v" => 2.5 }]);
        let p = Projection::new("v", Some(Rc::new(scale)));
        let data = ds.data();
        assert_eq!(p.projector()(&data[0], 0, &ds), Value::Number(25.0));
        assert_eq!(p.values(&ds), vec![Value::Number(2.5)]);
    }

    #[test]
    fn unscaled_projection_passes_values_through() {
        let ds = Dataset::new(vec![record! { "c" => "red" }]);
        let mut projections = Projections::new();
        projections.insert("fill".into(), Projection::new("c", None));
        projections.insert("opacity".into(), Projection::new(0.5, None));
        let attrs = generate_attr_to_projector(&projections);
        let data = ds.data();
        assert_eq!(attrs["fill"](&data[0], 0, &ds), Value::from("red"));
        assert_eq!(number(&attrs["opacity"], &data[0], 0, &ds), 0.5);
    }
}
