// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::rc::Rc;

use trellis_data::{Dataset, Value};
use trellis_draw::{AttrProjector, AttrToProjector};

use crate::projection::number;
use crate::xy::{Frame, Marks, XyPlot};

/// Fill used when nothing is projected onto `fill`.
pub const DEFAULT_FILL: &str = "#5279c7";

const DEFAULT_SIZE: f64 = 6.0;
const DEFAULT_OPACITY: f64 = 0.6;

/// Circles centred on `(x, y)`. `size` is the diameter.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScatterMarks;

/// A scatter plot.
///
/// ```
/// use kurbo::Size;
/// use trellis_data::{Dataset, record};
/// use trellis_layout::{Chart, Environment};
/// use trellis_plot::ScatterPlot;
/// use trellis_scale::LinearScale;
/// use trellis_scene::Scene;
///
/// let (x, y) = (LinearScale::new(), LinearScale::new());
/// let data = Dataset::new(vec![
///     record! { "x" => 0.0, "y" => 0.0 },
///     record! { "x" => 1.0, "y" => 1.0 },
/// ]);
/// let plot = ScatterPlot::new();
/// plot.x("x", &x).y("y", &y).add_dataset(&data);
///
/// let mut scene = Scene::new();
/// let surface = scene.insert(None, "svg");
/// let mut chart = Chart::new(Environment::new());
/// let id = chart.insert(plot.clone());
/// chart.render_to(&mut scene, id, surface, Size::new(200.0, 100.0)).unwrap();
/// assert_eq!(plot.entities(&scene).len(), 2);
/// ```
pub type ScatterPlot = XyPlot<ScatterMarks>;

impl XyPlot<ScatterMarks> {
    /// An empty scatter plot.
    pub fn new() -> Self {
        Self::with_marks(ScatterMarks)
    }
}

impl Default for XyPlot<ScatterMarks> {
    fn default() -> Self {
        Self::new()
    }
}

impl Marks for ScatterMarks {
    fn tag(&self) -> &'static str {
        "circle"
    }

    fn class(&self) -> &'static str {
        "symbol"
    }

    fn attrs(&self, frame: &Frame<'_>) -> AttrToProjector {
        let mut attrs = AttrToProjector::new();
        for (name, projector) in frame.scaled {
            let renamed = match name.as_ref() {
                "x" => "cx",
                "y" => "cy",
                "size" => continue,
                _ => {
                    attrs.insert(name.clone(), projector.clone());
                    continue;
                }
            };
            attrs.insert(renamed.into(), projector.clone());
        }
        let radius: AttrProjector = match frame.scaled.get("size") {
            Some(size) => {
                let size = size.clone();
                Rc::new(move |d: &Value, i: usize, ds: &Dataset| {
                    Value::Number(number(&size, d, i, ds) / 2.0)
                })
            }
            None => Rc::new(|_: &Value, _: usize, _: &Dataset| Value::Number(DEFAULT_SIZE / 2.0)),
        };
        attrs.insert("r".into(), radius);
        attrs
            .entry("fill".into())
            .or_insert_with(|| {
                Rc::new(|_: &Value, _: usize, _: &Dataset| Value::from(DEFAULT_FILL))
            });
        attrs
            .entry("opacity".into())
            .or_insert_with(|| {
                Rc::new(|_: &Value, _: usize, _: &Dataset| Value::Number(DEFAULT_OPACITY))
            });
        attrs
    }

    fn reset_attrs(&self, _frame: &Frame<'_>, attrs: &AttrToProjector) -> AttrToProjector {
        let mut reset = attrs.clone();
        reset.insert(
            "r".into(),
            Rc::new(|_: &Value, _: usize, _: &Dataset| Value::Number(0.0)),
        );
        reset
    }
}
