// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::fmt::Write as _;
use std::rc::Rc;

use trellis_data::{Dataset, Value};
use trellis_draw::{AttrProjector, AttrToProjector};

use crate::projection::number;
use crate::scatter::DEFAULT_FILL;
use crate::xy::{Frame, Marks, XyPlot};

const DEFAULT_STROKE_WIDTH: f64 = 2.0;

/// One `path` per dataset through every `(x, y)`, in data order.
///
/// Points whose `x` or `y` is not a finite number break the line; drawing resumes at the next
/// valid point.
#[derive(Clone, Copy, Debug, Default)]
pub struct LineMarks;

/// A line plot.
///
/// Attributes other than `x` and `y` are read from each dataset's first record, so a single
/// stroke colour applies to the whole line. Entities stay per datum and all share the path.
///
/// ```
/// use kurbo::Size;
/// use trellis_data::{Dataset, record};
/// use trellis_layout::{Chart, Environment};
/// use trellis_plot::LinePlot;
/// use trellis_scale::LinearScale;
/// use trellis_scene::Scene;
///
/// let (x, y) = (LinearScale::new(), LinearScale::new());
/// let data = Dataset::new(vec![
///     record! { "x" => 0.0, "y" => 1.0 },
///     record! { "x" => 1.0, "y" => 3.0 },
///     record! { "x" => 2.0, "y" => 2.0 },
/// ]);
/// let plot = LinePlot::new();
/// plot.x("x", &x).y("y", &y).add_dataset(&data);
///
/// let mut scene = Scene::new();
/// let surface = scene.insert(None, "svg");
/// let mut chart = Chart::new(Environment::new());
/// let id = chart.insert(plot.clone());
/// chart.render_to(&mut scene, id, surface, Size::new(200.0, 100.0)).unwrap();
/// let entities = plot.entities(&scene);
/// assert_eq!(entities.len(), 3);
/// assert_eq!(entities[0].element, entities[2].element);
/// ```
pub type LinePlot = XyPlot<LineMarks>;

impl XyPlot<LineMarks> {
    /// An empty line plot.
    pub fn new() -> Self {
        Self::with_marks(LineMarks)
    }
}

impl Default for XyPlot<LineMarks> {
    fn default() -> Self {
        Self::new()
    }
}

/// SVG path data through `points`, lifting the pen over non-finite points.
fn path_data(points: impl IntoIterator<Item = (f64, f64)>) -> String {
    let mut path = String::new();
    let mut pen_down = false;
    for (x, y) in points {
        if !(x.is_finite() && y.is_finite()) {
            pen_down = false;
            continue;
        }
        let command = if pen_down { 'L' } else { 'M' };
        let _ = write!(path, "{command}{x},{y}");
        pen_down = true;
    }
    path
}

fn records(datum: &Value) -> &[Value] {
    match datum {
        Value::List(records) => records,
        single => std::slice::from_ref(single),
    }
}

/// The `d` attribute of a whole-dataset datum.
fn path_projector(x: AttrProjector, y: AttrProjector) -> AttrProjector {
    Rc::new(move |d: &Value, _: usize, ds: &Dataset| {
        let points = records(d)
            .iter()
            .enumerate()
            .map(|(i, r)| (number(&x, r, i, ds), number(&y, r, i, ds)));
        Value::from(path_data(points))
    })
}

/// `projector` evaluated on the first record of a whole-dataset datum.
fn first_record(projector: AttrProjector) -> AttrProjector {
    Rc::new(move |d: &Value, _: usize, ds: &Dataset| {
        records(d)
            .first()
            .map_or(Value::Null, |first| projector(first, 0, ds))
    })
}

fn constant(value: Value) -> AttrProjector {
    Rc::new(move |_: &Value, _: usize, _: &Dataset| value.clone())
}

/// Pixel height of the y-domain value closest to zero; the bottom edge without a
/// quantitative y scale.
fn baseline_pixel(frame: &Frame<'_>) -> f64 {
    let bottom = frame.size.height;
    let Some(scale) = frame.scale("y") else {
        return bottom;
    };
    let end = |pixel| {
        scale
            .invert_value(pixel)
            .ok()
            .and_then(|v| v.as_number())
            .filter(|n| n.is_finite())
    };
    let (Some(a), Some(b)) = (end(bottom), end(0.0)) else {
        return bottom;
    };
    let nearest_zero = 0.0_f64.clamp(a.min(b), a.max(b));
    scale
        .scale_value(&Value::Number(nearest_zero))
        .as_number()
        .filter(|n| n.is_finite())
        .unwrap_or(bottom)
}

impl Marks for LineMarks {
    fn tag(&self) -> &'static str {
        "path"
    }

    fn class(&self) -> &'static str {
        "line"
    }

    fn whole_dataset(&self) -> bool {
        true
    }

    fn attrs(&self, frame: &Frame<'_>) -> AttrToProjector {
        let mut attrs: AttrToProjector = frame
            .scaled
            .iter()
            .filter(|(name, _)| !matches!(name.as_ref(), "x" | "y"))
            .map(|(name, projector)| (name.clone(), first_record(projector.clone())))
            .collect();
        if let (Some(x), Some(y)) = (frame.scaled.get("x"), frame.scaled.get("y")) {
            attrs.insert("d".into(), path_projector(x.clone(), y.clone()));
        }
        attrs
            .entry("stroke".into())
            .or_insert_with(|| constant(Value::from(DEFAULT_FILL)));
        attrs
            .entry("stroke-width".into())
            .or_insert_with(|| constant(Value::Number(DEFAULT_STROKE_WIDTH)));
        attrs.insert("fill".into(), constant(Value::from("none")));
        attrs
    }

    fn reset_attrs(&self, frame: &Frame<'_>, attrs: &AttrToProjector) -> AttrToProjector {
        let mut reset = attrs.clone();
        if let Some(x) = frame.scaled.get("x") {
            let flat = constant(Value::Number(baseline_pixel(frame)));
            reset.insert("d".into(), path_projector(x.clone(), flat));
        }
        reset
    }
}
