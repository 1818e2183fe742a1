// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::borrow::Cow;
use std::rc::Rc;

use trellis_data::{Dataset, Value};
use trellis_draw::{AttrProjector, AttrToProjector};
use trellis_scene::{ElementId, Scene};

use crate::projection::number;
use crate::scatter::DEFAULT_FILL;
use crate::xy::{Frame, Marks, XyPlot};

/// Bar thickness when there is neither a band nor a gap to measure.
const FALLBACK_THICKNESS: f64 = 10.0;

/// Share of the smallest gap between bars a bar fills on a continuous scale.
const GAP_FILL: f64 = 0.95;

/// Which way bars grow.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum BarOrientation {
    /// Bars rise from the baseline along y; `x` picks the slot.
    #[default]
    Vertical,
    /// Bars extend from the baseline along x; `y` picks the slot.
    Horizontal,
}

impl BarOrientation {
    /// The projected attribute that carries the bar's value.
    pub const fn value_attr(self) -> &'static str {
        match self {
            Self::Vertical => "y",
            Self::Horizontal => "x",
        }
    }

    /// The projected attribute that positions the bar across the value axis.
    pub const fn slot_attr(self) -> &'static str {
        match self {
            Self::Vertical => "x",
            Self::Horizontal => "y",
        }
    }
}

/// Rectangles from a baseline to each value.
#[derive(Clone, Debug)]
pub struct BarMarks {
    orientation: BarOrientation,
    baseline_value: f64,
    baseline: Option<ElementId>,
}

/// A bar plot.
///
/// Each datum draws one `rect` from the baseline (0 unless changed) to its value. The
/// baseline takes part in the value scale's extent and is exempt from padding, so bars never
/// float above the axis.
pub type BarPlot = XyPlot<BarMarks>;

impl XyPlot<BarMarks> {
    /// An empty bar plot.
    pub fn new(orientation: BarOrientation) -> Self {
        Self::with_marks(BarMarks {
            orientation,
            baseline_value: 0.0,
            baseline: None,
        })
    }

    /// Bars rising along y.
    pub fn vertical() -> Self {
        Self::new(BarOrientation::Vertical)
    }

    /// Bars extending along x.
    pub fn horizontal() -> Self {
        Self::new(BarOrientation::Horizontal)
    }

    /// The orientation.
    pub fn orientation(&self) -> BarOrientation {
        self.core.borrow().marks.orientation
    }

    /// The value bars start from.
    pub fn baseline_value(&self) -> f64 {
        self.core.borrow().marks.baseline_value
    }

    /// Move the baseline. Non-finite values are ignored.
    pub fn set_baseline_value(&self, value: f64) -> &Self {
        if !value.is_finite() {
            tracing::warn!(value, "ignoring non-finite bar baseline");
            return self;
        }
        let mut core = self.core.borrow_mut();
        core.marks.baseline_value = value;
        let attr = Cow::Borrowed(core.marks.orientation.value_attr());
        core.extent_changed(&attr);
        self
    }
}

impl BarMarks {
    /// The baseline in pixels.
    fn baseline_pixel(&self, frame: &Frame<'_>) -> f64 {
        frame
            .scale(self.orientation.value_attr())
            .and_then(|s| s.scale_value(&Value::Number(self.baseline_value)).as_number())
            .unwrap_or(self.baseline_value)
    }

    /// How thick each bar is across the value axis.
    fn thickness(&self, frame: &Frame<'_>) -> f64 {
        let slot = self.orientation.slot_attr();
        if let Some(band) = frame.scale(slot).and_then(|s| s.band_width()) {
            return band;
        }
        let Some(projector) = frame.scaled.get(slot) else {
            return FALLBACK_THICKNESS;
        };
        let mut positions: Vec<f64> = frame
            .datasets
            .iter()
            .flat_map(|ds| {
                let data = ds.data();
                (0..data.len())
                    .map(|i| number(projector, &data[i], i, ds))
                    .collect::<Vec<_>>()
            })
            .filter(|p| p.is_finite())
            .collect();
        positions.sort_by(f64::total_cmp);
        positions
            .windows(2)
            .map(|w| w[1] - w[0])
            .filter(|gap| *gap > 0.0)
            .min_by(f64::total_cmp)
            .map_or(FALLBACK_THICKNESS, |gap| gap * GAP_FILL)
    }
}

fn constant(v: f64) -> AttrProjector {
    Rc::new(move |_: &Value, _: usize, _: &Dataset| Value::Number(v))
}

impl Marks for BarMarks {
    fn tag(&self) -> &'static str {
        "rect"
    }

    fn class(&self) -> &'static str {
        "bar"
    }

    fn attrs(&self, frame: &Frame<'_>) -> AttrToProjector {
        let (value_attr, slot_attr) = (self.orientation.value_attr(), self.orientation.slot_attr());
        let (extent_attr, thickness_attr) = match self.orientation {
            BarOrientation::Vertical => ("height", "width"),
            BarOrientation::Horizontal => ("width", "height"),
        };
        let mut attrs: AttrToProjector = frame
            .scaled
            .iter()
            .filter(|(name, _)| *name != value_attr && *name != slot_attr)
            .map(|(name, p)| (name.clone(), p.clone()))
            .collect();

        let base = self.baseline_pixel(frame);
        let thickness = self.thickness(frame);
        if let Some(slot) = frame.scaled.get(slot_attr).cloned() {
            attrs.insert(
                slot_attr.into(),
                Rc::new(move |d: &Value, i: usize, ds: &Dataset| {
                    Value::Number(number(&slot, d, i, ds) - thickness / 2.0)
                }),
            );
        }
        attrs.insert(thickness_attr.into(), constant(thickness));
        if let Some(value) = frame.scaled.get(value_attr).cloned() {
            let start = value.clone();
            attrs.insert(
                value_attr.into(),
                Rc::new(move |d: &Value, i: usize, ds: &Dataset| {
                    Value::Number(number(&start, d, i, ds).min(base))
                }),
            );
            attrs.insert(
                extent_attr.into(),
                Rc::new(move |d: &Value, i: usize, ds: &Dataset| {
                    Value::Number((base - number(&value, d, i, ds)).abs())
                }),
            );
        }
        attrs
            .entry("fill".into())
            .or_insert_with(|| {
                Rc::new(|_: &Value, _: usize, _: &Dataset| Value::from(DEFAULT_FILL))
            });
        attrs
    }

    fn reset_attrs(&self, frame: &Frame<'_>, attrs: &AttrToProjector) -> AttrToProjector {
        let mut reset = attrs.clone();
        let extent_attr = match self.orientation {
            BarOrientation::Vertical => "height",
            BarOrientation::Horizontal => "width",
        };
        reset.insert(
            self.orientation.value_attr().into(),
            constant(self.baseline_pixel(frame)),
        );
        reset.insert(extent_attr.into(), constant(0.0));
        reset
    }

    fn extent_extras(&self, attr: &str) -> Vec<Value> {
        if attr == self.orientation.value_attr() {
            vec![Value::Number(self.baseline_value)]
        } else {
            Vec::new()
        }
    }

    fn padding_exception(&self, attr: &str) -> Option<f64> {
        (attr == self.orientation.value_attr()).then_some(self.baseline_value)
    }

    fn setup(&mut self, scene: &mut Scene, content: ElementId) {
        let line = scene.insert(Some(content), "line");
        scene.set_class(line, "baseline", true);
        self.baseline = Some(line);
    }

    fn paint_extras(&mut self, scene: &mut Scene, frame: &Frame<'_>) {
        let Some(line) = self.baseline else {
            return;
        };
        let base = self.baseline_pixel(frame);
        let (w, h) = (frame.size.width, frame.size.height);
        let (x1, y1, x2, y2) = match self.orientation {
            BarOrientation::Vertical => (0.0, base, w, base),
            BarOrientation::Horizontal => (base, 0.0, base, h),
        };
        scene.set_attr(line, "x1", x1);
        scene.set_attr(line, "y1", y1);
        scene.set_attr(line, "x2", x2);
        scene.set_attr(line, "y2", y2);
    }

    fn removed(&mut self) {
        self.baseline = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Size;
    use trellis_data::record;
    use trellis_layout::{Chart, ComponentId, Environment};
    use trellis_scale::{CategoryScale, LinearScale, QuantitativeScale, Scale};

    fn bars(scene: &Scene, chart: &Chart, id: ComponentId) -> Vec<ElementId> {
        let content = chart.elements(id).unwrap().content;
        scene
            .descendants(content)
            .into_iter()
            .filter(|e| scene.has_class(*e, "bar"))
            .collect()
    }

    fn render(plot: &BarPlot, size: Size) -> (Scene, Chart, ComponentId) {
        let mut scene = Scene::new();
        let surface = scene.insert(None, "svg");
        let mut chart = Chart::new(Environment::new());
        let id = chart.insert(plot.clone());
        chart.render_to(&mut scene, id, surface, size).unwrap();
        (scene, chart, id)
    }

    #[test]
    fn vertical_bars_span_baseline_to_value() {
        let (x, y) = (CategoryScale::new(), LinearScale::new());
        let data = Dataset::new(vec![
            record! { "k" => "a", "v" => 2.0 },
            record! { "k" => "b", "v" => -1.0 },
        ]);
        let plot = BarPlot::vertical();
        plot.x("k", &x).y("v", &y).add_dataset(&data);
        let (scene, chart, id) = render(&plot, Size::new(200.0, 100.0));

        assert_eq!(x.domain(), vec!["a".to_owned(), "b".to_owned()]);
        let [lo, hi] = y.domain();
        assert!(lo <= -1.0 && hi >= 2.0);

        let b = bars(&scene, &chart, id);
        assert_eq!(b.len(), 2);
        let attr = |e, name| scene.attr_number(e, name).unwrap();
        let base = y.scale_number(0.0);
        assert!((attr(b[0], "width") - x.range_band()).abs() < 1e-9);
        assert!((attr(b[0], "x") - (x.scale("a") - x.range_band() / 2.0)).abs() < 1e-9);
        assert!((attr(b[0], "y") + attr(b[0], "height") - base).abs() < 1e-9);
        assert!((attr(b[1], "y") - base).abs() < 1e-9);
        assert!((attr(b[1], "height") - (y.scale_number(-1.0) - base)).abs() < 1e-9);

        let content = chart.elements(id).unwrap().content;
        let line = scene.children_with_class(content, "baseline")[0];
        assert_eq!(scene.attr_number(line, "y1"), Some(base));
        assert_eq!(scene.attr_number(line, "x2"), Some(200.0));
    }

    #[test]
    fn baseline_joins_the_extent_without_padding() {
        let (x, y) = (CategoryScale::new(), LinearScale::new());
        y.set_snapping(false);
        let data = Dataset::new(vec![record! { "k" => "a", "v" => 10.0 }]);
        let plot = BarPlot::vertical();
        plot.x("k", &x).y("v", &y).add_dataset(&data);
        let _rendered = render(&plot, Size::new(100.0, 100.0));
        assert_eq!(y.domain()[0], 0.0);

        plot.set_baseline_value(-5.0);
        assert_eq!(y.domain()[0], -5.0);
        assert_eq!(plot.baseline_value(), -5.0);
    }

    #[test]
    fn horizontal_bars_on_a_continuous_slot_fill_the_gap() {
        let (x, y) = (LinearScale::new(), LinearScale::new());
        y.set_domain([0.0, 4.0]).unwrap();
        let data = Dataset::new(vec![
            record! { "v" => 3.0, "s" => 1.0 },
            record! { "v" => 1.0, "s" => 2.0 },
            record! { "v" => 2.0, "s" => 4.0 },
        ]);
        let plot = BarPlot::horizontal();
        plot.x("v", &x).y("s", &y).add_dataset(&data);
        let (scene, chart, id) = render(&plot, Size::new(100.0, 100.0));

        let b = bars(&scene, &chart, id);
        let gap = (y.scale_number(1.0) - y.scale_number(2.0)).abs();
        let height = scene.attr_number(b[0], "height").unwrap();
        assert!((height - gap * 0.95).abs() < 1e-9);
        let base = x.scale_number(0.0);
        assert!((scene.attr_number(b[0], "x").unwrap() - base).abs() < 1e-9);
        assert_eq!(plot.orientation(), BarOrientation::Horizontal);
    }

    #[test]
    fn single_bar_uses_fallback_thickness() {
        let (x, y) = (LinearScale::new(), LinearScale::new());
        let data = Dataset::new(vec![record! { "x" => 1.0, "y" => 1.0 }]);
        let plot = BarPlot::vertical();
        plot.x("x", &x).y("y", &y).add_dataset(&data);
        let (scene, chart, id) = render(&plot, Size::new(100.0, 100.0));
        let b = bars(&scene, &chart, id);
        assert_eq!(scene.attr_number(b[0], "width"), Some(FALLBACK_THICKNESS));
    }
}
