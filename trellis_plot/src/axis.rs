// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Numeric and category axes.

use std::fmt;
use std::rc::Rc;

use kurbo::Size;
use trellis_data::{Dataset, ListenerId, Value, record};
use trellis_draw::{AttrProjector, AttrToProjector, DrawStep, Drawer, NullAnimator};
use trellis_layout::{Component, RenderCx, RenderError, SetupCx};
use trellis_scale::{CategoryScale, QuantitativeScale, Scale};
use trellis_scene::{ElementId, Scene};

use crate::PlotError;
use crate::text::{HeuristicTextMeasurer, TextMeasurer};

/// Which side of the plot an axis sits on.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AxisOrientation {
    /// Below the plot; ticks point down.
    Bottom,
    /// Above the plot; ticks point up.
    Top,
    /// Left of the plot; ticks point left.
    Left,
    /// Right of the plot; ticks point right.
    Right,
}

impl AxisOrientation {
    /// Whether the axis runs along x.
    pub const fn is_horizontal(self) -> bool {
        matches!(self, Self::Bottom | Self::Top)
    }
}

/// Formats a tick value into its label.
pub type TickFormatter = Rc<dyn Fn(f64) -> String>;

/// Geometry and formatting shared by every axis.
#[derive(Clone)]
pub struct AxisConfig {
    /// Length of inner tick marks.
    pub tick_length: f64,
    /// Length of the first and last tick marks.
    pub end_tick_length: f64,
    /// Gap between the tick marks and their labels.
    pub tick_label_padding: f64,
    /// Space kept beyond the labels.
    pub margin: f64,
    /// Label font size.
    pub font_size: f64,
    /// Label formatter; numeric axes default to the scale's own.
    pub formatter: Option<TickFormatter>,
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self {
            tick_length: 5.0,
            end_tick_length: 5.0,
            tick_label_padding: 10.0,
            margin: 15.0,
            font_size: 12.0,
            formatter: None,
        }
    }
}

impl AxisConfig {
    /// Set the inner tick length.
    pub fn with_tick_length(mut self, length: f64) -> Self {
        self.tick_length = length;
        self
    }

    /// Set the end tick length.
    pub fn with_end_tick_length(mut self, length: f64) -> Self {
        self.end_tick_length = length;
        self
    }

    /// Set the label padding.
    pub fn with_tick_label_padding(mut self, padding: f64) -> Self {
        self.tick_label_padding = padding;
        self
    }

    /// Set the margin.
    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }

    /// Set the label font size.
    pub fn with_font_size(mut self, size: f64) -> Self {
        self.font_size = size;
        self
    }

    /// Format labels with `formatter`.
    pub fn with_formatter(mut self, formatter: impl Fn(f64) -> String + 'static) -> Self {
        self.formatter = Some(Rc::new(formatter));
        self
    }

    /// Check every length is finite and non-negative.
    pub fn validate(&self) -> Result<(), PlotError> {
        PlotError::check_non_negative("tick length", self.tick_length)?;
        PlotError::check_non_negative("end tick length", self.end_tick_length)?;
        PlotError::check_non_negative("tick label padding", self.tick_label_padding)?;
        PlotError::check_non_negative("margin", self.margin)?;
        PlotError::check_non_negative("font size", self.font_size)?;
        Ok(())
    }

    fn longest_tick(&self) -> f64 {
        self.tick_length.max(self.end_tick_length)
    }
}

impl fmt::Debug for AxisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AxisConfig")
            .field("tick_length", &self.tick_length)
            .field("end_tick_length", &self.end_tick_length)
            .field("tick_label_padding", &self.tick_label_padding)
            .field("margin", &self.margin)
            .field("font_size", &self.font_size)
            .field("formatter", &self.formatter.is_some())
            .finish()
    }
}

/// A tick to draw: pixel position along the axis, and its label.
type Tick = (f64, String);

/// The drawing half of an axis: baseline, tick marks, labels.
#[derive(Debug)]
struct AxisGuide {
    orientation: AxisOrientation,
    config: AxisConfig,
    measurer: Rc<dyn TextMeasurer>,
    baseline: Option<ElementId>,
    marks: Drawer,
    labels: Drawer,
    ticks: Dataset,
}

impl AxisGuide {
    fn new(orientation: AxisOrientation) -> Self {
        Self {
            orientation,
            config: AxisConfig::default(),
            measurer: Rc::new(HeuristicTextMeasurer::default()),
            baseline: None,
            marks: Drawer::new("line").with_class("tick-mark"),
            labels: Drawer::new("text").with_class("tick-label"),
            ticks: Dataset::default(),
        }
    }

    fn requested_space<'a>(&self, labels: impl Iterator<Item = &'a str>) -> Size {
        let mut widest = 0.0_f64;
        let mut tallest = 0.0_f64;
        for label in labels {
            let size = self.measurer.measure(label, self.config.font_size);
            widest = widest.max(size.width);
            tallest = tallest.max(size.height);
        }
        let c = &self.config;
        let fixed = c.longest_tick() + c.tick_label_padding + c.margin;
        if self.orientation.is_horizontal() {
            Size::new(0.0, fixed + tallest)
        } else {
            Size::new(fixed + widest, 0.0)
        }
    }

    fn setup(&mut self, scene: &mut Scene, content: ElementId) {
        let line = scene.insert(Some(content), "line");
        scene.set_class(line, "baseline", true);
        self.baseline = Some(line);
        self.marks.attach(scene, content);
        self.labels.attach(scene, content);
    }

    fn removed(&mut self) {
        self.baseline = None;
    }

    fn paint(&mut self, scene: &mut Scene, size: Size, ticks: &[Tick]) -> Result<(), PlotError> {
        let (w, h) = (size.width, size.height);
        if let Some(line) = self.baseline {
            let (x1, y1, x2, y2) = match self.orientation {
                AxisOrientation::Bottom => (0.0, 0.0, w, 0.0),
                AxisOrientation::Top => (0.0, h, w, h),
                AxisOrientation::Left => (w, 0.0, w, h),
                AxisOrientation::Right => (0.0, 0.0, 0.0, h),
            };
            scene.set_attr(line, "x1", x1);
            scene.set_attr(line, "y1", y1);
            scene.set_attr(line, "x2", x2);
            scene.set_attr(line, "y2", y2);
        }

        self.ticks.set_data(
            ticks
                .iter()
                .map(|(pixel, label)| record! { "pixel" => *pixel, "label" => label.clone() })
                .collect(),
        );
        let step = |attrs| [DrawStep::new(attrs, Rc::new(NullAnimator))];
        let (mark_steps, label_steps) = (step(self.mark_attrs(size)), step(self.label_attrs(size)));
        self.marks.draw(scene, &self.ticks, &mark_steps)?;
        self.labels.draw(scene, &self.ticks, &label_steps)?;
        for (element, (_, label)) in self.labels.selection(scene).into_iter().zip(ticks) {
            scene.set_text(element, Some(label.clone()));
        }
        Ok(())
    }

    fn mark_attrs(&self, size: Size) -> AttrToProjector {
        let (inner, end) = (self.config.tick_length, self.config.end_tick_length);
        let length: AttrProjector = Rc::new(move |_: &Value, i: usize, ds: &Dataset| {
            let last = ds.len().saturating_sub(1);
            Value::Number(if i == 0 || i == last { end } else { inner })
        });
        let (along, across) = if self.orientation.is_horizontal() {
            (("x1", "x2"), ("y1", "y2"))
        } else {
            (("y1", "y2"), ("x1", "x2"))
        };
        let (from, sign) = match self.orientation {
            AxisOrientation::Bottom | AxisOrientation::Right => (0.0, 1.0),
            AxisOrientation::Top => (size.height, -1.0),
            AxisOrientation::Left => (size.width, -1.0),
        };
        let mut attrs = AttrToProjector::new();
        attrs.insert(along.0.into(), pixel());
        attrs.insert(along.1.into(), pixel());
        attrs.insert(across.0.into(), constant(Value::Number(from)));
        attrs.insert(
            across.1.into(),
            Rc::new(move |d: &Value, i: usize, ds: &Dataset| {
                let len = length(d, i, ds).as_number().unwrap_or(0.0);
                Value::Number(from + sign * len)
            }),
        );
        attrs
    }

    fn label_attrs(&self, size: Size) -> AttrToProjector {
        let offset = self.config.longest_tick() + self.config.tick_label_padding;
        let (across, anchor, baseline) = match self.orientation {
            AxisOrientation::Bottom => (offset, "middle", "hanging"),
            AxisOrientation::Top => (size.height - offset, "middle", "alphabetic"),
            AxisOrientation::Left => (size.width - offset, "end", "central"),
            AxisOrientation::Right => (offset, "start", "central"),
        };
        let (along_name, across_name) = if self.orientation.is_horizontal() {
            ("x", "y")
        } else {
            ("y", "x")
        };
        let font_size = self.config.font_size;
        let mut attrs = AttrToProjector::new();
        attrs.insert(along_name.into(), pixel());
        attrs.insert(across_name.into(), constant(Value::Number(across)));
        attrs.insert("text-anchor".into(), constant(Value::from(anchor)));
        attrs.insert("dominant-baseline".into(), constant(Value::from(baseline)));
        attrs.insert("font-size".into(), constant(Value::Number(font_size)));
        attrs
    }
}

fn pixel() -> AttrProjector {
    Rc::new(|d: &Value, _: usize, _: &Dataset| d.get("pixel").cloned().unwrap_or_default())
}

fn constant(value: Value) -> AttrProjector {
    Rc::new(move |_: &Value, _: usize, _: &Dataset| value.clone())
}

/// An axis for a continuous scale (linear, log, modified log, or time).
///
/// The axis asks for exactly the space its tick labels need across its direction and
/// stretches along it. It lays out again whenever the scale's domain changes, since new ticks
/// may need a different width.
///
/// ```
/// use kurbo::Size;
/// use trellis_layout::Component;
/// use trellis_plot::{AxisOrientation, NumericAxis};
/// use trellis_scale::{LinearScale, Scale};
///
/// let scale = LinearScale::new();
/// scale.set_domain([0.0, 100.0]).unwrap();
/// let axis = NumericAxis::new(&scale, AxisOrientation::Left);
/// let wanted = axis.requested_space(Size::new(500.0, 500.0));
/// assert!(wanted.width > 30.0 && wanted.height == 0.0);
/// assert!(axis.fixed_width() && !axis.fixed_height());
/// ```
#[derive(Debug)]
pub struct NumericAxis<S> {
    scale: S,
    guide: AxisGuide,
    listener: Option<ListenerId>,
}

impl<S: QuantitativeScale> NumericAxis<S> {
    /// An axis for `scale` on side `orientation`.
    pub fn new(scale: &S, orientation: AxisOrientation) -> Self {
        Self {
            scale: scale.clone(),
            guide: AxisGuide::new(orientation),
            listener: None,
        }
    }

    /// Use `config` instead of the defaults.
    pub fn with_config(mut self, config: AxisConfig) -> Result<Self, PlotError> {
        config.validate()?;
        self.guide.config = config;
        Ok(self)
    }

    /// Measure labels with `measurer`.
    pub fn with_measurer(mut self, measurer: Rc<dyn TextMeasurer>) -> Self {
        self.guide.measurer = measurer;
        self
    }

    /// The side the axis sits on.
    pub fn orientation(&self) -> AxisOrientation {
        self.guide.orientation
    }

    /// Tick values and their labels.
    pub fn tick_labels(&self) -> Vec<(f64, String)> {
        self.scale
            .ticks()
            .into_iter()
            .map(|v| {
                let label = match &self.guide.config.formatter {
                    Some(format) => format(v),
                    None => self.scale.format_tick(v),
                };
                (v, label)
            })
            .collect()
    }
}

impl<S: QuantitativeScale + fmt::Debug> Component for NumericAxis<S> {
    fn requested_space(&self, _offered: Size) -> Size {
        let labels = self.tick_labels();
        self.guide.requested_space(labels.iter().map(|(_, l)| l.as_str()))
    }

    fn fixed_width(&self) -> bool {
        !self.guide.orientation.is_horizontal()
    }

    fn fixed_height(&self) -> bool {
        self.guide.orientation.is_horizontal()
    }

    fn setup(&mut self, cx: &mut SetupCx<'_>) {
        self.guide.setup(cx.scene, cx.elements.content);
        let (env, id) = (cx.env.clone(), cx.id);
        self.listener = Some(self.scale.on_domain_change(move || env.request_layout(id)));
    }

    fn layout_changed(&mut self, size: Size) {
        let (start, end) = if self.guide.orientation.is_horizontal() {
            (0.0, size.width)
        } else {
            (size.height, 0.0)
        };
        if let Err(err) = self.scale.set_range(start, end) {
            tracing::warn!(%err, "could not set axis range");
        }
    }

    fn render(&mut self, cx: &mut RenderCx<'_>) -> Result<(), RenderError> {
        let ticks: Vec<Tick> = self
            .tick_labels()
            .into_iter()
            .map(|(v, label)| (self.scale.scale_number(v), label))
            .collect();
        self.guide.paint(cx.scene, cx.size, &ticks)?;
        Ok(())
    }

    fn removed(&mut self, _scene: &mut Scene) {
        if let Some(listener) = self.listener.take() {
            self.scale.off_domain_change(listener);
        }
        self.guide.removed();
    }
}

/// An axis labelling each band of a [`CategoryScale`] at its centre.
#[derive(Debug)]
pub struct CategoryAxis {
    scale: CategoryScale,
    guide: AxisGuide,
    listener: Option<ListenerId>,
}

impl CategoryAxis {
    /// An axis for `scale` on side `orientation`.
    pub fn new(scale: &CategoryScale, orientation: AxisOrientation) -> Self {
        Self {
            scale: scale.clone(),
            guide: AxisGuide::new(orientation),
            listener: None,
        }
    }

    /// Use `config` instead of the defaults. The formatter does not apply to categories.
    pub fn with_config(mut self, config: AxisConfig) -> Result<Self, PlotError> {
        config.validate()?;
        self.guide.config = config;
        Ok(self)
    }

    /// Measure labels with `measurer`.
    pub fn with_measurer(mut self, measurer: Rc<dyn TextMeasurer>) -> Self {
        self.guide.measurer = measurer;
        self
    }
}

impl Component for CategoryAxis {
    fn requested_space(&self, _offered: Size) -> Size {
        let domain = self.scale.domain();
        self.guide.requested_space(domain.iter().map(String::as_str))
    }

    fn fixed_width(&self) -> bool {
        !self.guide.orientation.is_horizontal()
    }

    fn fixed_height(&self) -> bool {
        self.guide.orientation.is_horizontal()
    }

    fn setup(&mut self, cx: &mut SetupCx<'_>) {
        self.guide.setup(cx.scene, cx.elements.content);
        let (env, id) = (cx.env.clone(), cx.id);
        self.listener = Some(self.scale.on_domain_change(move || env.request_layout(id)));
    }

    fn layout_changed(&mut self, size: Size) {
        let end = if self.guide.orientation.is_horizontal() {
            size.width
        } else {
            size.height
        };
        if let Err(err) = self.scale.set_range(0.0, end) {
            tracing::warn!(%err, "could not set axis range");
        }
    }

    fn render(&mut self, cx: &mut RenderCx<'_>) -> Result<(), RenderError> {
        let ticks: Vec<Tick> = self
            .scale
            .domain()
            .into_iter()
            .map(|c| (self.scale.scale(&c), c))
            .collect();
        self.guide.paint(cx.scene, cx.size, &ticks)?;
        Ok(())
    }

    fn removed(&mut self, _scene: &mut Scene) {
        if let Some(listener) = self.listener.take() {
            self.scale.off_domain_change(listener);
        }
        self.guide.removed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Rect;
    use trellis_layout::{Chart, ComponentId, Environment};
    use trellis_scale::LinearScale;

    #[derive(Debug)]
    struct FixedWidth(f64);

    impl TextMeasurer for FixedWidth {
        fn measure(&self, text: &str, _font_size: f64) -> Size {
            #[allow(clippy::cast_precision_loss, reason = "test labels are short")]
            let n = text.len() as f64;
            Size::new(n * self.0, 10.0)
        }
    }

    fn labels(scene: &Scene, chart: &Chart, id: ComponentId) -> Vec<String> {
        let content = chart.elements(id).unwrap().content;
        scene
            .descendants(content)
            .into_iter()
            .filter(|e| scene.has_class(*e, "tick-label"))
            .filter_map(|e| scene.text(e).map(str::to_owned))
            .collect()
    }

    #[test]
    fn request_covers_ticks_padding_margin_and_labels() {
        let scale = LinearScale::new();
        scale.set_domain([0.0, 10.0]).unwrap();
        let axis = NumericAxis::new(&scale, AxisOrientation::Bottom)
            .with_measurer(Rc::new(FixedWidth(7.0)));
        assert_eq!(axis.requested_space(Size::new(300.0, 300.0)), Size::new(0.0, 40.0));

        let left = NumericAxis::new(&scale, AxisOrientation::Left)
            .with_measurer(Rc::new(FixedWidth(7.0)))
            .with_config(AxisConfig::default().with_margin(0.0).with_end_tick_length(8.0))
            .unwrap();
        // Widest label is "10".
        assert_eq!(
            left.requested_space(Size::new(300.0, 300.0)),
            Size::new(8.0 + 10.0 + 14.0, 0.0)
        );
    }

    #[test]
    fn invalid_config_is_rejected() {
        let scale = LinearScale::new();
        let err = NumericAxis::new(&scale, AxisOrientation::Bottom)
            .with_config(AxisConfig::default().with_tick_length(-1.0))
            .unwrap_err();
        assert_eq!(
            err,
            PlotError::InvalidParameter {
                name: "tick length",
                value: -1.0
            }
        );
    }

    #[test]
    fn formatter_overrides_scale_labels() {
        let scale = LinearScale::new();
        scale.set_domain([0.0, 1.0]).unwrap();
        scale.set_tick_count(2);
        let axis = NumericAxis::new(&scale, AxisOrientation::Bottom)
            .with_config(AxisConfig::default().with_formatter(|v| format!("{:.0}%", v * 100.0)))
            .unwrap();
        let labels: Vec<String> = axis.tick_labels().into_iter().map(|(_, l)| l).collect();
        assert_eq!(labels.first().map(String::as_str), Some("0%"));
        assert_eq!(labels.last().map(String::as_str), Some("100%"));
    }

    #[test]
    fn renders_one_mark_and_label_per_tick() {
        let scale = LinearScale::new();
        scale.set_domain([0.0, 10.0]).unwrap();
        let axis = NumericAxis::new(&scale, AxisOrientation::Bottom);
        let expected: Vec<String> = axis.tick_labels().into_iter().map(|(_, l)| l).collect();
        let mut scene = Scene::new();
        let surface = scene.insert(None, "svg");
        let mut chart = Chart::new(Environment::new());
        let id = chart.insert(axis);
        chart
            .render_to(&mut scene, id, surface, Size::new(200.0, 40.0))
            .unwrap();

        assert_eq!(scale.range(), (0.0, 200.0));
        assert_eq!(labels(&scene, &chart, id), expected);
        let content = chart.elements(id).unwrap().content;
        let marks = scene
            .descendants(content)
            .into_iter()
            .filter(|e| scene.has_class(*e, "tick-mark") && scene.tag(*e) == Some("line"))
            .collect::<Vec<_>>();
        assert_eq!(marks.len(), expected.len());
        let last = *marks.last().unwrap();
        assert_eq!(scene.attr_number(last, "x1"), Some(200.0));
        assert_eq!(scene.attr_number(last, "y2"), Some(5.0));
    }

    #[test]
    fn domain_change_requests_layout() {
        let scale = LinearScale::new();
        scale.set_domain([0.0, 10.0]).unwrap();
        let mut scene = Scene::new();
        let surface = scene.insert(None, "svg");
        let mut chart = Chart::new(Environment::new());
        let id = chart.insert(NumericAxis::new(&scale, AxisOrientation::Left));
        chart
            .render_to(&mut scene, id, surface, Size::new(60.0, 200.0))
            .unwrap();
        assert!(!chart.environment().has_pending_frame());

        scale.set_domain([0.0, 100_000.0]).unwrap();
        assert!(chart.environment().has_pending_frame());
        let stats = chart.flush(&mut scene);
        assert_eq!(stats.laid_out, 1);
        assert_eq!(labels(&scene, &chart, id).last().map(String::as_str), Some("100000"));
    }

    #[test]
    fn category_axis_labels_band_centres() {
        let scale = CategoryScale::new();
        scale
            .set_domain(vec!["a".to_owned(), "bb".to_owned()])
            .unwrap();
        let axis = CategoryAxis::new(&scale, AxisOrientation::Bottom)
            .with_measurer(Rc::new(FixedWidth(5.0)));
        assert_eq!(axis.requested_space(Size::new(100.0, 100.0)).height, 40.0);
        assert!(axis.fixed_height());

        let mut scene = Scene::new();
        let surface = scene.insert(None, "svg");
        let mut chart = Chart::new(Environment::new());
        let id = chart.insert(axis);
        chart
            .render_to(&mut scene, id, surface, Size::new(100.0, 40.0))
            .unwrap();
        assert_eq!(chart.bounds(id), Some(Rect::new(0.0, 0.0, 100.0, 40.0)));
        assert_eq!(labels(&scene, &chart, id), vec!["a", "bb"]);
        let content = chart.elements(id).unwrap().content;
        let label_x: Vec<f64> = scene
            .descendants(content)
            .into_iter()
            .filter(|e| scene.has_class(*e, "tick-label") && scene.tag(*e) == Some("text"))
            .filter_map(|e| scene.attr_number(e, "x"))
            .collect();
        assert!((label_x[0] - scale.scale("a")).abs() < 1e-9);
        assert!((label_x[1] - scale.scale("bb")).abs() < 1e-9);
    }
}
