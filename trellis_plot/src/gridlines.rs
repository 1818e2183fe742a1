// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::fmt;
use std::rc::Rc;

use kurbo::Size;
use trellis_data::{Dataset, ListenerId, Value, record};
use trellis_draw::{AttrProjector, AttrToProjector, DrawStep, Drawer, NullAnimator};
use trellis_layout::{Component, RenderCx, RenderError, SetupCx};
use trellis_scale::{QuantitativeScale, ScaleError};
use trellis_scene::Scene;

/// The parts of a quantitative scale gridlines use, object safe so x and y may differ in type.
trait GridScale {
    fn tick_values(&self) -> Vec<f64>;
    fn to_pixel(&self, value: f64) -> f64;
    fn fit_range(&self, start: f64, end: f64) -> Result<(), ScaleError>;
    fn listen(&self, callback: Box<dyn Fn()>) -> ListenerId;
    fn unlisten(&self, id: ListenerId);
}

impl<S: QuantitativeScale> GridScale for S {
    fn tick_values(&self) -> Vec<f64> {
        self.ticks()
    }

    fn to_pixel(&self, value: f64) -> f64 {
        self.scale_number(value)
    }

    fn fit_range(&self, start: f64, end: f64) -> Result<(), ScaleError> {
        self.set_range(start, end)
    }

    fn listen(&self, callback: Box<dyn Fn()>) -> ListenerId {
        self.on_domain_change(callback)
    }

    fn unlisten(&self, id: ListenerId) {
        self.off_domain_change(id);
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Direction {
    /// One vertical line per x tick.
    X,
    /// One horizontal line per y tick.
    Y,
}

struct GridAxis {
    direction: Direction,
    scale: Box<dyn GridScale>,
    lines: Drawer,
    ticks: Dataset,
    listener: Option<ListenerId>,
}

impl GridAxis {
    fn new(direction: Direction, scale: Box<dyn GridScale>) -> Self {
        Self {
            direction,
            scale,
            lines: Drawer::new("line"),
            ticks: Dataset::default(),
            listener: None,
        }
    }

    fn group_class(&self) -> &'static str {
        match self.direction {
            Direction::X => "x-gridlines",
            Direction::Y => "y-gridlines",
        }
    }

    fn fit(&self, size: Size) {
        let (start, end) = match self.direction {
            Direction::X => (0.0, size.width),
            Direction::Y => (size.height, 0.0),
        };
        if let Err(err) = self.scale.fit_range(start, end) {
            tracing::warn!(%err, "could not set gridline range");
        }
    }

    fn paint(&mut self, scene: &mut Scene, size: Size) -> Result<(), RenderError> {
        let values = self.scale.tick_values();
        self.ticks.set_data(
            values
                .iter()
                .map(|v| record! { "pixel" => self.scale.to_pixel(*v) })
                .collect(),
        );
        let pixel: AttrProjector = Rc::new(|d: &Value, _: usize, _: &Dataset| {
            d.get("pixel").cloned().unwrap_or(Value::Null)
        });
        let constant = |v: f64| -> AttrProjector {
            Rc::new(move |_: &Value, _: usize, _: &Dataset| Value::Number(v))
        };
        let (along, across) = match self.direction {
            Direction::X => (("x1", "x2"), ("y1", "y2", size.height)),
            Direction::Y => (("y1", "y2"), ("x1", "x2", size.width)),
        };
        let mut attrs = AttrToProjector::new();
        attrs.insert(along.0.into(), pixel.clone());
        attrs.insert(along.1.into(), pixel);
        attrs.insert(across.0.into(), constant(0.0));
        attrs.insert(across.1.into(), constant(across.2));

        let steps = [DrawStep::new(attrs, Rc::new(NullAnimator))];
        self.lines.draw(scene, &self.ticks, &steps)?;
        for (line, value) in self.lines.selection(scene).into_iter().zip(values) {
            scene.set_class(line, "zeroline", value == 0.0);
        }
        Ok(())
    }
}

/// Lines across the plot area at every tick of an x scale, a y scale, or both.
///
/// Vertical lines for x ticks go in an `x-gridlines` group, horizontal ones for y ticks in a
/// `y-gridlines` group. The line at value 0 carries the `zeroline` class. Gridlines set the
/// pixel range of their scales when laid out, as plots do, and redraw when a domain changes.
///
/// ```
/// use kurbo::Size;
/// use trellis_layout::{Chart, Environment};
/// use trellis_plot::Gridlines;
/// use trellis_scale::{LinearScale, Scale};
/// use trellis_scene::Scene;
///
/// let y = LinearScale::new();
/// y.set_domain([-1.0, 1.0]).unwrap();
/// let mut scene = Scene::new();
/// let surface = scene.insert(None, "svg");
/// let mut chart = Chart::new(Environment::new());
/// let id = chart.insert(Gridlines::new().with_y(&y));
/// chart.render_to(&mut scene, id, surface, Size::new(100.0, 100.0)).unwrap();
/// let content = chart.elements(id).unwrap().content;
/// let zero = scene
///     .descendants(content)
///     .into_iter()
///     .find(|e| scene.has_class(*e, "zeroline"))
///     .unwrap();
/// assert_eq!(scene.attr_number(zero, "y1"), Some(50.0));
/// ```
#[derive(Default)]
pub struct Gridlines {
    axes: Vec<GridAxis>,
}

impl Gridlines {
    /// Gridlines for no scale yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw a vertical line at every tick of `scale`.
    pub fn with_x<S: QuantitativeScale>(self, scale: &S) -> Self {
        self.with_axis(Direction::X, Box::new(scale.clone()))
    }

    /// Draw a horizontal line at every tick of `scale`.
    pub fn with_y<S: QuantitativeScale>(self, scale: &S) -> Self {
        self.with_axis(Direction::Y, Box::new(scale.clone()))
    }

    fn with_axis(mut self, direction: Direction, scale: Box<dyn GridScale>) -> Self {
        self.axes.retain(|a| a.direction != direction);
        self.axes.push(GridAxis::new(direction, scale));
        self.axes.sort_by_key(|a| a.direction == Direction::Y);
        self
    }
}

impl fmt::Debug for Gridlines {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let directions: Vec<Direction> = self.axes.iter().map(|a| a.direction).collect();
        f.debug_struct("Gridlines")
            .field("axes", &directions)
            .finish()
    }
}

impl Component for Gridlines {
    fn requested_space(&self, _offered: Size) -> Size {
        Size::ZERO
    }

    fn setup(&mut self, cx: &mut SetupCx<'_>) {
        for axis in &mut self.axes {
            let group = cx.scene.insert(Some(cx.elements.content), "g");
            cx.scene.set_class(group, axis.group_class(), true);
            axis.lines.attach(cx.scene, group);
            let (env, id) = (cx.env.clone(), cx.id);
            axis.listener = Some(axis.scale.listen(Box::new(move || env.request_render(id))));
        }
    }

    fn layout_changed(&mut self, size: Size) {
        for axis in &self.axes {
            axis.fit(size);
        }
    }

    fn render(&mut self, cx: &mut RenderCx<'_>) -> Result<(), RenderError> {
        for axis in &mut self.axes {
            axis.paint(cx.scene, cx.size)?;
        }
        Ok(())
    }

    fn removed(&mut self, _scene: &mut Scene) {
        for axis in &mut self.axes {
            if let Some(listener) = axis.listener.take() {
                axis.scale.unlisten(listener);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_layout::{Chart, ComponentId, Environment};
    use trellis_scale::{LinearScale, Scale, TimeScale};
    use trellis_scene::ElementId;

    fn lines_in(scene: &Scene, chart: &Chart, id: ComponentId, group: &str) -> Vec<ElementId> {
        let content = chart.elements(id).unwrap().content;
        let Some(group) = scene
            .descendants(content)
            .into_iter()
            .find(|e| scene.has_class(*e, group))
        else {
            return Vec::new();
        };
        scene
            .descendants(group)
            .into_iter()
            .filter(|e| scene.tag(*e) == Some("line"))
            .collect()
    }

    #[test]
    fn lines_span_the_area_at_each_tick() {
        let (x, y) = (LinearScale::new(), LinearScale::new());
        x.set_domain([0.0, 10.0]).unwrap();
        y.set_domain([-5.0, 5.0]).unwrap();
        let mut scene = Scene::new();
        let surface = scene.insert(None, "svg");
        let mut chart = Chart::new(Environment::new());
        let id = chart.insert(Gridlines::new().with_x(&x).with_y(&y));
        chart
            .render_to(&mut scene, id, surface, Size::new(200.0, 100.0))
            .unwrap();
        assert_eq!(x.range(), (0.0, 200.0));
        assert_eq!(y.range(), (100.0, 0.0));

        let verticals = lines_in(&scene, &chart, id, "x-gridlines");
        assert_eq!(verticals.len(), x.ticks().len());
        for (line, tick) in verticals.iter().zip(x.ticks()) {
            let at = x.scale_number(tick);
            assert_eq!(scene.attr_number(*line, "x1"), Some(at));
            assert_eq!(scene.attr_number(*line, "x2"), Some(at));
            assert_eq!(scene.attr_number(*line, "y1"), Some(0.0));
            assert_eq!(scene.attr_number(*line, "y2"), Some(100.0));
        }

        let horizontals = lines_in(&scene, &chart, id, "y-gridlines");
        assert_eq!(horizontals.len(), y.ticks().len());
        let zero: Vec<_> = horizontals
            .iter()
            .filter(|e| scene.has_class(**e, "zeroline"))
            .collect();
        assert_eq!(zero.len(), 1);
        assert_eq!(scene.attr_number(*zero[0], "y1"), Some(50.0));
        assert_eq!(scene.attr_number(*zero[0], "x2"), Some(200.0));
    }

    #[test]
    fn domain_change_redraws_and_removal_unlistens() {
        let y = LinearScale::new();
        y.set_domain([0.0, 10.0]).unwrap();
        let mut scene = Scene::new();
        let surface = scene.insert(None, "svg");
        let mut chart = Chart::new(Environment::new());
        let id = chart.insert(Gridlines::new().with_y(&y));
        chart
            .render_to(&mut scene, id, surface, Size::new(100.0, 100.0))
            .unwrap();
        assert!(lines_in(&scene, &chart, id, "x-gridlines").is_empty());

        y.set_domain([10.0, 20.0]).unwrap();
        assert!(chart.environment().has_pending_frame());
        chart.flush(&mut scene);
        scene.settle();
        let lines = lines_in(&scene, &chart, id, "y-gridlines");
        assert_eq!(lines.len(), y.ticks().len());
        assert!(lines.iter().all(|e| !scene.has_class(*e, "zeroline")));

        chart.remove(&mut scene, id).unwrap();
        chart.flush(&mut scene);
        y.set_domain([0.0, 1.0]).unwrap();
        assert!(!chart.environment().has_pending_frame());
    }

    #[test]
    fn x_and_y_scales_may_differ_in_type() {
        let (x, y) = (TimeScale::new(), LinearScale::new());
        let grid = Gridlines::new().with_y(&y).with_x(&x).with_y(&y);
        assert_eq!(format!("{grid:?}"), "Gridlines { axes: [X, Y] }");
    }
}
