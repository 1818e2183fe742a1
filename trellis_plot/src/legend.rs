// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::rc::Rc;

use kurbo::Size;
use trellis_data::{Dataset, ListenerId, Value};
use trellis_draw::{AttrProjector, AttrToProjector, DrawStep, Drawer, NullAnimator};
use trellis_layout::{Component, RenderCx, RenderError, SetupCx};
use trellis_scale::{ColorScale, Scale};
use trellis_scene::Scene;

use crate::PlotError;
use crate::text::{HeuristicTextMeasurer, TextMeasurer};

/// One row per category of a [`ColorScale`]: a swatch in the category's colour and its name.
///
/// The legend asks for exactly the space its rows need, and lays out again when the scale's
/// domain changes.
#[derive(Debug)]
pub struct Legend {
    scale: ColorScale,
    font_size: f64,
    padding: f64,
    measurer: Rc<dyn TextMeasurer>,
    swatches: Drawer,
    labels: Drawer,
    entries: Dataset,
    listener: Option<ListenerId>,
}

impl Legend {
    /// A legend for `scale`.
    pub fn new(scale: &ColorScale) -> Self {
        Self {
            scale: scale.clone(),
            font_size: 12.0,
            padding: 5.0,
            measurer: Rc::new(HeuristicTextMeasurer::default()),
            swatches: Drawer::new("circle").with_class("legend-swatch"),
            labels: Drawer::new("text").with_class("legend-label"),
            entries: Dataset::default(),
            listener: None,
        }
    }

    /// Set the label font size.
    pub fn with_font_size(mut self, size: f64) -> Result<Self, PlotError> {
        self.font_size = PlotError::check_non_negative("font size", size)?;
        Ok(self)
    }

    /// Set the space around the rows.
    pub fn with_padding(mut self, padding: f64) -> Result<Self, PlotError> {
        self.padding = PlotError::check_non_negative("padding", padding)?;
        Ok(self)
    }

    /// Measure labels with `measurer`.
    pub fn with_measurer(mut self, measurer: Rc<dyn TextMeasurer>) -> Self {
        self.measurer = measurer;
        self
    }

    fn row_height(&self) -> f64 {
        self.measurer.measure("M", self.font_size).height
    }

    fn swatch_radius(&self) -> f64 {
        self.row_height() * 0.3
    }
}

impl Component for Legend {
    fn requested_space(&self, _offered: Size) -> Size {
        let domain = self.scale.domain();
        let widest = domain
            .iter()
            .map(|name| self.measurer.measure(name, self.font_size).width)
            .fold(0.0, f64::max);
        let row = self.row_height();
        #[allow(clippy::cast_precision_loss, reason = "legends have few rows")]
        let rows = domain.len() as f64;
        Size::new(
            2.0 * self.padding + row + widest,
            2.0 * self.padding + rows * row,
        )
    }

    fn fixed_width(&self) -> bool {
        true
    }

    fn fixed_height(&self) -> bool {
        true
    }

    fn setup(&mut self, cx: &mut SetupCx<'_>) {
        self.swatches.attach(cx.scene, cx.elements.content);
        self.labels.attach(cx.scene, cx.elements.content);
        let (env, id) = (cx.env.clone(), cx.id);
        self.listener = Some(self.scale.on_domain_change(move || env.request_layout(id)));
    }

    fn render(&mut self, cx: &mut RenderCx<'_>) -> Result<(), RenderError> {
        let domain = self.scale.domain();
        self.entries
            .set_data(domain.iter().map(|name| Value::from(name.as_str())).collect());

        let (row, radius, padding) = (self.row_height(), self.swatch_radius(), self.padding);
        let row_centre = move |i: usize| {
            #[allow(clippy::cast_precision_loss, reason = "legends have few rows")]
            let i = i as f64;
            padding + (i + 0.5) * row
        };
        let constant = |v: Value| -> AttrProjector {
            Rc::new(move |_: &Value, _: usize, _: &Dataset| v.clone())
        };
        let by_row = || -> AttrProjector {
            Rc::new(move |_: &Value, i: usize, _: &Dataset| Value::Number(row_centre(i)))
        };

        let mut swatch = AttrToProjector::new();
        swatch.insert("cx".into(), constant(Value::Number(padding + row / 2.0)));
        swatch.insert("cy".into(), by_row());
        swatch.insert("r".into(), constant(Value::Number(radius)));
        let scale = self.scale.clone();
        swatch.insert(
            "fill".into(),
            Rc::new(move |d: &Value, _: usize, _: &Dataset| {
                Value::from(scale.scale(&d.to_string()))
            }),
        );

        let mut label = AttrToProjector::new();
        label.insert("x".into(), constant(Value::Number(padding + row)));
        label.insert("y".into(), by_row());
        label.insert("dominant-baseline".into(), constant(Value::from("central")));
        label.insert("font-size".into(), constant(Value::Number(self.font_size)));

        let instant = |attrs| [DrawStep::new(attrs, Rc::new(NullAnimator))];
        let (swatch_steps, label_steps) = (instant(swatch), instant(label));
        self.swatches.draw(cx.scene, &self.entries, &swatch_steps)?;
        self.labels.draw(cx.scene, &self.entries, &label_steps)?;
        for (element, name) in self.labels.selection(cx.scene).into_iter().zip(domain) {
            cx.scene.set_text(element, Some(name));
        }
        Ok(())
    }

    fn removed(&mut self, _scene: &mut Scene) {
        if let Some(listener) = self.listener.take() {
            self.scale.off_domain_change(listener);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_layout::{Chart, Environment};
    use trellis_scene::ElementId;

    fn tagged(scene: &Scene, root: ElementId, tag: &str) -> Vec<ElementId> {
        scene
            .descendants(root)
            .into_iter()
            .filter(|e| scene.tag(*e) == Some(tag))
            .collect()
    }

    #[test]
    fn one_row_per_category() {
        let colors = ColorScale::new();
        colors
            .set_domain(vec!["apples".to_owned(), "pears".to_owned()])
            .unwrap();
        let legend = Legend::new(&colors).with_padding(0.0).unwrap();
        let size = legend.requested_space(Size::new(200.0, 200.0));
        assert!((size.height - 2.0 * 1.2 * 12.0).abs() < 1e-9);

        let mut scene = Scene::new();
        let surface = scene.insert(None, "svg");
        let mut chart = Chart::new(Environment::new());
        let id = chart.insert(legend);
        chart
            .render_to(&mut scene, id, surface, Size::new(200.0, 200.0))
            .unwrap();
        let content = chart.elements(id).unwrap().content;
        let swatches = tagged(&scene, content, "circle");
        assert_eq!(swatches.len(), 2);
        assert_eq!(
            scene.attr(swatches[1], "fill"),
            Some(&Value::from(colors.scale("pears")))
        );
        let names: Vec<_> = tagged(&scene, content, "text")
            .into_iter()
            .filter_map(|e| scene.text(e).map(str::to_owned))
            .collect();
        assert_eq!(names, vec!["apples", "pears"]);

        colors.set_domain(vec!["plums".to_owned()]).unwrap();
        assert!(chart.environment().has_pending_frame());
        chart.flush(&mut scene);
        assert_eq!(tagged(&scene, content, "circle").len(), 1);
    }
}
