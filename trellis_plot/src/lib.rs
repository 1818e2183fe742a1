// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Trellis Plot: the components that draw data and explain it.
//!
//! - [`ScatterPlot`] and [`BarPlot`] draw one mark per datum, [`LinePlot`] one path per
//!   dataset. Each is an [`XyPlot`] over a different [`Marks`] strategy: the plot owns
//!   projections, datasets, listeners and animation; the marks decide element shape.
//! - [`NumericAxis`] and [`CategoryAxis`] draw a baseline, ticks and tick labels for a scale,
//!   and ask for exactly the room their labels need.
//! - [`Label`] and [`Legend`] are fixed-size text blocks.
//! - [`Gridlines`] and [`SelectionBoxLayer`] fill whatever area they are given; stack them
//!   with a plot in a group.
//!
//! Plots push the extent of every projected attribute into its scale, so sharing a scale
//! between a plot and an axis is all it takes to keep them in agreement. Both set the scale's
//! pixel range when they are laid out.
//!
//! ## Minimal example
//!
//! ```
//! use kurbo::Size;
//! use trellis_data::{Dataset, record};
//! use trellis_layout::{Chart, Environment};
//! use trellis_plot::{AxisOrientation, NumericAxis, ScatterPlot};
//! use trellis_scale::{LinearScale, QuantitativeScale};
//! use trellis_scene::Scene;
//!
//! let (x, y) = (LinearScale::new(), LinearScale::new());
//! let data = Dataset::new(vec![
//!     record! { "x" => 0.0, "y" => 5.0 },
//!     record! { "x" => 10.0, "y" => 15.0 },
//! ]);
//! let plot = ScatterPlot::new();
//! plot.x("x", &x).y("y", &y).add_dataset(&data);
//!
//! let mut scene = Scene::new();
//! let surface = scene.insert(None, "svg");
//! let mut chart = Chart::new(Environment::new());
//! let y_axis = chart.insert(NumericAxis::new(&y, AxisOrientation::Left));
//! let area = chart.insert(plot.clone());
//! let x_axis = chart.insert(NumericAxis::new(&x, AxisOrientation::Bottom));
//! let table = chart
//!     .add_table(vec![vec![Some(y_axis), Some(area)], vec![None, Some(x_axis)]])
//!     .unwrap();
//! chart.render_to(&mut scene, table, surface, Size::new(400.0, 300.0)).unwrap();
//!
//! let bounds = chart.bounds(area).unwrap();
//! assert_eq!(x.range(), (0.0, bounds.width()));
//! assert_eq!(plot.entities(&scene).len(), 2);
//! ```

mod axis;
mod bar;
mod error;
mod gridlines;
mod label;
mod legend;
mod line;
mod projection;
mod scatter;
mod selection_box;
mod text;
mod xy;

pub use axis::{AxisConfig, AxisOrientation, CategoryAxis, NumericAxis, TickFormatter};
pub use bar::{BarMarks, BarOrientation, BarPlot};
pub use error::PlotError;
pub use gridlines::Gridlines;
pub use label::Label;
pub use legend::Legend;
pub use line::{LineMarks, LinePlot};
pub use projection::{Projection, Projections};
pub use scatter::{DEFAULT_FILL, ScatterMarks, ScatterPlot};
pub use selection_box::SelectionBoxLayer;
pub use text::{HeuristicTextMeasurer, TextMeasurer};
pub use xy::{AnimatorRole, Frame, Marks, XyPlot};

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Size;
    use trellis_data::{Dataset, record};
    use trellis_layout::{Chart, Environment};
    use trellis_scale::{CategoryScale, LinearScale, QuantitativeScale, Scale};
    use trellis_scene::Scene;

    #[test]
    fn axes_and_plot_share_ranges_in_a_table() {
        let (x, y) = (LinearScale::new(), LinearScale::new());
        let data = Dataset::new(vec![
            record! { "x" => 0.0, "y" => 0.0 },
            record! { "x" => 4.0, "y" => 8.0 },
        ]);
        let plot = ScatterPlot::new();
        plot.x("x", &x).y("y", &y).add_dataset(&data);

        let mut scene = Scene::new();
        let surface = scene.insert(None, "svg");
        let mut chart = Chart::new(Environment::new());
        let y_axis = chart.insert(NumericAxis::new(&y, AxisOrientation::Left));
        let area = chart.insert(plot.clone());
        let x_axis = chart.insert(NumericAxis::new(&x, AxisOrientation::Bottom));
        let table = chart
            .add_table(vec![vec![Some(y_axis), Some(area)], vec![None, Some(x_axis)]])
            .unwrap();
        chart
            .render_to(&mut scene, table, surface, Size::new(400.0, 300.0))
            .unwrap();

        let plot_bounds = chart.bounds(area).unwrap();
        let x_bounds = chart.bounds(x_axis).unwrap();
        let y_bounds = chart.bounds(y_axis).unwrap();
        assert_eq!(plot_bounds.x0, x_bounds.x0);
        assert_eq!(plot_bounds.width(), x_bounds.width());
        assert_eq!(plot_bounds.y0, y_bounds.y0);
        assert_eq!(plot_bounds.height(), y_bounds.height());
        assert_eq!(x.range(), (0.0, plot_bounds.width()));
        assert_eq!(y.range(), (plot_bounds.height(), 0.0));
    }

    #[test]
    fn bars_on_a_category_axis() {
        let (slots, values) = (CategoryScale::new(), LinearScale::new());
        let data = Dataset::new(vec![
            record! { "name" => "a", "v" => 1.0 },
            record! { "name" => "b", "v" => 3.0 },
        ]);
        let bars = BarPlot::vertical();
        bars.x("name", &slots).y("v", &values).add_dataset(&data);

        let mut scene = Scene::new();
        let surface = scene.insert(None, "svg");
        let mut chart = Chart::new(Environment::new());
        let area = chart.insert(bars.clone());
        let axis = chart.insert(CategoryAxis::new(&slots, AxisOrientation::Bottom));
        let table = chart
            .add_table(vec![vec![Some(area)], vec![Some(axis)]])
            .unwrap();
        chart
            .render_to(&mut scene, table, surface, Size::new(200.0, 200.0))
            .unwrap();

        assert_eq!(slots.domain(), vec!["a".to_owned(), "b".to_owned()]);
        assert_eq!(bars.entities(&scene).len(), 2);
    }

    #[test]
    fn gridlines_under_a_line_plot_share_its_scales() {
        let (x, y) = (LinearScale::new(), LinearScale::new());
        let data = Dataset::new(vec![
            record! { "x" => 0.0, "y" => -2.0 },
            record! { "x" => 5.0, "y" => 3.0 },
        ]);
        let line = LinePlot::new();
        line.x("x", &x).y("y", &y).add_dataset(&data);

        let mut scene = Scene::new();
        let surface = scene.insert(None, "svg");
        let mut chart = Chart::new(Environment::new());
        let grid = chart.insert(Gridlines::new().with_x(&x).with_y(&y));
        let plot = chart.insert(line.clone());
        let group = chart.add_group(&[grid, plot]).unwrap();
        chart
            .render_to(&mut scene, group, surface, Size::new(300.0, 200.0))
            .unwrap();

        assert_eq!(chart.bounds(grid).unwrap(), chart.bounds(plot).unwrap());
        let [lo, hi] = y.domain();
        assert!(lo <= -2.0 && hi >= 3.0);
        let content = chart.elements(grid).unwrap().content;
        let zero: Vec<_> = scene
            .descendants(content)
            .into_iter()
            .filter(|e| scene.has_class(*e, "zeroline"))
            .collect();
        assert_eq!(zero.len(), 2);
        let horizontal = zero
            .iter()
            .find(|e| scene.attr_number(**e, "x2") == Some(300.0))
            .unwrap();
        assert_eq!(scene.attr_number(*horizontal, "y1"), Some(y.scale_number(0.0)));
    }
}
