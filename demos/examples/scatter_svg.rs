// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A titled scatter plot with axes and a legend, rendered to SVG.
//!
//! Run:
//! - `cargo run -p trellis_demos --example scatter_svg > scatter.svg`
//! - `RUST_LOG=trellis_layout=debug` shows the layout passes on stderr.

use kurbo::Size;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trellis_data::{Dataset, Value, record};
use trellis_layout::{Chart, Environment};
use trellis_plot::{AxisOrientation, Label, Legend, NumericAxis, ScatterPlot};
use trellis_scale::{ColorScale, LinearScale};
use trellis_scene::Scene;

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let data = Dataset::new(
        [
            (1.0, 2.0, "apples"),
            (2.0, 3.5, "apples"),
            (3.0, 2.5, "pears"),
            (4.5, 6.0, "pears"),
            (6.0, 5.0, "plums"),
            (7.5, 8.5, "plums"),
        ]
        .into_iter()
        .map(|(x, y, kind)| record! { "x" => x, "y" => y, "kind" => kind })
        .collect::<Vec<Value>>(),
    );

    let (x, y, colors) = (LinearScale::new(), LinearScale::new(), ColorScale::new());
    let plot = ScatterPlot::new();
    plot.x("x", &x)
        .y("y", &y)
        .project("fill", "kind", &colors)
        .attr("size", 10.0)
        .add_dataset(&data);

    let mut scene = Scene::new();
    let surface = scene.insert(None, "svg");
    let mut chart = Chart::new(Environment::new());
    let title = chart.insert(Label::title("Fruit"));
    let y_axis = chart.insert(NumericAxis::new(&y, AxisOrientation::Left));
    let area = chart.insert(plot);
    let legend = chart.insert(Legend::new(&colors));
    let x_axis = chart.insert(NumericAxis::new(&x, AxisOrientation::Bottom));
    let table = chart.add_table(vec![
        vec![None, Some(title), None],
        vec![Some(y_axis), Some(area), Some(legend)],
        vec![None, Some(x_axis), None],
    ]);
    let rendered = table.and_then(|table| {
        chart.render_to(&mut scene, table, surface, Size::new(480.0, 320.0))
    });
    match rendered {
        Ok(stats) => {
            tracing::info!(?stats, "rendered");
            println!("{}", scene.write_svg(surface));
        }
        Err(error) => tracing::error!(%error, "could not render the chart"),
    }
}
