// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Two lines over gridlines, with axes, rendered to SVG.
//!
//! Run:
//! - `cargo run -p trellis_demos --example line_svg > line.svg`

use kurbo::Size;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trellis_data::{Dataset, Value, record};
use trellis_layout::{Chart, Environment};
use trellis_plot::{AxisOrientation, Gridlines, LinePlot, NumericAxis};
use trellis_scale::LinearScale;
use trellis_scene::Scene;

fn series(points: &[(f64, f64)], stroke: &str) -> Dataset {
    Dataset::new(
        points
            .iter()
            .map(|(x, y)| record! { "x" => *x, "y" => *y, "stroke" => stroke })
            .collect::<Vec<Value>>(),
    )
}

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let rising = series(&[(0.0, -1.0), (1.0, 0.5), (2.0, 2.0), (3.0, 2.5)], "#5279c7");
    let falling = series(&[(0.0, 3.0), (1.0, 1.5), (2.0, f64::NAN), (3.0, -2.0)], "#fd373e");

    let (x, y) = (LinearScale::new(), LinearScale::new());
    let lines = LinePlot::new();
    lines
        .x("x", &x)
        .y("y", &y)
        .attr("stroke", "stroke")
        .add_dataset(&rising)
        .add_dataset(&falling);

    let mut scene = Scene::new();
    let surface = scene.insert(None, "svg");
    let mut chart = Chart::new(Environment::new());
    let y_axis = chart.insert(NumericAxis::new(&y, AxisOrientation::Left));
    let grid = chart.insert(Gridlines::new().with_x(&x).with_y(&y));
    let plot = chart.insert(lines);
    let x_axis = chart.insert(NumericAxis::new(&x, AxisOrientation::Bottom));
    let rendered = chart.add_group(&[grid, plot]).and_then(|area| {
        chart.add_table(vec![
            vec![Some(y_axis), Some(area)],
            vec![None, Some(x_axis)],
        ])
    });
    let rendered = rendered.and_then(|table| {
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
