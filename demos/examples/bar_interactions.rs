// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A bar chart driven by scripted pointer input: hover, click, and pan/zoom on the value axis.
//!
//! Run:
//! - `RUST_LOG=info cargo run -p trellis_demos --example bar_interactions`

use std::error::Error;
use std::rc::Rc;

use kurbo::{Point, Size, Vec2};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trellis_data::{Dataset, record};
use trellis_draw::{AnimatorTiming, EasingAnimator};
use trellis_interaction::{
    ClickInteraction, HoverInteraction, InputEvent, PanZoomInteraction, PointerButton, ZoomLimits,
};
use trellis_layout::{Chart, Environment};
use trellis_plot::{AnimatorRole, AxisOrientation, BarPlot, CategoryAxis, NumericAxis};
use trellis_scale::{CategoryScale, LinearScale, QuantitativeScale};
use trellis_scene::Scene;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let data = Dataset::new(vec![
        record! { "month" => "Jan", "sales" => 12.0 },
        record! { "month" => "Feb", "sales" => 18.0 },
        record! { "month" => "Mar", "sales" => -4.0 },
        record! { "month" => "Apr", "sales" => 9.0 },
    ]);

    let (months, sales) = (CategoryScale::new(), LinearScale::new());
    let bars = BarPlot::vertical();
    bars.x("month", &months)
        .y("sales", &sales)
        .add_dataset(&data)
        .set_animated(true)
        .set_animator(
            AnimatorRole::Main,
            Rc::new(EasingAnimator::new(
                AnimatorTiming::default().with_step_duration(300.0),
            )?),
        );

    let mut scene = Scene::new();
    let surface = scene.insert(None, "svg");
    let mut chart = Chart::new(Environment::new());
    let y_axis = chart.insert(NumericAxis::new(&sales, AxisOrientation::Left));
    let area = chart.insert(bars.clone());
    let x_axis = chart.insert(CategoryAxis::new(&months, AxisOrientation::Bottom));
    let table = chart.add_table(vec![
        vec![Some(y_axis), Some(area)],
        vec![None, Some(x_axis)],
    ])?;

    let hover = HoverInteraction::new();
    hover.on_enter(|entity| tracing::info!(datum = %entity.datum, "hover enter"));
    hover.on_exit(|| tracing::info!("hover exit"));
    let click = ClickInteraction::new();
    click.on_click(|point| tracing::info!(x = point.x, y = point.y, "clicked"));
    let pan_zoom = PanZoomInteraction::new();
    pan_zoom.add_y_scale_with_limits(
        &sales,
        ZoomLimits {
            min_extent: Some(5.0),
            max_extent: Some(100.0),
        },
    );
    let domain = sales.clone();
    pan_zoom.on_zoom_end(move || tracing::info!(domain = ?domain.numeric_domain(), "zoomed"));
    chart.attach_interaction(area, hover)?;
    chart.attach_interaction(area, click)?;
    chart.attach_interaction(area, pan_zoom)?;

    chart.render_to(&mut scene, table, surface, Size::new(400.0, 300.0))?;
    scene.settle();
    let origin = chart.bounds(area).map_or(Point::ZERO, |b| b.origin());

    let at = |x: f64, y: f64| origin + Vec2::new(x, y);
    let button = PointerButton::Primary;
    let script = [
        InputEvent::PointerMove { position: at(40.0, 100.0), time: 0.0 },
        InputEvent::PointerDown { position: at(40.0, 100.0), button, time: 10.0 },
        InputEvent::PointerUp { position: at(41.0, 100.0), button, time: 60.0 },
        InputEvent::Wheel { position: at(40.0, 100.0), delta: -250.0 },
        InputEvent::PointerMove { position: at(-50.0, 100.0), time: 100.0 },
    ];
    for event in &script {
        chart.dispatch(&scene, event);
    }
    let stats = chart.flush(&mut scene);
    tracing::info!(?stats, domain = ?sales.numeric_domain(), "after input");
    println!("{}", scene.write_svg(surface));
    Ok(())
}
