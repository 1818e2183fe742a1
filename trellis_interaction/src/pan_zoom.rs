// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Panning and wheel zoom over continuous scales.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use kurbo::{Point, Vec2};
use trellis_data::{CallbackSet, ListenerId};
use trellis_layout::{InputEvent, Interaction, Outcome, Target};
use trellis_scale::{QuantitativeScale, ScaleError};

use crate::drag::{DragStep, DragTracker};

/// Wheel pixels per doubling of the visible domain.
const WHEEL_ZOOM_RATE: f64 = 0.002;

/// Bounds on how far a scale may be zoomed, as domain widths.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ZoomLimits {
    /// Narrowest domain zooming in may reach.
    pub min_extent: Option<f64>,
    /// Widest domain zooming out may reach.
    pub max_extent: Option<f64>,
}

/// The scale operations pan and zoom need, without the domain type.
trait Transformable: fmt::Debug {
    fn domain_bounds(&self) -> (f64, f64);
    fn pan_pixels(&self, translate: f64) -> Result<(), ScaleError>;
    fn zoom_pixels(&self, factor: f64, center: f64) -> Result<(), ScaleError>;
}

impl<S: QuantitativeScale + fmt::Debug> Transformable for S {
    fn domain_bounds(&self) -> (f64, f64) {
        self.numeric_domain()
    }

    fn pan_pixels(&self, translate: f64) -> Result<(), ScaleError> {
        self.pan(translate)
    }

    fn zoom_pixels(&self, factor: f64, center: f64) -> Result<(), ScaleError> {
        self.zoom(factor, center)
    }
}

#[derive(Debug)]
struct Governed {
    scale: Box<dyn Transformable>,
    limits: ZoomLimits,
}

impl Governed {
    /// Narrow `factor` so the domain stays within the limits.
    fn constrain(&self, factor: f64) -> f64 {
        let (d0, d1) = self.scale.domain_bounds();
        let extent = (d1 - d0).abs();
        if extent == 0.0 || !extent.is_finite() {
            return factor;
        }
        if factor > 1.0 {
            self.limits
                .max_extent
                .map_or(factor, |max| factor.min(max / extent))
        } else {
            self.limits
                .min_extent
                .map_or(factor, |min| factor.max(min / extent))
        }
    }
}

#[derive(Debug, Default)]
struct Scales {
    x: Vec<Governed>,
    y: Vec<Governed>,
}

struct Shared {
    scales: RefCell<Scales>,
    tracker: Cell<DragTracker>,
    pan_end: CallbackSet<()>,
    zoom_end: CallbackSet<()>,
}

/// Drags pan and the wheel zooms the domains of x and y scales.
///
/// Dragging by `d` pixels moves the visible domain so the data follows the pointer; the
/// domain width is unchanged. A wheel `delta` scales the domain by `2^(delta * 0.002)` around
/// the pointer, so scrolling down zooms out. [`ZoomLimits`] clamp how far either way.
///
/// Cheap to clone; clones share scales, callbacks and gesture state.
///
/// ```
/// use kurbo::Vec2;
/// use trellis_interaction::PanZoomInteraction;
/// use trellis_scale::{LinearScale, QuantitativeScale, Scale};
///
/// let x = LinearScale::new();
/// x.set_domain([0.0, 10.0]).unwrap();
/// x.set_range(0.0, 100.0).unwrap();
///
/// let pan_zoom = PanZoomInteraction::new();
/// pan_zoom.add_x_scale(&x);
/// pan_zoom.pan(Vec2::new(20.0, 0.0));
/// assert_eq!(x.numeric_domain(), (2.0, 12.0));
/// ```
#[derive(Clone)]
pub struct PanZoomInteraction {
    shared: Rc<Shared>,
}

impl PanZoomInteraction {
    /// An interaction with no scales.
    pub fn new() -> Self {
        Self {
            shared: Rc::new(Shared {
                scales: RefCell::default(),
                tracker: Cell::new(DragTracker::default()),
                pan_end: CallbackSet::new(),
                zoom_end: CallbackSet::new(),
            }),
        }
    }

    /// Pan and zoom `scale` horizontally.
    pub fn add_x_scale<S: QuantitativeScale + fmt::Debug + 'static>(&self, scale: &S) -> &Self {
        self.add_x_scale_with_limits(scale, ZoomLimits::default())
    }

    /// Pan and zoom `scale` horizontally, within `limits`.
    pub fn add_x_scale_with_limits<S: QuantitativeScale + fmt::Debug + 'static>(
        &self,
        scale: &S,
        limits: ZoomLimits,
    ) -> &Self {
        self.shared.scales.borrow_mut().x.push(Governed {
            scale: Box::new(scale.clone()),
            limits,
        });
        self
    }

    /// Pan and zoom `scale` vertically.
    pub fn add_y_scale<S: QuantitativeScale + fmt::Debug + 'static>(&self, scale: &S) -> &Self {
        self.add_y_scale_with_limits(scale, ZoomLimits::default())
    }

    /// Pan and zoom `scale` vertically, within `limits`.
    pub fn add_y_scale_with_limits<S: QuantitativeScale + fmt::Debug + 'static>(
        &self,
        scale: &S,
        limits: ZoomLimits,
    ) -> &Self {
        self.shared.scales.borrow_mut().y.push(Governed {
            scale: Box::new(scale.clone()),
            limits,
        });
        self
    }

    /// Call `callback` when a pan gesture ends.
    pub fn on_pan_end(&self, callback: impl Fn() + 'static) -> ListenerId {
        self.shared.pan_end.add(move |_: &()| callback())
    }

    /// Remove a pan-end listener.
    pub fn off_pan_end(&self, id: ListenerId) -> bool {
        self.shared.pan_end.remove(id)
    }

    /// Call `callback` after every wheel zoom.
    pub fn on_zoom_end(&self, callback: impl Fn() + 'static) -> ListenerId {
        self.shared.zoom_end.add(move |_: &()| callback())
    }

    /// Remove a zoom-end listener.
    pub fn off_zoom_end(&self, id: ListenerId) -> bool {
        self.shared.zoom_end.remove(id)
    }

    /// Translate every scale by `translate` pixels.
    pub fn pan(&self, translate: Vec2) {
        let scales = self.shared.scales.borrow();
        for governed in &scales.x {
            report(governed.scale.pan_pixels(translate.x));
        }
        for governed in &scales.y {
            report(governed.scale.pan_pixels(translate.y));
        }
    }

    /// Magnify every scale by `factor` around the pixel `center`, within each scale's limits.
    ///
    /// Factors above 1 zoom out. One factor applies to every scale, narrowed by the tightest
    /// limit, so x and y keep their aspect.
    pub fn zoom(&self, factor: f64, center: Point) {
        let scales = self.shared.scales.borrow();
        let factor = scales
            .x
            .iter()
            .chain(&scales.y)
            .fold(factor, |factor, governed| governed.constrain(factor));
        for governed in &scales.x {
            report(governed.scale.zoom_pixels(factor, center.x));
        }
        for governed in &scales.y {
            report(governed.scale.zoom_pixels(factor, center.y));
        }
    }
}

fn report(result: Result<(), ScaleError>) {
    if let Err(error) = result {
        tracing::warn!(%error, "pan/zoom left a scale unchanged");
    }
}

impl Default for PanZoomInteraction {
    fn default() -> Self {
        Self::new()
    }
}

impl Interaction for PanZoomInteraction {
    fn handle(&mut self, event: &InputEvent, target: &Target<'_>) -> Outcome {
        if let &InputEvent::Wheel { position, delta } = event {
            if target.contains(position) {
                self.zoom((delta * WHEEL_ZOOM_RATE).exp2(), target.to_local(position));
                self.shared.zoom_end.call(&());
            }
            return Outcome::Continue;
        }

        let mut tracker = self.shared.tracker.get();
        let step = tracker.track(event, target);
        self.shared.tracker.set(tracker);
        match step {
            Some(DragStep::Moved {
                previous, current, ..
            }) => self.pan(previous - current),
            Some(DragStep::Ended { .. } | DragStep::Cancelled) => self.shared.pan_end.call(&()),
            Some(DragStep::Started(_)) | None => {}
        }
        Outcome::Continue
    }

    fn reset(&mut self) {
        let mut tracker = self.shared.tracker.get();
        tracker.abandon();
        self.shared.tracker.set(tracker);
    }
}

impl fmt::Debug for PanZoomInteraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PanZoomInteraction")
            .field("scales", &self.shared.scales.borrow())
            .field("phase", &self.shared.tracker.get().phase)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Rect;
    use trellis_layout::{Environment, PointerButton};
    use trellis_scale::{LinearScale, Scale};
    use trellis_scene::Scene;

    fn linear(domain: [f64; 2], range: (f64, f64)) -> LinearScale {
        let scale = LinearScale::new();
        scale.set_domain(domain).unwrap();
        scale.set_range(range.0, range.1).unwrap();
        scale
    }

    fn close(a: (f64, f64), b: (f64, f64)) -> bool {
        (a.0 - b.0).abs() < 1e-9 && (a.1 - b.1).abs() < 1e-9
    }

    #[test]
    fn dragging_translates_the_domain_by_the_data_delta() {
        let x = linear([0.0, 10.0], (0.0, 100.0));
        let y = linear([0.0, 10.0], (100.0, 0.0));
        let mut pan_zoom = PanZoomInteraction::new();
        pan_zoom.add_x_scale(&x).add_y_scale(&y);
        let ends = Rc::new(Cell::new(0));
        let counter = ends.clone();
        pan_zoom.on_pan_end(move || counter.set(counter.get() + 1));

        let scene = Scene::new();
        let target = Target::new(
            Environment::new().allocate_id(),
            Rect::new(0.0, 0.0, 100.0, 100.0),
            &scene,
        );
        let at = |x, y| Point::new(x, y);
        let button = PointerButton::Primary;
        pan_zoom.handle(
            &InputEvent::PointerDown {
                position: at(50.0, 50.0),
                button,
                time: 0.0,
            },
            &target,
        );
        pan_zoom.handle(&InputEvent::PointerMove { position: at(40.0, 50.0), time: 1.0 }, &target);
        // Moving outside the component keeps panning.
        pan_zoom.handle(&InputEvent::PointerMove { position: at(-30.0, 70.0), time: 2.0 }, &target);
        pan_zoom.handle(
            &InputEvent::PointerUp {
                position: at(-30.0, 70.0),
                button,
                time: 3.0,
            },
            &target,
        );

        // 80 pixels left is +8 in x; 20 pixels down is +2 in y.
        assert!(close(x.numeric_domain(), (8.0, 18.0)), "{:?}", x.numeric_domain());
        assert!(close(y.numeric_domain(), (2.0, 12.0)), "{:?}", y.numeric_domain());
        assert_eq!(ends.get(), 1);
    }

    #[test]
    fn wheel_zooms_around_the_pointer() {
        let x = linear([0.0, 100.0], (0.0, 100.0));
        let mut pan_zoom = PanZoomInteraction::new();
        pan_zoom.add_x_scale(&x);

        let scene = Scene::new();
        let target = Target::new(
            Environment::new().allocate_id(),
            Rect::new(100.0, 0.0, 200.0, 100.0),
            &scene,
        );
        // 2^(-500 * 0.002) = 0.5: zoom in by half around local x = 20.
        let wheel = InputEvent::Wheel {
            position: Point::new(120.0, 50.0),
            delta: -500.0,
        };
        pan_zoom.handle(&wheel, &target);
        assert!(close(x.numeric_domain(), (10.0, 60.0)), "{:?}", x.numeric_domain());

        // Outside the component nothing happens.
        let outside = InputEvent::Wheel {
            position: Point::new(20.0, 50.0),
            delta: -500.0,
        };
        pan_zoom.handle(&outside, &target);
        assert!(close(x.numeric_domain(), (10.0, 60.0)));
    }

    #[test]
    fn limits_narrow_the_zoom() {
        let x = linear([0.0, 100.0], (0.0, 100.0));
        let pan_zoom = PanZoomInteraction::new();
        pan_zoom.add_x_scale_with_limits(
            &x,
            ZoomLimits {
                min_extent: Some(50.0),
                max_extent: Some(150.0),
            },
        );

        pan_zoom.zoom(0.25, Point::new(0.0, 0.0));
        assert!(close(x.numeric_domain(), (0.0, 50.0)), "{:?}", x.numeric_domain());
        pan_zoom.zoom(10.0, Point::new(0.0, 0.0));
        assert!(close(x.numeric_domain(), (0.0, 150.0)), "{:?}", x.numeric_domain());
    }
}
