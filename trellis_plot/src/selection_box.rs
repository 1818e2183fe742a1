// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use kurbo::{Rect, Size};
use trellis_layout::{Component, ComponentId, Environment, RenderCx, RenderError, SetupCx};
use trellis_scene::{ElementFlags, ElementId, Scene};

use crate::PlotError;

const DEFAULT_EDGE_WIDTH: f64 = 1.0;

/// Edge names, in the order edges are created.
const EDGES: [&str; 4] = ["top", "bottom", "left", "right"];

struct Elements {
    group: ElementId,
    area: ElementId,
    edges: [ElementId; 4],
}

struct BoxCore {
    bounds: Option<Rect>,
    edge_width: f64,
    anchor: Option<(Environment, ComponentId)>,
    elements: Option<Elements>,
}

impl BoxCore {
    fn request_render(&self) {
        if let Some((env, id)) = &self.anchor {
            env.request_render(*id);
        }
    }

    fn paint(&self, scene: &mut Scene) {
        let Some(elements) = &self.elements else {
            return;
        };
        let mut flags = scene.flags(elements.group).unwrap_or(ElementFlags::VISIBLE);
        flags.set(ElementFlags::VISIBLE, self.bounds.is_some());
        scene.set_flags(elements.group, flags);
        let Some(r) = self.bounds else {
            return;
        };
        scene.set_attr(elements.area, "x", r.x0);
        scene.set_attr(elements.area, "y", r.y0);
        scene.set_attr(elements.area, "width", r.width());
        scene.set_attr(elements.area, "height", r.height());
        let lines = [
            (r.x0, r.y0, r.x1, r.y0),
            (r.x0, r.y1, r.x1, r.y1),
            (r.x0, r.y0, r.x0, r.y1),
            (r.x1, r.y0, r.x1, r.y1),
        ];
        for (edge, (x1, y1, x2, y2)) in elements.edges.into_iter().zip(lines) {
            scene.set_attr(edge, "x1", x1);
            scene.set_attr(edge, "y1", y1);
            scene.set_attr(edge, "x2", x2);
            scene.set_attr(edge, "y2", y2);
            scene.set_attr(edge, "stroke-width", self.edge_width);
        }
    }
}

/// A translucent box over a component, marking a selected region in its local pixels.
///
/// The handle is cheap to clone; clones share one box. Keep a clone next to a drag
/// interaction and feed it the dragged rectangle. The box draws a `selection-area` rect and
/// one `selection-edge` line per side, and is hidden while dismissed.
///
/// ```
/// use kurbo::{Rect, Size};
/// use trellis_layout::{Chart, Environment};
/// use trellis_plot::SelectionBoxLayer;
/// use trellis_scene::Scene;
///
/// let layer = SelectionBoxLayer::new();
/// let mut scene = Scene::new();
/// let surface = scene.insert(None, "svg");
/// let mut chart = Chart::new(Environment::new());
/// let id = chart.insert(layer.clone());
/// chart.render_to(&mut scene, id, surface, Size::new(100.0, 100.0)).unwrap();
///
/// layer.set_bounds(Rect::new(40.0, 30.0, 10.0, 20.0));
/// assert_eq!(layer.bounds(), Some(Rect::new(10.0, 20.0, 40.0, 30.0)));
/// chart.flush(&mut scene);
/// ```
#[derive(Clone)]
pub struct SelectionBoxLayer {
    core: Rc<RefCell<BoxCore>>,
}

impl SelectionBoxLayer {
    /// A dismissed box.
    pub fn new() -> Self {
        Self {
            core: Rc::new(RefCell::new(BoxCore {
                bounds: None,
                edge_width: DEFAULT_EDGE_WIDTH,
                anchor: None,
                elements: None,
            })),
        }
    }

    /// Show the box over `bounds`. Corners may come in any order.
    pub fn set_bounds(&self, bounds: Rect) -> &Self {
        let mut core = self.core.borrow_mut();
        core.bounds = Some(bounds.abs());
        core.request_render();
        self
    }

    /// The selected region, `None` while dismissed.
    pub fn bounds(&self) -> Option<Rect> {
        self.core.borrow().bounds
    }

    /// Hide the box and forget its bounds.
    pub fn dismiss(&self) -> &Self {
        let mut core = self.core.borrow_mut();
        if core.bounds.take().is_some() {
            core.request_render();
        }
        self
    }

    /// Whether the box is showing.
    pub fn is_visible(&self) -> bool {
        self.core.borrow().bounds.is_some()
    }

    /// Stroke width of the edges.
    pub fn edge_width(&self) -> f64 {
        self.core.borrow().edge_width
    }

    /// Set the stroke width of the edges.
    pub fn set_edge_width(&self, width: f64) -> Result<&Self, PlotError> {
        let mut core = self.core.borrow_mut();
        core.edge_width = PlotError::check_non_negative("edge width", width)?;
        core.request_render();
        Ok(self)
    }
}

impl Default for SelectionBoxLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SelectionBoxLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.core.borrow();
        f.debug_struct("SelectionBoxLayer")
            .field("bounds", &core.bounds)
            .field("edge_width", &core.edge_width)
            .finish_non_exhaustive()
    }
}

impl Component for SelectionBoxLayer {
    fn requested_space(&self, _offered: Size) -> Size {
        Size::ZERO
    }

    fn setup(&mut self, cx: &mut SetupCx<'_>) {
        let group = cx.scene.insert(Some(cx.elements.content), "g");
        cx.scene.set_class(group, "selection-box", true);
        let area = cx.scene.insert(Some(group), "rect");
        cx.scene.set_class(area, "selection-area", true);
        let edges = EDGES.map(|side| {
            let edge = cx.scene.insert(Some(group), "line");
            cx.scene.set_class(edge, "selection-edge", true);
            cx.scene.set_class(edge, side, true);
            edge
        });
        let mut core = self.core.borrow_mut();
        core.elements = Some(Elements { group, area, edges });
        core.anchor = Some((cx.env.clone(), cx.id));
    }

    fn render(&mut self, cx: &mut RenderCx<'_>) -> Result<(), RenderError> {
        self.core.borrow().paint(cx.scene);
        Ok(())
    }

    fn removed(&mut self, _scene: &mut Scene) {
        let mut core = self.core.borrow_mut();
        core.anchor = None;
        core.elements = None;
    }
}
