// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The XY plot core shared by every mark type.

use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use kurbo::{Point, Rect, Size};
use trellis_data::{Accessor, Dataset, ListenerId, Value};
use trellis_draw::{
    Animator, AttrToProjector, DrawStep, Drawer, EasingAnimator, NullAnimator,
};
use trellis_layout::{
    Component, ComponentId, Entity, Environment, RenderCx, RenderError, SetupCx,
};
use trellis_scale::{ExtentKey, ProjectionScale, ScaleKind};
use trellis_scene::{ElementId, Scene};

use crate::PlotError;
use crate::projection::{Projection, Projections, generate_attr_to_projector, number};

/// Which of a plot's animators [`XyPlot::set_animator`] replaces.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AnimatorRole {
    /// Puts marks into their start state when the data changed.
    Reset,
    /// Moves marks to their final attributes.
    Main,
}

/// Everything a mark type sees while building attributes.
pub struct Frame<'a> {
    /// The plot's projections.
    pub projections: &'a Projections,
    /// Each projection composed with its scale.
    pub scaled: &'a AttrToProjector,
    /// The plot's allocated size.
    pub size: Size,
    /// The bound datasets, in draw order.
    pub datasets: &'a [Dataset],
}

impl fmt::Debug for Frame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let attrs: Vec<&str> = self.scaled.keys().map(|k| &**k).collect();
        f.debug_struct("Frame")
            .field("attrs", &attrs)
            .field("size", &self.size)
            .field("datasets", &self.datasets.len())
            .finish_non_exhaustive()
    }
}

impl Frame<'_> {
    /// The scale bound to `attr`.
    pub fn scale(&self, attr: &str) -> Option<&Rc<dyn ProjectionScale>> {
        self.projections.get(attr).and_then(Projection::scale)
    }
}

/// What a mark type contributes to an [`XyPlot`].
///
/// The plot owns projections, datasets, listeners, extents and drawers. A `Marks`
/// implementation turns the scaled projections into element attributes and may keep helper
/// elements of its own.
pub trait Marks: fmt::Debug + 'static {
    /// Element tag of one mark.
    fn tag(&self) -> &'static str;

    /// Class set on every mark.
    fn class(&self) -> &'static str;

    /// The final attributes of every mark.
    fn attrs(&self, frame: &Frame<'_>) -> AttrToProjector;

    /// Attributes marks start from when the data changed and the plot animates.
    fn reset_attrs(&self, frame: &Frame<'_>, attrs: &AttrToProjector) -> AttrToProjector;

    /// Whether one mark draws a whole dataset. Its projectors then see a [`Value::List`] of
    /// every record as their single datum.
    fn whole_dataset(&self) -> bool {
        false
    }

    /// Values folded into the extent of `attr` besides the data.
    fn extent_extras(&self, attr: &str) -> Vec<Value> {
        let _ = attr;
        Vec::new()
    }

    /// Values the scale of `attr` must not pad past.
    fn padding_exception(&self, attr: &str) -> Option<f64> {
        let _ = attr;
        None
    }

    /// The plot was anchored; `content` is where marks go.
    fn setup(&mut self, scene: &mut Scene, content: ElementId) {
        let _ = (scene, content);
    }

    /// Paint helper elements once the marks are drawn.
    fn paint_extras(&mut self, scene: &mut Scene, frame: &Frame<'_>) {
        let _ = (scene, frame);
    }

    /// The plot was removed.
    fn removed(&mut self) {}
}

struct Anchor {
    id: ComponentId,
    env: Environment,
    content: ElementId,
}

struct BoundDataset {
    dataset: Dataset,
    drawer: Drawer,
    listener: Option<ListenerId>,
}

pub(crate) struct XyCore<M> {
    pub(crate) marks: M,
    projections: Projections,
    datasets: Vec<BoundDataset>,
    retired: Vec<Drawer>,
    anchor: Option<Anchor>,
    scale_listeners: Vec<(Rc<dyn ProjectionScale>, ListenerId)>,
    animated: bool,
    reset_animator: Rc<dyn Animator>,
    main_animator: Rc<dyn Animator>,
    size: Size,
    data_changed: bool,
    /// Set by dataset listeners that fired while the plot was busy.
    stale: Rc<Cell<bool>>,
}

/// A plot positioning marks by `x` and `y`, generic over the mark type.
///
/// The handle is cheap to clone; clones share one plot. Insert a clone into a
/// [`Chart`](trellis_layout::Chart) and keep another to reconfigure it: every change queues a
/// render through the chart's environment once the plot is anchored.
///
/// While anchored the plot listens to its datasets and scales, and pushes the extent of
/// every scaled attribute to its scale under the key `(plot id, attribute)`. Removing the
/// plot releases both.
pub struct XyPlot<M> {
    pub(crate) core: Rc<RefCell<XyCore<M>>>,
}

impl<M> Clone for XyPlot<M> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
        }
    }
}

impl<M: Marks> XyPlot<M> {
    /// An empty plot drawing `marks`.
    pub fn with_marks(marks: M) -> Self {
        Self {
            core: Rc::new(RefCell::new(XyCore {
                marks,
                projections: Projections::new(),
                datasets: Vec::new(),
                retired: Vec::new(),
                anchor: None,
                scale_listeners: Vec::new(),
                animated: false,
                reset_animator: Rc::new(NullAnimator),
                main_animator: Rc::new(EasingAnimator::default()),
                size: Size::ZERO,
                data_changed: false,
                stale: Rc::new(Cell::new(false)),
            })),
        }
    }

    /// Bind `attr` to `accessor` through `scale`.
    pub fn project<S: ProjectionScale + Clone + 'static>(
        &self,
        attr: impl Into<Cow<'static, str>>,
        accessor: impl Into<Accessor>,
        scale: &S,
    ) -> &Self {
        let scale: Rc<dyn ProjectionScale> = Rc::new(scale.clone());
        self.set_projection(attr.into(), Projection::new(accessor, Some(scale)));
        self
    }

    /// Bind `attr` to `accessor` with no scale.
    pub fn attr(&self, attr: impl Into<Cow<'static, str>>, accessor: impl Into<Accessor>) -> &Self {
        self.set_projection(attr.into(), Projection::new(accessor, None));
        self
    }

    /// Bind the `x` position.
    pub fn x<S: ProjectionScale + Clone + 'static>(
        &self,
        accessor: impl Into<Accessor>,
        scale: &S,
    ) -> &Self {
        self.project("x", accessor, scale)
    }

    /// Bind the `y` position.
    pub fn y<S: ProjectionScale + Clone + 'static>(
        &self,
        accessor: impl Into<Accessor>,
        scale: &S,
    ) -> &Self {
        self.project("y", accessor, scale)
    }

    /// The projection bound to `attr`.
    pub fn projection(&self, attr: &str) -> Option<Projection> {
        self.core.borrow().projections.get(attr).cloned()
    }

    fn set_projection(&self, attr: Cow<'static, str>, projection: Projection) {
        let mut core = self.core.borrow_mut();
        let previous = core.projections.insert(attr.clone(), projection);
        let Some(id) = core.anchor.as_ref().map(|a| a.id) else {
            return;
        };
        if let Some(scale) = previous.as_ref().and_then(Projection::scale) {
            scale.remove_extent(&ExtentKey::new(id.get(), attr.clone()));
        }
        core.sync_scale_listeners();
        core.update_extent(&attr);
        core.request_render();
    }

    /// Bind `dataset`. Adding a dataset twice has no effect.
    pub fn add_dataset(&self, dataset: &Dataset) -> &Self {
        let mut core = self.core.borrow_mut();
        if core.datasets.iter().any(|b| b.dataset.ptr_eq(dataset)) {
            return self;
        }
        let mut drawer = Drawer::new(core.marks.tag()).with_class(core.marks.class());
        if core.marks.whole_dataset() {
            drawer = drawer.with_whole_dataset();
        }
        let listener = core
            .anchor
            .as_ref()
            .map(|a| self.listen_to(dataset, &core.stale, &a.env, a.id));
        core.datasets.push(BoundDataset {
            dataset: dataset.clone(),
            drawer,
            listener,
        });
        core.data_changed();
        self
    }

    /// Unbind `dataset`, returning whether it was bound.
    pub fn remove_dataset(&self, dataset: &Dataset) -> bool {
        let mut core = self.core.borrow_mut();
        let Some(index) = core.datasets.iter().position(|b| b.dataset.ptr_eq(dataset)) else {
            return false;
        };
        let bound = core.datasets.remove(index);
        if let Some(listener) = bound.listener {
            bound.dataset.off_update(listener);
        }
        core.retired.push(bound.drawer);
        core.data_changed();
        true
    }

    /// The bound datasets, in draw order.
    pub fn datasets(&self) -> Vec<Dataset> {
        self.core.borrow().datasets.iter().map(|b| b.dataset.clone()).collect()
    }

    /// Animate marks when the data changes. Off by default.
    pub fn set_animated(&self, animated: bool) -> &Self {
        self.core.borrow_mut().animated = animated;
        self
    }

    /// Whether data changes animate.
    pub fn is_animated(&self) -> bool {
        self.core.borrow().animated
    }

    /// Replace one of the animators used when the plot animates.
    pub fn set_animator(&self, role: AnimatorRole, animator: Rc<dyn Animator>) -> &Self {
        let mut core = self.core.borrow_mut();
        match role {
            AnimatorRole::Reset => core.reset_animator = animator,
            AnimatorRole::Main => core.main_animator = animator,
        }
        self
    }

    /// One entity per datum, positioned at its scaled `(x, y)`. Empty until anchored.
    pub fn entities(&self, scene: &Scene) -> Vec<Entity> {
        self.core.borrow().entities(scene)
    }

    /// The entity closest to `point` (local pixels) among those inside the plot.
    pub fn entity_nearest(&self, scene: &Scene, point: Point) -> Option<Entity> {
        let core = self.core.borrow();
        let bounds = Rect::from_origin_size(Point::ORIGIN, core.size);
        core.entities(scene)
            .into_iter()
            .filter(|e| e.position.is_finite() && contains_inclusive(bounds, e.position))
            .min_by(|a, b| {
                let da = (a.position - point).hypot2();
                let db = (b.position - point).hypot2();
                da.total_cmp(&db)
            })
    }

    fn listen_to(
        &self,
        dataset: &Dataset,
        stale: &Rc<Cell<bool>>,
        env: &Environment,
        id: ComponentId,
    ) -> ListenerId {
        let weak: Weak<RefCell<XyCore<M>>> = Rc::downgrade(&self.core);
        let (stale, env) = (stale.clone(), env.clone());
        dataset.on_update(move |_| {
            let Some(core) = weak.upgrade() else {
                return;
            };
            match core.try_borrow_mut() {
                Ok(mut core) => core.data_changed(),
                Err(_) => {
                    // The plot is painting or being read; the next paint picks the change up.
                    stale.set(true);
                    env.request_render(id);
                    tracing::debug!(component = id.get(), "deferred a dataset change");
                }
            }
        })
    }
}

fn contains_inclusive(rect: Rect, p: Point) -> bool {
    p.x >= rect.x0 && p.x <= rect.x1 && p.y >= rect.y0 && p.y <= rect.y1
}

impl<M: Marks> XyCore<M> {
    fn request_render(&self) {
        if let Some(anchor) = &self.anchor {
            anchor.env.request_render(anchor.id);
        }
    }

    /// Push the extent of `attr` again and queue a render.
    pub(crate) fn extent_changed(&self, attr: &Cow<'static, str>) {
        self.update_extent(attr);
        self.request_render();
    }

    fn data_changed(&mut self) {
        self.data_changed = true;
        if self.anchor.is_some() {
            self.update_all_extents();
            self.request_render();
        }
    }

    fn update_all_extents(&self) {
        for attr in self.projections.keys() {
            self.update_extent(attr);
        }
    }

    fn update_extent(&self, attr: &Cow<'static, str>) {
        let Some(anchor) = &self.anchor else {
            return;
        };
        let Some(projection) = self.projections.get(attr) else {
            return;
        };
        let Some(scale) = projection.scale() else {
            return;
        };
        let mut values: Vec<Value> = self
            .datasets
            .iter()
            .flat_map(|b| projection.values(&b.dataset))
            .collect();
        values.extend(self.marks.extent_extras(attr));
        let key = ExtentKey::new(anchor.id.get(), attr.clone());
        if let Some(exception) = self.marks.padding_exception(attr) {
            scale.set_padding_exception(key.clone(), Some(exception));
        }
        scale.update_extent(key, &values);
    }

    fn remove_extents(&self, id: ComponentId) {
        for (attr, projection) in &self.projections {
            if let Some(scale) = projection.scale() {
                scale.remove_extent(&ExtentKey::new(id.get(), attr.clone()));
            }
        }
    }

    /// Listen to exactly the scales the projections use.
    fn sync_scale_listeners(&mut self) {
        let Some(anchor) = &self.anchor else {
            return;
        };
        let mut wanted: Vec<Rc<dyn ProjectionScale>> = Vec::new();
        for scale in self.projections.values().filter_map(Projection::scale) {
            if !wanted.iter().any(|s| s.id() == scale.id()) {
                wanted.push(scale.clone());
            }
        }
        self.scale_listeners.retain(|(scale, listener)| {
            let keep = wanted.iter().any(|s| s.id() == scale.id());
            if !keep {
                scale.off_change(*listener);
            }
            keep
        });
        for scale in wanted {
            if self.scale_listeners.iter().any(|(s, _)| s.id() == scale.id()) {
                continue;
            }
            let env = anchor.env.clone();
            let id = anchor.id;
            let listener = scale.on_change(Box::new(move || env.request_render(id)));
            self.scale_listeners.push((scale, listener));
        }
    }

    fn check_required(&self) -> Result<(), PlotError> {
        for required in ["x", "y"] {
            if !self.projections.contains_key(required) {
                return Err(PlotError::MissingProjection(required.into()));
            }
        }
        Ok(())
    }

    fn paint(&mut self, scene: &mut Scene) -> Result<(), PlotError> {
        self.check_required()?;
        if self.stale.replace(false) {
            self.data_changed = true;
            self.update_all_extents();
        }
        let Some(content) = self.anchor.as_ref().map(|a| a.content) else {
            return Ok(());
        };
        for mut drawer in self.retired.drain(..) {
            drawer.detach(scene);
        }

        let scaled = generate_attr_to_projector(&self.projections);
        let datasets: Vec<Dataset> = self.datasets.iter().map(|b| b.dataset.clone()).collect();
        let frame = Frame {
            projections: &self.projections,
            scaled: &scaled,
            size: self.size,
            datasets: &datasets,
        };
        let attrs = self.marks.attrs(&frame);
        let steps = if self.animated && self.data_changed {
            let reset = self.marks.reset_attrs(&frame, &attrs);
            vec![
                DrawStep::new(reset, self.reset_animator.clone()),
                DrawStep::new(attrs, self.main_animator.clone()),
            ]
        } else {
            vec![DrawStep::new(attrs, Rc::new(NullAnimator))]
        };
        for bound in &mut self.datasets {
            if bound.drawer.root(scene).is_none() {
                bound.drawer.attach(scene, content);
            }
            bound.drawer.draw(scene, &bound.dataset, &steps)?;
        }
        self.marks.paint_extras(scene, &frame);
        self.data_changed = false;
        Ok(())
    }

    fn entities(&self, scene: &Scene) -> Vec<Entity> {
        let Some(anchor) = &self.anchor else {
            return Vec::new();
        };
        let (Some(x), Some(y)) = (self.projections.get("x"), self.projections.get("y")) else {
            return Vec::new();
        };
        let (x, y) = (x.projector(), y.projector());
        let mut out = Vec::new();
        for bound in &self.datasets {
            let ds = &bound.dataset;
            for (index, datum) in ds.data().iter().enumerate() {
                out.push(Entity {
                    component: anchor.id,
                    dataset: ds.clone(),
                    index,
                    datum: datum.clone(),
                    position: Point::new(
                        number(&x, datum, index, ds),
                        number(&y, datum, index, ds),
                    ),
                    element: bound.drawer.selection_for_index(scene, index),
                });
            }
        }
        out
    }
}

impl<M: Marks> Component for XyPlot<M> {
    fn requested_space(&self, _offered: Size) -> Size {
        Size::ZERO
    }

    fn validate(&self) -> Result<(), RenderError> {
        self.core.borrow().check_required()?;
        Ok(())
    }

    fn setup(&mut self, cx: &mut SetupCx<'_>) {
        let listeners: Vec<ListenerId> = {
            let core = self.core.borrow();
            core.datasets
                .iter()
                .map(|b| self.listen_to(&b.dataset, &core.stale, cx.env, cx.id))
                .collect()
        };
        let mut core = self.core.borrow_mut();
        core.anchor = Some(Anchor {
            id: cx.id,
            env: cx.env.clone(),
            content: cx.elements.content,
        });
        for (bound, listener) in core.datasets.iter_mut().zip(listeners) {
            bound.listener = Some(listener);
            bound.drawer.attach(cx.scene, cx.elements.content);
        }
        core.marks.setup(cx.scene, cx.elements.content);
        core.sync_scale_listeners();
        core.data_changed();
    }

    fn layout_changed(&mut self, size: Size) {
        let mut core = self.core.borrow_mut();
        core.size = size;
        if let Some(x) = core.projections.get("x").and_then(Projection::scale)
            && let Err(err) = x.set_pixel_range(0.0, size.width)
        {
            tracing::warn!(%err, "could not set x range");
        }
        if let Some(y) = core.projections.get("y").and_then(Projection::scale) {
            let range = if y.kind() == ScaleKind::Categorical {
                (0.0, size.height)
            } else {
                (size.height, 0.0)
            };
            if let Err(err) = y.set_pixel_range(range.0, range.1) {
                tracing::warn!(%err, "could not set y range");
            }
        }
    }

    fn render(&mut self, cx: &mut RenderCx<'_>) -> Result<(), RenderError> {
        let mut core = self.core.borrow_mut();
        core.size = cx.size;
        core.paint(cx.scene)?;
        Ok(())
    }

    fn removed(&mut self, scene: &mut Scene) {
        let mut core = self.core.borrow_mut();
        let Some(anchor) = core.anchor.take() else {
            return;
        };
        for bound in &mut core.datasets {
            if let Some(listener) = bound.listener.take() {
                bound.dataset.off_update(listener);
            }
            bound.drawer.detach(scene);
        }
        for mut drawer in core.retired.drain(..) {
            drawer.detach(scene);
        }
        for (scale, listener) in core.scale_listeners.drain(..) {
            scale.off_change(listener);
        }
        core.remove_extents(anchor.id);
        core.marks.removed();
    }

    fn nearest_entity(&self, scene: &Scene, point: Point) -> Option<Entity> {
        self.entity_nearest(scene, point)
    }
}

impl<M: Marks> fmt::Debug for XyPlot<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.core.borrow();
        f.debug_struct("XyPlot")
            .field("marks", &core.marks)
            .field("projections", &core.projections.keys().collect::<Vec<_>>())
            .field("datasets", &core.datasets.len())
            .field("anchored", &core.anchor.as_ref().map(|a| a.id))
            .field("animated", &core.animated)
            .finish_non_exhaustive()
    }
}
