// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Input events, the interaction seam, and dispatch over the rendered trees.

use core::fmt;

use hashbrown::HashMap;
use kurbo::{Point, Rect, Size};
use trellis_scene::Scene;

use crate::chart::{NodeKind, world_bounds};
use crate::component::{Component, Entity, Lifecycle};
use crate::{Chart, ComponentId, LayoutError};

/// Pointer buttons.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PointerButton {
    /// Usually the left mouse button, or a touch/pen contact.
    Primary,
    /// Usually the right mouse button.
    Secondary,
    /// Usually the middle mouse button.
    Auxiliary,
}

/// Raw input, in surface coordinates. Times are milliseconds on the host's clock.
#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    /// A button went down.
    PointerDown {
        /// Pointer position.
        position: Point,
        /// Which button.
        button: PointerButton,
        /// Event time.
        time: f64,
    },
    /// The pointer moved.
    PointerMove {
        /// Pointer position.
        position: Point,
        /// Event time.
        time: f64,
    },
    /// A button went up.
    PointerUp {
        /// Pointer position.
        position: Point,
        /// Which button.
        button: PointerButton,
        /// Event time.
        time: f64,
    },
    /// The host took the pointer away (lost capture, touch cancel).
    PointerCancel,
    /// Wheel or trackpad scroll. Positive `delta` scrolls down.
    Wheel {
        /// Pointer position.
        position: Point,
        /// Vertical scroll amount in pixels.
        delta: f64,
    },
    /// A key went down.
    KeyDown {
        /// Host key code.
        code: u32,
    },
    /// A key went up.
    KeyUp {
        /// Host key code.
        code: u32,
    },
}

impl InputEvent {
    /// The pointer position, for events that carry one.
    pub fn position(&self) -> Option<Point> {
        match self {
            Self::PointerDown { position, .. }
            | Self::PointerMove { position, .. }
            | Self::PointerUp { position, .. }
            | Self::Wheel { position, .. } => Some(*position),
            Self::PointerCancel | Self::KeyDown { .. } | Self::KeyUp { .. } => None,
        }
    }
}

/// Whether dispatch continues to the components below.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Outcome {
    /// Keep delivering.
    #[default]
    Continue,
    /// Stop here.
    Stop,
}

/// The component an interaction is bound to, as seen during one dispatch.
pub struct Target<'a> {
    /// The bound component.
    pub component: ComponentId,
    /// Its bounds in surface coordinates.
    pub bounds: Rect,
    /// The scene it is drawn in.
    pub scene: &'a Scene,
    leaf: Option<&'a dyn Component>,
}

impl fmt::Debug for Target<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("component", &self.component)
            .field("bounds", &self.bounds)
            .finish_non_exhaustive()
    }
}

impl<'a> Target<'a> {
    /// A target for driving interactions outside a chart, e.g. in tests.
    pub fn new(component: ComponentId, bounds: Rect, scene: &'a Scene) -> Self {
        Self {
            component,
            bounds,
            scene,
            leaf: None,
        }
    }

    /// Attach the component whose entities [`Target::nearest_entity`] reports.
    pub fn with_component(mut self, component: &'a dyn Component) -> Self {
        self.leaf = Some(component);
        self
    }

    /// Convert a surface point to the component's local space.
    pub fn to_local(&self, point: Point) -> Point {
        point - self.bounds.origin().to_vec2()
    }

    /// Whether a surface point falls inside the component.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.bounds.x0
            && point.x <= self.bounds.x1
            && point.y >= self.bounds.y0
            && point.y <= self.bounds.y1
    }

    /// Clamp a local point into the component.
    pub fn clamp_local(&self, point: Point) -> Point {
        Point::new(
            point.x.clamp(0.0, self.bounds.width().max(0.0)),
            point.y.clamp(0.0, self.bounds.height().max(0.0)),
        )
    }

    /// The component's entity nearest a surface point.
    pub fn nearest_entity(&self, point: Point) -> Option<Entity> {
        self.leaf?.nearest_entity(self.scene, self.to_local(point))
    }

    /// Size of the component.
    pub fn size(&self) -> Size {
        self.bounds.size()
    }
}

/// A gesture recognizer bound to one component's hit-box.
pub trait Interaction: fmt::Debug {
    /// Handle one event. Every event reaches every live binding, so recognizers decide for
    /// themselves whether it concerns them (usually with [`Target::contains`]).
    fn handle(&mut self, event: &InputEvent, target: &Target<'_>) -> Outcome;

    /// The binding moved or ended; drop any gesture in progress.
    fn reset(&mut self) {}
}

/// Identifier for an attached interaction.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct InteractionId(u64);

pub(crate) struct Binding {
    pub(crate) id: InteractionId,
    pub(crate) component: ComponentId,
    interaction: Box<dyn Interaction>,
    warned: bool,
}

impl Chart {
    /// Bind `interaction` to `component`. Its hit-box is created on the next flush.
    pub fn attach_interaction(
        &mut self,
        component: ComponentId,
        interaction: impl Interaction + 'static,
    ) -> Result<InteractionId, LayoutError> {
        if !self.nodes.contains_key(&component) {
            return Err(LayoutError::UnknownComponent(component));
        }
        let id = InteractionId(self.next_interaction);
        self.next_interaction += 1;
        self.bindings.push(Binding {
            id,
            component,
            interaction: Box::new(interaction),
            warned: false,
        });
        self.env.request_layout(component);
        Ok(id)
    }

    /// Move an interaction to another component, dropping any gesture in progress.
    pub fn rebind_interaction(
        &mut self,
        id: InteractionId,
        component: ComponentId,
    ) -> Result<(), LayoutError> {
        if !self.nodes.contains_key(&component) {
            return Err(LayoutError::UnknownComponent(component));
        }
        let binding = self
            .bindings
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(LayoutError::UnknownInteraction(id))?;
        binding.interaction.reset();
        binding.component = component;
        binding.warned = false;
        self.env.request_layout(component);
        Ok(())
    }

    /// Unbind an interaction and hand it back.
    pub fn detach_interaction(
        &mut self,
        id: InteractionId,
    ) -> Result<Box<dyn Interaction>, LayoutError> {
        let index = self
            .bindings
            .iter()
            .position(|b| b.id == id)
            .ok_or(LayoutError::UnknownInteraction(id))?;
        let mut binding = self.bindings.remove(index);
        binding.interaction.reset();
        Ok(binding.interaction)
    }

    /// Number of attached interactions.
    pub fn interaction_count(&self) -> usize {
        self.bindings.len()
    }

    /// Reset and drop every binding whose component matches.
    pub(crate) fn drop_bindings(&mut self, mut on: impl FnMut(ComponentId) -> bool) {
        self.bindings.retain_mut(|binding| {
            if on(binding.component) {
                binding.interaction.reset();
                false
            } else {
                true
            }
        });
    }

    /// Deliver `event` to every live binding, topmost component first.
    ///
    /// Bindings on the same component run in attach order. Bindings whose component is not
    /// rendered (detached, or never anchored) are skipped. Returns the binding that stopped
    /// propagation.
    pub fn dispatch(&mut self, scene: &Scene, event: &InputEvent) -> Option<InteractionId> {
        let rank: HashMap<ComponentId, usize> = self
            .paint_order()
            .into_iter()
            .enumerate()
            .map(|(i, id)| (id, i))
            .collect();
        let mut live: Vec<(usize, usize)> = Vec::new();
        for (i, binding) in self.bindings.iter_mut().enumerate() {
            let rendered = self
                .nodes
                .get(&binding.component)
                .is_some_and(|n| n.state >= Lifecycle::LayoutComputed);
            match rank.get(&binding.component) {
                Some(r) if rendered => {
                    binding.warned = false;
                    live.push((*r, i));
                }
                _ => {
                    if !binding.warned {
                        tracing::warn!(
                            component = binding.component.get(),
                            "skipping interaction bound to a component that is not rendered"
                        );
                        binding.warned = true;
                    }
                }
            }
        }
        live.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        for (_, i) in live {
            let binding = &mut self.bindings[i];
            let Some(bounds) = world_bounds(&self.nodes, binding.component) else {
                continue;
            };
            let leaf = match self.nodes.get(&binding.component).map(|n| &n.kind) {
                Some(NodeKind::Leaf(c)) => Some(c.as_ref()),
                _ => None,
            };
            let target = Target {
                component: binding.component,
                bounds,
                scene,
                leaf,
            };
            if binding.interaction.handle(event, &target) == Outcome::Stop {
                return Some(binding.id);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Environment, RenderCx, RenderError};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug)]
    struct Pane;

    impl Component for Pane {
        fn requested_space(&self, _offered: Size) -> Size {
            Size::ZERO
        }
        fn render(&mut self, _cx: &mut RenderCx<'_>) -> Result<(), RenderError> {
            Ok(())
        }
    }

    /// Records the bounds it was dispatched with.
    #[derive(Debug)]
    struct Recorder {
        name: &'static str,
        seen: Rc<RefCell<Vec<(&'static str, Rect)>>>,
        outcome: Outcome,
        resets: Rc<RefCell<usize>>,
    }

    impl Interaction for Recorder {
        fn handle(&mut self, _event: &InputEvent, target: &Target<'_>) -> Outcome {
            self.seen.borrow_mut().push((self.name, target.bounds));
            self.outcome
        }
        fn reset(&mut self) {
            *self.resets.borrow_mut() += 1;
        }
    }

    struct Fixture {
        scene: Scene,
        chart: Chart,
        under: ComponentId,
        over: ComponentId,
        seen: Rc<RefCell<Vec<(&'static str, Rect)>>>,
        resets: Rc<RefCell<usize>>,
    }

    impl Fixture {
        fn recorder(&self, name: &'static str, outcome: Outcome) -> Recorder {
            Recorder {
                name,
                seen: self.seen.clone(),
                outcome,
                resets: self.resets.clone(),
            }
        }
    }

    fn overlay() -> Fixture {
        let mut scene = Scene::new();
        let surface = scene.insert(None, "svg");
        let mut chart = Chart::new(Environment::new());
        let under = chart.insert(Pane);
        let over = chart.insert(Pane);
        let group = chart.add_group(&[under, over]).unwrap();
        let table = chart.add_table(vec![vec![None, Some(group)]]).unwrap();
        chart.set_column_weight(table, 0, 1.0).unwrap();
        chart
            .render_to(&mut scene, table, surface, Size::new(200.0, 100.0))
            .unwrap();
        Fixture {
            scene,
            chart,
            under,
            over,
            seen: Rc::default(),
            resets: Rc::default(),
        }
    }

    fn move_to(x: f64, y: f64) -> InputEvent {
        InputEvent::PointerMove {
            position: Point::new(x, y),
            time: 0.0,
        }
    }

    #[test]
    fn topmost_first_and_stop_ends_propagation() {
        let mut f = overlay();
        let below = f.recorder("below", Outcome::Continue);
        let above = f.recorder("above", Outcome::Stop);
        f.chart.attach_interaction(f.under, below).unwrap();
        let stopper = f.chart.attach_interaction(f.over, above).unwrap();
        f.chart.flush(&mut f.scene);

        assert_eq!(f.chart.dispatch(&f.scene, &move_to(150.0, 50.0)), Some(stopper));
        let seen = f.seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], ("above", Rect::new(100.0, 0.0, 200.0, 100.0)));
    }

    #[test]
    fn hit_box_is_created_lazily_and_sized_to_bounds() {
        let mut f = overlay();
        assert_eq!(f.chart.hit_box(f.over), None);
        let recorder = f.recorder("p", Outcome::Continue);
        f.chart.attach_interaction(f.over, recorder).unwrap();
        f.chart.flush(&mut f.scene);
        let hit_box = f.chart.hit_box(f.over).unwrap();
        assert!(f.scene.has_class(hit_box, "hit-box"));
        assert_eq!(f.scene.attr_number(hit_box, "width"), Some(100.0));
        assert_eq!(f.scene.attr_number(hit_box, "opacity"), Some(0.0));
        assert_eq!(f.chart.hit_box(f.under), None);
    }

    #[test]
    fn removing_a_component_drops_its_bindings() {
        let mut f = overlay();
        let gone = f.recorder("gone", Outcome::Stop);
        let kept = f.recorder("kept", Outcome::Continue);
        let id = f.chart.attach_interaction(f.over, gone).unwrap();
        f.chart.attach_interaction(f.under, kept).unwrap();
        f.chart.flush(&mut f.scene);
        assert_eq!(f.chart.interaction_count(), 2);

        f.chart.remove(&mut f.scene, f.over).unwrap();
        assert_eq!(f.chart.interaction_count(), 1);
        assert_eq!(*f.resets.borrow(), 1);
        assert_eq!(
            f.chart.detach_interaction(id).unwrap_err(),
            LayoutError::UnknownInteraction(id)
        );
        assert_eq!(f.chart.dispatch(&f.scene, &move_to(150.0, 50.0)), None);
        assert_eq!(f.seen.borrow().iter().map(|s| s.0).collect::<Vec<_>>(), ["kept"]);
    }

    #[test]
    fn detached_component_keeps_an_inert_binding() {
        let mut f = overlay();
        let recorder = f.recorder("r", Outcome::Stop);
        f.chart.attach_interaction(f.over, recorder).unwrap();
        f.chart.flush(&mut f.scene);
        f.chart.detach(&mut f.scene, f.over).unwrap();
        assert_eq!(f.chart.dispatch(&f.scene, &move_to(150.0, 50.0)), None);
        assert_eq!(f.chart.dispatch(&f.scene, &move_to(150.0, 50.0)), None);
        assert!(f.seen.borrow().is_empty());
        assert_eq!(f.chart.interaction_count(), 1);
    }

    #[test]
    fn rebind_resets_and_moves_the_binding() {
        let mut f = overlay();
        let recorder = f.recorder("p", Outcome::Continue);
        let id = f.chart.attach_interaction(f.over, recorder).unwrap();
        f.chart.rebind_interaction(id, f.under).unwrap();
        f.chart.flush(&mut f.scene);
        assert_eq!(*f.resets.borrow(), 1);
        f.chart.dispatch(&f.scene, &move_to(0.0, 0.0));
        assert_eq!(f.seen.borrow().len(), 1);
        let back = f.chart.detach_interaction(id).unwrap();
        assert_eq!(*f.resets.borrow(), 2);
        drop(back);
        assert_eq!(
            f.chart.detach_interaction(id).unwrap_err(),
            LayoutError::UnknownInteraction(id)
        );
    }

    #[test]
    fn target_geometry() {
        let scene = Scene::new();
        let target = Target::new(
            ComponentId(7),
            Rect::new(10.0, 20.0, 110.0, 70.0),
            &scene,
        );
        assert_eq!(target.to_local(Point::new(15.0, 25.0)), Point::new(5.0, 5.0));
        assert!(target.contains(Point::new(110.0, 70.0)));
        assert!(!target.contains(Point::new(9.0, 30.0)));
        assert_eq!(target.clamp_local(Point::new(-3.0, 80.0)), Point::new(0.0, 50.0));
        assert_eq!(target.nearest_entity(Point::new(15.0, 25.0)).map(|e| e.index), None);
    }
}
