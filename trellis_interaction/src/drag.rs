// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use kurbo::{Point, Rect};
use trellis_data::{CallbackSet, ListenerId};
use trellis_layout::{InputEvent, Interaction, Outcome, PointerButton, Target};

/// Axes a drag may move along.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum DragConstraint {
    /// Both axes.
    #[default]
    Free,
    /// Horizontal only; the drag keeps its origin's y.
    XOnly,
    /// Vertical only; the drag keeps its origin's x.
    YOnly,
}

impl DragConstraint {
    fn apply(self, origin: Point, point: Point) -> Point {
        match self {
            Self::Free => point,
            Self::XOnly => Point::new(point.x, origin.y),
            Self::YOnly => Point::new(origin.x, point.y),
        }
    }
}

/// Where a drag gesture is.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum DragPhase {
    /// No button held.
    #[default]
    Idle,
    /// A drag is running, in local coordinates.
    Dragging {
        /// Where the drag started.
        origin: Point,
        /// The latest constrained pointer position.
        current: Point,
    },
    /// The host cancelled the last drag. The next press starts a new one.
    Cancelled,
}

/// Press, move and release bookkeeping shared by drag-driven interactions.
#[derive(Copy, Clone, Debug, Default)]
pub(crate) struct DragTracker {
    pub(crate) phase: DragPhase,
    pub(crate) constraint: DragConstraint,
    pub(crate) constrained_to_component: bool,
}

/// What a tracked event did to the gesture.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) enum DragStep {
    Started(Point),
    Moved { previous: Point, origin: Point, current: Point },
    Ended { origin: Point, current: Point },
    Cancelled,
}

impl DragTracker {
    fn constrain(&self, target: &Target<'_>, origin: Point, position: Point) -> Point {
        let local = target.to_local(position);
        let local = if self.constrained_to_component {
            target.clamp_local(local)
        } else {
            local
        };
        self.constraint.apply(origin, local)
    }

    pub(crate) fn track(&mut self, event: &InputEvent, target: &Target<'_>) -> Option<DragStep> {
        match (event, self.phase) {
            (
                &InputEvent::PointerDown {
                    position,
                    button: PointerButton::Primary,
                    ..
                },
                DragPhase::Idle | DragPhase::Cancelled,
            ) if target.contains(position) => {
                let origin = target.to_local(position);
                self.phase = DragPhase::Dragging {
                    origin,
                    current: origin,
                };
                Some(DragStep::Started(origin))
            }
            (
                &InputEvent::PointerMove { position, .. },
                DragPhase::Dragging { origin, current },
            ) => {
                let next = self.constrain(target, origin, position);
                self.phase = DragPhase::Dragging {
                    origin,
                    current: next,
                };
                Some(DragStep::Moved {
                    previous: current,
                    origin,
                    current: next,
                })
            }
            (
                &InputEvent::PointerUp {
                    position,
                    button: PointerButton::Primary,
                    ..
                },
                DragPhase::Dragging { origin, .. },
            ) => {
                let current = self.constrain(target, origin, position);
                self.phase = DragPhase::Idle;
                Some(DragStep::Ended { origin, current })
            }
            (InputEvent::PointerUp { .. }, DragPhase::Cancelled) => {
                self.phase = DragPhase::Idle;
                None
            }
            (InputEvent::PointerCancel, DragPhase::Dragging { .. }) => {
                self.phase = DragPhase::Cancelled;
                Some(DragStep::Cancelled)
            }
            _ => None,
        }
    }

    /// Abandon the gesture. Returns whether a drag was running.
    pub(crate) fn abandon(&mut self) -> bool {
        let was_dragging = matches!(self.phase, DragPhase::Dragging { .. });
        self.phase = DragPhase::Idle;
        was_dragging
    }
}

struct Shared {
    tracker: Cell<DragTracker>,
    start: CallbackSet<Point>,
    drag: CallbackSet<Rect>,
    end: CallbackSet<Rect>,
    cancel: CallbackSet<()>,
}

/// Reports drags as rectangles spanning the drag origin and the pointer.
///
/// A drag starts with a primary press inside the component. Points are in the component's
/// local coordinates, clamped into it unless [`DragInteraction::set_constrained_to_component`]
/// turns that off, and pinned to one axis by a [`DragConstraint`].
///
/// Cheap to clone; clones share callbacks and gesture state.
///
/// ```
/// use kurbo::{Point, Rect};
/// use trellis_interaction::{DragInteraction, InputEvent, Interaction, PointerButton, Target};
/// use trellis_layout::Environment;
/// use trellis_scene::Scene;
///
/// let scene = Scene::new();
/// let target = Target::new(
///     Environment::new().allocate_id(),
///     Rect::new(0.0, 0.0, 100.0, 100.0),
///     &scene,
/// );
/// let mut drag = DragInteraction::new();
/// drag.on_drag_end(|rect| assert_eq!(rect, Rect::new(10.0, 10.0, 100.0, 40.0)));
///
/// let at = |x, y| Point::new(x, y);
/// let button = PointerButton::Primary;
/// drag.handle(&InputEvent::PointerDown { position: at(10.0, 40.0), button, time: 0.0 }, &target);
/// drag.handle(&InputEvent::PointerUp { position: at(250.0, 10.0), button, time: 9.0 }, &target);
/// ```
#[derive(Clone)]
pub struct DragInteraction {
    shared: Rc<Shared>,
}

impl DragInteraction {
    /// A free drag, constrained to its component.
    pub fn new() -> Self {
        Self {
            shared: Rc::new(Shared {
                tracker: Cell::new(DragTracker {
                    constrained_to_component: true,
                    ..DragTracker::default()
                }),
                start: CallbackSet::new(),
                drag: CallbackSet::new(),
                end: CallbackSet::new(),
                cancel: CallbackSet::new(),
            }),
        }
    }

    /// Restrict the drag to one axis.
    pub fn set_constraint(&self, constraint: DragConstraint) -> &Self {
        self.update(|t| t.constraint = constraint);
        self
    }

    /// The axis restriction.
    pub fn constraint(&self) -> DragConstraint {
        self.shared.tracker.get().constraint
    }

    /// Whether points are clamped into the component. Defaults to `true`.
    pub fn set_constrained_to_component(&self, constrained: bool) -> &Self {
        self.update(|t| t.constrained_to_component = constrained);
        self
    }

    /// See [`DragInteraction::set_constrained_to_component`].
    pub fn constrained_to_component(&self) -> bool {
        self.shared.tracker.get().constrained_to_component
    }

    /// Where the gesture is.
    pub fn phase(&self) -> DragPhase {
        self.shared.tracker.get().phase
    }

    /// Call `callback` with the origin when a drag starts.
    pub fn on_drag_start(&self, callback: impl Fn(Point) + 'static) -> ListenerId {
        self.shared.start.add(move |p: &Point| callback(*p))
    }

    /// Call `callback` with the dragged rectangle on every move.
    pub fn on_drag(&self, callback: impl Fn(Rect) + 'static) -> ListenerId {
        self.shared.drag.add(move |r: &Rect| callback(*r))
    }

    /// Call `callback` with the final rectangle when the button is released.
    pub fn on_drag_end(&self, callback: impl Fn(Rect) + 'static) -> ListenerId {
        self.shared.end.add(move |r: &Rect| callback(*r))
    }

    /// Call `callback` when a drag is cancelled.
    pub fn on_cancel(&self, callback: impl Fn() + 'static) -> ListenerId {
        self.shared.cancel.add(move |_: &()| callback())
    }

    /// Remove a drag-start listener.
    pub fn off_drag_start(&self, id: ListenerId) -> bool {
        self.shared.start.remove(id)
    }

    /// Remove a drag listener.
    pub fn off_drag(&self, id: ListenerId) -> bool {
        self.shared.drag.remove(id)
    }

    /// Remove a drag-end listener.
    pub fn off_drag_end(&self, id: ListenerId) -> bool {
        self.shared.end.remove(id)
    }

    /// Remove a cancel listener.
    pub fn off_cancel(&self, id: ListenerId) -> bool {
        self.shared.cancel.remove(id)
    }

    fn update(&self, f: impl FnOnce(&mut DragTracker)) {
        let mut tracker = self.shared.tracker.get();
        f(&mut tracker);
        self.shared.tracker.set(tracker);
    }
}

impl Default for DragInteraction {
    fn default() -> Self {
        Self::new()
    }
}

impl Interaction for DragInteraction {
    fn handle(&mut self, event: &InputEvent, target: &Target<'_>) -> Outcome {
        let mut tracker = self.shared.tracker.get();
        let step = tracker.track(event, target);
        self.shared.tracker.set(tracker);
        match step {
            Some(DragStep::Started(origin)) => self.shared.start.call(&origin),
            Some(DragStep::Moved { origin, current, .. }) => {
                self.shared.drag.call(&Rect::from_points(origin, current));
            }
            Some(DragStep::Ended { origin, current }) => {
                self.shared.end.call(&Rect::from_points(origin, current));
            }
            Some(DragStep::Cancelled) => self.shared.cancel.call(&()),
            None => {}
        }
        Outcome::Continue
    }

    fn reset(&mut self) {
        let mut tracker = self.shared.tracker.get();
        let was_dragging = tracker.abandon();
        self.shared.tracker.set(tracker);
        if was_dragging {
            self.shared.cancel.call(&());
        }
    }
}

impl fmt::Debug for DragInteraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DragInteraction")
            .field("tracker", &self.shared.tracker.get())
            .finish_non_exhaustive()
    }
}
