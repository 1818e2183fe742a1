// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use trellis_data::{CallbackSet, ListenerId};
use trellis_layout::{Entity, InputEvent, Interaction, Outcome, Target};

struct Shared {
    current: RefCell<Option<Entity>>,
    enter: CallbackSet<Entity>,
    moved: CallbackSet<Entity>,
    exit: CallbackSet<()>,
}

/// Tracks the entity nearest the pointer while it is over the component.
///
/// `on_enter` fires when the pointer comes over the component and it has an entity to
/// report, `on_move` on every later move while that holds, and `on_exit` when the pointer
/// leaves or the component stops reporting an entity.
///
/// Cheap to clone; clones share callbacks and state.
#[derive(Clone)]
pub struct HoverInteraction {
    shared: Rc<Shared>,
}

impl HoverInteraction {
    /// A hover tracker with no listeners.
    pub fn new() -> Self {
        Self {
            shared: Rc::new(Shared {
                current: RefCell::new(None),
                enter: CallbackSet::new(),
                moved: CallbackSet::new(),
                exit: CallbackSet::new(),
            }),
        }
    }

    /// Call `callback` with the nearest entity when hovering starts.
    pub fn on_enter(&self, callback: impl Fn(&Entity) + 'static) -> ListenerId {
        self.shared.enter.add(callback)
    }

    /// Remove an enter listener.
    pub fn off_enter(&self, id: ListenerId) -> bool {
        self.shared.enter.remove(id)
    }

    /// Call `callback` with the nearest entity on every move while hovering.
    pub fn on_move(&self, callback: impl Fn(&Entity) + 'static) -> ListenerId {
        self.shared.moved.add(callback)
    }

    /// Remove a move listener.
    pub fn off_move(&self, id: ListenerId) -> bool {
        self.shared.moved.remove(id)
    }

    /// Call `callback` when hovering ends.
    pub fn on_exit(&self, callback: impl Fn() + 'static) -> ListenerId {
        self.shared.exit.add(move |_: &()| callback())
    }

    /// Remove an exit listener.
    pub fn off_exit(&self, id: ListenerId) -> bool {
        self.shared.exit.remove(id)
    }

    /// The entity last reported, if hovering.
    pub fn current(&self) -> Option<Entity> {
        self.shared.current.borrow().clone()
    }

    fn update(&self, next: Option<Entity>) {
        let was_hovering = self.shared.current.replace(next.clone()).is_some();
        match (was_hovering, next) {
            (false, Some(entity)) => self.shared.enter.call(&entity),
            (true, Some(entity)) => self.shared.moved.call(&entity),
            (true, None) => self.shared.exit.call(&()),
            (false, None) => {}
        }
    }
}

impl Default for HoverInteraction {
    fn default() -> Self {
        Self::new()
    }
}

impl Interaction for HoverInteraction {
    fn handle(&mut self, event: &InputEvent, target: &Target<'_>) -> Outcome {
        match *event {
            InputEvent::PointerMove { position, .. } => {
                let next = if target.contains(position) {
                    target.nearest_entity(position)
                } else {
                    None
                };
                self.update(next);
            }
            InputEvent::PointerCancel => self.update(None),
            _ => {}
        }
        Outcome::Continue
    }

    fn reset(&mut self) {
        self.update(None);
    }
}

impl fmt::Debug for HoverInteraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let current = self.shared.current.borrow();
        f.debug_struct("HoverInteraction")
            .field("index", &current.as_ref().map(|e| e.index))
            .finish_non_exhaustive()
    }
}
