// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use hashbrown::{HashMap, HashSet};
use trellis_data::{CallbackSet, ListenerId};
use trellis_layout::{InputEvent, Interaction, Outcome, Target};

#[derive(Default)]
struct Shared {
    hovered: Cell<bool>,
    held: RefCell<HashSet<u32>>,
    press: RefCell<HashMap<u32, Rc<CallbackSet<()>>>>,
    release: RefCell<HashMap<u32, Rc<CallbackSet<()>>>>,
}

impl Shared {
    fn fire(map: &RefCell<HashMap<u32, Rc<CallbackSet<()>>>>, code: u32) {
        // Release the map before calling so callbacks may register more keys.
        let callbacks = map.borrow().get(&code).cloned();
        if let Some(callbacks) = callbacks {
            callbacks.call(&());
        }
    }
}

/// Calls back when keys go down or up while the pointer is over the component.
///
/// A release is reported only for keys whose press was reported, so a key pressed elsewhere
/// and released over the component stays silent.
///
/// Cheap to clone; clones share callbacks and state.
#[derive(Clone, Default)]
pub struct KeyInteraction {
    shared: Rc<Shared>,
}

impl KeyInteraction {
    /// An interaction with no keys registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `callback` when `code` goes down over the component.
    pub fn on_key(&self, code: u32, callback: impl Fn() + 'static) -> ListenerId {
        self.shared
            .press
            .borrow_mut()
            .entry(code)
            .or_default()
            .add(move |_: &()| callback())
    }

    /// Remove a key-press listener for `code`.
    pub fn off_key(&self, code: u32, id: ListenerId) -> bool {
        self.shared
            .press
            .borrow()
            .get(&code)
            .is_some_and(|set| set.remove(id))
    }

    /// Call `callback` when `code` comes back up after a reported press.
    pub fn on_key_release(&self, code: u32, callback: impl Fn() + 'static) -> ListenerId {
        self.shared
            .release
            .borrow_mut()
            .entry(code)
            .or_default()
            .add(move |_: &()| callback())
    }

    /// Remove a key-release listener for `code`.
    pub fn off_key_release(&self, code: u32, id: ListenerId) -> bool {
        self.shared
            .release
            .borrow()
            .get(&code)
            .is_some_and(|set| set.remove(id))
    }

    /// Whether the pointer was over the component at the last pointer event.
    pub fn is_hovered(&self) -> bool {
        self.shared.hovered.get()
    }
}

impl Interaction for KeyInteraction {
    fn handle(&mut self, event: &InputEvent, target: &Target<'_>) -> Outcome {
        match *event {
            InputEvent::PointerMove { position, .. }
            | InputEvent::PointerDown { position, .. }
            | InputEvent::PointerUp { position, .. }
            | InputEvent::Wheel { position, .. } => {
                self.shared.hovered.set(target.contains(position));
            }
            InputEvent::PointerCancel => self.shared.hovered.set(false),
            InputEvent::KeyDown { code } => {
                if self.shared.hovered.get() {
                    self.shared.held.borrow_mut().insert(code);
                    Shared::fire(&self.shared.press, code);
                }
            }
            InputEvent::KeyUp { code } => {
                if self.shared.held.borrow_mut().remove(&code) {
                    Shared::fire(&self.shared.release, code);
                }
            }
        }
        Outcome::Continue
    }

    fn reset(&mut self) {
        self.shared.hovered.set(false);
        self.shared.held.borrow_mut().clear();
    }
}

impl fmt::Debug for KeyInteraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<u32> = self.shared.press.borrow().keys().copied().collect();
        keys.sort_unstable();
        f.debug_struct("KeyInteraction")
            .field("hovered", &self.shared.hovered.get())
            .field("keys", &keys)
            .finish_non_exhaustive()
    }
}
