// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use hashbrown::HashSet;

/// Identifier for a component within one [`Environment`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub(crate) u64);

impl ComponentId {
    /// The raw id, unique within the environment that allocated it.
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Shared context for a set of charts: the id allocator and the render queue.
///
/// Cloning is cheap and every clone refers to the same context. Independent environments
/// never see each other's ids or requests, so several charts can run side by side.
///
/// Requests are coalesced: asking to render the same component twice before the next
/// [`Chart::flush`](crate::Chart::flush) produces one render.
#[derive(Clone, Default)]
pub struct Environment {
    inner: Rc<EnvInner>,
}

#[derive(Default)]
struct EnvInner {
    next_id: Cell<u64>,
    queue: RefCell<RenderQueue>,
}

#[derive(Default, Debug)]
pub(crate) struct RenderQueue {
    pub(crate) layout: HashSet<ComponentId>,
    pub(crate) render: HashSet<ComponentId>,
}

impl Environment {
    /// A fresh environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a component id.
    pub fn allocate_id(&self) -> ComponentId {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        ComponentId(id)
    }

    /// Queue `id` to render on the next flush.
    pub fn request_render(&self, id: ComponentId) {
        self.inner.queue.borrow_mut().render.insert(id);
    }

    /// Queue the tree containing `id` for layout, then render, on the next flush.
    pub fn request_layout(&self, id: ComponentId) {
        let mut queue = self.inner.queue.borrow_mut();
        queue.layout.insert(id);
        queue.render.insert(id);
    }

    /// Whether a flush would do anything.
    pub fn has_pending_frame(&self) -> bool {
        let queue = self.inner.queue.borrow();
        !queue.layout.is_empty() || !queue.render.is_empty()
    }

    pub(crate) fn take_requests(&self) -> RenderQueue {
        core::mem::take(&mut *self.inner.queue.borrow_mut())
    }

    /// Whether two handles share one context.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("next_id", &self.inner.next_id.get())
            .field("queue", &self.inner.queue.borrow())
            .finish()
    }
}
