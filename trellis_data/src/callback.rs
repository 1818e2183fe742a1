// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

/// Handle returned when registering a listener; pass it back to remove the listener.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Callback<A> = Rc<dyn Fn(&A)>;

/// An ordered set of callbacks sharing one argument type.
///
/// [`CallbackSet::call`] invokes a snapshot of the registered callbacks, so a callback may
/// register or remove listeners, or re-enter the object that owns the set, without
/// invalidating the iteration. Listeners added during a call are first invoked on the next call.
pub struct CallbackSet<A: ?Sized> {
    next: Cell<u64>,
    callbacks: RefCell<SmallVec<[(ListenerId, Callback<A>); 2]>>,
}

impl<A: ?Sized> CallbackSet<A> {
    /// Create an empty set.
    pub fn new() -> Self {
        Self {
            next: Cell::new(0),
            callbacks: RefCell::new(SmallVec::new()),
        }
    }

    /// Register `callback`, returning its id.
    pub fn add(&self, callback: impl Fn(&A) + 'static) -> ListenerId {
        let id = ListenerId(self.next.get());
        self.next.set(id.0 + 1);
        self.callbacks.borrow_mut().push((id, Rc::new(callback)));
        id
    }

    /// Remove a callback. Returns `false` if `id` was not registered.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut callbacks = self.callbacks.borrow_mut();
        let before = callbacks.len();
        callbacks.retain(|(cid, _)| *cid != id);
        callbacks.len() != before
    }

    /// Invoke every callback registered at the time of the call, in registration order.
    pub fn call(&self, arg: &A) {
        let snapshot: SmallVec<[Callback<A>; 4]> =
            self.callbacks.borrow().iter().map(|(_, cb)| cb.clone()).collect();
        for cb in snapshot {
            cb(arg);
        }
    }

    /// Number of registered callbacks.
    pub fn len(&self) -> usize {
        self.callbacks.borrow().len()
    }

    /// Whether no callbacks are registered.
    pub fn is_empty(&self) -> bool {
        self.callbacks.borrow().is_empty()
    }
}

impl<A: ?Sized> Default for CallbackSet<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: ?Sized> fmt::Debug for CallbackSet<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackSet")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calls_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let set = CallbackSet::<u32>::new();
        let l1 = log.clone();
        set.add(move |v| l1.borrow_mut().push(("a", *v)));
        let l2 = log.clone();
        set.add(move |v| l2.borrow_mut().push(("b", *v)));
        set.call(&7);
        assert_eq!(*log.borrow(), vec![("a", 7), ("b", 7)]);
    }

    #[test]
    fn remove_is_idempotent() {
        let set = CallbackSet::<()>::new();
        let id = set.add(|()| {});
        assert!(set.remove(id));
        assert!(!set.remove(id));
        assert!(set.is_empty());
    }

    #[test]
    fn callback_may_remove_itself() {
        let set = Rc::new(CallbackSet::<()>::new());
        let hits = Rc::new(Cell::new(0));
        let own_id = Rc::new(Cell::new(None));
        let (s, h, o) = (Rc::downgrade(&set), hits.clone(), own_id.clone());
        let id = set.add(move |()| {
            h.set(h.get() + 1);
            if let (Some(set), Some(id)) = (s.upgrade(), o.get()) {
                set.remove(id);
            }
        });
        own_id.set(Some(id));
        set.call(&());
        set.call(&());
        assert_eq!(hits.get(), 1);
    }
}
