// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::{CallbackSet, ListenerId, Value};

/// Arbitrary key-value metadata attached to a [`Dataset`].
pub type Metadata = BTreeMap<String, Value>;

/// A shared, observable list of records plus metadata.
///
/// Cloning a `Dataset` clones the handle, not the data: every clone observes the same state and
/// the same listeners. Replacing the data or metadata notifies each listener exactly once, after
/// the new value is in place.
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use trellis_data::{Dataset, Value};
///
/// let ds = Dataset::new(vec![Value::Number(1.0)]);
/// let seen = Rc::new(Cell::new(0));
/// let s = seen.clone();
/// ds.on_update(move |ds| s.set(ds.data().len()));
/// ds.set_data(vec![Value::Number(1.0), Value::Number(2.0)]);
/// assert_eq!(seen.get(), 2);
/// ```
#[derive(Clone)]
pub struct Dataset {
    inner: Rc<Inner>,
}

struct Inner {
    data: RefCell<Rc<Vec<Value>>>,
    metadata: RefCell<Rc<Metadata>>,
    listeners: CallbackSet<Dataset>,
}

impl Dataset {
    /// Create a dataset with empty metadata.
    pub fn new(data: Vec<Value>) -> Self {
        Self::with_metadata(data, Metadata::new())
    }

    /// Create a dataset with the given metadata.
    pub fn with_metadata(data: Vec<Value>, metadata: Metadata) -> Self {
        Self {
            inner: Rc::new(Inner {
                data: RefCell::new(Rc::new(data)),
                metadata: RefCell::new(Rc::new(metadata)),
                listeners: CallbackSet::new(),
            }),
        }
    }

    /// The current records. The returned snapshot stays valid across later mutations.
    pub fn data(&self) -> Rc<Vec<Value>> {
        self.inner.data.borrow().clone()
    }

    /// Replace the records and notify listeners.
    pub fn set_data(&self, data: Vec<Value>) {
        *self.inner.data.borrow_mut() = Rc::new(data);
        self.inner.listeners.call(self);
    }

    /// The current metadata.
    pub fn metadata(&self) -> Rc<Metadata> {
        self.inner.metadata.borrow().clone()
    }

    /// Replace the metadata and notify listeners.
    pub fn set_metadata(&self, metadata: Metadata) {
        *self.inner.metadata.borrow_mut() = Rc::new(metadata);
        self.inner.listeners.call(self);
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.inner.data.borrow().len()
    }

    /// Whether there are no records.
    pub fn is_empty(&self) -> bool {
        self.inner.data.borrow().is_empty()
    }

    /// Register a listener invoked after every data or metadata replacement.
    pub fn on_update(&self, callback: impl Fn(&Self) + 'static) -> ListenerId {
        self.inner.listeners.add(callback)
    }

    /// Remove a listener registered with [`Dataset::on_update`].
    pub fn off_update(&self, id: ListenerId) -> bool {
        self.inner.listeners.remove(id)
    }

    /// Whether two handles refer to the same dataset.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Dataset {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl fmt::Debug for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("len", &self.len())
            .field("metadata", &self.inner.metadata.borrow())
            .field("listeners", &self.inner.listeners.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record;
    use std::cell::Cell;

    #[test]
    fn one_notification_per_mutation() {
        let ds = Dataset::default();
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        ds.on_update(move |_| c.set(c.get() + 1));
        ds.set_data(vec![record! { "x" => 1.0 }]);
        assert_eq!(count.get(), 1);
        ds.set_metadata(Metadata::from([("name".to_owned(), Value::from("a"))]));
        assert_eq!(count.get(), 2);
        // Setting an equal value is still a change notification.
        ds.set_data(vec![record! { "x" => 1.0 }]);
        assert_eq!(count.get(), 3);
    }

    #[test]
    fn listeners_observe_new_state() {
        let ds = Dataset::new(vec![Value::Number(1.0)]);
        let observed = Rc::new(RefCell::new(Vec::new()));
        for _ in 0..2 {
            let o = observed.clone();
            ds.on_update(move |ds| {
                let meta = ds.metadata();
                o.borrow_mut().push((ds.len(), meta.get("tag").cloned()));
            });
        }
        ds.set_data(vec![Value::Null; 3]);
        ds.set_metadata(Metadata::from([("tag".to_owned(), Value::from("t"))]));
        assert_eq!(
            *observed.borrow(),
            vec![
                (3, None),
                (3, None),
                (3, Some(Value::from("t"))),
                (3, Some(Value::from("t"))),
            ]
        );
    }

    #[test]
    fn clones_share_state() {
        let a = Dataset::default();
        let b = a.clone();
        b.set_data(vec![Value::Bool(true)]);
        assert_eq!(a.len(), 1);
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&Dataset::default()));
    }

    #[test]
    fn snapshot_survives_replacement() {
        let ds = Dataset::new(vec![Value::Number(1.0)]);
        let before = ds.data();
        ds.set_data(Vec::new());
        assert_eq!(before.len(), 1);
        assert!(ds.is_empty());
    }

    #[test]
    fn removed_listener_is_not_called() {
        let ds = Dataset::default();
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let id = ds.on_update(move |_| c.set(c.get() + 1));
        assert!(ds.off_update(id));
        ds.set_data(Vec::new());
        assert_eq!(count.get(), 0);
    }
}
