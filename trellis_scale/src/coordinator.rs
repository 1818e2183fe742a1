// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};

use trellis_data::ListenerId;

use crate::Scale;

/// Keeps the domains of a set of scales identical.
///
/// Whenever one member's domain changes, the coordinator copies that domain to every other
/// member. While a broadcast is running, notifications from members are ignored, so linked
/// scales converge in a single pass instead of recursing. Members already at the broadcast
/// domain are left untouched.
///
/// Dropping the coordinator unlinks the scales.
///
/// ```
/// use trellis_scale::{LinearScale, Scale, ScaleDomainCoordinator};
///
/// let a = LinearScale::new();
/// let b = LinearScale::new();
/// let _link = ScaleDomainCoordinator::new(vec![a.clone(), b.clone()]);
/// a.set_domain([0.0, 50.0]).unwrap();
/// assert_eq!(b.domain(), [0.0, 50.0]);
/// ```
pub struct ScaleDomainCoordinator<S: Scale> {
    inner: Rc<Inner<S>>,
}

struct Inner<S: Scale> {
    scales: Vec<S>,
    listeners: Vec<ListenerId>,
    in_progress: Cell<bool>,
    passes: Cell<u64>,
}

impl<S: Scale> ScaleDomainCoordinator<S> {
    /// Link `scales`. Their domains are not touched until one of them changes.
    pub fn new(scales: Vec<S>) -> Self {
        let inner = Rc::new_cyclic(|weak: &Weak<Inner<S>>| {
            let listeners = scales
                .iter()
                .map(|scale| {
                    let weak = weak.clone();
                    let source = scale.clone();
                    scale.on_domain_change(move || {
                        if let Some(inner) = weak.upgrade() {
                            inner.rescale(&source);
                        }
                    })
                })
                .collect();
            Inner {
                scales,
                listeners,
                in_progress: Cell::new(false),
                passes: Cell::new(0),
            }
        });
        Self { inner }
    }

    /// Broadcast `scale`'s current domain to every member.
    pub fn rescale(&self, scale: &S) {
        self.inner.rescale(scale);
    }

    /// The linked scales.
    pub fn scales(&self) -> &[S] {
        &self.inner.scales
    }

    /// Number of completed broadcasts.
    pub fn passes(&self) -> u64 {
        self.inner.passes.get()
    }
}

impl<S: Scale> Inner<S> {
    fn rescale(&self, source: &S) {
        if self.in_progress.get() {
            return;
        }
        let _guard = Guard::engage(&self.in_progress);
        let domain = source.domain();
        for scale in &self.scales {
            if scale.domain() == domain {
                continue;
            }
            if let Err(err) = scale.set_domain(domain.clone()) {
                tracing::warn!(%err, ?domain, "coordinated scale rejected the shared domain");
            }
        }
        self.passes.set(self.passes.get() + 1);
    }
}

impl<S: Scale> Drop for Inner<S> {
    fn drop(&mut self) {
        for (scale, id) in self.scales.iter().zip(&self.listeners) {
            scale.off_domain_change(*id);
        }
    }
}

/// Clears the in-progress flag even if a listener unwinds.
struct Guard<'a>(&'a Cell<bool>);

impl<'a> Guard<'a> {
    fn engage(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for Guard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl<S: Scale> fmt::Debug for ScaleDomainCoordinator<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScaleDomainCoordinator")
            .field("scales", &self.inner.scales.len())
            .field("in_progress", &self.inner.in_progress.get())
            .field("passes", &self.inner.passes.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CategoryScale, LinearScale, ProjectionScale, ExtentKey};
    use trellis_data::Value;

    fn notifications(scale: &impl Scale) -> Rc<Cell<u32>> {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        scale.on_domain_change(move || c.set(c.get() + 1));
        count
    }

    #[test]
    fn all_members_converge() {
        let scales: Vec<_> = (0..4).map(|_| LinearScale::new()).collect();
        let coordinator = ScaleDomainCoordinator::new(scales.clone());
        scales[2].set_domain([-1.0, 3.0]).unwrap();
        for s in &scales {
            assert_eq!(s.domain(), [-1.0, 3.0]);
        }
        assert_eq!(coordinator.passes(), 1);
    }

    #[test]
    fn repeated_set_is_bounded() {
        let scales: Vec<_> = (0..3).map(|_| LinearScale::new()).collect();
        let counts: Vec<_> = scales.iter().map(notifications).collect();
        let coordinator = ScaleDomainCoordinator::new(scales.clone());
        scales[0].set_domain([0.0, 5.0]).unwrap();
        scales[0].set_domain([0.0, 5.0]).unwrap();
        // Origin notified twice; each follower once (second pass finds them already there).
        assert_eq!(counts[0].get(), 2);
        assert_eq!(counts[1].get(), 1);
        assert_eq!(counts[2].get(), 1);
        assert!(coordinator.passes() <= 2 * 3);
    }

    #[test]
    fn two_coordinators_sharing_a_scale_terminate() {
        let a = LinearScale::new();
        let b = LinearScale::new();
        let c = LinearScale::new();
        let _ab = ScaleDomainCoordinator::new(vec![a.clone(), b.clone()]);
        let _bc = ScaleDomainCoordinator::new(vec![b.clone(), c.clone()]);
        a.set_domain([1.0, 2.0]).unwrap();
        assert_eq!(b.domain(), [1.0, 2.0]);
        assert_eq!(c.domain(), [1.0, 2.0]);
    }

    #[test]
    fn drop_unlinks() {
        let a = LinearScale::new();
        let b = LinearScale::new();
        let link = ScaleDomainCoordinator::new(vec![a.clone(), b.clone()]);
        drop(link);
        a.set_domain([3.0, 4.0]).unwrap();
        assert_eq!(b.domain(), [0.0, 1.0]);
    }

    #[test]
    fn auto_domain_changes_propagate() {
        let a = CategoryScale::new();
        let b = CategoryScale::new();
        let _link = ScaleDomainCoordinator::new(vec![a.clone(), b.clone()]);
        a.update_extent(ExtentKey::new(7, "x"), &[Value::from("p"), Value::from("q")]);
        assert_eq!(b.domain(), vec!["p", "q"]);
        assert!(!b.is_auto_domain());
        assert!(a.is_auto_domain());
    }
}
