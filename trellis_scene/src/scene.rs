// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core scene implementation: structure, attributes, timeline, and damage.

use std::borrow::Cow;
use std::collections::BTreeMap;

use hashbrown::HashMap;
use kurbo::Vec2;
use smallvec::SmallVec;
use trellis_data::Value;

use crate::damage::Damage;
use crate::timeline::Tween;
use crate::types::{ElementFlags, ElementId, Timing};

/// A retained tree of drawing elements with a transition clock.
///
/// Elements carry a tag (`g`, `rect`, `circle`, `text`, ...), classes, dynamic attributes, an
/// optional text body, and a translation relative to their parent. Ids are generational: once
/// an element is removed, every operation through its id is a no-op (setters) or `None`
/// (getters), even after the slot has been reused.
///
/// Attribute transitions are scheduled on an internal timeline measured in milliseconds and
/// applied by [`Scene::advance_to`]. Removal can be deferred the same way with
/// [`Scene::remove_at`], so exit transitions finish before their element disappears.
///
/// ## Example
///
/// ```rust
/// use trellis_data::Value;
/// use trellis_scene::{Easing, Scene, Timing};
///
/// let mut scene = Scene::new();
/// let root = scene.insert(None, "svg");
/// let dot = scene.insert(Some(root), "circle");
/// scene.set_attr(dot, "r", 0.0);
/// scene.transition(
///     dot,
///     "r",
///     4.0,
///     Timing { start: 0.0, duration: 100.0, easing: Easing::Linear },
/// );
///
/// scene.advance_to(50.0);
/// assert_eq!(scene.attr(dot, "r"), Some(&Value::Number(2.0)));
/// scene.advance_to(100.0);
/// assert_eq!(scene.attr(dot, "r"), Some(&Value::Number(4.0)));
/// assert!(!scene.has_pending());
/// ```
pub struct Scene {
    /// slots
    nodes: Vec<Option<Element>>,
    /// last generation per slot (persists across frees)
    generations: Vec<u32>,
    free_list: Vec<usize>,
    now: f64,
    tweens: Vec<Tween>,
    next_seq: u64,
    removals: Vec<(f64, ElementId)>,
    removed: Vec<ElementId>,
}

#[derive(Clone, Debug)]
struct Element {
    generation: u32,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    tag: Cow<'static, str>,
    classes: SmallVec<[Cow<'static, str>; 2]>,
    attrs: BTreeMap<Cow<'static, str>, Value>,
    text: Option<String>,
    translation: Vec2,
    flags: ElementFlags,
    dirty: bool,
}

impl Element {
    fn new(generation: u32, tag: Cow<'static, str>) -> Self {
        Self {
            generation,
            parent: None,
            children: Vec::new(),
            tag,
            classes: SmallVec::new(),
            attrs: BTreeMap::new(),
            text: None,
            translation: Vec2::ZERO,
            flags: ElementFlags::default(),
            dirty: true,
        }
    }
}

impl core::fmt::Debug for Scene {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Scene")
            .field("elements_total", &self.nodes.len())
            .field("elements_alive", &self.len())
            .field("free_list", &self.free_list.len())
            .field("now", &self.now)
            .field("tweens", &self.tweens.len())
            .field("removals", &self.removals.len())
            .finish_non_exhaustive()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Create an empty scene with its clock at zero.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            now: 0.0,
            tweens: Vec::new(),
            next_seq: 0,
            removals: Vec::new(),
            removed: Vec::new(),
        }
    }

    /// Insert a new element as the last child of `parent` (or as a root).
    ///
    /// A stale `parent` yields a detached root rather than an error.
    pub fn insert(
        &mut self,
        parent: Option<ElementId>,
        tag: impl Into<Cow<'static, str>>,
    ) -> ElementId {
        let tag = tag.into();
        let id = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.nodes[idx] = Some(Element::new(generation, tag));
            #[allow(
                clippy::cast_possible_truncation,
                reason = "ElementId uses 32-bit indices by design."
            )]
            ElementId::new(idx as u32, generation)
        } else {
            let generation = 1_u32;
            self.nodes.push(Some(Element::new(generation, tag)));
            self.generations.push(generation);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "ElementId uses 32-bit indices by design."
            )]
            ElementId::new((self.nodes.len() - 1) as u32, generation)
        };
        if let Some(p) = parent
            && self.is_alive(p)
        {
            self.link_parent(id, p);
        }
        id
    }

    /// Remove an element and its whole subtree immediately.
    ///
    /// Pending tweens and removals for the subtree are dropped on the next
    /// [`advance_to`](Self::advance_to). No-op for stale ids.
    pub fn remove(&mut self, id: ElementId) {
        if !self.is_alive(id) {
            return;
        }
        if let Some(parent) = self.element(id).and_then(|e| e.parent) {
            self.unlink_parent(id, parent);
        }
        self.remove_subtree(id);
    }

    fn remove_subtree(&mut self, id: ElementId) {
        let children = self
            .element(id)
            .map(|e| e.children.clone())
            .unwrap_or_default();
        for child in children {
            self.remove_subtree(child);
        }
        self.nodes[id.idx()] = None;
        self.free_list.push(id.idx());
        self.removed.push(id);
    }

    /// Mark `id` as exiting and remove it once the clock reaches `at`.
    ///
    /// Removes immediately when `at` is not in the future.
    pub fn remove_at(&mut self, id: ElementId, at: f64) {
        if !self.is_alive(id) {
            return;
        }
        if at <= self.now {
            self.remove(id);
            return;
        }
        if let Some(e) = self.element_mut(id) {
            e.flags.insert(ElementFlags::EXITING);
            e.dirty = true;
        }
        self.removals.push((at, id));
    }

    /// Move `id` under `new_parent` (appended last), or make it a root with `None`.
    ///
    /// Moving an element under itself or one of its descendants is ignored.
    pub fn reparent(&mut self, id: ElementId, new_parent: Option<ElementId>) {
        if !self.is_alive(id) {
            return;
        }
        if let Some(p) = new_parent
            && (!self.is_alive(p) || self.is_ancestor_or_self(id, p))
        {
            return;
        }
        if let Some(old) = self.element(id).and_then(|e| e.parent) {
            self.unlink_parent(id, old);
        }
        if let Some(p) = new_parent {
            self.link_parent(id, p);
        }
        self.mark_dirty(id);
    }

    /// Returns `true` if `id` refers to a live element.
    pub fn is_alive(&self, id: ElementId) -> bool {
        self.element(id).is_some()
    }

    /// Number of live elements.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    /// Whether the scene has no live elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The element's tag.
    pub fn tag(&self, id: ElementId) -> Option<&str> {
        self.element(id).map(|e| e.tag.as_ref())
    }

    /// The element's parent.
    pub fn parent_of(&self, id: ElementId) -> Option<ElementId> {
        self.element(id).and_then(|e| e.parent)
    }

    /// Children in insertion order. Empty for stale ids.
    pub fn children_of(&self, id: ElementId) -> &[ElementId] {
        self.element(id).map_or(&[], |e| &e.children)
    }

    /// Every live descendant of `root` in document (pre-)order, excluding `root`.
    pub fn descendants(&self, root: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack: Vec<ElementId> = self.children_of(root).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children_of(id).iter().rev().copied());
        }
        out
    }

    /// Direct children of `parent` carrying `class`.
    pub fn children_with_class(&self, parent: ElementId, class: &str) -> Vec<ElementId> {
        self.children_of(parent)
            .iter()
            .copied()
            .filter(|c| self.has_class(*c, class))
            .collect()
    }

    /// Set an attribute immediately.
    ///
    /// Transitions already running on the same attribute keep running and will overwrite this
    /// value on the next advance; use [`Scene::transition`] with an instant timing to cancel them.
    pub fn set_attr(
        &mut self,
        id: ElementId,
        name: impl Into<Cow<'static, str>>,
        value: impl Into<Value>,
    ) {
        let value = value.into();
        if let Some(e) = self.element_mut(id) {
            let name = name.into();
            if e.attrs.get(name.as_ref()) != Some(&value) {
                e.attrs.insert(name, value);
                e.dirty = true;
            }
        }
    }

    /// An attribute's current value.
    pub fn attr(&self, id: ElementId, name: &str) -> Option<&Value> {
        self.element(id).and_then(|e| e.attrs.get(name))
    }

    /// An attribute read as a number.
    pub fn attr_number(&self, id: ElementId, name: &str) -> Option<f64> {
        self.attr(id, name).and_then(Value::as_number)
    }

    /// Remove an attribute.
    pub fn remove_attr(&mut self, id: ElementId, name: &str) {
        if let Some(e) = self.element_mut(id)
            && e.attrs.remove(name).is_some()
        {
            e.dirty = true;
        }
    }

    /// All attributes in name order.
    pub fn attrs(&self, id: ElementId) -> impl Iterator<Item = (&str, &Value)> {
        self.element(id)
            .into_iter()
            .flat_map(|e| e.attrs.iter().map(|(k, v)| (k.as_ref(), v)))
    }

    /// Add or remove a class.
    pub fn set_class(&mut self, id: ElementId, class: impl Into<Cow<'static, str>>, on: bool) {
        let class = class.into();
        if let Some(e) = self.element_mut(id) {
            let pos = e.classes.iter().position(|c| *c == class);
            match (pos, on) {
                (None, true) => e.classes.push(class),
                (Some(i), false) => {
                    e.classes.remove(i);
                }
                _ => return,
            }
            e.dirty = true;
        }
    }

    /// Whether the element carries `class`.
    pub fn has_class(&self, id: ElementId, class: &str) -> bool {
        self.element(id)
            .is_some_and(|e| e.classes.iter().any(|c| c == class))
    }

    /// The element's classes in insertion order.
    pub fn classes(&self, id: ElementId) -> impl Iterator<Item = &str> {
        self.element(id)
            .into_iter()
            .flat_map(|e| e.classes.iter().map(AsRef::as_ref))
    }

    /// Replace the element's text body.
    pub fn set_text(&mut self, id: ElementId, text: Option<String>) {
        if let Some(e) = self.element_mut(id)
            && e.text != text
        {
            e.text = text;
            e.dirty = true;
        }
    }

    /// The element's text body.
    pub fn text(&self, id: ElementId) -> Option<&str> {
        self.element(id).and_then(|e| e.text.as_deref())
    }

    /// Set the translation relative to the parent.
    pub fn set_translation(&mut self, id: ElementId, translation: Vec2) {
        if let Some(e) = self.element_mut(id)
            && e.translation != translation
        {
            e.translation = translation;
            e.dirty = true;
        }
    }

    /// Translation relative to the parent.
    pub fn translation(&self, id: ElementId) -> Option<Vec2> {
        self.element(id).map(|e| e.translation)
    }

    /// Sum of translations from the root down to `id`.
    pub fn world_translation(&self, id: ElementId) -> Option<Vec2> {
        let mut e = self.element(id)?;
        let mut total = e.translation;
        while let Some(p) = e.parent {
            e = self.element(p)?;
            total += e.translation;
        }
        Some(total)
    }

    /// Element flags.
    pub fn flags(&self, id: ElementId) -> Option<ElementFlags> {
        self.element(id).map(|e| e.flags)
    }

    /// Replace element flags.
    pub fn set_flags(&mut self, id: ElementId, flags: ElementFlags) {
        if let Some(e) = self.element_mut(id)
            && e.flags != flags
        {
            e.flags = flags;
            e.dirty = true;
        }
    }

    /// Whether the element is visible itself and through all of its ancestors.
    pub fn is_rendered(&self, id: ElementId) -> bool {
        let mut cur = Some(id);
        while let Some(c) = cur {
            match self.element(c) {
                Some(e) if e.flags.contains(ElementFlags::VISIBLE) => cur = e.parent,
                _ => return false,
            }
        }
        true
    }

    // --- timeline ---

    /// Current clock time in milliseconds.
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Schedule `name` to move to `to` over `timing`.
    ///
    /// The starting value is read when the tween becomes due. A tween that becomes due
    /// interrupts any earlier tween of the same attribute; an earlier tween that would already
    /// have finished by then is completed first. An instant timing at or before the current
    /// time applies right away and cancels tweens of that attribute that are already due.
    pub fn transition(
        &mut self,
        id: ElementId,
        name: impl Into<Cow<'static, str>>,
        to: impl Into<Value>,
        timing: Timing,
    ) {
        if !self.is_alive(id) {
            return;
        }
        let name = name.into();
        let to = to.into();
        if timing.duration <= 0.0 && timing.start <= self.now {
            let now = self.now;
            self.tweens
                .retain(|tw| !(tw.element == id && tw.name == name && tw.timing.start <= now));
            self.set_attr(id, name, to);
            return;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        tracing::trace!(?id, attr = %name, ?timing, "tween scheduled");
        self.tweens.push(Tween {
            element: id,
            name,
            from: None,
            to,
            timing,
            seq,
            done: false,
        });
    }

    /// Drop every tween and pending removal for `id`, leaving attributes where they are.
    pub fn interrupt(&mut self, id: ElementId) {
        self.tweens.retain(|tw| tw.element != id);
    }

    /// Whether any tween or deferred removal is still scheduled.
    pub fn has_pending(&self) -> bool {
        !self.tweens.is_empty() || !self.removals.is_empty()
    }

    /// The time the last scheduled tween or removal completes (or `now` when idle).
    pub fn settle_time(&self) -> f64 {
        let tweens = self.tweens.iter().map(|t| t.timing.end());
        let removals = self.removals.iter().map(|(at, _)| *at);
        tweens.chain(removals).fold(self.now, f64::max)
    }

    /// Advance the clock by `dt` milliseconds.
    pub fn advance_by(&mut self, dt: f64) {
        self.advance_to(self.now + dt.max(0.0));
    }

    /// Run the timeline until nothing is pending.
    pub fn settle(&mut self) {
        self.advance_to(self.settle_time());
    }

    /// Move the clock to `t` (never backwards), applying due tweens and removals.
    pub fn advance_to(&mut self, t: f64) {
        if t > self.now {
            self.now = t;
        }
        let now = self.now;

        let mut pending = core::mem::take(&mut self.tweens);
        pending.retain(|tw| self.is_alive(tw.element));
        pending.sort_by(|a, b| {
            a.timing
                .start
                .total_cmp(&b.timing.start)
                .then(a.seq.cmp(&b.seq))
        });

        // Activate due tweens in start order; a later tween supersedes an earlier one.
        let mut kept: Vec<Tween> = Vec::with_capacity(pending.len());
        let mut active: HashMap<(ElementId, Cow<'static, str>), usize> = HashMap::new();
        for mut tw in pending {
            if tw.timing.start > now {
                kept.push(tw);
                continue;
            }
            let key = (tw.element, tw.name.clone());
            if let Some(&prev) = active.get(&key) {
                let prev = &mut kept[prev];
                if prev.timing.end() <= tw.timing.start {
                    let (id, name, value) = (prev.element, prev.name.clone(), prev.to.clone());
                    prev.done = true;
                    self.set_attr(id, name, value);
                } else {
                    prev.done = true;
                }
            }
            if tw.from.is_none() {
                tw.from = Some(
                    self.attr(tw.element, &tw.name)
                        .cloned()
                        .unwrap_or_else(|| tw.to.clone()),
                );
                tracing::trace!(id = ?tw.element, attr = %tw.name, "tween started");
            }
            active.insert(key, kept.len());
            kept.push(tw);
        }

        for i in 0..kept.len() {
            let tw = &kept[i];
            if tw.done || tw.timing.start > now {
                continue;
            }
            let value = tw.value_at(now);
            let finished = tw.progress(now) >= 1.0;
            let (id, name) = (tw.element, tw.name.clone());
            self.set_attr(id, name, value);
            kept[i].done = finished;
        }
        kept.retain(|tw| !tw.done);
        self.tweens = kept;

        let (due, later): (Vec<_>, Vec<_>) = core::mem::take(&mut self.removals)
            .into_iter()
            .partition(|(at, _)| *at <= now);
        for (_, id) in due {
            self.remove(id);
        }
        // Removing a parent takes its scheduled descendants with it.
        self.removals = later
            .into_iter()
            .filter(|(_, id)| self.is_alive(*id))
            .collect();
    }

    // --- damage ---

    /// Report and clear everything changed since the previous commit.
    pub fn commit(&mut self) -> Damage {
        let mut damage = Damage {
            changed: Vec::new(),
            removed: core::mem::take(&mut self.removed),
        };
        for (idx, slot) in self.nodes.iter_mut().enumerate() {
            if let Some(e) = slot
                && e.dirty
            {
                e.dirty = false;
                #[allow(
                    clippy::cast_possible_truncation,
                    reason = "ElementId uses 32-bit indices by design."
                )]
                damage.changed.push(ElementId::new(idx as u32, e.generation));
            }
        }
        damage
    }

    // --- internals ---

    fn element(&self, id: ElementId) -> Option<&Element> {
        self.nodes
            .get(id.idx())
            .and_then(|n| n.as_ref())
            .filter(|e| e.generation == id.1)
    }

    fn element_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.nodes
            .get_mut(id.idx())
            .and_then(|n| n.as_mut())
            .filter(|e| e.generation == id.1)
    }

    fn mark_dirty(&mut self, id: ElementId) {
        if let Some(e) = self.element_mut(id) {
            e.dirty = true;
        }
    }

    fn is_ancestor_or_self(&self, ancestor: ElementId, mut id: ElementId) -> bool {
        loop {
            if id == ancestor {
                return true;
            }
            match self.parent_of(id) {
                Some(p) => id = p,
                None => return false,
            }
        }
    }

    fn link_parent(&mut self, id: ElementId, parent: ElementId) {
        if let Some(p) = self.element_mut(parent) {
            p.children.push(id);
            p.dirty = true;
        }
        if let Some(e) = self.element_mut(id) {
            e.parent = Some(parent);
        }
    }

    fn unlink_parent(&mut self, id: ElementId, parent: ElementId) {
        if let Some(p) = self.element_mut(parent) {
            p.children.retain(|c| *c != id);
            p.dirty = true;
        }
        if let Some(e) = self.element_mut(id) {
            e.parent = None;
        }
    }
}
