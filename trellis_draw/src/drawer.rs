// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use hashbrown::HashMap;
use trellis_data::{AccessorFn, Dataset, Value};
use trellis_scene::{ElementId, Scene, Timing};

use crate::{Animator, AttrValues, DrawError, Selection};

/// Computes one attribute for a datum: `(datum, index, dataset) -> value`.
pub type AttrProjector = AccessorFn;

/// Attribute name to projector.
pub type AttrToProjector = BTreeMap<Cow<'static, str>, AttrProjector>;

/// Identity of a datum across draws.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DatumKey {
    /// Positional identity (the default).
    Index(usize),
    /// Identity derived from the datum.
    Text(String),
}

/// Derives a [`DatumKey`] from a datum and its index.
pub type KeyFn = Rc<dyn Fn(&Value, usize) -> DatumKey>;

/// One stage of a draw: attributes to apply and the animator that applies them.
#[derive(Clone)]
pub struct DrawStep {
    /// Attribute projectors.
    pub attrs: AttrToProjector,
    /// How the attributes are applied.
    pub animator: Rc<dyn Animator>,
}

impl DrawStep {
    /// A step applying `attrs` with `animator`.
    pub fn new(attrs: AttrToProjector, animator: Rc<dyn Animator>) -> Self {
        Self { attrs, animator }
    }
}

impl fmt::Debug for DrawStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrawStep")
            .field("attrs", &self.attrs.keys().collect::<Vec<_>>())
            .field("animator", &self.animator)
            .finish()
    }
}

/// Result of joining a dataset against the existing primitives.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Join {
    /// Data indices that got a new element.
    pub entered: Vec<usize>,
    /// Data indices that reused an element.
    pub updated: Vec<usize>,
    /// Elements whose datum disappeared; removed once their exit animation ends.
    pub exited: Vec<ElementId>,
    /// Scene time the last step settles.
    pub end: f64,
}

/// Attributes applied instantly, ahead of any animation.
const INSTANT_ATTRS: [&str; 2] = ["fill", "stroke"];

/// Reconciles a dataset against persistent scene elements.
///
/// Each datum maps to at most one element, identified across draws by the key function.
/// Without one, identity is positional: shrinking `[a, b, c]` to `[a, c]` updates the first two
/// elements and exits the third. Data whose key is new (or repeats a key already matched in
/// this draw) enters with a fresh element appended under the drawer's root. Elements whose key
/// vanished exit and are removed once the final step's exit animation ends, never before.
///
/// ```
/// use std::rc::Rc;
/// use trellis_data::{Accessor, Dataset, record};
/// use trellis_draw::{AttrToProjector, DrawStep, Drawer, NullAnimator};
/// use trellis_scene::Scene;
///
/// let mut scene = Scene::new();
/// let root = scene.insert(None, "svg");
/// let mut drawer = Drawer::new("circle").with_class("dot");
/// drawer.attach(&mut scene, root);
///
/// let ds = Dataset::new(vec![record! { "x" => 1.0 }, record! { "x" => 2.0 }]);
/// let mut attrs = AttrToProjector::new();
/// attrs.insert("cx".into(), Accessor::field("x").bind());
/// let steps = [DrawStep::new(attrs, Rc::new(NullAnimator))];
///
/// let join = drawer.draw(&mut scene, &ds, &steps).unwrap();
/// assert_eq!(join.entered, vec![0, 1]);
/// assert_eq!(drawer.selection(&scene).len(), 2);
///
/// ds.set_data(vec![record! { "x" => 5.0 }]);
/// let join = drawer.draw(&mut scene, &ds, &steps).unwrap();
/// assert_eq!((join.updated.len(), join.exited.len()), (1, 1));
/// assert_eq!(drawer.selection(&scene).len(), 1);
/// ```
pub struct Drawer {
    tag: Cow<'static, str>,
    class: Option<Cow<'static, str>>,
    key: Option<KeyFn>,
    whole: bool,
    root: Option<ElementId>,
    bound: Vec<(DatumKey, ElementId)>,
}

impl Drawer {
    /// A drawer creating `tag` elements.
    pub fn new(tag: impl Into<Cow<'static, str>>) -> Self {
        Self {
            tag: tag.into(),
            class: None,
            key: None,
            whole: false,
            root: None,
            bound: Vec::new(),
        }
    }

    /// Put `class` on every created element.
    pub fn with_class(mut self, class: impl Into<Cow<'static, str>>) -> Self {
        self.class = Some(class.into());
        self
    }

    /// Identify data by `key` instead of position.
    pub fn with_key(mut self, key: impl Fn(&Value, usize) -> DatumKey + 'static) -> Self {
        self.key = Some(Rc::new(key));
        self
    }

    /// Draw one primitive for the whole dataset, as lines and areas do.
    ///
    /// Projectors then see a single datum: a [`Value::List`] of every record, at index 0.
    pub fn with_whole_dataset(mut self) -> Self {
        self.whole = true;
        self
    }

    /// Create the drawer's `render-area` group under `parent`, replacing any previous root.
    ///
    /// Only the primitives carry the drawer's class.
    pub fn attach(&mut self, scene: &mut Scene, parent: ElementId) -> ElementId {
        self.detach(scene);
        let root = scene.insert(Some(parent), "g");
        scene.set_class(root, "render-area", true);
        self.root = Some(root);
        root
    }

    /// Remove the root group and every primitive.
    pub fn detach(&mut self, scene: &mut Scene) {
        if let Some(root) = self.root.take() {
            scene.remove(root);
        }
        self.bound.clear();
    }

    /// The root group, if attached and alive.
    pub fn root(&self, scene: &Scene) -> Option<ElementId> {
        self.root.filter(|r| scene.is_alive(*r))
    }

    /// Live primitives in data order.
    pub fn selection(&self, scene: &Scene) -> Vec<ElementId> {
        self.bound
            .iter()
            .map(|(_, e)| *e)
            .filter(|e| scene.is_alive(*e))
            .collect()
    }

    /// The primitive bound to datum `index`.
    ///
    /// A whole-dataset drawer answers with its single primitive for every index.
    pub fn selection_for_index(&self, scene: &Scene, index: usize) -> Option<ElementId> {
        let slot = if self.whole { 0 } else { index };
        self.bound
            .get(slot)
            .map(|(_, e)| *e)
            .filter(|e| scene.is_alive(*e))
    }

    /// Total time `steps` take for `n` elements.
    pub fn total_draw_time(steps: &[DrawStep], n: usize) -> f64 {
        steps.iter().map(|s| s.animator.total_time(n)).sum()
    }

    /// Join `dataset` against the current primitives and run `steps` in sequence.
    ///
    /// Steps start back to back from the scene's current time. `fill` and `stroke` are applied
    /// immediately rather than animated.
    pub fn draw(
        &mut self,
        scene: &mut Scene,
        dataset: &Dataset,
        steps: &[DrawStep],
    ) -> Result<Join, DrawError> {
        let root = self.root(scene).ok_or(DrawError::NotAttached)?;
        let records = dataset.data();
        let data = if self.whole {
            Rc::new(vec![Value::List(records.to_vec())])
        } else {
            records
        };
        let keys: Vec<DatumKey> = if self.whole {
            vec![DatumKey::Index(0)]
        } else {
            data.iter()
                .enumerate()
                .map(|(i, d)| self.key.as_ref().map_or(DatumKey::Index(i), |k| k(d, i)))
                .collect()
        };

        let mut previous: HashMap<DatumKey, ElementId> = HashMap::new();
        let mut leftovers = Vec::new();
        for (key, element) in self.bound.drain(..) {
            if !scene.is_alive(element) {
                continue;
            }
            if previous.contains_key(&key) {
                leftovers.push(element);
            } else {
                previous.insert(key, element);
            }
        }

        let mut join = Join::default();
        let mut selection = Selection::default();
        for (i, key) in keys.into_iter().enumerate() {
            let element = if let Some(existing) = previous.remove(&key) {
                join.updated.push(i);
                selection.entering.push(false);
                existing
            } else {
                let created = scene.insert(Some(root), self.tag.clone());
                if let Some(class) = &self.class {
                    scene.set_class(created, class.clone(), true);
                }
                join.entered.push(i);
                selection.entering.push(true);
                created
            };
            selection.elements.push(element);
            self.bound.push((key, element));
        }
        join.exited = previous.into_values().chain(leftovers).collect();
        join.exited.sort();

        let start = scene.now();
        let mut at = start;
        for step in steps {
            let mut values = AttrValues::new();
            for (name, projector) in &step.attrs {
                let column: Vec<Value> = data
                    .iter()
                    .enumerate()
                    .map(|(i, d)| projector(d, i, dataset))
                    .collect();
                if INSTANT_ATTRS.contains(&name.as_ref()) {
                    for (element, v) in selection.elements.iter().zip(&column) {
                        scene.transition(*element, name.clone(), v.clone(), Timing::instant(start));
                    }
                } else {
                    values.insert(name.clone(), column);
                }
            }
            step.animator.animate(scene, &selection, &values, at);
            at += step.animator.total_time(selection.len());
        }
        join.end = at;

        let removal = steps.last().map_or(start, |s| {
            s.animator.animate_exit(scene, &join.exited, start)
        });
        for element in &join.exited {
            scene.remove_at(*element, removal);
        }

        tracing::debug!(
            tag = %self.tag,
            entered = join.entered.len(),
            updated = join.updated.len(),
            exited = join.exited.len(),
            "drawer join"
        );
        Ok(join)
    }
}

impl fmt::Debug for Drawer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Drawer")
            .field("tag", &self.tag)
            .field("class", &self.class)
            .field("keyed", &self.key.is_some())
            .field("whole", &self.whole)
            .field("root", &self.root)
            .field("bound", &self.bound.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AnimatorTiming, EasingAnimator, NullAnimator};
    use trellis_data::{Accessor, record};

    fn dataset(names: &[&str]) -> Dataset {
        Dataset::new(
            names
                .iter()
                .map(|n| record! { "name" => *n, "v" => 1.0 })
                .collect(),
        )
    }

    fn label_steps(animator: Rc<dyn Animator>) -> Vec<DrawStep> {
        let mut attrs = AttrToProjector::new();
        attrs.insert("label".into(), Accessor::field("name").bind());
        attrs.insert("fill".into(), Accessor::constant("#ff0000").bind());
        vec![DrawStep::new(attrs, animator)]
    }

    fn attached() -> (Scene, Drawer) {
        let mut scene = Scene::new();
        let root = scene.insert(None, "svg");
        let mut drawer = Drawer::new("rect");
        drawer.attach(&mut scene, root);
        (scene, drawer)
    }

    #[test]
    fn only_primitives_carry_the_class() {
        let mut scene = Scene::new();
        let surface = scene.insert(None, "svg");
        let mut drawer = Drawer::new("rect").with_class("bar");
        let root = drawer.attach(&mut scene, surface);
        drawer
            .draw(&mut scene, &dataset(&["a", "b"]), &label_steps(Rc::new(NullAnimator)))
            .unwrap();
        assert!(scene.has_class(root, "render-area"));
        assert!(!scene.has_class(root, "bar"));
        let marked: Vec<ElementId> = scene
            .children_of(root)
            .iter()
            .copied()
            .filter(|e| scene.has_class(*e, "bar"))
            .collect();
        assert_eq!(marked, drawer.selection(&scene));
    }

    #[test]
    fn unattached_drawer_fails() {
        let mut scene = Scene::new();
        let mut drawer = Drawer::new("rect");
        let err = drawer
            .draw(&mut scene, &dataset(&["a"]), &[])
            .unwrap_err();
        assert_eq!(err, DrawError::NotAttached);
    }

    #[test]
    fn positional_identity_follows_slots() {
        let (mut scene, mut drawer) = attached();
        let steps = label_steps(Rc::new(NullAnimator));
        let ds = dataset(&["a", "b", "c"]);
        drawer.draw(&mut scene, &ds, &steps).unwrap();
        let before = drawer.selection(&scene);

        ds.set_data(dataset(&["a", "c"]).data().to_vec());
        let join = drawer.draw(&mut scene, &ds, &steps).unwrap();
        assert_eq!(join.updated, vec![0, 1]);
        assert!(join.entered.is_empty());
        assert_eq!(join.exited, vec![before[2]]);
        // The element formerly showing "b" now shows "c".
        assert_eq!(scene.attr(before[1], "label"), Some(&Value::from("c")));
        assert!(!scene.is_alive(before[2]));
    }

    #[test]
    fn keyed_identity_follows_values() {
        let mut scene = Scene::new();
        let root = scene.insert(None, "svg");
        let mut drawer = Drawer::new("rect").with_key(|d, _| {
            DatumKey::Text(d.get("name").map(ToString::to_string).unwrap_or_default())
        });
        drawer.attach(&mut scene, root);
        let steps = label_steps(Rc::new(NullAnimator));
        let ds = dataset(&["a", "b", "c"]);
        drawer.draw(&mut scene, &ds, &steps).unwrap();
        let before = drawer.selection(&scene);

        ds.set_data(dataset(&["a", "c"]).data().to_vec());
        let join = drawer.draw(&mut scene, &ds, &steps).unwrap();
        assert_eq!(join.exited, vec![before[1]]);
        assert_eq!(drawer.selection(&scene), vec![before[0], before[2]]);
    }

    #[test]
    fn duplicate_keys_enter() {
        let mut scene = Scene::new();
        let root = scene.insert(None, "svg");
        let mut drawer = Drawer::new("rect")
            .with_key(|d, _| {
                DatumKey::Text(d.get("name").map(ToString::to_string).unwrap_or_default())
            });
        drawer.attach(&mut scene, root);
        let steps = label_steps(Rc::new(NullAnimator));
        let join = drawer
            .draw(&mut scene, &dataset(&["a", "a"]), &steps)
            .unwrap();
        assert_eq!(join.entered, vec![0, 1]);
        let join = drawer
            .draw(&mut scene, &dataset(&["a", "a", "a"]), &steps)
            .unwrap();
        assert_eq!(join.updated, vec![0]);
        assert_eq!(join.entered, vec![1, 2]);
        assert_eq!(join.exited.len(), 1);
    }

    #[test]
    fn exit_removal_waits_for_exit_animation() {
        let (mut scene, mut drawer) = attached();
        let fade = EasingAnimator::new(AnimatorTiming::default().with_step_delay(0.0))
            .unwrap()
            .with_exit_attr("opacity", 0.0);
        let steps = label_steps(Rc::new(fade));
        let ds = dataset(&["a", "b"]);
        drawer.draw(&mut scene, &ds, &steps).unwrap();
        scene.settle();

        ds.set_data(dataset(&["a"]).data().to_vec());
        let join = drawer.draw(&mut scene, &ds, &steps).unwrap();
        let gone = join.exited[0];
        scene.advance_by(299.0);
        assert!(scene.is_alive(gone));
        assert!(drawer.selection_for_index(&scene, 1).is_none());
        scene.advance_by(1.0);
        assert!(!scene.is_alive(gone));
    }

    #[test]
    fn fill_is_applied_before_the_animation() {
        let (mut scene, mut drawer) = attached();
        let slow = EasingAnimator::new(AnimatorTiming::default().with_start_delay(1000.0)).unwrap();
        let steps = label_steps(Rc::new(slow));
        drawer
            .draw(&mut scene, &dataset(&["a"]), &steps)
            .unwrap();
        let e = drawer.selection_for_index(&scene, 0).unwrap();
        assert_eq!(scene.attr(e, "fill"), Some(&Value::from("#ff0000")));
        assert_eq!(scene.attr(e, "label"), None);
        scene.settle();
        assert_eq!(scene.attr(e, "label"), Some(&Value::from("a")));
    }

    #[test]
    fn steps_start_back_to_back() {
        let (mut scene, mut drawer) = attached();
        let ease = Rc::new(
            EasingAnimator::new(AnimatorTiming::default().with_step_delay(0.0)).unwrap(),
        );
        let mut steps = label_steps(ease.clone());
        steps.extend(label_steps(ease));
        let join = drawer
            .draw(&mut scene, &dataset(&["a", "b"]), &steps)
            .unwrap();
        assert_eq!(join.end, 600.0);
        assert_eq!(Drawer::total_draw_time(&steps, 2), 600.0);
    }

    #[test]
    fn whole_dataset_draws_one_primitive() {
        let mut scene = Scene::new();
        let root = scene.insert(None, "svg");
        let mut drawer = Drawer::new("path").with_class("line").with_whole_dataset();
        drawer.attach(&mut scene, root);
        let mut attrs = AttrToProjector::new();
        attrs.insert(
            "points".into(),
            Rc::new(|d: &Value, i: usize, _: &Dataset| match d {
                Value::List(items) => Value::from(format!("{} records at {i}", items.len())),
                _ => Value::Null,
            }),
        );
        let steps = [DrawStep::new(attrs, Rc::new(NullAnimator))];

        let join = drawer
            .draw(&mut scene, &dataset(&["a", "b", "c"]), &steps)
            .unwrap();
        assert_eq!(join.entered, vec![0]);
        let path = drawer.selection_for_index(&scene, 2).unwrap();
        assert_eq!(drawer.selection(&scene), vec![path]);
        assert_eq!(scene.attr(path, "points"), Some(&Value::from("3 records at 0")));

        let join = drawer.draw(&mut scene, &dataset(&[]), &steps).unwrap();
        assert_eq!((join.updated, join.exited.len()), (vec![0], 0));
        assert_eq!(scene.attr(path, "points"), Some(&Value::from("0 records at 0")));
    }

    #[test]
    fn detach_removes_everything() {
        let (mut scene, mut drawer) = attached();
        drawer
            .draw(&mut scene, &dataset(&["a"]), &label_steps(Rc::new(NullAnimator)))
            .unwrap();
        let e = drawer.selection_for_index(&scene, 0).unwrap();
        drawer.detach(&mut scene);
        assert!(!scene.is_alive(e));
        assert!(drawer.root(&scene).is_none());
    }
}
