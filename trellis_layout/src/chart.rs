// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The component tree: structure, anchoring, layout, and the render queue.

use core::fmt;

use hashbrown::{HashMap, HashSet};
use kurbo::{Point, Rect, Size, Vec2};
use smallvec::SmallVec;
use trellis_scene::{ElementId, Scene};

use crate::component::{
    Component, ComponentElements, Lifecycle, RenderCx, SetupCx, XAlignment, YAlignment,
};
use crate::error::check_non_negative;
use crate::interaction::Binding;
use crate::table::{Cells, Table};
use crate::{ComponentId, Environment, LayoutError};

/// Counts reported by one [`Chart::flush`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Components whose layout was recomputed.
    pub laid_out: usize,
    /// Leaves rendered successfully.
    pub rendered: usize,
    /// Leaves whose render failed; they stay queued.
    pub failed: usize,
}

pub(crate) enum NodeKind {
    Leaf(Box<dyn Component>),
    Table(Table),
    Group(SmallVec<[ComponentId; 4]>),
}

pub(crate) struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<ComponentId>,
    x_align: XAlignment,
    y_align: YAlignment,
    offset: Vec2,
    pub(crate) state: Lifecycle,
    elements: Option<ComponentElements>,
    hit_box: Option<ElementId>,
    /// Origin within the parent's content (or the surface, for roots).
    pub(crate) origin: Point,
    pub(crate) size: Size,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            x_align: XAlignment::default(),
            y_align: YAlignment::default(),
            offset: Vec2::ZERO,
            state: Lifecycle::Unanchored,
            elements: None,
            hit_box: None,
            origin: Point::ZERO,
            size: Size::ZERO,
        }
    }

    fn children(&self) -> SmallVec<[ComponentId; 4]> {
        match &self.kind {
            NodeKind::Leaf(_) => SmallVec::new(),
            NodeKind::Table(t) => t.children().collect(),
            NodeKind::Group(c) => c.clone(),
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub(crate) struct RootBinding {
    pub(crate) id: ComponentId,
    surface: ElementId,
    size: Size,
}

/// A forest of components laid out into drawing surfaces.
///
/// Leaves are [`Component`] implementations; tables and groups are containers owned by the
/// chart. Structure edits never touch the scene: they queue a layout, and the next
/// [`Chart::flush`] anchors new components, moves re-parented ones, and lays out and renders
/// whatever was invalidated. Only [`Chart::detach`] and [`Chart::remove`] take the scene,
/// because they release elements immediately.
///
/// ```
/// use kurbo::Size;
/// use trellis_layout::{Chart, Component, Environment, RenderCx, RenderError};
/// use trellis_scene::Scene;
///
/// #[derive(Debug)]
/// struct Title;
///
/// impl Component for Title {
///     fn requested_space(&self, _offered: Size) -> Size {
///         Size::new(0.0, 24.0)
///     }
///     fn fixed_height(&self) -> bool {
///         true
///     }
///     fn render(&mut self, cx: &mut RenderCx<'_>) -> Result<(), RenderError> {
///         let text = cx.scene.insert(Some(cx.elements.content), "text");
///         cx.scene.set_text(text, Some("Sales".into()));
///         Ok(())
///     }
/// }
///
/// let mut scene = Scene::new();
/// let svg = scene.insert(None, "svg");
/// let mut chart = Chart::new(Environment::new());
/// let title = chart.insert(Title);
/// let table = chart.add_table(vec![vec![Some(title)]]).unwrap();
///
/// let stats = chart.render_to(&mut scene, table, svg, Size::new(300.0, 200.0)).unwrap();
/// assert_eq!(stats.rendered, 1);
/// assert_eq!(chart.bounds(title).unwrap().height(), 24.0);
/// ```
pub struct Chart {
    pub(crate) env: Environment,
    pub(crate) nodes: HashMap<ComponentId, Node>,
    pub(crate) roots: Vec<RootBinding>,
    pub(crate) bindings: Vec<Binding>,
    pub(crate) next_interaction: u64,
}

impl fmt::Debug for Chart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chart")
            .field("env", &self.env)
            .field("components", &self.nodes.len())
            .field("roots", &self.roots)
            .field("interactions", &self.bindings.len())
            .finish_non_exhaustive()
    }
}

impl Chart {
    /// An empty chart allocating ids from `env`.
    pub fn new(env: Environment) -> Self {
        Self {
            env,
            nodes: HashMap::new(),
            roots: Vec::new(),
            bindings: Vec::new(),
            next_interaction: 0,
        }
    }

    /// The environment components of this chart queue their requests on.
    pub fn environment(&self) -> &Environment {
        &self.env
    }

    fn add_node(&mut self, kind: NodeKind) -> ComponentId {
        let id = self.env.allocate_id();
        self.nodes.insert(id, Node::new(kind));
        id
    }

    fn node(&self, id: ComponentId) -> Result<&Node, LayoutError> {
        self.nodes.get(&id).ok_or(LayoutError::UnknownComponent(id))
    }

    fn node_mut(&mut self, id: ComponentId) -> Result<&mut Node, LayoutError> {
        self.nodes
            .get_mut(&id)
            .ok_or(LayoutError::UnknownComponent(id))
    }

    /// Add a leaf component. It stays unanchored until it is part of a rendered tree.
    pub fn insert(&mut self, component: impl Component + 'static) -> ComponentId {
        self.add_node(NodeKind::Leaf(Box::new(component)))
    }

    /// Add a table with the given cells. `None` cells stay empty.
    pub fn add_table(
        &mut self,
        rows: Vec<Vec<Option<ComponentId>>>,
    ) -> Result<ComponentId, LayoutError> {
        for id in rows.iter().flatten().flatten() {
            self.node(*id)?;
        }
        let table = self.add_node(NodeKind::Table(Table::default()));
        for (r, row) in rows.into_iter().enumerate() {
            for (c, cell) in row.into_iter().enumerate() {
                match cell {
                    Some(child) => self.table_add(table, child, r, c)?,
                    None => {
                        if let Some(Node {
                            kind: NodeKind::Table(t),
                            ..
                        }) = self.nodes.get_mut(&table)
                        {
                            t.pad_to(r + 1, c + 1);
                        }
                    }
                }
            }
        }
        Ok(table)
    }

    /// Add a group overlaying `children` in the same bounds, later children on top.
    pub fn add_group(&mut self, children: &[ComponentId]) -> Result<ComponentId, LayoutError> {
        for id in children {
            self.node(*id)?;
        }
        let group = self.add_node(NodeKind::Group(SmallVec::new()));
        for child in children {
            self.group_append(group, *child)?;
        }
        Ok(group)
    }

    /// Whether `ancestor` is `id` or one of its ancestors.
    fn is_self_or_ancestor(&self, ancestor: ComponentId, id: ComponentId) -> bool {
        let mut cur = Some(id);
        while let Some(c) = cur {
            if c == ancestor {
                return true;
            }
            cur = self.nodes.get(&c).and_then(|n| n.parent);
        }
        false
    }

    fn check_adoptable(
        &self,
        container: ComponentId,
        child: ComponentId,
    ) -> Result<(), LayoutError> {
        self.node(child)?;
        self.node(container)?;
        if self.is_self_or_ancestor(child, container) {
            return Err(LayoutError::WouldCycle { child, container });
        }
        let tree = self.root_of(container);
        if self.roots.iter().any(|r| r.id == tree) {
            self.validate_subtree(child)?;
        }
        Ok(())
    }

    /// Ask every leaf under `id` to validate itself.
    fn validate_subtree(&self, id: ComponentId) -> Result<(), LayoutError> {
        for node_id in self.subtree(id) {
            if let Some(Node {
                kind: NodeKind::Leaf(component),
                ..
            }) = self.nodes.get(&node_id)
            {
                component
                    .validate()
                    .map_err(|err| LayoutError::Misconfigured {
                        component: node_id,
                        reason: err.to_string(),
                    })?;
            }
        }
        Ok(())
    }

    /// Put `child` in cell `(row, col)` of `table`, growing the grid as needed.
    ///
    /// A child that already has a parent is moved.
    pub fn table_add(
        &mut self,
        table: ComponentId,
        child: ComponentId,
        row: usize,
        col: usize,
    ) -> Result<(), LayoutError> {
        self.check_adoptable(table, child)?;
        match &self.node(table)?.kind {
            NodeKind::Table(t) if t.get(row, col).is_some() => {
                return Err(LayoutError::CellOccupied { row, col });
            }
            NodeKind::Table(_) => Table::check_cell(row, col)?,
            _ => return Err(LayoutError::NotAContainer(table)),
        }
        self.unlink(child);
        if let NodeKind::Table(t) = &mut self.node_mut(table)?.kind {
            t.place(child, row, col)?;
        }
        self.adopt(table, child);
        Ok(())
    }

    /// Append `child` to `group`, on top of its existing children.
    pub fn group_append(
        &mut self,
        group: ComponentId,
        child: ComponentId,
    ) -> Result<(), LayoutError> {
        self.check_adoptable(group, child)?;
        if !matches!(self.node(group)?.kind, NodeKind::Group(_)) {
            return Err(LayoutError::NotAContainer(group));
        }
        self.unlink(child);
        if let NodeKind::Group(children) = &mut self.node_mut(group)?.kind {
            children.push(child);
        }
        self.adopt(group, child);
        Ok(())
    }

    fn adopt(&mut self, container: ComponentId, child: ComponentId) {
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(container);
        }
        self.roots.retain(|r| r.id != child);
        self.env.request_layout(container);
    }

    /// Take `id` out of its container, if it has one.
    fn unlink(&mut self, id: ComponentId) {
        let Some(parent) = self.nodes.get_mut(&id).and_then(|n| n.parent.take()) else {
            return;
        };
        if let Some(node) = self.nodes.get_mut(&parent) {
            match &mut node.kind {
                NodeKind::Table(t) => {
                    t.take(id);
                }
                NodeKind::Group(children) => children.retain(|c| *c != id),
                NodeKind::Leaf(_) => {}
            }
        }
        self.env.request_layout(parent);
    }

    /// Take `id` out of its container (or surface) and release its elements.
    ///
    /// The component and its subtree stay in the chart and can be added elsewhere; they are
    /// set up again when next anchored.
    pub fn detach(&mut self, scene: &mut Scene, id: ComponentId) -> Result<(), LayoutError> {
        self.node(id)?;
        self.unlink(id);
        self.roots.retain(|r| r.id != id);
        let root_element = self.nodes.get(&id).and_then(|n| n.elements).map(|e| e.root);
        for node_id in self.subtree(id) {
            self.unanchor_one(scene, node_id);
        }
        if let Some(root) = root_element {
            scene.remove(root);
        }
        Ok(())
    }

    /// Detach `id` and drop it and its whole subtree from the chart.
    ///
    /// Interactions bound to removed components are reset and dropped.
    pub fn remove(&mut self, scene: &mut Scene, id: ComponentId) -> Result<(), LayoutError> {
        self.detach(scene, id)?;
        let removed = self.subtree(id);
        for node_id in &removed {
            self.nodes.remove(node_id);
        }
        self.drop_bindings(|component| removed.contains(&component));
        Ok(())
    }

    fn unanchor_one(&mut self, scene: &mut Scene, id: ComponentId) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        if node.state == Lifecycle::Unanchored {
            return;
        }
        if let NodeKind::Leaf(component) = &mut node.kind {
            component.removed(scene);
        }
        node.state = Lifecycle::Unanchored;
        node.elements = None;
        node.hit_box = None;
    }

    /// Set how `id` is placed when it gets more space than it uses.
    pub fn set_alignment(
        &mut self,
        id: ComponentId,
        x: XAlignment,
        y: YAlignment,
    ) -> Result<(), LayoutError> {
        let node = self.node_mut(id)?;
        node.x_align = x;
        node.y_align = y;
        self.env.request_layout(id);
        Ok(())
    }

    /// Shift `id` by `offset` pixels after alignment.
    pub fn set_offset(&mut self, id: ComponentId, offset: Vec2) -> Result<(), LayoutError> {
        self.node_mut(id)?.offset = offset;
        self.env.request_layout(id);
        Ok(())
    }

    fn table_mut(&mut self, id: ComponentId) -> Result<&mut Table, LayoutError> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Table(t) => Ok(t),
            _ => Err(LayoutError::NotAContainer(id)),
        }
    }

    fn edit_table(
        &mut self,
        id: ComponentId,
        edit: impl FnOnce(&mut Table) -> Result<(), LayoutError>,
    ) -> Result<(), LayoutError> {
        edit(self.table_mut(id)?)?;
        self.env.request_layout(id);
        Ok(())
    }

    /// Set the weight of a row. Without one, a row weighs 0 if all its occupants are
    /// fixed-height and 1 otherwise.
    pub fn set_row_weight(
        &mut self,
        table: ComponentId,
        row: usize,
        weight: f64,
    ) -> Result<(), LayoutError> {
        let weight = check_non_negative(weight, LayoutError::InvalidWeight)?;
        self.edit_table(table, |t| t.set_row_weight(row, weight))
    }

    /// Set the weight of a column. See [`Chart::set_row_weight`].
    pub fn set_column_weight(
        &mut self,
        table: ComponentId,
        col: usize,
        weight: f64,
    ) -> Result<(), LayoutError> {
        let weight = check_non_negative(weight, LayoutError::InvalidWeight)?;
        self.edit_table(table, |t| t.set_col_weight(col, weight))
    }

    /// Guarantee a row at least `minimum` pixels.
    pub fn set_row_minimum(
        &mut self,
        table: ComponentId,
        row: usize,
        minimum: f64,
    ) -> Result<(), LayoutError> {
        let minimum = check_non_negative(minimum, LayoutError::InvalidMinimum)?;
        self.edit_table(table, |t| t.set_row_minimum(row, minimum))
    }

    /// Guarantee a column at least `minimum` pixels.
    pub fn set_column_minimum(
        &mut self,
        table: ComponentId,
        col: usize,
        minimum: f64,
    ) -> Result<(), LayoutError> {
        let minimum = check_non_negative(minimum, LayoutError::InvalidMinimum)?;
        self.edit_table(table, |t| t.set_col_minimum(col, minimum))
    }

    /// Space between rows.
    pub fn set_row_padding(&mut self, table: ComponentId, padding: f64) -> Result<(), LayoutError> {
        let padding = check_non_negative(padding, LayoutError::InvalidPadding)?;
        self.edit_table(table, |t| {
            t.row_padding = padding;
            Ok(())
        })
    }

    /// Space between columns.
    pub fn set_column_padding(
        &mut self,
        table: ComponentId,
        padding: f64,
    ) -> Result<(), LayoutError> {
        let padding = check_non_negative(padding, LayoutError::InvalidPadding)?;
        self.edit_table(table, |t| {
            t.col_padding = padding;
            Ok(())
        })
    }

    /// The minimum size `id` wants out of `offered`.
    pub fn requested_space(&self, id: ComponentId, offered: Size) -> Result<Size, LayoutError> {
        self.node(id)?;
        Ok(self.space_request(id, offered))
    }

    /// Whether `id` uses exactly its requested width and height.
    pub fn is_fixed(&self, id: ComponentId) -> Result<(bool, bool), LayoutError> {
        self.node(id)?;
        Ok((Cells::fixed_width(self, id), Cells::fixed_height(self, id)))
    }

    /// The lifecycle state of `id`, or `None` if it was removed (or never existed).
    pub fn state(&self, id: ComponentId) -> Option<Lifecycle> {
        self.nodes.get(&id).map(|n| n.state)
    }

    /// The container holding `id`.
    pub fn parent(&self, id: ComponentId) -> Option<ComponentId> {
        self.nodes.get(&id)?.parent
    }

    /// The elements `id` owns while anchored.
    pub fn elements(&self, id: ComponentId) -> Option<ComponentElements> {
        self.nodes.get(&id)?.elements
    }

    /// The invisible rect interactions capture input on, once created.
    pub fn hit_box(&self, id: ComponentId) -> Option<ElementId> {
        self.nodes.get(&id)?.hit_box
    }

    /// Bounds of `id` in surface coordinates, once laid out.
    pub fn bounds(&self, id: ComponentId) -> Option<Rect> {
        world_bounds(&self.nodes, id)
    }

    /// `id` and its descendants, containers before their children.
    pub fn subtree(&self, id: ComponentId) -> Vec<ComponentId> {
        let mut out = Vec::new();
        self.collect_subtree(id, &mut out);
        out
    }

    fn collect_subtree(&self, id: ComponentId, out: &mut Vec<ComponentId>) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        out.push(id);
        for child in node.children() {
            self.collect_subtree(child, out);
        }
    }

    /// Components of every rendered tree in paint order, bottom first.
    pub(crate) fn paint_order(&self) -> Vec<ComponentId> {
        let mut out = Vec::new();
        for root in &self.roots {
            self.collect_subtree(root.id, &mut out);
        }
        out
    }

    fn root_of(&self, id: ComponentId) -> ComponentId {
        let mut cur = id;
        while let Some(parent) = self.nodes.get(&cur).and_then(|n| n.parent) {
            cur = parent;
        }
        cur
    }

    /// Anchor `root` under `surface`, lay it out at `size`, and render it.
    ///
    /// Calling again with the same arguments re-lays out and re-renders without creating new
    /// elements. A root that was inside a container is taken out of it first.
    ///
    /// Fails with [`LayoutError::Misconfigured`], leaving the chart unchanged, when a leaf of
    /// the tree rejects its configuration.
    pub fn render_to(
        &mut self,
        scene: &mut Scene,
        root: ComponentId,
        surface: ElementId,
        size: Size,
    ) -> Result<FrameStats, LayoutError> {
        self.node(root)?;
        self.validate_subtree(root)?;
        self.unlink(root);
        match self.roots.iter_mut().find(|r| r.id == root) {
            Some(binding) => {
                binding.surface = surface;
                binding.size = size;
            }
            None => self.roots.push(RootBinding {
                id: root,
                surface,
                size,
            }),
        }
        self.env.request_layout(root);
        Ok(self.flush(scene))
    }

    /// Change the size of a rendered root. Takes effect on the next flush.
    pub fn resize(&mut self, root: ComponentId, size: Size) -> Result<(), LayoutError> {
        let binding = self
            .roots
            .iter_mut()
            .find(|r| r.id == root)
            .ok_or(LayoutError::UnknownComponent(root))?;
        binding.size = size;
        self.env.request_layout(root);
        Ok(())
    }

    /// Queue the tree containing `id` for layout.
    pub fn invalidate_layout(&self, id: ComponentId) {
        self.env.request_layout(id);
    }

    /// Run one frame: anchor, lay out what was invalidated, and render what was queued.
    ///
    /// Each root is laid out at most once and each leaf rendered at most once, in tree order.
    /// A failing render is logged and queued again; it does not stop the frame.
    pub fn flush(&mut self, scene: &mut Scene) -> FrameStats {
        self.sync_anchoring(scene);
        let requests = self.env.take_requests();
        let mut stats = FrameStats::default();

        let mut to_render: HashSet<ComponentId> = HashSet::new();
        let mut laid_out_roots: SmallVec<[ComponentId; 2]> = SmallVec::new();
        for id in &requests.layout {
            let root = self.root_of(*id);
            if !laid_out_roots.contains(&root) && self.roots.iter().any(|r| r.id == root) {
                laid_out_roots.push(root);
            }
        }
        for binding in self.roots.clone() {
            if !laid_out_roots.contains(&binding.id) {
                continue;
            }
            stats.laid_out += self.compute_layout(scene, binding.id, Point::ZERO, binding.size);
            to_render.extend(self.subtree(binding.id));
        }
        for id in &requests.render {
            to_render.extend(self.subtree(*id));
        }

        let mut failed = Vec::new();
        for id in self.paint_order() {
            if !to_render.contains(&id) {
                continue;
            }
            let Some(node) = self.nodes.get_mut(&id) else {
                continue;
            };
            let (NodeKind::Leaf(component), Some(elements)) = (&mut node.kind, node.elements) else {
                continue;
            };
            if node.state < Lifecycle::LayoutComputed {
                continue;
            }
            let mut cx = RenderCx {
                id,
                env: &self.env,
                scene: &mut *scene,
                elements,
                size: node.size,
            };
            match component.render(&mut cx) {
                Ok(()) => {
                    node.state = Lifecycle::Rendered;
                    stats.rendered += 1;
                }
                Err(err) => {
                    tracing::error!(component = id.get(), error = %err, "render failed");
                    failed.push(id);
                }
            }
        }
        stats.failed = failed.len();
        for id in failed {
            self.env.request_render(id);
        }
        tracing::debug!(
            laid_out = stats.laid_out,
            rendered = stats.rendered,
            failed = stats.failed,
            "flushed frame"
        );
        stats
    }

    /// Make the element tree match the component tree.
    fn sync_anchoring(&mut self, scene: &mut Scene) {
        let mut reachable = HashSet::new();
        for binding in self.roots.clone() {
            self.anchor(scene, binding.id, binding.surface, &mut reachable);
        }
        let stale: Vec<ComponentId> = self
            .nodes
            .iter()
            .filter(|(id, n)| n.state != Lifecycle::Unanchored && !reachable.contains(*id))
            .map(|(id, _)| *id)
            .collect();
        for id in stale {
            if let Some(root) = self.nodes.get(&id).and_then(|n| n.elements).map(|e| e.root) {
                scene.remove(root);
            }
            self.unanchor_one(scene, id);
        }
    }

    fn anchor(
        &mut self,
        scene: &mut Scene,
        id: ComponentId,
        parent_element: ElementId,
        reachable: &mut HashSet<ComponentId>,
    ) {
        reachable.insert(id);
        let wants_hit_box = self.bindings.iter().any(|b| b.component == id);
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        let elements = match node.elements {
            Some(e) if scene.is_alive(e.root) => {
                if scene.parent_of(e.root) != Some(parent_element) {
                    scene.reparent(e.root, Some(parent_element));
                }
                e
            }
            _ => {
                let e = ComponentElements::create(scene, parent_element);
                node.elements = Some(e);
                node.hit_box = None;
                node.state = Lifecycle::Anchored;
                if let NodeKind::Leaf(component) = &mut node.kind {
                    component.setup(&mut SetupCx {
                        id,
                        env: &self.env,
                        scene: &mut *scene,
                        elements: e,
                    });
                }
                self.env.request_layout(id);
                e
            }
        };
        if wants_hit_box && node.hit_box.is_none() {
            let hit_box = scene.insert(Some(elements.box_container), "rect");
            scene.set_class(hit_box, "hit-box", true);
            scene.set_attr(hit_box, "fill", "#ffffff");
            scene.set_attr(hit_box, "opacity", 0.0);
            scene.set_attr(hit_box, "width", node.size.width);
            scene.set_attr(hit_box, "height", node.size.height);
            node.hit_box = Some(hit_box);
        }
        for child in node.children() {
            self.anchor(scene, child, elements.content, reachable);
        }
    }

    /// Place `id` in `available` space at `origin` and recurse. Returns the number of
    /// components laid out.
    fn compute_layout(
        &mut self,
        scene: &mut Scene,
        id: ComponentId,
        origin: Point,
        available: Size,
    ) -> usize {
        let request = self.space_request(id, available);
        let fixed = (Cells::fixed_width(self, id), Cells::fixed_height(self, id));
        let Some(node) = self.nodes.get_mut(&id) else {
            return 0;
        };
        let size = Size::new(
            if fixed.0 { available.width.min(request.width) } else { available.width },
            if fixed.1 { available.height.min(request.height) } else { available.height },
        );
        let slack = Vec2::new(
            (available.width - size.width) * node.x_align.proportion(),
            (available.height - size.height) * node.y_align.proportion(),
        );
        node.origin = origin + slack + node.offset;
        node.size = size;
        if node.state >= Lifecycle::Anchored {
            node.state = Lifecycle::LayoutComputed;
        }
        if let Some(e) = node.elements {
            scene.set_translation(e.root, node.origin.to_vec2());
        }
        if let Some(hit_box) = node.hit_box {
            scene.set_attr(hit_box, "width", size.width);
            scene.set_attr(hit_box, "height", size.height);
        }

        let group_children = match &mut node.kind {
            NodeKind::Leaf(component) => {
                component.layout_changed(size);
                return 1;
            }
            NodeKind::Group(children) => Some(children.clone()),
            NodeKind::Table(_) => None,
        };
        let frames: Vec<(ComponentId, Point, Size)> = match group_children {
            Some(children) => children.iter().map(|c| (*c, Point::ZERO, size)).collect(),
            None => self.table_frames(id, size),
        };
        let mut count = 1;
        for (child, origin, available) in frames {
            count += self.compute_layout(scene, child, origin, available);
        }
        count
    }

    fn table_frames(&self, id: ComponentId, size: Size) -> Vec<(ComponentId, Point, Size)> {
        let Some(Node {
            kind: NodeKind::Table(table),
            ..
        }) = self.nodes.get(&id)
        else {
            return Vec::new();
        };
        let mut layout = table.allocate(self, size, false);
        if layout.guaranteed_width > size.width || layout.guaranteed_height > size.height {
            tracing::warn!(
                table = id.get(),
                wanted_width = layout.guaranteed_width,
                wanted_height = layout.guaranteed_height,
                width = size.width,
                height = size.height,
                "table is over-constrained; shrinking fixed tracks"
            );
            layout = table.allocate(self, size, true);
        }
        if layout.hit_pass_cap {
            tracing::warn!(table = id.get(), "table layout stopped at the pass cap");
        }
        table.cell_frames(&layout)
    }

    fn space_request(&self, id: ComponentId, offered: Size) -> Size {
        let Some(node) = self.nodes.get(&id) else {
            return Size::ZERO;
        };
        match &node.kind {
            NodeKind::Leaf(component) => component.requested_space(offered),
            NodeKind::Table(table) => {
                let layout = table.allocate(self, offered, false);
                Size::new(layout.guaranteed_width, layout.guaranteed_height)
            }
            NodeKind::Group(children) => children.iter().fold(Size::ZERO, |acc, c| {
                let r = self.space_request(*c, offered);
                Size::new(acc.width.max(r.width), acc.height.max(r.height))
            }),
        }
    }
}

impl Cells for Chart {
    fn request(&self, id: ComponentId, offered: Size) -> Size {
        self.space_request(id, offered)
    }

    fn fixed_width(&self, id: ComponentId) -> bool {
        match self.nodes.get(&id).map(|n| &n.kind) {
            Some(NodeKind::Leaf(c)) => c.fixed_width(),
            Some(NodeKind::Table(t)) => t.fixed_width(self),
            Some(NodeKind::Group(children)) => {
                children.iter().all(|c| Cells::fixed_width(self, *c))
            }
            None => true,
        }
    }

    fn fixed_height(&self, id: ComponentId) -> bool {
        match self.nodes.get(&id).map(|n| &n.kind) {
            Some(NodeKind::Leaf(c)) => c.fixed_height(),
            Some(NodeKind::Table(t)) => t.fixed_height(self),
            Some(NodeKind::Group(children)) => {
                children.iter().all(|c| Cells::fixed_height(self, *c))
            }
            None => true,
        }
    }
}

/// Bounds of `id` in surface coordinates, summing origins up the parent chain.
pub(crate) fn world_bounds(nodes: &HashMap<ComponentId, Node>, id: ComponentId) -> Option<Rect> {
    let node = nodes.get(&id)?;
    if node.state < Lifecycle::LayoutComputed {
        return None;
    }
    let mut origin = node.origin;
    let mut cur = node.parent;
    while let Some(parent) = cur.and_then(|p| nodes.get(&p)) {
        origin += parent.origin.to_vec2();
        cur = parent.parent;
    }
    Some(Rect::from_origin_size(origin, node.size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RenderError;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    /// Records what the chart did to it.
    #[derive(Debug, Default)]
    struct Log {
        setups: Cell<usize>,
        renders: Cell<usize>,
        removals: Cell<usize>,
        sizes: RefCell<Vec<Size>>,
        fail: Cell<bool>,
        invalid: Cell<bool>,
    }

    #[derive(Debug)]
    struct Fake {
        request: Size,
        fixed: (bool, bool),
        log: Rc<Log>,
    }

    impl Fake {
        fn new(w: f64, h: f64, fixed_w: bool, fixed_h: bool) -> (Self, Rc<Log>) {
            let log = Rc::new(Log::default());
            (
                Self {
                    request: Size::new(w, h),
                    fixed: (fixed_w, fixed_h),
                    log: log.clone(),
                },
                log,
            )
        }
    }

    #[derive(Debug)]
    struct Broken;

    impl core::fmt::Display for Broken {
        fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
            f.write_str("broken")
        }
    }

    impl core::error::Error for Broken {}

    impl Component for Fake {
        fn requested_space(&self, _offered: Size) -> Size {
            self.request
        }
        fn fixed_width(&self) -> bool {
            self.fixed.0
        }
        fn fixed_height(&self) -> bool {
            self.fixed.1
        }
        fn validate(&self) -> Result<(), RenderError> {
            if self.log.invalid.get() {
                return Err(Box::new(Broken));
            }
            Ok(())
        }
        fn setup(&mut self, _cx: &mut SetupCx<'_>) {
            self.log.setups.set(self.log.setups.get() + 1);
        }
        fn layout_changed(&mut self, size: Size) {
            self.log.sizes.borrow_mut().push(size);
        }
        fn render(&mut self, _cx: &mut RenderCx<'_>) -> Result<(), RenderError> {
            if self.log.fail.get() {
                return Err(Box::new(Broken));
            }
            self.log.renders.set(self.log.renders.get() + 1);
            Ok(())
        }
        fn removed(&mut self, _scene: &mut Scene) {
            self.log.removals.set(self.log.removals.get() + 1);
        }
    }

    struct Fixture {
        scene: Scene,
        surface: ElementId,
        chart: Chart,
        table: ComponentId,
        y_axis: ComponentId,
        plot: ComponentId,
        x_axis: ComponentId,
        logs: [Rc<Log>; 3],
    }

    fn axes_and_plot() -> Fixture {
        let mut scene = Scene::new();
        let surface = scene.insert(None, "svg");
        let mut chart = Chart::new(Environment::new());
        let (y, y_log) = Fake::new(40.0, 0.0, true, false);
        let (p, p_log) = Fake::new(0.0, 0.0, false, false);
        let (x, x_log) = Fake::new(0.0, 30.0, false, true);
        let y_axis = chart.insert(y);
        let plot = chart.insert(p);
        let x_axis = chart.insert(x);
        let table = chart
            .add_table(vec![vec![Some(y_axis), Some(plot)], vec![None, Some(x_axis)]])
            .unwrap();
        Fixture {
            scene,
            surface,
            chart,
            table,
            y_axis,
            plot,
            x_axis,
            logs: [y_log, p_log, x_log],
        }
    }

    fn approx_rect(a: Rect, b: Rect) -> bool {
        [a.x0 - b.x0, a.y0 - b.y0, a.x1 - b.x1, a.y1 - b.y1]
            .iter()
            .all(|d| d.abs() < 1e-9)
    }

    #[test]
    fn axes_are_full_bleed_and_plot_takes_the_rest() {
        let mut f = axes_and_plot();
        let stats = f
            .chart
            .render_to(&mut f.scene, f.table, f.surface, Size::new(480.0, 320.0))
            .unwrap();
        assert_eq!(stats.laid_out, 4);
        assert_eq!(stats.rendered, 3);
        let plot = f.chart.bounds(f.plot).unwrap();
        assert!(approx_rect(plot, Rect::new(40.0, 0.0, 480.0, 290.0)), "{plot:?}");
        let y = f.chart.bounds(f.y_axis).unwrap();
        assert!(approx_rect(y, Rect::new(0.0, 0.0, 40.0, 290.0)), "{y:?}");
        let x = f.chart.bounds(f.x_axis).unwrap();
        assert!(approx_rect(x, Rect::new(40.0, 290.0, 480.0, 320.0)), "{x:?}");
        assert_eq!(f.chart.state(f.plot), Some(Lifecycle::Rendered));
        assert!(!f.chart.environment().has_pending_frame());
    }

    #[test]
    fn render_to_is_idempotent() {
        let mut f = axes_and_plot();
        let size = Size::new(480.0, 320.0);
        f.chart.render_to(&mut f.scene, f.table, f.surface, size).unwrap();
        let before: Vec<_> = [f.y_axis, f.plot, f.x_axis]
            .iter()
            .map(|id| f.chart.bounds(*id))
            .collect();
        let elements = f.scene.len();
        f.chart.render_to(&mut f.scene, f.table, f.surface, size).unwrap();
        let after: Vec<_> = [f.y_axis, f.plot, f.x_axis]
            .iter()
            .map(|id| f.chart.bounds(*id))
            .collect();
        assert_eq!(before, after);
        assert_eq!(f.scene.len(), elements);
        assert_eq!(f.logs[1].setups.get(), 1);
        assert_eq!(f.logs[1].renders.get(), 2);
    }

    #[test]
    fn requests_coalesce_into_one_render() {
        let mut f = axes_and_plot();
        f.chart
            .render_to(&mut f.scene, f.table, f.surface, Size::new(480.0, 320.0))
            .unwrap();
        let env = f.chart.environment().clone();
        env.request_render(f.plot);
        env.request_render(f.plot);
        let stats = f.chart.flush(&mut f.scene);
        assert_eq!(stats, FrameStats { laid_out: 0, rendered: 1, failed: 0 });
        assert_eq!(f.logs[1].renders.get(), 2);
        assert_eq!(f.chart.flush(&mut f.scene), FrameStats::default());
    }

    #[test]
    fn layout_request_relays_out_the_whole_tree() {
        let mut f = axes_and_plot();
        f.chart
            .render_to(&mut f.scene, f.table, f.surface, Size::new(480.0, 320.0))
            .unwrap();
        f.chart.invalidate_layout(f.x_axis);
        let stats = f.chart.flush(&mut f.scene);
        assert_eq!(stats.laid_out, 4);
        assert_eq!(stats.rendered, 3);
    }

    #[test]
    fn failing_render_stays_queued_and_others_still_render() {
        let mut f = axes_and_plot();
        f.logs[1].fail.set(true);
        let stats = f
            .chart
            .render_to(&mut f.scene, f.table, f.surface, Size::new(480.0, 320.0))
            .unwrap();
        assert_eq!((stats.rendered, stats.failed), (2, 1));
        assert_eq!(f.chart.state(f.plot), Some(Lifecycle::LayoutComputed));
        assert!(f.chart.environment().has_pending_frame());
        f.logs[1].fail.set(false);
        let stats = f.chart.flush(&mut f.scene);
        assert_eq!((stats.rendered, stats.failed), (1, 0));
        assert_eq!(f.chart.state(f.plot), Some(Lifecycle::Rendered));
    }

    #[test]
    fn misconfigured_leaf_is_refused_before_anything_is_anchored() {
        let mut f = axes_and_plot();
        f.logs[1].invalid.set(true);
        let err = f
            .chart
            .render_to(&mut f.scene, f.table, f.surface, Size::new(480.0, 320.0))
            .unwrap_err();
        assert_eq!(
            err,
            LayoutError::Misconfigured {
                component: f.plot,
                reason: "broken".to_owned(),
            }
        );
        assert!(f.scene.children_of(f.surface).is_empty());
        assert_eq!(f.chart.state(f.table), Some(Lifecycle::Unanchored));
        assert_eq!(f.logs[0].setups.get(), 0);

        // Fixing the configuration lets the same call succeed.
        f.logs[1].invalid.set(false);
        let stats = f
            .chart
            .render_to(&mut f.scene, f.table, f.surface, Size::new(480.0, 320.0))
            .unwrap();
        assert_eq!((stats.rendered, stats.failed), (3, 0));
    }

    #[test]
    fn misconfigured_leaf_cannot_join_a_rendered_tree() {
        let mut f = axes_and_plot();
        f.chart
            .render_to(&mut f.scene, f.table, f.surface, Size::new(480.0, 320.0))
            .unwrap();
        let (late, late_log) = Fake::new(0.0, 0.0, false, false);
        late_log.invalid.set(true);
        let late = f.chart.insert(late);
        assert!(matches!(
            f.chart.table_add(f.table, late, 0, 2),
            Err(LayoutError::Misconfigured { component, .. }) if component == late
        ));
        assert_eq!(f.chart.parent(late), None);
        // Unrendered containers accept it; the check runs when they are rendered.
        let staging = f.chart.add_group(&[late]).unwrap();
        assert_eq!(f.chart.parent(late), Some(staging));
    }

    #[test]
    fn resize_relays_out_on_next_flush() {
        let mut f = axes_and_plot();
        f.chart
            .render_to(&mut f.scene, f.table, f.surface, Size::new(480.0, 320.0))
            .unwrap();
        f.chart.resize(f.table, Size::new(200.0, 100.0)).unwrap();
        f.chart.flush(&mut f.scene);
        let plot = f.chart.bounds(f.plot).unwrap();
        assert!(approx_rect(plot, Rect::new(40.0, 0.0, 200.0, 70.0)), "{plot:?}");
        assert_eq!(f.logs[1].sizes.borrow().last(), Some(&Size::new(160.0, 70.0)));
    }

    #[test]
    fn remove_releases_elements_and_forgets_the_subtree() {
        let mut f = axes_and_plot();
        f.chart
            .render_to(&mut f.scene, f.table, f.surface, Size::new(480.0, 320.0))
            .unwrap();
        let plot_g = f.chart.elements(f.plot).unwrap().root;
        f.chart.remove(&mut f.scene, f.plot).unwrap();
        assert!(!f.scene.is_alive(plot_g));
        assert_eq!(f.chart.state(f.plot), None);
        assert_eq!(f.logs[1].removals.get(), 1);
        f.chart.flush(&mut f.scene);
        assert_eq!(f.chart.bounds(f.y_axis).unwrap().height(), 290.0);

        let table_g = f.chart.elements(f.table).unwrap().root;
        f.chart.remove(&mut f.scene, f.table).unwrap();
        assert!(!f.scene.is_alive(table_g));
        assert_eq!(f.chart.state(f.x_axis), None);
        assert_eq!(f.logs[2].removals.get(), 1);
        assert!(f.scene.children_of(f.surface).is_empty());
    }

    #[test]
    fn detached_components_can_be_re_added() {
        let mut f = axes_and_plot();
        f.chart
            .render_to(&mut f.scene, f.table, f.surface, Size::new(480.0, 320.0))
            .unwrap();
        f.chart.detach(&mut f.scene, f.x_axis).unwrap();
        assert_eq!(f.chart.state(f.x_axis), Some(Lifecycle::Unanchored));
        assert_eq!(f.chart.bounds(f.x_axis), None);
        f.chart.table_add(f.table, f.x_axis, 1, 1).unwrap();
        f.chart.flush(&mut f.scene);
        assert_eq!(f.logs[2].setups.get(), 2);
        assert_eq!(f.chart.state(f.x_axis), Some(Lifecycle::Rendered));
    }

    #[test]
    fn moving_a_child_out_of_the_rendered_tree_unanchors_it() {
        let mut f = axes_and_plot();
        f.chart
            .render_to(&mut f.scene, f.table, f.surface, Size::new(480.0, 320.0))
            .unwrap();
        let elsewhere = f.chart.add_group(&[]).unwrap();
        f.chart.group_append(elsewhere, f.plot).unwrap();
        f.chart.flush(&mut f.scene);
        assert_eq!(f.chart.state(f.plot), Some(Lifecycle::Unanchored));
        assert_eq!(f.logs[1].removals.get(), 1);
    }

    #[test]
    fn structure_errors() {
        let mut f = axes_and_plot();
        assert_eq!(
            f.chart.table_add(f.table, f.plot, 1, 1),
            Err(LayoutError::CellOccupied { row: 1, col: 1 })
        );
        assert_eq!(
            f.chart.table_add(f.plot, f.x_axis, 0, 0),
            Err(LayoutError::NotAContainer(f.plot))
        );
        let outer = f.chart.add_group(&[f.table]).unwrap();
        assert_eq!(
            f.chart.table_add(f.table, outer, 2, 0),
            Err(LayoutError::WouldCycle {
                child: outer,
                container: f.table
            })
        );
        assert_eq!(
            f.chart.table_add(f.table, f.plot, usize::MAX, 0),
            Err(LayoutError::TrackOutOfRange(usize::MAX))
        );
        assert_eq!(f.chart.parent(f.plot), Some(f.table));
        assert_eq!(
            f.chart.set_column_minimum(f.table, usize::MAX, 1.0),
            Err(LayoutError::TrackOutOfRange(usize::MAX))
        );
        assert_eq!(
            f.chart.set_row_weight(f.table, 0, -1.0),
            Err(LayoutError::InvalidWeight(-1.0))
        );
        assert!(matches!(
            f.chart.set_column_padding(f.table, f64::NAN),
            Err(LayoutError::InvalidPadding(p)) if p.is_nan()
        ));
        assert!(matches!(
            f.chart.set_row_minimum(f.table, 0, f64::INFINITY),
            Err(LayoutError::InvalidMinimum(_))
        ));
    }

    #[test]
    fn fixed_component_aligns_inside_its_cell() {
        let mut scene = Scene::new();
        let surface = scene.insert(None, "svg");
        let mut chart = Chart::new(Environment::new());
        let (background, _bg) = Fake::new(0.0, 0.0, false, false);
        let (label, _log) = Fake::new(50.0, 20.0, true, true);
        let background = chart.insert(background);
        let label = chart.insert(label);
        let group = chart.add_group(&[background, label]).unwrap();
        chart
            .set_alignment(label, XAlignment::Center, YAlignment::Bottom)
            .unwrap();
        chart.set_offset(label, Vec2::new(0.0, -5.0)).unwrap();
        chart
            .render_to(&mut scene, group, surface, Size::new(150.0, 100.0))
            .unwrap();
        assert_eq!(chart.bounds(label), Some(Rect::new(50.0, 75.0, 100.0, 95.0)));
        assert_eq!(chart.is_fixed(label), Ok((true, true)));
        assert_eq!(chart.is_fixed(group), Ok((false, false)));
        assert_eq!(chart.bounds(background), Some(Rect::new(0.0, 0.0, 150.0, 100.0)));
        assert_eq!(
            scene.translation(chart.elements(label).unwrap().root),
            Some(Vec2::new(50.0, 75.0))
        );
    }

    #[test]
    fn anchored_components_own_the_layer_elements() {
        let mut f = axes_and_plot();
        f.chart
            .render_to(&mut f.scene, f.table, f.surface, Size::new(480.0, 320.0))
            .unwrap();
        let table = f.chart.elements(f.table).unwrap();
        let plot = f.chart.elements(f.plot).unwrap();
        assert_eq!(f.scene.parent_of(table.root), Some(f.surface));
        assert_eq!(f.scene.parent_of(plot.root), Some(table.content));
        let layers: Vec<_> = f
            .scene
            .children_of(plot.root)
            .iter()
            .map(|e| f.scene.classes(*e).collect::<Vec<_>>().join(" "))
            .collect();
        assert_eq!(
            layers,
            ["background", "content", "box-container", "foreground"]
        );
    }
}
