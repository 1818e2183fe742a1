// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The leaf component contract and the contexts it is driven with.

use core::fmt;

use kurbo::{Point, Size};
use trellis_data::{Dataset, Value};
use trellis_scene::{ElementId, Scene};

use crate::{ComponentId, Environment, RenderError};

/// Horizontal placement of a component inside the space offered to it.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum XAlignment {
    /// Flush left.
    #[default]
    Left,
    /// Centered.
    Center,
    /// Flush right.
    Right,
}

/// Vertical placement of a component inside the space offered to it.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum YAlignment {
    /// Flush top.
    #[default]
    Top,
    /// Centered.
    Center,
    /// Flush bottom.
    Bottom,
}

impl XAlignment {
    /// Fraction of the leftover space placed before the component.
    pub const fn proportion(self) -> f64 {
        match self {
            Self::Left => 0.0,
            Self::Center => 0.5,
            Self::Right => 1.0,
        }
    }
}

impl YAlignment {
    /// Fraction of the leftover space placed above the component.
    pub const fn proportion(self) -> f64 {
        match self {
            Self::Top => 0.0,
            Self::Center => 0.5,
            Self::Bottom => 1.0,
        }
    }
}

/// Where a component sits in its lifecycle.
///
/// Removal is terminal and is not a state: a removed id is simply unknown to the chart.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Lifecycle {
    /// Not part of any rendered tree; owns no elements.
    Unanchored,
    /// Elements exist and `setup` has run.
    Anchored,
    /// Bounds are valid.
    LayoutComputed,
    /// Painted at least once since the last layout.
    Rendered,
}

/// The elements every anchored component owns.
///
/// `root` is a `g` translated to the component's origin. Children are drawn in this order:
/// `background`, `content`, `box_container`, `foreground`. Containers place their children's
/// roots inside `content`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ComponentElements {
    /// The component's `g`.
    pub root: ElementId,
    /// Drawn under everything else.
    pub background: ElementId,
    /// Marks, ticks, child components.
    pub content: ElementId,
    /// Outline boxes and the lazily created hit-box.
    pub box_container: ElementId,
    /// Drawn over everything else.
    pub foreground: ElementId,
}

impl ComponentElements {
    pub(crate) fn create(scene: &mut Scene, parent: ElementId) -> Self {
        let root = scene.insert(Some(parent), "g");
        scene.set_class(root, "component", true);
        let mut layer = |class: &'static str| {
            let id = scene.insert(Some(root), "g");
            scene.set_class(id, class, true);
            id
        };
        let background = layer("background");
        let content = layer("content");
        let box_container = layer("box-container");
        let foreground = layer("foreground");
        Self {
            root,
            background,
            content,
            box_container,
            foreground,
        }
    }
}

/// Context handed to [`Component::setup`] when a component is anchored.
pub struct SetupCx<'a> {
    /// The component being anchored.
    pub id: ComponentId,
    /// Shared context, for render and layout requests from listeners.
    pub env: &'a Environment,
    /// The scene the component draws into.
    pub scene: &'a mut Scene,
    /// The component's own elements.
    pub elements: ComponentElements,
}

/// Context handed to [`Component::render`].
pub struct RenderCx<'a> {
    /// The component being rendered.
    pub id: ComponentId,
    /// Shared context.
    pub env: &'a Environment,
    /// The scene the component draws into.
    pub scene: &'a mut Scene,
    /// The component's own elements.
    pub elements: ComponentElements,
    /// The component's allocated size.
    pub size: Size,
}

impl fmt::Debug for SetupCx<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetupCx")
            .field("id", &self.id)
            .field("elements", &self.elements)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for RenderCx<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderCx")
            .field("id", &self.id)
            .field("elements", &self.elements)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// A rendered datum a component can report to hover and selection logic.
#[derive(Clone, Debug)]
pub struct Entity {
    /// The component that drew it.
    pub component: ComponentId,
    /// The dataset it came from.
    pub dataset: Dataset,
    /// Index of the datum in the dataset.
    pub index: usize,
    /// The datum itself.
    pub datum: Value,
    /// Anchor point in the component's local pixel space.
    pub position: Point,
    /// The primitive drawn for it, if it is on screen.
    pub element: Option<ElementId>,
}

/// A leaf of the chart tree: axes, plots, labels, legends.
///
/// The chart drives a component through its lifecycle. It calls `setup` once per anchoring,
/// calls `layout_changed` after every layout pass, and calls `render` whenever the component
/// was queued through its [`Environment`]. `removed` runs when the component's elements leave
/// the scene.
pub trait Component: fmt::Debug {
    /// The minimum size wanted out of `offered`.
    fn requested_space(&self, offered: Size) -> Size;

    /// Whether the width is exactly the requested width rather than a minimum.
    fn fixed_width(&self) -> bool {
        false
    }

    /// Whether the height is exactly the requested height rather than a minimum.
    fn fixed_height(&self) -> bool {
        false
    }

    /// Check the configuration is complete enough to render.
    ///
    /// The chart calls this before a component joins a rendered tree and refuses the tree
    /// when it fails, so configuration errors surface at the call that caused them.
    fn validate(&self) -> Result<(), RenderError> {
        Ok(())
    }

    /// Create long-lived elements and register listeners.
    fn setup(&mut self, cx: &mut SetupCx<'_>) {
        let _ = cx;
    }

    /// The allocated size changed (or was recomputed).
    fn layout_changed(&mut self, size: Size) {
        let _ = size;
    }

    /// Paint into `cx.elements`.
    fn render(&mut self, cx: &mut RenderCx<'_>) -> Result<(), RenderError>;

    /// Release listeners and per-anchor state. The chart removes the elements itself.
    fn removed(&mut self, scene: &mut Scene) {
        let _ = scene;
    }

    /// The entity closest to `point`, given in local pixel space.
    fn nearest_entity(&self, scene: &Scene, point: Point) -> Option<Entity> {
        let _ = (scene, point);
        None
    }
}
