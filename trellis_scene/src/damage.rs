// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Damage summary types returned from commit.

use crate::ElementId;

/// Elements touched since the previous [`crate::Scene::commit`].
///
/// Hosts that mirror the scene into a real backend (DOM, GPU scene graph) use this to sync
/// only what changed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Damage {
    /// Live elements whose tag, attributes, classes, text, transform, flags or children changed.
    pub changed: Vec<ElementId>,
    /// Elements removed (including every descendant of a removed subtree).
    pub removed: Vec<ElementId>,
}

impl Damage {
    /// Whether nothing changed.
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.removed.is_empty()
    }
}
