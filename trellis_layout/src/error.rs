// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::{ComponentId, InteractionId};

/// The error a component's render may return.
///
/// The chart logs it, keeps the component queued for the next frame, and carries on rendering
/// the rest of the tree.
pub type RenderError = Box<dyn core::error::Error + 'static>;

/// Errors raised by chart tree edits and configuration.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum LayoutError {
    /// The id does not name a component in this chart.
    #[error("unknown component {0:?}")]
    UnknownComponent(ComponentId),
    /// A table cell already holds a component.
    #[error("table cell ({row}, {col}) is occupied")]
    CellOccupied {
        /// Row index.
        row: usize,
        /// Column index.
        col: usize,
    },
    /// The operation needs a table or group.
    #[error("component {0:?} is not a container of the required kind")]
    NotAContainer(ComponentId),
    /// Weights must be finite and non-negative.
    #[error("invalid weight {0}")]
    InvalidWeight(f64),
    /// Padding must be finite and non-negative.
    #[error("invalid padding {0}")]
    InvalidPadding(f64),
    /// Minimums must be finite and non-negative.
    #[error("invalid minimum {0}")]
    InvalidMinimum(f64),
    /// Adding the child would make a container its own descendant.
    #[error("adding {child:?} to {container:?} would create a cycle")]
    WouldCycle {
        /// The component being added.
        child: ComponentId,
        /// The container it was added to.
        container: ComponentId,
    },
    /// A row or column index beyond what a table can hold.
    #[error("table track index {0} is out of range")]
    TrackOutOfRange(usize),
    /// A component rejected its configuration when joining a rendered tree.
    #[error("component {component:?} is misconfigured: {reason}")]
    Misconfigured {
        /// The component that failed validation.
        component: ComponentId,
        /// What it reported.
        reason: String,
    },
    /// The id does not name an attached interaction.
    #[error("unknown interaction {0:?}")]
    UnknownInteraction(InteractionId),
}

pub(crate) fn check_non_negative(
    value: f64,
    err: fn(f64) -> LayoutError,
) -> Result<f64, LayoutError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(err(value))
    }
}
