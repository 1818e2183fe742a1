// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::borrow::Cow;

use trellis_draw::DrawError;
use trellis_scale::ScaleError;

/// Errors raised while configuring or rendering plots and guides.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum PlotError {
    /// A scale rejected a domain, range or operation.
    #[error(transparent)]
    Scale(#[from] ScaleError),
    /// A drawer could not draw.
    #[error(transparent)]
    Draw(#[from] DrawError),
    /// The plot cannot render without a projection for this attribute.
    #[error("no projection for required attribute `{0}`")]
    MissingProjection(Cow<'static, str>),
    /// A numeric setting was negative or not finite.
    #[error("invalid {name}: {value}")]
    InvalidParameter {
        /// What was being set.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },
}

impl PlotError {
    pub(crate) fn check_non_negative(name: &'static str, value: f64) -> Result<f64, Self> {
        if value.is_finite() && value >= 0.0 {
            Ok(value)
        } else {
            Err(Self::InvalidParameter { name, value })
        }
    }
}
