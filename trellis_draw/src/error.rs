// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

/// Errors raised while configuring animators or drawing.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum DrawError {
    /// The drawer has no live root element to draw into.
    #[error("drawer is not attached to a live scene element")]
    NotAttached,
    /// A timing parameter was negative or not a number.
    #[error("invalid animator timing: {name} = {value}")]
    InvalidTiming {
        /// The offending parameter.
        name: &'static str,
        /// Its value.
        value: f64,
    },
}
