// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

/// Errors raised by scale configuration and mapping.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ScaleError {
    /// The domain cannot be represented by this scale.
    #[error("invalid domain {domain}: {reason}")]
    InvalidDomain {
        /// Debug rendering of the rejected domain.
        domain: String,
        /// What is wrong with it.
        reason: &'static str,
    },
    /// The pixel range contains a non-finite value.
    #[error("invalid range [{start}, {end}]: range values must be finite")]
    InvalidRange {
        /// Requested range start.
        start: f64,
        /// Requested range end.
        end: f64,
    },
    /// A configuration parameter is out of bounds.
    #[error("invalid {name}: {value}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Rejected value.
        value: f64,
    },
    /// The operation is not defined for this kind of scale.
    #[error("{operation} is not supported by {scale} scales")]
    UnsupportedOperation {
        /// Scale kind name.
        scale: &'static str,
        /// The attempted operation.
        operation: &'static str,
    },
}

impl ScaleError {
    pub(crate) fn invalid_domain(domain: &impl core::fmt::Debug, reason: &'static str) -> Self {
        Self::InvalidDomain {
            domain: format!("{domain:?}"),
            reason,
        }
    }

    pub(crate) fn check_range(start: f64, end: f64) -> Result<(), Self> {
        if start.is_finite() && end.is_finite() {
            Ok(())
        } else {
            Err(Self::InvalidRange { start, end })
        }
    }
}
