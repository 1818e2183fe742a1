// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::fmt;

use kurbo::Size;

/// Measures text for layout.
///
/// Guides request space from the size of their labels. Hosts with a real text stack supply
/// their own measurer; [`HeuristicTextMeasurer`] is the dependency-free default.
pub trait TextMeasurer: fmt::Debug {
    /// The box `text` occupies at `font_size`.
    fn measure(&self, text: &str, font_size: f64) -> Size;
}

/// Estimates text size from the character count.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeuristicTextMeasurer {
    /// Average advance per character, in ems.
    pub char_width: f64,
    /// Line height, in ems.
    pub line_height: f64,
}

impl Default for HeuristicTextMeasurer {
    fn default() -> Self {
        Self {
            char_width: 0.6,
            line_height: 1.2,
        }
    }
}

impl TextMeasurer for HeuristicTextMeasurer {
    fn measure(&self, text: &str, font_size: f64) -> Size {
        if text.is_empty() {
            return Size::ZERO;
        }
        #[allow(clippy::cast_precision_loss, reason = "labels are short")]
        let chars = text.chars().count() as f64;
        Size::new(chars * self.char_width * font_size, self.line_height * font_size)
    }
}
