// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::borrow::Cow;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use kurbo::Size;
use trellis_layout::{Component, ComponentId, Environment, RenderCx, RenderError, SetupCx};
use trellis_scene::{ElementId, Scene};

use crate::PlotError;
use crate::text::{HeuristicTextMeasurer, TextMeasurer};

/// A single line of text, sized to fit it exactly.
///
/// Cheap to clone; clones share the text. Changing the text re-lays out the chart.
#[derive(Clone)]
pub struct Label {
    inner: Rc<RefCell<LabelState>>,
}

struct LabelState {
    text: String,
    class: Cow<'static, str>,
    font_size: f64,
    padding: f64,
    measurer: Rc<dyn TextMeasurer>,
    anchor: Option<(ComponentId, Environment)>,
    element: Option<ElementId>,
}

impl Label {
    /// A label showing `text`.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(LabelState {
                text: text.into(),
                class: Cow::Borrowed("label"),
                font_size: 12.0,
                padding: 0.0,
                measurer: Rc::new(HeuristicTextMeasurer::default()),
                anchor: None,
                element: None,
            })),
        }
    }

    /// A larger label for chart titles.
    pub fn title(text: impl Into<String>) -> Self {
        let label = Self::new(text);
        {
            let mut state = label.inner.borrow_mut();
            state.class = Cow::Borrowed("title-label");
            state.font_size = 16.0;
        }
        label
    }

    /// Set the font size.
    pub fn with_font_size(self, size: f64) -> Result<Self, PlotError> {
        self.inner.borrow_mut().font_size = PlotError::check_non_negative("font size", size)?;
        Ok(self)
    }

    /// Set the space kept around the text on every side.
    pub fn with_padding(self, padding: f64) -> Result<Self, PlotError> {
        self.inner.borrow_mut().padding = PlotError::check_non_negative("padding", padding)?;
        Ok(self)
    }

    /// Set the class of the text element.
    pub fn with_class(self, class: impl Into<Cow<'static, str>>) -> Self {
        self.inner.borrow_mut().class = class.into();
        self
    }

    /// Measure the text with `measurer`.
    pub fn with_measurer(self, measurer: Rc<dyn TextMeasurer>) -> Self {
        self.inner.borrow_mut().measurer = measurer;
        self
    }

    /// The text shown.
    pub fn text(&self) -> String {
        self.inner.borrow().text.clone()
    }

    /// Replace the text.
    pub fn set_text(&self, text: impl Into<String>) {
        let mut state = self.inner.borrow_mut();
        state.text = text.into();
        if let Some((id, env)) = &state.anchor {
            env.request_layout(*id);
        }
    }
}

impl Component for Label {
    fn requested_space(&self, _offered: Size) -> Size {
        let state = self.inner.borrow();
        let text = state.measurer.measure(&state.text, state.font_size);
        Size::new(text.width + 2.0 * state.padding, text.height + 2.0 * state.padding)
    }

    fn fixed_width(&self) -> bool {
        true
    }

    fn fixed_height(&self) -> bool {
        true
    }

    fn setup(&mut self, cx: &mut SetupCx<'_>) {
        let mut state = self.inner.borrow_mut();
        let element = cx.scene.insert(Some(cx.elements.content), "text");
        cx.scene.set_class(element, state.class.clone(), true);
        state.element = Some(element);
        state.anchor = Some((cx.id, cx.env.clone()));
    }

    fn render(&mut self, cx: &mut RenderCx<'_>) -> Result<(), RenderError> {
        let state = self.inner.borrow();
        let Some(element) = state.element else {
            return Ok(());
        };
        cx.scene.set_attr(element, "x", cx.size.width / 2.0);
        cx.scene.set_attr(element, "y", cx.size.height / 2.0);
        cx.scene.set_attr(element, "text-anchor", "middle");
        cx.scene.set_attr(element, "dominant-baseline", "central");
        cx.scene.set_attr(element, "font-size", state.font_size);
        cx.scene.set_text(element, Some(state.text.clone()));
        Ok(())
    }

    fn removed(&mut self, _scene: &mut Scene) {
        let mut state = self.inner.borrow_mut();
        state.anchor = None;
        state.element = None;
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.borrow();
        f.debug_struct("Label")
            .field("text", &state.text)
            .field("class", &state.class)
            .field("font_size", &state.font_size)
            .field("padding", &state.padding)
            .field("anchored", &state.anchor.as_ref().map(|(id, _)| *id))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_layout::Chart;

    #[test]
    fn size_follows_text_and_padding() {
        let label = Label::new("abcd").with_padding(2.0).unwrap();
        let size = label.requested_space(Size::new(100.0, 100.0));
        assert!((size.width - (4.0 * 0.6 * 12.0 + 4.0)).abs() < 1e-9);
        assert!((size.height - (1.2 * 12.0 + 4.0)).abs() < 1e-9);
        assert!(Label::new("x").with_font_size(f64::NAN).is_err());
    }

    #[test]
    fn set_text_relayouts_and_redraws() {
        let label = Label::title("Before");
        let mut scene = Scene::new();
        let surface = scene.insert(None, "svg");
        let mut chart = Chart::new(Environment::new());
        let id = chart.insert(label.clone());
        chart
            .render_to(&mut scene, id, surface, Size::new(300.0, 100.0))
            .unwrap();
        let content = chart.elements(id).unwrap().content;
        let text = scene.children_with_class(content, "title-label")[0];
        assert_eq!(scene.text(text), Some("Before"));

        label.set_text("After!");
        assert!(chart.environment().has_pending_frame());
        chart.flush(&mut scene);
        assert_eq!(scene.text(text), Some("After!"));
        assert_eq!(label.text(), "After!");
    }
}
