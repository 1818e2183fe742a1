// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! SVG serialization of a scene subtree.

use core::fmt::Write as _;

use trellis_data::Value;

use crate::{ElementFlags, ElementId, Scene};

impl Scene {
    /// Serialize `root` and its visible descendants as SVG markup.
    ///
    /// Translations become `transform="translate(x,y)"`, classes a `class` attribute, and
    /// attributes are written in name order. Null attributes are omitted, and invisible
    /// subtrees are skipped entirely. Returns an empty string for a stale `root`.
    ///
    /// ```rust
    /// use kurbo::Vec2;
    /// use trellis_scene::Scene;
    ///
    /// let mut scene = Scene::new();
    /// let svg = scene.insert(None, "svg");
    /// let g = scene.insert(Some(svg), "g");
    /// scene.set_translation(g, Vec2::new(10.0, 0.0));
    /// let label = scene.insert(Some(g), "text");
    /// scene.set_class(label, "label", true);
    /// scene.set_text(label, Some("a < b".into()));
    /// assert_eq!(
    ///     scene.write_svg(svg),
    ///     "<svg><g transform=\"translate(10,0)\"><text class=\"label\">a &lt; b</text></g></svg>"
    /// );
    /// ```
    pub fn write_svg(&self, root: ElementId) -> String {
        let mut out = String::new();
        self.write_element(root, &mut out);
        out
    }

    fn write_element(&self, id: ElementId, out: &mut String) {
        let Some(tag) = self.tag(id) else {
            return;
        };
        if !self
            .flags(id)
            .is_some_and(|f| f.contains(ElementFlags::VISIBLE))
        {
            return;
        }
        out.push('<');
        out.push_str(tag);
        let classes: Vec<&str> = self.classes(id).collect();
        if !classes.is_empty() {
            out.push_str(" class=\"");
            escape_into(&classes.join(" "), out);
            out.push('"');
        }
        if let Some(t) = self.translation(id)
            && (t.x != 0.0 || t.y != 0.0)
        {
            let _ = write!(out, " transform=\"translate({},{})\"", t.x, t.y);
        }
        for (name, value) in self.attrs(id) {
            if value.is_null() {
                continue;
            }
            let _ = write!(out, " {name}=\"");
            match value {
                Value::Number(n) => {
                    let _ = write!(out, "{n}");
                }
                other => escape_into(&other.to_string(), out),
            }
            out.push('"');
        }
        let children = self.children_of(id);
        let text = self.text(id);
        if children.is_empty() && text.is_none() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        if let Some(text) = text {
            escape_into(text, out);
        }
        for child in children {
            self.write_element(*child, out);
        }
        let _ = write!(out, "</{tag}>");
    }
}

fn escape_into(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_are_written_in_name_order() {
        let mut scene = Scene::new();
        let r = scene.insert(None, "rect");
        scene.set_attr(r, "y", 2.5);
        scene.set_attr(r, "x", 1.0);
        scene.set_attr(r, "fill", "#ff0000");
        scene.set_attr(r, "stroke", Value::Null);
        assert_eq!(
            scene.write_svg(r),
            "<rect fill=\"#ff0000\" x=\"1\" y=\"2.5\"/>"
        );
    }

    #[test]
    fn hidden_subtrees_are_skipped() {
        let mut scene = Scene::new();
        let root = scene.insert(None, "g");
        let hidden = scene.insert(Some(root), "rect");
        scene.set_flags(hidden, ElementFlags::empty());
        assert_eq!(scene.write_svg(root), "<g/>");
        assert_eq!(scene.write_svg(hidden), "");
    }
}
