//! Render - The single DOM-mutation boundary
//!
//! All tree mutation driven by model state goes through the [`Render`]
//! trait. The binder never touches element text or children directly, so
//! the list-reset workaround in the change path can later be swapped for
//! incremental patching without touching dispatch logic.
//!
//! [`TreeRenderer`] is the default implementation. For every name in the
//! value map it finds the elements carrying that CSS class (the target
//! itself included) and applies the value:
//!
//! - scalar: the display string becomes the element's text content, and
//!   the value property too for form inputs
//! - sequence: the element's first child is taken as the item template;
//!   existing children are cleared and one rendered entry is appended per
//!   item
//!
//! Maps containing only a subset of keys are fine; unmatched names are
//! skipped. Note that list population consumes the item template, which is
//! why array-bound regions must be restored from a pristine clone before
//! each re-render.

use serde_json::Value;
use tracing::trace;

use crate::dom::Element;
use crate::types::AttrMap;

// =============================================================================
// Render Trait
// =============================================================================

/// Populates a target element from a map of attribute values.
pub trait Render {
    /// Apply `values` to `target` and its subtree.
    fn render(&self, target: &Element, values: &AttrMap);
}

// =============================================================================
// Tree Renderer
// =============================================================================

/// Default class-matching renderer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TreeRenderer;

impl TreeRenderer {
    /// Create a tree renderer.
    pub fn new() -> Self {
        Self
    }
}

impl Render for TreeRenderer {
    fn render(&self, target: &Element, values: &AttrMap) {
        for (name, value) in values {
            let matches = target.select_class_inclusive(name);
            trace!(attribute = %name, matches = matches.len(), "rendering attribute");
            for element in matches {
                match value {
                    Value::Array(items) => populate_list(&element, items),
                    scalar => apply_scalar(&element, scalar),
                }
            }
        }
    }
}

// =============================================================================
// Value Application
// =============================================================================

/// Display string for a scalar value: strings verbatim, null as empty,
/// everything else in JSON notation.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn apply_scalar(element: &Element, value: &Value) {
    let text = display_value(value);
    if element.is_form_input() {
        element.set_value(text.clone());
    }
    element.set_text(text);
}

/// Fill a list-bound element with one child per entry.
///
/// The first existing child acts as the item template: each entry renders
/// into a deep clone of it (objects by class, scalars as text). Without a
/// template, entries become plain `li` text children.
fn populate_list(element: &Element, items: &[Value]) {
    let template = element.first_child();
    element.clear_children();

    for item in items {
        let child = match &template {
            Some(template) => {
                let entry = template.clone_deep();
                render_entry(&entry, item);
                entry
            }
            None => Element::new("li").with_text(display_value(item)),
        };
        element.append_child(&child);
    }
}

fn render_entry(entry: &Element, item: &Value) {
    match item {
        Value::Object(fields) => {
            for (name, value) in fields {
                for element in entry.select_class_inclusive(name) {
                    match value {
                        Value::Array(nested) => populate_list(&element, nested),
                        scalar => apply_scalar(&element, scalar),
                    }
                }
            }
        }
        scalar => apply_scalar(entry, scalar),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn values(pairs: &[(&str, Value)]) -> AttrMap {
        pairs
            .iter()
            .map(|(name, value)| ((*name).to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn test_scalar_fills_matching_classes() {
        let root = Element::new("div");
        let label = Element::new("span").with_class("price");
        let field = Element::new("input").with_class("price");
        root.append_child(&label);
        root.append_child(&field);

        TreeRenderer::new().render(&root, &values(&[("price", json!(20))]));

        assert_eq!(label.text(), "20");
        assert_eq!(field.text(), "20");
        assert_eq!(field.value(), Some("20".to_string()));
    }

    #[test]
    fn test_string_values_render_unquoted() {
        let root = Element::new("div");
        let label = Element::new("span").with_class("name");
        root.append_child(&label);

        TreeRenderer::new().render(&root, &values(&[("name", json!("ada"))]));
        assert_eq!(label.text(), "ada");

        TreeRenderer::new().render(&root, &values(&[("name", Value::Null)]));
        assert_eq!(label.text(), "");
    }

    #[test]
    fn test_target_itself_matches() {
        let list = Element::new("ul").with_class("items");
        TreeRenderer::new().render(&list, &values(&[("items", json!([1, 2]))]));
        assert_eq!(list.child_count(), 2);
    }

    #[test]
    fn test_unmatched_names_are_skipped() {
        let root = Element::new("div");
        root.append_child(&Element::new("span").with_class("price"));

        // No element carries "ghost"; nothing should fault or change.
        TreeRenderer::new().render(&root, &values(&[("ghost", json!(1))]));
        assert_eq!(root.query_class("price").unwrap().text(), "");
    }

    #[test]
    fn test_list_without_template() {
        let list = Element::new("ul").with_class("items");

        TreeRenderer::new().render(&list, &values(&[("items", json!([1, 2]))]));

        let children = list.children();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].tag(), "li");
        assert_eq!(children[0].text(), "1");
        assert_eq!(children[1].text(), "2");
    }

    #[test]
    fn test_list_with_template_renders_objects() {
        let list = Element::new("ul").with_class("todos");
        let item = Element::new("li");
        item.append_child(&Element::new("span").with_class("title"));
        list.append_child(&item);

        TreeRenderer::new().render(
            &list,
            &values(&[(
                "todos",
                json!([{"title": "milk"}, {"title": "bread"}]),
            )]),
        );

        let children = list.children();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].query_class("title").unwrap().text(), "milk");
        assert_eq!(children[1].query_class("title").unwrap().text(), "bread");
    }

    #[test]
    fn test_list_population_consumes_template() {
        let list = Element::new("ul").with_class("items");
        list.append_child(&Element::new("li").with_class("entry"));

        TreeRenderer::new().render(&list, &values(&[("items", json!(["a"]))]));
        assert_eq!(list.child_count(), 1);
        assert_eq!(list.first_child().unwrap().text(), "a");

        // The template is gone now: a second render reuses rendered entries
        // as templates, which is exactly why the binder resets from the
        // pristine clone first.
        TreeRenderer::new().render(&list, &values(&[("items", json!(["b", "c"]))]));
        assert_eq!(list.child_count(), 2);
    }

    #[test]
    fn test_empty_sequence_clears() {
        let list = Element::new("ul").with_class("items");
        list.append_child(&Element::new("li").with_text("stale"));

        TreeRenderer::new().render(&list, &values(&[("items", json!([]))]));
        assert_eq!(list.child_count(), 0);
    }
}
