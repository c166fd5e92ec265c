//! Binder - Two-way synchronization between a tree and a model
//!
//! The binder wires three collaborators together: an element tree, an
//! observable [`Model`], and a [`Render`] implementation. Edits to bound
//! input elements are written back to the model; model changes re-render
//! the bound region.
//!
//! ```text
//! input event → model write → "change" event → reconcile → render
//! ```
//!
//! Dispatch is driven by CSS classes: an editable element's class names are
//! the attribute names it writes to, and a rendered element's class names
//! are the attributes it displays. The binding table (element, pre-split
//! class list) is built once at construction, so no class string is split
//! on the event path.
//!
//! Reconciliation renders in place against the live root, preserving node
//! identity for scalar changes. Sequence-valued changes first restore the
//! bound region from a pristine clone taken at construction (the "splice"),
//! because list population consumes the region's item template. When the
//! region cannot be found the binder falls back to rendering the whole
//! root.
//!
//! # Restrictions
//!
//! - Single-threaded. The tree and the model must only be touched from the
//!   thread that built them.
//! - A render that writes to an observed attribute recurses without bound.
//!   Known risk; not detected.
//! - Attaching multiple binders to overlapping trees, or several binders to
//!   one model, is unsupported and the resulting behavior is undefined.
//!
//! # Example
//!
//! ```
//! use tether::{bind, Model, dom::Element};
//! use serde_json::json;
//!
//! let root = Element::new("div");
//! let field = Element::new("input").with_class("price");
//! root.append_child(&field);
//!
//! let model = Model::from_json(json!({"price": 10}));
//! let binder = bind(&root, &model);
//!
//! field.set_value("20");
//! field.fire_input();
//! assert_eq!(model.get("price"), Some(json!("20")));
//!
//! binder.unbind();
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;
use tracing::debug;

use crate::dom::Element;
use crate::model::Model;
use crate::render::{Render, TreeRenderer};
use crate::types::{AttrMap, Cleanup, Formatter};

// =============================================================================
// TYPES
// =============================================================================

/// One entry of the binding table: an editable element and its class list,
/// split once at construction.
struct Binding {
    element: Element,
    classes: Vec<String>,
}

struct BinderInner {
    el: Element,
    /// Pristine deep clone of the root, taken at construction and never
    /// mutated. Sole source for restoring array-bound regions.
    original: Element,
    model: Model,
    renderer: Box<dyn Render>,
    formatters: RefCell<HashMap<String, Formatter>>,
    bindings: Vec<Binding>,
    subscriptions: RefCell<Vec<Cleanup>>,
}

impl Drop for BinderInner {
    fn drop(&mut self) {
        for cleanup in self.subscriptions.borrow_mut().drain(..) {
            cleanup();
        }
    }
}

/// Synchronizes an element tree with an observable model.
pub struct Binder {
    inner: Rc<BinderInner>,
}

/// Bind `root` to `model`. Equivalent to [`Binder::new`].
pub fn bind(root: &Element, model: &Model) -> Binder {
    Binder::new(root, model)
}

// =============================================================================
// CONSTRUCTION
// =============================================================================

impl Binder {
    /// Bind `root` to `model` with the default [`TreeRenderer`].
    ///
    /// Side effects: deep-clones `root` as the pristine template, builds
    /// the binding table from `root`'s editable descendants, attaches an
    /// input listener per entry, and subscribes to the model's `"change"`
    /// channel. Zero editable descendants is not an error.
    pub fn new(root: &Element, model: &Model) -> Self {
        Self::with_renderer(root, model, TreeRenderer::new())
    }

    /// Bind with a custom renderer.
    pub fn with_renderer<R>(root: &Element, model: &Model, renderer: R) -> Self
    where
        R: Render + 'static,
    {
        let bindings: Vec<Binding> = root
            .editable_elements()
            .into_iter()
            .map(|element| Binding {
                classes: element.class_list(),
                element,
            })
            .collect();
        debug!(editable = bindings.len(), "binding element tree");

        let binder = Self {
            inner: Rc::new(BinderInner {
                el: root.clone(),
                original: root.clone_deep(),
                model: model.clone(),
                renderer: Box::new(renderer),
                formatters: RefCell::new(HashMap::new()),
                bindings,
                subscriptions: RefCell::new(Vec::new()),
            }),
        };

        // Subscriptions capture a weak handle: listeners must not keep a
        // dropped binder alive through the tree or the model.
        let weak = Rc::downgrade(&binder.inner);
        let subscription = model.on("change", move |name, new, _prev| {
            if let Some(inner) = weak.upgrade() {
                Self { inner }.onchange(name, new);
            }
        });
        binder.inner.subscriptions.borrow_mut().push(subscription);

        for (index, binding) in binder.inner.bindings.iter().enumerate() {
            let weak = Rc::downgrade(&binder.inner);
            let listener = binding.element.on_input(move |_target| {
                if let Some(inner) = weak.upgrade() {
                    Self { inner }.oninput(index);
                }
            });
            binder.inner.subscriptions.borrow_mut().push(listener);
        }

        binder
    }
}

// =============================================================================
// DISPATCH
// =============================================================================

impl Binder {
    /// Input path: write the element's value to every attribute named by
    /// its class list that already exists on the model. Other classes are
    /// silently ignored. One event may update several attributes.
    fn oninput(&self, index: usize) {
        let binding = &self.inner.bindings[index];
        let value = Value::String(binding.element.input_value());

        for class in &binding.classes {
            if self.inner.model.contains(class) {
                debug!(attribute = %class, "input wrote attribute");
                self.inner.model.set(class, value.clone());
            }
        }
    }

    /// Change path: pick the render target, then render the single-key
    /// change set into it. Scalars target the whole root; sequences target
    /// the spliced region.
    fn onchange(&self, name: &str, new: &Value) {
        let target = if new.is_array() {
            self.splice(name)
        } else {
            self.inner.el.clone()
        };

        let mut changed = AttrMap::new();
        changed.insert(name.to_string(), new.clone());
        self.render_with(&target, changed);
    }

    /// Replace the live `.name` region with a fresh clone of the pristine
    /// one, discarding any prior splice state. Falls back to the whole
    /// root when either side is missing, rather than faulting.
    fn splice(&self, name: &str) -> Element {
        let Some(pristine) = self.inner.original.query_class(name) else {
            debug!(attribute = %name, "no pristine region, rendering whole root");
            return self.inner.el.clone();
        };
        let Some(live) = self.inner.el.query_class(name) else {
            debug!(attribute = %name, "no live region, rendering whole root");
            return self.inner.el.clone();
        };

        let fresh = pristine.clone_deep();
        if !live.replace_with(&fresh) {
            return self.inner.el.clone();
        }
        debug!(attribute = %name, "spliced pristine region");
        fresh
    }
}

// =============================================================================
// PUBLIC API
// =============================================================================

impl Binder {
    /// Register a display-time transform for one attribute. Chainable;
    /// overwrites any previous formatter for the same attribute.
    ///
    /// Formatters never write back into the model, and must not register
    /// further formatters from within a render pass.
    pub fn format<F>(&self, name: &str, format: F) -> &Self
    where
        F: Fn(&Value) -> Value + 'static,
    {
        self.inner
            .formatters
            .borrow_mut()
            .insert(name.to_string(), Box::new(format));
        self
    }

    /// Full re-render: snapshot every model attribute and render it into
    /// the bound root. Chainable.
    pub fn render(&self) -> &Self {
        let snapshot = self.inner.model.snapshot();
        self.render_with(&self.inner.el, snapshot)
    }

    /// Render an explicit value map into an explicit target. Formatters
    /// apply to matching keys before the renderer sees the map. Chainable.
    pub fn render_with(&self, target: &Element, mut values: AttrMap) -> &Self {
        {
            let formatters = self.inner.formatters.borrow();
            for (name, value) in values.iter_mut() {
                if let Some(format) = formatters.get(name) {
                    *value = format(value);
                }
            }
        }
        self.inner.renderer.render(target, &values);
        self
    }

    /// Tear the binding down: unsubscribe from the model and detach every
    /// input listener. Afterwards edits and model changes are inert.
    ///
    /// Dropping the last handle performs the same cleanup.
    pub fn unbind(self) {
        for cleanup in self.inner.subscriptions.borrow_mut().drain(..) {
            cleanup();
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    /// `<div><span class="price"></span><input class="price"></div>`
    fn price_tree() -> (Element, Element, Element) {
        let root = Element::new("div");
        let label = Element::new("span").with_class("price");
        let field = Element::new("input").with_class("price");
        root.append_child(&label);
        root.append_child(&field);
        (root, label, field)
    }

    #[test]
    fn test_edit_writes_model_and_rerenders() {
        let (root, label, field) = price_tree();
        let model = Model::from_json(json!({"price": 10}));
        let binder = bind(&root, &model);

        binder.render();
        assert_eq!(label.text(), "10");

        field.set_value("20");
        field.fire_input();

        assert_eq!(model.get("price"), Some(json!("20")));
        assert_eq!(label.text(), "20");
    }

    #[test]
    fn test_formatter_is_display_only() {
        let (root, label, field) = price_tree();
        let model = Model::from_json(json!({"price": 10}));
        let binder = Binder::new(&root, &model);

        binder.format("price", |value| match value {
            Value::String(text) => json!(format!("${text}")),
            other => json!(format!("${other}")),
        });

        field.set_value("20");
        field.fire_input();

        assert_eq!(label.text(), "$20");
        // The stored value is untouched.
        assert_eq!(model.get("price"), Some(json!("20")));

        // Idempotent under repeated renders with no model change.
        binder.render().render();
        assert_eq!(label.text(), "$20");
    }

    #[test]
    fn test_format_chains_and_last_wins() {
        let (root, label, _field) = price_tree();
        let model = Model::from_json(json!({"price": 10}));
        let binder = Binder::new(&root, &model);

        binder
            .format("price", |_| json!("first"))
            .format("price", |_| json!("second"))
            .render();

        assert_eq!(label.text(), "second");
    }

    #[test]
    fn test_only_existing_keys_participate() {
        let root = Element::new("div");
        let field = Element::new("input").with_classes(&["price", "currency"]);
        root.append_child(&field);

        let model = Model::from_json(json!({"price": 10}));
        let _binder = Binder::new(&root, &model);

        let changes = Rc::new(Cell::new(0));
        let changes_clone = changes.clone();
        let _count = model.on("change", move |_, _, _| {
            changes_clone.set(changes_clone.get() + 1);
        });

        field.set_value("20");
        field.fire_input();

        assert_eq!(changes.get(), 1);
        assert_eq!(model.get("price"), Some(json!("20")));
        assert!(!model.contains("currency"));
    }

    #[test]
    fn test_key_added_after_construction_participates() {
        let root = Element::new("div");
        let field = Element::new("input").with_classes(&["price", "currency"]);
        root.append_child(&field);

        let model = Model::from_json(json!({"price": 10}));
        let _binder = Binder::new(&root, &model);

        model.set("currency", json!("USD"));
        field.set_value("20");
        field.fire_input();

        assert_eq!(model.get("price"), Some(json!("20")));
        assert_eq!(model.get("currency"), Some(json!("20")));
    }

    #[test]
    fn test_list_updates_do_not_accumulate() {
        let root = Element::new("div");
        root.append_child(&Element::new("ul").with_class("items"));

        let model = Model::from_json(json!({"items": []}));
        let _binder = Binder::new(&root, &model);

        model.set("items", json!([1, 2]));
        assert_eq!(root.query_class("items").unwrap().child_count(), 2);

        model.set("items", json!([1]));
        let list = root.query_class("items").unwrap();
        assert_eq!(list.child_count(), 1);
        assert_eq!(list.first_child().unwrap().text(), "1");
    }

    #[test]
    fn test_list_template_restored_by_splice() {
        let root = Element::new("div");
        let list = Element::new("ul").with_class("todos");
        let item = Element::new("li");
        item.append_child(&Element::new("span").with_class("title"));
        list.append_child(&item);
        root.append_child(&list);

        let model = Model::from_json(json!({"todos": []}));
        let _binder = Binder::new(&root, &model);

        model.set("todos", json!([{"title": "milk"}, {"title": "bread"}]));
        let live = root.query_class("todos").unwrap();
        assert_eq!(live.child_count(), 2);
        assert_eq!(live.children()[1].query_class("title").unwrap().text(), "bread");

        // First render consumed the template; the splice restores it from
        // the pristine clone so the next sequence still renders.
        model.set("todos", json!([{"title": "eggs"}]));
        let live = root.query_class("todos").unwrap();
        assert_eq!(live.child_count(), 1);
        assert_eq!(live.children()[0].query_class("title").unwrap().text(), "eggs");
    }

    #[test]
    fn test_missing_splice_target_falls_back() {
        let (root, label, _field) = price_tree();
        let model = Model::from_json(json!({"price": 10}));
        let _binder = Binder::new(&root, &model);

        // No element carries the "ghost" class; this must degrade to a
        // whole-root render rather than fault.
        model.set("ghost", json!([1, 2, 3]));
        assert!(root.query_class("ghost").is_none());

        // The binding still works afterwards.
        model.set("price", json!(42));
        assert_eq!(label.text(), "42");
    }

    #[test]
    fn test_change_for_unknown_attribute_renders() {
        let root = Element::new("div");
        root.append_child(&Element::new("span").with_class("status"));

        let model = Model::new();
        let _binder = Binder::new(&root, &model);

        // Not validated on the change path: the value renders as-is.
        model.set("status", json!("ready"));
        assert_eq!(root.query_class("status").unwrap().text(), "ready");
    }

    #[test]
    fn test_zero_editable_descendants() {
        let root = Element::new("div");
        root.append_child(&Element::new("span").with_class("price"));

        let model = Model::from_json(json!({"price": 10}));
        let binder = Binder::new(&root, &model);
        binder.render();

        assert_eq!(root.query_class("price").unwrap().text(), "10");
    }

    #[test]
    fn test_unbind_makes_binding_inert() {
        let (root, label, field) = price_tree();
        let model = Model::from_json(json!({"price": 10}));
        let binder = bind(&root, &model);
        binder.render();

        binder.unbind();

        field.set_value("20");
        field.fire_input();
        assert_eq!(model.get("price"), Some(json!(10)));

        model.set("price", json!(30));
        assert_eq!(label.text(), "10");
    }

    #[test]
    fn test_drop_cleans_up() {
        let (root, label, field) = price_tree();
        let model = Model::from_json(json!({"price": 10}));

        {
            let binder = Binder::new(&root, &model);
            binder.render();
            assert_eq!(label.text(), "10");
        }

        field.set_value("20");
        field.fire_input();
        assert_eq!(model.get("price"), Some(json!(10)));

        model.set("price", json!(30));
        assert_eq!(label.text(), "10");
    }

    #[test]
    fn test_render_with_explicit_target() {
        let (root, label, _field) = price_tree();
        let model = Model::from_json(json!({"price": 10}));
        let binder = Binder::new(&root, &model);

        let mut values = AttrMap::new();
        values.insert("price".to_string(), json!("override"));
        binder.render_with(&root, values);

        assert_eq!(label.text(), "override");
        assert_eq!(model.get("price"), Some(json!(10)));
    }
}
