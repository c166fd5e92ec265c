//! Node - Element tree with class queries and input events
//!
//! `Element` is a cheap-to-clone handle over one tree node. Cloning the
//! handle shares the node; `clone_deep` copies the structure. Node ids come
//! from a thread-local counter and are unique per process, so a deep clone
//! is always distinguishable from its source.
//!
//! # API
//!
//! - `Element::new(tag)` plus `with_*` builders to assemble a tree
//! - `query_class(name)` - first descendant with a CSS class
//! - `editable_elements()` - descendants matching the input-like selector
//! - `replace_with(fresh)` - swap a node inside its parent
//! - `on_input(handler)` / `fire_input()` - the input event channel
//!
//! # Example
//!
//! ```
//! use tether::dom::Element;
//!
//! let root = Element::new("div");
//! let price = Element::new("span").with_class("price");
//! root.append_child(&price);
//!
//! assert_eq!(root.query_class("price").unwrap().id(), price.id());
//! ```

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::types::{Cleanup, InputCallback};

// =============================================================================
// TYPES
// =============================================================================

bitflags::bitflags! {
    /// Per-node behavior flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct NodeFlags: u8 {
        /// Element is editable in place (the `[contenteditable]` half of the
        /// input-like selector).
        const CONTENT_EDITABLE = 1 << 0;
        /// Element is excluded from binding scans even if otherwise editable.
        const DISABLED = 1 << 1;
    }
}

/// Tags that count as form inputs for the input-like selector and for
/// value-property rendering.
const INPUT_TAGS: &[&str] = &["input", "textarea", "select"];

struct NodeData {
    id: usize,
    tag: String,
    classes: Vec<String>,
    flags: NodeFlags,
    /// Explicit form value, distinct from text content.
    value: Option<String>,
    text: String,
    children: Vec<Element>,
    parent: Weak<RefCell<NodeData>>,
    input_handlers: Vec<(usize, InputCallback)>,
    next_handler_id: usize,
}

/// Handle to one node in the element tree.
#[derive(Clone)]
pub struct Element {
    node: Rc<RefCell<NodeData>>,
}

// =============================================================================
// ID ALLOCATION
// =============================================================================

thread_local! {
    /// Counter for generating unique node ids.
    static NEXT_NODE_ID: RefCell<usize> = const { RefCell::new(0) };
}

fn allocate_node_id() -> usize {
    NEXT_NODE_ID.with(|counter| {
        let mut counter = counter.borrow_mut();
        let id = *counter;
        *counter += 1;
        id
    })
}

// =============================================================================
// CONSTRUCTION
// =============================================================================

impl Element {
    /// Create a detached element.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            node: Rc::new(RefCell::new(NodeData {
                id: allocate_node_id(),
                tag: tag.into(),
                classes: Vec::new(),
                flags: NodeFlags::empty(),
                value: None,
                text: String::new(),
                children: Vec::new(),
                parent: Weak::new(),
                input_handlers: Vec::new(),
                next_handler_id: 0,
            })),
        }
    }

    /// Add CSS classes. Whitespace-separated names in one string are split,
    /// matching `className` semantics.
    pub fn with_class(self, class: impl Into<String>) -> Self {
        let class = class.into();
        self.node
            .borrow_mut()
            .classes
            .extend(class.split_whitespace().map(str::to_string));
        self
    }

    /// Add several CSS classes.
    pub fn with_classes(self, classes: &[&str]) -> Self {
        self.node
            .borrow_mut()
            .classes
            .extend(classes.iter().flat_map(|c| c.split_whitespace().map(str::to_string)));
        self
    }

    /// Set behavior flags.
    pub fn with_flags(self, flags: NodeFlags) -> Self {
        self.node.borrow_mut().flags = flags;
        self
    }

    /// Set text content.
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.node.borrow_mut().text = text.into();
        self
    }

    /// Set the form value.
    pub fn with_value(self, value: impl Into<String>) -> Self {
        self.node.borrow_mut().value = Some(value.into());
        self
    }
}

// =============================================================================
// ACCESSORS
// =============================================================================

impl Element {
    /// Unique node id. Fresh ids are assigned on deep clones.
    pub fn id(&self) -> usize {
        self.node.borrow().id
    }

    /// Tag name.
    pub fn tag(&self) -> String {
        self.node.borrow().tag.clone()
    }

    /// Behavior flags.
    pub fn flags(&self) -> NodeFlags {
        self.node.borrow().flags
    }

    /// True when the class list contains `class`.
    pub fn has_class(&self, class: &str) -> bool {
        self.node.borrow().classes.iter().any(|c| c == class)
    }

    /// The class list, in declaration order.
    pub fn class_list(&self) -> Vec<String> {
        self.node.borrow().classes.clone()
    }

    /// Text content.
    pub fn text(&self) -> String {
        self.node.borrow().text.clone()
    }

    /// Set text content.
    pub fn set_text(&self, text: impl Into<String>) {
        self.node.borrow_mut().text = text.into();
    }

    /// Explicit form value, if one has been set.
    pub fn value(&self) -> Option<String> {
        self.node.borrow().value.clone()
    }

    /// Set the form value.
    pub fn set_value(&self, value: impl Into<String>) {
        self.node.borrow_mut().value = Some(value.into());
    }

    /// The textual value an input event reads: the explicit form value if
    /// present, otherwise the text content, otherwise the empty string.
    pub fn input_value(&self) -> String {
        let node = self.node.borrow();
        match &node.value {
            Some(value) => value.clone(),
            None => node.text.clone(),
        }
    }

    /// True when this element is a form input (`input`, `textarea`,
    /// `select`).
    pub fn is_form_input(&self) -> bool {
        let node = self.node.borrow();
        INPUT_TAGS.contains(&node.tag.as_str())
    }

    /// True when this element matches the input-like selector: a form input
    /// or a content-editable element, and not disabled.
    pub fn is_editable(&self) -> bool {
        let node = self.node.borrow();
        if node.flags.contains(NodeFlags::DISABLED) {
            return false;
        }
        INPUT_TAGS.contains(&node.tag.as_str()) || node.flags.contains(NodeFlags::CONTENT_EDITABLE)
    }

    fn same_node(&self, other: &Element) -> bool {
        Rc::ptr_eq(&self.node, &other.node)
    }
}

// =============================================================================
// TREE STRUCTURE
// =============================================================================

impl Element {
    /// Append `child` as the last child of this element.
    pub fn append_child(&self, child: &Element) {
        child.node.borrow_mut().parent = Rc::downgrade(&self.node);
        self.node.borrow_mut().children.push(child.clone());
    }

    /// Handles to all direct children.
    pub fn children(&self) -> Vec<Element> {
        self.node.borrow().children.clone()
    }

    /// Number of direct children.
    pub fn child_count(&self) -> usize {
        self.node.borrow().children.len()
    }

    /// First direct child, if any.
    pub fn first_child(&self) -> Option<Element> {
        self.node.borrow().children.first().cloned()
    }

    /// Detach and drop all children.
    pub fn clear_children(&self) {
        let children = std::mem::take(&mut self.node.borrow_mut().children);
        for child in &children {
            child.node.borrow_mut().parent = Weak::new();
        }
    }

    /// Parent element, if attached.
    pub fn parent(&self) -> Option<Element> {
        let parent = self.node.borrow().parent.upgrade()?;
        Some(Element { node: parent })
    }

    /// Replace this node with `fresh` in its parent's child list.
    ///
    /// Returns false when this node has no parent (detached or root), in
    /// which case nothing changes.
    pub fn replace_with(&self, fresh: &Element) -> bool {
        let Some(parent) = self.parent() else {
            return false;
        };
        let mut parent_node = parent.node.borrow_mut();
        let Some(slot) = parent_node
            .children
            .iter()
            .position(|child| child.same_node(self))
        else {
            return false;
        };
        fresh.node.borrow_mut().parent = Rc::downgrade(&parent.node);
        self.node.borrow_mut().parent = Weak::new();
        parent_node.children[slot] = fresh.clone();
        true
    }

    /// Deep structural clone with fresh node ids.
    ///
    /// Input listeners are not copied, matching `cloneNode` semantics: a
    /// clone starts with no subscribers.
    pub fn clone_deep(&self) -> Element {
        let (tag, classes, flags, value, text, children) = {
            let node = self.node.borrow();
            (
                node.tag.clone(),
                node.classes.clone(),
                node.flags,
                node.value.clone(),
                node.text.clone(),
                node.children.clone(),
            )
        };
        let copy = Element {
            node: Rc::new(RefCell::new(NodeData {
                id: allocate_node_id(),
                tag,
                classes,
                flags,
                value,
                text,
                children: Vec::new(),
                parent: Weak::new(),
                input_handlers: Vec::new(),
                next_handler_id: 0,
            })),
        };
        for child in &children {
            copy.append_child(&child.clone_deep());
        }
        copy
    }
}

// =============================================================================
// QUERIES
// =============================================================================

impl Element {
    /// First descendant (depth-first, excluding self) carrying CSS class
    /// `name`. Equivalent to `querySelector("." + name)`.
    pub fn query_class(&self, name: &str) -> Option<Element> {
        for child in self.children() {
            if child.has_class(name) {
                return Some(child);
            }
            if let Some(found) = child.query_class(name) {
                return Some(found);
            }
        }
        None
    }

    /// Self plus every descendant carrying CSS class `name`, in depth-first
    /// order. The render path matches against this set.
    pub fn select_class_inclusive(&self, name: &str) -> Vec<Element> {
        let mut out = Vec::new();
        if self.has_class(name) {
            out.push(self.clone());
        }
        self.collect_class(name, &mut out);
        out
    }

    fn collect_class(&self, name: &str, out: &mut Vec<Element>) {
        for child in self.children() {
            if child.has_class(name) {
                out.push(child.clone());
            }
            child.collect_class(name, out);
        }
    }

    /// All descendants matching the input-like selector, in depth-first
    /// order. Equivalent to `querySelectorAll("input, [contenteditable]")`.
    pub fn editable_elements(&self) -> Vec<Element> {
        let mut out = Vec::new();
        self.collect_editable(&mut out);
        out
    }

    fn collect_editable(&self, out: &mut Vec<Element>) {
        for child in self.children() {
            if child.is_editable() {
                out.push(child.clone());
            }
            child.collect_editable(out);
        }
    }
}

// =============================================================================
// INPUT EVENTS
// =============================================================================

impl Element {
    /// Subscribe to input events on this element.
    /// Returns a cleanup function that removes the listener.
    pub fn on_input<F>(&self, handler: F) -> Cleanup
    where
        F: Fn(&Element) + 'static,
    {
        let id = {
            let mut node = self.node.borrow_mut();
            let id = node.next_handler_id;
            node.next_handler_id += 1;
            node.input_handlers.push((id, Rc::new(handler)));
            id
        };

        let element = self.clone();
        Box::new(move || {
            element
                .node
                .borrow_mut()
                .input_handlers
                .retain(|(handler_id, _)| *handler_id != id);
        })
    }

    /// Fire an input event, dispatching to every listener in registration
    /// order.
    ///
    /// Handlers are cloned out of the registry first, so a handler may
    /// mutate this element (or add and remove listeners) without poisoning
    /// a borrow.
    pub fn fire_input(&self) {
        let handlers: Vec<InputCallback> = self
            .node
            .borrow()
            .input_handlers
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();
        for handler in handlers {
            handler(self);
        }
    }
}

impl std::fmt::Debug for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let node = self.node.borrow();
        f.debug_struct("Element")
            .field("id", &node.id)
            .field("tag", &node.tag)
            .field("classes", &node.classes)
            .field("children", &node.children.len())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
