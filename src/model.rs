//! Model - Observable key/value attribute store
//!
//! The application-state side of a binding: an ordered mapping of attribute
//! name to JSON value plus an event channel. Writing through [`Model::set`]
//! emits `"change"` and `"change {name}"` with
//! `(name, new value, previous value)`, which is what drives re-rendering.
//!
//! # API
//!
//! - `set(name, value)` - write an attribute and notify subscribers
//! - `get(name)` / `contains(name)` - read access
//! - `on(event, handler)` - subscribe; returns a cleanup function
//! - `to_json()` / `snapshot()` - full state snapshots
//!
//! # Example
//!
//! ```
//! use tether::Model;
//! use serde_json::json;
//!
//! let model = Model::from_json(json!({"price": 10}));
//! let _cleanup = model.on("change", |name, new, _prev| {
//!     println!("{name} is now {new}");
//! });
//! model.set("price", json!(20));
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;

use crate::types::{AttrMap, ChangeCallback, Cleanup};

// =============================================================================
// STATE
// =============================================================================

struct ModelState {
    attrs: AttrMap,
    handlers: HashMap<String, Vec<(usize, ChangeCallback)>>,
    next_id: usize,
}

/// Observable attribute store. Cloning the handle shares the state.
#[derive(Clone)]
pub struct Model {
    state: Rc<RefCell<ModelState>>,
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// CONSTRUCTION
// =============================================================================

impl Model {
    /// Create an empty model.
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(ModelState {
                attrs: AttrMap::new(),
                handlers: HashMap::new(),
                next_id: 0,
            })),
        }
    }

    /// Create a model from a JSON object. Non-object values produce an
    /// empty model.
    pub fn from_json(value: Value) -> Self {
        let model = Self::new();
        if let Value::Object(map) = value {
            let mut state = model.state.borrow_mut();
            for (name, value) in map {
                state.attrs.insert(name, value);
            }
        }
        model
    }
}

// =============================================================================
// ATTRIBUTES
// =============================================================================

impl Model {
    /// Current value of an attribute.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.state.borrow().attrs.get(name).cloned()
    }

    /// True when the attribute exists, regardless of its value.
    pub fn contains(&self, name: &str) -> bool {
        self.state.borrow().attrs.contains_key(name)
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.state.borrow().attrs.len()
    }

    /// True when the model holds no attributes.
    pub fn is_empty(&self) -> bool {
        self.state.borrow().attrs.is_empty()
    }

    /// Attribute names, in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.state.borrow().attrs.keys().cloned().collect()
    }

    /// Write an attribute and emit `"change"` and `"change {name}"` with
    /// `(name, new, prev)`. A previously absent attribute reports
    /// `Value::Null` as its previous value.
    ///
    /// Returns the previous value, if the attribute existed.
    pub fn set(&self, name: &str, value: Value) -> Option<Value> {
        let prev = self
            .state
            .borrow_mut()
            .attrs
            .insert(name.to_string(), value.clone());

        let prev_for_emit = prev.clone().unwrap_or(Value::Null);
        self.emit("change", name, &value, &prev_for_emit);
        self.emit(&format!("change {name}"), name, &value, &prev_for_emit);
        prev
    }

    /// Full snapshot as a JSON object (the `toJSON` of the original
    /// contract).
    pub fn to_json(&self) -> Value {
        let state = self.state.borrow();
        Value::Object(
            state
                .attrs
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        )
    }

    /// Full snapshot as an attribute map, for the render path.
    pub fn snapshot(&self) -> AttrMap {
        self.state.borrow().attrs.clone()
    }
}

// =============================================================================
// EVENTS
// =============================================================================

impl Model {
    /// Subscribe to an event channel (`"change"` or `"change {name}"`).
    /// Returns a cleanup function that unsubscribes.
    pub fn on<F>(&self, event: &str, handler: F) -> Cleanup
    where
        F: Fn(&str, &Value, &Value) + 'static,
    {
        let id = {
            let mut state = self.state.borrow_mut();
            let id = state.next_id;
            state.next_id += 1;
            state
                .handlers
                .entry(event.to_string())
                .or_default()
                .push((id, Rc::new(handler)));
            id
        };

        let model = self.clone();
        let event = event.to_string();
        Box::new(move || {
            let mut state = model.state.borrow_mut();
            if let Some(handlers) = state.handlers.get_mut(&event) {
                handlers.retain(|(handler_id, _)| *handler_id != id);
                if handlers.is_empty() {
                    state.handlers.remove(&event);
                }
            }
        })
    }

    /// Dispatch an event to its subscribers in registration order.
    ///
    /// Handlers are cloned out of the registry first, so a handler may
    /// subscribe or unsubscribe re-entrantly.
    pub fn emit(&self, event: &str, name: &str, new: &Value, prev: &Value) {
        let handlers: Vec<ChangeCallback> = {
            let state = self.state.borrow();
            match state.handlers.get(event) {
                Some(handlers) => handlers.iter().map(|(_, h)| h.clone()).collect(),
                None => Vec::new(),
            }
        };
        for handler in handlers {
            handler(name, new, prev);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
