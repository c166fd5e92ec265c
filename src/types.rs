//! Core types for tether.
//!
//! Shared aliases that flow through the whole pipeline: attribute maps,
//! event callbacks, and cleanup functions.

use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::dom::Element;

// =============================================================================
// Attribute Map
// =============================================================================

/// Ordered mapping of attribute name to value.
///
/// Values are `serde_json::Value` so scalars and sequences share one type:
/// `Value::Array` is what makes a binding list-backed, everything else is
/// rendered as a scalar. Insertion order is preserved so snapshots and
/// renders are deterministic.
pub type AttrMap = IndexMap<String, Value>;

// =============================================================================
// Cleanup Function
// =============================================================================

/// Cleanup function returned by subscriptions.
///
/// Call this to unsubscribe and release resources.
pub type Cleanup = Box<dyn FnOnce()>;

// =============================================================================
// Callback Types
// =============================================================================

/// Input event callback, invoked with the element that fired the event.
///
/// Using Rc<dyn Fn> instead of Box<dyn Fn> allows cloning callbacks
/// out of the registry before dispatch, so no node borrow is held while
/// user code runs.
pub type InputCallback = Rc<dyn Fn(&Element)>;

/// Model change callback: `(attribute name, new value, previous value)`.
pub type ChangeCallback = Rc<dyn Fn(&str, &Value, &Value)>;

/// Display-time transform for one attribute.
///
/// Applied to the value handed to the renderer; never written back into
/// the model.
pub type Formatter = Box<dyn Fn(&Value) -> Value>;
