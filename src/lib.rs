//! # tether
//!
//! Two-way data binding between element trees and observable models.
//!
//! A user edits a bound input element; the change is written back to the
//! model and a `"change"` event fires; the binder re-renders the bound
//! region from the model's current state. Dispatch is class-driven: an
//! element's CSS class names are the model attributes it binds.
//!
//! ## Architecture
//!
//! ```text
//! input event → Model::set → "change" event → Binder reconcile → Render
//! ```
//!
//! Scalar changes render in place against the live root. Sequence changes
//! first splice the bound region back to a pristine clone taken at
//! construction, because list population consumes the region's item
//! template; without the reset, stale list items would accumulate.
//!
//! ## Modules
//!
//! - [`types`] - Shared aliases (`AttrMap`, `Cleanup`, callbacks)
//! - [`dom`] - Lightweight element tree with class queries and input events
//! - [`model`] - Observable key/value attribute store
//! - [`render`] - The `Render` boundary and the default `TreeRenderer`
//! - [`binder`] - The binder wiring tree, model, and renderer together

pub mod binder;
pub mod dom;
pub mod model;
pub mod render;
pub mod types;

// Re-export commonly used items
pub use types::{AttrMap, ChangeCallback, Cleanup, Formatter, InputCallback};

pub use binder::{bind, Binder};

pub use dom::{Element, NodeFlags};

pub use model::Model;

pub use render::{display_value, Render, TreeRenderer};
