//! DOM Module - Lightweight element tree
//!
//! A minimal stand-in for the browser DOM that the binder synchronizes:
//!
//! - **Node** - `Element` handles, class queries, deep cloning, input events
//!
//! The tree supports exactly the operations binding needs: class-based
//! selection, deep cloning for pristine templates, child replacement for
//! array splices, and per-element input listeners.

mod node;

pub use node::*;
