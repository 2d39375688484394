//! Observable state shared between a form controller and whatever renders it.
//!
//! - [`ReactiveCell`]: shared, version-tracked value with subscriber
//!   notification. Clones are handles to the same value.
//! - [`Subscription`]: RAII guard that unsubscribes on drop.
//! - [`Source`]: a value read on demand from a constant, a cell, or an
//!   accessor.
//!
//! Invariants:
//!
//! 1. The version increments exactly once per write.
//! 2. Subscribers are notified in registration order, outside the value lock.
//! 3. A dropped [`Subscription`] is never called again.

mod cell;
mod source;


pub use cell::{CellId, ReactiveCell, Subscription};
pub use source::{Getter, Source};
