//! Andon event bus.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`. Every view, the announcer and the analytics
//!   ticker subscribe to it.
//! - [`AndonEvent`]: the envelope published for every change to the shared
//!   ticket collection and the catalog lists.

pub mod bus;

pub use bus::{AndonEvent, EventBus, EventKind, EventOrigin};
