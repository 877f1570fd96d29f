//! Delivery of store events to connected views.

pub mod relay;

pub use relay::EventRelay;
