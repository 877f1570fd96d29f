//! Ticket workflow bound to the store and the station's audio.

pub mod announcer;
pub mod controller;

pub use announcer::Announcer;
pub use controller::LifecycleController;
