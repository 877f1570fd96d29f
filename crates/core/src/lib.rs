//! Andon call-center domain logic.
//!
//! Everything in this crate is synchronous and free of I/O:
//!
//! - [`ticket`]: the [`Ticket`](ticket::Ticket) record and partial patches.
//! - [`lifecycle`]: the PENDING → ACKNOWLEDGED → RESOLVED transition rules.
//! - [`analytics`]: downtime / defect / category aggregates.
//! - [`catalog`]: quick-select lists (models, lines, defect reasons, technician types).
//! - [`announcement`]: the spoken broadcast sentence.
//! - [`history`]: newest-first search over the ticket collection.

pub mod analytics;
pub mod announcement;
pub mod catalog;
pub mod error;
pub mod history;
pub mod lifecycle;
pub mod ticket;
pub mod types;
