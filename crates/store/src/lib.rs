//! Shared ticket store with a remote source of truth and a local fallback.
//!
//! - [`TicketStore`]: in-memory ticket collection, optimistic local mutations,
//!   remote writes and change-feed reconciliation.
//! - [`CatalogStore`]: the four quick-select lists.
//! - [`LocalStore`]: one JSON document per key on disk.
//! - [`Outbox`]: writes still owed to the remote after a failure.
//! - [`RemoteBackend`]: the remote table, with [`RestBackend`] as the shipped
//!   implementation (REST reads/writes plus a realtime WebSocket feed).

pub mod catalogs;
pub mod error;
pub mod local;
pub mod outbox;
pub mod realtime;
pub mod reconnect;
pub mod remote;
pub mod rest;
pub mod tickets;
pub mod wire;

pub use catalogs::CatalogStore;
pub use error::{RemoteError, StoreError};
pub use local::LocalStore;
pub use outbox::{Outbox, PendingWrite};
pub use remote::{ChangeKind, RemoteBackend, RemoteChange};
pub use rest::{RestBackend, RestConfig};
pub use tickets::TicketStore;
