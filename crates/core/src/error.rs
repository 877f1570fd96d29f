use crate::ticket::TicketStatus;
use crate::types::TicketId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Ticket {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: TicketId,
        from: TicketStatus,
        to: TicketStatus,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
