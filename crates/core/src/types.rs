/// Ticket identifiers are opaque strings (UUID v4 when created locally).
pub type TicketId = String;

/// All timestamps are UTC epoch milliseconds.
pub type EpochMillis = i64;

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> EpochMillis {
    chrono::Utc::now().timestamp_millis()
}
