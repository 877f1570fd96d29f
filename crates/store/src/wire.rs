//! Decoding of records coming from the remote backend.
//!
//! Rows arrive as loose JSON: timestamps may be encoded as integers, floats
//! or numeric strings depending on the column type and the client that wrote
//! them, and change-feed updates may carry only some columns. Everything is
//! normalized here before it reaches the merge logic.

use andon_core::ticket::{Ticket, TicketPatch, TicketStatus};
use andon_core::types::{EpochMillis, TicketId};
use serde_json::Value;

use crate::error::RemoteError;

/// Normalize a wire timestamp to `i64` milliseconds.
///
/// Accepts JSON integers, floats (truncated) and numeric strings. Anything
/// else, including `null`, yields `None`.
pub fn millis(value: &Value) -> Option<EpochMillis> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
        }
        _ => None,
    }
}

fn text(record: &Value, field: &str) -> Option<String> {
    match record.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A remote row with every column optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteRecord {
    pub id: TicketId,
    pub model: Option<String>,
    pub ng_id: Option<String>,
    pub station: Option<String>,
    pub tech_type: Option<String>,
    pub status: Option<TicketStatus>,
    pub created_at: Option<EpochMillis>,
    pub acknowledged_at: Option<EpochMillis>,
    pub technician_name: Option<String>,
    pub resolved_at: Option<EpochMillis>,
    pub action_taken: Option<String>,
}

impl RemoteRecord {
    /// Decode a row. Only `id` is mandatory.
    pub fn decode(record: &Value) -> Result<Self, RemoteError> {
        let id = text(record, "id")
            .filter(|id| !id.is_empty())
            .ok_or_else(|| RemoteError::Decode(format!("record without id: {record}")))?;

        let status = match record.get("status") {
            Some(Value::String(s)) => Some(
                TicketStatus::parse(s)
                    .ok_or_else(|| RemoteError::Decode(format!("unknown status '{s}'")))?,
            ),
            _ => None,
        };

        let ts = |field: &str| record.get(field).and_then(millis);

        Ok(Self {
            id,
            model: text(record, "model"),
            ng_id: text(record, "ngId"),
            station: text(record, "station"),
            tech_type: text(record, "techType"),
            status,
            created_at: ts("createdAt"),
            acknowledged_at: ts("acknowledgedAt"),
            technician_name: text(record, "technicianName"),
            resolved_at: ts("resolvedAt"),
            action_taken: text(record, "actionTaken"),
        })
    }

    /// Build a full ticket. Rows without status or `createdAt` are rejected.
    pub fn into_ticket(self) -> Result<Ticket, RemoteError> {
        let status = self
            .status
            .ok_or_else(|| RemoteError::Decode(format!("ticket {} has no status", self.id)))?;
        let created_at = self
            .created_at
            .ok_or_else(|| RemoteError::Decode(format!("ticket {} has no createdAt", self.id)))?;

        Ok(Ticket {
            id: self.id,
            model: self.model.unwrap_or_default(),
            ng_id: self.ng_id.unwrap_or_default(),
            station: self.station.unwrap_or_default(),
            tech_type: self.tech_type.unwrap_or_default(),
            status,
            created_at,
            acknowledged_at: self.acknowledged_at,
            technician_name: self.technician_name,
            resolved_at: self.resolved_at,
            action_taken: self.action_taken,
        })
    }

    /// The mutable columns as a patch. Absent columns stay absent.
    pub fn patch(&self) -> TicketPatch {
        TicketPatch {
            status: self.status,
            acknowledged_at: self.acknowledged_at,
            technician_name: self.technician_name.clone(),
            resolved_at: self.resolved_at,
            action_taken: self.action_taken.clone(),
        }
    }
}

/// Decode a full row into a ticket.
pub fn decode_ticket(record: &Value) -> Result<Ticket, RemoteError> {
    RemoteRecord::decode(record)?.into_ticket()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn millis_accepts_wider_encodings() {
        assert_eq!(millis(&json!(1_700_000_000_000_i64)), Some(1_700_000_000_000));
        assert_eq!(millis(&json!(1_700_000_000_000.0)), Some(1_700_000_000_000));
        assert_eq!(millis(&json!("1700000000000")), Some(1_700_000_000_000));
        assert_eq!(millis(&json!(" 1700000000000.9 ")), Some(1_700_000_000_000));
        assert_eq!(millis(&json!(null)), None);
        assert_eq!(millis(&json!("soon")), None);
    }

    #[test]
    fn full_row_decodes_to_ticket() {
        let ticket = decode_ticket(&json!({
            "id": "t-1",
            "model": "HUB 16",
            "ngId": "0.01",
            "station": "LE-05",
            "techType": "FCT TECHNICIAN",
            "status": "ACKNOWLEDGED",
            "createdAt": "1000",
            "acknowledgedAt": 2000.0,
            "technicianName": "Budi",
            "resolvedAt": null,
        }))
        .unwrap();

        assert_eq!(ticket.status, TicketStatus::Acknowledged);
        assert_eq!(ticket.created_at, 1_000);
        assert_eq!(ticket.acknowledged_at, Some(2_000));
        assert_eq!(ticket.resolved_at, None);
        assert_eq!(ticket.technician_name.as_deref(), Some("Budi"));
    }

    #[test]
    fn partial_row_yields_sparse_patch() {
        let record = RemoteRecord::decode(&json!({"id": "t-1", "status": "RESOLVED", "resolvedAt": 9})).unwrap();
        let patch = record.patch();

        assert_eq!(patch.status, Some(TicketStatus::Resolved));
        assert_eq!(patch.resolved_at, Some(9));
        assert!(patch.technician_name.is_none());
        assert!(patch.acknowledged_at.is_none());
    }

    #[test]
    fn rejects_rows_without_id_or_with_unknown_status() {
        assert_matches!(RemoteRecord::decode(&json!({"status": "PENDING"})), Err(RemoteError::Decode(_)));
        assert_matches!(
            RemoteRecord::decode(&json!({"id": "x", "status": "OPEN"})),
            Err(RemoteError::Decode(_))
        );
        assert_matches!(decode_ticket(&json!({"id": "x"})), Err(RemoteError::Decode(_)));
    }
}
