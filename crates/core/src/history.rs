//! Newest-first search over the ticket collection.

use crate::ticket::Ticket;

/// Tickets sorted by `createdAt` descending, optionally filtered.
///
/// A non-blank `query` keeps tickets whose station, model, defect code or
/// technician type contains it, ignoring case.
pub fn history(tickets: &[Ticket], query: Option<&str>) -> Vec<Ticket> {
    let needle = query
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_lowercase);

    let mut matches: Vec<Ticket> = tickets
        .iter()
        .filter(|ticket| match needle.as_deref() {
            Some(n) => matches_query(ticket, n),
            None => true,
        })
        .cloned()
        .collect();

    matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    matches
}

fn matches_query(ticket: &Ticket, needle: &str) -> bool {
    [
        &ticket.station,
        &ticket.model,
        &ticket.ng_id,
        &ticket.tech_type,
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(needle))
}
