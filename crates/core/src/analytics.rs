//! Dashboard analytics derived from the ticket collection.
//!
//! [`compute`] is a pure function of the tickets, the known technician
//! categories, the current time and the local UTC offset used for the hourly
//! trend. Callers recompute a fresh [`AnalyticsSnapshot`] on every store
//! change and on every clock tick.

use chrono::{DateTime, FixedOffset, Timelike};
use indexmap::IndexMap;
use serde::Serialize;

use crate::ticket::{Ticket, TicketStatus};
use crate::types::EpochMillis;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Elapsed time below which a response is on track (5 minutes).
pub const URGENCY_WARNING_MS: i64 = 5 * 60_000;

/// Elapsed time from which a response is critical (15 minutes).
pub const URGENCY_CRITICAL_MS: i64 = 15 * 60_000;

// ---------------------------------------------------------------------------
// Snapshot types
// ---------------------------------------------------------------------------

/// Number of tickets created during one hour of the day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HourlyBucket {
    /// `HH:00` in the configured local offset.
    pub hour: String,
    pub count: usize,
}

/// Most frequent defect signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DefectCount {
    pub code: String,
    pub count: usize,
}

/// Ticket count for one product model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelCount {
    pub model: String,
    pub count: usize,
}

/// Roll-up state of one technician category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CategoryState {
    /// At least one open ticket of the category is still PENDING.
    Open,
    /// Open tickets exist and all of them are ACKNOWLEDGED.
    InProcess,
    /// No open tickets.
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStatus {
    pub tech_type: String,
    pub status: CategoryState,
}

/// Aggregates shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSnapshot {
    pub computed_at: EpochMillis,
    pub active_count: usize,
    pub total_count: usize,
    pub total_downtime_ms: i64,
    pub mean_response_ms: Option<i64>,
    pub hourly_trend: Vec<HourlyBucket>,
    pub top_defect: Option<DefectCount>,
    pub per_category_status: Vec<CategoryStatus>,
    pub model_distribution: Vec<ModelCount>,
}

impl AnalyticsSnapshot {
    /// `true` while any ticket is unresolved, i.e. downtime keeps growing.
    pub fn is_live(&self) -> bool {
        self.active_count > 0
    }
}

// ---------------------------------------------------------------------------
// Urgency
// ---------------------------------------------------------------------------

/// Colour band of an open ticket's elapsed time on the technician view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseUrgency {
    Normal,
    Warning,
    Critical,
}

impl ResponseUrgency {
    pub fn classify(elapsed_ms: i64) -> Self {
        if elapsed_ms < URGENCY_WARNING_MS {
            ResponseUrgency::Normal
        } else if elapsed_ms < URGENCY_CRITICAL_MS {
            ResponseUrgency::Warning
        } else {
            ResponseUrgency::Critical
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Downtime of a single ticket: until resolution, or until `now` while open.
pub fn downtime_ms(ticket: &Ticket, now: EpochMillis) -> i64 {
    (ticket.resolved_at.unwrap_or(now) - ticket.created_at).max(0)
}

/// `HH:00` label of a timestamp in the given offset.
pub fn hour_label(at: EpochMillis, offset: FixedOffset) -> String {
    let hour = DateTime::from_timestamp_millis(at)
        .map(|utc| utc.with_timezone(&offset).hour())
        .unwrap_or(0);
    format!("{hour:02}:00")
}

/// Compute every dashboard aggregate in one pass over `tickets`.
pub fn compute(
    tickets: &[Ticket],
    categories: &[String],
    now: EpochMillis,
    offset: FixedOffset,
) -> AnalyticsSnapshot {
    let mut total_downtime_ms = 0_i64;
    let mut response_total = 0_i64;
    let mut response_count = 0_i64;
    let mut hourly: IndexMap<String, usize> = IndexMap::new();
    let mut defects: IndexMap<&str, usize> = IndexMap::new();
    let mut models: IndexMap<&str, usize> = IndexMap::new();

    for ticket in tickets {
        total_downtime_ms += downtime_ms(ticket, now);

        if let Some(acknowledged_at) = ticket.acknowledged_at {
            response_total += (acknowledged_at - ticket.created_at).max(0);
            response_count += 1;
        }

        *hourly.entry(hour_label(ticket.created_at, offset)).or_default() += 1;

        if !ticket.ng_id.is_empty() {
            *defects.entry(ticket.ng_id.as_str()).or_default() += 1;
        }
        if !ticket.model.is_empty() {
            *models.entry(ticket.model.as_str()).or_default() += 1;
        }
    }

    let mut hourly_trend: Vec<HourlyBucket> = hourly
        .into_iter()
        .map(|(hour, count)| HourlyBucket { hour, count })
        .collect();
    hourly_trend.sort_by(|a, b| a.hour.cmp(&b.hour));

    AnalyticsSnapshot {
        computed_at: now,
        active_count: tickets.iter().filter(|t| t.is_open()).count(),
        total_count: tickets.len(),
        total_downtime_ms,
        mean_response_ms: (response_count > 0).then(|| response_total / response_count),
        hourly_trend,
        top_defect: top_defect(&defects),
        per_category_status: categories
            .iter()
            .map(|category| CategoryStatus {
                tech_type: category.clone(),
                status: category_state(tickets, category),
            })
            .collect(),
        model_distribution: models
            .into_iter()
            .map(|(model, count)| ModelCount {
                model: model.to_string(),
                count,
            })
            .collect(),
    }
}

/// Highest count wins; on ties the first-encountered code is kept.
fn top_defect(counts: &IndexMap<&str, usize>) -> Option<DefectCount> {
    let mut best: Option<(&str, usize)> = None;
    for (&code, &count) in counts {
        match best {
            Some((_, top)) if count <= top => {}
            _ => best = Some((code, count)),
        }
    }
    best.map(|(code, count)| DefectCount {
        code: code.to_string(),
        count,
    })
}

fn category_state(tickets: &[Ticket], category: &str) -> CategoryState {
    let open = tickets
        .iter()
        .filter(|t| t.tech_type == category && t.is_open());

    let mut state = CategoryState::Close;
    for ticket in open {
        match ticket.status {
            TicketStatus::Pending => return CategoryState::Open,
            TicketStatus::Acknowledged => state = CategoryState::InProcess,
            TicketStatus::Resolved => {}
        }
    }
    state
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const T0: EpochMillis = 1_700_000_000_000;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn ticket(id: &str, tech_type: &str, ng_id: &str, created_at: EpochMillis) -> Ticket {
        Ticket {
            id: id.into(),
            model: "DUAL MOTOR".into(),
            ng_id: ng_id.into(),
            station: "LE-04".into(),
            tech_type: tech_type.into(),
            status: TicketStatus::Pending,
            created_at,
            acknowledged_at: None,
            technician_name: None,
            resolved_at: None,
            action_taken: None,
        }
    }

    fn acknowledged(mut t: Ticket, at: EpochMillis) -> Ticket {
        t.status = TicketStatus::Acknowledged;
        t.acknowledged_at = Some(at);
        t.technician_name = Some("Budi".into());
        t
    }

    fn resolved(mut t: Ticket, at: EpochMillis) -> Ticket {
        t.status = TicketStatus::Resolved;
        t.resolved_at = Some(at);
        t.action_taken = Some("Fixed".into());
        t
    }

    #[test]
    fn open_ticket_downtime_tracks_now() {
        let tickets = vec![ticket("a", "FCT", "0.01", T0)];
        let snapshot = compute(&tickets, &[], T0 + 60_000, utc());

        assert_eq!(snapshot.total_downtime_ms, 60_000);
        assert_eq!(snapshot.active_count, 1);
        assert!(snapshot.is_live());
    }

    #[test]
    fn resolved_ticket_downtime_is_frozen() {
        let t = resolved(acknowledged(ticket("a", "FCT", "0.01", T0), T0 + 1_000), T0 + 30_000);
        let snapshot = compute(&[t], &[], T0 + 600_000, utc());

        assert_eq!(snapshot.total_downtime_ms, 30_000);
        assert_eq!(snapshot.active_count, 0);
        assert!(!snapshot.is_live());
    }

    #[test]
    fn top_defect_picks_highest_count() {
        let mut tickets = Vec::new();
        for (code, n) in [("A", 3), ("B", 5), ("C", 1)] {
            for i in 0..n {
                tickets.push(ticket(&format!("{code}{i}"), "FCT", code, T0));
            }
        }

        let snapshot = compute(&tickets, &[], T0, utc());
        assert_eq!(
            snapshot.top_defect,
            Some(DefectCount {
                code: "B".into(),
                count: 5
            })
        );
    }

    #[test]
    fn top_defect_tie_keeps_first_encountered() {
        let tickets = vec![
            ticket("1", "FCT", "X", T0),
            ticket("2", "FCT", "Y", T0),
            ticket("3", "FCT", "Y", T0),
            ticket("4", "FCT", "X", T0),
        ];
        let snapshot = compute(&tickets, &[], T0, utc());
        assert_eq!(snapshot.top_defect.unwrap().code, "X");
    }

    #[test]
    fn top_defect_absent_without_codes() {
        let tickets = vec![ticket("1", "FCT", "", T0)];
        assert!(compute(&tickets, &[], T0, utc()).top_defect.is_none());
    }

    #[test]
    fn category_status_rolls_up() {
        let categories = vec!["FCT".to_string(), "END".to_string(), "ROBOT".to_string()];
        let tickets = vec![
            acknowledged(ticket("1", "FCT", "x", T0), T0 + 1),
            ticket("2", "FCT", "x", T0),
            acknowledged(ticket("3", "END", "x", T0), T0 + 1),
            resolved(acknowledged(ticket("4", "ROBOT", "x", T0), T0 + 1), T0 + 2),
        ];

        let snapshot = compute(&tickets, &categories, T0, utc());
        let states: Vec<_> = snapshot
            .per_category_status
            .iter()
            .map(|c| (c.tech_type.as_str(), c.status))
            .collect();

        assert_eq!(
            states,
            vec![
                ("FCT", CategoryState::Open),
                ("END", CategoryState::InProcess),
                ("ROBOT", CategoryState::Close),
            ]
        );
    }

    #[test]
    fn hourly_trend_sorted_by_label() {
        let hour = 3_600_000;
        let tickets = vec![
            ticket("1", "FCT", "x", T0 + 5 * hour),
            ticket("2", "FCT", "x", T0),
            ticket("3", "FCT", "x", T0 + 5 * hour),
        ];
        let snapshot = compute(&tickets, &[], T0, utc());

        let labels: Vec<_> = snapshot.hourly_trend.iter().map(|b| b.hour.as_str()).collect();
        let mut sorted = labels.clone();
        sorted.sort();
        assert_eq!(labels, sorted);
        assert_eq!(snapshot.hourly_trend.iter().map(|b| b.count).sum::<usize>(), 3);
    }

    #[test]
    fn hour_label_uses_offset() {
        // 2023-11-14T22:13:20Z
        assert_eq!(hour_label(T0, utc()), "22:00");
        let wib = FixedOffset::east_opt(7 * 3600).unwrap();
        assert_eq!(hour_label(T0, wib), "05:00");
    }

    #[test]
    fn model_distribution_and_mean_response() {
        let mut other = ticket("2", "FCT", "x", T0);
        other.model = "HUB 16".into();
        let tickets = vec![
            acknowledged(ticket("1", "FCT", "x", T0), T0 + 4_000),
            acknowledged(other, T0 + 2_000),
            ticket("3", "FCT", "x", T0),
        ];
        let snapshot = compute(&tickets, &[], T0, utc());

        assert_eq!(snapshot.mean_response_ms, Some(3_000));
        assert_eq!(
            snapshot.model_distribution,
            vec![
                ModelCount { model: "DUAL MOTOR".into(), count: 2 },
                ModelCount { model: "HUB 16".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn urgency_bands() {
        assert_eq!(ResponseUrgency::classify(0), ResponseUrgency::Normal);
        assert_eq!(ResponseUrgency::classify(URGENCY_WARNING_MS), ResponseUrgency::Warning);
        assert_eq!(ResponseUrgency::classify(URGENCY_CRITICAL_MS), ResponseUrgency::Critical);
    }
}
