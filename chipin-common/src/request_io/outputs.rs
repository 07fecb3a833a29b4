use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::models::contribution::{Contribution, ContributionStatus};
use crate::models::event::Event;
use crate::models::expense::Expense;
use crate::models::invitation::Invitation;
use crate::stats::EventStats;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct OutputEvent {
    pub id: Uuid,
    pub title: String,
    pub event_date: SystemTime,
    pub venue: String,
    pub access_code: String,
    pub created_by: Uuid,
    pub target_amount_cents: Option<i64>,
    pub created_timestamp: SystemTime,
}

impl From<Event> for OutputEvent {
    fn from(event: Event) -> Self {
        Self {
            id: event.id,
            title: event.title,
            event_date: event.event_date,
            venue: event.venue,
            access_code: event.access_code,
            created_by: event.created_by,
            target_amount_cents: event.target_amount_cents,
            created_timestamp: event.created_timestamp,
        }
    }
}

/// The contributor-facing view of an event. The access code is the caller's
/// credential, so it is echoed back, but manager identities are not.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct OutputPublicEvent {
    pub id: Uuid,
    pub title: String,
    pub event_date: SystemTime,
    pub venue: String,
    pub access_code: String,
    pub target_amount_cents: Option<i64>,
}

impl From<Event> for OutputPublicEvent {
    fn from(event: Event) -> Self {
        Self {
            id: event.id,
            title: event.title,
            event_date: event.event_date,
            venue: event.venue,
            access_code: event.access_code,
            target_amount_cents: event.target_amount_cents,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct OutputContribution {
    pub id: Uuid,
    pub event_id: Uuid,
    pub contributor_name: String,
    pub contributor_contact: String,
    pub amount_cents: i64,
    pub amount_display: String,
    pub status: ContributionStatus,
    pub rejection_reason: Option<String>,
    pub created_timestamp: SystemTime,
}

impl From<Contribution> for OutputContribution {
    fn from(contribution: Contribution) -> Self {
        Self {
            id: contribution.id,
            event_id: contribution.event_id,
            contributor_name: contribution.contributor_name,
            contributor_contact: contribution.contributor_contact,
            amount_cents: contribution.amount_cents,
            amount_display: format_cents(contribution.amount_cents),
            status: ContributionStatus::from_i16(contribution.status)
                .unwrap_or(ContributionStatus::Pending),
            rejection_reason: contribution.rejection_reason,
            created_timestamp: contribution.created_timestamp,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct OutputExpense {
    pub id: Uuid,
    pub event_id: Uuid,
    pub description: String,
    pub category: String,
    pub amount_cents: i64,
    pub amount_display: String,
    pub expense_date: SystemTime,
    pub receipt_url: Option<String>,
    pub created_timestamp: SystemTime,
}

impl From<Expense> for OutputExpense {
    fn from(expense: Expense) -> Self {
        Self {
            id: expense.id,
            event_id: expense.event_id,
            description: expense.description,
            category: expense.category,
            amount_cents: expense.amount_cents,
            amount_display: format_cents(expense.amount_cents),
            expense_date: expense.expense_date,
            receipt_url: expense.receipt_url,
            created_timestamp: expense.created_timestamp,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct OutputInvitation {
    pub id: Uuid,
    pub event_id: Uuid,
    pub email: String,
    pub expiration: SystemTime,
}

impl From<Invitation> for OutputInvitation {
    fn from(invitation: Invitation) -> Self {
        Self {
            id: invitation.id,
            event_id: invitation.event_id,
            email: invitation.email,
            expiration: invitation.expiration,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct OutputEventStats {
    pub event_id: Uuid,
    pub total_collected_cents: i64,
    pub total_expenses_cents: i64,
    pub contributors_count: u64,
    pub pending_requests: u64,
    pub remaining_funds_cents: i64,
    pub total_collected_display: String,
    pub total_expenses_display: String,
    pub remaining_funds_display: String,
}

impl OutputEventStats {
    pub fn new(event_id: Uuid, stats: EventStats) -> Self {
        Self {
            event_id,
            total_collected_cents: stats.total_collected_cents,
            total_expenses_cents: stats.total_expenses_cents,
            contributors_count: stats.contributors_count,
            pending_requests: stats.pending_requests,
            remaining_funds_cents: stats.remaining_funds_cents,
            total_collected_display: format_cents(stats.total_collected_cents),
            total_expenses_display: format_cents(stats.total_expenses_cents),
            remaining_funds_display: format_cents(stats.remaining_funds_cents),
        }
    }
}

/// Formats fixed-point cents for display. The engine itself only ever works
/// with integer cents.
pub fn format_cents(amount_cents: i64) -> String {
    let sign = if amount_cents < 0 { "-" } else { "" };
    let magnitude = amount_cents.unsigned_abs();
    format!("{}{}.{:02}", sign, magnitude / 100, magnitude % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(0), "0.00");
        assert_eq!(format_cents(5), "0.05");
        assert_eq!(format_cents(50), "0.50");
        assert_eq!(format_cents(600_00), "600.00");
        assert_eq!(format_cents(1234_56), "1234.56");
        assert_eq!(format_cents(-30_00), "-30.00");
        assert_eq!(format_cents(-5), "-0.05");
    }
}
