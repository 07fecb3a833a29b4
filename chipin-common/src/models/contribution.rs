use diesel::{Insertable, Queryable};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::models::event::Event;
use crate::schema::contributions;

/// Contribution statuses are stored as an Int2 in the database. `Pending` is
/// the only non-terminal status; `Approved` and `Rejected` are terminal and
/// can never be left once entered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionStatus {
    Pending,
    Approved,
    Rejected,
}

impl ContributionStatus {
    pub fn as_i16(&self) -> i16 {
        match self {
            ContributionStatus::Pending => 0,
            ContributionStatus::Approved => 1,
            ContributionStatus::Rejected => 2,
        }
    }

    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            0 => Some(ContributionStatus::Pending),
            1 => Some(ContributionStatus::Approved),
            2 => Some(ContributionStatus::Rejected),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ContributionStatus::Pending)
    }
}

#[derive(
    Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Associations, Identifiable, Queryable,
)]
#[diesel(belongs_to(Event, foreign_key = event_id))]
#[diesel(table_name = contributions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Contribution {
    pub id: Uuid,
    pub event_id: Uuid,
    pub contributor_name: String,
    pub contributor_contact: String,
    pub amount_cents: i64,
    pub status: i16,
    pub approved_by: Option<Uuid>,
    pub rejection_reason: Option<String>,
    pub created_timestamp: SystemTime,
}

#[derive(Clone, Debug, Insertable)]
#[diesel(table_name = contributions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewContribution<'a> {
    pub id: Uuid,
    pub event_id: Uuid,
    pub contributor_name: &'a str,
    pub contributor_contact: &'a str,
    pub amount_cents: i64,
    pub status: i16,
    pub created_timestamp: SystemTime,
}
