use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::validators;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputEvent {
    pub title: String,
    pub event_date: SystemTime,
    pub venue: String,
    pub target_amount_cents: Option<i64>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputEditEvent {
    pub event_id: Uuid,
    pub title: String,
    pub event_date: SystemTime,
    pub venue: String,
    pub target_amount_cents: Option<i64>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputEventId {
    pub event_id: Uuid,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputAccessCode {
    pub access_code: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputContribution {
    pub access_code: String,
    pub contributor_name: String,
    pub contributor_contact: String,
    pub amount_cents: i64,
}

impl InputContribution {
    pub fn validate_amount(&self) -> validators::Validity {
        validators::validate_amount_cents(self.amount_cents)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputContributionApproval {
    pub event_id: Uuid,
    pub contribution_id: Uuid,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputContributionRejection {
    pub event_id: Uuid,
    pub contribution_id: Uuid,
    pub reason: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputExpense {
    pub event_id: Uuid,
    pub description: String,
    pub category: String,
    pub amount_cents: i64,
    pub expense_date: SystemTime,
    pub receipt_url: Option<String>,
}

impl InputExpense {
    pub fn validate_amount(&self) -> validators::Validity {
        validators::validate_amount_cents(self.amount_cents)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputEditExpense {
    pub event_id: Uuid,
    pub expense_id: Uuid,
    pub description: String,
    pub category: String,
    pub amount_cents: i64,
    pub expense_date: SystemTime,
    pub receipt_url: Option<String>,
}

impl InputEditExpense {
    pub fn validate_amount(&self) -> validators::Validity {
        validators::validate_amount_cents(self.amount_cents)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputExpenseId {
    pub event_id: Uuid,
    pub expense_id: Uuid,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputInvitation {
    pub event_id: Uuid,
    pub email: String,
}

impl InputInvitation {
    pub fn validate_email_address(&self) -> validators::Validity {
        validators::validate_email_address(&self.email)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputInvitationToken {
    pub token: String,
}
