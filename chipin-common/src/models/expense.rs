use diesel::{Insertable, Queryable};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::models::event::Event;
use crate::schema::expenses;

#[derive(
    Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Associations, Identifiable, Queryable,
)]
#[diesel(belongs_to(Event, foreign_key = event_id))]
#[diesel(table_name = expenses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Expense {
    pub id: Uuid,
    pub event_id: Uuid,
    pub description: String,
    pub category: String,
    pub amount_cents: i64,
    pub added_by: Uuid,
    pub expense_date: SystemTime,
    pub receipt_url: Option<String>,
    pub created_timestamp: SystemTime,
}

#[derive(Clone, Debug, Insertable)]
#[diesel(table_name = expenses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewExpense<'a> {
    pub id: Uuid,
    pub event_id: Uuid,
    pub description: &'a str,
    pub category: &'a str,
    pub amount_cents: i64,
    pub added_by: Uuid,
    pub expense_date: SystemTime,
    pub receipt_url: Option<&'a str>,
    pub created_timestamp: SystemTime,
}
