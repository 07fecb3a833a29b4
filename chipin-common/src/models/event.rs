use diesel::{Insertable, Queryable, QueryableByName};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::schema::events;

#[derive(Clone, Debug, Serialize, Deserialize, Identifiable, Queryable, QueryableByName)]
#[diesel(table_name = events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub event_date: SystemTime,
    pub venue: String,
    pub access_code: String,
    pub created_by: Uuid,
    pub target_amount_cents: Option<i64>,
    pub created_timestamp: SystemTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewEvent<'a> {
    pub id: Uuid,
    pub title: &'a str,
    pub event_date: SystemTime,
    pub venue: &'a str,
    pub access_code: &'a str,
    pub created_by: Uuid,
    pub target_amount_cents: Option<i64>,
    pub created_timestamp: SystemTime,
}
