use diesel::{Insertable, Queryable};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::models::event::Event;
use crate::schema::invitations;

#[derive(
    Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Associations, Identifiable, Queryable,
)]
#[diesel(belongs_to(Event, foreign_key = event_id))]
#[diesel(table_name = invitations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Invitation {
    pub id: Uuid,
    pub token: String,
    pub event_id: Uuid,
    pub email: String,
    pub invited_by: Uuid,
    pub created_timestamp: SystemTime,
    pub expiration: SystemTime,
    pub used_at: Option<SystemTime>,
}

#[derive(Clone, Debug, Insertable)]
#[diesel(table_name = invitations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewInvitation<'a> {
    pub id: Uuid,
    pub token: &'a str,
    pub event_id: Uuid,
    pub email: &'a str,
    pub invited_by: Uuid,
    pub created_timestamp: SystemTime,
    pub expiration: SystemTime,
}
