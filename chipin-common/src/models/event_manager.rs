use diesel::{Insertable, Queryable};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::event::Event;
use crate::schema::event_managers;

/// Manager roles are stored as an Int2 in the database. Exactly one `Owner`
/// exists per event (the creator); redeeming an invitation grants `CoManager`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManagerRole {
    Owner,
    CoManager,
}

impl ManagerRole {
    pub fn as_i16(&self) -> i16 {
        match self {
            ManagerRole::Owner => 0,
            ManagerRole::CoManager => 1,
        }
    }

    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            0 => Some(ManagerRole::Owner),
            1 => Some(ManagerRole::CoManager),
            _ => None,
        }
    }
}

#[derive(
    Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Associations, Identifiable, Queryable,
)]
#[diesel(belongs_to(Event, foreign_key = event_id))]
#[diesel(table_name = event_managers, primary_key(event_id, user_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct EventManager {
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub role: i16,
}

#[derive(Clone, Debug, Insertable)]
#[diesel(table_name = event_managers, primary_key(event_id, user_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewEventManager {
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub role: i16,
}
