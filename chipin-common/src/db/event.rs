use diesel::result::DatabaseErrorKind;
use diesel::{
    dsl, BelongingToDsl, ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl,
};
use rand::Rng;
use std::time::SystemTime;
use uuid::Uuid;

use crate::db::{DaoError, DbThreadPool};
use crate::models::contribution::Contribution;
use crate::models::event::{Event, NewEvent};
use crate::models::event_manager::{EventManager, ManagerRole, NewEventManager};
use crate::models::expense::Expense;
use crate::request_io::{InputEditEvent, InputEvent};
use crate::schema::contributions as contribution_fields;
use crate::schema::contributions::dsl::contributions;
use crate::schema::event_managers as event_manager_fields;
use crate::schema::event_managers::dsl::event_managers;
use crate::schema::events as event_fields;
use crate::schema::events::dsl::events;
use crate::schema::expenses as expense_fields;
use crate::schema::expenses::dsl::expenses;
use crate::schema::invitations as invitation_fields;
use crate::schema::invitations::dsl::invitations;
use crate::stats::{self, EventStats};
use crate::threadrand::SecureRng;

pub const ACCESS_CODE_LENGTH: usize = 8;
// Uppercase alphanumerics without the easily-confused 0/O/1/I
pub const ACCESS_CODE_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

// Collision-retry budget for access code generation. The code space is large
// enough that hitting this limit indicates something is wrong with the RNG.
const ACCESS_CODE_MAX_ATTEMPTS: u32 = 16;

pub fn generate_access_code() -> String {
    (0..ACCESS_CODE_LENGTH)
        .map(|_| {
            let idx = SecureRng.gen_range(0..ACCESS_CODE_CHARSET.len());
            ACCESS_CODE_CHARSET[idx] as char
        })
        .collect()
}

pub struct Dao {
    db_thread_pool: DbThreadPool,
}

impl Dao {
    pub fn new(db_thread_pool: &DbThreadPool) -> Self {
        Self {
            db_thread_pool: db_thread_pool.clone(),
        }
    }

    /// Creates an event and registers its creator as the owner in a single
    /// transaction. Access code uniqueness is enforced by the database's
    /// unique constraint; a collision rolls the transaction back and a fresh
    /// code is tried rather than pre-checking (check-then-insert races).
    pub fn create_event(&self, event_data: &InputEvent, creator_id: Uuid) -> Result<Event, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        for _ in 0..ACCESS_CODE_MAX_ATTEMPTS {
            let access_code = generate_access_code();

            let new_event = NewEvent {
                id: Uuid::now_v7(),
                title: &event_data.title,
                event_date: event_data.event_date,
                venue: &event_data.venue,
                access_code: &access_code,
                created_by: creator_id,
                target_amount_cents: event_data.target_amount_cents,
                created_timestamp: SystemTime::now(),
            };

            let new_owner = NewEventManager {
                event_id: new_event.id,
                user_id: creator_id,
                role: ManagerRole::Owner.as_i16(),
            };

            let result = db_connection
                .build_transaction()
                .run::<_, diesel::result::Error, _>(|conn| {
                    let event = dsl::insert_into(events)
                        .values(&new_event)
                        .get_result::<Event>(conn)?;

                    dsl::insert_into(event_managers)
                        .values(&new_owner)
                        .execute(conn)?;

                    Ok(event)
                });

            match result {
                Ok(event) => return Ok(event),
                Err(diesel::result::Error::DatabaseError(
                    DatabaseErrorKind::UniqueViolation,
                    _,
                )) => continue,
                Err(e) => return Err(DaoError::from(e)),
            }
        }

        Err(DaoError::OutOfCodeRetries)
    }

    pub fn get_event(&self, event_id: Uuid) -> Result<Event, DaoError> {
        Ok(events
            .find(event_id)
            .get_result::<Event>(&mut self.db_thread_pool.get()?)?)
    }

    /// Public access-code lookup. Codes are stored uppercased, so the lookup
    /// is case-insensitive from the caller's perspective.
    pub fn get_event_by_access_code(&self, access_code: &str) -> Result<Event, DaoError> {
        Ok(events
            .filter(event_fields::access_code.eq(access_code.to_uppercase()))
            .get_result::<Event>(&mut self.db_thread_pool.get()?)?)
    }

    pub fn get_events_for_user(&self, user_id: Uuid) -> Result<Vec<Event>, DaoError> {
        Ok(events
            .inner_join(event_managers)
            .filter(event_manager_fields::user_id.eq(user_id))
            .select(event_fields::all_columns)
            .order(event_fields::created_timestamp.desc())
            .load::<Event>(&mut self.db_thread_pool.get()?)?)
    }

    /// Updates event details. The access code is immutable after creation and
    /// is deliberately absent from the update set.
    pub fn update_event(&self, event_data: &InputEditEvent) -> Result<(), DaoError> {
        let affected_row_count = dsl::update(events.find(event_data.event_id))
            .set((
                event_fields::title.eq(&event_data.title),
                event_fields::event_date.eq(event_data.event_date),
                event_fields::venue.eq(&event_data.venue),
                event_fields::target_amount_cents.eq(event_data.target_amount_cents),
            ))
            .execute(&mut self.db_thread_pool.get()?)?;

        if affected_row_count == 0 {
            return Err(DaoError::QueryFailure(diesel::result::Error::NotFound));
        }

        Ok(())
    }

    /// Destroys an event and everything it owns. Contributions, expenses,
    /// manager roles, and invitations all cascade within one transaction.
    pub fn delete_event(&self, event_id: Uuid) -> Result<(), DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        db_connection
            .build_transaction()
            .run::<_, diesel::result::Error, _>(|conn| {
                diesel::delete(
                    contributions.filter(contribution_fields::event_id.eq(event_id)),
                )
                .execute(conn)?;

                diesel::delete(expenses.filter(expense_fields::event_id.eq(event_id)))
                    .execute(conn)?;

                diesel::delete(invitations.filter(invitation_fields::event_id.eq(event_id)))
                    .execute(conn)?;

                diesel::delete(
                    event_managers.filter(event_manager_fields::event_id.eq(event_id)),
                )
                .execute(conn)?;

                let affected_row_count =
                    diesel::delete(events.find(event_id)).execute(conn)?;

                if affected_row_count == 0 {
                    return Err(diesel::result::Error::NotFound);
                }

                Ok(())
            })?;

        Ok(())
    }

    pub fn get_role(&self, event_id: Uuid, user_id: Uuid) -> Result<Option<ManagerRole>, DaoError> {
        let manager = event_managers
            .find((event_id, user_id))
            .get_result::<EventManager>(&mut self.db_thread_pool.get()?)
            .optional()?;

        Ok(manager.and_then(|m| ManagerRole::from_i16(m.role)))
    }

    /// Recomputes the event's funding statistics from the ledger. The rows
    /// are read within one transaction so the totals reflect a consistent
    /// snapshot; nothing derived is ever persisted.
    pub fn get_event_stats(&self, event_id: Uuid) -> Result<EventStats, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        let (event_contributions, event_expenses) = db_connection
            .build_transaction()
            .run::<_, diesel::result::Error, _>(|conn| {
                let event = events.find(event_id).get_result::<Event>(conn)?;

                let event_contributions =
                    Contribution::belonging_to(&event).load::<Contribution>(conn)?;
                let event_expenses = Expense::belonging_to(&event).load::<Expense>(conn)?;

                Ok((event_contributions, event_expenses))
            })?;

        Ok(stats::compute(&event_contributions, &event_expenses))
    }
}
