use base64::engine::general_purpose::URL_SAFE_NO_PAD as b64_urlsafe;
use base64::Engine;
use diesel::{dsl, ExpressionMethods, QueryDsl, RunQueryDsl};
use rand::RngCore;
use std::time::{Duration, SystemTime};
use uuid::Uuid;

use crate::db::{DaoError, DbThreadPool};
use crate::models::event_manager::{ManagerRole, NewEventManager};
use crate::models::invitation::{Invitation, NewInvitation};
use crate::schema::event_managers::dsl::event_managers;
use crate::schema::invitations as invitation_fields;
use crate::schema::invitations::dsl::invitations;
use crate::threadrand::SecureRng;

const TOKEN_LENGTH_BYTES: usize = 32;

/// Generates an unguessable single-use token. 256 bits of CSPRNG output,
/// base64url-encoded for transport in links and request bodies.
pub fn generate_invitation_token() -> String {
    let mut bytes = [0u8; TOKEN_LENGTH_BYTES];
    SecureRng.fill_bytes(&mut bytes);
    b64_urlsafe.encode(bytes)
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

    pub fn create_invitation(
        &self,
        event_id: Uuid,
        email: &str,
        invited_by: Uuid,
        lifetime: Duration,
    ) -> Result<Invitation, DaoError> {
        let token = generate_invitation_token();
        let current_time = SystemTime::now();

        let new_invitation = NewInvitation {
            id: Uuid::now_v7(),
            token: &token,
            event_id,
            email,
            invited_by,
            created_timestamp: current_time,
            expiration: current_time + lifetime,
        };

        Ok(dsl::insert_into(invitations)
            .values(&new_invitation)
            .get_result::<Invitation>(&mut self.db_thread_pool.get()?)?)
    }

    /// Redeems a token and grants the co-manager role in one transaction.
    /// The mark-used step is a conditional update on `used_at IS NULL`, so a
    /// concurrent double-submit has exactly one winner; the loser gets
    /// `InvitationAlreadyUsed`. An expired token rolls the whole transaction
    /// back and grants nothing.
    pub fn redeem_invitation(&self, token: &str, redeemer_id: Uuid) -> Result<Uuid, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        db_connection
            .build_transaction()
            .run::<_, DaoError, _>(|conn| {
                let marked_used = dsl::update(
                    invitations
                        .filter(invitation_fields::token.eq(token))
                        .filter(invitation_fields::used_at.is_null()),
                )
                .set(invitation_fields::used_at.eq(SystemTime::now()))
                .get_result::<Invitation>(conn);

                let invitation = match marked_used {
                    Ok(i) => i,
                    Err(diesel::result::Error::NotFound) => {
                        // Distinguish an unknown token from a spent one
                        let exists = invitations
                            .filter(invitation_fields::token.eq(token))
                            .count()
                            .get_result::<i64>(conn)?;

                        if exists > 0 {
                            return Err(DaoError::InvitationAlreadyUsed);
                        }

                        return Err(DaoError::QueryFailure(diesel::result::Error::NotFound));
                    }
                    Err(e) => return Err(DaoError::from(e)),
                };

                if SystemTime::now() > invitation.expiration {
                    return Err(DaoError::InvitationExpired);
                }

                let new_manager = NewEventManager {
                    event_id: invitation.event_id,
                    user_id: redeemer_id,
                    role: ManagerRole::CoManager.as_i16(),
                };

                // A redeemer who already manages the event keeps their
                // existing role
                dsl::insert_into(event_managers)
                    .values(&new_manager)
                    .on_conflict_do_nothing()
                    .execute(conn)?;

                Ok(invitation.event_id)
            })
    }

    /// Garbage collection for the invitation table. Spent invitations are
    /// kept for auditability; never-used ones past expiry are purged.
    pub fn delete_all_expired_invitations(&self) -> Result<usize, DaoError> {
        Ok(diesel::delete(
            invitations
                .filter(invitation_fields::expiration.lt(SystemTime::now()))
                .filter(invitation_fields::used_at.is_null()),
        )
        .execute(&mut self.db_thread_pool.get()?)?)
    }
}
