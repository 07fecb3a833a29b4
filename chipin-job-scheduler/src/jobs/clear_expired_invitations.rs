use chipin_common::db::invitation::Dao as InvitationDao;
use chipin_common::db::DbThreadPool;

use async_trait::async_trait;

use crate::jobs::{Job, JobError};

/// Sweeps invitations whose expiration has passed without being redeemed.
/// Redeemed invitations are kept as an audit trail of how each co-manager
/// gained access.
pub struct ClearExpiredInvitationsJob {
    db_thread_pool: DbThreadPool,
    is_running: bool,
}

impl ClearExpiredInvitationsJob {
    pub fn new(db_thread_pool: DbThreadPool) -> Self {
        Self {
            db_thread_pool,
            is_running: false,
        }
    }
}

#[async_trait]
impl Job for ClearExpiredInvitationsJob {
    fn name(&self) -> &'static str {
        "Clear Expired Invitations"
    }

    fn is_ready(&self) -> bool {
        !self.is_running
    }

    async fn execute(&mut self) -> Result<(), JobError> {
        self.is_running = true;

        let dao = InvitationDao::new(&self.db_thread_pool);
        let deleted_count =
            tokio::task::spawn_blocking(move || dao.delete_all_expired_invitations()).await??;

        if deleted_count > 0 {
            log::info!("Deleted {} expired invitation(s)", deleted_count);
        }

        self.is_running = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chipin_common::db::event;
    use chipin_common::models::invitation::NewInvitation;
    use chipin_common::request_io::InputEvent;
    use chipin_common::schema::invitations;

    use diesel::{ExpressionMethods, QueryDsl, RunQueryDsl};
    use std::time::{Duration, SystemTime};
    use uuid::Uuid;

    use crate::env;

    fn insert_invitation(event_id: Uuid, expiration: SystemTime) -> Uuid {
        let invitation_id = Uuid::now_v7();
        let token = chipin_common::db::invitation::generate_invitation_token();

        let new_invitation = NewInvitation {
            id: invitation_id,
            token: &token,
            event_id,
            email: "sweep-test@chipin.test",
            invited_by: Uuid::now_v7(),
            created_timestamp: SystemTime::now(),
            expiration,
        };

        diesel::insert_into(invitations::table)
            .values(&new_invitation)
            .execute(&mut env::testing::DB_THREAD_POOL.get().unwrap())
            .unwrap();

        invitation_id
    }

    fn invitation_count(invitation_id: Uuid) -> usize {
        invitations::table
            .find(invitation_id)
            .execute(&mut env::testing::DB_THREAD_POOL.get().unwrap())
            .unwrap()
    }

    #[tokio::test]
    #[ignore = "requires a live Postgres instance (set CHIPIN_TEST_DB_URI)"]
    async fn test_execute_deletes_only_expired_unused_invitations() {
        let event_dao = event::Dao::new(&env::testing::DB_THREAD_POOL);
        let owner_id = Uuid::now_v7();
        let event = event_dao
            .create_event(
                &InputEvent {
                    title: String::from("Sweep Test Event"),
                    event_date: SystemTime::now() + Duration::from_secs(86400),
                    venue: String::from("Back Room"),
                    target_amount_cents: None,
                },
                owner_id,
            )
            .unwrap();

        let expired_id =
            insert_invitation(event.id, SystemTime::now() - Duration::from_secs(100));
        let unexpired_id =
            insert_invitation(event.id, SystemTime::now() + Duration::from_secs(3600));

        // A redeemed invitation must survive the sweep even once its
        // expiration has passed
        let redeemed_id =
            insert_invitation(event.id, SystemTime::now() - Duration::from_secs(100));
        diesel::update(invitations::table.find(redeemed_id))
            .set(invitations::used_at.eq(Some(SystemTime::now())))
            .execute(&mut env::testing::DB_THREAD_POOL.get().unwrap())
            .unwrap();

        assert_eq!(invitation_count(expired_id), 1);
        assert_eq!(invitation_count(unexpired_id), 1);
        assert_eq!(invitation_count(redeemed_id), 1);

        let mut job = ClearExpiredInvitationsJob::new(env::testing::DB_THREAD_POOL.clone());
        job.execute().await.unwrap();

        assert_eq!(invitation_count(expired_id), 0);
        assert_eq!(invitation_count(unexpired_id), 1);
        assert_eq!(invitation_count(redeemed_id), 1);
    }
}
