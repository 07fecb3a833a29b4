use diesel::result::DatabaseErrorKind;
use diesel::{dsl, ExpressionMethods, QueryDsl, RunQueryDsl};
use std::time::SystemTime;
use uuid::Uuid;

use crate::db::{DaoError, DbThreadPool};
use crate::models::contribution::{Contribution, ContributionStatus, NewContribution};
use crate::schema::contributions as contribution_fields;
use crate::schema::contributions::dsl::contributions;

pub struct Dao {
    db_thread_pool: DbThreadPool,
}

impl Dao {
    pub fn new(db_thread_pool: &DbThreadPool) -> Self {
        Self {
            db_thread_pool: db_thread_pool.clone(),
        }
    }

    /// Records a pledge. Every contribution starts out `Pending`; a missing
    /// event surfaces as `NotFound` via the foreign key constraint.
    pub fn create_contribution(
        &self,
        event_id: Uuid,
        contributor_name: &str,
        contributor_contact: &str,
        amount_cents: i64,
    ) -> Result<Contribution, DaoError> {
        let new_contribution = NewContribution {
            id: Uuid::now_v7(),
            event_id,
            contributor_name,
            contributor_contact,
            amount_cents,
            status: ContributionStatus::Pending.as_i16(),
            created_timestamp: SystemTime::now(),
        };

        let result = dsl::insert_into(contributions)
            .values(&new_contribution)
            .get_result::<Contribution>(&mut self.db_thread_pool.get()?);

        match result {
            Ok(contribution) => Ok(contribution),
            Err(diesel::result::Error::DatabaseError(
                DatabaseErrorKind::ForeignKeyViolation,
                _,
            )) => Err(DaoError::QueryFailure(diesel::result::Error::NotFound)),
            Err(e) => Err(DaoError::from(e)),
        }
    }

    pub fn get_contributions_for_event(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<Contribution>, DaoError> {
        Ok(contributions
            .filter(contribution_fields::event_id.eq(event_id))
            .order(contribution_fields::created_timestamp.asc())
            .load::<Contribution>(&mut self.db_thread_pool.get()?)?)
    }

    /// `pending -> approved`. The status check-and-set is a single
    /// conditional update so concurrent approvals serialize; the loser sees
    /// zero affected rows and gets `IllegalTransition`.
    pub fn approve_contribution(
        &self,
        contribution_id: Uuid,
        event_id: Uuid,
        approver_id: Uuid,
    ) -> Result<Contribution, DaoError> {
        self.transition_contribution(
            contribution_id,
            event_id,
            ContributionStatus::Approved,
            approver_id,
            None,
        )
    }

    /// `pending -> rejected`. The non-empty reason is stored for contributor
    /// visibility; the amount never counts toward totals.
    pub fn reject_contribution(
        &self,
        contribution_id: Uuid,
        event_id: Uuid,
        approver_id: Uuid,
        reason: &str,
    ) -> Result<Contribution, DaoError> {
        self.transition_contribution(
            contribution_id,
            event_id,
            ContributionStatus::Rejected,
            approver_id,
            Some(reason),
        )
    }

    fn transition_contribution(
        &self,
        contribution_id: Uuid,
        event_id: Uuid,
        new_status: ContributionStatus,
        approver_id: Uuid,
        rejection_reason: Option<&str>,
    ) -> Result<Contribution, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        // Read committed: a concurrent transition blocks on the row lock,
        // re-evaluates the status filter after the winner commits, and falls
        // into the zero-affected-rows path below
        db_connection
            .build_transaction()
            .run::<_, DaoError, _>(|conn| {
                let updated = dsl::update(
                    contributions
                        .find(contribution_id)
                        .filter(contribution_fields::event_id.eq(event_id))
                        .filter(
                            contribution_fields::status
                                .eq(ContributionStatus::Pending.as_i16()),
                        ),
                )
                .set((
                    contribution_fields::status.eq(new_status.as_i16()),
                    contribution_fields::approved_by.eq(approver_id),
                    contribution_fields::rejection_reason.eq(rejection_reason),
                ))
                .get_result::<Contribution>(conn);

                match updated {
                    Ok(contribution) => Ok(contribution),
                    Err(diesel::result::Error::NotFound) => {
                        // Distinguish an unknown contribution from one that
                        // already reached a terminal state
                        let current_status = contributions
                            .find(contribution_id)
                            .filter(contribution_fields::event_id.eq(event_id))
                            .select(contribution_fields::status)
                            .first::<i16>(conn);

                        match current_status {
                            Ok(_) => Err(DaoError::IllegalTransition),
                            Err(e) => Err(DaoError::from(e)),
                        }
                    }
                    Err(e) => Err(DaoError::from(e)),
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::db::test_utils;
    use crate::db::event::Dao as EventDao;

    #[test]
    #[ignore = "requires a live Postgres instance (set CHIPIN_TEST_DB_URI)"]
    fn test_contribution_starts_pending() {
        let event_dao = EventDao::new(test_utils::db_thread_pool());
        let inserted = test_utils::create_event_with_dao(&event_dao);

        let dao = Dao::new(test_utils::db_thread_pool());
        let contribution = dao
            .create_contribution(inserted.event_id, "Contributor", "c@test.com", 600_00)
            .unwrap();

        assert_eq!(
            ContributionStatus::from_i16(contribution.status),
            Some(ContributionStatus::Pending)
        );
        assert_eq!(contribution.amount_cents, 600_00);
        assert!(contribution.approved_by.is_none());

        event_dao.delete_event(inserted.event_id).unwrap();
    }

    #[test]
    #[ignore = "requires a live Postgres instance (set CHIPIN_TEST_DB_URI)"]
    fn test_create_contribution_for_unknown_event() {
        let dao = Dao::new(test_utils::db_thread_pool());

        let result =
            dao.create_contribution(Uuid::now_v7(), "Contributor", "c@test.com", 10_00);

        assert!(matches!(
            result,
            Err(DaoError::QueryFailure(diesel::result::Error::NotFound))
        ));
    }

    #[test]
    #[ignore = "requires a live Postgres instance (set CHIPIN_TEST_DB_URI)"]
    fn test_terminal_status_never_changes_again() {
        let event_dao = EventDao::new(test_utils::db_thread_pool());
        let inserted = test_utils::create_event_with_dao(&event_dao);

        let dao = Dao::new(test_utils::db_thread_pool());
        let contribution = dao
            .create_contribution(inserted.event_id, "Contributor", "c@test.com", 600_00)
            .unwrap();

        let approved = dao
            .approve_contribution(contribution.id, inserted.event_id, inserted.owner_id)
            .unwrap();
        assert_eq!(
            ContributionStatus::from_i16(approved.status),
            Some(ContributionStatus::Approved)
        );
        assert_eq!(approved.approved_by, Some(inserted.owner_id));

        // Second transition of either kind must lose
        assert!(matches!(
            dao.approve_contribution(contribution.id, inserted.event_id, inserted.owner_id),
            Err(DaoError::IllegalTransition)
        ));
        assert!(matches!(
            dao.reject_contribution(
                contribution.id,
                inserted.event_id,
                inserted.owner_id,
                "duplicate"
            ),
            Err(DaoError::IllegalTransition)
        ));

        event_dao.delete_event(inserted.event_id).unwrap();
    }

    #[test]
    #[ignore = "requires a live Postgres instance (set CHIPIN_TEST_DB_URI)"]
    fn test_rejection_stores_reason() {
        let event_dao = EventDao::new(test_utils::db_thread_pool());
        let inserted = test_utils::create_event_with_dao(&event_dao);

        let dao = Dao::new(test_utils::db_thread_pool());
        let contribution = dao
            .create_contribution(inserted.event_id, "Contributor", "c@test.com", 600_00)
            .unwrap();

        let rejected = dao
            .reject_contribution(
                contribution.id,
                inserted.event_id,
                inserted.owner_id,
                "duplicate",
            )
            .unwrap();

        assert_eq!(
            ContributionStatus::from_i16(rejected.status),
            Some(ContributionStatus::Rejected)
        );
        assert_eq!(rejected.rejection_reason.as_deref(), Some("duplicate"));

        let stats = event_dao.get_event_stats(inserted.event_id).unwrap();
        assert_eq!(stats.total_collected_cents, 0);

        event_dao.delete_event(inserted.event_id).unwrap();
    }

    #[test]
    #[ignore = "requires a live Postgres instance (set CHIPIN_TEST_DB_URI)"]
    fn test_concurrent_approvals_have_one_winner() {
        let event_dao = EventDao::new(test_utils::db_thread_pool());
        let inserted = test_utils::create_event_with_dao(&event_dao);

        let dao = Dao::new(test_utils::db_thread_pool());
        let contribution = dao
            .create_contribution(inserted.event_id, "Contributor", "c@test.com", 600_00)
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let pool = test_utils::db_thread_pool().clone();
            let contribution_id = contribution.id;
            let event_id = inserted.event_id;
            let approver_id = inserted.owner_id;

            handles.push(std::thread::spawn(move || {
                Dao::new(&pool).approve_contribution(contribution_id, event_id, approver_id)
            }));
        }

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let winners = results.iter().filter(|r| r.is_ok()).count();
        let losers = results
            .iter()
            .filter(|r| matches!(r, Err(DaoError::IllegalTransition)))
            .count();

        assert_eq!(winners, 1);
        assert_eq!(losers, results.len() - 1);

        event_dao.delete_event(inserted.event_id).unwrap();
    }
}
