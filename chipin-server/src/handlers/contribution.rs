use actix_web::{web, HttpResponse};
use chipin_common::db::{self, DaoError, DbThreadPool};
use chipin_common::request_io::{
    InputContribution, InputContributionApproval, InputContributionRejection, InputEventId,
    OutputContribution,
};
use chipin_common::validators::Validity;

use crate::handlers::error::HttpErrorResponse;
use crate::handlers::{event, verification};
use crate::middleware::AuthorizedUser;
use crate::realtime::{EventBroadcaster, LedgerUpdate};

/// Public submission endpoint. Contributors are not authenticated; knowledge
/// of the event's access code is what authorizes the pledge.
pub async fn submit(
    db_thread_pool: web::Data<DbThreadPool>,
    broadcaster: web::Data<EventBroadcaster>,
    contribution_data: web::Json<InputContribution>,
) -> Result<HttpResponse, HttpErrorResponse> {
    if let Validity::Invalid(msg) = contribution_data.validate_amount() {
        return Err(HttpErrorResponse::InvalidAmount(msg));
    }

    if contribution_data.contributor_name.trim().is_empty() {
        return Err(HttpErrorResponse::IncorrectlyFormed(String::from(
            "Contributor name must not be empty",
        )));
    }

    // Contributor counting deduplicates on contact, so a blank contact would
    // fold unrelated contributors together
    if contribution_data.contributor_contact.trim().is_empty() {
        return Err(HttpErrorResponse::IncorrectlyFormed(String::from(
            "Contributor contact must not be empty",
        )));
    }

    let contribution_data = contribution_data.into_inner();
    let target_event =
        event::find_event_by_access_code(&db_thread_pool, contribution_data.access_code.clone())
            .await?;

    let contribution_dao = db::contribution::Dao::new(&db_thread_pool);
    let event_id = target_event.id;
    let contribution = match web::block(move || {
        contribution_dao.create_contribution(
            event_id,
            &contribution_data.contributor_name,
            &contribution_data.contributor_contact,
            contribution_data.amount_cents,
        )
    })
    .await?
    {
        Ok(c) => c,
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::DoesNotExist(String::from(
                "Event not found",
            )));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to record contribution",
            )));
        }
    };

    let contribution = OutputContribution::from(contribution);

    notify_watchers(
        &db_thread_pool,
        &broadcaster,
        event_id,
        |stats| LedgerUpdate::ContributionSubmitted {
            contribution: contribution.clone(),
            stats,
        },
    )
    .await;

    Ok(HttpResponse::Created().json(contribution))
}

pub async fn get_all(
    db_thread_pool: web::Data<DbThreadPool>,
    user: AuthorizedUser,
    query: web::Query<InputEventId>,
) -> Result<HttpResponse, HttpErrorResponse> {
    verification::require_manager_role(&db_thread_pool, query.event_id, user.user_id()).await?;

    let contribution_dao = db::contribution::Dao::new(&db_thread_pool);
    let event_id = query.event_id;
    let event_contributions =
        match web::block(move || contribution_dao.get_contributions_for_event(event_id)).await? {
            Ok(c) => c,
            Err(e) => {
                log::error!("{e}");
                return Err(HttpErrorResponse::InternalError(String::from(
                    "Failed to get contributions",
                )));
            }
        };

    let event_contributions: Vec<OutputContribution> = event_contributions
        .into_iter()
        .map(OutputContribution::from)
        .collect();

    Ok(HttpResponse::Ok().json(event_contributions))
}

pub async fn approve(
    db_thread_pool: web::Data<DbThreadPool>,
    broadcaster: web::Data<EventBroadcaster>,
    user: AuthorizedUser,
    approval_data: web::Json<InputContributionApproval>,
) -> Result<HttpResponse, HttpErrorResponse> {
    verification::require_manager_role(&db_thread_pool, approval_data.event_id, user.user_id())
        .await?;

    let contribution_dao = db::contribution::Dao::new(&db_thread_pool);
    let approval_data = approval_data.into_inner();
    let contribution = match web::block(move || {
        contribution_dao.approve_contribution(
            approval_data.contribution_id,
            approval_data.event_id,
            user.user_id(),
        )
    })
    .await?
    {
        Ok(c) => c,
        Err(e) => return Err(transition_error(e)),
    };

    let event_id = contribution.event_id;
    let contribution = OutputContribution::from(contribution);

    notify_watchers(
        &db_thread_pool,
        &broadcaster,
        event_id,
        |stats| LedgerUpdate::ContributionUpdated {
            contribution: contribution.clone(),
            stats,
        },
    )
    .await;

    Ok(HttpResponse::Ok().json(contribution))
}

pub async fn reject(
    db_thread_pool: web::Data<DbThreadPool>,
    broadcaster: web::Data<EventBroadcaster>,
    user: AuthorizedUser,
    rejection_data: web::Json<InputContributionRejection>,
) -> Result<HttpResponse, HttpErrorResponse> {
    verification::require_manager_role(&db_thread_pool, rejection_data.event_id, user.user_id())
        .await?;

    if rejection_data.reason.trim().is_empty() {
        return Err(HttpErrorResponse::IncorrectlyFormed(String::from(
            "A rejection reason is required",
        )));
    }

    let contribution_dao = db::contribution::Dao::new(&db_thread_pool);
    let rejection_data = rejection_data.into_inner();
    let contribution = match web::block(move || {
        contribution_dao.reject_contribution(
            rejection_data.contribution_id,
            rejection_data.event_id,
            user.user_id(),
            &rejection_data.reason,
        )
    })
    .await?
    {
        Ok(c) => c,
        Err(e) => return Err(transition_error(e)),
    };

    let event_id = contribution.event_id;
    let contribution = OutputContribution::from(contribution);

    notify_watchers(
        &db_thread_pool,
        &broadcaster,
        event_id,
        |stats| LedgerUpdate::ContributionUpdated {
            contribution: contribution.clone(),
            stats,
        },
    )
    .await;

    Ok(HttpResponse::Ok().json(contribution))
}

fn transition_error(err: DaoError) -> HttpErrorResponse {
    match err {
        DaoError::IllegalTransition => HttpErrorResponse::InvalidTransition(String::from(
            "Contribution has already been approved or rejected",
        )),
        DaoError::QueryFailure(diesel::result::Error::NotFound) => {
            HttpErrorResponse::DoesNotExist(String::from("Contribution not found"))
        }
        e => {
            log::error!("{e}");
            HttpErrorResponse::InternalError(String::from("Failed to update contribution"))
        }
    }
}

/// Pushes a ledger update to live subscribers. Delivery is best-effort; a
/// failure to compute fresh stats is logged but never fails the request that
/// already committed.
pub(crate) async fn notify_watchers<F>(
    db_thread_pool: &DbThreadPool,
    broadcaster: &EventBroadcaster,
    event_id: uuid::Uuid,
    build_update: F,
) where
    F: FnOnce(chipin_common::request_io::OutputEventStats) -> LedgerUpdate,
{
    match event::load_stats(db_thread_pool, event_id).await {
        Ok(stats) => broadcaster.broadcast(event_id, &build_update(stats)),
        Err(e) => log::warn!("Skipping live update for event {event_id}: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use actix_web::http::StatusCode;
    use actix_web::test::{self, TestRequest};
    use actix_web::web::Data;
    use actix_web::App;
    use chipin_common::models::contribution::ContributionStatus;
    use chipin_common::request_io::{InputEvent, OutputEvent, OutputEventStats};
    use std::time::{Duration, SystemTime};
    use uuid::Uuid;

    use crate::env;

    #[actix_web::test]
    #[ignore = "requires a live Postgres instance (set the CHIPIN_* environment variables)"]
    async fn test_submit_rejects_blank_contributor_fields() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(env::testing::DB_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::SMTP_THREAD_POOL.clone()))
                .app_data(Data::new(EventBroadcaster::new()))
                .configure(crate::services::api::configure),
        )
        .await;

        let owner_id = Uuid::now_v7();
        let new_event = InputEvent {
            title: String::from("Retirement Sendoff"),
            event_date: SystemTime::now() + Duration::from_secs(86400 * 14),
            venue: String::from("Main Hall"),
            target_amount_cents: Some(800_00),
        };

        let req = TestRequest::post()
            .uri("/api/event")
            .insert_header(("UserId", owner_id.to_string()))
            .set_json(&new_event)
            .to_request();
        let event: OutputEvent = test::read_body_json(test::call_service(&app, req).await).await;

        let blank_name = InputContribution {
            access_code: event.access_code.clone(),
            contributor_name: String::from("   "),
            contributor_contact: String::from("sam@test.com"),
            amount_cents: 25_00,
        };
        let req = TestRequest::post()
            .uri("/api/event/public/contribution")
            .set_json(&blank_name)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        // A blank contact would make unrelated contributors
        // indistinguishable in the stats, so it is rejected too
        let blank_contact = InputContribution {
            access_code: event.access_code.clone(),
            contributor_name: String::from("Sam"),
            contributor_contact: String::from("   "),
            amount_cents: 25_00,
        };
        let req = TestRequest::post()
            .uri("/api/event/public/contribution")
            .set_json(&blank_contact)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let valid = InputContribution {
            access_code: event.access_code.clone(),
            contributor_name: String::from("Sam"),
            contributor_contact: String::from("sam@test.com"),
            amount_cents: 25_00,
        };
        let req = TestRequest::post()
            .uri("/api/event/public/contribution")
            .set_json(&valid)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let req = TestRequest::delete()
            .uri(&format!("/api/event?event_id={}", event.id))
            .insert_header(("UserId", owner_id.to_string()))
            .to_request();
        test::call_service(&app, req).await;
    }

    #[actix_web::test]
    #[ignore = "requires a live Postgres instance (set the CHIPIN_* environment variables)"]
    async fn test_submit_approve_and_stats_flow() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(env::testing::DB_THREAD_POOL.clone()))
                .app_data(Data::new(env::testing::SMTP_THREAD_POOL.clone()))
                .app_data(Data::new(EventBroadcaster::new()))
                .configure(crate::services::api::configure),
        )
        .await;

        let owner_id = Uuid::now_v7();
        let new_event = InputEvent {
            title: String::from("Office Party"),
            event_date: SystemTime::now() + Duration::from_secs(86400 * 21),
            venue: String::from("The Annex"),
            target_amount_cents: Some(1000_00),
        };

        let req = TestRequest::post()
            .uri("/api/event")
            .insert_header(("UserId", owner_id.to_string()))
            .set_json(&new_event)
            .to_request();
        let event: OutputEvent = test::read_body_json(test::call_service(&app, req).await).await;

        let pledge = InputContribution {
            access_code: event.access_code.clone(),
            contributor_name: String::from("Priya"),
            contributor_contact: String::from("priya@test.com"),
            amount_cents: 600_00,
        };
        let req = TestRequest::post()
            .uri("/api/event/public/contribution")
            .set_json(&pledge)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let contribution: OutputContribution = test::read_body_json(resp).await;
        assert_eq!(contribution.status, ContributionStatus::Pending);

        // Pending money is not collected money
        let req = TestRequest::get()
            .uri(&format!("/api/event/stats?event_id={}", event.id))
            .insert_header(("UserId", owner_id.to_string()))
            .to_request();
        let stats: OutputEventStats =
            test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(stats.total_collected_cents, 0);
        assert_eq!(stats.pending_requests, 1);

        let approval = InputContributionApproval {
            event_id: event.id,
            contribution_id: contribution.id,
        };
        let req = TestRequest::put()
            .uri("/api/event/contribution/approve")
            .insert_header(("UserId", owner_id.to_string()))
            .set_json(&approval)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let approved: OutputContribution = test::read_body_json(resp).await;
        assert_eq!(approved.status, ContributionStatus::Approved);

        let req = TestRequest::get()
            .uri(&format!("/api/event/stats?event_id={}", event.id))
            .insert_header(("UserId", owner_id.to_string()))
            .to_request();
        let stats: OutputEventStats =
            test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(stats.total_collected_cents, 600_00);
        assert_eq!(stats.pending_requests, 0);
        assert_eq!(stats.contributors_count, 1);

        // The approval is terminal; a second transition attempt conflicts
        let req = TestRequest::put()
            .uri("/api/event/contribution/approve")
            .insert_header(("UserId", owner_id.to_string()))
            .set_json(&approval)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let req = TestRequest::delete()
            .uri(&format!("/api/event?event_id={}", event.id))
            .insert_header(("UserId", owner_id.to_string()))
            .to_request();
        test::call_service(&app, req).await;
    }
}
