use actix_web::{web, HttpResponse};
use chipin_common::db::{self, DaoError, DbThreadPool};
use chipin_common::email::templates::CoManagerInviteMessage;
use chipin_common::email::{EmailMessage, EmailSender};
use chipin_common::request_io::{
    InputInvitation, InputInvitationToken, OutputEvent, OutputInvitation,
};
use chipin_common::validators::Validity;
use std::sync::Arc;

use crate::env;
use crate::handlers::error::HttpErrorResponse;
use crate::handlers::verification;
use crate::middleware::AuthorizedUser;

pub async fn create(
    db_thread_pool: web::Data<DbThreadPool>,
    smtp_thread_pool: web::Data<Arc<EmailSender>>,
    user: AuthorizedUser,
    invitation_data: web::Json<InputInvitation>,
) -> Result<HttpResponse, HttpErrorResponse> {
    verification::require_manager_role(&db_thread_pool, invitation_data.event_id, user.user_id())
        .await?;

    if let Validity::Invalid(msg) = invitation_data.validate_email_address() {
        return Err(HttpErrorResponse::IncorrectlyFormed(msg));
    }

    let event_dao = db::event::Dao::new(&db_thread_pool);
    let event_id = invitation_data.event_id;
    let target_event = match web::block(move || event_dao.get_event(event_id)).await? {
        Ok(e) => e,
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::DoesNotExist(String::from(
                "Event not found",
            )));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to get event",
            )));
        }
    };

    let invitation_dao = db::invitation::Dao::new(&db_thread_pool);
    let invitation_data = invitation_data.into_inner();
    let invitation = match web::block(move || {
        invitation_dao.create_invitation(
            invitation_data.event_id,
            &invitation_data.email,
            user.user_id(),
            env::CONF.invitation_lifetime,
        )
    })
    .await?
    {
        Ok(i) => i,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to create invitation",
            )));
        }
    };

    let message = EmailMessage {
        body: CoManagerInviteMessage::generate(
            &target_event.title,
            &env::CONF.invitation_redeem_url,
            &invitation.token,
            env::CONF.invitation_lifetime,
        ),
        subject: "You've been invited to help manage an event",
        from: env::CONF.email_from_address.clone(),
        reply_to: env::CONF.email_reply_to_address.clone(),
        destination: &invitation.email,
        is_html: true,
    };

    // The invitation row has already been committed; an email failure is
    // logged rather than surfaced so the token isn't lost
    if let Err(e) = smtp_thread_pool.send(message).await {
        log::error!("Failed to send invitation email: {e}");
    }

    Ok(HttpResponse::Created().json(OutputInvitation::from(invitation)))
}

pub async fn redeem(
    db_thread_pool: web::Data<DbThreadPool>,
    user: AuthorizedUser,
    token_data: web::Json<InputInvitationToken>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let invitation_dao = db::invitation::Dao::new(&db_thread_pool);
    let token_data = token_data.into_inner();
    let event_id = match web::block(move || {
        invitation_dao.redeem_invitation(&token_data.token, user.user_id())
    })
    .await?
    {
        Ok(id) => id,
        Err(DaoError::InvitationExpired) => {
            return Err(HttpErrorResponse::Expired(String::from(
                "Invitation has expired",
            )));
        }
        Err(DaoError::InvitationAlreadyUsed) => {
            return Err(HttpErrorResponse::AlreadyUsed(String::from(
                "Invitation has already been redeemed",
            )));
        }
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::DoesNotExist(String::from(
                "Invitation not found",
            )));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to redeem invitation",
            )));
        }
    };

    let event_dao = db::event::Dao::new(&db_thread_pool);
    let event = match web::block(move || event_dao.get_event(event_id)).await? {
        Ok(e) => e,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to get event",
            )));
        }
    };

    Ok(HttpResponse::Ok().json(OutputEvent::from(event)))
}

#[cfg(test)]
mod tests {
    use super::*;

    use actix_web::http::StatusCode;
    use actix_web::test::{self, TestRequest};
    use actix_web::web::Data;
    use actix_web::App;
    use chipin_common::request_io::InputEvent;
    use chipin_common::schema::invitations;
    use diesel::{QueryDsl, RunQueryDsl};
    use std::time::{Duration, SystemTime};
    use uuid::Uuid;

    use crate::realtime::EventBroadcaster;

    #[actix_web::test]
    #[ignore = "requires a live Postgres instance (set the CHIPIN_* environment variables)"]
    async fn test_invitation_grants_co_manager_on_redeem() {
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
            title: String::from("Charity Auction"),
            event_date: SystemTime::now() + Duration::from_secs(86400 * 45),
            venue: String::from("Grand Ballroom"),
            target_amount_cents: Some(5000_00),
        };

        let req = TestRequest::post()
            .uri("/api/event")
            .insert_header(("UserId", owner_id.to_string()))
            .set_json(&new_event)
            .to_request();
        let event: OutputEvent = test::read_body_json(test::call_service(&app, req).await).await;

        let invite = InputInvitation {
            event_id: event.id,
            email: String::from("helper@test.com"),
        };
        let req = TestRequest::post()
            .uri("/api/event/invitation")
            .insert_header(("UserId", owner_id.to_string()))
            .set_json(&invite)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let invitation: OutputInvitation = test::read_body_json(resp).await;
        assert_eq!(invitation.event_id, event.id);

        // The token only travels in the invite email, so pull it straight
        // from the row
        let token: String = invitations::table
            .find(invitation.id)
            .select(invitations::token)
            .get_result(&mut env::testing::DB_THREAD_POOL.get().unwrap())
            .unwrap();

        let redeemer_id = Uuid::now_v7();
        let req = TestRequest::put()
            .uri("/api/event/invitation/redeem")
            .insert_header(("UserId", redeemer_id.to_string()))
            .set_json(InputInvitationToken {
                token: token.clone(),
            })
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let redeemed_event: OutputEvent = test::read_body_json(resp).await;
        assert_eq!(redeemed_event.id, event.id);

        // The redeemer can now see the event like any other manager
        let req = TestRequest::get()
            .uri(&format!("/api/event?event_id={}", event.id))
            .insert_header(("UserId", redeemer_id.to_string()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        // A spent token cannot be redeemed by anyone else
        let req = TestRequest::put()
            .uri("/api/event/invitation/redeem")
            .insert_header(("UserId", Uuid::now_v7().to_string()))
            .set_json(InputInvitationToken { token })
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = TestRequest::delete()
            .uri(&format!("/api/event?event_id={}", event.id))
            .insert_header(("UserId", owner_id.to_string()))
            .to_request();
        test::call_service(&app, req).await;
    }
}
