use actix_web::{web, HttpResponse};
use chipin_common::db::{self, DaoError, DbThreadPool};
use chipin_common::request_io::{
    InputAccessCode, InputEditEvent, InputEvent, InputEventId, OutputEvent, OutputEventStats,
    OutputPublicEvent,
};

use crate::handlers::error::HttpErrorResponse;
use crate::handlers::verification;
use crate::middleware::AuthorizedUser;
use crate::realtime::EventBroadcaster;

pub async fn create(
    db_thread_pool: web::Data<DbThreadPool>,
    user: AuthorizedUser,
    event_data: web::Json<InputEvent>,
) -> Result<HttpResponse, HttpErrorResponse> {
    if event_data.title.trim().is_empty() {
        return Err(HttpErrorResponse::IncorrectlyFormed(String::from(
            "Event title must not be empty",
        )));
    }

    let event_dao = db::event::Dao::new(&db_thread_pool);
    let event = match web::block(move || event_dao.create_event(&event_data, user.user_id())).await?
    {
        Ok(e) => e,
        Err(DaoError::OutOfCodeRetries) => {
            log::error!("Ran out of access code generation attempts");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to generate a unique access code",
            )));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to create event",
            )));
        }
    };

    Ok(HttpResponse::Created().json(OutputEvent::from(event)))
}

pub async fn get(
    db_thread_pool: web::Data<DbThreadPool>,
    user: AuthorizedUser,
    query: web::Query<InputEventId>,
) -> Result<HttpResponse, HttpErrorResponse> {
    verification::require_manager_role(&db_thread_pool, query.event_id, user.user_id()).await?;

    let event_dao = db::event::Dao::new(&db_thread_pool);
    let event_id = query.event_id;
    let event = match web::block(move || event_dao.get_event(event_id)).await? {
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

    Ok(HttpResponse::Ok().json(OutputEvent::from(event)))
}

pub async fn get_all(
    db_thread_pool: web::Data<DbThreadPool>,
    user: AuthorizedUser,
) -> Result<HttpResponse, HttpErrorResponse> {
    let event_dao = db::event::Dao::new(&db_thread_pool);
    let events = match web::block(move || event_dao.get_events_for_user(user.user_id())).await? {
        Ok(events) => events,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to get events",
            )));
        }
    };

    let events: Vec<OutputEvent> = events.into_iter().map(OutputEvent::from).collect();

    Ok(HttpResponse::Ok().json(events))
}

/// Contributor-facing lookup by access code. Codes are unguessable, so a
/// failed lookup is reported as a plain not-found.
pub async fn lookup_public(
    db_thread_pool: web::Data<DbThreadPool>,
    query: web::Query<InputAccessCode>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let event = find_event_by_access_code(&db_thread_pool, query.into_inner().access_code).await?;

    Ok(HttpResponse::Ok().json(OutputPublicEvent::from(event)))
}

pub async fn edit(
    db_thread_pool: web::Data<DbThreadPool>,
    user: AuthorizedUser,
    event_data: web::Json<InputEditEvent>,
) -> Result<HttpResponse, HttpErrorResponse> {
    verification::require_manager_role(&db_thread_pool, event_data.event_id, user.user_id())
        .await?;

    if event_data.title.trim().is_empty() {
        return Err(HttpErrorResponse::IncorrectlyFormed(String::from(
            "Event title must not be empty",
        )));
    }

    let event_dao = db::event::Dao::new(&db_thread_pool);
    match web::block(move || event_dao.update_event(&event_data)).await? {
        Ok(_) => (),
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::DoesNotExist(String::from(
                "Event not found",
            )));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to edit event",
            )));
        }
    };

    Ok(HttpResponse::Ok().finish())
}

pub async fn delete(
    db_thread_pool: web::Data<DbThreadPool>,
    user: AuthorizedUser,
    query: web::Query<InputEventId>,
) -> Result<HttpResponse, HttpErrorResponse> {
    verification::require_owner_role(&db_thread_pool, query.event_id, user.user_id()).await?;

    let event_dao = db::event::Dao::new(&db_thread_pool);
    let event_id = query.event_id;
    match web::block(move || event_dao.delete_event(event_id)).await? {
        Ok(_) => (),
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::DoesNotExist(String::from(
                "Event not found",
            )));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to delete event",
            )));
        }
    };

    Ok(HttpResponse::Ok().finish())
}

pub async fn get_stats(
    db_thread_pool: web::Data<DbThreadPool>,
    user: AuthorizedUser,
    query: web::Query<InputEventId>,
) -> Result<HttpResponse, HttpErrorResponse> {
    verification::require_manager_role(&db_thread_pool, query.event_id, user.user_id()).await?;

    let stats = load_stats(&db_thread_pool, query.event_id).await?;

    Ok(HttpResponse::Ok().json(stats))
}

pub async fn get_public_stats(
    db_thread_pool: web::Data<DbThreadPool>,
    query: web::Query<InputAccessCode>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let event = find_event_by_access_code(&db_thread_pool, query.into_inner().access_code).await?;
    let stats = load_stats(&db_thread_pool, event.id).await?;

    Ok(HttpResponse::Ok().json(stats))
}

/// Opens a live feed of ledger changes for the event behind the given access
/// code. Updates are delivered as server-sent events.
pub async fn live(
    db_thread_pool: web::Data<DbThreadPool>,
    broadcaster: web::Data<EventBroadcaster>,
    query: web::Query<InputAccessCode>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let event = find_event_by_access_code(&db_thread_pool, query.into_inner().access_code).await?;

    let subscription = broadcaster.subscribe(event.id);

    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header((actix_web::http::header::CACHE_CONTROL, "no-cache"))
        .streaming(subscription))
}

pub(crate) async fn find_event_by_access_code(
    db_thread_pool: &DbThreadPool,
    access_code: String,
) -> Result<chipin_common::models::event::Event, HttpErrorResponse> {
    let event_dao = db::event::Dao::new(db_thread_pool);
    match web::block(move || event_dao.get_event_by_access_code(&access_code)).await? {
        Ok(e) => Ok(e),
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => Err(
            HttpErrorResponse::DoesNotExist(String::from("No event matches that access code")),
        ),
        Err(e) => {
            log::error!("{e}");
            Err(HttpErrorResponse::InternalError(String::from(
                "Failed to look up event",
            )))
        }
    }
}

pub(crate) async fn load_stats(
    db_thread_pool: &DbThreadPool,
    event_id: uuid::Uuid,
) -> Result<OutputEventStats, HttpErrorResponse> {
    let event_dao = db::event::Dao::new(db_thread_pool);
    match web::block(move || event_dao.get_event_stats(event_id)).await? {
        Ok(stats) => Ok(OutputEventStats::new(event_id, stats)),
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => Err(
            HttpErrorResponse::DoesNotExist(String::from("Event not found")),
        ),
        Err(e) => {
            log::error!("{e}");
            Err(HttpErrorResponse::InternalError(String::from(
                "Failed to compute event stats",
            )))
        }
    }
}
