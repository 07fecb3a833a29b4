pub mod contribution;
pub mod event;
pub mod expense;
pub mod health;
pub mod invitation;

pub mod verification {
    use actix_web::web;
    use chipin_common::db::{self, DbThreadPool};
    use chipin_common::models::event_manager::ManagerRole;
    use uuid::Uuid;

    use super::error::HttpErrorResponse;

    /// Resolves the caller's role for an event, failing with 403 if the caller
    /// does not manage the event.
    pub async fn require_manager_role(
        db_thread_pool: &DbThreadPool,
        event_id: Uuid,
        user_id: Uuid,
    ) -> Result<ManagerRole, HttpErrorResponse> {
        let event_dao = db::event::Dao::new(db_thread_pool);
        let role = match web::block(move || event_dao.get_role(event_id, user_id)).await? {
            Ok(r) => r,
            Err(e) => {
                log::error!("{e}");
                return Err(HttpErrorResponse::InternalError(String::from(
                    "Failed to check event role",
                )));
            }
        };

        match role {
            Some(r) => Ok(r),
            None => Err(HttpErrorResponse::Forbidden(String::from(
                "User does not manage this event",
            ))),
        }
    }

    pub async fn require_owner_role(
        db_thread_pool: &DbThreadPool,
        event_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), HttpErrorResponse> {
        match require_manager_role(db_thread_pool, event_id, user_id).await? {
            ManagerRole::Owner => Ok(()),
            ManagerRole::CoManager => Err(HttpErrorResponse::Forbidden(String::from(
                "Only the event owner may do this",
            ))),
        }
    }
}

pub mod error {
    use actix_web::http::{header, StatusCode};
    use actix_web::{HttpResponse, HttpResponseBuilder};
    use serde::Serialize;
    use std::fmt;

    #[derive(Debug, Serialize)]
    pub struct ServerErrorResponse {
        pub err_type: &'static str,
        pub err_message: String,
    }

    #[derive(Debug)]
    pub enum HttpErrorResponse {
        // 400
        IncorrectlyFormed(String),
        InvalidAmount(String),
        AlreadyUsed(String),
        ConflictWithExisting(String),

        // 401
        MissingHeader(String),
        Expired(String),

        // 403
        Forbidden(String),

        // 404
        DoesNotExist(String),

        // 409
        InvalidTransition(String),

        // 500
        InternalError(String),
    }

    impl std::error::Error for HttpErrorResponse {}

    impl fmt::Display for HttpErrorResponse {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let server_error: ServerErrorResponse = self.into();
            write!(f, "{:?}", server_error)
        }
    }

    impl From<&HttpErrorResponse> for ServerErrorResponse {
        fn from(resp: &HttpErrorResponse) -> Self {
            match resp {
                HttpErrorResponse::IncorrectlyFormed(msg) => ServerErrorResponse {
                    err_type: "incorrectly_formed",
                    err_message: format!("Incorrectly formed request: {msg}"),
                },
                HttpErrorResponse::InvalidAmount(msg) => ServerErrorResponse {
                    err_type: "invalid_amount",
                    err_message: format!("Invalid amount: {msg}"),
                },
                HttpErrorResponse::AlreadyUsed(msg) => ServerErrorResponse {
                    err_type: "already_used",
                    err_message: format!("Already used: {msg}"),
                },
                HttpErrorResponse::ConflictWithExisting(msg) => ServerErrorResponse {
                    err_type: "conflict_with_existing",
                    err_message: format!("Conflict with existing data: {msg}"),
                },
                HttpErrorResponse::MissingHeader(msg) => ServerErrorResponse {
                    err_type: "missing_header",
                    err_message: format!("Missing header: {msg}"),
                },
                HttpErrorResponse::Expired(msg) => ServerErrorResponse {
                    err_type: "expired",
                    err_message: format!("Expired: {msg}"),
                },
                HttpErrorResponse::Forbidden(msg) => ServerErrorResponse {
                    err_type: "forbidden",
                    err_message: format!("Forbidden: {msg}"),
                },
                HttpErrorResponse::DoesNotExist(msg) => ServerErrorResponse {
                    err_type: "does_not_exist",
                    err_message: format!("Does not exist: {msg}"),
                },
                HttpErrorResponse::InvalidTransition(msg) => ServerErrorResponse {
                    err_type: "invalid_transition",
                    err_message: format!("Invalid transition: {msg}"),
                },
                HttpErrorResponse::InternalError(msg) => ServerErrorResponse {
                    err_type: "internal_error",
                    err_message: format!("Internal error: {msg}"),
                },
            }
        }
    }

    impl actix_web::error::ResponseError for HttpErrorResponse {
        fn error_response(&self) -> HttpResponse {
            HttpResponseBuilder::new(self.status_code())
                .insert_header((header::CONTENT_TYPE, "application/json"))
                .json(ServerErrorResponse::from(self))
        }

        fn status_code(&self) -> StatusCode {
            match *self {
                HttpErrorResponse::IncorrectlyFormed(_)
                | HttpErrorResponse::InvalidAmount(_)
                | HttpErrorResponse::AlreadyUsed(_)
                | HttpErrorResponse::ConflictWithExisting(_) => StatusCode::BAD_REQUEST,
                HttpErrorResponse::MissingHeader(_) | HttpErrorResponse::Expired(_) => {
                    StatusCode::UNAUTHORIZED
                }
                HttpErrorResponse::Forbidden(_) => StatusCode::FORBIDDEN,
                HttpErrorResponse::DoesNotExist(_) => StatusCode::NOT_FOUND,
                HttpErrorResponse::InvalidTransition(_) => StatusCode::CONFLICT,
                HttpErrorResponse::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            }
        }
    }

    impl From<actix_web::error::BlockingError> for HttpErrorResponse {
        fn from(_err: actix_web::error::BlockingError) -> Self {
            HttpErrorResponse::InternalError(String::from("Actix thread pool failure"))
        }
    }

    #[cfg(test)]
    mod tests {
        use actix_web::error::ResponseError;

        use super::*;

        #[test]
        fn test_status_codes() {
            assert_eq!(
                HttpErrorResponse::DoesNotExist(String::from("event")).status_code(),
                StatusCode::NOT_FOUND,
            );
            assert_eq!(
                HttpErrorResponse::Forbidden(String::from("nope")).status_code(),
                StatusCode::FORBIDDEN,
            );
            assert_eq!(
                HttpErrorResponse::InvalidTransition(String::from("terminal")).status_code(),
                StatusCode::CONFLICT,
            );
            assert_eq!(
                HttpErrorResponse::Expired(String::from("invitation")).status_code(),
                StatusCode::UNAUTHORIZED,
            );
            assert_eq!(
                HttpErrorResponse::AlreadyUsed(String::from("invitation")).status_code(),
                StatusCode::BAD_REQUEST,
            );
        }

        #[test]
        fn test_err_type_strings() {
            let resp = ServerErrorResponse::from(&HttpErrorResponse::InvalidAmount(String::from(
                "must be positive",
            )));

            assert_eq!(resp.err_type, "invalid_amount");
            assert!(resp.err_message.contains("must be positive"));
        }
    }
}
