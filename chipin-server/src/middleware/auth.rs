use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};
use futures::future;
use uuid::Uuid;

use crate::handlers::error::HttpErrorResponse;

/// The user ID asserted by the identity provider that fronts this server.
/// The gateway strips any client-supplied `UserId` header and replaces it with
/// the authenticated one, so the value here is trusted.
#[derive(Debug, Clone, Copy)]
pub struct AuthorizedUser(pub Uuid);

impl AuthorizedUser {
    pub fn user_id(&self) -> Uuid {
        self.0
    }
}

impl FromRequest for AuthorizedUser {
    type Error = HttpErrorResponse;
    type Future = future::Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let header = match req.headers().get("UserId") {
            Some(h) => h,
            None => {
                return future::err(HttpErrorResponse::MissingHeader(String::from(
                    "UserId header is missing",
                )));
            }
        };

        let header_str = match header.to_str() {
            Ok(s) => s,
            Err(_) => {
                return future::err(HttpErrorResponse::IncorrectlyFormed(String::from(
                    "UserId header is not valid UTF-8",
                )));
            }
        };

        match Uuid::parse_str(header_str) {
            Ok(id) => future::ok(AuthorizedUser(id)),
            Err(_) => future::err(HttpErrorResponse::IncorrectlyFormed(String::from(
                "UserId header is not a valid UUID",
            ))),
        }
    }
}
