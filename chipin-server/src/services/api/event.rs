use actix_web::web::*;

use crate::handlers::{contribution, event, expense, invitation};

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/event")
            .route("", get().to(event::get))
            .route("", put().to(event::edit))
            .route("", post().to(event::create))
            .route("", delete().to(event::delete))
            .route("/all", get().to(event::get_all))
            .route("/stats", get().to(event::get_stats))
            .route("/live", get().to(event::live))
            .route("/public", get().to(event::lookup_public))
            .route("/public/stats", get().to(event::get_public_stats))
            .route("/public/contribution", post().to(contribution::submit))
            .route("/contribution/all", get().to(contribution::get_all))
            .route("/contribution/approve", put().to(contribution::approve))
            .route("/contribution/reject", put().to(contribution::reject))
            .route("/expense", post().to(expense::create))
            .route("/expense", put().to(expense::edit))
            .route("/expense", delete().to(expense::delete))
            .route("/expense/all", get().to(expense::get_all))
            .route("/invitation", post().to(invitation::create))
            .route("/invitation/redeem", put().to(invitation::redeem)),
    );
}
