use actix_web::web::*;

mod event;
mod health;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/api")
            .configure(event::configure)
            .configure(health::configure),
    );
}
