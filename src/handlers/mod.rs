pub mod admin;
pub mod booking;
pub mod event;
pub mod health;
pub mod ticket;

use actix_web::web;

/// Routes reachable without a bearer token.
pub fn init_public_routes(cfg: &mut web::ServiceConfig) {
    cfg.configure(health::init_routes)
        .configure(event::init_public_routes);
}

/// Routes mounted under `/api`, behind [`crate::service::auth::AuthMiddleware`].
pub fn init_routes_with_auth(cfg: &mut web::ServiceConfig) {
    cfg.configure(event::init_routes_with_auth)
        .configure(booking::init_routes)
        .configure(ticket::init_routes)
        .configure(admin::init_routes);
}
