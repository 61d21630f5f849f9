pub mod auth;
pub mod booking;
pub mod event;
pub mod log;
pub mod notification;
pub mod reminder;
pub mod stats;
pub mod ticket;

use std::sync::Arc;

use crate::{
    config::Config,
    db::{BookingRepository, EventRepository},
    mailer::Mailer,
};

/// Everything a request needs, built once in `main` and shared by reference.
#[derive(Clone)]
pub struct AppContext {
    pub events: Arc<dyn EventRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub mailer: Arc<dyn Mailer>,
    pub config: Arc<Config>,
}

impl AppContext {
    pub fn new(
        events: Arc<dyn EventRepository>,
        bookings: Arc<dyn BookingRepository>,
        mailer: Arc<dyn Mailer>,
        config: Config,
    ) -> Self {
        Self {
            events,
            bookings,
            mailer,
            config: Arc::new(config),
        }
    }
}
