pub mod booking;
pub mod event;
pub mod memory;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{info, warn};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use crate::{
    dto::UpdateEventDto,
    errors::AppResult,
    models::{Booking, BookingStatus, Category, Event},
    PGPool,
};

pub async fn init_db_pool(
    db_url: &str,
    max_connections: u32,
    acquire_timeout: Duration,
) -> Result<PGPool, sqlx::Error> {
    let pool: PGPool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .connect(db_url)
        .await?;
    info!("connected to postgresql");
    sqlx::migrate!("./migrations").run(&pool).await.map_err(|err| {
        warn!("migrations failed: {}", err);
        sqlx::Error::from(err)
    })?;
    info!("database migrations applied");
    Ok(pool)
}

/// Postgres-backed implementation of both repositories.
#[derive(Clone)]
pub struct PgStore {
    pool: PGPool,
}

impl PgStore {
    pub fn new(pool: PGPool) -> Self {
        Self { pool }
    }
}

/// Date bounds are inclusive on both ends.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub category: Option<Category>,
    pub created_by: Option<String>,
}

impl EventFilter {
    pub fn between(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            date_from: Some(from),
            date_to: Some(to),
            ..Default::default()
        }
    }

    pub fn matches(&self, event: &Event) -> bool {
        if self.date_from.map_or(false, |from| event.date < from) {
            return false;
        }
        if self.date_to.map_or(false, |to| event.date > to) {
            return false;
        }
        if let Some(category) = self.category {
            if event.category != category {
                return false;
            }
        }
        if let Some(created_by) = &self.created_by {
            if &event.created_by != created_by {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub event_id: Option<Uuid>,
    pub user_id: Option<String>,
    pub qr_code: Option<String>,
    pub status: Option<BookingStatus>,
}

impl BookingFilter {
    pub fn for_event(event_id: Uuid) -> Self {
        Self {
            event_id: Some(event_id),
            ..Default::default()
        }
    }

    pub fn for_user(user_id: &str) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: BookingStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn matches(&self, booking: &Booking) -> bool {
        self.event_id.map_or(true, |id| booking.event_id == id)
            && self.user_id.as_ref().map_or(true, |id| &booking.user_id == id)
            && self.qr_code.as_ref().map_or(true, |qr| &booking.qr_code == qr)
            && self.status.map_or(true, |status| booking.status == status)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventUpdate {
    Updated(Event),
    NotFound,
    /// The new total is below the number of tickets already sold.
    TotalBelowSold { sold: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDeletion {
    Deleted,
    NotFound,
    HasActiveBookings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    Reserved { tickets_left: i32 },
    SoldOut { available: i32 },
    EventMissing,
}

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn create(&self, event: &Event) -> AppResult<()>;

    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Event>>;

    /// Matching events ordered by date, earliest first.
    async fn list(&self, filter: &EventFilter) -> AppResult<Vec<Event>>;

    async fn update(&self, id: Uuid, changes: &UpdateEventDto) -> AppResult<EventUpdate>;

    /// Deletes the event unless it still has confirmed bookings.
    async fn delete_if_unbooked(&self, id: Uuid) -> AppResult<EventDeletion>;
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Booking>>;

    async fn find_by_qr_code(&self, qr_code: &str) -> AppResult<Option<Booking>>;

    /// Matching bookings ordered by creation time, newest first.
    async fn list(&self, filter: &BookingFilter) -> AppResult<Vec<Booking>>;

    /// Inserts the booking and then takes `booking.quantity` tickets from its
    /// event, as one unit. Nothing is persisted unless both succeed.
    async fn create_reserving_tickets(&self, booking: &Booking) -> AppResult<Reservation>;

    /// `confirmed -> cancelled` plus the matching inventory release, as one
    /// unit. Returns `None` when the booking is missing or not confirmed.
    async fn cancel_releasing_tickets(&self, id: Uuid) -> AppResult<Option<Booking>>;

    /// `confirmed -> used`. Returns `None` when the booking is missing or not
    /// confirmed.
    async fn mark_used(&self, id: Uuid, used_at: DateTime<Utc>) -> AppResult<Option<Booking>>;
}
