//! Shared fixtures for unit and handler tests.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    config::Config,
    db::{memory::MemoryStore, EventRepository},
    mailer::testing::RecordingMailer,
    models::{generate_qr_code, Booking, BookingStatus, Category, Event},
    service::{auth::UserAuthData, AppContext},
};

pub const JWT_SECRET: &str = "test-secret";

pub fn config() -> Config {
    Config::from_lookup(|name| match name {
        "STORE_BACKEND" => Some("memory".to_string()),
        "JWT_SECRET" => Some(JWT_SECRET.to_string()),
        "ADMIN_EMAILS" => Some("admin@eventora.com".to_string()),
        _ => None,
    })
    .expect("test config is valid")
}

pub fn event_with_tickets(total: i32, available: i32, price: Decimal) -> Event {
    let now = Utc::now();
    Event {
        id: Uuid::new_v4(),
        title: "RustConf".to_string(),
        description: "Talks about Rust".to_string(),
        date: now + Duration::days(30),
        location: "Hall A".to_string(),
        total_tickets: total,
        tickets_available: available,
        price,
        category: Category::Conference,
        image_url: None,
        created_by: "organizer".to_string(),
        created_at: now,
    }
}

pub fn booking_for(event: &Event, user_id: &str, quantity: i32) -> Booking {
    Booking {
        id: Uuid::new_v4(),
        event_id: event.id,
        user_id: user_id.to_string(),
        user_name: format!("Guest {}", user_id),
        user_email: format!("{}@example.com", user_id),
        event_title: event.title.clone(),
        quantity,
        total_price: event.price * Decimal::from(quantity),
        status: BookingStatus::Confirmed,
        qr_code: generate_qr_code(),
        used_at: None,
        created_at: Utc::now(),
    }
}

pub fn admin() -> UserAuthData {
    UserAuthData {
        user_id: "admin".to_string(),
        name: "Admin".to_string(),
        email: "admin@eventora.com".to_string(),
        is_admin: true,
    }
}

pub fn guest(user_id: &str) -> UserAuthData {
    UserAuthData {
        user_id: user_id.to_string(),
        name: format!("Guest {}", user_id),
        email: format!("{}@example.com", user_id),
        is_admin: false,
    }
}

/// Memory-backed context together with handles to its store and mailer.
pub struct TestApp {
    pub ctx: AppContext,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_mailer(RecordingMailer::default())
    }

    pub fn with_mailer(mailer: RecordingMailer) -> Self {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(mailer);
        let ctx = AppContext::new(store.clone(), store.clone(), mailer.clone(), config());
        Self { ctx, store, mailer }
    }

    pub async fn seed_event(&self, event: &Event) {
        EventRepository::create(self.store.as_ref(), event)
            .await
            .expect("event seeds");
    }

    pub async fn event(&self, id: Uuid) -> Event {
        EventRepository::get_by_id(self.store.as_ref(), id)
            .await
            .expect("store reads")
            .expect("event exists")
    }
}
