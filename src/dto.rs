use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Booking, Category};

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewEventDto {
    pub title: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub location: String,
    pub total_tickets: i32,
    pub price: Decimal,
    pub category: Category,
    pub image_url: Option<String>,
}

/// Partial event edit. `ticketsAvailable` is never set directly; a
/// `totalTickets` change shifts it by the same amount.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventDto {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub total_tickets: Option<i32>,
    pub price: Option<Decimal>,
    pub category: Option<Category>,
    pub image_url: Option<String>,
}

impl UpdateEventDto {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.date.is_none()
            && self.location.is_none()
            && self.total_tickets.is_none()
            && self.price.is_none()
            && self.category.is_none()
            && self.image_url.is_none()
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct EventQuery {
    pub category: Option<Category>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NewBookingDto {
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ValidateTicketDto {
    pub qr_code: String,
}

/// Guest-facing view of a booking shown at the scanner.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketSnapshot {
    pub id: Uuid,
    pub event_title: String,
    pub user_name: String,
    pub user_email: String,
    pub quantity: i32,
    pub total_price: Decimal,
    pub used_at: Option<DateTime<Utc>>,
}

impl From<&Booking> for TicketSnapshot {
    fn from(booking: &Booking) -> Self {
        Self {
            id: booking.id,
            event_title: booking.event_title.clone(),
            user_name: booking.user_name.clone(),
            user_email: booking.user_email.clone(),
            quantity: booking.quantity,
            total_price: booking.total_price,
            used_at: booking.used_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ValidationResponse {
    pub valid: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking: Option<TicketSnapshot>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
    pub exp: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_events: usize,
    pub active_events: usize,
    pub total_bookings: usize,
    pub total_revenue: Decimal,
    pub total_tickets_sold: i64,
    pub recent_bookings: Vec<Booking>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub events_scanned: usize,
    /// Events whose bookings could not be loaded; their guests got nothing.
    pub events_failed: usize,
    pub reminders_sent: usize,
    pub reminders_failed: usize,
}
