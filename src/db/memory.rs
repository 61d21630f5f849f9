//! In-process store used by the `memory` backend and by tests.
//!
//! A single lock guards events and bookings together, so every repository
//! call observes and mutates a consistent snapshot of both.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    BookingFilter, BookingRepository, EventDeletion, EventFilter, EventRepository, EventUpdate,
    Reservation,
};
use crate::{
    dto::UpdateEventDto,
    errors::{AppError, AppResult},
    models::{Booking, BookingStatus, Event},
};

#[derive(Default)]
struct Tables {
    events: HashMap<Uuid, Event>,
    bookings: HashMap<Uuid, Booking>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventRepository for MemoryStore {
    async fn create(&self, event: &Event) -> AppResult<()> {
        let mut tables = self.tables.lock().await;
        if tables.events.contains_key(&event.id) {
            return Err(AppError::StorageError);
        }
        tables.events.insert(event.id, event.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Event>> {
        Ok(self.tables.lock().await.events.get(&id).cloned())
    }

    async fn list(&self, filter: &EventFilter) -> AppResult<Vec<Event>> {
        let tables = self.tables.lock().await;
        let mut events: Vec<Event> = tables
            .events
            .values()
            .filter(|event| filter.matches(event))
            .cloned()
            .collect();
        events.sort_by_key(|event| event.date);
        Ok(events)
    }

    async fn update(&self, id: Uuid, changes: &UpdateEventDto) -> AppResult<EventUpdate> {
        let mut tables = self.tables.lock().await;
        let Some(event) = tables.events.get_mut(&id) else {
            return Ok(EventUpdate::NotFound);
        };
        if let Some(total) = changes.total_tickets {
            let sold = event.tickets_sold();
            if total < sold {
                return Ok(EventUpdate::TotalBelowSold { sold });
            }
            event.tickets_available = total - sold;
            event.total_tickets = total;
        }
        if let Some(title) = &changes.title {
            event.title = title.clone();
        }
        if let Some(description) = &changes.description {
            event.description = description.clone();
        }
        if let Some(date) = changes.date {
            event.date = date;
        }
        if let Some(location) = &changes.location {
            event.location = location.clone();
        }
        if let Some(price) = changes.price {
            event.price = price;
        }
        if let Some(category) = changes.category {
            event.category = category;
        }
        if let Some(image_url) = &changes.image_url {
            event.image_url = Some(image_url.clone());
        }
        Ok(EventUpdate::Updated(event.clone()))
    }

    async fn delete_if_unbooked(&self, id: Uuid) -> AppResult<EventDeletion> {
        let mut tables = self.tables.lock().await;
        if !tables.events.contains_key(&id) {
            return Ok(EventDeletion::NotFound);
        }
        let has_active = tables
            .bookings
            .values()
            .any(|b| b.event_id == id && b.status == BookingStatus::Confirmed);
        if has_active {
            return Ok(EventDeletion::HasActiveBookings);
        }
        tables.events.remove(&id);
        Ok(EventDeletion::Deleted)
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Booking>> {
        Ok(self.tables.lock().await.bookings.get(&id).cloned())
    }

    async fn find_by_qr_code(&self, qr_code: &str) -> AppResult<Option<Booking>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .bookings
            .values()
            .find(|b| b.qr_code == qr_code)
            .cloned())
    }

    async fn list(&self, filter: &BookingFilter) -> AppResult<Vec<Booking>> {
        let tables = self.tables.lock().await;
        let mut bookings: Vec<Booking> = tables
            .bookings
            .values()
            .filter(|booking| filter.matches(booking))
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn create_reserving_tickets(&self, booking: &Booking) -> AppResult<Reservation> {
        let mut tables = self.tables.lock().await;
        let duplicate = tables.bookings.contains_key(&booking.id)
            || tables.bookings.values().any(|b| b.qr_code == booking.qr_code);
        if duplicate {
            return Err(AppError::StorageError);
        }
        let Some(event) = tables.events.get_mut(&booking.event_id) else {
            return Ok(Reservation::EventMissing);
        };
        if event.tickets_available < booking.quantity {
            return Ok(Reservation::SoldOut {
                available: event.tickets_available,
            });
        }
        event.tickets_available -= booking.quantity;
        let tickets_left = event.tickets_available;
        tables.bookings.insert(booking.id, booking.clone());
        Ok(Reservation::Reserved { tickets_left })
    }

    async fn cancel_releasing_tickets(&self, id: Uuid) -> AppResult<Option<Booking>> {
        let mut tables = self.tables.lock().await;
        let Some(booking) = tables.bookings.get_mut(&id) else {
            return Ok(None);
        };
        if booking.status != BookingStatus::Confirmed {
            return Ok(None);
        }
        booking.status = BookingStatus::Cancelled;
        let cancelled = booking.clone();
        if let Some(event) = tables.events.get_mut(&cancelled.event_id) {
            if event.tickets_available + cancelled.quantity <= event.total_tickets {
                event.tickets_available += cancelled.quantity;
            }
        }
        Ok(Some(cancelled))
    }

    async fn mark_used(&self, id: Uuid, used_at: DateTime<Utc>) -> AppResult<Option<Booking>> {
        let mut tables = self.tables.lock().await;
        match tables.bookings.get_mut(&id) {
            Some(booking) if booking.status == BookingStatus::Confirmed => {
                booking.status = BookingStatus::Used;
                booking.used_at = Some(used_at);
                Ok(Some(booking.clone()))
            }
            _ => Ok(None),
        }
    }
}
