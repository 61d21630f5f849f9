use chrono::Utc;
use log::info;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::{auth::UserAuthData, AppContext};
use crate::{
    db::{EventDeletion, EventFilter, EventRepository, EventUpdate},
    dto::{EventQuery, NewEventDto, UpdateEventDto},
    errors::{AppError, AppResult},
    models::{Event, MAX_TICKETS_PER_EVENT},
};

pub async fn create(ctx: &AppContext, user: &UserAuthData, dto: NewEventDto) -> AppResult<Event> {
    user.require_admin()?;
    check_text("title", &dto.title)?;
    check_text("location", &dto.location)?;
    check_total_tickets(dto.total_tickets)?;
    check_price(dto.price)?;

    let event = Event {
        id: Uuid::new_v4(),
        title: dto.title.trim().to_string(),
        description: dto.description,
        date: dto.date,
        location: dto.location.trim().to_string(),
        total_tickets: dto.total_tickets,
        tickets_available: dto.total_tickets,
        price: dto.price,
        category: dto.category,
        image_url: dto.image_url,
        created_by: user.user_id.clone(),
        created_at: Utc::now(),
    };
    ctx.events.create(&event).await?;
    info!("event {} '{}' created by {}", event.id, event.title, user.user_id);
    Ok(event)
}

pub async fn get_by_id(ctx: &AppContext, id: Uuid) -> AppResult<Event> {
    ctx.events
        .get_by_id(id)
        .await?
        .ok_or(AppError::NotFound { what: "event" })
}

pub async fn list(ctx: &AppContext, query: EventQuery) -> AppResult<Vec<Event>> {
    if let (Some(from), Some(to)) = (query.from, query.to) {
        if from > to {
            return Err(AppError::InvalidInput {
                reason: "'from' must not be after 'to'".to_string(),
            });
        }
    }
    let filter = EventFilter {
        date_from: query.from,
        date_to: query.to,
        category: query.category,
        created_by: None,
    };
    ctx.events.list(&filter).await
}

pub async fn update(
    ctx: &AppContext,
    id: Uuid,
    user: &UserAuthData,
    changes: UpdateEventDto,
) -> AppResult<Event> {
    if changes.is_empty() {
        return Err(AppError::InvalidInput {
            reason: "no fields to update".to_string(),
        });
    }
    if let Some(title) = &changes.title {
        check_text("title", title)?;
    }
    if let Some(location) = &changes.location {
        check_text("location", location)?;
    }
    if let Some(total) = changes.total_tickets {
        check_total_tickets(total)?;
    }
    if let Some(price) = changes.price {
        check_price(price)?;
    }
    let event = get_by_id(ctx, id).await?;
    check_organizer(&event, user)?;

    match ctx.events.update(id, &changes).await? {
        EventUpdate::Updated(event) => {
            info!("event {} updated by {}", id, user.user_id);
            Ok(event)
        }
        EventUpdate::NotFound => Err(AppError::NotFound { what: "event" }),
        EventUpdate::TotalBelowSold { sold } => Err(AppError::InvalidInput {
            reason: format!("totalTickets cannot be below the {} tickets already sold", sold),
        }),
    }
}

pub async fn delete(ctx: &AppContext, id: Uuid, user: &UserAuthData) -> AppResult<()> {
    let event = get_by_id(ctx, id).await?;
    check_organizer(&event, user)?;

    match ctx.events.delete_if_unbooked(id).await? {
        EventDeletion::Deleted => {
            info!("event {} deleted by {}", id, user.user_id);
            Ok(())
        }
        EventDeletion::NotFound => Err(AppError::NotFound { what: "event" }),
        EventDeletion::HasActiveBookings => Err(AppError::InvalidState {
            reason: "event has confirmed bookings",
        }),
    }
}

fn check_organizer(event: &Event, user: &UserAuthData) -> AppResult<()> {
    if user.is_admin || event.created_by == user.user_id {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

fn check_text(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::InvalidInput {
            reason: format!("{} must not be empty", field),
        });
    }
    Ok(())
}

fn check_total_tickets(total: i32) -> AppResult<()> {
    if !(0..=MAX_TICKETS_PER_EVENT).contains(&total) {
        return Err(AppError::InvalidInput {
            reason: format!("totalTickets must be between 0 and {}", MAX_TICKETS_PER_EVENT),
        });
    }
    Ok(())
}

fn check_price(price: Decimal) -> AppResult<()> {
    if price < Decimal::ZERO {
        return Err(AppError::InvalidInput {
            reason: "price must not be negative".to_string(),
        });
    }
    Ok(())
}
