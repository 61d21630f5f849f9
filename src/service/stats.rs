use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::{auth::UserAuthData, AppContext};
use crate::{
    db::{BookingFilter, BookingRepository, EventFilter, EventRepository},
    dto::DashboardStats,
    errors::AppResult,
    models::BookingStatus,
};

const RECENT_BOOKINGS: usize = 5;

/// Admin dashboard figures. Revenue and tickets sold count confirmed bookings only.
pub async fn dashboard(
    ctx: &AppContext,
    user: &UserAuthData,
    now: DateTime<Utc>,
) -> AppResult<DashboardStats> {
    user.require_admin()?;

    let events = ctx.events.list(&EventFilter::default()).await?;
    let active_events = events.iter().filter(|event| event.date > now).count();

    // newest first
    let confirmed = ctx
        .bookings
        .list(&BookingFilter::default().with_status(BookingStatus::Confirmed))
        .await?;
    let total_revenue: Decimal = confirmed.iter().map(|b| b.total_price).sum();
    let total_tickets_sold: i64 = confirmed.iter().map(|b| i64::from(b.quantity)).sum();

    Ok(DashboardStats {
        total_events: events.len(),
        active_events,
        total_bookings: confirmed.len(),
        total_revenue,
        total_tickets_sold,
        recent_bookings: confirmed.into_iter().take(RECENT_BOOKINGS).collect(),
    })
}
