//! Day-ahead reminders for guests with confirmed bookings.
//!
//! A sweep targets events starting between 24 and 48 hours from `now`. It is
//! at-least-once: running it twice inside the same window sends twice.

use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use super::{
    notification::{self, EventReminder},
    AppContext,
};
use crate::{
    db::{BookingFilter, BookingRepository, EventFilter, EventRepository},
    dto::SweepReport,
    errors::AppResult,
    models::BookingStatus,
};

const WINDOW_START_HOURS: i64 = 24;
const WINDOW_END_HOURS: i64 = 48;

pub async fn run_sweep(ctx: &AppContext, now: DateTime<Utc>) -> AppResult<SweepReport> {
    let window = EventFilter::between(
        now + chrono::Duration::hours(WINDOW_START_HOURS),
        now + chrono::Duration::hours(WINDOW_END_HOURS),
    );
    let events = ctx.events.list(&window).await?;
    let mut report = SweepReport {
        events_scanned: events.len(),
        ..Default::default()
    };
    if events.is_empty() {
        debug!("reminder sweep: no upcoming events");
        return Ok(report);
    }

    for event in &events {
        let bookings = match ctx
            .bookings
            .list(&BookingFilter::for_event(event.id).with_status(BookingStatus::Confirmed))
            .await
        {
            Ok(bookings) => bookings,
            Err(err) => {
                warn!("skipping reminders for event {}: {}", event.id, err);
                report.events_failed += 1;
                continue;
            }
        };
        for booking in &bookings {
            let reminder = EventReminder {
                to_email: &booking.user_email,
                guest_name: &booking.user_name,
                event_title: &event.title,
                event_date: event.date,
                location: &event.location,
                quantity: booking.quantity,
                qr_code: &booking.qr_code,
            };
            match notification::send_event_reminder(ctx.mailer.as_ref(), &reminder).await {
                Ok(()) => report.reminders_sent += 1,
                Err(err) => {
                    warn!(
                        "reminder for booking {} to {} failed: {}",
                        booking.id, booking.user_email, err
                    );
                    report.reminders_failed += 1;
                }
            }
        }
    }

    info!(
        "reminder sweep: {} event(s) ({} unreadable), {} sent, {} failed",
        report.events_scanned, report.events_failed, report.reminders_sent, report.reminders_failed
    );
    Ok(report)
}

/// Runs a sweep every `period` until `cancel` fires. The first sweep runs
/// immediately.
pub async fn run_scheduler(ctx: AppContext, period: Duration, cancel: CancellationToken) {
    info!("reminder scheduler started, every {}s", period.as_secs());
    let mut interval = tokio::time::interval(period);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("reminder scheduler stopping");
                break;
            }
            _ = interval.tick() => {
                if let Err(err) = run_sweep(&ctx, Utc::now()).await {
                    warn!("reminder sweep aborted: {}", err);
                }
            }
        }
    }
}
