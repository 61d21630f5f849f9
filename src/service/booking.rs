use chrono::Utc;
use log::{info, warn};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::{
    auth::UserAuthData,
    notification::{self, BookingConfirmation},
    AppContext,
};
use crate::{
    db::{BookingFilter, BookingRepository, EventRepository, Reservation},
    errors::{AppError, AppResult},
    models::{generate_qr_code, Booking, BookingStatus, MAX_TICKETS_PER_BOOKING},
};

/// Reserves `quantity` tickets for `user` and emails the ticket.
pub async fn create(
    ctx: &AppContext,
    event_id: Uuid,
    user: &UserAuthData,
    quantity: i32,
) -> AppResult<Booking> {
    if !(1..=MAX_TICKETS_PER_BOOKING).contains(&quantity) {
        return Err(AppError::InvalidQuantity {
            max: MAX_TICKETS_PER_BOOKING,
        });
    }
    let event = ctx
        .events
        .get_by_id(event_id)
        .await?
        .ok_or(AppError::NotFound { what: "event" })?;
    if event.tickets_available < quantity {
        return Err(AppError::CapacityExceeded {
            available: event.tickets_available,
        });
    }

    let booking = Booking {
        id: Uuid::new_v4(),
        event_id,
        user_id: user.user_id.clone(),
        user_name: user.name.clone(),
        user_email: user.email.clone(),
        event_title: event.title.clone(),
        quantity,
        total_price: event.price * Decimal::from(quantity),
        status: BookingStatus::Confirmed,
        qr_code: generate_qr_code(),
        used_at: None,
        created_at: Utc::now(),
    };

    match ctx.bookings.create_reserving_tickets(&booking).await? {
        Reservation::Reserved { tickets_left } => {
            info!(
                "booking {} reserved {} ticket(s) for event {}, {} left",
                booking.id, quantity, event_id, tickets_left
            );
        }
        Reservation::SoldOut { available } => {
            return Err(AppError::CapacityExceeded { available });
        }
        Reservation::EventMissing => return Err(AppError::NotFound { what: "event" }),
    }

    let confirmation = BookingConfirmation {
        to_email: &booking.user_email,
        guest_name: &booking.user_name,
        event_title: &booking.event_title,
        quantity: booking.quantity,
        total_price: booking.total_price,
        booking_id: booking.id,
        qr_code: &booking.qr_code,
    };
    if let Err(err) = notification::send_booking_confirmation(ctx.mailer.as_ref(), &confirmation).await
    {
        warn!(
            "confirmation email for booking {} was not sent: {}",
            booking.id, err
        );
    }

    Ok(booking)
}

pub async fn cancel(ctx: &AppContext, booking_id: Uuid, user: &UserAuthData) -> AppResult<Booking> {
    let booking = get(ctx, booking_id, user).await?;
    if booking.status != BookingStatus::Confirmed {
        return Err(AppError::InvalidState {
            reason: "only confirmed bookings can be cancelled",
        });
    }
    let cancelled = ctx
        .bookings
        .cancel_releasing_tickets(booking_id)
        .await?
        .ok_or(AppError::InvalidState {
            reason: "only confirmed bookings can be cancelled",
        })?;
    info!(
        "booking {} cancelled by {}, {} ticket(s) released",
        cancelled.id, user.user_id, cancelled.quantity
    );
    Ok(cancelled)
}

/// A booking as seen by its owner or an admin.
pub async fn get(ctx: &AppContext, booking_id: Uuid, user: &UserAuthData) -> AppResult<Booking> {
    let booking = ctx
        .bookings
        .get_by_id(booking_id)
        .await?
        .ok_or(AppError::NotFound { what: "booking" })?;
    if !user.is_admin && !booking.is_owned_by(&user.user_id) {
        return Err(AppError::Forbidden);
    }
    Ok(booking)
}

pub async fn list_mine(ctx: &AppContext, user: &UserAuthData) -> AppResult<Vec<Booking>> {
    ctx.bookings
        .list(&BookingFilter::for_user(&user.user_id))
        .await
}

/// Attendee list, visible to admins and the event's creator.
pub async fn list_for_event(
    ctx: &AppContext,
    event_id: Uuid,
    user: &UserAuthData,
) -> AppResult<Vec<Booking>> {
    let event = ctx
        .events
        .get_by_id(event_id)
        .await?
        .ok_or(AppError::NotFound { what: "event" })?;
    if !user.is_admin && event.created_by != user.user_id {
        return Err(AppError::Forbidden);
    }
    ctx.bookings.list(&BookingFilter::for_event(event_id)).await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures::future::join_all;

    use super::*;
    use crate::{
        mailer::testing::RecordingMailer,
        testing::{self, TestApp},
    };

    #[actix_rt::test]
    async fn booking_charges_quantity_times_price() {
        let app = TestApp::new();
        let event = testing::event_with_tickets(100, 100, Decimal::new(2000, 2));
        app.seed_event(&event).await;

        let booking = create(&app.ctx, event.id, &testing::guest("u1"), 3)
            .await
            .unwrap();
        assert_eq!(booking.total_price, Decimal::new(6000, 2));
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.event_title, event.title);
        assert!(booking.qr_code.starts_with("EVT-"));
        assert_eq!(app.event(event.id).await.tickets_available, 97);

        let sent = app.mailer.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "u1@example.com");
        assert!(sent[0].text_body.contains(&booking.qr_code));
    }

    #[actix_rt::test]
    async fn rejected_bookings_leave_inventory_alone() {
        let app = TestApp::new();
        let event = testing::event_with_tickets(10, 2, Decimal::ONE);
        app.seed_event(&event).await;
        let user = testing::guest("u1");

        for quantity in [0, 11, -1] {
            assert!(matches!(
                create(&app.ctx, event.id, &user, quantity).await,
                Err(AppError::InvalidQuantity { max: 10 })
            ));
        }
        assert!(matches!(
            create(&app.ctx, event.id, &user, 3).await,
            Err(AppError::CapacityExceeded { available: 2 })
        ));
        assert!(matches!(
            create(&app.ctx, Uuid::new_v4(), &user, 1).await,
            Err(AppError::NotFound { what: "event" })
        ));

        assert_eq!(app.event(event.id).await.tickets_available, 2);
        assert!(list_mine(&app.ctx, &user).await.unwrap().is_empty());
        assert!(app.mailer.sent().await.is_empty());
    }

    #[actix_rt::test]
    async fn mail_failure_does_not_fail_booking() {
        let app = TestApp::with_mailer(RecordingMailer::failing());
        let event = testing::event_with_tickets(5, 5, Decimal::ONE);
        app.seed_event(&event).await;

        let booking = create(&app.ctx, event.id, &testing::guest("u1"), 2)
            .await
            .unwrap();
        let stored = app.ctx.bookings.get_by_id(booking.id).await.unwrap();
        assert_eq!(stored, Some(booking));
        assert_eq!(app.event(event.id).await.tickets_available, 3);
    }

    #[actix_rt::test]
    async fn concurrent_bookings_never_oversell() {
        let app = Arc::new(TestApp::new());
        let event = testing::event_with_tickets(10, 10, Decimal::ONE);
        app.seed_event(&event).await;

        let attempts = (0..8).map(|i| {
            let app = app.clone();
            let user = testing::guest(&format!("u{}", i));
            async move { create(&app.ctx, event.id, &user, 3).await }
        });
        let results = join_all(attempts).await;

        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(succeeded, 3);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|err| matches!(err, AppError::CapacityExceeded { .. })));
        assert_eq!(app.event(event.id).await.tickets_available, 1);
    }

    #[actix_rt::test]
    async fn cancel_returns_tickets_to_inventory() {
        let app = TestApp::new();
        let event = testing::event_with_tickets(10, 7, Decimal::ONE);
        app.seed_event(&event).await;
        let user = testing::guest("u1");
        let booking = create(&app.ctx, event.id, &user, 2).await.unwrap();
        assert_eq!(app.event(event.id).await.tickets_available, 5);

        let cancelled = cancel(&app.ctx, booking.id, &user).await.unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert_eq!(app.event(event.id).await.tickets_available, 7);

        assert!(matches!(
            cancel(&app.ctx, booking.id, &user).await,
            Err(AppError::InvalidState { .. })
        ));
        assert_eq!(app.event(event.id).await.tickets_available, 7);
    }

    #[actix_rt::test]
    async fn used_tickets_cannot_be_cancelled() {
        let app = TestApp::new();
        let event = testing::event_with_tickets(10, 10, Decimal::ONE);
        app.seed_event(&event).await;
        let user = testing::guest("u1");
        let booking = create(&app.ctx, event.id, &user, 1).await.unwrap();
        app.ctx
            .bookings
            .mark_used(booking.id, Utc::now())
            .await
            .unwrap();

        assert!(matches!(
            cancel(&app.ctx, booking.id, &testing::admin()).await,
            Err(AppError::InvalidState { .. })
        ));
        assert_eq!(app.event(event.id).await.tickets_available, 9);
    }

    #[actix_rt::test]
    async fn only_owner_or_admin_may_touch_a_booking() {
        let app = TestApp::new();
        let event = testing::event_with_tickets(10, 10, Decimal::ONE);
        app.seed_event(&event).await;
        let booking = create(&app.ctx, event.id, &testing::guest("u1"), 1)
            .await
            .unwrap();

        let stranger = testing::guest("u2");
        assert!(matches!(
            get(&app.ctx, booking.id, &stranger).await,
            Err(AppError::Forbidden)
        ));
        assert!(matches!(
            cancel(&app.ctx, booking.id, &stranger).await,
            Err(AppError::Forbidden)
        ));
        assert!(matches!(
            list_for_event(&app.ctx, event.id, &stranger).await,
            Err(AppError::Forbidden)
        ));

        let admin = testing::admin();
        assert_eq!(get(&app.ctx, booking.id, &admin).await.unwrap().id, booking.id);
        assert_eq!(
            list_for_event(&app.ctx, event.id, &admin).await.unwrap().len(),
            1
        );
        let cancelled = cancel(&app.ctx, booking.id, &admin).await.unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
    }

    #[actix_rt::test]
    async fn inventory_stays_in_bounds_across_mixed_operations() {
        let app = TestApp::new();
        let event = testing::event_with_tickets(6, 6, Decimal::ONE);
        app.seed_event(&event).await;
        let user = testing::guest("u1");

        let mut live = Vec::new();
        for quantity in [2, 3, 2, 1, 4, 1] {
            if let Ok(booking) = create(&app.ctx, event.id, &user, quantity).await {
                live.push(booking);
            }
            let current = app.event(event.id).await;
            assert!(current.tickets_available >= 0);
            assert!(current.tickets_available <= current.total_tickets);
            if live.len() == 2 {
                let booking = live.remove(0);
                cancel(&app.ctx, booking.id, &user).await.unwrap();
            }
        }

        let confirmed: i32 = list_mine(&app.ctx, &user)
            .await
            .unwrap()
            .iter()
            .filter(|b| b.status == BookingStatus::Confirmed)
            .map(|b| b.quantity)
            .sum();
        assert_eq!(app.event(event.id).await.tickets_available, 6 - confirmed);
    }
}
