use chrono::Utc;
use log::{error, info};

use super::AppContext;
use crate::{
    db::BookingRepository,
    dto::TicketSnapshot,
    errors::{AppError, AppResult},
    models::{Booking, BookingStatus},
};

/// Redeems the ticket behind `qr_code` exactly once.
///
/// Any storage failure surfaces as [`AppError::ValidationFailed`]. When a
/// concurrent scanner wins the race the booking is re-read and reported the
/// same way a second scan would be.
pub async fn validate_and_redeem(ctx: &AppContext, qr_code: &str) -> AppResult<TicketSnapshot> {
    let qr_code = qr_code.trim();
    if qr_code.is_empty() {
        return Err(AppError::InvalidInput {
            reason: "QR code is required".to_string(),
        });
    }

    let booking = ctx
        .bookings
        .find_by_qr_code(qr_code)
        .await
        .map_err(storage_failure)?
        .ok_or(AppError::UnknownQrCode)?;
    reject_terminal(&booking)?;

    match ctx
        .bookings
        .mark_used(booking.id, Utc::now())
        .await
        .map_err(storage_failure)?
    {
        Some(redeemed) => {
            info!(
                "ticket {} redeemed for '{}' ({} guest(s))",
                redeemed.id, redeemed.event_title, redeemed.quantity
            );
            Ok(TicketSnapshot::from(&redeemed))
        }
        None => {
            let current = ctx
                .bookings
                .get_by_id(booking.id)
                .await
                .map_err(storage_failure)?
                .ok_or(AppError::UnknownQrCode)?;
            reject_terminal(&current)?;
            error!("booking {} stayed confirmed after redemption", current.id);
            Err(AppError::ValidationFailed)
        }
    }
}

fn reject_terminal(booking: &Booking) -> AppResult<()> {
    match booking.status {
        BookingStatus::Confirmed => Ok(()),
        BookingStatus::Used => Err(AppError::AlreadyUsed {
            ticket: TicketSnapshot::from(booking),
        }),
        BookingStatus::Cancelled => Err(AppError::Cancelled {
            ticket: TicketSnapshot::from(booking),
        }),
    }
}

fn storage_failure(err: AppError) -> AppError {
    error!("ticket validation aborted: {}", err);
    AppError::ValidationFailed
}
