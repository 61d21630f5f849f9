use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, error};
use rust_decimal::Decimal;
use sqlx::{prelude::FromRow, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{BookingFilter, BookingRepository, PgStore, Reservation};
use crate::{
    errors::{AppError, AppResult},
    models::Booking,
};

const BOOKING_COLUMNS: &str = "id, event_id, user_id, user_name, user_email, event_title, \
    quantity, total_price, status, qr_code, used_at, created_at";

#[derive(Debug, FromRow)]
pub struct BookingRow {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
    pub event_title: String,
    pub quantity: i32,
    pub total_price: Decimal,
    pub status: String,
    pub qr_code: String,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = AppError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let status = row.status.parse().map_err(|err| {
            error!("booking {} has a malformed row: {}", row.id, err);
            AppError::StorageError
        })?;
        Ok(Booking {
            id: row.id,
            event_id: row.event_id,
            user_id: row.user_id,
            user_name: row.user_name,
            user_email: row.user_email,
            event_title: row.event_title,
            quantity: row.quantity,
            total_price: row.total_price,
            status,
            qr_code: row.qr_code,
            used_at: row.used_at,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl BookingRepository for PgStore {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Booking::try_from).transpose()
    }

    async fn find_by_qr_code(&self, qr_code: &str) -> AppResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE qr_code = $1"
        ))
        .bind(qr_code)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Booking::try_from).transpose()
    }

    async fn list(&self, filter: &BookingFilter) -> AppResult<Vec<Booking>> {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE TRUE"));
        if let Some(event_id) = filter.event_id {
            query_builder.push(" AND event_id = ").push_bind(event_id);
        }
        if let Some(user_id) = &filter.user_id {
            query_builder
                .push(" AND user_id = ")
                .push_bind(user_id.clone());
        }
        if let Some(qr_code) = &filter.qr_code {
            query_builder
                .push(" AND qr_code = ")
                .push_bind(qr_code.clone());
        }
        if let Some(status) = filter.status {
            query_builder.push(" AND status = ").push_bind(status.as_str());
        }
        query_builder.push(" ORDER BY created_at DESC");

        let rows = query_builder
            .build_query_as::<BookingRow>()
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Booking::try_from).collect()
    }

    async fn create_reserving_tickets(&self, booking: &Booking) -> AppResult<Reservation> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO bookings (id, event_id, user_id, user_name, user_email, event_title, \
             quantity, total_price, status, qr_code, used_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(booking.id)
        .bind(booking.event_id)
        .bind(&booking.user_id)
        .bind(&booking.user_name)
        .bind(&booking.user_email)
        .bind(&booking.event_title)
        .bind(booking.quantity)
        .bind(booking.total_price)
        .bind(booking.status.as_str())
        .bind(&booking.qr_code)
        .bind(booking.used_at)
        .bind(booking.created_at)
        .execute(&mut *tx)
        .await?;

        let tickets_left: Option<i32> = sqlx::query_scalar(
            "UPDATE events SET tickets_available = tickets_available - $2 \
             WHERE id = $1 AND tickets_available >= $2 \
             RETURNING tickets_available",
        )
        .bind(booking.event_id)
        .bind(booking.quantity)
        .fetch_optional(&mut *tx)
        .await?;

        match tickets_left {
            Some(tickets_left) => {
                tx.commit().await?;
                Ok(Reservation::Reserved { tickets_left })
            }
            None => {
                let available: Option<i32> =
                    sqlx::query_scalar("SELECT tickets_available FROM events WHERE id = $1")
                        .bind(booking.event_id)
                        .fetch_optional(&mut *tx)
                        .await?;
                tx.rollback().await?;
                debug!(
                    "booking {} rolled back, event {} has {:?} tickets",
                    booking.id, booking.event_id, available
                );
                Ok(match available {
                    Some(available) => Reservation::SoldOut { available },
                    None => Reservation::EventMissing,
                })
            }
        }
    }

    async fn cancel_releasing_tickets(&self, id: Uuid) -> AppResult<Option<Booking>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "UPDATE bookings SET status = 'cancelled' \
             WHERE id = $1 AND status = 'confirmed' \
             RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };

        let released = sqlx::query(
            "UPDATE events SET tickets_available = tickets_available + $2 \
             WHERE id = $1 AND tickets_available + $2 <= total_tickets",
        )
        .bind(row.event_id)
        .bind(row.quantity)
        .execute(&mut *tx)
        .await?;
        if released.rows_affected() == 0 {
            debug!(
                "cancelled booking {} released no inventory on event {}",
                row.id, row.event_id
            );
        }

        tx.commit().await?;
        Booking::try_from(row).map(Some)
    }

    async fn mark_used(&self, id: Uuid, used_at: DateTime<Utc>) -> AppResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "UPDATE bookings SET status = 'used', used_at = $2 \
             WHERE id = $1 AND status = 'confirmed' \
             RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(id)
        .bind(used_at)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Booking::try_from).transpose()
    }
}
