use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, error};
use rust_decimal::Decimal;
use sqlx::{prelude::FromRow, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{EventDeletion, EventFilter, EventRepository, EventUpdate, PgStore};
use crate::{
    dto::UpdateEventDto,
    errors::{AppError, AppResult},
    models::Event,
};

const EVENT_COLUMNS: &str = "id, title, description, date, location, total_tickets, \
    tickets_available, price, category, image_url, created_by, created_at";

#[derive(Debug, FromRow)]
pub struct EventRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub location: String,
    pub total_tickets: i32,
    pub tickets_available: i32,
    pub price: Decimal,
    pub category: String,
    pub image_url: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = AppError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let category = row.category.parse().map_err(|err| {
            error!("event {} has a malformed row: {}", row.id, err);
            AppError::StorageError
        })?;
        Ok(Event {
            id: row.id,
            title: row.title,
            description: row.description,
            date: row.date,
            location: row.location,
            total_tickets: row.total_tickets,
            tickets_available: row.tickets_available,
            price: row.price,
            category,
            image_url: row.image_url,
            created_by: row.created_by,
            created_at: row.created_at,
        })
    }
}

#[async_trait]
impl EventRepository for PgStore {
    async fn create(&self, event: &Event) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO events (id, title, description, date, location, total_tickets, \
             tickets_available, price, category, image_url, created_by, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(event.id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.date)
        .bind(&event.location)
        .bind(event.total_tickets)
        .bind(event.tickets_available)
        .bind(event.price)
        .bind(event.category.as_str())
        .bind(&event.image_url)
        .bind(&event.created_by)
        .bind(event.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Event>> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Event::try_from).transpose()
    }

    async fn list(&self, filter: &EventFilter) -> AppResult<Vec<Event>> {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {EVENT_COLUMNS} FROM events WHERE TRUE"));
        if let Some(from) = filter.date_from {
            query_builder.push(" AND date >= ").push_bind(from);
        }
        if let Some(to) = filter.date_to {
            query_builder.push(" AND date <= ").push_bind(to);
        }
        if let Some(category) = filter.category {
            query_builder
                .push(" AND category = ")
                .push_bind(category.as_str());
        }
        if let Some(created_by) = &filter.created_by {
            query_builder
                .push(" AND created_by = ")
                .push_bind(created_by.clone());
        }
        query_builder.push(" ORDER BY date ASC");

        let rows = query_builder
            .build_query_as::<EventRow>()
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Event::try_from).collect()
    }

    async fn update(&self, id: Uuid, changes: &UpdateEventDto) -> AppResult<EventUpdate> {
        if changes.is_empty() {
            return Ok(match EventRepository::get_by_id(self, id).await? {
                Some(event) => EventUpdate::Updated(event),
                None => EventUpdate::NotFound,
            });
        }

        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE events SET ");
        let mut separated = query_builder.separated(", ");
        if let Some(title) = &changes.title {
            separated.push("title = ").push_bind_unseparated(title.clone());
        }
        if let Some(description) = &changes.description {
            separated
                .push("description = ")
                .push_bind_unseparated(description.clone());
        }
        if let Some(date) = changes.date {
            separated.push("date = ").push_bind_unseparated(date);
        }
        if let Some(location) = &changes.location {
            separated
                .push("location = ")
                .push_bind_unseparated(location.clone());
        }
        if let Some(price) = changes.price {
            separated.push("price = ").push_bind_unseparated(price);
        }
        if let Some(category) = changes.category {
            separated
                .push("category = ")
                .push_bind_unseparated(category.as_str());
        }
        if let Some(image_url) = &changes.image_url {
            separated
                .push("image_url = ")
                .push_bind_unseparated(image_url.clone());
        }
        if let Some(total) = changes.total_tickets {
            // right-hand `total_tickets` is the pre-update value
            separated
                .push("tickets_available = tickets_available + (")
                .push_bind_unseparated(total)
                .push_unseparated(" - total_tickets)");
            separated
                .push("total_tickets = ")
                .push_bind_unseparated(total);
        }
        query_builder.push(" WHERE id = ").push_bind(id);
        if let Some(total) = changes.total_tickets {
            query_builder
                .push(" AND total_tickets - tickets_available <= ")
                .push_bind(total);
        }
        query_builder.push(format!(" RETURNING {EVENT_COLUMNS}"));
        debug!("event update: {}", query_builder.sql());

        let row = query_builder
            .build_query_as::<EventRow>()
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(EventUpdate::Updated(Event::try_from(row)?)),
            None => Ok(match EventRepository::get_by_id(self, id).await? {
                Some(event) => EventUpdate::TotalBelowSold {
                    sold: event.tickets_sold(),
                },
                None => EventUpdate::NotFound,
            }),
        }
    }

    async fn delete_if_unbooked(&self, id: Uuid) -> AppResult<EventDeletion> {
        let mut tx = self.pool.begin().await?;

        // The row lock serializes with the decrement in `create_reserving_tickets`;
        // the booking check below must run as a later statement to see its commit.
        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM events WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            tx.rollback().await?;
            return Ok(EventDeletion::NotFound);
        }

        let has_active: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM bookings WHERE event_id = $1 AND status = 'confirmed')",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if has_active {
            tx.rollback().await?;
            debug!("event {} kept, it has confirmed bookings", id);
            return Ok(EventDeletion::HasActiveBookings);
        }

        sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(EventDeletion::Deleted)
    }
}
