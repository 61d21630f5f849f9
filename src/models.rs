use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use derive_more::{Display, Error};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Upper bound on tickets a single booking may claim.
pub const MAX_TICKETS_PER_BOOKING: i32 = 10;

/// Upper bound on an event's ticket inventory.
pub const MAX_TICKETS_PER_EVENT: i32 = 10_000;

const QR_CODE_PREFIX: &str = "EVT";

#[derive(Debug, Display, Error)]
#[display(fmt = "unknown {} '{}'", kind, value)]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Conference,
    Workshop,
    Meetup,
    Concert,
    Sports,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Conference => "Conference",
            Category::Workshop => "Workshop",
            Category::Meetup => "Meetup",
            Category::Concert => "Concert",
            Category::Sports => "Sports",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Conference" => Ok(Category::Conference),
            "Workshop" => Ok(Category::Workshop),
            "Meetup" => Ok(Category::Meetup),
            "Concert" => Ok(Category::Concert),
            "Sports" => Ok(Category::Sports),
            "Other" => Ok(Category::Other),
            other => Err(ParseEnumError {
                kind: "category",
                value: other.to_string(),
            }),
        }
    }
}

/// Booking state machine. `Cancelled` and `Used` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
    Used,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Used => "used",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, BookingStatus::Confirmed)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            "used" => Ok(BookingStatus::Used),
            other => Err(ParseEnumError {
                kind: "booking status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub location: String,
    pub total_tickets: i32,
    pub tickets_available: i32,
    pub price: Decimal,
    pub category: Category,
    pub image_url: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn tickets_sold(&self) -> i32 {
        self.total_tickets - self.tickets_available
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
    pub event_title: String,
    pub quantity: i32,
    pub total_price: Decimal,
    pub status: BookingStatus,
    pub qr_code: String,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

/// Issues a fresh ticket token. Tokens are random and carry no booking data.
pub fn generate_qr_code() -> String {
    format!("{}-{}", QR_CODE_PREFIX, Uuid::new_v4().simple()).to_uppercase()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn qr_codes_are_unique_and_prefixed() {
        let codes: HashSet<String> = (0..1000).map(|_| generate_qr_code()).collect();
        assert_eq!(codes.len(), 1000);
        assert!(codes.iter().all(|c| c.starts_with("EVT-") && c.len() == 36));
    }

    #[test]
    fn status_strings_round_trip_through_storage_form() {
        for status in [
            BookingStatus::Confirmed,
            BookingStatus::Cancelled,
            BookingStatus::Used,
        ] {
            assert_eq!(status.as_str().parse::<BookingStatus>().unwrap(), status);
        }
        assert!("refunded".parse::<BookingStatus>().is_err());
        assert!(BookingStatus::Used.is_terminal());
        assert!(!BookingStatus::Confirmed.is_terminal());
    }

    #[test]
    fn unknown_category_is_rejected() {
        let err = "Opera".parse::<Category>().unwrap_err();
        assert_eq!(err.to_string(), "unknown category 'Opera'");
        assert_eq!("Sports".parse::<Category>().unwrap(), Category::Sports);
    }
}
