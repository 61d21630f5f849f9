use actix_web::{
    error,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use derive_more::{Display, Error};
use log::error;

use crate::dto::TicketSnapshot;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Display, Error)]
pub enum AppError {
    #[display(fmt = "{} not found", what)]
    NotFound { what: &'static str },

    #[display(fmt = "quantity must be between 1 and {}", max)]
    InvalidQuantity { max: i32 },

    #[display(fmt = "not enough tickets available ({} left)", available)]
    CapacityExceeded { available: i32 },

    #[display(fmt = "{}", reason)]
    InvalidState { reason: &'static str },

    #[display(fmt = "Invalid QR code - booking not found")]
    UnknownQrCode,

    #[display(fmt = "Ticket already used")]
    AlreadyUsed { ticket: TicketSnapshot },

    #[display(fmt = "Ticket has been cancelled")]
    Cancelled { ticket: TicketSnapshot },

    #[display(fmt = "forbidden")]
    Forbidden,

    #[display(fmt = "unauthorized")]
    Unauthorized,

    #[display(fmt = "{}", reason)]
    InvalidInput { reason: String },

    #[display(fmt = "storage error")]
    StorageError,

    #[display(fmt = "ticket validation failed")]
    ValidationFailed,

    #[display(fmt = "internal error")]
    InternalError,
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        error!("storage failure: {}", err);
        AppError::StorageError
    }
}

impl error::ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(serde_json::json!({ "error": self.to_string() }))
    }

    fn status_code(&self) -> StatusCode {
        match *self {
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::InvalidQuantity { .. } => StatusCode::BAD_REQUEST,
            AppError::CapacityExceeded { .. } => StatusCode::CONFLICT,
            AppError::InvalidState { .. } => StatusCode::CONFLICT,
            AppError::UnknownQrCode => StatusCode::NOT_FOUND,
            AppError::AlreadyUsed { .. } => StatusCode::BAD_REQUEST,
            AppError::Cancelled { .. } => StatusCode::BAD_REQUEST,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            AppError::StorageError => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ValidationFailed => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
