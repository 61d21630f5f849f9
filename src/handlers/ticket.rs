use actix_web::{post, web, HttpRequest, HttpResponse, ResponseError};
use log::info;

use crate::{
    dto::{TicketSnapshot, ValidateTicketDto, ValidationResponse},
    errors::AppError,
    service::{self, auth::current_user, AppContext},
};

const VALIDATED: &str = "Ticket validated successfully";

/// Scanner endpoint. Every outcome, including rejections, is rendered as a
/// `ValidationResponse` so the scanner can show guest details.
#[post("/tickets/validate")]
pub async fn validate(
    req: HttpRequest,
    dto: web::Json<ValidateTicketDto>,
    ctx: web::Data<AppContext>,
) -> Result<HttpResponse, AppError> {
    let user = current_user(&req)?;
    user.require_admin()?;

    let outcome = service::ticket::validate_and_redeem(&ctx, &dto.qr_code).await;
    Ok(render(outcome))
}

fn render(outcome: Result<TicketSnapshot, AppError>) -> HttpResponse {
    match outcome {
        Ok(ticket) => {
            info!("admitted booking {}", ticket.id);
            HttpResponse::Ok().json(ValidationResponse {
                valid: true,
                message: VALIDATED.to_string(),
                booking: Some(ticket),
            })
        }
        Err(err) => {
            let status = err.status_code();
            let message = match &err {
                AppError::ValidationFailed | AppError::InternalError | AppError::StorageError => {
                    "Internal server error".to_string()
                }
                other => other.to_string(),
            };
            let booking = match err {
                AppError::AlreadyUsed { ticket } | AppError::Cancelled { ticket } => Some(ticket),
                _ => None,
            };
            HttpResponse::build(status).json(ValidationResponse {
                valid: false,
                message,
                booking,
            })
        }
    }
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(validate);
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test};
    use rust_decimal::Decimal;
    use serde_json::{json, Value};

    use crate::{
        db::BookingRepository,
        handlers::test_support::{app, bearer},
        testing::{self, TestApp},
    };

    fn scan(token: (&'static str, String), qr_code: &str) -> test::TestRequest {
        test::TestRequest::post()
            .uri("/api/tickets/validate")
            .insert_header(token)
            .set_json(json!({ "qrCode": qr_code }))
    }

    #[actix_rt::test]
    async fn scanner_flow_reports_each_outcome() {
        let test_app = TestApp::new();
        let event = testing::event_with_tickets(10, 10, Decimal::new(1250, 2));
        test_app.seed_event(&event).await;
        let mut booking = testing::booking_for(&event, "u1", 2);
        booking.qr_code = "Q1".to_string();
        test_app
            .ctx
            .bookings
            .create_reserving_tickets(&booking)
            .await
            .unwrap();

        let service = test::init_service(app(test_app.ctx.clone())).await;
        let admin = bearer(&test_app.ctx, &testing::admin());

        let res = test::call_service(&service, scan(admin.clone(), "Q1").to_request()).await;
        let status = res.status();
        let body: Value = test::read_body_json(res).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["valid"], true);
        assert_eq!(body["message"], "Ticket validated successfully");
        assert_eq!(body["booking"]["userName"], "Guest u1");
        assert_eq!(body["booking"]["quantity"], 2);

        let res = test::call_service(&service, scan(admin.clone(), "Q1").to_request()).await;
        let status = res.status();
        let body: Value = test::read_body_json(res).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["valid"], false);
        assert_eq!(body["message"], "Ticket already used");
        assert!(body["booking"]["usedAt"].is_string());

        let res = test::call_service(&service, scan(admin.clone(), "UNKNOWN").to_request()).await;
        let status = res.status();
        let body: Value = test::read_body_json(res).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Invalid QR code - booking not found");
        assert!(body.get("booking").is_none());

        let res = test::call_service(&service, scan(admin, "").to_request()).await;
        let status = res.status();
        let body: Value = test::read_body_json(res).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "QR code is required");
    }

    #[actix_rt::test]
    async fn guests_cannot_scan() {
        let test_app = TestApp::new();
        let service = test::init_service(app(test_app.ctx.clone())).await;
        let token = bearer(&test_app.ctx, &testing::guest("u1"));
        let res = test::call_service(&service, scan(token, "Q1").to_request()).await;
        let status = res.status();
        let body: Value = test::read_body_json(res).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "forbidden");
    }
}
