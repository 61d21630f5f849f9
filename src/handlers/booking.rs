use actix_web::{get, post, web, HttpRequest, HttpResponse};
use uuid::Uuid;

use crate::{
    dto::NewBookingDto,
    errors::AppError,
    service::{self, auth::current_user, AppContext},
};

#[post("/events/{id}/bookings")]
pub async fn create(
    req: HttpRequest,
    event_id: web::Path<Uuid>,
    dto: web::Json<NewBookingDto>,
    ctx: web::Data<AppContext>,
) -> Result<HttpResponse, AppError> {
    let user = current_user(&req)?;
    let booking =
        service::booking::create(&ctx, event_id.into_inner(), &user, dto.quantity).await?;
    Ok(HttpResponse::Created().json(booking))
}

#[get("/events/{id}/bookings")]
pub async fn get_for_event(
    req: HttpRequest,
    event_id: web::Path<Uuid>,
    ctx: web::Data<AppContext>,
) -> Result<HttpResponse, AppError> {
    let user = current_user(&req)?;
    let bookings = service::booking::list_for_event(&ctx, event_id.into_inner(), &user).await?;
    Ok(HttpResponse::Ok().json(bookings))
}

#[get("/bookings")]
pub async fn get_mine(req: HttpRequest, ctx: web::Data<AppContext>) -> Result<HttpResponse, AppError> {
    let user = current_user(&req)?;
    let bookings = service::booking::list_mine(&ctx, &user).await?;
    Ok(HttpResponse::Ok().json(bookings))
}

#[get("/bookings/{id}")]
pub async fn get_by_id(
    req: HttpRequest,
    id: web::Path<Uuid>,
    ctx: web::Data<AppContext>,
) -> Result<HttpResponse, AppError> {
    let user = current_user(&req)?;
    let booking = service::booking::get(&ctx, id.into_inner(), &user).await?;
    Ok(HttpResponse::Ok().json(booking))
}

#[post("/bookings/{id}/cancel")]
pub async fn cancel(
    req: HttpRequest,
    id: web::Path<Uuid>,
    ctx: web::Data<AppContext>,
) -> Result<HttpResponse, AppError> {
    let user = current_user(&req)?;
    let booking = service::booking::cancel(&ctx, id.into_inner(), &user).await?;
    Ok(HttpResponse::Ok().json(booking))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create)
        .service(get_for_event)
        .service(get_mine)
        .service(get_by_id)
        .service(cancel);
}
