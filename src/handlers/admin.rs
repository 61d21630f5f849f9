use actix_web::{get, post, web, HttpRequest, HttpResponse};
use chrono::Utc;

use crate::{
    errors::AppError,
    service::{self, auth::current_user, AppContext},
};

#[get("/admin/stats")]
pub async fn stats(req: HttpRequest, ctx: web::Data<AppContext>) -> Result<HttpResponse, AppError> {
    let user = current_user(&req)?;
    let stats = service::stats::dashboard(&ctx, &user, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(stats))
}

#[post("/admin/reminders/run")]
pub async fn run_reminders(
    req: HttpRequest,
    ctx: web::Data<AppContext>,
) -> Result<HttpResponse, AppError> {
    current_user(&req)?.require_admin()?;
    let report = service::reminder::run_sweep(&ctx, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(report))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(stats).service(run_reminders);
}
