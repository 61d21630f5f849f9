use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse};
use uuid::Uuid;

use crate::{
    dto::{EventQuery, NewEventDto, UpdateEventDto},
    errors::AppError,
    service::{self, auth::current_user, AppContext},
};

#[get("/events")]
pub async fn get_all(
    query: web::Query<EventQuery>,
    ctx: web::Data<AppContext>,
) -> Result<HttpResponse, AppError> {
    let events = service::event::list(&ctx, query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(events))
}

#[get("/events/{id}")]
pub async fn get_by_id(
    id: web::Path<Uuid>,
    ctx: web::Data<AppContext>,
) -> Result<HttpResponse, AppError> {
    let event = service::event::get_by_id(&ctx, id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(event))
}

#[post("/events")]
pub async fn create(
    req: HttpRequest,
    new_event_dto: web::Json<NewEventDto>,
    ctx: web::Data<AppContext>,
) -> Result<HttpResponse, AppError> {
    let user = current_user(&req)?;
    let event = service::event::create(&ctx, &user, new_event_dto.into_inner()).await?;
    Ok(HttpResponse::Created().json(event))
}

#[put("/events/{id}")]
pub async fn update(
    req: HttpRequest,
    id: web::Path<Uuid>,
    update_event_dto: web::Json<UpdateEventDto>,
    ctx: web::Data<AppContext>,
) -> Result<HttpResponse, AppError> {
    let user = current_user(&req)?;
    let event =
        service::event::update(&ctx, id.into_inner(), &user, update_event_dto.into_inner())
            .await?;
    Ok(HttpResponse::Ok().json(event))
}

#[delete("/events/{id}")]
pub async fn remove(
    req: HttpRequest,
    id: web::Path<Uuid>,
    ctx: web::Data<AppContext>,
) -> Result<HttpResponse, AppError> {
    let user = current_user(&req)?;
    service::event::delete(&ctx, id.into_inner(), &user).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn init_routes_with_auth(cfg: &mut web::ServiceConfig) {
    cfg.service(create);
    cfg.service(update);
    cfg.service(remove);
}

pub fn init_public_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(get_by_id);
    cfg.service(get_all);
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test};
    use chrono::{Duration, Utc};
    use serde_json::{json, Value};

    use crate::{
        handlers::test_support::{app, bearer},
        testing::{self, TestApp},
    };

    fn payload() -> Value {
        json!({
            "title": "Rust Workshop",
            "description": "Hands-on async Rust",
            "date": (Utc::now() + Duration::days(14)).to_rfc3339(),
            "location": "Lab 3",
            "totalTickets": 25,
            "price": "49.99",
            "category": "Workshop",
        })
    }

    #[actix_rt::test]
    async fn admin_creates_and_public_reads() {
        let test_app = TestApp::new();
        let service = test::init_service(app(test_app.ctx.clone())).await;

        let req = test::TestRequest::post()
            .uri("/api/events")
            .insert_header(bearer(&test_app.ctx, &testing::admin()))
            .set_json(payload())
            .to_request();
        let res = test::call_service(&service, req).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let created: Value = test::read_body_json(res).await;
        assert_eq!(created["ticketsAvailable"], 25);
        assert_eq!(created["price"], "49.99");

        let id = created["id"].as_str().unwrap().to_string();
        let req = test::TestRequest::get()
            .uri(&format!("/events/{}", id))
            .to_request();
        let fetched: Value = test::call_and_read_body_json(&service, req).await;
        assert_eq!(fetched["title"], "Rust Workshop");

        let req = test::TestRequest::get()
            .uri("/events?category=Workshop")
            .to_request();
        let listed: Vec<Value> = test::call_and_read_body_json(&service, req).await;
        assert_eq!(listed.len(), 1);
    }

    #[actix_rt::test]
    async fn writes_require_token_and_role() {
        let test_app = TestApp::new();
        let service = test::init_service(app(test_app.ctx.clone())).await;

        let req = test::TestRequest::post()
            .uri("/api/events")
            .set_json(payload())
            .to_request();
        let res = test::call_service(&service, req).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::post()
            .uri("/api/events")
            .insert_header(bearer(&test_app.ctx, &testing::guest("u1")))
            .set_json(payload())
            .to_request();
        let res = test::call_service(&service, req).await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[actix_rt::test]
    async fn unknown_event_is_404() {
        let test_app = TestApp::new();
        let service = test::init_service(app(test_app.ctx.clone())).await;
        let req = test::TestRequest::get()
            .uri(&format!("/events/{}", uuid::Uuid::new_v4()))
            .to_request();
        let res = test::call_service(&service, req).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["error"], "event not found");
    }
}
