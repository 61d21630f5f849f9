pub mod config;
pub mod db;
pub mod dto;
pub mod errors;
pub mod handlers;
pub mod mailer;
pub mod models;
pub mod service;
#[cfg(test)]
mod testing;

use std::{io, sync::Arc};

use actix_web::{web, App, HttpServer};
use config::{Config, MailTransport, StoreBackend};
use db::{init_db_pool, memory::MemoryStore, BookingRepository, EventRepository, PgStore};
use log::{error, info, warn};
use mailer::{LogMailer, Mailer, SmtpMailer};
use service::{auth::AuthMiddleware, log::LoggerMiddleware, AppContext};
use sqlx::{postgres::Postgres, Pool};
use tokio_util::sync::CancellationToken;

type PGPool = Pool<Postgres>;

type Repositories = (Arc<dyn EventRepository>, Arc<dyn BookingRepository>);

fn shared<S>(store: S) -> Repositories
where
    S: EventRepository + BookingRepository + 'static,
{
    let store = Arc::new(store);
    (store.clone(), store)
}

async fn build_context(config: Config) -> io::Result<AppContext> {
    let (events, bookings) = match &config.store {
        StoreBackend::Postgres { url } => {
            let pool = init_db_pool(url, config.db_max_connections, config.db_acquire_timeout)
                .await
                .map_err(|err| {
                    error!("failed to connect to postgresql: {}", err);
                    io::Error::new(io::ErrorKind::Other, err)
                })?;
            shared(PgStore::new(pool))
        }
        StoreBackend::Memory => {
            warn!("using the in-memory store, data is lost on shutdown");
            shared(MemoryStore::new())
        }
    };

    let mailer: Arc<dyn Mailer> = match &config.mail_transport {
        MailTransport::Log => Arc::new(LogMailer),
        MailTransport::Smtp(settings) => {
            let mailer = SmtpMailer::new(settings, &config.mail_from).map_err(|err| {
                error!("invalid smtp settings: {}", err);
                io::Error::new(io::ErrorKind::InvalidInput, err)
            })?;
            info!("sending mail through {}:{}", settings.host, settings.port);
            Arc::new(mailer)
        }
    };

    Ok(AppContext::new(events, bookings, mailer, config))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    service::log::init_logger();
    let config = Config::from_env().map_err(|err| {
        error!("configuration error: {}", err);
        io::Error::new(io::ErrorKind::InvalidInput, err)
    })?;
    let bind = (config.bind_addr.clone(), config.port);
    let reminder_interval = config.reminder_interval;
    let ctx = build_context(config).await?;

    let shutdown = CancellationToken::new();
    let scheduler = tokio::spawn(service::reminder::run_scheduler(
        ctx.clone(),
        reminder_interval,
        shutdown.clone(),
    ));

    info!("listening on {}:{}", bind.0, bind.1);
    let server_ctx = ctx.clone();
    let result = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(server_ctx.clone()))
            .wrap(LoggerMiddleware)
            .configure(handlers::init_public_routes)
            .service(
                web::scope("/api")
                    .wrap(AuthMiddleware {
                        config: server_ctx.config.clone(),
                    })
                    .configure(handlers::init_routes_with_auth),
            )
    })
    .bind(bind)?
    .run()
    .await;

    shutdown.cancel();
    if let Err(err) = scheduler.await {
        warn!("reminder scheduler ended abnormally: {}", err);
    }
    result
}
