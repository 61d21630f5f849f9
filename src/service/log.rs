use env_logger::Builder;
use log::{Level, info, warn};
use std::io::Write;
use std::future::{ready, Ready};
use std::time::Instant;
use actix_web::{
   dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
   Error,
};
use colored::{ColoredString, Colorize};
use futures_util::future::LocalBoxFuture;

pub struct LoggerMiddleware;

impl<S, B> Transform<S, ServiceRequest> for LoggerMiddleware
where
   S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
   S::Future: 'static,
   B: 'static,
{
   type Response = ServiceResponse<B>;
   type Error = Error;
   type InitError = ();
   type Transform = LoggerMiddlewareService<S>;
   type Future = Ready<Result<Self::Transform, Self::InitError>>;

   fn new_transform(&self, service: S) -> Self::Future {
      ready(Ok(LoggerMiddlewareService { service }))
   }
}

pub struct LoggerMiddlewareService<S> {
   service: S
}

impl<S, B> Service<ServiceRequest> for LoggerMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
   type Response = ServiceResponse<B>;
   type Error = Error;
   type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

   forward_ready!(service);

   fn call(&self, req: ServiceRequest) -> Self::Future {
      let method = req.method().clone();
      let path = req.path().to_string();
      info!("server request: {} {}", method, req.uri());
      let started = Instant::now();
      let fut = self.service.call(req);

      Box::pin(async move {
         let res = fut.await?;
         let status = res.status();
         let elapsed_ms = started.elapsed().as_millis();
         if status.is_server_error() {
            warn!("server response: {} {} {} in {}ms", method, path, status, elapsed_ms);
         } else {
            info!("server response: {} {} {} in {}ms", method, path, status, elapsed_ms);
         }
         Ok(res)
      })
   }
}

fn paint(level: Level) -> ColoredString {
   let label = level.as_str();
   match level {
      Level::Error => label.red().bold(),
      Level::Warn => label.yellow().bold(),
      Level::Info => label.green().bold(),
      Level::Debug => label.blue().bold(),
      Level::Trace => label.magenta().bold(),
   }
}

/// Colored `LEVEL target - message` lines, filtered by `RUST_LOG` (default `info`).
pub fn init_logger() {
   Builder::from_env(env_logger::Env::default().default_filter_or("info"))
   .format(|buf, record| {
      writeln!(buf, "{} {} - {}", paint(record.level()), record.target(), record.args())
   })
   .init()
}
