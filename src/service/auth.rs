use std::{
    future::{ready, Ready},
    sync::Arc,
};

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    HttpMessage, HttpRequest,
};
use futures_util::future::LocalBoxFuture;
use log::debug;

use crate::{config::Config, errors::AppError};

/// Identity of the caller, placed in request extensions by [`AuthMiddleware`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAuthData {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
}

impl UserAuthData {
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

/// Pulls the authenticated caller out of a request that passed [`AuthMiddleware`].
pub fn current_user(req: &HttpRequest) -> Result<UserAuthData, AppError> {
    req.extensions()
        .get::<UserAuthData>()
        .cloned()
        .ok_or(AppError::Unauthorized)
}

pub struct AuthMiddleware {
    pub config: Arc<Config>,
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = actix_web::Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service,
            config: self.config.clone(),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
    config: Arc<Config>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let user = jwt::parse_request(&req, "Bearer ")
            .and_then(|token| jwt::authenticate(&token, &self.config));
        match user {
            Ok(user) => {
                req.extensions_mut().insert(user);
                let fut = self.service.call(req);
                Box::pin(async move { Ok(fut.await?.map_into_left_body()) })
            }
            Err(err) => {
                debug!("rejected {} {}: {}", req.method(), req.path(), err);
                let res = req.error_response(err).map_into_right_body();
                Box::pin(async move { Ok(res) })
            }
        }
    }
}

pub mod jwt {
    use actix_web::dev::ServiceRequest;
    use jsonwebtoken::{decode, Algorithm, DecodingKey, TokenData, Validation};

    use super::UserAuthData;
    use crate::{config::Config, dto::Claims, errors::AppError};

    const ADMIN_ROLE: &str = "admin";

    pub fn decode_claims(
        secret: &str,
        token: &str,
    ) -> Result<TokenData<Claims>, jsonwebtoken::errors::Error> {
        let decoding_key = DecodingKey::from_secret(secret.as_bytes());
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &decoding_key, &validation)
    }

    /// Verifies the token and resolves the caller's identity and admin flag.
    pub fn authenticate(token: &str, config: &Config) -> Result<UserAuthData, AppError> {
        let claims = decode_claims(&config.jwt_secret, token)
            .map_err(|_| AppError::Unauthorized)?
            .claims;
        let is_admin = claims.role.as_deref() == Some(ADMIN_ROLE)
            || config.is_admin_email(&claims.email);
        Ok(UserAuthData {
            user_id: claims.sub,
            name: claims.name,
            email: claims.email,
            is_admin,
        })
    }

    pub fn parse_request(req: &ServiceRequest, prefix: &str) -> Result<String, AppError> {
        req.headers()
            .get("Authorization")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix(prefix))
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
            .ok_or(AppError::Unauthorized)
    }

    #[cfg(test)]
    pub fn create(secret: &str, claims: &Claims) -> String {
        use jsonwebtoken::{encode, EncodingKey, Header};

        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("token encodes")
    }
}
