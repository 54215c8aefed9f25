use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use log::debug;
use rocket::{
    http::{Cookie, SameSite, Status},
    request::{self, FromRequest},
    time, Request, State,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::common::UserId;
use crate::Config;

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";
const BEARER_PREFIX: &str = "Bearer ";

/// The authenticated identity behind a request.
///
/// Tokens are signed elsewhere with the shared secret; this service only
/// checks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthToken {
    user_id: UserId,
}

impl AuthToken {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id }
    }

    /// Get the user ID.
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Sign this token, valid for the configured lifetime.
    pub fn encode(self, config: &Config) -> Result<String> {
        let claims = Claims {
            user_id: self.user_id,
            expire_at: Utc::now() + config.auth_ttl(),
        };
        Ok(jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )?)
    }

    /// Sign this token into a cookie.
    pub fn into_cookie(self, config: &Config) -> Result<Cookie<'static>> {
        let token = self.encode(config)?;
        Ok(Cookie::build(AUTH_TOKEN_COOKIE, token)
            .max_age(time::Duration::seconds(config.auth_ttl().num_seconds()))
            .same_site(SameSite::Strict)
            .finish())
    }

    /// Check the signature and expiry of an encoded token.
    pub fn decode(token: &str, config: &Config) -> Result<Self> {
        jsonwebtoken::decode(
            token,
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|claims: TokenData<Claims>| Self::new(claims.claims.user_id))
        .map_err(Error::from)
    }
}

/// Token claims: the user plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims {
    #[serde(rename = "sub")]
    user_id: UserId,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthToken {
    type Error = Error;

    /// Read the token from the auth cookie, falling back to an
    /// `Authorization: Bearer` header.
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let config = match req.guard::<&State<Config>>().await {
            request::Outcome::Success(config) => config,
            _ => {
                return request::Outcome::Failure((
                    Status::InternalServerError,
                    Error::Unauthorized("Auth configuration missing".to_string()),
                ))
            }
        };

        let encoded = req
            .cookies()
            .get(AUTH_TOKEN_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .or_else(|| {
                req.headers()
                    .get_one("Authorization")
                    .and_then(|value| value.strip_prefix(BEARER_PREFIX))
                    .map(|token| token.trim().to_string())
            });
        let Some(encoded) = encoded else {
            return request::Outcome::Failure((
                Status::Unauthorized,
                Error::Unauthorized("No auth token".to_string()),
            ));
        };

        match Self::decode(&encoded, config) {
            Ok(token) => request::Outcome::Success(token),
            Err(err) => {
                debug!("Rejected auth token: {err}");
                request::Outcome::Failure((Status::Unauthorized, err))
            }
        }
    }
}
