//! `AuthUser` extractor (spec §6: "the core receives a verified `user_id`").
//!
//! Signature verification is explicitly out of scope (spec §1 non-goals:
//! "Authentication ... assumed to exist"); an upstream gateway is expected
//! to have already validated the bearer token. This extractor decodes the
//! claims without checking the signature and trusts `sub` as the user id.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::header::AUTHORIZATION;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    exp: i64,
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub email: Option<String>,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("missing authorization header"))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::unauthorized("expected a bearer token"))?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;

        let claims = decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
            .map_err(|_| ApiError::unauthorized("malformed bearer token"))?
            .claims;

        let now = chrono::Utc::now().timestamp();
        if claims.exp < now {
            return Err(ApiError::token_expired());
        }

        Ok(AuthUser {
            user_id: claims.sub,
            email: claims.email,
        })
    }
}
