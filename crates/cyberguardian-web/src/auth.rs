//! Bearer-token authentication.
//!
//! The dashboard's identity provider issues HS256 JWTs; this server only
//! verifies them. A verified token becomes an [`AuthUser`] carrying the
//! [`Identity`] used to key the user's documents.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use cyberguardian::store::account::Identity;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::AppState;
use crate::error::ApiError;

/// Clock skew tolerated on `exp`, in seconds.
pub const LEEWAY_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("missing authorization header")]
    MissingHeader,

    #[error("invalid authorization scheme: expected 'Bearer'")]
    InvalidScheme,

    #[error("token expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),

    #[error("invalid claim '{claim}': {message}")]
    InvalidClaim {
        claim: &'static str,
        message: &'static str,
    },
}

/// Claims expected from the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    /// Checks beyond signature and expiry.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.sub.trim().is_empty() {
            return Err(AuthError::InvalidClaim {
                claim: "sub",
                message: "cannot be empty",
            });
        }
        if !self.email.contains('@') {
            return Err(AuthError::InvalidClaim {
                claim: "email",
                message: "must be an email address",
            });
        }
        Ok(())
    }

    pub fn into_identity(self) -> Identity {
        Identity {
            user_id: self.sub,
            email: self.email,
            display_name: self.name,
        }
    }
}

/// Verifies HS256 tokens against a shared secret.
#[derive(Clone)]
pub struct JwtValidator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtValidator {
    /// `audience`, when set, must match the token's `aud` claim. Without it
    /// `aud` is not checked.
    pub fn with_hs256(secret: &[u8], audience: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = LEEWAY_SECS;
        match audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }

        Self {
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken(e),
            }
        })?;
        data.claims.validate()?;
        Ok(data.claims)
    }

    /// Validate an `Authorization` header value.
    pub fn validate_header(&self, header: Option<&str>) -> Result<Claims, AuthError> {
        let header = header.ok_or(AuthError::MissingHeader)?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidScheme)?;
        self.validate(token.trim())
    }
}

/// The authenticated caller of a request.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        let claims = state.auth.validate_header(header)?;
        Ok(AuthUser(claims.into_identity()))
    }
}
