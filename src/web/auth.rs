//! Admin authentication: bcrypt password check and HS256 bearer tokens.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration as ChronoDuration, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::config::AdminConfig;
use crate::error::AuthError;
use crate::web::types::ErrorResponse;

type HmacSha256 = Hmac<Sha256>;

/// Lifetime of an admin token.
pub const TOKEN_TTL_HOURS: i64 = 24;

const JWT_HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// Claims carried by an admin token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminClaims {
    pub admin: bool,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Deserialize)]
struct TokenHeader {
    alg: String,
}

/// Issues and validates admin credentials.
pub struct AdminAuth {
    password_hash: String,
    secret: SecretString,
    ttl: ChronoDuration,
}

impl AdminAuth {
    pub fn new(password_hash: impl Into<String>, secret: SecretString) -> Self {
        Self {
            password_hash: password_hash.into(),
            secret,
            ttl: ChronoDuration::hours(TOKEN_TTL_HOURS),
        }
    }

    pub fn from_config(config: &AdminConfig) -> Self {
        Self::new(config.password_hash.clone(), config.jwt_secret.clone())
    }

    /// Check `password` against the stored bcrypt hash.
    ///
    /// bcrypt is deliberately slow, so the comparison runs on the blocking pool.
    pub async fn verify_password(&self, password: String) -> Result<(), AuthError> {
        let hash = self.password_hash.clone();
        let valid = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| AuthError::TaskFailed(e.to_string()))??;
        if valid {
            Ok(())
        } else {
            Err(AuthError::InvalidPassword)
        }
    }

    /// Sign a new admin token valid for [`TOKEN_TTL_HOURS`].
    pub fn issue_token(&self) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = AdminClaims {
            admin: true,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        self.sign(&claims)
    }

    fn sign(&self, claims: &AdminClaims) -> Result<String, AuthError> {
        let payload =
            serde_json::to_vec(claims).map_err(|e| AuthError::Signing(e.to_string()))?;
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(JWT_HEADER),
            URL_SAFE_NO_PAD.encode(payload)
        );
        let signature = URL_SAFE_NO_PAD.encode(self.mac(signing_input.as_bytes())?);
        Ok(format!("{signing_input}.{signature}"))
    }

    fn mac(&self, data: &[u8]) -> Result<Vec<u8>, AuthError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|e| AuthError::Signing(e.to_string()))?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().to_vec())
    }

    /// Validate signature, algorithm, expiry and the admin claim.
    pub fn verify_token(&self, token: &str) -> Result<AdminClaims, AuthError> {
        let mut parts = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthError::InvalidToken("malformed"));
        };

        let header: TokenHeader = decode_segment(header)?;
        if header.alg != "HS256" {
            return Err(AuthError::InvalidToken("unsupported algorithm"));
        }

        let provided = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| AuthError::InvalidToken("malformed signature"))?;
        let signing_input = &token[..token.len() - signature.len() - 1];
        let expected = self.mac(signing_input.as_bytes())?;
        if !bool::from(expected.ct_eq(&provided)) {
            return Err(AuthError::InvalidToken("bad signature"));
        }

        let claims: AdminClaims = decode_segment(payload)?;
        if claims.exp <= Utc::now().timestamp() {
            return Err(AuthError::InvalidToken("expired"));
        }
        if !claims.admin {
            return Err(AuthError::InvalidToken("not an admin token"));
        }
        Ok(claims)
    }
}

fn decode_segment<T: serde::de::DeserializeOwned>(segment: &str) -> Result<T, AuthError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| AuthError::InvalidToken("malformed segment"))?;
    serde_json::from_slice(&bytes).map_err(|_| AuthError::InvalidToken("malformed segment"))
}

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &axum::http::HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Middleware guarding the admin routes.
///
/// No token → 401, bad or expired token → 403.
pub async fn admin_auth_middleware(
    State(auth): State<Arc<AdminAuth>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(request.headers()) else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new(AuthError::MissingToken.to_string())),
        )
            .into_response();
    };

    match auth.verify_token(token) {
        Ok(_) => next.run(request).await,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected admin token");
            (
                StatusCode::FORBIDDEN,
                Json(ErrorResponse::new("Invalid token")),
            )
                .into_response()
        }
    }
}
