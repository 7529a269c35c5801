/*!
 * # Session Authentication
 *
 * Sessions are HS256-signed JWTs issued by the login flow and carried in the
 * `auth_token` cookie. This module:
 *
 * - verifies tokens ([`TokenVerifier`]), rejecting bad signatures and expired tokens
 * - gates every request behind a fixed public allow-list ([`gate`])
 * - answers `GET /api/auth/verify` with the decoded session
 */

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use thiserror::Error;
use tracing::debug;

pub mod cookie;
pub mod gate;

pub use self::cookie::{extract_auth_token, removal_header, AUTH_COOKIE_NAME};
pub use gate::{access_gate_middleware, AccessGate, GateDecision, DEFAULT_PUBLIC_PATHS};

pub const INVALID_SESSION_MESSAGE: &str = "Token inválido o expirado";

/// Decoded session payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Display name of the signed-in user
    pub nombre: String,
    /// Expiration time (seconds since epoch)
    pub exp: i64,
    /// Whatever else the login flow embedded
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SessionClaims {
    pub fn new(nombre: impl Into<String>, ttl: Duration) -> Self {
        Self {
            nombre: nombre.into(),
            exp: (Utc::now() + ttl).timestamp(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing token")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::TokenCreation(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        };
        let message = match &self {
            Self::TokenCreation(msg) => msg.clone(),
            _ => INVALID_SESSION_MESSAGE.to_string(),
        };

        (
            status,
            Json(json!({
                "success": false,
                "error": message,
            })),
        )
            .into_response()
    }
}

/// Verifies (and, for the login flow and tests, issues) session tokens
#[derive(Clone)]
pub struct TokenVerifier {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("algorithm", &Algorithm::HS256)
            .finish_non_exhaustive()
    }
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Checks signature and expiry; `exp` is mandatory
    pub fn verify(&self, token: &str) -> Result<SessionClaims, AuthError> {
        decode::<SessionClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                other => {
                    debug!(reason = ?other, "session token rejected");
                    AuthError::InvalidToken
                }
            })
    }

    pub fn issue(&self, claims: &SessionClaims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }
}

/// State that can verify session tokens
pub trait SessionState: Clone + Send + Sync + 'static {
    fn token_verifier(&self) -> &TokenVerifier;
}

/// `GET /api/auth/verify`: decodes the session cookie
pub async fn verify_session<S: SessionState>(
    State(state): State<S>,
    headers: HeaderMap,
) -> Result<Json<Value>, AuthError> {
    let token = extract_auth_token(&headers).ok_or(AuthError::MissingToken)?;
    let claims = state.token_verifier().verify(&token)?;

    Ok(Json(json!({
        "success": true,
        "user": claims,
    })))
}
