use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::PrincipalSnapshot;
use crate::catalog::PermissionSet;
use crate::errors::AppError;
use crate::models::principal::{Principal, PrincipalKind, PrincipalStatus};

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: Arc<Vec<u8>>,
    pub exp_hours: i64,
}

impl JwtConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let secret = std::env::var("JWT_SECRET")
            .map_err(|_| AppError::configuration("JWT_SECRET not set"))?;
        let exp_hours = std::env::var("JWT_EXP_HOURS")
            .map(|val| val.parse::<i64>())
            .unwrap_or(Ok(24))
            .map_err(|_| AppError::configuration("JWT_EXP_HOURS must be a valid integer"))?;

        Ok(Self {
            secret: Arc::new(secret.into_bytes()),
            exp_hours,
        })
    }

    /// Issues a token carrying the account's authorization snapshot. The
    /// session keeps evaluating against this state until it expires, no
    /// matter what is granted or revoked in the meantime.
    pub fn encode(&self, principal: &Principal) -> Result<String, AppError> {
        use chrono::{Duration, Utc};

        let now = Utc::now();
        let exp = now + Duration::hours(self.exp_hours);

        let claims = Claims {
            sub: principal.id,
            kind: principal.kind,
            username: principal.username.clone(),
            status: principal.status,
            permissions: principal.permissions,
            store_id: principal.store_id,
            exp: exp.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        jsonwebtoken::encode(&Header::default(), &claims, &EncodingKey::from_secret(&self.secret))
            .map_err(|err| AppError::auth(err.to_string()))
    }

    pub fn decode(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(&self.secret), &validation)
            .map(|data| data.claims)
            .map_err(|err| AppError::auth(err.to_string()))
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub kind: PrincipalKind,
    pub username: String,
    pub status: PrincipalStatus,
    pub permissions: PermissionSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_id: Option<Uuid>,
    pub exp: usize,
    pub iat: usize,
}

impl Claims {
    pub fn snapshot(&self) -> PrincipalSnapshot {
        PrincipalSnapshot {
            id: self.sub,
            kind: self.kind,
            username: self.username.clone(),
            status: self.status,
            permissions: self.permissions,
            store_id: self.store_id,
        }
    }
}

/// Bearer-token extractor. Verification is pure, signature plus expiry;
/// the database is never consulted here.
#[derive(Debug, Clone)]
pub struct AuthPrincipal(pub PrincipalSnapshot);

#[async_trait]
impl FromRequestParts<AppState> for AuthPrincipal {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::auth("Authorization header missing"))?;

        let claims = state.jwt.decode(token)?;

        Ok(AuthPrincipal(claims.snapshot()))
    }
}
