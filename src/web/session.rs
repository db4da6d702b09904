use crate::db;
use crate::domain::models::{Caller, UserRole};
use crate::error::AppError;
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap, HeaderValue},
};
use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_HOURS: i64 = 24;
const COOKIE_NAME: &str = "session";

#[derive(Debug, Clone)]
pub struct SessionClaims {
    pub user_id: Uuid,
    pub role: UserRole,
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid token format")]
    Invalid,
    #[error("signature mismatch")]
    Signature,
    #[error("expired")]
    Expired,
    #[error("bad role")]
    Role,
}

pub fn sign_session(user_id: Uuid, role: UserRole, key: &[u8]) -> Result<String, SessionError> {
    let exp = Utc::now() + Duration::hours(SESSION_HOURS);
    sign_with_expiry(user_id, role, exp.timestamp(), key)
}

fn sign_with_expiry(
    user_id: Uuid,
    role: UserRole,
    exp: i64,
    key: &[u8],
) -> Result<String, SessionError> {
    let payload = format!("{}|{}|{}", user_id, role.as_str(), exp);
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| SessionError::Invalid)?;
    mac.update(payload.as_bytes());
    let sig = mac.finalize().into_bytes();
    Ok(format!(
        "{}.{}",
        general_purpose::STANDARD.encode(payload.as_bytes()),
        general_purpose::STANDARD.encode(sig)
    ))
}

pub fn verify_session(token: &str, key: &[u8]) -> Result<SessionClaims, SessionError> {
    let (payload_b64, sig_b64) = token.split_once('.').ok_or(SessionError::Invalid)?;
    let payload_bytes = general_purpose::STANDARD
        .decode(payload_b64)
        .map_err(|_| SessionError::Invalid)?;
    let sig_bytes = general_purpose::STANDARD
        .decode(sig_b64)
        .map_err(|_| SessionError::Invalid)?;

    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| SessionError::Invalid)?;
    mac.update(&payload_bytes);
    mac.verify_slice(&sig_bytes)
        .map_err(|_| SessionError::Signature)?;

    let payload = String::from_utf8(payload_bytes).map_err(|_| SessionError::Invalid)?;
    let pieces: Vec<&str> = payload.split('|').collect();
    let [user, role, exp] = pieces.as_slice() else {
        return Err(SessionError::Invalid);
    };
    let user_id = Uuid::parse_str(user).map_err(|_| SessionError::Invalid)?;
    let role = UserRole::parse(role).ok_or(SessionError::Role)?;
    let exp: i64 = exp.parse().map_err(|_| SessionError::Invalid)?;
    if Utc::now().timestamp() > exp {
        return Err(SessionError::Expired);
    }
    Ok(SessionClaims { user_id, role, exp })
}

pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(bearer) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        return Some(bearer.trim().to_string());
    }
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())?
        .split(';')
        .find_map(|pair| pair.trim().strip_prefix("session="))
        .map(str::to_string)
}

pub fn session_cookie(token: &str, secure: bool) -> Result<HeaderValue, AppError> {
    let secure_flag = if secure { "; Secure" } else { "" };
    format!(
        "{COOKIE_NAME}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}{secure_flag}",
        SESSION_HOURS * 3600
    )
    .parse()
    .map_err(|_| AppError::Internal(anyhow::anyhow!("session cookie is not a valid header")))
}

pub fn expired_cookie(secure: bool) -> HeaderValue {
    if secure {
        HeaderValue::from_static("session=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0; Secure")
    } else {
        HeaderValue::from_static("session=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0")
    }
}

/// Resolves the signed session into the caller identity. The account must
/// still exist and be active; its current role wins over the signed one.
#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
    crate::state::SharedState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let shared_state = crate::state::SharedState::from_ref(state);

        let token = extract_token(&parts.headers).ok_or(AppError::Unauthorized)?;

        let claims = verify_session(&token, &shared_state.session_key).map_err(|e| {
            tracing::warn!("Session verification failed: {}", e);
            AppError::Unauthorized
        })?;

        let user = db::find_user_by_id(&shared_state.pool, claims.user_id).await?;
        let Some(user) = user.filter(|u| u.is_active) else {
            return Err(AppError::Unauthorized);
        };

        Ok(Caller {
            user_id: user.id,
            role: user.role,
        })
    }
}
