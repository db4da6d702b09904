use crate::db;
use crate::domain::models::{Caller, UserRole};
use crate::error::{AppError, AppResult};
use crate::middleware::rate_limit::throttle;
use crate::passwords::{hash_password, verify_password, MIN_PASSWORD_LEN};
use crate::state::SharedState;
use crate::web::session;
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

const RESET_TOKEN_MINUTES: i64 = 60;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ResetRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetConfirm {
    pub token: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct AccountResponse {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub name: String,
}

pub fn router(state: SharedState) -> Router {
    let login_throttle =
        middleware::from_fn_with_state(state.login_limiter.clone(), throttle);

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login).route_layer(login_throttle))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/password-reset/request", post(request_reset))
        .route("/password-reset/confirm", post(confirm_reset))
        .with_state(state)
}

fn valid_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !email.contains(' '),
        None => false,
    }
}

fn check_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn with_session(state: &SharedState, account: AccountResponse) -> AppResult<impl IntoResponse> {
    let token = session::sign_session(account.user_id, account.role, &state.session_key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("session signing failed: {e}")))?;
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        session::session_cookie(&token, state.config.secure_cookies)?,
    );
    Ok((headers, Json(account)))
}

async fn register(
    State(state): State<SharedState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    let name = payload.name.trim();
    if !valid_email(&payload.email) {
        return Err(AppError::BadRequest("a valid email address is required".into()));
    }
    if name.is_empty() {
        return Err(AppError::BadRequest("name is required".into()));
    }
    check_password(&payload.password)?;

    if db::email_taken(&state.pool, &payload.email).await? {
        return Err(AppError::Conflict("an account with this email already exists".into()));
    }

    let hash = hash_password(&payload.password)?;
    let enc_name = state
        .cipher
        .seal_str(name)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("sealing name failed: {e}")))?;
    let user = db::create_user(&state.pool, &payload.email, &hash, UserRole::Student, &enc_name)
        .await?;
    tracing::info!("Registered user {}", user.id);

    let account = AccountResponse {
        user_id: user.id,
        email: user.email,
        role: user.role,
        name: name.to_string(),
    };
    Ok((StatusCode::CREATED, with_session(&state, account)?))
}

async fn login(
    State(state): State<SharedState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let user = db::find_user_by_email(&state.pool, &payload.email)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !verify_password(&payload.password, &user.hash) {
        tracing::warn!("Failed login for user {}", user.id);
        return Err(AppError::Unauthorized);
    }

    let account = AccountResponse {
        user_id: user.id,
        name: state.cipher.display_name(&user.enc_name),
        email: user.email,
        role: user.role,
    };
    with_session(&state, account)
}

async fn logout(State(state): State<SharedState>) -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        session::expired_cookie(state.config.secure_cookies),
    );
    (headers, StatusCode::NO_CONTENT)
}

async fn me(State(state): State<SharedState>, caller: Caller) -> AppResult<Json<AccountResponse>> {
    let user = db::find_user_by_id(&state.pool, caller.user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;
    Ok(Json(AccountResponse {
        user_id: user.id,
        name: state.cipher.display_name(&user.enc_name),
        email: user.email,
        role: user.role,
    }))
}

fn new_reset_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn hash_reset_token(token: &str) -> String {
    general_purpose::STANDARD.encode(Sha256::digest(token.as_bytes()))
}

/// Always accepted so the response does not reveal which emails exist.
async fn request_reset(
    State(state): State<SharedState>,
    Json(payload): Json<ResetRequest>,
) -> AppResult<StatusCode> {
    let Some(user) = db::find_user_by_email(&state.pool, &payload.email).await? else {
        tracing::debug!("Password reset requested for unknown email");
        return Ok(StatusCode::ACCEPTED);
    };

    let token = new_reset_token();
    let expires_at = Utc::now() + Duration::minutes(RESET_TOKEN_MINUTES);
    db::insert_reset_token(&state.pool, &hash_reset_token(&token), user.id, expires_at).await?;

    let link = format!("{}/reset-password?token={}", state.config.link_base(), token);
    let body = format!(
        "Someone asked to reset the password of your account.\n\n\
         Open this link within {RESET_TOKEN_MINUTES} minutes to choose a new one:\n{link}\n\n\
         If this was not you, ignore this message."
    );
    if let Err(e) = state.mailer.send(&user.email, "Reset your password", &body).await {
        tracing::error!("Reset mail for user {} failed: {:#}", user.id, e);
    }

    Ok(StatusCode::ACCEPTED)
}

async fn confirm_reset(
    State(state): State<SharedState>,
    Json(payload): Json<ResetConfirm>,
) -> AppResult<StatusCode> {
    check_password(&payload.password)?;

    let user_id = db::consume_reset_token(&state.pool, &hash_reset_token(payload.token.trim()))
        .await?
        .ok_or(AppError::Unauthorized)?;

    let hash = hash_password(&payload.password)?;
    db::update_password(&state.pool, user_id, &hash).await?;
    tracing::info!("Password reset completed for user {}", user_id);
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape() {
        assert!(valid_email("ada@example.org"));
        assert!(valid_email("  ada@example.org "));
        assert!(!valid_email("ada.example.org"));
        assert!(!valid_email("@example.org"));
        assert!(!valid_email("ada@localhost"));
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert!(matches!(check_password("short"), Err(AppError::BadRequest(_))));
        assert!(check_password("long enough").is_ok());
    }

    #[test]
    fn reset_tokens_are_random_and_hashed() {
        let a = new_reset_token();
        let b = new_reset_token();
        assert_ne!(a, b);
        assert_eq!(hash_reset_token(&a), hash_reset_token(&a));
        assert_ne!(hash_reset_token(&a), a);
    }
}
