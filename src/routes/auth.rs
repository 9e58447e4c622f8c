// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Email/password authentication routes.

use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, TOKEN_COOKIE};
use crate::services::{hash_password, verify_password};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

/// Signup and login request body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "frontend/src/lib/generated/")
)]
pub struct Credentials {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            password: Some(password.into()),
        }
    }

    /// Trimmed email and raw password, or a 400 when either is blank.
    fn require(self) -> Result<(String, String)> {
        let email = self
            .email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());
        let password = self.password.filter(|p| !p.is_empty());

        match (email, password) {
            (Some(email), Some(password)) => Ok((email, password)),
            _ => Err(AppError::BadRequest(
                "Email and password are required".to_string(),
            )),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "frontend/src/lib/generated/")
)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "frontend/src/lib/generated/")
)]
pub struct LoginResponse {
    pub access_token: String,
}

/// Register a new account.
async fn signup(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Credentials>,
) -> Result<(StatusCode, Json<MessageResponse>)> {
    let (email, password) = body.require()?;

    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing task failed: {}", e)))??;

    let user = state.db.create_user(&email, &password_hash).await?;
    tracing::info!(user_id = user.id, "User signed up");

    Ok((StatusCode::CREATED, Json(MessageResponse::new("User created"))))
}

/// Exchange credentials for an access token.
///
/// The token is returned in the body for bearer use and also set as an
/// HttpOnly cookie.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<Credentials>,
) -> Result<(CookieJar, Json<LoginResponse>)> {
    let (email, password) = body.require()?;

    let Some(user) = state.db.find_user_by_email(&email).await? else {
        tracing::info!("Login rejected: unknown email");
        return Err(AppError::InvalidCredentials);
    };

    let stored_hash = user.password_hash.clone();
    let valid = tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Password check task failed: {}", e)))?;

    if !valid {
        tracing::info!(user_id = user.id, "Login rejected: wrong password");
        return Err(AppError::InvalidCredentials);
    }

    let token = create_jwt(
        user.id,
        &state.config.jwt_signing_key,
        state.config.token_ttl_hours,
    )?;
    tracing::info!(user_id = user.id, "User logged in");

    let mut cookie = token_cookie(&state.config, token.clone());
    cookie.set_max_age(time::Duration::hours(state.config.token_ttl_hours as i64));

    Ok((jar.add(cookie), Json(LoginResponse { access_token: token })))
}

/// Clear the session cookie. Bearer tokens are discarded client-side.
async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> (StatusCode, CookieJar) {
    let removal = token_cookie(&state.config, String::new());
    (StatusCode::NO_CONTENT, jar.remove(removal))
}

/// Session cookie attributes shared by creation and removal.
fn token_cookie(config: &Config, value: String) -> Cookie<'static> {
    let secure = config.frontend_url.starts_with("https://");
    Cookie::build((TOKEN_COOKIE, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}
