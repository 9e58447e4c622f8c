// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Typed HTTP client for the tracker API.
//!
//! Handles:
//! - Attaching the stored bearer token to every request
//! - Clearing the token when the API answers 401 (login required)
//! - Mapping error bodies to `ClientError`

pub mod session;
pub mod token;

pub use session::Session;
pub use token::{FileTokenStore, MemoryTokenStore, TokenStore};

use crate::models::{Note, Progress, Subject, Topic, TopicStatus, Unit, UnitWithTopics};
use crate::routes::api::{NameRequest, NoteRequest, StatusRequest};
use crate::routes::auth::{Credentials, LoginResponse, MessageResponse};
use reqwest::{header, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;

/// Default address of a locally running API server.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

/// Client-side errors.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The API rejected our credentials; the stored token has been cleared.
    #[error("Login required")]
    Unauthorized,

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid response body: {0}")]
    Decode(String),

    #[error("Token storage error: {0}")]
    TokenStore(#[from] std::io::Error),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Unauthorized => Some(StatusCode::UNAUTHORIZED.as_u16()),
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Error body returned by the API.
#[derive(Deserialize)]
struct ApiErrorBody {
    error: String,
    #[serde(default)]
    details: Option<String>,
}

/// Tracker API client.
#[derive(Clone)]
pub struct TrackerClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenStore>,
}

impl TrackerClient {
    pub fn new(base_url: impl Into<String>, tokens: Arc<dyn TokenStore>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
            tokens,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_logged_in(&self) -> bool {
        self.tokens.get().is_some()
    }

    // ─── Auth ────────────────────────────────────────────────────

    pub async fn signup(&self, email: &str, password: &str) -> Result<(), ClientError> {
        let body = Credentials::new(email, password);
        let _: MessageResponse = self
            .send(self.request(Method::POST, "/auth/signup").json(&body))
            .await?;
        Ok(())
    }

    /// Log in and remember the returned token.
    pub async fn login(&self, email: &str, password: &str) -> Result<(), ClientError> {
        let body = Credentials::new(email, password);
        let response: LoginResponse = self
            .send(self.request(Method::POST, "/auth/login").json(&body))
            .await?;
        self.tokens.set(&response.access_token)?;
        tracing::debug!("Logged in, token stored");
        Ok(())
    }

    /// Forget the stored token.
    pub fn logout(&self) -> Result<(), ClientError> {
        self.tokens.clear()?;
        Ok(())
    }

    // ─── Subjects ────────────────────────────────────────────────

    pub async fn list_subjects(&self) -> Result<Vec<Subject>, ClientError> {
        self.get("/subjects").await
    }

    pub async fn create_subject(&self, name: &str) -> Result<Subject, ClientError> {
        self.post("/subjects", &name_body(name)).await
    }

    pub async fn delete_subject(&self, subject_id: i64) -> Result<(), ClientError> {
        self.delete(&format!("/subjects/{}", subject_id)).await
    }

    pub async fn subject_progress(&self, subject_id: i64) -> Result<Progress, ClientError> {
        self.get(&format!("/subjects/{}/progress", subject_id))
            .await
    }

    // ─── Units ───────────────────────────────────────────────────

    pub async fn list_units(&self, subject_id: i64) -> Result<Vec<UnitWithTopics>, ClientError> {
        self.get(&format!("/subjects/{}/units", subject_id)).await
    }

    pub async fn create_unit(&self, subject_id: i64, name: &str) -> Result<Unit, ClientError> {
        self.post(&format!("/subjects/{}/units", subject_id), &name_body(name))
            .await
    }

    pub async fn delete_unit(&self, unit_id: i64) -> Result<(), ClientError> {
        self.delete(&format!("/units/{}", unit_id)).await
    }

    pub async fn unit_progress(&self, unit_id: i64) -> Result<Progress, ClientError> {
        self.get(&format!("/units/{}/progress", unit_id)).await
    }

    // ─── Topics ──────────────────────────────────────────────────

    pub async fn list_topics(&self, unit_id: i64) -> Result<Vec<Topic>, ClientError> {
        self.get(&format!("/units/{}/topics", unit_id)).await
    }

    pub async fn create_topic(&self, unit_id: i64, name: &str) -> Result<Topic, ClientError> {
        self.post(&format!("/units/{}/topics", unit_id), &name_body(name))
            .await
    }

    pub async fn set_topic_status(
        &self,
        topic_id: i64,
        status: TopicStatus,
    ) -> Result<(), ClientError> {
        let body = StatusRequest {
            status: status.as_str().to_string(),
        };
        let _: MessageResponse = self
            .send(
                self.request(Method::PUT, &format!("/topics/{}/status", topic_id))
                    .json(&body),
            )
            .await?;
        Ok(())
    }

    pub async fn delete_topic(&self, topic_id: i64) -> Result<(), ClientError> {
        self.delete(&format!("/topics/{}", topic_id)).await
    }

    // ─── Notes ───────────────────────────────────────────────────

    pub async fn list_notes(&self, unit_id: i64) -> Result<Vec<Note>, ClientError> {
        self.get(&format!("/units/{}/notes", unit_id)).await
    }

    pub async fn create_note(&self, unit_id: i64, content: &str) -> Result<Note, ClientError> {
        let body = NoteRequest {
            content: content.to_string(),
        };
        self.post(&format!("/units/{}/notes", unit_id), &body).await
    }

    pub async fn delete_note(&self, note_id: i64) -> Result<(), ClientError> {
        self.delete(&format!("/notes/{}", note_id)).await
    }

    // ─── Plumbing ────────────────────────────────────────────────

    /// Build a request with JSON content type and the stored bearer token.
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self
            .http
            .request(method, url)
            .header(header::CONTENT_TYPE, "application/json");

        match self.tokens.get() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send(self.request(Method::GET, path)).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        self.send(self.request(Method::POST, path).json(body)).await
    }

    async fn delete(&self, path: &str) -> Result<(), ClientError> {
        let _: MessageResponse = self.send(self.request(Method::DELETE, path)).await?;
        Ok(())
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let response = builder.send().await?;
        let response = self.check_response(response).await?;
        response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// Check response status; a 401 drops the stored token.
    async fn check_response(&self, response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            if let Err(e) = self.tokens.clear() {
                tracing::warn!(error = %e, "Failed to clear stored token");
            }
            tracing::info!(url = %response.url(), "API returned 401, login required");
            return Err(ClientError::Unauthorized);
        }

        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ApiErrorBody>(&body) {
            Ok(err) => err.details.unwrap_or(err.error),
            Err(_) => body,
        };

        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

fn name_body(name: &str) -> NameRequest {
    NameRequest {
        name: name.to_string(),
    }
}
