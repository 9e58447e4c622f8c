// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Study-tracking API routes for authenticated users.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Note, Progress, Subject, Topic, TopicStatus, Unit, UnitWithTopics};
use crate::routes::auth::MessageResponse;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Longest accepted subject/unit/topic name, in characters.
const MAX_NAME_CHARS: usize = 200;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/subjects", get(list_subjects).post(create_subject))
        .route("/subjects/{id}", delete(delete_subject))
        .route("/subjects/{id}/units", get(list_units).post(create_unit))
        .route("/subjects/{id}/progress", get(subject_progress))
        .route("/units/{id}", delete(delete_unit))
        .route("/units/{id}/topics", get(list_topics).post(create_topic))
        .route("/units/{id}/notes", get(list_notes).post(create_note))
        .route("/units/{id}/progress", get(unit_progress))
        .route("/topics/{id}", delete(delete_topic))
        .route("/topics/{id}/status", put(update_topic_status))
        .route("/notes/{id}", delete(delete_note))
}

// ─── Request Bodies ──────────────────────────────────────────

/// Body for creating a subject, unit or topic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "frontend/src/lib/generated/")
)]
pub struct NameRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "frontend/src/lib/generated/")
)]
pub struct NoteRequest {
    #[serde(default)]
    pub content: String,
}

/// Status is taken as a raw string so unknown labels get a 400 with a
/// readable message instead of a deserialization rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "frontend/src/lib/generated/")
)]
pub struct StatusRequest {
    #[serde(default)]
    pub status: String,
}

fn validate_name(name: &str, what: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest(format!("{} name is required", what)));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(AppError::BadRequest(format!(
            "{} name must be at most {} characters",
            what, MAX_NAME_CHARS
        )));
    }
    Ok(name.to_string())
}

fn not_found(what: &str, id: i64) -> AppError {
    AppError::NotFound(format!("{} {} not found", what, id))
}

// ─── Subjects ────────────────────────────────────────────────

async fn list_subjects(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Subject>>> {
    Ok(Json(state.db.list_subjects(user.user_id).await?))
}

async fn create_subject(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<NameRequest>,
) -> Result<Json<Subject>> {
    let name = validate_name(&body.name, "Subject")?;
    let subject = state.db.create_subject(user.user_id, &name).await?;
    tracing::debug!(user_id = user.user_id, subject_id = subject.id, "Created subject");
    Ok(Json(subject))
}

/// Delete a subject together with its units, topics and notes.
async fn delete_subject(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(subject_id): Path<i64>,
) -> Result<Json<MessageResponse>> {
    if !state.db.delete_subject(user.user_id, subject_id).await? {
        return Err(not_found("Subject", subject_id));
    }
    tracing::info!(user_id = user.user_id, subject_id, "Deleted subject");
    Ok(Json(MessageResponse::new("Subject deleted")))
}

async fn subject_progress(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(subject_id): Path<i64>,
) -> Result<Json<Progress>> {
    state
        .db
        .subject_progress(user.user_id, subject_id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found("Subject", subject_id))
}

// ─── Units ───────────────────────────────────────────────────

/// List a subject's units, each with its topics embedded.
async fn list_units(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(subject_id): Path<i64>,
) -> Result<Json<Vec<UnitWithTopics>>> {
    state
        .db
        .list_units_with_topics(user.user_id, subject_id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found("Subject", subject_id))
}

async fn create_unit(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(subject_id): Path<i64>,
    Json(body): Json<NameRequest>,
) -> Result<Json<Unit>> {
    let name = validate_name(&body.name, "Unit")?;
    state
        .db
        .create_unit(user.user_id, subject_id, &name)
        .await?
        .map(Json)
        .ok_or_else(|| not_found("Subject", subject_id))
}

/// Delete a unit together with its topics and notes.
async fn delete_unit(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(unit_id): Path<i64>,
) -> Result<Json<MessageResponse>> {
    if !state.db.delete_unit(user.user_id, unit_id).await? {
        return Err(not_found("Unit", unit_id));
    }
    tracing::info!(user_id = user.user_id, unit_id, "Deleted unit");
    Ok(Json(MessageResponse::new("Unit deleted")))
}

async fn unit_progress(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(unit_id): Path<i64>,
) -> Result<Json<Progress>> {
    state
        .db
        .unit_progress(user.user_id, unit_id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found("Unit", unit_id))
}

// ─── Topics ──────────────────────────────────────────────────

async fn list_topics(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(unit_id): Path<i64>,
) -> Result<Json<Vec<Topic>>> {
    state
        .db
        .list_topics(user.user_id, unit_id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found("Unit", unit_id))
}

async fn create_topic(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(unit_id): Path<i64>,
    Json(body): Json<NameRequest>,
) -> Result<Json<Topic>> {
    let name = validate_name(&body.name, "Topic")?;
    state
        .db
        .create_topic(user.user_id, unit_id, &name)
        .await?
        .map(Json)
        .ok_or_else(|| not_found("Unit", unit_id))
}

async fn update_topic_status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(topic_id): Path<i64>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<MessageResponse>> {
    let status: TopicStatus = body
        .status
        .parse()
        .map_err(|e: crate::models::InvalidStatus| AppError::BadRequest(e.to_string()))?;

    if !state
        .db
        .update_topic_status(user.user_id, topic_id, status)
        .await?
    {
        return Err(not_found("Topic", topic_id));
    }

    tracing::debug!(user_id = user.user_id, topic_id, %status, "Updated topic status");
    Ok(Json(MessageResponse::new("Status updated")))
}

async fn delete_topic(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(topic_id): Path<i64>,
) -> Result<Json<MessageResponse>> {
    if !state.db.delete_topic(user.user_id, topic_id).await? {
        return Err(not_found("Topic", topic_id));
    }
    Ok(Json(MessageResponse::new("Topic deleted")))
}

// ─── Notes ───────────────────────────────────────────────────

/// List a unit's notes, newest first.
async fn list_notes(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(unit_id): Path<i64>,
) -> Result<Json<Vec<Note>>> {
    state
        .db
        .list_notes(user.user_id, unit_id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found("Unit", unit_id))
}

/// Notes keep their content verbatim; only all-whitespace content is rejected.
async fn create_note(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(unit_id): Path<i64>,
    Json(body): Json<NoteRequest>,
) -> Result<(StatusCode, Json<Note>)> {
    if body.content.trim().is_empty() {
        return Err(AppError::BadRequest("Note content is required".to_string()));
    }

    let note = state
        .db
        .create_note(user.user_id, unit_id, &body.content)
        .await?
        .ok_or_else(|| not_found("Unit", unit_id))?;

    Ok((StatusCode::CREATED, Json(note)))
}

async fn delete_note(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(note_id): Path<i64>,
) -> Result<Json<MessageResponse>> {
    if !state.db.delete_note(user.user_id, note_id).await? {
        return Err(not_found("Note", note_id));
    }
    Ok(Json(MessageResponse::new("Note deleted")))
}
