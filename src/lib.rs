// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Exam Prep Tracker: organize study material into subjects, units and
//! topics, and follow completion progress.
//!
//! This crate provides the backend API (axum + SQLite), a typed HTTP client
//! for it, and the client-side session state a frontend keeps.

pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod linkify;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::SqliteDb;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: SqliteDb,
}
