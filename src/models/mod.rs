// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod note;
pub mod progress;
pub mod subject;
pub mod topic;
pub mod user;

pub use note::Note;
pub use progress::Progress;
pub use subject::{Subject, Unit, UnitWithTopics};
pub use topic::{InvalidStatus, Topic, TopicStatus};
pub use user::User;
