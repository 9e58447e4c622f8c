// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Topic model and study status.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Study status of a topic, serialized with the human-readable labels the
/// frontend displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "frontend/src/lib/generated/")
)]
pub enum TopicStatus {
    #[default]
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Completed")]
    Completed,
}

impl TopicStatus {
    pub const ALL: [TopicStatus; 3] = [
        TopicStatus::NotStarted,
        TopicStatus::InProgress,
        TopicStatus::Completed,
    ];

    /// Label stored in the database and sent over the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            TopicStatus::NotStarted => "Not Started",
            TopicStatus::InProgress => "In Progress",
            TopicStatus::Completed => "Completed",
        }
    }

    pub fn is_completed(self) -> bool {
        self == TopicStatus::Completed
    }

    /// Status after a checkbox click: completed topics reset, everything
    /// else becomes completed.
    pub fn toggled(self) -> Self {
        if self.is_completed() {
            TopicStatus::NotStarted
        } else {
            TopicStatus::Completed
        }
    }
}

impl fmt::Display for TopicStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a status label is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid status")]
pub struct InvalidStatus;

impl FromStr for TopicStatus {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TopicStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or(InvalidStatus)
    }
}

/// A single study topic within a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "frontend/src/lib/generated/")
)]
pub struct Topic {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: i64,
    pub name: String,
    pub status: TopicStatus,
}
