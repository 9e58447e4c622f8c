// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Completion percentage for a unit or subject.

use super::Topic;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Completed share of topics, as a whole percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "frontend/src/lib/generated/")
)]
pub struct Progress {
    pub progress: u8,
}

impl Progress {
    /// Percentage of `completed` out of `total`, rounded half-up.
    ///
    /// An empty set has zero progress.
    pub fn from_counts(completed: u64, total: u64) -> Self {
        if total == 0 {
            return Self::default();
        }
        let completed = completed.min(total);
        // round(100 * c / t) == floor((200 * c + t) / (2 * t))
        let percent = (200 * completed + total) / (2 * total);
        Self {
            progress: percent as u8,
        }
    }

    /// Progress over a locally held topic list.
    pub fn of_topics(topics: &[Topic]) -> Self {
        let completed = topics.iter().filter(|t| t.status.is_completed()).count();
        Self::from_counts(completed as u64, topics.len() as u64)
    }

    pub fn percent(self) -> u8 {
        self.progress
    }
}
