// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client-side view state for the tracker.
//!
//! Holds session-scoped copies of what the user is looking at: the subject
//! list, the selected subject's units, and the selected unit's topics and
//! notes. Every mutation goes to the API first; local state only changes
//! once the server accepted it.

use super::{ClientError, TrackerClient};
use crate::models::{Note, Progress, Subject, Topic, TopicStatus, Unit, UnitWithTopics};
use futures_util::future::{try_join, try_join3, try_join_all};
use std::collections::HashSet;

/// What the tracker view currently shows.
pub struct Session {
    client: TrackerClient,
    subjects: Vec<Subject>,
    selected_subject: Option<Subject>,
    units: Vec<UnitWithTopics>,
    selected_unit: Option<Unit>,
    topics: Vec<Topic>,
    notes: Vec<Note>,
    unit_progress: Progress,
    subject_progress: Progress,
}

impl Session {
    pub fn new(client: TrackerClient) -> Self {
        Self {
            client,
            subjects: Vec::new(),
            selected_subject: None,
            units: Vec::new(),
            selected_unit: None,
            topics: Vec::new(),
            notes: Vec::new(),
            unit_progress: Progress::default(),
            subject_progress: Progress::default(),
        }
    }

    pub fn client(&self) -> &TrackerClient {
        &self.client
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    pub fn selected_subject(&self) -> Option<&Subject> {
        self.selected_subject.as_ref()
    }

    pub fn units(&self) -> &[UnitWithTopics] {
        &self.units
    }

    pub fn selected_unit(&self) -> Option<&Unit> {
        self.selected_unit.as_ref()
    }

    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// Unit progress as last reported by the server.
    pub fn unit_progress(&self) -> Progress {
        self.unit_progress
    }

    /// Subject progress as last reported by the server.
    pub fn subject_progress(&self) -> Progress {
        self.subject_progress
    }

    /// Progress recomputed from the topics currently held.
    pub fn local_progress(&self) -> Progress {
        Progress::of_topics(&self.topics)
    }

    /// True when the selected unit has topics and all are completed.
    pub fn unit_complete(&self) -> bool {
        !self.topics.is_empty() && self.topics.iter().all(|t| t.status.is_completed())
    }

    // ─── Loading & Selection ─────────────────────────────────────

    pub async fn load_subjects(&mut self) -> Result<(), ClientError> {
        self.subjects = self.client.list_subjects().await?;
        Ok(())
    }

    /// Select a subject, dropping any unit selection, and load its units
    /// and progress.
    ///
    /// The subject is selected before loading; if loading fails it stays
    /// selected with no units.
    pub async fn select_subject(&mut self, subject: Subject) -> Result<(), ClientError> {
        let subject_id = subject.id;
        self.selected_subject = Some(subject);
        self.units.clear();
        self.subject_progress = Progress::default();
        self.clear_unit_state();

        let (units, progress) = try_join(
            self.client.list_units(subject_id),
            self.client.subject_progress(subject_id),
        )
        .await?;

        self.units = units;
        self.subject_progress = progress;
        Ok(())
    }

    /// Select a unit and load its topics, notes and progress.
    ///
    /// The unit is selected before loading; if loading fails it stays
    /// selected with no topics or notes.
    pub async fn select_unit(&mut self, unit: Unit) -> Result<(), ClientError> {
        let unit_id = unit.id;
        self.clear_unit_state();
        self.selected_unit = Some(unit);

        let (topics, notes, progress) = try_join3(
            self.client.list_topics(unit_id),
            self.client.list_notes(unit_id),
            self.client.unit_progress(unit_id),
        )
        .await?;

        self.topics = topics;
        self.notes = notes;
        self.unit_progress = progress;
        Ok(())
    }

    fn clear_unit_state(&mut self) {
        self.selected_unit = None;
        self.topics.clear();
        self.notes.clear();
        self.unit_progress = Progress::default();
    }

    /// Re-fetch server progress for the current selection.
    pub async fn refresh_progress(&mut self) -> Result<(), ClientError> {
        let unit_id = self.selected_unit.as_ref().map(|u| u.id);
        let subject_id = self.selected_subject.as_ref().map(|s| s.id);

        let client = &self.client;
        let (unit, subject) = try_join(
            async {
                match unit_id {
                    Some(id) => client.unit_progress(id).await.map(Some),
                    None => Ok(None),
                }
            },
            async {
                match subject_id {
                    Some(id) => client.subject_progress(id).await.map(Some),
                    None => Ok(None),
                }
            },
        )
        .await?;

        if let Some(progress) = unit {
            self.unit_progress = progress;
        }
        if let Some(progress) = subject {
            self.subject_progress = progress;
        }
        Ok(())
    }

    // ─── Adding ──────────────────────────────────────────────────

    /// Add a subject. Blank names are ignored.
    pub async fn add_subject(&mut self, name: &str) -> Result<Option<Subject>, ClientError> {
        if name.trim().is_empty() {
            return Ok(None);
        }
        let subject = self.client.create_subject(name).await?;
        self.subjects.push(subject.clone());
        Ok(Some(subject))
    }

    /// Add a unit to the selected subject. Ignored for blank names or when
    /// no subject is selected.
    pub async fn add_unit(&mut self, name: &str) -> Result<Option<Unit>, ClientError> {
        let Some(subject_id) = self.selected_subject.as_ref().map(|s| s.id) else {
            return Ok(None);
        };
        if name.trim().is_empty() {
            return Ok(None);
        }
        let unit = self.client.create_unit(subject_id, name).await?;
        self.units.push(unit.clone().into());
        Ok(Some(unit))
    }

    /// Add a topic to the selected unit. Ignored for blank names or when no
    /// unit is selected.
    pub async fn add_topic(&mut self, name: &str) -> Result<Option<Topic>, ClientError> {
        let Some(unit_id) = self.selected_unit.as_ref().map(|u| u.id) else {
            return Ok(None);
        };
        if name.trim().is_empty() {
            return Ok(None);
        }
        let topic = self.client.create_topic(unit_id, name).await?;
        self.topics.push(topic.clone());
        if let Some(unit) = self.units.iter_mut().find(|u| u.id == unit_id) {
            unit.topics.push(topic.clone());
        }
        self.refresh_progress().await?;
        Ok(Some(topic))
    }

    /// Add a note to the selected unit; it goes to the top of the list.
    pub async fn add_note(&mut self, content: &str) -> Result<Option<Note>, ClientError> {
        let Some(unit_id) = self.selected_unit.as_ref().map(|u| u.id) else {
            return Ok(None);
        };
        if content.trim().is_empty() {
            return Ok(None);
        }
        let note = self.client.create_note(unit_id, content).await?;
        self.notes.insert(0, note.clone());
        Ok(Some(note))
    }

    // ─── Status ──────────────────────────────────────────────────

    /// Flip a topic between completed and not started, then refresh
    /// progress. Returns the new status, or `None` for an unknown topic.
    pub async fn toggle_topic(
        &mut self,
        topic_id: i64,
    ) -> Result<Option<TopicStatus>, ClientError> {
        let Some(current) = self.topics.iter().find(|t| t.id == topic_id) else {
            return Ok(None);
        };
        let status = current.status.toggled();

        self.client.set_topic_status(topic_id, status).await?;
        self.apply_status(|t| t.id == topic_id, status);
        self.refresh_progress().await?;
        Ok(Some(status))
    }

    /// Mark every topic of the selected unit completed (or not started).
    ///
    /// The status updates are sent concurrently; local state changes only
    /// if all of them succeed.
    pub async fn set_unit_complete(&mut self, complete: bool) -> Result<(), ClientError> {
        if self.selected_unit.is_none() {
            return Ok(());
        }
        let status = if complete {
            TopicStatus::Completed
        } else {
            TopicStatus::NotStarted
        };

        let client = &self.client;
        try_join_all(
            self.topics
                .iter()
                .map(|t| client.set_topic_status(t.id, status)),
        )
        .await?;

        let ids: HashSet<i64> = self.topics.iter().map(|t| t.id).collect();
        self.apply_status(|t| ids.contains(&t.id), status);
        self.refresh_progress().await
    }

    fn apply_status(&mut self, matches: impl Fn(&Topic) -> bool, status: TopicStatus) {
        let unit_topics = self.units.iter_mut().flat_map(|u| u.topics.iter_mut());
        for topic in self.topics.iter_mut().chain(unit_topics) {
            if matches(topic) {
                topic.status = status;
            }
        }
    }

    // ─── Deleting ────────────────────────────────────────────────

    /// Delete a subject. Deleting the selected subject clears the selection.
    pub async fn delete_subject(&mut self, subject_id: i64) -> Result<(), ClientError> {
        self.client.delete_subject(subject_id).await?;
        self.subjects.retain(|s| s.id != subject_id);

        if self.selected_subject.as_ref().is_some_and(|s| s.id == subject_id) {
            self.selected_subject = None;
            self.units.clear();
            self.subject_progress = Progress::default();
            self.clear_unit_state();
        }
        Ok(())
    }

    /// Delete a unit. Deleting the selected unit clears the selection.
    pub async fn delete_unit(&mut self, unit_id: i64) -> Result<(), ClientError> {
        self.client.delete_unit(unit_id).await?;
        self.units.retain(|u| u.id != unit_id);

        if self.selected_unit.as_ref().is_some_and(|u| u.id == unit_id) {
            self.clear_unit_state();
        }
        self.refresh_progress().await
    }

    pub async fn delete_topic(&mut self, topic_id: i64) -> Result<(), ClientError> {
        self.client.delete_topic(topic_id).await?;
        self.topics.retain(|t| t.id != topic_id);
        for unit in &mut self.units {
            unit.topics.retain(|t| t.id != topic_id);
        }
        self.refresh_progress().await
    }

    pub async fn delete_note(&mut self, note_id: i64) -> Result<(), ClientError> {
        self.client.delete_note(note_id).await?;
        self.notes.retain(|n| n.id != note_id);
        Ok(())
    }
}
