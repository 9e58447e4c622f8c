//! SQLite client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (accounts and password hashes)
//! - Subjects, units and topics (the study hierarchy)
//! - Notes (free text attached to units)
//! - Progress (completed/total topic counts)
//!
//! Every study operation takes the authenticated user's ID. Rows belonging to
//! another user behave exactly like rows that do not exist.

use crate::error::AppError;
use crate::models::{Note, Progress, Subject, Topic, TopicStatus, Unit, UnitWithTopics, User};
use crate::time_utils::now_rfc3339;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

impl ToSql for TopicStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TopicStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// SQLite database client.
#[derive(Clone)]
pub struct SqliteDb {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDb {
    /// Open (or create) the database file at `path` and migrate it.
    ///
    /// The special path `:memory:` opens a private in-memory database.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        if path == Path::new(":memory:") {
            return Self::open_in_memory();
        }

        let started_at = Instant::now();
        let conn = Connection::open(path).map_err(|e| {
            AppError::Database(format!(
                "Failed to open database {}: {}",
                path.display(),
                e
            ))
        })?;
        let db = Self::bootstrap(conn)?;

        tracing::info!(
            path = %path.display(),
            duration_ms = started_at.elapsed().as_millis() as u64,
            "Opened SQLite database"
        );
        Ok(db)
    }

    /// Open a migrated in-memory database (tests and local experiments).
    pub fn open_in_memory() -> Result<Self, AppError> {
        let conn = Connection::open_in_memory()?;
        let db = Self::bootstrap(conn)?;
        tracing::debug!("Opened in-memory SQLite database");
        Ok(db)
    }

    fn bootstrap(mut conn: Connection) -> Result<Self, AppError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        super::apply_migrations(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking thread pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, AppError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, AppError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| AppError::Database("Connection lock poisoned".to_string()))?;
            f(&mut *guard)
        })
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Database task failed: {}", e)))?
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Register a new user. Emails are unique ignoring ASCII case.
    pub async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, AppError> {
        let email = email.to_string();
        let password_hash = password_hash.to_string();
        self.with_conn(move |conn| {
            let created_at = now_rfc3339();
            let inserted = conn.execute(
                "INSERT INTO users (email, password_hash, created_at) VALUES (?1, ?2, ?3)",
                params![email, password_hash, created_at],
            );

            match inserted {
                Ok(_) => Ok(User {
                    id: conn.last_insert_rowid(),
                    email,
                    password_hash,
                    created_at,
                }),
                Err(rusqlite::Error::SqliteFailure(err, _))
                    if err.code == ErrorCode::ConstraintViolation =>
                {
                    Err(AppError::BadRequest(
                        "Email is already registered".to_string(),
                    ))
                }
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    /// Look up a user by login email.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = email.to_string();
        self.with_conn(move |conn| {
            Ok(conn
                .query_row(
                    "SELECT id, email, password_hash, created_at FROM users WHERE email = ?1",
                    params![email],
                    |row| {
                        Ok(User {
                            id: row.get(0)?,
                            email: row.get(1)?,
                            password_hash: row.get(2)?,
                            created_at: row.get(3)?,
                        })
                    },
                )
                .optional()?)
        })
        .await
    }

    // ─── Subject Operations ──────────────────────────────────────

    pub async fn list_subjects(&self, user_id: i64) -> Result<Vec<Subject>, AppError> {
        self.with_conn(move |conn| {
            let mut stmt =
                conn.prepare("SELECT id, name FROM subjects WHERE user_id = ?1 ORDER BY id")?;
            let subjects = stmt
                .query_map(params![user_id], |row| {
                    Ok(Subject {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(subjects)
        })
        .await
    }

    pub async fn create_subject(&self, user_id: i64, name: &str) -> Result<Subject, AppError> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO subjects (user_id, name, created_at) VALUES (?1, ?2, ?3)",
                params![user_id, name, now_rfc3339()],
            )?;
            Ok(Subject {
                id: conn.last_insert_rowid(),
                name,
            })
        })
        .await
    }

    /// Delete a subject with its units, topics and notes.
    ///
    /// Returns false if the subject was not found.
    pub async fn delete_subject(&self, user_id: i64, subject_id: i64) -> Result<bool, AppError> {
        self.with_conn(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM subjects WHERE id = ?1 AND user_id = ?2",
                params![subject_id, user_id],
            )?;
            Ok(deleted > 0)
        })
        .await
    }

    // ─── Unit Operations ─────────────────────────────────────────

    /// List a subject's units with their topics.
    ///
    /// Returns `None` if the subject was not found.
    pub async fn list_units_with_topics(
        &self,
        user_id: i64,
        subject_id: i64,
    ) -> Result<Option<Vec<UnitWithTopics>>, AppError> {
        self.with_conn(move |conn| {
            if !subject_exists(conn, user_id, subject_id)? {
                return Ok(None);
            }

            let mut stmt =
                conn.prepare("SELECT id, name FROM units WHERE subject_id = ?1 ORDER BY id")?;
            let mut units = stmt
                .query_map(params![subject_id], |row| {
                    Ok(UnitWithTopics {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        topics: Vec::new(),
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let mut stmt = conn.prepare(
                "SELECT t.unit_id, t.id, t.name, t.status
                 FROM topics t
                 JOIN units u ON u.id = t.unit_id
                 WHERE u.subject_id = ?1
                 ORDER BY t.id",
            )?;
            let rows = stmt.query_map(params![subject_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    Topic {
                        id: row.get(1)?,
                        name: row.get(2)?,
                        status: row.get(3)?,
                    },
                ))
            })?;

            for row in rows {
                let (unit_id, topic) = row?;
                if let Some(unit) = units.iter_mut().find(|u| u.id == unit_id) {
                    unit.topics.push(topic);
                }
            }

            Ok(Some(units))
        })
        .await
    }

    /// Add a unit to a subject. Returns `None` if the subject was not found.
    pub async fn create_unit(
        &self,
        user_id: i64,
        subject_id: i64,
        name: &str,
    ) -> Result<Option<Unit>, AppError> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            let inserted = conn.execute(
                "INSERT INTO units (subject_id, name, created_at)
                 SELECT id, ?3, ?4 FROM subjects WHERE id = ?1 AND user_id = ?2",
                params![subject_id, user_id, name, now_rfc3339()],
            )?;
            if inserted == 0 {
                return Ok(None);
            }
            Ok(Some(Unit {
                id: conn.last_insert_rowid(),
                name,
            }))
        })
        .await
    }

    /// Delete a unit with its topics and notes.
    pub async fn delete_unit(&self, user_id: i64, unit_id: i64) -> Result<bool, AppError> {
        self.with_conn(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM units
                 WHERE id = ?1
                   AND subject_id IN (SELECT id FROM subjects WHERE user_id = ?2)",
                params![unit_id, user_id],
            )?;
            Ok(deleted > 0)
        })
        .await
    }

    // ─── Topic Operations ────────────────────────────────────────

    /// List a unit's topics. Returns `None` if the unit was not found.
    pub async fn list_topics(
        &self,
        user_id: i64,
        unit_id: i64,
    ) -> Result<Option<Vec<Topic>>, AppError> {
        self.with_conn(move |conn| {
            if !unit_exists(conn, user_id, unit_id)? {
                return Ok(None);
            }

            let mut stmt = conn
                .prepare("SELECT id, name, status FROM topics WHERE unit_id = ?1 ORDER BY id")?;
            let topics = stmt
                .query_map(params![unit_id], |row| {
                    Ok(Topic {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        status: row.get(2)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(Some(topics))
        })
        .await
    }

    /// Add a `Not Started` topic to a unit. Returns `None` if the unit was not found.
    pub async fn create_topic(
        &self,
        user_id: i64,
        unit_id: i64,
        name: &str,
    ) -> Result<Option<Topic>, AppError> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            let status = TopicStatus::NotStarted;
            let inserted = conn.execute(
                "INSERT INTO topics (unit_id, name, status, updated_at)
                 SELECT u.id, ?3, ?4, ?5
                 FROM units u JOIN subjects s ON s.id = u.subject_id
                 WHERE u.id = ?1 AND s.user_id = ?2",
                params![unit_id, user_id, name, status, now_rfc3339()],
            )?;
            if inserted == 0 {
                return Ok(None);
            }
            Ok(Some(Topic {
                id: conn.last_insert_rowid(),
                name,
                status,
            }))
        })
        .await
    }

    /// Set a topic's status. Returns false if the topic was not found.
    pub async fn update_topic_status(
        &self,
        user_id: i64,
        topic_id: i64,
        status: TopicStatus,
    ) -> Result<bool, AppError> {
        self.with_conn(move |conn| {
            let updated = conn.execute(
                "UPDATE topics SET status = ?3, updated_at = ?4
                 WHERE id = ?1
                   AND unit_id IN (
                       SELECT u.id FROM units u JOIN subjects s ON s.id = u.subject_id
                       WHERE s.user_id = ?2
                   )",
                params![topic_id, user_id, status, now_rfc3339()],
            )?;
            Ok(updated > 0)
        })
        .await
    }

    pub async fn delete_topic(&self, user_id: i64, topic_id: i64) -> Result<bool, AppError> {
        self.with_conn(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM topics
                 WHERE id = ?1
                   AND unit_id IN (
                       SELECT u.id FROM units u JOIN subjects s ON s.id = u.subject_id
                       WHERE s.user_id = ?2
                   )",
                params![topic_id, user_id],
            )?;
            Ok(deleted > 0)
        })
        .await
    }

    // ─── Note Operations ─────────────────────────────────────────

    /// List a unit's notes, newest first. Returns `None` if the unit was not found.
    pub async fn list_notes(
        &self,
        user_id: i64,
        unit_id: i64,
    ) -> Result<Option<Vec<Note>>, AppError> {
        self.with_conn(move |conn| {
            if !unit_exists(conn, user_id, unit_id)? {
                return Ok(None);
            }

            let mut stmt = conn.prepare(
                "SELECT id, content FROM notes
                 WHERE unit_id = ?1
                 ORDER BY created_at DESC, id DESC",
            )?;
            let notes = stmt
                .query_map(params![unit_id], |row| {
                    Ok(Note {
                        id: row.get(0)?,
                        content: row.get(1)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(Some(notes))
        })
        .await
    }

    /// Attach a note to a unit. Returns `None` if the unit was not found.
    pub async fn create_note(
        &self,
        user_id: i64,
        unit_id: i64,
        content: &str,
    ) -> Result<Option<Note>, AppError> {
        let content = content.to_string();
        self.with_conn(move |conn| {
            let inserted = conn.execute(
                "INSERT INTO notes (unit_id, content, created_at)
                 SELECT u.id, ?3, ?4
                 FROM units u JOIN subjects s ON s.id = u.subject_id
                 WHERE u.id = ?1 AND s.user_id = ?2",
                params![unit_id, user_id, content, now_rfc3339()],
            )?;
            if inserted == 0 {
                return Ok(None);
            }
            Ok(Some(Note {
                id: conn.last_insert_rowid(),
                content,
            }))
        })
        .await
    }

    pub async fn delete_note(&self, user_id: i64, note_id: i64) -> Result<bool, AppError> {
        self.with_conn(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM notes
                 WHERE id = ?1
                   AND unit_id IN (
                       SELECT u.id FROM units u JOIN subjects s ON s.id = u.subject_id
                       WHERE s.user_id = ?2
                   )",
                params![note_id, user_id],
            )?;
            Ok(deleted > 0)
        })
        .await
    }

    // ─── Progress ────────────────────────────────────────────────

    /// Completion of a unit's topics. Returns `None` if the unit was not found.
    pub async fn unit_progress(
        &self,
        user_id: i64,
        unit_id: i64,
    ) -> Result<Option<Progress>, AppError> {
        self.with_conn(move |conn| {
            if !unit_exists(conn, user_id, unit_id)? {
                return Ok(None);
            }

            let (completed, total) = conn.query_row(
                "SELECT COALESCE(SUM(status = 'Completed'), 0), COUNT(*)
                 FROM topics WHERE unit_id = ?1",
                params![unit_id],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
            )?;
            Ok(Some(Progress::from_counts(completed as u64, total as u64)))
        })
        .await
    }

    /// Completion across every topic of every unit in a subject.
    ///
    /// Returns `None` if the subject was not found.
    pub async fn subject_progress(
        &self,
        user_id: i64,
        subject_id: i64,
    ) -> Result<Option<Progress>, AppError> {
        self.with_conn(move |conn| {
            if !subject_exists(conn, user_id, subject_id)? {
                return Ok(None);
            }

            let (completed, total) = conn.query_row(
                "SELECT COALESCE(SUM(t.status = 'Completed'), 0), COUNT(*)
                 FROM topics t JOIN units u ON u.id = t.unit_id
                 WHERE u.subject_id = ?1",
                params![subject_id],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
            )?;
            Ok(Some(Progress::from_counts(completed as u64, total as u64)))
        })
        .await
    }
}

fn subject_exists(conn: &Connection, user_id: i64, subject_id: i64) -> Result<bool, AppError> {
    Ok(conn
        .query_row(
            "SELECT 1 FROM subjects WHERE id = ?1 AND user_id = ?2",
            params![subject_id, user_id],
            |_| Ok(()),
        )
        .optional()?
        .is_some())
}

fn unit_exists(conn: &Connection, user_id: i64, unit_id: i64) -> Result<bool, AppError> {
    Ok(conn
        .query_row(
            "SELECT 1 FROM units u JOIN subjects s ON s.id = u.subject_id
             WHERE u.id = ?1 AND s.user_id = ?2",
            params![unit_id, user_id],
            |_| Ok(()),
        )
        .optional()?
        .is_some())
}
