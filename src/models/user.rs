//! User model for storage.

/// Registered user account.
#[derive(Debug, Clone)]
pub struct User {
    /// Database row ID (also the JWT subject)
    pub id: i64,
    /// Login email, unique across accounts
    pub email: String,
    /// Encoded password hash (see `services::password`)
    pub password_hash: String,
    /// When the account was created (RFC 3339)
    pub created_at: String,
}
