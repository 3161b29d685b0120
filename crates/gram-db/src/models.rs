/// Database row types — these map directly to SQLite rows.
/// Distinct from the gram-types API models to keep the DB layer independent.
/// Timestamps are stored as RFC 3339 UTC strings with fixed-width fractional
/// seconds, so lexicographic order matches chronological order.

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub is_active: bool,
    pub is_verified: bool,
    pub created_at: String,
}

pub struct PostRow {
    pub id: String,
    pub user_id: String,
    pub caption: Option<String>,
    pub url: String,
    pub file_type: String,
    pub file_name: String,
    pub created_at: String,
}

/// A feed entry: a post joined with its owner's email.
pub struct FeedRow {
    pub post: PostRow,
    pub owner_email: String,
}

/// Result of an ownership-checked post deletion.
#[derive(Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    NotOwner,
}

/// Result of a user insert. The `users.email` UNIQUE constraint is the
/// single arbiter of duplicates, so concurrent registrations can never
/// both succeed.
#[derive(Debug, PartialEq, Eq)]
pub enum CreateUserOutcome {
    Created,
    EmailTaken,
}
