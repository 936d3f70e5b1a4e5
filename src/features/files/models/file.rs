use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for files.
///
/// A row is visible to a user iff `user_id` matches their subject or their
/// email appears in `shared_with`. `shared_with` only ever grows; nothing
/// in this surface deletes rows or rewrites the derived columns.
#[derive(Debug, FromRow)]
pub struct File {
    pub id: Uuid,
    pub filename: String,
    pub public_url: String,
    pub content_type: String,
    pub extension: String,
    pub shared_with: Vec<String>,
    pub fullname: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}
