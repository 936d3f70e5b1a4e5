use sqlx::{PgPool, Postgres, QueryBuilder};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::files::dtos::{
    effective_limit, escape_like_pattern, file_extension, FileResponseDto, ListFilesQuery,
    SortKey,
};
use crate::features::files::models::File;
use crate::modules::storage::MinIOClient;

const FILE_COLUMNS: &str =
    "id, filename, public_url, content_type, extension, shared_with, fullname, user_id, created_at";

/// Service for file operations
pub struct FileService {
    pool: PgPool,
    minio_client: Arc<MinIOClient>,
}

impl FileService {
    pub fn new(pool: PgPool, minio_client: Arc<MinIOClient>) -> Self {
        Self { pool, minio_client }
    }

    /// Every file operation is scoped by subject AND email; a token
    /// without an email claim must never produce an unscoped query.
    fn require_email(user: &AuthenticatedUser) -> Result<&str> {
        user.email
            .as_deref()
            .filter(|e| !e.is_empty())
            .ok_or_else(|| AppError::Forbidden("Token has no email claim".to_string()))
    }

    /// Storage key: fresh random token plus the original extension. The
    /// original filename survives only in metadata.
    fn storage_key(extension: &str) -> String {
        let token = Uuid::new_v4();
        if extension.is_empty() {
            token.to_string()
        } else {
            format!("{}.{}", token, extension)
        }
    }

    /// Append a recipient to a possibly-absent sharing list. Duplicates
    /// are intentionally kept.
    fn with_recipient(current: Option<Vec<String>>, email: &str) -> Vec<String> {
        let mut shared = current.unwrap_or_default();
        shared.push(email.to_string());
        shared
    }

    /// Assemble the list query. The visibility scope is unconditional;
    /// the optional filters only ever AND onto it.
    fn build_list_query<'a>(
        sub: &'a str,
        email: &'a str,
        query: &'a ListFilesQuery,
    ) -> QueryBuilder<'a, Postgres> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {} FROM files WHERE (user_id = ",
            FILE_COLUMNS
        ));
        qb.push_bind(sub);
        qb.push(" OR ");
        qb.push_bind(email);
        qb.push(" = ANY(shared_with))");

        if let Some(content_type) = query.r#type.as_deref().filter(|t| !t.is_empty()) {
            qb.push(" AND content_type = ");
            qb.push_bind(content_type);
        }

        if let Some(term) = query.search.as_deref().filter(|s| !s.is_empty()) {
            qb.push(" AND filename ILIKE ");
            qb.push_bind(format!("%{}%", escape_like_pattern(term)));
        }

        qb.push(" ORDER BY ");
        qb.push(SortKey::parse(query.sort.as_deref()).order_by());

        if let Some(limit) = effective_limit(query.limit) {
            qb.push(" LIMIT ");
            qb.push_bind(limit);
        }

        qb
    }

    /// List files owned by or shared with the user.
    ///
    /// Optional filters: exact MIME type, case-insensitive filename
    /// substring. Sort column comes from a fixed allow-list; the limit is
    /// honored only within 1..=100.
    pub async fn list_files(
        &self,
        user: &AuthenticatedUser,
        query: &ListFilesQuery,
    ) -> Result<Vec<FileResponseDto>> {
        let email = Self::require_email(user)?;

        let mut qb = Self::build_list_query(&user.sub, email, query);
        let files = qb
            .build_query_as::<File>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list files: {:?}", e);
                AppError::Database(e)
            })?;

        debug!("Listed {} files for user {}", files.len(), user.sub);

        Ok(files.into_iter().map(FileResponseDto::from).collect())
    }

    /// Upload file bytes to object storage and record a metadata row.
    ///
    /// The two writes are not transactional: if the insert fails after the
    /// object write succeeded, the stored object is orphaned. There is no
    /// compensating delete.
    pub async fn upload_file(
        &self,
        data: Vec<u8>,
        original_filename: &str,
        content_type: &str,
        user: &AuthenticatedUser,
    ) -> Result<FileResponseDto> {
        Self::require_email(user)?;

        let extension = file_extension(original_filename);
        let key = Self::storage_key(&extension);

        // Object write first; abort before the insert on failure
        self.minio_client
            .upload(&key, data, content_type)
            .await?;

        debug!("File uploaded to storage: {}", key);

        let public_url = self.minio_client.public_url(&key);

        let file = sqlx::query_as::<_, File>(&format!(
            "INSERT INTO files (filename, public_url, content_type, extension, fullname, user_id) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            FILE_COLUMNS
        ))
        .bind(original_filename)
        .bind(&public_url)
        .bind(content_type)
        .bind(&extension)
        .bind(user.display_name())
        .bind(&user.sub)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert file metadata: {:?}", e);
            AppError::Database(e)
        })?;

        info!(
            "File uploaded: id={}, key={}, type={}, owner={}",
            file.id, key, file.content_type, file.user_id
        );

        Ok(file.into())
    }

    /// Append a recipient email to a file's sharing list.
    ///
    /// Fetch-then-write, keyed by file id and scoped to rows visible to
    /// the caller. The sequence is not atomic against a concurrent share
    /// of the same file: the last writer wins and one append can be lost.
    pub async fn share_file(
        &self,
        file_id: Uuid,
        recipient: &str,
        user: &AuthenticatedUser,
    ) -> Result<FileResponseDto> {
        let email = Self::require_email(user)?;

        let current: Option<Option<Vec<String>>> = sqlx::query_scalar(
            "SELECT shared_with FROM files \
             WHERE id = $1 AND (user_id = $2 OR $3 = ANY(shared_with))",
        )
        .bind(file_id)
        .bind(&user.sub)
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to read sharing list: {:?}", e);
            AppError::Database(e)
        })?;

        let current = current.ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

        let shared_with = Self::with_recipient(current, recipient);

        let file = sqlx::query_as::<_, File>(&format!(
            "UPDATE files SET shared_with = $2 WHERE id = $1 RETURNING {}",
            FILE_COLUMNS
        ))
        .bind(file_id)
        .bind(&shared_with)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update sharing list: {:?}", e);
            AppError::Database(e)
        })?;

        info!(
            "File shared: id={}, recipients={}",
            file.id,
            file.shared_with.len()
        );

        Ok(file.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_key_preserves_extension_only() {
        let key = FileService::storage_key("txt");
        assert!(key.ends_with(".txt"));
        // 36 chars of UUID plus ".txt"
        assert_eq!(key.len(), 40);

        let bare = FileService::storage_key("");
        assert!(!bare.contains('.'));
        assert_eq!(bare.len(), 36);
    }

    #[test]
    fn storage_keys_are_unique() {
        assert_ne!(FileService::storage_key("txt"), FileService::storage_key("txt"));
    }

    #[test]
    fn recipient_append_tolerates_absent_list() {
        assert_eq!(
            FileService::with_recipient(None, "a@example.com"),
            vec!["a@example.com"]
        );
    }

    #[test]
    fn recipient_append_keeps_duplicates() {
        let once = FileService::with_recipient(None, "a@example.com");
        let twice = FileService::with_recipient(Some(once), "a@example.com");
        assert_eq!(twice, vec!["a@example.com", "a@example.com"]);
    }

    #[test]
    fn recipient_append_preserves_insertion_order() {
        let list = FileService::with_recipient(
            Some(vec!["first@example.com".to_string()]),
            "second@example.com",
        );
        assert_eq!(list, vec!["first@example.com", "second@example.com"]);
    }

    #[test]
    fn list_query_is_always_scoped_to_the_caller() {
        let query = ListFilesQuery::default();
        let qb = FileService::build_list_query("u1", "a@example.com", &query);
        let sql = qb.sql();
        assert!(sql.contains("WHERE (user_id = $1 OR $2 = ANY(shared_with))"));
        assert!(sql.ends_with("ORDER BY created_at DESC"));
        assert!(!sql.contains("LIMIT"));
    }

    #[test]
    fn list_query_filters_and_onto_the_scope() {
        let query = ListFilesQuery {
            search: Some("report".to_string()),
            r#type: Some("image/png".to_string()),
            ..Default::default()
        };
        let qb = FileService::build_list_query("u1", "a@example.com", &query);
        let sql = qb.sql();
        assert!(sql.contains("WHERE (user_id = $1 OR $2 = ANY(shared_with))"));
        assert!(sql.contains(" AND content_type = $3"));
        assert!(sql.contains(" AND filename ILIKE $4"));
    }

    #[test]
    fn list_query_ignores_blank_filters() {
        let query = ListFilesQuery {
            search: Some(String::new()),
            r#type: Some(String::new()),
            ..Default::default()
        };
        let qb = FileService::build_list_query("u1", "a@example.com", &query);
        let sql = qb.sql();
        assert!(!sql.contains("content_type"));
        assert!(!sql.contains("ILIKE"));
    }

    #[test]
    fn list_query_orders_by_the_resolved_sort_key() {
        let by_name = ListFilesQuery {
            sort: Some("filename".to_string()),
            ..Default::default()
        };
        let qb = FileService::build_list_query("u1", "a@example.com", &by_name);
        assert!(qb.sql().ends_with("ORDER BY filename ASC"));

        let hostile = ListFilesQuery {
            sort: Some("filename; DROP TABLE files".to_string()),
            ..Default::default()
        };
        let qb = FileService::build_list_query("u1", "a@example.com", &hostile);
        assert!(qb.sql().ends_with("ORDER BY created_at DESC"));
        assert!(!qb.sql().contains("DROP"));
    }

    #[test]
    fn list_query_limit_applied_only_within_range() {
        let capped = ListFilesQuery {
            limit: Some(50),
            ..Default::default()
        };
        let qb = FileService::build_list_query("u1", "a@example.com", &capped);
        assert!(qb.sql().ends_with(" LIMIT $3"));

        for out_of_range in [0, 101, -5] {
            let query = ListFilesQuery {
                limit: Some(out_of_range),
                ..Default::default()
            };
            let qb = FileService::build_list_query("u1", "a@example.com", &query);
            assert!(!qb.sql().contains("LIMIT"));
        }
    }

    #[test]
    fn email_claim_is_required() {
        let user = AuthenticatedUser {
            sub: "u1".to_string(),
            email: None,
            name: None,
        };
        assert!(matches!(
            FileService::require_email(&user),
            Err(AppError::Forbidden(_))
        ));

        let blank = AuthenticatedUser {
            email: Some(String::new()),
            ..user
        };
        assert!(matches!(
            FileService::require_email(&blank),
            Err(AppError::Forbidden(_))
        ));
    }
}
