use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::features::files::models::File;
use crate::shared::constants::{MAX_LIST_LIMIT, MIN_LIST_LIMIT};

/// Query parameters for the file list endpoint.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ListFilesQuery {
    /// Case-insensitive substring match against the filename
    pub search: Option<String>,
    /// Exact MIME type filter
    #[serde(rename = "type")]
    pub r#type: Option<String>,
    /// Sort column: created_at (default), filename or type. Unknown values
    /// fall back to created_at
    pub sort: Option<String>,
    /// Result limit, honored only within 1..=100; non-numeric values are
    /// treated like any other out-of-range value (no limit)
    #[serde(default, deserialize_with = "lenient_limit")]
    pub limit: Option<i64>,
}

/// Limit values arrive as query-string text. A value that does not parse
/// as an integer means "no limit" rather than a rejected request.
fn lenient_limit<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.parse().ok()))
}

/// Allow-listed sort keys. The raw `sort` parameter never reaches the
/// query text; it only selects one of these fixed ORDER BY fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    CreatedAt,
    Filename,
    ContentType,
}

impl SortKey {
    /// Resolve a sort parameter; anything unrecognized falls back to
    /// creation time.
    pub fn parse(param: Option<&str>) -> Self {
        match param.unwrap_or("created_at") {
            "filename" => SortKey::Filename,
            "type" => SortKey::ContentType,
            _ => SortKey::CreatedAt,
        }
    }

    pub fn order_by(&self) -> &'static str {
        match self {
            SortKey::CreatedAt => "created_at DESC",
            SortKey::Filename => "filename ASC",
            SortKey::ContentType => "content_type ASC",
        }
    }
}

/// A limit outside [1, 100] means "no limit".
pub fn effective_limit(limit: Option<i64>) -> Option<i64> {
    limit.filter(|l| (MIN_LIST_LIMIT..=MAX_LIST_LIMIT).contains(l))
}

/// Escape LIKE/ILIKE metacharacters so a search term is matched literally.
pub fn escape_like_pattern(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Extension of a client-side filename, without the dot. May be empty.
pub fn file_extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_string()
}

/// Upload request shape for OpenAPI documentation only; the handler uses
/// axum's Multipart extractor directly.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadFileDto {
    /// The file to upload
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file: String,
}

/// Request DTO for sharing a file with one more recipient.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ShareFileDto {
    /// Recipient email to append to the file's sharing list
    #[validate(length(min = 1, message = "email is required"))]
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
}

/// Response DTO for file rows. The owner id stays server-side.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FileResponseDto {
    pub id: Uuid,
    /// Original client-side filename
    pub filename: String,
    /// Stable public address of the stored bytes
    pub public_url: String,
    /// MIME type recorded at upload time
    pub content_type: String,
    /// Derived from the filename at upload time, may be empty
    pub extension: String,
    /// Recipient emails, in insertion order; duplicates are possible
    pub shared_with: Vec<String>,
    /// Uploader display name ("Unknown" when the token had no name claim)
    pub fullname: String,
    pub created_at: DateTime<Utc>,
}

impl From<File> for FileResponseDto {
    fn from(file: File) -> Self {
        Self {
            id: file.id,
            filename: file.filename,
            public_url: file.public_url,
            content_type: file.content_type,
            extension: file.extension,
            shared_with: file.shared_with,
            fullname: file.fullname,
            created_at: file.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_key_allow_list() {
        assert_eq!(SortKey::parse(Some("filename")), SortKey::Filename);
        assert_eq!(SortKey::parse(Some("type")), SortKey::ContentType);
        assert_eq!(SortKey::parse(Some("created_at")), SortKey::CreatedAt);
    }

    #[test]
    fn unknown_sort_key_falls_back_to_created_at() {
        assert_eq!(
            SortKey::parse(Some("filename; DROP TABLE files")).order_by(),
            SortKey::parse(None).order_by()
        );
        assert_eq!(SortKey::parse(Some("size")), SortKey::CreatedAt);
        assert_eq!(SortKey::parse(None).order_by(), "created_at DESC");
    }

    #[test]
    fn non_numeric_limit_is_not_a_rejection() {
        use axum::extract::Query;
        use axum::http::Uri;

        let uri: Uri = "/api/files?limit=abc".parse().unwrap();
        let Query(query) = Query::<ListFilesQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(query.limit, None);

        let uri: Uri = "/api/files?limit=50&search=report".parse().unwrap();
        let Query(query) = Query::<ListFilesQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(query.limit, Some(50));
        assert_eq!(query.search.as_deref(), Some("report"));

        let uri: Uri = "/api/files".parse().unwrap();
        let Query(query) = Query::<ListFilesQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(query.limit, None);
    }

    #[test]
    fn limit_outside_range_means_unlimited() {
        assert_eq!(effective_limit(Some(0)), None);
        assert_eq!(effective_limit(Some(101)), None);
        assert_eq!(effective_limit(Some(-5)), None);
        assert_eq!(effective_limit(None), None);
    }

    #[test]
    fn limit_in_range_is_honored() {
        assert_eq!(effective_limit(Some(1)), Some(1));
        assert_eq!(effective_limit(Some(50)), Some(50));
        assert_eq!(effective_limit(Some(100)), Some(100));
    }

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(escape_like_pattern("100%"), "100\\%");
        assert_eq!(escape_like_pattern("a_b"), "a\\_b");
        assert_eq!(escape_like_pattern("back\\slash"), "back\\\\slash");
        assert_eq!(escape_like_pattern("report"), "report");
    }

    #[test]
    fn extension_derivation() {
        assert_eq!(file_extension("a.txt"), "txt");
        assert_eq!(file_extension("Report.PDF"), "PDF");
        assert_eq!(file_extension("archive.tar.gz"), "gz");
        assert_eq!(file_extension("noext"), "");
        assert_eq!(file_extension(".env"), "");
    }
}
