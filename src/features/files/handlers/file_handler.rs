use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;
use validator::Validate;

use crate::core::error::AppError;
use crate::core::extractor::AppJson;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::files::dtos::{
    FileResponseDto, ListFilesQuery, ShareFileDto, UploadFileDto,
};
use crate::features::files::services::FileService;
use crate::shared::types::{ApiResponse, Meta};

/// List files visible to the caller
///
/// Returns files the caller owns plus files whose sharing list contains
/// the caller's email, newest first unless another sort key is requested.
#[utoipa::path(
    get,
    path = "/api/files",
    tag = "files",
    params(ListFilesQuery),
    responses(
        (status = 200, description = "Visible files", body = ApiResponse<Vec<FileResponseDto>>),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Token has no email claim")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_files(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    Query(query): Query<ListFilesQuery>,
) -> Result<Json<ApiResponse<Vec<FileResponseDto>>>, AppError> {
    let files = service.list_files(&user, &query).await?;

    let total = files.len() as i64;
    Ok(Json(ApiResponse::success(
        Some(files),
        None,
        Some(Meta { total }),
    )))
}

/// Upload a file
///
/// Accepts multipart/form-data with a single `file` field. The bytes go to
/// object storage under a random key; the metadata row records the original
/// filename, the resolved public URL, and the uploader's identity.
#[utoipa::path(
    post,
    path = "/api/files/upload",
    tag = "files",
    request_body(
        content = UploadFileDto,
        content_type = "multipart/form-data",
        description = "File upload form",
    ),
    responses(
        (status = 201, description = "File uploaded successfully", body = ApiResponse<FileResponseDto>),
        (status = 400, description = "Missing or unreadable file field"),
        (status = 401, description = "Authentication required"),
        (status = 413, description = "File too large"),
        (status = 502, description = "Object storage write failed")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn upload_file(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<FileResponseDto>>), AppError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;
    let mut content_type: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read multipart data: {}", e))
    })? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                let declared_type = field.content_type().map(|s| s.to_string());

                let fname = field
                    .file_name()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "unnamed".to_string());

                let data = field.bytes().await.map_err(|e| {
                    debug!("Failed to read file bytes: {}", e);
                    AppError::BadRequest(format!("Failed to read file data: {}", e))
                })?;

                // MIME type: browser-declared, else guessed from the name
                let ct = declared_type.unwrap_or_else(|| {
                    mime_guess::from_path(&fname)
                        .first()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "application/octet-stream".to_string())
                });

                file_data = Some(data.to_vec());
                file_name = Some(fname);
                content_type = Some(ct);
            }
            _ => {
                debug!("Ignoring unknown field: {}", field_name);
            }
        }
    }

    let file_data =
        file_data.ok_or_else(|| AppError::BadRequest("File is required".to_string()))?;
    let file_name =
        file_name.ok_or_else(|| AppError::BadRequest("Filename is required".to_string()))?;
    let content_type =
        content_type.ok_or_else(|| AppError::BadRequest("Content type is required".to_string()))?;

    let response = service
        .upload_file(file_data, &file_name, &content_type, &user)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(response), None, None)),
    ))
}

/// Share a file with one more recipient
///
/// Appends the email to the file's sharing list. Duplicates are not
/// filtered; an already-listed email is appended again.
#[utoipa::path(
    post,
    path = "/api/files/{id}/share",
    tag = "files",
    params(
        ("id" = Uuid, Path, description = "File id")
    ),
    request_body = ShareFileDto,
    responses(
        (status = 200, description = "Recipient appended", body = ApiResponse<FileResponseDto>),
        (status = 400, description = "Invalid email"),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "File not found or not visible to the caller")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn share_file(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    Path(id): Path<Uuid>,
    AppJson(dto): AppJson<ShareFileDto>,
) -> Result<Json<ApiResponse<FileResponseDto>>, AppError> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let file = service.share_file(id, &dto.email, &user).await?;

    Ok(Json(ApiResponse::success(
        Some(file),
        Some("File shared successfully".to_string()),
        None,
    )))
}
