use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::features::files::handlers::{list_files, share_file, upload_file};
use crate::features::files::services::FileService;

/// Create routes for the files feature
pub fn routes(file_service: Arc<FileService>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/api/files", get(list_files))
        .route(
            "/api/files/upload",
            // Body limit: payload cap plus headroom for multipart framing
            post(upload_file).layer(DefaultBodyLimit::max(max_upload_bytes + 1024 * 1024)),
        )
        .route("/api/files/{id}/share", post(share_file))
        .with_state(file_service)
}
