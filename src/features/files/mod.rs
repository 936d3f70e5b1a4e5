//! File sharing feature.
//!
//! Users upload files to object storage, list files they own or that were
//! shared with them, and append recipients to a file's sharing list.
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/api/files` | List visible files (search/type/sort/limit) |
//! | POST | `/api/files/upload` | Upload a file and record its metadata |
//! | POST | `/api/files/{id}/share` | Append a recipient email |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use routes::routes;
pub use services::FileService;
