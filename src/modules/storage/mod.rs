//! Object storage for uploaded file bytes.
//!
//! MinIO/S3-compatible client. Every stored object is publicly readable;
//! access control lives entirely in the metadata table's visibility
//! predicate, the public URL itself is unguarded.

mod minio_client;

pub use minio_client::MinIOClient;
