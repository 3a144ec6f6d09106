//! Durable object storage for generated assets.
//!
//! This crate provides:
//! - A Cloudflare R2 client (S3 API) for uploading generated media
//! - The `ObjectStore` trait used by provider adapters to persist blobs
//! - A process-local blob cache used when durable storage is unavailable
//! - Object key conventions

pub mod client;
pub mod error;
pub mod keys;
pub mod local;
pub mod store;

pub use client::{R2Client, R2Config};
pub use error::{StorageError, StorageResult};
pub use keys::{narration_key, object_key, scene_asset_key};
pub use local::{LocalBlob, LocalBlobCache};
pub use store::ObjectStore;
