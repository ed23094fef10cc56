//! Tubely Storage Library
//!
//! This crate provides the storage abstraction used to publish processed videos,
//! with implementations for S3-compatible object stores and the local filesystem.
//!
//! # Storage key format
//!
//! Asset keys are `{orientation}/{random_id}.{ext}`, for example
//! `landscape/3q2-7wEjRk1R….mp4`. Keys must not contain `..` or a leading `/`.
//! Key generation is centralized in the `keys` module so all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use keys::AssetKey;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
pub use tubely_core::StorageBackend;
