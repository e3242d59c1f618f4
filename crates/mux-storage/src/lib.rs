//! Cloudinary storage client.
//!
//! This crate provides:
//! - Unsigned multipart video upload with split connect/read timeouts
//! - Unlinkable public id generation
//! - Thumbnail URL derivation

pub mod client;
pub mod error;
pub mod naming;

pub use client::{CloudinaryClient, CloudinaryConfig, DEFAULT_API_BASE};
pub use error::{StorageError, StorageResult};
pub use naming::{generate_public_id, thumbnail_url, PUBLIC_ID_LEN};
