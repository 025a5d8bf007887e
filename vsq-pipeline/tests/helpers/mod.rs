//! Test Helpers
//!
//! Shared fixtures for vsq-pipeline integration tests

#![allow(dead_code)]

pub mod scripted_api;

use std::sync::Arc;
use vsq_pipeline::catalog::SpecCatalog;
use vsq_pipeline::intake::UploadedImage;
use vsq_pipeline::IdentificationSession;

pub use scripted_api::{ImageScript, ScriptedApi};

/// JPEG SOI + APP0 marker, enough for content sniffing
pub const JPEG_MAGIC: [u8; 4] = [0xFF, 0xD8, 0xFF, 0xE0];

/// Small fake JPEG upload named `file_name`
pub fn jpeg(file_name: &str) -> UploadedImage {
    let mut bytes = JPEG_MAGIC.to_vec();
    bytes.extend_from_slice(file_name.as_bytes());
    UploadedImage::from_bytes(file_name, bytes)
}

/// Session over `api` with the bundled catalog
pub fn session_with(api: Arc<ScriptedApi>) -> IdentificationSession {
    let catalog = SpecCatalog::bundled().expect("bundled catalog parses");
    IdentificationSession::new(api, Arc::new(catalog))
}
