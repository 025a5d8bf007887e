//! vsq-pipeline library interface
//!
//! Vehicle identification-to-valuation pipeline:
//! image intake → detection → classification → identity parsing +
//! catalog enrichment → attribute form → price estimate.
//!
//! The remote models are reached through [`api::VehicleApi`]; the
//! specification catalog is injected as an `Arc<SpecCatalog>`.

pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod form;
pub mod intake;
pub mod parser;
pub mod recognition;
pub mod session;
pub mod valuation;

pub use crate::error::{PipelineError, RemoteStage};
pub use crate::session::{IdentificationOutcome, IdentificationSession, PipelineStage};

use crate::api::HttpVehicleApi;
use crate::catalog::SpecCatalog;
use crate::config::PipelineConfig;
use std::sync::Arc;
use tracing::info;

/// Load the configured catalog, or the bundled one
pub fn load_catalog(config: &PipelineConfig) -> Result<SpecCatalog, PipelineError> {
    let catalog = match &config.catalog_path {
        Some(path) => SpecCatalog::load(path)?,
        None => SpecCatalog::bundled()?,
    };
    Ok(catalog)
}

/// Build a session talking HTTP to the configured backend
pub fn build_session(config: &PipelineConfig) -> Result<IdentificationSession, PipelineError> {
    let catalog = Arc::new(load_catalog(config)?);
    let api = HttpVehicleApi::new(config.api_base_url.clone(), config.request_timeout)
        .map_err(PipelineError::HttpClient)?;

    info!(
        api_base_url = %config.api_base_url,
        catalog_records = catalog.len(),
        timeout = ?config.request_timeout,
        "Pipeline session ready"
    );
    Ok(IdentificationSession::new(Arc::new(api), catalog))
}
