//! Error types for vsq-pipeline
//!
//! Remote-call failures are caught at the stage boundary and surfaced as
//! a `PipelineError`; [`PipelineError::user_message`] gives the text shown
//! to the user. Nothing is retried.

use crate::api::ApiError;
use crate::catalog::CatalogError;
use crate::form::ValidationError;
use crate::intake::IntakeError;
use crate::session::PipelineStage;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Remote stage a failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteStage {
    Detection,
    Classification,
    Valuation,
}

impl fmt::Display for RemoteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RemoteStage::Detection => "detection",
            RemoteStage::Classification => "classification",
            RemoteStage::Valuation => "valuation",
        };
        f.write_str(name)
    }
}

/// Pipeline error
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Detection service found no vehicle; a new image is required
    #[error("No vehicle detected in the image")]
    NoVehicleDetected,

    /// Transport or HTTP failure during a remote stage
    #[error("{stage} request failed: {source}")]
    Network {
        stage: RemoteStage,
        #[source]
        source: ApiError,
    },

    /// Form incomplete or malformed; no request was sent
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Response arrived for an image that has since been replaced
    #[error("Response for image generation {generation} discarded (current generation {current})")]
    Superseded { generation: u64, current: u64 },

    #[error("No image has been uploaded")]
    NoImage,

    /// Operation not valid in the current stage
    #[error("Operation not allowed in stage {0}")]
    NotReady(PipelineStage),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] ApiError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Intake(#[from] IntakeError),
}

impl PipelineError {
    pub fn network(stage: RemoteStage, source: ApiError) -> Self {
        PipelineError::Network { stage, source }
    }

    /// Text surfaced to the user at the stage boundary
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::NoVehicleDetected => {
                "No car detected in the image. Please upload an image containing a car."
                    .to_string()
            }
            PipelineError::Network {
                stage: RemoteStage::Valuation,
                source,
            } => format!(
                "Failed to fetch a price estimate ({}). Check the form and submit again.",
                source
            ),
            PipelineError::Network { source, .. } => format!(
                "Failed to process image ({}). Please upload the image again.",
                source
            ),
            PipelineError::Validation(err) => format!("Please complete the form. {}", err),
            PipelineError::Superseded { .. } => {
                "A newer image replaced this request; its result was ignored.".to_string()
            }
            other => other.to_string(),
        }
    }

    /// Whether recovering requires uploading a new image
    pub fn requires_new_image(&self) -> bool {
        matches!(
            self,
            PipelineError::NoVehicleDetected
                | PipelineError::Network {
                    stage: RemoteStage::Detection | RemoteStage::Classification,
                    ..
                }
        )
    }
}
