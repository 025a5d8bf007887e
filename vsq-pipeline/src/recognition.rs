//! Recognition client
//!
//! Two sequential remote calls over the same image:
//! 1. presence check: no vehicle halts the pipeline with `NoVehicleDetected`
//! 2. classification: returns the raw identity label, trimmed
//!
//! Either call failing halts the identify step. No retry.

use crate::api::VehicleApi;
use crate::error::{PipelineError, RemoteStage};
use crate::intake::UploadedImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Probability above which a classification is considered reliable
const HIGH_CONFIDENCE: f64 = 0.8;
/// Probability above which a classification is plausible
const MEDIUM_CONFIDENCE: f64 = 0.6;

/// Bucketed classifier confidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn from_probability(probability: f64) -> Self {
        if probability > HIGH_CONFIDENCE {
            ConfidenceLevel::High
        } else if probability > MEDIUM_CONFIDENCE {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}

/// Free-text identity returned by classification (e.g. "BMW X3 SUV 2012")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleIdentity {
    pub label: String,
    pub probability: Option<f64>,
}

impl VehicleIdentity {
    pub fn new(label: impl Into<String>, probability: Option<f64>) -> Self {
        Self {
            label: label.into(),
            probability,
        }
    }

    pub fn confidence(&self) -> Option<ConfidenceLevel> {
        self.probability.map(ConfidenceLevel::from_probability)
    }

    /// Probability as a percentage string ("87.50%")
    pub fn confidence_percent(&self) -> Option<String> {
        self.probability.map(|p| format!("{:.2}%", p * 100.0))
    }
}

/// Drives detection and classification
#[derive(Clone)]
pub struct RecognitionClient {
    api: Arc<dyn VehicleApi>,
}

impl RecognitionClient {
    pub fn new(api: Arc<dyn VehicleApi>) -> Self {
        Self { api }
    }

    /// Presence check; `Ok(())` only when a vehicle was found
    pub async fn detect(&self, image: &UploadedImage) -> Result<(), PipelineError> {
        let response = self
            .api
            .check_car(image)
            .await
            .map_err(|e| PipelineError::network(RemoteStage::Detection, e))?;

        if !response.car_detected {
            warn!(file_name = image.file_name(), "No vehicle detected");
            return Err(PipelineError::NoVehicleDetected);
        }

        debug!(file_name = image.file_name(), "Vehicle detected");
        Ok(())
    }

    /// Classification; the label is trimmed but otherwise untouched
    pub async fn classify(&self, image: &UploadedImage) -> Result<VehicleIdentity, PipelineError> {
        let response = self
            .api
            .classify(image)
            .await
            .map_err(|e| PipelineError::network(RemoteStage::Classification, e))?;

        let identity = VehicleIdentity::new(response.prediction.trim(), response.probability);
        info!(
            identity = %identity.label,
            probability = ?identity.probability,
            "Vehicle classified"
        );
        Ok(identity)
    }
}
