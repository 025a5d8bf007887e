//! Remote vehicle services
//!
//! The recognition, classification, and valuation models are opaque remote
//! services. [`VehicleApi`] is the seam the pipeline talks to; the
//! production implementation is [`HttpVehicleApi`] over reqwest.
//!
//! # Wire contract
//! - `POST /yolo/check_car`, multipart field `file` → `{ "car_detected": bool }`
//! - `POST /predict/predict`, multipart field `file` → `{ "prediction": string, "probability": number }`
//! - `POST /price/predict_price`, JSON body → `{ "predicted_price": number }`

pub mod http_client;

pub use http_client::HttpVehicleApi;

use crate::form::ValuationRequest;
use crate::intake::UploadedImage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Presence check endpoint
pub const CHECK_CAR_PATH: &str = "/yolo/check_car";
/// Classification endpoint
pub const PREDICT_PATH: &str = "/predict/predict";
/// Price estimation endpoint
pub const PREDICT_PRICE_PATH: &str = "/price/predict_price";
/// Multipart field carrying the image
pub const FILE_FIELD: &str = "file";

/// Remote call errors
///
/// Every variant is a network failure from the pipeline's point of view.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Service returned {0}: {1}")]
    Status(u16, String),

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

/// Presence check response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionResponse {
    pub car_detected: bool,
}

/// Classification response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResponse {
    pub prediction: String,
    #[serde(default)]
    pub probability: Option<f64>,
}

/// Valuation response
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceResponse {
    pub predicted_price: f64,
}

/// Remote services consumed by the pipeline
#[async_trait]
pub trait VehicleApi: Send + Sync {
    /// Ask the detection service whether the image contains a vehicle
    async fn check_car(&self, image: &UploadedImage) -> Result<DetectionResponse, ApiError>;

    /// Classify the vehicle in the image
    async fn classify(&self, image: &UploadedImage) -> Result<ClassificationResponse, ApiError>;

    /// Request a price estimate for a completed record
    async fn predict_price(&self, request: &ValuationRequest) -> Result<PriceResponse, ApiError>;
}
