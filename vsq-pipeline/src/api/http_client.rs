//! HTTP implementation of [`VehicleApi`]

use super::{
    ApiError, ClassificationResponse, DetectionResponse, PriceResponse, VehicleApi,
    CHECK_CAR_PATH, FILE_FIELD, PREDICT_PATH, PREDICT_PRICE_PATH,
};
use crate::form::ValuationRequest;
use crate::intake::UploadedImage;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("vsq-pipeline/", env!("CARGO_PKG_VERSION"));

/// reqwest-backed client for the recognition and valuation services
pub struct HttpVehicleApi {
    http_client: Client,
    base_url: String,
}

impl HttpVehicleApi {
    /// Create a client for `base_url`
    ///
    /// `timeout` of `None` leaves requests unbounded.
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, ApiError> {
        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn image_form(image: &UploadedImage) -> Result<Form, ApiError> {
        let part = Part::bytes(image.bytes().to_vec())
            .file_name(image.file_name().to_string())
            .mime_str(image.content_type())
            .map_err(|e| ApiError::Network(format!("Invalid content type: {}", e)))?;
        Ok(Form::new().part(FILE_FIELD, part))
    }

    async fn post_image<T: DeserializeOwned>(
        &self,
        path: &str,
        image: &UploadedImage,
    ) -> Result<T, ApiError> {
        debug!(
            path = path,
            file_name = image.file_name(),
            size_bytes = image.len(),
            "Submitting image"
        );

        let response = self
            .http_client
            .post(self.url(path))
            .multipart(Self::image_form(image)?)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        decode(response).await
    }
}

/// Check status, then decode the JSON body
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::Status(status.as_u16(), body));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| ApiError::Decode(e.to_string()))
}

#[async_trait]
impl VehicleApi for HttpVehicleApi {
    async fn check_car(&self, image: &UploadedImage) -> Result<DetectionResponse, ApiError> {
        self.post_image(CHECK_CAR_PATH, image).await
    }

    async fn classify(&self, image: &UploadedImage) -> Result<ClassificationResponse, ApiError> {
        self.post_image(PREDICT_PATH, image).await
    }

    async fn predict_price(&self, request: &ValuationRequest) -> Result<PriceResponse, ApiError> {
        debug!(
            make = %request.make,
            model = %request.model,
            year = request.year,
            "Requesting price estimate"
        );

        let response = self
            .http_client
            .post(self.url(PREDICT_PRICE_PATH))
            .json(request)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        decode(response).await
    }
}
