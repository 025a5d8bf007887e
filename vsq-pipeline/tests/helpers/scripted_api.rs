//! Scripted VehicleApi
//!
//! In-process stand-in for the remote services. Responses are scripted per
//! uploaded file name; classification and valuation can be held open on a
//! gate to simulate a slow request overtaken by a newer upload.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use vsq_pipeline::api::{
    ApiError, ClassificationResponse, DetectionResponse, PriceResponse, VehicleApi,
};
use vsq_pipeline::form::ValuationRequest;
use vsq_pipeline::intake::UploadedImage;

/// Scripted responses for one image
#[derive(Debug, Clone, Default)]
pub struct ImageScript {
    /// `None` makes the presence check fail at transport level
    pub detected: Option<bool>,
    /// `None` makes classification fail at transport level
    pub label: Option<String>,
    pub probability: Option<f64>,
    /// Classification waits for this before answering
    pub classify_gate: Option<Arc<Notify>>,
}

impl ImageScript {
    pub fn vehicle(label: &str, probability: f64) -> Self {
        Self {
            detected: Some(true),
            label: Some(label.to_string()),
            probability: Some(probability),
            classify_gate: None,
        }
    }

    pub fn no_vehicle() -> Self {
        Self {
            detected: Some(false),
            ..Self::default()
        }
    }

    pub fn detection_down() -> Self {
        Self::default()
    }

    pub fn classification_down() -> Self {
        Self {
            detected: Some(true),
            ..Self::default()
        }
    }

    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.classify_gate = Some(gate);
        self
    }
}

/// Fake remote services with call counters
#[derive(Default)]
pub struct ScriptedApi {
    scripts: Mutex<HashMap<String, ImageScript>>,
    /// Queued price answers: `Ok(price)` or `Err(http status)`
    prices: Mutex<VecDeque<Result<f64, u16>>>,
    price_requests: Mutex<Vec<ValuationRequest>>,
    /// Valuation waits for this before answering
    price_gate: Mutex<Option<Arc<Notify>>>,
    /// Signalled whenever a classification request starts
    pub classify_started: Arc<Notify>,
    /// Signalled whenever a valuation request starts
    pub price_started: Arc<Notify>,
    pub check_calls: AtomicUsize,
    pub classify_calls: AtomicUsize,
    pub price_calls: AtomicUsize,
}

impl ScriptedApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, file_name: &str, script: ImageScript) {
        self.scripts
            .lock()
            .unwrap()
            .insert(file_name.to_string(), script);
    }

    pub fn queue_price(&self, price: f64) {
        self.prices.lock().unwrap().push_back(Ok(price));
    }

    pub fn queue_price_failure(&self, status: u16) {
        self.prices.lock().unwrap().push_back(Err(status));
    }

    pub fn hold_prices(&self, gate: Arc<Notify>) {
        *self.price_gate.lock().unwrap() = Some(gate);
    }

    pub fn price_requests(&self) -> Vec<ValuationRequest> {
        self.price_requests.lock().unwrap().clone()
    }

    pub fn calls(&self, counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn script_for(&self, image: &UploadedImage) -> ImageScript {
        self.scripts
            .lock()
            .unwrap()
            .get(image.file_name())
            .cloned()
            .unwrap_or_default()
    }
}

fn connection_refused() -> ApiError {
    ApiError::Network("connection refused".to_string())
}

#[async_trait]
impl VehicleApi for ScriptedApi {
    async fn check_car(&self, image: &UploadedImage) -> Result<DetectionResponse, ApiError> {
        self.check_calls.fetch_add(1, Ordering::SeqCst);
        let car_detected = self.script_for(image).detected.ok_or_else(connection_refused)?;
        Ok(DetectionResponse { car_detected })
    }

    async fn classify(&self, image: &UploadedImage) -> Result<ClassificationResponse, ApiError> {
        self.classify_calls.fetch_add(1, Ordering::SeqCst);
        let script = self.script_for(image);
        self.classify_started.notify_one();

        if let Some(gate) = &script.classify_gate {
            gate.notified().await;
        }

        let prediction = script.label.ok_or_else(connection_refused)?;
        Ok(ClassificationResponse {
            prediction,
            probability: script.probability,
        })
    }

    async fn predict_price(&self, request: &ValuationRequest) -> Result<PriceResponse, ApiError> {
        self.price_calls.fetch_add(1, Ordering::SeqCst);
        self.price_requests.lock().unwrap().push(request.clone());
        self.price_started.notify_one();

        let gate = self.price_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let next = self.prices.lock().unwrap().pop_front();
        match next {
            Some(Ok(predicted_price)) => Ok(PriceResponse { predicted_price }),
            Some(Err(status)) => Err(ApiError::Status(status, "scripted failure".to_string())),
            None => Err(connection_refused()),
        }
    }
}
