//! Identification session
//!
//! Orchestrates one image lifecycle:
//!
//! `Idle → Uploading → Detecting → Classifying → Parsed → (editing) → Estimating → Quoted`
//!
//! `Failed` is reachable from Detecting, Classifying and Estimating.
//! Detection/classification failures need a new image; a valuation failure
//! keeps the parsed identity and form so the user can fix and resubmit.
//!
//! # Stale responses
//! Every image bumps the session generation. Each in-flight stage captures
//! the generation it started under and, when its response resolves, applies
//! it only if the generation is still current. Otherwise the response is
//! dropped with [`PipelineError::Superseded`]; newer state is never touched.
//!
//! The state lock is never held across a remote call.

use crate::api::VehicleApi;
use crate::catalog::{CatalogEnricher, SpecCatalog, SpecRecord};
use crate::error::{PipelineError, RemoteStage};
use crate::events::PipelineEvent;
use crate::form::{AttributeFormState, FormField};
use crate::intake::UploadedImage;
use crate::parser::{IdentityParser, ParseOutcome};
use crate::recognition::{RecognitionClient, VehicleIdentity};
use crate::valuation::{PriceQuote, ValuationClient};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Pipeline stage for the current image
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStage {
    #[default]
    Idle,
    Uploading,
    Detecting,
    Classifying,
    Parsed,
    Estimating,
    Quoted,
    Failed(RemoteStage),
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStage::Failed(stage) => write!(f, "Failed({})", stage),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Everything derived for the current image
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub generation: u64,
    pub stage: PipelineStage,
    pub image: Option<UploadedImage>,
    pub identity: Option<VehicleIdentity>,
    pub parse: Option<ParseOutcome>,
    pub enrichment: Option<SpecRecord>,
    pub form: Option<AttributeFormState>,
    pub quote: Option<PriceQuote>,
    /// User-facing message for the last failure
    pub last_error: Option<String>,
}

/// Result of a successful identify step
#[derive(Debug, Clone)]
pub struct IdentificationOutcome {
    pub generation: u64,
    pub identity: VehicleIdentity,
    pub parse: ParseOutcome,
    pub enrichment: Option<SpecRecord>,
}

/// Identification-to-valuation pipeline for a single user
pub struct IdentificationSession {
    session_id: Uuid,
    recognition: RecognitionClient,
    parser: IdentityParser,
    enricher: CatalogEnricher,
    valuation: ValuationClient,
    state: Mutex<SessionState>,
    event_tx: Option<mpsc::Sender<PipelineEvent>>,
}

impl IdentificationSession {
    pub fn new(api: Arc<dyn VehicleApi>, catalog: Arc<SpecCatalog>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            recognition: RecognitionClient::new(api.clone()),
            parser: IdentityParser::new(catalog.clone()),
            enricher: CatalogEnricher::new(catalog),
            valuation: ValuationClient::new(api),
            state: Mutex::new(SessionState::default()),
            event_tx: None,
        }
    }

    /// Report progress on `event_tx`
    pub fn with_events(mut self, event_tx: mpsc::Sender<PipelineEvent>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub async fn snapshot(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    pub async fn stage(&self) -> PipelineStage {
        self.state.lock().await.stage
    }

    pub async fn form(&self) -> Option<AttributeFormState> {
        self.state.lock().await.form.clone()
    }

    /// Accept a new image and clear all downstream state
    ///
    /// Returns the new generation. Requests still in flight for the
    /// previous image will be discarded when they resolve.
    pub async fn set_image(&self, image: UploadedImage) -> u64 {
        let file_name = image.file_name().to_string();
        let size_bytes = image.len();

        let generation = {
            let mut state = self.state.lock().await;
            let generation = state.generation + 1;
            *state = SessionState {
                generation,
                stage: PipelineStage::Uploading,
                image: Some(image),
                ..SessionState::default()
            };
            generation
        };

        info!(
            session_id = %self.session_id,
            generation,
            file_name = %file_name,
            size_bytes,
            "Image accepted, downstream state cleared"
        );
        self.emit(PipelineEvent::ImageAccepted {
            generation,
            file_name,
            size_bytes,
        })
        .await;

        generation
    }

    /// Run detection, classification, parsing and enrichment for the current image
    pub async fn identify(&self) -> Result<IdentificationOutcome, PipelineError> {
        let (generation, image) = {
            let mut state = self.state.lock().await;
            let image = state.image.clone().ok_or(PipelineError::NoImage)?;
            if state.stage != PipelineStage::Uploading {
                return Err(PipelineError::NotReady(state.stage));
            }
            state.stage = PipelineStage::Detecting;
            (state.generation, image)
        };
        self.emit_stage(generation, PipelineStage::Detecting).await;

        let detected = self.recognition.detect(&image).await;
        self.settle(generation, detected, RemoteStage::Detection)
            .await?;
        self.advance(generation, PipelineStage::Classifying).await?;

        let classified = self.recognition.classify(&image).await;
        let identity = self
            .settle(generation, classified, RemoteStage::Classification)
            .await?;

        // Parser and enricher read the same label independently
        let parse = self.parser.parse(&identity.label);
        let enrichment = self.enricher.enrich(&identity.label);
        let form = match &parse {
            ParseOutcome::Parsed(attributes) => AttributeFormState::from_parsed(attributes),
            ParseOutcome::Unparseable { .. } => AttributeFormState::default(),
        };

        let outcome = IdentificationOutcome {
            generation,
            identity: identity.clone(),
            parse: parse.clone(),
            enrichment: enrichment.clone(),
        };

        self.commit(generation, |state| {
            state.identity = Some(identity);
            state.parse = Some(parse);
            state.enrichment = enrichment;
            state.form = Some(form);
            state.stage = PipelineStage::Parsed;
        })
        .await?;

        info!(
            session_id = %self.session_id,
            generation,
            identity = %outcome.identity.label,
            parsed = outcome.parse.is_parsed(),
            enriched = outcome.enrichment.is_some(),
            "Vehicle identified"
        );
        self.emit(PipelineEvent::VehicleIdentified {
            generation,
            identity: outcome.identity.label.clone(),
            parsed: outcome.parse.is_parsed(),
            enriched: outcome.enrichment.is_some(),
        })
        .await;
        self.emit_stage(generation, PipelineStage::Parsed).await;

        Ok(outcome)
    }

    /// Accept an image and identify it
    pub async fn process(&self, image: UploadedImage) -> Result<IdentificationOutcome, PipelineError> {
        self.set_image(image).await;
        self.identify().await
    }

    /// Update one form field (user edit)
    pub async fn set_field(
        &self,
        field: FormField,
        value: impl Into<String>,
    ) -> Result<(), PipelineError> {
        let mut state = self.state.lock().await;
        let stage = state.stage;
        match state.form.as_mut() {
            Some(form) => {
                form.set(field, value);
                Ok(())
            }
            None => Err(PipelineError::NotReady(stage)),
        }
    }

    /// Validate the form and request a price estimate
    ///
    /// Validation failures are reported without any network call and
    /// leave the stage unchanged.
    pub async fn submit(&self) -> Result<PriceQuote, PipelineError> {
        let (generation, snapshot) = {
            let mut state = self.state.lock().await;
            match state.stage {
                PipelineStage::Parsed
                | PipelineStage::Quoted
                | PipelineStage::Failed(RemoteStage::Valuation) => {}
                other => return Err(PipelineError::NotReady(other)),
            }

            let form = state
                .form
                .clone()
                .ok_or(PipelineError::NotReady(state.stage))?;
            let snapshot = match form.submit() {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    let err = PipelineError::from(err);
                    debug!(generation = state.generation, error = %err, "Form rejected locally");
                    state.last_error = Some(err.user_message());
                    return Err(err);
                }
            };

            state.stage = PipelineStage::Estimating;
            state.quote = None;
            state.last_error = None;
            (state.generation, snapshot)
        };
        self.emit_stage(generation, PipelineStage::Estimating).await;

        let estimated = self.valuation.estimate(&snapshot).await;
        let quote = self
            .settle(generation, estimated, RemoteStage::Valuation)
            .await?;

        let stored = quote.clone();
        self.commit(generation, |state| {
            state.quote = Some(stored);
            state.stage = PipelineStage::Quoted;
        })
        .await?;

        self.emit(PipelineEvent::QuoteReady {
            generation,
            price: quote.price,
            comment: quote.comment.text().to_string(),
        })
        .await;
        self.emit_stage(generation, PipelineStage::Quoted).await;

        Ok(quote)
    }

    /// Apply a remote result if `generation` is still current
    ///
    /// Failures move the session to `Failed(stage)`.
    async fn settle<T>(
        &self,
        generation: u64,
        result: Result<T, PipelineError>,
        stage: RemoteStage,
    ) -> Result<T, PipelineError> {
        let failure = {
            let mut state = self.state.lock().await;
            if state.generation != generation {
                let current = state.generation;
                drop(state);
                return Err(self.discard_stale(generation, current).await);
            }

            match result {
                Ok(value) => return Ok(value),
                Err(err) => {
                    state.stage = PipelineStage::Failed(stage);
                    state.last_error = Some(err.user_message());
                    err
                }
            }
        };

        error!(
            session_id = %self.session_id,
            generation,
            stage = %stage,
            error = %failure,
            "Pipeline stage failed"
        );
        self.emit(PipelineEvent::Failed {
            generation,
            stage,
            message: failure.user_message(),
        })
        .await;

        Err(failure)
    }

    /// Move to `stage` if `generation` is still current
    async fn advance(&self, generation: u64, stage: PipelineStage) -> Result<(), PipelineError> {
        self.commit(generation, |state| state.stage = stage).await?;
        self.emit_stage(generation, stage).await;
        Ok(())
    }

    /// Mutate state if `generation` is still current
    async fn commit<F>(&self, generation: u64, apply: F) -> Result<(), PipelineError>
    where
        F: FnOnce(&mut SessionState),
    {
        let current = {
            let mut state = self.state.lock().await;
            if state.generation == generation {
                apply(&mut *state);
                return Ok(());
            }
            state.generation
        };
        Err(self.discard_stale(generation, current).await)
    }

    async fn discard_stale(&self, generation: u64, current: u64) -> PipelineError {
        warn!(
            session_id = %self.session_id,
            generation,
            current,
            "Discarding response for superseded image"
        );
        self.emit(PipelineEvent::StaleResponseDiscarded {
            generation,
            current,
        })
        .await;
        PipelineError::Superseded {
            generation,
            current,
        }
    }

    async fn emit_stage(&self, generation: u64, stage: PipelineStage) {
        debug!(session_id = %self.session_id, generation, stage = %stage, "Stage changed");
        self.emit(PipelineEvent::StageChanged { generation, stage })
            .await;
    }

    async fn emit(&self, event: PipelineEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event).await;
        }
    }
}
