//! Pipeline progress events
//!
//! Emitted on an optional channel so a front-end can follow the pipeline
//! without polling. Every event carries the image generation it belongs to.

use crate::error::RemoteStage;
use crate::session::PipelineStage;
use serde::{Deserialize, Serialize};

/// Pipeline events for UI consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PipelineEvent {
    /// New image accepted, all downstream state cleared
    ImageAccepted {
        generation: u64,
        file_name: String,
        size_bytes: usize,
    },

    /// Pipeline moved to a new stage
    StageChanged {
        generation: u64,
        stage: PipelineStage,
    },

    /// Classification finished and the form has been seeded
    VehicleIdentified {
        generation: u64,
        identity: String,
        /// False when the identity had too few tokens to parse
        parsed: bool,
        /// True when the catalog had a matching record
        enriched: bool,
    },

    /// Price estimate available
    QuoteReady {
        generation: u64,
        price: f64,
        comment: String,
    },

    /// A remote stage failed
    Failed {
        generation: u64,
        stage: RemoteStage,
        message: String,
    },

    /// A response for a replaced image arrived and was dropped
    StaleResponseDiscarded {
        generation: u64,
        current: u64,
    },
}
