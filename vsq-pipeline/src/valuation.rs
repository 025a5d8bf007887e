//! Valuation client
//!
//! Validates the form locally, sends one request, and pairs the returned
//! price with an age-bucketed market comment. No retry, no caching.

use crate::api::VehicleApi;
use crate::error::{PipelineError, RemoteStage};
use crate::form::AttributeFormState;
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Oldest age (years) still considered high demand
const HIGH_DEMAND_MAX_AGE: i32 = 3;
/// Oldest age (years) where condition dominates the price
const CONDITION_MAX_AGE: i32 = 7;

/// Qualitative market comment attached to a quote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketComment {
    /// Up to 3 years old
    HighDemand,
    /// 4 to 7 years old
    ConditionMatters,
    /// Older than 7 years
    PriceBelowMarket,
}

impl MarketComment {
    /// Comment for a vehicle `age` years old (current year − model year)
    pub fn for_age(age: i32) -> Self {
        if age <= HIGH_DEMAND_MAX_AGE {
            MarketComment::HighDemand
        } else if age <= CONDITION_MAX_AGE {
            MarketComment::ConditionMatters
        } else {
            MarketComment::PriceBelowMarket
        }
    }

    pub fn text(&self) -> &'static str {
        match self {
            MarketComment::HighDemand => {
                "Recent vehicles like this one are in high demand; expect strong buyer interest."
            }
            MarketComment::ConditionMatters => {
                "At this age, condition and service history matter most for the final price."
            }
            MarketComment::PriceBelowMarket => {
                "Consider pricing slightly below market to attract buyers for an older vehicle."
            }
        }
    }
}

/// Price estimate plus the form snapshot that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub price: f64,
    pub comment: MarketComment,
    pub form: AttributeFormState,
    pub quoted_at: DateTime<Utc>,
}

/// Sends completed forms to the valuation service
#[derive(Clone)]
pub struct ValuationClient {
    api: Arc<dyn VehicleApi>,
}

impl ValuationClient {
    pub fn new(api: Arc<dyn VehicleApi>) -> Self {
        Self { api }
    }

    /// Estimate the price of a completed form
    pub async fn estimate(&self, form: &AttributeFormState) -> Result<PriceQuote, PipelineError> {
        self.estimate_in_year(form, Utc::now().year()).await
    }

    /// Estimate with an explicit current year for the market comment
    pub async fn estimate_in_year(
        &self,
        form: &AttributeFormState,
        current_year: i32,
    ) -> Result<PriceQuote, PipelineError> {
        let request = form.to_request_in_year(current_year)?;

        let response = self
            .api
            .predict_price(&request)
            .await
            .map_err(|e| PipelineError::network(RemoteStage::Valuation, e))?;

        let comment = MarketComment::for_age(current_year.saturating_sub(request.year));
        info!(
            make = %request.make,
            model = %request.model,
            year = request.year,
            price = response.predicted_price,
            comment = ?comment,
            "Price estimate received"
        );

        Ok(PriceQuote {
            price: response.predicted_price,
            comment,
            form: form.clone(),
            quoted_at: Utc::now(),
        })
    }
}
