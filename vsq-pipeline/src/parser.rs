//! Identity parser
//!
//! Decomposes a classification label such as `"BMW X3 SUV 2012"` into
//! discrete attribute fields by token position, then seeds the mechanical
//! attributes from the catalog defaults for that exact label.
//!
//! Token rules (whitespace-delimited):
//! - exactly 4 tokens: Make, Model, BodyType, Year
//! - more than 4: Make = t0, Model = "t1 t2", BodyType = t3, Year = last
//! - fewer than 4: [`ParseOutcome::Unparseable`]

use crate::catalog::SpecCatalog;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Minimum token count for a positional parse
const MIN_TOKENS: usize = 4;

/// Structured fields derived from a vehicle identity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedAttributes {
    #[serde(rename = "Make")]
    pub make: String,
    #[serde(rename = "Model")]
    pub model: String,
    #[serde(rename = "BodyType")]
    pub body_type: String,
    #[serde(rename = "Year")]
    pub year: String,
    #[serde(rename = "FuelType")]
    pub fuel_type: String,
    #[serde(rename = "CC")]
    pub cc: String,
    #[serde(rename = "TransmissionType")]
    pub transmission_type: String,
}

/// Result of parsing an identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    Parsed(ParsedAttributes),
    /// Too few tokens to assign positions; the raw label is kept
    Unparseable { raw: String },
}

impl ParseOutcome {
    pub fn attributes(&self) -> Option<&ParsedAttributes> {
        match self {
            ParseOutcome::Parsed(attributes) => Some(attributes),
            ParseOutcome::Unparseable { .. } => None,
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, ParseOutcome::Parsed(_))
    }
}

/// Positional fields of an identity, before defaults are applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityFields {
    pub make: String,
    pub model: String,
    pub body_type: String,
    pub year: String,
}

/// Split an identity into positional fields
///
/// Returns `None` for fewer than four tokens.
pub fn split_identity(identity: &str) -> Option<IdentityFields> {
    let tokens: Vec<&str> = identity.split_whitespace().collect();

    match tokens.len() {
        n if n < MIN_TOKENS => None,
        MIN_TOKENS => Some(IdentityFields {
            make: tokens[0].to_string(),
            model: tokens[1].to_string(),
            body_type: tokens[2].to_string(),
            year: tokens[3].to_string(),
        }),
        // Two-word models ("Elantra Touring"); tokens between t3 and the year are dropped
        n => Some(IdentityFields {
            make: tokens[0].to_string(),
            model: tokens[1..3].join(" "),
            body_type: tokens[3].to_string(),
            year: tokens[n - 1].to_string(),
        }),
    }
}

/// Parses identities against an injected catalog
#[derive(Debug, Clone)]
pub struct IdentityParser {
    catalog: Arc<SpecCatalog>,
}

impl IdentityParser {
    pub fn new(catalog: Arc<SpecCatalog>) -> Self {
        Self { catalog }
    }

    /// Parse an identity into attributes
    ///
    /// Mechanical defaults come from the catalog by exact, case-sensitive
    /// title; unknown identities leave them empty.
    pub fn parse(&self, identity: &str) -> ParseOutcome {
        let Some(fields) = split_identity(identity) else {
            warn!(identity = identity, "Identity has too few tokens to parse");
            return ParseOutcome::Unparseable {
                raw: identity.to_string(),
            };
        };

        let defaults = self.catalog.defaults_for(identity);
        debug!(
            identity = identity,
            has_defaults = !defaults.fuel_type.is_empty(),
            "Parsed identity"
        );

        ParseOutcome::Parsed(ParsedAttributes {
            make: fields.make,
            model: fields.model,
            body_type: fields.body_type,
            year: fields.year,
            fuel_type: defaults.fuel_type,
            cc: defaults.cc,
            transmission_type: defaults.transmission_type,
        })
    }
}
