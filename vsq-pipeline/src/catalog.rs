//! Specification catalog and enrichment
//!
//! The catalog is a read-only collection of [`SpecRecord`]s keyed by title
//! (e.g. "BMW X3 SUV 2012"). It is the single source of truth for two
//! lookups over the same key:
//!
//! - **Enrichment**: case-insensitive exact title match, returns the
//!   descriptive record (key specs, colours, full specifications).
//! - **Mechanical defaults**: case-sensitive exact title match, returns the
//!   fuel type / engine CC / transmission used to seed the attribute form.
//!
//! Neither lookup tokenizes, trims, or ranks. A miss is a normal outcome.
//!
//! The catalog is owned and injected (`Arc<SpecCatalog>`), so tests can
//! substitute their own records via [`SpecCatalog::from_records`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Catalog bundled with the crate
const BUNDLED_CATALOG: &str = include_str!("../data/car_specs.json");

/// Placeholder shown for absent spec fields
pub const NOT_AVAILABLE: &str = "N/A";

/// Catalog loading errors
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Default mechanical attributes for a known identity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MechanicalDefaults {
    #[serde(rename = "FuelType", default)]
    pub fuel_type: String,
    #[serde(rename = "CC", default)]
    pub cc: String,
    #[serde(rename = "TransmissionType", default)]
    pub transmission_type: String,
}

/// Overall length/height pair
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    #[serde(rename = "Length", default)]
    pub length: Option<String>,
    #[serde(rename = "Height", default)]
    pub height: Option<String>,
}

/// Headline specifications
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySpecs {
    #[serde(rename = "Body Style", default)]
    pub body_style: Option<String>,
    #[serde(rename = "Seating Capacity", default)]
    pub seating_capacity: Option<String>,
    #[serde(rename = "Engine", default)]
    pub engine: Option<String>,
    #[serde(rename = "MPG", default)]
    pub mpg: Option<String>,
    #[serde(rename = "Dimensions", default)]
    pub dimensions: Option<Dimensions>,
    #[serde(rename = "Drive Type", default)]
    pub drive_type: Option<String>,
}

/// Available exterior and interior colours
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorOptions {
    #[serde(rename = "Exterior", default)]
    pub exterior: Vec<String>,
    #[serde(rename = "Interior", default)]
    pub interior: Vec<String>,
}

/// One section of the full specifications
///
/// Most sections are key/value groups ("Engine" → {"Horsepower": ...}),
/// a few are a single line of text ("Warranty").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpecSection {
    Text(String),
    Group(BTreeMap<String, String>),
}

/// Catalog entry keyed by exact title
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecRecord {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Defaults", default, skip_serializing_if = "Option::is_none")]
    pub defaults: Option<MechanicalDefaults>,
    #[serde(rename = "Key Specs", default, skip_serializing_if = "Option::is_none")]
    pub key_specs: Option<KeySpecs>,
    #[serde(rename = "Color Options", default, skip_serializing_if = "Option::is_none")]
    pub color_options: Option<ColorOptions>,
    #[serde(rename = "Specifications", default, skip_serializing_if = "Option::is_none")]
    pub specifications: Option<BTreeMap<String, SpecSection>>,
}

impl SpecRecord {
    /// Key spec rows for display, `N/A` for absent fields
    pub fn key_spec_rows(&self) -> Vec<(&'static str, String)> {
        let specs = self.key_specs.clone().unwrap_or_default();
        let dimensions = specs.dimensions.map(|d| {
            format!(
                "Length: {}, Height: {}",
                d.length.as_deref().unwrap_or(NOT_AVAILABLE),
                d.height.as_deref().unwrap_or(NOT_AVAILABLE)
            )
        });

        vec![
            ("Body Style", or_na(specs.body_style)),
            ("Seating Capacity", or_na(specs.seating_capacity)),
            ("Engine", or_na(specs.engine)),
            ("MPG", or_na(specs.mpg)),
            ("Dimensions", or_na(dimensions)),
            ("Drive Type", or_na(specs.drive_type)),
        ]
    }

    /// Look up a single value in a specification group
    ///
    /// Returns `None` when the section is missing, is plain text, or lacks the key.
    pub fn spec_value(&self, section: &str, key: &str) -> Option<&str> {
        match self.specifications.as_ref()?.get(section)? {
            SpecSection::Group(values) => values.get(key).map(String::as_str),
            SpecSection::Text(_) => None,
        }
    }
}

fn or_na(value: Option<String>) -> String {
    value.unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Read-only specification catalog
#[derive(Debug, Clone, Default)]
pub struct SpecCatalog {
    records: Vec<SpecRecord>,
}

impl SpecCatalog {
    /// Catalog bundled with the crate
    pub fn bundled() -> Result<Self, CatalogError> {
        Self::from_json(BUNDLED_CATALOG)
    }

    /// Parse a catalog from its JSON array form
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let records: Vec<SpecRecord> = serde_json::from_str(json)?;
        debug!(records = records.len(), "Parsed specification catalog");
        Ok(Self { records })
    }

    /// Load a catalog from a JSON file
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let catalog = Self::from_json(&json)?;
        info!(
            path = %path.display(),
            records = catalog.len(),
            "Loaded specification catalog"
        );
        Ok(catalog)
    }

    pub fn from_records(records: Vec<SpecRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[SpecRecord] {
        &self.records
    }

    /// First record whose title equals `identity`, ignoring case
    pub fn find_by_title(&self, identity: &str) -> Option<&SpecRecord> {
        let wanted = identity.to_lowercase();
        self.records
            .iter()
            .find(|record| record.title.to_lowercase() == wanted)
    }

    /// Mechanical defaults for an exact (case-sensitive) title
    ///
    /// Unknown identities get empty defaults, to be filled in by the user.
    pub fn defaults_for(&self, identity: &str) -> MechanicalDefaults {
        self.records
            .iter()
            .find(|record| record.title == identity)
            .and_then(|record| record.defaults.clone())
            .unwrap_or_default()
    }
}

/// Looks up descriptive trim data for a recognized identity
#[derive(Debug, Clone)]
pub struct CatalogEnricher {
    catalog: Arc<SpecCatalog>,
}

impl CatalogEnricher {
    pub fn new(catalog: Arc<SpecCatalog>) -> Self {
        Self { catalog }
    }

    /// Enrich an identity; `None` is an empty enrichment, not an error
    pub fn enrich(&self, identity: &str) -> Option<SpecRecord> {
        let found = self.catalog.find_by_title(identity).cloned();
        debug!(
            identity = identity,
            matched = found.is_some(),
            "Catalog enrichment"
        );
        found
    }
}
