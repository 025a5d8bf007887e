//! Attribute form
//!
//! The live, user-editable record seeded from [`ParsedAttributes`] and
//! completed with listing context (colour, kilometers, location, list-by).
//! Field updates are independent, last write wins.
//!
//! Submission is gated locally: a form with missing required fields,
//! non-numeric Year/Kilometers/CC, or a Year outside
//! [`options::years`] is rejected with a [`ValidationError`] before
//! anything touches the network.

use crate::parser::ParsedAttributes;
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Editable form fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FormField {
    Make,
    Model,
    BodyType,
    Year,
    FuelType,
    Cc,
    TransmissionType,
    Color,
    Kilometers,
    Location,
    ListBy,
}

impl FormField {
    pub const ALL: [FormField; 11] = [
        FormField::Make,
        FormField::Model,
        FormField::BodyType,
        FormField::Year,
        FormField::FuelType,
        FormField::Cc,
        FormField::TransmissionType,
        FormField::Color,
        FormField::Kilometers,
        FormField::Location,
        FormField::ListBy,
    ];

    /// Fields that must be non-empty before submission
    pub const REQUIRED: [FormField; 6] = [
        FormField::Make,
        FormField::Model,
        FormField::Year,
        FormField::FuelType,
        FormField::TransmissionType,
        FormField::Kilometers,
    ];

    /// Wire name, as used by the valuation service
    pub fn name(&self) -> &'static str {
        match self {
            FormField::Make => "Make",
            FormField::Model => "Model",
            FormField::BodyType => "BodyType",
            FormField::Year => "Year",
            FormField::FuelType => "FuelType",
            FormField::Cc => "CC",
            FormField::TransmissionType => "TransmissionType",
            FormField::Color => "Color",
            FormField::Kilometers => "Kilometers",
            FormField::Location => "location",
            FormField::ListBy => "listBy",
        }
    }

    pub fn is_required(&self) -> bool {
        Self::REQUIRED.contains(self)
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Field name not known to the form
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown form field: {0}")]
pub struct UnknownFieldError(pub String);

impl FromStr for FormField {
    type Err = UnknownFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FormField::ALL
            .iter()
            .copied()
            .find(|field| field.name() == s)
            .ok_or_else(|| UnknownFieldError(s.to_string()))
    }
}

/// Form rejected before submission
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{}", describe(.missing, .invalid))]
pub struct ValidationError {
    /// Required fields left empty
    pub missing: Vec<FormField>,
    /// Fields present but not numeric, or Year outside the offered range
    pub invalid: Vec<FormField>,
}

impl ValidationError {
    fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.invalid.is_empty()
    }
}

fn describe(missing: &[FormField], invalid: &[FormField]) -> String {
    let mut parts = Vec::new();
    if !missing.is_empty() {
        parts.push(format!("Missing required fields: {}", join_fields(missing)));
    }
    if !invalid.is_empty() {
        parts.push(format!("Invalid value in: {}", join_fields(invalid)));
    }
    parts.join("; ")
}

fn join_fields(fields: &[FormField]) -> String {
    fields
        .iter()
        .map(FormField::name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// User-editable vehicle record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeFormState {
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
    #[serde(rename = "Color")]
    pub color: String,
    #[serde(rename = "Kilometers")]
    pub kilometers: String,
    #[serde(rename = "location")]
    pub location: String,
    #[serde(rename = "listBy")]
    pub list_by: String,
}

impl AttributeFormState {
    /// Seed a form from parsed attributes; listing context starts empty
    pub fn from_parsed(parsed: &ParsedAttributes) -> Self {
        Self {
            make: parsed.make.clone(),
            model: parsed.model.clone(),
            body_type: parsed.body_type.clone(),
            year: parsed.year.clone(),
            fuel_type: parsed.fuel_type.clone(),
            cc: parsed.cc.clone(),
            transmission_type: parsed.transmission_type.clone(),
            ..Default::default()
        }
    }

    pub fn get(&self, field: FormField) -> &str {
        match field {
            FormField::Make => &self.make,
            FormField::Model => &self.model,
            FormField::BodyType => &self.body_type,
            FormField::Year => &self.year,
            FormField::FuelType => &self.fuel_type,
            FormField::Cc => &self.cc,
            FormField::TransmissionType => &self.transmission_type,
            FormField::Color => &self.color,
            FormField::Kilometers => &self.kilometers,
            FormField::Location => &self.location,
            FormField::ListBy => &self.list_by,
        }
    }

    pub fn set(&mut self, field: FormField, value: impl Into<String>) {
        let slot = match field {
            FormField::Make => &mut self.make,
            FormField::Model => &mut self.model,
            FormField::BodyType => &mut self.body_type,
            FormField::Year => &mut self.year,
            FormField::FuelType => &mut self.fuel_type,
            FormField::Cc => &mut self.cc,
            FormField::TransmissionType => &mut self.transmission_type,
            FormField::Color => &mut self.color,
            FormField::Kilometers => &mut self.kilometers,
            FormField::Location => &mut self.location,
            FormField::ListBy => &mut self.list_by,
        };
        *slot = value.into();
    }

    /// Set a field by its wire name (`"Kilometers"`, `"listBy"`, ...)
    pub fn set_named(&mut self, name: &str, value: impl Into<String>) -> Result<(), UnknownFieldError> {
        let field = name.parse::<FormField>()?;
        self.set(field, value);
        Ok(())
    }

    /// Required fields that are empty or whitespace
    pub fn missing_fields(&self) -> Vec<FormField> {
        FormField::REQUIRED
            .iter()
            .copied()
            .filter(|field| self.get(*field).trim().is_empty())
            .collect()
    }

    /// Submission gate: the validated snapshot that will be priced
    pub fn submit(&self) -> Result<AttributeFormState, ValidationError> {
        self.to_request()?;
        Ok(self.clone())
    }

    /// Validate and convert into the valuation wire payload
    pub fn to_request(&self) -> Result<ValuationRequest, ValidationError> {
        self.to_request_in_year(Utc::now().year())
    }

    /// Validate against an explicit current year
    ///
    /// Year must fall within `options::years(current_year)`.
    pub fn to_request_in_year(
        &self,
        current_year: i32,
    ) -> Result<ValuationRequest, ValidationError> {
        let mut error = ValidationError {
            missing: self.missing_fields(),
            invalid: Vec::new(),
        };

        let year = parse_number::<i32>(&self.year, FormField::Year, &mut error);
        if let Some(year) = year {
            if !options::years(current_year).contains(&year) {
                error.invalid.push(FormField::Year);
            }
        }
        let kilometers = parse_number::<u64>(&self.kilometers, FormField::Kilometers, &mut error);
        let cc = parse_number::<u32>(&self.cc, FormField::Cc, &mut error);

        if !error.is_empty() {
            return Err(error);
        }

        Ok(ValuationRequest {
            make: self.make.trim().to_string(),
            model: self.model.trim().to_string(),
            body_type: self.body_type.trim().to_string(),
            color: self.color.trim().to_string(),
            kilometers: kilometers.unwrap_or_default(),
            year: year.unwrap_or_default(),
            fuel_type: self.fuel_type.trim().to_string(),
            transmission_type: self.transmission_type.trim().to_string(),
            cc,
            location: self.location.trim().to_string(),
            list_by: self.list_by.trim().to_string(),
        })
    }
}

/// Parse an optional numeric field; empty is `None`, garbage is recorded as invalid
fn parse_number<T: FromStr>(raw: &str, field: FormField, error: &mut ValidationError) -> Option<T> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            error.invalid.push(field);
            None
        }
    }
}

/// JSON body sent to the valuation service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuationRequest {
    #[serde(rename = "Make")]
    pub make: String,
    #[serde(rename = "Model")]
    pub model: String,
    #[serde(rename = "BodyType")]
    pub body_type: String,
    #[serde(rename = "Color")]
    pub color: String,
    #[serde(rename = "Kilometers")]
    pub kilometers: u64,
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "FuelType")]
    pub fuel_type: String,
    #[serde(rename = "TransmissionType")]
    pub transmission_type: String,
    #[serde(rename = "CC")]
    pub cc: Option<u32>,
    #[serde(rename = "location")]
    pub location: String,
    #[serde(rename = "listBy")]
    pub list_by: String,
}

/// Choice lists offered by front-ends for the form fields
pub mod options {
    pub const FUEL_TYPES: [&str; 5] = ["Benzine", "Diesel", "Electric", "Hybrid", "Natural Gas"];
    pub const CC_VALUES: [&str; 15] = [
        "1000", "1200", "1400", "1500", "1600", "1800", "2000", "2200", "2400", "2500", "3000",
        "3500", "4000", "4500", "5000",
    ];
    pub const COLORS: [&str; 13] = [
        "Red", "Blue", "Green", "Black", "White", "Silver", "Gray", "Yellow", "Orange", "Purple",
        "Brown", "Gold", "Pink",
    ];
    pub const LIST_BY: [&str; 2] = ["dealership", "individual"];
    pub const LOCATIONS: [&str; 5] = ["Cairo", "Alexandria", "Giza", "Luxor", "Aswan"];
    pub const TRANSMISSIONS: [&str; 2] = ["Automatic", "Manual"];

    /// First model year offered
    pub const FIRST_YEAR: i32 = 1999;

    /// Selectable model years, oldest first
    pub fn years(current_year: i32) -> std::ops::RangeInclusive<i32> {
        FIRST_YEAR..=current_year
    }
}
