//! Slot validators configured per schema slot. Validators run during
//! conversion: raw checks before the converter, value checks after.

use std::collections::HashMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::value::Value;

/// A configured validator instance. Failures yield a localizable message
/// key recorded on the slot, in declaration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SlotValidator {
    /// Rejects empty submissions.
    Required,
    /// Matches the whole raw submission against a pattern.
    Regexp { pattern: String },
    /// Bounds an integer value after conversion.
    IntRange { min: Option<i64>, max: Option<i64> },
    /// Caps the raw submission length in characters.
    Length { max: usize },
}

impl SlotValidator {
    /// Build a validator from its configured class name and properties.
    /// Returns `None` for an unknown name or missing required property.
    pub fn by_name(name: &str, properties: &HashMap<String, String>) -> Option<SlotValidator> {
        match name {
            "required" => Some(SlotValidator::Required),
            "regexp" => properties
                .get("pattern")
                .map(|pattern| SlotValidator::Regexp {
                    pattern: pattern.clone(),
                }),
            "int-range" => {
                let min = properties.get("min").and_then(|v| v.parse().ok());
                let max = properties.get("max").and_then(|v| v.parse().ok());
                if min.is_none() && max.is_none() {
                    return None;
                }
                Some(SlotValidator::IntRange { min, max })
            }
            "length" => properties
                .get("max")
                .and_then(|v| v.parse().ok())
                .map(|max| SlotValidator::Length { max }),
            _ => None,
        }
    }

    /// Validate the raw submitted string, before conversion.
    pub fn validate_raw(&self, raw: &str) -> Result<(), String> {
        match self {
            SlotValidator::Required => {
                if raw.trim().is_empty() {
                    Err("renderers.validator.required".to_string())
                } else {
                    Ok(())
                }
            }
            SlotValidator::Regexp { pattern } => {
                if raw.is_empty() {
                    return Ok(());
                }
                match Regex::new(pattern) {
                    Ok(regex) if regex.is_match(raw) => Ok(()),
                    Ok(_) => Err("renderers.validator.regexp".to_string()),
                    // An unbuildable pattern is a configuration mistake; it
                    // must not reject user input.
                    Err(_) => Ok(()),
                }
            }
            SlotValidator::Length { max } => {
                if raw.chars().count() > *max {
                    Err("renderers.validator.length".to_string())
                } else {
                    Ok(())
                }
            }
            SlotValidator::IntRange { .. } => Ok(()),
        }
    }

    /// Validate the converted value.
    pub fn validate_value(&self, value: &Value) -> Result<(), String> {
        match self {
            SlotValidator::IntRange { min, max } => match value {
                Value::Int(i) => {
                    if min.map(|m| *i < m).unwrap_or(false) || max.map(|m| *i > m).unwrap_or(false)
                    {
                        Err("renderers.validator.range".to_string())
                    } else {
                        Ok(())
                    }
                }
                _ => Ok(()),
            },
            _ => Ok(()),
        }
    }
}
