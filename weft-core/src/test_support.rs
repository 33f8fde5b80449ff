//! Shared fixtures for the crate's tests.

use std::collections::HashMap;

use weft_render::{DomainObject, RenderError, RenderResult, Value};

/// Minimal domain object backed by a property map.
pub struct Record {
    type_name: String,
    properties: HashMap<String, Value>,
}

impl Record {
    pub fn new(type_name: &str, properties: &[(&str, Value)]) -> Self {
        Record {
            type_name: type_name.to_string(),
            properties: properties
                .iter()
                .map(|(name, value)| (name.to_string(), value.clone()))
                .collect(),
        }
    }
}

impl DomainObject for Record {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn property(&self, name: &str) -> Option<Value> {
        self.properties.get(name).cloned()
    }

    fn set_property(&mut self, name: &str, value: Value) -> RenderResult<()> {
        match self.properties.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(RenderError::NoSuchProperty {
                type_name: self.type_name.clone(),
                property: name.to_string(),
            }),
        }
    }
}
