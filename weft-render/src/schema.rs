//! Schemas: declarative blueprints describing which slots of a type are
//! presented, and how. Schemas compose by extension (copy + amend) or
//! refinement (frozen copy under a new type).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{RenderError, RenderResult};
use crate::validators::SlotValidator;
use crate::value::ValueKind;

/// Per-slot configuration inside a schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaSlotDescription {
    pub name: String,
    /// Declared slot kind; inferred from the object's property value when
    /// absent.
    pub kind: Option<ValueKind>,
    pub layout: Option<String>,
    /// Label message key; defaults to the slot name when absent.
    pub key: Option<String>,
    pub bundle: Option<String>,
    /// Nested schema used when the slot presents a sub-object.
    pub schema: Option<String>,
    pub converter: Option<String>,
    pub validators: Vec<SlotValidator>,
    pub default_value: Option<String>,
    pub read_only: bool,
    pub hidden: bool,
    /// Write the property on commit even when the value did not change.
    pub always_set: bool,
    /// Set when the slot is consumed by a constructor or special setter.
    pub setter_ignored: bool,
    pub properties: HashMap<String, String>,
}

impl SchemaSlotDescription {
    pub fn new(name: &str) -> Self {
        SchemaSlotDescription {
            name: name.to_string(),
            kind: None,
            layout: None,
            key: None,
            bundle: None,
            schema: None,
            converter: None,
            validators: Vec::new(),
            default_value: None,
            read_only: false,
            hidden: false,
            always_set: false,
            setter_ignored: false,
            properties: HashMap::new(),
        }
    }
}

/// One parameter of a constructor or setter signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureParameter {
    pub slot: String,
    pub type_name: Option<String>,
}

/// A constructor or setter invocation pattern over named slots, in declared
/// parameter order. Written as `name(slot[:type], ...)`; a missing name
/// denotes the type's constructor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    pub name: Option<String>,
    pub parameters: Vec<SignatureParameter>,
}

impl Signature {
    /// Parse a signature string. Slot existence is checked by the caller
    /// against the owning schema.
    pub fn parse(raw: &str) -> RenderResult<Signature> {
        let (name, parameters) = match raw.find('(') {
            Some(open) => {
                let close = raw[open..].find(')').map(|i| open + i).ok_or_else(|| {
                    RenderError::MalformedSignature {
                        signature: raw.to_string(),
                        reason: "missing ')'".to_string(),
                    }
                })?;
                let name = raw[..open].trim();
                (
                    if name.is_empty() {
                        None
                    } else {
                        Some(name.to_string())
                    },
                    raw[open + 1..close].trim().to_string(),
                )
            }
            None => (None, raw.trim().to_string()),
        };

        let mut signature = Signature {
            name,
            parameters: Vec::new(),
        };
        if parameters.is_empty() {
            return Ok(signature);
        }

        for parameter in parameters.split(',') {
            let parameter = parameter.trim();
            if parameter.is_empty() {
                return Err(RenderError::MalformedSignature {
                    signature: raw.to_string(),
                    reason: "empty parameter".to_string(),
                });
            }
            let (slot, type_name) = match parameter.split_once(':') {
                Some((slot, type_name)) => (slot.trim(), Some(type_name.trim().to_string())),
                None => (parameter, None),
            };
            signature.parameters.push(SignatureParameter {
                slot: slot.to_string(),
                type_name,
            });
        }
        Ok(signature)
    }
}

/// A named slot-description list bound to a declared type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    name: String,
    type_name: String,
    bundle: Option<String>,
    slots: Vec<SchemaSlotDescription>,
    constructor: Option<Signature>,
    special_setters: Vec<Signature>,
}

impl Schema {
    pub fn new(name: &str, type_name: &str) -> Self {
        Schema {
            name: name.to_string(),
            type_name: type_name.to_string(),
            bundle: None,
            slots: Vec::new(),
            constructor: None,
            special_setters: Vec::new(),
        }
    }

    /// Extension: the new schema starts as a deep copy of the base's slot
    /// descriptions; removes and overrides are applied by the caller.
    pub fn extending(name: &str, type_name: &str, base: &Schema) -> Self {
        Schema {
            name: name.to_string(),
            type_name: type_name.to_string(),
            bundle: base.bundle.clone(),
            slots: base.slots.clone(),
            constructor: base.constructor.clone(),
            special_setters: base.special_setters.clone(),
        }
    }

    /// Refinement: a frozen copy of the base re-declared under a new name
    /// and type. The base keeps its identity; later reloads never mutate
    /// schemas handed out earlier.
    pub fn refining(name: &str, type_name: &str, base: &Schema) -> Self {
        Schema::extending(name, type_name, base)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn bundle(&self) -> Option<&str> {
        self.bundle.as_deref()
    }

    pub fn set_bundle(&mut self, bundle: Option<String>) {
        self.bundle = bundle;
    }

    pub fn slots(&self) -> &[SchemaSlotDescription] {
        &self.slots
    }

    pub fn slot_description(&self, name: &str) -> Option<&SchemaSlotDescription> {
        self.slots.iter().find(|slot| slot.name == name)
    }

    pub fn slot_description_mut(&mut self, name: &str) -> Option<&mut SchemaSlotDescription> {
        self.slots.iter_mut().find(|slot| slot.name == name)
    }

    /// Add a slot description, replacing an inherited one of the same name
    /// in place (keeping its position).
    pub fn add_slot_description(&mut self, description: SchemaSlotDescription) {
        match self.slots.iter_mut().find(|slot| slot.name == description.name) {
            Some(existing) => *existing = description,
            None => self.slots.push(description),
        }
    }

    /// Remove a slot description by name. Returns false when no slot of
    /// that name exists.
    pub fn remove_slot_description(&mut self, name: &str) -> bool {
        let before = self.slots.len();
        self.slots.retain(|slot| slot.name != name);
        self.slots.len() != before
    }

    pub fn constructor(&self) -> Option<&Signature> {
        self.constructor.as_ref()
    }

    pub fn set_constructor(&mut self, constructor: Option<Signature>) {
        self.constructor = constructor;
    }

    pub fn special_setters(&self) -> &[Signature] {
        &self.special_setters
    }

    pub fn clear_special_setters(&mut self) {
        self.special_setters.clear();
    }

    pub fn add_special_setter(&mut self, signature: Signature) {
        self.special_setters.push(signature);
    }
}
