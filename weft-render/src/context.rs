//! Explicit presentation context threaded through every rendering call.
//! Replaces ambient per-request globals: everything a renderer may touch
//! travels as a parameter.

use std::any::Any;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::bundles::MessageBundles;
use crate::kit::RenderKit;
use crate::types::TypeRegistry;

/// Whether components are generated for presentation or for editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RenderMode {
    Output,
    Input,
}

impl RenderMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderMode::Output => "output",
            RenderMode::Input => "input",
        }
    }

    pub fn parse(name: &str) -> Option<RenderMode> {
        match name {
            "output" => Some(RenderMode::Output),
            "input" => Some(RenderMode::Input),
            _ => None,
        }
    }
}

/// Keyed storage scoped to one view state. Renderers use it to persist
/// data between render and submit (e.g. enumerated option sets).
#[derive(Default)]
pub struct LocalAttributes {
    entries: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl LocalAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<T: Any + Send + Sync>(&mut self, key: &str, value: T) {
        self.entries.insert(key.to_string(), Box::new(value));
    }

    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<&T> {
        self.entries.get(key).and_then(|boxed| boxed.downcast_ref())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }
}

/// Everything a renderer needs for one rendering pass.
pub struct RenderContext<'a> {
    pub mode: RenderMode,
    pub kit: &'a RenderKit,
    pub types: &'a TypeRegistry,
    pub bundles: &'a MessageBundles,
    /// The owning view state's local attributes.
    pub attributes: &'a mut LocalAttributes,
}
