//! The RenderKit: process-wide registry of renderer bindings, schemas and
//! data providers. Built wholesale by the configuration reader; callers
//! hold it behind an `Arc` and swap the whole kit on reload, so readers
//! never observe a half-updated registry.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::context::RenderMode;
use crate::error::{RenderError, RenderResult};
use crate::renderers::{builtin_renderers, DataProvider, Renderer};
use crate::schema::Schema;
use crate::types::TypeRegistry;

/// One configured renderer registration: the renderer class name plus the
/// properties applied to each instance.
#[derive(Debug, Clone)]
pub struct RendererBinding {
    pub class: String,
    pub properties: Vec<(String, String)>,
}

/// The registry entry a lookup resolved to, with the hierarchy level and
/// layout that matched.
#[derive(Debug)]
pub struct ResolvedBinding<'a> {
    pub type_name: String,
    pub layout: Option<String>,
    pub binding: &'a RendererBinding,
}

type RendererConstructor = fn() -> Box<dyn Renderer>;

pub struct RenderKit {
    renderers: HashMap<RenderMode, HashMap<(String, Option<String>), RendererBinding>>,
    schemas: HashMap<String, Schema>,
    constructors: HashMap<String, RendererConstructor>,
    providers: HashMap<String, Arc<dyn DataProvider>>,
}

impl Default for RenderKit {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderKit {
    pub fn new() -> Self {
        let mut kit = RenderKit {
            renderers: HashMap::new(),
            schemas: HashMap::new(),
            constructors: HashMap::new(),
            providers: HashMap::new(),
        };
        for (name, constructor) in builtin_renderers() {
            kit.constructors.insert(name.to_string(), constructor);
        }
        kit
    }

    /// Register a renderer binding. A duplicate (mode, type, layout) entry
    /// is logged and replaces the earlier definition.
    pub fn register_renderer(
        &mut self,
        mode: RenderMode,
        type_name: &str,
        layout: Option<&str>,
        binding: RendererBinding,
    ) {
        let entries = self.renderers.entry(mode).or_default();
        let key = (type_name.to_string(), layout.map(str::to_string));
        if entries.contains_key(&key) {
            warn!(
                mode = mode.as_str(),
                type_name,
                layout = layout.unwrap_or("<default>"),
                "duplicated renderer definition"
            );
        }
        entries.insert(key, binding);
    }

    /// Register an additional renderer constructor under a class name.
    pub fn register_renderer_class(&mut self, name: &str, constructor: RendererConstructor) {
        self.constructors.insert(name.to_string(), constructor);
    }

    pub fn has_renderer_class(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// The exact registry entry for (mode, type, layout), without walking
    /// the hierarchy.
    pub fn exact_binding(
        &self,
        mode: RenderMode,
        type_name: &str,
        layout: Option<&str>,
    ) -> Option<&RendererBinding> {
        self.renderers
            .get(&mode)?
            .get(&(type_name.to_string(), layout.map(str::to_string)))
    }

    /// Walk the type's ancestor chain from most derived to least; at each
    /// level try the exact layout first, then the level's default binding.
    /// The first hit wins.
    pub fn resolve_binding(
        &self,
        mode: RenderMode,
        type_name: &str,
        layout: Option<&str>,
        types: &TypeRegistry,
    ) -> RenderResult<ResolvedBinding<'_>> {
        let entries = self.renderers.get(&mode);
        for ancestor in types.ancestors(type_name) {
            if let Some(entries) = entries {
                if layout.is_some() {
                    if let Some(binding) =
                        entries.get(&(ancestor.to_string(), layout.map(str::to_string)))
                    {
                        return Ok(ResolvedBinding {
                            type_name: ancestor.to_string(),
                            layout: layout.map(str::to_string),
                            binding,
                        });
                    }
                }
                if let Some(binding) = entries.get(&(ancestor.to_string(), None)) {
                    return Ok(ResolvedBinding {
                        type_name: ancestor.to_string(),
                        layout: None,
                        binding,
                    });
                }
            }
        }
        Err(RenderError::NoRenderer {
            mode: mode.as_str().to_string(),
            type_name: type_name.to_string(),
            layout: layout.map(str::to_string),
        })
    }

    /// Resolve and instantiate a renderer: the matched binding's class is
    /// constructed and its properties are applied by name. An unknown
    /// property is logged and skipped.
    pub fn find_renderer(
        &self,
        mode: RenderMode,
        type_name: &str,
        layout: Option<&str>,
        types: &TypeRegistry,
    ) -> RenderResult<Box<dyn Renderer>> {
        let resolved = self.resolve_binding(mode, type_name, layout, types)?;
        let constructor = self
            .constructors
            .get(&resolved.binding.class)
            .ok_or_else(|| RenderError::NoSuchRendererClass {
                name: resolved.binding.class.clone(),
            })?;
        let mut renderer = constructor();
        for (name, value) in &resolved.binding.properties {
            if !renderer.set_property(name, value) {
                warn!(
                    class = resolved.binding.class.as_str(),
                    property = name.as_str(),
                    "renderer has no such property"
                );
            }
        }
        Ok(renderer)
    }

    /// Register a schema. Returns false (and logs) when the name is taken;
    /// the first definition wins.
    pub fn register_schema(&mut self, schema: Schema) -> bool {
        if self.schemas.contains_key(schema.name()) {
            warn!(name = schema.name(), "schema was already defined");
            return false;
        }
        self.schemas.insert(schema.name().to_string(), schema);
        true
    }

    pub fn find_schema(&self, name: &str) -> RenderResult<&Schema> {
        self.schemas
            .get(name)
            .ok_or_else(|| RenderError::NoSuchSchema {
                name: name.to_string(),
            })
    }

    pub fn has_schema(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    pub fn register_provider(&mut self, name: &str, provider: Arc<dyn DataProvider>) {
        self.providers.insert(name.to_string(), provider);
    }

    pub fn provider(&self, name: &str) -> RenderResult<&Arc<dyn DataProvider>> {
        self.providers
            .get(name)
            .ok_or_else(|| RenderError::NoSuchProvider {
                name: name.to_string(),
            })
    }
}
