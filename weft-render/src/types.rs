//! Statically declared type table. Renderer resolution walks the ancestor
//! chain declared here; no runtime reflection is involved.

use std::collections::HashMap;

use crate::error::{RenderError, RenderResult};
use crate::value::{DomainObject, Value};

/// Root type every declared type eventually derives from.
pub const ROOT_TYPE: &str = "object";

/// Constructor hook: builds a domain object from positional argument values
/// in the order declared by the schema's constructor signature.
pub type Constructor = fn(&[Value]) -> RenderResult<Box<dyn DomainObject>>;

#[derive(Default)]
struct TypeInfo {
    parent: Option<String>,
    constructor: Option<Constructor>,
}

/// Declared type hierarchy: type name -> parent + optional constructor.
/// Built once at startup; the builtin value types are always present.
pub struct TypeRegistry {
    types: HashMap<String, TypeInfo>,
    /// Accept any type name as declared; used by standalone configuration
    /// checks that have no application type table at hand.
    permissive: bool,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        let mut registry = TypeRegistry {
            types: HashMap::new(),
            permissive: false,
        };
        registry.types.insert(ROOT_TYPE.to_string(), TypeInfo::default());
        for builtin in ["string", "int", "decimal", "bool", "key", "list"] {
            registry.declare(builtin, Some(ROOT_TYPE));
        }
        registry
    }

    /// Declare a type with an optional parent. Types without an explicit
    /// parent derive from the root type.
    pub fn declare(&mut self, name: &str, parent: Option<&str>) {
        let parent = parent.unwrap_or(ROOT_TYPE);
        self.types.insert(
            name.to_string(),
            TypeInfo {
                parent: if name == ROOT_TYPE {
                    None
                } else {
                    Some(parent.to_string())
                },
                constructor: None,
            },
        );
    }

    pub fn declare_constructor(&mut self, name: &str, constructor: Constructor) {
        self.types
            .entry(name.to_string())
            .or_insert_with(|| TypeInfo {
                parent: Some(ROOT_TYPE.to_string()),
                constructor: None,
            })
            .constructor = Some(constructor);
    }

    pub fn permissive() -> Self {
        let mut registry = Self::new();
        registry.permissive = true;
        registry
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.permissive || self.types.contains_key(name)
    }

    /// The ancestor chain from the type itself (most derived) up to the
    /// root. An undeclared type yields just itself followed by the root, so
    /// lookups can still fall back to root-level bindings.
    pub fn ancestors<'a>(&'a self, name: &'a str) -> Vec<&'a str> {
        let mut chain = vec![name];
        let mut current = name;
        // Visited guard: a miswired parent cycle must not hang resolution.
        while let Some(info) = self.types.get(current) {
            match info.parent.as_deref() {
                Some(parent) if !chain.contains(&parent) => {
                    chain.push(parent);
                    current = parent;
                }
                _ => break,
            }
        }
        if !self.types.contains_key(name) && !chain.contains(&ROOT_TYPE) {
            chain.push(ROOT_TYPE);
        }
        chain
    }

    /// Build a new instance of `name` from positional constructor arguments.
    pub fn construct(&self, name: &str, args: &[Value]) -> RenderResult<Box<dyn DomainObject>> {
        let info = self
            .types
            .get(name)
            .ok_or_else(|| RenderError::UnknownType {
                name: name.to_string(),
            })?;
        let constructor = info.constructor.ok_or_else(|| RenderError::NoConstructor {
            name: name.to_string(),
        })?;
        constructor(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_types_present() {
        let registry = TypeRegistry::new();
        assert!(registry.is_declared("string"));
        assert!(registry.is_declared(ROOT_TYPE));
    }

    #[test]
    fn test_ancestor_chain_most_derived_first() {
        let mut registry = TypeRegistry::new();
        registry.declare("person", None);
        registry.declare("employee", Some("person"));

        assert_eq!(registry.ancestors("employee"), vec!["employee", "person", "object"]);
    }

    #[test]
    fn test_ancestors_of_undeclared_type_fall_back_to_root() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.ancestors("ghost"), vec!["ghost", "object"]);
    }

    #[test]
    fn test_ancestors_survive_parent_cycle() {
        let mut registry = TypeRegistry::new();
        registry.declare("a", Some("b"));
        registry.declare("b", Some("a"));

        let chain = registry.ancestors("a");
        assert_eq!(chain, vec!["a", "b"]);
    }

    #[test]
    fn test_construct_without_constructor_fails() {
        let mut registry = TypeRegistry::new();
        registry.declare("person", None);
        let err = registry.construct("person", &[]).err().unwrap();
        assert!(matches!(err, RenderError::NoConstructor { .. }));
    }
}
