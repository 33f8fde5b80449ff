//! # weft-render
//!
//! The markup and model layer of the weft framework: reflects domain
//! objects into slot-based meta objects, resolves configurable
//! renderer/layout strategies per (mode, type, layout), and produces an
//! HTML component tree that can both serialize itself to markup and parse
//! submitted form values back into typed slots.
//!
//! ## Example: render an editing form
//! ```ignore
//! use weft_render::{
//!     ConfigurationReader, LocalAttributes, MessageBundles, MetaObjectFactory,
//!     MetaObjectKey, RenderContext, RenderMode, TypeRegistry,
//! };
//!
//! let mut types = TypeRegistry::new();
//! types.declare("person", None);
//!
//! let mut reader = ConfigurationReader::new(&types);
//! let kit = reader.read_all(Some(RENDERERS_XML), Some(SCHEMAS_XML))?;
//!
//! let schema = kit.find_schema("person.edit")?;
//! let meta = MetaObjectFactory::create_object(MetaObjectKey::new("root"), person, schema)?;
//!
//! let bundles = MessageBundles::new();
//! let mut attributes = LocalAttributes::new();
//! let mut ctx = RenderContext {
//!     mode: RenderMode::Input,
//!     kit: &kit,
//!     types: &types,
//!     bundles: &bundles,
//!     attributes: &mut attributes,
//! };
//! let markup = weft_render::render_object(&mut ctx, &meta, None)?.render_to_string();
//! ```

pub mod bundles;
pub mod components;
pub mod config;
pub mod context;
pub mod converters;
pub mod error;
pub mod kit;
pub mod model;
pub mod renderers;
pub mod schema;
pub mod types;
pub mod validators;
pub mod value;

// --- Core types ---
pub use bundles::MessageBundles;
pub use components::{HtmlComponent, InputBinding};
pub use config::ConfigurationReader;
pub use context::{LocalAttributes, RenderContext, RenderMode};
pub use converters::{Converter, MenuOption};
pub use error::{RenderError, RenderResult};
pub use kit::{RenderKit, RendererBinding};
pub use model::{MetaObject, MetaObjectFactory, MetaObjectKey, MetaSlot, MetaSlotKey};
pub use renderers::{render_object, render_slot, render_value, DataProvider, Layout, Renderer, RenderTarget};
pub use schema::{Schema, SchemaSlotDescription, Signature};
pub use types::TypeRegistry;
pub use validators::SlotValidator;
pub use value::{DomainObject, Value, ValueKind};
