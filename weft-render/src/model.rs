//! Meta model: the slot-based view of a domain object that rendering and
//! form write-back operate on. A MetaObject is created from an (object,
//! schema) pair at the start of a render cycle and lives as long as the
//! view state that owns it.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::converters::Converter;
use crate::error::{RenderError, RenderResult};
use crate::schema::{Schema, Signature};
use crate::types::TypeRegistry;
use crate::validators::SlotValidator;
use crate::value::{DomainObject, Value, ValueKind};

/// Distinguishes a meta object among its siblings; used as the object part
/// of HTML field names. Child objects append their slot name with a dot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetaObjectKey(String);

impl MetaObjectKey {
    pub fn new(key: &str) -> Self {
        MetaObjectKey(key.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn child(&self, slot_name: &str) -> MetaObjectKey {
        MetaObjectKey(format!("{}.{}", self.0, slot_name))
    }
}

impl fmt::Display for MetaObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Addresses one slot of one meta object. The rendered form field name is
/// `<object key>:<slot name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetaSlotKey {
    pub object: MetaObjectKey,
    pub slot: String,
}

impl MetaSlotKey {
    pub fn new(object: MetaObjectKey, slot: &str) -> Self {
        MetaSlotKey {
            object,
            slot: slot.to_string(),
        }
    }

    pub fn field_name(&self) -> String {
        format!("{}:{}", self.object, self.slot)
    }

    /// Inverse of `field_name`. The object key may itself contain dots but
    /// never a colon.
    pub fn parse_field(field: &str) -> Option<MetaSlotKey> {
        let (object, slot) = field.rsplit_once(':')?;
        if object.is_empty() || slot.is_empty() {
            return None;
        }
        Some(MetaSlotKey {
            object: MetaObjectKey::new(object),
            slot: slot.to_string(),
        })
    }
}

/// One named, typed, convertible property of a MetaObject.
#[derive(Debug, Clone)]
pub struct MetaSlot {
    key: MetaSlotKey,
    kind: ValueKind,
    value: Value,
    converter: Converter,
    pub validators: Vec<SlotValidator>,
    pub read_only: bool,
    pub hidden: bool,
    pub setter_ignored: bool,
    pub always_set: bool,
    pub layout: Option<String>,
    pub label_key: String,
    pub bundle: Option<String>,
    pub properties: HashMap<String, String>,
    errors: Vec<String>,
    dirty: bool,
}

impl MetaSlot {
    pub fn key(&self) -> &MetaSlotKey {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.key.slot
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn converter(&self) -> &Converter {
        &self.converter
    }

    /// Install the converter bound at render time (e.g. an option-set
    /// converter enumerated by a menu renderer).
    pub fn set_converter(&mut self, converter: Converter) {
        self.converter = converter;
    }

    /// Update the slot value; marks the slot dirty when the value changed.
    pub fn set_value(&mut self, value: Value) {
        if self.value != value {
            self.dirty = true;
        }
        self.value = value;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn add_error(&mut self, key: String) {
        self.errors.push(key);
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }
}

/// Slot-based view of one domain object; owns the object for the lifetime
/// of its view state. Child meta objects (sub-forms, editable rows) hang
/// off the same graph and share the commit walk.
pub struct MetaObject {
    key: MetaObjectKey,
    schema_name: String,
    object: Box<dyn DomainObject>,
    slots: Vec<MetaSlot>,
    special_setters: Vec<Signature>,
    children: Vec<MetaObject>,
}

impl MetaObject {
    pub fn key(&self) -> &MetaObjectKey {
        &self.key
    }

    pub fn schema_name(&self) -> &str {
        &self.schema_name
    }

    pub fn type_name(&self) -> &str {
        self.object.type_name()
    }

    pub fn object(&self) -> &dyn DomainObject {
        self.object.as_ref()
    }

    pub fn object_mut(&mut self) -> &mut dyn DomainObject {
        self.object.as_mut()
    }

    /// Replace the wrapped instance (used after constructing a fresh object
    /// from submitted values).
    pub fn replace_object(&mut self, object: Box<dyn DomainObject>) {
        self.object = object;
    }

    pub fn slots(&self) -> &[MetaSlot] {
        &self.slots
    }

    pub fn slots_mut(&mut self) -> &mut [MetaSlot] {
        &mut self.slots
    }

    pub fn slot(&self, name: &str) -> Option<&MetaSlot> {
        self.slots.iter().find(|slot| slot.name() == name)
    }

    pub fn slot_mut(&mut self, name: &str) -> Option<&mut MetaSlot> {
        self.slots.iter_mut().find(|slot| slot.name() == name)
    }

    pub fn add_child(&mut self, child: MetaObject) {
        self.children.push(child);
    }

    pub fn children(&self) -> &[MetaObject] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut [MetaObject] {
        &mut self.children
    }

    /// Locate a slot anywhere in this graph by its key.
    pub fn find_slot_mut(&mut self, key: &MetaSlotKey) -> Option<&mut MetaSlot> {
        if self.key == key.object {
            return self.slot_mut(&key.slot);
        }
        self.children
            .iter_mut()
            .find_map(|child| child.find_slot_mut(key))
    }

    pub fn find_slot(&self, key: &MetaSlotKey) -> Option<&MetaSlot> {
        if self.key == key.object {
            return self.slot(&key.slot);
        }
        self.children.iter().find_map(|child| child.find_slot(key))
    }

    /// True when any slot in the graph carries a conversion or validation
    /// error.
    pub fn has_errors(&self) -> bool {
        self.slots.iter().any(MetaSlot::has_errors)
            || self.children.iter().any(MetaObject::has_errors)
    }

    pub fn clear_errors(&mut self) {
        for slot in &mut self.slots {
            slot.clear_errors();
        }
        for child in &mut self.children {
            child.clear_errors();
        }
    }

    /// Write converted slot values back into the domain object graph:
    /// special setters first, then plain property writes for dirty (or
    /// always-set) slots that are not consumed by a setter signature.
    pub fn commit(&mut self) -> RenderResult<()> {
        for signature in self.special_setters.clone() {
            let Some(name) = signature.name.clone() else {
                continue;
            };
            let mut args = Vec::with_capacity(signature.parameters.len());
            for parameter in &signature.parameters {
                let slot = self.slot(&parameter.slot).ok_or_else(|| {
                    RenderError::NoSuchSlot {
                        object: self.key.to_string(),
                        slot: parameter.slot.clone(),
                    }
                })?;
                args.push(slot.value().clone());
            }
            self.object.call_setter(&name, &args)?;
        }

        for slot in &mut self.slots {
            if slot.setter_ignored || slot.read_only {
                continue;
            }
            if slot.dirty || slot.always_set {
                let value = slot.value.clone();
                self.object.set_property(&slot.key.slot, value)?;
                slot.dirty = false;
            }
        }

        for child in &mut self.children {
            child.commit()?;
        }
        Ok(())
    }
}

/// Builds meta objects from (object, schema) pairs, and fresh domain
/// objects from constructor signatures.
pub struct MetaObjectFactory;

impl MetaObjectFactory {
    /// Create a MetaObject whose slots mirror the schema's slot
    /// descriptions, evaluated against the object's properties by name.
    pub fn create_object(
        key: MetaObjectKey,
        object: Box<dyn DomainObject>,
        schema: &Schema,
    ) -> RenderResult<MetaObject> {
        let mut slots = Vec::with_capacity(schema.slots().len());

        for description in schema.slots() {
            let property = object.property(&description.name).ok_or_else(|| {
                RenderError::NoSuchProperty {
                    type_name: object.type_name().to_string(),
                    property: description.name.clone(),
                }
            })?;

            let kind = description
                .kind
                .or_else(|| property.kind())
                .unwrap_or(ValueKind::Text);

            let converter = description
                .converter
                .as_deref()
                .and_then(Converter::by_name)
                .unwrap_or_else(|| Converter::default_for(kind));

            let slot_key = MetaSlotKey::new(key.clone(), &description.name);
            let value = if property.is_null() {
                match &description.default_value {
                    Some(default) => converter.convert(&slot_key.field_name(), default)?,
                    None => Value::Null,
                }
            } else {
                property
            };

            slots.push(MetaSlot {
                key: slot_key,
                kind,
                value,
                converter,
                validators: description.validators.clone(),
                read_only: description.read_only,
                hidden: description.hidden,
                setter_ignored: description.setter_ignored,
                always_set: description.always_set,
                layout: description.layout.clone(),
                label_key: description
                    .key
                    .clone()
                    .unwrap_or_else(|| description.name.clone()),
                bundle: description
                    .bundle
                    .clone()
                    .or_else(|| schema.bundle().map(str::to_string)),
                properties: description.properties.clone(),
                errors: Vec::new(),
                dirty: false,
            });
        }

        Ok(MetaObject {
            key,
            schema_name: schema.name().to_string(),
            object,
            slots,
            special_setters: schema.special_setters().to_vec(),
            children: Vec::new(),
        })
    }

    /// Build a fresh domain object from the schema's constructor signature,
    /// pulling argument values out of the given slots in declared order.
    pub fn construct_instance(
        schema: &Schema,
        types: &TypeRegistry,
        meta: &MetaObject,
    ) -> RenderResult<Box<dyn DomainObject>> {
        let signature = schema
            .constructor()
            .ok_or_else(|| RenderError::NoConstructor {
                name: schema.type_name().to_string(),
            })?;

        let mut args = Vec::with_capacity(signature.parameters.len());
        for parameter in &signature.parameters {
            let slot = meta
                .slot(&parameter.slot)
                .ok_or_else(|| RenderError::NoSuchSlot {
                    object: meta.key().to_string(),
                    slot: parameter.slot.clone(),
                })?;
            args.push(slot.value().clone());
        }
        types.construct(schema.type_name(), &args)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::Record;
    use super::*;
    use crate::schema::SchemaSlotDescription;

    fn person_schema() -> Schema {
        let mut schema = Schema::new("person.edit", "person");
        schema.add_slot_description(SchemaSlotDescription::new("name"));
        let mut active = SchemaSlotDescription::new("active");
        active.kind = Some(ValueKind::Bool);
        schema.add_slot_description(active);
        schema
    }

    fn person() -> Box<dyn DomainObject> {
        Box::new(Record::new(
            "person",
            &[
                ("name", Value::Text("Ada".into())),
                ("active", Value::Bool(true)),
            ],
        ))
    }

    #[test]
    fn test_create_object_mirrors_schema_slots() {
        let meta = MetaObjectFactory::create_object(
            MetaObjectKey::new("root"),
            person(),
            &person_schema(),
        )
        .unwrap();

        assert_eq!(meta.slots().len(), 2);
        assert_eq!(meta.slot("name").unwrap().value(), &Value::Text("Ada".into()));
        assert_eq!(meta.slot("active").unwrap().kind(), ValueKind::Bool);
    }

    #[test]
    fn test_create_object_missing_property_fails() {
        let mut schema = person_schema();
        schema.add_slot_description(SchemaSlotDescription::new("salary"));
        let err = MetaObjectFactory::create_object(
            MetaObjectKey::new("root"),
            person(),
            &schema,
        )
        .err()
        .unwrap();
        assert!(matches!(err, RenderError::NoSuchProperty { .. }));
    }

    #[test]
    fn test_default_value_fills_null_property() {
        let mut schema = Schema::new("s", "person");
        let mut description = SchemaSlotDescription::new("name");
        description.default_value = Some("unnamed".to_string());
        schema.add_slot_description(description);

        let object = Box::new(Record::new("person", &[("name", Value::Null)]));
        let meta =
            MetaObjectFactory::create_object(MetaObjectKey::new("root"), object, &schema).unwrap();
        assert_eq!(meta.slot("name").unwrap().value(), &Value::Text("unnamed".into()));
    }

    #[test]
    fn test_commit_writes_dirty_slots_only() {
        let mut meta = MetaObjectFactory::create_object(
            MetaObjectKey::new("root"),
            person(),
            &person_schema(),
        )
        .unwrap();

        meta.slot_mut("name")
            .unwrap()
            .set_value(Value::Text("Grace".into()));
        meta.commit().unwrap();

        assert_eq!(
            meta.object().property("name"),
            Some(Value::Text("Grace".into()))
        );
        assert_eq!(meta.object().property("active"), Some(Value::Bool(true)));
    }

    #[test]
    fn test_field_name_round_trip() {
        let key = MetaSlotKey::new(MetaObjectKey::new("root.address"), "street");
        assert_eq!(key.field_name(), "root.address:street");
        assert_eq!(MetaSlotKey::parse_field("root.address:street"), Some(key));
        assert_eq!(MetaSlotKey::parse_field("noseparator"), None);
    }

    #[test]
    fn test_find_slot_searches_children() {
        let mut root = MetaObjectFactory::create_object(
            MetaObjectKey::new("root"),
            person(),
            &person_schema(),
        )
        .unwrap();
        let child = MetaObjectFactory::create_object(
            MetaObjectKey::new("root.friend"),
            person(),
            &person_schema(),
        )
        .unwrap();
        root.add_child(child);

        let key = MetaSlotKey::new(MetaObjectKey::new("root.friend"), "name");
        assert!(root.find_slot_mut(&key).is_some());
    }
}
