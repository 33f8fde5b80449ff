use std::collections::HashMap;

use weft_render::{
    render_object, ConfigurationReader, DomainObject, LocalAttributes, MessageBundles,
    MetaObjectFactory, MetaObjectKey, RenderContext, RenderError, RenderMode, RenderResult,
    TypeRegistry, Value,
};

const RENDERERS_XML: &str = r#"
    <renderers>
        <renderer type="person" class="standard-object" mode="input"/>
        <renderer type="person" class="standard-object"/>
        <renderer type="string" class="string-input" mode="input">
            <property name="max-length" value="60"/>
        </renderer>
        <renderer type="string" class="value"/>
        <renderer type="int" class="integer"/>
        <renderer type="int" class="string-input" mode="input"/>
        <renderer type="bool" class="boolean-input" mode="input"/>
        <renderer type="bool" class="value"/>
    </renderers>
"#;

const SCHEMAS_XML: &str = r#"
    <schemas>
        <schema name="person.edit" type="person" bundle="app">
            <slot name="name" key="label.person.name" validator="required"/>
            <slot name="age" kind="int">
                <validator class="int-range">
                    <property name="min" value="0"/>
                    <property name="max" value="150"/>
                </validator>
            </slot>
            <slot name="active" kind="bool"/>
        </schema>
        <schema name="person.view" type="person" extends="person.edit">
            <remove name="active"/>
        </schema>
    </schemas>
"#;

struct Person {
    properties: HashMap<String, Value>,
}

impl Person {
    fn new(name: &str, age: i64, active: bool) -> Self {
        let mut properties = HashMap::new();
        properties.insert("name".to_string(), Value::Text(name.to_string()));
        properties.insert("age".to_string(), Value::Int(age));
        properties.insert("active".to_string(), Value::Bool(active));
        Person { properties }
    }
}

impl DomainObject for Person {
    fn type_name(&self) -> &str {
        "person"
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
                type_name: "person".to_string(),
                property: name.to_string(),
            }),
        }
    }
}

fn load() -> (weft_render::RenderKit, TypeRegistry) {
    let mut types = TypeRegistry::new();
    types.declare("person", None);
    let mut reader = ConfigurationReader::new(&types);
    let kit = reader
        .read_all(Some(RENDERERS_XML), Some(SCHEMAS_XML))
        .expect("configuration should load");
    assert!(reader.problems().is_empty(), "{:?}", reader.problems());
    (kit, types)
}

#[test]
fn test_configured_input_form_renders_all_slots() {
    let (kit, types) = load();
    let schema = kit.find_schema("person.edit").unwrap();
    let meta = MetaObjectFactory::create_object(
        MetaObjectKey::new("root"),
        Box::new(Person::new("Ada", 36, true)),
        schema,
    )
    .unwrap();

    let bundles = MessageBundles::new();
    let mut attributes = LocalAttributes::new();
    let mut ctx = RenderContext {
        mode: RenderMode::Input,
        kit: &kit,
        types: &types,
        bundles: &bundles,
        attributes: &mut attributes,
    };
    let markup = render_object(&mut ctx, &meta, None)
        .unwrap()
        .render_to_string();

    assert!(markup.contains("name=\"root:name\""));
    assert!(markup.contains("value=\"Ada\""));
    assert!(markup.contains("maxlength=\"60\""));
    assert!(markup.contains("name=\"root:age\""));
    assert!(markup.contains("type=\"checkbox\""));
}

#[test]
fn test_extended_schema_drops_removed_slot() {
    let (kit, types) = load();
    let schema = kit.find_schema("person.view").unwrap();
    let meta = MetaObjectFactory::create_object(
        MetaObjectKey::new("root"),
        Box::new(Person::new("Ada", 36, true)),
        schema,
    )
    .unwrap();

    let bundles = MessageBundles::new();
    let mut attributes = LocalAttributes::new();
    let mut ctx = RenderContext {
        mode: RenderMode::Output,
        kit: &kit,
        types: &types,
        bundles: &bundles,
        attributes: &mut attributes,
    };
    let markup = render_object(&mut ctx, &meta, None)
        .unwrap()
        .render_to_string();

    assert!(markup.contains("Ada"));
    assert!(markup.contains("36"));
    assert!(!markup.contains("checkbox"));
}

#[test]
fn test_labels_resolve_through_bundles() {
    let (kit, types) = load();
    let schema = kit.find_schema("person.edit").unwrap();
    let meta = MetaObjectFactory::create_object(
        MetaObjectKey::new("root"),
        Box::new(Person::new("Ada", 36, true)),
        schema,
    )
    .unwrap();

    let mut bundles = MessageBundles::new();
    bundles.add_bundle("app", &[("label.person.name", "Full name")]);
    let mut attributes = LocalAttributes::new();
    let mut ctx = RenderContext {
        mode: RenderMode::Input,
        kit: &kit,
        types: &types,
        bundles: &bundles,
        attributes: &mut attributes,
    };
    let markup = render_object(&mut ctx, &meta, None)
        .unwrap()
        .render_to_string();

    assert!(markup.contains("<label>Full name</label>"));
    // The unmapped label key is presented as-is.
    assert!(markup.contains("<label>age</label>"));
}

#[test]
fn test_submitted_values_round_trip_through_components() {
    let (kit, types) = load();
    let schema = kit.find_schema("person.edit").unwrap();
    let meta = MetaObjectFactory::create_object(
        MetaObjectKey::new("root"),
        Box::new(Person::new("Ada", 36, true)),
        schema,
    )
    .unwrap();

    let bundles = MessageBundles::new();
    let mut attributes = LocalAttributes::new();
    let mut ctx = RenderContext {
        mode: RenderMode::Input,
        kit: &kit,
        types: &types,
        bundles: &bundles,
        attributes: &mut attributes,
    };
    let tree = render_object(&mut ctx, &meta, None).unwrap();

    let mut inputs = Vec::new();
    tree.walk_inputs(&mut |component| inputs.push(component.clone()));
    assert_eq!(inputs.len(), 3);

    for component in &inputs {
        let binding = component.binding().unwrap();
        let slot = meta
            .find_slot(&binding.target)
            .expect("every input is bound to a slot");
        let rendered = binding.converter.serialize(slot.value());
        let raws = if rendered.is_empty() {
            Vec::new()
        } else {
            vec![rendered]
        };
        let value = component.read_submitted(&raws).unwrap();
        assert_eq!(&value, slot.value(), "slot {}", binding.target.field_name());
    }
}
