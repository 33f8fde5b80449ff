//! XML configuration reader: builds a fresh RenderKit from the renderer
//! bindings document and the schemas document. A malformed or unresolved
//! declaration is logged and skipped; loading never aborts the whole file
//! on a single bad entry. Callers swap the returned kit in wholesale.

use std::collections::HashMap;

use roxmltree::{Document, Node};
use tracing::warn;

use crate::context::RenderMode;
use crate::converters::Converter;
use crate::error::RenderResult;
use crate::kit::{RenderKit, RendererBinding};
use crate::schema::{Schema, SchemaSlotDescription, Signature};
use crate::types::TypeRegistry;
use crate::validators::SlotValidator;
use crate::value::ValueKind;

pub struct ConfigurationReader<'a> {
    types: &'a TypeRegistry,
    problems: Vec<String>,
}

impl<'a> ConfigurationReader<'a> {
    pub fn new(types: &'a TypeRegistry) -> Self {
        ConfigurationReader {
            types,
            problems: Vec::new(),
        }
    }

    /// Declarations that were skipped, in document order. Empty after a
    /// clean load.
    pub fn problems(&self) -> &[String] {
        &self.problems
    }

    /// Read both documents into a fresh kit.
    pub fn read_all(
        &mut self,
        renderers_xml: Option<&str>,
        schemas_xml: Option<&str>,
    ) -> RenderResult<RenderKit> {
        let mut kit = RenderKit::new();
        if let Some(xml) = renderers_xml {
            self.read_renderers(&mut kit, xml)?;
        }
        if let Some(xml) = schemas_xml {
            self.read_schemas(&mut kit, xml)?;
        }
        Ok(kit)
    }

    fn problem(&mut self, message: String) {
        warn!("{}", message);
        self.problems.push(message);
    }

    /// Read renderer bindings: `<renderer type=".." layout=".." class=".."
    /// mode="..">` with nested `<property/>` children. Mode defaults to
    /// output.
    pub fn read_renderers(&mut self, kit: &mut RenderKit, xml: &str) -> RenderResult<()> {
        let document = Document::parse(xml)?;
        for element in element_children(document.root_element()) {
            if element.tag_name().name() != "renderer" {
                continue;
            }

            let Some(type_name) = element.attribute("type") else {
                self.problem("renderer is missing required attribute 'type'".to_string());
                continue;
            };
            let Some(class) = element.attribute("class") else {
                self.problem(format!(
                    "renderer for type '{}' is missing required attribute 'class'",
                    type_name
                ));
                continue;
            };
            let layout = element.attribute("layout");

            let mode_name = element.attribute("mode").unwrap_or("output");
            let Some(mode) = RenderMode::parse(mode_name) else {
                self.problem(format!(
                    "renderer for type '{}' declares unknown mode '{}'",
                    type_name, mode_name
                ));
                continue;
            };

            if !self.types.is_declared(type_name) {
                self.problem(format!(
                    "renderer was defined for the undeclared type '{}'",
                    type_name
                ));
                continue;
            }
            if !kit.has_renderer_class(class) {
                self.problem(format!(
                    "could not register renderer: unknown class '{}'",
                    class
                ));
                continue;
            }

            let properties = properties_of(element)
                .into_iter()
                .collect::<Vec<(String, String)>>();
            kit.register_renderer(
                mode,
                type_name,
                layout,
                RendererBinding {
                    class: class.to_string(),
                    properties,
                },
            );
        }
        Ok(())
    }

    /// Read schema declarations: `<schema name=".." type=".."
    /// extends/refines=".." bundle=".." constructor="..">` with nested
    /// `<remove/>`, `<slot/>` and `<setter/>` children.
    pub fn read_schemas(&mut self, kit: &mut RenderKit, xml: &str) -> RenderResult<()> {
        let document = Document::parse(xml)?;
        for element in element_children(document.root_element()) {
            if element.tag_name().name() != "schema" {
                continue;
            }
            self.read_schema(kit, element);
        }
        Ok(())
    }

    fn read_schema(&mut self, kit: &mut RenderKit, element: Node<'_, '_>) {
        let Some(name) = element.attribute("name") else {
            self.problem("schema is missing required attribute 'name'".to_string());
            return;
        };
        let Some(type_name) = element.attribute("type") else {
            self.problem(format!("schema '{}' is missing required attribute 'type'", name));
            return;
        };
        let extends = element.attribute("extends");
        let refines = element.attribute("refines");
        let bundle = element.attribute("bundle");

        if kit.has_schema(name) {
            self.problem(format!("schema '{}' was already defined", name));
            return;
        }
        if !self.types.is_declared(type_name) {
            self.problem(format!(
                "schema '{}' was defined for the undeclared type '{}'",
                name, type_name
            ));
            return;
        }
        if extends.is_some() && refines.is_some() {
            self.problem(format!(
                "schema '{}' cannot extend '{}' and refine '{}' at the same time",
                name,
                extends.unwrap_or_default(),
                refines.unwrap_or_default()
            ));
            return;
        }

        let base = match (extends, refines) {
            (Some(base_name), _) | (_, Some(base_name)) => {
                match kit.find_schema(base_name) {
                    Ok(base) => Some(base.clone()),
                    Err(_) => {
                        self.problem(format!(
                            "schema '{}' composes over '{}', schema not found",
                            name, base_name
                        ));
                        return;
                    }
                }
            }
            _ => None,
        };

        if extends.is_some() {
            if let Some(base) = base.as_ref() {
                if !self.types.ancestors(type_name).contains(&base.type_name()) {
                    warn!(
                        schema = name,
                        type_name,
                        base_type = base.type_name(),
                        "extending schema's type is not an ancestor of the declared type"
                    );
                }
            }
        }

        let mut schema = match (&base, refines) {
            (Some(base), Some(_)) => Schema::refining(name, type_name, base),
            (Some(base), None) => Schema::extending(name, type_name, base),
            (None, _) => Schema::new(name, type_name),
        };
        if bundle.is_some() {
            schema.set_bundle(bundle.map(str::to_string));
        }

        // Remove directives apply to inherited slots only.
        let removes: Vec<_> = element_children(element)
            .filter(|child| child.tag_name().name() == "remove")
            .collect();
        if base.is_none() && !removes.is_empty() {
            warn!(
                schema = name,
                "schema specifies slots to be removed but it does not extend or refine a schema"
            );
        } else {
            for remove in removes {
                let Some(slot_name) = remove.attribute("name") else {
                    continue;
                };
                if !schema.remove_slot_description(slot_name) {
                    warn!(
                        schema = name,
                        slot = slot_name,
                        "slot is to be removed but it is not defined in the base schema"
                    );
                }
            }
        }

        for slot_element in
            element_children(element).filter(|child| child.tag_name().name() == "slot")
        {
            if let Some(description) = self.read_slot(name, slot_element) {
                schema.add_slot_description(description);
            }
        }

        if let Some(constructor) = element.attribute("constructor") {
            match Signature::parse(constructor) {
                Ok(signature) => {
                    for parameter in &signature.parameters {
                        match schema.slot_description_mut(&parameter.slot) {
                            Some(description) => description.setter_ignored = true,
                            None => self.problem(format!(
                                "in schema '{}': malformed signature '{}', slot '{}' is not defined",
                                name, constructor, parameter.slot
                            )),
                        }
                    }
                    schema.set_constructor(Some(signature));
                }
                Err(err) => {
                    self.problem(format!("in schema '{}': {}", name, err));
                }
            }
        }

        let setter_elements: Vec<_> = element_children(element)
            .filter(|child| child.tag_name().name() == "setter")
            .collect();
        if !setter_elements.is_empty() {
            schema.clear_special_setters();
        }
        for setter_element in setter_elements {
            let Some(raw) = setter_element.attribute("signature") else {
                self.problem(format!(
                    "in schema '{}': setter is missing required attribute 'signature'",
                    name
                ));
                continue;
            };
            match Signature::parse(raw) {
                Ok(signature) => {
                    let mut resolvable = true;
                    for parameter in &signature.parameters {
                        if schema.slot_description(&parameter.slot).is_none() {
                            self.problem(format!(
                                "in schema '{}': malformed signature '{}', slot '{}' is not defined",
                                name, raw, parameter.slot
                            ));
                            resolvable = false;
                        }
                    }
                    if !resolvable {
                        continue;
                    }
                    for parameter in &signature.parameters {
                        if let Some(description) = schema.slot_description_mut(&parameter.slot) {
                            description.setter_ignored = true;
                        }
                    }
                    schema.add_special_setter(signature);
                }
                Err(err) => {
                    self.problem(format!("in schema '{}': {}", name, err));
                }
            }
        }

        kit.register_schema(schema);
    }

    /// Read one `<slot>` element. Returns `None` (and records the problem)
    /// when a referenced validator or converter does not exist.
    fn read_slot(&mut self, schema_name: &str, element: Node<'_, '_>) -> Option<SchemaSlotDescription> {
        let Some(slot_name) = element.attribute("name") else {
            self.problem(format!(
                "in schema '{}': slot is missing required attribute 'name'",
                schema_name
            ));
            return None;
        };

        let mut description = SchemaSlotDescription::new(slot_name);
        description.layout = element.attribute("layout").map(str::to_string);
        description.key = element.attribute("key").map(str::to_string);
        description.bundle = element.attribute("bundle").map(str::to_string);
        description.schema = element.attribute("schema").map(str::to_string);
        description.default_value = element.attribute("default").map(str::to_string);
        description.read_only = element.attribute("read-only") == Some("true");
        description.hidden = element.attribute("hidden") == Some("true");
        description.always_set = element.attribute("always-set") == Some("true");
        description.properties = properties_of(element);

        if let Some(kind_name) = element.attribute("kind") {
            match ValueKind::parse(kind_name) {
                Some(kind) => description.kind = Some(kind),
                None => {
                    self.problem(format!(
                        "in schema '{}': slot '{}' declares unknown kind '{}'",
                        schema_name, slot_name, kind_name
                    ));
                    return None;
                }
            }
        }

        if let Some(converter) = element.attribute("converter") {
            if Converter::by_name(converter).is_none() {
                self.problem(format!(
                    "in schema '{}': converter '{}' was not found",
                    schema_name, converter
                ));
                return None;
            }
            description.converter = Some(converter.to_string());
        }

        if let Some(validator_name) = element.attribute("validator") {
            match SlotValidator::by_name(validator_name, &HashMap::new()) {
                Some(validator) => description.validators.push(validator),
                None => {
                    self.problem(format!(
                        "in schema '{}': validator '{}' was not found",
                        schema_name, validator_name
                    ));
                    return None;
                }
            }
        }

        for validator_element in
            element_children(element).filter(|child| child.tag_name().name() == "validator")
        {
            let Some(class) = validator_element.attribute("class") else {
                self.problem(format!(
                    "in schema '{}': validator on slot '{}' is missing required attribute 'class'",
                    schema_name, slot_name
                ));
                return None;
            };
            let properties = properties_of(validator_element);
            match SlotValidator::by_name(class, &properties) {
                Some(validator) => description.validators.push(validator),
                None => {
                    self.problem(format!(
                        "in schema '{}': validator '{}' was not found",
                        schema_name, class
                    ));
                    return None;
                }
            }
        }

        Some(description)
    }
}

fn element_children<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|child| child.is_element())
}

/// Collect `<property name=".." value=".."/>` children; the element text is
/// used when the value attribute is absent.
fn properties_of(node: Node<'_, '_>) -> HashMap<String, String> {
    let mut properties = HashMap::new();
    for property in element_children(node).filter(|child| child.tag_name().name() == "property") {
        let Some(name) = property.attribute("name") else {
            continue;
        };
        let value = property
            .attribute("value")
            .map(str::to_string)
            .or_else(|| property.text().map(|text| text.trim().to_string()));
        if let Some(value) = value {
            properties.insert(name.to_string(), value);
        }
    }
    properties
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RenderMode;

    fn types() -> TypeRegistry {
        let mut types = TypeRegistry::new();
        types.declare("person", None);
        types.declare("employee", Some("person"));
        types
    }

    const RENDERERS: &str = r#"
        <renderers>
            <renderer type="person" class="standard-object" mode="input"/>
            <renderer type="string" class="string-input" mode="input">
                <property name="max-length" value="40"/>
            </renderer>
            <renderer type="string" class="value"/>
            <renderer type="ghost-type" class="value"/>
            <renderer type="person" class="no.such.Class"/>
        </renderers>
    "#;

    #[test]
    fn test_read_renderers_skips_bad_entries() {
        let types = types();
        let mut reader = ConfigurationReader::new(&types);
        let mut kit = RenderKit::new();
        reader.read_renderers(&mut kit, RENDERERS).unwrap();

        assert!(kit.exact_binding(RenderMode::Input, "person", None).is_some());
        assert!(kit.exact_binding(RenderMode::Output, "string", None).is_some());
        // The undeclared type and the unknown class were skipped.
        assert!(kit.exact_binding(RenderMode::Output, "ghost-type", None).is_none());
        assert_eq!(reader.problems().len(), 2);

        let binding = kit.exact_binding(RenderMode::Input, "string", None).unwrap();
        assert_eq!(binding.properties, vec![("max-length".to_string(), "40".to_string())]);
    }

    const SCHEMAS: &str = r#"
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
            <schema name="employee.edit" type="employee" extends="person.edit">
                <remove name="active"/>
                <remove name="salary"/>
                <slot name="number" kind="int"/>
            </schema>
            <schema name="person.edit" type="person"/>
            <schema name="orphan.edit" type="person" extends="no.such.schema"/>
        </schemas>
    "#;

    #[test]
    fn test_read_schemas_composes_extension() {
        let types = types();
        let mut reader = ConfigurationReader::new(&types);
        let mut kit = RenderKit::new();
        reader.read_schemas(&mut kit, SCHEMAS).unwrap();

        let base = kit.find_schema("person.edit").unwrap();
        assert_eq!(base.slots().len(), 3);
        assert_eq!(base.bundle(), Some("app"));

        let extended = kit.find_schema("employee.edit").unwrap();
        let names: Vec<_> = extended.slots().iter().map(|slot| slot.name.as_str()).collect();
        // "active" removed, "number" appended; removing the never-defined
        // "salary" was a logged no-op.
        assert_eq!(names, vec!["name", "age", "number"]);

        // Duplicate definition and unresolvable base were skipped.
        assert!(kit.find_schema("orphan.edit").is_err());
        assert!(reader
            .problems()
            .iter()
            .any(|problem| problem.contains("already defined")));
    }

    #[test]
    fn test_constructor_marks_parameters_setter_ignored() {
        let xml = r#"
            <schemas>
                <schema name="person.create" type="person" constructor="(name, age:int)">
                    <slot name="name"/>
                    <slot name="age" kind="int"/>
                    <slot name="active" kind="bool"/>
                </schema>
            </schemas>
        "#;
        let types = types();
        let mut reader = ConfigurationReader::new(&types);
        let mut kit = RenderKit::new();
        reader.read_schemas(&mut kit, xml).unwrap();

        let schema = kit.find_schema("person.create").unwrap();
        assert!(schema.constructor().is_some());
        assert!(schema.slot_description("name").unwrap().setter_ignored);
        assert!(schema.slot_description("age").unwrap().setter_ignored);
        assert!(!schema.slot_description("active").unwrap().setter_ignored);
    }

    #[test]
    fn test_unknown_validator_skips_slot_only() {
        let xml = r#"
            <schemas>
                <schema name="s" type="person">
                    <slot name="name" validator="nonesuch"/>
                    <slot name="age" kind="int"/>
                </schema>
            </schemas>
        "#;
        let types = types();
        let mut reader = ConfigurationReader::new(&types);
        let mut kit = RenderKit::new();
        reader.read_schemas(&mut kit, xml).unwrap();

        let schema = kit.find_schema("s").unwrap();
        assert_eq!(schema.slots().len(), 1);
        assert_eq!(schema.slots()[0].name, "age");
    }

    #[test]
    fn test_refinement_leaves_base_schema_untouched() {
        let xml = r#"
            <schemas>
                <schema name="person.view" type="person">
                    <slot name="name"/>
                </schema>
                <schema name="employee.view" type="employee" refines="person.view">
                    <slot name="number" kind="int"/>
                </schema>
            </schemas>
        "#;
        let types = types();
        let mut reader = ConfigurationReader::new(&types);
        let mut kit = RenderKit::new();
        reader.read_schemas(&mut kit, xml).unwrap();

        let base = kit.find_schema("person.view").unwrap();
        assert_eq!(base.slots().len(), 1);
        assert_eq!(base.type_name(), "person");

        let refined = kit.find_schema("employee.view").unwrap();
        assert_eq!(refined.type_name(), "employee");
        assert_eq!(refined.slots().len(), 2);
    }
}
