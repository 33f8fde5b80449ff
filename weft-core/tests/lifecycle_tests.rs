//! End-to-end postback scenarios: render a form, submit it, observe the
//! converted object graph, controller execution and destination
//! resolution.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use weft_core::{
    Action, ComponentLifeCycle, Controller, FrameworkContext, LifecycleError, LifecycleResult,
    ProcessOutcome, RenderCycle, Request, RequestProcessor, ViewDestination, INPUT_DESTINATION,
    SUCCESS_DESTINATION, VIEWSTATE_PARAM,
};
use weft_render::{
    ConfigurationReader, DataProvider, DomainObject, MenuOption, MessageBundles, MetaObject,
    MetaObjectFactory, MetaObjectKey, RenderError, RenderResult, TypeRegistry, Value,
};

const RENDERERS_XML: &str = r#"
    <renderers>
        <renderer type="person" class="standard-object" mode="input"/>
        <renderer type="person" class="standard-object"/>
        <renderer type="string" class="string-input" mode="input"/>
        <renderer type="string" class="value"/>
        <renderer type="int" class="string-input" mode="input"/>
        <renderer type="int" class="integer"/>
        <renderer type="bool" class="boolean-input" mode="input"/>
        <renderer type="bool" class="value"/>
        <renderer type="key" class="menu-option-list" mode="input">
            <property name="provider" value="colors"/>
            <property name="save-options" value="true"/>
        </renderer>
        <renderer type="key" class="value"/>
    </renderers>
"#;

const SCHEMAS_XML: &str = r#"
    <schemas>
        <schema name="person.edit" type="person">
            <slot name="name" validator="required"/>
            <slot name="active" kind="bool"/>
            <slot name="age" kind="int"/>
            <slot name="color" kind="key"/>
        </schema>
        <schema name="person.create" type="person" constructor="(name)">
            <slot name="name" validator="required"/>
            <slot name="active" kind="bool"/>
        </schema>
    </schemas>
"#;

struct Person;

struct PersonRecord {
    properties: HashMap<String, Value>,
}

impl PersonRecord {
    fn new() -> Self {
        let mut properties = HashMap::new();
        properties.insert("name".to_string(), Value::Text("Bob".to_string()));
        properties.insert("active".to_string(), Value::Bool(false));
        properties.insert("age".to_string(), Value::Int(30));
        properties.insert("color".to_string(), Value::Key("red".to_string()));
        PersonRecord { properties }
    }
}

impl DomainObject for PersonRecord {
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

impl Person {
    fn meta(env: &FrameworkContext) -> MetaObject {
        let kit = env.kit();
        let schema = kit.find_schema("person.edit").unwrap();
        MetaObjectFactory::create_object(
            MetaObjectKey::new("root"),
            Box::new(PersonRecord::new()),
            schema,
        )
        .unwrap()
    }
}

struct ColorProvider;

impl DataProvider for ColorProvider {
    fn provide(&self, _object: &dyn DomainObject, _current: &Value) -> Vec<MenuOption> {
        vec![
            MenuOption {
                key: "1".to_string(),
                label: "Red".to_string(),
                value: Value::Key("red".to_string()),
            },
            MenuOption {
                key: "2".to_string(),
                label: "Blue".to_string(),
                value: Value::Key("blue".to_string()),
            },
        ]
    }
}

struct CountingController {
    runs: Arc<AtomicUsize>,
}

impl Controller for CountingController {
    fn execute(&self, _meta: &mut MetaObject) -> LifecycleResult<()> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn environment() -> FrameworkContext {
    let mut types = TypeRegistry::new();
    types.declare("person", None);

    let mut reader = ConfigurationReader::new(&types);
    let mut kit = reader
        .read_all(Some(RENDERERS_XML), Some(SCHEMAS_XML))
        .unwrap();
    assert!(reader.problems().is_empty(), "{:?}", reader.problems());
    kit.register_provider("colors", Arc::new(ColorProvider));

    FrameworkContext::new(kit, types, MessageBundles::new())
}

fn render_form(env: &FrameworkContext, runs: &Arc<AtomicUsize>) -> (uuid::Uuid, String) {
    RenderCycle::new(Person::meta(env), "/person/save")
        .with_destination(SUCCESS_DESTINATION, ViewDestination::redirect("/person/list"))
        .with_destination(INPUT_DESTINATION, ViewDestination::forward("/person/edit"))
        .with_controller(Arc::new(CountingController {
            runs: Arc::clone(runs),
        }))
        .run(env)
        .unwrap()
}

#[test]
fn test_rendered_form_carries_view_state_identifier() {
    let env = environment();
    let runs = Arc::new(AtomicUsize::new(0));
    let (id, markup) = render_form(&env, &runs);

    assert!(markup.starts_with("<form action=\"/person/save\" method=\"post\">"));
    assert!(markup.contains(&format!(
        "<input type=\"hidden\" name=\"{}\" value=\"{}\"/>",
        VIEWSTATE_PARAM, id
    )));
    assert!(markup.contains("name=\"root:name\""));
    assert!(env.registry().contains(id));
}

#[test]
fn test_successful_submission_updates_graph_and_redirects() {
    let env = environment();
    let runs = Arc::new(AtomicUsize::new(0));
    let (id, _) = render_form(&env, &runs);

    let request = Request::post("/person/save")
        .with_parameter(VIEWSTATE_PARAM, &id.to_string())
        .with_parameter("root:name", "Alice")
        .with_parameter("root:active", "true")
        .with_parameter("root:age", "31")
        .with_parameter("root:color", "2");

    let destination = ComponentLifeCycle::execute(&request, &env)
        .unwrap()
        .expect("success destination is stored");
    assert_eq!(destination, ViewDestination::redirect("/person/list"));
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    // The redirect destination discarded the stored state.
    assert!(!env.registry().contains(id));
}

#[test]
fn test_invalid_field_collects_error_without_blocking_siblings() {
    let env = environment();
    let runs = Arc::new(AtomicUsize::new(0));
    let (id, _) = render_form(&env, &runs);

    let request = Request::post("/person/save")
        .with_parameter(VIEWSTATE_PARAM, &id.to_string())
        .with_parameter("root:name", "Alice")
        .with_parameter("root:age", "not-a-number")
        .with_parameter("root:color", "2");

    let destination = ComponentLifeCycle::execute(&request, &env)
        .unwrap()
        .expect("input destination is stored");
    assert_eq!(destination, ViewDestination::forward("/person/edit"));
    // Controllers never ran.
    assert_eq!(runs.load(Ordering::SeqCst), 0);

    // The state is kept for the re-render, annotated per-field.
    let state = env.registry().take(id).unwrap();
    let meta = state.meta().unwrap();
    assert_eq!(meta.slot("age").unwrap().errors().len(), 1);
    assert!(meta.slot("name").unwrap().errors().is_empty());
    assert!(meta.slot("color").unwrap().errors().is_empty());
    // Valid sibling values were still converted.
    assert_eq!(meta.slot("name").unwrap().value(), &Value::Text("Alice".into()));
    assert_eq!(meta.slot("color").unwrap().value(), &Value::Key("blue".into()));
}

#[test]
fn test_invalid_option_key_yields_conversion_error_for_that_slot() {
    let env = environment();
    let runs = Arc::new(AtomicUsize::new(0));
    let (id, _) = render_form(&env, &runs);

    let request = Request::post("/person/save")
        .with_parameter(VIEWSTATE_PARAM, &id.to_string())
        .with_parameter("root:name", "Alice")
        .with_parameter("root:age", "31")
        .with_parameter("root:color", "9");

    ComponentLifeCycle::execute(&request, &env).unwrap();

    let state = env.registry().take(id).unwrap();
    let meta = state.meta().unwrap();
    let errors = meta.slot("color").unwrap().errors();
    assert_eq!(errors, &["renderers.menu.invalid.option".to_string()]);
    assert_eq!(meta.slot("name").unwrap().value(), &Value::Text("Alice".into()));
}

#[test]
fn test_unknown_identifier_is_expired_error_not_a_crash() {
    let env = environment();
    let request = Request::post("/person/save")
        .with_parameter(VIEWSTATE_PARAM, "11111111-2222-3333-4444-555555555555");

    let failure = ComponentLifeCycle::execute(&request, &env).unwrap_err();
    assert!(matches!(
        failure.error,
        LifecycleError::ExpiredViewState { .. }
    ));
}

#[test]
fn test_failing_controller_routes_to_error_path() {
    struct FailingController;
    impl Controller for FailingController {
        fn execute(&self, _meta: &mut MetaObject) -> LifecycleResult<()> {
            Err(LifecycleError::controller("storage unavailable"))
        }
    }

    let env = environment();
    let (id, _) = RenderCycle::new(Person::meta(&env), "/person/save")
        .with_destination(INPUT_DESTINATION, ViewDestination::forward("/person/edit"))
        .with_controller(Arc::new(FailingController))
        .run(&env)
        .unwrap();

    let request = Request::post("/person/save")
        .with_parameter(VIEWSTATE_PARAM, &id.to_string())
        .with_parameter("root:name", "Alice")
        .with_parameter("root:color", "1");

    let failure = ComponentLifeCycle::execute(&request, &env).unwrap_err();
    assert!(matches!(failure.error, LifecycleError::Controller { .. }));
    assert_eq!(
        failure.input_destination,
        Some(ViewDestination::forward("/person/edit"))
    );
    // The state stays addressable for the error re-render.
    assert!(env.registry().contains(id));
}

#[test]
fn test_forward_destination_keeps_state_addressable() {
    let env = environment();
    let runs = Arc::new(AtomicUsize::new(0));
    let (id, _) = RenderCycle::new(Person::meta(&env), "/person/save")
        .with_destination(SUCCESS_DESTINATION, ViewDestination::forward("/person/show"))
        .with_controller(Arc::new(CountingController {
            runs: Arc::clone(&runs),
        }))
        .run(&env)
        .unwrap();

    let request = Request::post("/person/save")
        .with_parameter(VIEWSTATE_PARAM, &id.to_string())
        .with_parameter("root:name", "Alice")
        .with_parameter("root:color", "1");

    let destination = ComponentLifeCycle::execute(&request, &env).unwrap().unwrap();
    assert!(!destination.redirect);
    assert!(env.registry().contains(id));

    // A partial postback can address the same state again.
    let second = Request::post("/person/save")
        .with_parameter(VIEWSTATE_PARAM, &id.to_string())
        .with_parameter("root:name", "Alicia")
        .with_parameter("root:color", "1");
    ComponentLifeCycle::execute(&second, &env).unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

fn construct_person(args: &[Value]) -> RenderResult<Box<dyn DomainObject>> {
    let mut record = PersonRecord::new();
    if let Some(name) = args.first() {
        record.set_property("name", name.clone())?;
    }
    Ok(Box::new(record))
}

#[test]
fn test_creation_state_constructs_instance_from_signature() {
    let mut types = TypeRegistry::new();
    types.declare("person", None);
    types.declare_constructor("person", construct_person);

    let mut reader = ConfigurationReader::new(&types);
    let mut kit = reader
        .read_all(Some(RENDERERS_XML), Some(SCHEMAS_XML))
        .unwrap();
    kit.register_provider("colors", Arc::new(ColorProvider));
    let env = FrameworkContext::new(kit, types, MessageBundles::new());

    let kit = env.kit();
    let schema = kit.find_schema("person.create").unwrap();
    let meta = MetaObjectFactory::create_object(
        MetaObjectKey::new("root"),
        Box::new(PersonRecord::new()),
        schema,
    )
    .unwrap();

    let (id, _) = RenderCycle::new(meta, "/person/create")
        .with_destination(SUCCESS_DESTINATION, ViewDestination::forward("/person/show"))
        .creating()
        .run(&env)
        .unwrap();

    let request = Request::post("/person/create")
        .with_parameter(VIEWSTATE_PARAM, &id.to_string())
        .with_parameter("root:name", "Zoe")
        .with_parameter("root:active", "true");
    ComponentLifeCycle::execute(&request, &env).unwrap();

    let state = env.registry().take(id).unwrap();
    let object = state.meta().unwrap().object();
    assert_eq!(object.property("name"), Some(Value::Text("Zoe".into())));
    assert_eq!(object.property("active"), Some(Value::Bool(true)));
}

#[test]
fn test_processor_end_to_end_with_checksum_rewriting() {
    struct EditAction;
    impl Action for EditAction {
        fn perform(
            &self,
            _request: &mut Request,
            _env: &FrameworkContext,
        ) -> LifecycleResult<Option<ViewDestination>> {
            Ok(None)
        }
    }

    let env = Arc::new(environment());
    let processor = RequestProcessor::new(Arc::clone(&env));
    let runs = Arc::new(AtomicUsize::new(0));
    let (id, markup) = render_form(&env, &runs);

    // Outbound: the form got a checksum hidden field.
    let response = processor.finish_response(&Request::get("/person/edit"), &markup, Some("s3"));
    assert!(response.contains(weft_core::CHECKSUM_ATTRIBUTE_NAME));

    // Inbound: the postback resolves through the processor.
    let mut request = Request::post("/person/save")
        .with_parameter(VIEWSTATE_PARAM, &id.to_string())
        .with_parameter("root:name", "Alice")
        .with_parameter("root:active", "on")
        .with_parameter("root:age", "31")
        .with_parameter("root:color", "1");
    let outcome = processor.process(&mut request, &EditAction).unwrap();
    assert_eq!(
        outcome,
        ProcessOutcome::Redirect(ViewDestination::redirect("/person/list"))
    );
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}
