//! The postback lifecycle: recognize a submission by its view-state
//! identifiers, convert submitted field values back into the bound object
//! graph, run the bound controllers and resolve the destination.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::error::LifecycleError;
use crate::processor::FrameworkContext;
use crate::request::Request;
use crate::viewstate::{LifecyclePhase, ViewDestination, ViewState};
use weft_render::{render_object, HtmlComponent, MetaObjectFactory, RenderContext, RenderMode};

/// Parameter carrying the primary view-state identifier.
pub const VIEWSTATE_PARAM: &str = "__viewstate";
/// Parameter carrying identifiers of nested/partial view states.
pub const VIEWSTATE_LIST_PARAM: &str = "__viewstate_list";
/// Request attribute marking the postback as already processed.
pub const PROCESSED_ATTRIBUTE: &str = "__viewstate_processed";

/// A failed lifecycle run, carrying what the error path needs to re-enter
/// rendering.
#[derive(Debug, Clone)]
pub struct LifecycleFailure {
    pub error: LifecycleError,
    /// The failing view state's stored input destination, when one exists.
    pub input_destination: Option<ViewDestination>,
    pub view_state: Option<Uuid>,
}

impl LifecycleFailure {
    fn bare(error: LifecycleError) -> Self {
        LifecycleFailure {
            error,
            input_destination: None,
            view_state: None,
        }
    }
}

pub struct ComponentLifeCycle;

impl ComponentLifeCycle {
    /// Run the lifecycle for every view state referenced by the request.
    /// `Ok(Some(..))` is the resolved destination, `Ok(None)` means the
    /// caller proceeds with normal action dispatch.
    pub fn execute(
        request: &Request,
        env: &FrameworkContext,
    ) -> Result<Option<ViewDestination>, LifecycleFailure> {
        let mut destination = None;
        for id in Self::view_state_ids(request) {
            if let Some(resolved) = Self::execute_one(&id, request, env)? {
                destination = Some(resolved);
            }
        }
        Ok(destination)
    }

    /// The identifiers present on the request: the single-valued primary
    /// parameter first, then the multi-valued list.
    pub fn view_state_ids(request: &Request) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        if let Some(id) = request.parameter(VIEWSTATE_PARAM) {
            ids.push(id.to_string());
        }
        if let Some(more) = request.parameter_values(VIEWSTATE_LIST_PARAM) {
            for id in more {
                if !ids.iter().any(|seen| seen == id) {
                    ids.push(id.clone());
                }
            }
        }
        ids
    }

    fn execute_one(
        raw_id: &str,
        request: &Request,
        env: &FrameworkContext,
    ) -> Result<Option<ViewDestination>, LifecycleFailure> {
        // A forged or truncated identifier is indistinguishable from an
        // evicted one: same non-fatal error either way.
        let id = Uuid::parse_str(raw_id).map_err(|_| {
            LifecycleFailure::bare(LifecycleError::ExpiredViewState {
                id: raw_id.to_string(),
            })
        })?;
        let mut state = env.registry().take(id).ok_or_else(|| {
            LifecycleFailure::bare(LifecycleError::ExpiredViewState {
                id: raw_id.to_string(),
            })
        })?;
        state.set_phase(LifecyclePhase::Submitted);
        debug!(%id, "postback resolved to stored view state");

        state.set_phase(LifecyclePhase::Converting);
        Self::convert(&mut state, request);

        if state.meta().map(|meta| meta.has_errors()).unwrap_or(false) {
            // Invalid submission: back to rendering against the input
            // destination, keeping the annotated state addressable.
            state.set_phase(LifecyclePhase::Rendering);
            let destination = state.input_destination().cloned();
            let state_id = state.id();
            env.registry().insert(state);
            debug!(%state_id, "conversion failed, re-rendering input destination");
            return Ok(destination);
        }

        if let Err(error) = Self::commit(&mut state, env) {
            let failure = LifecycleFailure {
                error,
                input_destination: state.input_destination().cloned(),
                view_state: Some(state.id()),
            };
            state.set_phase(LifecyclePhase::Error);
            env.registry().insert(state);
            return Err(failure);
        }

        state.set_phase(LifecyclePhase::Executing);
        for controller in state.controllers() {
            let result = match state.meta_mut() {
                Some(meta) => controller.execute(meta),
                None => Ok(()),
            };
            if let Err(error) = result {
                let failure = LifecycleFailure {
                    error,
                    input_destination: state.input_destination().cloned(),
                    view_state: Some(state.id()),
                };
                state.set_phase(LifecyclePhase::Error);
                env.registry().insert(state);
                return Err(failure);
            }
        }

        state.set_phase(LifecyclePhase::Forwarding);
        let destination = state.success_destination().cloned();
        match &destination {
            // A redirect ends the cycle: the stored state is discarded and
            // resubmission cannot replay it.
            Some(destination) if destination.redirect => {
                debug!(%id, "redirect destination, discarding view state");
            }
            // Forwards (and "render again") keep the state addressable for
            // partial postbacks until eviction reclaims it.
            _ => env.registry().insert(state),
        }
        Ok(destination)
    }

    /// Walk the stored component tree depth-first and convert every bound
    /// field independently; failures annotate the slot and never abort
    /// sibling conversions.
    fn convert(state: &mut ViewState, request: &Request) {
        let (tree, meta) = state.tree_and_meta_mut();
        let (Some(tree), Some(meta)) = (tree, meta) else {
            return;
        };
        meta.clear_errors();

        // A value group (radio/checkbox set) shares one field name across
        // several components; the first one converts for all of them.
        let mut seen = HashSet::new();
        tree.walk_inputs(&mut |component| {
            let Some(binding) = component.binding() else {
                return;
            };
            let field = binding.field_name();
            if !seen.insert(field.clone()) {
                return;
            }
            let Some(slot) = meta.find_slot_mut(&binding.target) else {
                return;
            };

            let mut raws: Vec<String> = request
                .parameter_values(&field)
                .map(|values| values.to_vec())
                .unwrap_or_default();
            if raws.is_empty() {
                if let Some(upload) = request.uploads().file(&field) {
                    raws.push(upload.file_name.clone());
                }
            }
            let first_raw = raws.first().map(String::as_str).unwrap_or("");

            let mut raw_errors = false;
            for validator in slot.validators.clone() {
                if let Err(key) = validator.validate_raw(first_raw) {
                    slot.add_error(key);
                    raw_errors = true;
                }
            }
            if raw_errors {
                return;
            }

            match component.read_submitted(&raws) {
                Ok(value) => {
                    let mut value_errors = false;
                    for validator in slot.validators.clone() {
                        if let Err(key) = validator.validate_value(&value) {
                            slot.add_error(key);
                            value_errors = true;
                        }
                    }
                    if !value_errors {
                        slot.set_value(value);
                    }
                }
                Err(error) => {
                    slot.add_error(
                        error
                            .message_key()
                            .unwrap_or("renderers.converter.invalid")
                            .to_string(),
                    );
                }
            }
        });
    }

    /// Write the converted graph back into the domain objects; creation
    /// states construct a fresh instance from the constructor signature
    /// first.
    fn commit(state: &mut ViewState, env: &FrameworkContext) -> Result<(), LifecycleError> {
        let creation = state.is_creation();
        let kit = env.kit();
        let Some(meta) = state.meta_mut() else {
            return Ok(());
        };
        if creation {
            let schema = kit.find_schema(meta.schema_name())?;
            let object = MetaObjectFactory::construct_instance(schema, env.types(), meta)?;
            meta.replace_object(object);
        }
        meta.commit()?;
        Ok(())
    }
}

/// Starts a render cycle: renders the meta object in input mode, wraps the
/// component tree in a form posting to `action_path` with the view-state
/// identifier as a hidden field, and stores the new view state.
pub struct RenderCycle {
    meta: weft_render::MetaObject,
    state: ViewState,
    action_path: String,
    layout: Option<String>,
}

impl RenderCycle {
    pub fn new(meta: weft_render::MetaObject, action_path: &str) -> Self {
        RenderCycle {
            meta,
            state: ViewState::new(),
            action_path: action_path.to_string(),
            layout: None,
        }
    }

    pub fn with_layout(mut self, layout: &str) -> Self {
        self.layout = Some(layout.to_string());
        self
    }

    pub fn with_destination(mut self, name: &str, destination: ViewDestination) -> Self {
        self.state.set_destination(name, destination);
        self
    }

    pub fn with_controller(mut self, controller: Arc<dyn crate::controller::Controller>) -> Self {
        self.state.bind_controller(controller);
        self
    }

    pub fn creating(mut self) -> Self {
        self.state.set_creation(true);
        self
    }

    /// Render and store. Returns the new identifier and the form markup.
    pub fn run(mut self, env: &FrameworkContext) -> Result<(Uuid, String), LifecycleError> {
        let kit = env.kit();
        let tree = {
            let mut ctx = RenderContext {
                mode: RenderMode::Input,
                kit: &kit,
                types: env.types(),
                bundles: env.bundles(),
                attributes: self.state.attributes_mut(),
            };
            render_object(&mut ctx, &self.meta, self.layout.as_deref())?
        };

        let mut form = weft_render::components::HtmlBlock::new("form")
            .with_attribute("action", &self.action_path)
            .with_attribute("method", "post");
        form.add_child(HtmlComponent::Hidden(
            weft_render::components::HtmlHiddenField::bookkeeping(
                VIEWSTATE_PARAM,
                &self.state.id().to_string(),
            ),
        ));
        form.add_child(tree);
        let form = HtmlComponent::Block(form);
        let markup = form.render_to_string();

        self.state.set_meta(self.meta);
        self.state.set_component_tree(form);
        self.state.set_phase(LifecyclePhase::AwaitingSubmit);
        let id = self.state.id();
        env.registry().insert(self.state);
        Ok((id, markup))
    }
}
