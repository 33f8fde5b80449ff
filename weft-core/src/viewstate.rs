//! View states: the server-held snapshot of one rendered form (component
//! tree, bound meta object graph, local attributes and destinations),
//! addressed by identifier across a postback.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::controller::Controller;
use weft_render::{HtmlComponent, LocalAttributes, MetaObject};

/// Name of the destination taken after a successful execution phase.
pub const SUCCESS_DESTINATION: &str = "success";
/// Name of the destination used to re-render the form with errors.
pub const INPUT_DESTINATION: &str = "input";

/// A forward-or-redirect target. Redirect destinations discard the stored
/// view state once taken; forward destinations keep it addressable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewDestination {
    pub path: String,
    pub redirect: bool,
}

impl ViewDestination {
    pub fn forward(path: &str) -> Self {
        ViewDestination {
            path: path.to_string(),
            redirect: false,
        }
    }

    pub fn redirect(path: &str) -> Self {
        ViewDestination {
            path: path.to_string(),
            redirect: true,
        }
    }
}

/// Where a view state currently is in the postback protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    Rendering,
    AwaitingSubmit,
    Submitted,
    Converting,
    Executing,
    Forwarding,
    Error,
}

/// Server-held state for one rendered form.
pub struct ViewState {
    id: Uuid,
    phase: LifecyclePhase,
    component_tree: Option<HtmlComponent>,
    meta: Option<MetaObject>,
    attributes: LocalAttributes,
    destinations: HashMap<String, ViewDestination>,
    controllers: Vec<Arc<dyn Controller>>,
    /// Submitted values construct a fresh object instead of updating the
    /// wrapped one.
    creation: bool,
}

impl ViewState {
    pub fn new() -> Self {
        ViewState {
            id: Uuid::new_v4(),
            phase: LifecyclePhase::Rendering,
            component_tree: None,
            meta: None,
            attributes: LocalAttributes::new(),
            destinations: HashMap::new(),
            controllers: Vec::new(),
            creation: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    pub fn set_phase(&mut self, phase: LifecyclePhase) {
        self.phase = phase;
    }

    pub fn component_tree(&self) -> Option<&HtmlComponent> {
        self.component_tree.as_ref()
    }

    pub fn set_component_tree(&mut self, tree: HtmlComponent) {
        self.component_tree = Some(tree);
    }

    pub fn meta(&self) -> Option<&MetaObject> {
        self.meta.as_ref()
    }

    pub fn meta_mut(&mut self) -> Option<&mut MetaObject> {
        self.meta.as_mut()
    }

    pub fn set_meta(&mut self, meta: MetaObject) {
        self.meta = Some(meta);
    }

    /// Borrow the stored tree and the meta graph at the same time, the way
    /// the conversion walk needs them.
    pub fn tree_and_meta_mut(&mut self) -> (Option<&HtmlComponent>, Option<&mut MetaObject>) {
        (self.component_tree.as_ref(), self.meta.as_mut())
    }

    pub fn attributes(&self) -> &LocalAttributes {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut LocalAttributes {
        &mut self.attributes
    }

    pub fn set_destination(&mut self, name: &str, destination: ViewDestination) {
        self.destinations.insert(name.to_string(), destination);
    }

    pub fn destination(&self, name: &str) -> Option<&ViewDestination> {
        self.destinations.get(name)
    }

    pub fn success_destination(&self) -> Option<&ViewDestination> {
        self.destination(SUCCESS_DESTINATION)
    }

    pub fn input_destination(&self) -> Option<&ViewDestination> {
        self.destination(INPUT_DESTINATION)
    }

    pub fn bind_controller(&mut self, controller: Arc<dyn Controller>) {
        self.controllers.push(controller);
    }

    /// Bound controllers in binding order.
    pub fn controllers(&self) -> Vec<Arc<dyn Controller>> {
        self.controllers.clone()
    }

    pub fn set_creation(&mut self, creation: bool) {
        self.creation = creation;
    }

    pub fn is_creation(&self) -> bool {
        self.creation
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_view_states_have_distinct_ids() {
        assert_ne!(ViewState::new().id(), ViewState::new().id());
    }

    #[test]
    fn test_destinations_by_name() {
        let mut state = ViewState::new();
        state.set_destination(SUCCESS_DESTINATION, ViewDestination::redirect("/done"));
        state.set_destination(INPUT_DESTINATION, ViewDestination::forward("/form"));

        assert!(state.success_destination().unwrap().redirect);
        assert_eq!(state.input_destination().unwrap().path, "/form");
        assert!(state.destination("other").is_none());
    }

    #[test]
    fn test_local_attributes_live_with_the_state() {
        let mut state = ViewState::new();
        state.attributes_mut().set("options", vec![1u32, 2]);
        assert_eq!(
            state.attributes().get::<Vec<u32>>("options"),
            Some(&vec![1, 2])
        );
    }
}
