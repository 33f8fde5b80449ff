//! The request-processing entry point. Postbacks are intercepted before
//! normal action dispatch: the lifecycle runs against the referenced view
//! states and either resolves a destination itself or falls through to the
//! application action. All collaborators travel in an explicit context;
//! there is no ambient per-request state to tear down.

use std::sync::{Arc, RwLock};

use crate::error::{LifecycleError, LifecycleResult};
use crate::lifecycle::{
    ComponentLifeCycle, PROCESSED_ATTRIBUTE, VIEWSTATE_LIST_PARAM, VIEWSTATE_PARAM,
};
use crate::registry::ViewStateRegistry;
use crate::request::Request;
use crate::rewrite::ChecksumRewriter;
use crate::viewstate::ViewDestination;
use weft_render::{MessageBundles, RenderKit, TypeRegistry};

/// Process-wide collaborators, constructed once and injected everywhere.
/// The render kit is swapped wholesale on configuration reload; readers
/// take a snapshot and never see a half-updated registry.
pub struct FrameworkContext {
    kit: RwLock<Arc<RenderKit>>,
    types: Arc<TypeRegistry>,
    bundles: Arc<MessageBundles>,
    registry: Arc<ViewStateRegistry>,
}

impl FrameworkContext {
    pub fn new(kit: RenderKit, types: TypeRegistry, bundles: MessageBundles) -> Self {
        FrameworkContext {
            kit: RwLock::new(Arc::new(kit)),
            types: Arc::new(types),
            bundles: Arc::new(bundles),
            registry: Arc::new(ViewStateRegistry::new()),
        }
    }

    /// Snapshot of the current render kit.
    pub fn kit(&self) -> Arc<RenderKit> {
        Arc::clone(
            &self
                .kit
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }

    /// Atomically replace the whole kit. In-flight requests keep the
    /// snapshot they already hold.
    pub fn reload_kit(&self, kit: RenderKit) {
        let mut guard = self
            .kit
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(kit);
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn bundles(&self) -> &MessageBundles {
        &self.bundles
    }

    pub fn registry(&self) -> &ViewStateRegistry {
        &self.registry
    }
}

/// Application action invoked when the lifecycle falls through. `None`
/// means "render again using the current view state".
pub trait Action {
    fn perform(
        &self,
        request: &mut Request,
        env: &FrameworkContext,
    ) -> LifecycleResult<Option<ViewDestination>>;

    /// Actions may take over the error path; the default leaves lifecycle
    /// failures to the generic request-error handling.
    fn exception_handler(&self) -> Option<&dyn ExceptionHandler> {
        None
    }
}

/// Decides the forward target after a lifecycle failure. Returning `None`
/// falls back to the generic error path.
pub trait ExceptionHandler {
    fn handle(
        &self,
        error: &LifecycleError,
        input: Option<&ViewDestination>,
    ) -> Option<ViewDestination>;
}

/// How a processed request leaves the framework.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    Forward(ViewDestination),
    Redirect(ViewDestination),
    /// The action completed and produced the response itself.
    Completed,
}

fn outcome_for(destination: ViewDestination) -> ProcessOutcome {
    if destination.redirect {
        ProcessOutcome::Redirect(destination)
    } else {
        ProcessOutcome::Forward(destination)
    }
}

pub struct RequestProcessor {
    env: Arc<FrameworkContext>,
}

impl RequestProcessor {
    pub fn new(env: Arc<FrameworkContext>) -> Self {
        RequestProcessor { env }
    }

    pub fn env(&self) -> &Arc<FrameworkContext> {
        &self.env
    }

    /// A request is a postback iff it carries view-state identifiers and
    /// has not been marked processed yet; each request is processed at most
    /// once.
    pub fn has_view_state(&self, request: &Request) -> bool {
        request.attribute(PROCESSED_ATTRIBUTE).is_none()
            && (request.parameter(VIEWSTATE_PARAM).is_some()
                || request.parameter_values(VIEWSTATE_LIST_PARAM).is_some())
    }

    fn set_view_state_processed(request: &mut Request) {
        request.set_attribute(PROCESSED_ATTRIBUTE, "true");
    }

    /// Process one request: lifecycle first when a view state is present,
    /// then the action unless the lifecycle already resolved a destination.
    pub fn process(
        &self,
        request: &mut Request,
        action: &dyn Action,
    ) -> LifecycleResult<ProcessOutcome> {
        if self.has_view_state(request) {
            Self::set_view_state_processed(request);

            match ComponentLifeCycle::execute(request, &self.env) {
                Ok(Some(destination)) => return Ok(outcome_for(destination)),
                Ok(None) => {}
                Err(failure) => {
                    if let Some(handler) = action.exception_handler() {
                        if let Some(destination) =
                            handler.handle(&failure.error, failure.input_destination.as_ref())
                        {
                            return Ok(outcome_for(destination));
                        }
                    }
                    return Err(failure.error);
                }
            }
        }

        match action.perform(request, &self.env)? {
            Some(destination) => Ok(outcome_for(destination)),
            None => Ok(ProcessOutcome::Completed),
        }
    }

    /// Run the outbound rewriting filters over a rendered response body.
    /// Responses of redirect requests are passed through untouched.
    pub fn finish_response(&self, request: &Request, markup: &str, secret: Option<&str>) -> String {
        if request.path.contains("redirect") {
            return markup.to_string();
        }
        ChecksumRewriter::new(secret).rewrite(markup)
    }
}
