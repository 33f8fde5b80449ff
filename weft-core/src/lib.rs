//! # weft-core
//!
//! The stateful layer of the weft framework: view states and their
//! concurrent registry, the postback lifecycle that reconciles submitted
//! form values with the server-held object graph, the request processor
//! that intercepts postbacks before action dispatch, and the outbound
//! content-rewriting filters (checksum injection, HTML sanitization).
//!
//! A render cycle stores a [`viewstate::ViewState`] and delivers markup; a
//! later request carrying the state's identifier is recognized as a
//! postback, its field values are converted back into the bound meta
//! object graph, the bound controllers run, and the stored destination
//! decides where the request goes next.

pub mod controller;
pub mod error;
pub mod lifecycle;
pub mod processor;
pub mod registry;
pub mod request;
pub mod rewrite;
pub mod sanitize;
pub mod upload;
pub mod viewstate;

#[cfg(test)]
pub(crate) mod test_support;

// --- Core types ---
pub use controller::{Controller, RetryingController};
pub use error::{LifecycleError, LifecycleResult};
pub use lifecycle::{
    ComponentLifeCycle, LifecycleFailure, RenderCycle, PROCESSED_ATTRIBUTE, VIEWSTATE_LIST_PARAM,
    VIEWSTATE_PARAM,
};
pub use processor::{
    Action, ExceptionHandler, FrameworkContext, ProcessOutcome, RequestProcessor,
};
pub use registry::ViewStateRegistry;
pub use request::{Method, Request};
pub use rewrite::{
    calculate_checksum, ChecksumRewriter, CHECKSUM_ATTRIBUTE_NAME, NO_CHECKSUM_PREFIX,
};
pub use sanitize::sanitize_html;
pub use upload::{UploadMap, UploadedFile};
pub use viewstate::{
    LifecyclePhase, ViewDestination, ViewState, INPUT_DESTINATION, SUCCESS_DESTINATION,
};
