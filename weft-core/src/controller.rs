//! Controllers: application code bound to a view state and executed, in
//! binding order, after a submission converts cleanly.

use crate::error::{LifecycleError, LifecycleResult};
use weft_render::MetaObject;

/// Business mutation run against the converted object graph. The first
/// failing controller aborts the remainder of the execution phase.
pub trait Controller: Send + Sync {
    fn execute(&self, meta: &mut MetaObject) -> LifecycleResult<()>;
}

/// Wraps a controller with a bounded retry loop on `WriteConflict`; every
/// other outcome passes through untouched.
pub struct RetryingController<C> {
    inner: C,
    attempts: u32,
}

impl<C: Controller> RetryingController<C> {
    pub fn new(inner: C, attempts: u32) -> Self {
        RetryingController {
            inner,
            attempts: attempts.max(1),
        }
    }
}

impl<C: Controller> Controller for RetryingController<C> {
    fn execute(&self, meta: &mut MetaObject) -> LifecycleResult<()> {
        let mut tries = 0;
        loop {
            match self.inner.execute(meta) {
                Err(LifecycleError::WriteConflict) if tries + 1 < self.attempts => {
                    tries += 1;
                    tracing::debug!(tries, "retrying controller after write conflict");
                }
                other => return other,
            }
        }
    }
}
