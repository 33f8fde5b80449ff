//! Concurrent registry of live view states. Insert on render, take on
//! postback, evict oldest-first when the bound is hit or entries go stale.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use crate::viewstate::ViewState;

const DEFAULT_CAPACITY: usize = 10_000;

struct StoredState {
    state: ViewState,
    stored_at: Instant,
}

/// Process-wide view-state store shared by all request workers.
pub struct ViewStateRegistry {
    states: DashMap<Uuid, StoredState>,
    capacity: usize,
}

impl ViewStateRegistry {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        ViewStateRegistry {
            states: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Store a view state, evicting the oldest entries while over the
    /// retention bound.
    pub fn insert(&self, state: ViewState) {
        while self.states.len() >= self.capacity {
            let oldest = self
                .states
                .iter()
                .min_by_key(|entry| entry.stored_at)
                .map(|entry| *entry.key());
            match oldest {
                Some(id) => {
                    self.states.remove(&id);
                    debug!(%id, "evicted view state over capacity");
                }
                None => break,
            }
        }
        self.states.insert(
            state.id(),
            StoredState {
                state,
                stored_at: Instant::now(),
            },
        );
    }

    /// Remove and return the state for a postback. The caller re-inserts
    /// it when the cycle keeps it addressable.
    pub fn take(&self, id: Uuid) -> Option<ViewState> {
        self.states.remove(&id).map(|(_, stored)| stored.state)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.states.contains_key(&id)
    }

    pub fn invalidate(&self, id: Uuid) -> bool {
        self.states.remove(&id).is_some()
    }

    /// Drop every state stored longer than `max_age` ago. Returns how many
    /// were reclaimed.
    pub fn evict_stale(&self, max_age: Duration) -> usize {
        let before = self.states.len();
        self.states
            .retain(|_, stored| stored.stored_at.elapsed() <= max_age);
        before - self.states.len()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl Default for ViewStateRegistry {
    fn default() -> Self {
        Self::new()
    }
}
