// SPDX-License-Identifier: MIT OR Apache-2.0

//! The pluggable seam over per-thread diagnostic-context storage.

use std::collections::HashMap;
use std::fmt::Debug;

/// Error produced when a store rejects a diagnostic-context value.
///
/// For the built-in [`ThreadLocalMdc`](crate::ThreadLocalMdc) store this never
/// occurs; the type exists so that custom stores backed by something more
/// exotic than a `thread_local!` slot have a way to refuse a write. See
/// [`MdcPropagatingTask::run`](crate::MdcPropagatingTask::run) for how the
/// wrapper reacts to one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("diagnostic context store rejected the value: {reason}")]
pub struct StoreError {
    reason: String,
}

impl StoreError {
    /// Creates a new error carrying the store's reason for the rejection.
    pub fn new(reason: impl Into<String>) -> StoreError {
        StoreError {
            reason: reason.into(),
        }
    }

    /// The store's reason for the rejection.
    #[inline]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

pub trait MdcStore: Debug + Send + Sync {
    /**
        Returns a copy of the calling thread's current diagnostic context,
        or `None` if the thread has no context installed.

        "No context installed" is distinct from "context installed and empty":
        a thread whose context was set to an empty mapping reports
        `Some` of an empty map, not `None`.

        This operation is side-effect-free and must not fail.
    */
    fn get_current(&self) -> Option<HashMap<String, String>>;

    /**
        Replaces the calling thread's diagnostic context with `values`.

        After a successful call, [`get_current`](MdcStore::get_current) on the
        same thread returns a copy of `values` until the next mutation. Stores
        are per-thread; a call on one thread never observes or disturbs
        another thread's context.
    */
    fn set_current(&self, values: HashMap<String, String>) -> Result<(), StoreError>;
}

/*
Boilerplate notes.

# MdcStore

Clone doesn't belong on the trait; stores are shared behind Arc and whether a
store is cheaply clonable is its own business.
PartialEq/Eq are unclear (data equality vs provenance) so we skip them, same
reasoning as for comparing two loggers.
Send/Sync are required: the whole point is that one store handle is consulted
from the scheduling thread and from every worker.
Debug is required so types embedding a store handle can derive or hand-write
their own Debug.

# StoreError

Clone/PartialEq/Eq are implemented; the error is a plain value and tests
compare them.
*/
