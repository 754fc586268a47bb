// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scheduler integration: the decorate-every-runnable seam and its
//! registration slot.
//!
//! A host scheduler that wants context propagation exposes an extension
//! point shaped as "given an about-to-run action, return a (possibly
//! wrapped) action to run instead", and consults it once per unit of work at
//! enqueue time. This module provides the three pieces of that integration:
//!
//! - [`ScheduleHook`]: the trait matching the extension point's shape, with
//!   a blanket implementation for closures.
//! - [`MdcPropagatingScheduleHook`]: the hook that wraps each runnable in an
//!   [`MdcPropagatingTask`], capturing the scheduling thread's context at
//!   the moment the work is enqueued.
//! - [`HookRegistry`]: the registration slot itself. It is an explicit value
//!   a scheduler owns, not a process-wide singleton, so tests can build and
//!   tear down independent scheduler instances without shared mutable state.
//!
//! # Wiring a scheduler
//!
//! ```rust
//! use mdcwise::{HookRegistry, MdcPropagatingScheduleHook, Runnable};
//! use std::sync::Arc;
//!
//! // Typically once, at process start:
//! let hooks = HookRegistry::new();
//! hooks.set_schedule_hook(Arc::new(MdcPropagatingScheduleHook::new()));
//!
//! // Inside the scheduler, at enqueue time:
//! let task: Runnable = Box::new(|| { /* the deferred work */ });
//! let decorated = hooks.decorate(task);
//! // ...hand `decorated` to a worker thread instead of `task`.
//! # decorated();
//! ```

use crate::propagate::MdcPropagatingTask;
use crate::store::MdcStore;
use crate::thread_local_mdc::ThreadLocalMdc;
use std::sync::{Arc, RwLock};

/// The unit of work a host scheduler's decoration point exchanges.
pub type Runnable = Box<dyn FnOnce() + Send + 'static>;

pub trait ScheduleHook: Send + Sync {
    /**
        Returns the action the scheduler should run instead of `task`.

        Called once per unit of work, on the thread that enqueues it, at the
        moment it is enqueued.
    */
    fn decorate(&self, task: Runnable) -> Runnable;
}

impl<F> ScheduleHook for F
where
    F: Fn(Runnable) -> Runnable + Send + Sync,
{
    fn decorate(&self, task: Runnable) -> Runnable {
        self(task)
    }
}

/**
A [`ScheduleHook`] that wraps every scheduled runnable in an
[`MdcPropagatingTask`], so the diagnostic context active at schedule time
rides along to whichever worker thread runs the task.

Registering this hook with the [`HookRegistry`] a scheduler consults is the
entire integration; the hook performs no logic of its own beyond calling
[`MdcPropagatingTask::wrap_with`] per runnable, which is what makes the
capture happen once per concrete unit of work rather than once globally.
*/
pub struct MdcPropagatingScheduleHook {
    store: Arc<dyn MdcStore>,
}

impl MdcPropagatingScheduleHook {
    /// A hook propagating from the process-wide [`ThreadLocalMdc`] store.
    pub fn new() -> MdcPropagatingScheduleHook {
        Self::with_store(ThreadLocalMdc::shared())
    }

    /// A hook propagating from an injected store.
    pub fn with_store(store: Arc<dyn MdcStore>) -> MdcPropagatingScheduleHook {
        MdcPropagatingScheduleHook { store }
    }
}

impl Default for MdcPropagatingScheduleHook {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MdcPropagatingScheduleHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MdcPropagatingScheduleHook")
            .field("store", &self.store)
            .finish()
    }
}

impl ScheduleHook for MdcPropagatingScheduleHook {
    fn decorate(&self, task: Runnable) -> Runnable {
        // Capture happens here, on the scheduling thread.
        let wrapped = MdcPropagatingTask::wrap_with(self.store.clone(), task);
        Box::new(move || wrapped.run())
    }
}

/**
A registration slot for one [`ScheduleHook`].

A scheduler owns a `HookRegistry` (typically taken as a constructor argument)
and calls [`decorate`](HookRegistry::decorate) on every unit of work at
enqueue time. The slot holds at most one hook; setting a new one replaces the
old (last writer wins). It is typically set once at process start and cleared
at shutdown or test teardown.

All methods are thread-safe; the inner lock is held only for the slot
operation itself, never while a hook runs.
*/
pub struct HookRegistry {
    schedule_hook: RwLock<Option<Arc<dyn ScheduleHook>>>,
}

// ============================================================================
// BOILERPLATE TRAIT IMPLEMENTATIONS
// ============================================================================
//
// Design decisions for HookRegistry trait implementations:
//
// - Debug: Hand-written - hooks aren't Debug, so we show whether the slot is
//   occupied
// - Default: Implemented with the obvious zero value (empty slot)
// - Clone: NOT implemented - a registry is an identity a scheduler owns;
//   share it behind Arc instead
// - PartialEq/Eq/Hash: NOT implemented - no sensible equality over hooks
// - Send/Sync: Automatically implemented via RwLock over Send + Sync hooks

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistry")
            .field("schedule_hook_installed", &self.schedule_hook().is_some())
            .finish()
    }
}

impl HookRegistry {
    /// Creates a registry with an empty slot.
    pub fn new() -> HookRegistry {
        HookRegistry {
            schedule_hook: RwLock::new(None),
        }
    }

    /// Installs `hook`, replacing any previously installed one.
    pub fn set_schedule_hook(&self, hook: Arc<dyn ScheduleHook>) {
        *self.schedule_hook.write().unwrap() = Some(hook);
    }

    /// Empties the slot; subsequent [`decorate`](HookRegistry::decorate)
    /// calls pass tasks through unchanged.
    pub fn clear_schedule_hook(&self) {
        *self.schedule_hook.write().unwrap() = None;
    }

    /// The currently installed hook, if any.
    pub fn schedule_hook(&self) -> Option<Arc<dyn ScheduleHook>> {
        self.schedule_hook.read().unwrap().clone()
    }

    /// Runs `task` through the installed hook, or returns it unchanged if
    /// the slot is empty.
    pub fn decorate(&self, task: Runnable) -> Runnable {
        match self.schedule_hook() {
            Some(hook) => hook.decorate(task),
            None => task,
        }
    }
}
