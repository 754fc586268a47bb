// SPDX-License-Identifier: MIT OR Apache-2.0

//! The install-run-restore wrapper for deferred tasks.

use crate::snapshot::MdcSnapshot;
use crate::store::MdcStore;
use crate::thread_local_mdc::ThreadLocalMdc;
use std::sync::Arc;

/**
Decorates a task so that it executes with the diagnostic context of the
thread that wrapped it.

Wrapping captures an [`MdcSnapshot`] of the calling thread's context;
[`run`](MdcPropagatingTask::run) installs that snapshot on the executing
thread, runs the task, and restores the executing thread's prior context
afterward, whether the task returns or panics.

The wrapper owns the task outright and is consumed by `run`, so each instance
executes at most once. The captured snapshot reflects the context of the
thread that called `wrap`, never the thread that calls `run`.

# Examples

```rust
use mdcwise::{MdcPropagatingTask, ThreadLocalMdc};

let mdc = ThreadLocalMdc::new();
mdc.clear();
mdc.put("job_id", "42");

// Captured here, on the wrapping thread...
let task = MdcPropagatingTask::wrap(|| ThreadLocalMdc::new().get("job_id"));

// ...observed there, on the executing thread.
let seen = std::thread::spawn(move || task.run()).join().unwrap();
assert_eq!(seen.as_deref(), Some("42"));
```

The task's return value passes through untouched, so `Result`-returning tasks
keep their error channel:

```rust
use mdcwise::MdcPropagatingTask;

let task = MdcPropagatingTask::wrap(|| -> Result<u32, String> { Err("boom".into()) });
assert!(task.run().is_err());
```
*/
pub struct MdcPropagatingTask<F> {
    task: F,
    snapshot: MdcSnapshot,
    store: Arc<dyn MdcStore>,
}

// ============================================================================
// BOILERPLATE TRAIT IMPLEMENTATIONS
// ============================================================================
//
// Design decisions for MdcPropagatingTask trait implementations:
//
// - Debug: Hand-written - the wrapped closure isn't Debug, so we show the
//   snapshot and store and elide the task
// - Clone: NOT implemented - the wrapper owns its task exclusively; cloning
//   would require F: Clone and would blur "runs at most once"
// - PartialEq/Eq/Hash: NOT implemented - no sensible equality over closures
// - Default: NOT implemented - there is no default task
// - Send: Automatically implemented when F is Send, which is what a
//   scheduler hands between threads

impl<F> std::fmt::Debug for MdcPropagatingTask<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MdcPropagatingTask")
            .field("snapshot", &self.snapshot)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl<F, R> MdcPropagatingTask<F>
where
    F: FnOnce() -> R,
{
    /// Wraps `task`, capturing the calling thread's context from the
    /// process-wide [`ThreadLocalMdc`] store.
    pub fn wrap(task: F) -> MdcPropagatingTask<F> {
        Self::wrap_with(ThreadLocalMdc::shared(), task)
    }

    /// Wraps `task`, capturing the calling thread's context from an injected
    /// store.
    ///
    /// The same store is consulted again at [`run`](MdcPropagatingTask::run)
    /// time, on the executing thread, for the install and restore steps.
    pub fn wrap_with(store: Arc<dyn MdcStore>, task: F) -> MdcPropagatingTask<F> {
        let snapshot = MdcSnapshot::capture(&*store);
        MdcPropagatingTask {
            task,
            snapshot,
            store,
        }
    }

    /// The snapshot captured at wrap time.
    #[inline]
    pub fn snapshot(&self) -> &MdcSnapshot {
        &self.snapshot
    }

    /// Runs the wrapped task with the captured context installed, then
    /// restores the executing thread's prior context.
    ///
    /// The restore step runs on every exit path: a panic from the task body
    /// propagates to the caller unchanged, with the prior context already
    /// back in place.
    ///
    /// An unset prior context is left as-is rather than actively cleared, so
    /// after running a task whose capture was set, a previously-unset worker
    /// thread keeps that context until something overwrites it. This is a
    /// known limitation, inherited deliberately: the store's clear capability
    /// is never exercised on this path.
    ///
    /// # Panics
    ///
    /// A store rejection during install or restore is fatal and panics with
    /// the [`StoreError`](crate::StoreError). If the rejection happens during
    /// the restore step while a task panic is already unwinding, it is
    /// reported through logging and suppressed instead; a second panic would
    /// abort the process.
    pub fn run(self) -> R {
        let prior = MdcSnapshot::capture(&*self.store);
        if let Err(err) = self.snapshot.install(&*self.store) {
            panic!("cannot install diagnostic context: {err}");
        }
        let _restore = RestoreGuard {
            store: &*self.store,
            prior,
        };
        (self.task)()
    }
}

/// Restores a prior context when dropped, i.e. on every exit path of the
/// task body it guards.
pub(super) struct RestoreGuard<'a> {
    pub(super) store: &'a dyn MdcStore,
    pub(super) prior: MdcSnapshot,
}

impl Drop for RestoreGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.prior.install(self.store) {
            if std::thread::panicking() {
                // Unwinding already; a second panic would abort.
                logwise::error_sync!(
                    "cannot restore diagnostic context: {err}",
                    err = err.to_string()
                );
            } else {
                panic!("cannot restore diagnostic context: {err}");
            }
        }
    }
}
