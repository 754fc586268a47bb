// SPDX-License-Identifier: MIT OR Apache-2.0

//! Context-propagating wrappers for deferred work.
//!
//! A deferred task is created on one thread and executed later on another,
//! chosen by whatever scheduler owns the thread pool. The wrappers here close
//! the gap between those two threads for diagnostic context: each one
//! captures an [`MdcSnapshot`](crate::MdcSnapshot) of the creating thread's
//! context at wrap time and replays it on the executing thread for exactly
//! the duration of the work.
//!
//! # The protocol
//!
//! Every wrapper follows the same per-invocation sequence on the executing
//! thread:
//!
//! 1. Capture the thread's current context as the prior value (which may be
//!    unset).
//! 2. Install the wrapped snapshot, unless the snapshot is unset. An empty
//!    captured context still installs, clearing a worker's stale leftover
//!    context from a previous task; only a truly unset capture skips this
//!    step.
//! 3. Run the work.
//! 4. Restore the prior value, on every exit path, including a panicking
//!    task body. An unset prior is not restored; see
//!    [`MdcPropagatingTask::run`] for the consequences.
//!
//! # The wrappers
//!
//! - [`MdcPropagatingTask`]: wraps a zero-argument closure; the shape a
//!   thread-pool scheduler runs.
//! - [`ApplyMdc`]: wraps a [`Future`](std::future::Future), applying the
//!   protocol around every poll, for executors that don't preserve
//!   thread-local state between polls.
//!
//! The scheduling-callback flavor (decorate every runnable a scheduler is
//! handed) lives in [`MdcPropagatingScheduleHook`](crate::MdcPropagatingScheduleHook).
//!
//! # Example
//!
//! ```rust
//! use mdcwise::{MdcPropagatingTask, ThreadLocalMdc};
//!
//! let mdc = ThreadLocalMdc::new();
//! mdc.clear();
//! mdc.put("request_id", "01J3ZK");
//!
//! let task = MdcPropagatingTask::wrap(|| {
//!     // Runs with request_id installed, wherever it runs.
//!     ThreadLocalMdc::new().get("request_id")
//! });
//!
//! let seen = std::thread::spawn(move || task.run()).join().unwrap();
//! assert_eq!(seen.as_deref(), Some("01J3ZK"));
//! ```

mod apply_mdc;
mod task;

#[cfg(test)]
mod tests;

// Re-export public types
pub use apply_mdc::ApplyMdc;
pub use task::MdcPropagatingTask;
