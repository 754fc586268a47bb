// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Recording store
//!
//! This module provides an in-memory [`MdcStore`] for testing. The
//! `RecordingStore` keeps each thread's current context in an ordinary map
//! keyed by thread ID rather than in `thread_local!` storage, and remembers
//! every install in order, making it possible to assert on exactly how a
//! wrapper drove the store:
//!
//! - Did the wrapper install at all? ([`install_count`](RecordingStore::install_count))
//! - What was installed first, the snapshot or the restored prior value?
//!   ([`installs`](RecordingStore::installs))
//! - What does the wrapped task observe mid-flight? (`get_current` from
//!   inside the task)
//!
//! It can also be switched to reject installs, for driving the store-failure
//! paths that the default thread-local store can never produce.

use crate::store::{MdcStore, StoreError};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::ThreadId;

/**
An in-memory [`MdcStore`] that records every install, for deterministic tests.

Per-thread semantics match the real store: each thread reads and writes only
its own entry, and a thread with no entry is in the unset state.

# Example

```rust
use mdcwise::{MdcPropagatingTask, RecordingStore};
use std::collections::HashMap;
use std::sync::Arc;

let store = Arc::new(RecordingStore::new());
store.seed_current_thread(HashMap::from([("request_id".to_string(), "01J3ZK".to_string())]));

let task = MdcPropagatingTask::wrap_with(store.clone(), || {});
task.run();

// One install of the snapshot, one install restoring the prior value.
assert_eq!(store.install_count(), 2);
```
*/
#[derive(Debug)]
pub struct RecordingStore {
    current: Mutex<HashMap<ThreadId, HashMap<String, String>>>,
    installs: Mutex<Vec<HashMap<String, String>>>,
    reject_installs: AtomicBool,
}

// ============================================================================
// BOILERPLATE TRAIT IMPLEMENTATIONS
// ============================================================================
//
// Design decisions for RecordingStore trait implementations:
//
// - Debug: Derived - required by the MdcStore trait
// - Default: Implemented with the obvious zero value (empty store)
// - Clone: NOT implemented - a test double's recorded history shouldn't fork
// - PartialEq/Eq/Hash: NOT implemented - comparing mutex-held state is
//   problematic and stores shouldn't be map keys
// - Display: NOT implemented - no meaningful representation
// - Send/Sync: Automatically implemented via Mutex/AtomicBool (required by
//   the MdcStore trait)

impl Default for RecordingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingStore {
    /// Creates an empty store: every thread is unset, nothing recorded.
    pub fn new() -> RecordingStore {
        RecordingStore {
            current: Mutex::new(HashMap::new()),
            installs: Mutex::new(Vec::new()),
            reject_installs: AtomicBool::new(false),
        }
    }

    /// Sets the calling thread's current context directly, without recording
    /// an install.
    ///
    /// Use this to arrange a thread's prior state; the install log then
    /// contains only what the code under test did.
    pub fn seed_current_thread(&self, values: HashMap<String, String>) {
        self.current
            .lock()
            .unwrap()
            .insert(std::thread::current().id(), values);
    }

    /// Returns every recorded install, oldest first, across all threads.
    pub fn installs(&self) -> Vec<HashMap<String, String>> {
        self.installs.lock().unwrap().clone()
    }

    /// Returns the number of recorded installs.
    pub fn install_count(&self) -> usize {
        self.installs.lock().unwrap().len()
    }

    /// When `reject` is true, every subsequent `set_current` fails with a
    /// [`StoreError`] and records nothing.
    pub fn reject_installs(&self, reject: bool) {
        self.reject_installs.store(reject, Ordering::Relaxed);
    }
}

impl MdcStore for RecordingStore {
    fn get_current(&self) -> Option<HashMap<String, String>> {
        self.current
            .lock()
            .unwrap()
            .get(&std::thread::current().id())
            .cloned()
    }

    fn set_current(&self, values: HashMap<String, String>) -> Result<(), StoreError> {
        if self.reject_installs.load(Ordering::Relaxed) {
            return Err(StoreError::new("RecordingStore is rejecting installs"));
        }
        self.installs.lock().unwrap().push(values.clone());
        self.current
            .lock()
            .unwrap()
            .insert(std::thread::current().id(), values);
        Ok(())
    }
}
