// SPDX-License-Identifier: MIT OR Apache-2.0

//! The default process-wide diagnostic-context store.

use crate::store::{MdcStore, StoreError};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

thread_local! {
    static CURRENT: RefCell<Option<HashMap<String, String>>> = const { RefCell::new(None) };
}

/**
The process-wide diagnostic-context store: one mapping slot per thread.

Every instance of this type aliases the same underlying `thread_local!`
storage, so it can be constructed wherever a [`MdcStore`] is needed and all
handles agree. A thread starts in the "unset" state (no context installed),
which is distinct from having a context that happens to be empty; only
[`clear`](ThreadLocalMdc::clear) returns a thread to unset.

# Examples

```rust
use mdcwise::ThreadLocalMdc;

let mdc = ThreadLocalMdc::new();
mdc.put("request_id", "01J3ZK");
assert_eq!(mdc.get("request_id").as_deref(), Some("01J3ZK"));
mdc.clear();
assert_eq!(mdc.get("request_id"), None);
```
*/
#[derive(Debug, Clone)]
pub struct ThreadLocalMdc {}

// ============================================================================
// BOILERPLATE TRAIT IMPLEMENTATIONS
// ============================================================================
//
// Design decisions for ThreadLocalMdc trait implementations:
//
// - Debug/Clone: Derived - appropriate for a zero-sized struct
// - Copy: Implemented - safe for a zero-sized struct with no heap allocation
// - PartialEq/Eq: Implemented - all instances alias the same storage
// - Hash: Implemented - consistent with Eq
// - Default: Implemented - provides a convenient zero-argument constructor
// - Display: NOT implemented - no meaningful string representation
// - Send/Sync: Automatically implemented - the struct itself holds no state;
//   the per-thread slots are reached through `thread_local!` on whichever
//   thread calls in

impl Copy for ThreadLocalMdc {}

impl PartialEq for ThreadLocalMdc {
    fn eq(&self, _other: &Self) -> bool {
        // All instances alias the same storage
        true
    }
}

impl Eq for ThreadLocalMdc {}

impl std::hash::Hash for ThreadLocalMdc {
    fn hash<H: std::hash::Hasher>(&self, _state: &mut H) {
        // Zero-sized struct has no data to hash - this is consistent with Eq
    }
}

impl Default for ThreadLocalMdc {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadLocalMdc {
    pub const fn new() -> Self {
        Self {}
    }

    /// Returns the memoized shared handle used by the `wrap`-style
    /// constructors that don't take an explicit store.
    pub fn shared() -> Arc<ThreadLocalMdc> {
        static SHARED: OnceLock<Arc<ThreadLocalMdc>> = OnceLock::new();
        SHARED.get_or_init(|| Arc::new(ThreadLocalMdc::new())).clone()
    }

    /// Inserts `value` under `key` in the calling thread's context,
    /// installing an empty context first if the thread had none.
    pub fn put(&self, key: impl Into<String>, value: impl Into<String>) {
        CURRENT.with(|current| {
            current
                .borrow_mut()
                .get_or_insert_with(HashMap::new)
                .insert(key.into(), value.into());
        });
    }

    /// Returns the value stored under `key`, or `None` if the key is absent
    /// or the thread has no context installed.
    pub fn get(&self, key: &str) -> Option<String> {
        CURRENT.with(|current| {
            current
                .borrow()
                .as_ref()
                .and_then(|values| values.get(key).cloned())
        })
    }

    /// Removes `key` from the calling thread's context, if present.
    ///
    /// A context emptied this way stays installed; use
    /// [`clear`](ThreadLocalMdc::clear) to return the thread to unset.
    pub fn remove(&self, key: &str) {
        CURRENT.with(|current| {
            if let Some(values) = current.borrow_mut().as_mut() {
                values.remove(key);
            }
        });
    }

    /// Clears the calling thread's context back to the unset state.
    pub fn clear(&self) {
        CURRENT.with(|current| {
            *current.borrow_mut() = None;
        });
    }
}

impl MdcStore for ThreadLocalMdc {
    fn get_current(&self) -> Option<HashMap<String, String>> {
        CURRENT.with(|current| current.borrow().clone())
    }

    fn set_current(&self, values: HashMap<String, String>) -> Result<(), StoreError> {
        CURRENT.with(|current| {
            *current.borrow_mut() = Some(values);
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ThreadLocalMdc;
    use crate::store::MdcStore;
    use std::collections::HashMap;

    #[test]
    fn put_get_remove_clear() {
        let mdc = ThreadLocalMdc::new();
        mdc.clear();

        mdc.put("k1", "v1");
        mdc.put("k2", "v2");
        assert_eq!(mdc.get("k1").as_deref(), Some("v1"));
        assert_eq!(mdc.get("k2").as_deref(), Some("v2"));

        mdc.remove("k1");
        assert_eq!(mdc.get("k1"), None);
        assert_eq!(mdc.get("k2").as_deref(), Some("v2"));

        mdc.clear();
        assert_eq!(mdc.get("k2"), None);
    }

    #[test]
    fn empty_context_is_distinct_from_unset() {
        let mdc = ThreadLocalMdc::new();
        mdc.clear();
        assert_eq!(mdc.get_current(), None);

        mdc.set_current(HashMap::new()).unwrap();
        assert_eq!(mdc.get_current(), Some(HashMap::new()));

        mdc.clear();
        assert_eq!(mdc.get_current(), None);
    }

    #[test]
    fn remove_does_not_uninstall_the_context() {
        let mdc = ThreadLocalMdc::new();
        mdc.clear();
        mdc.put("k1", "v1");
        mdc.remove("k1");
        // Emptied, but still installed.
        assert_eq!(mdc.get_current(), Some(HashMap::new()));
    }

    #[test]
    fn instances_alias_the_same_storage() {
        let a = ThreadLocalMdc::new();
        let b = ThreadLocalMdc::new();
        a.clear();
        a.put("k1", "v1");
        assert_eq!(b.get("k1").as_deref(), Some("v1"));
        b.clear();
        assert_eq!(a.get("k1"), None);
    }

    #[test]
    fn threads_do_not_share_context() {
        let mdc = ThreadLocalMdc::new();
        mdc.clear();
        mdc.put("k1", "main");

        let handle = std::thread::spawn(move || {
            let mdc = ThreadLocalMdc::new();
            assert_eq!(mdc.get("k1"), None);
            mdc.put("k1", "worker");
            mdc.get("k1")
        });
        assert_eq!(handle.join().unwrap().as_deref(), Some("worker"));
        assert_eq!(mdc.get("k1").as_deref(), Some("main"));
    }
}
