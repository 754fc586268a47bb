// SPDX-License-Identifier: MIT OR Apache-2.0

//! Point-in-time captures of a thread's diagnostic context.

use crate::store::{MdcStore, StoreError};
use std::collections::HashMap;
use std::sync::Arc;

/**
An immutable capture of a diagnostic context, or the explicit "unset" marker.

A snapshot is taken with [`capture`](MdcSnapshot::capture) on one thread and
later [`install`](MdcSnapshot::install)ed on whichever thread ends up running
the work it travels with. Once created it is never mutated; clones share the
captured mapping, so a snapshot is cheap to move across threads and safe to
read from any number of them at once.

A snapshot distinguishes a thread that had no context at capture time
([`is_unset`](MdcSnapshot::is_unset)) from a thread whose context was an empty
mapping. Installing an unset snapshot is a no-op; installing an empty one
replaces whatever the target thread had with the empty mapping.

# Examples

```rust
use mdcwise::{MdcSnapshot, ThreadLocalMdc};

let mdc = ThreadLocalMdc::new();
mdc.clear();
mdc.put("request_id", "01J3ZK");

let snapshot = MdcSnapshot::capture(&mdc);
assert_eq!(
    snapshot.values().and_then(|v| v.get("request_id")).map(String::as_str),
    Some("01J3ZK"),
);
```
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MdcSnapshot {
    values: Option<Arc<HashMap<String, String>>>,
}

impl MdcSnapshot {
    /// Captures the calling thread's current diagnostic context from `store`.
    ///
    /// Returns the unset snapshot if the thread has no context installed.
    /// Side-effect-free; capturing twice with no intervening mutation yields
    /// equal snapshots.
    pub fn capture(store: &dyn MdcStore) -> MdcSnapshot {
        MdcSnapshot {
            values: store.get_current().map(Arc::new),
        }
    }

    /// The snapshot of a thread with no context installed.
    pub fn unset() -> MdcSnapshot {
        MdcSnapshot { values: None }
    }

    /// Whether this snapshot is the unset marker.
    #[inline]
    pub fn is_unset(&self) -> bool {
        self.values.is_none()
    }

    /// The captured mapping, or `None` for the unset marker.
    #[inline]
    pub fn values(&self) -> Option<&HashMap<String, String>> {
        self.values.as_deref()
    }

    /// Sets the calling thread's diagnostic context to this snapshot's
    /// mapping.
    ///
    /// Installing an unset snapshot leaves the thread's context untouched and
    /// returns `Ok`; there is nothing meaningful to clear to. A store
    /// rejection is returned as-is, never retried.
    pub fn install(&self, store: &dyn MdcStore) -> Result<(), StoreError> {
        match &self.values {
            Some(values) => store.set_current(values.as_ref().clone()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::MdcSnapshot;
    use crate::recording_store::RecordingStore;
    use std::collections::HashMap;

    #[test]
    fn capture_is_idempotent() {
        let store = RecordingStore::new();
        assert_eq!(
            MdcSnapshot::capture(&store),
            MdcSnapshot::capture(&store),
        );

        store.seed_current_thread(HashMap::from([("k1".to_string(), "v1".to_string())]));
        let a = MdcSnapshot::capture(&store);
        let b = MdcSnapshot::capture(&store);
        assert_eq!(a, b);
        assert!(!a.is_unset());
    }

    #[test]
    fn capture_of_unset_thread_is_unset() {
        let store = RecordingStore::new();
        let snapshot = MdcSnapshot::capture(&store);
        assert!(snapshot.is_unset());
        assert_eq!(snapshot, MdcSnapshot::unset());
        assert_eq!(snapshot.values(), None);
    }

    #[test]
    fn installing_unset_is_a_no_op() {
        let store = RecordingStore::new();
        MdcSnapshot::unset().install(&store).unwrap();
        assert_eq!(store.install_count(), 0);
    }

    #[test]
    fn installing_empty_is_not_a_no_op() {
        let store = RecordingStore::new();
        store.seed_current_thread(HashMap::new());
        let snapshot = MdcSnapshot::capture(&store);
        assert!(!snapshot.is_unset());

        snapshot.install(&store).unwrap();
        assert_eq!(store.installs(), vec![HashMap::new()]);
    }

    #[test]
    fn snapshot_is_immutable_after_capture() {
        let store = RecordingStore::new();
        store.seed_current_thread(HashMap::from([("k1".to_string(), "v1".to_string())]));
        let snapshot = MdcSnapshot::capture(&store);

        // Later mutation of the thread's context doesn't reach the snapshot.
        store.seed_current_thread(HashMap::from([("k1".to_string(), "alt".to_string())]));
        assert_eq!(
            snapshot.values().and_then(|v| v.get("k1")).map(String::as_str),
            Some("v1"),
        );
    }
}
