// SPDX-License-Identifier: MIT OR Apache-2.0

//! Async context propagation.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::Poll;

use super::task::RestoreGuard;
use crate::snapshot::MdcSnapshot;
use crate::store::MdcStore;
use crate::thread_local_mdc::ThreadLocalMdc;

/**
A [`Future`] wrapper that polls with the diagnostic context captured at
construction.

Thread-pool executors move a future between worker threads and don't preserve
thread-local state across polls, so context installed where the future was
created is invisible inside it. `ApplyMdc` closes the gap: it captures an
[`MdcSnapshot`] when constructed, and around every poll it captures the
polling thread's prior context, installs the snapshot, polls the inner
future, and restores the prior context.

The install and restore steps follow the same rules as
[`MdcPropagatingTask::run`](crate::MdcPropagatingTask::run): an unset
snapshot skips the install, an unset prior is not restored, and the restore
runs even if the poll panics.

# Examples

```rust
use mdcwise::{ApplyMdc, ThreadLocalMdc};

async fn handle_request() -> Option<String> {
    ThreadLocalMdc::new().get("request_id")
}

# async fn example() {
let mdc = ThreadLocalMdc::new();
mdc.put("request_id", "01J3ZK");

// The context rides along to whichever threads end up polling.
let seen = ApplyMdc::new(handle_request()).await;
assert_eq!(seen.as_deref(), Some("01J3ZK"));
# }
```
*/
pub struct ApplyMdc<F> {
    snapshot: MdcSnapshot,
    store: Arc<dyn MdcStore>,
    inner: F,
}

impl<F> ApplyMdc<F> {
    /// Wraps `f`, capturing the calling thread's context from the
    /// process-wide [`ThreadLocalMdc`] store.
    pub fn new(f: F) -> ApplyMdc<F> {
        Self::new_with(ThreadLocalMdc::shared(), f)
    }

    /// Wraps `f`, capturing the calling thread's context from an injected
    /// store.
    pub fn new_with(store: Arc<dyn MdcStore>, f: F) -> ApplyMdc<F> {
        let snapshot = MdcSnapshot::capture(&*store);
        ApplyMdc {
            snapshot,
            store,
            inner: f,
        }
    }

    /// The snapshot captured at construction.
    #[inline]
    pub fn snapshot(&self) -> &MdcSnapshot {
        &self.snapshot
    }
}

impl<F> Future for ApplyMdc<F>
where
    F: Future,
{
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut std::task::Context<'_>) -> Poll<Self::Output> {
        let (snapshot, store, fut) = unsafe {
            //safety: inner is structurally pinned; snapshot and store are
            //plain values we clone out
            let d = self.get_unchecked_mut();
            (
                d.snapshot.clone(),
                d.store.clone(),
                Pin::new_unchecked(&mut d.inner),
            )
        };
        let prior = MdcSnapshot::capture(&*store);
        if let Err(err) = snapshot.install(&*store) {
            panic!("cannot install diagnostic context: {err}");
        }
        let _restore = RestoreGuard {
            store: &*store,
            prior,
        };
        fut.poll(cx)
    }
}
