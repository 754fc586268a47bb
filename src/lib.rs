//SPDX-License-Identifier: MIT OR Apache-2.0
/*!
# mdcwise

mdcwise carries a thread's diagnostic logging context onto the worker threads
that eventually run its deferred tasks.

# The problem

A diagnostic context (a thread-local mapping of string keys to string
values, conventionally holding correlation data like a request ID) belongs
to the thread that creates a task. But a thread-pool scheduler runs that task
later, on whatever worker is free. Without intervention, logs emitted during
the task's execution carry the worker's leftover context from some previous
task, or none at all. Either way, your request IDs lie to you.

# The fix

Wrap the task. [`MdcPropagatingTask::wrap`] captures an immutable
[`MdcSnapshot`] of the wrapping thread's context; running the wrapper
installs that snapshot on the executing thread, runs the task, and restores
the executing thread's prior context afterward, whether the task returns or
panics. That capture/install/restore protocol is the whole crate; everything
else is the plumbing to hang it off a scheduler.

# The API

* [`MdcPropagatingTask`] wraps a single deferred closure.
* [`MdcPropagatingScheduleHook`] is the same idea as a scheduler extension:
  it decorates every runnable handed to it at schedule time.
* [`HookRegistry`] is the registration slot a scheduler consults; inject one
  per scheduler rather than sharing process-global state.
* [`ApplyMdc`] applies the protocol around every poll of a [`Future`](std::future::Future),
  for executors that don't preserve thread-local state between polls.

# The store

The context itself lives behind the [`MdcStore`] trait:
`get_current`/`set_current`, per thread. [`ThreadLocalMdc`] is the
process-wide default, with slf4j-flavored `put`/`get`/`remove`/`clear`
conveniences. For deterministic tests, [`RecordingStore`] keeps an ordered
log of every install, so you can assert not just what a task observed but
exactly how the wrapper drove the store.

```rust
use mdcwise::{MdcPropagatingTask, ThreadLocalMdc};

let mdc = ThreadLocalMdc::new();
mdc.put("request_id", "01J3ZK");

let task = MdcPropagatingTask::wrap(|| {
    // Executes with request_id installed, on whichever thread runs it.
    assert_eq!(ThreadLocalMdc::new().get("request_id").as_deref(), Some("01J3ZK"));
});
std::thread::spawn(move || task.run()).join().unwrap();
```
*/

mod hooks;
pub mod propagate;
mod recording_store;
mod snapshot;
mod store;
mod thread_local_mdc;

logwise::declare_logging_domain!();

pub use hooks::{HookRegistry, MdcPropagatingScheduleHook, Runnable, ScheduleHook};
pub use propagate::{ApplyMdc, MdcPropagatingTask};
pub use recording_store::RecordingStore;
pub use snapshot::MdcSnapshot;
pub use store::{MdcStore, StoreError};
pub use thread_local_mdc::ThreadLocalMdc;
