// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tests for the propagate module.

use super::MdcPropagatingTask;
use crate::recording_store::RecordingStore;
use crate::snapshot::MdcSnapshot;
use crate::store::MdcStore;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex};

const KEY_1: &str = "KEY_1";
const VAL_1: &str = "VAL_1";
const KEY_2: &str = "KEY_2";
const VAL_2: &str = "VAL_2";
const ALT_VAL_1: &str = "ALT_VAL_1";
const ALT_VAL_2: &str = "ALT_VAL_2";

fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn captured_map() -> HashMap<String, String> {
    map(&[(KEY_1, VAL_1), (KEY_2, VAL_2)])
}

fn alt_map() -> HashMap<String, String> {
    map(&[(KEY_1, ALT_VAL_1), (KEY_2, ALT_VAL_2)])
}

#[test]
fn does_not_install_when_capture_is_unset() {
    let store = Arc::new(RecordingStore::new());

    let observed = Arc::new(Mutex::new(None));
    let observed_in_task = observed.clone();
    let store_in_task = store.clone();
    let task = MdcPropagatingTask::wrap_with(store.clone(), move || {
        *observed_in_task.lock().unwrap() = Some(store_in_task.get_current());
    });
    assert!(task.snapshot().is_unset());

    task.run();

    assert_eq!(store.install_count(), 0);
    assert_eq!(*observed.lock().unwrap(), Some(None));
}

#[test]
fn propagates_and_restores() {
    let store = Arc::new(RecordingStore::new());
    store.seed_current_thread(captured_map());

    let observed = Arc::new(Mutex::new(None));
    let observed_in_task = observed.clone();
    let store_in_task = store.clone();
    let task = MdcPropagatingTask::wrap_with(store.clone(), move || {
        *observed_in_task.lock().unwrap() = Some(store_in_task.get_current());
    });

    // Simulate a worker whose leftover context differs from the capture.
    store.seed_current_thread(alt_map());

    task.run();

    assert_eq!(*observed.lock().unwrap(), Some(Some(captured_map())));
    // Two ordered installs: the snapshot first, the restored prior second.
    assert_eq!(store.installs(), vec![captured_map(), alt_map()]);
    assert_eq!(store.get_current(), Some(alt_map()));
}

#[test]
fn restores_after_panic() {
    let store = Arc::new(RecordingStore::new());
    store.seed_current_thread(captured_map());

    let task = MdcPropagatingTask::wrap_with(store.clone(), || {
        panic!("task failure");
    });

    store.seed_current_thread(alt_map());

    let result = catch_unwind(AssertUnwindSafe(|| task.run()));
    let payload = result.unwrap_err();
    assert_eq!(payload.downcast_ref::<&str>(), Some(&"task failure"));

    assert_eq!(store.installs(), vec![captured_map(), alt_map()]);
    assert_eq!(store.get_current(), Some(alt_map()));
}

#[test]
fn empty_capture_still_installs() {
    let store = Arc::new(RecordingStore::new());
    store.seed_current_thread(HashMap::new());

    let observed = Arc::new(Mutex::new(None));
    let observed_in_task = observed.clone();
    let store_in_task = store.clone();
    let task = MdcPropagatingTask::wrap_with(store.clone(), move || {
        *observed_in_task.lock().unwrap() = Some(store_in_task.get_current());
    });
    assert!(!task.snapshot().is_unset());

    // A worker with stale leftover context gets it cleared to the empty
    // mapping, not left in place.
    store.seed_current_thread(alt_map());

    task.run();

    assert_eq!(*observed.lock().unwrap(), Some(Some(HashMap::new())));
    assert_eq!(store.installs(), vec![HashMap::new(), alt_map()]);
}

#[test]
fn unset_prior_is_not_cleared() {
    let store = Arc::new(RecordingStore::new());
    store.seed_current_thread(captured_map());

    let task = MdcPropagatingTask::wrap_with(store.clone(), || {});

    // Run on a fresh thread whose context is unset.
    let store_on_worker = store.clone();
    std::thread::spawn(move || {
        assert_eq!(store_on_worker.get_current(), None);
        task.run();
        // The documented asymmetry: the installed context stays behind.
        assert_eq!(store_on_worker.get_current(), Some(captured_map()));
    })
    .join()
    .unwrap();

    assert_eq!(store.installs(), vec![captured_map()]);
}

#[test]
fn return_value_passes_through() {
    let store = Arc::new(RecordingStore::new());
    store.seed_current_thread(captured_map());

    let ok = MdcPropagatingTask::wrap_with(store.clone(), || 7u32);
    assert_eq!(ok.run(), 7);

    let err = MdcPropagatingTask::wrap_with(store.clone(), || -> Result<(), String> {
        Err("boom".to_string())
    });
    assert_eq!(err.run(), Err("boom".to_string()));
}

#[test]
fn snapshot_reflects_wrapping_thread_not_running_thread() {
    let store = Arc::new(RecordingStore::new());
    store.seed_current_thread(captured_map());

    let task = MdcPropagatingTask::wrap_with(store.clone(), || {});
    assert_eq!(task.snapshot().values(), Some(&captured_map()));

    // Mutating the wrapping thread afterwards changes nothing.
    store.seed_current_thread(alt_map());
    assert_eq!(task.snapshot().values(), Some(&captured_map()));
}

#[test]
fn install_failure_is_fatal() {
    let store = Arc::new(RecordingStore::new());
    store.seed_current_thread(captured_map());

    let task = MdcPropagatingTask::wrap_with(store.clone(), || {
        unreachable!("task must not run when install fails");
    });

    store.reject_installs(true);
    let payload = catch_unwind(AssertUnwindSafe(|| task.run())).unwrap_err();
    let message = payload
        .downcast_ref::<String>()
        .expect("panic payload should be a formatted message");
    assert!(message.contains("cannot install diagnostic context"));
}

#[test]
fn restore_failure_during_unwind_is_logged_not_aborted() {
    use logwise::InMemoryLogger;
    use logwise::global_logger::{global_loggers, set_global_loggers};

    static TEST_LOGGER_GUARD: Mutex<()> = Mutex::new(());

    let _guard = TEST_LOGGER_GUARD.lock().unwrap();
    let logger = Arc::new(InMemoryLogger::new());
    let original = global_loggers();
    set_global_loggers(vec![logger.clone()]);

    let store = Arc::new(RecordingStore::new());
    store.seed_current_thread(captured_map());

    let store_in_task = store.clone();
    let task = MdcPropagatingTask::wrap_with(store.clone(), move || {
        // Break the store mid-task so only the restore fails.
        store_in_task.reject_installs(true);
        panic!("task failure");
    });

    store.seed_current_thread(alt_map());

    let payload = catch_unwind(AssertUnwindSafe(|| task.run())).unwrap_err();
    // The task's own panic surfaces, not the store's.
    assert_eq!(payload.downcast_ref::<&str>(), Some(&"task failure"));

    let logs = logger.drain_logs();
    assert!(
        logs.contains("cannot restore diagnostic context"),
        "expected a restore-failure report, got: {logs}"
    );

    set_global_loggers(original);
}

#[test]
fn capture_is_idempotent_through_the_wrapper() {
    let store = Arc::new(RecordingStore::new());
    store.seed_current_thread(captured_map());

    let a = MdcPropagatingTask::wrap_with(store.clone(), || {});
    let b = MdcPropagatingTask::wrap_with(store.clone(), || {});
    assert_eq!(a.snapshot(), b.snapshot());

    let direct = MdcSnapshot::capture(&*store);
    assert_eq!(a.snapshot(), &direct);
}
