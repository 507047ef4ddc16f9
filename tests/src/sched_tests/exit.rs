//! Self-termination, exit callbacks and GC tests
//!
//! Self-terminating threads are simulated with host threads whose backend
//! yield never returns (`ParkingPolicy`), matching what a real context
//! switch away from a dead thread looks like from the framework's side.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use crate::mock::{self, wait_until, CountingPolicy, ParkingPolicy};
use crate::sched::{SchedRegistry, Scheduler, ThreadAttr};

use super::noop;

fn parking_setup() -> (
    &'static SchedRegistry,
    Arc<Scheduler>,
    Arc<std::sync::atomic::AtomicUsize>,
) {
    let registry = super::registry();
    let (policy, parked) = ParkingPolicy::boxed();
    let sched = Scheduler::new(policy, true, false);
    registry.register(&sched).unwrap();
    (registry, sched, parked)
}

#[test]
fn self_termination_parks_until_gc() {
    let (registry, sched, parked) = parking_setup();
    let thread = registry
        .thread_create_fn0(&sched, noop, &ThreadAttr::default())
        .unwrap();

    let victim = thread.clone();
    std::thread::spawn(move || {
        mock::set_current_cpu(1);
        registry.set_current_thread(Some(victim.clone()));
        registry.thread_terminate(&victim);
    });
    assert!(wait_until(|| parked.load(Ordering::SeqCst) == 1));

    // Parked on the exited list with its stack intact.
    assert!(thread.has_exited());
    assert!(!thread.is_released());
    assert!(thread.stack_top().is_some());
    assert_eq!(sched.thread_count(), 0);
    assert_eq!(sched.exited_count(), 1);

    // The sweep from this core (no current thread here) reclaims it.
    assert_eq!(registry.thread_gc(&sched), 1);
    assert!(thread.is_released());
    assert_eq!(sched.exited_count(), 0);
}

static GC_ARGS: Mutex<Vec<usize>> = Mutex::new(Vec::new());

fn record_gc(arg: usize) {
    GC_ARGS.lock().unwrap().push(arg);
}

#[test]
fn exit2_callback_runs_during_gc() {
    let (registry, sched, parked) = parking_setup();
    let thread = registry
        .thread_create_fn0(&sched, noop, &ThreadAttr::default())
        .unwrap();

    let victim = thread.clone();
    std::thread::spawn(move || {
        mock::set_current_cpu(1);
        registry.set_current_thread(Some(victim));
        registry.thread_exit2(record_gc, 0xBEEF);
    });
    assert!(wait_until(|| parked.load(Ordering::SeqCst) == 1));
    assert!(GC_ARGS.lock().unwrap().is_empty());

    assert_eq!(registry.thread_gc(&sched), 1);
    assert!(GC_ARGS.lock().unwrap().contains(&0xBEEF));
    assert!(thread.is_released());
}

#[test]
#[should_panic(expected = "outside of a thread context")]
fn exit_without_current_thread_is_fatal() {
    let registry = super::registry();
    registry.thread_exit();
}

#[test]
fn gc_of_empty_list_reclaims_nothing() {
    let (registry, sched, _parked) = parking_setup();
    assert_eq!(registry.thread_gc(&sched), 0);
}

#[test]
#[should_panic(expected = "gc of the executing thread")]
fn gc_never_collects_the_executing_thread() {
    let (registry, sched, parked) = parking_setup();
    let thread = registry
        .thread_create_fn0(&sched, noop, &ThreadAttr::default())
        .unwrap();

    let victim = thread.clone();
    std::thread::spawn(move || {
        mock::set_current_cpu(1);
        registry.set_current_thread(Some(victim.clone()));
        registry.thread_terminate(&victim);
    });
    assert!(wait_until(|| parked.load(Ordering::SeqCst) == 1));

    // Misconfigured sweep: the collector claims to be the parked thread.
    registry.set_current_thread(Some(thread));
    let _ = registry.thread_gc(&sched);
}

#[test]
#[should_panic(expected = "terminated thread resumed")]
fn resuming_a_terminated_thread_is_fatal() {
    let registry = super::registry();
    let (policy, _log) = CountingPolicy::boxed();
    let sched = Scheduler::new(policy, true, false);
    registry.register(&sched).unwrap();

    let thread = registry
        .thread_create_fn0(&sched, noop, &ThreadAttr::default())
        .unwrap();
    registry.set_current_thread(Some(thread.clone()));

    // CountingPolicy's yield returns, i.e. the backend scheduled the dead
    // thread again. The framework must refuse to carry on.
    registry.thread_terminate(&thread);
}

#[test]
#[should_panic(expected = "self-termination without a scheduler")]
fn self_termination_requires_an_owner() {
    let (registry, sched, _parked) = parking_setup();
    let thread = registry
        .thread_create_fn0(&sched, noop, &ThreadAttr::default())
        .unwrap();

    registry.thread_remove(&thread).unwrap();
    registry.set_current_thread(Some(thread.clone()));
    registry.thread_terminate(&thread);
}
