// ABOUTME: Property tests for the deployment task registry.
// ABOUTME: At most one guard per application, released exactly once on drop.

use proptest::prelude::*;
use std::collections::HashMap;
use swapdock::deploy::{TaskGuard, TaskRegistry};
use swapdock::types::AppName;

#[derive(Debug, Clone)]
enum Op {
    Acquire(usize),
    Release(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..4usize).prop_map(Op::Acquire),
        (0..4usize).prop_map(Op::Release),
    ]
}

fn app(i: usize) -> AppName {
    AppName::new(&format!("app{}", i)).unwrap()
}

proptest! {
    /// The registry agrees with a model that holds at most one guard per app.
    #[test]
    fn acquire_release_matches_model(ops in proptest::collection::vec(op(), 0..64)) {
        let registry = TaskRegistry::new();
        let mut held: HashMap<usize, TaskGuard> = HashMap::new();

        for op in ops {
            match op {
                Op::Acquire(i) => {
                    let guard = registry.try_acquire(&app(i));
                    prop_assert_eq!(guard.is_some(), !held.contains_key(&i));
                    if let Some(guard) = guard {
                        held.insert(i, guard);
                    }
                }
                Op::Release(i) => {
                    held.remove(&i);
                }
            }

            for i in 0..4 {
                prop_assert_eq!(registry.is_busy(&app(i)), held.contains_key(&i));
            }
            prop_assert_eq!(registry.is_idle(), held.is_empty());
        }
    }
}

/// Test: concurrent acquisitions of one application yield exactly one guard.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_acquire_has_one_winner() {
    let registry = TaskRegistry::new();
    let name = app(0);

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let registry = registry.clone();
            let name = name.clone();
            tokio::spawn(async move { registry.try_acquire(&name) })
        })
        .collect();

    let mut guards = Vec::new();
    for handle in handles {
        if let Some(guard) = handle.await.unwrap() {
            guards.push(guard);
        }
    }

    assert_eq!(guards.len(), 1);
    assert!(registry.is_busy(&name));
    drop(guards);
    assert!(registry.is_idle());
}

/// Test: a guard dropped by a panicking task still releases the application.
#[tokio::test]
async fn panicking_holder_releases() {
    let registry = TaskRegistry::new();
    let guard = registry.try_acquire(&app(1)).unwrap();

    let result = tokio::spawn(async move {
        let _guard = guard;
        panic!("deployment task failed");
    })
    .await;

    assert!(result.is_err());
    assert!(!registry.is_busy(&app(1)));
    registry.wait_idle().await;
}

/// Test: different applications deploy independently.
#[test]
fn applications_are_independent() {
    let registry = TaskRegistry::new();
    let _a = registry.try_acquire(&app(0)).unwrap();
    let _b = registry.try_acquire(&app(1)).unwrap();
    assert!(registry.is_busy(&app(0)));
    assert!(registry.is_busy(&app(1)));
    assert!(!registry.is_busy(&app(2)));
}
