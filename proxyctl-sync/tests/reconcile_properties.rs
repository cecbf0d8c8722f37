use std::cell::Cell;
use std::time::Duration;

use proxyctl_core::ProxyError;
use proxyctl_sync::{reconcile_with, RetryPolicy};
use rstest::rstest;

fn not_found() -> ProxyError {
    ProxyError::NotFound {
        status: 404,
        message: "User not found".into(),
    }
}

fn policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_delay: Duration::from_millis(100),
        max_delay: Duration::from_millis(1_000),
        deadline: None,
    }
}

/// `read` that fails as not-found `misses` times, then returns the read count.
fn eventually_visible(misses: u32, reads: &Cell<u32>) -> impl FnMut() -> Result<u32, ProxyError> + '_ {
    move || {
        reads.set(reads.get() + 1);
        if reads.get() <= misses {
            Err(not_found())
        } else {
            Ok(reads.get())
        }
    }
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(4)]
fn succeeds_after_k_plus_one_reads(#[case] k: u32) {
    let reads = Cell::new(0);
    let mut sleeps = Vec::new();
    let value = reconcile_with(&policy(5), eventually_visible(k, &reads), |d| sleeps.push(d))
        .expect("visible within budget");
    assert_eq!(value, k + 1);
    assert_eq!(reads.get(), k + 1);
    assert_eq!(sleeps.len() as u32, k);
}

#[test]
fn first_read_success_never_sleeps() {
    let reads = Cell::new(0);
    let mut slept = false;
    reconcile_with(&policy(5), eventually_visible(0, &reads), |_| slept = true).unwrap();
    assert!(!slept);
}

#[test]
fn exhaustion_returns_not_found_after_max_attempts() {
    let reads = Cell::new(0);
    let err = reconcile_with(&policy(4), eventually_visible(u32::MAX, &reads), |_| {}).unwrap_err();
    assert!(err.is_not_found(), "got: {err:?}");
    assert_eq!(reads.get(), 4);
}

#[rstest]
#[case::rejected(ProxyError::Rejected { status: 400, message: "invalid budget".into() })]
#[case::transport(ProxyError::Transport("connection refused".into()))]
#[case::timeout(ProxyError::Timeout { status: 504, message: "gateway timeout".into() })]
fn other_failure_stops_immediately(#[case] failure: ProxyError) {
    let reads = Cell::new(0);
    let mut failure = Some(failure);
    let err = reconcile_with::<(), _, _>(
        &policy(10),
        || {
            reads.set(reads.get() + 1);
            if reads.get() < 3 {
                Err(not_found())
            } else {
                Err(failure.take().unwrap_or_else(not_found))
            }
        },
        |_| {},
    )
    .unwrap_err();
    assert!(!err.is_not_found(), "got: {err:?}");
    assert_eq!(reads.get(), 3);
}

#[test]
fn backoff_doubles_up_to_ceiling() {
    let reads = Cell::new(0);
    let mut sleeps = Vec::new();
    let _ = reconcile_with(&policy(7), eventually_visible(u32::MAX, &reads), |d| {
        sleeps.push(d.as_millis())
    });
    assert_eq!(sleeps, vec![100, 200, 400, 800, 1_000, 1_000]);
}

#[test]
fn elapsed_deadline_stops_after_one_read() {
    let reads = Cell::new(0);
    let policy = policy(10).with_deadline(Duration::ZERO);
    let err = reconcile_with(&policy, eventually_visible(u32::MAX, &reads), |_| {}).unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(reads.get(), 1);
}
