//! Seat lock manager behavior against the shared-store semantics.

mod common;

use futures_util::future::join_all;
use std::time::Duration;
use uuid::Uuid;

use transita_core::{AcquireOutcome, ConsumeOutcome, ReleaseOutcome};

#[tokio::test]
async fn concurrent_acquires_yield_exactly_one_lease() {
    let h = common::harness();
    let trip_id = Uuid::new_v4();
    let seat_id = Uuid::new_v4();

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let locks = h.locks.clone();
            tokio::spawn(async move { locks.acquire(trip_id, seat_id, Some(60)).await.unwrap() })
        })
        .collect();

    let outcomes = join_all(handles).await;
    let held = outcomes
        .iter()
        .filter(|r| matches!(r.as_ref().unwrap(), AcquireOutcome::Held(_)))
        .count();
    let conflicts = outcomes
        .iter()
        .filter(|r| matches!(r.as_ref().unwrap(), AcquireOutcome::Conflict))
        .count();

    assert_eq!(held, 1);
    assert_eq!(conflicts, 15);
}

#[tokio::test(start_paused = true)]
async fn expired_lease_is_lockable_again() {
    let h = common::harness();
    let trip_id = Uuid::new_v4();
    let seat_id = Uuid::new_v4();

    assert!(matches!(
        h.locks.acquire(trip_id, seat_id, Some(2)).await.unwrap(),
        AcquireOutcome::Held(_)
    ));
    assert!(matches!(
        h.locks.acquire(trip_id, seat_id, Some(2)).await.unwrap(),
        AcquireOutcome::Conflict
    ));

    tokio::time::sleep(Duration::from_secs(3)).await;

    assert!(matches!(
        h.locks.acquire(trip_id, seat_id, Some(2)).await.unwrap(),
        AcquireOutcome::Held(_)
    ));
}

#[tokio::test]
async fn mismatched_token_never_consumes_a_live_lease() {
    let h = common::harness();
    let trip_id = Uuid::new_v4();
    let seat_id = Uuid::new_v4();

    let lease = common::acquire_lease(&h, trip_id, seat_id).await;

    let stale = Uuid::new_v4().to_string();
    assert_eq!(
        h.locks.consume(trip_id, seat_id, &stale).await.unwrap(),
        ConsumeOutcome::Invalid
    );

    // The real holder can still consume: the stale attempt deleted nothing.
    assert_eq!(
        h.locks.consume(trip_id, seat_id, &lease.token).await.unwrap(),
        ConsumeOutcome::Consumed
    );
}

#[tokio::test]
async fn consume_is_single_use() {
    let h = common::harness();
    let trip_id = Uuid::new_v4();
    let seat_id = Uuid::new_v4();

    let lease = common::acquire_lease(&h, trip_id, seat_id).await;
    assert_eq!(
        h.locks.consume(trip_id, seat_id, &lease.token).await.unwrap(),
        ConsumeOutcome::Consumed
    );
    assert_eq!(
        h.locks.consume(trip_id, seat_id, &lease.token).await.unwrap(),
        ConsumeOutcome::Invalid
    );
}

#[tokio::test]
async fn administrative_release_is_unconditional_and_idempotent() {
    let h = common::harness();
    let trip_id = Uuid::new_v4();
    let seat_id = Uuid::new_v4();

    // Deleting an absent key is not an error.
    assert_eq!(
        h.locks.release(trip_id, seat_id, None).await.unwrap(),
        ReleaseOutcome::Released
    );

    common::acquire_lease(&h, trip_id, seat_id).await;
    assert_eq!(
        h.locks.release(trip_id, seat_id, None).await.unwrap(),
        ReleaseOutcome::Released
    );

    // The seat is lockable again after the forced release.
    assert!(matches!(
        h.locks.acquire(trip_id, seat_id, Some(60)).await.unwrap(),
        AcquireOutcome::Held(_)
    ));
}

#[tokio::test]
async fn voluntary_release_requires_the_matching_token() {
    let h = common::harness();
    let trip_id = Uuid::new_v4();
    let seat_id = Uuid::new_v4();

    let lease = common::acquire_lease(&h, trip_id, seat_id).await;

    assert_eq!(
        h.locks
            .release(trip_id, seat_id, Some("not-the-token"))
            .await
            .unwrap(),
        ReleaseOutcome::Invalid
    );
    assert_eq!(
        h.locks
            .release(trip_id, seat_id, Some(&lease.token))
            .await
            .unwrap(),
        ReleaseOutcome::Released
    );
}
