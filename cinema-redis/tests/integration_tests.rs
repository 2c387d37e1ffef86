//! Integration tests for `RedisFastIndex` using testcontainers.
//!
//! These run the real `RESERVE_SCRIPT`/`CANCEL_SCRIPT` Lua scripts
//! against a real Redis instance, which the in-memory `AtomicClaim`
//! double in `cinema-testing` cannot exercise.
//!
//! # Requirements
//!
//! Docker must be running to execute these tests. The tests will
//! automatically start a Redis 7 container using testcontainers.

#![allow(clippy::expect_used)] // Test code uses expect for clear failure messages

use cinema_core::{AtomicClaim, AtomicRelease, ClaimOutcome, ReadMembers, SeatCoord};
use cinema_redis::{cinema_key, RedisFastIndex};
use testcontainers::{runners::AsyncRunner, GenericImage, ImageExt};

/// Helper to start a Redis container and return a connected fast index.
///
/// # Panics
/// Panics if container setup fails (test environment issue).
async fn setup_index() -> RedisFastIndex {
    let redis_image = GenericImage::new("redis", "7").with_exposed_port(6379.into());
    let container = redis_image.start().await.expect("failed to start redis container");
    let port = container.get_host_port_ipv4(6379).await.expect("failed to get redis port");

    let redis_url = format!("redis://127.0.0.1:{port}");
    RedisFastIndex::new(&redis_url).await.expect("failed to connect to test redis")
}

#[tokio::test]
async fn claim_then_claim_again_conflicts() {
    let index = setup_index().await;
    let key = cinema_key(1);

    let outcome = index.claim(&key, 0, &[SeatCoord::new(0, 0)]).await.expect("first claim");
    assert!(matches!(outcome, ClaimOutcome::Claimed));

    let outcome = index.claim(&key, 0, &[SeatCoord::new(0, 0)]).await.expect("second claim");
    assert!(matches!(outcome, ClaimOutcome::Conflict(_)), "got: {outcome:?}");
}

#[tokio::test]
async fn duplicate_seat_in_same_batch_conflicts_with_zero_min_distance() {
    let index = setup_index().await;
    let key = cinema_key(2);

    let outcome = index
        .claim(&key, 0, &[SeatCoord::new(1, 1), SeatCoord::new(1, 1)])
        .await
        .expect("claim with duplicate seat");
    assert!(matches!(outcome, ClaimOutcome::Conflict(_)), "got: {outcome:?}");
}

#[tokio::test]
async fn duplicate_seat_in_same_batch_violates_positive_min_distance() {
    let index = setup_index().await;
    let key = cinema_key(3);

    let outcome = index
        .claim(&key, 2, &[SeatCoord::new(4, 4), SeatCoord::new(4, 4)])
        .await
        .expect("claim with duplicate seat under min_distance");
    assert!(matches!(outcome, ClaimOutcome::DistanceViolation(_)), "got: {outcome:?}");
}

#[tokio::test]
async fn too_close_batch_is_rejected_and_nothing_is_claimed() {
    let index = setup_index().await;
    let key = cinema_key(4);

    let outcome = index
        .claim(&key, 3, &[SeatCoord::new(0, 0), SeatCoord::new(0, 1)])
        .await
        .expect("claim");
    assert!(matches!(outcome, ClaimOutcome::DistanceViolation(_)), "got: {outcome:?}");

    let members = index.members(&key).await.expect("members");
    assert!(members.is_empty(), "a rejected batch must not partially claim");
}

#[tokio::test]
async fn release_then_reclaim_succeeds() {
    let index = setup_index().await;
    let key = cinema_key(5);

    index.claim(&key, 0, &[SeatCoord::new(2, 2)]).await.expect("claim");
    index.release(&key, &[SeatCoord::new(2, 2)]).await.expect("release");

    let outcome = index.claim(&key, 0, &[SeatCoord::new(2, 2)]).await.expect("reclaim");
    assert!(matches!(outcome, ClaimOutcome::Claimed));
}
