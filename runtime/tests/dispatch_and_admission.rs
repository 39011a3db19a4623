//! Integration tests for the notification dispatcher and the rate limiter
//! driven through the shared test doubles.

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect

use std::sync::Arc;
use std::time::Duration;
use tidy_core::{Admission, CancellationToken, Clock, DomainEvent, PartitionKey, RateLimitPolicy};
use tidy_runtime::{DispatchError, FixedWindowRateLimiter, NotificationDispatcher};
use tidy_testing::{CallLog, FailingHandler, ManualClock, RecordingHandler, test_clock};

// ============================================================================
// Test Fixtures
// ============================================================================

#[derive(Debug, Clone)]
struct ItemCompleted {
    item_id: u32,
}

impl DomainEvent for ItemCompleted {
    fn event_name(&self) -> &'static str {
        "ItemCompleted"
    }
}

#[derive(Debug, Clone)]
struct ItemDeleted;

impl DomainEvent for ItemDeleted {
    fn event_name(&self) -> &'static str {
        "ItemDeleted"
    }
}

fn manual_limiter(permits: u32) -> (FixedWindowRateLimiter, ManualClock) {
    tidy_testing::init_test_tracing();
    let clock = ManualClock::starting_at(test_clock().now());
    let limiter = FixedWindowRateLimiter::new(
        RateLimitPolicy::new(permits, Duration::from_secs(60)),
        Arc::new(clock.clone()),
    );
    (limiter, clock)
}

// ============================================================================
// Dispatcher
// ============================================================================

#[tokio::test]
async fn zero_handlers_publish_succeeds() {
    let log = CallLog::new();
    let dispatcher = NotificationDispatcher::builder()
        .register::<ItemDeleted, _>(RecordingHandler::new("deleted", &log))
        .build();

    dispatcher
        .publish(&ItemCompleted { item_id: 1 }, &CancellationToken::new())
        .await
        .unwrap();

    assert!(log.is_empty());
}

#[tokio::test]
async fn failing_first_handler_prevents_second() {
    let log = CallLog::new();
    let dispatcher = NotificationDispatcher::builder()
        .register::<ItemCompleted, _>(FailingHandler::new("first", &log))
        .register::<ItemCompleted, _>(RecordingHandler::new("second", &log))
        .build();

    let result = dispatcher
        .publish(&ItemCompleted { item_id: 7 }, &CancellationToken::new())
        .await;

    assert!(matches!(
        result,
        Err(DispatchError::HandlerFailed {
            event: "ItemCompleted",
            ..
        })
    ));
    assert_eq!(log.entries(), vec!["first:ItemCompleted"]);
}

#[tokio::test]
async fn dispatcher_is_shareable_across_tasks() {
    let log = CallLog::new();
    let dispatcher = Arc::new(
        NotificationDispatcher::builder()
            .register::<ItemCompleted, _>(RecordingHandler::new("log", &log))
            .build(),
    );

    let tasks: Vec<_> = (0..4)
        .map(|item_id| {
            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move {
                dispatcher
                    .publish(&ItemCompleted { item_id }, &CancellationToken::new())
                    .await
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(log.entries().len(), 4);
}

// ============================================================================
// Rate limiter
// ============================================================================

#[test]
fn hundred_and_first_request_is_rejected() {
    let (limiter, _clock) = manual_limiter(100);
    let key = PartitionKey::from("203.0.113.7");

    let admitted = (0..100).filter(|_| limiter.check(&key).is_allowed()).count();

    assert_eq!(admitted, 100);
    assert_eq!(
        limiter.check(&key),
        Admission::Rejected {
            retry_after: Duration::from_secs(60)
        }
    );
}

#[test]
fn request_after_window_starts_new_window() {
    let (limiter, clock) = manual_limiter(100);
    let key = PartitionKey::from("alice");

    for _ in 0..120 {
        limiter.check(&key);
    }
    clock.advance(Duration::from_secs(61));

    assert!(limiter.check(&key).is_allowed());
    assert_eq!(limiter.window_state(&key).unwrap().count, 1);
}

#[test]
fn other_partition_keeps_its_own_quota() {
    let (limiter, _clock) = manual_limiter(100);

    for _ in 0..100 {
        limiter.check(&PartitionKey::from("a"));
    }

    assert!(limiter.check(&PartitionKey::from("b")).is_allowed());
}
