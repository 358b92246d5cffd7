//! Request lifecycle scenarios through the services

use std::collections::BTreeMap;

use chrono::Duration;
use tokio_test::{assert_err, assert_ok};

use hwlab_server::{
    models::{policy::LendingPolicy, request::RequestState},
    AppError, LendingError,
};

use crate::common::{race_for_pick_up, race_for_units, Lab, HACKER, ORGANIZER};

#[tokio::test]
async fn test_counts_stay_consistent() {
    let lab = Lab::new(LendingPolicy::default());
    let hw = lab.hardware("Raspberry Pi", 3).await;

    let first = lab.services.inventory.request(hw.id, HACKER).await.unwrap().unwrap();
    lab.services.inventory.request(hw.id, HACKER + 1).await.unwrap().unwrap();
    assert_ok!(lab.services.requests.pick_up(first.id, ORGANIZER).await);

    let summary = lab.services.inventory.get(hw.id).await.unwrap();
    assert_eq!(summary.active_count, 1);
    assert_eq!(summary.available_count, 1);
    assert_eq!(summary.remaining_count, 2);
    assert!(summary.active_count <= summary.total_count as i64);
}

#[tokio::test]
async fn test_full_inventory_refuses_allocation() {
    let lab = Lab::new(LendingPolicy::default());
    let hw = lab.hardware("Oculus Rift", 2).await;

    assert!(lab.services.inventory.request(hw.id, 1).await.unwrap().is_some());
    assert!(lab.services.inventory.request(hw.id, 2).await.unwrap().is_some());
    assert_eq!(lab.services.inventory.get(hw.id).await.unwrap().available_count, 0);

    assert!(lab.services.inventory.request(hw.id, 3).await.unwrap().is_none());
    assert!(lab.services.requests.pending_for(3).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_expiry_frees_units() {
    let lab = Lab::new(LendingPolicy::new(30, true));
    let hw = lab.hardware("Myo", 1).await;

    let stale = lab.services.inventory.request(hw.id, HACKER).await.unwrap().unwrap();
    assert!(lab.services.inventory.request(hw.id, HACKER + 1).await.unwrap().is_none());

    lab.clock.advance(Duration::minutes(31));
    assert_eq!(lab.services.inventory.get(hw.id).await.unwrap().available_count, 1);

    let err = assert_err!(lab.services.requests.pick_up(stale.id, ORGANIZER).await);
    assert!(matches!(err, AppError::Lending(LendingError::Expired)));

    let fresh = lab.services.inventory.request(hw.id, HACKER + 1).await.unwrap();
    assert!(fresh.is_some());
}

#[tokio::test]
async fn test_pick_up_twice() {
    let lab = Lab::new(LendingPolicy::default());
    let hw = lab.hardware("Arduino", 4).await;
    let request = lab.services.inventory.request(hw.id, HACKER).await.unwrap().unwrap();

    assert_ok!(lab.services.requests.pick_up(request.id, ORGANIZER).await);
    let err = assert_err!(lab.services.requests.pick_up(request.id, ORGANIZER).await);
    assert!(matches!(err, AppError::Lending(LendingError::AlreadyPickedUp)));
}

#[tokio::test]
async fn test_active_overall_until_returned() {
    let lab = Lab::new(LendingPolicy::default());
    let hw = lab.hardware("Leap Motion", 1).await;
    let request = lab.services.inventory.request(hw.id, HACKER).await.unwrap().unwrap();

    lab.clock.advance(Duration::minutes(10));
    lab.services.requests.pick_up(request.id, ORGANIZER).await.unwrap();

    // long after the window, an active request is neither pending nor expired
    lab.clock.advance(Duration::hours(5));
    let active = lab.services.requests.active_overall().await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].state, RequestState::Active);
    assert_eq!(active[0].remaining_seconds, 0);

    let returned = lab.services.requests.return_request(request.id, ORGANIZER).await.unwrap();
    assert!(returned.return_time >= returned.pickup_time);
    assert!(lab.services.requests.active_overall().await.unwrap().is_empty());

    let err = assert_err!(lab.services.requests.return_request(request.id, ORGANIZER).await);
    assert!(matches!(err, AppError::Lending(LendingError::AlreadyReturned)));

    assert_eq!(lab.services.inventory.get(hw.id).await.unwrap().available_count, 1);
}

#[tokio::test]
async fn test_cancel_pending_and_expired() {
    let lab = Lab::new(LendingPolicy::new(30, true));
    let hw = lab.hardware("Arduino", 4).await;

    let kept = lab.services.inventory.request(hw.id, HACKER).await.unwrap().unwrap();
    assert_ok!(lab.services.requests.cancel(kept.id, HACKER).await);
    assert!(lab.services.requests.historic_for(HACKER).await.unwrap().is_empty());

    let late = lab.services.inventory.request(hw.id, HACKER).await.unwrap().unwrap();
    lab.clock.advance(Duration::minutes(31));
    let err = assert_err!(lab.services.requests.cancel(late.id, HACKER).await);
    assert!(matches!(err, AppError::Lending(LendingError::Expired)));
}

#[tokio::test]
async fn test_bulk_return_reports_failures_by_type() {
    let lab = Lab::new(LendingPolicy::default());
    let arduino = lab.hardware("Arduino", 2).await;
    let leap = lab.hardware("Leap Motion", 2).await;

    let out = lab.services.inventory.request(arduino.id, HACKER).await.unwrap().unwrap();
    let waiting = lab.services.inventory.request(leap.id, HACKER).await.unwrap().unwrap();
    lab.services.requests.pick_up(out.id, ORGANIZER).await.unwrap();

    let outcome = lab
        .services
        .requests
        .return_many(&[out.id, waiting.id], ORGANIZER)
        .await
        .unwrap();

    assert_eq!(outcome.processed.len(), 1);
    assert_eq!(outcome.processed[0].returned_to, Some(ORGANIZER));
    assert_eq!(
        outcome.failures.get("Leap Motion").map(String::as_str),
        Some("Request has not been picked up yet")
    );
}

#[tokio::test]
async fn test_request_amounts_and_summary() {
    let lab = Lab::new(LendingPolicy::default());
    let arduino = lab.hardware("Arduino", 3).await;
    let myo = lab.hardware("Myo", 1).await;

    let amounts = BTreeMap::from([(arduino.id, 2), (myo.id, 2)]);
    let outcome = lab.services.inventory.request_amounts(HACKER, &amounts).await.unwrap();
    assert_eq!(outcome.created.len(), 3);
    assert_eq!(outcome.failures.get("Myo"), Some(&1));

    let summary = lab.services.requests.summary_for(HACKER).await.unwrap();
    assert_eq!(summary.pending, 3);
    assert_eq!(summary.active, 0);
}

#[tokio::test]
async fn test_requests_closed_still_allows_desk_work() {
    let open = Lab::new(LendingPolicy::default());
    let hw = open.hardware("Arduino", 2).await;
    let request = open.services.inventory.request(hw.id, HACKER).await.unwrap().unwrap();

    let closed = Lab::new(LendingPolicy::new(30, false));
    let hw_closed = closed.hardware("Arduino", 2).await;
    let err = assert_err!(closed.services.inventory.request(hw_closed.id, HACKER).await);
    assert!(matches!(err, AppError::Lending(LendingError::RequestsClosed)));

    assert_ok!(open.services.requests.pick_up(request.id, ORGANIZER).await);
}

#[tokio::test]
async fn test_deleting_type_removes_requests() {
    let lab = Lab::new(LendingPolicy::default());
    let hw = lab.hardware("Arduino", 2).await;
    let request = lab.services.inventory.request(hw.id, HACKER).await.unwrap().unwrap();

    lab.services.inventory.delete(hw.id).await.unwrap();
    let err = assert_err!(lab.services.requests.pick_up(request.id, ORGANIZER).await);
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_allocate_last_unit_once() {
    let lab = Lab::new(LendingPolicy::default());
    let hw = lab.hardware("Oculus Rift", 1).await;

    assert_eq!(race_for_units(&lab.services, hw.id, 16).await, 1);

    let summary = lab.services.inventory.get(hw.id).await.unwrap();
    assert_eq!(summary.available_count, 0);
    assert_eq!(summary.active_count, 0);

    let mut pending = 0;
    for offset in 0..16 {
        pending += lab.services.requests.summary_for(HACKER + offset).await.unwrap().pending;
    }
    assert_eq!(pending, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_pick_ups_never_exceed_total() {
    let lab = Lab::new(LendingPolicy::default());

    let (type_id, picked_up) = race_for_pick_up(&lab.services, "Myo", 8).await;
    assert_eq!(picked_up, 1);

    let summary = lab.services.inventory.get(type_id).await.unwrap();
    assert_eq!(summary.active_count, 1);
    assert_eq!(summary.remaining_count, 0);
}
