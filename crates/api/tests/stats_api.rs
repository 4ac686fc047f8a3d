//! Integration tests for the `/stats` resource.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use common::{admin_token, body_json, build_test_app, error_codes, get, post_json, user_token};
use locker_core::activity::ActivityKind;
use locker_core::models::{LeaseMode, NewActivityLog, NewTransaction};
use locker_core::store::memory::MemoryLeaseStore;
use locker_core::store::LeaseStore;
use locker_core::types::{epoch_now, timestamp_from_epoch, DbId};
use serde_json::json;

const OVERDUE: &str = "/api/v1/stats/overdue-threshold";
const RENTAL_SHARES: &str = "/api/v1/stats/rental-shares";

/// Record an authorized `rent_auth` entry against a finished two-hour session.
async fn finished_session(store: &MemoryLeaseStore, user_id: DbId, area_num: i32) -> DbId {
    let unit = store.insert_unit(1, area_num).await;
    let event = store
        .occupy(unit.id, user_id, LeaseMode::Occupied, 1_000, Some(1_000 + 7_200))
        .await;
    let log = store
        .insert_activity_log(&NewActivityLog {
            kind: ActivityKind::RentAuth,
            authorized: true,
            user_id,
            unit_id: unit.id,
            lease_event_id: Some(event.id),
            transaction_type: None,
            created_at: timestamp_from_epoch(1_000),
        })
        .await
        .unwrap();
    store.insert_invoice(log.id, 2.0, 50.0).await;
    event.id
}

// ---------------------------------------------------------------------------
// Overdue
// ---------------------------------------------------------------------------

#[tokio::test]
async fn overdue_lists_leases_past_due() {
    let store = Arc::new(MemoryLeaseStore::new());
    let unit = store.insert_unit(12, 1).await;
    let user = store.insert_user(2019001, "maria", "santos", "CS").await;
    let now = epoch_now();
    store
        .occupy(unit.id, user.id, LeaseMode::Occupied, now - 9_000, Some(now - 7_200))
        .await;

    let response = get(
        build_test_app(store.clone()),
        &format!("{OVERDUE}?over_threshold=false"),
        Some(&admin_token(1)),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let entries = json["data"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["unit_num"], 12);
    assert_eq!(entries[0]["suppressed_name"], "Maria S.");
    let time_since = entries[0]["time_since"].as_i64().unwrap();
    assert!((7_200..=7_210).contains(&time_since), "time_since was {time_since}");

    // Two hours is well inside the grace period.
    let response = get(
        build_test_app(store),
        &format!("{OVERDUE}?over_threshold=true"),
        Some(&admin_token(1)),
    )
    .await;
    assert_eq!(body_json(response).await["data"], json!([]));
}

#[tokio::test]
async fn overdue_requires_admin() {
    let store = Arc::new(MemoryLeaseStore::new());

    let response = get(build_test_app(store), OVERDUE, Some(&user_token(8))).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_codes(&body_json(response).await), vec!["forbidden"]);
}

#[tokio::test]
async fn overdue_requires_the_threshold_flag() {
    let store = Arc::new(MemoryLeaseStore::new());

    let response = get(build_test_app(store), OVERDUE, Some(&admin_token(1))).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(error_codes(&json), vec!["missing_parameter"]);
    assert_eq!(json["error_msg"][0], "Over threshold parameter is required.");
}

#[tokio::test]
async fn overdue_rejects_unknown_flag() {
    let store = Arc::new(MemoryLeaseStore::new());

    let response = get(
        build_test_app(store),
        &format!("{OVERDUE}?over_threshold=maybe"),
        Some(&admin_token(1)),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_codes(&body_json(response).await), vec!["invalid_request"]);
}

// ---------------------------------------------------------------------------
// Rental shares
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rental_shares_roll_up_invoices_and_usage() {
    let store = Arc::new(MemoryLeaseStore::new());
    let cs = store.insert_user(1, "ana", "reyes", "CS").await;
    let eng = store.insert_user(2, "ben", "cruz", "ENG").await;
    let first = finished_session(&store, cs.id, 3).await;
    finished_session(&store, eng.id, 4).await;

    let response = post_json(
        build_test_app(store.clone()),
        RENTAL_SHARES,
        &admin_token(1),
        json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let data = &json["data"];
    assert_eq!(data["service_stats"]["rent"]["num"], 2);
    assert_eq!(data["service_stats"]["rent"]["usage_hours"], 4.0);
    assert_eq!(data["college_shares"]["CS"]["sessions"], 1);
    assert_eq!(data["college_shares"]["CS"]["share"], 0.5);
    assert_eq!(data["area_stats"]["3"]["total_session_hours"], 2.0);

    let response = post_json(
        build_test_app(store),
        RENTAL_SHARES,
        &admin_token(1),
        json!({ "session_ids": [first] }),
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["service_stats"]["rent"]["num"], 1);
    assert_eq!(json["data"]["college_shares"]["CS"]["share"], 1.0);
    assert!(json["data"]["college_shares"].get("ENG").is_none());
}

#[tokio::test]
async fn rental_shares_reject_malformed_session_ids() {
    let store = Arc::new(MemoryLeaseStore::new());

    let response = post_json(
        build_test_app(store),
        RENTAL_SHARES,
        &admin_token(1),
        json!({ "session_ids": ["x", 5, "-2"] }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        error_codes(&body_json(response).await),
        vec!["invalid_identifier", "invalid_identifier"]
    );
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

async fn seed_transactions(store: &MemoryLeaseStore) {
    let cs = store.insert_user(1, "ana", "reyes", "CS").await;
    let eng = store.insert_user(2, "ben", "cruz", "ENG").await;
    for (user_id, amount, at) in [(cs.id, 10.0, 100), (cs.id, 20.0, 200), (eng.id, 30.0, 300)] {
        store
            .insert_transaction(&NewTransaction {
                kind: ActivityKind::RentAuth,
                amount,
                user_id,
                activity_log_id: 1,
                created_at: timestamp_from_epoch(at),
            })
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn transaction_summary_pages_the_range() {
    let store = Arc::new(MemoryLeaseStore::new());
    seed_transactions(&store).await;

    let response = get(
        build_test_app(store.clone()),
        "/api/v1/stats/transaction/summary?start=0&end=250",
        Some(&admin_token(1)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["transactions"].as_array().unwrap().len(), 2);

    let response = get(
        build_test_app(store),
        "/api/v1/stats/transaction/summary?start=0&end=1000&page_cursor=2&page_size=2",
        Some(&admin_token(1)),
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["page_cursor"], 2);
    let page = json["data"]["transactions"].as_array().unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0]["amount"], 30.0);
}

#[tokio::test]
async fn transaction_summary_requires_a_range() {
    let store = Arc::new(MemoryLeaseStore::new());

    let response = get(
        build_test_app(store),
        "/api/v1/stats/transaction/summary?end=soon&page_size=-1",
        Some(&admin_token(1)),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        error_codes(&body_json(response).await),
        vec!["missing_parameter", "invalid_identifier", "invalid_identifier"]
    );
}

#[tokio::test]
async fn transaction_summary_rejects_times_past_the_calendar() {
    let store = Arc::new(MemoryLeaseStore::new());
    seed_transactions(&store).await;

    let response = get(
        build_test_app(store),
        "/api/v1/stats/transaction/summary?start=0&end=9223372036854775807",
        Some(&admin_token(1)),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(error_codes(&json), vec!["invalid_identifier"]);
    assert!(json["error_msg"][0].as_str().unwrap().contains("End Time"));
}

#[tokio::test]
async fn college_shares_split_revenue() {
    let store = Arc::new(MemoryLeaseStore::new());
    seed_transactions(&store).await;

    let response = get(
        build_test_app(store),
        "/api/v1/stats/transaction/college?start=0&end=1000",
        Some(&admin_token(1)),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["CS"]["amount"], 30.0);
    assert_eq!(json["data"]["CS"]["transactions"], 2);
    assert_eq!(json["data"]["ENG"]["amount"], 30.0);
    let share = json["data"]["ENG"]["share"].as_f64().unwrap();
    assert!((share - 1.0 / 3.0).abs() < 1e-9);
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn users_see_only_their_own_sessions() {
    let store = Arc::new(MemoryLeaseStore::new());
    let unit = store.insert_unit(1, 1).await;
    store.occupy(unit.id, 8, LeaseMode::Occupied, 100, Some(200)).await;
    store.occupy(unit.id, 8, LeaseMode::Occupied, 300, Some(400)).await;
    store.occupy(unit.id, 9, LeaseMode::Occupied, 500, Some(600)).await;

    let response = get(
        build_test_app(store),
        "/api/v1/stats/user/sessions",
        Some(&user_token(8)),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let starts: Vec<_> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["start_time"].as_i64().unwrap())
        .collect();
    assert_eq!(starts, vec![300, 100]);
}
