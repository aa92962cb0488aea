//! Integration tests for entry submission and the review workflow.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, expect_error, get, get_as, island_admin, lottery_body, pending_entry, post,
    post_as, super_admin,
};
use islandboard_core::entry::ApprovalStatus;
use islandboard_db::EntryStore;
use serde_json::json;

#[tokio::test]
async fn created_entry_is_a_draft_until_submitted() {
    let t = common::build_test_app().await;
    let admin = island_admin();

    let response = post_as(
        &t.app,
        "/api/v1/entries",
        &admin,
        Some(json!({ "data_type": "lottery", "island_id": "jamaica", "body": lottery_body("Lotto") })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let entry = body_json(response).await["data"].clone();
    assert_eq!(entry["id"], "jamaica-lottery-lotto-2024-06-01");
    assert_eq!(entry["approval"]["status"], "draft");
    assert_eq!(entry["source"], "admin_entry");

    let queue = body_json(get_as(&t.app, "/api/v1/approvals/queue", &admin).await).await;
    assert_eq!(queue["data"]["total"], 0);

    post_as(&t.app, "/api/v1/entries/jamaica-lottery-lotto-2024-06-01/submit", &admin, None).await;
    let queue = body_json(get_as(&t.app, "/api/v1/approvals/queue", &admin).await).await;
    assert_eq!(queue["data"]["total"], 1);
    assert_eq!(queue["data"]["items"][0]["priority"], "high");
}

#[tokio::test]
async fn approval_makes_the_entry_live_data() {
    let t = common::build_test_app().await;
    let id = pending_entry(&t.app, "Lotto").await;

    let response = post_as(
        &t.app,
        &format!("/api/v1/approvals/{id}/approve"),
        &island_admin(),
        Some(json!({ "notes": "matches operator site" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let entry = body_json(response).await["data"].clone();
    assert_eq!(entry["approval"]["status"], "approved");
    assert_eq!(entry["approval"]["reviewed_by"], "reviewer@example.com");

    let island = body_json(get(&t.app, "/api/v1/islands/jamaica").await).await;
    assert_eq!(island["data"]["origin"], "live");
    assert_eq!(island["data"]["games"][0]["entry_id"], id.as_str());

    let audit = body_json(
        get_as(&t.app, &format!("/api/v1/audit?resource_id={id}"), &island_admin()).await,
    )
    .await;
    let records = audit["data"].as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1]["user_email"], "reviewer@example.com");
    assert_eq!(records[1]["ip_address"], "10.0.0.1");
}

#[tokio::test]
async fn approve_accepts_an_empty_body() {
    let t = common::build_test_app().await;
    let id = pending_entry(&t.app, "Lotto").await;

    let response = post_as(&t.app, &format!("/api/v1/approvals/{id}/approve"), &super_admin(), None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn reject_without_reason_is_an_invalid_transition() {
    let t = common::build_test_app().await;
    let id = pending_entry(&t.app, "Lotto").await;

    let response = post_as(
        &t.app,
        &format!("/api/v1/approvals/{id}/reject"),
        &island_admin(),
        Some(json!({ "notes": "  " })),
    )
    .await;
    let json = expect_error(response, StatusCode::CONFLICT, "INVALID_TRANSITION").await;
    assert_eq!(json["retryable"], false);

    let stored = t.store.get(&id).await.unwrap().unwrap();
    assert_eq!(stored.status(), ApprovalStatus::PendingApproval);
}

#[tokio::test]
async fn request_changes_uses_the_kebab_case_action() {
    let t = common::build_test_app().await;
    let id = pending_entry(&t.app, "Lotto").await;

    let response = post_as(
        &t.app,
        &format!("/api/v1/approvals/{id}/request-changes"),
        &island_admin(),
        Some(json!({ "notes": "draw number missing" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let entry = body_json(response).await["data"].clone();
    assert_eq!(entry["approval"]["status"], "requires_changes");
    assert_eq!(entry["approval"]["change_requests"], "draw number missing");
}

#[tokio::test]
async fn unknown_action_is_a_validation_error() {
    let t = common::build_test_app().await;
    let id = pending_entry(&t.app, "Lotto").await;

    let response = post_as(&t.app, &format!("/api/v1/approvals/{id}/promote"), &island_admin(), None).await;
    expect_error(response, StatusCode::BAD_REQUEST, "VALIDATION_ERROR").await;
}

#[tokio::test]
async fn missing_admin_identity_is_unauthorized() {
    let t = common::build_test_app().await;
    let response = post(&t.app, "/api/v1/approvals/anything/approve", None).await;
    expect_error(response, StatusCode::UNAUTHORIZED, "UNAUTHORIZED").await;
}

#[tokio::test]
async fn out_of_scope_admin_is_forbidden() {
    let t = common::build_test_app().await;
    let id = pending_entry(&t.app, "Lotto").await;
    let outsider = common::Admin {
        islands: "grenada",
        ..island_admin()
    };

    let response = post_as(&t.app, &format!("/api/v1/approvals/{id}/approve"), &outsider, None).await;
    expect_error(response, StatusCode::FORBIDDEN, "FORBIDDEN").await;

    let response = post_as(
        &t.app,
        "/api/v1/entries",
        &outsider,
        Some(json!({ "data_type": "lottery", "island_id": "jamaica", "body": lottery_body("Cash Pot") })),
    )
    .await;
    expect_error(response, StatusCode::FORBIDDEN, "FORBIDDEN").await;
}

#[tokio::test]
async fn unknown_entry_is_not_found() {
    let t = common::build_test_app().await;
    let response = get_as(&t.app, "/api/v1/entries/missing", &island_admin()).await;
    expect_error(response, StatusCode::NOT_FOUND, "NOT_FOUND").await;
}

#[tokio::test]
async fn invalid_records_are_rejected_before_storage() {
    let t = common::build_test_app().await;
    let admin = island_admin();

    let mut body = lottery_body("Lotto");
    body["winningNumbers"] = json!([]);
    let response = post_as(
        &t.app,
        "/api/v1/entries",
        &admin,
        Some(json!({ "data_type": "lottery", "island_id": "jamaica", "body": body })),
    )
    .await;
    expect_error(response, StatusCode::BAD_REQUEST, "VALIDATION_ERROR").await;

    let response = post_as(
        &t.app,
        "/api/v1/entries",
        &admin,
        Some(json!({ "data_type": "weather", "island_id": "jamaica", "body": {} })),
    )
    .await;
    expect_error(response, StatusCode::BAD_REQUEST, "VALIDATION_ERROR").await;

    let response = post_as(
        &t.app,
        "/api/v1/entries",
        &admin,
        Some(json!({ "data_type": "lottery", "island_id": "", "body": {} })),
    )
    .await;
    expect_error(response, StatusCode::BAD_REQUEST, "VALIDATION_ERROR").await;

    assert_eq!(t.store.entry_count().await, 0);
}

#[tokio::test]
async fn duplicate_entry_is_a_conflict() {
    let t = common::build_test_app().await;
    pending_entry(&t.app, "Lotto").await;

    let response = post_as(
        &t.app,
        "/api/v1/entries",
        &island_admin(),
        Some(json!({ "data_type": "lottery", "island_id": "jamaica", "body": lottery_body("Lotto") })),
    )
    .await;
    let json = expect_error(response, StatusCode::CONFLICT, "CONFLICT").await;
    assert_eq!(json["retryable"], true);
}

#[tokio::test]
async fn batch_with_a_stale_item_reports_multi_status() {
    let t = common::build_test_app().await;
    let a = pending_entry(&t.app, "Lotto").await;
    let b = pending_entry(&t.app, "Super Lotto").await;
    let c = pending_entry(&t.app, "Cash Pot").await;

    // Someone else already decided on `b`.
    let mut decided = t.store.get(&b).await.unwrap().unwrap();
    decided.approval.status = ApprovalStatus::Archived;
    t.store.put(&decided).await.unwrap();

    let response = post_as(
        &t.app,
        "/api/v1/approvals/batch",
        &island_admin(),
        Some(json!({ "ids": [a, b, c], "action": "approve" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::MULTI_STATUS);
    let report = body_json(response).await["data"].clone();
    assert_eq!(report["succeeded"], 2);
    assert_eq!(report["failed"], 1);
    assert_eq!(report["results"][1]["success"], false);
    assert_eq!(report["results"][1]["code"], "INVALID_TRANSITION");

    let queue = body_json(get_as(&t.app, "/api/v1/approvals/queue", &island_admin()).await).await;
    assert_eq!(queue["data"]["total"], 0);
}

#[tokio::test]
async fn fully_successful_batch_is_200() {
    let t = common::build_test_app().await;
    let a = pending_entry(&t.app, "Lotto").await;
    let b = pending_entry(&t.app, "Pick 3").await;

    let response = post_as(
        &t.app,
        "/api/v1/approvals/batch",
        &island_admin(),
        Some(json!({ "ids": [a, b], "action": "reject", "notes": "duplicate of operator feed" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["succeeded"], 2);
}

#[tokio::test]
async fn empty_batch_is_a_validation_error() {
    let t = common::build_test_app().await;
    let response = post_as(
        &t.app,
        "/api/v1/approvals/batch",
        &island_admin(),
        Some(json!({ "ids": [], "action": "approve" })),
    )
    .await;
    expect_error(response, StatusCode::BAD_REQUEST, "VALIDATION_ERROR").await;
}

#[tokio::test]
async fn queue_filters_and_stats() {
    let t = common::build_test_app().await;
    let a = pending_entry(&t.app, "Lotto").await;
    pending_entry(&t.app, "Cash Pot").await;
    let admin = island_admin();

    let found = body_json(get_as(&t.app, "/api/v1/approvals/queue?search=cash", &admin).await).await;
    assert_eq!(found["data"]["total"], 1);

    let response = get_as(&t.app, "/api/v1/approvals/queue?status=sideways", &admin).await;
    expect_error(response, StatusCode::BAD_REQUEST, "VALIDATION_ERROR").await;

    post_as(&t.app, &format!("/api/v1/approvals/{a}/approve"), &admin, None).await;
    let approved =
        body_json(get_as(&t.app, "/api/v1/approvals/queue?status=approved", &admin).await).await;
    assert_eq!(approved["data"]["total"], 1);
    assert_eq!(approved["data"]["items"][0]["id"], a.as_str());

    let stats = body_json(get_as(&t.app, "/api/v1/approvals/stats", &admin).await).await;
    assert_eq!(stats["data"]["pending_count"], 1);
    assert_eq!(stats["data"]["approved_today"], 1);
    assert_eq!(stats["data"]["by_admin"]["reviewer@example.com"], 1);
}

#[tokio::test]
async fn manual_entry_is_kept_when_forwarding_fails() {
    let t = common::build_test_app().await;
    let mut record = lottery_body("Lotto");
    record["island_id"] = json!("jamaica");

    let response = post_as(&t.app, "/api/v1/lottery/manual-entry", &island_admin(), Some(record)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let data = body_json(response).await["data"].clone();
    assert_eq!(data["forwarded"], false);
    assert_eq!(data["entry"]["source"], "manual");
    assert_eq!(data["entry"]["approval"]["status"], "draft");
    assert_eq!(t.store.entry_count().await, 1);
}
