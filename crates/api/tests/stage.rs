mod common;

use axum::http::{Method, StatusCode};
use chrono::{DateTime, Duration, Utc};
use common::PgTestContext;
use serde_json::json;
use uuid::Uuid;

fn parse_ts(value: &serde_json::Value) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value.as_str().unwrap())
        .unwrap()
        .with_timezone(&Utc)
}

#[tokio::test]
async fn fresh_token_moves_stage_and_records_one_activity() {
    let Some(ctx) = PgTestContext::new_seeded().await else {
        return;
    };
    let deal = ctx.seeded.deal_titled("Hanbit platform license").unwrap();
    let token = deal.updated_at.with_timezone(&Utc);

    let (status, body) = ctx
        .request(
            Method::PATCH,
            &format!("/deals/{}/stage", deal.id),
            Some(json!({ "stage": "proposal", "updatedAt": token.to_rfc3339() })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["stage"], "proposal");
    assert!(parse_ts(&body["updatedAt"]) > token, "updatedAt must advance");

    let (status, activities) = ctx
        .request(
            Method::GET,
            &format!("/activities?dealId={}", deal.id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let rows = activities["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1, "exactly one audit activity");
    assert_eq!(rows[0]["type"], "note");
    let title = rows[0]["title"].as_str().unwrap();
    assert!(title.contains("qualified"), "title: {title}");
    assert!(title.contains("proposal"), "title: {title}");
    assert_eq!(rows[0]["dealId"].as_str().unwrap(), deal.id.to_string());

    ctx.cleanup().await;
}

#[tokio::test]
async fn token_within_tolerance_still_matches() {
    let Some(ctx) = PgTestContext::new_seeded().await else {
        return;
    };
    let deal = ctx.seeded.deal_titled("Daesung annual contract").unwrap();
    let skewed = deal.updated_at.with_timezone(&Utc) + Duration::milliseconds(500);

    let (status, body) = ctx
        .request(
            Method::PATCH,
            &format!("/deals/{}/stage", deal.id),
            Some(json!({ "stage": "negotiation", "updatedAt": skewed.to_rfc3339() })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["stage"], "negotiation");

    ctx.cleanup().await;
}

#[tokio::test]
async fn stale_token_conflicts_and_leaves_deal_untouched() {
    let Some(ctx) = PgTestContext::new_seeded().await else {
        return;
    };
    let deal = ctx.seeded.deal_titled("Hanbit support renewal").unwrap();
    let stale = deal.updated_at.with_timezone(&Utc) - Duration::seconds(30);

    let (status, body) = ctx
        .request(
            Method::PATCH,
            &format!("/deals/{}/stage", deal.id),
            Some(json!({ "stage": "closed_won", "updatedAt": stale.to_rfc3339() })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("modified by another user"), "got: {message}");
    assert!(message.contains("refresh"), "got: {message}");

    // The failed call must not have written anything.
    let (status, after) = ctx
        .request(Method::GET, &format!("/deals/{}", deal.id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(after["stage"], "negotiation");
    assert_eq!(
        parse_ts(&after["updatedAt"]),
        deal.updated_at.with_timezone(&Utc)
    );

    let (_, activities) = ctx
        .request(
            Method::GET,
            &format!("/activities?dealId={}", deal.id),
            None,
        )
        .await;
    assert!(activities["data"].as_array().unwrap().is_empty());

    ctx.cleanup().await;
}

#[tokio::test]
async fn missing_deal_is_404() {
    let Some(ctx) = PgTestContext::new_seeded().await else {
        return;
    };
    let (status, body) = ctx
        .request(
            Method::PATCH,
            &format!("/deals/{}/stage", Uuid::new_v4()),
            Some(json!({ "stage": "qualified", "updatedAt": Utc::now().to_rfc3339() })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Deal not found");

    ctx.cleanup().await;
}

#[tokio::test]
async fn unknown_stage_is_rejected_before_any_store_access() {
    let Some(ctx) = PgTestContext::new_seeded().await else {
        return;
    };
    let deal = ctx.seeded.deal_titled("Inbound lead").unwrap();
    let (status, _) = ctx
        .request(
            Method::PATCH,
            &format!("/deals/{}/stage", deal.id),
            Some(json!({ "stage": "archived", "updatedAt": Utc::now().to_rfc3339() })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = ctx
        .request(
            Method::PATCH,
            &format!("/deals/{}/stage", deal.id),
            Some(json!({ "stage": "qualified" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "missing updatedAt");

    ctx.cleanup().await;
}

#[tokio::test]
async fn stale_token_loses_after_a_successful_move() {
    let Some(ctx) = PgTestContext::new_seeded().await else {
        return;
    };
    let deal = ctx.seeded.deal_titled("Hanbit platform license").unwrap();
    let first_token = deal.updated_at.with_timezone(&Utc);

    let (status, body) = ctx
        .request(
            Method::PATCH,
            &format!("/deals/{}/stage", deal.id),
            Some(json!({ "stage": "proposal", "updatedAt": first_token.to_rfc3339() })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let second_token = parse_ts(&body["updatedAt"]);

    // Re-using the pre-move token simulates the losing writer of a race.
    let (status, _) = ctx
        .request(
            Method::PATCH,
            &format!("/deals/{}/stage", deal.id),
            Some(json!({ "stage": "closed_lost", "updatedAt": first_token.to_rfc3339() })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // The winner's token keeps working.
    let (status, body) = ctx
        .request(
            Method::PATCH,
            &format!("/deals/{}/stage", deal.id),
            Some(json!({ "stage": "negotiation", "updatedAt": second_token.to_rfc3339() })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stage"], "negotiation");
    assert!(parse_ts(&body["updatedAt"]) > second_token);

    ctx.cleanup().await;
}
