mod common;

use axum::http::{Method, StatusCode};
use common::PgTestContext;
use serde_json::json;

#[tokio::test]
async fn deal_lifecycle_via_rest() {
    let Some(ctx) = PgTestContext::new_seeded().await else {
        return;
    };
    let company = ctx.seeded.company_named("Hanbit Systems").unwrap();

    let (status, created) = ctx
        .request(
            Method::POST,
            "/deals",
            Some(json!({
                "title": "New expansion",
                "amount": 9_000_000,
                "stage": "lead",
                "companyId": company.id,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "body: {created}");
    assert_eq!(created["stage"], "lead");
    assert_eq!(created["amount"], 9_000_000);
    let deal_id = created["id"].as_str().unwrap().to_string();

    let (status, fetched) = ctx
        .request(Method::GET, &format!("/deals/{deal_id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["title"], "New expansion");

    // Full update that also changes the stage: last-write-wins, but still
    // audited.
    let (status, updated) = ctx
        .request(
            Method::PUT,
            &format!("/deals/{deal_id}"),
            Some(json!({
                "title": "New expansion",
                "amount": 9_500_000,
                "stage": "qualified",
                "companyId": company.id,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "body: {updated}");
    assert_eq!(updated["stage"], "qualified");

    let (_, activities) = ctx
        .request(Method::GET, &format!("/activities?dealId={deal_id}"), None)
        .await;
    let rows = activities["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    let title = rows[0]["title"].as_str().unwrap();
    assert!(title.contains("lead") && title.contains("qualified"), "title: {title}");

    let (status, _) = ctx
        .request(Method::DELETE, &format!("/deals/{deal_id}"), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = ctx
        .request(Method::GET, &format!("/deals/{deal_id}"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    ctx.cleanup().await;
}

#[tokio::test]
async fn deal_validation_rejects_bad_input() {
    let Some(ctx) = PgTestContext::new_seeded().await else {
        return;
    };

    let (status, body) = ctx
        .request(Method::POST, "/deals", Some(json!({ "title": "   " })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation failed");

    let (status, _) = ctx
        .request(
            Method::POST,
            "/deals",
            Some(json!({ "title": "Negative", "amount": -1 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    ctx.cleanup().await;
}

#[tokio::test]
async fn summary_reports_every_stage() {
    let Some(ctx) = PgTestContext::new_seeded().await else {
        return;
    };
    let (status, body) = ctx.request(Method::GET, "/deals/summary", None).await;
    assert_eq!(status, StatusCode::OK);
    let stages = body["stages"].as_object().unwrap();
    assert_eq!(stages.len(), 6);
    assert_eq!(stages["qualified"]["count"], 1);
    assert_eq!(stages["qualified"]["total"], 48_000_000);
    assert_eq!(stages["closed_lost"]["count"], 0);

    ctx.cleanup().await;
}

#[tokio::test]
async fn deal_list_filters_by_stage() {
    let Some(ctx) = PgTestContext::new_seeded().await else {
        return;
    };
    let (status, body) = ctx
        .request(Method::GET, "/deals?stage=proposal&page=1&limit=10", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["title"], "Daesung annual contract");
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["pagination"]["hasNext"], false);

    ctx.cleanup().await;
}

#[tokio::test]
async fn search_spans_contacts_companies_and_deals() {
    let Some(ctx) = PgTestContext::new_seeded().await else {
        return;
    };
    let (status, body) = ctx.request(Method::GET, "/search?q=Hanbit", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["companies"].as_array().unwrap().len(), 1);
    assert!(body["deals"].as_array().unwrap().len() >= 2);

    // Empty query short-circuits to empty results.
    let (status, body) = ctx.request(Method::GET, "/search", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["contacts"].as_array().unwrap().is_empty());
    assert!(body["companies"].as_array().unwrap().is_empty());

    ctx.cleanup().await;
}

#[tokio::test]
async fn tag_assignment_flow() {
    let Some(ctx) = PgTestContext::new_seeded().await else {
        return;
    };
    let deal = ctx.seeded.deal_titled("Daesung pilot").unwrap();
    let tag = ctx.seeded.tag_named("vip").unwrap();

    let (status, _) = ctx
        .request(
            Method::POST,
            &format!("/deals/{}/tags", deal.id),
            Some(json!({ "tagId": tag.id })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = ctx
        .request(
            Method::POST,
            &format!("/deals/{}/tags", deal.id),
            Some(json!({ "tagId": tag.id })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "double assignment");

    let (_, listed) = ctx
        .request(Method::GET, &format!("/deals/{}/tags", deal.id), None)
        .await;
    let rows = listed["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], "vip");

    let (status, _) = ctx
        .request(
            Method::DELETE,
            &format!("/deals/{}/tags/{}", deal.id, tag.id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    ctx.cleanup().await;
}

#[tokio::test]
async fn duplicate_tag_name_conflicts() {
    let Some(ctx) = PgTestContext::new_seeded().await else {
        return;
    };
    let (status, _) = ctx
        .request(
            Method::POST,
            "/tags",
            Some(json!({ "name": "vip", "color": "#123ABC" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = ctx
        .request(
            Method::POST,
            "/tags",
            Some(json!({ "name": "hot", "color": "red" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "bad hex color");

    ctx.cleanup().await;
}

#[tokio::test]
async fn task_complete_toggles() {
    let Some(ctx) = PgTestContext::new_seeded().await else {
        return;
    };
    let (_, listed) = ctx
        .request(Method::GET, "/tasks?isCompleted=false", None)
        .await;
    let task_id = listed["data"][0]["id"].as_str().unwrap().to_string();

    let (status, body) = ctx
        .request(Method::PATCH, &format!("/tasks/{task_id}/complete"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isCompleted"], true);

    let (_, body) = ctx
        .request(Method::PATCH, &format!("/tasks/{task_id}/complete"), None)
        .await;
    assert_eq!(body["isCompleted"], false, "second call re-opens");

    ctx.cleanup().await;
}

#[tokio::test]
async fn activity_requires_a_parent() {
    let Some(ctx) = PgTestContext::new_seeded().await else {
        return;
    };
    let (status, body) = ctx
        .request(
            Method::POST,
            "/activities",
            Some(json!({ "type": "note", "title": "orphan" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation failed");

    ctx.cleanup().await;
}

#[tokio::test]
async fn deleting_a_deal_cascades_to_activities_and_tasks() {
    let Some(ctx) = PgTestContext::new_seeded().await else {
        return;
    };
    let deal = ctx.seeded.deal_titled("Daesung annual contract").unwrap();

    let (status, _) = ctx
        .request(
            Method::POST,
            "/activities",
            Some(json!({ "type": "note", "title": "call notes", "dealId": deal.id })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = ctx
        .request(Method::DELETE, &format!("/deals/{}", deal.id), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, activities) = ctx
        .request(
            Method::GET,
            &format!("/activities?dealId={}", deal.id),
            None,
        )
        .await;
    assert!(activities["data"].as_array().unwrap().is_empty());
    let (_, tasks) = ctx
        .request(Method::GET, &format!("/tasks?dealId={}", deal.id), None)
        .await;
    assert!(tasks["data"].as_array().unwrap().is_empty());

    ctx.cleanup().await;
}

#[tokio::test]
async fn stats_aggregate_the_pipeline() {
    let Some(ctx) = PgTestContext::new_seeded().await else {
        return;
    };
    let (status, body) = ctx.request(Method::GET, "/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["companies"], 2);
    assert_eq!(body["contacts"], 2);
    assert_eq!(body["deals"]["total"]["count"], 5);
    assert_eq!(body["deals"]["active"]["count"], 4);
    assert_eq!(body["deals"]["byStage"]["closed_won"]["count"], 1);
    assert_eq!(body["pendingTasks"], 1);

    ctx.cleanup().await;
}

#[tokio::test]
async fn company_delete_preview_counts_dependents() {
    let Some(ctx) = PgTestContext::new_seeded().await else {
        return;
    };
    let company = ctx.seeded.company_named("Daesung Trading").unwrap();
    let (status, body) = ctx
        .request(
            Method::GET,
            &format!("/companies/{}/delete-preview", company.id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entityName"], "Daesung Trading");
    assert_eq!(body["impact"]["setNull"]["contacts"], 1);
    assert_eq!(body["impact"]["setNull"]["deals"], 2);
    assert_eq!(body["impact"]["cascade"]["tasks"], 1);

    ctx.cleanup().await;
}
