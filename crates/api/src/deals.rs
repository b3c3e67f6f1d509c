use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use entity::{activity, deal, deal_tag, tag};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseBackend, EntityTrait,
    FromQueryResult, Iterable, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Statement,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::extract::ValidJson;
use crate::pagination::{self, Page, Pagination};
use crate::stage::{self, stage_str, StageMoveError};
use crate::tags::{AddTagBody, TagRef};
use crate::validate;
use crate::Db;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealStage {
    Lead,
    Qualified,
    Proposal,
    Negotiation,
    ClosedWon,
    ClosedLost,
}

impl From<deal::Stage> for DealStage {
    fn from(value: deal::Stage) -> Self {
        match value {
            deal::Stage::Lead => DealStage::Lead,
            deal::Stage::Qualified => DealStage::Qualified,
            deal::Stage::Proposal => DealStage::Proposal,
            deal::Stage::Negotiation => DealStage::Negotiation,
            deal::Stage::ClosedWon => DealStage::ClosedWon,
            deal::Stage::ClosedLost => DealStage::ClosedLost,
        }
    }
}

impl From<DealStage> for deal::Stage {
    fn from(value: DealStage) -> Self {
        match value {
            DealStage::Lead => deal::Stage::Lead,
            DealStage::Qualified => deal::Stage::Qualified,
            DealStage::Proposal => deal::Stage::Proposal,
            DealStage::Negotiation => deal::Stage::Negotiation,
            DealStage::ClosedWon => deal::Stage::ClosedWon,
            DealStage::ClosedLost => deal::Stage::ClosedLost,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealNode {
    pub id: Uuid,
    pub title: String,
    pub amount: i64,
    pub stage: DealStage,
    pub expected_close_date: Option<DateTime<Utc>>,
    pub contact_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
    pub memo: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<deal::Model> for DealNode {
    fn from(model: deal::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            amount: model.amount,
            stage: model.stage.into(),
            expected_close_date: model.expected_close_date.map(Into::into),
            contact_id: model.contact_id,
            company_id: model.company_id,
            memo: model.memo,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealInput {
    pub title: String,
    #[serde(default)]
    pub amount: i64,
    pub stage: Option<DealStage>,
    pub expected_close_date: Option<DateTime<Utc>>,
    pub contact_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
    pub memo: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DealListParams {
    pub stage: Option<DealStage>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[tracing::instrument(
    name = "crm.deals.list",
    skip_all,
    fields(stage = params.stage.map(|s| stage_str(s.into())).unwrap_or(""))
)]
pub async fn list(
    State(db): State<Db>,
    Query(params): Query<DealListParams>,
) -> ApiResult<Json<Page<DealNode>>> {
    let (page, limit) = pagination::resolve(params.page, params.limit);
    let mut query = deal::Entity::find().order_by_desc(deal::Column::CreatedAt);
    if let Some(filter) = params.stage {
        query = query.filter(deal::Column::Stage.eq(deal::Stage::from(filter)));
    }
    let total = query.clone().count(db.as_ref()).await?;
    let rows = query
        .limit(limit)
        .offset((page - 1) * limit)
        .all(db.as_ref())
        .await?;
    Ok(Json(Page {
        data: rows.into_iter().map(DealNode::from).collect(),
        pagination: Pagination::new(page, limit, total),
    }))
}

pub async fn create(
    State(db): State<Db>,
    ValidJson(input): ValidJson<DealInput>,
) -> ApiResult<impl IntoResponse> {
    let title = validate::required_text("title", &input.title)?;
    let amount = validate::non_negative("amount", input.amount)?;
    let now: DateTimeWithTimeZone = Utc::now().into();
    let model = deal::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(title),
        amount: Set(amount),
        stage: Set(input.stage.unwrap_or(DealStage::Lead).into()),
        expected_close_date: Set(input.expected_close_date.map(Into::into)),
        contact_id: Set(input.contact_id),
        company_id: Set(input.company_id),
        memo: Set(validate::optional_text(input.memo)),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db.as_ref())
    .await?;
    Ok((StatusCode::CREATED, Json(DealNode::from(model))))
}

pub async fn get_one(State(db): State<Db>, Path(id): Path<Uuid>) -> ApiResult<Json<DealNode>> {
    let model = deal::Entity::find_by_id(id)
        .one(db.as_ref())
        .await?
        .ok_or(ApiError::NotFound("Deal not found"))?;
    Ok(Json(model.into()))
}

/// Full update, last-write-wins. Emits the same stage-change audit activity
/// as the stage route when the stage field differs from the stored one, but
/// carries no optimistic-lock guard; only `PATCH /deals/{id}/stage` does.
pub async fn update(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    ValidJson(input): ValidJson<DealInput>,
) -> ApiResult<Json<DealNode>> {
    let title = validate::required_text("title", &input.title)?;
    let amount = validate::non_negative("amount", input.amount)?;
    let target: deal::Stage = input.stage.unwrap_or(DealStage::Lead).into();

    let txn = db.begin().await?;
    let existing = deal::Entity::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or(ApiError::NotFound("Deal not found"))?;
    let from_stage = existing.stage;
    let now: DateTimeWithTimeZone = Utc::now().into();

    let mut active: deal::ActiveModel = existing.into();
    active.title = Set(title);
    active.amount = Set(amount);
    active.stage = Set(target);
    active.expected_close_date = Set(input.expected_close_date.map(Into::into));
    active.contact_id = Set(input.contact_id);
    active.company_id = Set(input.company_id);
    active.memo = Set(validate::optional_text(input.memo));
    active.updated_at = Set(now);
    let updated = active.update(&txn).await?;

    if from_stage != target {
        activity::Entity::insert(stage::stage_change_activity(id, from_stage, target, now))
            .exec_without_returning(&txn)
            .await?;
    }
    txn.commit().await?;
    Ok(Json(updated.into()))
}

pub async fn remove(State(db): State<Db>, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    let result = deal::Entity::delete_by_id(id).exec(db.as_ref()).await?;
    if result.rows_affected == 0 {
        return Err(ApiError::NotFound("Deal not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageUpdateBody {
    pub stage: DealStage,
    /// The `updatedAt` the client captured when it last read the deal;
    /// acts as the optimistic-lock token.
    pub updated_at: DateTime<Utc>,
}

#[tracing::instrument(
    name = "crm.deals.moveStage",
    skip_all,
    fields(deal = %id, stage = stage_str(body.stage.into()))
)]
pub async fn update_stage(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    ValidJson(body): ValidJson<StageUpdateBody>,
) -> ApiResult<Json<DealNode>> {
    let model = stage::transition_stage(db.as_ref(), id, body.stage.into(), body.updated_at)
        .await
        .map_err(|err| match err {
            StageMoveError::NotFound => ApiError::NotFound("Deal not found"),
            StageMoveError::Conflict => {
                ApiError::Conflict(stage::DEAL_MODIFIED_MESSAGE.to_string())
            }
            StageMoveError::Db(e) => ApiError::Db(e),
        })?;
    Ok(Json(model.into()))
}

#[derive(Debug, FromQueryResult)]
struct StageSummaryRow {
    stage: String,
    count: i64,
    total: i64,
}

/// Per-stage deal counts and amount totals; every stage present even when
/// empty.
pub async fn summary(State(db): State<Db>) -> ApiResult<Json<serde_json::Value>> {
    let rows = StageSummaryRow::find_by_statement(Statement::from_string(
        DatabaseBackend::Postgres,
        "SELECT stage::text AS stage, COUNT(*)::bigint AS count, \
         COALESCE(SUM(amount), 0)::bigint AS total FROM deals GROUP BY stage"
            .to_string(),
    ))
    .all(db.as_ref())
    .await?;

    let mut stages = serde_json::Map::new();
    for stage in deal::Stage::iter() {
        stages.insert(stage_str(stage).to_string(), json!({ "count": 0, "total": 0 }));
    }
    for row in rows {
        stages.insert(row.stage, json!({ "count": row.count, "total": row.total }));
    }
    Ok(Json(json!({ "stages": stages })))
}

pub async fn list_tags(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let rows = deal_tag::Entity::find()
        .filter(deal_tag::Column::DealId.eq(id))
        .find_also_related(tag::Entity)
        .all(db.as_ref())
        .await?;
    let tags: Vec<TagRef> = rows
        .into_iter()
        .filter_map(|(_, tag)| tag.map(TagRef::from))
        .collect();
    Ok(Json(json!({ "data": tags })))
}

pub async fn add_tag(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    ValidJson(body): ValidJson<AddTagBody>,
) -> ApiResult<impl IntoResponse> {
    tag::Entity::find_by_id(body.tag_id)
        .one(db.as_ref())
        .await?
        .ok_or(ApiError::NotFound("Tag not found"))?;

    let existing = deal_tag::Entity::find_by_id((id, body.tag_id))
        .one(db.as_ref())
        .await?;
    if existing.is_some() {
        return Err(ApiError::Conflict("Tag already assigned".to_string()));
    }

    deal_tag::ActiveModel {
        deal_id: Set(id),
        tag_id: Set(body.tag_id),
        created_at: Set(Utc::now().into()),
    }
    .insert(db.as_ref())
    .await?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true }))))
}

pub async fn remove_tag(
    State(db): State<Db>,
    Path((id, tag_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    let result = deal_tag::Entity::delete_many()
        .filter(deal_tag::Column::DealId.eq(id))
        .filter(deal_tag::Column::TagId.eq(tag_id))
        .exec(db.as_ref())
        .await?;
    if result.rows_affected == 0 {
        return Err(ApiError::NotFound("Tag assignment not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}
