use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use entity::activity;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::extract::ValidJson;
use crate::pagination::{self, Page, Pagination};
use crate::validate;
use crate::Db;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Call,
    Email,
    Meeting,
    Note,
}

impl From<activity::Kind> for ActivityType {
    fn from(value: activity::Kind) -> Self {
        match value {
            activity::Kind::Call => ActivityType::Call,
            activity::Kind::Email => ActivityType::Email,
            activity::Kind::Meeting => ActivityType::Meeting,
            activity::Kind::Note => ActivityType::Note,
        }
    }
}

impl From<ActivityType> for activity::Kind {
    fn from(value: ActivityType) -> Self {
        match value {
            ActivityType::Call => activity::Kind::Call,
            ActivityType::Email => activity::Kind::Email,
            ActivityType::Meeting => activity::Kind::Meeting,
            ActivityType::Note => activity::Kind::Note,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityNode {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: ActivityType,
    pub title: String,
    pub description: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub contact_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
    pub deal_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<activity::Model> for ActivityNode {
    fn from(model: activity::Model) -> Self {
        Self {
            id: model.id,
            kind: model.kind.into(),
            title: model.title,
            description: model.description,
            scheduled_at: model.scheduled_at.map(Into::into),
            completed_at: model.completed_at.map(Into::into),
            contact_id: model.contact_id,
            company_id: model.company_id,
            deal_id: model.deal_id,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityInput {
    #[serde(rename = "type")]
    pub kind: ActivityType,
    pub title: String,
    pub description: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub contact_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
    pub deal_id: Option<Uuid>,
}

impl ActivityInput {
    /// Mirrors the DB CHECK: an activity must hang off at least one parent.
    fn require_parent(&self) -> ApiResult<()> {
        if self.contact_id.is_none() && self.company_id.is_none() && self.deal_id.is_none() {
            return Err(ApiError::invalid(
                "contactId",
                "at least one of contactId, companyId, dealId is required",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityListParams {
    #[serde(rename = "type")]
    pub kind: Option<ActivityType>,
    pub contact_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
    pub deal_id: Option<Uuid>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

pub async fn list(
    State(db): State<Db>,
    Query(params): Query<ActivityListParams>,
) -> ApiResult<Json<Page<ActivityNode>>> {
    let (page, limit) = pagination::resolve(params.page, params.limit);
    let mut query = activity::Entity::find().order_by_desc(activity::Column::CreatedAt);
    if let Some(kind) = params.kind {
        query = query.filter(activity::Column::Kind.eq(activity::Kind::from(kind)));
    }
    if let Some(contact_id) = params.contact_id {
        query = query.filter(activity::Column::ContactId.eq(contact_id));
    }
    if let Some(company_id) = params.company_id {
        query = query.filter(activity::Column::CompanyId.eq(company_id));
    }
    if let Some(deal_id) = params.deal_id {
        query = query.filter(activity::Column::DealId.eq(deal_id));
    }
    let total = query.clone().count(db.as_ref()).await?;
    let rows = query
        .limit(limit)
        .offset((page - 1) * limit)
        .all(db.as_ref())
        .await?;
    Ok(Json(Page {
        data: rows.into_iter().map(ActivityNode::from).collect(),
        pagination: Pagination::new(page, limit, total),
    }))
}

pub async fn create(
    State(db): State<Db>,
    ValidJson(input): ValidJson<ActivityInput>,
) -> ApiResult<impl IntoResponse> {
    let title = validate::required_text("title", &input.title)?;
    input.require_parent()?;
    let now: DateTimeWithTimeZone = Utc::now().into();
    let model = activity::ActiveModel {
        id: Set(Uuid::new_v4()),
        kind: Set(input.kind.into()),
        title: Set(title),
        description: Set(validate::optional_text(input.description)),
        scheduled_at: Set(input.scheduled_at.map(Into::into)),
        completed_at: Set(None),
        contact_id: Set(input.contact_id),
        company_id: Set(input.company_id),
        deal_id: Set(input.deal_id),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db.as_ref())
    .await?;
    Ok((StatusCode::CREATED, Json(ActivityNode::from(model))))
}

pub async fn get_one(State(db): State<Db>, Path(id): Path<Uuid>) -> ApiResult<Json<ActivityNode>> {
    let model = activity::Entity::find_by_id(id)
        .one(db.as_ref())
        .await?
        .ok_or(ApiError::NotFound("Activity not found"))?;
    Ok(Json(model.into()))
}

pub async fn update(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    ValidJson(input): ValidJson<ActivityInput>,
) -> ApiResult<Json<ActivityNode>> {
    let title = validate::required_text("title", &input.title)?;
    input.require_parent()?;
    let existing = activity::Entity::find_by_id(id)
        .one(db.as_ref())
        .await?
        .ok_or(ApiError::NotFound("Activity not found"))?;
    let mut active: activity::ActiveModel = existing.into();
    active.kind = Set(input.kind.into());
    active.title = Set(title);
    active.description = Set(validate::optional_text(input.description));
    active.scheduled_at = Set(input.scheduled_at.map(Into::into));
    active.contact_id = Set(input.contact_id);
    active.company_id = Set(input.company_id);
    active.deal_id = Set(input.deal_id);
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(db.as_ref()).await?;
    Ok(Json(updated.into()))
}

pub async fn remove(State(db): State<Db>, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    let result = activity::Entity::delete_by_id(id).exec(db.as_ref()).await?;
    if result.rows_affected == 0 {
        return Err(ApiError::NotFound("Activity not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteBody {
    pub completed_at: Option<DateTime<Utc>>,
}

pub async fn complete(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    ValidJson(body): ValidJson<CompleteBody>,
) -> ApiResult<Json<ActivityNode>> {
    let existing = activity::Entity::find_by_id(id)
        .one(db.as_ref())
        .await?
        .ok_or(ApiError::NotFound("Activity not found"))?;
    let completed_at: DateTimeWithTimeZone = body.completed_at.unwrap_or_else(Utc::now).into();
    let mut active: activity::ActiveModel = existing.into();
    active.completed_at = Set(Some(completed_at));
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(db.as_ref()).await?;
    Ok(Json(updated.into()))
}
