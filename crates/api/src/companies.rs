use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use entity::{activity, company, company_tag, contact, deal, tag, task};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::{extension::postgres::PgExpr, Expr};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::extract::ValidJson;
use crate::pagination::{self, Page, Pagination};
use crate::tags::{AddTagBody, TagRef};
use crate::validate;
use crate::Db;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyNode {
    pub id: Uuid,
    pub name: String,
    pub industry: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub employee_count: Option<i32>,
    pub memo: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<company::Model> for CompanyNode {
    fn from(model: company::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            industry: model.industry,
            website: model.website,
            address: model.address,
            employee_count: model.employee_count,
            memo: model.memo,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyInput {
    pub name: String,
    pub industry: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub employee_count: Option<i32>,
    pub memo: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompanyListParams {
    pub q: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

pub async fn list(
    State(db): State<Db>,
    Query(params): Query<CompanyListParams>,
) -> ApiResult<Json<Page<CompanyNode>>> {
    let (page, limit) = pagination::resolve(params.page, params.limit);
    let mut query = company::Entity::find().order_by_desc(company::Column::CreatedAt);
    if let Some(q) = params.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        query = query.filter(Expr::col(company::Column::Name).ilike(format!("%{}%", q)));
    }
    let total = query.clone().count(db.as_ref()).await?;
    let rows = query
        .limit(limit)
        .offset((page - 1) * limit)
        .all(db.as_ref())
        .await?;
    Ok(Json(Page {
        data: rows.into_iter().map(CompanyNode::from).collect(),
        pagination: Pagination::new(page, limit, total),
    }))
}

pub async fn create(
    State(db): State<Db>,
    ValidJson(input): ValidJson<CompanyInput>,
) -> ApiResult<impl IntoResponse> {
    let name = validate::required_text("name", &input.name)?;
    let employee_count = validate::positive("employeeCount", input.employee_count)?;
    let now: DateTimeWithTimeZone = Utc::now().into();
    let model = company::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        industry: Set(validate::optional_text(input.industry)),
        website: Set(validate::optional_text(input.website)),
        address: Set(validate::optional_text(input.address)),
        employee_count: Set(employee_count),
        memo: Set(validate::optional_text(input.memo)),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db.as_ref())
    .await?;
    Ok((StatusCode::CREATED, Json(CompanyNode::from(model))))
}

pub async fn get_one(State(db): State<Db>, Path(id): Path<Uuid>) -> ApiResult<Json<CompanyNode>> {
    let model = company::Entity::find_by_id(id)
        .one(db.as_ref())
        .await?
        .ok_or(ApiError::NotFound("Company not found"))?;
    Ok(Json(model.into()))
}

pub async fn update(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    ValidJson(input): ValidJson<CompanyInput>,
) -> ApiResult<Json<CompanyNode>> {
    let name = validate::required_text("name", &input.name)?;
    let employee_count = validate::positive("employeeCount", input.employee_count)?;
    let existing = company::Entity::find_by_id(id)
        .one(db.as_ref())
        .await?
        .ok_or(ApiError::NotFound("Company not found"))?;
    let mut active: company::ActiveModel = existing.into();
    active.name = Set(name);
    active.industry = Set(validate::optional_text(input.industry));
    active.website = Set(validate::optional_text(input.website));
    active.address = Set(validate::optional_text(input.address));
    active.employee_count = Set(employee_count);
    active.memo = Set(validate::optional_text(input.memo));
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(db.as_ref()).await?;
    Ok(Json(updated.into()))
}

pub async fn remove(State(db): State<Db>, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    let result = company::Entity::delete_by_id(id).exec(db.as_ref()).await?;
    if result.rows_affected == 0 {
        return Err(ApiError::NotFound("Company not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// What a delete would touch: contacts and deals are detached (their FK is
/// SET NULL), activities and tasks go with the company (CASCADE).
pub async fn delete_preview(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let model = company::Entity::find_by_id(id)
        .one(db.as_ref())
        .await?
        .ok_or(ApiError::NotFound("Company not found"))?;

    let contacts = contact::Entity::find()
        .filter(contact::Column::CompanyId.eq(id))
        .count(db.as_ref())
        .await?;
    let deals = deal::Entity::find()
        .filter(deal::Column::CompanyId.eq(id))
        .count(db.as_ref())
        .await?;
    let activities = activity::Entity::find()
        .filter(activity::Column::CompanyId.eq(id))
        .count(db.as_ref())
        .await?;
    let tasks = task::Entity::find()
        .filter(task::Column::CompanyId.eq(id))
        .count(db.as_ref())
        .await?;

    Ok(Json(json!({
        "entityName": model.name,
        "impact": {
            "setNull": { "contacts": contacts, "deals": deals },
            "cascade": { "activities": activities, "tasks": tasks },
        },
    })))
}

pub async fn list_tags(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let rows = company_tag::Entity::find()
        .filter(company_tag::Column::CompanyId.eq(id))
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

    let existing = company_tag::Entity::find_by_id((id, body.tag_id))
        .one(db.as_ref())
        .await?;
    if existing.is_some() {
        return Err(ApiError::Conflict("Tag already assigned".to_string()));
    }

    company_tag::ActiveModel {
        company_id: Set(id),
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
    let result = company_tag::Entity::delete_many()
        .filter(company_tag::Column::CompanyId.eq(id))
        .filter(company_tag::Column::TagId.eq(tag_id))
        .exec(db.as_ref())
        .await?;
    if result.rows_affected == 0 {
        return Err(ApiError::NotFound("Tag assignment not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}
