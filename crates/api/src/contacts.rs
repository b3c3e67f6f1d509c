use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use entity::{contact, contact_tag, tag};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::{extension::postgres::PgExpr, Expr};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
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
pub struct ContactNode {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub company_id: Option<Uuid>,
    pub memo: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<contact::Model> for ContactNode {
    fn from(model: contact::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            phone: model.phone,
            position: model.position,
            company_id: model.company_id,
            memo: model.memo,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInput {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub company_id: Option<Uuid>,
    pub memo: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactListParams {
    pub q: Option<String>,
    pub company_id: Option<Uuid>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

pub async fn list(
    State(db): State<Db>,
    Query(params): Query<ContactListParams>,
) -> ApiResult<Json<Page<ContactNode>>> {
    let (page, limit) = pagination::resolve(params.page, params.limit);
    let mut query = contact::Entity::find().order_by_desc(contact::Column::CreatedAt);
    if let Some(q) = params.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        let pattern = format!("%{}%", q);
        query = query.filter(
            Condition::any()
                .add(Expr::col(contact::Column::Name).ilike(pattern.clone()))
                .add(Expr::col(contact::Column::Email).ilike(pattern)),
        );
    }
    if let Some(company_id) = params.company_id {
        query = query.filter(contact::Column::CompanyId.eq(company_id));
    }
    let total = query.clone().count(db.as_ref()).await?;
    let rows = query
        .limit(limit)
        .offset((page - 1) * limit)
        .all(db.as_ref())
        .await?;
    Ok(Json(Page {
        data: rows.into_iter().map(ContactNode::from).collect(),
        pagination: Pagination::new(page, limit, total),
    }))
}

pub async fn create(
    State(db): State<Db>,
    ValidJson(input): ValidJson<ContactInput>,
) -> ApiResult<impl IntoResponse> {
    let name = validate::required_text("name", &input.name)?;
    let email = validate::email(input.email)?;
    let now: DateTimeWithTimeZone = Utc::now().into();
    let model = contact::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        email: Set(email),
        phone: Set(validate::optional_text(input.phone)),
        position: Set(validate::optional_text(input.position)),
        company_id: Set(input.company_id),
        memo: Set(validate::optional_text(input.memo)),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db.as_ref())
    .await?;
    Ok((StatusCode::CREATED, Json(ContactNode::from(model))))
}

pub async fn get_one(State(db): State<Db>, Path(id): Path<Uuid>) -> ApiResult<Json<ContactNode>> {
    let model = contact::Entity::find_by_id(id)
        .one(db.as_ref())
        .await?
        .ok_or(ApiError::NotFound("Contact not found"))?;
    Ok(Json(model.into()))
}

pub async fn update(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    ValidJson(input): ValidJson<ContactInput>,
) -> ApiResult<Json<ContactNode>> {
    let name = validate::required_text("name", &input.name)?;
    let email = validate::email(input.email)?;
    let existing = contact::Entity::find_by_id(id)
        .one(db.as_ref())
        .await?
        .ok_or(ApiError::NotFound("Contact not found"))?;
    let mut active: contact::ActiveModel = existing.into();
    active.name = Set(name);
    active.email = Set(email);
    active.phone = Set(validate::optional_text(input.phone));
    active.position = Set(validate::optional_text(input.position));
    active.company_id = Set(input.company_id);
    active.memo = Set(validate::optional_text(input.memo));
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(db.as_ref()).await?;
    Ok(Json(updated.into()))
}

pub async fn remove(State(db): State<Db>, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    let result = contact::Entity::delete_by_id(id).exec(db.as_ref()).await?;
    if result.rows_affected == 0 {
        return Err(ApiError::NotFound("Contact not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_tags(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let rows = contact_tag::Entity::find()
        .filter(contact_tag::Column::ContactId.eq(id))
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

    let existing = contact_tag::Entity::find_by_id((id, body.tag_id))
        .one(db.as_ref())
        .await?;
    if existing.is_some() {
        return Err(ApiError::Conflict("Tag already assigned".to_string()));
    }

    contact_tag::ActiveModel {
        contact_id: Set(id),
        tag_id: Set(body.tag_id),
        created_at: Set(Utc::now().into()),
    }
    .insert(db.as_ref())
    .await?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true }))))
}
