use axum::{extract::{Path, State}, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use entity::tag;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::extract::ValidJson;
use crate::validate;
use crate::Db;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagNode {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

impl From<tag::Model> for TagNode {
    fn from(model: tag::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            color: model.color,
            created_at: model.created_at.into(),
        }
    }
}

/// Body of the per-entity tag assignment routes.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddTagBody {
    pub tag_id: Uuid,
}

/// Slim tag shape embedded in per-entity tag listings.
#[derive(Debug, Clone, Serialize)]
pub struct TagRef {
    pub id: Uuid,
    pub name: String,
    pub color: String,
}

impl From<tag::Model> for TagRef {
    fn from(model: tag::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            color: model.color,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TagInput {
    pub name: String,
    pub color: String,
}

pub async fn list(State(db): State<Db>) -> ApiResult<Json<serde_json::Value>> {
    let rows = tag::Entity::find()
        .order_by_asc(tag::Column::Name)
        .all(db.as_ref())
        .await?;
    let tags: Vec<TagNode> = rows.into_iter().map(TagNode::from).collect();
    Ok(Json(json!({ "data": tags })))
}

pub async fn create(
    State(db): State<Db>,
    ValidJson(input): ValidJson<TagInput>,
) -> ApiResult<impl IntoResponse> {
    let name = validate::tag_name(&input.name)?;
    let color = validate::hex_color(&input.color)?;

    let existing = tag::Entity::find()
        .filter(tag::Column::Name.eq(name.clone()))
        .one(db.as_ref())
        .await?;
    if existing.is_some() {
        return Err(ApiError::Conflict("Tag name already exists".to_string()));
    }

    let model = tag::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        color: Set(color),
        created_at: Set(Utc::now().into()),
    }
    .insert(db.as_ref())
    .await?;
    Ok((StatusCode::CREATED, Json(TagNode::from(model))))
}

pub async fn update(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    ValidJson(input): ValidJson<TagInput>,
) -> ApiResult<Json<TagNode>> {
    let name = validate::tag_name(&input.name)?;
    let color = validate::hex_color(&input.color)?;

    let existing = tag::Entity::find_by_id(id)
        .one(db.as_ref())
        .await?
        .ok_or(ApiError::NotFound("Tag not found"))?;

    let duplicate = tag::Entity::find()
        .filter(tag::Column::Name.eq(name.clone()))
        .filter(tag::Column::Id.ne(id))
        .one(db.as_ref())
        .await?;
    if duplicate.is_some() {
        return Err(ApiError::Conflict("Tag name already exists".to_string()));
    }

    let mut active: tag::ActiveModel = existing.into();
    active.name = Set(name);
    active.color = Set(color);
    let updated = active.update(db.as_ref()).await?;
    Ok(Json(updated.into()))
}

pub async fn remove(State(db): State<Db>, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    let result = tag::Entity::delete_by_id(id).exec(db.as_ref()).await?;
    if result.rows_affected == 0 {
        return Err(ApiError::NotFound("Tag not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}
