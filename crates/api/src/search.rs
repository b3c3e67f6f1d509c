use axum::{
    extract::{Query, State},
    Json,
};
use entity::{company, contact, deal};
use sea_orm::sea_query::{extension::postgres::PgExpr, Expr};
use sea_orm::{ColumnTrait, Condition, EntityTrait, QueryFilter, QuerySelect};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::deals::DealStage;
use crate::error::ApiResult;
use crate::Db;

const DEFAULT_LIMIT: u64 = 20;
const MAX_LIMIT: u64 = 50;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ContactHit {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CompanyHit {
    pub id: Uuid,
    pub name: String,
    pub industry: Option<String>,
    pub website: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DealHit {
    pub id: Uuid,
    pub title: String,
    pub amount: i64,
    pub stage: DealStage,
}

#[derive(Debug, Serialize, Default)]
pub struct SearchResults {
    pub contacts: Vec<ContactHit>,
    pub companies: Vec<CompanyHit>,
    pub deals: Vec<DealHit>,
}

/// Case-insensitive substring search across contacts, companies and deals.
/// An empty query returns empty result sets without touching the store.
#[tracing::instrument(name = "crm.search", skip_all)]
pub async fn handler(
    State(db): State<Db>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<SearchResults>> {
    let Some(q) = params.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) else {
        return Ok(Json(SearchResults::default()));
    };
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let pattern = format!("%{}%", q);

    let contacts = contact::Entity::find()
        .filter(
            Condition::any()
                .add(Expr::col(contact::Column::Name).ilike(pattern.clone()))
                .add(Expr::col(contact::Column::Email).ilike(pattern.clone()))
                .add(Expr::col(contact::Column::Phone).ilike(pattern.clone())),
        )
        .limit(limit)
        .all(db.as_ref())
        .await?;

    let companies = company::Entity::find()
        .filter(
            Condition::any()
                .add(Expr::col(company::Column::Name).ilike(pattern.clone()))
                .add(Expr::col(company::Column::Industry).ilike(pattern.clone()))
                .add(Expr::col(company::Column::Website).ilike(pattern.clone())),
        )
        .limit(limit)
        .all(db.as_ref())
        .await?;

    let deals = deal::Entity::find()
        .filter(Expr::col(deal::Column::Title).ilike(pattern))
        .limit(limit)
        .all(db.as_ref())
        .await?;

    Ok(Json(SearchResults {
        contacts: contacts
            .into_iter()
            .map(|c| ContactHit {
                id: c.id,
                name: c.name,
                email: c.email,
                phone: c.phone,
                position: c.position,
            })
            .collect(),
        companies: companies
            .into_iter()
            .map(|c| CompanyHit {
                id: c.id,
                name: c.name,
                industry: c.industry,
                website: c.website,
            })
            .collect(),
        deals: deals
            .into_iter()
            .map(|d| DealHit {
                id: d.id,
                title: d.title,
                amount: d.amount,
                stage: d.stage.into(),
            })
            .collect(),
    }))
}
