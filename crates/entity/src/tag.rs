use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "tags")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,
    #[sea_orm(unique, indexed)]
    pub name: String,
    /// Hex color, `#RRGGBB`.
    pub color: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    ContactTag,
    CompanyTag,
    DealTag,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Self::ContactTag => Entity::has_many(super::contact_tag::Entity).into(),
            Self::CompanyTag => Entity::has_many(super::company_tag::Entity).into(),
            Self::DealTag => Entity::has_many(super::deal_tag::Entity).into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}
