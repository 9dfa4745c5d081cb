use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Feature/route unit permissions are scoped to.
///
/// Modules form a tree via `parent_module_id`; a module may not be its own
/// parent and re-parenting must not close a cycle.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = Module)]
#[sea_orm(table_name = "modules")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    #[sea_orm(unique)]
    pub key: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub route_url: Option<String>,
    pub display_order: i32,
    pub is_active: bool,
    pub parent_module_id: Option<i32>,
    #[schema(value_type = chrono::DateTime<chrono::Utc>)]
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
