use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Open position applicants submit curriculums against.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = Job)]
#[sea_orm(table_name = "jobs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub location: Option<String>,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub status: String,
    #[schema(value_type = chrono::DateTime<chrono::Utc>)]
    pub posted_at: DateTimeUtc,
    pub employee_id: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
