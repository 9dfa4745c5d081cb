use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Applicant submission for a job; `file_path` points at the stored resume.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = Curriculum)]
#[sea_orm(table_name = "curriculums")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub job_id: i32,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub file_path: Option<String>,
    pub cover_letter: Option<String>,
    pub status: String,
    #[schema(value_type = chrono::DateTime<chrono::Utc>)]
    pub submitted_at: DateTimeUtc,
    pub employee_id: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
