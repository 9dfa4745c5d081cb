use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Employee <-> Role assignment (join table).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "employee_roles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub employee_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub role_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
