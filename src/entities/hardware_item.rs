use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Tracked hardware asset, optionally assigned to an employee.
///
/// `device_type`, `storage_type` and `status` take values from the fixed
/// sets enforced at the handler layer (Laptop/Desktop/Workstation/Server,
/// HDD/SSD/NVMe/Hybrid, Active/In Repair/Retired/Spare).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = HardwareItem)]
#[sea_orm(table_name = "hardware_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub serial_number: String,
    pub brand: String,
    pub model: Option<String>,
    pub device_type: Option<String>,
    pub processor: Option<String>,
    pub ram_gb: Option<i32>,
    pub storage_type: Option<String>,
    pub storage_gb: Option<i32>,
    pub gpu: Option<String>,
    pub operating_system: Option<String>,
    pub warranty_start: Option<Date>,
    pub warranty_end: Option<Date>,
    pub purchase_date: Option<Date>,
    pub employee_id: Option<i32>,
    pub location: Option<String>,
    pub status: String,
    pub notes: Option<String>,
    #[schema(value_type = chrono::DateTime<chrono::Utc>)]
    pub created_at: DateTimeUtc,
    #[schema(value_type = Option<chrono::DateTime<chrono::Utc>>)]
    pub updated_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
