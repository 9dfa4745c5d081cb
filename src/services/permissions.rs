//! Permission aggregation.
//!
//! An employee's effective capabilities are the OR-combination of the
//! capability flags of every role assigned to them, per module. There is no
//! precedence and no deny-overrides-allow; a flag is granted if any role
//! grants it. Nothing is cached — the set is recomputed per request.

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::Serialize;
use std::collections::BTreeMap;
use utoipa::ToSchema;

use crate::db::DbPool;
use crate::entities::{employee, employee_role, module, module_permission, role};
use crate::errors::ServiceError;

/// Effective capability flags for one module
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct CapabilityFlags {
    pub can_view: bool,
    pub can_create: bool,
    pub can_edit: bool,
    pub can_delete: bool,
    pub can_export: bool,
    pub admin_actions: bool,
    pub other_actions: bool,
}

impl CapabilityFlags {
    pub fn from_row(row: &module_permission::Model) -> Self {
        Self {
            can_view: row.can_view,
            can_create: row.can_create,
            can_edit: row.can_edit,
            can_delete: row.can_delete,
            can_export: row.can_export,
            admin_actions: row.admin_actions,
            other_actions: row.other_actions,
        }
    }

    /// OR-combine another permission row into this set
    pub fn merge(&mut self, row: &module_permission::Model) {
        self.can_view |= row.can_view;
        self.can_create |= row.can_create;
        self.can_edit |= row.can_edit;
        self.can_delete |= row.can_delete;
        self.can_export |= row.can_export;
        self.admin_actions |= row.admin_actions;
        self.other_actions |= row.other_actions;
    }
}

/// One module the employee has permission rows for
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ModuleAccess {
    pub module_key: String,
    pub module_info: module::Model,
    pub permissions: CapabilityFlags,
}

/// Aggregated permission view of one employee
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EmployeePermissions {
    pub employee: employee::Model,
    pub roles: Vec<role::Model>,
    pub permissions: Vec<ModuleAccess>,
    /// Modules the employee can open (can_view after aggregation)
    pub accessible_modules: Vec<module::Model>,
}

impl EmployeePermissions {
    /// Flags for a module key; all-false when the employee has no row for it
    pub fn flags_for(&self, module_key: &str) -> CapabilityFlags {
        self.permissions
            .iter()
            .find(|access| access.module_key == module_key)
            .map(|access| access.permissions)
            .unwrap_or_default()
    }

    pub fn has_admin_actions(&self, module_key: &str) -> bool {
        self.flags_for(module_key).admin_actions
    }
}

/// OR-merge permission rows into a per-module-key capability map
///
/// Pure over the loaded rows so the merge semantics are testable without a
/// database.
pub fn aggregate(rows: &[(module::Model, module_permission::Model)]) -> Vec<ModuleAccess> {
    let mut merged: BTreeMap<String, (module::Model, CapabilityFlags)> = BTreeMap::new();

    for (module, permission) in rows {
        merged
            .entry(module.key.clone())
            .and_modify(|(_, flags)| flags.merge(permission))
            .or_insert_with(|| (module.clone(), CapabilityFlags::from_row(permission)));
    }

    merged
        .into_iter()
        .map(|(module_key, (module_info, permissions))| ModuleAccess {
            module_key,
            module_info,
            permissions,
        })
        .collect()
}

/// Load and aggregate the permission set of one employee
///
/// An employee with no roles yields an empty permission set, not an error.
pub async fn load_for_employee(
    db: &DbPool,
    employee: employee::Model,
) -> Result<EmployeePermissions, ServiceError> {
    let role_ids: Vec<i32> = employee_role::Entity::find()
        .filter(employee_role::Column::EmployeeId.eq(employee.id))
        .all(db)
        .await?
        .into_iter()
        .map(|assignment| assignment.role_id)
        .collect();

    if role_ids.is_empty() {
        return Ok(EmployeePermissions {
            employee,
            roles: Vec::new(),
            permissions: Vec::new(),
            accessible_modules: Vec::new(),
        });
    }

    let roles = role::Entity::find()
        .filter(role::Column::Id.is_in(role_ids.clone()))
        .all(db)
        .await?;

    let permission_rows = module_permission::Entity::find()
        .filter(module_permission::Column::RoleId.is_in(role_ids))
        .all(db)
        .await?;

    let module_ids: Vec<i32> = permission_rows.iter().map(|row| row.module_id).collect();
    let modules = module::Entity::find()
        .filter(module::Column::Id.is_in(module_ids))
        .all(db)
        .await?;

    let rows: Vec<(module::Model, module_permission::Model)> = permission_rows
        .into_iter()
        .filter_map(|permission| {
            modules
                .iter()
                .find(|module| module.id == permission.module_id)
                .map(|module| (module.clone(), permission))
        })
        .collect();

    let permissions = aggregate(&rows);
    let accessible_modules = permissions
        .iter()
        .filter(|access| access.permissions.can_view)
        .map(|access| access.module_info.clone())
        .collect();

    Ok(EmployeePermissions {
        employee,
        roles,
        permissions,
        accessible_modules,
    })
}
