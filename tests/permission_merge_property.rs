//! Property: an aggregated flag is set iff at least one role grants it.

use chrono::Utc;
use proptest::prelude::*;

use primefire_api::entities::{module, module_permission};
use primefire_api::services::permissions::aggregate;

fn module_row(id: i32, key: &str) -> module::Model {
    module::Model {
        id,
        name: key.to_string(),
        key: key.to_string(),
        description: None,
        icon: None,
        route_url: None,
        display_order: 0,
        is_active: true,
        parent_module_id: None,
        created_at: Utc::now(),
    }
}

fn permission_row(role_id: i32, module_id: i32, flags: [bool; 7]) -> module_permission::Model {
    module_permission::Model {
        role_id,
        module_id,
        can_view: flags[0],
        can_create: flags[1],
        can_edit: flags[2],
        can_delete: flags[3],
        can_export: flags[4],
        admin_actions: flags[5],
        other_actions: flags[6],
        assigned_at: Utc::now(),
    }
}

proptest! {
    /// For any set of roles over up to four modules, each aggregated flag
    /// equals the OR of the per-role flags for that module.
    #[test]
    fn aggregated_flag_is_or_of_role_flags(
        grants in prop::collection::vec(
            (0..4i32, prop::array::uniform7(any::<bool>())),
            0..24,
        )
    ) {
        let modules: Vec<module::Model> = (0..4)
            .map(|id| module_row(id, &format!("module-{}", id)))
            .collect();

        let rows: Vec<(module::Model, module_permission::Model)> = grants
            .iter()
            .enumerate()
            .map(|(role_id, (module_id, flags))| {
                (
                    modules[*module_id as usize].clone(),
                    permission_row(role_id as i32, *module_id, *flags),
                )
            })
            .collect();

        let merged = aggregate(&rows);

        for module in &modules {
            let expected: [bool; 7] = (0..7)
                .map(|i| {
                    grants
                        .iter()
                        .any(|(module_id, flags)| *module_id == module.id && flags[i])
                })
                .collect::<Vec<_>>()
                .try_into()
                .unwrap();

            let access = merged.iter().find(|a| a.module_key == module.key);
            match access {
                None => {
                    // No role touches this module at all
                    prop_assert!(!grants.iter().any(|(module_id, _)| *module_id == module.id));
                }
                Some(access) => {
                    let flags = access.permissions;
                    prop_assert_eq!(flags.can_view, expected[0]);
                    prop_assert_eq!(flags.can_create, expected[1]);
                    prop_assert_eq!(flags.can_edit, expected[2]);
                    prop_assert_eq!(flags.can_delete, expected[3]);
                    prop_assert_eq!(flags.can_export, expected[4]);
                    prop_assert_eq!(flags.admin_actions, expected[5]);
                    prop_assert_eq!(flags.other_actions, expected[6]);
                }
            }
        }
    }

    /// Aggregation never invents a module no role has a row for.
    #[test]
    fn aggregation_only_emits_touched_modules(
        grants in prop::collection::vec(
            (0..4i32, prop::array::uniform7(any::<bool>())),
            0..12,
        )
    ) {
        let modules: Vec<module::Model> = (0..4)
            .map(|id| module_row(id, &format!("module-{}", id)))
            .collect();

        let rows: Vec<(module::Model, module_permission::Model)> = grants
            .iter()
            .enumerate()
            .map(|(role_id, (module_id, flags))| {
                (
                    modules[*module_id as usize].clone(),
                    permission_row(role_id as i32, *module_id, *flags),
                )
            })
            .collect();

        let merged = aggregate(&rows);
        let touched: std::collections::BTreeSet<i32> =
            grants.iter().map(|(module_id, _)| *module_id).collect();

        prop_assert_eq!(merged.len(), touched.len());
    }
}
