//! Country canonicalization.
//!
//! Directory records carry free-text country values ("United States",
//! "República Dominicana", "US"). Everything is reduced to an ISO 3166-1
//! alpha-2 code through a static alias table before storage, so all
//! spellings of a country resolve to the same row.

use once_cell::sync::Lazy;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use std::collections::HashMap;

use crate::db::DbPool;
use crate::entities::country;
use crate::errors::ServiceError;

/// Uppercased alias -> canonical code
static COUNTRY_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        // United States variations
        ("UNITED STATES", "US"),
        ("USA", "US"),
        ("UNITED STATES OF AMERICA", "US"),
        ("US", "US"),
        ("AMERICA", "US"),
        // Puerto Rico
        ("PUERTO RICO", "PR"),
        ("PR", "PR"),
        // Dominican Republic variations
        ("REPÚBLICA DOMINICANA", "DO"),
        ("DOMINICAN REPUBLIC", "DO"),
        ("REPUBLICA DOMINICANA", "DO"),
        ("DO", "DO"),
        // Mexico
        ("MEXICO", "MX"),
        ("MÉXICO", "MX"),
        ("MX", "MX"),
        ("CANADA", "CA"),
        ("SPAIN", "ES"),
        ("FRANCE", "FR"),
        ("GERMANY", "DE"),
        ("ITALY", "IT"),
        ("UNITED KINGDOM", "GB"),
        ("UK", "GB"),
    ])
});

/// Normalize a free-text country to its canonical two-letter code
///
/// Unknown inputs return `None` and are left unset on the employee.
pub fn normalize_country_code(input: &str) -> Option<&'static str> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    COUNTRY_ALIASES.get(trimmed.to_uppercase().as_str()).copied()
}

/// Find or create the country row for a free-text input
///
/// Returns `(country_id, was_created)`, or `None` when the input is empty
/// or unrecognized.
pub async fn get_or_create(
    db: &DbPool,
    input: &str,
) -> Result<Option<(i32, bool)>, ServiceError> {
    let Some(code) = normalize_country_code(input) else {
        return Ok(None);
    };

    if let Some(existing) = country::Entity::find()
        .filter(country::Column::Code.eq(code))
        .one(db)
        .await?
    {
        return Ok(Some((existing.id, false)));
    }

    let created = country::ActiveModel {
        code: Set(code.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Ok(Some((created.id, true)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("USA", "US")]
    #[case("United States", "US")]
    #[case("us", "US")]
    #[case("  united states of america  ", "US")]
    #[case("República Dominicana", "DO")]
    #[case("republica dominicana", "DO")]
    #[case("México", "MX")]
    #[case("UK", "GB")]
    fn aliases_resolve_to_canonical_codes(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_country_code(input), Some(expected));
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("Atlantis")]
    fn unknown_or_empty_inputs_resolve_to_none(#[case] input: &str) {
        assert_eq!(normalize_country_code(input), None);
    }
}
