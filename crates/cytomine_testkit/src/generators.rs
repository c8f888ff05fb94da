//! Property-based test generators using proptest.

use cytomine_core::FieldMap;
use proptest::prelude::*;
use serde_json::Value;

/// Strategy for page sizes a collection may be fetched with.
pub fn page_size_strategy() -> impl Strategy<Value = u32> {
    1u32..=12
}

/// Strategy for the number of stored resources.
pub fn item_count_strategy() -> impl Strategy<Value = usize> {
    0usize..40
}

/// Strategy for human-readable resource names.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9-]{0,23}").expect("Invalid regex")
}

/// Strategy for the writable fields of a project.
pub fn project_fields_strategy() -> impl Strategy<Value = FieldMap> {
    (
        name_strategy(),
        prop::option::of(prop::sample::select(vec!["histology", "cytology", "pathology"])),
        any::<bool>(),
    )
        .prop_map(|(name, discipline, blind_mode)| {
            let mut fields = FieldMap::new();
            fields.insert("name".into(), Value::String(name));
            if let Some(discipline) = discipline {
                fields.insert("discipline".into(), Value::String(discipline.into()));
            }
            fields.insert("blindMode".into(), Value::Bool(blind_mode));
            fields
        })
}

/// Strategy for a stored item count paired with two page sizes.
pub fn pagination_case_strategy() -> impl Strategy<Value = (usize, u32, u32)> {
    (item_count_strategy(), page_size_strategy(), page_size_strategy())
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn names_are_lowercase(name in name_strategy()) {
            prop_assert!(!name.is_empty());
            prop_assert!(name.chars().all(|c| !c.is_ascii_uppercase()));
        }

        #[test]
        fn project_fields_always_named(fields in project_fields_strategy()) {
            prop_assert!(fields.get("name").is_some_and(Value::is_string));
            prop_assert!(fields.get("blindMode").is_some_and(Value::is_boolean));
        }

        #[test]
        fn page_sizes_are_positive(size in page_size_strategy()) {
            prop_assert!(size >= 1);
        }
    }
}
