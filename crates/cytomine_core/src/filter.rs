//! Collection filters.
//!
//! Filter keys are opaque to the engine. Interpretation belongs to the
//! service, so comparison filters such as `name[ilike]` pass through
//! verbatim.

use crate::entity::EntityId;
use std::fmt;

/// A filter value, rendered as it will appear in the request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilterValue(String);

impl FilterValue {
    /// Returns the rendered value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<EntityId> for FilterValue {
    fn from(value: EntityId) -> Self {
        Self(value.to_string())
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        Self(value.to_string())
    }
}

macro_rules! filter_value_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for FilterValue {
                fn from(value: $ty) -> Self {
                    Self(value.to_string())
                }
            }
        )*
    };
}

filter_value_from_int!(u32, u64, i32, i64, usize);

/// Ordered key/value constraints narrowing a collection fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    entries: Vec<(String, FilterValue)>,
}

impl FilterSet {
    /// Creates an empty filter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key`, overwriting any previous value in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<FilterValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Returns the value of `key`.
    pub fn get(&self, key: &str) -> Option<&FilterValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Removes `key`, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<FilterValue> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    /// Returns true if `key` is set.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Sets every entry of `other`, overwriting shared keys.
    pub fn merge(&mut self, other: &FilterSet) {
        for (key, value) in &other.entries {
            self.set(key.clone(), value.clone());
        }
    }

    /// Returns the number of filters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no filter is set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Renders the set as query parameters, skipping keys in `exclude`.
    pub fn to_query_parameters(&self, exclude: &[&str]) -> Vec<(String, String)> {
        self.entries
            .iter()
            .filter(|(k, _)| !exclude.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.0.clone()))
            .collect()
    }
}

impl<K, V> FromIterator<(K, V)> for FilterSet
where
    K: Into<String>,
    V: Into<FilterValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = FilterSet::new();
        for (k, v) in iter {
            set.set(k, v);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_overwrites_in_place() {
        let mut filters = FilterSet::new();
        filters.set("project", 1u64);
        filters.set("user", 7u64);
        filters.set("project", 2u64);

        assert_eq!(filters.len(), 2);
        assert_eq!(filters.get("project").unwrap().as_str(), "2");
        let keys: Vec<_> = filters.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["project", "user"]);
    }

    #[test]
    fn unknown_keys_pass_through() {
        let filters: FilterSet = [("name[ilike]", "lung"), ("showWKT", "true")]
            .into_iter()
            .collect();
        assert_eq!(
            filters.to_query_parameters(&[]),
            vec![
                ("name[ilike]".to_string(), "lung".to_string()),
                ("showWKT".to_string(), "true".to_string()),
            ]
        );
    }

    #[test]
    fn query_parameters_exclude_keys() {
        let filters: FilterSet = [("project", "3"), ("user", "4")].into_iter().collect();
        assert_eq!(
            filters.to_query_parameters(&["project"]),
            vec![("user".to_string(), "4".to_string())]
        );
    }

    #[test]
    fn merge_and_remove() {
        let mut base: FilterSet = [("project", "1")].into_iter().collect();
        let extra: FilterSet = [("project", "5"), ("term", "9")].into_iter().collect();
        base.merge(&extra);

        assert_eq!(base.get("project").unwrap().as_str(), "5");
        assert_eq!(base.remove("term").unwrap().as_str(), "9");
        assert!(!base.contains("term"));
        assert!(base.remove("term").is_none());
    }

    #[test]
    fn value_conversions() {
        assert_eq!(FilterValue::from(true).as_str(), "true");
        assert_eq!(FilterValue::from(-3i64).as_str(), "-3");
        assert_eq!(FilterValue::from(EntityId::new(12)).as_str(), "12");
    }
}
