//! Entity identifiers.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Server-assigned numeric identifier.
///
/// Absent until the entity is persisted; never reused by the service.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// Wraps a raw identifier.
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw identifier.
    #[inline]
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }

    /// Reads an identifier from a JSON number or numeric string.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_u64().map(Self),
            Value::String(s) => s.parse().ok().map(Self),
            _ => None,
        }
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EntityId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<EntityId> for Value {
    fn from(id: EntityId) -> Self {
        Value::from(id.0)
    }
}

/// The minimal identity needed to address one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// A single `id`.
    Single(EntityId),
    /// Named foreign references, e.g. `annotation` and `term`.
    Composite(Vec<(String, EntityId)>),
}

impl Identity {
    /// Creates a single-id identity.
    pub fn single(id: impl Into<EntityId>) -> Self {
        Self::Single(id.into())
    }

    /// Creates a composite identity from named components.
    pub fn composite<I, K, V>(components: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<EntityId>,
    {
        Self::Composite(
            components
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Returns the component named `name`.
    ///
    /// A single identity answers to `id`.
    pub fn component(&self, name: &str) -> Option<EntityId> {
        match self {
            Identity::Single(id) => (name == "id").then_some(*id),
            Identity::Composite(parts) => parts
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| *v),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Single(id) => write!(f, "{id}"),
            Identity::Composite(parts) => {
                let mut first = true;
                for (k, v) in parts {
                    if !first {
                        f.write_str(",")?;
                    }
                    write!(f, "{k}={v}")?;
                    first = false;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn id_from_value() {
        assert_eq!(EntityId::from_value(&json!(12)), Some(EntityId::new(12)));
        assert_eq!(EntityId::from_value(&json!("34")), Some(EntityId::new(34)));
        assert_eq!(EntityId::from_value(&json!(-1)), None);
        assert_eq!(EntityId::from_value(&json!(null)), None);
        assert_eq!(EntityId::from_value(&json!("abc")), None);
    }

    #[test]
    fn identity_components() {
        let single = Identity::single(5u64);
        assert_eq!(single.component("id"), Some(EntityId::new(5)));
        assert_eq!(single.component("term"), None);

        let composite = Identity::composite([("annotation", 10u64), ("term", 3u64)]);
        assert_eq!(composite.component("term"), Some(EntityId::new(3)));
        assert_eq!(composite.component("id"), None);
        assert_eq!(composite.to_string(), "annotation=10,term=3");
    }

    #[test]
    fn id_serde_is_transparent() {
        let id = EntityId::new(99);
        assert_eq!(serde_json::to_value(id).unwrap(), json!(99));
        let back: EntityId = serde_json::from_value(json!(99)).unwrap();
        assert_eq!(back, id);
    }
}
