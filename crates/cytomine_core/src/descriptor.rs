//! Static per-resource metadata.
//!
//! A [`ResourceDescriptor`] is everything the generic engine needs to know
//! about one kind of remote resource: where it lives, which fields it has,
//! how it is identified and which mutations it accepts.

use crate::error::Operation;
use std::fmt;

/// Resource-type tag.
///
/// Two entities are interchangeable only if their kinds compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceKind(&'static str);

impl ResourceKind {
    /// Creates a kind from its tag.
    #[must_use]
    pub const fn new(tag: &'static str) -> Self {
        Self(tag)
    }

    /// Returns the tag.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A declared field of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field name as used on the wire.
    pub name: &'static str,
    /// Must be present before the entity can be created.
    pub required: bool,
    /// Computed by the service; never sent back.
    pub read_only: bool,
}

impl FieldSpec {
    /// An optional, writable field.
    #[must_use]
    pub const fn optional(name: &'static str) -> Self {
        Self {
            name,
            required: false,
            read_only: false,
        }
    }

    /// A field required at creation.
    #[must_use]
    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            required: true,
            read_only: false,
        }
    }

    /// A server-computed field.
    #[must_use]
    pub const fn read_only(name: &'static str) -> Self {
        Self {
            name,
            required: false,
            read_only: true,
        }
    }
}

/// How a resource is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityShape {
    /// A single numeric `id`.
    Single,
    /// Two or more foreign references, e.g. `annotation` + `term`.
    Composite(&'static [&'static str]),
}

/// Mutations a resource kind accepts besides creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operations {
    /// Existing resources can be updated.
    pub update: bool,
    /// Resources can be deleted.
    pub delete: bool,
}

impl Operations {
    /// Update and delete are both allowed.
    pub const ALL: Operations = Operations {
        update: true,
        delete: true,
    };

    /// Resources can be created and deleted, never modified.
    pub const APPEND_DELETE: Operations = Operations {
        update: false,
        delete: true,
    };

    /// Resources can only be created.
    pub const APPEND_ONLY: Operations = Operations {
        update: false,
        delete: false,
    };

    /// Returns true if `op` is allowed.
    pub fn allows(&self, op: Operation) -> bool {
        match op {
            Operation::Update => self.update,
            Operation::Delete => self.delete,
        }
    }
}

/// Static metadata describing one resource kind.
///
/// Path templates are relative to the API root and use `{name}` placeholders
/// filled from the entity's identity or fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceDescriptor {
    /// Resource-type tag, also the key of the entity in mutation responses.
    pub kind: ResourceKind,
    /// Path of one existing resource, e.g. `project/{id}.json`.
    pub entity_path: &'static str,
    /// Path new resources are posted to, e.g. `project.json`.
    pub create_path: &'static str,
    /// Collection segment, e.g. `imageinstance` for `imageinstance.json`.
    pub collection_name: &'static str,
    /// Declared fields.
    pub fields: &'static [FieldSpec],
    /// Identity shape.
    pub identity: IdentityShape,
    /// Allowed mutations.
    pub operations: Operations,
    /// Parent filters rendered into the collection path.
    pub scopes: &'static [&'static str],
    /// A collection fetch needs one of `scopes` set.
    pub scope_required: bool,
}

impl ResourceDescriptor {
    /// Returns the declared field named `name`.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Iterates over fields required at creation.
    pub fn required_fields(&self) -> impl Iterator<Item = &'static str> {
        self.fields.iter().filter(|f| f.required).map(|f| f.name)
    }

    /// Iterates over fields eligible for serialization.
    pub fn public_field_names(&self) -> impl Iterator<Item = &'static str> {
        self.fields.iter().filter(|f| !f.read_only).map(|f| f.name)
    }

    /// Returns true if `op` is allowed.
    pub fn supports(&self, op: Operation) -> bool {
        self.operations.allows(op)
    }

    /// Returns the identity component names.
    pub fn identity_components(&self) -> &'static [&'static str] {
        match self.identity {
            IdentityShape::Single => &["id"],
            IdentityShape::Composite(components) => components,
        }
    }

    /// Returns true if `key` is one of the collection scopes.
    pub fn is_scope(&self, key: &str) -> bool {
        self.scopes.contains(&key)
    }
}

/// Fills `{name}` placeholders in `template` using `lookup`.
///
/// Returns the name of the first placeholder `lookup` cannot resolve.
pub(crate) fn render_template<F>(template: &str, lookup: F) -> Result<String, String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(template.len() + 8);
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return Ok(out);
        };
        let name = &after[..end];
        match lookup(name) {
            Some(value) => out.push_str(&value),
            None => return Err(name.to_string()),
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELDS: &[FieldSpec] = &[
        FieldSpec::required("name"),
        FieldSpec::optional("description"),
        FieldSpec::read_only("created"),
    ];

    const THING: ResourceDescriptor = ResourceDescriptor {
        kind: ResourceKind::new("thing"),
        entity_path: "thing/{id}.json",
        create_path: "thing.json",
        collection_name: "thing",
        fields: FIELDS,
        identity: IdentityShape::Single,
        operations: Operations::APPEND_DELETE,
        scopes: &["project"],
        scope_required: false,
    };

    #[test]
    fn field_views() {
        assert_eq!(THING.required_fields().collect::<Vec<_>>(), vec!["name"]);
        assert_eq!(
            THING.public_field_names().collect::<Vec<_>>(),
            vec!["name", "description"]
        );
        assert!(THING.field("created").is_some_and(|f| f.read_only));
        assert!(THING.field("nope").is_none());
    }

    #[test]
    fn operations_flags() {
        assert!(!THING.supports(Operation::Update));
        assert!(THING.supports(Operation::Delete));
        assert!(Operations::ALL.allows(Operation::Update));
        assert!(!Operations::APPEND_ONLY.allows(Operation::Delete));
    }

    #[test]
    fn render_fills_placeholders() {
        let path = render_template("annotation/{annotation}/term/{term}.json", |name| {
            match name {
                "annotation" => Some("10".into()),
                "term" => Some("3".into()),
                _ => None,
            }
        })
        .unwrap();
        assert_eq!(path, "annotation/10/term/3.json");
    }

    #[test]
    fn render_reports_missing_placeholder() {
        let err = render_template("annotation/{annotation}/term/{term}.json", |name| {
            (name == "annotation").then(|| "10".to_string())
        })
        .unwrap_err();
        assert_eq!(err, "term");
    }

    #[test]
    fn render_without_placeholders() {
        assert_eq!(render_template("project.json", |_| None).unwrap(), "project.json");
    }

    #[test]
    fn identity_components() {
        assert_eq!(THING.identity_components(), &["id"]);
        assert!(THING.is_scope("project"));
        assert!(!THING.is_scope("user"));
    }
}
