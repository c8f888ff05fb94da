//! Response envelope parsing shared by entities, collections and the session.

use crate::command::{AffectedEntity, CommandId};
use crate::descriptor::ResourceKind;
use crate::entity::FieldMap;
use crate::error::{ClientError, ClientResult};
use serde_json::Value;
use tracing::warn;

/// Keys of a mutation envelope that never carry entity data.
const ENVELOPE_KEYS: &[&str] = &["command", "message", "printMessage", "callback", "success"];

/// Parsed result of a create, update or delete.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct MutationOutcome {
    /// Command issued by the service, when it reported one.
    pub command: Option<CommandId>,
    /// Human-readable message.
    pub message: Option<String>,
    /// Server state of the entity after the mutation.
    pub fields: FieldMap,
}

/// One page of a collection fetch.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct Page {
    /// Items of this page.
    pub items: Vec<FieldMap>,
    /// Total item count across all pages.
    pub total_items: Option<u64>,
    /// Total page count.
    pub total_pages: Option<u64>,
}

fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Reads a plain entity body.
pub(crate) fn parse_fields(body: Value) -> ClientResult<FieldMap> {
    match body {
        Value::Object(map) => Ok(map),
        other => Err(ClientError::decode(format!(
            "expected an object, got {}",
            type_name(&other)
        ))),
    }
}

/// Reads a mutation envelope for an entity of `kind`.
///
/// The entity is expected under its kind tag; a body without envelope keys
/// is taken as the entity itself.
pub(crate) fn parse_mutation(kind: ResourceKind, body: Value) -> ClientResult<MutationOutcome> {
    let mut map = match body {
        Value::Null => return Ok(MutationOutcome::default()),
        Value::Object(map) => map,
        other => {
            return Err(ClientError::decode(format!(
                "expected a mutation envelope, got {}",
                type_name(&other)
            )))
        }
    };

    let is_envelope = ENVELOPE_KEYS.iter().any(|k| map.contains_key(*k));
    if !is_envelope {
        return Ok(MutationOutcome {
            fields: map,
            ..MutationOutcome::default()
        });
    }

    let command = map.get("command").and_then(as_u64).map(CommandId::new);
    let message = map
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string);
    let fields = match map.remove(kind.as_str()) {
        Some(Value::Object(fields)) => fields,
        Some(_) | None => {
            warn!(%kind, "mutation response carries no entity data");
            FieldMap::new()
        }
    };

    Ok(MutationOutcome {
        command,
        message,
        fields,
    })
}

/// Reads a collection page. A bare array is an unpaginated list.
pub(crate) fn parse_page(body: Value) -> ClientResult<Page> {
    let mut map = match body {
        Value::Array(items) => {
            let items = collect_items(items)?;
            let total = items.len() as u64;
            return Ok(Page {
                items,
                total_items: Some(total),
                total_pages: Some(1),
            });
        }
        Value::Object(map) => map,
        other => {
            return Err(ClientError::decode(format!(
                "expected a collection, got {}",
                type_name(&other)
            )))
        }
    };

    let items = match map.remove("collection") {
        Some(Value::Array(items)) => collect_items(items)?,
        _ => return Err(ClientError::decode("collection envelope has no `collection` array")),
    };
    let total_items = map.get("size").and_then(as_u64);
    let total_pages = map.get("totalPages").and_then(as_u64);
    if total_items.is_none() {
        warn!("collection response carries no `size`");
    }

    Ok(Page {
        items,
        total_items,
        total_pages,
    })
}

/// Reads an undo or redo response: one envelope or an array of them.
pub(crate) fn parse_affected(body: Value) -> ClientResult<Vec<AffectedEntity>> {
    let envelopes = match body {
        Value::Array(items) => items,
        Value::Object(_) => vec![body],
        Value::Null => Vec::new(),
        other => {
            return Err(ClientError::decode(format!(
                "expected command results, got {}",
                type_name(&other)
            )))
        }
    };

    let mut affected = Vec::new();
    for envelope in envelopes {
        let Value::Object(map) = envelope else {
            return Err(ClientError::decode("command result is not an object"));
        };
        for (key, value) in map {
            if ENVELOPE_KEYS.contains(&key.as_str()) {
                continue;
            }
            if let Value::Object(fields) = value {
                affected.push(AffectedEntity { kind: key, fields });
            }
        }
    }
    Ok(affected)
}

fn collect_items(items: Vec<Value>) -> ClientResult<Vec<FieldMap>> {
    items.into_iter().map(parse_fields).collect()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PROJECT: ResourceKind = ResourceKind::new("project");

    #[test]
    fn mutation_envelope() {
        let body = json!({
            "command": 41,
            "message": "Project 3 added",
            "printMessage": true,
            "callback": {"method": "be.cytomine.AddProjectCommand"},
            "project": {"id": 3, "name": "p"}
        });
        let outcome = parse_mutation(PROJECT, body).unwrap();
        assert_eq!(outcome.command, Some(CommandId::new(41)));
        assert_eq!(outcome.message.as_deref(), Some("Project 3 added"));
        assert_eq!(outcome.fields.get("id"), Some(&json!(3)));
    }

    #[test]
    fn bare_object_is_entity() {
        let outcome = parse_mutation(PROJECT, json!({"id": 3, "name": "p"})).unwrap();
        assert_eq!(outcome.command, None);
        assert_eq!(outcome.fields.len(), 2);
    }

    #[test]
    fn null_mutation_body() {
        let outcome = parse_mutation(PROJECT, Value::Null).unwrap();
        assert_eq!(outcome, MutationOutcome::default());
    }

    #[test]
    fn page_envelope() {
        let body = json!({
            "collection": [{"id": 1}, {"id": 2}],
            "offset": 0,
            "perPage": 2,
            "size": 5,
            "totalPages": 3
        });
        let page = parse_page(body).unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total_items, Some(5));
        assert_eq!(page.total_pages, Some(3));
    }

    #[test]
    fn bare_array_page() {
        let page = parse_page(json!([{"id": 1}, {"id": 2}, {"id": 3}])).unwrap();
        assert_eq!(page.total_items, Some(3));
        assert_eq!(page.total_pages, Some(1));
    }

    #[test]
    fn page_rejects_non_objects() {
        assert!(parse_page(json!({"collection": [1, 2]})).is_err());
        assert!(parse_page(json!("nope")).is_err());
        assert!(parse_page(json!({"size": 1})).is_err());
    }

    #[test]
    fn affected_entities_are_heterogeneous() {
        let body = json!([
            {"command": 8, "message": "undo", "annotation": {"id": 5}},
            {"command": 8, "callback": {"x": 1}, "annotationterm": {"annotation": 5, "term": 2}}
        ]);
        let affected = parse_affected(body).unwrap();
        assert_eq!(affected.len(), 2);
        assert_eq!(affected[0].kind, "annotation");
        assert_eq!(affected[0].id(), Some(5));
        assert!(affected[1].is(ResourceKind::new("annotationterm")));
    }

    #[test]
    fn fields_must_be_object() {
        assert!(parse_fields(json!([1])).is_err());
        assert!(parse_fields(json!({"id": 1})).is_ok());
    }
}
