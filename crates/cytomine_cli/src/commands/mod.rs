//! CLI command implementations.

pub mod delete;
pub mod get;
pub mod history;
pub mod kinds;
pub mod list;

use cytomine_core::{catalog, AffectedEntity, Entity, EntityId, Identity, ResourceDescriptor};
use serde_json::Value;
use std::fmt::Write as _;
use std::str::FromStr;
use thiserror::Error;

/// Result type for command implementations.
pub type CommandResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Argument errors detected before any request is sent.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CliError {
    /// No descriptor carries this kind tag.
    #[error("unknown resource kind `{0}` (see `cytomine kinds`)")]
    UnknownKind(String),

    /// The identity argument cannot be parsed.
    #[error("invalid identity `{0}`: expected an id or `name=id,...`")]
    InvalidIdentity(String),

    /// A `key=value` argument without `=`.
    #[error("invalid pair `{0}`: expected `key=value`")]
    InvalidPair(String),

    /// Unsupported output format.
    #[error("unknown format `{0}` (text, json)")]
    UnknownFormat(String),
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Human-readable lines.
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl FromStr for Format {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Format::Text),
            "json" => Ok(Format::Json),
            other => Err(CliError::UnknownFormat(other.to_string())),
        }
    }
}

/// Parses a `key=value` argument.
pub fn parse_pair(arg: &str) -> Result<(String, String), CliError> {
    match arg.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(CliError::InvalidPair(arg.to_string())),
    }
}

/// Finds the catalog descriptor for `kind`.
pub fn descriptor(kind: &str) -> Result<&'static ResourceDescriptor, CliError> {
    catalog::lookup(kind).ok_or_else(|| CliError::UnknownKind(kind.to_string()))
}

/// Parses `12` or `userannotation=5,term=9`.
pub fn parse_identity(arg: &str) -> Result<Identity, CliError> {
    let invalid = || CliError::InvalidIdentity(arg.to_string());
    if !arg.contains('=') {
        return arg.trim().parse::<u64>().map(Identity::single).map_err(|_| invalid());
    }

    let mut parts = Vec::new();
    for part in arg.split(',') {
        let (name, id) = part.split_once('=').ok_or_else(invalid)?;
        let id: u64 = id.trim().parse().map_err(|_| invalid())?;
        parts.push((name.trim().to_string(), EntityId::new(id)));
    }
    Ok(Identity::Composite(parts))
}

/// Renders one entity.
pub fn render_entity(entity: &Entity, format: Format) -> CommandResult<String> {
    match format {
        Format::Json => Ok(serde_json::to_string_pretty(entity.fields())?),
        Format::Text => {
            let mut out = entity.to_string();
            for (name, value) in entity.fields() {
                write!(out, "\n  {name}: {}", render_value(value))?;
            }
            Ok(out)
        }
    }
}

/// Renders the entities affected by an undo or redo.
pub fn render_affected(affected: &[AffectedEntity], format: Format) -> CommandResult<String> {
    match format {
        Format::Json => {
            let items: Vec<Value> = affected
                .iter()
                .map(|a| serde_json::json!({ "kind": a.kind, "fields": a.fields }))
                .collect();
            Ok(serde_json::to_string_pretty(&items)?)
        }
        Format::Text => {
            let lines: Vec<String> = affected
                .iter()
                .map(|a| match a.id() {
                    Some(id) => format!("[{}] {id}", a.kind),
                    None => format!("[{}]", a.kind),
                })
                .collect();
            Ok(lines.join("\n"))
        }
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs() {
        assert_eq!(
            parse_pair("project=12"),
            Ok(("project".to_string(), "12".to_string()))
        );
        assert_eq!(
            parse_pair("name[ilike]=%lung%"),
            Ok(("name[ilike]".to_string(), "%lung%".to_string()))
        );
        assert_eq!(parse_pair("a=b=c").map(|(_, v)| v), Ok("b=c".to_string()));
        assert!(parse_pair("novalue").is_err());
        assert!(parse_pair("=x").is_err());
    }

    #[test]
    fn identities() {
        assert_eq!(parse_identity("12"), Ok(Identity::single(12u64)));
        assert_eq!(
            parse_identity("userannotation=5, term=9"),
            Ok(Identity::composite([("userannotation", 5u64), ("term", 9u64)]))
        );
        assert!(parse_identity("abc").is_err());
        assert!(parse_identity("term=x").is_err());
        assert!(parse_identity("term").is_err());
    }

    #[test]
    fn formats_and_kinds() {
        assert_eq!("json".parse::<Format>(), Ok(Format::Json));
        assert_eq!("text".parse::<Format>(), Ok(Format::Text));
        assert!("yaml".parse::<Format>().is_err());

        assert!(descriptor("project").is_ok());
        assert_eq!(
            descriptor("slide").unwrap_err(),
            CliError::UnknownKind("slide".into())
        );
    }
}
