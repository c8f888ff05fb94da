//! Kinds command implementation.

use super::{CommandResult, Format};
use cytomine_core::catalog;
use serde::Serialize;

/// One resource kind known to the CLI.
#[derive(Debug, Serialize)]
pub struct KindInfo {
    /// Kind tag.
    pub kind: &'static str,
    /// Collection path name.
    pub collection: &'static str,
    /// Parent scopes usable as `--filter` keys in collection paths.
    pub scopes: &'static [&'static str],
    /// Whether listing needs one of the scopes.
    pub scope_required: bool,
    /// Required fields on creation.
    pub required: Vec<&'static str>,
    /// Whether updates are allowed.
    pub updatable: bool,
}

/// Runs the kinds command.
pub fn run(format: Format) -> CommandResult<String> {
    let kinds: Vec<KindInfo> = catalog::all()
        .iter()
        .map(|d| KindInfo {
            kind: d.kind.as_str(),
            collection: d.collection_name,
            scopes: d.scopes,
            scope_required: d.scope_required,
            required: d.required_fields().collect(),
            updatable: d.operations.update,
        })
        .collect();

    match format {
        Format::Json => Ok(serde_json::to_string_pretty(&kinds)?),
        Format::Text => {
            let lines: Vec<String> = kinds
                .iter()
                .map(|k| {
                    let mut line = format!("{:<16} required: {}", k.kind, k.required.join(", "));
                    if !k.scopes.is_empty() {
                        let marker = if k.scope_required { " (required)" } else { "" };
                        line.push_str(&format!("; scopes: {}{marker}", k.scopes.join(", ")));
                    }
                    line
                })
                .collect();
            Ok(lines.join("\n"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_every_catalog_kind() {
        let text = run(Format::Text).unwrap();
        assert_eq!(text.lines().count(), catalog::all().len());
        assert!(text
            .lines()
            .any(|l| l.starts_with("imageinstance") && l.contains("(required)")));

        let json: serde_json::Value = serde_json::from_str(&run(Format::Json).unwrap()).unwrap();
        let annotation_term = json
            .as_array()
            .unwrap()
            .iter()
            .find(|k| k["kind"] == "annotationterm")
            .unwrap();
        assert_eq!(annotation_term["updatable"], false);
    }
}
