//! Get command implementation.

use super::{descriptor, parse_identity, render_entity, CommandResult, Format};
use cytomine_core::{Entity, Session};
use std::sync::Arc;

/// Runs the get command.
pub async fn run(
    session: &Arc<Session>,
    kind: &str,
    identity: &str,
    format: Format,
) -> CommandResult<String> {
    let descriptor = descriptor(kind)?;
    let identity = parse_identity(identity)?;
    let entity = Entity::fetch_by(session, descriptor, &identity).await?;
    render_entity(&entity, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cytomine_testkit::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn fetches_and_renders() {
        let env = TestEnv::new();
        let id = env.service.seed(&catalog::PROJECT, json!({ "name": "lung" }));

        let text = run(&env.session, "project", &id.to_string(), Format::Text)
            .await
            .unwrap();
        assert!(text.starts_with(&format!("[project] {id}")));
        assert!(text.contains("name: lung"));

        let body = run(&env.session, "project", &id.to_string(), Format::Json)
            .await
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed["name"], "lung");
    }

    #[tokio::test]
    async fn unknown_kind_sends_nothing() {
        let env = TestEnv::new();
        assert!(run(&env.session, "slide", "1", Format::Text).await.is_err());
        assert_eq!(env.service.request_count(), 0);
    }
}
