//! Delete command implementation.

use super::{descriptor, parse_identity, CommandResult, Format};
use cytomine_core::{Entity, Session};
use serde_json::json;
use std::sync::Arc;

/// Runs the delete command.
pub async fn run(
    session: &Arc<Session>,
    kind: &str,
    identity: &str,
    format: Format,
) -> CommandResult<String> {
    let descriptor = descriptor(kind)?;
    let identity = parse_identity(identity)?;
    let command = Entity::delete_by(session, descriptor, &identity).await?;

    match format {
        Format::Json => Ok(serde_json::to_string_pretty(&json!({
            "kind": descriptor.kind.as_str(),
            "identity": identity.to_string(),
            "command": command.map(|c| c.get()),
        }))?),
        Format::Text => Ok(match command {
            Some(command) => format!("deleted [{}] {identity} (command {command})", descriptor.kind),
            None => format!("deleted [{}] {identity}", descriptor.kind),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cytomine_testkit::prelude::*;

    #[tokio::test]
    async fn deletes_and_reports_command() {
        let env = TestEnv::new();
        let id = env.service.seed(&catalog::PROJECT, json!({ "name": "doomed" }));

        let text = run(&env.session, "project", &id.to_string(), Format::Text)
            .await
            .unwrap();
        assert!(text.contains("command 1"));
        assert_eq!(env.service.count(&catalog::PROJECT), 0);
        assert_eq!(env.session.last_command(), Some(CommandId::new(1)));
    }

    #[tokio::test]
    async fn annotation_terms_take_composite_identity() {
        let env = TestEnv::new();
        env.service.seed(
            &catalog::ANNOTATION_TERM,
            json!({ "userannotation": 5, "term": 9 }),
        );

        let body = run(&env.session, "annotationterm", "userannotation=5,term=9", Format::Json)
            .await
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed["identity"], "userannotation=5,term=9");
        assert_eq!(env.service.count(&catalog::ANNOTATION_TERM), 0);
    }
}
