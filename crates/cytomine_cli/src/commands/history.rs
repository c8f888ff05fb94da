//! Undo and redo command implementations.

use super::{render_affected, CommandResult, Format};
use cytomine_core::{CommandId, Session};
use std::sync::Arc;

/// Reverts `command`.
pub async fn undo(
    session: &Arc<Session>,
    command: Option<CommandId>,
    format: Format,
) -> CommandResult<String> {
    let affected = session.undo(command).await?;
    render_affected(&affected, format)
}

/// Reapplies `command`.
pub async fn redo(
    session: &Arc<Session>,
    command: Option<CommandId>,
    format: Format,
) -> CommandResult<String> {
    let affected = session.redo(command).await?;
    render_affected(&affected, format)
}
