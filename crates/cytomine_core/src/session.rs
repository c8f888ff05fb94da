//! Session: the explicit context shared by entities and collections.

use crate::command::{AffectedEntity, CommandId, CommandLog, CommandState};
use crate::config::SessionConfig;
use crate::error::{ClientError, ClientResult};
use crate::response::parse_affected;
use crate::transport::{Request, Transport};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Privilege mode of the authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivilegeMode {
    /// Regular user rights.
    Standard,
    /// An admin session has been opened.
    Admin,
}

/// Authenticated connection to the service.
///
/// A session owns the transport, the privilege mode and the command log.
/// It never holds references to entities; commands reference remote state.
///
/// The last command is shared by every caller of the session. Concurrent
/// mutations race to overwrite it; callers that care must serialize.
pub struct Session {
    transport: Arc<dyn Transport>,
    config: SessionConfig,
    privilege: RwLock<PrivilegeMode>,
    commands: Mutex<CommandLog>,
    closed: AtomicBool,
}

impl Session {
    /// Creates a session over `transport` with default configuration.
    pub fn new<T: Transport + 'static>(transport: T) -> Arc<Self> {
        Self::with_config(Arc::new(transport), SessionConfig::default())
    }

    /// Creates a session over a shared transport.
    pub fn with_config(transport: Arc<dyn Transport>, config: SessionConfig) -> Arc<Self> {
        let commands = CommandLog::with_capacity(config.command_history);
        Arc::new(Self {
            transport,
            config,
            privilege: RwLock::new(PrivilegeMode::Standard),
            commands: Mutex::new(commands),
            closed: AtomicBool::new(false),
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns true once [`logout`](Self::logout) has run.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Executes one request, mapping transport failures to client errors.
    pub async fn execute(&self, request: Request) -> ClientResult<Value> {
        if self.is_closed() {
            return Err(ClientError::SessionClosed);
        }

        debug!(
            method = %request.method,
            path = %request.path,
            query = request.query.len(),
            "request"
        );
        let method = request.method;
        let path = request.path.clone();

        self.transport.execute(request).await.map_err(|e| {
            debug!(%method, %path, error = %e, "request failed");
            ClientError::from(e)
        })
    }

    /// Records the command returned by a successful mutation.
    pub fn record_command(&self, id: CommandId) {
        self.commands.lock().record(id);
        info!(command = %id, "command recorded");
    }

    /// Returns the most recent command.
    pub fn last_command(&self) -> Option<CommandId> {
        self.commands.lock().last()
    }

    /// Returns the locally known state of `id`.
    pub fn command_state(&self, id: CommandId) -> Option<CommandState> {
        self.commands.lock().state(id)
    }

    /// Reverts `target`, or the last command if `None`.
    ///
    /// Returns the entities affected by the reversal. The last command is not
    /// changed, so a following `undo(None)` addresses the same command.
    pub async fn undo(&self, target: Option<CommandId>) -> ClientResult<Vec<AffectedEntity>> {
        let id = {
            let log = self.commands.lock();
            let id = log.resolve(target)?;
            log.check_undo(id)?;
            id
        };

        let body = match self
            .execute(Request::get(format!("command/{id}/undo.json")))
            .await
        {
            Err(ClientError::Conflict { .. }) => {
                // The server holds the command reverted already.
                self.commands.lock().mark_reverted(id);
                return Err(ClientError::AlreadyUndone(id));
            }
            other => other?,
        };

        self.commands.lock().mark_reverted(id);
        info!(command = %id, "command undone");
        parse_affected(body)
    }

    /// Reapplies `target`, or the last command if `None`.
    pub async fn redo(&self, target: Option<CommandId>) -> ClientResult<Vec<AffectedEntity>> {
        let id = {
            let log = self.commands.lock();
            let id = log.resolve(target)?;
            log.check_redo(id)?;
            id
        };

        let body = match self
            .execute(Request::get(format!("command/{id}/redo.json")))
            .await
        {
            Err(ClientError::Conflict { .. }) => {
                self.commands.lock().mark_applied(id);
                return Err(ClientError::NothingToRedo(id));
            }
            other => other?,
        };

        self.commands.lock().mark_applied(id);
        info!(command = %id, "command redone");
        parse_affected(body)
    }

    /// Returns the current privilege mode.
    pub fn privilege(&self) -> PrivilegeMode {
        *self.privilege.read()
    }

    /// Elevates the session to admin rights.
    pub async fn open_admin_session(&self) -> ClientResult<()> {
        self.execute(Request::get("session/admin/open.json")).await?;
        *self.privilege.write() = PrivilegeMode::Admin;
        info!("admin session opened");
        Ok(())
    }

    /// Drops admin rights.
    pub async fn close_admin_session(&self) -> ClientResult<()> {
        self.execute(Request::get("session/admin/close.json")).await?;
        *self.privilege.write() = PrivilegeMode::Standard;
        info!("admin session closed");
        Ok(())
    }

    /// Tears the session down. Every later call fails with `SessionClosed`.
    pub async fn logout(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.commands.lock().clear();
        *self.privilege.write() = PrivilegeMode::Standard;
        self.transport.close().await;
        info!("session closed");
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("privilege", &self.privilege())
            .field("last_command", &self.last_command())
            .field("closed", &self.is_closed())
            .finish()
    }
}
