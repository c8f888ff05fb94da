//! Undo/redo command tracking.
//!
//! Every successful mutation returns a server-issued command identifier.
//! The [`CommandLog`] remembers the most recent one and the state of every
//! command it has seen, so undo and redo can be rejected locally when the
//! transition is known to be invalid.

use crate::descriptor::ResourceKind;
use crate::entity::FieldMap;
use crate::error::{ClientError, ClientResult};
use std::collections::{HashMap, VecDeque};
use std::fmt;

/// Number of command states a log remembers by default.
pub const DEFAULT_HISTORY: usize = 1024;

/// Opaque identifier of one remote mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CommandId(u64);

impl CommandId {
    /// Wraps a raw identifier.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// State of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandState {
    /// The command's effect is in place.
    Applied,
    /// The command's effect has been reverted.
    Reverted,
}

/// An entity touched by an undo or redo.
///
/// One command may affect entities of several kinds.
#[derive(Debug, Clone, PartialEq)]
pub struct AffectedEntity {
    /// Kind tag reported by the service.
    pub kind: String,
    /// Fields of the entity after the reversal.
    pub fields: FieldMap,
}

impl AffectedEntity {
    /// Returns true if the entity is of `kind`.
    pub fn is(&self, kind: ResourceKind) -> bool {
        self.kind == kind.as_str()
    }

    /// Returns the numeric `id` field, if any.
    pub fn id(&self) -> Option<u64> {
        self.fields.get("id").and_then(|v| v.as_u64())
    }
}

/// Tracks the last command and per-command state.
///
/// At most `capacity` states are kept. The oldest are forgotten first, and
/// the last command is never forgotten. A forgotten command is unknown to the
/// log, so undo and redo of it are left to the server.
#[derive(Debug)]
pub struct CommandLog {
    last: Option<CommandId>,
    states: HashMap<CommandId, CommandState>,
    order: VecDeque<CommandId>,
    capacity: usize,
}

impl Default for CommandLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY)
    }
}

impl CommandLog {
    /// Creates an empty log remembering [`DEFAULT_HISTORY`] states.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty log remembering at most `capacity` states (min 1).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            last: None,
            states: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Number of command states currently remembered.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Returns true if no command is remembered.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Records a freshly applied command, superseding the previous last.
    pub fn record(&mut self, id: CommandId) {
        self.last = Some(id);
        self.track(id, CommandState::Applied);
    }

    /// Returns the last recorded command.
    pub fn last(&self) -> Option<CommandId> {
        self.last
    }

    /// Returns the known state of `id`.
    pub fn state(&self, id: CommandId) -> Option<CommandState> {
        self.states.get(&id).copied()
    }

    /// Picks the explicit target or falls back to the last command.
    pub fn resolve(&self, target: Option<CommandId>) -> ClientResult<CommandId> {
        target.or(self.last).ok_or(ClientError::NoCommand)
    }

    /// Fails if `id` is known to be reverted already.
    pub fn check_undo(&self, id: CommandId) -> ClientResult<()> {
        match self.state(id) {
            Some(CommandState::Reverted) => Err(ClientError::AlreadyUndone(id)),
            _ => Ok(()),
        }
    }

    /// Fails if `id` is known to still be applied.
    pub fn check_redo(&self, id: CommandId) -> ClientResult<()> {
        match self.state(id) {
            Some(CommandState::Applied) => Err(ClientError::NothingToRedo(id)),
            _ => Ok(()),
        }
    }

    /// Marks `id` as reverted. The last command is left untouched.
    pub fn mark_reverted(&mut self, id: CommandId) {
        self.track(id, CommandState::Reverted);
    }

    /// Marks `id` as applied again. The last command is left untouched.
    pub fn mark_applied(&mut self, id: CommandId) {
        self.track(id, CommandState::Applied);
    }

    /// Forgets everything.
    pub fn clear(&mut self) {
        self.last = None;
        self.states.clear();
        self.order.clear();
    }

    fn track(&mut self, id: CommandId, state: CommandState) {
        if self.states.insert(id, state).is_none() {
            self.order.push_back(id);
        }
        while self.order.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            if Some(oldest) == self.last {
                self.order.push_back(oldest);
                continue;
            }
            self.states.remove(&oldest);
        }
    }
}
