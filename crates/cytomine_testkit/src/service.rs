//! In-memory stand-in for the Cytomine service.
//!
//! [`MemoryService`] implements [`Transport`] by routing each request against
//! the path templates of its registered descriptors. It keeps one table per
//! resource kind and a server-side command log, so creations, updates and
//! deletions can be undone and redone the way the real service does it.
//!
//! Listing supports the two collection shapes the engine emits:
//! `{collection}.json` and `{scope}/{value}/{collection}.json`. Query filters
//! match by equality on the rendered field value; a `field[ilike]` key
//! matches case-insensitively by substring. `max` and `offset` paginate.

use async_trait::async_trait;
use cytomine_core::{
    catalog, EntityId, FieldMap, IdentityShape, Method, Request, ResourceDescriptor, Transport,
    TransportError,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::debug;

/// First id handed out by a fresh service.
const FIRST_ID: u64 = 1;

/// Start of the simulated clock, in milliseconds.
const EPOCH_MILLIS: u64 = 1_700_000_000_000;

/// Failures the simulated service answers with.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Malformed or incomplete request.
    #[error("{0}")]
    BadRequest(String),

    /// The current privilege mode may not perform the write.
    #[error("{0}")]
    Forbidden(String),

    /// No route or no such resource.
    #[error("{0}")]
    NotFound(String),

    /// Uniqueness violation or invalid command transition.
    #[error("{0}")]
    Conflict(String),
}

impl ServiceError {
    /// Returns the HTTP status the service answers with.
    pub fn status(&self) -> u16 {
        match self {
            ServiceError::BadRequest(_) => 400,
            ServiceError::Forbidden(_) => 403,
            ServiceError::NotFound(_) => 404,
            ServiceError::Conflict(_) => 409,
        }
    }
}

impl From<ServiceError> for TransportError {
    fn from(err: ServiceError) -> Self {
        TransportError::status(err.status(), err.to_string())
    }
}

type ServiceResult<T> = Result<T, ServiceError>;

/// Path placeholder values extracted while routing.
type Captures = Vec<(&'static str, String)>;

/// A mutation remembered by the server so it can be reverted.
#[derive(Debug, Clone)]
struct ServerCommand {
    descriptor: &'static ResourceDescriptor,
    id: u64,
    change: Change,
    undone: bool,
}

#[derive(Debug, Clone)]
enum Change {
    Create { after: FieldMap },
    Update { before: FieldMap, after: FieldMap },
    Delete { before: FieldMap },
}

enum Route {
    Entity(&'static ResourceDescriptor, Captures),
    Create(&'static ResourceDescriptor, Captures),
    List(&'static ResourceDescriptor, Option<(String, String)>),
    Undo(u64),
    Redo(u64),
    AdminOpen,
    AdminClose,
}

struct State {
    descriptors: Vec<&'static ResourceDescriptor>,
    tables: HashMap<&'static str, BTreeMap<u64, FieldMap>>,
    commands: HashMap<u64, ServerCommand>,
    protected: HashSet<&'static str>,
    admin: bool,
    user: u64,
    next_id: u64,
    next_command: u64,
    clock: u64,
}

/// In-memory Cytomine service.
pub struct MemoryService {
    state: Mutex<State>,
    history: Mutex<Vec<Request>>,
    closed: AtomicBool,
}

impl MemoryService {
    /// Creates a service serving every catalog descriptor.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                descriptors: catalog::all().to_vec(),
                tables: HashMap::new(),
                commands: HashMap::new(),
                protected: HashSet::new(),
                admin: false,
                user: 1,
                next_id: FIRST_ID,
                next_command: 1,
                clock: EPOCH_MILLIS,
            }),
            history: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Additionally serves `descriptor`.
    pub fn with_descriptor(mut self, descriptor: &'static ResourceDescriptor) -> Self {
        let state = self.state.get_mut();
        if !state.descriptors.iter().any(|d| d.kind == descriptor.kind) {
            state.descriptors.push(descriptor);
        }
        self
    }

    /// Rejects writes of `descriptor`'s kind unless an admin session is open.
    pub fn require_admin_for(&self, descriptor: &'static ResourceDescriptor) {
        self.state.lock().protected.insert(descriptor.kind.as_str());
    }

    /// Returns true while an admin session is open.
    pub fn is_admin(&self) -> bool {
        self.state.lock().admin
    }

    /// Sets the user id stamped on created resources.
    pub fn set_current_user(&self, user: u64) {
        self.state.lock().user = user;
    }

    /// Inserts a resource directly, without issuing a command.
    pub fn seed(&self, descriptor: &'static ResourceDescriptor, fields: Value) -> EntityId {
        let fields = match fields {
            Value::Object(map) => map,
            _ => FieldMap::new(),
        };
        let mut state = self.state.lock();
        let id = state.insert_new(descriptor, fields);
        EntityId::new(id)
    }

    /// Returns the stored fields of one resource.
    pub fn stored(&self, descriptor: &'static ResourceDescriptor, id: EntityId) -> Option<FieldMap> {
        self.state
            .lock()
            .tables
            .get(descriptor.kind.as_str())
            .and_then(|table| table.get(&id.get()))
            .cloned()
    }

    /// Number of stored resources of `descriptor`'s kind.
    pub fn count(&self, descriptor: &'static ResourceDescriptor) -> usize {
        self.state
            .lock()
            .tables
            .get(descriptor.kind.as_str())
            .map_or(0, BTreeMap::len)
    }

    /// Number of requests received, including rejected ones.
    pub fn request_count(&self) -> usize {
        self.history.lock().len()
    }

    /// Every request received, oldest first.
    pub fn requests(&self) -> Vec<Request> {
        self.history.lock().clone()
    }

    /// Forgets the request history.
    pub fn clear_requests(&self) {
        self.history.lock().clear();
    }

    /// Returns true once the transport has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Default for MemoryService {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryService")
            .field("requests", &self.request_count())
            .field("admin", &self.is_admin())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[async_trait]
impl Transport for MemoryService {
    async fn execute(&self, request: Request) -> Result<Value, TransportError> {
        self.history.lock().push(request.clone());
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        let method = request.method;
        let path = request.path.clone();
        let result = self.state.lock().handle(request);
        match &result {
            Ok(_) => debug!(%method, %path, "served"),
            Err(e) => debug!(%method, %path, status = e.status(), error = %e, "rejected"),
        }
        result.map_err(TransportError::from)
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl State {
    fn handle(&mut self, request: Request) -> ServiceResult<Value> {
        let path = request.path.trim_start_matches('/');
        match (request.method, self.route(request.method, path)?) {
            (Method::Get, Route::Undo(id)) => self.undo(id),
            (Method::Get, Route::Redo(id)) => self.redo(id),
            (Method::Get, Route::AdminOpen) => {
                self.admin = true;
                Ok(json!({}))
            }
            (Method::Get, Route::AdminClose) => {
                self.admin = false;
                Ok(json!({}))
            }
            (Method::Get, Route::List(descriptor, scope)) => {
                self.list(descriptor, scope, &request.query)
            }
            (Method::Get, Route::Entity(descriptor, captures)) => {
                let id = self.find(descriptor, &captures)?;
                Ok(Value::Object(self.row(descriptor, id)?.clone()))
            }
            (Method::Post, Route::Create(descriptor, captures)) => {
                self.create(descriptor, captures, request.body)
            }
            (Method::Put, Route::Entity(descriptor, captures)) => {
                self.update(descriptor, &captures, request.body)
            }
            (Method::Delete, Route::Entity(descriptor, captures)) => {
                self.delete(descriptor, &captures)
            }
            (method, _) => Err(ServiceError::NotFound(format!(
                "{method} is not allowed on {path}"
            ))),
        }
    }

    fn route(&self, method: Method, path: &str) -> ServiceResult<Route> {
        if let Some(captures) = match_template("command/{id}/undo.json", path) {
            return command_id(&captures).map(Route::Undo);
        }
        if let Some(captures) = match_template("command/{id}/redo.json", path) {
            return command_id(&captures).map(Route::Redo);
        }
        match path {
            "session/admin/open.json" => return Ok(Route::AdminOpen),
            "session/admin/close.json" => return Ok(Route::AdminClose),
            _ => {}
        }

        if method == Method::Post {
            for descriptor in self.descriptors.iter().copied() {
                if let Some(captures) = match_template(descriptor.create_path, path) {
                    return Ok(Route::Create(descriptor, captures));
                }
            }
        }

        for descriptor in self.descriptors.iter().copied() {
            if let Some(captures) = match_template(descriptor.entity_path, path) {
                return Ok(Route::Entity(descriptor, captures));
            }
        }

        if method == Method::Get {
            let segments: Vec<&str> = path.split('/').collect();
            let (scope, last) = match segments.as_slice() {
                [last] => (None, *last),
                [key, value, last] => {
                    let value = urlencoding::decode(value).map_err(|_| {
                        ServiceError::BadRequest(format!("invalid scope value {value}"))
                    })?;
                    (Some((key.to_string(), value.into_owned())), *last)
                }
                _ => (None, ""),
            };
            let name = last.strip_suffix(".json").unwrap_or_default();
            let descriptor = self
                .descriptors
                .iter()
                .copied()
                .find(|d| d.collection_name == name);
            if let Some(descriptor) = descriptor {
                let scope_known = scope
                    .as_ref()
                    .map_or(true, |(key, _)| descriptor.is_scope(key));
                if scope_known {
                    return Ok(Route::List(descriptor, scope));
                }
            }
        }

        Err(ServiceError::NotFound(format!("no route for {method} {path}")))
    }

    fn list(
        &self,
        descriptor: &'static ResourceDescriptor,
        scope: Option<(String, String)>,
        query: &[(String, String)],
    ) -> ServiceResult<Value> {
        let mut max = 0usize;
        let mut offset = 0usize;
        let mut filters: Vec<(&str, &str)> = Vec::new();
        for (key, value) in query {
            match key.as_str() {
                "max" => max = parse_count(key, value)?,
                "offset" => offset = parse_count(key, value)?,
                _ => filters.push((key.as_str(), value.as_str())),
            }
        }
        if let Some((key, value)) = &scope {
            filters.push((key.as_str(), value.as_str()));
        }

        let rows: Vec<&FieldMap> = self
            .tables
            .get(descriptor.kind.as_str())
            .into_iter()
            .flat_map(BTreeMap::values)
            .filter(|row| filters.iter().all(|(k, v)| matches_filter(row, k, v)))
            .collect();
        let size = rows.len();
        let take = if max == 0 { usize::MAX } else { max };
        let items: Vec<Value> = rows
            .into_iter()
            .skip(offset)
            .take(take)
            .map(|row| Value::Object(row.clone()))
            .collect();
        let (per_page, total_pages) = match max {
            0 => (size, 1),
            max => (max, size.div_ceil(max)),
        };

        Ok(json!({
            "collection": items,
            "offset": offset,
            "perPage": per_page,
            "size": size,
            "totalPages": total_pages,
        }))
    }

    fn create(
        &mut self,
        descriptor: &'static ResourceDescriptor,
        captures: Captures,
        body: Option<Value>,
    ) -> ServiceResult<Value> {
        self.check_write(descriptor)?;
        let mut fields = body_object(body)?;
        for (name, value) in captures {
            fields
                .entry(name.to_string())
                .or_insert_with(|| capture_value(&value));
        }

        let missing: Vec<&str> = descriptor
            .required_fields()
            .filter(|name| matches!(fields.get(*name), None | Some(Value::Null)))
            .collect();
        if !missing.is_empty() {
            return Err(ServiceError::BadRequest(format!(
                "{} is missing {}",
                descriptor.kind,
                missing.join(", ")
            )));
        }

        if let IdentityShape::Composite(components) = descriptor.identity {
            let duplicate = self
                .tables
                .get(descriptor.kind.as_str())
                .into_iter()
                .flat_map(BTreeMap::values)
                .any(|row| {
                    components
                        .iter()
                        .all(|c| render(row.get(*c)) == render(fields.get(*c)))
                });
            if duplicate {
                return Err(ServiceError::Conflict(format!(
                    "{} already exists",
                    descriptor.kind
                )));
            }
        }

        let id = self.insert_new(descriptor, fields);
        let after = self.row(descriptor, id)?.clone();
        let command = self.record(descriptor, id, Change::Create {
            after: after.clone(),
        });
        Ok(envelope(descriptor, command, "added", after))
    }

    fn update(
        &mut self,
        descriptor: &'static ResourceDescriptor,
        captures: &Captures,
        body: Option<Value>,
    ) -> ServiceResult<Value> {
        self.check_write(descriptor)?;
        let patch = body_object(body)?;
        let id = self.find(descriptor, captures)?;
        let now = self.tick();

        let row = self.row_mut(descriptor, id)?;
        let before = row.clone();
        for (key, value) in patch {
            if matches!(key.as_str(), "id" | "created") {
                continue;
            }
            row.insert(key, value);
        }
        row.insert("updated".into(), Value::String(now.to_string()));
        let after = row.clone();

        let command = self.record(descriptor, id, Change::Update {
            before,
            after: after.clone(),
        });
        Ok(envelope(descriptor, command, "edited", after))
    }

    fn delete(
        &mut self,
        descriptor: &'static ResourceDescriptor,
        captures: &Captures,
    ) -> ServiceResult<Value> {
        self.check_write(descriptor)?;
        let id = self.find(descriptor, captures)?;
        let before = self
            .table_mut(descriptor)
            .remove(&id)
            .ok_or_else(|| not_found(descriptor, id))?;

        let command = self.record(descriptor, id, Change::Delete {
            before: before.clone(),
        });
        Ok(envelope(descriptor, command, "deleted", before))
    }

    fn undo(&mut self, command: u64) -> ServiceResult<Value> {
        let entry = self
            .commands
            .get(&command)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("command {command} not found")))?;
        if entry.undone {
            return Err(ServiceError::Conflict(format!(
                "command {command} is already undone"
            )));
        }

        let table = self.table_mut(entry.descriptor);
        let fields = match &entry.change {
            Change::Create { after } => {
                table.remove(&entry.id);
                after.clone()
            }
            Change::Update { before, .. } | Change::Delete { before } => {
                table.insert(entry.id, before.clone());
                before.clone()
            }
        };
        self.set_undone(command, true);
        Ok(Value::Array(vec![envelope(
            entry.descriptor,
            command,
            "undone",
            fields,
        )]))
    }

    fn redo(&mut self, command: u64) -> ServiceResult<Value> {
        let entry = self
            .commands
            .get(&command)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("command {command} not found")))?;
        if !entry.undone {
            return Err(ServiceError::Conflict(format!(
                "command {command} has nothing to redo"
            )));
        }

        let table = self.table_mut(entry.descriptor);
        let fields = match &entry.change {
            Change::Create { after } | Change::Update { after, .. } => {
                table.insert(entry.id, after.clone());
                after.clone()
            }
            Change::Delete { before } => {
                table.remove(&entry.id);
                before.clone()
            }
        };
        self.set_undone(command, false);
        Ok(Value::Array(vec![envelope(
            entry.descriptor,
            command,
            "redone",
            fields,
        )]))
    }

    fn check_write(&self, descriptor: &'static ResourceDescriptor) -> ServiceResult<()> {
        if self.protected.contains(descriptor.kind.as_str()) && !self.admin {
            return Err(ServiceError::Forbidden(format!(
                "writing {} requires an admin session",
                descriptor.kind
            )));
        }
        Ok(())
    }

    /// Locates the stored row addressed by path captures.
    fn find(&self, descriptor: &'static ResourceDescriptor, captures: &Captures) -> ServiceResult<u64> {
        let table = self.tables.get(descriptor.kind.as_str());
        let found = table.and_then(|table| {
            table.iter().find_map(|(id, row)| {
                captures
                    .iter()
                    .all(|(name, value)| render(row.get(*name)).as_deref() == Some(value.as_str()))
                    .then_some(*id)
            })
        });
        found.ok_or_else(|| {
            let address: Vec<String> = captures.iter().map(|(k, v)| format!("{k}={v}")).collect();
            ServiceError::NotFound(format!(
                "{} {} not found",
                descriptor.kind,
                address.join(",")
            ))
        })
    }

    fn insert_new(&mut self, descriptor: &'static ResourceDescriptor, mut fields: FieldMap) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        let now = Value::String(self.tick().to_string());

        fields.insert("id".into(), Value::from(id));
        fields.insert("created".into(), now.clone());
        fields.insert("updated".into(), now);
        if descriptor.field("user").is_some_and(|spec| spec.read_only) {
            fields
                .entry("user".to_string())
                .or_insert(Value::from(self.user));
        }

        self.table_mut(descriptor).insert(id, fields);
        id
    }

    fn record(&mut self, descriptor: &'static ResourceDescriptor, id: u64, change: Change) -> u64 {
        let command = self.next_command;
        self.next_command += 1;
        self.commands.insert(
            command,
            ServerCommand {
                descriptor,
                id,
                change,
                undone: false,
            },
        );
        command
    }

    fn set_undone(&mut self, command: u64, undone: bool) {
        if let Some(entry) = self.commands.get_mut(&command) {
            entry.undone = undone;
        }
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn row(&self, descriptor: &'static ResourceDescriptor, id: u64) -> ServiceResult<&FieldMap> {
        self.tables
            .get(descriptor.kind.as_str())
            .and_then(|table| table.get(&id))
            .ok_or_else(|| not_found(descriptor, id))
    }

    fn row_mut(
        &mut self,
        descriptor: &'static ResourceDescriptor,
        id: u64,
    ) -> ServiceResult<&mut FieldMap> {
        self.table_mut(descriptor)
            .get_mut(&id)
            .ok_or_else(|| not_found(descriptor, id))
    }

    fn table_mut(&mut self, descriptor: &'static ResourceDescriptor) -> &mut BTreeMap<u64, FieldMap> {
        self.tables.entry(descriptor.kind.as_str()).or_default()
    }
}

/// Matches `path` against a template whose placeholders fill whole segments,
/// optionally with a fixed prefix or suffix such as `{id}.json`.
fn match_template(template: &'static str, path: &str) -> Option<Captures> {
    let expected: Vec<&'static str> = template.split('/').collect();
    let actual: Vec<&str> = path.split('/').collect();
    if expected.len() != actual.len() {
        return None;
    }

    let mut captures = Vec::new();
    for (pattern, segment) in expected.into_iter().zip(actual) {
        match (pattern.find('{'), pattern.find('}')) {
            (Some(open), Some(close)) if open < close => {
                let value = segment
                    .strip_prefix(&pattern[..open])?
                    .strip_suffix(&pattern[close + 1..])?;
                if value.is_empty() {
                    return None;
                }
                captures.push((&pattern[open + 1..close], value.to_string()));
            }
            _ if pattern == segment => {}
            _ => return None,
        }
    }
    Some(captures)
}

fn matches_filter(row: &FieldMap, key: &str, expected: &str) -> bool {
    match key.strip_suffix("[ilike]") {
        Some(field) => {
            let needle = expected.trim_matches('%').to_lowercase();
            render(row.get(field)).is_some_and(|value| value.to_lowercase().contains(&needle))
        }
        None => render(row.get(key)).as_deref() == Some(expected),
    }
}

/// Renders a scalar the way it appears in a path or query string.
fn render(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn capture_value(value: &str) -> Value {
    value
        .parse::<u64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::String(value.to_string()))
}

fn command_id(captures: &Captures) -> ServiceResult<u64> {
    captures
        .first()
        .and_then(|(_, value)| value.parse().ok())
        .ok_or_else(|| ServiceError::BadRequest("invalid command id".into()))
}

fn parse_count(key: &str, value: &str) -> ServiceResult<usize> {
    value
        .parse()
        .map_err(|_| ServiceError::BadRequest(format!("`{key}` must be a count, got {value}")))
}

fn body_object(body: Option<Value>) -> ServiceResult<FieldMap> {
    match body {
        Some(Value::Object(map)) => Ok(map),
        _ => Err(ServiceError::BadRequest("body must be a JSON object".into())),
    }
}

fn not_found(descriptor: &'static ResourceDescriptor, id: u64) -> ServiceError {
    ServiceError::NotFound(format!("{} {id} not found", descriptor.kind))
}

fn envelope(
    descriptor: &'static ResourceDescriptor,
    command: u64,
    verb: &str,
    fields: FieldMap,
) -> Value {
    let id = fields.get("id").cloned().unwrap_or(Value::Null);
    let mut map = FieldMap::new();
    map.insert("command".into(), Value::from(command));
    map.insert(
        "message".into(),
        Value::String(format!(
            "{} {} {verb}",
            descriptor.kind,
            render(Some(&id)).unwrap_or_default()
        )),
    );
    map.insert("printMessage".into(), Value::Bool(true));
    map.insert(
        "callback".into(),
        json!({
            "method": format!("be.cytomine.{verb}.{}", descriptor.kind),
            "id": id,
        }),
    );
    map.insert(descriptor.kind.as_str().to_string(), Value::Object(fields));
    Value::Object(map)
}
