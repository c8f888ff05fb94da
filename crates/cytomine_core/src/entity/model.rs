//! Generic entity backed by a resource descriptor.

use crate::command::CommandId;
use crate::descriptor::{render_template, IdentityShape, ResourceDescriptor, ResourceKind};
use crate::entity::id::{EntityId, Identity};
use crate::error::{ClientError, ClientResult, Operation};
use crate::response::{parse_fields, parse_mutation};
use crate::session::Session;
use crate::transport::Request;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Ordered mapping of field name to value.
pub type FieldMap = Map<String, Value>;

/// One remote resource instance.
///
/// An entity without an `id` is new: it can be saved but not updated.
/// Every merge of server data overwrites local values key by key, so the
/// last state returned by the service wins.
#[derive(Clone)]
pub struct Entity {
    session: Arc<Session>,
    descriptor: &'static ResourceDescriptor,
    fields: FieldMap,
    deleted: bool,
}

impl Entity {
    /// Creates an empty, new entity.
    pub fn new(session: &Arc<Session>, descriptor: &'static ResourceDescriptor) -> Self {
        Self::with_fields(session, descriptor, FieldMap::new())
    }

    /// Creates an entity from a partial field mapping.
    pub fn with_fields(
        session: &Arc<Session>,
        descriptor: &'static ResourceDescriptor,
        fields: FieldMap,
    ) -> Self {
        Self {
            session: Arc::clone(session),
            descriptor,
            fields,
            deleted: false,
        }
    }

    /// Returns the descriptor.
    pub fn descriptor(&self) -> &'static ResourceDescriptor {
        self.descriptor
    }

    /// Returns the resource-type tag.
    pub fn kind(&self) -> ResourceKind {
        self.descriptor.kind
    }

    /// Returns the session this entity talks through.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Returns the server-assigned id.
    pub fn id(&self) -> Option<EntityId> {
        self.fields.get("id").and_then(EntityId::from_value)
    }

    /// Returns true if the entity has never been persisted.
    pub fn is_new(&self) -> bool {
        self.id().is_none()
    }

    /// Returns true once [`delete`](Self::delete) has succeeded.
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Returns the identity needed to address this entity.
    pub fn identity(&self) -> ClientResult<Identity> {
        match self.descriptor.identity {
            IdentityShape::Single => self.id().map(Identity::Single).ok_or_else(|| {
                ClientError::MissingIdentity {
                    kind: self.kind(),
                    component: "id".into(),
                }
            }),
            IdentityShape::Composite(components) => components
                .iter()
                .map(|name| {
                    self.fields
                        .get(*name)
                        .and_then(EntityId::from_value)
                        .map(|id| (name.to_string(), id))
                        .ok_or_else(|| ClientError::MissingIdentity {
                            kind: self.kind(),
                            component: name.to_string(),
                        })
                })
                .collect::<ClientResult<Vec<_>>>()
                .map(Identity::Composite),
        }
    }

    /// Returns the value of `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Deserializes the value of `name`.
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> ClientResult<Option<T>> {
        match self.fields.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| ClientError::decode(format!("field `{name}`: {e}"))),
        }
    }

    /// Sets `name` locally. Nothing is sent until the next save or update.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Removes `name` locally.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.fields.remove(name)
    }

    /// Returns every known field, including server-computed ones.
    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    /// Returns the fields eligible for serialization: `id` plus declared,
    /// writable fields.
    pub fn public_fields(&self) -> FieldMap {
        let mut out = FieldMap::new();
        if let Some(id) = self.fields.get("id") {
            out.insert("id".into(), id.clone());
        }
        for name in self.descriptor.public_field_names() {
            if let Some(value) = self.fields.get(name) {
                out.insert(name.to_string(), value.clone());
            }
        }
        out
    }

    /// Serializes the public fields.
    pub fn to_json(&self) -> Value {
        Value::Object(self.public_fields())
    }

    /// Fetches the entity addressed by `identity`.
    pub async fn fetch_by(
        session: &Arc<Session>,
        descriptor: &'static ResourceDescriptor,
        identity: &Identity,
    ) -> ClientResult<Self> {
        let path = entity_path(descriptor, identity)?;
        let body = session.execute(Request::get(path)).await?;
        let fields = parse_fields(body)?;
        Ok(Self::with_fields(session, descriptor, fields))
    }

    /// Refreshes this entity from the service.
    ///
    /// A deleted instance may still be fetched: if the deletion was undone,
    /// the entity comes back to life.
    pub async fn fetch(&mut self) -> ClientResult<()> {
        let identity = self.identity()?;
        let path = entity_path(self.descriptor, &identity)?;
        let body = self.session.execute(Request::get(path)).await?;
        self.merge(parse_fields(body)?);
        self.deleted = false;
        Ok(())
    }

    /// Persists the entity: creates it if new, updates it otherwise.
    ///
    /// Returns the command issued by the service.
    pub async fn save(&mut self) -> ClientResult<Option<CommandId>> {
        self.ensure_alive()?;
        if !self.is_new() {
            return self.update().await;
        }

        self.validate_required()?;
        let path = render_template(self.descriptor.create_path, |name| {
            self.fields.get(name).and_then(render_value)
        })
        .map_err(|name| {
            ClientError::validation(format!(
                "{} needs `{name}` to be created",
                self.kind()
            ))
        })?;

        let body = self
            .session
            .execute(Request::post(path, self.to_json()))
            .await?;
        let outcome = parse_mutation(self.kind(), body)?;
        self.merge(outcome.fields);
        debug!(
            kind = %self.kind(),
            id = ?self.id(),
            message = ?outcome.message,
            "entity created"
        );

        Ok(self.finish_mutation(outcome.command))
    }

    /// Sends local changes of a persisted entity.
    pub async fn update(&mut self) -> ClientResult<Option<CommandId>> {
        self.ensure_alive()?;
        self.ensure_supported(Operation::Update)?;
        let identity = self.identity()?;
        let path = entity_path(self.descriptor, &identity)?;

        let body = self
            .session
            .execute(Request::put(path, self.to_json()))
            .await?;
        let outcome = parse_mutation(self.kind(), body)?;
        self.merge(outcome.fields);
        debug!(
            kind = %self.kind(),
            %identity,
            message = ?outcome.message,
            "entity updated"
        );

        Ok(self.finish_mutation(outcome.command))
    }

    /// Deletes the remote resource. Later saves, updates and deletes of
    /// this instance fail with `Deleted`.
    pub async fn delete(&mut self) -> ClientResult<Option<CommandId>> {
        self.ensure_alive()?;
        self.ensure_supported(Operation::Delete)?;
        let identity = self.identity()?;
        let command = Self::delete_by(&self.session, self.descriptor, &identity).await?;
        self.deleted = true;
        Ok(command)
    }

    /// Deletes the resource addressed by `identity`.
    pub async fn delete_by(
        session: &Arc<Session>,
        descriptor: &'static ResourceDescriptor,
        identity: &Identity,
    ) -> ClientResult<Option<CommandId>> {
        if !descriptor.supports(Operation::Delete) {
            return Err(ClientError::NotSupported {
                kind: descriptor.kind,
                operation: Operation::Delete,
            });
        }
        let path = entity_path(descriptor, identity)?;
        let body = session.execute(Request::delete(path)).await?;
        let outcome = parse_mutation(descriptor.kind, body)?;
        debug!(
            kind = %descriptor.kind,
            %identity,
            message = ?outcome.message,
            "entity deleted"
        );

        if let Some(id) = outcome.command {
            session.record_command(id);
        }
        Ok(outcome.command)
    }

    /// Overwrites local fields with server-returned ones.
    pub(crate) fn merge(&mut self, fields: FieldMap) {
        for (key, value) in fields {
            self.fields.insert(key, value);
        }
    }

    fn finish_mutation(&self, command: Option<CommandId>) -> Option<CommandId> {
        if let Some(id) = command {
            self.session.record_command(id);
        }
        command
    }

    fn ensure_alive(&self) -> ClientResult<()> {
        if self.deleted {
            return Err(ClientError::Deleted {
                kind: self.kind(),
                id: self
                    .identity()
                    .map(|i| i.to_string())
                    .unwrap_or_else(|_| "?".into()),
            });
        }
        Ok(())
    }

    fn ensure_supported(&self, operation: Operation) -> ClientResult<()> {
        if self.descriptor.supports(operation) {
            Ok(())
        } else {
            Err(ClientError::NotSupported {
                kind: self.kind(),
                operation,
            })
        }
    }

    fn validate_required(&self) -> ClientResult<()> {
        let missing: Vec<&str> = self
            .descriptor
            .required_fields()
            .filter(|name| matches!(self.fields.get(*name), None | Some(Value::Null)))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ClientError::validation(format!(
                "{} is missing required fields: {}",
                self.kind(),
                missing.join(", ")
            )))
        }
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("kind", &self.kind())
            .field("fields", &self.fields)
            .field("deleted", &self.deleted)
            .finish()
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id() {
            Some(id) => write!(f, "[{}] {}", self.kind(), id),
            None => write!(f, "[{}] new", self.kind()),
        }
    }
}

/// Renders the entity path for `identity`.
fn entity_path(descriptor: &ResourceDescriptor, identity: &Identity) -> ClientResult<String> {
    render_template(descriptor.entity_path, |name| {
        identity.component(name).map(|id| id.to_string())
    })
    .map_err(|component| ClientError::MissingIdentity {
        kind: descriptor.kind,
        component,
    })
}

/// Renders a scalar field for use in a path.
fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{FieldSpec, Operations};
    use crate::transport::{Transport, TransportError};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;

    const NOTE: ResourceDescriptor = ResourceDescriptor {
        kind: ResourceKind::new("note"),
        entity_path: "note/{id}.json",
        create_path: "project/{project}/note.json",
        collection_name: "note",
        fields: &[
            FieldSpec::required("project"),
            FieldSpec::optional("text"),
            FieldSpec::read_only("created"),
        ],
        identity: IdentityShape::Single,
        operations: Operations::APPEND_DELETE,
        scopes: &[],
        scope_required: false,
    };

    const LINK: ResourceDescriptor = ResourceDescriptor {
        kind: ResourceKind::new("link"),
        entity_path: "note/{note}/tag/{tag}.json",
        create_path: "link.json",
        collection_name: "link",
        fields: &[FieldSpec::required("note"), FieldSpec::required("tag")],
        identity: IdentityShape::Composite(&["note", "tag"]),
        operations: Operations::APPEND_DELETE,
        scopes: &[],
        scope_required: false,
    };

    struct RecordingTransport {
        reply: Value,
        requests: Mutex<Vec<Request>>,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn execute(&self, request: Request) -> Result<Value, TransportError> {
            self.requests.lock().push(request);
            Ok(self.reply.clone())
        }
    }

    fn session_with(reply: Value) -> (Arc<Session>, Arc<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport {
            reply,
            requests: Mutex::new(Vec::new()),
        });
        let session = Session::with_config(transport.clone(), Default::default());
        (session, transport)
    }

    #[test]
    fn public_fields_skip_read_only_and_undeclared() {
        let (session, _) = session_with(Value::Null);
        let mut note = Entity::new(&session, &NOTE);
        note.set("id", 4)
            .set("text", "hello")
            .set("created", "1700000000")
            .set("internal", true);

        let public = note.public_fields();
        assert_eq!(public.len(), 2);
        assert!(public.contains_key("id"));
        assert!(public.contains_key("text"));
    }

    #[test]
    fn composite_identity() {
        let (session, _) = session_with(Value::Null);
        let mut link = Entity::new(&session, &LINK);
        link.set("note", 3);
        assert!(matches!(
            link.identity(),
            Err(ClientError::MissingIdentity { component, .. }) if component == "tag"
        ));

        link.set("tag", 8);
        let identity = link.identity().unwrap();
        assert_eq!(entity_path(&LINK, &identity).unwrap(), "note/3/tag/8.json");
    }

    #[tokio::test]
    async fn save_validates_before_sending() {
        let (session, transport) = session_with(Value::Null);
        let mut note = Entity::new(&session, &NOTE);
        note.set("text", "orphan");

        let err = note.save().await.unwrap_err();
        assert!(matches!(err, ClientError::Validation { .. }));
        assert!(transport.requests.lock().is_empty());
    }

    #[tokio::test]
    async fn save_posts_to_rendered_path_and_records_command() {
        let (session, transport) = session_with(json!({
            "command": 12,
            "note": {"id": 40, "project": 7, "text": "hi", "created": "1700000000"}
        }));
        let mut note = Entity::new(&session, &NOTE);
        note.set("project", 7).set("text", "hi");

        let command = note.save().await.unwrap();
        assert_eq!(command, Some(CommandId::new(12)));
        assert_eq!(session.last_command(), Some(CommandId::new(12)));
        assert_eq!(note.id(), Some(EntityId::new(40)));
        assert_eq!(note.get("created"), Some(&json!("1700000000")));

        let requests = transport.requests.lock();
        assert_eq!(requests[0].path, "project/7/note.json");
        assert_eq!(requests[0].body, Some(json!({"project": 7, "text": "hi"})));
    }

    #[tokio::test]
    async fn update_rejected_without_request() {
        let (session, transport) = session_with(Value::Null);
        let mut note = Entity::new(&session, &NOTE);
        note.set("id", 1).set("project", 7);

        let err = note.update().await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::NotSupported {
                operation: Operation::Update,
                ..
            }
        ));
        // save() on a persisted entity takes the update path too
        assert!(note.save().await.is_err());
        assert!(transport.requests.lock().is_empty());
    }

    #[tokio::test]
    async fn delete_marks_instance() {
        let (session, transport) = session_with(json!({"command": 3, "note": {"id": 1}}));
        let mut note = Entity::new(&session, &NOTE);
        note.set("id", 1);

        assert_eq!(note.delete().await.unwrap(), Some(CommandId::new(3)));
        assert!(note.is_deleted());
        assert!(matches!(
            note.delete().await,
            Err(ClientError::Deleted { .. })
        ));
        assert_eq!(transport.requests.lock().len(), 1);
    }

    #[tokio::test]
    async fn update_needs_identity() {
        static EDITABLE: ResourceDescriptor = ResourceDescriptor {
            operations: Operations::ALL,
            ..NOTE
        };
        let (session, transport) = session_with(Value::Null);
        let mut note = Entity::new(&session, &EDITABLE);
        assert!(matches!(
            note.update().await,
            Err(ClientError::MissingIdentity { .. })
        ));
        assert!(transport.requests.lock().is_empty());
    }

    #[test]
    fn typed_access_and_display() {
        let (session, _) = session_with(Value::Null);
        let mut note = Entity::new(&session, &NOTE);
        assert_eq!(note.to_string(), "[note] new");
        note.set("id", 9).set("text", "x");
        assert_eq!(note.to_string(), "[note] 9");
        assert_eq!(note.get_as::<String>("text").unwrap().as_deref(), Some("x"));
        assert_eq!(note.get_as::<String>("missing").unwrap(), None);
        assert!(note.get_as::<u64>("text").is_err());
    }
}
