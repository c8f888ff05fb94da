//! Homogeneous, paginated, filterable collection.

use crate::collection::cursor::Cursor;
use crate::command::CommandId;
use crate::descriptor::{ResourceDescriptor, ResourceKind};
use crate::entity::{Entity, FieldMap};
use crate::error::{ClientError, ClientResult};
use crate::filter::{FilterSet, FilterValue};
use crate::response::{parse_page, Page};
use crate::session::Session;
use crate::transport::Request;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// An ordered sequence of entities of one kind.
///
/// Every page fetch replaces the contents with that page's items, except
/// [`fetch_all`](Self::fetch_all) which aggregates every page.
///
/// # Example
///
/// ```rust,ignore
/// let mut annotations = Collection::new(&session, &catalog::ANNOTATION)
///     .with_filter("project", 12u64)
///     .with_filter("term", 3u64)
///     .with_page_size(100);
///
/// annotations.fetch_page(None).await?;
/// while annotations.cursor().has_next() {
///     annotations.fetch_next_page().await?;
/// }
/// ```
pub struct Collection {
    session: Arc<Session>,
    descriptor: &'static ResourceDescriptor,
    filters: FilterSet,
    cursor: Cursor,
    items: Vec<Entity>,
}

impl Collection {
    /// Creates an empty collection using the session's default page size.
    pub fn new(session: &Arc<Session>, descriptor: &'static ResourceDescriptor) -> Self {
        Self {
            session: Arc::clone(session),
            descriptor,
            filters: FilterSet::new(),
            cursor: Cursor::new(session.config().default_page_size),
            items: Vec::new(),
        }
    }

    /// Adds a filter.
    #[must_use]
    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.filters.set(key, value);
        self
    }

    /// Merges a filter set.
    #[must_use]
    pub fn with_filters(mut self, filters: &FilterSet) -> Self {
        self.filters.merge(filters);
        self
    }

    /// Sets the page size (0 = unpaginated).
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.cursor.set_page_size(page_size);
        self
    }

    /// Returns the descriptor.
    pub fn descriptor(&self) -> &'static ResourceDescriptor {
        self.descriptor
    }

    /// Returns the resource-type tag of the members.
    pub fn kind(&self) -> ResourceKind {
        self.descriptor.kind
    }

    /// Sets a filter; later fetches use the merged set.
    pub fn set_filter(&mut self, key: impl Into<String>, value: impl Into<FilterValue>) -> &mut Self {
        self.filters.set(key, value);
        self
    }

    /// Removes a filter.
    pub fn remove_filter(&mut self, key: &str) -> Option<FilterValue> {
        self.filters.remove(key)
    }

    /// Returns the filter set.
    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    /// Returns the pagination cursor.
    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    /// Moves the cursor without fetching.
    pub fn set_page(&mut self, page: u64) {
        self.cursor.set_page(page);
    }

    /// Changes the page size, forgetting known totals.
    pub fn set_page_size(&mut self, page_size: u32) {
        self.cursor.set_page_size(page_size);
    }

    /// Fetches exactly one page, the current one if `page` is `None`.
    pub async fn fetch_page(&mut self, page: Option<u64>) -> ClientResult<&[Entity]> {
        let index = page.unwrap_or(self.cursor.page());
        if !self.cursor.is_paginated() && index > 0 {
            return Err(ClientError::OutOfBounds {
                page: i64::try_from(index).unwrap_or(i64::MAX),
                total_pages: Some(1),
            });
        }

        let page = self.request_page(index).await?;
        self.items = self.wrap(page.items);
        self.cursor
            .record_fetch(index, page.total_items, page.total_pages);
        Ok(&self.items)
    }

    /// Advances the cursor by one page and fetches it.
    pub async fn fetch_next_page(&mut self) -> ClientResult<&[Entity]> {
        let next = self.cursor.next_page()?;
        self.fetch_page(Some(next)).await
    }

    /// Moves the cursor back by one page and fetches it.
    pub async fn fetch_previous_page(&mut self) -> ClientResult<&[Entity]> {
        let previous = self.cursor.previous_page()?;
        self.fetch_page(Some(previous)).await
    }

    /// Fetches every item, replacing the contents with the aggregate.
    ///
    /// Unpaginated collections take one round trip. Otherwise pages are
    /// requested from 0 until the reported total is reached or a short page
    /// comes back.
    pub async fn fetch_all(&mut self) -> ClientResult<&[Entity]> {
        if !self.cursor.is_paginated() {
            return self.fetch_page(Some(0)).await;
        }

        let page_size = u64::from(self.cursor.page_size());
        let max_pages = u64::from(self.session.config().max_pages);
        let mut aggregate: Vec<FieldMap> = Vec::new();
        let mut index = 0u64;

        loop {
            let page = self.request_page(index).await?;
            let received = page.items.len() as u64;
            aggregate.extend(page.items);
            self.cursor
                .record_fetch(index, page.total_items, page.total_pages);

            let drained = match self.cursor.total_items() {
                Some(total) => aggregate.len() as u64 >= total,
                None => false,
            };
            if drained || received < page_size {
                break;
            }

            index += 1;
            if max_pages > 0 && index >= max_pages {
                warn!(
                    kind = %self.kind(),
                    pages = index,
                    "fetch_all stopped at the page limit"
                );
                break;
            }
        }

        self.items = self.wrap(aggregate);
        Ok(&self.items)
    }

    /// Appends `entity` locally. Fails if it is not of this collection's kind.
    pub fn push(&mut self, entity: Entity) -> ClientResult<()> {
        if entity.kind() != self.kind() {
            return Err(ClientError::TypeMismatch {
                expected: self.kind(),
                actual: entity.kind(),
            });
        }
        self.items.push(entity);
        Ok(())
    }

    /// Creates every new member in order and returns the issued commands.
    pub async fn save_all(&mut self) -> ClientResult<Vec<CommandId>> {
        let mut commands = Vec::new();
        for entity in self.items.iter_mut().filter(|e| e.is_new()) {
            if let Some(command) = entity.save().await? {
                commands.push(command);
            }
        }
        Ok(commands)
    }

    /// Returns the member at `index`.
    pub fn get(&self, index: usize) -> Option<&Entity> {
        self.items.get(index)
    }

    /// Returns the first member whose `field` equals `value`.
    pub fn find_by(&self, field: &str, value: impl Into<Value>) -> Option<&Entity> {
        let value = value.into();
        self.items.iter().find(|e| e.get(field) == Some(&value))
    }

    /// Iterates over the current contents.
    pub fn iter(&self) -> std::slice::Iter<'_, Entity> {
        self.items.iter()
    }

    /// Returns the current contents.
    pub fn entities(&self) -> &[Entity] {
        &self.items
    }

    /// Consumes the collection.
    pub fn into_entities(self) -> Vec<Entity> {
        self.items
    }

    /// Number of members currently held.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if no member is held.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Builds the request for page `index`.
    pub fn page_request(&self, index: u64) -> ClientResult<Request> {
        let scope = self
            .filters
            .iter()
            .find(|(key, _)| self.descriptor.is_scope(key));

        if scope.is_none() && self.descriptor.scope_required {
            return Err(ClientError::MissingFilter {
                kind: self.kind(),
                required: self.descriptor.scopes.to_vec(),
            });
        }

        let name = self.descriptor.collection_name;
        let (path, exclude) = match scope {
            Some((key, value)) => {
                let value = urlencoding::encode(value.as_str());
                (format!("{key}/{value}/{name}.json"), vec![key])
            }
            None => (format!("{name}.json"), Vec::new()),
        };

        let mut request =
            Request::get(path).with_query_pairs(self.filters.to_query_parameters(&exclude));
        if self.cursor.is_paginated() {
            request = request
                .with_query("max", self.cursor.page_size().to_string())
                .with_query("offset", self.cursor.offset_of(index)?.to_string());
        }
        Ok(request)
    }

    async fn request_page(&self, index: u64) -> ClientResult<Page> {
        let request = self.page_request(index)?;
        let body = self.session.execute(request).await?;
        let page = parse_page(body)?;
        debug!(
            kind = %self.kind(),
            page = index,
            page_size = self.cursor.page_size(),
            items = page.items.len(),
            total_items = ?page.total_items,
            "page fetched"
        );
        Ok(page)
    }

    fn wrap(&self, items: Vec<FieldMap>) -> Vec<Entity> {
        items
            .into_iter()
            .map(|fields| Entity::with_fields(&self.session, self.descriptor, fields))
            .collect()
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("kind", &self.kind())
            .field("filters", &self.filters)
            .field("cursor", &self.cursor)
            .field("len", &self.items.len())
            .finish()
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Entity;
    type IntoIter = std::slice::Iter<'a, Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl IntoIterator for Collection {
    type Item = Entity;
    type IntoIter = std::vec::IntoIter<Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
