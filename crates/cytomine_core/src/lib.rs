//! # Cytomine Core
//!
//! Generic client engine for the Cytomine resource-management service.
//!
//! This crate provides:
//! - Static resource descriptors instead of one type per remote resource
//! - Entities with create/fetch/update/delete against computed endpoint paths
//! - Paginated, filterable, homogeneous collections
//! - A command log for undoing and redoing remote mutations
//! - An explicit session carrying the transport and last-command state
//!
//! ## Architecture
//!
//! Every call flows through the [`Session`], which owns an
//! `Arc<dyn Transport>`. Entities and collections borrow the session by
//! `Arc`, compute their request from their [`ResourceDescriptor`] and merge the
//! parsed response back into local state.
//!
//! ```rust,ignore
//! use cytomine_core::{catalog, Collection, Entity, Session};
//!
//! let session = Session::new(transport);
//! let mut project = Entity::new(&session, &catalog::PROJECT);
//! project.set("name", "lung-biopsies");
//! let command = project.save().await?;
//!
//! let mut images = Collection::new(&session, &catalog::IMAGE_INSTANCE)
//!     .with_filter("project", project.id().unwrap())
//!     .with_page_size(50);
//! images.fetch_all().await?;
//!
//! session.undo(command).await?;
//! ```
//!
//! ## Key Invariants
//!
//! - Client-side pre-flight failures never reach the transport
//! - A collection only ever holds entities of its own kind
//! - Every successful mutation overwrites the session's last command
//! - No request is retried

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

pub mod catalog;
mod collection;
mod command;
mod config;
mod descriptor;
mod entity;
mod error;
mod filter;
mod response;
mod session;
mod transport;

pub use collection::{Collection, Cursor};
pub use command::{AffectedEntity, CommandId, CommandLog, CommandState};
pub use config::SessionConfig;
pub use descriptor::{FieldSpec, IdentityShape, Operations, ResourceDescriptor, ResourceKind};
pub use entity::{Entity, EntityId, FieldMap, Identity};
pub use error::{ClientError, ClientResult, ErrorKind, Operation};
pub use filter::{FilterSet, FilterValue};
pub use session::{PrivilegeMode, Session};
pub use transport::{Method, Request, Transport, TransportError};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
