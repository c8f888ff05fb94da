//! # Cytomine Testkit
//!
//! Test utilities for the Cytomine client engine.
//!
//! This crate provides:
//! - [`MemoryService`], an in-memory service implementing `Transport`
//! - Session fixtures and seeded scenarios
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cytomine_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn creates_a_project() {
//!     let env = TestEnv::new();
//!     let mut project = Entity::new(&env.session, &catalog::PROJECT);
//!     project.set("name", "p");
//!     project.save().await.unwrap();
//!     assert_eq!(env.service.count(&catalog::PROJECT), 1);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
mod service;

pub use service::{MemoryService, ServiceError};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::service::{MemoryService, ServiceError};
    pub use cytomine_core::{
        catalog, ClientError, Collection, CommandId, Entity, EntityId, ErrorKind, Identity,
        Session, SessionConfig,
    };
}
