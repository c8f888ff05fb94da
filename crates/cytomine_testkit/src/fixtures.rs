//! Test fixtures and session helpers.
//!
//! Provides a session wired to a fresh [`MemoryService`] and a few seeded
//! scenarios shared by the integration tests.

use crate::service::MemoryService;
use cytomine_core::{catalog, EntityId, Session, SessionConfig};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;

/// A session over its own in-memory service.
pub struct TestEnv {
    /// The simulated service, kept for seeding and inspection.
    pub service: Arc<MemoryService>,
    /// A session talking to `service`.
    pub session: Arc<Session>,
}

impl TestEnv {
    /// Creates an environment with the default session configuration.
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    /// Creates an environment with `config`.
    pub fn with_config(config: SessionConfig) -> Self {
        Self::with_service(MemoryService::new(), config)
    }

    /// Wraps an already configured service.
    pub fn with_service(service: MemoryService, config: SessionConfig) -> Self {
        let service = Arc::new(service);
        let session = Session::with_config(service.clone(), config);
        Self { service, session }
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs `future` to completion on a fresh current-thread runtime.
///
/// For property tests, whose bodies are synchronous.
pub fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build test runtime")
        .block_on(future)
}

/// Seeded data sets.
pub mod scenarios {
    use super::*;

    /// Seeds `count` projects named `project-0`, `project-1`, ...
    pub fn projects(service: &MemoryService, count: usize) -> Vec<EntityId> {
        (0..count)
            .map(|i| service.seed(&catalog::PROJECT, json!({ "name": format!("project-{i}") })))
            .collect()
    }

    /// Seeds a project holding `images` image instances.
    pub fn project_with_images(service: &MemoryService, images: usize) -> (EntityId, Vec<EntityId>) {
        let project = service.seed(&catalog::PROJECT, json!({ "name": "imaging" }));
        let ids = (0..images)
            .map(|i| {
                service.seed(
                    &catalog::IMAGE_INSTANCE,
                    json!({ "baseImage": 100 + i, "project": project.get() }),
                )
            })
            .collect();
        (project, ids)
    }

    /// Seeds an ontology with one term and an annotation on a fresh image.
    ///
    /// Returns `(annotation, term)`.
    pub fn annotation_and_term(service: &MemoryService) -> (EntityId, EntityId) {
        let (project, images) = project_with_images(service, 1);
        let ontology = service.seed(&catalog::ONTOLOGY, json!({ "name": "tissue" }));
        let term = service.seed(
            &catalog::TERM,
            json!({ "name": "tumor", "ontology": ontology.get(), "color": "#FF0000" }),
        );
        let image = images.first().map_or(0, |id| id.get());
        let annotation = service.seed(
            &catalog::ANNOTATION,
            json!({
                "location": "POINT(10 10)",
                "image": image,
                "project": project.get(),
            }),
        );
        (annotation, term)
    }
}
