//! Entity create, fetch, update and delete against the in-memory service.

use cytomine_core::{Identity, Method, Operation};
use cytomine_testkit::prelude::*;
use proptest::prelude::*;
use serde_json::json;

#[tokio::test]
async fn save_then_fetch_round_trips() {
    let env = TestEnv::new();
    let mut project = Entity::new(&env.session, &catalog::PROJECT);
    project
        .set("name", "lung-biopsies")
        .set("discipline", "histology")
        .set("blindMode", true);

    let command = project.save().await.unwrap();
    assert!(command.is_some());
    assert!(!project.is_new());
    let id = project.id().unwrap();

    let fetched = Entity::fetch_by(&env.session, &catalog::PROJECT, &Identity::single(id))
        .await
        .unwrap();
    assert_eq!(fetched.public_fields(), project.public_fields());
    assert_eq!(fetched.get("created"), project.get("created"));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn any_project_round_trips(fields in project_fields_strategy()) {
        let fetched = block_on(async {
            let env = TestEnv::new();
            let mut project = Entity::with_fields(&env.session, &catalog::PROJECT, fields.clone());
            project.save().await.unwrap();
            let identity = project.identity().unwrap();
            Entity::fetch_by(&env.session, &catalog::PROJECT, &identity)
                .await
                .unwrap()
        });

        for (name, value) in &fields {
            prop_assert_eq!(fetched.get(name), Some(value));
        }
    }
}

#[tokio::test]
async fn save_of_persisted_entity_updates() {
    let env = TestEnv::new();
    let ids = scenarios::projects(&env.service, 1);
    let mut project = Entity::fetch_by(&env.session, &catalog::PROJECT, &Identity::single(ids[0]))
        .await
        .unwrap();
    let before = project.get("updated").cloned();

    project.set("name", "renamed");
    let command = project.save().await.unwrap();

    assert!(command.is_some());
    assert_eq!(env.session.last_command(), command);
    assert_eq!(env.service.requests().last().map(|r| r.method), Some(Method::Put));
    let stored = env.service.stored(&catalog::PROJECT, ids[0]).unwrap();
    assert_eq!(stored["name"], "renamed");
    assert_ne!(project.get("updated").cloned(), before);
    assert_eq!(project.get("updated"), stored.get("updated"));
}

#[tokio::test]
async fn missing_required_fields_fail_locally() {
    let env = TestEnv::new();
    let mut term = Entity::new(&env.session, &catalog::TERM);
    term.set("name", "tumor");

    let err = term.save().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.to_string().contains("ontology"));
    assert_eq!(env.service.request_count(), 0);
}

#[tokio::test]
async fn new_entity_cannot_be_updated() {
    let env = TestEnv::new();
    let mut project = Entity::new(&env.session, &catalog::PROJECT);
    project.set("name", "p");

    let err = project.update().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingIdentity);
    assert!(project.fetch().await.unwrap_err().kind() == ErrorKind::MissingIdentity);
    assert_eq!(env.service.request_count(), 0);
}

#[tokio::test]
async fn fetching_unknown_entity_is_not_found() {
    let env = TestEnv::new();
    let err = Entity::fetch_by(&env.session, &catalog::PROJECT, &Identity::single(404u64))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn deleted_instance_rejects_further_writes() {
    let env = TestEnv::new();
    let ids = scenarios::projects(&env.service, 1);
    let mut project = Entity::fetch_by(&env.session, &catalog::PROJECT, &Identity::single(ids[0]))
        .await
        .unwrap();

    let command = project.delete().await.unwrap();
    assert!(command.is_some());
    assert!(project.is_deleted());
    assert_eq!(env.service.count(&catalog::PROJECT), 0);

    let requests = env.service.request_count();
    assert!(matches!(project.save().await, Err(ClientError::Deleted { .. })));
    assert!(matches!(project.update().await, Err(ClientError::Deleted { .. })));
    assert!(matches!(project.delete().await, Err(ClientError::Deleted { .. })));
    assert_eq!(env.service.request_count(), requests);

    assert!(project.fetch().await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn deleting_absent_resource_is_not_found() {
    let env = TestEnv::new();
    let err = Entity::delete_by(&env.session, &catalog::PROJECT, &Identity::single(77u64))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn association_cannot_be_updated() {
    let env = TestEnv::new();
    let mut link = Entity::new(&env.session, &catalog::ANNOTATION_TERM);
    link.set("id", 1u64).set("userannotation", 5u64).set("term", 9u64);

    let err = link.update().await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::NotSupported {
            operation: Operation::Update,
            ..
        }
    ));
    assert!(matches!(
        link.save().await,
        Err(ClientError::NotSupported { .. })
    ));
    assert_eq!(env.service.request_count(), 0);
}

#[tokio::test]
async fn duplicate_association_conflicts() {
    let env = TestEnv::new();
    let (annotation, term) = scenarios::annotation_and_term(&env.service);

    let mut first = Entity::new(&env.session, &catalog::ANNOTATION_TERM);
    first.set("userannotation", annotation).set("term", term);
    first.save().await.unwrap();

    let mut second = Entity::new(&env.session, &catalog::ANNOTATION_TERM);
    second.set("userannotation", annotation).set("term", term);
    let err = second.save().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(err.status(), Some(409));
    assert_eq!(env.service.count(&catalog::ANNOTATION_TERM), 1);
}

#[tokio::test]
async fn association_is_addressed_by_its_pair() {
    let env = TestEnv::new();
    let (annotation, term) = scenarios::annotation_and_term(&env.service);
    let mut link = Entity::new(&env.session, &catalog::ANNOTATION_TERM);
    link.set("userannotation", annotation).set("term", term);
    link.save().await.unwrap();

    let identity = Identity::composite([("userannotation", annotation), ("term", term)]);
    assert_eq!(link.identity().unwrap(), identity);

    let fetched = Entity::fetch_by(&env.session, &catalog::ANNOTATION_TERM, &identity)
        .await
        .unwrap();
    assert_eq!(fetched.get("term"), Some(&json!(term.get())));
    assert_eq!(
        env.service.requests().last().map(|r| r.path.clone()),
        Some(format!("annotation/{annotation}/term/{term}.json"))
    );

    Entity::delete_by(&env.session, &catalog::ANNOTATION_TERM, &identity)
        .await
        .unwrap();
    assert_eq!(env.service.count(&catalog::ANNOTATION_TERM), 0);
}

#[tokio::test]
async fn composite_identity_needs_every_component() {
    let env = TestEnv::new();
    let mut link = Entity::new(&env.session, &catalog::ANNOTATION_TERM);
    link.set("userannotation", 3u64);

    match link.delete().await {
        Err(ClientError::MissingIdentity { component, .. }) => assert_eq!(component, "term"),
        other => panic!("expected MissingIdentity, got {other:?}"),
    }
    assert_eq!(env.service.request_count(), 0);
}

#[tokio::test]
async fn protected_writes_need_admin_session() {
    let env = TestEnv::new();
    env.service.require_admin_for(&catalog::USER);

    let mut user = Entity::new(&env.session, &catalog::USER);
    user.set("username", "jdoe");
    let err = user.save().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert!(user.is_new());

    env.session.open_admin_session().await.unwrap();
    assert!(env.service.is_admin());
    user.save().await.unwrap();
    assert!(!user.is_new());

    env.session.close_admin_session().await.unwrap();
    user.set("lastname", "Doe");
    assert_eq!(user.update().await.unwrap_err().kind(), ErrorKind::Forbidden);
}

#[tokio::test]
async fn logout_closes_transport() {
    let env = TestEnv::new();
    let ids = scenarios::projects(&env.service, 1);

    env.session.logout().await;
    assert!(env.service.is_closed());

    let err = Entity::fetch_by(&env.session, &catalog::PROJECT, &Identity::single(ids[0]))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::SessionClosed));
    assert_eq!(env.service.request_count(), 0);
}

#[tokio::test]
async fn read_only_fields_are_not_sent() {
    let env = TestEnv::new();
    let (_, images) = scenarios::project_with_images(&env.service, 1);
    let mut annotation = Entity::new(&env.session, &catalog::ANNOTATION);
    annotation
        .set("location", "POINT(1 1)")
        .set("image", images[0])
        .set("area", 12.5);

    annotation.save().await.unwrap();
    let body = env.service.requests()[0].body.clone().unwrap();
    assert!(body.get("area").is_none());
    assert_eq!(body["image"], json!(images[0].get()));
    assert_eq!(annotation.get("user"), Some(&json!(1)));
}
