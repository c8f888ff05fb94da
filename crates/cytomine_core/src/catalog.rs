//! Descriptors for common Cytomine resources.
//!
//! This is a representative subset; callers can declare further
//! descriptors the same way.

use crate::descriptor::{FieldSpec, IdentityShape, Operations, ResourceDescriptor, ResourceKind};

/// A project groups images, annotations and members.
pub static PROJECT: ResourceDescriptor = ResourceDescriptor {
    kind: ResourceKind::new("project"),
    entity_path: "project/{id}.json",
    create_path: "project.json",
    collection_name: "project",
    fields: &[
        FieldSpec::required("name"),
        FieldSpec::optional("ontology"),
        FieldSpec::optional("discipline"),
        FieldSpec::optional("blindMode"),
        FieldSpec::optional("isReadOnly"),
        FieldSpec::read_only("numberOfImages"),
        FieldSpec::read_only("numberOfAnnotations"),
        FieldSpec::read_only("created"),
        FieldSpec::read_only("updated"),
    ],
    identity: IdentityShape::Single,
    operations: Operations::ALL,
    scopes: &["user", "ontology"],
    scope_required: false,
};

/// A tree of terms shared by projects.
pub static ONTOLOGY: ResourceDescriptor = ResourceDescriptor {
    kind: ResourceKind::new("ontology"),
    entity_path: "ontology/{id}.json",
    create_path: "ontology.json",
    collection_name: "ontology",
    fields: &[
        FieldSpec::required("name"),
        FieldSpec::read_only("user"),
        FieldSpec::read_only("created"),
        FieldSpec::read_only("updated"),
    ],
    identity: IdentityShape::Single,
    operations: Operations::ALL,
    scopes: &[],
    scope_required: false,
};

/// A label of an ontology.
pub static TERM: ResourceDescriptor = ResourceDescriptor {
    kind: ResourceKind::new("term"),
    entity_path: "term/{id}.json",
    create_path: "term.json",
    collection_name: "term",
    fields: &[
        FieldSpec::required("name"),
        FieldSpec::required("ontology"),
        FieldSpec::required("color"),
        FieldSpec::optional("comment"),
        FieldSpec::read_only("created"),
        FieldSpec::read_only("updated"),
    ],
    identity: IdentityShape::Single,
    operations: Operations::ALL,
    scopes: &["ontology", "project"],
    scope_required: false,
};

/// A user account.
pub static USER: ResourceDescriptor = ResourceDescriptor {
    kind: ResourceKind::new("user"),
    entity_path: "user/{id}.json",
    create_path: "user.json",
    collection_name: "user",
    fields: &[
        FieldSpec::required("username"),
        FieldSpec::optional("firstname"),
        FieldSpec::optional("lastname"),
        FieldSpec::optional("email"),
        FieldSpec::optional("password"),
        FieldSpec::optional("language"),
        FieldSpec::read_only("created"),
        FieldSpec::read_only("updated"),
    ],
    identity: IdentityShape::Single,
    operations: Operations::ALL,
    scopes: &["project", "ontology"],
    scope_required: false,
};

/// An image as it appears in one project.
///
/// Listing image instances needs a `project` or `user` scope.
pub static IMAGE_INSTANCE: ResourceDescriptor = ResourceDescriptor {
    kind: ResourceKind::new("imageinstance"),
    entity_path: "imageinstance/{id}.json",
    create_path: "imageinstance.json",
    collection_name: "imageinstance",
    fields: &[
        FieldSpec::required("baseImage"),
        FieldSpec::required("project"),
        FieldSpec::optional("reviewStart"),
        FieldSpec::optional("reviewStop"),
        FieldSpec::read_only("instanceFilename"),
        FieldSpec::read_only("width"),
        FieldSpec::read_only("height"),
        FieldSpec::read_only("numberOfAnnotations"),
        FieldSpec::read_only("created"),
        FieldSpec::read_only("updated"),
    ],
    identity: IdentityShape::Single,
    operations: Operations::ALL,
    scopes: &["project", "user"],
    scope_required: true,
};

/// A geometry drawn on an image instance.
///
/// Annotation collections take every filter as a query parameter.
pub static ANNOTATION: ResourceDescriptor = ResourceDescriptor {
    kind: ResourceKind::new("annotation"),
    entity_path: "annotation/{id}.json",
    create_path: "annotation.json",
    collection_name: "annotation",
    fields: &[
        FieldSpec::required("location"),
        FieldSpec::required("image"),
        FieldSpec::optional("term"),
        FieldSpec::read_only("project"),
        FieldSpec::read_only("user"),
        FieldSpec::read_only("area"),
        FieldSpec::read_only("perimeter"),
        FieldSpec::read_only("created"),
        FieldSpec::read_only("updated"),
    ],
    identity: IdentityShape::Single,
    operations: Operations::ALL,
    scopes: &[],
    scope_required: false,
};

/// Association of a term to an annotation.
///
/// Identified by the pair, unique per pair, never updated.
pub static ANNOTATION_TERM: ResourceDescriptor = ResourceDescriptor {
    kind: ResourceKind::new("annotationterm"),
    entity_path: "annotation/{userannotation}/term/{term}.json",
    create_path: "annotationterm.json",
    collection_name: "annotationterm",
    fields: &[
        FieldSpec::required("userannotation"),
        FieldSpec::required("term"),
        FieldSpec::read_only("user"),
    ],
    identity: IdentityShape::Composite(&["userannotation", "term"]),
    operations: Operations::APPEND_DELETE,
    scopes: &[],
    scope_required: false,
};

static ALL: &[&ResourceDescriptor] = &[
    &PROJECT,
    &ONTOLOGY,
    &TERM,
    &USER,
    &IMAGE_INSTANCE,
    &ANNOTATION,
    &ANNOTATION_TERM,
];

/// Returns every catalog descriptor.
pub fn all() -> &'static [&'static ResourceDescriptor] {
    ALL
}

/// Finds a descriptor by kind tag.
pub fn lookup(kind: &str) -> Option<&'static ResourceDescriptor> {
    ALL.iter().copied().find(|d| d.kind.as_str() == kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Operation;

    #[test]
    fn lookup_by_tag() {
        assert_eq!(lookup("project").map(|d| d.kind), Some(PROJECT.kind));
        assert_eq!(
            lookup("imageinstance").map(|d| d.collection_name),
            Some("imageinstance")
        );
        assert!(lookup("nope").is_none());
    }

    #[test]
    fn kinds_are_unique() {
        let mut tags: Vec<_> = all().iter().map(|d| d.kind).collect();
        tags.sort();
        tags.dedup();
        assert_eq!(tags.len(), all().len());
    }

    #[test]
    fn composite_placeholders_match_identity() {
        for descriptor in all() {
            for component in descriptor.identity_components() {
                assert!(
                    descriptor.entity_path.contains(&format!("{{{component}}}")),
                    "{} path lacks {component}",
                    descriptor.kind
                );
            }
        }
    }

    #[test]
    fn annotation_term_is_immutable() {
        assert!(!ANNOTATION_TERM.supports(Operation::Update));
        assert!(ANNOTATION_TERM.supports(Operation::Delete));
    }
}
