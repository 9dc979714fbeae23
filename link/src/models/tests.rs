use std::sync::Arc;
use uuid::Uuid;

use super::*;
use crate::error::LinkError;

fn text(name: &str) -> Attribute {
    Attribute::new(None, name, DataType::Text, AttributeKind::Regular)
}

fn persons() -> Resource {
    let pk = Attribute::new(None, "pk", DataType::Text, AttributeKind::PartitionKey);
    let ck = Attribute::new(
        None,
        "ck",
        DataType::Text,
        AttributeKind::ClusterKey {
            order_by: Some(OrderBy::Asc),
        },
    );
    Resource::builder(Uuid::nil(), "persons")
        .attribute(text("firstName"))
        .attribute(Attribute::new(None, "age", DataType::Integer, AttributeKind::Regular))
        .attribute(Attribute::new(None, "eid", DataType::Uuid, AttributeKind::System))
        .attribute(Attribute::new(None, "cra", DataType::Timestamp, AttributeKind::System))
        .partition_key(pk.clone())
        .cluster_key(ck.clone())
        .view(View {
            id: None,
            name: "persons".into(),
            primary: true,
            partition_keys: vec![pk],
            cluster_keys: vec![ck],
        })
        .build()
        .expect("valid resource")
}

// ==================== Resource Tests ====================

#[test]
fn test_all_attribute_names_is_union() {
    let resource = persons();
    let names: Vec<&str> = resource.all_attribute_names().into_iter().collect();
    assert_eq!(names, vec!["firstName", "age", "eid", "cra", "pk", "ck"]);
}

#[test]
fn test_settable_names_exclude_system_columns() {
    let resource = persons();
    let settable = resource.all_settable_attribute_names();
    assert!(settable.contains("firstName"));
    assert!(settable.contains("pk"));
    assert!(settable.contains("ck"));
    for reserved in SYSTEM_COLUMN_NAMES {
        assert!(!settable.contains(reserved), "{} must not be settable", reserved);
    }
}

#[test]
fn test_primary_key_names() {
    let resource = persons();
    let names: Vec<&str> = resource.primary_key_names().into_iter().collect();
    assert_eq!(names, vec!["pk", "ck"]);
    assert_eq!(resource.settable_primary_key_names().len(), 2);
}

#[test]
fn test_get_attribute_prefers_regular_then_cluster() {
    let key = Attribute::new(None, "code", DataType::Text, AttributeKind::PartitionKey);
    let cluster = Attribute::new(
        None,
        "code",
        DataType::Integer,
        AttributeKind::ClusterKey { order_by: None },
    );
    let resource = Resource::builder(Uuid::nil(), "codes")
        .partition_key(key.clone())
        .cluster_key(cluster.clone())
        .view(View {
            id: None,
            name: "codes".into(),
            primary: true,
            partition_keys: vec![key],
            cluster_keys: vec![cluster],
        })
        .build()
        .unwrap();
    let found = resource.get_attribute("code").unwrap();
    assert!(found.is_cluster_key());
    assert!(resource.get_attribute("missing").is_none());
}

#[test]
fn test_primary_view_and_auth_default() {
    let resource = persons();
    assert_eq!(resource.primary_view().name, "persons");
    assert!(!resource.auth_enabled());

    let pk = Attribute::new(None, "pk", DataType::Text, AttributeKind::PartitionKey);
    let with_auth = Resource::builder(Uuid::nil(), "notes")
        .partition_key(pk.clone())
        .view(View {
            id: None,
            name: "notes".into(),
            primary: true,
            partition_keys: vec![pk],
            cluster_keys: vec![],
        })
        .auth(Auth {
            id: Uuid::nil(),
            name: "owner".into(),
            permission: Permission::All,
        })
        .build()
        .unwrap();
    assert!(with_auth.auth_enabled());
    assert_eq!(with_auth.auth("OWNER").map(|a| a.permission), Some(Permission::All));
}

#[test]
fn test_build_requires_exactly_one_primary_view() {
    let err = Resource::builder(Uuid::nil(), "empty")
        .attribute(text("name"))
        .build()
        .unwrap_err();
    assert!(matches!(err, LinkError::SchemaParse(msg) if msg.contains("exactly one primary view")));

    let view = |name: &str| View {
        id: None,
        name: name.into(),
        primary: true,
        partition_keys: vec![],
        cluster_keys: vec![],
    };
    let err = Resource::builder(Uuid::nil(), "twice")
        .view(view("a"))
        .view(view("b"))
        .build()
        .unwrap_err();
    assert!(matches!(err, LinkError::SchemaParse(_)));
}

#[test]
fn test_build_rejects_foreign_view_key() {
    let pk = Attribute::new(None, "pk", DataType::Text, AttributeKind::PartitionKey);
    let err = Resource::builder(Uuid::nil(), "persons")
        .view(View {
            id: None,
            name: "persons".into(),
            primary: true,
            partition_keys: vec![pk],
            cluster_keys: vec![],
        })
        .build()
        .unwrap_err();
    assert!(matches!(err, LinkError::SchemaParse(msg) if msg.contains("unknown partition key 'pk'")));
}

#[test]
fn test_get_view_unknown_is_not_found() {
    let resource = Arc::new(persons());
    assert!(resource.get_view("persons").is_ok());
    assert!(matches!(resource.get_view("by_age"), Err(LinkError::NotFound(_))));
}

// ==================== Application Tests ====================

#[test]
fn test_application_lookup() {
    let app = Application::new("crm", vec![persons()]).unwrap();
    let model = SchemaModel::new(vec![app]);

    assert_eq!(model.application_names(), vec!["crm"]);
    assert_eq!(model.resource("crm", "persons").unwrap().name(), "persons");
    assert!(matches!(model.application("hr"), Err(LinkError::NotFound(_))));
    assert!(matches!(model.resource("crm", "invoices"), Err(LinkError::NotFound(_))));
}

#[test]
fn test_application_rejects_duplicate_resource() {
    let err = Application::new("crm", vec![persons(), persons()]).unwrap_err();
    assert!(matches!(err, LinkError::SchemaParse(_)));
}
