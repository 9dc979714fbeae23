//! Schema document loader.
//!
//! Turns the document served by `<base>/init` into a [`SchemaModel`]:
//!
//! ```json
//! {
//!   "crm": {
//!     "resources": [{
//!       "id": "…", "name": "persons", "authEnabled": false,
//!       "attributes": [{"id": "…", "name": "firstName", "type": "TEXT"}],
//!       "views": [{"name": "persons", "primary": true,
//!                  "partitionKeys": [{"name": "pk", "type": "TEXT"}],
//!                  "clusterKeys": [{"name": "ck", "type": "TEXT", "orderBy": "ASC"}]}],
//!       "auths": [{"id": "…", "name": "owner", "permission": "ALL"}]
//!     }]
//!   }
//! }
//! ```
//!
//! Resource-level `partitionKeys` / `clusterKeys` are optional; when absent
//! they are collected from the views in document order.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::{LinkError, Result};
use crate::models::{
    is_reserved_name, Application, Attribute, AttributeKind, Auth, CollectionType, DataType,
    OrderBy, Permission, Resource, SchemaModel, Validation, View, SYSTEM_COLUMN_NAMES,
};

#[derive(Debug, Deserialize)]
struct RawApplication {
    #[serde(default)]
    resources: Vec<RawResource>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawResource {
    id: Option<String>,
    name: Option<String>,
    #[serde(default)]
    attributes: Vec<RawAttribute>,
    partition_keys: Option<Vec<RawAttribute>>,
    cluster_keys: Option<Vec<RawAttribute>>,
    #[serde(default)]
    views: Vec<RawView>,
    auths: Option<Vec<RawAuth>>,
    auth_enabled: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAttribute {
    id: Option<String>,
    name: Option<String>,
    #[serde(rename = "type")]
    data_type: Option<String>,
    validation: Option<RawValidation>,
    #[serde(default)]
    collection_types: Vec<RawCollectionType>,
    order_by: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawValidation {
    min: Option<JsonValue>,
    max: Option<JsonValue>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawCollectionType {
    datatype: Option<String>,
    validation: Option<RawValidation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawView {
    id: Option<String>,
    name: Option<String>,
    primary: Option<bool>,
    #[serde(default)]
    partition_keys: Vec<RawAttribute>,
    #[serde(default)]
    cluster_keys: Vec<RawAttribute>,
}

#[derive(Debug, Deserialize)]
struct RawAuth {
    id: Option<String>,
    name: Option<String>,
    permission: Option<String>,
}

/// Parse a schema document into the schema model.
///
/// Same input always yields a structurally equal model; application,
/// resource, attribute, key and view order follow the document.
pub fn load(document: &JsonValue) -> Result<SchemaModel> {
    let raw: IndexMap<String, RawApplication> = serde_json::from_value(document.clone())
        .map_err(|e| LinkError::SchemaParse(format!("invalid schema document: {}", e)))?;

    let mut applications = Vec::with_capacity(raw.len());
    for (app_name, app) in raw {
        let mut resources = Vec::with_capacity(app.resources.len());
        for raw_resource in app.resources {
            resources.push(parse_resource(&app_name, raw_resource)?);
        }
        log::debug!(
            "[SITE_INIT] Parsed application '{}' with {} resources",
            app_name,
            resources.len()
        );
        applications.push(Application::new(app_name, resources)?);
    }
    Ok(SchemaModel::new(applications))
}

/// Parse a schema document from its JSON text.
pub fn load_str(document: &str) -> Result<SchemaModel> {
    let value: JsonValue = serde_json::from_str(document)
        .map_err(|e| LinkError::SchemaParse(format!("schema document is not JSON: {}", e)))?;
    load(&value)
}

fn parse_resource(app: &str, raw: RawResource) -> Result<Resource> {
    let name = required(raw.name, || format!("resource name in application '{}'", app))?;
    let id = parse_uuid(
        raw.id.as_deref(),
        &format!("id of resource '{}'", name),
    )?
    .ok_or_else(|| LinkError::SchemaParse(format!("missing id of resource '{}'", name)))?;

    let mut views = Vec::with_capacity(raw.views.len());
    for raw_view in raw.views {
        views.push(parse_view(&name, raw_view)?);
    }

    let partition_keys = match raw.partition_keys {
        Some(keys) => keys
            .into_iter()
            .map(|k| parse_attribute(&name, k, KeyRole::Partition))
            .collect::<Result<Vec<_>>>()?,
        None => collect_view_keys(&views, |v| &v.partition_keys),
    };
    let cluster_keys = match raw.cluster_keys {
        Some(keys) => keys
            .into_iter()
            .map(|k| parse_attribute(&name, k, KeyRole::Cluster))
            .collect::<Result<Vec<_>>>()?,
        None => collect_view_keys(&views, |v| &v.cluster_keys),
    };

    let mut builder = Resource::builder(id, name.clone());
    for raw_attribute in raw.attributes {
        let attribute = parse_attribute(&name, raw_attribute, KeyRole::None)?;
        let is_key = partition_keys
            .iter()
            .chain(cluster_keys.iter())
            .any(|k| k.name == attribute.name);
        if !is_key {
            builder = builder.attribute(attribute);
        }
    }
    for key in partition_keys {
        builder = builder.partition_key(key);
    }
    for key in cluster_keys {
        builder = builder.cluster_key(key);
    }
    for view in views {
        builder = builder.view(view);
    }
    for raw_auth in raw.auths.unwrap_or_default() {
        builder = builder.auth(parse_auth(&name, raw_auth)?);
    }
    if let Some(enabled) = raw.auth_enabled {
        builder = builder.auth_enabled(enabled);
    }
    builder.build()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyRole {
    None,
    Partition,
    Cluster,
}

fn parse_attribute(resource: &str, raw: RawAttribute, role: KeyRole) -> Result<Attribute> {
    let name = required(raw.name, || format!("attribute name in resource '{}'", resource))?;
    let context = format!("attribute '{}' of resource '{}'", name, resource);

    let id = parse_uuid(raw.id.as_deref(), &format!("id of {}", context))?;
    if id.is_none() && role == KeyRole::None {
        return Err(LinkError::SchemaParse(format!("missing id of {}", context)));
    }

    let type_name = required(raw.data_type, || format!("type of {}", context))?;
    let data_type = parse_data_type(&type_name, &context)?;

    let kind = match role {
        KeyRole::Partition => AttributeKind::PartitionKey,
        KeyRole::Cluster => {
            let order_by = match raw.order_by.as_deref() {
                Some(value) => Some(OrderBy::from_wire(value).ok_or_else(|| {
                    LinkError::SchemaParse(format!("invalid orderBy '{}' of {}", value, context))
                })?),
                None => None,
            };
            AttributeKind::ClusterKey { order_by }
        }
        KeyRole::None if is_reserved_name(SYSTEM_COLUMN_NAMES, &name) => AttributeKind::System,
        KeyRole::None => AttributeKind::Regular,
    };

    let validation = raw
        .validation
        .map(|v| parse_validation(v, &context))
        .transpose()?;

    let mut collection_types = Vec::with_capacity(raw.collection_types.len());
    for raw_type in raw.collection_types {
        let type_name = required(raw_type.datatype, || {
            format!("collection datatype of {}", context)
        })?;
        collection_types.push(CollectionType {
            data_type: parse_data_type(&type_name, &context)?,
            validation: raw_type
                .validation
                .map(|v| parse_validation(v, &context))
                .transpose()?,
        });
    }

    Ok(Attribute::new(id, name, data_type, kind)
        .with_validation(validation)
        .with_collection_types(collection_types))
}

fn parse_view(resource: &str, raw: RawView) -> Result<View> {
    let name = required(raw.name, || format!("view name in resource '{}'", resource))?;
    let context = format!("view '{}' of resource '{}'", name, resource);
    let id = parse_uuid(raw.id.as_deref(), &format!("id of {}", context))?;
    let primary = raw
        .primary
        .ok_or_else(|| LinkError::SchemaParse(format!("missing primary flag of {}", context)))?;

    let partition_keys = raw
        .partition_keys
        .into_iter()
        .map(|k| parse_attribute(resource, k, KeyRole::Partition))
        .collect::<Result<Vec<_>>>()?;
    let cluster_keys = raw
        .cluster_keys
        .into_iter()
        .map(|k| parse_attribute(resource, k, KeyRole::Cluster))
        .collect::<Result<Vec<_>>>()?;

    Ok(View {
        id,
        name,
        primary,
        partition_keys,
        cluster_keys,
    })
}

fn parse_auth(resource: &str, raw: RawAuth) -> Result<Auth> {
    let name = required(raw.name, || format!("auth name in resource '{}'", resource))?;
    let context = format!("auth '{}' of resource '{}'", name, resource);
    let id = parse_uuid(raw.id.as_deref(), &format!("id of {}", context))?
        .ok_or_else(|| LinkError::SchemaParse(format!("missing id of {}", context)))?;
    let permission_name = required(raw.permission, || format!("permission of {}", context))?;
    let permission = Permission::from_wire(&permission_name).ok_or_else(|| {
        LinkError::SchemaParse(format!(
            "unknown permission '{}' of {}",
            permission_name, context
        ))
    })?;
    Ok(Auth {
        id,
        name,
        permission,
    })
}

/// Union of the views' keys, first occurrence wins, primary view first.
fn collect_view_keys(views: &[View], keys: impl Fn(&View) -> &Vec<Attribute>) -> Vec<Attribute> {
    let mut collected: IndexMap<String, Attribute> = IndexMap::new();
    let primary_first = views
        .iter()
        .filter(|v| v.primary)
        .chain(views.iter().filter(|v| !v.primary));
    for view in primary_first {
        for key in keys(view) {
            collected
                .entry(key.name.clone())
                .or_insert_with(|| key.clone());
        }
    }
    collected.into_values().collect()
}

fn parse_validation(raw: RawValidation, context: &str) -> Result<Validation> {
    let bound = |value: Option<JsonValue>, which: &str| -> Result<i64> {
        let parsed = match &value {
            Some(JsonValue::Number(n)) => n.as_i64(),
            Some(JsonValue::String(s)) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        parsed.ok_or_else(|| {
            LinkError::SchemaParse(format!("invalid validation {} of {}", which, context))
        })
    };
    Ok(Validation {
        min: bound(raw.min, "min")?,
        max: bound(raw.max, "max")?,
    })
}

fn parse_data_type(name: &str, context: &str) -> Result<DataType> {
    DataType::from_wire(name)
        .ok_or_else(|| LinkError::SchemaParse(format!("unknown type '{}' of {}", name, context)))
}

fn parse_uuid(value: Option<&str>, context: &str) -> Result<Option<Uuid>> {
    match value {
        Some(s) => Uuid::parse_str(s)
            .map(Some)
            .map_err(|e| LinkError::SchemaParse(format!("invalid {}: {}", context, e))),
        None => Ok(None),
    }
}

fn required(value: Option<String>, what: impl FnOnce() -> String) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(LinkError::SchemaParse(format!("missing {}", what()))),
    }
}
