use indexmap::{IndexMap, IndexSet};
use std::sync::Arc;
use uuid::Uuid;

use super::attribute::{is_reserved_name, Attribute, SYSTEM_COLUMN_NAMES};
use super::auth::Auth;
use super::view::View;
use crate::error::{LinkError, Result};
use crate::statement::{CreateStatement, DeleteStatement, GetStatement, SaveStatement};

/// A schema-declared entity type: regular attributes, partition and
/// cluster keys, views and auth rules.
///
/// Resources are immutable once built and shared through `Arc` by every
/// statement and row that refers to them.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    id: Uuid,
    name: String,
    attributes: IndexMap<String, Attribute>,
    partition_keys: IndexMap<String, Attribute>,
    cluster_keys: IndexMap<String, Attribute>,
    views: IndexMap<String, View>,
    auths: IndexMap<String, Auth>,
    auth_enabled: bool,
}

impl Resource {
    pub fn builder(id: Uuid, name: impl Into<String>) -> ResourceBuilder {
        ResourceBuilder::new(id, name.into())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn auth_enabled(&self) -> bool {
        self.auth_enabled
    }

    /// Regular attributes in declaration order (system columns included)
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.values()
    }

    pub fn partition_keys(&self) -> impl Iterator<Item = &Attribute> {
        self.partition_keys.values()
    }

    pub fn cluster_keys(&self) -> impl Iterator<Item = &Attribute> {
        self.cluster_keys.values()
    }

    pub fn views(&self) -> impl Iterator<Item = &View> {
        self.views.values()
    }

    pub fn view(&self, name: &str) -> Option<&View> {
        self.views.get(name)
    }

    pub fn view_names(&self) -> Vec<&str> {
        self.views.keys().map(String::as_str).collect()
    }

    /// The single primary view; guaranteed to exist by [`ResourceBuilder::build`].
    pub fn primary_view(&self) -> &View {
        self.views
            .values()
            .find(|v| v.primary)
            .unwrap_or_else(|| unreachable!("resource built without a primary view"))
    }

    pub fn auths(&self) -> impl Iterator<Item = &Auth> {
        self.auths.values()
    }

    pub fn auth(&self, name: &str) -> Option<&Auth> {
        self.auths
            .values()
            .find(|a| a.name.eq_ignore_ascii_case(name))
    }

    /// Look up an attribute by name: regular, then cluster, then partition.
    pub fn get_attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes
            .get(name)
            .or_else(|| self.cluster_keys.get(name))
            .or_else(|| self.partition_keys.get(name))
    }

    pub fn attribute_names(&self) -> IndexSet<&str> {
        self.attributes.keys().map(String::as_str).collect()
    }

    pub fn partition_key_names(&self) -> IndexSet<&str> {
        self.partition_keys.keys().map(String::as_str).collect()
    }

    pub fn cluster_key_names(&self) -> IndexSet<&str> {
        self.cluster_keys.keys().map(String::as_str).collect()
    }

    /// Regular ∪ partition ∪ cluster attribute names
    pub fn all_attribute_names(&self) -> IndexSet<&str> {
        let mut all = self.attribute_names();
        all.extend(self.partition_key_names());
        all.extend(self.cluster_key_names());
        all
    }

    /// All attribute names minus the names in `reserved`
    pub fn settable_attribute_names(&self, reserved: &[&str]) -> IndexSet<&str> {
        self.all_attribute_names()
            .into_iter()
            .filter(|name| !is_reserved_name(reserved, name))
            .collect()
    }

    /// All attribute names minus the system columns
    pub fn all_settable_attribute_names(&self) -> IndexSet<&str> {
        self.settable_attribute_names(SYSTEM_COLUMN_NAMES)
    }

    /// Partition ∪ cluster key names
    pub fn primary_key_names(&self) -> IndexSet<&str> {
        let mut names = self.partition_key_names();
        names.extend(self.cluster_key_names());
        names
    }

    pub fn settable_primary_key_names(&self) -> IndexSet<&str> {
        self.primary_key_names()
            .into_iter()
            .filter(|name| !is_reserved_name(SYSTEM_COLUMN_NAMES, name))
            .collect()
    }

    /// New POST statement creating an entity
    pub fn create(self: &Arc<Self>) -> CreateStatement {
        CreateStatement::new(Arc::clone(self))
    }

    /// New GET statement against the primary view
    pub fn get(self: &Arc<Self>) -> GetStatement {
        GetStatement::new(Arc::clone(self), None)
    }

    /// New GET statement against the named view
    pub fn get_view(self: &Arc<Self>, view: &str) -> Result<GetStatement> {
        if !self.views.contains_key(view) {
            return Err(LinkError::NotFound(format!(
                "view '{}' not part of resource '{}'",
                view, self.name
            )));
        }
        Ok(GetStatement::new(Arc::clone(self), Some(view.to_string())))
    }

    /// New PUT statement updating an identified entity
    pub fn save(self: &Arc<Self>) -> SaveStatement {
        SaveStatement::new(Arc::clone(self))
    }

    /// New DELETE statement
    pub fn delete(self: &Arc<Self>) -> DeleteStatement {
        DeleteStatement::new(Arc::clone(self))
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Builder that checks the resource invariants before producing a [`Resource`].
#[derive(Debug)]
pub struct ResourceBuilder {
    id: Uuid,
    name: String,
    attributes: Vec<Attribute>,
    partition_keys: Vec<Attribute>,
    cluster_keys: Vec<Attribute>,
    views: Vec<View>,
    auths: Vec<Auth>,
    auth_enabled: Option<bool>,
}

impl ResourceBuilder {
    fn new(id: Uuid, name: String) -> Self {
        Self {
            id,
            name,
            attributes: Vec::new(),
            partition_keys: Vec::new(),
            cluster_keys: Vec::new(),
            views: Vec::new(),
            auths: Vec::new(),
            auth_enabled: None,
        }
    }

    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn partition_key(mut self, key: Attribute) -> Self {
        self.partition_keys.push(key);
        self
    }

    pub fn cluster_key(mut self, key: Attribute) -> Self {
        self.cluster_keys.push(key);
        self
    }

    pub fn view(mut self, view: View) -> Self {
        self.views.push(view);
        self
    }

    pub fn auth(mut self, auth: Auth) -> Self {
        self.auths.push(auth);
        self
    }

    /// Explicit flag; when unset, auth is enabled iff auth rules exist.
    pub fn auth_enabled(mut self, enabled: bool) -> Self {
        self.auth_enabled = Some(enabled);
        self
    }

    pub fn build(self) -> Result<Resource> {
        let resource_name = self.name;
        let attributes = index_unique(&resource_name, "attribute", self.attributes)?;
        let partition_keys = index_unique(&resource_name, "partition key", self.partition_keys)?;
        let cluster_keys = index_unique(&resource_name, "cluster key", self.cluster_keys)?;

        let primary_count = self.views.iter().filter(|v| v.primary).count();
        if primary_count != 1 {
            return Err(LinkError::SchemaParse(format!(
                "resource '{}' must have exactly one primary view, found {}",
                resource_name, primary_count
            )));
        }

        for view in &self.views {
            for key in &view.partition_keys {
                if !partition_keys.contains_key(&key.name) {
                    return Err(LinkError::SchemaParse(format!(
                        "view '{}' of resource '{}' uses unknown partition key '{}'",
                        view.name, resource_name, key.name
                    )));
                }
            }
            for key in &view.cluster_keys {
                if !cluster_keys.contains_key(&key.name) {
                    return Err(LinkError::SchemaParse(format!(
                        "view '{}' of resource '{}' uses unknown cluster key '{}'",
                        view.name, resource_name, key.name
                    )));
                }
            }
        }

        let mut views = IndexMap::with_capacity(self.views.len());
        for view in self.views {
            if views.contains_key(&view.name) {
                return Err(LinkError::SchemaParse(format!(
                    "duplicate view '{}' in resource '{}'",
                    view.name, resource_name
                )));
            }
            views.insert(view.name.clone(), view);
        }

        let auth_enabled = self.auth_enabled.unwrap_or(!self.auths.is_empty());
        let auths = self
            .auths
            .into_iter()
            .map(|a| (a.name.clone(), a))
            .collect();

        Ok(Resource {
            id: self.id,
            name: resource_name,
            attributes,
            partition_keys,
            cluster_keys,
            views,
            auths,
            auth_enabled,
        })
    }
}

fn index_unique(
    resource: &str,
    what: &str,
    items: Vec<Attribute>,
) -> Result<IndexMap<String, Attribute>> {
    let mut map = IndexMap::with_capacity(items.len());
    for item in items {
        if map.contains_key(&item.name) {
            return Err(LinkError::SchemaParse(format!(
                "duplicate {} '{}' in resource '{}'",
                what, item.name, resource
            )));
        }
        map.insert(item.name.clone(), item);
    }
    Ok(map)
}
