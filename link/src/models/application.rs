use indexmap::IndexMap;
use std::sync::Arc;

use super::resource::Resource;
use crate::error::{LinkError, Result};

/// A named group of resources
#[derive(Debug, Clone, PartialEq)]
pub struct Application {
    name: String,
    resources: IndexMap<String, Arc<Resource>>,
}

impl Application {
    pub fn new(name: impl Into<String>, resources: Vec<Resource>) -> Result<Self> {
        let name = name.into();
        let mut map = IndexMap::with_capacity(resources.len());
        for resource in resources {
            if map.contains_key(resource.name()) {
                return Err(LinkError::SchemaParse(format!(
                    "duplicate resource '{}' in application '{}'",
                    resource.name(),
                    name
                )));
            }
            map.insert(resource.name().to_string(), Arc::new(resource));
        }
        Ok(Self { name, resources: map })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resources(&self) -> impl Iterator<Item = &Arc<Resource>> {
        self.resources.values()
    }

    pub fn resource_names(&self) -> Vec<&str> {
        self.resources.keys().map(String::as_str).collect()
    }

    pub fn resource(&self, name: &str) -> Result<Arc<Resource>> {
        self.resources.get(name).cloned().ok_or_else(|| {
            LinkError::NotFound(format!(
                "resource '{}' in application '{}'",
                name, self.name
            ))
        })
    }
}

/// Root of the loaded schema: every application of the site by name.
///
/// Built once by the schema loader and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaModel {
    applications: IndexMap<String, Application>,
}

impl SchemaModel {
    pub fn new(applications: Vec<Application>) -> Self {
        Self {
            applications: applications
                .into_iter()
                .map(|app| (app.name().to_string(), app))
                .collect(),
        }
    }

    pub fn applications(&self) -> impl Iterator<Item = &Application> {
        self.applications.values()
    }

    pub fn application_names(&self) -> Vec<&str> {
        self.applications.keys().map(String::as_str).collect()
    }

    pub fn application(&self, name: &str) -> Result<&Application> {
        self.applications
            .get(name)
            .ok_or_else(|| LinkError::NotFound(format!("application '{}'", name)))
    }

    pub fn resource(&self, application: &str, resource: &str) -> Result<Arc<Resource>> {
        self.application(application)?.resource(resource)
    }

    pub fn is_empty(&self) -> bool {
        self.applications.is_empty()
    }
}
