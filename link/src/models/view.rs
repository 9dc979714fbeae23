use uuid::Uuid;

use super::attribute::Attribute;

/// A named query shape over a resource's keys. Exactly one view of a
/// resource is primary.
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    pub id: Option<Uuid>,
    pub name: String,
    pub primary: bool,
    pub partition_keys: Vec<Attribute>,
    pub cluster_keys: Vec<Attribute>,
}

impl View {
    /// Partition keys followed by cluster keys, in declaration order.
    pub fn primary_key(&self) -> Vec<&Attribute> {
        self.partition_keys
            .iter()
            .chain(self.cluster_keys.iter())
            .collect()
    }

    pub fn primary_key_names(&self) -> Vec<&str> {
        self.primary_key().into_iter().map(|a| a.name.as_str()).collect()
    }

    pub fn has_key(&self, name: &str) -> bool {
        self.primary_key().iter().any(|a| a.name == name)
    }
}
