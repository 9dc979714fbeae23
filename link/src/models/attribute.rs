use uuid::Uuid;

use super::data_type::DataType;

/// Reserved attribute names populated by the remote service: entity id,
/// customer id, creator, creation time, last changer, last change time.
/// Never settable by a caller.
pub const SYSTEM_COLUMN_NAMES: &[&str] = &["cid", "eid", "cra", "crb", "cha", "chb"];

/// Whether `name` is one of `reserved`.
pub fn is_reserved_name(reserved: &[&str], name: &str) -> bool {
    reserved.iter().any(|r| *r == name)
}

/// Sort direction of a cluster key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderBy {
    Asc,
    Desc,
}

impl OrderBy {
    pub fn from_wire(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ASC" => Some(OrderBy::Asc),
            "DESC" => Some(OrderBy::Desc),
            _ => None,
        }
    }
}

/// Role of an attribute within its resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    Regular,
    PartitionKey,
    ClusterKey { order_by: Option<OrderBy> },
    System,
}

/// Min/max bound from the schema: text length for text types, value range
/// for numeric types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validation {
    pub min: i64,
    pub max: i64,
}

/// Element type of a collection attribute
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionType {
    pub data_type: DataType,
    pub validation: Option<Validation>,
}

/// A column of a resource: regular attribute, key component or system column.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub id: Option<Uuid>,
    pub name: String,
    pub data_type: DataType,
    pub kind: AttributeKind,
    pub collection_types: Vec<CollectionType>,
    pub validation: Option<Validation>,
}

impl Attribute {
    pub fn new(id: Option<Uuid>, name: impl Into<String>, data_type: DataType, kind: AttributeKind) -> Self {
        Self {
            id,
            name: name.into(),
            data_type,
            kind,
            collection_types: Vec::new(),
            validation: None,
        }
    }

    pub fn with_validation(mut self, validation: Option<Validation>) -> Self {
        self.validation = validation;
        self
    }

    pub fn with_collection_types(mut self, collection_types: Vec<CollectionType>) -> Self {
        self.collection_types = collection_types;
        self
    }

    pub fn is_partition_key(&self) -> bool {
        matches!(self.kind, AttributeKind::PartitionKey)
    }

    pub fn is_cluster_key(&self) -> bool {
        matches!(self.kind, AttributeKind::ClusterKey { .. })
    }

    pub fn is_primary_key(&self) -> bool {
        self.is_partition_key() || self.is_cluster_key()
    }

    pub fn is_regular_column(&self) -> bool {
        matches!(self.kind, AttributeKind::Regular)
    }

    /// System columns are identified by kind or by reserved name, so a key
    /// named `eid` still counts as one.
    pub fn is_system_column(&self) -> bool {
        matches!(self.kind, AttributeKind::System) || is_reserved_name(SYSTEM_COLUMN_NAMES, &self.name)
    }

    /// Ordering direction; only cluster keys have one.
    pub fn order_by(&self) -> Option<OrderBy> {
        match self.kind {
            AttributeKind::ClusterKey { order_by } => order_by,
            _ => None,
        }
    }
}

impl std::fmt::Display for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.data_type)
    }
}
