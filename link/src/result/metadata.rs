use indexmap::IndexMap;

use crate::models::{Attribute, DataType, Resource};

/// Suffix the service appends to a relation column when it inlines the
/// related entity, e.g. `friends_data` for relation `friends`.
pub const EXPAND_SUFFIX: &str = "_data";

/// True for names ending in [`EXPAND_SUFFIX`], ignoring case.
pub fn is_expand_column_name(name: &str) -> bool {
    name.len() > EXPAND_SUFFIX.len()
        && name
            .get(name.len() - EXPAND_SUFFIX.len()..)
            .is_some_and(|suffix| suffix.eq_ignore_ascii_case(EXPAND_SUFFIX))
}

/// Classification of one result column.
///
/// A column is either declared by the schema (`model_supported`), an
/// expanded relation (`expand_column`, always a system column), or
/// undefined. The constructors are the only way to build one, so an expand
/// column can never also be model supported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMetadata {
    name: String,
    data_type: DataType,
    system_column: bool,
    model_supported: bool,
    expand_column: bool,
}

impl ColumnMetadata {
    pub fn from_attribute(attribute: &Attribute) -> Self {
        Self {
            name: attribute.name.clone(),
            data_type: attribute.data_type,
            system_column: attribute.is_system_column(),
            model_supported: true,
            expand_column: false,
        }
    }

    pub fn expand(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: DataType::Expand,
            system_column: true,
            model_supported: false,
            expand_column: true,
        }
    }

    pub fn undefined(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: DataType::Undefined,
            system_column: false,
            model_supported: false,
            expand_column: false,
        }
    }

    /// Classify a response column against the resource it was read from.
    pub fn classify(resource: &Resource, name: &str) -> Self {
        match resource.get_attribute(name) {
            Some(attribute) => Self::from_attribute(attribute),
            None if is_expand_column_name(name) => Self::expand(name),
            None => Self::undefined(name),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn is_system_column(&self) -> bool {
        self.system_column
    }

    pub fn is_model_supported(&self) -> bool {
        self.model_supported
    }

    pub fn is_expand_column(&self) -> bool {
        self.expand_column
    }

    /// Declared by the schema and writable by a caller
    pub fn is_settable(&self) -> bool {
        self.model_supported && !self.system_column
    }
}

/// Column metadata of a result set, in display order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Columns {
    by_name: IndexMap<String, ColumnMetadata>,
}

impl Columns {
    pub fn new(columns: impl IntoIterator<Item = ColumnMetadata>) -> Self {
        Self {
            by_name: columns
                .into_iter()
                .map(|c| (c.name.clone(), c))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ColumnMetadata> {
        self.by_name.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.by_name.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnMetadata> {
        self.by_name.values()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
