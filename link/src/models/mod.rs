//! Schema model for cloudsite-link.
//!
//! Applications, resources, attributes, views and auth rules as described
//! by the site's schema document. Everything here is read-only once the
//! schema has been loaded.

pub mod application;
pub mod attribute;
pub mod auth;
pub mod data_type;
pub mod resource;
pub mod view;

#[cfg(test)]
mod tests;

pub use application::{Application, SchemaModel};
pub use attribute::{
    is_reserved_name, Attribute, AttributeKind, CollectionType, OrderBy, Validation,
    SYSTEM_COLUMN_NAMES,
};
pub use auth::{Auth, Permission};
pub use data_type::{Accessor, DataType};
pub use resource::{Resource, ResourceBuilder};
pub use view::View;
