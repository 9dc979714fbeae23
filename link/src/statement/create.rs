use serde_json::Value as JsonValue;
use std::sync::Arc;

use super::{not_in_resource, Method, ParamName, Placement, Statement, StatementCore};
use crate::error::{LinkError, Result};
use crate::models::{is_reserved_name, Resource, SYSTEM_COLUMN_NAMES};

/// POST statement creating a new entity. Attribute values are sent in the
/// request body.
#[derive(Debug, Clone)]
pub struct CreateStatement {
    core: StatementCore,
}

impl CreateStatement {
    pub(crate) fn new(resource: Arc<Resource>) -> Self {
        Self {
            core: StatementCore::new(resource, Method::Post, None),
        }
    }
}

impl Statement for CreateStatement {
    fn core(&self) -> &StatementCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StatementCore {
        &mut self.core
    }

    fn placement(&self, name: &ParamName<'_>, _value: &JsonValue) -> Result<Placement> {
        if is_reserved_name(SYSTEM_COLUMN_NAMES, name.base) {
            return Err(LinkError::invalid_param(
                name.full,
                "system column, assigned by the service and never settable",
            ));
        }
        let resource = self.core.resource();
        if !resource.all_settable_attribute_names().contains(name.base) {
            return Err(not_in_resource(resource, name));
        }
        Ok(Placement::Body)
    }
}
