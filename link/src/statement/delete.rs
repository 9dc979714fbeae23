use serde_json::Value as JsonValue;
use std::sync::Arc;

use super::{not_in_resource, Method, ParamName, Placement, Statement, StatementCore};
use crate::error::Result;
use crate::models::Resource;

/// DELETE statement. Key values, or the entity id `eid`, are sent as query
/// parameters; there is no body.
#[derive(Debug, Clone)]
pub struct DeleteStatement {
    core: StatementCore,
}

impl DeleteStatement {
    pub(crate) fn new(resource: Arc<Resource>) -> Self {
        Self {
            core: StatementCore::new(resource, Method::Delete, None),
        }
    }
}

impl Statement for DeleteStatement {
    fn core(&self) -> &StatementCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StatementCore {
        &mut self.core
    }

    fn placement(&self, name: &ParamName<'_>, _value: &JsonValue) -> Result<Placement> {
        let resource = self.core.resource();
        if name.base != "eid" && !resource.all_attribute_names().contains(name.base) {
            return Err(not_in_resource(resource, name));
        }
        Ok(Placement::Query)
    }
}
