use serde_json::Value as JsonValue;
use std::sync::Arc;

use super::{not_in_resource, Method, ParamName, Placement, Statement, StatementCore};
use crate::error::{LinkError, Result};
use crate::models::Resource;

/// PUT statement updating an existing entity, identified by its primary
/// key values in the request body.
#[derive(Debug, Clone)]
pub struct SaveStatement {
    core: StatementCore,
}

impl SaveStatement {
    pub(crate) fn new(resource: Arc<Resource>) -> Self {
        Self {
            core: StatementCore::new(resource, Method::Put, None),
        }
    }
}

impl Statement for SaveStatement {
    fn core(&self) -> &StatementCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StatementCore {
        &mut self.core
    }

    fn placement(&self, name: &ParamName<'_>, _value: &JsonValue) -> Result<Placement> {
        let resource = self.core.resource();
        if !resource.all_settable_attribute_names().contains(name.base) {
            return Err(not_in_resource(resource, name));
        }
        Ok(Placement::Body)
    }

    fn check_ready(&self) -> Result<()> {
        let resource = self.core.resource();
        let body = self.core.body();
        match resource
            .settable_primary_key_names()
            .into_iter()
            .find(|key| !body.contains_key(*key))
        {
            Some(missing) => Err(LinkError::invalid_param(
                missing,
                "primary key value required to identify the entity to save",
            )),
            None => Ok(()),
        }
    }
}
