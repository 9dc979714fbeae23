//! Statement engine.
//!
//! A statement is a single-use request builder bound to one [`Resource`]
//! and one HTTP verb. Parameter names are validated against the resource's
//! declared attributes as they are set (values are passed through as given); execution happens through
//! [`Session::execute`](crate::Session::execute) and moves the statement
//! from `Building` to `Executed` or `Failed`. Only [`Statement::reset`]
//! returns it to `Building`.
//!
//! Statements are mutated through `&mut self`, so a concurrent `with_param`
//! and `execute` on the same instance is rejected by the borrow checker.
//! Sharing one across tasks needs an external lock.

mod create;
mod delete;
pub mod get;
pub mod request;
mod save;

pub use create::CreateStatement;
pub use delete::DeleteStatement;
pub use get::GetStatement;
pub use request::StatementRequest;
pub use save::SaveStatement;

use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::Arc;

use crate::error::{LinkError, Result};
use crate::models::Resource;

/// HTTP verb a statement kind executes with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementState {
    Building,
    Executed,
    Failed,
}

/// Where a validated parameter is sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Query,
    Body,
}

/// A parameter name split into the attribute it refers to and its optional
/// `[index]` collection suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamName<'a> {
    pub full: &'a str,
    pub base: &'a str,
    pub indexed: bool,
}

impl<'a> ParamName<'a> {
    pub fn parse(full: &'a str) -> Self {
        match full.find('[') {
            Some(pos) => Self {
                full,
                base: &full[..pos],
                indexed: true,
            },
            None => Self {
                full,
                base: full,
                indexed: false,
            },
        }
    }
}

/// State shared by every statement kind.
#[derive(Debug, Clone)]
pub struct StatementCore {
    resource: Arc<Resource>,
    method: Method,
    view: Option<String>,
    query: IndexMap<String, JsonValue>,
    body: IndexMap<String, JsonValue>,
    state: StatementState,
    page_state: Option<String>,
}

impl StatementCore {
    pub(crate) fn new(resource: Arc<Resource>, method: Method, view: Option<String>) -> Self {
        Self {
            resource,
            method,
            view,
            query: IndexMap::new(),
            body: IndexMap::new(),
            state: StatementState::Building,
            page_state: None,
        }
    }

    pub fn resource(&self) -> &Arc<Resource> {
        &self.resource
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// Target view when it is not the resource's default
    pub fn view(&self) -> Option<&str> {
        self.view.as_deref()
    }

    pub fn query_params(&self) -> &IndexMap<String, JsonValue> {
        &self.query
    }

    pub fn body(&self) -> &IndexMap<String, JsonValue> {
        &self.body
    }

    pub fn state(&self) -> StatementState {
        self.state
    }

    /// Cursor returned by the last execution, if the remote side reported more data
    pub fn page_state(&self) -> Option<&str> {
        self.page_state.as_deref()
    }

    pub(crate) fn ensure_building(&self) -> Result<()> {
        match self.state {
            StatementState::Building => Ok(()),
            _ => Err(LinkError::AlreadyExecuted),
        }
    }

    pub(crate) fn insert(&mut self, name: &str, value: JsonValue, placement: Placement) {
        match placement {
            Placement::Query => self.query.insert(name.to_string(), value),
            Placement::Body => self.body.insert(name.to_string(), value),
        };
    }

    pub(crate) fn remove_query(&mut self, name: &str) -> Option<JsonValue> {
        self.query.shift_remove(name)
    }

    pub(crate) fn mark_executed(&mut self, page_state: Option<String>) {
        self.state = StatementState::Executed;
        self.page_state = page_state;
    }

    pub(crate) fn mark_failed(&mut self) {
        self.state = StatementState::Failed;
        self.page_state = None;
    }

    /// Back to `Building` with the parameters kept, for cursor continuation.
    pub(crate) fn rearm(&mut self) {
        self.state = StatementState::Building;
    }

    pub(crate) fn take_page_state(&mut self) -> Option<String> {
        self.page_state.take()
    }

    pub(crate) fn reset(&mut self) {
        self.query.clear();
        self.body.clear();
        self.page_state = None;
        self.state = StatementState::Building;
    }
}

/// Common statement behavior. Concrete kinds decide which names are valid
/// and whether a value goes to the query string or the request body.
pub trait Statement: Send + fmt::Debug {
    fn core(&self) -> &StatementCore;

    fn core_mut(&mut self) -> &mut StatementCore;

    /// Validate one parameter and decide where it is sent.
    fn placement(&self, name: &ParamName<'_>, value: &JsonValue) -> Result<Placement>;

    /// Last check before the request is built.
    fn check_ready(&self) -> Result<()> {
        Ok(())
    }

    /// Set one parameter. Last write for a name wins.
    fn with_param(&mut self, name: &str, value: impl Into<JsonValue>) -> Result<&mut Self>
    where
        Self: Sized,
    {
        self.core().ensure_building()?;
        let value = value.into();
        let param = ParamName::parse(name);
        let placement = self.placement(&param, &value)?;
        self.core_mut().insert(name, value, placement);
        Ok(self)
    }

    /// Set several parameters. Nothing is applied if any of them is invalid.
    fn with_params<I, K, V>(&mut self, params: I) -> Result<&mut Self>
    where
        Self: Sized,
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<JsonValue>,
    {
        self.core().ensure_building()?;
        let mut validated = Vec::new();
        for (name, value) in params {
            let value = value.into();
            let placement = self.placement(&ParamName::parse(name.as_ref()), &value)?;
            validated.push((name.as_ref().to_string(), value, placement));
        }
        let core = self.core_mut();
        for (name, value, placement) in validated {
            core.insert(&name, value, placement);
        }
        Ok(self)
    }

    /// Return to `Building` with no parameters and no cursor.
    fn reset(&mut self) {
        self.core_mut().reset();
    }

    fn state(&self) -> StatementState {
        self.core().state()
    }

    fn is_executed(&self) -> bool {
        self.core().state() == StatementState::Executed
    }

    fn resource(&self) -> &Arc<Resource> {
        self.core().resource()
    }

    fn method(&self) -> Method {
        self.core().method()
    }
}

pub(crate) fn not_in_resource(resource: &Resource, name: &ParamName<'_>) -> LinkError {
    LinkError::invalid_param(
        name.full,
        format!("not an attribute of resource '{}'", resource.name()),
    )
}
