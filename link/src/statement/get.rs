use indexmap::IndexSet;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use uuid::Uuid;

use super::{Method, ParamName, Placement, Statement, StatementCore, StatementState};
use crate::error::{LinkError, Result};
use crate::models::Resource;

/// Query parameter carrying the page cursor
pub const PAGE_STATE_PARAM: &str = "pageState";
/// Query parameter limiting the page size
pub const LIMIT_PARAM: &str = "_limit";
/// Query parameter asking the service to inline related entities
pub const EXPAND_RELATIONS_PARAM: &str = "_expandRelations";
/// Query parameter selecting a single entity by id
pub const ENTITY_ID_PARAM: &str = "eid";

/// Largest page the service will return
pub const MAX_LIMIT: i64 = 1000;

const READ_PARAMS: &[&str] = &[
    ENTITY_ID_PARAM,
    LIMIT_PARAM,
    PAGE_STATE_PARAM,
    EXPAND_RELATIONS_PARAM,
];

/// GET statement reading entities through a view.
///
/// Only the target view's primary key names and the read options
/// (`eid`, `_limit`, `pageState`, `_expandRelations`) are accepted unless
/// more names are allowed with [`GetStatement::extend_params`].
///
/// ```rust,no_run
/// # async fn example(session: &cloudsite_link::Session) -> cloudsite_link::Result<()> {
/// use cloudsite_link::Statement;
///
/// let persons = session.resource("crm", "persons")?;
/// let mut read = persons.get();
/// read.with_param("pk", "A")?.limit(50)?;
///
/// let mut page = session.execute(&mut read).await?;
/// while let Some(row) = page.next() {
///     println!("{:?}", row.get_string("firstName")?);
/// }
/// if read.has_more_pages() {
///     read.next_page()?;
///     let _second = session.execute(&mut read).await?;
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct GetStatement {
    core: StatementCore,
    extra_params: IndexSet<String>,
}

impl GetStatement {
    pub(crate) fn new(resource: Arc<Resource>, view: Option<String>) -> Self {
        Self {
            core: StatementCore::new(resource, Method::Get, view),
            extra_params: IndexSet::new(),
        }
    }

    /// Name of the view the statement reads from
    pub fn view_name(&self) -> &str {
        match self.core.view() {
            Some(view) => view,
            None => &self.core.resource().primary_view().name,
        }
    }

    /// Allow additional parameter names, e.g. non-key attributes the
    /// service can filter on.
    pub fn extend_params<I, S>(&mut self, names: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_params.extend(names.into_iter().map(Into::into));
        self
    }

    /// Page size, 0 through 1000 inclusive
    pub fn limit(&mut self, limit: i64) -> Result<&mut Self> {
        self.with_param(LIMIT_PARAM, limit)
    }

    /// Read a single entity by id
    pub fn with_id(&mut self, id: Uuid) -> Result<&mut Self> {
        self.with_param(ENTITY_ID_PARAM, id.to_string())
    }

    /// Inline related entities as `<relation>_data` columns
    pub fn expand_relations(&mut self) -> Result<&mut Self> {
        self.with_param(EXPAND_RELATIONS_PARAM, true)
    }

    /// Continue from an explicit cursor
    pub fn page(&mut self, cursor: impl Into<String>) -> Result<&mut Self> {
        self.with_param(PAGE_STATE_PARAM, cursor.into())
    }

    /// True when the last execution returned a cursor
    pub fn has_more_pages(&self) -> bool {
        self.core.page_state().is_some()
    }

    /// Prepare the statement to fetch the page after the last one.
    ///
    /// Moves the returned cursor into the `pageState` parameter and puts the
    /// statement back into `Building`, keeping its other parameters.
    pub fn next_page(&mut self) -> Result<&mut Self> {
        if self.core.state() == StatementState::Building {
            return Err(LinkError::NotExecuted(
                "execute the read before asking for the next page".into(),
            ));
        }
        let cursor = self.core.take_page_state().ok_or_else(|| {
            LinkError::execution("no more pages: the previous page was the last one")
        })?;
        log::debug!("[STATEMENT] Continuing read of '{}' from cursor", self.core.resource().name());
        self.core.rearm();
        self.core.remove_query(PAGE_STATE_PARAM);
        self.page(cursor)
    }

    /// True while a cursor is set as a request parameter
    pub fn is_paging(&self) -> bool {
        self.core.query_params().contains_key(PAGE_STATE_PARAM)
    }

    fn check_read_option(name: &ParamName<'_>, value: &JsonValue) -> Result<()> {
        match name.base {
            LIMIT_PARAM => {
                let limit = match value {
                    JsonValue::Number(n) => n.as_i64(),
                    JsonValue::String(s) => s.trim().parse::<i64>().ok(),
                    _ => None,
                };
                match limit {
                    Some(n) if (0..=MAX_LIMIT).contains(&n) => Ok(()),
                    _ => Err(LinkError::invalid_param(
                        name.full,
                        format!("limit must be between 0 and {}, got {}", MAX_LIMIT, value),
                    )),
                }
            }
            PAGE_STATE_PARAM if !value.is_string() => Err(LinkError::invalid_param(
                name.full,
                "page cursor must be a string",
            )),
            EXPAND_RELATIONS_PARAM => match value {
                JsonValue::Bool(_) => Ok(()),
                JsonValue::String(s) if s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("false") => Ok(()),
                _ => Err(LinkError::invalid_param(name.full, "expected true or false")),
            },
            _ => Ok(()),
        }
    }
}

impl Statement for GetStatement {
    fn core(&self) -> &StatementCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StatementCore {
        &mut self.core
    }

    fn placement(&self, name: &ParamName<'_>, value: &JsonValue) -> Result<Placement> {
        let resource = self.core.resource();
        if READ_PARAMS.contains(&name.base) {
            Self::check_read_option(name, value)?;
            return Ok(Placement::Query);
        }

        let view = resource.view(self.view_name());
        let is_key = view.is_some_and(|v| v.has_key(name.base));
        if !is_key && !self.extra_params.contains(name.base) {
            return Err(LinkError::invalid_param(
                name.full,
                format!(
                    "not a key of view '{}' of resource '{}'",
                    self.view_name(),
                    resource.name()
                ),
            ));
        }
        Ok(Placement::Query)
    }
}
