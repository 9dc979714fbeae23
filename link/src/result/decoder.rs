use std::collections::VecDeque;
use std::sync::Arc;

use super::metadata::{ColumnMetadata, Columns};
use super::result_set::ResultSet;
use super::row::Row;
use crate::models::Resource;
use crate::normalize::column_order;
use crate::statement::request::ResponsePayload;

/// Turn raw response rows into a [`ResultSet`].
///
/// Column metadata is computed once from the keys of the first row and
/// shared by every row. Values are not converted here; typed accessors on
/// [`Row`] convert on read.
pub fn decode(
    resource: &Resource,
    view: Option<&str>,
    applied: bool,
    payload: ResponsePayload,
) -> ResultSet {
    let ResponsePayload { rows, page_state } = payload;
    let Some(first) = rows.first() else {
        return ResultSet::new(applied, VecDeque::new(), Arc::default(), page_state);
    };

    let names: Vec<&str> = first.keys().map(String::as_str).collect();
    let ordered = column_order(resource, view, &names);
    let columns = Arc::new(Columns::new(
        ordered
            .iter()
            .map(|name| ColumnMetadata::classify(resource, name)),
    ));
    log::debug!(
        "[STATEMENT] Decoding {} rows of '{}' with {} columns",
        rows.len(),
        resource.name(),
        columns.len()
    );

    let rows = rows
        .into_iter()
        .map(|values| Row::new(values, Arc::clone(&columns)))
        .collect();
    ResultSet::new(applied, rows, columns, page_state)
}
