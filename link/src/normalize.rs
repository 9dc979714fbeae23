//! Column-order normalization for decoded results.
//!
//! Response objects carry no meaningful key order, so the decoder sorts
//! columns here to give the shell and other consumers a stable layout:
//! the view's primary key first, then the remaining schema attributes in
//! declaration order, then system columns, then anything the schema does
//! not know about, alphabetically.

use std::collections::HashMap;

use crate::models::{Resource, SYSTEM_COLUMN_NAMES};

/// Preferred column order for a resource read through `view`
/// (the primary view when `None`).
fn preferred_order<'a>(resource: &'a Resource, view: Option<&str>) -> Vec<&'a str> {
    let view = view
        .and_then(|name| resource.view(name))
        .unwrap_or_else(|| resource.primary_view());

    let mut preferred: Vec<&'a str> = view.primary_key_names();
    let mut system: Vec<&'a str> = Vec::new();
    for name in resource.all_attribute_names() {
        if preferred.contains(&name) {
            continue;
        }
        let is_system = resource
            .get_attribute(name)
            .is_some_and(|a| a.is_system_column());
        if is_system {
            system.push(name);
        } else {
            preferred.push(name);
        }
    }
    system.sort_by_key(|name| {
        SYSTEM_COLUMN_NAMES
            .iter()
            .position(|reserved| reserved == name)
            .unwrap_or(usize::MAX)
    });
    preferred.extend(system);
    preferred
}

fn sort_columns(columns: &[&str], preferred: &[&str]) -> Vec<String> {
    let order_index: HashMap<&str, usize> = preferred
        .iter()
        .enumerate()
        .map(|(i, &name)| (name, i))
        .collect();

    let mut listed: Vec<&str> = Vec::new();
    let mut unlisted: Vec<&str> = Vec::new();
    for &c in columns {
        if order_index.contains_key(c) {
            listed.push(c);
        } else {
            unlisted.push(c);
        }
    }
    listed.sort_by_key(|c| order_index.get(c).copied().unwrap_or(usize::MAX));
    unlisted.sort_unstable();
    listed
        .into_iter()
        .chain(unlisted)
        .map(str::to_string)
        .collect()
}

/// Order the columns of a response for `resource` read through `view`.
pub fn column_order(resource: &Resource, view: Option<&str>, columns: &[&str]) -> Vec<String> {
    sort_columns(columns, &preferred_order(resource, view))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;
    use serde_json::json;

    fn persons() -> std::sync::Arc<Resource> {
        let document = json!({
            "crm": {"resources": [{
                "id": "2b0f6c1e-55aa-4b7e-8a11-0c4d2e3f4a5b",
                "name": "persons",
                "attributes": [
                    {"id": "2b0f6c1e-0000-4b7e-8a11-000000000001", "name": "eid", "type": "UUID"},
                    {"id": "2b0f6c1e-0000-4b7e-8a11-000000000002", "name": "firstName", "type": "TEXT"},
                    {"id": "2b0f6c1e-0000-4b7e-8a11-000000000003", "name": "cra", "type": "CREATED_AT"},
                    {"id": "2b0f6c1e-0000-4b7e-8a11-000000000004", "name": "age", "type": "NUMBER_INTEGER"}
                ],
                "views": [{"name": "persons", "primary": true,
                           "partitionKeys": [{"name": "pk", "type": "TEXT"}],
                           "clusterKeys": [{"name": "ck", "type": "TEXT"}]}]
            }]}
        });
        schema::load(&document).unwrap().resource("crm", "persons").unwrap()
    }

    #[test]
    fn test_primary_key_then_schema_then_system() {
        let resource = persons();
        let order = column_order(
            &resource,
            None,
            &["cra", "firstName", "zeta", "eid", "ck", "age", "pk", "friends_data"],
        );
        assert_eq!(
            order,
            vec!["pk", "ck", "firstName", "age", "eid", "cra", "friends_data", "zeta"]
        );
    }

    #[test]
    fn test_unknown_view_falls_back_to_primary() {
        let resource = persons();
        let order = column_order(&resource, Some("missing"), &["firstName", "pk"]);
        assert_eq!(order, vec!["pk", "firstName"]);
    }
}
