//! Output formatters for statement results
//!
//! Renders decoded rows as a box-drawn table, pretty JSON or CSV, plus the
//! listings behind `APPS` and `DESCRIBE`.

use clap::ValueEnum;
use cloudsite_link::{AttributeKind, Resource, Row};
use colored::*;
use serde_json::{Map, Value as JsonValue};
use std::str::FromStr;

use crate::error::{CLIError, Result};

/// Maximum column width before truncation
const MAX_COLUMN_WIDTH: usize = 32;

/// Minimum column width when resizing to fit the terminal
const MIN_COLUMN_WIDTH: usize = 6;

/// Output format for statement results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl FromStr for OutputFormat {
    type Err = CLIError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(CLIError::ParseError(format!(
                "Unknown format '{}': expected table, json or csv",
                other
            ))),
        }
    }
}

/// Formats statement results for display
pub struct OutputFormatter {
    format: OutputFormat,
    color: bool,
    truncate: bool,
}

impl OutputFormatter {
    /// Create a new formatter
    pub fn new(format: OutputFormat, color: bool, truncate: bool) -> Self {
        Self {
            format,
            color,
            truncate,
        }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn set_format(&mut self, format: OutputFormat) {
        self.format = format;
    }

    pub fn truncate(&self) -> bool {
        self.truncate
    }

    pub fn set_truncate(&mut self, truncate: bool) {
        self.truncate = truncate;
    }

    /// Get terminal width, defaulting to 80 if unavailable
    fn get_terminal_width() -> usize {
        if let Some((w, _h)) = term_size::dimensions() {
            w
        } else {
            80
        }
    }

    /// Truncate a string to max width with ellipsis
    fn truncate_value(value: &str, max_width: usize) -> String {
        if value.chars().count() <= max_width {
            value.to_string()
        } else if max_width <= 3 {
            value.chars().take(max_width).collect()
        } else {
            let take = max_width - 3;
            format!("{}...", value.chars().take(take).collect::<String>())
        }
    }

    /// Format the rows returned by a READ
    pub fn format_rows(&self, columns: &[String], rows: &[Row]) -> Result<String> {
        match self.format {
            OutputFormat::Table => {
                let cells: Vec<Vec<String>> = rows
                    .iter()
                    .map(|row| {
                        columns
                            .iter()
                            .map(|col| {
                                row.get(col)
                                    .map(Self::format_json_value)
                                    .unwrap_or_else(|| "NULL".to_string())
                            })
                            .collect()
                    })
                    .collect();
                let mut output = self.format_table(columns, &cells);
                let row_label = if rows.len() == 1 { "row" } else { "rows" };
                output.push_str(&format!("({} {})", rows.len(), row_label));
                Ok(output)
            }
            OutputFormat::Json => self.format_json(columns, rows),
            OutputFormat::Csv => Ok(self.format_csv(columns, rows)),
        }
    }

    /// Acknowledgement for CREATE, UPDATE and DELETE
    pub fn format_applied(&self, verb: &str, resource: &str, applied: bool) -> String {
        match self.format {
            OutputFormat::Json => serde_json::json!({ "applied": applied }).to_string(),
            OutputFormat::Csv => format!("applied\n{}\n", applied),
            OutputFormat::Table => {
                let message = if applied {
                    format!("{} {} OK", verb, resource)
                } else {
                    format!("{} {} not applied", verb, resource)
                };
                if self.color {
                    if applied {
                        message.green().to_string()
                    } else {
                        message.yellow().to_string()
                    }
                } else {
                    message
                }
            }
        }
    }

    /// Listing for `APPS`: one line per application with its resources
    pub fn format_apps(&self, apps: &[(String, Vec<String>)]) -> String {
        let headers = vec!["application".to_string(), "resources".to_string()];
        let cells: Vec<Vec<String>> = apps
            .iter()
            .map(|(app, resources)| vec![app.clone(), resources.join(", ")])
            .collect();
        self.format_table(&headers, &cells)
    }

    /// Listing for `DESCRIBE`: every attribute with its type and role,
    /// followed by the resource's views.
    pub fn format_describe(&self, resource: &Resource) -> String {
        let headers = vec![
            "attribute".to_string(),
            "type".to_string(),
            "role".to_string(),
        ];
        let cells: Vec<Vec<String>> = resource
            .attributes()
            .map(|attribute| {
                let role = match attribute.kind {
                    AttributeKind::Regular => String::new(),
                    AttributeKind::PartitionKey => "partition key".to_string(),
                    AttributeKind::ClusterKey { order_by: Some(order) } => {
                        format!("cluster key ({:?})", order).to_ascii_lowercase()
                    }
                    AttributeKind::ClusterKey { order_by: None } => "cluster key".to_string(),
                    AttributeKind::System => "system".to_string(),
                };
                vec![
                    attribute.name.clone(),
                    attribute.data_type.wire_name().to_string(),
                    role,
                ]
            })
            .collect();

        let mut output = self.format_table(&headers, &cells);
        for view in resource.views() {
            let marker = if view.primary { " (primary)" } else { "" };
            output.push_str(&format!(
                "view {}{}: [{}]\n",
                view.name,
                marker,
                view.primary_key_names().join(", ")
            ));
        }
        output
    }

    /// Box-drawn table. Cells are shrunk to fit the terminal only while
    /// truncation is on.
    fn format_table(&self, columns: &[String], rows: &[Vec<String>]) -> String {
        if columns.is_empty() {
            return String::new();
        }

        let mut col_widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
        for row in rows {
            for (i, value) in row.iter().enumerate() {
                col_widths[i] = col_widths[i].max(value.chars().count());
            }
        }

        if self.truncate {
            Self::fit_widths(&mut col_widths, Self::get_terminal_width());
        }

        let mut output = String::new();
        Self::push_border(&mut output, &col_widths, ('┌', '┬', '┐'));
        Self::push_row(&mut output, columns, &col_widths, self.color);
        Self::push_border(&mut output, &col_widths, ('├', '┼', '┤'));
        for row in rows {
            Self::push_row(&mut output, row, &col_widths, false);
        }
        Self::push_border(&mut output, &col_widths, ('└', '┴', '┘'));
        output
    }

    fn fit_widths(col_widths: &mut [usize], terminal_width: usize) {
        let column_count = col_widths.len();
        let border_padding = column_count * 3 + 1;
        let available = terminal_width
            .saturating_sub(border_padding)
            .max(column_count);

        let mut total_width = col_widths.iter().sum::<usize>();
        if total_width <= available {
            return;
        }

        for width in col_widths.iter_mut() {
            if *width > MAX_COLUMN_WIDTH {
                *width = MAX_COLUMN_WIDTH;
            }
        }
        total_width = col_widths.iter().sum();

        while total_width > available {
            if let Some((idx, _)) = col_widths
                .iter()
                .enumerate()
                .filter(|(_, width)| **width > MIN_COLUMN_WIDTH)
                .max_by_key(|(_, width)| **width)
            {
                col_widths[idx] -= 1;
            } else if let Some((idx, _)) = col_widths
                .iter()
                .enumerate()
                .filter(|(_, width)| **width > 1)
                .max_by_key(|(_, width)| **width)
            {
                col_widths[idx] -= 1;
            } else {
                break;
            }
            total_width = col_widths.iter().sum();
        }
    }

    fn push_border(output: &mut String, col_widths: &[usize], corners: (char, char, char)) {
        let (left, middle, right) = corners;
        output.push(left);
        for (idx, width) in col_widths.iter().enumerate() {
            output.push_str(&"─".repeat(width + 2));
            output.push(if idx == col_widths.len() - 1 {
                right
            } else {
                middle
            });
        }
        output.push('\n');
    }

    fn push_row(output: &mut String, cells: &[String], col_widths: &[usize], bold: bool) {
        output.push('│');
        for (i, width) in col_widths.iter().enumerate() {
            let value = cells.get(i).map(String::as_str).unwrap_or("");
            let truncated = Self::truncate_value(value, *width);
            let padded = format!("{:width$}", truncated, width = width);
            output.push(' ');
            if bold {
                output.push_str(&padded.bold().to_string());
            } else {
                output.push_str(&padded);
            }
            output.push_str(" │");
        }
        output.push('\n');
    }

    /// Format as JSON
    fn format_json(&self, columns: &[String], rows: &[Row]) -> Result<String> {
        let objects: Vec<JsonValue> = rows
            .iter()
            .map(|row| {
                let mut object = Map::new();
                for col in columns {
                    let value = row.get(col).cloned().unwrap_or(JsonValue::Null);
                    object.insert(col.clone(), value);
                }
                JsonValue::Object(object)
            })
            .collect();
        serde_json::to_string_pretty(&objects).map_err(|e| CLIError::FormatError(e.to_string()))
    }

    /// Format as CSV
    fn format_csv(&self, columns: &[String], rows: &[Row]) -> String {
        if columns.is_empty() {
            return String::new();
        }

        let header: Vec<String> = columns.iter().map(|c| Self::escape_csv(c)).collect();
        let mut output = header.join(",") + "\n";

        for row in rows {
            let values: Vec<String> = columns
                .iter()
                .map(|col| match row.get(col) {
                    None | Some(JsonValue::Null) => String::new(),
                    Some(value) => Self::escape_csv(&Self::format_json_value(value)),
                })
                .collect();
            output.push_str(&values.join(","));
            output.push('\n');
        }

        output
    }

    /// Format JSON value for table display
    fn format_json_value(value: &JsonValue) -> String {
        match value {
            JsonValue::Null => "NULL".to_string(),
            JsonValue::Bool(b) => b.to_string(),
            JsonValue::Number(n) => n.to_string(),
            JsonValue::String(s) => s.clone(),
            JsonValue::Array(_) | JsonValue::Object(_) => value.to_string(),
        }
    }

    /// Quote a CSV field containing commas, quotes or newlines
    fn escape_csv(s: &str) -> String {
        if s.contains(',') || s.contains('"') || s.contains('\n') {
            format!("\"{}\"", s.replace('"', "\"\""))
        } else {
            s.to_string()
        }
    }
}
