//! Result decoding: column classification, typed rows and result sets.

mod decoder;
mod metadata;
mod result_set;
mod row;

pub use decoder::decode;
pub use metadata::{is_expand_column_name, ColumnMetadata, Columns, EXPAND_SUFFIX};
pub use result_set::ResultSet;
pub use row::Row;
