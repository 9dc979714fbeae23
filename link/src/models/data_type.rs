use std::fmt;

/// Declared type of a schema attribute.
///
/// The set of types is only known after the schema document has been
/// loaded, so attributes carry this tag instead of being typed at compile
/// time. `Expand` and `Undefined` never appear in a schema document; the
/// result decoder assigns them to response columns the schema does not
/// declare.
///
/// # Wire names
///
/// ```text
/// "BOOLEAN", "TEXT", "TEXT_128", "TIMESTAMP", "DATE", "TIME",
/// "NUMBER_INTEGER", "NUMBER_BIG_INTEGER", "NUMBER_DECIMAL",
/// "UUID", "UUID_TIME", "RELATION", "BINARY",
/// "COLLECTION_SET", "COLLECTION_LIST", "COLLECTION_MAP", "TUPLE"
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Boolean,
    /// UTF-8 text, any of the sized `TEXT_*` wire variants
    Text,
    /// ISO-8601 instant, e.g. `2024-05-01T10:15:30.000Z`
    Timestamp,
    /// Date string, e.g. `2015-05-03`
    Date,
    /// Time-of-day string, e.g. `13:30:54.234`
    Time,
    /// 32-bit signed integer
    Integer,
    /// 64-bit signed integer
    BigInteger,
    Decimal,
    Uuid,
    TimeUuid,
    /// Reference to another entity; read back as the related primary key
    Relation,
    /// Base64-encoded bytes
    Binary,
    Set,
    List,
    Map,
    Tuple,
    /// Relation expansion column (`<name>_data`) added by the remote service
    Expand,
    /// Column present in a response but unknown to the schema
    Undefined,
}

/// Typed row accessors. Which accessor may read which [`DataType`] is
/// resolved through [`DataType::accessors`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Accessor {
    Bool,
    Int,
    Long,
    Double,
    String,
    Timestamp,
    Date,
    Time,
    Uuid,
    Relation,
    Bytes,
    Set,
    List,
    Map,
    Tuple,
    Expanded,
}

impl fmt::Display for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Accessor::Bool => "bool",
            Accessor::Int => "int",
            Accessor::Long => "long",
            Accessor::Double => "double",
            Accessor::String => "string",
            Accessor::Timestamp => "timestamp",
            Accessor::Date => "date",
            Accessor::Time => "time",
            Accessor::Uuid => "uuid",
            Accessor::Relation => "relation",
            Accessor::Bytes => "bytes",
            Accessor::Set => "set",
            Accessor::List => "list",
            Accessor::Map => "map",
            Accessor::Tuple => "tuple",
            Accessor::Expanded => "expanded relation",
        };
        f.write_str(name)
    }
}

impl DataType {
    /// Parse a schema document type name. Returns `None` for unknown names.
    pub fn from_wire(name: &str) -> Option<Self> {
        let upper = name.trim().to_ascii_uppercase();
        if upper == "TEXT" || upper.starts_with("TEXT_") {
            return Some(DataType::Text);
        }
        let data_type = match upper.as_str() {
            "BOOLEAN" => DataType::Boolean,
            "TIMESTAMP" | "CREATED_AT" | "CHANGED_AT" => DataType::Timestamp,
            "DATE" => DataType::Date,
            "TIME" => DataType::Time,
            "NUMBER_INTEGER" | "INTEGER" => DataType::Integer,
            "NUMBER_BIG_INTEGER" | "BIG_INTEGER" | "LONG" => DataType::BigInteger,
            "NUMBER_DECIMAL" | "DECIMAL" => DataType::Decimal,
            "UUID" | "CREATED_BY" | "CHANGED_BY" => DataType::Uuid,
            "UUID_TIME" | "TIMEUUID" => DataType::TimeUuid,
            "RELATION" => DataType::Relation,
            "BINARY" => DataType::Binary,
            "COLLECTION_SET" => DataType::Set,
            "COLLECTION_LIST" => DataType::List,
            "COLLECTION_MAP" => DataType::Map,
            "TUPLE" => DataType::Tuple,
            "UNDEFINED" => DataType::Undefined,
            _ => return None,
        };
        Some(data_type)
    }

    /// Canonical schema document name
    pub fn wire_name(&self) -> &'static str {
        match self {
            DataType::Boolean => "BOOLEAN",
            DataType::Text => "TEXT",
            DataType::Timestamp => "TIMESTAMP",
            DataType::Date => "DATE",
            DataType::Time => "TIME",
            DataType::Integer => "NUMBER_INTEGER",
            DataType::BigInteger => "NUMBER_BIG_INTEGER",
            DataType::Decimal => "NUMBER_DECIMAL",
            DataType::Uuid => "UUID",
            DataType::TimeUuid => "UUID_TIME",
            DataType::Relation => "RELATION",
            DataType::Binary => "BINARY",
            DataType::Set => "COLLECTION_SET",
            DataType::List => "COLLECTION_LIST",
            DataType::Map => "COLLECTION_MAP",
            DataType::Tuple => "TUPLE",
            DataType::Expand => "EXPAND",
            DataType::Undefined => "UNDEFINED",
        }
    }

    /// Accessors allowed to read a column of this type.
    pub fn accessors(&self) -> &'static [Accessor] {
        match self {
            DataType::Boolean => &[Accessor::Bool],
            DataType::Text => &[Accessor::String],
            DataType::Timestamp => &[Accessor::Timestamp],
            DataType::Date => &[Accessor::Date],
            DataType::Time => &[Accessor::Time],
            DataType::Integer => &[Accessor::Int, Accessor::Long],
            DataType::BigInteger => &[Accessor::Long],
            DataType::Decimal => &[Accessor::Double],
            DataType::Uuid | DataType::TimeUuid => &[Accessor::Uuid],
            DataType::Relation => &[Accessor::Relation],
            DataType::Binary => &[Accessor::Bytes],
            DataType::Set => &[Accessor::Set],
            DataType::List => &[Accessor::List],
            DataType::Map => &[Accessor::Map],
            DataType::Tuple => &[Accessor::Tuple],
            DataType::Expand => &[Accessor::Expanded],
            DataType::Undefined => &[],
        }
    }

    pub fn supports(&self, accessor: Accessor) -> bool {
        self.accessors().contains(&accessor)
    }

    pub fn is_collection(&self) -> bool {
        matches!(
            self,
            DataType::Set | DataType::List | DataType::Map | DataType::Tuple
        )
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::Integer | DataType::BigInteger | DataType::Decimal
        )
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let human = match self {
            DataType::Boolean => "Boolean",
            DataType::Text => "Text",
            DataType::Timestamp => "Timestamp",
            DataType::Date => "Date",
            DataType::Time => "Time",
            DataType::Integer => "Integer",
            DataType::BigInteger => "Long",
            DataType::Decimal => "Decimal",
            DataType::Uuid => "UUID",
            DataType::TimeUuid => "TimeUUID",
            DataType::Relation => "Relation",
            DataType::Binary => "Binary",
            DataType::Set => "Set",
            DataType::List => "List",
            DataType::Map => "Map",
            DataType::Tuple => "Tuple",
            DataType::Expand => "Expand",
            DataType::Undefined => "Undefined",
        };
        f.write_str(human)
    }
}
