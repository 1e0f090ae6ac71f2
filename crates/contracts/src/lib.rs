use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub mod canonical;

/// Format used for configured range bounds and for timestamps rendered into statements.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT)
}

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Timestamp column that bounds each row of a masked table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateField {
    Date,
    First,
}

impl DateField {
    pub fn as_str(self) -> &'static str {
        match self {
            DateField::Date => "date",
            DateField::First => "first",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMask {
    pub column: String,
    /// Pre-quoted SQL literal, rendered verbatim.
    pub value: String,
}

impl ColumnMask {
    pub fn new(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskSpec {
    pub table_name: String,
    pub date_field: DateField,
    pub columns: Vec<ColumnMask>,
}

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Window {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Window {
    pub fn minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

impl std::fmt::Display for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}, {})",
            format_timestamp(&self.start),
            format_timestamp(&self.end)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterContext {
    pub customer_id: i64,
    pub engine_id: Option<i64>,
}

/// Physical location the rendered statements address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementTarget {
    pub database: String,
    pub table_suffix: String,
    pub cluster: Option<String>,
}

impl StatementTarget {
    pub fn qualified_table(&self, table_name: &str) -> String {
        format!("{}.{}{}", self.database, table_name, self.table_suffix)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub table_name: String,
    pub window: Window,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Generate,
    Execute,
}

impl RunMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RunMode::Generate => "GENERATE",
            RunMode::Execute => "EXECUTE",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("GENERATE") {
            Some(RunMode::Generate)
        } else if raw.eq_ignore_ascii_case("EXECUTE") {
            Some(RunMode::Execute)
        } else {
            None
        }
    }
}
