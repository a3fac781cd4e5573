//! Parsing of engine responses.
//!
//! Engine output is semi-structured text. Each command is known to produce
//! one of three shapes:
//!
//! - **single value** -- a count or status word, possibly followed by text
//!   (`"3 total."`)
//! - **line list** -- one item per line
//! - **delimited table** -- one row per line, fields split on a fixed
//!   delimiter, column names taken from a per-command [`TableSchema`]
//!
//! Table parsing is best effort. A row with the wrong number of fields is
//! skipped and logged, never fatal, so one corrupt line cannot blank out a
//! whole queue view. The header line the engine prints and trailers such as
//! `+OK` or `3 total.` fall out of the same rule.

use std::collections::BTreeMap;

use tracing::debug;

/// One parsed table row: column name to field value.
pub type Record = BTreeMap<String, String>;

/// Column layout of one command's table output.
///
/// Column order is a property of the command and must be configured, never
/// inferred from the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    delimiter: char,
    columns: Vec<String>,
}

impl TableSchema {
    /// Build a schema from a delimiter and ordered column names.
    pub fn new<I, S>(delimiter: char, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            delimiter,
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// A `|`-delimited schema, the layout of `callcenter_config` output.
    pub fn piped(columns: &[&str]) -> Self {
        Self::new('|', columns.iter().copied())
    }

    /// A `,`-delimited schema, the layout of `show` output.
    pub fn comma(columns: &[&str]) -> Self {
        Self::new(',', columns.iter().copied())
    }

    /// Same delimiter, different columns.
    #[must_use]
    pub fn with_columns(&self, columns: Vec<String>) -> Self {
        Self {
            delimiter: self.delimiter,
            columns,
        }
    }

    /// The field delimiter.
    pub const fn delimiter(&self) -> char {
        self.delimiter
    }

    /// The ordered column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Whether a split row is the header line (every field is its column name).
    fn is_header(&self, fields: &[&str]) -> bool {
        self.columns
            .iter()
            .zip(fields)
            .all(|(column, field)| column == field.trim())
    }
}

/// The shape a command's response is expected to have.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseShape {
    /// First whitespace-delimited token of the trimmed body.
    SingleValue,
    /// Non-empty lines in order.
    LineList,
    /// Rows split per the schema.
    DelimitedTable(TableSchema),
}

/// A response parsed according to its [`ResponseShape`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    /// Result of [`ResponseShape::SingleValue`].
    Scalar(String),
    /// Result of [`ResponseShape::LineList`].
    Lines(Vec<String>),
    /// Result of [`ResponseShape::DelimitedTable`].
    Table(ParsedTable),
}

/// Rows recovered from a delimited table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTable {
    /// Well-formed rows, in response order.
    pub rows: Vec<Record>,
    /// Number of malformed rows that were dropped.
    pub skipped: usize,
}

/// Parse `raw` according to `shape`.
pub fn parse_response(raw: &str, shape: &ResponseShape) -> Parsed {
    match shape {
        ResponseShape::SingleValue => Parsed::Scalar(parse_single_value(raw).to_owned()),
        ResponseShape::LineList => Parsed::Lines(parse_line_list(raw)),
        ResponseShape::DelimitedTable(schema) => Parsed::Table(parse_table(raw, schema)),
    }
}

/// Return the first whitespace-delimited token of the trimmed body.
///
/// `"3 total.\n"` yields `"3"`; an empty body yields `""`.
pub fn parse_single_value(raw: &str) -> &str {
    raw.split_whitespace().next().unwrap_or("")
}

/// Split on newlines, trim, and drop empty lines.
pub fn parse_line_list(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Split `raw` into rows and each row into named fields.
///
/// Rows whose field count differs from the schema are skipped and counted.
/// The header row is skipped without counting. Field values are trimmed.
pub fn parse_table(raw: &str, schema: &TableSchema) -> ParsedTable {
    let mut table = ParsedTable::default();

    for (line_no, line) in raw.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(schema.delimiter).collect();
        if fields.len() != schema.columns.len() {
            debug!(
                line = line_no.saturating_add(1),
                expected = schema.columns.len(),
                found = fields.len(),
                "skipping malformed row"
            );
            table.skipped = table.skipped.saturating_add(1);
            continue;
        }
        if schema.is_header(&fields) {
            continue;
        }

        let record = schema
            .columns
            .iter()
            .cloned()
            .zip(fields.iter().map(|f| f.trim().to_owned()))
            .collect();
        table.rows.push(record);
    }

    if table.skipped > 0 {
        debug!(
            parsed = table.rows.len(),
            skipped = table.skipped,
            "table parsed with skipped rows"
        );
    }
    table
}
