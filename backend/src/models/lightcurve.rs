//! Unified light curve schema shared by every data source.
//!
//! Each survey reports photometry in its own shape; adapters map those rows
//! into [`LightCurveRecord`] so callers only ever see the six columns listed
//! in [`COLUMNS`].

use serde::{Deserialize, Serialize};

use super::query::QueryWindow;

/// Column names of the unified schema, in output order.
pub const COLUMNS: [&str; 6] = ["obj_id", "mjd", "mag", "mag_err", "filter", "limit"];

/// A single photometric observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightCurveRecord {
    /// Survey-scoped object identifier (several objects may match a cone search)
    pub obj_id: String,
    /// Modified Julian Date of the observation
    pub mjd: f64,
    /// Measured magnitude
    pub mag: f64,
    /// Magnitude uncertainty
    pub mag_err: f64,
    /// Survey band label
    pub filter: String,
    /// Limiting magnitude of the exposure
    pub limit: f64,
}

/// An unordered collection of [`LightCurveRecord`]s.
///
/// Serializes as `{"columns": [...], "rows": [...]}` so an empty table still
/// carries its schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(into = "TableRepr", from = "TableRepr")]
pub struct LightCurveTable {
    records: Vec<LightCurveRecord>,
}

#[derive(Serialize, Deserialize)]
struct TableRepr {
    #[serde(default)]
    columns: Vec<String>,
    rows: Vec<LightCurveRecord>,
}

impl From<LightCurveTable> for TableRepr {
    fn from(table: LightCurveTable) -> Self {
        Self {
            columns: COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: table.records,
        }
    }
}

impl From<TableRepr> for LightCurveTable {
    fn from(repr: TableRepr) -> Self {
        Self { records: repr.rows }
    }
}

impl LightCurveTable {
    /// An empty table with the unified schema.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<LightCurveRecord>) -> Self {
        Self { records }
    }

    /// Column names of this table. Always the six unified columns.
    pub fn columns(&self) -> &'static [&'static str] {
        &COLUMNS
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn push(&mut self, record: LightCurveRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[LightCurveRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LightCurveRecord> {
        self.records.iter()
    }

    /// Append every row of `other`.
    pub fn append(&mut self, other: LightCurveTable) {
        self.records.extend(other.records);
    }

    /// Keep only rows with `mjd_min <= mjd <= mjd_max`.
    pub fn restrict_to(mut self, window: &QueryWindow) -> Self {
        self.records.retain(|r| window.contains_mjd(r.mjd));
        self
    }

    /// Distinct filter labels in first-seen order.
    pub fn filters(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for record in &self.records {
            if !seen.contains(&record.filter.as_str()) {
                seen.push(record.filter.as_str());
            }
        }
        seen
    }

    /// Rows observed through `filter`.
    pub fn by_filter<'a>(&'a self, filter: &'a str) -> impl Iterator<Item = &'a LightCurveRecord> {
        self.records.iter().filter(move |r| r.filter == filter)
    }
}

impl FromIterator<LightCurveRecord> for LightCurveTable {
    fn from_iter<I: IntoIterator<Item = LightCurveRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl Extend<LightCurveRecord> for LightCurveTable {
    fn extend<I: IntoIterator<Item = LightCurveRecord>>(&mut self, iter: I) {
        self.records.extend(iter);
    }
}

impl IntoIterator for LightCurveTable {
    type Item = LightCurveRecord;
    type IntoIter = std::vec::IntoIter<LightCurveRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}
