use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;

/// A fused row: every field contributed by the joined series for one date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedRow {
    date: NaiveDate,
    values: BTreeMap<String, Option<f64>>,
}

impl AlignedRow {
    pub(crate) fn new(date: NaiveDate, values: BTreeMap<String, Option<f64>>) -> Self {
        Self { date, values }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Value of `field`, `None` when the field is unknown or the value is missing
    pub fn get(&self, field: &str) -> Option<f64> {
        self.values.get(field).copied().flatten()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }
}

/// Immutable, date-ordered result of aligning several series.
///
/// Only the aligner constructs it; every analysis stage reads it and returns
/// new values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedDataset {
    fields: Vec<String>,
    rows: Vec<AlignedRow>,
}

impl AlignedDataset {
    pub(crate) fn new(fields: Vec<String>, rows: Vec<AlignedRow>) -> Self {
        Self { fields, rows }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn rows(&self) -> &[AlignedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rows.iter().map(|r| r.date).collect()
    }

    /// Pairs of values for rows where both fields are present
    pub fn paired(&self, a: &str, b: &str) -> (Vec<f64>, Vec<f64>) {
        self.rows
            .iter()
            .filter_map(|r| Some((r.get(a)?, r.get(b)?)))
            .unzip()
    }

    /// Write the dataset as CSV, one column per field, missing values as empty cells
    pub fn to_csv<W: Write>(&self, writer: W) -> anyhow::Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);

        let mut header = vec!["date".to_string()];
        header.extend(self.fields.iter().cloned());
        wtr.write_record(&header)?;

        for row in &self.rows {
            let mut record = vec![row.date.to_string()];
            record.extend(
                self.fields
                    .iter()
                    .map(|f| row.get(f).map(|v| v.to_string()).unwrap_or_default()),
            );
            wtr.write_record(&record)?;
        }

        wtr.flush()?;
        Ok(())
    }
}
