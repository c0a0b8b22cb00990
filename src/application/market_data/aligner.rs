//! Inner-join alignment of dated series.
//!
//! A date survives only if every input series has a row for it. Field names
//! contributed by more than one series are source-qualified
//! (`"{source}.{field}"`) in every series that carries them.

use crate::domain::aligned::{AlignedDataset, AlignedRow};
use crate::domain::series::TimeSeries;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info};

/// Align `series` on date with inner-join semantics.
///
/// An empty intersection (or no input) yields an empty dataset rather than an
/// error; callers report "zero usable rows" themselves.
pub fn align(series: &[TimeSeries]) -> AlignedDataset {
    if series.is_empty() {
        return AlignedDataset::empty();
    }

    let output_names = qualified_field_names(series);

    let mut fields = Vec::new();
    for names in &output_names {
        for (_, out) in names {
            fields.push(out.clone());
        }
    }

    let mut common: BTreeSet<NaiveDate> = series[0].rows().iter().map(|r| r.date).collect();
    for s in &series[1..] {
        let dates: BTreeSet<NaiveDate> = s.rows().iter().map(|r| r.date).collect();
        common = common.intersection(&dates).copied().collect();
    }

    let mut merged: BTreeMap<NaiveDate, BTreeMap<String, Option<f64>>> = common
        .iter()
        .map(|d| (*d, BTreeMap::new()))
        .collect();

    for (s, names) in series.iter().zip(&output_names) {
        for row in s.rows() {
            let Some(values) = merged.get_mut(&row.date) else {
                continue;
            };
            for (field, out) in names {
                let value = row.values.get(field).copied().flatten();
                values.insert(out.clone(), value);
            }
        }
    }

    let rows: Vec<AlignedRow> = merged
        .into_iter()
        .map(|(date, values)| AlignedRow::new(date, values))
        .collect();

    info!(
        "Aligner: {} series ({}) -> {} aligned rows",
        series.len(),
        series
            .iter()
            .map(|s| format!("{}={}", s.source(), s.len()))
            .collect::<Vec<_>>()
            .join(", "),
        rows.len()
    );

    AlignedDataset::new(fields, rows)
}

/// For every series, the (input field, output field) pairs in field order
fn qualified_field_names(series: &[TimeSeries]) -> Vec<Vec<(String, String)>> {
    let mut occurrences: HashMap<&str, usize> = HashMap::new();
    for s in series {
        let unique: BTreeSet<&str> = s.fields().iter().map(String::as_str).collect();
        for field in unique {
            *occurrences.entry(field).or_default() += 1;
        }
    }

    series
        .iter()
        .map(|s| {
            s.fields()
                .iter()
                .map(|field| {
                    let out = if occurrences.get(field.as_str()).copied().unwrap_or(0) > 1 {
                        debug!(
                            "Aligner: field '{}' collides across series, qualifying as '{}.{}'",
                            field,
                            s.source(),
                            field
                        );
                        format!("{}.{}", s.source(), field)
                    } else {
                        field.clone()
                    };
                    (field.clone(), out)
                })
                .collect()
        })
        .collect()
}
