use crate::domain::aligned::AlignedDataset;
use crate::domain::ml::feature_registry::{self, FEATURE_NAMES};
use crate::domain::series::fields;
use chrono::NaiveDate;
use ndarray::Array2;
use tracing::debug;

/// What each training row is labeled with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Close of the next usable row
    NextClose,
    /// Same-row value of a dataset field
    Field(String),
}

/// Training rows assembled from an aligned dataset in `FEATURE_NAMES` order.
///
/// Rows with any missing feature are skipped. `latest` is the most recent
/// usable row, the starting point for inference.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub dates: Vec<NaiveDate>,
    pub features: Vec<Vec<f64>>,
    pub targets: Vec<f64>,
    pub latest: Option<(NaiveDate, Vec<f64>)>,
}

impl FeatureMatrix {
    pub fn from_dataset(dataset: &AlignedDataset, target: &Target) -> Self {
        let usable: Vec<(NaiveDate, Vec<f64>, Option<f64>)> = dataset
            .rows()
            .iter()
            .filter_map(|row| {
                let features = feature_registry::row_to_features(row)?;
                let label = match target {
                    Target::NextClose => row.get(fields::CLOSE),
                    Target::Field(name) => row.get(name),
                };
                Some((row.date(), features, label))
            })
            .collect();

        let latest = usable.last().map(|(d, f, _)| (*d, f.clone()));

        let mut matrix = Self {
            dates: Vec::new(),
            features: Vec::new(),
            targets: Vec::new(),
            latest,
        };

        match target {
            Target::NextClose => {
                for pair in usable.windows(2) {
                    let (date, features, _) = &pair[0];
                    if let Some(next_close) = pair[1].2 {
                        matrix.dates.push(*date);
                        matrix.features.push(features.clone());
                        matrix.targets.push(next_close);
                    }
                }
            }
            Target::Field(_) => {
                for (date, features, label) in usable {
                    if let Some(y) = label {
                        matrix.dates.push(date);
                        matrix.features.push(features);
                        matrix.targets.push(y);
                    }
                }
            }
        }

        debug!(
            "FeatureMatrix: {} training rows from {} dataset rows ({} features)",
            matrix.len(),
            dataset.len(),
            FEATURE_NAMES.len()
        );
        matrix
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Sliding `(window, width)` arrays over consecutive rows, oldest first. The
/// i-th window ends at row `i + window - 1`.
pub fn sequence_windows(rows: &[Vec<f64>], window: usize) -> Vec<Array2<f64>> {
    if window == 0 || rows.len() < window {
        return Vec::new();
    }
    let width = rows[0].len();
    rows.windows(window)
        .filter_map(|chunk| {
            let flat: Vec<f64> = chunk.iter().flatten().copied().collect();
            Array2::from_shape_vec((window, width), flat).ok()
        })
        .collect()
}
