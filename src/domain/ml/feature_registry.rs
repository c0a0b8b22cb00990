use crate::domain::aligned::AlignedRow;
use crate::domain::series::fields;

/// Ordered list of feature names consumed by the prediction models.
/// Both models and the scaler index features by this order; any change
/// here invalidates trained model state.
pub const FEATURE_NAMES: &[&str] = &[
    "price",
    "volume",
    "temperature",
    "precipitation",
    "sentiment_score",
];

/// Aligned-dataset field backing each feature, same order as `FEATURE_NAMES`
pub const FEATURE_FIELDS: &[&str] = &[
    fields::CLOSE,
    fields::VOLUME,
    fields::TEMPERATURE,
    fields::PRECIPITATION,
    fields::SENTIMENT_SCORE,
];

pub const PRICE_INDEX: usize = 0;

pub fn feature_count() -> usize {
    FEATURE_NAMES.len()
}

/// Extract the feature vector of a row. Returns `None` if any feature is
/// missing; rows are never imputed.
pub fn row_to_features(row: &AlignedRow) -> Option<Vec<f64>> {
    FEATURE_FIELDS.iter().map(|field| row.get(field)).collect()
}
