// Dated series alignment and price-derived features
pub mod aligner;
pub mod indicators;
pub mod statistical_features;
