// Fused dataset produced by the aligner
pub mod aligned;

// Typed outputs of the analysis stages
pub mod analysis;

// Validated configuration value objects
pub mod config;

// Domain-specific error types
pub mod errors;

// Feature layout shared by the prediction models
pub mod ml;

// Port interfaces
pub mod ports;

// Headline sentiment
pub mod sentiment;

// Raw source records and dated series
pub mod series;
