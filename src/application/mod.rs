// Statistical relationships between the fused series
pub mod analysis;

// Concurrent acquisition of the raw series
pub mod fetch;

// Request pipeline behind the public operations
pub mod fusion_service;

// Alignment, indicators and summary statistics
pub mod market_data;

// Prediction models
pub mod ml;
