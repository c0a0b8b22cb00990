// Cross-factor statistics over the aligned dataset
pub mod correlation;
pub mod regression;
pub mod weather_patterns;
