// Feature preparation and prediction models
pub mod features;
pub mod model_store;
pub mod scaler;
pub mod sequence_model;
pub mod tree_ensemble;
