use crate::application::ml::scaler::StandardScaler;
use crate::domain::config::AnalysisConfig;
use crate::domain::errors::ModelError;
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use tracing::info;

const MODEL_NAME: &str = "tree_ensemble";

#[derive(Debug, Clone, PartialEq)]
pub struct TreeEnsembleConfig {
    pub n_trees: usize,
    pub max_depth: u16,
    pub min_split: usize,
    /// `None` draws a random seed per training run
    pub seed: Option<u64>,
}

impl Default for TreeEnsembleConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 10,
            min_split: 2,
            seed: None,
        }
    }
}

impl TreeEnsembleConfig {
    pub fn from_analysis_config(config: &AnalysisConfig) -> Self {
        Self {
            n_trees: config.n_trees,
            max_depth: config.max_depth,
            min_split: config.min_split,
            seed: config.model_seed,
        }
    }
}

struct TrainedForest {
    scaler: StandardScaler,
    forest: RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>,
}

/// Bagged regression trees over standardized features.
///
/// Each tree is grown on a bootstrap sample; a prediction is the mean of the
/// tree outputs. Scaler and forest are replaced together on every `train`.
pub struct TreeEnsemble {
    config: TreeEnsembleConfig,
    trained: Option<TrainedForest>,
}

impl TreeEnsemble {
    pub fn new(config: TreeEnsembleConfig) -> Self {
        Self {
            config,
            trained: None,
        }
    }

    pub fn config(&self) -> &TreeEnsembleConfig {
        &self.config
    }

    pub fn is_trained(&self) -> bool {
        self.trained.is_some()
    }

    pub fn train(&mut self, features: &[Vec<f64>], targets: &[f64]) -> Result<(), ModelError> {
        if features.len() != targets.len() {
            return Err(ModelError::ShapeMismatch {
                expected: format!("{} targets", features.len()),
                actual: format!("{} targets", targets.len()),
            });
        }
        if features.len() < 2 {
            return Err(ModelError::InsufficientData {
                available: features.len(),
                required: 2,
            });
        }

        let scaler = StandardScaler::fit(features)?;
        let scaled = scaler.transform(features)?;

        let seed = self.config.seed.unwrap_or_else(|| {
            let seed = rand::random::<u64>();
            info!("TreeEnsemble: no seed configured, drew seed {}", seed);
            seed
        });

        let x = DenseMatrix::from_2d_vec(&scaled).map_err(|e| ModelError::Training {
            reason: format!("Matrix error: {}", e),
        })?;
        let params = RandomForestRegressorParameters::default()
            .with_n_trees(self.config.n_trees)
            .with_max_depth(self.config.max_depth)
            .with_min_samples_split(self.config.min_split)
            .with_seed(seed);
        let forest = RandomForestRegressor::fit(&x, &targets.to_vec(), params).map_err(|e| {
            ModelError::Training {
                reason: format!("Random forest fit failed: {}", e),
            }
        })?;

        info!(
            "TreeEnsemble: trained {} trees on {} rows x {} features (seed {})",
            self.config.n_trees,
            features.len(),
            scaler.width(),
            seed
        );
        self.trained = Some(TrainedForest { scaler, forest });
        Ok(())
    }

    pub fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        let trained = self.trained.as_ref().ok_or_else(|| ModelError::NotTrained {
            model: MODEL_NAME.to_string(),
        })?;
        if features.is_empty() {
            return Ok(Vec::new());
        }

        let scaled = trained.scaler.transform(features)?;
        let x = DenseMatrix::from_2d_vec(&scaled).map_err(|e| ModelError::Training {
            reason: format!("Matrix error: {}", e),
        })?;
        trained.forest.predict(&x).map_err(|e| ModelError::Training {
            reason: format!("Prediction failed: {}", e),
        })
    }

    pub fn predict_one(&self, features: &[f64]) -> Result<f64, ModelError> {
        let predictions = self.predict(&[features.to_vec()])?;
        predictions.first().copied().ok_or_else(|| ModelError::Training {
            reason: "No prediction returned".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(seed: u64) -> TreeEnsembleConfig {
        TreeEnsembleConfig {
            n_trees: 30,
            max_depth: 8,
            min_split: 2,
            seed: Some(seed),
        }
    }

    /// y = 3a + b over a grid
    fn linear_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        let mut xs = Vec::new();
        let mut ys = Vec::new();
        for i in 0..20 {
            for j in 0..5 {
                let a = i as f64;
                let b = j as f64;
                xs.push(vec![a, b]);
                ys.push(3.0 * a + b);
            }
        }
        (xs, ys)
    }

    #[test]
    fn test_predict_before_train() {
        let model = TreeEnsemble::new(config(1));
        let err = model.predict(&[vec![1.0, 2.0]]).unwrap_err();
        assert!(matches!(err, ModelError::NotTrained { .. }));
    }

    #[test]
    fn test_tracks_linear_relation_on_held_out_rows() {
        let (xs, ys) = linear_data();
        let (train_x, train_y): (Vec<_>, Vec<_>) = xs
            .iter()
            .cloned()
            .zip(ys.iter().copied())
            .enumerate()
            .filter(|(i, _)| i % 7 != 0)
            .map(|(_, pair)| pair)
            .unzip();

        let mut model = TreeEnsemble::new(config(42));
        model.train(&train_x, &train_y).unwrap();

        let held_out: Vec<usize> = (0..xs.len()).filter(|i| i % 7 == 0 && *i > 0).collect();
        for i in held_out {
            let pred = model.predict_one(&xs[i]).unwrap();
            // Target range is [0, 61]
            assert!((pred - ys[i]).abs() < 8.0, "row {}: {} vs {}", i, pred, ys[i]);
        }
    }

    #[test]
    fn test_same_seed_same_predictions() {
        let (xs, ys) = linear_data();

        let mut a = TreeEnsemble::new(config(7));
        let mut b = TreeEnsemble::new(config(7));
        a.train(&xs, &ys).unwrap();
        b.train(&xs, &ys).unwrap();

        let probe = vec![vec![4.5, 1.5], vec![17.2, 3.9]];
        assert_eq!(a.predict(&probe).unwrap(), b.predict(&probe).unwrap());
    }

    #[test]
    fn test_single_row_is_insufficient() {
        let mut model = TreeEnsemble::new(config(1));
        let err = model.train(&[vec![1.0]], &[2.0]).unwrap_err();
        assert_eq!(
            err,
            ModelError::InsufficientData {
                available: 1,
                required: 2
            }
        );
        assert!(!model.is_trained());
    }

    #[test]
    fn test_feature_width_checked_at_inference() {
        let (xs, ys) = linear_data();
        let mut model = TreeEnsemble::new(config(3));
        model.train(&xs, &ys).unwrap();

        let err = model.predict(&[vec![1.0, 2.0, 3.0]]).unwrap_err();
        assert!(matches!(err, ModelError::ShapeMismatch { .. }));
    }
}
