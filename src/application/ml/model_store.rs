use crate::application::ml::sequence_model::{SequenceModel, SequenceModelConfig};
use crate::application::ml::tree_ensemble::{TreeEnsemble, TreeEnsembleConfig};
use crate::domain::errors::ModelError;
use ndarray::Array2;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::error;

/// Shared handle to the trained model state.
///
/// Each model sits behind its own lock. Training and the inference that
/// follows it run under one write guard, so readers see either the previous
/// model or the fully retrained one.
pub struct ModelStore {
    ensemble: RwLock<TreeEnsemble>,
    sequence: RwLock<SequenceModel>,
}

impl ModelStore {
    pub fn new(
        ensemble_config: TreeEnsembleConfig,
        sequence_config: SequenceModelConfig,
    ) -> Result<Self, ModelError> {
        Ok(Self {
            ensemble: RwLock::new(TreeEnsemble::new(ensemble_config)),
            sequence: RwLock::new(SequenceModel::new(sequence_config)?),
        })
    }

    pub fn train_and_predict(
        &self,
        features: &[Vec<f64>],
        targets: &[f64],
        inference: &[Vec<f64>],
    ) -> Result<Vec<f64>, ModelError> {
        self.train_and_then(features, targets, |model| model.predict(inference))
    }

    /// Retrain the ensemble and run `infer` against it before releasing the lock
    pub fn train_and_then<R>(
        &self,
        features: &[Vec<f64>],
        targets: &[f64],
        infer: impl FnOnce(&TreeEnsemble) -> Result<R, ModelError>,
    ) -> Result<R, ModelError> {
        let mut model = write_guard(&self.ensemble, "ensemble");
        model.train(features, targets)?;
        infer(&model)
    }

    pub fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        read_guard(&self.ensemble, "ensemble").predict(features)
    }

    pub fn is_trained(&self) -> bool {
        read_guard(&self.ensemble, "ensemble").is_trained()
    }

    /// Fit the sequence readout, then evaluate `window` under the same guard
    pub fn fit_sequence_and_forward(
        &self,
        windows: &[Array2<f64>],
        targets: &[f64],
        ridge: f64,
        window: &Array2<f64>,
    ) -> Result<f64, ModelError> {
        let mut model = write_guard(&self.sequence, "sequence");
        model.fit_readout(windows, targets, ridge)?;
        model.forward(window)
    }
}

fn write_guard<'a, T>(lock: &'a RwLock<T>, name: &str) -> RwLockWriteGuard<'a, T> {
    lock.write().unwrap_or_else(|poisoned| {
        error!(
            "ModelStore: {} lock poisoned by a panicked writer, recovering",
            name
        );
        poisoned.into_inner()
    })
}

fn read_guard<'a, T>(lock: &'a RwLock<T>, name: &str) -> RwLockReadGuard<'a, T> {
    lock.read().unwrap_or_else(|poisoned| {
        error!(
            "ModelStore: {} lock poisoned by a panicked writer, recovering",
            name
        );
        poisoned.into_inner()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn store() -> ModelStore {
        ModelStore::new(
            TreeEnsembleConfig {
                n_trees: 10,
                max_depth: 6,
                min_split: 2,
                seed: Some(5),
            },
            SequenceModelConfig {
                input_width: 2,
                hidden_width: 8,
                layers: 1,
                seed: Some(5),
            },
        )
        .unwrap()
    }

    fn data(offset: f64) -> (Vec<Vec<f64>>, Vec<f64>) {
        let xs: Vec<Vec<f64>> = (0..30).map(|i| vec![i as f64, (i % 3) as f64]).collect();
        let ys = xs.iter().map(|x| x[0] * 2.0 + offset).collect();
        (xs, ys)
    }

    #[test]
    fn test_predict_before_training() {
        let err = store().predict(&[vec![1.0, 1.0]]).unwrap_err();
        assert!(matches!(err, ModelError::NotTrained { .. }));
    }

    #[test]
    fn test_train_and_predict() {
        let s = store();
        let (xs, ys) = data(0.0);
        let preds = s.train_and_predict(&xs, &ys, &[vec![10.0, 1.0]]).unwrap();
        assert_eq!(preds.len(), 1);
        assert!(s.is_trained());
        assert_eq!(s.predict(&[vec![10.0, 1.0]]).unwrap(), preds);
    }

    #[test]
    fn test_failed_training_keeps_previous_model() {
        let s = store();
        let (xs, ys) = data(0.0);
        s.train_and_predict(&xs, &ys, &[]).unwrap();
        let before = s.predict(&[vec![5.0, 2.0]]).unwrap();

        assert!(s.train_and_predict(&xs[..1], &ys[..1], &[]).is_err());
        assert_eq!(s.predict(&[vec![5.0, 2.0]]).unwrap(), before);
    }

    #[test]
    fn test_concurrent_trainers_and_readers() {
        let s = Arc::new(store());
        let (xs, ys) = data(0.0);
        s.train_and_predict(&xs, &ys, &[]).unwrap();

        let mut handles = Vec::new();
        for k in 0..4 {
            let s = Arc::clone(&s);
            handles.push(thread::spawn(move || {
                let (xs, ys) = data(k as f64 * 100.0);
                for _ in 0..3 {
                    s.train_and_predict(&xs, &ys, &[vec![1.0, 1.0]]).unwrap();
                    let p = s.predict(&[vec![1.0, 1.0]]).unwrap();
                    assert!(p[0].is_finite());
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn test_sequence_readout_under_write_guard() {
        let s = store();
        let windows: Vec<Array2<f64>> = (0..10)
            .map(|i| Array2::from_elem((3, 2), i as f64 / 10.0))
            .collect();
        let targets: Vec<f64> = (0..10).map(|i| i as f64).collect();

        let out = s
            .fit_sequence_and_forward(&windows, &targets, 0.1, &windows[9])
            .unwrap();
        assert!(out.is_finite());
        // Refitting on the same data reproduces the readout
        let again = s
            .fit_sequence_and_forward(&windows, &targets, 0.1, &windows[9])
            .unwrap();
        assert_eq!(out, again);
    }
}
