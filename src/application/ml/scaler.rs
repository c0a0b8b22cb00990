use crate::domain::errors::ModelError;
use serde::{Deserialize, Serialize};

/// Per-feature standardization `(x - mean) / std`, fit once over the training
/// rows and reused unchanged at inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl StandardScaler {
    /// Population mean and std per column. A constant column gets std 1 so it
    /// maps to 0 instead of dividing by zero.
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self, ModelError> {
        let width = rows
            .first()
            .map(Vec::len)
            .ok_or(ModelError::InsufficientData {
                available: 0,
                required: 1,
            })?;
        check_width(rows, width)?;

        let n = rows.len() as f64;
        let mut means = vec![0.0; width];
        for row in rows {
            for (m, v) in means.iter_mut().zip(row) {
                *m += v;
            }
        }
        means.iter_mut().for_each(|m| *m /= n);

        let mut stds = vec![0.0; width];
        for row in rows {
            for ((s, v), m) in stds.iter_mut().zip(row).zip(&means) {
                *s += (v - m).powi(2);
            }
        }
        for s in stds.iter_mut() {
            *s = (*s / n).sqrt();
            if *s <= f64::EPSILON {
                *s = 1.0;
            }
        }

        Ok(Self { means, stds })
    }

    pub fn width(&self) -> usize {
        self.means.len()
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn stds(&self) -> &[f64] {
        &self.stds
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, ModelError> {
        check_width(rows, self.width())?;
        Ok(rows.iter().map(|row| self.scale(row)).collect())
    }

    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>, ModelError> {
        if row.len() != self.width() {
            return Err(ModelError::ShapeMismatch {
                expected: format!("{} features", self.width()),
                actual: format!("{} features", row.len()),
            });
        }
        Ok(self.scale(row))
    }

    fn scale(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.means.iter().zip(&self.stds))
            .map(|(v, (m, s))| (v - m) / s)
            .collect()
    }
}

fn check_width(rows: &[Vec<f64>], width: usize) -> Result<(), ModelError> {
    if let Some(bad) = rows.iter().find(|r| r.len() != width) {
        return Err(ModelError::ShapeMismatch {
            expected: format!("{} features", width),
            actual: format!("{} features", bad.len()),
        });
    }
    Ok(())
}
