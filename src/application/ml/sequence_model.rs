//! Stacked LSTM regressor over fixed-width feature windows.
//!
//! Recurrent weights are drawn once at construction from a seeded RNG and
//! stay fixed. Only the linear projection from the final hidden state is
//! trainable, through a closed-form ridge fit.

use crate::application::analysis::correlation::mean_and_sum_sq;
use crate::application::analysis::regression::cholesky_solve;
use crate::domain::config::AnalysisConfig;
use crate::domain::errors::ModelError;
use ndarray::{Array1, Array2, Axis, s};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct SequenceModelConfig {
    pub input_width: usize,
    pub hidden_width: usize,
    pub layers: usize,
    /// `None` draws a random seed at construction
    pub seed: Option<u64>,
}

impl SequenceModelConfig {
    pub fn from_analysis_config(config: &AnalysisConfig, input_width: usize) -> Self {
        Self {
            input_width,
            hidden_width: config.sequence_hidden_width,
            layers: config.sequence_layers,
            seed: config.model_seed,
        }
    }
}

/// One LSTM layer. Gate blocks are stacked row-wise in the order
/// input, forget, candidate, output.
#[derive(Debug, Clone)]
struct LstmCell {
    hidden_width: usize,
    w_x: Array2<f64>,
    w_h: Array2<f64>,
    bias: Array1<f64>,
}

impl LstmCell {
    fn new(input_width: usize, hidden_width: usize, rng: &mut StdRng) -> Self {
        let limit = (1.0 / hidden_width as f64).sqrt();
        let gates = 4 * hidden_width;

        let w_x = Array2::from_shape_fn((gates, input_width), |_| rng.random_range(-limit..limit));
        let w_h = Array2::from_shape_fn((gates, hidden_width), |_| rng.random_range(-limit..limit));
        let mut bias = Array1::zeros(gates);
        bias.slice_mut(s![hidden_width..2 * hidden_width]).fill(1.0);

        Self {
            hidden_width,
            w_x,
            w_h,
            bias,
        }
    }

    fn step(&self, x: &Array1<f64>, h: &Array1<f64>, c: &Array1<f64>) -> (Array1<f64>, Array1<f64>) {
        let hw = self.hidden_width;
        let z = self.w_x.dot(x) + self.w_h.dot(h) + &self.bias;

        let i = z.slice(s![0..hw]).mapv(sigmoid);
        let f = z.slice(s![hw..2 * hw]).mapv(sigmoid);
        let g = z.slice(s![2 * hw..3 * hw]).mapv(f64::tanh);
        let o = z.slice(s![3 * hw..4 * hw]).mapv(sigmoid);

        let c_next = &f * c + &i * &g;
        let h_next = &o * &c_next.mapv(f64::tanh);
        (h_next, c_next)
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

pub struct SequenceModel {
    config: SequenceModelConfig,
    cells: Vec<LstmCell>,
    projection: Array1<f64>,
    projection_bias: f64,
    readout_fitted: bool,
}

impl SequenceModel {
    pub fn new(config: SequenceModelConfig) -> Result<Self, ModelError> {
        for (field, value) in [
            ("input_width", config.input_width),
            ("hidden_width", config.hidden_width),
            ("layers", config.layers),
        ] {
            if value == 0 {
                return Err(ModelError::ShapeMismatch {
                    expected: format!("{} > 0", field),
                    actual: "0".to_string(),
                });
            }
        }

        let seed = config.seed.unwrap_or_else(|| {
            let seed = rand::random::<u64>();
            info!("SequenceModel: no seed configured, drew seed {}", seed);
            seed
        });
        let mut rng = StdRng::seed_from_u64(seed);

        let mut cells = Vec::with_capacity(config.layers);
        cells.push(LstmCell::new(config.input_width, config.hidden_width, &mut rng));
        for _ in 1..config.layers {
            cells.push(LstmCell::new(config.hidden_width, config.hidden_width, &mut rng));
        }

        let limit = (1.0 / config.hidden_width as f64).sqrt();
        let projection =
            Array1::from_shape_fn(config.hidden_width, |_| rng.random_range(-limit..limit));

        debug!(
            "SequenceModel: {} layer(s), input {} -> hidden {} (seed {})",
            config.layers, config.input_width, config.hidden_width, seed
        );

        Ok(Self {
            config,
            cells,
            projection,
            projection_bias: 0.0,
            readout_fitted: false,
        })
    }

    pub fn input_width(&self) -> usize {
        self.config.input_width
    }

    pub fn hidden_width(&self) -> usize {
        self.config.hidden_width
    }

    pub fn layers(&self) -> usize {
        self.config.layers
    }

    pub fn is_readout_fitted(&self) -> bool {
        self.readout_fitted
    }

    /// Scalar output for a `(window_len, input_width)` window ordered oldest to newest
    pub fn forward(&self, window: &Array2<f64>) -> Result<f64, ModelError> {
        let h = self.final_hidden(window)?;
        Ok(self.projection.dot(&h) + self.projection_bias)
    }

    /// Final hidden state of the last layer, starting from a zero state
    pub fn final_hidden(&self, window: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        let (len, width) = window.dim();
        if len == 0 || width != self.config.input_width {
            return Err(ModelError::ShapeMismatch {
                expected: format!("(>0, {})", self.config.input_width),
                actual: format!("({}, {})", len, width),
            });
        }

        let hw = self.config.hidden_width;
        let mut hs = vec![Array1::<f64>::zeros(hw); self.cells.len()];
        let mut cs = vec![Array1::<f64>::zeros(hw); self.cells.len()];

        for t in 0..len {
            let mut input = window.row(t).to_owned();
            for (layer, cell) in self.cells.iter().enumerate() {
                let (h, c) = cell.step(&input, &hs[layer], &cs[layer]);
                input = h.clone();
                hs[layer] = h;
                cs[layer] = c;
            }
        }

        Ok(hs.pop().unwrap_or_else(|| Array1::zeros(hw)))
    }

    /// Ridge fit of the projection on final hidden states. Recurrent weights
    /// are left untouched.
    pub fn fit_readout(
        &mut self,
        windows: &[Array2<f64>],
        targets: &[f64],
        ridge: f64,
    ) -> Result<(), ModelError> {
        if windows.len() != targets.len() {
            return Err(ModelError::ShapeMismatch {
                expected: format!("{} targets", windows.len()),
                actual: format!("{} targets", targets.len()),
            });
        }
        if windows.len() < 2 {
            return Err(ModelError::InsufficientData {
                available: windows.len(),
                required: 2,
            });
        }

        let hw = self.config.hidden_width;
        let n = windows.len();
        let mut states = Array2::<f64>::zeros((n, hw));
        for (i, window) in windows.iter().enumerate() {
            states.row_mut(i).assign(&self.final_hidden(window)?);
        }

        // Center so the bias stays out of the penalty
        let state_means = states.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(hw));
        let (target_mean, _) = mean_and_sum_sq(targets);
        let centered = &states - &state_means;
        let y = Array1::from_iter(targets.iter().map(|t| t - target_mean));

        let mut gram = centered.t().dot(&centered);
        for d in 0..hw {
            gram[[d, d]] += ridge.max(1e-8);
        }
        let rhs = centered.t().dot(&y);

        let weights = cholesky_solve(&gram, &rhs).map_err(|e| ModelError::Training {
            reason: format!("Readout solve failed: {}", e),
        })?;

        self.projection_bias = target_mean - weights.dot(&state_means);
        self.projection = weights;
        self.readout_fitted = true;

        info!(
            "SequenceModel: readout fitted on {} windows (ridge {})",
            n, ridge
        );
        Ok(())
    }
}
