//! Online-trained logistic scorer for forwarding opportunities
//!
//! One model per node, one weight per contact feature. Prediction is a
//! logistic squash of the weighted feature sum; training is a single-sample
//! gradient step per observed delivery outcome. The initial weights come
//! from a seeded RNG so runs are reproducible.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::features::{ContactFeatures, FEATURE_COUNT};

/// Configuration for the scoring model
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Gradient step size per outcome observation
    pub learning_rate: f64,
    /// Initial weights are uniform in `[-range, range]`
    pub init_weight_range: f64,
    /// Seed for the weight initialization RNG
    pub seed: u64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
            init_weight_range: 0.5,
            seed: 0,
        }
    }
}

/// Minimal online logistic predictor of delivery success
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringModel {
    weights: [f64; FEATURE_COUNT],
    learning_rate: f64,
}

impl ScoringModel {
    /// Initialize with small random weights drawn from the configured seed
    pub fn new(config: &ScoringConfig) -> Self {
        let mut weights = [0.0; FEATURE_COUNT];
        if config.init_weight_range > 0.0 {
            let mut rng = StdRng::seed_from_u64(config.seed);
            for weight in &mut weights {
                *weight = rng.random_range(-config.init_weight_range..config.init_weight_range);
            }
        }
        Self {
            weights,
            learning_rate: config.learning_rate,
        }
    }

    /// Build a model from an explicit weight vector (for fixed scenarios)
    pub fn from_weights(weights: [f64; FEATURE_COUNT], learning_rate: f64) -> Self {
        Self {
            weights,
            learning_rate,
        }
    }

    /// Current weight vector
    pub fn weights(&self) -> &[f64; FEATURE_COUNT] {
        &self.weights
    }

    /// Predicted delivery probability for a contact, in [0, 1]
    pub fn predict(&self, features: &ContactFeatures) -> f64 {
        let sum: f64 = features
            .as_array()
            .iter()
            .zip(self.weights.iter())
            .map(|(x, w)| x * w)
            .sum();
        sigmoid(sum)
    }

    /// Single-sample gradient step toward the observed outcome
    ///
    /// `observed` is 1.0 for a successful delivery, 0.0 otherwise. The
    /// update is deterministic given weights, features and outcome.
    pub fn update(&mut self, features: &ContactFeatures, observed: f64) {
        let predicted = self.predict(features);
        let error = observed - predicted;
        let gradient_scale = self.learning_rate * error * predicted * (1.0 - predicted);
        for (weight, x) in self.weights.iter_mut().zip(features.as_array().iter()) {
            *weight += gradient_scale * x;
        }
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
