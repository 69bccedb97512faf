//! k-fold cross-validation for either classifier topology.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::{info, instrument};

use crate::config::Id3Config;
use crate::confusion::ConfusionMatrix;
use crate::dataset::Dataset;
use crate::error::Id3Error;
use crate::model::{Classifier, Topology};
use crate::schema::Instance;

/// k-fold cross-validation settings: fold count and master seed.
#[derive(Debug, Clone)]
pub struct CrossValidation {
    n_folds: usize,
    seed: u64,
}

/// Results of k-fold cross-validation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CrossValidationResult {
    /// Held-out accuracy, one entry per fold in fold order.
    pub fold_accuracies: Vec<f64>,
    /// Fold matrices added together; covers every instance once.
    pub confusion_matrix: ConfusionMatrix,
    /// Unweighted mean of `fold_accuracies`.
    pub mean_accuracy: f64,
    /// Population standard deviation of `fold_accuracies`.
    pub std_accuracy: f64,
    /// Held-out instances classified through a fallback draw.
    pub n_fallbacks: usize,
    /// Number of folds.
    pub n_folds: usize,
    /// Total number of instances.
    pub n_instances: usize,
    /// Number of classes.
    pub n_classes: usize,
}

impl CrossValidation {
    /// Create a cross-validation config with `n_folds` folds and seed 42.
    #[must_use]
    pub fn new(n_folds: usize) -> Self {
        Self { n_folds, seed: 42 }
    }

    /// Set the random seed for fold shuffling and per-fold training.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the number of folds.
    #[must_use]
    pub fn n_folds(&self) -> usize {
        self.n_folds
    }

    /// Run k-fold cross-validation.
    ///
    /// Shuffles the instances once, cuts them into `n_folds` contiguous
    /// folds whose sizes differ by at most one, then for each fold trains on
    /// the rest and classifies the held-out fold. Fold `i` trains with seed
    /// `seed + i`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`Id3Error::InvalidFoldCount`] | `n_folds < 2` or `n_folds > data.len()` |
    /// | Other errors | From training or classification |
    #[instrument(skip_all, fields(n_folds = self.n_folds, n_instances = data.len(), topology = %topology))]
    pub fn evaluate(
        &self,
        topology: Topology,
        config: &Id3Config,
        data: &Dataset,
    ) -> Result<CrossValidationResult, Id3Error> {
        let n_instances = data.len();
        if self.n_folds < 2 || self.n_folds > n_instances {
            return Err(Id3Error::InvalidFoldCount {
                n_folds: self.n_folds,
                n_instances,
            });
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut order: Vec<usize> = (0..n_instances).collect();
        order.shuffle(&mut rng);

        let n_classes = data.n_classes();
        let mut confusion_matrix = ConfusionMatrix::zeros(n_classes);
        let mut fold_accuracies = Vec::with_capacity(self.n_folds);
        let mut n_fallbacks = 0usize;

        for fold in 0..self.n_folds {
            let start = fold * n_instances / self.n_folds;
            let end = (fold + 1) * n_instances / self.n_folds;
            let pick = |indices: &mut dyn Iterator<Item = usize>| -> Vec<Instance> {
                indices.map(|i| data.instances()[i].clone()).collect()
            };
            let held_out = data.with_instances(pick(&mut order[start..end].iter().copied()))?;
            let training = data.with_instances(pick(
                &mut order[..start].iter().chain(&order[end..]).copied(),
            ))?;

            let fold_seed = self.seed.wrapping_add(fold as u64);
            let fold_config = config.clone().with_seed(fold_seed);
            let model = Classifier::train(topology, &fold_config, &training)?;

            let mut fold_rng = ChaCha8Rng::seed_from_u64(fold_seed);
            let predictions = model.classify_dataset(&held_out, &mut fold_rng)?;
            let fold_matrix = ConfusionMatrix::from_predictions(&predictions, n_classes)?;
            n_fallbacks += predictions.iter().filter(|p| p.fallback).count();

            let accuracy = fold_matrix.accuracy();
            info!(fold, accuracy, n_held_out = held_out.len(), "fold completed");
            fold_accuracies.push(accuracy);
            confusion_matrix.merge(&fold_matrix)?;
        }

        let mean_accuracy = fold_accuracies.iter().sum::<f64>() / self.n_folds as f64;
        let std_accuracy = {
            let variance = fold_accuracies
                .iter()
                .map(|&a| (a - mean_accuracy).powi(2))
                .sum::<f64>()
                / self.n_folds as f64;
            variance.sqrt()
        };

        info!(mean_accuracy, std_accuracy, "cross-validation complete");

        Ok(CrossValidationResult {
            fold_accuracies,
            confusion_matrix,
            mean_accuracy,
            std_accuracy,
            n_fallbacks,
            n_folds: self.n_folds,
            n_instances,
            n_classes,
        })
    }
}
