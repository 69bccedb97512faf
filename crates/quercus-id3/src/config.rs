//! Configuration builder for ID3 tree induction.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::dataset::Dataset;
use crate::error::Id3Error;
use crate::model::TrainedTree;

/// Policy for choosing the cutpoint of a continuous attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CutpointSearch {
    /// Evaluate the values of up to `n_candidates` randomly drawn instances.
    Sampled {
        /// Number of instances drawn without replacement (capped by dataset size).
        n_candidates: usize,
    },
    /// Evaluate every distinct value with a single sorted sweep.
    Exhaustive,
}

impl Default for CutpointSearch {
    fn default() -> Self {
        Self::Sampled { n_candidates: 10 }
    }
}

/// Configuration for a single ID3 decision tree.
///
/// Construct via [`Id3Config::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter         | Default                          |
/// |-------------------|----------------------------------|
/// | `max_depth`       | `None` (unlimited)               |
/// | `cutpoint_search` | `Sampled { n_candidates: 10 }`   |
/// | `seed`            | 42                               |
#[derive(Debug, Clone, PartialEq)]
pub struct Id3Config {
    pub(crate) max_depth: Option<usize>,
    pub(crate) cutpoint_search: CutpointSearch,
    pub(crate) seed: u64,
}

impl Id3Config {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_depth: None,
            cutpoint_search: CutpointSearch::default(),
            seed: 42,
        }
    }

    /// Set the maximum tree depth.
    ///
    /// `None` grows until the data runs out of attributes or classes.
    /// `Some(d)` forces a leaf at depth `d` (root is depth 0).
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the cutpoint search policy.
    #[must_use]
    pub fn with_cutpoint_search(mut self, cutpoint_search: CutpointSearch) -> Self {
        self.cutpoint_search = cutpoint_search;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    // --- Getters ---

    /// Return the maximum depth limit, if any.
    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Return the cutpoint search policy.
    #[must_use]
    pub fn cutpoint_search(&self) -> CutpointSearch {
        self.cutpoint_search
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Check the config values on their own.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`Id3Error::InvalidMaxDepth`] | `max_depth` is `Some(0)` |
    /// | [`Id3Error::InvalidCandidateCount`] | sampled search with zero candidates |
    pub fn validate(&self) -> Result<(), Id3Error> {
        if let Some(d) = self.max_depth
            && d == 0
        {
            return Err(Id3Error::InvalidMaxDepth { max_depth: 0 });
        }
        if let CutpointSearch::Sampled { n_candidates } = self.cutpoint_search
            && n_candidates == 0
        {
            return Err(Id3Error::InvalidCandidateCount { n_candidates });
        }
        Ok(())
    }

    /// Induce a tree on `data` with a generator seeded from `seed`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`Id3Error::EmptyDataset`] | `data` has zero instances |
    /// | [`Id3Error::InvalidMaxDepth`] | `max_depth` is `Some(0)` |
    /// | [`Id3Error::InvalidCandidateCount`] | sampled search with zero candidates |
    /// | [`Id3Error::StructuralInconsistency`] | the finished tree fails validation |
    pub fn fit(&self, data: &Dataset) -> Result<TrainedTree, Id3Error> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.fit_with_rng(data, &mut rng)
    }

    /// Induce a tree on `data`, drawing randomness from `rng`.
    ///
    /// # Errors
    ///
    /// Same as [`Id3Config::fit`].
    pub fn fit_with_rng(
        &self,
        data: &Dataset,
        rng: &mut ChaCha8Rng,
    ) -> Result<TrainedTree, Id3Error> {
        self.fit_owned_with_rng(data.clone(), rng)
    }

    /// Like [`Id3Config::fit`], consuming `data` instead of copying it.
    ///
    /// # Errors
    ///
    /// Same as [`Id3Config::fit`].
    pub fn fit_owned(&self, data: Dataset) -> Result<TrainedTree, Id3Error> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.fit_owned_with_rng(data, &mut rng)
    }

    /// Like [`Id3Config::fit_with_rng`], consuming `data`.
    ///
    /// # Errors
    ///
    /// Same as [`Id3Config::fit`].
    pub fn fit_owned_with_rng(
        &self,
        data: Dataset,
        rng: &mut ChaCha8Rng,
    ) -> Result<TrainedTree, Id3Error> {
        crate::tree::induce(self, data, rng)
    }
}

impl Default for Id3Config {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Id3Config::new();
        assert_eq!(config.max_depth(), None);
        assert_eq!(
            config.cutpoint_search(),
            CutpointSearch::Sampled { n_candidates: 10 }
        );
        assert_eq!(config.seed(), 42);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_depth_rejected() {
        let err = Id3Config::new()
            .with_max_depth(Some(0))
            .validate()
            .unwrap_err();
        assert!(matches!(err, Id3Error::InvalidMaxDepth { max_depth: 0 }));
    }

    #[test]
    fn zero_candidates_rejected() {
        let err = Id3Config::new()
            .with_cutpoint_search(CutpointSearch::Sampled { n_candidates: 0 })
            .validate()
            .unwrap_err();
        assert!(matches!(err, Id3Error::InvalidCandidateCount { n_candidates: 0 }));
    }

    #[test]
    fn builder_chain() {
        let config = Id3Config::new()
            .with_max_depth(Some(3))
            .with_cutpoint_search(CutpointSearch::Exhaustive)
            .with_seed(7);
        assert_eq!(config.max_depth(), Some(3));
        assert_eq!(config.cutpoint_search(), CutpointSearch::Exhaustive);
        assert_eq!(config.seed(), 7);
    }

    #[test]
    fn owned_and_borrowed_fits_agree() {
        use std::sync::Arc;

        use crate::node::ClassLabel;
        use crate::schema::{AttributeKind, Instance, Schema};

        let schema = Arc::new(
            Schema::new(
                vec!["x".to_string()],
                vec![AttributeKind::Continuous],
                vec!["a".to_string(), "b".to_string()],
            )
            .unwrap(),
        );
        let instances = (0..20)
            .map(|i| Instance::new(vec![f64::from(i)], ClassLabel::new(usize::from(i >= 10))))
            .collect();
        let data = Dataset::new(schema, instances).unwrap();

        let config = Id3Config::new().with_seed(11);
        let borrowed = config.fit(&data).unwrap();
        let owned = config.fit_owned(data).unwrap();
        assert_eq!(borrowed, owned);
    }
}
