//! Class distributions and distribution-weighted class draws.

use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};

use crate::entropy::entropy_of_counts;
use crate::error::Id3Error;
use crate::node::ClassLabel;

/// Per-class instance counts with derived proportions.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ClassDistribution {
    counts: Vec<usize>,
}

impl ClassDistribution {
    /// Create a distribution from raw per-class counts.
    #[must_use]
    pub fn from_counts(counts: Vec<usize>) -> Self {
        Self { counts }
    }

    /// An all-zero distribution over `n_classes`.
    #[must_use]
    pub fn empty(n_classes: usize) -> Self {
        Self {
            counts: vec![0; n_classes],
        }
    }

    /// Count labels into a distribution over `n_classes`.
    ///
    /// # Errors
    ///
    /// Returns [`Id3Error::ClassOutOfRange`] if a label is not below `n_classes`.
    pub fn from_labels(
        labels: impl IntoIterator<Item = ClassLabel>,
        n_classes: usize,
    ) -> Result<Self, Id3Error> {
        let mut counts = vec![0usize; n_classes];
        for label in labels {
            let slot = counts
                .get_mut(label.index())
                .ok_or(Id3Error::ClassOutOfRange {
                    class: label.index(),
                    n_classes,
                })?;
            *slot += 1;
        }
        Ok(Self { counts })
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.counts.len()
    }

    /// Return the raw per-class counts.
    #[must_use]
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// Return the count for `class` (0 for unknown classes).
    #[must_use]
    pub fn count(&self, class: ClassLabel) -> usize {
        self.counts.get(class.index()).copied().unwrap_or(0)
    }

    /// Return the total number of instances.
    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Return `true` when every count is zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Per-class proportions. All zeros for an empty distribution.
    #[must_use]
    pub fn proportions(&self) -> Vec<f64> {
        let total = self.total();
        if total == 0 {
            return vec![0.0; self.counts.len()];
        }
        let n = total as f64;
        self.counts.iter().map(|&c| c as f64 / n).collect()
    }

    /// Proportion of `class`.
    #[must_use]
    pub fn proportion(&self, class: ClassLabel) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.count(class) as f64 / total as f64
        }
    }

    /// Entropy in bits.
    #[must_use]
    pub fn entropy(&self) -> f64 {
        entropy_of_counts(&self.counts, self.total())
    }

    /// The single class holding every instance, if there is one.
    ///
    /// `None` for empty distributions and for mixed ones.
    #[must_use]
    pub fn sole_class(&self) -> Option<ClassLabel> {
        let mut nonzero = self
            .counts
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c > 0)
            .map(|(i, _)| ClassLabel::new(i));
        let first = nonzero.next()?;
        nonzero.next().is_none().then_some(first)
    }

    /// Collapse into a `[rest, positive]` binary distribution.
    #[must_use]
    pub fn one_vs_rest(&self, positive: ClassLabel) -> Self {
        let hits = self.count(positive);
        Self {
            counts: vec![self.total() - hits, hits],
        }
    }

    /// Draw a class with probability proportional to its count.
    ///
    /// # Errors
    ///
    /// Returns [`Id3Error::EmptyDistribution`] when every count is zero.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<ClassLabel, Id3Error> {
        let weighted =
            WeightedIndex::new(&self.counts).map_err(|_| Id3Error::EmptyDistribution)?;
        Ok(ClassLabel::new(weighted.sample(rng)))
    }
}
