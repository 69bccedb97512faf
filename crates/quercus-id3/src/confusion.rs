//! Confusion matrix and the per-class rates derived from it.

use std::fmt;

use crate::classify::Prediction;
use crate::error::Id3Error;
use crate::node::ClassLabel;

/// Square count table: `cells[truth][predicted]`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ConfusionMatrix {
    matrix: Vec<Vec<usize>>,
    n_classes: usize,
}

/// One class viewed as the positive class against all others.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClassMetrics {
    /// The class index.
    pub class: usize,
    /// Instances of the class predicted as the class.
    pub true_positives: usize,
    /// Instances of other classes predicted as the class.
    pub false_positives: usize,
    /// Instances of the class predicted as something else.
    pub false_negatives: usize,
    /// Instances of other classes predicted as something else.
    pub true_negatives: usize,
    /// TP / (TP + FP), or 0.0 when the class was never predicted.
    pub precision: f64,
    /// TP / (TP + FN), or 0.0 when the class never occurs.
    pub recall: f64,
    /// FP / (FP + TN), or 0.0 when every instance belongs to the class.
    pub fall_out: f64,
    /// Harmonic mean of precision and recall, or 0.0 when both are zero.
    pub f1: f64,
    /// Instances whose true class is this class.
    pub support: usize,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

impl ConfusionMatrix {
    /// An all-zero matrix over `n_classes`.
    #[must_use]
    pub fn zeros(n_classes: usize) -> Self {
        Self {
            matrix: vec![vec![0; n_classes]; n_classes],
            n_classes,
        }
    }

    /// Count `(truth, predicted)` label pairs.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`Id3Error::EmptyDataset`] | no labels |
    /// | [`Id3Error::InvalidArgument`] | the slices differ in length |
    /// | [`Id3Error::ClassOutOfRange`] | a label is not below `n_classes` |
    pub fn from_labels(
        truth: &[ClassLabel],
        predicted: &[ClassLabel],
        n_classes: usize,
    ) -> Result<Self, Id3Error> {
        if truth.len() != predicted.len() {
            return Err(Id3Error::InvalidArgument {
                reason: format!(
                    "{} true labels but {} predictions",
                    truth.len(),
                    predicted.len()
                ),
            });
        }
        if truth.is_empty() {
            return Err(Id3Error::EmptyDataset);
        }
        truth
            .iter()
            .zip(predicted)
            .try_fold(Self::zeros(n_classes), |mut cm, (&t, &p)| {
                cm.record(t, p)?;
                Ok(cm)
            })
    }

    /// Count the pairs produced by a classifier.
    ///
    /// # Errors
    ///
    /// Same as [`ConfusionMatrix::from_labels`].
    pub fn from_predictions(
        predictions: &[Prediction],
        n_classes: usize,
    ) -> Result<Self, Id3Error> {
        let (truth, predicted): (Vec<ClassLabel>, Vec<ClassLabel>) =
            predictions.iter().map(|p| (p.truth, p.predicted)).unzip();
        Self::from_labels(&truth, &predicted, n_classes)
    }

    fn record(&mut self, truth: ClassLabel, predicted: ClassLabel) -> Result<(), Id3Error> {
        if let Some(bad) = [truth, predicted]
            .into_iter()
            .find(|l| l.index() >= self.n_classes)
        {
            return Err(Id3Error::ClassOutOfRange {
                class: bad.index(),
                n_classes: self.n_classes,
            });
        }
        self.matrix[truth.index()][predicted.index()] += 1;
        Ok(())
    }

    /// Add another matrix of the same size into this one.
    ///
    /// # Errors
    ///
    /// Returns [`Id3Error::InvalidArgument`] when the class counts differ.
    pub fn merge(&mut self, other: &ConfusionMatrix) -> Result<(), Id3Error> {
        if other.n_classes != self.n_classes {
            return Err(Id3Error::InvalidArgument {
                reason: format!(
                    "cannot merge {}-class matrix into {}-class matrix",
                    other.n_classes, self.n_classes
                ),
            });
        }
        self.matrix
            .iter_mut()
            .flatten()
            .zip(other.matrix.iter().flatten())
            .for_each(|(cell, add)| *cell += add);
        Ok(())
    }

    /// Number of instances counted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }

    fn diagonal(&self) -> impl Iterator<Item = usize> + '_ {
        self.matrix.iter().enumerate().map(|(i, row)| row[i])
    }

    /// Fraction of instances on the diagonal; 0.0 for an empty matrix.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        ratio(self.diagonal().sum(), self.total())
    }

    /// TP, FP, FN and TN per class with the rates derived from them.
    #[must_use]
    pub fn class_metrics(&self) -> Vec<ClassMetrics> {
        let total = self.total();
        let row_sums: Vec<usize> = self.matrix.iter().map(|row| row.iter().sum()).collect();
        let col_sums: Vec<usize> = (0..self.n_classes)
            .map(|c| self.matrix.iter().map(|row| row[c]).sum())
            .collect();

        self.diagonal()
            .enumerate()
            .map(|(c, tp)| {
                let support = row_sums[c];
                let false_negatives = support - tp;
                let false_positives = col_sums[c] - tp;
                let true_negatives = total - support - false_positives;
                let precision = ratio(tp, col_sums[c]);
                let recall = ratio(tp, support);
                let f1 = match precision + recall {
                    s if s > 0.0 => 2.0 * precision * recall / s,
                    _ => 0.0,
                };
                ClassMetrics {
                    class: c,
                    true_positives: tp,
                    false_positives,
                    false_negatives,
                    true_negatives,
                    precision,
                    recall,
                    fall_out: ratio(false_positives, false_positives + true_negatives),
                    f1,
                    support,
                }
            })
            .collect()
    }

    /// Rows indexed by true class.
    #[must_use]
    pub fn as_rows(&self) -> &[Vec<usize>] {
        &self.matrix
    }

    /// Number of classes on each axis.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }
}

/// Fixed-width table, true classes down, predictions across.
impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>8}", "true\\pred")?;
        for c in 0..self.n_classes {
            write!(f, " {c:>8}")?;
        }
        writeln!(f)?;
        for (c, row) in self.matrix.iter().enumerate() {
            write!(f, "{c:>9}")?;
            for count in row {
                write!(f, " {count:>8}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
