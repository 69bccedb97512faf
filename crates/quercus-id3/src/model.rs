//! Trained classifiers: a single tree or a one-vs-rest forest.

use std::fmt;

use rand::Rng;
use tracing::instrument;

use crate::{
    Id3Error,
    classify::{LeafTag, Prediction},
    config::Id3Config,
    cutpoints::Cutpoints,
    dataset::Dataset,
    distribution::ClassDistribution,
    forest::{Forest, ForestConfig},
    node::ClassLabel,
    tree::DecisionTree,
};

/// Classifier topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Topology {
    /// One multi-class tree.
    Single,
    /// One binary tree per class, combined by voting.
    Forest,
}

impl Topology {
    /// Lower-case name used on the command line and in manifests.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Topology::Single => "single",
            Topology::Forest => "forest",
        }
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tree with the cutpoints learned for it and its fallback distribution.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrainedTree {
    tree: DecisionTree,
    cutpoints: Cutpoints,
    distribution: ClassDistribution,
}

impl TrainedTree {
    /// Bundle a tree with its cutpoint table and fallback distribution.
    ///
    /// # Errors
    ///
    /// Returns [`Id3Error::StructuralInconsistency`] if a node testing a
    /// binarized attribute does not branch on exactly `0` and `1`.
    pub fn new(
        tree: DecisionTree,
        cutpoints: Cutpoints,
        distribution: ClassDistribution,
    ) -> Result<Self, Id3Error> {
        let trained = Self {
            tree,
            cutpoints,
            distribution,
        };
        trained.validate()?;
        Ok(trained)
    }

    /// Re-run the tree invariants and the binarized-branch check.
    ///
    /// # Errors
    ///
    /// Same as [`TrainedTree::new`].
    pub fn validate(&self) -> Result<(), Id3Error> {
        self.tree.validate()?;
        self.tree.check_cutpoints(&self.cutpoints)
    }

    /// Return the tree.
    #[must_use]
    pub fn tree(&self) -> &DecisionTree {
        &self.tree
    }

    /// Return the learned cutpoints.
    #[must_use]
    pub fn cutpoints(&self) -> &Cutpoints {
        &self.cutpoints
    }

    /// Return the training class distribution used for fallback draws.
    #[must_use]
    pub fn distribution(&self) -> &ClassDistribution {
        &self.distribution
    }

    /// Classify a raw row: binarize it with this tree's cutpoints, then walk.
    ///
    /// `already` lists thresholds applied to `values` upstream.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`Id3Error::ConflictingCutpoint`] | `already` disagrees with this tree's cutpoints |
    /// | [`Id3Error::UnknownAttribute`] | `values` is too short for a cutpoint |
    /// | [`Id3Error::PredictionAttributeMismatch`] | `values` is too short for a tested attribute |
    /// | [`Id3Error::EmptyDistribution`] | a fallback is needed but the distribution is empty |
    pub fn classify<R: Rng + ?Sized>(
        &self,
        values: &[f64],
        already: &Cutpoints,
        rng: &mut R,
    ) -> Result<LeafTag, Id3Error> {
        let binary = self.cutpoints.binarize(values, already)?;
        self.tree.classify(&binary, &self.distribution, rng)
    }

    /// Classify every instance of `data`, which may still be raw.
    ///
    /// # Errors
    ///
    /// Same as [`TrainedTree::classify`].
    pub fn classify_dataset<R: Rng + ?Sized>(
        &self,
        data: &Dataset,
        rng: &mut R,
    ) -> Result<Vec<Prediction>, Id3Error> {
        let mut binarized = data.clone();
        binarized.apply_breakpoints(&self.cutpoints)?;
        self.tree.classify_dataset(&binarized, &self.distribution, rng)
    }
}

/// A trained classifier of either topology.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Classifier {
    /// One multi-class tree.
    Single(TrainedTree),
    /// One-vs-rest forest.
    Forest(Forest),
}

impl Classifier {
    /// Train a classifier of `topology` on `data`.
    ///
    /// # Errors
    ///
    /// Any error from [`Id3Config::fit`] or [`ForestConfig::fit`].
    #[instrument(skip(config, data), fields(n_instances = data.len()))]
    pub fn train(
        topology: Topology,
        config: &Id3Config,
        data: &Dataset,
    ) -> Result<Self, Id3Error> {
        match topology {
            Topology::Single => config.fit(data).map(Classifier::Single),
            Topology::Forest => ForestConfig::new()
                .with_tree_config(config.clone())
                .fit(data)
                .map(Classifier::Forest),
        }
    }

    /// Reassemble a classifier from its member trees in class order.
    ///
    /// # Errors
    ///
    /// Returns [`Id3Error::InvalidArgument`] when a single-tree classifier
    /// does not get exactly one member, or a forest gets none.
    pub fn from_members(topology: Topology, members: Vec<TrainedTree>) -> Result<Self, Id3Error> {
        match topology {
            Topology::Single => {
                let n = members.len();
                let mut members = members.into_iter();
                match (members.next(), members.next()) {
                    (Some(tree), None) => Ok(Classifier::Single(tree)),
                    _ => Err(Id3Error::InvalidArgument {
                        reason: format!("single-tree classifier needs 1 tree, got {n}"),
                    }),
                }
            }
            Topology::Forest => Forest::from_members(members).map(Classifier::Forest),
        }
    }

    /// Return the topology.
    #[must_use]
    pub fn topology(&self) -> Topology {
        match self {
            Classifier::Single(_) => Topology::Single,
            Classifier::Forest(_) => Topology::Forest,
        }
    }

    /// Return the member trees (one for a single tree, one per class for a forest).
    #[must_use]
    pub fn members(&self) -> &[TrainedTree] {
        match self {
            Classifier::Single(tree) => std::slice::from_ref(tree),
            Classifier::Forest(forest) => forest.members(),
        }
    }

    /// Classify one raw row. Returns the class and whether a fallback draw
    /// was involved.
    ///
    /// # Errors
    ///
    /// Same as [`TrainedTree::classify`].
    pub fn classify<R: Rng + ?Sized>(
        &self,
        values: &[f64],
        already: &Cutpoints,
        rng: &mut R,
    ) -> Result<(ClassLabel, bool), Id3Error> {
        match self {
            Classifier::Single(tree) => {
                let tag = tree.classify(values, already, rng)?;
                Ok((tag.class, tag.fallback))
            }
            Classifier::Forest(forest) => forest.classify(values, already, rng),
        }
    }

    /// Classify every instance of `data` into `(truth, predicted)` pairs.
    ///
    /// # Errors
    ///
    /// Same as [`TrainedTree::classify`].
    #[instrument(skip_all, fields(topology = %self.topology(), n_instances = data.len()))]
    pub fn classify_dataset<R: Rng + ?Sized>(
        &self,
        data: &Dataset,
        rng: &mut R,
    ) -> Result<Vec<Prediction>, Id3Error> {
        match self {
            Classifier::Single(tree) => tree.classify_dataset(data, rng),
            Classifier::Forest(forest) => forest.classify_dataset(data, rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::node::AttributeIndex;
    use crate::schema::{AttributeKind, Instance, Schema};

    fn three_blobs() -> Dataset {
        let schema = Arc::new(
            Schema::new(
                vec!["x".into()],
                vec![AttributeKind::Continuous],
                vec!["lo".into(), "mid".into(), "hi".into()],
            )
            .unwrap(),
        );
        let instances = [1.0, 1.5, 2.0, 5.0, 5.5, 6.0, 9.0, 9.5, 10.0]
            .iter()
            .enumerate()
            .map(|(i, &x)| Instance::new(vec![x], ClassLabel::new(i / 3)))
            .collect();
        Dataset::new(schema, instances).unwrap()
    }

    #[test]
    fn topology_names() {
        assert_eq!(Topology::Single.to_string(), "single");
        assert_eq!(Topology::Forest.as_str(), "forest");
    }

    #[test]
    fn single_tree_classifies_raw_rows() {
        let config = Id3Config::new().with_cutpoint_search(crate::CutpointSearch::Exhaustive);
        let model = Classifier::train(Topology::Single, &config, &three_blobs()).unwrap();
        assert_eq!(model.members().len(), 1);
        assert!(model.members()[0].cutpoints().contains(AttributeIndex::new(0)));

        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let (class, _) = model.classify(&[1.2], &Cutpoints::new(), &mut rng).unwrap();
        assert_eq!(class, ClassLabel::new(0));
    }

    #[test]
    fn classify_dataset_does_not_mutate_input() {
        let data = three_blobs();
        let model = Classifier::train(Topology::Single, &Id3Config::new(), &data).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let pairs = model.classify_dataset(&data, &mut rng).unwrap();
        assert_eq!(pairs.len(), 9);
        assert_eq!(data.instances()[8].value(AttributeIndex::new(0)), 10.0);
    }

    #[test]
    fn forest_has_one_member_per_class() {
        let model =
            Classifier::train(Topology::Forest, &Id3Config::new(), &three_blobs()).unwrap();
        assert_eq!(model.topology(), Topology::Forest);
        assert_eq!(model.members().len(), 3);
        for member in model.members() {
            assert_eq!(member.distribution().n_classes(), 2);
        }
    }

    #[test]
    fn from_members_checks_count() {
        let model = Classifier::train(Topology::Single, &Id3Config::new(), &three_blobs()).unwrap();
        let one = model.members().to_vec();
        assert!(Classifier::from_members(Topology::Single, one.clone()).is_ok());
        let two = [one.clone(), one].concat();
        assert!(matches!(
            Classifier::from_members(Topology::Single, two).unwrap_err(),
            Id3Error::InvalidArgument { .. }
        ));
        assert!(Classifier::from_members(Topology::Forest, vec![]).is_err());
    }
}
