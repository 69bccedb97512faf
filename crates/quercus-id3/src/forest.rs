//! One-vs-rest forests: parallel per-class training and ballot voting.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::{
    Id3Error,
    classify::Prediction,
    config::Id3Config,
    cutpoints::Cutpoints,
    dataset::Dataset,
    model::TrainedTree,
    node::ClassLabel,
};

/// Configuration for one-vs-rest forest training.
///
/// Every member tree is induced with the wrapped [`Id3Config`]; its seed
/// drives a master generator that hands each class its own seed.
///
/// # Defaults
///
/// | Parameter | Default             |
/// |-----------|---------------------|
/// | `tree`    | `Id3Config::new()`  |
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForestConfig {
    pub(crate) tree: Id3Config,
}

impl ForestConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-member tree configuration.
    #[must_use]
    pub fn with_tree_config(mut self, tree: Id3Config) -> Self {
        self.tree = tree;
        self
    }

    /// Return the per-member tree configuration.
    #[must_use]
    pub fn tree_config(&self) -> &Id3Config {
        &self.tree
    }

    /// Train one binary tree per class of `data`, in parallel.
    ///
    /// Member `i` separates class `i` (label 1) from all others (label 0).
    /// Per-member seeds are drawn in class order before any training
    /// starts, so the result does not depend on thread scheduling.
    ///
    /// # Errors
    ///
    /// Any error from [`Id3Config::fit`].
    #[instrument(skip_all, fields(n_classes = data.n_classes(), n_instances = data.len()))]
    pub fn fit(&self, data: &Dataset) -> Result<Forest, Id3Error> {
        self.tree.validate()?;
        if data.is_empty() {
            return Err(Id3Error::EmptyDataset);
        }
        let n_classes = data.n_classes();
        info!(n_classes, n_instances = data.len(), "training one-vs-rest forest");

        let mut master_rng = ChaCha8Rng::seed_from_u64(self.tree.seed);
        let seeds: Vec<u64> = (0..n_classes).map(|_| master_rng.r#gen()).collect();

        let members = seeds
            .into_par_iter()
            .enumerate()
            .map(|(class, seed)| {
                let binary = data.one_vs_rest(ClassLabel::new(class));
                let n_positive = binary.local_distribution().count(ClassLabel::new(1));
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let member = self.tree.fit_owned_with_rng(binary, &mut rng)?;
                debug!(
                    class,
                    n_nodes = member.tree().n_nodes(),
                    n_positive,
                    "forest member trained"
                );
                Ok(member)
            })
            .collect::<Result<Vec<_>, Id3Error>>()?;

        Ok(Forest { members })
    }
}

/// One binary tree per class, combined by [`process_ballots`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Forest {
    members: Vec<TrainedTree>,
}

/// One member's opinion about an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ballot {
    /// Index of the member tree, equal to the class it stands for.
    pub tree_index: usize,
    /// `true` when the member claims the instance for its class.
    pub verdict: bool,
    /// Training instances behind the verdict.
    pub n_instances: usize,
    /// `true` when the member fell back to a random draw.
    pub fallback: bool,
}

impl Forest {
    /// Reassemble a forest from members in class order.
    ///
    /// # Errors
    ///
    /// Returns [`Id3Error::InvalidArgument`] if `members` is empty.
    pub fn from_members(members: Vec<TrainedTree>) -> Result<Self, Id3Error> {
        if members.is_empty() {
            return Err(Id3Error::InvalidArgument {
                reason: "forest needs at least one member".to_string(),
            });
        }
        Ok(Self { members })
    }

    /// Return the members in class order.
    #[must_use]
    pub fn members(&self) -> &[TrainedTree] {
        &self.members
    }

    /// Collect every member's ballot for a raw row.
    ///
    /// # Errors
    ///
    /// Same as [`TrainedTree::classify`].
    pub fn ballots<R: Rng + ?Sized>(
        &self,
        values: &[f64],
        already: &Cutpoints,
        rng: &mut R,
    ) -> Result<Vec<Ballot>, Id3Error> {
        self.members
            .iter()
            .enumerate()
            .map(|(tree_index, member)| {
                let tag = member.classify(values, already, rng)?;
                Ok(Ballot {
                    tree_index,
                    verdict: tag.class == ClassLabel::new(1),
                    n_instances: tag.n_instances,
                    fallback: tag.fallback,
                })
            })
            .collect()
    }

    /// Classify a raw row by voting. Returns the class and whether any
    /// member fell back to a random draw.
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
        let ballots = self.ballots(values, already, rng)?;
        let fallback = ballots.iter().any(|b| b.fallback);
        let winner = process_ballots(&ballots, rng).ok_or_else(|| Id3Error::InvalidArgument {
            reason: "forest has no members".to_string(),
        })?;
        Ok((ClassLabel::new(winner), fallback))
    }

    /// Classify every instance of `data`.
    ///
    /// # Errors
    ///
    /// Same as [`TrainedTree::classify`].
    pub fn classify_dataset<R: Rng + ?Sized>(
        &self,
        data: &Dataset,
        rng: &mut R,
    ) -> Result<Vec<Prediction>, Id3Error> {
        data.instances()
            .iter()
            .map(|instance| {
                let (predicted, fallback) =
                    self.classify(instance.values(), data.binarized(), rng)?;
                Ok(Prediction {
                    truth: instance.label(),
                    predicted,
                    fallback,
                })
            })
            .collect()
    }
}

/// Pick the winning tree index from a set of ballots.
///
/// Members claiming the instance are preferred; if none does, every
/// ballot stays in. Among those, the largest `n_instances` wins, and a
/// remaining tie is broken uniformly at random. `None` for no ballots.
pub fn process_ballots<R: Rng + ?Sized>(ballots: &[Ballot], rng: &mut R) -> Option<usize> {
    let claimants: Vec<&Ballot> = ballots.iter().filter(|b| b.verdict).collect();
    let pool = if claimants.is_empty() {
        ballots.iter().collect()
    } else {
        claimants
    };
    let max = pool.iter().map(|b| b.n_instances).max()?;
    let top: Vec<usize> = pool
        .iter()
        .filter(|b| b.n_instances == max)
        .map(|b| b.tree_index)
        .collect();
    top.choose(rng).copied()
}
