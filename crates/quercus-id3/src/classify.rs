//! Tree walks with a distribution-weighted fallback for unseen values.

use rand::Rng;

use crate::{
    Id3Error,
    dataset::Dataset,
    distribution::ClassDistribution,
    node::{ClassLabel, Node, leaf_tag},
    tree::DecisionTree,
};

/// The leaf an instance reached, or the leaf synthesized for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeafTag {
    /// Predicted class.
    pub class: ClassLabel,
    /// Training instances at the leaf; for a fallback, the fallback
    /// distribution's count for `class`.
    pub n_instances: usize,
    /// `true` when no branch matched and the class was drawn at random.
    pub fallback: bool,
}

impl LeafTag {
    /// Render as `Class <c>,Instances <n>`.
    #[must_use]
    pub fn tag(&self) -> String {
        leaf_tag(self.class, self.n_instances)
    }
}

/// A `(truth, predicted)` pair from classifying one labeled instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Prediction {
    /// The instance's true label.
    pub truth: ClassLabel,
    /// The label the classifier chose.
    pub predicted: ClassLabel,
    /// `true` when an unseen value forced a random draw.
    pub fallback: bool,
}

impl DecisionTree {
    /// Walk from the root following the branch equal to each tested value.
    ///
    /// `values` must already be binarized with the tree's cutpoints. When a
    /// node has no branch for the observed value, a class is drawn from
    /// `fallback` and returned with that distribution's count.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`Id3Error::PredictionAttributeMismatch`] | `values` is too short for a tested attribute |
    /// | [`Id3Error::EmptyDistribution`] | a fallback is needed but `fallback` is all zeros |
    pub fn classify<R: Rng + ?Sized>(
        &self,
        values: &[f64],
        fallback: &ClassDistribution,
        rng: &mut R,
    ) -> Result<LeafTag, Id3Error> {
        let mut idx = self.root();
        loop {
            match &self.nodes[idx.index()] {
                Node::Leaf { class, n_instances } => {
                    return Ok(LeafTag {
                        class: *class,
                        n_instances: *n_instances,
                        fallback: false,
                    });
                }
                node @ Node::Internal { attribute, .. } => {
                    let value = values.get(attribute.index()).copied().ok_or_else(|| {
                        Id3Error::PredictionAttributeMismatch {
                            expected: self.required_width(),
                            got: values.len(),
                        }
                    })?;
                    match node.child_for(value) {
                        Some(child) => idx = child,
                        None => {
                            let class = fallback.sample(rng)?;
                            return Ok(LeafTag {
                                class,
                                n_instances: fallback.count(class),
                                fallback: true,
                            });
                        }
                    }
                }
            }
        }
    }

    /// Classify every instance of an already binarized dataset.
    ///
    /// # Errors
    ///
    /// Same as [`DecisionTree::classify`].
    pub fn classify_dataset<R: Rng + ?Sized>(
        &self,
        data: &Dataset,
        fallback: &ClassDistribution,
        rng: &mut R,
    ) -> Result<Vec<Prediction>, Id3Error> {
        data.instances()
            .iter()
            .map(|instance| {
                let tag = self.classify(instance.values(), fallback, rng)?;
                Ok(Prediction {
                    truth: instance.label(),
                    predicted: tag.class,
                    fallback: tag.fallback,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::node::{AttributeIndex, Branch, NodeIndex};
    use crate::schema::{AttributeKind, Instance, Schema};

    /// Attribute 1 decides: 0 → class 0 (12), 1 → class 1 (7).
    fn stump() -> DecisionTree {
        DecisionTree::from_nodes(vec![
            Node::Internal {
                attribute: AttributeIndex::new(1),
                branches: vec![
                    Branch { value: 0.0, child: NodeIndex::new(1) },
                    Branch { value: 1.0, child: NodeIndex::new(2) },
                ],
            },
            Node::Leaf { class: ClassLabel::new(0), n_instances: 12 },
            Node::Leaf { class: ClassLabel::new(1), n_instances: 7 },
        ])
        .unwrap()
    }

    #[test]
    fn follows_matching_branch() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let fallback = ClassDistribution::from_counts(vec![5, 5]);
        let tag = stump().classify(&[9.0, 1.0], &fallback, &mut rng).unwrap();
        assert_eq!(tag.tag(), "Class 1,Instances 7");
        assert!(!tag.fallback);
    }

    #[test]
    fn unseen_value_uses_fallback_count() {
        let fallback = ClassDistribution::from_counts(vec![30, 0, 4]);
        for seed in 0..20 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let tag = stump().classify(&[0.0, 2.0], &fallback, &mut rng).unwrap();
            assert!(tag.fallback);
            assert_ne!(tag.class, ClassLabel::new(1));
            assert_eq!(tag.n_instances, fallback.count(tag.class));
        }
    }

    #[test]
    fn short_row_rejected() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let fallback = ClassDistribution::from_counts(vec![1, 1]);
        let err = stump().classify(&[0.0], &fallback, &mut rng).unwrap_err();
        assert!(matches!(
            err,
            Id3Error::PredictionAttributeMismatch { expected: 2, got: 1 }
        ));
    }

    #[test]
    fn classify_dataset_pairs_truth_with_prediction() {
        let schema = Arc::new(
            Schema::new(
                vec!["a".into(), "b".into()],
                vec![AttributeKind::Categorical; 2],
                vec!["x".into(), "y".into()],
            )
            .unwrap(),
        );
        let data = Dataset::new(
            schema,
            vec![
                Instance::new(vec![0.0, 0.0], ClassLabel::new(0)),
                Instance::new(vec![0.0, 1.0], ClassLabel::new(0)),
            ],
        )
        .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let fallback = ClassDistribution::from_counts(vec![1, 1]);
        let pairs = stump().classify_dataset(&data, &fallback, &mut rng).unwrap();
        let got: Vec<(usize, usize)> = pairs
            .iter()
            .map(|p| (p.truth.index(), p.predicted.index()))
            .collect();
        assert_eq!(got, vec![(0, 0), (0, 1)]);
    }
}
