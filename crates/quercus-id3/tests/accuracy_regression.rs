//! Accuracy regression tests for quercus-id3.
//!
//! These tests verify that algorithmic changes do not degrade tree or forest
//! accuracy on deterministic synthetic data, and pin the end-to-end
//! behaviours of induction, fallback classification and voting.

use std::sync::Arc;

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tempfile::TempDir;

use quercus_id3::{
    AttributeIndex, AttributeKind, Ballot, ClassDistribution, ClassLabel, Classifier,
    ConfusionMatrix, CrossValidation, CutpointSearch, Dataset, DecisionTree, Id3Config, Instance,
    Node, Schema, Topology, information_gain, process_ballots,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// 150 instances, 4 continuous attributes, 3 classes (iris-shaped).
///
/// Attribute `a` of class `c` is `c * 3.0 + noise` with noise in `[0, 1.5)`.
fn make_iris_like() -> Dataset {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let schema = Arc::new(
        Schema::new(
            vec![
                "sepal_length".into(),
                "sepal_width".into(),
                "petal_length".into(),
                "petal_width".into(),
            ],
            vec![AttributeKind::Continuous; 4],
            vec!["setosa".into(), "versicolor".into(), "virginica".into()],
        )
        .unwrap(),
    );
    let instances = (0..150)
        .map(|i| {
            let class = i % 3;
            let values = (0..4)
                .map(|_| class as f64 * 3.0 + rng.r#gen::<f64>() * 1.5)
                .collect();
            Instance::new(values, ClassLabel::new(class))
        })
        .collect();
    Dataset::new(schema, instances).unwrap()
}

fn categorical(n_classes: usize, raw: &[[usize; 4]]) -> Dataset {
    let schema = Arc::new(
        Schema::new(
            (0..3).map(|a| format!("a{a}")).collect(),
            vec![AttributeKind::Categorical; 3],
            (0..n_classes).map(|c| format!("c{c}")).collect(),
        )
        .unwrap(),
    );
    let instances = raw
        .iter()
        .map(|r| Instance::new(r[..3].iter().map(|&v| v as f64).collect(), ClassLabel::new(r[3])))
        .collect();
    Dataset::new(schema, instances).unwrap()
}

fn holdout_accuracy(topology: Topology, config: &Id3Config) -> f64 {
    let data = make_iris_like();
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let (training, validation) = data.divide_corpus(0.66, &mut rng).unwrap();
    let model = Classifier::train(topology, config, &training).unwrap();
    let predictions = model.classify_dataset(&validation, &mut rng).unwrap();
    ConfusionMatrix::from_predictions(&predictions, data.n_classes())
        .unwrap()
        .accuracy()
}

// ---------------------------------------------------------------------------
// Accuracy floors
// ---------------------------------------------------------------------------

#[test]
fn single_tree_holdout_accuracy_above_threshold() {
    let acc = holdout_accuracy(Topology::Single, &Id3Config::new().with_seed(42));
    assert!(acc > 0.75, "single tree accuracy {acc} <= 0.75");
}

#[test]
fn exhaustive_single_tree_holdout_accuracy_above_threshold() {
    let config = Id3Config::new()
        .with_cutpoint_search(CutpointSearch::Exhaustive)
        .with_seed(42);
    let acc = holdout_accuracy(Topology::Single, &config);
    assert!(acc > 0.85, "exhaustive single tree accuracy {acc} <= 0.85");
}

#[test]
fn forest_holdout_accuracy_above_threshold() {
    let acc = holdout_accuracy(Topology::Forest, &Id3Config::new().with_seed(42));
    assert!(acc > 0.75, "forest accuracy {acc} <= 0.75");
}

#[test]
fn cv_accuracy_above_threshold() {
    let config = Id3Config::new()
        .with_cutpoint_search(CutpointSearch::Exhaustive)
        .with_seed(42);
    let result = CrossValidation::new(5)
        .with_seed(42)
        .evaluate(Topology::Single, &config, &make_iris_like())
        .unwrap();
    assert!(
        result.mean_accuracy > 0.85,
        "cv mean_accuracy {} <= 0.85",
        result.mean_accuracy
    );
    assert_eq!(result.confusion_matrix.total(), 150);
}

// ---------------------------------------------------------------------------
// Determinism
// ---------------------------------------------------------------------------

#[test]
fn same_seed_gives_byte_identical_snapshots() {
    let dir = TempDir::new().unwrap();
    let data = make_iris_like();
    for topology in [Topology::Single, Topology::Forest] {
        let config = Id3Config::new().with_seed(7);
        let a = dir.path().join(format!("{topology}_a.bin"));
        let b = dir.path().join(format!("{topology}_b.bin"));
        Classifier::train(topology, &config, &data).unwrap().save(&a).unwrap();
        Classifier::train(topology, &config, &data).unwrap().save(&b).unwrap();
        assert_eq!(std::fs::read(&a).unwrap(), std::fs::read(&b).unwrap());
    }
}

// ---------------------------------------------------------------------------
// End-to-end scenarios
// ---------------------------------------------------------------------------

#[test]
fn perfect_categorical_split_gains_one_bit() {
    let data = categorical(2, &[[1, 1, 1, 0], [2, 1, 1, 1], [1, 1, 1, 0], [2, 1, 1, 1]]);
    let gain = information_gain(data.instances(), AttributeIndex::new(0), &[1.0, 2.0], 2).unwrap();
    assert!((gain - 1.0).abs() < 1e-12);
}

#[test]
fn monoclass_dataset_induces_single_leaf() {
    let data = categorical(3, &[[1, 2, 3, 1], [2, 2, 1, 1], [3, 1, 1, 1], [1, 1, 2, 1], [2, 3, 3, 1]]);
    let trained = Id3Config::new().fit(&data).unwrap();
    assert_eq!(trained.tree().n_nodes(), 1);
    assert_eq!(
        trained.tree().nodes()[0],
        Node::Leaf {
            class: ClassLabel::new(1),
            n_instances: 5
        }
    );
}

#[test]
fn unseen_combination_falls_back_to_distribution() {
    let data = categorical(2, &[[1, 1, 1, 0], [2, 1, 1, 1], [1, 1, 1, 0], [2, 1, 1, 1]]);
    let trained = Id3Config::new().fit(&data).unwrap();
    let fallback = ClassDistribution::from_counts(vec![9, 3]);
    for seed in 0..16 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        // Attribute 0 never took value 7 in training.
        let tag = trained
            .tree()
            .classify(&[7.0, 1.0, 1.0], &fallback, &mut rng)
            .unwrap();
        assert!(tag.fallback);
        assert_eq!(tag.n_instances, fallback.count(tag.class));
    }
}

#[test]
fn highest_count_claimant_wins_the_vote() {
    let ballots = [
        Ballot { tree_index: 0, verdict: true, n_instances: 10, fallback: false },
        Ballot { tree_index: 1, verdict: false, n_instances: 99, fallback: false },
        Ballot { tree_index: 2, verdict: true, n_instances: 30, fallback: false },
    ];
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    assert_eq!(process_ballots(&ballots, &mut rng), Some(2));
}

// ---------------------------------------------------------------------------
// Dataset properties
// ---------------------------------------------------------------------------

#[test]
fn divide_corpus_partitions_exactly() {
    let data = make_iris_like();
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    for fraction in [0.0, 0.1, 0.5, 0.66, 0.9, 1.0] {
        let (training, validation) = data.divide_corpus(fraction, &mut rng).unwrap();
        let expected = (150.0 * fraction).round() as usize;
        assert_eq!(training.len(), expected);
        assert_eq!(validation.len(), 150 - expected);

        let key = |i: &Instance| format!("{:?}", i);
        let mut original: Vec<String> = data.instances().iter().map(key).collect();
        let mut split: Vec<String> = training
            .instances()
            .iter()
            .chain(validation.instances())
            .map(key)
            .collect();
        original.sort();
        split.sort();
        assert_eq!(original, split);
    }
}

#[test]
fn split_then_project_yields_binary_partition() {
    let mut data = make_iris_like();
    let attribute = AttributeIndex::new(2);
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let (cut, _) = data
        .best_cutting_value(attribute, CutpointSearch::default(), &mut rng)
        .unwrap();
    data.split_attribute(attribute, cut).unwrap();
    let children = data.project_attribute(attribute).unwrap();
    let keys: Vec<f64> = children.iter().map(|(v, _)| *v).collect();
    assert_eq!(keys, vec![0.0, 1.0]);
    assert_eq!(children.iter().map(|(_, c)| c.len()).sum::<usize>(), data.len());
}

#[test]
fn induced_trees_are_structurally_sound() {
    let data = make_iris_like();
    for seed in 0..5 {
        let model = Classifier::train(Topology::Forest, &Id3Config::new().with_seed(seed), &data)
            .unwrap();
        for member in model.members() {
            let tree: &DecisionTree = member.tree();
            tree.validate().unwrap();
            let rebuilt = DecisionTree::from_nodes(tree.nodes().to_vec()).unwrap();
            assert_eq!(&rebuilt, tree);
        }
    }
}
