//! ID3 decision trees: induce, classify, vote.
//!
//! Provides information-gain tree induction over mixed categorical and
//! continuous attributes, a dataset model with projection, binarization and
//! train/validation splitting, tree walks with a distribution-weighted
//! fallback for unseen values, one-vs-rest forests trained in parallel via
//! rayon, k-fold cross-validation, and classifier snapshots.

mod classify;
mod config;
mod confusion;
mod cutpoints;
mod dataset;
mod distribution;
mod domain;
mod entropy;
mod error;
mod eval;
mod forest;
mod model;
mod node;
mod schema;
mod serialize;
mod tree;

pub use classify::{LeafTag, Prediction};
pub use config::{CutpointSearch, Id3Config};
pub use confusion::{ClassMetrics, ConfusionMatrix};
pub use cutpoints::{Cutpoints, binarize_value};
pub use dataset::Dataset;
pub use distribution::ClassDistribution;
pub use domain::Domain;
pub use entropy::{entropy, information_gain};
pub use error::Id3Error;
pub use eval::{CrossValidation, CrossValidationResult};
pub use forest::{Ballot, Forest, ForestConfig, process_ballots};
pub use model::{Classifier, Topology, TrainedTree};
pub use node::{
    AttributeIndex, Branch, ClassLabel, Node, NodeIndex, ROOT_PATH, format_value, leaf_tag,
    path_segment,
};
pub use schema::{AttributeKind, Instance, Schema};
pub use serialize::FORMAT_VERSION;
pub use tree::DecisionTree;
