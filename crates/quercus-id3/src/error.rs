use std::path::PathBuf;

/// Errors from tree induction, classification and model persistence.
#[derive(Debug, thiserror::Error)]
pub enum Id3Error {
    /// Returned when a class distribution holds a negative proportion.
    #[error("invalid distribution: class {class} has negative proportion {proportion}")]
    InvalidDistribution {
        /// Position of the offending entry.
        class: usize,
        /// The negative proportion.
        proportion: f64,
    },

    /// Returned when an operation is called with arguments it cannot work with.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Human-readable description of the problem.
        reason: String,
    },

    /// Returned when a weighted draw is requested over an all-zero distribution.
    #[error("cannot draw a class from an empty distribution")]
    EmptyDistribution,

    /// Returned when the training dataset has zero instances.
    #[error("training dataset has zero instances")]
    EmptyDataset,

    /// Returned when a schema declares zero attributes.
    #[error("schema declares zero attributes")]
    ZeroAttributes,

    /// Returned when a schema declares zero classes.
    #[error("schema declares zero classes")]
    ZeroClasses,

    /// Returned when schema name and kind lists disagree in length.
    #[error("schema has {names} attribute names but {kinds} attribute kinds")]
    SchemaMismatch {
        /// Number of attribute names.
        names: usize,
        /// Number of attribute kinds.
        kinds: usize,
    },

    /// Returned when an instance has a different number of attributes than the schema.
    #[error("instance {instance_index} has {got} attributes, expected {expected}")]
    AttributeCountMismatch {
        /// The expected number of attributes.
        expected: usize,
        /// The actual number of attributes in the instance.
        got: usize,
        /// The zero-based index of the offending instance.
        instance_index: usize,
    },

    /// Returned when an attribute value is NaN or infinite.
    #[error("non-finite value at instance {instance_index}, attribute {attribute_index}")]
    NonFiniteValue {
        /// The zero-based index of the offending instance.
        instance_index: usize,
        /// The zero-based index of the offending attribute.
        attribute_index: usize,
    },

    /// Returned when a class label is not below the number of classes.
    #[error("class label {class} is out of range for {n_classes} classes")]
    ClassOutOfRange {
        /// The offending class label.
        class: usize,
        /// The number of classes.
        n_classes: usize,
    },

    /// Returned when an attribute index does not exist or is no longer eligible.
    #[error("attribute {attribute} is unknown or not eligible here")]
    UnknownAttribute {
        /// The offending attribute index.
        attribute: usize,
    },

    /// Returned when an instance value is not part of the candidate value set.
    #[error("value {value} of attribute {attribute} is outside its domain")]
    ValueOutsideDomain {
        /// The attribute index.
        attribute: usize,
        /// The value that has no matching domain entry.
        value: f64,
    },

    /// Returned when binarization is requested for a categorical or already binarized attribute.
    #[error("attribute {attribute} is not an unbinarized continuous attribute")]
    NotContinuous {
        /// The offending attribute index.
        attribute: usize,
    },

    /// Returned when a dataset was binarized with a different threshold than the one supplied.
    #[error("attribute {attribute} was binarized at {existing}, cannot re-binarize at {requested}")]
    ConflictingCutpoint {
        /// The attribute index.
        attribute: usize,
        /// Threshold already applied to the data.
        existing: f64,
        /// Threshold requested now.
        requested: f64,
    },

    /// Returned when the training fraction is outside [0.0, 1.0].
    #[error("training fraction must be in [0.0, 1.0], got {fraction}")]
    InvalidTrainingFraction {
        /// The invalid fraction.
        fraction: f64,
    },

    /// Returned when max_depth is zero.
    #[error("max_depth must be at least 1, got {max_depth}")]
    InvalidMaxDepth {
        /// The invalid max_depth value provided.
        max_depth: usize,
    },

    /// Returned when the sampled cutpoint search is asked for zero candidates.
    #[error("cutpoint candidate count must be at least 1, got {n_candidates}")]
    InvalidCandidateCount {
        /// The invalid candidate count.
        n_candidates: usize,
    },

    /// Returned when n_folds is less than 2 or exceeds the number of instances.
    #[error("n_folds must be in [2, {n_instances}], got {n_folds}")]
    InvalidFoldCount {
        /// The invalid n_folds value provided.
        n_folds: usize,
        /// The number of instances available.
        n_instances: usize,
    },

    /// Returned when a tree violates the arena invariants.
    #[error("structural inconsistency at node {node}: {reason}")]
    StructuralInconsistency {
        /// Arena index of the offending node.
        node: usize,
        /// Human-readable description of the violation.
        reason: String,
    },

    /// Returned when an instance has a different number of attributes at prediction time.
    #[error("prediction input has {got} attributes, expected at least {expected}")]
    PredictionAttributeMismatch {
        /// The minimum number of attributes the tree reads.
        expected: usize,
        /// The actual number of attributes in the prediction input.
        got: usize,
    },

    /// Returned when model serialization fails.
    #[error("failed to serialize model")]
    SerializeModel {
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when model deserialization fails.
    #[error("failed to deserialize model from {path}")]
    DeserializeModel {
        /// Path to the model file that could not be deserialized.
        path: PathBuf,
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when writing the model file fails.
    #[error("failed to write model to {path}")]
    WriteModel {
        /// Path to the file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when reading the model file fails.
    #[error("failed to read model from {path}")]
    ReadModel {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when loading a model with an incompatible format version.
    #[error("incompatible model version in {path}: expected {expected}, found {found}")]
    IncompatibleModelVersion {
        /// The model format version this build expects.
        expected: u32,
        /// The model format version found in the file.
        found: u32,
        /// Path to the model file with the incompatible version.
        path: PathBuf,
    },
}
