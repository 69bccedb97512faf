//! I/O error types for quercus-io.

use std::path::PathBuf;

use quercus_id3::Id3Error;

/// Errors from dataset parsing, tree persistence and run directories.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when a file holds zero data rows.
    #[error("empty dataset (no data rows) in {path}")]
    EmptyDataset {
        /// Path to the file.
        path: PathBuf,
    },

    /// Returned when a data row has the wrong number of columns.
    #[error("inconsistent row length in {path}: row {row_index} has {got} columns, expected {expected}")]
    InconsistentRowLength {
        /// Path to the file.
        path: PathBuf,
        /// Zero-based data row index.
        row_index: usize,
        /// Expected number of columns.
        expected: usize,
        /// Actual number of columns in this row.
        got: usize,
    },

    /// Returned when a cell is NaN, Inf, or otherwise not a finite float.
    #[error("non-finite value in {path}: row {row_index}, column {col_index}, raw value \"{raw}\"")]
    NonFiniteValue {
        /// Path to the file.
        path: PathBuf,
        /// Zero-based data row index.
        row_index: usize,
        /// Zero-based column index.
        col_index: usize,
        /// The raw string value that failed to parse.
        raw: String,
    },

    /// Returned when a one-hot block does not have exactly one active bit.
    #[error("one-hot block {block} in {path}: row {row_index} has {active} active bits, expected 1")]
    MissingOneHot {
        /// Path to the file.
        path: PathBuf,
        /// Zero-based data row index.
        row_index: usize,
        /// Name of the one-hot block.
        block: &'static str,
        /// Number of set bits found.
        active: usize,
    },

    /// Returned when a dataset name is not one of the supported families.
    #[error("unknown dataset \"{name}\": expected iris or covtype")]
    UnknownDataset {
        /// The name that was given.
        name: String,
    },

    /// Returned when a class cell does not name a known class.
    #[error("unknown class \"{raw}\" in {path}: row {row_index}")]
    UnknownClass {
        /// Path to the file.
        path: PathBuf,
        /// Zero-based data row index.
        row_index: usize,
        /// The raw class cell.
        raw: String,
    },

    /// Returned when a new run would overwrite an existing directory.
    #[error("run directory {path} already exists")]
    DirectoryExists {
        /// The existing directory.
        path: PathBuf,
    },

    /// Returned when a run directory is required but absent.
    #[error("run directory {path} does not exist")]
    DirectoryMissing {
        /// The missing directory.
        path: PathBuf,
    },

    /// Returned when the output directory cannot be created.
    #[error("cannot create output directory {path}")]
    OutputDirCreate {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when an output file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a persisted tree document is malformed.
    #[error("malformed tree in {path}: {reason}")]
    TreeFormat {
        /// Path to the tree file.
        path: PathBuf,
        /// Human-readable description of the problem.
        reason: String,
    },

    /// Returned when a cutpoint or distribution line cannot be parsed.
    #[error("malformed table in {path} at line {line}: {reason}")]
    TableFormat {
        /// Path to the table file.
        path: PathBuf,
        /// One-based line number.
        line: usize,
        /// Human-readable description of the problem.
        reason: String,
    },

    /// Returned when a run directory belongs to a different dataset.
    #[error("run {path} was trained on {found}, not {expected}")]
    DatasetMismatch {
        /// Path to the run directory.
        path: PathBuf,
        /// Dataset named by the caller.
        expected: String,
        /// Dataset recorded in the run manifest.
        found: String,
    },

    /// Returned when a JSON document cannot be encoded or decoded.
    #[error("JSON error in {path}")]
    Json {
        /// Path to the JSON file.
        path: PathBuf,
        /// Underlying serde_json error.
        source: serde_json::Error,
    },

    /// Returned when rebuilding core structures fails.
    #[error(transparent)]
    Id3(#[from] Id3Error),
}
