//! Dataset files, tree persistence and run directories for quercus.

mod domain;
mod error;
mod instances;
mod loader;
mod reader;
mod tables;
mod tree_json;
mod writer;

pub use domain::DatasetName;
pub use error::IoError;
pub use instances::{read_instances, write_instances};
pub use loader::RunReader;
pub use reader::DatasetReader;
pub use tables::{read_cutpoints, read_distribution, write_cutpoints, write_distribution};
pub use tree_json::{read_tree, tree_from_json, tree_to_json, write_tree};
pub use writer::{EvaluationReport, RunManifest, RunWriter};
