//! Run-directory reader: the inverse of [`RunWriter`](crate::RunWriter).

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use quercus_id3::{Classifier, Dataset, FORMAT_VERSION, Id3Error};
use tracing::{debug, info, instrument};

use crate::{DatasetName, IoError};
use crate::instances::read_instances;
use crate::tables::{read_cutpoints, read_distribution};
use crate::tree_json::{bind_tree, read_tree};
use crate::writer::{
    MANIFEST_FILE, RunManifest, SNAPSHOT_FILE, TRAINING_FILE, VALIDATION_FILE, cutpoints_file,
    distribution_file, tree_file,
};

/// Reads the artifacts of a training run back.
pub struct RunReader {
    dir: PathBuf,
    manifest: RunManifest,
}

impl RunReader {
    /// Open a run directory and read its manifest.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::DirectoryMissing`] | `dir` is not a directory |
    /// | [`IoError::FileNotFound`] | `manifest.json` is missing |
    /// | [`IoError::Json`] | the manifest is malformed |
    /// | [`IoError::Id3`] | the manifest format version differs from this build's |
    #[instrument(fields(dir = %dir.display()))]
    pub fn open(dir: &Path) -> Result<Self, IoError> {
        if !dir.is_dir() {
            return Err(IoError::DirectoryMissing {
                path: dir.to_path_buf(),
            });
        }
        let path = dir.join(MANIFEST_FILE);
        let text = fs::read_to_string(&path).map_err(|e| IoError::FileNotFound {
            path: path.clone(),
            source: e,
        })?;
        let manifest: RunManifest = serde_json::from_str(&text).map_err(|e| IoError::Json {
            path: path.clone(),
            source: e,
        })?;
        if manifest.format_version != FORMAT_VERSION {
            return Err(Id3Error::IncompatibleModelVersion {
                expected: FORMAT_VERSION,
                found: manifest.format_version,
                path,
            }
            .into());
        }
        debug!(
            dataset = %manifest.dataset,
            topology = %manifest.topology,
            n_trees = manifest.n_trees,
            "manifest read"
        );
        Ok(Self {
            dir: dir.to_path_buf(),
            manifest,
        })
    }

    /// Check that the run was trained on `dataset`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::DatasetMismatch`] if the manifest names another dataset.
    pub fn check_dataset(&self, dataset: DatasetName) -> Result<(), IoError> {
        if self.manifest.dataset != dataset.as_str() {
            return Err(IoError::DatasetMismatch {
                path: self.dir.clone(),
                expected: dataset.to_string(),
                found: self.manifest.dataset.clone(),
            });
        }
        Ok(())
    }

    /// Return the run manifest.
    #[must_use]
    pub fn manifest(&self) -> &RunManifest {
        &self.manifest
    }

    /// Read `training.txt` and `validation.txt`.
    ///
    /// # Errors
    ///
    /// Any error from [`read_instances`](crate::read_instances), or
    /// [`IoError::EmptyDataset`] if either file holds no instances.
    pub fn read_split(&self) -> Result<(Dataset, Dataset), IoError> {
        let schema = Arc::new(self.manifest.schema.clone());
        let read = |name: &str| -> Result<Dataset, IoError> {
            let path = self.dir.join(name);
            let part = read_instances(&path, Arc::clone(&schema))?;
            if part.is_empty() {
                return Err(IoError::EmptyDataset { path });
            }
            Ok(part)
        };
        Ok((read(TRAINING_FILE)?, read(VALIDATION_FILE)?))
    }

    /// Rebuild the classifier from the per-member JSON trees and text tables.
    ///
    /// # Errors
    ///
    /// Any error from reading a tree, cutpoint or distribution file, or
    /// [`IoError::Id3`] if the members do not fit the manifest topology.
    #[instrument(skip(self), fields(n_trees = self.manifest.n_trees))]
    pub fn load_classifier(&self) -> Result<Classifier, IoError> {
        let members = (0..self.manifest.n_trees)
            .map(|i| {
                let tree_path = self.dir.join(tree_file(i));
                bind_tree(
                    read_tree(&tree_path)?,
                    read_cutpoints(&self.dir.join(cutpoints_file(i)))?,
                    read_distribution(&self.dir.join(distribution_file(i)))?,
                    &self.manifest.schema,
                    &tree_path,
                )
            })
            .collect::<Result<Vec<_>, IoError>>()?;
        let classifier = Classifier::from_members(self.manifest.topology, members)?;
        info!(topology = %classifier.topology(), "classifier rebuilt from tree files");
        Ok(classifier)
    }

    /// Load `classifier.bin`.
    ///
    /// # Errors
    ///
    /// [`IoError::Id3`] wrapping any snapshot error.
    pub fn load_snapshot(&self) -> Result<Classifier, IoError> {
        Ok(Classifier::load(self.dir.join(SNAPSHOT_FILE))?)
    }
}
