//! Classifier snapshots via bincode.

use std::path::Path;

use tracing::{debug, info, instrument};

use crate::error::Id3Error;
use crate::model::{Classifier, Topology};

/// Current binary format version.
pub const FORMAT_VERSION: u32 = 1;

/// Versioned envelope for the serialized classifier.
#[derive(serde::Serialize, serde::Deserialize)]
struct ModelEnvelope {
    /// Format version for compatibility checking.
    format_version: u32,
    /// Single tree or forest.
    topology: Topology,
    /// Number of member trees.
    n_trees: usize,
    /// The serialized classifier.
    classifier: Classifier,
}

impl Classifier {
    /// Save the classifier to a binary file.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`Id3Error::SerializeModel`] | bincode encoding failed |
    /// | [`Id3Error::WriteModel`] | file write failed |
    #[instrument(skip(self), fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Id3Error> {
        let path = path.as_ref();

        let envelope = ModelEnvelope {
            format_version: FORMAT_VERSION,
            topology: self.topology(),
            n_trees: self.members().len(),
            classifier: self.clone(),
        };

        let bytes = bincode::serialize(&envelope)
            .map_err(|e| Id3Error::SerializeModel { source: e })?;

        std::fs::write(path, &bytes).map_err(|e| Id3Error::WriteModel {
            path: path.to_path_buf(),
            source: e,
        })?;

        info!(
            size_bytes = bytes.len(),
            n_trees = envelope.n_trees,
            "classifier saved"
        );
        Ok(())
    }

    /// Load a classifier from a binary file.
    ///
    /// Checks the format version and re-validates every member tree
    /// against its cutpoint table.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`Id3Error::ReadModel`] | file read failed |
    /// | [`Id3Error::DeserializeModel`] | bincode decoding failed |
    /// | [`Id3Error::IncompatibleModelVersion`] | format version mismatch |
    /// | [`Id3Error::StructuralInconsistency`] | a decoded tree is malformed |
    #[instrument(fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Id3Error> {
        let path = path.as_ref();

        let bytes = std::fs::read(path).map_err(|e| Id3Error::ReadModel {
            path: path.to_path_buf(),
            source: e,
        })?;

        let envelope: ModelEnvelope =
            bincode::deserialize(&bytes).map_err(|e| Id3Error::DeserializeModel {
                path: path.to_path_buf(),
                source: e,
            })?;

        if envelope.format_version != FORMAT_VERSION {
            return Err(Id3Error::IncompatibleModelVersion {
                expected: FORMAT_VERSION,
                found: envelope.format_version,
                path: path.to_path_buf(),
            });
        }

        for member in envelope.classifier.members() {
            member.validate()?;
        }

        debug!(
            topology = %envelope.topology,
            n_trees = envelope.n_trees,
            "classifier loaded"
        );
        Ok(envelope.classifier)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use tempfile::TempDir;

    use super::*;
    use crate::config::Id3Config;
    use crate::cutpoints::Cutpoints;
    use crate::dataset::Dataset;
    use crate::node::ClassLabel;
    use crate::schema::{AttributeKind, Instance, Schema};

    fn trained(topology: Topology) -> Classifier {
        let schema = Arc::new(
            Schema::new(
                vec!["x".into(), "y".into()],
                vec![AttributeKind::Continuous, AttributeKind::Categorical],
                vec!["p".into(), "q".into()],
            )
            .unwrap(),
        );
        let instances = [(1.0, 0.0, 0), (2.0, 1.0, 0), (3.0, 0.0, 0), (10.0, 1.0, 1), (11.0, 0.0, 1)]
            .iter()
            .map(|&(x, y, c)| Instance::new(vec![x, y], ClassLabel::new(c)))
            .collect();
        let data = Dataset::new(schema, instances).unwrap();
        Classifier::train(topology, &Id3Config::new(), &data).unwrap()
    }

    #[test]
    fn round_trip_identical_classifier() {
        let dir = TempDir::new().unwrap();
        for topology in [Topology::Single, Topology::Forest] {
            let path = dir.path().join(format!("{topology}.bin"));
            let model = trained(topology);
            model.save(&path).unwrap();
            let loaded = Classifier::load(&path).unwrap();
            assert_eq!(model, loaded);

            let mut a = ChaCha8Rng::seed_from_u64(3);
            let mut b = ChaCha8Rng::seed_from_u64(3);
            for row in [[1.5, 0.0], [10.5, 1.0], [6.0, 7.0]] {
                assert_eq!(
                    model.classify(&row, &Cutpoints::new(), &mut a).unwrap(),
                    loaded.classify(&row, &Cutpoints::new(), &mut b).unwrap()
                );
            }
        }
    }

    #[test]
    fn load_nonexistent_file_error() {
        let dir = TempDir::new().unwrap();
        let err = Classifier::load(dir.path().join("missing.bin")).unwrap_err();
        assert!(matches!(err, Id3Error::ReadModel { .. }));
    }

    #[test]
    fn load_corrupt_file_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corrupt.bin");
        std::fs::write(&path, b"not a valid bincode file").unwrap();
        let err = Classifier::load(&path).unwrap_err();
        assert!(matches!(err, Id3Error::DeserializeModel { .. }));
    }

    #[test]
    fn load_wrong_version_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("old.bin");
        let envelope = ModelEnvelope {
            format_version: FORMAT_VERSION + 1,
            topology: Topology::Single,
            n_trees: 1,
            classifier: trained(Topology::Single),
        };
        std::fs::write(&path, bincode::serialize(&envelope).unwrap()).unwrap();
        let err = Classifier::load(&path).unwrap_err();
        assert!(matches!(
            err,
            Id3Error::IncompatibleModelVersion { found, .. } if found == FORMAT_VERSION + 1
        ));
    }
}
