//! Run-directory writer: data split, member trees, snapshot and reports.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use quercus_id3::{
    ClassMetrics, Classifier, ConfusionMatrix, Dataset, FORMAT_VERSION, Schema, Topology,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::instances::write_instances;
use crate::tables::{write_cutpoints, write_distribution};
use crate::tree_json::write_tree;

pub(crate) const TRAINING_FILE: &str = "training.txt";
pub(crate) const VALIDATION_FILE: &str = "validation.txt";
pub(crate) const MANIFEST_FILE: &str = "manifest.json";
pub(crate) const SNAPSHOT_FILE: &str = "classifier.bin";
pub(crate) const REPORT_FILE: &str = "report.txt";
pub(crate) const EVALUATION_FILE: &str = "evaluation.json";

pub(crate) fn tree_file(i: usize) -> String {
    format!("classifier{i}.json")
}

pub(crate) fn cutpoints_file(i: usize) -> String {
    format!("cutpoints{i}.txt")
}

pub(crate) fn distribution_file(i: usize) -> String {
    format!("distribution{i}.txt")
}

/// Description of a training run, stored as `manifest.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    /// Dataset family name.
    pub dataset: String,
    /// Single tree or forest.
    pub topology: Topology,
    /// Number of member trees written.
    pub n_trees: usize,
    /// Master seed of the run.
    pub seed: u64,
    /// Fraction of instances used for training.
    pub training_fraction: f64,
    /// Depth guard used for induction.
    pub max_depth: Option<usize>,
    /// Attribute names and kinds plus class names.
    pub schema: Schema,
    /// Snapshot format version.
    pub format_version: u32,
}

impl RunManifest {
    /// Describe a run; `n_trees` and `format_version` are filled in by
    /// [`RunWriter::write_classifier`].
    #[must_use]
    pub fn new(
        dataset: &str,
        topology: Topology,
        seed: u64,
        training_fraction: f64,
        max_depth: Option<usize>,
        schema: Schema,
    ) -> Self {
        Self {
            dataset: dataset.to_string(),
            topology,
            n_trees: 0,
            seed,
            training_fraction,
            max_depth,
            schema,
            format_version: FORMAT_VERSION,
        }
    }
}

/// Metrics from classifying a validation set, stored as `evaluation.json`
/// and rendered into `report.txt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// What produced the predictions (`classifier`, `snapshot`, `baseline`).
    pub source: String,
    /// Class names indexed by class label.
    pub class_names: Vec<String>,
    /// Instances classified.
    pub n_instances: usize,
    /// Instances that needed a fallback draw.
    pub n_fallbacks: usize,
    /// Overall accuracy.
    pub accuracy: f64,
    /// Rows are true classes, columns predicted classes.
    pub confusion_matrix: ConfusionMatrix,
    /// Per-class counts and rates.
    pub class_metrics: Vec<ClassMetrics>,
}

impl EvaluationReport {
    /// Summarize a confusion matrix.
    #[must_use]
    pub fn new(
        source: &str,
        confusion_matrix: ConfusionMatrix,
        n_fallbacks: usize,
        class_names: Vec<String>,
    ) -> Self {
        Self {
            source: source.to_string(),
            class_names,
            n_instances: confusion_matrix.total(),
            n_fallbacks,
            accuracy: confusion_matrix.accuracy(),
            class_metrics: confusion_matrix.class_metrics(),
            confusion_matrix,
        }
    }

    /// Fixed-width text rendering.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "source:    {}", self.source);
        let _ = writeln!(out, "instances: {}", self.n_instances);
        let _ = writeln!(out, "fallbacks: {}", self.n_fallbacks);
        let _ = writeln!(out, "accuracy:  {:.4}", self.accuracy);
        let _ = writeln!(out);
        for (i, name) in self.class_names.iter().enumerate() {
            let _ = writeln!(out, "class {i:>3}: {name}");
        }
        let _ = writeln!(out);
        let _ = write!(out, "{}", self.confusion_matrix);
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{:>5} {:>6} {:>6} {:>6} {:>6} {:>9} {:>9} {:>9} {:>9}",
            "class", "TP", "FP", "FN", "TN", "precision", "recall", "fall-out", "F1"
        );
        for m in &self.class_metrics {
            let _ = writeln!(
                out,
                "{:>5} {:>6} {:>6} {:>6} {:>6} {:>9.4} {:>9.4} {:>9.4} {:>9.4}",
                m.class,
                m.true_positives,
                m.false_positives,
                m.false_negatives,
                m.true_negatives,
                m.precision,
                m.recall,
                m.fall_out,
                m.f1
            );
        }
        out
    }
}

/// Writes the artifacts of one training run into a directory.
///
/// Layout:
///
/// | File | Content |
/// |---|---|
/// | `training.txt`, `validation.txt` | instance CSV, class by name |
/// | `classifier<i>.json` | member tree `i` |
/// | `cutpoints<i>.txt` | cutpoint table of member `i` |
/// | `distribution<i>.txt` | fallback distribution of member `i` |
/// | `manifest.json` | [`RunManifest`] |
/// | `classifier.bin` | versioned snapshot of the whole classifier |
/// | `report.txt`, `evaluation.json` | written after evaluation |
pub struct RunWriter {
    dir: PathBuf,
}

impl RunWriter {
    /// Create a fresh run directory.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::DirectoryExists`] | `dir` already exists |
    /// | [`IoError::OutputDirCreate`] | the directory cannot be created |
    #[instrument(fields(dir = %dir.display()))]
    pub fn create(dir: &Path) -> Result<Self, IoError> {
        if dir.exists() {
            return Err(IoError::DirectoryExists {
                path: dir.to_path_buf(),
            });
        }
        fs::create_dir_all(dir).map_err(|e| IoError::OutputDirCreate {
            path: dir.to_path_buf(),
            source: e,
        })?;
        debug!("run directory created");
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Open an existing run directory to add evaluation output.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::DirectoryMissing`] if `dir` is not a directory.
    pub fn open(dir: &Path) -> Result<Self, IoError> {
        if !dir.is_dir() {
            return Err(IoError::DirectoryMissing {
                path: dir.to_path_buf(),
            });
        }
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Return the run directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `training.txt` and `validation.txt`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::EmptyDataset`] | either side of the split has no instances; nothing is written |
    /// | [`IoError::WriteFile`] | a file cannot be written |
    #[instrument(skip_all, fields(n_training = training.len(), n_validation = validation.len()))]
    pub fn write_split(&self, training: &Dataset, validation: &Dataset) -> Result<(), IoError> {
        for (name, part) in [(TRAINING_FILE, training), (VALIDATION_FILE, validation)] {
            if part.is_empty() {
                return Err(IoError::EmptyDataset {
                    path: self.dir.join(name),
                });
            }
        }
        write_instances(&self.dir.join(TRAINING_FILE), training)?;
        write_instances(&self.dir.join(VALIDATION_FILE), validation)?;
        info!("data split written");
        Ok(())
    }

    /// Write every member tree with its tables, the manifest and the snapshot.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::WriteFile`] | a file cannot be written |
    /// | [`IoError::Json`] | JSON encoding failed |
    /// | [`IoError::Id3`] | the snapshot could not be saved |
    #[instrument(skip_all, fields(topology = %classifier.topology()))]
    pub fn write_classifier(
        &self,
        classifier: &Classifier,
        manifest: &RunManifest,
    ) -> Result<(), IoError> {
        let members = classifier.members();
        for (i, member) in members.iter().enumerate() {
            write_tree(&self.dir.join(tree_file(i)), member.tree())?;
            write_cutpoints(&self.dir.join(cutpoints_file(i)), member.cutpoints())?;
            write_distribution(&self.dir.join(distribution_file(i)), member.distribution())?;
        }

        let manifest = RunManifest {
            topology: classifier.topology(),
            n_trees: members.len(),
            format_version: FORMAT_VERSION,
            ..manifest.clone()
        };
        self.write_json(MANIFEST_FILE, &manifest)?;
        classifier.save(self.dir.join(SNAPSHOT_FILE))?;

        info!(n_trees = members.len(), dir = %self.dir.display(), "classifier written");
        Ok(())
    }

    /// Write `report.txt` and `evaluation.json`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::WriteFile`] | a file cannot be written |
    /// | [`IoError::Json`] | JSON encoding failed |
    #[instrument(skip_all, fields(source = %report.source))]
    pub fn write_evaluation(&self, report: &EvaluationReport) -> Result<(), IoError> {
        let path = self.dir.join(REPORT_FILE);
        fs::write(&path, report.render()).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;
        self.write_json(EVALUATION_FILE, report)?;
        info!(accuracy = report.accuracy, "evaluation written");
        Ok(())
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<(), IoError> {
        let path = self.dir.join(name);
        let json = serde_json::to_string_pretty(value).map_err(|e| IoError::Json {
            path: path.clone(),
            source: e,
        })?;
        fs::write(&path, json).map_err(|e| IoError::WriteFile { path, source: e })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quercus_id3::{AttributeKind, ClassLabel};
    use tempfile::TempDir;

    fn matrix() -> ConfusionMatrix {
        let truth: Vec<ClassLabel> = [0, 0, 1, 1].into_iter().map(ClassLabel::new).collect();
        let pred: Vec<ClassLabel> = [0, 1, 1, 1].into_iter().map(ClassLabel::new).collect();
        ConfusionMatrix::from_labels(&truth, &pred, 2).unwrap()
    }

    #[test]
    fn create_refuses_existing_directory() {
        let dir = TempDir::new().unwrap();
        let result = RunWriter::create(dir.path());
        assert!(matches!(result, Err(IoError::DirectoryExists { .. })));
    }

    #[test]
    fn create_makes_nested_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("runs").join("first");
        let writer = RunWriter::create(&nested).unwrap();
        assert!(writer.dir().is_dir());
    }

    #[test]
    fn open_requires_directory() {
        let dir = TempDir::new().unwrap();
        let result = RunWriter::open(&dir.path().join("missing"));
        assert!(matches!(result, Err(IoError::DirectoryMissing { .. })));
    }

    #[test]
    fn report_summarizes_matrix() {
        let report = EvaluationReport::new("classifier", matrix(), 1, vec!["a".into(), "b".into()]);
        assert_eq!(report.n_instances, 4);
        assert!((report.accuracy - 0.75).abs() < 1e-12);
        assert_eq!(report.class_metrics.len(), 2);
        let text = report.render();
        assert!(text.contains("accuracy:  0.7500"));
        assert!(text.contains("class   1: b"));
        assert!(text.contains("fall-out"));
    }

    #[test]
    fn write_evaluation_files() {
        let dir = TempDir::new().unwrap();
        let writer = RunWriter::open(dir.path()).unwrap();
        let report = EvaluationReport::new("snapshot", matrix(), 0, vec!["a".into(), "b".into()]);
        writer.write_evaluation(&report).unwrap();

        assert!(dir.path().join(REPORT_FILE).exists());
        let content: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join(EVALUATION_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(content["source"], "snapshot");
        assert_eq!(content["n_instances"], 4);
        assert!(content["class_metrics"].is_array());
    }

    #[test]
    fn manifest_defaults_to_current_format() {
        let schema = Schema::new(
            vec!["x".into()],
            vec![AttributeKind::Continuous],
            vec!["a".into()],
        )
        .unwrap();
        let manifest = RunManifest::new("iris", Topology::Single, 7, 0.66, None, schema);
        assert_eq!(manifest.format_version, FORMAT_VERSION);
        assert_eq!(manifest.n_trees, 0);
    }
}
