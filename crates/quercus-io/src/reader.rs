//! Raw dataset reader for the headerless iris and covtype files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use quercus_id3::{ClassLabel, Dataset, Instance};
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::DatasetName;

/// Reads a raw dataset file into a [`Dataset`].
///
/// Expected format: headerless CSV, one instance per line, attribute columns
/// followed by the class. Blank lines are skipped.
/// - `iris`: 4 numeric columns, class name (classes numbered in order of
///   first appearance)
/// - `covtype`: 54 numeric columns, class `1..=7`; columns 10..14 and
///   14..54 are one-hot blocks reduced to the index of the active bit
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::EmptyDataset`] | Zero data rows |
/// | [`IoError::InconsistentRowLength`] | Row has the wrong column count |
/// | [`IoError::NonFiniteValue`] | Cell is NaN, Inf, or unparseable float |
/// | [`IoError::MissingOneHot`] | A one-hot block has zero or several set bits |
/// | [`IoError::UnknownClass`] | Covtype class outside `1..=7` |
pub struct DatasetReader {
    path: PathBuf,
    name: DatasetName,
}

impl DatasetReader {
    /// Create a new reader for the given file and dataset family.
    pub fn new(path: &Path, name: DatasetName) -> Self {
        Self {
            path: path.to_path_buf(),
            name,
        }
    }

    /// Read and validate the file, returning a [`Dataset`].
    #[instrument(skip(self), fields(path = %self.path.display(), dataset = %self.name))]
    pub fn read(&self) -> Result<Dataset, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) lets the row-length check below report the row.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let expected = self.name.raw_width();
        let mut rows: Vec<(Vec<f64>, String)> = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| IoError::CsvParse {
                path: self.path.clone(),
                offset: e.position().map_or(0, |p| p.byte()),
                source: e,
            })?;
            if record.iter().all(str::is_empty) {
                continue;
            }
            let row_index = rows.len();
            if record.len() != expected {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected,
                    got: record.len(),
                });
            }

            let mut values = Vec::with_capacity(expected - 1);
            for col_index in 0..expected - 1 {
                let raw = record.get(col_index).unwrap_or("");
                values.push(parse_finite(&self.path, row_index, col_index, raw)?);
            }
            let class = record.get(expected - 1).unwrap_or("").to_string();
            rows.push((self.reduce_one_hot(row_index, values)?, class));
        }

        if rows.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }
        debug!(n_rows = rows.len(), "rows parsed");

        let dataset = match self.name {
            DatasetName::Iris => self.build_iris(rows)?,
            DatasetName::Covtype => self.build_covtype(rows)?,
        };

        info!(
            n_instances = dataset.len(),
            n_attributes = dataset.schema().n_attributes(),
            n_classes = dataset.n_classes(),
            "dataset loaded"
        );
        Ok(dataset)
    }

    fn reduce_one_hot(&self, row_index: usize, values: Vec<f64>) -> Result<Vec<f64>, IoError> {
        let blocks = self.name.one_hot_blocks();
        let Some(first) = blocks.first() else {
            return Ok(values);
        };
        let mut reduced = values[..first.start].to_vec();
        for block in blocks {
            let bits = &values[block.start..block.end];
            let active: Vec<usize> = bits
                .iter()
                .enumerate()
                .filter(|&(_, &b)| b != 0.0)
                .map(|(i, _)| i)
                .collect();
            match active.as_slice() {
                [index] => reduced.push(*index as f64),
                _ => {
                    return Err(IoError::MissingOneHot {
                        path: self.path.clone(),
                        row_index,
                        block: block.name,
                        active: active.len(),
                    });
                }
            }
        }
        Ok(reduced)
    }

    fn build_iris(&self, rows: Vec<(Vec<f64>, String)>) -> Result<Dataset, IoError> {
        let mut class_names: Vec<String> = Vec::new();
        let mut instances = Vec::with_capacity(rows.len());
        for (values, class) in rows {
            let index = match class_names.iter().position(|c| *c == class) {
                Some(i) => i,
                None => {
                    class_names.push(class);
                    class_names.len() - 1
                }
            };
            instances.push(Instance::new(values, ClassLabel::new(index)));
        }
        let schema = DatasetName::Iris.schema(class_names)?;
        Ok(Dataset::new(Arc::new(schema), instances)?)
    }

    fn build_covtype(&self, rows: Vec<(Vec<f64>, String)>) -> Result<Dataset, IoError> {
        let schema = Arc::new(DatasetName::Covtype.schema(Vec::new())?);
        let instances = rows
            .into_iter()
            .enumerate()
            .map(|(row_index, (values, class))| {
                let label = schema
                    .class_by_name(&class)
                    .ok_or_else(|| IoError::UnknownClass {
                        path: self.path.clone(),
                        row_index,
                        raw: class.clone(),
                    })?;
                Ok(Instance::new(values, label))
            })
            .collect::<Result<Vec<_>, IoError>>()?;
        Ok(Dataset::new(schema, instances)?)
    }
}

pub(crate) fn parse_finite(
    path: &Path,
    row_index: usize,
    col_index: usize,
    raw: &str,
) -> Result<f64, IoError> {
    let fail = || IoError::NonFiniteValue {
        path: path.to_path_buf(),
        row_index,
        col_index,
        raw: raw.to_string(),
    };
    let value: f64 = raw.parse().map_err(|_| fail())?;
    if !value.is_finite() {
        return Err(fail());
    }
    Ok(value)
}
