//! Instance files: CSV with a header row, class written by name.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use quercus_id3::{Dataset, Instance, Schema, format_value};
use tracing::{debug, instrument};

use crate::IoError;
use crate::reader::parse_finite;

const CLASS_COLUMN: &str = "class";

/// Write `data` as `<attribute names...>,class` followed by one row per instance.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::CsvParse`] | the CSV encoder failed |
/// | [`IoError::WriteFile`] | the file cannot be written |
#[instrument(skip(data), fields(path = %path.display(), n_instances = data.len()))]
pub fn write_instances(path: &Path, data: &Dataset) -> Result<(), IoError> {
    let schema = data.schema();
    let csv_err = |e: csv::Error| IoError::CsvParse {
        path: path.to_path_buf(),
        offset: 0,
        source: e,
    };

    let mut wtr = csv::Writer::from_writer(Vec::new());
    let header = schema
        .attribute_names()
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(CLASS_COLUMN));
    wtr.write_record(header).map_err(csv_err)?;
    for instance in data.instances() {
        let class = schema.class_name(instance.label()).unwrap_or_default();
        let row = instance
            .values()
            .iter()
            .map(|&v| format_value(v))
            .chain(std::iter::once(class.to_string()));
        wtr.write_record(row).map_err(csv_err)?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| csv_err(csv::Error::from(e.into_error())))?;

    fs::write(path, bytes).map_err(|e| IoError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    debug!("instances written");
    Ok(())
}

/// Read an instance file written by [`write_instances`] against `schema`.
///
/// A file with a header and no rows yields an empty dataset.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | file doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | malformed CSV record |
/// | [`IoError::InconsistentRowLength`] | header or row width differs from the schema |
/// | [`IoError::NonFiniteValue`] | a value is NaN, Inf, or unparseable |
/// | [`IoError::UnknownClass`] | a class name is not in the schema |
#[instrument(skip(schema), fields(path = %path.display()))]
pub fn read_instances(path: &Path, schema: Arc<Schema>) -> Result<Dataset, IoError> {
    let file = fs::File::open(path).map_err(|e| IoError::FileNotFound {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file);
    let csv_err = |e: csv::Error| IoError::CsvParse {
        path: path.to_path_buf(),
        offset: e.position().map_or(0, |p| p.byte()),
        source: e,
    };

    let expected = schema.n_attributes() + 1;
    let header_len = rdr.headers().map_err(csv_err)?.len();
    if header_len != expected {
        return Err(IoError::InconsistentRowLength {
            path: path.to_path_buf(),
            row_index: 0,
            expected,
            got: header_len,
        });
    }

    let mut instances = Vec::new();
    for (row_index, result) in rdr.records().enumerate() {
        let record = result.map_err(csv_err)?;
        if record.len() != expected {
            return Err(IoError::InconsistentRowLength {
                path: path.to_path_buf(),
                row_index,
                expected,
                got: record.len(),
            });
        }
        let values = (0..expected - 1)
            .map(|col| parse_finite(path, row_index, col, record.get(col).unwrap_or("")))
            .collect::<Result<Vec<f64>, IoError>>()?;
        let raw = record.get(expected - 1).unwrap_or("");
        let label = schema
            .class_by_name(raw)
            .ok_or_else(|| IoError::UnknownClass {
                path: path.to_path_buf(),
                row_index,
                raw: raw.to_string(),
            })?;
        instances.push(Instance::new(values, label));
    }

    debug!(n_instances = instances.len(), "instances read");
    Ok(Dataset::new(schema, instances)?)
}
