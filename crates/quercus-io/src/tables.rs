//! Plain-text cutpoint and class-distribution tables.
//!
//! One `<key> <value>` pair per line; `#` starts a comment and blank lines
//! are ignored.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use quercus_id3::{AttributeIndex, ClassDistribution, Cutpoints, format_value};

use crate::IoError;

/// Write a cutpoint table as `<attribute> <threshold>` lines.
///
/// # Errors
///
/// Returns [`IoError::WriteFile`] if the file cannot be written.
pub fn write_cutpoints(path: &Path, cutpoints: &Cutpoints) -> Result<(), IoError> {
    let mut out = String::from("# attribute threshold\n");
    for (attribute, threshold) in cutpoints.iter() {
        let _ = writeln!(out, "{attribute} {}", format_value(threshold));
    }
    write_text(path, &out)
}

/// Read a cutpoint table written by [`write_cutpoints`].
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | file doesn't exist or is unreadable |
/// | [`IoError::TableFormat`] | a line is malformed, a threshold is not finite, or an attribute repeats |
pub fn read_cutpoints(path: &Path) -> Result<Cutpoints, IoError> {
    let mut cutpoints = Cutpoints::new();
    for (line, key, value) in entries(path)? {
        let threshold: f64 = value
            .parse()
            .ok()
            .filter(|t: &f64| t.is_finite())
            .ok_or_else(|| table_error(path, line, format!("bad threshold \"{value}\"")))?;
        if cutpoints
            .insert(AttributeIndex::new(key), threshold)
            .is_some()
        {
            return Err(table_error(path, line, format!("attribute {key} listed twice")));
        }
    }
    Ok(cutpoints)
}

/// Write a class distribution as `<class> <count>` lines.
///
/// # Errors
///
/// Returns [`IoError::WriteFile`] if the file cannot be written.
pub fn write_distribution(path: &Path, distribution: &ClassDistribution) -> Result<(), IoError> {
    let mut out = String::from("# class count\n");
    for (class, count) in distribution.counts().iter().enumerate() {
        let _ = writeln!(out, "{class} {count}");
    }
    write_text(path, &out)
}

/// Read a class distribution written by [`write_distribution`].
///
/// Classes must be listed in order starting at 0.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | file doesn't exist or is unreadable |
/// | [`IoError::TableFormat`] | a line is malformed or classes are out of order |
pub fn read_distribution(path: &Path) -> Result<ClassDistribution, IoError> {
    let mut counts = Vec::new();
    for (line, class, value) in entries(path)? {
        if class != counts.len() {
            return Err(table_error(
                path,
                line,
                format!("expected class {}, found {class}", counts.len()),
            ));
        }
        let count: usize = value
            .parse()
            .map_err(|_| table_error(path, line, format!("bad count \"{value}\"")))?;
        counts.push(count);
    }
    Ok(ClassDistribution::from_counts(counts))
}

fn write_text(path: &Path, text: &str) -> Result<(), IoError> {
    fs::write(path, text).map_err(|e| IoError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    })
}

fn table_error(path: &Path, line: usize, reason: String) -> IoError {
    IoError::TableFormat {
        path: path.to_path_buf(),
        line,
        reason,
    }
}

/// `(line number, integer key, raw value)` for every non-comment line.
fn entries(path: &Path) -> Result<Vec<(usize, usize, String)>, IoError> {
    let text = fs::read_to_string(path).map_err(|e| IoError::FileNotFound {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut out = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        let line = i + 1;
        let content = raw.split('#').next().unwrap_or("").trim();
        if content.is_empty() {
            continue;
        }
        let fields: Vec<&str> = content.split_whitespace().collect();
        let [key, value] = fields.as_slice() else {
            return Err(table_error(
                path,
                line,
                format!("expected 2 fields, found {}", fields.len()),
            ));
        };
        let key: usize = key
            .parse()
            .map_err(|_| table_error(path, line, format!("bad index \"{key}\"")))?;
        out.push((line, key, value.to_string()));
    }
    Ok(out)
}
