//! Supported dataset families and their schemas.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use quercus_id3::{AttributeKind, Schema};

use crate::IoError;

/// Continuous covtype columns, in file order.
const COVTYPE_CONTINUOUS: [&str; 10] = [
    "elevation",
    "aspect",
    "slope",
    "horizontal_distance_to_hydrology",
    "vertical_distance_to_hydrology",
    "horizontal_distance_to_roadways",
    "hillshade_9am",
    "hillshade_noon",
    "hillshade_3pm",
    "horizontal_distance_to_fire_points",
];

const IRIS_ATTRIBUTES: [&str; 4] = ["sepal_length", "sepal_width", "petal_length", "petal_width"];

/// One of the supported dataset families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetName {
    /// 4 continuous attributes, 3 named classes.
    Iris,
    /// 10 continuous attributes, wilderness and soil one-hot blocks, 7 classes.
    Covtype,
}

/// A one-hot column block collapsed into one categorical attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct OneHotBlock {
    pub(crate) name: &'static str,
    pub(crate) start: usize,
    pub(crate) end: usize,
}

impl DatasetName {
    /// Lower-case name used on the command line and in manifests.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DatasetName::Iris => "iris",
            DatasetName::Covtype => "covtype",
        }
    }

    /// Default location relative to the working directory.
    #[must_use]
    pub fn default_path(self) -> PathBuf {
        match self {
            DatasetName::Iris => PathBuf::from("iris/iris.data"),
            DatasetName::Covtype => PathBuf::from("covtype/covtype.data"),
        }
    }

    /// Number of columns in a raw row, class included.
    #[must_use]
    pub fn raw_width(self) -> usize {
        match self {
            DatasetName::Iris => 5,
            DatasetName::Covtype => 55,
        }
    }

    pub(crate) fn one_hot_blocks(self) -> &'static [OneHotBlock] {
        match self {
            DatasetName::Iris => &[],
            DatasetName::Covtype => &[
                OneHotBlock {
                    name: "wilderness_area",
                    start: 10,
                    end: 14,
                },
                OneHotBlock {
                    name: "soil_type",
                    start: 14,
                    end: 54,
                },
            ],
        }
    }

    /// Schema after one-hot reduction.
    ///
    /// Iris class names come from the data (order of first appearance), so
    /// they are passed in; covtype always has classes `1..=7`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Id3`] if `iris_classes` is empty.
    pub fn schema(self, iris_classes: Vec<String>) -> Result<Schema, IoError> {
        let schema = match self {
            DatasetName::Iris => Schema::new(
                IRIS_ATTRIBUTES.iter().map(|s| s.to_string()).collect(),
                vec![AttributeKind::Continuous; IRIS_ATTRIBUTES.len()],
                iris_classes,
            )?,
            DatasetName::Covtype => {
                let mut names: Vec<String> =
                    COVTYPE_CONTINUOUS.iter().map(|s| s.to_string()).collect();
                let mut kinds = vec![AttributeKind::Continuous; COVTYPE_CONTINUOUS.len()];
                for block in self.one_hot_blocks() {
                    names.push(block.name.to_string());
                    kinds.push(AttributeKind::Categorical);
                }
                Schema::new(names, kinds, (1..=7).map(|c| c.to_string()).collect())?
            }
        };
        Ok(schema)
    }
}

impl FromStr for DatasetName {
    type Err = IoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "iris" => Ok(DatasetName::Iris),
            "covtype" => Ok(DatasetName::Covtype),
            _ => Err(IoError::UnknownDataset {
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for DatasetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("Iris".parse::<DatasetName>().unwrap(), DatasetName::Iris);
        assert_eq!("COVTYPE".parse::<DatasetName>().unwrap(), DatasetName::Covtype);
    }

    #[test]
    fn parse_rejects_unknown() {
        let err = "mnist".parse::<DatasetName>().unwrap_err();
        assert!(matches!(err, IoError::UnknownDataset { name } if name == "mnist"));
    }

    #[test]
    fn covtype_schema_reduces_one_hot_blocks() {
        let schema = DatasetName::Covtype.schema(Vec::new()).unwrap();
        assert_eq!(schema.n_attributes(), 12);
        assert_eq!(schema.n_classes(), 7);
        assert_eq!(schema.kinds()[9], AttributeKind::Continuous);
        assert_eq!(schema.kinds()[10], AttributeKind::Categorical);
        assert_eq!(schema.attribute_names()[11], "soil_type");
    }

    #[test]
    fn iris_schema_uses_given_classes() {
        let schema = DatasetName::Iris
            .schema(vec!["Iris-setosa".into(), "Iris-virginica".into()])
            .unwrap();
        assert_eq!(schema.n_attributes(), 4);
        assert_eq!(schema.class_names(), ["Iris-setosa", "Iris-virginica"]);
    }

    #[test]
    fn one_hot_blocks_cover_columns_10_to_54() {
        let blocks = DatasetName::Covtype.one_hot_blocks();
        assert_eq!((blocks[0].start, blocks[0].end), (10, 14));
        assert_eq!((blocks[1].start, blocks[1].end), (14, 54));
        assert_eq!(DatasetName::Covtype.raw_width(), 55);
    }
}
