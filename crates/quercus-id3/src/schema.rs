//! Attribute/class metadata and the instance row type.

use crate::error::Id3Error;
use crate::node::{AttributeIndex, ClassLabel};

/// Declared kind of an attribute column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AttributeKind {
    /// Discrete codes; split multi-way on exact value equality.
    Categorical,
    /// Raw numeric values; binarized at a learned cutpoint before splitting.
    Continuous,
}

/// Attribute names and kinds plus class names for one dataset family.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Schema {
    attribute_names: Vec<String>,
    kinds: Vec<AttributeKind>,
    class_names: Vec<String>,
}

impl Schema {
    /// Create a new schema.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`Id3Error::ZeroAttributes`] | `attribute_names` is empty |
    /// | [`Id3Error::ZeroClasses`] | `class_names` is empty |
    /// | [`Id3Error::SchemaMismatch`] | names and kinds differ in length |
    pub fn new(
        attribute_names: Vec<String>,
        kinds: Vec<AttributeKind>,
        class_names: Vec<String>,
    ) -> Result<Self, Id3Error> {
        if attribute_names.is_empty() {
            return Err(Id3Error::ZeroAttributes);
        }
        if class_names.is_empty() {
            return Err(Id3Error::ZeroClasses);
        }
        if attribute_names.len() != kinds.len() {
            return Err(Id3Error::SchemaMismatch {
                names: attribute_names.len(),
                kinds: kinds.len(),
            });
        }
        Ok(Self {
            attribute_names,
            kinds,
            class_names,
        })
    }

    /// Schema of the binary one-vs-rest problem for `positive`.
    ///
    /// Class `0` is everything else, class `1` is `positive`.
    #[must_use]
    pub fn one_vs_rest(&self, positive: ClassLabel) -> Self {
        let name = self
            .class_name(positive)
            .map_or_else(|| positive.to_string(), str::to_string);
        Self {
            attribute_names: self.attribute_names.clone(),
            kinds: self.kinds.clone(),
            class_names: vec![format!("not {name}"), name],
        }
    }

    /// Return the number of attributes.
    #[must_use]
    pub fn n_attributes(&self) -> usize {
        self.kinds.len()
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.class_names.len()
    }

    /// Return the declared kind of `attribute`, if it exists.
    #[must_use]
    pub fn kind(&self, attribute: AttributeIndex) -> Option<AttributeKind> {
        self.kinds.get(attribute.index()).copied()
    }

    /// Return all declared attribute kinds.
    #[must_use]
    pub fn kinds(&self) -> &[AttributeKind] {
        &self.kinds
    }

    /// Return the attribute names.
    #[must_use]
    pub fn attribute_names(&self) -> &[String] {
        &self.attribute_names
    }

    /// Return the class names, indexed by [`ClassLabel`].
    #[must_use]
    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    /// Return the name of `class`, if it exists.
    #[must_use]
    pub fn class_name(&self, class: ClassLabel) -> Option<&str> {
        self.class_names.get(class.index()).map(String::as_str)
    }

    /// Look up a class label by name.
    #[must_use]
    pub fn class_by_name(&self, name: &str) -> Option<ClassLabel> {
        self.class_names
            .iter()
            .position(|n| n == name)
            .map(ClassLabel::new)
    }
}

/// One row: attribute values followed by a class label.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Instance {
    values: Vec<f64>,
    label: ClassLabel,
}

impl Instance {
    /// Create a new instance.
    #[must_use]
    pub fn new(values: Vec<f64>, label: ClassLabel) -> Self {
        Self { values, label }
    }

    /// Return the attribute values.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Return the value of `attribute`.
    ///
    /// # Panics
    ///
    /// Panics if `attribute` is out of range; datasets validate widths on construction.
    #[must_use]
    pub fn value(&self, attribute: AttributeIndex) -> f64 {
        self.values[attribute.index()]
    }

    /// Return the class label.
    #[must_use]
    pub fn label(&self) -> ClassLabel {
        self.label
    }

    /// Return the number of attribute values.
    #[must_use]
    pub fn n_attributes(&self) -> usize {
        self.values.len()
    }

    pub(crate) fn set_value(&mut self, attribute: AttributeIndex, value: f64) {
        self.values[attribute.index()] = value;
    }

    pub(crate) fn set_label(&mut self, label: ClassLabel) {
        self.label = label;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize, prefix: &str) -> Vec<String> {
        (0..n).map(|i| format!("{prefix}{i}")).collect()
    }

    #[test]
    fn schema_rejects_zero_attributes() {
        let err = Schema::new(vec![], vec![], names(2, "c")).unwrap_err();
        assert!(matches!(err, Id3Error::ZeroAttributes));
    }

    #[test]
    fn schema_rejects_zero_classes() {
        let err = Schema::new(names(1, "a"), vec![AttributeKind::Continuous], vec![]).unwrap_err();
        assert!(matches!(err, Id3Error::ZeroClasses));
    }

    #[test]
    fn schema_rejects_length_mismatch() {
        let err = Schema::new(names(2, "a"), vec![AttributeKind::Continuous], names(2, "c"))
            .unwrap_err();
        assert!(matches!(err, Id3Error::SchemaMismatch { names: 2, kinds: 1 }));
    }

    #[test]
    fn class_lookup_by_name() {
        let schema = Schema::new(
            names(1, "a"),
            vec![AttributeKind::Categorical],
            vec!["setosa".into(), "virginica".into()],
        )
        .unwrap();
        assert_eq!(schema.class_by_name("virginica"), Some(ClassLabel::new(1)));
        assert_eq!(schema.class_by_name("versicolor"), None);
    }

    #[test]
    fn one_vs_rest_names_positive_class_last() {
        let schema = Schema::new(
            names(1, "a"),
            vec![AttributeKind::Continuous],
            vec!["setosa".into(), "virginica".into()],
        )
        .unwrap();
        let binary = schema.one_vs_rest(ClassLabel::new(1));
        assert_eq!(binary.class_names(), &["not virginica", "virginica"]);
        assert_eq!(binary.n_attributes(), 1);
    }
}
