//! Learned thresholds for continuous attributes.

use std::collections::BTreeMap;

use crate::error::Id3Error;
use crate::node::AttributeIndex;

/// Map from continuous attribute to the threshold chosen during training.
///
/// Values `<= threshold` binarize to `0`, all others to `1`.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Cutpoints(BTreeMap<AttributeIndex, f64>);

impl Cutpoints {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `threshold` for `attribute`, returning the previous one.
    pub fn insert(&mut self, attribute: AttributeIndex, threshold: f64) -> Option<f64> {
        self.0.insert(attribute, threshold)
    }

    /// Return the threshold for `attribute`, if one was learned.
    #[must_use]
    pub fn get(&self, attribute: AttributeIndex) -> Option<f64> {
        self.0.get(&attribute).copied()
    }

    /// Return `true` if `attribute` has a threshold.
    #[must_use]
    pub fn contains(&self, attribute: AttributeIndex) -> bool {
        self.0.contains_key(&attribute)
    }

    /// Iterate `(attribute, threshold)` pairs in attribute order.
    pub fn iter(&self) -> impl Iterator<Item = (AttributeIndex, f64)> + '_ {
        self.0.iter().map(|(&a, &t)| (a, t))
    }

    /// Return the number of thresholds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Return `true` if no threshold was learned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Binarize a raw attribute row with this table.
    ///
    /// Attributes listed in `already` were binarized upstream and pass
    /// through unchanged.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`Id3Error::UnknownAttribute`] | a thresholded attribute is beyond `values` |
    /// | [`Id3Error::ConflictingCutpoint`] | `already` holds a different threshold for an attribute |
    pub fn binarize(&self, values: &[f64], already: &Cutpoints) -> Result<Vec<f64>, Id3Error> {
        let mut out = values.to_vec();
        for (attribute, threshold) in self.iter() {
            if let Some(existing) = already.get(attribute) {
                if existing.total_cmp(&threshold).is_ne() {
                    return Err(Id3Error::ConflictingCutpoint {
                        attribute: attribute.index(),
                        existing,
                        requested: threshold,
                    });
                }
                continue;
            }
            let slot = out
                .get_mut(attribute.index())
                .ok_or(Id3Error::UnknownAttribute {
                    attribute: attribute.index(),
                })?;
            *slot = binarize_value(*slot, threshold);
        }
        Ok(out)
    }
}

impl FromIterator<(AttributeIndex, f64)> for Cutpoints {
    fn from_iter<I: IntoIterator<Item = (AttributeIndex, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// `0.0` if `value <= threshold`, else `1.0`.
#[must_use]
pub fn binarize_value(value: f64, threshold: f64) -> f64 {
    if value <= threshold { 0.0 } else { 1.0 }
}
