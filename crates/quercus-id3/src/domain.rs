/// Sorted set of distinct admissible values for one attribute.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Domain(Vec<f64>);

impl Domain {
    /// Collect the distinct values of `values`, sorted ascending.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        let mut v: Vec<f64> = values.into_iter().collect();
        v.sort_unstable_by(f64::total_cmp);
        v.dedup_by(|a, b| a.total_cmp(b).is_eq());
        Self(v)
    }

    /// The `{0, 1}` domain of a binarized attribute.
    #[must_use]
    pub fn binary() -> Self {
        Self(vec![0.0, 1.0])
    }

    /// Return the values in ascending order.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Position of `value` in the domain, if admissible.
    #[must_use]
    pub fn position(&self, value: f64) -> Option<usize> {
        self.0.binary_search_by(|probe| probe.total_cmp(&value)).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_are_sorted_and_distinct() {
        let d = Domain::from_values([3.0, 1.0, 3.0, 2.0, 1.0]);
        assert_eq!(d.values(), &[1.0, 2.0, 3.0]);
        assert_eq!(d.len(), 3);
    }

    #[test]
    fn position_lookup() {
        let d = Domain::from_values([5.1, 4.9, 6.3]);
        assert_eq!(d.position(5.1), Some(1));
        assert_eq!(d.position(5.0), None);
    }

    #[test]
    fn binary_domain() {
        assert_eq!(Domain::binary().values(), &[0.0, 1.0]);
    }
}
