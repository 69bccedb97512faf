//! Entropy and information gain ("profit") of a partition.

use crate::error::Id3Error;
use crate::node::AttributeIndex;
use crate::schema::Instance;

/// Shannon entropy in bits of a class-proportion vector.
///
/// Entries equal to zero contribute nothing (`0 · log2(0) = 0`).
///
/// # Errors
///
/// Returns [`Id3Error::InvalidDistribution`] if any proportion is negative.
pub fn entropy(proportions: &[f64]) -> Result<f64, Id3Error> {
    let mut h = 0.0;
    for (class, &p) in proportions.iter().enumerate() {
        if p < 0.0 {
            return Err(Id3Error::InvalidDistribution {
                class,
                proportion: p,
            });
        }
        if p > 0.0 {
            h -= p * p.log2();
        }
    }
    Ok(h)
}

/// Entropy of raw class counts. Returns 0.0 for an empty group.
pub(crate) fn entropy_of_counts(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let n = total as f64;
    -counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / n;
            p * p.log2()
        })
        .sum::<f64>()
}

/// Weighted entropy reduction from a parent to its groups.
pub(crate) fn gain_from_counts(parent: &[usize], groups: &[Vec<usize>], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let n = total as f64;
    let children: f64 = groups
        .iter()
        .map(|g| {
            let size: usize = g.iter().sum();
            size as f64 / n * entropy_of_counts(g, size)
        })
        .sum();
    (entropy_of_counts(parent, total) - children).max(0.0)
}

/// Information gain of splitting `instances` on `attribute`.
///
/// - One candidate value: treated as a cutpoint; instances with value
///   `<= cutpoint` form one group, the rest the other.
/// - More than one: categorical split by exact value equality, one group
///   per distinct candidate value.
///
/// Runs in a single pass over `instances` with counting vectors.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`Id3Error::InvalidArgument`] | `candidate_values` is empty |
/// | [`Id3Error::UnknownAttribute`] | `attribute` is beyond the instance width |
/// | [`Id3Error::ClassOutOfRange`] | a label is not below `n_classes` |
/// | [`Id3Error::ValueOutsideDomain`] | categorical split meets a value not in `candidate_values` |
pub fn information_gain(
    instances: &[Instance],
    attribute: AttributeIndex,
    candidate_values: &[f64],
    n_classes: usize,
) -> Result<f64, Id3Error> {
    if candidate_values.is_empty() {
        return Err(Id3Error::InvalidArgument {
            reason: format!("no candidate values for attribute {attribute}"),
        });
    }
    if let Some(first) = instances.first()
        && attribute.index() >= first.n_attributes()
    {
        return Err(Id3Error::UnknownAttribute {
            attribute: attribute.index(),
        });
    }

    let mut parent = vec![0usize; n_classes];

    if let [cutpoint] = candidate_values {
        let mut groups = vec![vec![0usize; n_classes]; 2];
        for instance in instances {
            let class = checked_class(instance, n_classes)?;
            parent[class] += 1;
            let side = usize::from(instance.value(attribute) > *cutpoint);
            groups[side][class] += 1;
        }
        return Ok(gain_from_counts(&parent, &groups, instances.len()));
    }

    let mut domain = candidate_values.to_vec();
    domain.sort_unstable_by(f64::total_cmp);
    domain.dedup_by(|a, b| a.total_cmp(b).is_eq());

    let mut groups = vec![vec![0usize; n_classes]; domain.len()];
    for instance in instances {
        let class = checked_class(instance, n_classes)?;
        let value = instance.value(attribute);
        let group = domain
            .binary_search_by(|probe| probe.total_cmp(&value))
            .map_err(|_| Id3Error::ValueOutsideDomain {
                attribute: attribute.index(),
                value,
            })?;
        parent[class] += 1;
        groups[group][class] += 1;
    }
    Ok(gain_from_counts(&parent, &groups, instances.len()))
}

fn checked_class(instance: &Instance, n_classes: usize) -> Result<usize, Id3Error> {
    let class = instance.label().index();
    if class >= n_classes {
        return Err(Id3Error::ClassOutOfRange { class, n_classes });
    }
    Ok(class)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ClassLabel;

    fn rows(raw: &[[usize; 4]]) -> Vec<Instance> {
        raw.iter()
            .map(|r| {
                Instance::new(
                    r[..3].iter().map(|&v| v as f64).collect(),
                    ClassLabel::new(r[3]),
                )
            })
            .collect()
    }

    #[test]
    fn entropy_balanced_binary() {
        assert!((entropy(&[0.5, 0.5]).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn entropy_pure_is_zero() {
        assert_eq!(entropy(&[1.0, 0.0]).unwrap(), 0.0);
    }

    #[test]
    fn entropy_bounded_by_log2_of_classes() {
        let h = entropy(&[0.25, 0.25, 0.25, 0.25]).unwrap();
        assert!((h - 2.0).abs() < 1e-12);
        let skewed = entropy(&[0.7, 0.2, 0.1]).unwrap();
        assert!(skewed > 0.0 && skewed < 3.0_f64.log2());
    }

    #[test]
    fn entropy_rejects_negative() {
        let err = entropy(&[1.2, -0.2]).unwrap_err();
        assert!(matches!(err, Id3Error::InvalidDistribution { class: 1, .. }));
    }

    #[test]
    fn categorical_perfect_split() {
        let data = rows(&[[1, 1, 1, 0], [2, 1, 1, 1], [1, 1, 1, 0], [2, 1, 1, 1]]);
        let gain = information_gain(&data, AttributeIndex::new(0), &[1.0, 2.0], 2).unwrap();
        assert!((gain - 1.0).abs() < 1e-12);
    }

    #[test]
    fn cutpoint_perfect_split() {
        let data = rows(&[
            [1, 1, 1, 0],
            [2, 1, 1, 1],
            [1, 1, 1, 0],
            [2, 1, 1, 1],
            [1, 1, 1, 0],
            [2, 1, 1, 1],
        ]);
        let gain = information_gain(&data, AttributeIndex::new(0), &[1.0], 2).unwrap();
        assert!((gain - 1.0).abs() < 1e-12);
    }

    #[test]
    fn three_way_split_recovers_log2_three() {
        let data = rows(&[
            [1, 1, 1, 0],
            [2, 1, 1, 1],
            [3, 1, 1, 2],
            [1, 1, 1, 0],
            [2, 1, 1, 1],
            [3, 1, 1, 2],
        ]);
        // Unused domain values and unused classes contribute nothing.
        let gain = information_gain(&data, AttributeIndex::new(0), &[1.0, 2.0, 3.0, 4.0], 6)
            .unwrap();
        assert!((gain - 3.0_f64.log2()).abs() < 1e-9);
    }

    #[test]
    fn cutpoint_with_everything_on_one_side_gains_nothing() {
        let data = rows(&[[1, 1, 1, 0], [2, 1, 1, 1]]);
        let gain = information_gain(&data, AttributeIndex::new(0), &[5.0], 2).unwrap();
        assert_eq!(gain, 0.0);
    }

    #[test]
    fn uninformative_split_gains_nothing() {
        let data = rows(&[[1, 1, 1, 0], [1, 1, 1, 1], [2, 1, 1, 0], [2, 1, 1, 1]]);
        let gain = information_gain(&data, AttributeIndex::new(0), &[1.0, 2.0], 2).unwrap();
        assert!(gain.abs() < 1e-12);
    }

    #[test]
    fn gain_is_never_negative() {
        let data = rows(&[[1, 1, 1, 0], [3, 1, 1, 1], [2, 1, 1, 0], [2, 1, 1, 1], [3, 1, 1, 0]]);
        for cut in [1.0, 2.0, 3.0] {
            let gain = information_gain(&data, AttributeIndex::new(0), &[cut], 2).unwrap();
            assert!(gain >= 0.0);
        }
    }

    #[test]
    fn empty_candidates_rejected() {
        let data = rows(&[[1, 1, 1, 0]]);
        let err = information_gain(&data, AttributeIndex::new(0), &[], 2).unwrap_err();
        assert!(matches!(err, Id3Error::InvalidArgument { .. }));
    }

    #[test]
    fn value_outside_candidates_rejected() {
        let data = rows(&[[1, 1, 1, 0], [7, 1, 1, 1]]);
        let err = information_gain(&data, AttributeIndex::new(0), &[1.0, 2.0], 2).unwrap_err();
        assert!(matches!(err, Id3Error::ValueOutsideDomain { attribute: 0, .. }));
    }
}
