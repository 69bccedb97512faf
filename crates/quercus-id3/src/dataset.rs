//! The dataset model: instances plus the bookkeeping induction needs.
//!
//! A [`Dataset`] owns its instances. Projection produces fully independent
//! children, so a recursion branch may binarize its own data in place
//! without any sibling or ancestor observing it.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::Rng;
use rand::seq::index;
use tracing::debug;

use crate::config::CutpointSearch;
use crate::cutpoints::{Cutpoints, binarize_value};
use crate::distribution::ClassDistribution;
use crate::domain::Domain;
use crate::entropy::{gain_from_counts, information_gain};
use crate::error::Id3Error;
use crate::node::{AttributeIndex, ClassLabel};
use crate::schema::{AttributeKind, Instance, Schema};

/// Instances with their remaining attributes, domains and distributions.
#[derive(Debug, Clone)]
pub struct Dataset {
    schema: Arc<Schema>,
    instances: Vec<Instance>,
    remaining: Vec<AttributeIndex>,
    domains: BTreeMap<AttributeIndex, Domain>,
    binarized: Cutpoints,
    local: ClassDistribution,
    global: ClassDistribution,
    monoclass: Option<ClassLabel>,
}

impl Dataset {
    /// Build a top-level dataset.
    ///
    /// Every attribute is eligible; domains are the distinct values seen in
    /// `instances`; the global distribution is the class distribution of
    /// `instances`. An empty instance list is allowed.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`Id3Error::AttributeCountMismatch`] | an instance width differs from the schema |
    /// | [`Id3Error::NonFiniteValue`] | a value is NaN or infinite |
    /// | [`Id3Error::ClassOutOfRange`] | a label is not below the class count |
    pub fn new(schema: Arc<Schema>, instances: Vec<Instance>) -> Result<Self, Id3Error> {
        validate_instances(&schema, &instances)?;
        let n_attributes = schema.n_attributes();
        let remaining: Vec<AttributeIndex> = (0..n_attributes).map(AttributeIndex::new).collect();
        let domains = remaining
            .iter()
            .map(|&a| (a, Domain::from_values(instances.iter().map(|i| i.value(a)))))
            .collect();
        let local = ClassDistribution::from_labels(
            instances.iter().map(Instance::label),
            schema.n_classes(),
        )?;
        let monoclass = local.sole_class();
        Ok(Self {
            schema,
            instances,
            remaining,
            domains,
            binarized: Cutpoints::new(),
            global: local.clone(),
            local,
            monoclass,
        })
    }

    /// A sibling dataset over other instances.
    ///
    /// Keeps this dataset's schema, remaining attributes, domains and
    /// binarization; distributions (local and global) are recomputed from
    /// `instances`.
    ///
    /// # Errors
    ///
    /// Same as [`Dataset::new`].
    pub fn with_instances(&self, instances: Vec<Instance>) -> Result<Self, Id3Error> {
        validate_instances(&self.schema, &instances)?;
        let local = ClassDistribution::from_labels(
            instances.iter().map(Instance::label),
            self.schema.n_classes(),
        )?;
        Ok(Self {
            schema: Arc::clone(&self.schema),
            instances,
            remaining: self.remaining.clone(),
            domains: self.domains.clone(),
            binarized: self.binarized.clone(),
            monoclass: local.sole_class(),
            global: local.clone(),
            local,
        })
    }

    // --- Accessors ---

    /// Return the schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Return a shared handle to the schema.
    #[must_use]
    pub fn shared_schema(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }

    /// Return the instances.
    #[must_use]
    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    /// Return the number of instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Return `true` if there are no instances.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.schema.n_classes()
    }

    /// Attributes still eligible for splitting, in ascending order.
    #[must_use]
    pub fn remaining(&self) -> &[AttributeIndex] {
        &self.remaining
    }

    /// Current domain of an eligible attribute.
    #[must_use]
    pub fn domain(&self, attribute: AttributeIndex) -> Option<&Domain> {
        self.domains.get(&attribute)
    }

    /// Thresholds already applied to this dataset's instances.
    #[must_use]
    pub fn binarized(&self) -> &Cutpoints {
        &self.binarized
    }

    /// Class distribution of this dataset's own instances.
    #[must_use]
    pub fn local_distribution(&self) -> &ClassDistribution {
        &self.local
    }

    /// Class distribution of the top-level dataset this one descends from.
    #[must_use]
    pub fn global_distribution(&self) -> &ClassDistribution {
        &self.global
    }

    /// The shared label when every instance has the same one.
    #[must_use]
    pub fn monoclass(&self) -> Option<ClassLabel> {
        self.monoclass
    }

    /// Return the true labels in instance order.
    pub fn labels(&self) -> impl Iterator<Item = ClassLabel> + '_ {
        self.instances.iter().map(Instance::label)
    }

    /// `true` iff `attribute` is declared continuous and not yet binarized here.
    #[must_use]
    pub fn is_splitable(&self, attribute: AttributeIndex) -> bool {
        self.schema.kind(attribute) == Some(AttributeKind::Continuous)
            && !self.binarized.contains(attribute)
    }

    // --- Operations ---

    /// Pick a cutpoint for a continuous attribute and report its gain.
    ///
    /// See [`CutpointSearch`] for the two policies. Sampled search keeps the
    /// first candidate on ties; exhaustive search keeps the smallest value.
    /// A single-valued attribute yields that value with gain 0.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`Id3Error::EmptyDataset`] | the dataset has no instances |
    /// | [`Id3Error::NotContinuous`] | `attribute` is not splitable |
    /// | [`Id3Error::UnknownAttribute`] | `attribute` is not eligible |
    /// | [`Id3Error::InvalidCandidateCount`] | sampled search with zero candidates |
    pub fn best_cutting_value<R: Rng + ?Sized>(
        &self,
        attribute: AttributeIndex,
        search: CutpointSearch,
        rng: &mut R,
    ) -> Result<(f64, f64), Id3Error> {
        self.check_eligible(attribute)?;
        if !self.is_splitable(attribute) {
            return Err(Id3Error::NotContinuous {
                attribute: attribute.index(),
            });
        }
        if self.instances.is_empty() {
            return Err(Id3Error::EmptyDataset);
        }
        match search {
            CutpointSearch::Sampled { n_candidates } => {
                if n_candidates == 0 {
                    return Err(Id3Error::InvalidCandidateCount { n_candidates });
                }
                self.sampled_cutpoint(attribute, n_candidates, rng)
            }
            CutpointSearch::Exhaustive => Ok(self.exhaustive_cutpoint(attribute)),
        }
    }

    fn sampled_cutpoint<R: Rng + ?Sized>(
        &self,
        attribute: AttributeIndex,
        n_candidates: usize,
        rng: &mut R,
    ) -> Result<(f64, f64), Id3Error> {
        let amount = n_candidates.min(self.instances.len());
        let mut best: Option<(f64, f64)> = None;
        for i in index::sample(rng, self.instances.len(), amount) {
            let candidate = self.instances[i].value(attribute);
            let gain =
                information_gain(&self.instances, attribute, &[candidate], self.n_classes())?;
            if best.is_none_or(|(_, g)| gain > g) {
                best = Some((candidate, gain));
            }
        }
        // amount >= 1 because the dataset is non-empty.
        best.ok_or(Id3Error::EmptyDataset)
    }

    fn exhaustive_cutpoint(&self, attribute: AttributeIndex) -> (f64, f64) {
        let n_classes = self.n_classes();
        let mut sorted: Vec<(f64, usize)> = self
            .instances
            .iter()
            .map(|i| (i.value(attribute), i.label().index()))
            .collect();
        sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

        let parent = self.local.counts();
        let total = sorted.len();
        let mut left = vec![0usize; n_classes];
        let mut best = (sorted[0].0, 0.0);
        let mut best_gain: Option<f64> = None;

        for (pos, &(value, class)) in sorted.iter().enumerate() {
            left[class] += 1;
            let Some(&(next, _)) = sorted.get(pos + 1) else {
                break;
            };
            if next.total_cmp(&value).is_eq() {
                continue;
            }
            let right: Vec<usize> = parent.iter().zip(&left).map(|(p, l)| p - l).collect();
            let gain = gain_from_counts(parent, &[left.clone(), right], total);
            if best_gain.is_none_or(|g| gain > g) {
                best_gain = Some(gain);
                best = (value, gain);
            }
        }
        best
    }

    /// Binarize `attribute` in place at `cutpoint`.
    ///
    /// Afterwards the attribute's domain is `{0, 1}` and it is no longer
    /// splitable in this dataset.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`Id3Error::UnknownAttribute`] | `attribute` is not eligible |
    /// | [`Id3Error::NotContinuous`] | `attribute` is categorical or already binarized |
    pub fn split_attribute(
        &mut self,
        attribute: AttributeIndex,
        cutpoint: f64,
    ) -> Result<(), Id3Error> {
        self.check_eligible(attribute)?;
        if !self.is_splitable(attribute) {
            return Err(Id3Error::NotContinuous {
                attribute: attribute.index(),
            });
        }
        for instance in &mut self.instances {
            let binary = binarize_value(instance.value(attribute), cutpoint);
            instance.set_value(attribute, binary);
        }
        self.domains.insert(attribute, Domain::binary());
        self.binarized.insert(attribute, cutpoint);
        Ok(())
    }

    /// Partition on `attribute`, one child per domain value in ascending order.
    ///
    /// Children drop `attribute` from eligibility and from the domain table,
    /// recompute their local distribution and monoclass marker, and inherit
    /// the global distribution unchanged. Values with no instances still get
    /// an (empty) child.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`Id3Error::UnknownAttribute`] | `attribute` is not eligible |
    /// | [`Id3Error::ValueOutsideDomain`] | an instance value is missing from the domain |
    pub fn project_attribute(
        &self,
        attribute: AttributeIndex,
    ) -> Result<Vec<(f64, Dataset)>, Id3Error> {
        self.clone().into_projection(attribute)
    }

    /// Consuming form of [`Dataset::project_attribute`]; moves instances
    /// into the children instead of copying them.
    ///
    /// # Errors
    ///
    /// Same as [`Dataset::project_attribute`].
    pub fn into_projection(
        self,
        attribute: AttributeIndex,
    ) -> Result<Vec<(f64, Dataset)>, Id3Error> {
        self.check_eligible(attribute)?;
        let Self {
            schema,
            instances,
            remaining,
            mut domains,
            binarized,
            global,
            ..
        } = self;
        let domain = domains
            .remove(&attribute)
            .ok_or(Id3Error::UnknownAttribute {
                attribute: attribute.index(),
            })?;
        let remaining: Vec<AttributeIndex> =
            remaining.into_iter().filter(|&a| a != attribute).collect();

        let mut buckets: Vec<Vec<Instance>> = vec![Vec::new(); domain.len()];
        for instance in instances {
            let value = instance.value(attribute);
            let slot = domain
                .position(value)
                .ok_or(Id3Error::ValueOutsideDomain {
                    attribute: attribute.index(),
                    value,
                })?;
            buckets[slot].push(instance);
        }

        let n_classes = schema.n_classes();
        let mut children = Vec::with_capacity(domain.len());
        for (&value, bucket) in domain.values().iter().zip(buckets) {
            let local =
                ClassDistribution::from_labels(bucket.iter().map(Instance::label), n_classes)?;
            children.push((
                value,
                Dataset {
                    schema: Arc::clone(&schema),
                    instances: bucket,
                    remaining: remaining.clone(),
                    domains: domains.clone(),
                    binarized: binarized.clone(),
                    monoclass: local.sole_class(),
                    local,
                    global: global.clone(),
                },
            ));
        }
        Ok(children)
    }

    /// Split into `(training, validation)` by sampling without replacement.
    ///
    /// Exactly `round(len * training_fraction)` uniformly drawn instances
    /// go to training; the rest to validation. Both keep this dataset's
    /// schema and domains and get their own global distribution.
    ///
    /// # Errors
    ///
    /// Returns [`Id3Error::InvalidTrainingFraction`] if the fraction is not
    /// a finite value in `[0.0, 1.0]`.
    pub fn divide_corpus<R: Rng + ?Sized>(
        &self,
        training_fraction: f64,
        rng: &mut R,
    ) -> Result<(Dataset, Dataset), Id3Error> {
        if !(0.0..=1.0).contains(&training_fraction) {
            return Err(Id3Error::InvalidTrainingFraction {
                fraction: training_fraction,
            });
        }
        let n_training =
            ((self.instances.len() as f64 * training_fraction).round() as usize)
                .min(self.instances.len());
        let mut pool = self.instances.clone();
        let mut training = Vec::with_capacity(n_training);
        for _ in 0..n_training {
            let pick = rng.gen_range(0..pool.len());
            training.push(pool.swap_remove(pick));
        }
        debug!(
            n_training = training.len(),
            n_validation = pool.len(),
            "divided corpus"
        );
        Ok((self.with_instances(training)?, self.with_instances(pool)?))
    }

    /// Binarize every attribute in `cutpoints` with its learned threshold.
    ///
    /// Attributes already binarized at the same threshold are skipped.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`Id3Error::ConflictingCutpoint`] | an attribute was binarized at another threshold |
    /// | [`Id3Error::NotContinuous`] | a listed attribute is categorical |
    /// | [`Id3Error::UnknownAttribute`] | a listed attribute is not eligible |
    pub fn apply_breakpoints(&mut self, cutpoints: &Cutpoints) -> Result<(), Id3Error> {
        for (attribute, threshold) in cutpoints.iter() {
            if let Some(existing) = self.binarized.get(attribute) {
                if existing.total_cmp(&threshold).is_ne() {
                    return Err(Id3Error::ConflictingCutpoint {
                        attribute: attribute.index(),
                        existing,
                        requested: threshold,
                    });
                }
                continue;
            }
            self.split_attribute(attribute, threshold)?;
        }
        Ok(())
    }

    /// Relabel as the binary problem "`positive`" (1) against the rest (0).
    #[must_use]
    pub fn one_vs_rest(&self, positive: ClassLabel) -> Self {
        let instances: Vec<Instance> = self
            .instances
            .iter()
            .map(|i| {
                let mut relabeled = i.clone();
                relabeled.set_label(ClassLabel::new(usize::from(i.label() == positive)));
                relabeled
            })
            .collect();
        let local = self.local.one_vs_rest(positive);
        Self {
            schema: Arc::new(self.schema.one_vs_rest(positive)),
            instances,
            remaining: self.remaining.clone(),
            domains: self.domains.clone(),
            binarized: self.binarized.clone(),
            monoclass: local.sole_class(),
            global: self.global.one_vs_rest(positive),
            local,
        }
    }

    fn check_eligible(&self, attribute: AttributeIndex) -> Result<(), Id3Error> {
        if self.domains.contains_key(&attribute) {
            Ok(())
        } else {
            Err(Id3Error::UnknownAttribute {
                attribute: attribute.index(),
            })
        }
    }
}

fn validate_instances(schema: &Schema, instances: &[Instance]) -> Result<(), Id3Error> {
    let expected = schema.n_attributes();
    let n_classes = schema.n_classes();
    for (instance_index, instance) in instances.iter().enumerate() {
        if instance.n_attributes() != expected {
            return Err(Id3Error::AttributeCountMismatch {
                expected,
                got: instance.n_attributes(),
                instance_index,
            });
        }
        if let Some(attribute_index) = instance.values().iter().position(|v| !v.is_finite()) {
            return Err(Id3Error::NonFiniteValue {
                instance_index,
                attribute_index,
            });
        }
        let class = instance.label().index();
        if class >= n_classes {
            return Err(Id3Error::ClassOutOfRange { class, n_classes });
        }
    }
    Ok(())
}
