use std::collections::VecDeque;

use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::{
    Id3Error,
    config::Id3Config,
    cutpoints::Cutpoints,
    dataset::Dataset,
    entropy::information_gain,
    model::TrainedTree,
    node::{AttributeIndex, Branch, ClassLabel, Node, NodeIndex, ROOT_PATH, path_segment},
};

/// Gains closer than this to the maximum count as ties.
const GAIN_TIE_TOLERANCE: f64 = 1e-12;

/// Induce a tree and its cutpoint table from `data`.
#[instrument(skip_all, fields(n_instances = data.len(), n_attributes = data.remaining().len()))]
pub(crate) fn induce(
    config: &Id3Config,
    data: Dataset,
    rng: &mut ChaCha8Rng,
) -> Result<TrainedTree, Id3Error> {
    config.validate()?;
    if data.is_empty() {
        return Err(Id3Error::EmptyDataset);
    }

    let distribution = data.global_distribution().clone();
    let mut builder = TreeBuilder {
        config,
        rng,
        nodes: Vec::new(),
        cutpoints: Cutpoints::new(),
    };
    builder.grow(data, 0)?;
    let TreeBuilder {
        nodes, cutpoints, ..
    } = builder;

    let tree = DecisionTree::from_nodes(nodes)?;
    debug!(
        n_nodes = tree.n_nodes(),
        n_leaves = tree.n_leaves(),
        depth = tree.depth(),
        n_cutpoints = cutpoints.len(),
        "decision tree built"
    );
    TrainedTree::new(tree, cutpoints, distribution)
}

/// Recursive state shared by every call of one induction run.
struct TreeBuilder<'a> {
    config: &'a Id3Config,
    rng: &'a mut ChaCha8Rng,
    nodes: Vec<Node>,
    cutpoints: Cutpoints,
}

/// Scored split candidate: attribute, gain, cutpoint for continuous attributes.
struct Candidate {
    attribute: AttributeIndex,
    gain: f64,
    cutpoint: Option<f64>,
}

impl TreeBuilder<'_> {
    fn push_leaf(&mut self, class: ClassLabel, n_instances: usize) -> NodeIndex {
        let idx = self.nodes.len();
        self.nodes.push(Node::Leaf { class, n_instances });
        NodeIndex::new(idx)
    }

    /// Leaf drawn from the inherited global distribution; reached by no instance.
    fn global_leaf(&mut self, data: &Dataset) -> Result<NodeIndex, Id3Error> {
        let class = data.global_distribution().sample(&mut *self.rng)?;
        Ok(self.push_leaf(class, 0))
    }

    fn grow(&mut self, data: Dataset, depth: usize) -> Result<NodeIndex, Id3Error> {
        if self.config.max_depth.is_some_and(|m| depth >= m) {
            let distribution = if data.local_distribution().is_empty() {
                data.global_distribution()
            } else {
                data.local_distribution()
            };
            let class = distribution.sample(&mut *self.rng)?;
            return Ok(self.push_leaf(class, data.len()));
        }

        if let Some(class) = data.monoclass() {
            return Ok(self.push_leaf(class, data.len()));
        }

        if data.remaining().is_empty() {
            if data.is_empty() {
                return self.global_leaf(&data);
            }
            let class = data.local_distribution().sample(&mut *self.rng)?;
            return Ok(self.push_leaf(class, data.len()));
        }

        if data.is_empty() {
            return self.global_leaf(&data);
        }

        let chosen = self.choose_split(&data)?;
        debug!(
            depth,
            attribute = chosen.attribute.index(),
            gain = chosen.gain,
            cutpoint = ?chosen.cutpoint,
            n_instances = data.len(),
            "splitting"
        );

        // Reserve the slot so children can be pushed after it.
        let node_idx = self.nodes.len();
        self.nodes.push(Node::Leaf {
            class: ClassLabel::new(0),
            n_instances: data.len(),
        });

        let mut data = data;
        if let Some(cutpoint) = chosen.cutpoint {
            data.split_attribute(chosen.attribute, cutpoint)?;
            self.cutpoints.insert(chosen.attribute, cutpoint);
        }

        let children = data.into_projection(chosen.attribute)?;
        let mut branches = Vec::with_capacity(children.len());
        for (value, child) in children {
            let child_idx = if child.is_empty() {
                self.global_leaf(&child)?
            } else {
                self.grow(child, depth + 1)?
            };
            branches.push(Branch {
                value,
                child: child_idx,
            });
        }

        self.nodes[node_idx] = Node::Internal {
            attribute: chosen.attribute,
            branches,
        };
        Ok(NodeIndex::new(node_idx))
    }

    /// Score every remaining attribute and pick the best, breaking ties at random.
    fn choose_split(&mut self, data: &Dataset) -> Result<Candidate, Id3Error> {
        let n_classes = data.n_classes();
        let mut scored = Vec::with_capacity(data.remaining().len());

        for &attribute in data.remaining() {
            let candidate = if data.is_splitable(attribute) {
                let (cutpoint, gain) = match self.cutpoints.get(attribute) {
                    Some(t) => (
                        t,
                        information_gain(data.instances(), attribute, &[t], n_classes)?,
                    ),
                    None => data.best_cutting_value(
                        attribute,
                        self.config.cutpoint_search,
                        &mut *self.rng,
                    )?,
                };
                Candidate {
                    attribute,
                    gain,
                    cutpoint: Some(cutpoint),
                }
            } else {
                let domain = data.domain(attribute).ok_or(Id3Error::UnknownAttribute {
                    attribute: attribute.index(),
                })?;
                Candidate {
                    attribute,
                    gain: information_gain(
                        data.instances(),
                        attribute,
                        domain.values(),
                        n_classes,
                    )?,
                    cutpoint: None,
                }
            };
            scored.push(candidate);
        }

        let best = scored
            .iter()
            .map(|c| c.gain)
            .fold(f64::NEG_INFINITY, f64::max);
        let tied: Vec<usize> = scored
            .iter()
            .enumerate()
            .filter(|(_, c)| c.gain >= best - GAIN_TIE_TOLERANCE)
            .map(|(i, _)| i)
            .collect();
        let pick = *tied
            .choose(&mut *self.rng)
            .ok_or_else(|| Id3Error::InvalidArgument {
                reason: "no attribute could be scored".to_string(),
            })?;
        Ok(scored.swap_remove(pick))
    }
}

/// An induced ID3 decision tree.
///
/// Stored as an arena `Vec<Node>` rooted at index 0, with the parent of
/// every node kept alongside. Path identifiers are derived on demand.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) parents: Vec<Option<NodeIndex>>,
}

impl DecisionTree {
    /// Build a tree from an arena, deriving parent links and validating it.
    ///
    /// # Errors
    ///
    /// Returns [`Id3Error::StructuralInconsistency`] if the arena is not a
    /// well-formed tree rooted at index 0 (see [`DecisionTree::validate`]).
    pub fn from_nodes(nodes: Vec<Node>) -> Result<Self, Id3Error> {
        let mut parents = vec![None; nodes.len()];
        for (idx, node) in nodes.iter().enumerate() {
            for branch in node.branches() {
                let slot =
                    parents
                        .get_mut(branch.child.index())
                        .ok_or_else(|| Id3Error::StructuralInconsistency {
                            node: idx,
                            reason: format!("branch points at missing node {}", branch.child),
                        })?;
                if branch.child.index() == 0 {
                    return Err(Id3Error::StructuralInconsistency {
                        node: idx,
                        reason: "branch points back at the root".to_string(),
                    });
                }
                if slot.is_some() {
                    return Err(Id3Error::StructuralInconsistency {
                        node: branch.child.index(),
                        reason: "node has more than one parent".to_string(),
                    });
                }
                *slot = Some(NodeIndex::new(idx));
            }
        }
        let tree = Self { nodes, parents };
        tree.validate()?;
        Ok(tree)
    }

    /// Check the arena invariants.
    ///
    /// - the arena is non-empty and the root has no parent
    /// - every internal node has at least one branch, with distinct values
    /// - every branch points at an existing node whose parent is this node
    /// - every node is reachable from the root exactly once
    ///
    /// # Errors
    ///
    /// Returns [`Id3Error::StructuralInconsistency`] naming the first
    /// offending node.
    pub fn validate(&self) -> Result<(), Id3Error> {
        let fail = |node: usize, reason: &str| Id3Error::StructuralInconsistency {
            node,
            reason: reason.to_string(),
        };
        if self.nodes.is_empty() {
            return Err(fail(0, "tree has no nodes"));
        }
        if self.parents.len() != self.nodes.len() {
            return Err(fail(0, "parent table does not match arena"));
        }
        if self.parents[0].is_some() {
            return Err(fail(0, "root has a parent"));
        }

        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![0usize];
        while let Some(idx) = stack.pop() {
            if std::mem::replace(&mut seen[idx], true) {
                return Err(fail(idx, "node reached more than once"));
            }
            if let Node::Internal { branches, .. } = &self.nodes[idx] {
                if branches.is_empty() {
                    return Err(fail(idx, "internal node has no branches"));
                }
                for (i, branch) in branches.iter().enumerate() {
                    if branches[..i]
                        .iter()
                        .any(|b| b.value.total_cmp(&branch.value).is_eq())
                    {
                        return Err(fail(idx, "duplicate branch value"));
                    }
                    let child = branch.child.index();
                    if child >= self.nodes.len() {
                        return Err(fail(idx, "branch points at missing node"));
                    }
                    if self.parents[child] != Some(NodeIndex::new(idx)) {
                        return Err(fail(child, "parent link does not match branch"));
                    }
                    stack.push(child);
                }
            }
        }
        if let Some(orphan) = seen.iter().position(|&s| !s) {
            return Err(fail(orphan, "node is unreachable from the root"));
        }
        Ok(())
    }

    /// Check that every node testing an attribute in `cutpoints` branches
    /// on exactly the binary domain `{0, 1}`.
    ///
    /// # Errors
    ///
    /// Returns [`Id3Error::StructuralInconsistency`] naming the first node
    /// with a missing or extra branch.
    pub fn check_cutpoints(&self, cutpoints: &Cutpoints) -> Result<(), Id3Error> {
        for (idx, node) in self.nodes.iter().enumerate() {
            let Node::Internal {
                attribute,
                branches,
            } = node
            else {
                continue;
            };
            if !cutpoints.contains(*attribute) {
                continue;
            }
            let mut values: Vec<f64> = branches.iter().map(|b| b.value).collect();
            values.sort_by(f64::total_cmp);
            if values != [0.0, 1.0] {
                return Err(Id3Error::StructuralInconsistency {
                    node: idx,
                    reason: format!(
                        "binarized attribute {attribute} has branches {values:?}, expected [0.0, 1.0]"
                    ),
                });
            }
        }
        Ok(())
    }

    /// Return the root index.
    #[must_use]
    pub fn root(&self) -> NodeIndex {
        NodeIndex::new(0)
    }

    /// Return the node at `idx`.
    #[must_use]
    pub fn node(&self, idx: NodeIndex) -> Option<&Node> {
        self.nodes.get(idx.index())
    }

    /// Return the arena.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Return the parent of `idx` (`None` for the root).
    #[must_use]
    pub fn parent(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.parents.get(idx.index()).copied().flatten()
    }

    /// Return the total number of nodes.
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaves.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the maximum depth. A single leaf has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut max_depth = 0usize;
        let mut queue = VecDeque::from([(0usize, 0usize)]);
        while let Some((idx, d)) = queue.pop_front() {
            max_depth = max_depth.max(d);
            for branch in self.nodes[idx].branches() {
                queue.push_back((branch.child.index(), d + 1));
            }
        }
        max_depth
    }

    /// Smallest row width the tree can read (highest tested attribute + 1).
    #[must_use]
    pub fn required_width(&self) -> usize {
        self.nodes
            .iter()
            .filter_map(|n| match n {
                Node::Internal { attribute, .. } => Some(attribute.index() + 1),
                Node::Leaf { .. } => None,
            })
            .max()
            .unwrap_or(0)
    }

    /// The value on the edge from `idx`'s parent to `idx`.
    #[must_use]
    pub fn edge_value(&self, idx: NodeIndex) -> Option<(AttributeIndex, f64)> {
        let parent = self.parent(idx)?;
        match self.node(parent)? {
            Node::Internal {
                attribute,
                branches,
            } => branches
                .iter()
                .find(|b| b.child == idx)
                .map(|b| (*attribute, b.value)),
            Node::Leaf { .. } => None,
        }
    }

    /// Path identifier of `idx`: the root sentinel followed by one
    /// `Attribute <a> = <v>,` segment per edge.
    #[must_use]
    pub fn path_of(&self, idx: NodeIndex) -> String {
        let mut segments = Vec::new();
        let mut current = idx;
        while let Some((attribute, value)) = self.edge_value(current) {
            segments.push(path_segment(attribute, value));
            current = self.parent(current).unwrap_or(current);
        }
        segments.push(ROOT_PATH.to_string());
        segments.reverse();
        segments.concat()
    }

    /// Indented one-line-per-node rendering, children in branch order.
    #[must_use]
    pub fn outline(&self) -> String {
        let mut out = String::new();
        let mut stack = vec![(0usize, 0usize)];
        while let Some((idx, d)) = stack.pop() {
            let node = &self.nodes[idx];
            let edge = match self.edge_value(NodeIndex::new(idx)) {
                Some((a, v)) => format!("a{a} = {}", crate::node::format_value(v)),
                None => "root".to_string(),
            };
            out.push_str(&format!("{}{edge}: {}\n", "  ".repeat(d), node.tag()));
            for branch in node.branches().iter().rev() {
                stack.push((branch.child.index(), d + 1));
            }
        }
        out
    }
}
