use std::fmt;

/// Zero-based attribute column index.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct AttributeIndex(usize);

impl AttributeIndex {
    /// Create a new attribute index from a zero-based column position.
    #[must_use]
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based attribute column index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for AttributeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Zero-based class label.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct ClassLabel(usize);

impl ClassLabel {
    /// Create a new class label from a zero-based class position.
    #[must_use]
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based class index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index into a `Vec<Node>` arena, identifying a specific node in a decision tree.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct NodeIndex(usize);

impl NodeIndex {
    /// Create a new node index from a zero-based arena position.
    #[must_use]
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Path identifier of the root node.
pub const ROOT_PATH: &str = "Attribute None = None,";

/// Render an attribute value the way it appears in path identifiers.
///
/// Uses the shortest representation that parses back to the same `f64`,
/// so integral codes print without a fractional part (`1`, not `1.0`).
#[must_use]
pub fn format_value(value: f64) -> String {
    format!("{value}")
}

/// Render one `attribute = value` decision as a path segment.
#[must_use]
pub fn path_segment(attribute: AttributeIndex, value: f64) -> String {
    format!("Attribute {attribute} = {},", format_value(value))
}

/// One outgoing edge of an internal node.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Branch {
    /// Attribute value that routes an instance down this edge.
    pub value: f64,
    /// Arena index of the child node.
    pub child: NodeIndex,
}

/// A node in a decision tree arena.
///
/// Trees are stored as `Vec<Node>` where children are referenced by
/// [`NodeIndex`] rather than pointers.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Node {
    /// An interior decision node.
    Internal {
        /// Attribute this node decides on.
        attribute: AttributeIndex,
        /// One branch per value of the attribute's domain at split time.
        branches: Vec<Branch>,
    },
    /// A terminal class node.
    Leaf {
        /// Predicted class.
        class: ClassLabel,
        /// Number of training instances that reached this leaf.
        n_instances: usize,
    },
}

impl Node {
    /// Return `true` if this node is a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    /// Return the outgoing branches (empty for leaves).
    #[must_use]
    pub fn branches(&self) -> &[Branch] {
        match self {
            Node::Internal { branches, .. } => branches,
            Node::Leaf { .. } => &[],
        }
    }

    /// Find the child reached by `value`, if this node has such a branch.
    #[must_use]
    pub fn child_for(&self, value: f64) -> Option<NodeIndex> {
        self.branches()
            .iter()
            .find(|b| b.value.total_cmp(&value).is_eq())
            .map(|b| b.child)
    }

    /// Return the display tag: `Attribute <a>` or `Class <c>,Instances <n>`.
    #[must_use]
    pub fn tag(&self) -> String {
        match self {
            Node::Internal { attribute, .. } => format!("Attribute {attribute}"),
            Node::Leaf { class, n_instances } => leaf_tag(*class, *n_instances),
        }
    }
}

/// Render a leaf tag: `Class <c>,Instances <n>`.
#[must_use]
pub fn leaf_tag(class: ClassLabel, n_instances: usize) -> String {
    format!("Class {class},Instances {n_instances}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_index_roundtrip() {
        assert_eq!(AttributeIndex::new(7).index(), 7);
    }

    #[test]
    fn class_label_display() {
        assert_eq!(format!("{}", ClassLabel::new(3)), "3");
    }

    #[test]
    fn node_index_ordering() {
        assert!(NodeIndex::new(10) < NodeIndex::new(20));
    }

    #[test]
    fn integral_values_format_without_fraction() {
        assert_eq!(format_value(1.0), "1");
        assert_eq!(format_value(2.45), "2.45");
    }

    #[test]
    fn path_segment_format() {
        assert_eq!(path_segment(AttributeIndex::new(2), 0.0), "Attribute 2 = 0,");
    }

    fn make_internal() -> Node {
        Node::Internal {
            attribute: AttributeIndex::new(1),
            branches: vec![
                Branch { value: 0.0, child: NodeIndex::new(1) },
                Branch { value: 1.0, child: NodeIndex::new(2) },
            ],
        }
    }

    #[test]
    fn leaf_tag_format() {
        let leaf = Node::Leaf { class: ClassLabel::new(2), n_instances: 14 };
        assert_eq!(leaf.tag(), "Class 2,Instances 14");
        assert!(leaf.is_leaf());
    }

    #[test]
    fn internal_tag_format() {
        assert_eq!(make_internal().tag(), "Attribute 1");
        assert!(!make_internal().is_leaf());
    }

    #[test]
    fn child_lookup_by_value() {
        let node = make_internal();
        assert_eq!(node.child_for(1.0), Some(NodeIndex::new(2)));
        assert_eq!(node.child_for(3.0), None);
    }
}
