//! JSON persistence for decision trees.
//!
//! Each node is a one-entry object keyed by its path identifier:
//!
//! ```text
//! {"Attribute None = None,": {"tag": "Attribute 2", "children": [
//!     {"Attribute None = None,Attribute 2 = 0,": {"tag": "Class 0,Instances 50"}},
//!     ...
//! ]}}
//! ```
//!
//! Parent/child structure is carried by nesting and by the path strings;
//! a child's branch value is the last `Attribute <a> = <v>,` segment of its
//! path.

use std::fs;
use std::path::Path;

use quercus_id3::{
    AttributeIndex, AttributeKind, Branch, ClassDistribution, ClassLabel, Cutpoints, DecisionTree,
    Node, NodeIndex, ROOT_PATH, Schema, TrainedTree,
};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::IoError;

const TAG: &str = "tag";
const CHILDREN: &str = "children";

/// Encode `tree` as a nested JSON document.
#[must_use]
pub fn tree_to_json(tree: &DecisionTree) -> Value {
    encode_node(tree, tree.root())
}

fn encode_node(tree: &DecisionTree, idx: NodeIndex) -> Value {
    let mut body = Map::new();
    if let Some(node) = tree.node(idx) {
        body.insert(TAG.into(), Value::String(node.tag()));
        if !node.is_leaf() {
            let children = node
                .branches()
                .iter()
                .map(|b| encode_node(tree, b.child))
                .collect();
            body.insert(CHILDREN.into(), Value::Array(children));
        }
    }
    let mut wrapper = Map::new();
    wrapper.insert(tree.path_of(idx), Value::Object(body));
    Value::Object(wrapper)
}

/// Decode a document produced by [`tree_to_json`] and validate the result.
///
/// `origin` names the source in error messages.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::TreeFormat`] | the document shape, a path or a tag is malformed |
/// | [`IoError::Id3`] | the decoded arena fails structural validation |
pub fn tree_from_json(value: &Value, origin: &Path) -> Result<DecisionTree, IoError> {
    let mut decoder = Decoder {
        origin,
        nodes: Vec::new(),
    };
    decoder.decode(value, None)?;
    Ok(DecisionTree::from_nodes(decoder.nodes)?)
}

/// Write `tree` as pretty-printed JSON.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::Json`] | encoding failed |
/// | [`IoError::WriteFile`] | the file cannot be written |
#[instrument(skip(tree), fields(path = %path.display(), n_nodes = tree.n_nodes()))]
pub fn write_tree(path: &Path, tree: &DecisionTree) -> Result<(), IoError> {
    let json = serde_json::to_string_pretty(&tree_to_json(tree)).map_err(|e| IoError::Json {
        path: path.to_path_buf(),
        source: e,
    })?;
    fs::write(path, json).map_err(|e| IoError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    debug!("tree written");
    Ok(())
}

/// Read a tree written by [`write_tree`].
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | file doesn't exist or is unreadable |
/// | [`IoError::Json`] | the file is not JSON |
/// | Other errors | From [`tree_from_json`] |
#[instrument(fields(path = %path.display()))]
pub fn read_tree(path: &Path) -> Result<DecisionTree, IoError> {
    let text = fs::read_to_string(path).map_err(|e| IoError::FileNotFound {
        path: path.to_path_buf(),
        source: e,
    })?;
    let value: Value = serde_json::from_str(&text).map_err(|e| IoError::Json {
        path: path.to_path_buf(),
        source: e,
    })?;
    let tree = tree_from_json(&value, path)?;
    debug!(n_nodes = tree.n_nodes(), "tree read");
    Ok(tree)
}

enum Tag {
    Attribute(AttributeIndex),
    Leaf(ClassLabel, usize),
}

struct Decoder<'a> {
    origin: &'a Path,
    nodes: Vec<Node>,
}

impl Decoder<'_> {
    fn fail(&self, reason: impl Into<String>) -> IoError {
        IoError::TreeFormat {
            path: self.origin.to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Decode one node in preorder. Returns its index and, for non-root
    /// nodes, the branch value taken from its path.
    fn decode(
        &mut self,
        value: &Value,
        parent: Option<(&str, AttributeIndex)>,
    ) -> Result<(NodeIndex, Option<f64>), IoError> {
        let entry = value
            .as_object()
            .filter(|obj| obj.len() == 1)
            .and_then(|obj| obj.iter().next())
            .ok_or_else(|| self.fail("node must be an object with exactly one key"))?;
        let (path, body) = (entry.0.as_str(), entry.1);

        let edge_value = match parent {
            None if path == ROOT_PATH => None,
            None => return Err(self.fail(format!("root path is \"{path}\""))),
            Some((parent_path, attribute)) => {
                let segment = path
                    .strip_prefix(parent_path)
                    .ok_or_else(|| self.fail(format!("\"{path}\" does not extend \"{parent_path}\"")))?;
                Some(self.parse_segment(segment, attribute)?)
            }
        };

        let tag = body
            .get(TAG)
            .and_then(Value::as_str)
            .ok_or_else(|| self.fail(format!("node \"{path}\" has no tag")))?;
        let children = body.get(CHILDREN).map(|c| {
            c.as_array()
                .ok_or_else(|| self.fail(format!("children of \"{path}\" is not an array")))
        });

        let idx = NodeIndex::new(self.nodes.len());
        // Placeholder; overwritten once the children are decoded.
        self.nodes.push(Node::Leaf {
            class: ClassLabel::new(0),
            n_instances: 0,
        });

        let node = match self.parse_tag(tag)? {
            Tag::Leaf(class, n_instances) => {
                if children.transpose()?.is_some_and(|c| !c.is_empty()) {
                    return Err(self.fail(format!("leaf \"{path}\" has children")));
                }
                Node::Leaf { class, n_instances }
            }
            Tag::Attribute(attribute) => {
                let children = children
                    .transpose()?
                    .ok_or_else(|| self.fail(format!("internal node \"{path}\" has no children")))?;
                let mut branches = Vec::with_capacity(children.len());
                for child in children {
                    let (child_idx, branch_value) = self.decode(child, Some((path, attribute)))?;
                    let value = branch_value
                        .ok_or_else(|| self.fail("child decoded without a branch value"))?;
                    branches.push(Branch {
                        value,
                        child: child_idx,
                    });
                }
                Node::Internal {
                    attribute,
                    branches,
                }
            }
        };
        self.nodes[idx.index()] = node;
        Ok((idx, edge_value))
    }

    fn parse_segment(&self, segment: &str, attribute: AttributeIndex) -> Result<f64, IoError> {
        let (a, v) = segment
            .strip_prefix("Attribute ")
            .and_then(|s| s.strip_suffix(','))
            .and_then(|s| s.split_once(" = "))
            .ok_or_else(|| self.fail(format!("bad path segment \"{segment}\"")))?;
        if a.parse::<usize>().ok() != Some(attribute.index()) {
            return Err(self.fail(format!(
                "segment \"{segment}\" does not test attribute {attribute}"
            )));
        }
        v.parse::<f64>()
            .ok()
            .filter(|x| x.is_finite())
            .ok_or_else(|| self.fail(format!("bad branch value in \"{segment}\"")))
    }

    fn parse_tag(&self, tag: &str) -> Result<Tag, IoError> {
        if let Some(a) = tag.strip_prefix("Attribute ") {
            let a: usize = a
                .parse()
                .map_err(|_| self.fail(format!("bad attribute tag \"{tag}\"")))?;
            return Ok(Tag::Attribute(AttributeIndex::new(a)));
        }
        let (class, n) = tag
            .strip_prefix("Class ")
            .and_then(|s| s.split_once(",Instances "))
            .ok_or_else(|| self.fail(format!("unrecognised tag \"{tag}\"")))?;
        match (class.parse::<usize>(), n.parse::<usize>()) {
            (Ok(class), Ok(n)) => Ok(Tag::Leaf(ClassLabel::new(class), n)),
            _ => Err(self.fail(format!("bad leaf tag \"{tag}\""))),
        }
    }
}

/// Pair a decoded tree with its cutpoint table and fallback distribution.
///
/// Every node on a continuous attribute of `schema` must have a cutpoint,
/// and every node on a binarized attribute must branch on both `0` and `1`.
///
/// # Errors
///
/// Returns [`IoError::TreeFormat`] naming `origin` when either check fails
/// or a node tests an attribute outside `schema`.
pub(crate) fn bind_tree(
    tree: DecisionTree,
    cutpoints: Cutpoints,
    distribution: ClassDistribution,
    schema: &Schema,
    origin: &Path,
) -> Result<TrainedTree, IoError> {
    let fail = |reason: String| IoError::TreeFormat {
        path: origin.to_path_buf(),
        reason,
    };
    for node in tree.nodes() {
        let Node::Internal { attribute, .. } = node else {
            continue;
        };
        match schema.kind(*attribute) {
            None => {
                return Err(fail(format!(
                    "attribute {attribute} is outside the {}-attribute schema",
                    schema.n_attributes()
                )));
            }
            Some(AttributeKind::Continuous) if !cutpoints.contains(*attribute) => {
                return Err(fail(format!(
                    "continuous attribute {attribute} is tested without a cutpoint"
                )));
            }
            Some(_) => {}
        }
    }
    TrainedTree::new(tree, cutpoints, distribution).map_err(|e| fail(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quercus_id3::{AttributeKind, Dataset, Id3Config, Instance, Schema};
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn leaf(class: usize, n: usize) -> Node {
        Node::Leaf {
            class: ClassLabel::new(class),
            n_instances: n,
        }
    }

    fn two_level_tree() -> DecisionTree {
        DecisionTree::from_nodes(vec![
            Node::Internal {
                attribute: AttributeIndex::new(1),
                branches: vec![
                    Branch { value: 0.0, child: NodeIndex::new(1) },
                    Branch { value: 1.0, child: NodeIndex::new(2) },
                ],
            },
            leaf(0, 4),
            Node::Internal {
                attribute: AttributeIndex::new(0),
                branches: vec![
                    Branch { value: 2.0, child: NodeIndex::new(3) },
                    Branch { value: 5.0, child: NodeIndex::new(4) },
                ],
            },
            leaf(1, 3),
            leaf(2, 0),
        ])
        .unwrap()
    }

    #[test]
    fn encodes_paths_and_tags() {
        let value = tree_to_json(&two_level_tree());
        let root = &value[ROOT_PATH];
        assert_eq!(root["tag"], "Attribute 1");
        let second = &root["children"][1]["Attribute None = None,Attribute 1 = 1,"];
        assert_eq!(second["tag"], "Attribute 0");
        let deepest =
            &second["children"][0]["Attribute None = None,Attribute 1 = 1,Attribute 0 = 2,"];
        assert_eq!(deepest["tag"], "Class 1,Instances 3");
        assert!(deepest.get("children").is_none());
    }

    #[test]
    fn round_trip_reproduces_tree() {
        let tree = two_level_tree();
        let back = tree_from_json(&tree_to_json(&tree), Path::new("mem")).unwrap();
        assert_eq!(back, tree);
    }

    #[test]
    fn round_trip_induced_tree_through_file() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let schema = Arc::new(
            Schema::new(
                vec!["x".into(), "y".into(), "k".into()],
                vec![
                    AttributeKind::Continuous,
                    AttributeKind::Continuous,
                    AttributeKind::Categorical,
                ],
                vec!["a".into(), "b".into(), "c".into()],
            )
            .unwrap(),
        );
        let instances = (0..90)
            .map(|i| {
                let class = i % 3;
                let values = vec![
                    class as f64 + rng.r#gen::<f64>(),
                    rng.r#gen::<f64>() * 4.0,
                    rng.gen_range(0..3) as f64,
                ];
                Instance::new(values, ClassLabel::new(class))
            })
            .collect();
        let data = Dataset::new(schema, instances).unwrap();
        let trained = Id3Config::new().fit(&data).unwrap();

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("classifier0.json");
        write_tree(&path, trained.tree()).unwrap();
        let back = read_tree(&path).unwrap();
        assert_eq!(&back, trained.tree());
        for idx in 0..back.n_nodes() {
            let idx = NodeIndex::new(idx);
            assert_eq!(back.path_of(idx), trained.tree().path_of(idx));
        }
    }

    #[test]
    fn wrong_root_path_rejected() {
        let doc = json!({"Attribute 0 = 1,": {"tag": "Class 0,Instances 1"}});
        let err = tree_from_json(&doc, Path::new("mem")).unwrap_err();
        assert!(matches!(err, IoError::TreeFormat { .. }));
    }

    #[test]
    fn child_path_must_extend_parent() {
        let doc = json!({ROOT_PATH: {"tag": "Attribute 0", "children": [
            {"Attribute 0 = 1,": {"tag": "Class 0,Instances 1"}}
        ]}});
        assert!(matches!(
            tree_from_json(&doc, Path::new("mem")),
            Err(IoError::TreeFormat { .. })
        ));
    }

    #[test]
    fn child_segment_must_test_parent_attribute() {
        let doc = json!({ROOT_PATH: {"tag": "Attribute 0", "children": [
            {"Attribute None = None,Attribute 3 = 1,": {"tag": "Class 0,Instances 1"}}
        ]}});
        assert!(matches!(
            tree_from_json(&doc, Path::new("mem")),
            Err(IoError::TreeFormat { .. })
        ));
    }

    #[test]
    fn duplicate_branch_values_fail_validation() {
        let doc = json!({ROOT_PATH: {"tag": "Attribute 0", "children": [
            {"Attribute None = None,Attribute 0 = 1,": {"tag": "Class 0,Instances 1"}},
            {"Attribute None = None,Attribute 0 = 1,": {"tag": "Class 1,Instances 1"}}
        ]}});
        assert!(matches!(
            tree_from_json(&doc, Path::new("mem")),
            Err(IoError::Id3(quercus_id3::Id3Error::StructuralInconsistency { .. }))
        ));
    }

    #[test]
    fn bad_tag_rejected() {
        let doc = json!({ROOT_PATH: {"tag": "Leaf 0"}});
        assert!(matches!(
            tree_from_json(&doc, Path::new("mem")),
            Err(IoError::TreeFormat { .. })
        ));
    }

    fn continuous_schema(n_attributes: usize) -> Schema {
        Schema::new(
            (0..n_attributes).map(|i| format!("a{i}")).collect(),
            vec![AttributeKind::Continuous; n_attributes],
            vec!["no".to_string(), "yes".to_string()],
        )
        .unwrap()
    }

    #[test]
    fn binarized_node_missing_a_sibling_is_rejected() {
        let doc = json!({ROOT_PATH: {"tag": "Attribute 0", "children": [
            {"Attribute None = None,Attribute 0 = 0,": {"tag": "Class 0,Instances 5"}}
        ]}});
        let tree = tree_from_json(&doc, Path::new("mem")).unwrap();
        let mut cutpoints = Cutpoints::new();
        cutpoints.insert(AttributeIndex::new(0), 2.0);
        let err = bind_tree(
            tree,
            cutpoints,
            ClassDistribution::from_counts(vec![5, 3]),
            &continuous_schema(1),
            Path::new("mem"),
        )
        .unwrap_err();
        assert!(matches!(err, IoError::TreeFormat { .. }), "{err}");
    }

    #[test]
    fn continuous_node_without_cutpoint_is_rejected() {
        let doc = json!({ROOT_PATH: {"tag": "Attribute 0", "children": [
            {"Attribute None = None,Attribute 0 = 0,": {"tag": "Class 0,Instances 5"}},
            {"Attribute None = None,Attribute 0 = 1,": {"tag": "Class 1,Instances 3"}}
        ]}});
        let tree = tree_from_json(&doc, Path::new("mem")).unwrap();
        let err = bind_tree(
            tree,
            Cutpoints::new(),
            ClassDistribution::from_counts(vec![5, 3]),
            &continuous_schema(1),
            Path::new("mem"),
        )
        .unwrap_err();
        assert!(matches!(err, IoError::TreeFormat { .. }));
    }

    #[test]
    fn attribute_outside_schema_is_rejected() {
        let doc = json!({ROOT_PATH: {"tag": "Attribute 4", "children": [
            {"Attribute None = None,Attribute 4 = 0,": {"tag": "Class 0,Instances 5"}},
            {"Attribute None = None,Attribute 4 = 1,": {"tag": "Class 1,Instances 3"}}
        ]}});
        let tree = tree_from_json(&doc, Path::new("mem")).unwrap();
        let mut cutpoints = Cutpoints::new();
        cutpoints.insert(AttributeIndex::new(4), 1.5);
        assert!(matches!(
            bind_tree(
                tree,
                cutpoints,
                ClassDistribution::from_counts(vec![5, 3]),
                &continuous_schema(2),
                Path::new("mem"),
            ),
            Err(IoError::TreeFormat { .. })
        ));
    }

    #[test]
    fn complete_binarized_tree_binds() {
        let doc = json!({ROOT_PATH: {"tag": "Attribute 0", "children": [
            {"Attribute None = None,Attribute 0 = 0,": {"tag": "Class 0,Instances 5"}},
            {"Attribute None = None,Attribute 0 = 1,": {"tag": "Class 1,Instances 3"}}
        ]}});
        let tree = tree_from_json(&doc, Path::new("mem")).unwrap();
        let mut cutpoints = Cutpoints::new();
        cutpoints.insert(AttributeIndex::new(0), 2.0);
        let member = bind_tree(
            tree,
            cutpoints,
            ClassDistribution::from_counts(vec![5, 3]),
            &continuous_schema(1),
            Path::new("mem"),
        )
        .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let tag = member.classify(&[9.0], &Cutpoints::new(), &mut rng).unwrap();
        assert_eq!(tag.class, ClassLabel::new(1));
        assert!(!tag.fallback);
    }
}
