//! Binary decision trees in the flat array layout of fitted tree estimators

use super::{check_width, Classifier};
use crate::error::ArtifactError;
use serde::{Deserialize, Serialize};

/// Child index marking a leaf.
pub const TREE_LEAF: i64 = -1;

/// Node arrays of one fitted tree, indexed by node id (root = 0).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeStructure {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    /// Training samples reaching each node; required by isolation trees.
    #[serde(default)]
    pub n_node_samples: Vec<u64>,
}

impl TreeStructure {
    pub fn node_count(&self) -> usize {
        self.children_left.len()
    }

    /// Check array lengths and links. Children must follow their parent,
    /// which is how fitted trees number nodes and guarantees descent ends.
    pub fn validate(&self) -> Result<(), ArtifactError> {
        let n = self.node_count();
        if n == 0 {
            return Err(ArtifactError::Invalid("tree has no nodes".to_string()));
        }
        if self.children_right.len() != n || self.feature.len() != n || self.threshold.len() != n {
            return Err(ArtifactError::Invalid(format!(
                "tree arrays disagree on node count ({n} left children, {} right, {} features, {} thresholds)",
                self.children_right.len(),
                self.feature.len(),
                self.threshold.len()
            )));
        }
        if !self.n_node_samples.is_empty() && self.n_node_samples.len() != n {
            return Err(ArtifactError::Invalid(format!(
                "tree has {n} nodes but {} sample counts",
                self.n_node_samples.len()
            )));
        }

        for node in 0..n {
            let (left, right) = (self.children_left[node], self.children_right[node]);
            match (left == TREE_LEAF, right == TREE_LEAF) {
                (true, true) => continue,
                (false, false) => {}
                _ => {
                    return Err(ArtifactError::Invalid(format!(
                        "node {node} has exactly one child"
                    )))
                }
            }
            for child in [left, right] {
                if child <= node as i64 || child >= n as i64 {
                    return Err(ArtifactError::Invalid(format!(
                        "node {node} links to invalid child {child}"
                    )));
                }
            }
            if self.feature[node] < 0 {
                return Err(ArtifactError::Invalid(format!(
                    "split node {node} has no feature"
                )));
            }
        }
        Ok(())
    }

    /// Highest feature index used by any split.
    pub fn max_feature(&self) -> Option<usize> {
        self.children_left
            .iter()
            .zip(&self.feature)
            .filter(|(&left, _)| left != TREE_LEAF)
            .map(|(_, &f)| f as usize)
            .max()
    }

    /// Walk from the root to a leaf, returning `(leaf, depth)`.
    ///
    /// Fitted trees compare single-precision inputs against their
    /// thresholds, so the row is narrowed the same way.
    pub fn descend(&self, row: &[f64]) -> Result<(usize, usize), ArtifactError> {
        let mut node = 0usize;
        let mut depth = 0usize;

        for _ in 0..self.node_count() {
            let left = *self.children_left.get(node).ok_or_else(|| broken_link(node))?;
            if left == TREE_LEAF {
                return Ok((node, depth));
            }

            let feature = self.feature[node] as usize;
            let value = *row.get(feature).ok_or(ArtifactError::ShapeMismatch {
                expected: feature + 1,
                actual: row.len(),
            })?;

            node = if (value as f32 as f64) <= self.threshold[node] {
                left as usize
            } else {
                self.children_right[node] as usize
            };
            depth += 1;
        }

        Err(broken_link(node))
    }
}

fn broken_link(node: usize) -> ArtifactError {
    ArtifactError::Invalid(format!("tree descent did not terminate at node {node}"))
}

/// Decision tree classifier over encoded classes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTreeModel {
    #[serde(flatten)]
    pub tree: TreeStructure,
    /// Per-node class weights, one column per entry of `classes`
    pub value: Vec<Vec<f64>>,
    /// Encoded class ids, in column order of `value`
    pub classes: Vec<i64>,
    /// Input width the tree was fitted with
    #[serde(default)]
    pub n_features: Option<usize>,
}

impl DecisionTreeModel {
    pub fn validate(&self) -> Result<(), ArtifactError> {
        self.tree.validate()?;
        if self.classes.is_empty() {
            return Err(ArtifactError::Invalid("classifier has no classes".to_string()));
        }
        if self.value.len() != self.tree.node_count() {
            return Err(ArtifactError::Invalid(format!(
                "classifier has {} nodes but {} value rows",
                self.tree.node_count(),
                self.value.len()
            )));
        }
        if let Some(i) = self.value.iter().position(|v| v.len() != self.classes.len()) {
            return Err(ArtifactError::Invalid(format!(
                "value row {i} does not have {} class weights",
                self.classes.len()
            )));
        }
        if let (Some(width), Some(max)) = (self.n_features, self.tree.max_feature()) {
            if max >= width {
                return Err(ArtifactError::Invalid(format!(
                    "split on feature {max} exceeds fitted width {width}"
                )));
            }
        }
        Ok(())
    }
}

impl Classifier for DecisionTreeModel {
    fn n_features(&self) -> Option<usize> {
        self.n_features
    }

    fn predict(&self, row: &[f64]) -> Result<i64, ArtifactError> {
        if let Some(width) = self.n_features {
            check_width(width, row)?;
        }
        let (leaf, _) = self.tree.descend(row)?;
        let weights = self
            .value
            .get(leaf)
            .ok_or_else(|| ArtifactError::Invalid(format!("no class weights for leaf {leaf}")))?;

        // First maximum wins on ties.
        let mut best = 0;
        for (i, w) in weights.iter().enumerate() {
            if *w > weights[best] {
                best = i;
            }
        }
        self.classes
            .get(best)
            .copied()
            .ok_or_else(|| ArtifactError::Invalid(format!("no class for column {best}")))
    }
}
