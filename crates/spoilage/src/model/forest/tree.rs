//! Classification tree storage (SoA) and traversal.
//!
//! A [`DecisionTree`] stores nodes as parallel arrays. Internal nodes route a
//! row left when `row[feature] <= threshold`. Every node carries a class
//! distribution of length `n_classes`; only the one at the reached leaf is
//! used for prediction.

use serde::{Deserialize, Serialize};

/// Node index within a tree. The root is always node 0.
pub type NodeId = u32;

/// Structural validation errors for [`DecisionTree`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TreeValidationError {
    #[error("tree has no nodes")]
    EmptyTree,

    #[error("array {field} has length {len}, expected {expected}")]
    LengthMismatch {
        field: &'static str,
        len: usize,
        expected: usize,
    },

    #[error("node {node}: {side} child {child} out of bounds ({n_nodes} nodes)")]
    ChildOutOfBounds {
        node: NodeId,
        side: &'static str,
        child: NodeId,
        n_nodes: usize,
    },

    #[error("node {node} visited twice")]
    DuplicateVisit { node: NodeId },

    #[error("node {node} is unreachable from the root")]
    UnreachableNode { node: NodeId },

    #[error("node {node}: split feature {feature} out of range ({n_features} features)")]
    FeatureOutOfRange {
        node: NodeId,
        feature: u32,
        n_features: usize,
    },

    #[error("node {node}: invalid threshold or class distribution")]
    InvalidValues { node: NodeId },
}

/// Structure-of-Arrays classification tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    n_classes: usize,
    split_features: Vec<u32>,
    thresholds: Vec<f64>,
    /// Left child per node; 0 marks a leaf (the root is never a child).
    left_children: Vec<NodeId>,
    right_children: Vec<NodeId>,
    /// Row-major `[n_nodes, n_classes]` class probabilities.
    distributions: Vec<f64>,
}

impl DecisionTree {
    /// Empty tree for `n_classes`; nodes are added by the grower.
    pub(crate) fn with_classes(n_classes: usize) -> Self {
        Self {
            n_classes,
            split_features: Vec::new(),
            thresholds: Vec::new(),
            left_children: Vec::new(),
            right_children: Vec::new(),
            distributions: Vec::new(),
        }
    }

    /// Append a leaf node carrying `distribution` and return its id.
    pub(crate) fn push_leaf(&mut self, distribution: &[f64]) -> NodeId {
        debug_assert_eq!(distribution.len(), self.n_classes);
        let id = self.split_features.len() as NodeId;
        self.split_features.push(0);
        self.thresholds.push(0.0);
        self.left_children.push(0);
        self.right_children.push(0);
        self.distributions.extend_from_slice(distribution);
        id
    }

    /// Turn an existing leaf into a split node.
    pub(crate) fn set_split(
        &mut self,
        node: NodeId,
        feature: usize,
        threshold: f64,
        left: NodeId,
        right: NodeId,
    ) {
        let i = node as usize;
        self.split_features[i] = feature as u32;
        self.thresholds[i] = threshold;
        self.left_children[i] = left;
        self.right_children[i] = right;
    }

    pub fn n_nodes(&self) -> usize {
        self.split_features.len()
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    #[inline]
    pub fn is_leaf(&self, node: NodeId) -> bool {
        self.left_children[node as usize] == 0
    }

    pub fn n_leaves(&self) -> usize {
        self.left_children.iter().filter(|&&l| l == 0).count()
    }

    /// Depth of the deepest leaf (a single-leaf tree has depth 0).
    pub fn depth(&self) -> usize {
        if self.n_nodes() == 0 {
            return 0;
        }
        let mut max_depth = 0;
        let mut stack = vec![(0 as NodeId, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            if self.is_leaf(node) {
                max_depth = max_depth.max(depth);
            } else {
                let i = node as usize;
                stack.push((self.left_children[i], depth + 1));
                stack.push((self.right_children[i], depth + 1));
            }
        }
        max_depth
    }

    /// Walk from the root to the leaf reached by `row`.
    #[inline]
    pub fn traverse_to_leaf(&self, row: &[f64]) -> NodeId {
        let mut node: NodeId = 0;
        while !self.is_leaf(node) {
            let i = node as usize;
            let value = row[self.split_features[i] as usize];
            node = if value <= self.thresholds[i] {
                self.left_children[i]
            } else {
                self.right_children[i]
            };
        }
        node
    }

    /// Class distribution stored at `node`.
    #[inline]
    pub fn distribution(&self, node: NodeId) -> &[f64] {
        let start = node as usize * self.n_classes;
        &self.distributions[start..start + self.n_classes]
    }

    /// Class probabilities for one row.
    #[inline]
    pub fn predict_proba_row(&self, row: &[f64]) -> &[f64] {
        self.distribution(self.traverse_to_leaf(row))
    }

    /// Validate structure against the expected feature count.
    ///
    /// Checks that arrays agree in length, every internal node's children
    /// are in bounds, each node is reached exactly once from the root, and
    /// all thresholds and probabilities are finite.
    pub fn validate(&self, n_features: usize) -> Result<(), TreeValidationError> {
        let n_nodes = self.n_nodes();
        if n_nodes == 0 {
            return Err(TreeValidationError::EmptyTree);
        }
        for (field, len) in [
            ("thresholds", self.thresholds.len()),
            ("left_children", self.left_children.len()),
            ("right_children", self.right_children.len()),
        ] {
            if len != n_nodes {
                return Err(TreeValidationError::LengthMismatch {
                    field,
                    len,
                    expected: n_nodes,
                });
            }
        }
        let expected = n_nodes * self.n_classes;
        if self.distributions.len() != expected {
            return Err(TreeValidationError::LengthMismatch {
                field: "distributions",
                len: self.distributions.len(),
                expected,
            });
        }

        let mut visited = vec![false; n_nodes];
        let mut stack: Vec<NodeId> = vec![0];
        while let Some(node) = stack.pop() {
            let i = node as usize;
            if visited[i] {
                return Err(TreeValidationError::DuplicateVisit { node });
            }
            visited[i] = true;

            if self.distribution(node).iter().any(|p| !p.is_finite() || *p < 0.0) {
                return Err(TreeValidationError::InvalidValues { node });
            }
            if self.is_leaf(node) {
                continue;
            }

            let feature = self.split_features[i];
            if feature as usize >= n_features {
                return Err(TreeValidationError::FeatureOutOfRange {
                    node,
                    feature,
                    n_features,
                });
            }
            if !self.thresholds[i].is_finite() {
                return Err(TreeValidationError::InvalidValues { node });
            }
            for (side, child) in [
                ("left", self.left_children[i]),
                ("right", self.right_children[i]),
            ] {
                if child == 0 || child as usize >= n_nodes {
                    return Err(TreeValidationError::ChildOutOfBounds {
                        node,
                        side,
                        child,
                        n_nodes,
                    });
                }
                stack.push(child);
            }
        }

        if let Some(node) = visited.iter().position(|v| !v) {
            return Err(TreeValidationError::UnreachableNode {
                node: node as NodeId,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `x0 <= 0.5 ? [1, 0] : [0, 1]`
    fn stump() -> DecisionTree {
        let mut tree = DecisionTree::with_classes(2);
        let root = tree.push_leaf(&[0.5, 0.5]);
        let left = tree.push_leaf(&[1.0, 0.0]);
        let right = tree.push_leaf(&[0.0, 1.0]);
        tree.set_split(root, 0, 0.5, left, right);
        tree
    }

    #[test]
    fn traversal_uses_less_or_equal() {
        let tree = stump();
        assert_eq!(tree.predict_proba_row(&[0.5]), &[1.0, 0.0]);
        assert_eq!(tree.predict_proba_row(&[0.6]), &[0.0, 1.0]);
        assert_eq!(tree.n_leaves(), 2);
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn validate_accepts_stump() {
        assert!(stump().validate(1).is_ok());
    }

    #[test]
    fn validate_rejects_bad_feature() {
        let mut tree = stump();
        tree.split_features[0] = 3;
        assert!(matches!(
            tree.validate(2),
            Err(TreeValidationError::FeatureOutOfRange { feature: 3, .. })
        ));
    }

    #[test]
    fn validate_rejects_out_of_bounds_child() {
        let mut tree = stump();
        tree.right_children[0] = 9;
        assert!(matches!(
            tree.validate(1),
            Err(TreeValidationError::ChildOutOfBounds { side: "right", .. })
        ));
    }

    #[test]
    fn validate_rejects_shared_child() {
        let mut tree = stump();
        tree.right_children[0] = 1;
        assert!(matches!(
            tree.validate(1),
            Err(TreeValidationError::DuplicateVisit { node: 1 })
        ));
    }

    #[test]
    fn validate_rejects_truncated_distributions() {
        let mut tree = stump();
        tree.distributions.pop();
        assert!(matches!(
            tree.validate(1),
            Err(TreeValidationError::LengthMismatch { field: "distributions", .. })
        ));
    }

    #[test]
    fn validate_rejects_empty() {
        assert_eq!(
            DecisionTree::with_classes(2).validate(1),
            Err(TreeValidationError::EmptyTree)
        );
    }
}
