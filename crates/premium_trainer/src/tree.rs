//! Regression tree representation
//!
//! Nodes live in a flat vector; the root is node 0. A split sends a row left
//! when its value is `<= threshold`, and missing values follow the split's
//! learned default direction.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub feature_index: u32,
    pub threshold: f64,
    pub default_left: bool,
    pub left: u32,
    pub right: u32,
    /// Leaf output, learning rate already applied
    pub value: Option<f64>,
}

impl Node {
    pub fn leaf(value: f64) -> Self {
        Self {
            feature_index: 0,
            threshold: 0.0,
            default_left: false,
            left: 0,
            right: 0,
            value: Some(value),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.value.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    /// Evaluate the tree on one row of raw feature values
    pub fn predict_row(&self, features: &[f64]) -> f64 {
        let mut idx = 0usize;

        loop {
            let Some(node) = self.nodes.get(idx) else {
                return 0.0;
            };

            if let Some(value) = node.value {
                return value;
            }

            let Some(&x) = features.get(node.feature_index as usize) else {
                return 0.0;
            };

            let go_left = if x.is_nan() {
                node.default_left
            } else {
                x <= node.threshold
            };
            idx = if go_left {
                node.left as usize
            } else {
                node.right as usize
            };
        }
    }

    /// Add this tree's split count per feature to `counts`
    pub fn count_splits(&self, counts: &mut [u64]) {
        for node in self.nodes.iter().filter(|n| !n.is_leaf()) {
            if let Some(c) = counts.get_mut(node.feature_index as usize) {
                *c += 1;
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match nodes.get(idx) {
                Some(node) if !node.is_leaf() => {
                    1 + walk(nodes, node.left as usize).max(walk(nodes, node.right as usize))
                }
                _ => 0,
            }
        }
        walk(&self.nodes, 0)
    }
}
