//! Final classification step of the pipeline

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Classifier as stored in the artifact
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Classifier {
    /// Binary logistic regression; class 1 when `w·x + b > 0`
    LogisticRegression { coefficients: Vec<f64>, intercept: f64 },
    DecisionTree(Tree),
    /// Mean of normalized leaf scores over all trees
    RandomForest { trees: Vec<Tree> },
}

/// Flat tree, root at index 0
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    /// Go to `left` when `features[feature] <= threshold`, else `right`
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Per-class scores (counts or probabilities)
    Leaf { value: Vec<f64> },
}

impl Classifier {
    /// Predict a class index for one encoded row
    pub fn predict_index(&self, features: &[f64]) -> Result<usize, PipelineError> {
        match self {
            Self::LogisticRegression {
                coefficients,
                intercept,
            } => {
                if features.len() != coefficients.len() {
                    return Err(PipelineError::FeatureCount {
                        expected: coefficients.len(),
                        found: features.len(),
                    });
                }
                let margin: f64 = coefficients
                    .iter()
                    .zip(features)
                    .map(|(w, x)| w * x)
                    .sum::<f64>()
                    + intercept;
                Ok(usize::from(margin > 0.0))
            }
            Self::DecisionTree(tree) => Ok(argmax(tree.leaf(features))),
            Self::RandomForest { trees } => {
                let mut totals: Vec<f64> = Vec::new();
                for tree in trees {
                    let leaf = tree.leaf(features);
                    let sum: f64 = leaf.iter().sum();
                    if totals.len() < leaf.len() {
                        totals.resize(leaf.len(), 0.0);
                    }
                    for (total, score) in totals.iter_mut().zip(leaf) {
                        *total += if sum > 0.0 { score / sum } else { *score };
                    }
                }
                Ok(argmax(&totals))
            }
        }
    }

    /// Check structural consistency against the encoded feature width
    pub(crate) fn validate(&self, width: usize, classes: usize) -> Result<(), String> {
        match self {
            Self::LogisticRegression { coefficients, .. } => {
                if classes != 2 {
                    return Err(format!(
                        "logistic regression needs exactly 2 classes, artifact lists {classes}"
                    ));
                }
                if coefficients.len() == width {
                    Ok(())
                } else {
                    Err(format!(
                        "logistic regression has {} coefficients for {width} features",
                        coefficients.len()
                    ))
                }
            }
            Self::DecisionTree(tree) => tree.validate(width, classes),
            Self::RandomForest { trees } => {
                if trees.is_empty() {
                    return Err("random forest has no trees".to_string());
                }
                trees
                    .iter()
                    .enumerate()
                    .try_for_each(|(i, t)| t.validate(width, classes).map_err(|e| format!("tree {i}: {e}")))
            }
        }
    }
}

impl Tree {
    /// Walk from the root to a leaf. Assumes `validate` has passed.
    fn leaf(&self, features: &[f64]) -> &[f64] {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let x = features.get(*feature).copied().unwrap_or(f64::NAN);
                    // NaN goes right, as comparisons with it are false
                    index = if x <= *threshold { *left } else { *right };
                }
            }
        }
    }

    fn validate(&self, width: usize, classes: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    if *feature >= width {
                        return Err(format!(
                            "node {i} splits on feature {feature}, row has {width}"
                        ));
                    }
                    // children must point forward so traversal always terminates
                    for child in [left, right] {
                        if *child <= i || *child >= self.nodes.len() {
                            return Err(format!("node {i} has invalid child {child}"));
                        }
                    }
                }
                Node::Leaf { value } => {
                    if value.len() != classes {
                        return Err(format!(
                            "leaf {i} has {} scores for {classes} classes",
                            value.len()
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Index of the largest score, first one on ties
fn argmax(scores: &[f64]) -> usize {
    scores
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(best, max), (i, s)| {
            if *s > max {
                (i, *s)
            } else {
                (best, max)
            }
        })
        .0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stump(threshold: f64, left: Vec<f64>, right: Vec<f64>) -> Tree {
        Tree {
            nodes: vec![
                Node::Split {
                    feature: 0,
                    threshold,
                    left: 1,
                    right: 2,
                },
                Node::Leaf { value: left },
                Node::Leaf { value: right },
            ],
        }
    }

    #[test]
    fn test_logistic_regression_sign() {
        let clf = Classifier::LogisticRegression {
            coefficients: vec![1.0, -2.0],
            intercept: 0.5,
        };
        assert_eq!(clf.predict_index(&[1.0, 0.0]).unwrap(), 1);
        assert_eq!(clf.predict_index(&[0.0, 1.0]).unwrap(), 0);
        // margin exactly zero is class 0
        assert_eq!(clf.predict_index(&[-0.5, 0.0]).unwrap(), 0);
    }

    #[test]
    fn test_logistic_regression_feature_count() {
        let clf = Classifier::LogisticRegression {
            coefficients: vec![1.0],
            intercept: 0.0,
        };
        assert!(matches!(
            clf.predict_index(&[1.0, 2.0]),
            Err(PipelineError::FeatureCount { expected: 1, found: 2 })
        ));
    }

    #[test]
    fn test_decision_tree_goes_left_on_equal() {
        let clf = Classifier::DecisionTree(stump(5.0, vec![10.0, 0.0], vec![0.0, 3.0]));
        assert_eq!(clf.predict_index(&[5.0]).unwrap(), 0);
        assert_eq!(clf.predict_index(&[5.1]).unwrap(), 1);
    }

    #[test]
    fn test_random_forest_averages_normalized_scores() {
        // tree 1 votes class 1 weakly, tree 2 votes class 0 strongly
        let clf = Classifier::RandomForest {
            trees: vec![
                stump(0.0, vec![0.0, 1.0], vec![40.0, 60.0]),
                stump(0.0, vec![0.0, 1.0], vec![9.0, 1.0]),
            ],
        };
        assert_eq!(clf.predict_index(&[1.0]).unwrap(), 0);
        assert_eq!(clf.predict_index(&[-1.0]).unwrap(), 1);
    }

    #[test]
    fn test_argmax_prefers_first_on_tie() {
        assert_eq!(argmax(&[0.5, 0.5]), 0);
        assert_eq!(argmax(&[0.2, 0.8]), 1);
    }

    #[test]
    fn test_validate_rejects_backward_child() {
        let tree = Tree {
            nodes: vec![
                Node::Split {
                    feature: 0,
                    threshold: 1.0,
                    left: 0,
                    right: 1,
                },
                Node::Leaf { value: vec![1.0, 0.0] },
            ],
        };
        let err = Classifier::DecisionTree(tree).validate(1, 2).unwrap_err();
        assert!(err.contains("invalid child 0"), "{err}");
    }

    #[test]
    fn test_validate_rejects_out_of_range_feature() {
        let clf = Classifier::DecisionTree(stump(0.0, vec![1.0, 0.0], vec![0.0, 1.0]));
        assert!(clf.validate(0, 2).is_err());
        assert!(clf.validate(1, 2).is_ok());
        assert!(clf.validate(1, 3).is_err());
    }

    #[test]
    fn test_deserialize_tree() {
        let clf: Classifier = serde_json::from_value(json!({
            "type": "decision_tree",
            "nodes": [
                {"kind": "split", "feature": 0, "threshold": 0.5, "left": 1, "right": 2},
                {"kind": "leaf", "value": [1.0, 0.0]},
                {"kind": "leaf", "value": [0.0, 1.0]}
            ]
        }))
        .unwrap();
        assert_eq!(clf.predict_index(&[1.0]).unwrap(), 1);
    }
}
