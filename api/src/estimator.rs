//! Trained regression model, loaded from a JSON artifact.
//!
//! The artifact carries the category vocabularies the model was fitted with
//! together with the fitted estimator, either a linear regression or a random
//! forest of binary regression trees.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ModelError;

/// Length of the model input vector.
pub const N_FEATURES: usize = 7;

/// Classes of each categorical column, in label-encoding order.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Categories {
    #[serde(rename = "Area")]
    pub areas: Vec<String>,
    #[serde(rename = "Crop")]
    pub crops: Vec<String>,
    #[serde(rename = "Soil_Type")]
    pub soil_types: Vec<String>,
}

impl Categories {
    /// Finds `value` in `classes`, ignoring case and surrounding whitespace.
    /// Returns the encoded index and the canonical spelling.
    pub fn lookup<'a>(classes: &'a [String], value: &str) -> Option<(usize, &'a str)> {
        let value = value.trim();
        classes
            .iter()
            .enumerate()
            .find(|(_, class)| class.eq_ignore_ascii_case(value))
            .map(|(idx, class)| (idx, class.as_str()))
    }

    fn validate(&self) -> Result<(), ModelError> {
        for (column, classes) in [
            ("Area", &self.areas),
            ("Crop", &self.crops),
            ("Soil_Type", &self.soil_types),
        ] {
            if classes.is_empty() {
                return Err(ModelError::Invalid(format!("no classes for {column}")));
            }
            if classes.iter().any(|c| c.trim().is_empty() || c.trim() != c.as_str()) {
                return Err(ModelError::Invalid(format!(
                    "{column} has a blank or padded class name"
                )));
            }
            // label encoders emit sorted, unique classes
            if classes.windows(2).any(|w| w[0] >= w[1]) {
                return Err(ModelError::Invalid(format!(
                    "{column} classes must be sorted and unique"
                )));
            }
            // lookup ignores case, so classes must differ by more than case
            for (i, class) in classes.iter().enumerate() {
                if let Some(other) = classes[i + 1..]
                    .iter()
                    .find(|other| other.eq_ignore_ascii_case(class))
                {
                    return Err(ModelError::Invalid(format!(
                        "{column} classes '{class}' and '{other}' differ only by case"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LinearRegression {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearRegression {
    fn predict(&self, x: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(x)
                .map(|(w, v)| w * v)
                .sum::<f64>()
    }

    fn validate(&self) -> Result<(), ModelError> {
        if self.coefficients.len() != N_FEATURES {
            return Err(ModelError::Invalid(format!(
                "linear model has {} coefficients, expected {N_FEATURES}",
                self.coefficients.len()
            )));
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ModelError::Invalid(
                "linear model has non-finite parameters".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// Flattened binary regression tree; node 0 is the root.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    fn predict(&self, x: &[f64]) -> Result<f64, ModelError> {
        let mut idx = 0;
        // a root-to-leaf path visits each node at most once
        for _ in 0..self.nodes.len() {
            match self.nodes.get(idx) {
                Some(TreeNode::Leaf { value }) => return Ok(*value),
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = x.get(*feature).ok_or_else(|| {
                        ModelError::Invalid(format!("split on unknown feature {feature}"))
                    })?;
                    idx = if *value <= *threshold { *left } else { *right };
                }
                None => {
                    return Err(ModelError::Invalid(format!("tree node {idx} out of range")))
                }
            }
        }
        Err(ModelError::Invalid("tree traversal did not reach a leaf".into()))
    }

    fn validate(&self, tree: usize) -> Result<(), ModelError> {
        if self.nodes.is_empty() {
            return Err(ModelError::Invalid(format!("tree {tree} has no nodes")));
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Leaf { value } if !value.is_finite() => {
                    return Err(ModelError::Invalid(format!(
                        "tree {tree} node {idx}: non-finite leaf value"
                    )));
                }
                TreeNode::Leaf { .. } => {}
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= N_FEATURES || !threshold.is_finite() {
                        return Err(ModelError::Invalid(format!(
                            "tree {tree} node {idx}: bad split"
                        )));
                    }
                    // children after parent keeps traversal acyclic
                    for child in [*left, *right] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(ModelError::Invalid(format!(
                                "tree {tree} node {idx}: child {child} out of order"
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RandomForest {
    pub trees: Vec<DecisionTree>,
}

impl RandomForest {
    fn predict(&self, x: &[f64]) -> Result<f64, ModelError> {
        let mut total = 0.0;
        for tree in &self.trees {
            total += tree.predict(x)?;
        }
        Ok(total / self.trees.len() as f64)
    }

    fn validate(&self) -> Result<(), ModelError> {
        if self.trees.is_empty() {
            return Err(ModelError::Invalid("random forest has no trees".into()));
        }
        self.trees
            .iter()
            .enumerate()
            .try_for_each(|(i, tree)| tree.validate(i))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Estimator {
    Linear(LinearRegression),
    RandomForest(RandomForest),
}

impl Estimator {
    pub fn kind(&self) -> &'static str {
        match self {
            Estimator::Linear(_) => "linear",
            Estimator::RandomForest(_) => "random_forest",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ModelArtifact {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub trained_at: Option<DateTime<Utc>>,
    pub categories: Categories,
    pub estimator: Estimator,
}

impl ModelArtifact {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let artifact = Self::from_json(&raw)?;
        tracing::info!(
            path = %path.display(),
            name = %artifact.name,
            version = %artifact.version,
            kind = artifact.estimator.kind(),
            "model artifact loaded"
        );
        Ok(artifact)
    }

    pub fn from_json(raw: &str) -> Result<Self, ModelError> {
        let artifact: ModelArtifact = serde_json::from_str(raw)?;
        artifact.validate()?;
        Ok(artifact)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        self.categories.validate()?;
        match &self.estimator {
            Estimator::Linear(model) => model.validate(),
            Estimator::RandomForest(model) => model.validate(),
        }
    }

    /// Linear model fitted on the default synthetic training set.
    pub fn builtin() -> Self {
        fn strings(xs: &[&str]) -> Vec<String> {
            xs.iter().map(|s| s.to_string()).collect()
        }
        Self {
            name: "crop-yield-linear".to_string(),
            version: "builtin".to_string(),
            trained_at: None,
            categories: Categories {
                areas: strings(&[
                    "Andhra Pradesh",
                    "Bihar",
                    "Gujarat",
                    "Haryana",
                    "Karnataka",
                    "Madhya Pradesh",
                    "Maharashtra",
                    "Punjab",
                    "Tamil Nadu",
                    "Uttar Pradesh",
                    "West Bengal",
                ]),
                crops: strings(&[
                    "Barley",
                    "Cotton",
                    "Maize",
                    "Millet",
                    "Pulses",
                    "Rice",
                    "Soybean",
                    "Sugarcane",
                    "Wheat",
                ]),
                soil_types: strings(&[
                    "Alluvial", "Black", "Clay", "Laterite", "Loamy", "Red", "Sandy",
                ]),
            },
            estimator: Estimator::Linear(LinearRegression {
                intercept: 1.2,
                coefficients: vec![0.02, 0.05, 0.03, 0.04, 0.01, 0.1, 0.0015],
            }),
        }
    }

    /// Evaluates the estimator on an encoded input vector.
    pub fn predict(&self, x: &[f64]) -> Result<f64, ModelError> {
        if x.len() != N_FEATURES {
            return Err(ModelError::FeatureCount {
                expected: N_FEATURES,
                got: x.len(),
            });
        }
        let y = match &self.estimator {
            Estimator::Linear(model) if model.coefficients.len() != N_FEATURES => {
                return Err(ModelError::FeatureCount {
                    expected: model.coefficients.len(),
                    got: x.len(),
                })
            }
            Estimator::Linear(model) => model.predict(x),
            Estimator::RandomForest(model) => model.predict(x)?,
        };
        if y.is_finite() {
            Ok(y)
        } else {
            Err(ModelError::NonFinite)
        }
    }
}
