use crate::data::{ColumnValues, FeatureTable};
use crate::types::{FeatureValue, FeatureVector};
use ahash::AHashMap;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use thiserror::Error;

// --- Public Data Structures ---
// These structs define the human-readable format of the fitted price pipeline
// when serialized to a TOML file by the offline training step.

/// The only artifact layout this build understands.
pub const SUPPORTED_FORMAT_VERSION: u32 = 1;

fn default_target() -> String {
    "SalePrice".to_string()
}

fn default_unknown_value() -> f64 {
    -1.0
}

fn default_offset() -> f64 {
    1.0
}

fn default_learning_rate() -> f64 {
    1.0
}

/// One fitted feature-engineering step, applied in artifact order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformStep {
    /// Replaces each label with its position in the fitted category list.
    /// Labels never seen during fitting become `unknown_value`.
    OrdinalEncoder {
        categories: BTreeMap<String, Vec<String>>,
        #[serde(default = "default_unknown_value")]
        unknown_value: f64,
    },
    /// Fills missing cells with a fitted value (median, mean, or mode).
    FillMissing { values: BTreeMap<String, FeatureValue> },
    /// `ln(x + offset)` for skewed numeric columns.
    LogTransform {
        columns: Vec<String>,
        #[serde(default = "default_offset")]
        offset: f64,
    },
    /// Keeps only the listed columns, in that order.
    SelectFeatures { columns: Vec<String> },
    /// `(x - mean) / scale`; a zero scale leaves the centred value unscaled.
    StandardScaler {
        mean: BTreeMap<String, f64>,
        scale: BTreeMap<String, f64>,
    },
}

/// How tree outputs are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Gradient boosting: trees are summed.
    #[default]
    Sum,
    /// Random forest: trees are averaged.
    Mean,
}

/// A node in a flattened regression tree. A node without `feature` is a leaf.
///
/// Children always sit after their parent in the node array, which keeps
/// traversal acyclic. Missing values follow the left branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature: Option<String>,
    #[serde(default)]
    pub threshold: f64,
    #[serde(default)]
    pub left: usize,
    #[serde(default)]
    pub right: usize,
    #[serde(default)]
    pub value: f64,
}

impl TreeNode {
    pub fn leaf(value: f64) -> Self {
        Self {
            feature: None,
            threshold: 0.0,
            left: 0,
            right: 0,
            value,
        }
    }

    pub fn split(feature: &str, threshold: f64, left: usize, right: usize) -> Self {
        Self {
            feature: Some(feature.to_string()),
            threshold,
            left,
            right,
            value: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

/// The fitted estimator at the end of the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Regressor {
    Linear {
        intercept: f64,
        coefficients: BTreeMap<String, f64>,
    },
    TreeEnsemble {
        #[serde(default)]
        base_score: f64,
        #[serde(default = "default_learning_rate")]
        learning_rate: f64,
        #[serde(default)]
        aggregation: Aggregation,
        trees: Vec<RegressionTree>,
    },
}

/// The top-level, self-contained, fitted pipeline artifact.
/// This is the structure that gets loaded from the pipeline file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PricePipeline {
    pub format_version: u32,
    #[serde(default = "default_target")]
    pub target: String,
    /// The ordered input schema the pipeline was fitted on.
    pub feature_names_in: Vec<String>,
    #[serde(default)]
    pub steps: Vec<TransformStep>,
    pub regressor: Regressor,
}

/// Custom error type for pipeline loading and prediction.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to read pipeline file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML pipeline file: {0}")]
    TomlParseError(#[from] toml::de::Error),
    #[error("The pipeline artifact is invalid: {0}")]
    InvalidArtifact(String),
    #[error("The input record is missing features the pipeline requires: {}", missing.join(", "))]
    SchemaMismatch { missing: Vec<String> },
    #[error("Value '{value}' in column '{column}' cannot be used by the pipeline.")]
    UnsupportedValue { column: String, value: String },
    #[error("Column '{column}' has a missing value in row {row} that the pipeline does not fill.")]
    MissingValue { column: String, row: usize },
    #[error("The pipeline produced a non-finite prediction for row {row}.")]
    NonFiniteOutput { row: usize },
}

/// Anything that turns a table of house features into sale prices.
///
/// The seam between the pages and the fitted artifact.
pub trait PricePredictor {
    /// The ordered schema `predict` expects.
    fn feature_names_in(&self) -> &[String];

    /// One price per row of `features`.
    fn predict(&self, features: &FeatureTable) -> Result<Array1<f64>, PipelineError>;

    /// Predicts a single assembled record.
    fn predict_record(&self, record: &FeatureVector) -> Result<f64, PipelineError> {
        let prices = self.predict(&FeatureTable::from_record(record))?;
        prices
            .first()
            .copied()
            .ok_or_else(|| PipelineError::InvalidArtifact("empty prediction output".to_string()))
    }
}

impl PricePipeline {
    /// Loads and validates a fitted pipeline from a TOML file.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        log::info!("Loading price pipeline from '{}'", path.display());
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, PipelineError> {
        let pipeline: Self = toml::from_str(text)?;
        pipeline.validate()?;
        Ok(pipeline)
    }

    /// Structural checks that do not depend on input data.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.format_version != SUPPORTED_FORMAT_VERSION {
            return Err(PipelineError::InvalidArtifact(format!(
                "format_version {} is not supported (expected {})",
                self.format_version, SUPPORTED_FORMAT_VERSION
            )));
        }
        if self.feature_names_in.is_empty() {
            return Err(PipelineError::InvalidArtifact(
                "feature_names_in is empty".to_string(),
            ));
        }
        let mut seen = HashSet::with_capacity(self.feature_names_in.len());
        for name in &self.feature_names_in {
            if !seen.insert(name.as_str()) {
                return Err(PipelineError::InvalidArtifact(format!(
                    "feature '{name}' appears twice in feature_names_in"
                )));
            }
        }
        match &self.regressor {
            Regressor::Linear { coefficients, .. } => {
                if let Some((name, _)) = coefficients.iter().find(|(_, c)| !c.is_finite()) {
                    return Err(PipelineError::InvalidArtifact(format!(
                        "coefficient for '{name}' is not finite"
                    )));
                }
            }
            Regressor::TreeEnsemble { trees, .. } => {
                if trees.is_empty() {
                    return Err(PipelineError::InvalidArtifact(
                        "tree ensemble has no trees".to_string(),
                    ));
                }
                for (t, tree) in trees.iter().enumerate() {
                    internal::validate_tree(t, tree)?;
                }
            }
        }
        Ok(())
    }

    /// The features the final estimator reads, after all steps have run.
    pub fn regressor_inputs(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        match &self.regressor {
            Regressor::Linear { coefficients, .. } => names.extend(coefficients.keys().cloned()),
            Regressor::TreeEnsemble { trees, .. } => {
                for node in trees.iter().flat_map(|tree| tree.nodes.iter()) {
                    if let Some(feature) = &node.feature {
                        if !names.contains(feature) {
                            names.push(feature.clone());
                        }
                    }
                }
            }
        }
        names
    }
}

impl PricePredictor for PricePipeline {
    fn feature_names_in(&self) -> &[String] {
        &self.feature_names_in
    }

    /// Predicts sale prices for every row of `features`.
    ///
    /// 1. Reindexes the input to `feature_names_in`; absent names are a
    ///    schema mismatch, extra names are dropped.
    /// 2. Runs the fitted steps in order.
    /// 3. Evaluates the regressor on the numeric design matrix.
    fn predict(&self, features: &FeatureTable) -> Result<Array1<f64>, PipelineError> {
        // --- 1. Reindex to the fitted schema ---
        let mut table = features
            .select(&self.feature_names_in)
            .map_err(|missing| PipelineError::SchemaMismatch { missing })?;
        if table.height() == 0 {
            return Ok(Array1::zeros(0));
        }

        // --- 2. Feature engineering ---
        for step in &self.steps {
            internal::apply_step(step, &mut table)?;
        }

        // --- 3. Estimator ---
        let inputs = self.regressor_inputs();
        let design = internal::design_matrix(&table, &inputs)?;
        let prices = internal::evaluate(&self.regressor, &inputs, &design)?;

        if let Some(row) = prices.iter().position(|p| !p.is_finite()) {
            return Err(PipelineError::NonFiniteOutput { row });
        }
        Ok(prices)
    }
}

/// Internal module for prediction-specific implementation details.
mod internal {
    use super::*;

    pub(super) fn validate_tree(index: usize, tree: &RegressionTree) -> Result<(), PipelineError> {
        if tree.nodes.is_empty() {
            return Err(PipelineError::InvalidArtifact(format!("tree {index} has no nodes")));
        }
        for (i, node) in tree.nodes.iter().enumerate() {
            if node.feature.is_none() {
                continue;
            }
            let in_order = |child: usize| child > i && child < tree.nodes.len();
            if !in_order(node.left) || !in_order(node.right) {
                return Err(PipelineError::InvalidArtifact(format!(
                    "tree {index} node {i} has children ({}, {}) outside ({i}, {})",
                    node.left,
                    node.right,
                    tree.nodes.len()
                )));
            }
        }
        Ok(())
    }

    fn missing_column(step: &str, column: &str) -> PipelineError {
        PipelineError::InvalidArtifact(format!(
            "step '{step}' references column '{column}', which is not present at that point"
        ))
    }

    pub(super) fn apply_step(
        step: &TransformStep,
        table: &mut FeatureTable,
    ) -> Result<(), PipelineError> {
        match step {
            TransformStep::OrdinalEncoder {
                categories,
                unknown_value,
            } => {
                for (name, labels) in categories {
                    let column = table
                        .column_mut(name)
                        .ok_or_else(|| missing_column("ordinal_encoder", name))?;
                    if let ColumnValues::Categorical(cells) = &column.values {
                        let codes = cells
                            .iter()
                            .map(|cell| {
                                cell.as_ref().map(|label| {
                                    labels
                                        .iter()
                                        .position(|known| known == label)
                                        .map_or(*unknown_value, |code| code as f64)
                                })
                            })
                            .collect();
                        column.values = ColumnValues::Numeric(codes);
                    }
                }
            }
            TransformStep::FillMissing { values } => {
                for (name, fill) in values {
                    let column = table
                        .column_mut(name)
                        .ok_or_else(|| missing_column("fill_missing", name))?;
                    match (&mut column.values, fill) {
                        (ColumnValues::Numeric(cells), FeatureValue::Number(v)) => {
                            cells
                                .iter_mut()
                                .filter(|c| c.is_none())
                                .for_each(|c| *c = Some(*v));
                        }
                        (ColumnValues::Categorical(cells), FeatureValue::Category(label)) => {
                            cells
                                .iter_mut()
                                .filter(|c| c.is_none())
                                .for_each(|c| *c = Some(label.clone()));
                        }
                        (_, fill) => {
                            return Err(PipelineError::UnsupportedValue {
                                column: name.clone(),
                                value: fill.to_string(),
                            });
                        }
                    }
                }
            }
            TransformStep::LogTransform { columns, offset } => {
                for name in columns {
                    let column = table
                        .column_mut(name)
                        .ok_or_else(|| missing_column("log_transform", name))?;
                    let ColumnValues::Numeric(cells) = &mut column.values else {
                        return Err(PipelineError::UnsupportedValue {
                            column: name.clone(),
                            value: "text".to_string(),
                        });
                    };
                    for cell in cells.iter_mut() {
                        if let Some(x) = cell {
                            let shifted = *x + offset;
                            if shifted <= 0.0 {
                                return Err(PipelineError::UnsupportedValue {
                                    column: name.clone(),
                                    value: x.to_string(),
                                });
                            }
                            *x = shifted.ln();
                        }
                    }
                }
            }
            TransformStep::SelectFeatures { columns } => {
                *table = table.select(columns).map_err(|missing| {
                    missing_column("select_features", &missing.join(", "))
                })?;
            }
            TransformStep::StandardScaler { mean, scale } => {
                for (name, centre) in mean {
                    let spread = scale.get(name).copied().unwrap_or(1.0);
                    let spread = if spread == 0.0 { 1.0 } else { spread };
                    let column = table
                        .column_mut(name)
                        .ok_or_else(|| missing_column("standard_scaler", name))?;
                    let ColumnValues::Numeric(cells) = &mut column.values else {
                        return Err(PipelineError::UnsupportedValue {
                            column: name.clone(),
                            value: "text".to_string(),
                        });
                    };
                    for x in cells.iter_mut().flatten() {
                        *x = (*x - centre) / spread;
                    }
                }
            }
        }
        Ok(())
    }

    /// Stacks the regressor inputs into a `[rows, inputs]` matrix.
    /// Missing cells become NaN; text cells are rejected.
    pub(super) fn design_matrix(
        table: &FeatureTable,
        inputs: &[String],
    ) -> Result<Array2<f64>, PipelineError> {
        let mut design = Array2::from_elem((table.height(), inputs.len()), f64::NAN);
        for (j, name) in inputs.iter().enumerate() {
            let column = table.column(name).ok_or_else(|| {
                PipelineError::InvalidArtifact(format!(
                    "regressor reads '{name}', which the pipeline steps do not produce"
                ))
            })?;
            match &column.values {
                ColumnValues::Numeric(cells) => {
                    for (i, cell) in cells.iter().enumerate() {
                        if let Some(x) = cell {
                            design[[i, j]] = *x;
                        }
                    }
                }
                ColumnValues::Categorical(cells) => {
                    let value = cells.iter().flatten().next().cloned().unwrap_or_default();
                    return Err(PipelineError::UnsupportedValue {
                        column: name.clone(),
                        value,
                    });
                }
            }
        }
        Ok(design)
    }

    pub(super) fn evaluate(
        regressor: &Regressor,
        inputs: &[String],
        design: &Array2<f64>,
    ) -> Result<Array1<f64>, PipelineError> {
        match regressor {
            Regressor::Linear {
                intercept,
                coefficients,
            } => {
                if let Some(((row, col), _)) = design.indexed_iter().find(|(_, x)| x.is_nan()) {
                    return Err(PipelineError::MissingValue {
                        column: inputs[col].clone(),
                        row,
                    });
                }
                let weights: Array1<f64> = inputs
                    .iter()
                    .map(|name| coefficients.get(name).copied().unwrap_or(0.0))
                    .collect();
                Ok(design.dot(&weights) + *intercept)
            }
            Regressor::TreeEnsemble {
                base_score,
                learning_rate,
                aggregation,
                trees,
            } => {
                let index: AHashMap<&str, usize> = inputs
                    .iter()
                    .enumerate()
                    .map(|(j, name)| (name.as_str(), j))
                    .collect();
                let prices = design
                    .rows()
                    .into_iter()
                    .map(|row| {
                        let total: f64 = trees
                            .iter()
                            .map(|tree| walk_tree(tree, &index, &row))
                            .sum();
                        let combined = match aggregation {
                            Aggregation::Sum => total,
                            Aggregation::Mean => total / trees.len() as f64,
                        };
                        base_score + learning_rate * combined
                    })
                    .collect();
                Ok(prices)
            }
        }
    }

    fn walk_tree(
        tree: &RegressionTree,
        index: &AHashMap<&str, usize>,
        row: &ndarray::ArrayView1<f64>,
    ) -> f64 {
        let mut at = 0;
        loop {
            let node = &tree.nodes[at];
            let Some(feature) = &node.feature else {
                return node.value;
            };
            let x = index
                .get(feature.as_str())
                .map(|&j| row[j])
                .unwrap_or(f64::NAN);
            at = if x.is_nan() || x <= node.threshold {
                node.left
            } else {
                node.right
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FeatureColumn;
    use approx::assert_abs_diff_eq;

    fn linear_pipeline() -> PricePipeline {
        PricePipeline {
            format_version: 1,
            target: "SalePrice".to_string(),
            feature_names_in: vec![
                "GrLivArea".to_string(),
                "KitchenQual".to_string(),
                "LotFrontage".to_string(),
            ],
            steps: vec![
                TransformStep::OrdinalEncoder {
                    categories: BTreeMap::from([(
                        "KitchenQual".to_string(),
                        ["Fa", "TA", "Gd", "Ex"].map(String::from).to_vec(),
                    )]),
                    unknown_value: -1.0,
                },
                TransformStep::FillMissing {
                    values: BTreeMap::from([(
                        "LotFrontage".to_string(),
                        FeatureValue::Number(69.0),
                    )]),
                },
            ],
            regressor: Regressor::Linear {
                intercept: 10_000.0,
                coefficients: BTreeMap::from([
                    ("GrLivArea".to_string(), 100.0),
                    ("KitchenQual".to_string(), 5_000.0),
                    ("LotFrontage".to_string(), 10.0),
                ]),
            },
        }
    }

    fn sample_table() -> FeatureTable {
        FeatureTable::from_columns(vec![
            FeatureColumn::numeric("LotFrontage", vec![Some(60.0), None]),
            FeatureColumn::categorical(
                "KitchenQual",
                vec![Some("Gd".to_string()), Some("Po".to_string())],
            ),
            FeatureColumn::numeric("GrLivArea", vec![Some(1500.0), Some(1000.0)]),
            FeatureColumn::numeric("SalePrice", vec![Some(1.0), Some(2.0)]),
        ])
        .unwrap()
    }

    #[test]
    fn linear_pipeline_encodes_fills_and_predicts() {
        let prices = linear_pipeline().predict(&sample_table()).unwrap();
        // Row 0: 10000 + 150000 + 2*5000 + 600
        assert_abs_diff_eq!(prices[0], 170_600.0, epsilon = 1e-6);
        // Row 1: unknown label -> -1, missing frontage -> 69
        assert_abs_diff_eq!(
            prices[1],
            10_000.0 + 100_000.0 - 5_000.0 + 690.0,
            epsilon = 1e-6
        );
    }

    #[test]
    fn missing_required_feature_is_a_schema_mismatch() {
        let mut table = sample_table();
        table.remove_column("GrLivArea");
        table.remove_column("LotFrontage");
        match linear_pipeline().predict(&table) {
            Err(PipelineError::SchemaMismatch { missing }) => {
                assert_eq!(missing, vec!["GrLivArea", "LotFrontage"]);
            }
            other => panic!("expected SchemaMismatch, got {other:?}"),
        }
    }

    #[test]
    fn text_reaching_the_regressor_is_unsupported() {
        let mut pipeline = linear_pipeline();
        pipeline.steps.remove(0);
        let err = pipeline.predict(&sample_table()).unwrap_err();
        assert!(
            matches!(
                &err,
                PipelineError::UnsupportedValue { column, .. } if column == "KitchenQual"
            ),
            "got {err:?}"
        );
    }

    #[test]
    fn tree_ensemble_routes_missing_values_left() {
        let pipeline = PricePipeline {
            format_version: 1,
            target: "SalePrice".to_string(),
            feature_names_in: vec!["OverallQual".to_string()],
            steps: Vec::new(),
            regressor: Regressor::TreeEnsemble {
                base_score: 100_000.0,
                learning_rate: 0.5,
                aggregation: Aggregation::Sum,
                trees: vec![RegressionTree {
                    nodes: vec![
                        TreeNode::split("OverallQual", 6.5, 1, 2),
                        TreeNode::leaf(-20_000.0),
                        TreeNode::leaf(80_000.0),
                    ],
                }],
            },
        };
        let table = FeatureTable::from_columns(vec![FeatureColumn::numeric(
            "OverallQual",
            vec![Some(5.0), Some(9.0), None],
        )])
        .unwrap();
        let prices = pipeline.predict(&table).unwrap();
        assert_abs_diff_eq!(prices[0], 90_000.0, epsilon = 1e-9);
        assert_abs_diff_eq!(prices[1], 140_000.0, epsilon = 1e-9);
        assert_abs_diff_eq!(prices[2], 90_000.0, epsilon = 1e-9);
    }

    #[test]
    fn artifact_round_trips_through_toml() {
        let text = toml::to_string(&linear_pipeline()).unwrap();
        let loaded = PricePipeline::from_toml_str(&text).unwrap();
        assert_eq!(loaded, linear_pipeline());
    }

    #[test]
    fn backwards_tree_links_are_rejected() {
        let text = r#"
format_version = 1
feature_names_in = ["OverallQual"]

[regressor]
kind = "tree_ensemble"

[[regressor.trees]]
nodes = [{ feature = "OverallQual", threshold = 5.0, left = 0, right = 1 }, { value = 1.0 }]
"#;
        let err = PricePipeline::from_toml_str(text).unwrap_err();
        assert!(
            matches!(err, PipelineError::InvalidArtifact(_)),
            "got {err:?}"
        );
    }

    #[test]
    fn duplicate_schema_names_are_rejected() {
        let mut pipeline = linear_pipeline();
        pipeline.feature_names_in.push("GrLivArea".to_string());
        assert!(matches!(
            pipeline.validate(),
            Err(PipelineError::InvalidArtifact(_))
        ));
    }
}
