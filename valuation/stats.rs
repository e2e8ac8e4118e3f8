//! # Descriptive Statistics and Model Diagnostics
//!
//! The numbers behind the correlation study and the model performance page:
//! pairwise-complete correlations, per-column summaries, regression metrics,
//! histogram and box-plot summaries, and a single-feature predictive power
//! score.

use crate::data::{ColumnValues, FeatureTable};
use itertools::Itertools;
use ndarray::{Array1, Array2, ArrayView1, Zip};
use std::cmp::Ordering;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum StatsError {
    #[error("Cannot compare {left} values with {right} values.")]
    LengthMismatch { left: usize, right: usize },
    #[error("Cannot compute '{0}' on an empty sample.")]
    EmptySample(&'static str),
}

// --- Correlation ---

/// Pairs where both cells are present.
fn complete_pairs(x: &[Option<f64>], y: &[Option<f64>]) -> (Vec<f64>, Vec<f64>) {
    x.iter()
        .zip(y)
        .filter_map(|(a, b)| match (a, b) {
            (Some(a), Some(b)) if a.is_finite() && b.is_finite() => Some((*a, *b)),
            _ => None,
        })
        .unzip()
}

fn pearson_complete(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len();
    if n < 2 {
        return None;
    }
    let mean_x = x.iter().sum::<f64>() / n as f64;
    let mean_y = y.iter().sum::<f64>() / n as f64;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some((sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0))
}

/// Pearson correlation over pairwise-complete observations.
///
/// `None` when fewer than two pairs remain or either side is constant.
pub fn pearson(x: &[Option<f64>], y: &[Option<f64>]) -> Option<f64> {
    let (x, y) = complete_pairs(x, y);
    pearson_complete(&x, &y)
}

/// Ranks starting at 1; tied values share the mean of their positions.
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let order: Vec<usize> = (0..values.len())
        .sorted_by(|&a, &b| {
            values[a]
                .partial_cmp(&values[b])
                .unwrap_or(Ordering::Equal)
        })
        .collect();
    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // Positions start..end hold one tied value; ranks are 1-based.
        let shared = (start + end + 1) as f64 / 2.0;
        for &index in &order[start..end] {
            ranks[index] = shared;
        }
        start = end;
    }
    ranks
}

/// Spearman rank correlation over pairwise-complete observations.
pub fn spearman(x: &[Option<f64>], y: &[Option<f64>]) -> Option<f64> {
    let (x, y) = complete_pairs(x, y);
    pearson_complete(&average_ranks(&x), &average_ranks(&y))
}

/// Pearson correlations between every pair of numeric columns.
#[derive(Clone, Debug)]
pub struct CorrelationMatrix {
    pub names: Vec<String>,
    /// `NaN` where the correlation is undefined.
    pub values: Array2<f64>,
}

pub fn correlation_matrix(table: &FeatureTable) -> CorrelationMatrix {
    let columns: Vec<(&str, &[Option<f64>])> = table
        .numeric_columns()
        .filter_map(|c| c.values.numeric().map(|cells| (c.name.as_str(), cells)))
        .collect();
    let k = columns.len();
    let mut values = Array2::from_elem((k, k), f64::NAN);
    for i in 0..k {
        for j in i..k {
            let r = pearson(columns[i].1, columns[j].1).map(|r| if i == j { 1.0 } else { r });
            let r = r.unwrap_or(f64::NAN);
            values[[i, j]] = r;
            values[[j, i]] = r;
        }
    }
    CorrelationMatrix {
        names: columns.iter().map(|(name, _)| name.to_string()).collect(),
        values,
    }
}

/// Correlation of one feature with the target.
#[derive(Clone, Debug, PartialEq)]
pub struct TargetCorrelation {
    pub feature: String,
    pub pearson: Option<f64>,
    pub spearman: Option<f64>,
}

/// Every numeric feature against `target`, strongest absolute Pearson first.
/// Features with an undefined correlation sort last.
pub fn rank_target_correlations(table: &FeatureTable, target: &str) -> Vec<TargetCorrelation> {
    let Some(target_cells) = table.column(target).and_then(|c| c.values.numeric()) else {
        return Vec::new();
    };
    table
        .numeric_columns()
        .filter(|c| c.name != target)
        .filter_map(|c| {
            let cells = c.values.numeric()?;
            Some(TargetCorrelation {
                feature: c.name.clone(),
                pearson: pearson(cells, target_cells),
                spearman: spearman(cells, target_cells),
            })
        })
        .sorted_by(|a, b| {
            let strength = |r: &TargetCorrelation| r.pearson.map_or(-1.0, f64::abs);
            strength(b)
                .partial_cmp(&strength(a))
                .unwrap_or(Ordering::Equal)
        })
        .collect()
}

// --- Summaries ---

/// Linear interpolation between closest ranks, the default pandas method.
/// `sorted` must be ascending and non-empty.
fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

fn sorted_finite(values: impl IntoIterator<Item = f64>) -> Vec<f64> {
    values
        .into_iter()
        .filter(|v| v.is_finite())
        .sorted_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal))
        .collect()
}

/// One row of a `describe()` table.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnSummary {
    pub column: String,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1); `NaN` below two values.
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

impl ColumnSummary {
    pub fn of(column: &str, cells: &[Option<f64>]) -> Self {
        let sorted = sorted_finite(cells.iter().flatten().copied());
        let count = sorted.len();
        if count == 0 {
            return Self {
                column: column.to_string(),
                count,
                mean: f64::NAN,
                std: f64::NAN,
                min: f64::NAN,
                q25: f64::NAN,
                median: f64::NAN,
                q75: f64::NAN,
                max: f64::NAN,
            };
        }
        let mean = sorted.iter().sum::<f64>() / count as f64;
        let std = if count < 2 {
            f64::NAN
        } else {
            let ss: f64 = sorted.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (count - 1) as f64).sqrt()
        };
        Self {
            column: column.to_string(),
            count,
            mean,
            std,
            min: sorted[0],
            q25: quantile_sorted(&sorted, 0.25),
            median: quantile_sorted(&sorted, 0.5),
            q75: quantile_sorted(&sorted, 0.75),
            max: sorted[count - 1],
        }
    }
}

/// Summaries of every numeric column, in table order.
pub fn describe(table: &FeatureTable) -> Vec<ColumnSummary> {
    table
        .numeric_columns()
        .filter_map(|c| {
            c.values
                .numeric()
                .map(|cells| ColumnSummary::of(&c.name, cells))
        })
        .collect()
}

/// Box-plot statistics of one group.
#[derive(Clone, Debug, PartialEq)]
pub struct FiveNumber {
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

impl FiveNumber {
    pub fn of(values: &[f64]) -> Option<Self> {
        let sorted = sorted_finite(values.iter().copied());
        let last = *sorted.last()?;
        Some(Self {
            count: sorted.len(),
            min: sorted[0],
            q1: quantile_sorted(&sorted, 0.25),
            median: quantile_sorted(&sorted, 0.5),
            q3: quantile_sorted(&sorted, 0.75),
            max: last,
        })
    }
}

/// Target distribution per category label, labels in ascending order.
/// Rows missing either side are skipped.
pub fn group_summaries(
    labels: &[Option<String>],
    target: &[Option<f64>],
) -> Vec<(String, FiveNumber)> {
    labels
        .iter()
        .zip(target)
        .filter_map(|(label, value)| Some((label.clone()?, (*value)?)))
        .into_group_map()
        .into_iter()
        .sorted_by(|a, b| a.0.cmp(&b.0))
        .filter_map(|(label, values)| {
            FiveNumber::of(&values).map(|summary| (label, summary))
        })
        .collect()
}

/// Equal-width bins spanning the finite range of `values`.
#[derive(Clone, Debug, PartialEq)]
pub struct Histogram {
    /// `counts.len() + 1` ascending bin edges.
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

pub fn histogram(values: ArrayView1<f64>, bins: usize) -> Histogram {
    let bins = bins.max(1);
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let bounds = finite
        .iter()
        .copied()
        .minmax_by(f64::total_cmp)
        .into_option();
    let (low, high) = match bounds {
        Some((low, high)) if high > low => (low, high),
        Some((low, _)) => (low - 0.5, low + 0.5),
        None => (0.0, 1.0),
    };
    let width = (high - low) / bins as f64;
    let mut counts = vec![0; bins];
    for v in finite {
        let index = (((v - low) / width).floor() as usize).min(bins - 1);
        counts[index] += 1;
    }
    Histogram {
        edges: (0..=bins).map(|i| low + width * i as f64).collect(),
        counts,
    }
}

// --- Regression Metrics ---

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RegressionMetrics {
    pub r2: f64,
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
}

fn check_lengths(actual: &Array1<f64>, predicted: &Array1<f64>) -> Result<(), StatsError> {
    if actual.len() != predicted.len() {
        return Err(StatsError::LengthMismatch {
            left: actual.len(),
            right: predicted.len(),
        });
    }
    if actual.is_empty() {
        return Err(StatsError::EmptySample("regression metrics"));
    }
    Ok(())
}

/// `actual - predicted`, element-wise.
pub fn residuals(actual: &Array1<f64>, predicted: &Array1<f64>) -> Result<Array1<f64>, StatsError> {
    check_lengths(actual, predicted)?;
    Ok(actual - predicted)
}

/// R², MSE, RMSE and MAE. A constant target scores R² = 1 for a perfect fit
/// and 0 otherwise.
pub fn regression_metrics(
    actual: &Array1<f64>,
    predicted: &Array1<f64>,
) -> Result<RegressionMetrics, StatsError> {
    check_lengths(actual, predicted)?;
    let n = actual.len() as f64;
    let mean = actual.sum() / n;
    let mut ss_res = 0.0;
    let mut abs_err = 0.0;
    Zip::from(actual).and(predicted).for_each(|&a, &p| {
        ss_res += (a - p).powi(2);
        abs_err += (a - p).abs();
    });
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
    let r2 = if ss_tot == 0.0 {
        if ss_res == 0.0 { 1.0 } else { 0.0 }
    } else {
        1.0 - ss_res / ss_tot
    };
    let mse = ss_res / n;
    Ok(RegressionMetrics {
        r2,
        mse,
        rmse: mse.sqrt(),
        mae: abs_err / n,
    })
}

// --- Predictive Power Score ---

/// Cross-validation folds used for the score.
pub const PPS_FOLDS: usize = 4;
const PPS_MAX_DEPTH: usize = 8;

/// How well `feature` alone predicts `target`, in [0, 1].
///
/// A single-feature regression tree (numeric features) or per-label mean
/// (categorical features) is scored by mean absolute error under contiguous
/// k-fold cross-validation, against a baseline that always predicts the
/// training median: `max(0, 1 - mae_model / mae_baseline)`.
///
/// `None` when fewer than two rows per fold remain after dropping rows
/// with a missing feature or target.
pub fn predictive_power_score(feature: &ColumnValues, target: &[Option<f64>]) -> Option<f64> {
    let (model_mae, baseline_mae) = match feature {
        ColumnValues::Numeric(cells) => {
            let (x, y) = complete_pairs(cells, target);
            cross_validate(&x, &y, |train_x, train_y| {
                let tree = Cart::fit(train_x, train_y, PPS_MAX_DEPTH);
                move |x: &f64| tree.predict(*x)
            })?
        }
        ColumnValues::Categorical(cells) => {
            let (x, y): (Vec<String>, Vec<f64>) = cells
                .iter()
                .zip(target)
                .filter_map(|(label, value)| match (label, value) {
                    (Some(label), Some(value)) if value.is_finite() => {
                        Some((label.clone(), *value))
                    }
                    _ => None,
                })
                .unzip();
            cross_validate(&x, &y, |train_x, train_y| {
                let fallback = median(train_y);
                let means: ahash::AHashMap<String, f64> = train_x
                    .iter()
                    .cloned()
                    .zip(train_y.iter().copied())
                    .into_group_map()
                    .into_iter()
                    .map(|(label, values)| {
                        let mean = values.iter().sum::<f64>() / values.len() as f64;
                        (label, mean)
                    })
                    .collect();
                move |label: &String| means.get(label).copied().unwrap_or(fallback)
            })?
        }
    };
    if baseline_mae == 0.0 {
        return Some(0.0);
    }
    Some((1.0 - model_mae / baseline_mae).max(0.0))
}

fn median(values: &[f64]) -> f64 {
    let sorted = sorted_finite(values.iter().copied());
    if sorted.is_empty() {
        0.0
    } else {
        quantile_sorted(&sorted, 0.5)
    }
}

/// Mean absolute errors of the fitted model and of the median baseline,
/// pooled over all held-out rows.
fn cross_validate<X, M, F>(x: &[X], y: &[f64], fit: F) -> Option<(f64, f64)>
where
    X: Clone,
    F: Fn(&[X], &[f64]) -> M,
    M: Fn(&X) -> f64,
{
    let n = x.len();
    if n < PPS_FOLDS * 2 {
        return None;
    }
    let (mut model_err, mut baseline_err) = (0.0, 0.0);
    for fold in 0..PPS_FOLDS {
        let start = fold * n / PPS_FOLDS;
        let end = (fold + 1) * n / PPS_FOLDS;
        let train_x: Vec<X> = x[..start].iter().chain(&x[end..]).cloned().collect();
        let train_y: Vec<f64> = y[..start].iter().chain(&y[end..]).copied().collect();
        let model = fit(&train_x, &train_y);
        let baseline = median(&train_y);
        for (xi, yi) in x[start..end].iter().zip(&y[start..end]) {
            model_err += (model(xi) - yi).abs();
            baseline_err += (baseline - yi).abs();
        }
    }
    Some((model_err / n as f64, baseline_err / n as f64))
}

/// A one-dimensional regression tree grown by squared-error splits.
enum Cart {
    Leaf(f64),
    Split {
        threshold: f64,
        left: Box<Cart>,
        right: Box<Cart>,
    },
}

impl Cart {
    fn fit(x: &[f64], y: &[f64], max_depth: usize) -> Self {
        let pairs: Vec<(f64, f64)> = x
            .iter()
            .copied()
            .zip(y.iter().copied())
            .sorted_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal))
            .collect();
        Self::grow(&pairs, max_depth)
    }

    /// `pairs` is sorted by feature value.
    fn grow(pairs: &[(f64, f64)], depth: usize) -> Self {
        let n = pairs.len();
        let total: f64 = pairs.iter().map(|p| p.1).sum();
        let mean = if n == 0 { 0.0 } else { total / n as f64 };
        if depth == 0 || n < 2 {
            return Cart::Leaf(mean);
        }

        // Minimising child SSE is maximising sum_l^2 / n_l + sum_r^2 / n_r.
        let mut best: Option<(usize, f64)> = None;
        let mut left_sum = 0.0;
        for i in 1..n {
            left_sum += pairs[i - 1].1;
            if pairs[i].0 == pairs[i - 1].0 {
                continue;
            }
            let right_sum = total - left_sum;
            let gain = left_sum * left_sum / i as f64 + right_sum * right_sum / (n - i) as f64;
            if best.is_none_or(|(_, g)| gain > g) {
                best = Some((i, gain));
            }
        }
        let parent_gain = total * total / n as f64;
        match best {
            Some((i, gain)) if gain > parent_gain + 1e-12 * parent_gain.abs() => Cart::Split {
                threshold: (pairs[i - 1].0 + pairs[i].0) / 2.0,
                left: Box::new(Self::grow(&pairs[..i], depth - 1)),
                right: Box::new(Self::grow(&pairs[i..], depth - 1)),
            },
            _ => Cart::Leaf(mean),
        }
    }

    fn predict(&self, x: f64) -> f64 {
        let mut node = self;
        loop {
            match node {
                Cart::Leaf(value) => return *value,
                Cart::Split {
                    threshold,
                    left,
                    right,
                } => node = if x <= *threshold { left } else { right },
            }
        }
    }
}
