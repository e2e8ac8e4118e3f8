//! # Tabular Data Loading Module
//!
//! This module is the entry point for the house-sales tables the dashboard
//! reads: the cleaned Ames dataset and the four inherited houses. It reads a
//! comma-separated file with a header row through `polars`, and immediately
//! converts it into a small column-oriented [`FeatureTable`] so the rest of the
//! crate never depends on the DataFrame API.
//!
//! - Column types follow the file: text columns become categorical, every
//!   other column is cast to `f64`. Empty cells stay missing (`None`); the
//!   pipeline decides how to fill them.
//! - Errors are user-facing. A page that fails to load a table shows the
//!   `DataError` message verbatim.

use crate::types::{FeatureValue, FeatureVector};
use ndarray::Array1;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use thiserror::Error;

/// A comprehensive error type for table loading and validation failures.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Error from the underlying Polars DataFrame library: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error(
        "The required column '{0}' was not found in the input file. Please check spelling and case."
    )]
    ColumnNotFound(String),
    #[error(
        "The column '{column_name}' could not be used as '{expected_type}'. (Found type: {found_type})"
    )]
    ColumnWrongType {
        column_name: String,
        expected_type: &'static str,
        found_type: String,
    },
    #[error("The input file '{0}' contains no data rows.")]
    EmptyTable(String),
    #[error("Column '{column_name}' has {found} rows, but the table has {expected}.")]
    LengthMismatch {
        column_name: String,
        found: usize,
        expected: usize,
    },
}

/// The cells of one column. Missing cells are `None`.
#[derive(Clone, Debug, PartialEq)]
pub enum ColumnValues {
    Numeric(Vec<Option<f64>>),
    Categorical(Vec<Option<String>>),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            Self::Numeric(values) => values.len(),
            Self::Categorical(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Numeric(_))
    }

    pub fn get(&self, row: usize) -> Option<FeatureValue> {
        match self {
            Self::Numeric(values) => values.get(row).copied().flatten().map(FeatureValue::Number),
            Self::Categorical(values) => values
                .get(row)
                .and_then(|cell| cell.clone())
                .map(FeatureValue::Category),
        }
    }

    pub fn numeric(&self) -> Option<&[Option<f64>]> {
        match self {
            Self::Numeric(values) => Some(values),
            Self::Categorical(_) => None,
        }
    }

    pub fn null_count(&self) -> usize {
        match self {
            Self::Numeric(values) => values.iter().filter(|v| v.is_none()).count(),
            Self::Categorical(values) => values.iter().filter(|v| v.is_none()).count(),
        }
    }

    fn take(&self, rows: std::ops::Range<usize>) -> Self {
        match self {
            Self::Numeric(values) => Self::Numeric(values[rows].to_vec()),
            Self::Categorical(values) => Self::Categorical(values[rows].to_vec()),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FeatureColumn {
    pub name: String,
    pub values: ColumnValues,
}

impl FeatureColumn {
    pub fn numeric(name: &str, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.to_string(),
            values: ColumnValues::Numeric(values),
        }
    }

    pub fn categorical(name: &str, values: Vec<Option<String>>) -> Self {
        Self {
            name: name.to_string(),
            values: ColumnValues::Categorical(values),
        }
    }
}

/// A column-oriented table of named house features.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureTable {
    columns: Vec<FeatureColumn>,
    height: usize,
}

impl FeatureTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from columns, checking that all have the same length.
    pub fn from_columns(columns: Vec<FeatureColumn>) -> Result<Self, DataError> {
        let mut table = Self::new();
        for column in columns {
            table.push_column(column)?;
        }
        Ok(table)
    }

    /// Appends a column, or replaces an existing column of the same name in place.
    pub fn push_column(&mut self, column: FeatureColumn) -> Result<(), DataError> {
        if self.columns.is_empty() {
            self.height = column.values.len();
        } else if column.values.len() != self.height {
            return Err(DataError::LengthMismatch {
                column_name: column.name,
                found: column.values.len(),
                expected: self.height,
            });
        }
        match self.columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
        Ok(())
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[FeatureColumn] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&FeatureColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Mutable access for in-place transforms that keep the column length.
    pub(crate) fn column_mut(&mut self, name: &str) -> Option<&mut FeatureColumn> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    /// A one-row table holding `record`, columns in record order.
    pub fn from_record(record: &FeatureVector) -> Self {
        let columns = record
            .iter()
            .map(|(name, value)| match value {
                FeatureValue::Number(v) => FeatureColumn::numeric(name, vec![Some(*v)]),
                FeatureValue::Category(label) => {
                    FeatureColumn::categorical(name, vec![Some(label.clone())])
                }
            })
            .collect::<Vec<_>>();
        let height = if columns.is_empty() { 0 } else { 1 };
        Self { columns, height }
    }

    pub fn remove_column(&mut self, name: &str) -> Option<FeatureColumn> {
        let index = self.columns.iter().position(|c| c.name == name)?;
        let removed = self.columns.remove(index);
        if self.columns.is_empty() {
            self.height = 0;
        }
        Some(removed)
    }

    /// Returns a table holding exactly `names`, in that order.
    ///
    /// On failure the error carries every requested name that is absent, in
    /// request order.
    pub fn select(&self, names: &[String]) -> Result<Self, Vec<String>> {
        let missing: Vec<String> = names
            .iter()
            .filter(|name| !self.has_column(name))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(missing);
        }
        let columns = names
            .iter()
            .filter_map(|name| self.column(name).cloned())
            .collect();
        Ok(Self {
            columns,
            height: self.height,
        })
    }

    /// The first `n` rows (or fewer when the table is shorter).
    pub fn head(&self, n: usize) -> Self {
        let rows = 0..n.min(self.height);
        let height = rows.len();
        Self {
            columns: self
                .columns
                .iter()
                .map(|c| FeatureColumn {
                    name: c.name.clone(),
                    values: c.values.take(rows.clone()),
                })
                .collect(),
            height,
        }
    }

    /// One row as an ordered feature record; missing cells are skipped.
    pub fn row(&self, index: usize) -> FeatureVector {
        self.columns
            .iter()
            .filter_map(|c| c.values.get(index).map(|value| (c.name.clone(), value)))
            .collect()
    }

    /// Display text of one cell, empty for missing values.
    pub fn cell_text(&self, name: &str, row: usize) -> String {
        self.column(name)
            .and_then(|c| c.values.get(row))
            .map(|value| match value {
                FeatureValue::Number(v) => format_number(v),
                FeatureValue::Category(label) => label,
            })
            .unwrap_or_default()
    }

    pub fn numeric_columns(&self) -> impl Iterator<Item = &FeatureColumn> {
        self.columns.iter().filter(|c| c.values.is_numeric())
    }

    /// Reads a comma-separated file with a header row.
    pub fn from_csv(path: &Path) -> Result<Self, DataError> {
        log::info!("Loading table from '{}'", path.display());

        let df = CsvReader::new(File::open(path)?)
            .with_options(CsvReadOptions::default().with_has_header(true))
            .finish()?;

        if df.height() == 0 {
            return Err(DataError::EmptyTable(path.display().to_string()));
        }

        let mut table = Self::new();
        for column in df.get_columns() {
            let series = column.as_materialized_series();
            let name = series.name().to_string();
            let values = if series.dtype() == &DataType::String {
                let labels = series.str()?;
                ColumnValues::Categorical(
                    labels
                        .into_iter()
                        .map(|cell| cell.map(str::to_string))
                        .collect(),
                )
            } else {
                let casted = series
                    .cast(&DataType::Float64)
                    .map_err(|_| DataError::ColumnWrongType {
                        column_name: name.clone(),
                        expected_type: "f64 (numeric) or text",
                        found_type: format!("{:?}", series.dtype()),
                    })?;
                ColumnValues::Numeric(casted.f64()?.into_iter().collect())
            };
            table.push_column(FeatureColumn { name, values })?;
        }

        log::debug!(
            "Loaded {} rows x {} columns from '{}'",
            table.height(),
            table.width(),
            path.display()
        );
        Ok(table)
    }
}

/// A feature table split from its regression target.
#[derive(Clone, Debug)]
pub struct HouseDataset {
    pub features: FeatureTable,
    pub target: Array1<f64>,
    pub target_name: String,
}

impl HouseDataset {
    /// Separates `target_name` from the features.
    ///
    /// The target must be present, numeric and complete.
    pub fn split_target(table: &FeatureTable, target_name: &str) -> Result<Self, DataError> {
        let mut features = table.clone();
        let column = features
            .remove_column(target_name)
            .ok_or_else(|| DataError::ColumnNotFound(target_name.to_string()))?;
        let cells = match &column.values {
            ColumnValues::Numeric(values) => values,
            ColumnValues::Categorical(_) => {
                return Err(DataError::ColumnWrongType {
                    column_name: target_name.to_string(),
                    expected_type: "f64 (numeric)",
                    found_type: "text".to_string(),
                });
            }
        };
        let target: Option<Vec<f64>> = cells.iter().copied().collect();
        let target = target.ok_or_else(|| DataError::ColumnWrongType {
            column_name: target_name.to_string(),
            expected_type: "complete f64 values",
            found_type: format!("{} missing values", column.values.null_count()),
        })?;
        if features.width() == 0 {
            features = FeatureTable {
                columns: Vec::new(),
                height: target.len(),
            };
        }
        Ok(Self {
            features,
            target: Array1::from_vec(target),
            target_name: target_name.to_string(),
        })
    }
}

/// Numbers print without a trailing `.0` when integral, and with at most
/// two decimals otherwise.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        let text = format!("{value:.2}");
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::io::{self, Write};
    use tempfile::NamedTempFile;

    fn create_test_csv(content: &str) -> io::Result<NamedTempFile> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "{}", content)?;
        file.flush()?;
        Ok(file)
    }

    const SALES: &str = "GrLivArea,KitchenQual,LotFrontage,SalePrice\n\
                         1710,Gd,65,208500\n\
                         1262,TA,,181500\n\
                         1786,Gd,68,223500";

    #[test]
    fn test_csv_columns_keep_their_types() {
        let file = create_test_csv(SALES).unwrap();
        let table = FeatureTable::from_csv(file.path()).unwrap();

        assert_eq!(table.height(), 3);
        assert_eq!(table.width(), 4);
        let names: Vec<&str> = table.column_names().collect();
        assert_eq!(
            names,
            vec!["GrLivArea", "KitchenQual", "LotFrontage", "SalePrice"]
        );
        assert!(table.column("GrLivArea").unwrap().values.is_numeric());
        assert!(!table.column("KitchenQual").unwrap().values.is_numeric());
        assert_eq!(table.column("LotFrontage").unwrap().values.null_count(), 1);
        assert_eq!(table.cell_text("KitchenQual", 1), "TA");
        assert_eq!(table.cell_text("LotFrontage", 1), "");
    }

    #[test]
    fn test_split_target_removes_sale_price() {
        let file = create_test_csv(SALES).unwrap();
        let table = FeatureTable::from_csv(file.path()).unwrap();
        let dataset = HouseDataset::split_target(&table, "SalePrice").unwrap();

        assert_eq!(dataset.target.len(), 3);
        assert_abs_diff_eq!(dataset.target[2], 223_500.0, epsilon = 1e-9);
        assert!(!dataset.features.has_column("SalePrice"));
        assert_eq!(dataset.features.width(), 3);
    }

    #[test]
    fn test_error_missing_target() {
        let file = create_test_csv("GrLivArea,OverallQual\n1710,7\n1262,6").unwrap();
        let table = FeatureTable::from_csv(file.path()).unwrap();
        match HouseDataset::split_target(&table, "SalePrice") {
            Err(DataError::ColumnNotFound(col)) => assert_eq!(col, "SalePrice"),
            other => panic!("Expected ColumnNotFound(SalePrice), got {:?}", other),
        }
    }

    #[test]
    fn test_error_missing_file() {
        let err = FeatureTable::from_csv(Path::new("does/not/exist.csv")).unwrap_err();
        assert!(matches!(err, DataError::IoError(_)), "got {err:?}");
    }

    #[test]
    fn test_select_reports_every_missing_name() {
        let table = FeatureTable::from_columns(vec![
            FeatureColumn::numeric("A", vec![Some(1.0)]),
            FeatureColumn::numeric("B", vec![Some(2.0)]),
        ])
        .unwrap();
        let wanted: Vec<String> = ["B", "C", "A", "D"].map(String::from).to_vec();
        assert_eq!(table.select(&wanted).unwrap_err(), vec!["C", "D"]);

        let reordered = table.select(&["B".to_string(), "A".to_string()]).unwrap();
        let names: Vec<&str> = reordered.column_names().collect();
        assert_eq!(names, vec!["B", "A"]);
    }

    #[test]
    fn test_push_column_rejects_ragged_columns() {
        let mut table = FeatureTable::new();
        table
            .push_column(FeatureColumn::numeric("A", vec![Some(1.0), Some(2.0)]))
            .unwrap();
        let err = table
            .push_column(FeatureColumn::numeric("B", vec![Some(1.0)]))
            .unwrap_err();
        assert!(matches!(
            err,
            DataError::LengthMismatch {
                found: 1,
                expected: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_format_number_trims_decimals() {
        assert_eq!(format_number(1500.0), "1500");
        assert_eq!(format_number(6.10), "6.1");
        assert_eq!(format_number(1162.634), "1162.63");
    }
}
