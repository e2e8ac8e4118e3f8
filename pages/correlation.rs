//! The correlation study: which attributes move the sale price.

use super::view::{Chart, PageView, Table, ValueFormat};
use super::{Interaction, PageContext, PageError};
use crate::data::{ColumnValues, DataError, FeatureTable, format_number};
use crate::stats::{
    ColumnSummary, FiveNumber, correlation_matrix, describe, group_summaries, pearson,
    predictive_power_score, rank_target_correlations,
};
use itertools::Itertools;
use std::cmp::Ordering;

pub const INSPECT_SECTION: &str = "Inspect House Sales Dataset";
pub const VARIABLES_SECTION: &str = "Sale Price vs Key Variables";
pub const HEATMAP_SECTION: &str = "Correlation Matrix Heatmap";
pub const PPS_SECTION: &str = "Predictive Power Score (PPS) Analysis";

fn correlation_text(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |r| format!("{r:.3}"))
}

pub fn render(ctx: &mut PageContext<'_>, interaction: &Interaction) -> PageView {
    let target = ctx.config.target.as_str();
    let mut view = PageView::new("Price Correlation Study");
    view.heading(2, "House Price Correlation Study");
    view.info(
        "Lydia is interested in understanding which house attributes most strongly affect \
         the sale price in Ames, Iowa, so she can focus on the most valuable features when \
         selling her inherited properties.",
    );

    let table = match ctx.cache.table(&ctx.config.paths.cleaned_dataset) {
        Ok(table) => table,
        Err(err) => {
            view.failure("house sales dataset", &PageError::from(err));
            return view;
        }
    };
    if !table.has_column(target) {
        let err = PageError::from(DataError::ColumnNotFound(target.to_string()));
        view.failure("correlation study", &err);
        return view;
    }

    view.expander(INSPECT_SECTION, interaction.is_open(INSPECT_SECTION), |inner| {
        inner.text(format!(
            "The dataset has {} rows and {} columns.",
            table.height(),
            table.width()
        ));
        inner.text("First 10 rows:");
        inner.table(Table::from_features(&table.head(10)));
        inner.text("Basic statistics:");
        inner.table(describe_table(&describe(&table)));
    });

    view.separator();
    view.heading(3, "Correlation Study Results");
    let variables = &ctx.config.study_variables;
    view.text(format!(
        "The most correlated variables to {target} are: {}",
        variables.join(", ")
    ));
    view.info(
        "Key Insights from Correlation Analysis:\n\
         - OverallQual (overall material and finish quality) is the strongest driver of price.\n\
         - GrLivArea (above ground living area) is highly correlated with price: bigger homes \
         tend to be more expensive.\n\
         - GarageCars and TotalBsmtSF show strong positive relationships with price.\n\
         - YearBuilt shows that newer homes are generally valued higher.",
    );

    let ranked = rank_target_correlations(&table, target);
    let mut ranking = Table::new(["Feature", "Pearson", "Spearman"]);
    for row in &ranked {
        ranking.push_row([
            row.feature.clone(),
            correlation_text(row.pearson),
            correlation_text(row.spearman),
        ]);
    }
    view.text(format!("Correlation of every numeric feature with {target}:"));
    view.table(ranking);

    view.expander(VARIABLES_SECTION, interaction.is_open(VARIABLES_SECTION), |inner| {
        variable_plots(inner, &table, variables, target);
    });

    view.expander(HEATMAP_SECTION, interaction.is_open(HEATMAP_SECTION), |inner| {
        let matrix = correlation_matrix(&table);
        inner.chart(Chart::Heatmap {
            title: "Feature Correlation Matrix".to_string(),
            labels: matrix.names,
            values: matrix.values,
        });
    });

    view.expander(PPS_SECTION, interaction.is_open(PPS_SECTION), |inner| {
        pps_section(inner, &table, target);
    });
    view
}

fn describe_table(summaries: &[ColumnSummary]) -> Table {
    let mut out = Table::new([
        "", "count", "mean", "std", "min", "25%", "50%", "75%", "max",
    ]);
    for s in summaries {
        out.push_row([
            s.column.clone(),
            s.count.to_string(),
            format_number(s.mean),
            format_number(s.std),
            format_number(s.min),
            format_number(s.q25),
            format_number(s.median),
            format_number(s.q75),
            format_number(s.max),
        ]);
    }
    out
}

fn variable_plots(
    view: &mut PageView,
    table: &FeatureTable,
    variables: &[String],
    target: &str,
) {
    let Some(target_cells) = table.column(target).and_then(|c| c.values.numeric()) else {
        return;
    };
    for variable in variables {
        let Some(column) = table.column(variable) else {
            view.warning(format!(
                "{variable} is not a column of the dataset; its plot is skipped."
            ));
            continue;
        };
        let title = format!("{variable} vs {target}");
        match &column.values {
            ColumnValues::Numeric(cells) => {
                let points = cells
                    .iter()
                    .zip(target_cells)
                    .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
                    .collect();
                view.chart(Chart::Scatter {
                    title,
                    x_label: variable.clone(),
                    y_label: target.to_string(),
                    points,
                    reference: None,
                    annotation: Some(format!(
                        "Correlation: {}",
                        correlation_text(pearson(cells, target_cells))
                    )),
                });
            }
            ColumnValues::Categorical(labels) => {
                let groups: Vec<(String, FiveNumber)> = group_summaries(labels, target_cells);
                view.chart(Chart::BoxPlot {
                    title,
                    y_label: target.to_string(),
                    groups,
                });
            }
        }
    }
}

fn pps_section(view: &mut PageView, table: &FeatureTable, target: &str) {
    let Some(target_cells) = table.column(target).and_then(|c| c.values.numeric()) else {
        return;
    };
    let scores: Vec<(String, f64)> = table
        .columns()
        .iter()
        .filter(|c| c.name != target)
        .filter_map(|c| {
            predictive_power_score(&c.values, target_cells).map(|score| (c.name.clone(), score))
        })
        .sorted_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal))
        .collect();
    if scores.is_empty() {
        view.warning("Not enough complete rows to compute predictive power scores.");
        return;
    }
    view.text(format!(
        "How well each feature alone predicts {target}, from 0 (no better than the median) \
         to 1 (perfect)."
    ));
    view.chart(Chart::Bar {
        title: format!("Predictive Power Score for {target}"),
        y_label: "PPS".to_string(),
        bars: scores.clone(),
        format: ValueFormat::Decimal(3),
    });
    view.table(Table::key_values(
        ["Feature", "PPS"],
        scores
            .into_iter()
            .map(|(name, score)| (name, format!("{score:.3}"))),
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FeatureColumn;
    use crate::pages::view::Tone;

    #[test]
    fn absent_study_variables_produce_warnings() {
        let table = FeatureTable::from_columns(vec![
            FeatureColumn::numeric("GrLivArea", vec![Some(1000.0), Some(2000.0), Some(1500.0)]),
            FeatureColumn::categorical(
                "KitchenQual",
                vec![
                    Some("TA".to_string()),
                    Some("Gd".to_string()),
                    Some("TA".to_string()),
                ],
            ),
            FeatureColumn::numeric("SalePrice", vec![Some(100.0), Some(250.0), Some(160.0)]),
        ])
        .unwrap();
        let mut view = PageView::new("t");
        let variables = vec![
            "GrLivArea".to_string(),
            "GarageCars".to_string(),
            "KitchenQual".to_string(),
        ];
        variable_plots(&mut view, &table, &variables, "SalePrice");

        assert_eq!(view.callouts(Tone::Warning).len(), 1);
        let charts = view.charts();
        assert_eq!(charts.len(), 2);
        assert!(matches!(charts[0], Chart::Scatter { points, .. } if points.len() == 3));
        assert!(matches!(charts[1], Chart::BoxPlot { groups, .. } if groups.len() == 2));
    }
}
