use super::view::{Chart, PageView, ReferenceLine, Table};
use super::{PageContext, PageError};
use crate::data::HouseDataset;
use crate::pipeline::PricePredictor;
use crate::stats::{histogram, regression_metrics, residuals};
use crate::types::format_currency;
use itertools::Itertools;

pub fn render(ctx: &mut PageContext<'_>) -> PageView {
    let mut view = PageView::new("Model Performance");
    view.heading(2, "Model Performance Evaluation");
    view.info(
        "This page explains how well the ML model predicts house prices in Ames, Iowa.\n\
         Lydia can use this information to trust the predictions on her inherited houses.",
    );

    if let Err(err) = evaluate(ctx, &mut view) {
        view.failure("model evaluation", &err);
    }
    view
}

/// Everything after the introduction. Returns early, leaving the blocks
/// produced so far, on the first failure.
fn evaluate(ctx: &mut PageContext<'_>, view: &mut PageView) -> Result<(), PageError> {
    let pipeline = ctx.cache.pipeline(&ctx.config.paths.pipeline)?;
    let table = ctx.cache.table(&ctx.config.paths.cleaned_dataset)?;
    let dataset = HouseDataset::split_target(&table, &ctx.config.target)?;

    let predicted = pipeline.predict(&dataset.features)?;
    let actual = &dataset.target;
    let metrics = regression_metrics(actual, &predicted)?;
    let errors = residuals(actual, &predicted)?;

    view.heading(3, "Performance Metrics");
    view.success(format!(
        "R² Score: {:.3}\n\nRMSE: {}\n\nMAE: {}",
        metrics.r2,
        format_currency(metrics.rmse),
        format_currency(metrics.mae)
    ));
    view.table(Table::key_values(
        ["Metric", "Value"],
        [
            ("Rows evaluated", actual.len().to_string()),
            ("R²", format!("{:.3}", metrics.r2)),
            ("MSE", format!("{:.0}", metrics.mse)),
            ("RMSE", format_currency(metrics.rmse)),
            ("MAE", format_currency(metrics.mae)),
        ],
    ));

    view.separator();
    view.heading(3, "Predicted vs Actual Sale Prices");
    let reference = actual
        .iter()
        .copied()
        .minmax_by(|a, b| a.total_cmp(b))
        .into_option()
        .map(|(low, high)| ReferenceLine {
            from: (low, low),
            to: (high, high),
        });
    view.chart(Chart::Scatter {
        title: "Predicted vs Actual Prices".to_string(),
        x_label: "Actual Sale Price".to_string(),
        y_label: "Predicted Sale Price".to_string(),
        points: actual
            .iter()
            .copied()
            .zip(predicted.iter().copied())
            .collect(),
        reference,
        annotation: None,
    });

    view.heading(3, "Residuals Distribution");
    view.chart(Chart::Histogram {
        title: "Residuals Distribution".to_string(),
        x_label: "Residual (Actual - Predicted)".to_string(),
        histogram: histogram(errors.view(), ctx.config.histogram_bins),
    });

    view.info(
        "Interpretation:\n\
         - An R² close to 1 means the model explains most of the price variation.\n\
         - Low RMSE and MAE mean predictions are usually close to actual prices.\n\
         - The scatterplot should align along the diagonal reference line.\n\
         - Residuals should be centered around zero without big skew.",
    );
    Ok(())
}
