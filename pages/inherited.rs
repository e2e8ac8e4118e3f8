use super::view::{Chart, PageView, Table, ValueFormat};
use super::{Interaction, PageContext, PageError};
use crate::data::FeatureColumn;
use crate::pipeline::PricePredictor;
use crate::types::format_currency;

pub const PREDICTION_COLUMN: &str = "Predicted_Price";
pub const DETAILS_SECTION: &str = "Show Detailed House Information";
pub const EXPECTED_HOUSES: usize = 4;
const KEY_COLUMNS: [&str; 4] = ["GrLivArea", "OverallQual", "YearBuilt", PREDICTION_COLUMN];

pub fn render(ctx: &mut PageContext<'_>, interaction: &Interaction) -> PageView {
    let mut view = PageView::new("Predict Lydia's Houses");
    view.heading(2, "Predict Lydia's Inherited Houses");
    view.info(
        "- This page shows the predicted sale prices for Lydia's 4 inherited houses.\n\
         - The predictions are based on the trained ML model using house attributes.\n\
         - The total predicted value helps Lydia understand the potential worth of her \
         inheritance.",
    );

    let loaded = ctx
        .cache
        .table(&ctx.config.paths.inherited_houses)
        .map_err(PageError::from)
        .and_then(|houses| {
            let pipeline = ctx.cache.pipeline(&ctx.config.paths.pipeline)?;
            Ok((houses, pipeline))
        });
    let (houses, pipeline) = match loaded {
        Ok(pair) => pair,
        Err(err) => {
            view.failure("inherited houses or prediction pipeline", &err);
            return view;
        }
    };

    let prices = match pipeline.predict(&houses) {
        Ok(prices) => prices,
        Err(err) => {
            view.failure("house predictions", &PageError::from(err));
            return view;
        }
    };
    if houses.height() != EXPECTED_HOUSES {
        view.warning(format!(
            "Expected {EXPECTED_HOUSES} inherited houses but the file lists {}.",
            houses.height()
        ));
    }

    let mut priced = (*houses).clone();
    let column = FeatureColumn::numeric(
        PREDICTION_COLUMN,
        prices.iter().copied().map(Some).collect(),
    );
    if let Err(err) = priced.push_column(column) {
        view.failure("house predictions", &PageError::from(err));
        return view;
    }

    view.heading(3, "Lydia's Inherited Houses");
    view.table(Table::from_features(&priced));

    view.expander(DETAILS_SECTION, interaction.is_open(DETAILS_SECTION), |inner| {
        for (i, price) in prices.iter().enumerate() {
            let label = format!("House {} Details", i + 1);
            inner.expander(&label, true, |house| {
                house.text("House Attributes:");
                house.table(Table::key_values(
                    ["Attribute", "Value"],
                    houses
                        .column_names()
                        .map(|name| (name.to_string(), houses.cell_text(name, i))),
                ));
                house.text("Prediction Result:");
                house.success(format!("Predicted Price: {}", format_currency(*price)));
            });
        }
    });

    view.separator();
    view.heading(3, "Summary of All House Predictions");
    let present: Vec<String> = KEY_COLUMNS
        .iter()
        .filter(|name| priced.has_column(name))
        .map(|name| name.to_string())
        .collect();
    if let Ok(summary) = priced.select(&present) {
        view.table(Table::from_features(&summary));
    }

    // Summed unrounded; rounding happens only in display.
    let total: f64 = prices.iter().sum();
    view.heading(3, "Total Portfolio Value");
    view.success(format!(
        "Total Predicted Value of All {} Houses: {}",
        houses.height(),
        format_currency(total)
    ));

    view.heading(3, "Visual Comparison of Predicted Prices");
    view.chart(Chart::Bar {
        title: "Predicted Prices for Lydia's Inherited Houses".to_string(),
        y_label: "Predicted Price ($)".to_string(),
        bars: prices
            .iter()
            .enumerate()
            .map(|(i, price)| (format!("House {}", i + 1), *price))
            .collect(),
        format: ValueFormat::Currency,
    });

    view.info(
        "Recommendations for Lydia:\n\
         - Consider prioritizing houses with higher predicted values when selling.\n\
         - Explore cost-effective renovations (e.g. kitchen, bathrooms) in lower-valued houses.\n\
         - Compare predicted values with recent Ames market trends before making final decisions.",
    );

    view.separator();
    view.heading(3, "Prediction Confidence and Limitations");
    view.warning(
        "Important Notes:\n\
         - Predictions are based on historical Ames housing data.\n\
         - Model performance metrics are available on the Model Performance page.\n\
         - Market conditions and unique house features may affect actual sale prices.\n\
         - Professional appraisals are recommended before final selling decisions.",
    );
    view
}
