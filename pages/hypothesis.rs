//! Static narrative. Nothing here reads an artifact.

use super::Interaction;
use super::view::PageView;

pub fn render(interaction: &Interaction) -> PageView {
    let mut view = PageView::new("Project Hypothesis & Validation");
    view.heading(2, "Project Hypothesis and Validation");
    view.info(
        "This page summarizes the project hypotheses and how they were tested and \
         validated through data analysis and machine learning model results.",
    );

    view.separator();
    view.heading(3, "Hypothesis 1: House Size, Quality, and Condition");
    view.text(
        "Hypothesis Statement: House size, overall quality, and garage area are highly \
         correlated to sale price.",
    );
    let first = "Validation Methods (Hypothesis 1)";
    view.expander(first, interaction.is_open(first), |inner| {
        inner.text(
            "How we tested this hypothesis:\n\
             1. Correlation Analysis: Calculated Pearson and Spearman correlations\n\
             2. Predictive Power Score (PPS): Measured predictive relationships\n\
             3. Feature Importance: Analyzed ML model feature importance\n\
             4. Visualizations: Created correlation heatmaps",
        );
    });
    view.text("Validation Results:");
    view.success(
        "Confirmed: House size features show strong correlation with sale price\n\
         - GrLivArea correlation: ~0.71 (p < 0.001)\n\
         - TotalBsmtSF correlation: ~0.61 (p < 0.001)\n\n\
         Confirmed: Quality measures are highly predictive\n\
         - OverallQual correlation: ~0.79 (strongest single predictor)\n\
         - OverallQual consistently ranked top in feature importance\n\n\
         Partially confirmed: Condition is weaker than expected\n\
         - OverallCond correlation: ~0.1-0.2 (low predictive power)\n\
         - Listed among lowest PPS scores with SalePrice",
    );

    view.separator();
    view.heading(3, "Hypothesis 2: Garage, Kitchen, and Basement Features");
    view.text(
        "Hypothesis Statement: Garage size, kitchen quality, and basement finish also play \
         a significant role in determining sale price.",
    );
    let second = "Validation Methods (Hypothesis 2)";
    view.expander(second, interaction.is_open(second), |inner| {
        inner.text(
            "How we tested this hypothesis:\n\
             1. Correlation Analysis: Analyzed garage, kitchen, and basement features\n\
             2. Feature Importance: Ranked these features in the ML model\n\
             3. Categorical Analysis: Used box plots for quality ratings\n\
             4. Comparative Analysis: Compared importance against other features",
        );
    });
    view.text("Validation Results:");
    view.success(
        "Confirmed: Garage features significantly impact price\n\
         - GarageCars correlation: ~0.64 (high)\n\
         - GarageArea correlation: ~0.62\n\n\
         Confirmed: Kitchen quality is a strong predictor\n\
         - KitchenQual shows clear price separation\n\
         - 'Excellent' kitchens average significantly higher SalePrice than 'Typical'\n\n\
         Confirmed: Basement features contribute meaningfully\n\
         - BsmtFinSF1 correlation: ~0.43\n\
         - Finished basements increase sale price by ~$15,000-$20,000 on average",
    );

    view.separator();
    view.heading(3, "Overall Hypothesis Validation Summary");
    view.info(
        "Both hypotheses were largely confirmed by the analysis.\n\n\
         Hypothesis 1 (confirmed): Size and quality features (GrLivArea, OverallQual, \
         TotalBsmtSF) show some of the strongest correlations with SalePrice (0.6-0.8). \
         Condition was weaker than expected.\n\n\
         Hypothesis 2 (confirmed): Garage, kitchen, and basement features are among the top \
         predictors. GarageCars, KitchenQual, and BsmtFinSF1 ranked high in importance metrics.\n\n\
         Key Insights:\n\
         - Quality measures (OverallQual, KitchenQual) outperform size in predictive strength\n\
         - Size (living area, basement) still matters, but less than quality\n\
         - Condition (OverallCond) is not a reliable predictor",
    );

    view.heading(3, "Business Implications for Lydia");
    view.success(
        "Actionable Insights for Maximizing Sale Price:\n\n\
         1. Prioritize Quality: Quality features strongly influence price, so highlight \
         property quality in listings.\n\
         2. Emphasize Living Space: Market total living area and finished basement space.\n\
         3. Garage Value: Larger garages (capacity, area) clearly add value.\n\
         4. Kitchen Return: Kitchens with higher quality ratings carry a significant premium.\n\
         5. Basement Finishing: If unfinished, consider finishing basements to boost sale price.",
    );

    view.separator();
    view.heading(3, "Detailed Validation Methodology");
    let methods = "Statistical Methods Used";
    view.expander(methods, interaction.is_open(methods), |inner| {
        inner.text(
            "Correlation Analysis:\n\
             - Pearson correlation for linear relationships\n\
             - Spearman correlation for monotonic relationships\n\n\
             Predictive Power Score (PPS):\n\
             - Non-linear relationship detection\n\
             - Asymmetric relationship measurement\n\n\
             Machine Learning Validation:\n\
             - Feature importance from the trained model\n\n\
             Visual Analysis:\n\
             - Correlation heatmaps",
        );
    });

    view.heading(3, "Limitations and Future Considerations");
    view.warning(
        "Study Limitations:\n\
         - Analysis based on historical Ames, Iowa data\n\
         - Market conditions may have changed since data collection\n\
         - Some features may have non-linear relationships not fully captured\n\
         - External factors (market trends, economic conditions) not included",
    );
    view
}
