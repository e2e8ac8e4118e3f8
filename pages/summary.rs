use super::view::{PageView, Table};
use super::{PageContext, PageError};

pub const DOCUMENTATION_URL: &str =
    "https://github.com/Zozo62442/milestone-project-heritage-housing-issues";

pub fn render(ctx: &mut PageContext<'_>) -> PageView {
    let mut view = PageView::new("Project Summary");
    view.heading(2, "Project Summary");
    view.info(
        "Project Context\n\
         - Client: Lydia, who inherited 4 properties in Ames, Iowa from her great-grandfather.\n\
         - Goal: Help maximize the sales price for the inherited properties.\n\
         - Challenge: Lydia's property knowledge is from her home state, not Iowa.\n\
         - Solution: Use Ames housing data to understand what drives property values.\n\n\
         Dataset\n\
         - Contains house sales data from Ames, Iowa.\n\
         - Features: house attributes like size, quality, condition, garage, kitchen, basement.\n\
         - Target variable: SalePrice (the selling price of each property).",
    );
    view.text(format!(
        "For additional information, please visit the Project Documentation: {DOCUMENTATION_URL}"
    ));
    view.success(
        "Business Requirements\n\
         - BR1: Discover how house attributes correlate with sale price. Provide data \
         visualizations showing relationships between key features and sale price.\n\
         - BR2: Predict house sale prices for Lydia's 4 inherited houses and create a tool \
         to predict prices for any house in Ames, Iowa.",
    );

    view.heading(3, "Dataset Overview");
    match ctx.cache.table(&ctx.config.paths.cleaned_dataset) {
        Ok(table) => {
            view.text(format!(
                "The dataset has {} rows and {} columns.",
                table.height(),
                table.width()
            ));
            view.text("First 5 rows of the dataset:");
            view.table(Table::from_features(&table.head(5)));
        }
        Err(err) => {
            view.failure("house sales dataset", &PageError::from(err));
        }
    }

    view.heading(3, "Key Variables");
    view.text(
        "- OverallQual: Overall material and finish quality\n\
         - GrLivArea: Above ground living area (sq ft)\n\
         - GarageCars: Garage size in car capacity\n\
         - KitchenQual: Kitchen quality rating\n\
         - TotalBsmtSF: Total basement area (sq ft)\n\
         - SalePrice: Target variable we want to predict",
    );

    view.heading(3, "Project Hypotheses");
    view.info(
        "Hypothesis 1: House size, quality, and condition are highly correlated to sale price.\n\n\
         Hypothesis 2: Garage size, kitchen quality, and basement finish also play a \
         significant role in determining sale price.\n\n\
         Validation Strategy: Correlation analysis, Predictive Power Score (PPS), \
         visualizations, and feature importance from ML models.",
    );
    view
}
