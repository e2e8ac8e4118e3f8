use ameshouse::cache::ArtifactCache;
use ameshouse::config::DashboardConfig;
use ameshouse::data::FeatureTable;
use ameshouse::defaults::FeatureDefaults;
use ameshouse::pages::{Chart, Interaction, Page, PageContext, PageView, Tone};
use ameshouse::pipeline::{PricePipeline, PricePredictor};
use ameshouse::render::text::render_page;
use ameshouse::types::format_currency;
use std::fs;
use tempfile::TempDir;

const PIPELINE: &str = r#"
format_version = 1
target = "SalePrice"
feature_names_in = ["GrLivArea", "OverallQual", "TotalBsmtSF", "KitchenQual"]

[[steps]]
kind = "ordinal_encoder"
categories = { KitchenQual = ["Fa", "TA", "Gd", "Ex"] }

[regressor]
kind = "linear"
intercept = 10000.0
coefficients = { GrLivArea = 50.0, OverallQual = 10000.0, TotalBsmtSF = 20.0, KitchenQual = 5000.0 }
"#;

// SalePrice follows the pipeline's formula exactly.
const CLEANED: &str = "GrLivArea,OverallQual,TotalBsmtSF,KitchenQual,SalePrice
1500,7,1000,TA,180000
1200,5,800,Fa,136000
2000,8,1200,Gd,224000
1000,4,600,TA,117000
2500,9,1500,Ex,270000
1700,6,900,Gd,183000
1300,5,0,TA,130000
1800,7,1100,Gd,202000
";

const INHERITED: &str = "GrLivArea,OverallQual,TotalBsmtSF,KitchenQual
896,5,882,TA
1329,6,1329,Gd
928,5,928,TA
926,6,926,Gd
";

struct Fixture {
    dir: TempDir,
    config: DashboardConfig,
    defaults: FeatureDefaults,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = DashboardConfig::default();
        config.paths.cleaned_dataset = dir.path().join("house_prices_cleaned.csv");
        config.paths.pipeline = dir.path().join("best_regressor_pipeline.toml");
        config.paths.inherited_houses = dir.path().join("inherited_houses.csv");
        fs::write(&config.paths.cleaned_dataset, CLEANED).unwrap();
        fs::write(&config.paths.pipeline, PIPELINE).unwrap();
        fs::write(&config.paths.inherited_houses, INHERITED).unwrap();
        Self {
            dir,
            config,
            defaults: FeatureDefaults::embedded().unwrap(),
        }
    }

    fn render_with(
        &self,
        cache: &mut ArtifactCache,
        page: Page,
        interaction: &Interaction,
    ) -> PageView {
        let mut ctx = PageContext {
            config: &self.config,
            cache,
            defaults: &self.defaults,
        };
        page.render(&mut ctx, interaction)
    }

    fn render(&self, page: Page, interaction: &Interaction) -> PageView {
        self.render_with(&mut ArtifactCache::new(), page, interaction)
    }
}

fn predict_requested() -> Interaction {
    Interaction {
        predict_requested: true,
        ..Interaction::default()
    }
}

#[test]
fn every_page_renders_against_the_fixture() {
    let fixture = Fixture::new();
    for page in Page::ALL {
        let view = fixture.render(page, &Interaction::default());
        assert!(
            !view.has_errors(),
            "{}: {:?}",
            page.key(),
            view.callouts(Tone::Error)
        );
        assert!(!render_page(&view).is_empty());
    }
}

#[test]
fn live_prediction_uses_the_form_values() {
    let fixture = Fixture::new();
    let view = fixture.render(Page::Live, &predict_requested());
    // Form defaults: 1500 sq ft, quality 7, 1000 sq ft basement, kitchen "TA".
    assert_eq!(
        view.callouts(Tone::Success),
        vec!["Predicted Sale Price: $180,000"]
    );

    let text = render_page(&view);
    assert!(text.contains("[+] Prediction Details"));
    assert!(!text.contains("Key Features Entered"));
}

#[test]
fn no_prediction_until_requested() {
    let fixture = Fixture::new();
    let view = fixture.render(Page::Live, &Interaction::default());
    assert!(view.callouts(Tone::Success).is_empty());
    assert!(!render_page(&view).contains("Prediction Results"));
}

#[test]
fn missing_pipeline_is_an_error_without_a_prediction() {
    let fixture = Fixture::new();
    fs::remove_file(&fixture.config.paths.pipeline).unwrap();

    let view = fixture.render(Page::Live, &predict_requested());
    let errors = view.callouts(Tone::Error);
    assert_eq!(errors.len(), 1);
    assert!(
        errors[0].starts_with("Could not load prediction pipeline"),
        "{}",
        errors[0]
    );
    assert!(!render_page(&view).contains("Predicted Sale Price"));

    for page in [Page::Inherited, Page::Performance] {
        assert!(fixture.render(page, &Interaction::default()).has_errors());
    }
}

#[test]
fn pipeline_input_without_a_default_is_a_schema_error() {
    let fixture = Fixture::new();
    let with_pool = PIPELINE.replace(r#""KitchenQual"]"#, r#""KitchenQual", "PoolQC"]"#);
    assert_ne!(with_pool, PIPELINE);
    fs::write(&fixture.config.paths.pipeline, with_pool).unwrap();

    let view = fixture.render(Page::Live, &predict_requested());
    let errors = view.callouts(Tone::Error);
    assert_eq!(errors.len(), 1, "{errors:?}");
    assert!(
        errors[0].starts_with("Input schema mismatch live prediction"),
        "{}",
        errors[0]
    );
    assert!(errors[0].contains("PoolQC"));
    assert!(view.callouts(Tone::Success).is_empty());
    assert!(render_page(&view).contains("Enter House Details"));
}

#[test]
fn unencoded_category_is_a_computation_error() {
    let fixture = Fixture::new();
    let (head, rest) = PIPELINE.split_once("[[steps]]").unwrap();
    let (_, regressor) = rest.split_once("[regressor]").unwrap();
    fs::write(
        &fixture.config.paths.pipeline,
        format!("{head}[regressor]{regressor}"),
    )
    .unwrap();

    let view = fixture.render(Page::Live, &predict_requested());
    let errors = view.callouts(Tone::Error);
    assert_eq!(errors.len(), 1, "{errors:?}");
    assert!(
        errors[0].starts_with("Computation failed live prediction"),
        "{}",
        errors[0]
    );
    assert!(errors[0].contains("KitchenQual"));
    assert!(view.callouts(Tone::Success).is_empty());
}

#[test]
fn performance_without_the_target_column_reports_it() {
    let fixture = Fixture::new();
    let without_target: String = CLEANED
        .lines()
        .map(|line| line.rsplit_once(',').map_or(line, |(head, _)| head))
        .collect::<Vec<_>>()
        .join("\n");
    fs::write(&fixture.config.paths.cleaned_dataset, without_target).unwrap();

    let view = fixture.render(Page::Performance, &Interaction::default());
    let errors = view.callouts(Tone::Error);
    assert_eq!(errors.len(), 1);
    assert!(
        errors[0].starts_with("Input schema mismatch"),
        "{}",
        errors[0]
    );
    assert!(errors[0].contains("SalePrice"));
    assert!(view.charts().is_empty());
}

#[test]
fn performance_of_an_exact_fit() {
    let fixture = Fixture::new();
    let view = fixture.render(Page::Performance, &Interaction::default());
    assert_eq!(
        view.callouts(Tone::Success),
        vec!["R² Score: 1.000\n\nRMSE: $0\n\nMAE: $0"]
    );
    let Some(Chart::Scatter { points, reference, .. }) = view.charts().first().copied() else {
        panic!("expected the predicted-vs-actual scatter first");
    };
    assert_eq!(points.len(), 8);
    let line = reference.as_ref().expect("identity line");
    assert_eq!(line.from, (117_000.0, 117_000.0));
    assert_eq!(line.to, (270_000.0, 270_000.0));
}

#[test]
fn portfolio_total_is_the_exact_sum_of_predictions() {
    let fixture = Fixture::new();
    let houses = FeatureTable::from_csv(&fixture.config.paths.inherited_houses).unwrap();
    let pipeline = PricePipeline::load(&fixture.config.paths.pipeline).unwrap();
    let prices = pipeline.predict(&houses).unwrap();
    let total: f64 = prices.iter().sum();

    let view = fixture.render(Page::Inherited, &Interaction::default());
    let expected = format!(
        "Total Predicted Value of All 4 Houses: {}",
        format_currency(total)
    );
    assert!(view.callouts(Tone::Success).contains(&expected.as_str()));
    assert!(
        view.callouts(Tone::Warning)
            .iter()
            .all(|w| !w.starts_with("Expected 4"))
    );

    let bars = view
        .charts()
        .into_iter()
        .find_map(|chart| match chart {
            Chart::Bar { bars, .. } => Some(bars.clone()),
            _ => None,
        })
        .expect("bar chart of predicted prices");
    let charted: Vec<f64> = bars.iter().map(|(_, price)| *price).collect();
    assert_eq!(charted, prices.to_vec());
}

#[test]
fn unexpected_house_count_is_a_warning() {
    let fixture = Fixture::new();
    let three: String = INHERITED.lines().take(4).collect::<Vec<_>>().join("\n");
    fs::write(&fixture.config.paths.inherited_houses, three).unwrap();

    let view = fixture.render(Page::Inherited, &Interaction::default());
    assert!(!view.has_errors());
    assert!(
        view.callouts(Tone::Warning)
            .iter()
            .any(|w| w.starts_with("Expected 4 inherited houses but the file lists 3"))
    );
    assert!(
        view.callouts(Tone::Success)
            .iter()
            .any(|s| s.starts_with("Total Predicted Value of All 3 Houses"))
    );
}

#[test]
fn house_details_open_on_request() {
    let fixture = Fixture::new();
    let mut interaction = Interaction::default();
    interaction.toggle_section("Show Detailed House Information");
    let text = render_page(&fixture.render(Page::Inherited, &interaction));
    assert!(text.contains("[-] Show Detailed House Information"));
    assert!(text.contains("House 4 Details"));
    assert!(text.contains("Predicted Price: $"));
}

#[test]
fn artifacts_are_read_once_across_renders() {
    let fixture = Fixture::new();
    let mut cache = ArtifactCache::new();
    fixture.render_with(&mut cache, Page::Inherited, &Interaction::default());
    let loads = cache.loads();
    assert_eq!(loads, 2);

    // The files are gone but the cached copies still serve every page.
    fs::remove_dir_all(fixture.dir.path()).unwrap();
    let view = fixture.render_with(&mut cache, Page::Inherited, &Interaction::default());
    assert!(!view.has_errors());
    assert_eq!(cache.loads(), loads);

    cache.clear();
    let view = fixture.render_with(&mut cache, Page::Inherited, &Interaction::default());
    assert!(view.has_errors());
}

#[test]
fn expanded_correlation_study_skips_absent_variables() {
    let fixture = Fixture::new();
    let interaction = Interaction {
        expand_all: true,
        ..Interaction::default()
    };
    let view = fixture.render(Page::Correlation, &interaction);
    assert!(!view.has_errors());
    let warnings = view.callouts(Tone::Warning);
    assert!(
        warnings
            .iter()
            .any(|w| w.starts_with("GarageCars is not a column"))
    );
    assert!(
        warnings
            .iter()
            .any(|w| w.starts_with("YearBuilt is not a column"))
    );

    let charts = view.charts();
    assert!(
        charts
            .iter()
            .any(|c| matches!(c, Chart::Heatmap { labels, .. } if labels.len() == 4))
    );
    assert!(charts.iter().any(
        |c| matches!(c, Chart::Scatter { title, .. } if title == "OverallQual vs SalePrice")
    ));
}
