#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]

use ameshouse::cache::ArtifactCache;
use ameshouse::config::DashboardConfig;
use ameshouse::defaults::FeatureDefaults;
use ameshouse::pages::{Interaction, Page, PageContext};
use ameshouse::render::{terminal, text};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process;

#[derive(Clone, Copy, ValueEnum)]
pub enum PageKey {
    Summary,
    Correlation,
    Inherited,
    Live,
    Performance,
    Hypothesis,
}

impl From<PageKey> for Page {
    fn from(key: PageKey) -> Self {
        match key {
            PageKey::Summary => Page::Summary,
            PageKey::Correlation => Page::Correlation,
            PageKey::Inherited => Page::Inherited,
            PageKey::Live => Page::Live,
            PageKey::Performance => Page::Performance,
            PageKey::Hypothesis => Page::Hypothesis,
        }
    }
}

#[derive(Parser)]
#[command(
    name = "ameshouse",
    version,
    about = "Ames house-price dashboard",
    long_about = "Explore the Ames, Iowa housing data, study what drives sale prices \
                 and predict prices with a trained regression pipeline."
)]
pub struct Cli {
    /// Dashboard configuration file (defaults to ./ameshouse.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open the interactive terminal dashboard (the default)
    #[command(about = "Open the interactive terminal dashboard")]
    Tui,

    /// Render one page as text
    #[command(about = "Render one dashboard page as text to stdout")]
    Show {
        #[arg(value_enum)]
        page: PageKey,

        /// Open every collapsible section
        #[arg(long)]
        expand: bool,

        /// Open one collapsible section by its label (repeatable)
        #[arg(long = "open", value_name = "LABEL")]
        open: Vec<String>,
    },

    /// Score a house described on the command line
    #[command(about = "Run the live prediction form with the given inputs")]
    Predict {
        /// Override one form input, e.g. --set OverallQual=9 (repeatable)
        #[arg(long = "set", value_name = "NAME=VALUE")]
        assignments: Vec<String>,

        /// Also print the table of entered values
        #[arg(long)]
        show_inputs: bool,
    },

    /// List the dashboard pages
    #[command(about = "List page keys and titles")]
    Pages,
}

fn init_logging(interactive: bool) {
    let mut builder = env_logger::Builder::from_default_env();
    if std::env::var_os("RUST_LOG").is_none() {
        // The alternate screen would be overwritten by stderr output.
        builder.filter_level(if interactive {
            log::LevelFilter::Off
        } else {
            log::LevelFilter::Warn
        });
    }
    builder.init();
}

fn load_settings(
    config_path: Option<PathBuf>,
) -> Result<(DashboardConfig, FeatureDefaults), Box<dyn std::error::Error>> {
    let config = DashboardConfig::discover(config_path.as_deref())?;
    let defaults = config.feature_defaults()?;
    log::info!(
        "Loaded '{}' with {} feature defaults (revision {})",
        config.app_name,
        defaults.len(),
        defaults.revision()
    );
    Ok((config, defaults))
}

/// Renders a single page once, as the scripted sub-commands need.
fn print_page(
    config: &DashboardConfig,
    defaults: &FeatureDefaults,
    page: Page,
    interaction: &Interaction,
) {
    let mut cache = ArtifactCache::new();
    let mut ctx = PageContext {
        config,
        cache: &mut cache,
        defaults,
    };
    let view = page.render(&mut ctx, interaction);
    print!("{}", text::render_page(&view));
}

fn run_show(
    config_path: Option<PathBuf>,
    page: PageKey,
    expand: bool,
    open: Vec<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (config, defaults) = load_settings(config_path)?;
    let interaction = Interaction {
        expand_all: expand,
        open_sections: open.into_iter().collect(),
        ..Interaction::default()
    };
    print_page(&config, &defaults, page.into(), &interaction);
    Ok(())
}

fn run_predict(
    config_path: Option<PathBuf>,
    assignments: Vec<String>,
    show_inputs: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let (config, defaults) = load_settings(config_path)?;
    let mut interaction = Interaction {
        predict_requested: true,
        show_inputs,
        ..Interaction::default()
    };
    for assignment in &assignments {
        interaction.live_inputs.apply_assignment(assignment)?;
    }
    interaction.toggle_section(ameshouse::pages::live::DETAILS_SECTION);
    print_page(&config, &defaults, Page::Live, &interaction);
    Ok(())
}

fn run_tui(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let (config, defaults) = load_settings(config_path)?;
    terminal::run(config, defaults)?;
    Ok(())
}

fn list_pages() {
    for (i, page) in Page::ALL.iter().enumerate() {
        println!("{} {:<12} {}", i + 1, page.key(), page.title());
    }
}

fn main() {
    let Cli { config, command } = Cli::parse();
    init_logging(matches!(command, None | Some(Commands::Tui)));

    let result = match command {
        None | Some(Commands::Tui) => run_tui(config),
        Some(Commands::Show { page, expand, open }) => run_show(config, page, expand, open),
        Some(Commands::Predict {
            assignments,
            show_inputs,
        }) => run_predict(config, assignments, show_inputs),
        Some(Commands::Pages) => {
            list_pages();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
