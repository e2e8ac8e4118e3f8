//! # Dashboard Pages
//!
//! Six independent pages, listed in sidebar order by [`Page::ALL`]. Each one
//! reads whatever artifacts it needs through the shared [`ArtifactCache`] and
//! returns a [`PageView`]. A failed load or computation becomes an error
//! callout on that page and nothing else; other pages keep working.

pub mod correlation;
pub mod hypothesis;
pub mod inherited;
pub mod live;
pub mod performance;
pub mod summary;
pub mod view;

use crate::cache::ArtifactCache;
use crate::config::DashboardConfig;
use crate::data::DataError;
use crate::defaults::FeatureDefaults;
use crate::pipeline::PipelineError;
use crate::stats::StatsError;
use std::collections::BTreeSet;
use thiserror::Error;

pub use live::{Control, ControlKind, InputError, LiveInputs};
pub use view::{Block, Chart, PageView, Table, Tone, ValueFormat};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Page {
    Summary,
    Correlation,
    Inherited,
    Live,
    Performance,
    Hypothesis,
}

impl Page {
    pub const ALL: [Page; 6] = [
        Page::Summary,
        Page::Correlation,
        Page::Inherited,
        Page::Live,
        Page::Performance,
        Page::Hypothesis,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Page::Summary => "Project Summary",
            Page::Correlation => "Price Correlation Study",
            Page::Inherited => "Predict Lydia's Houses",
            Page::Live => "Live Price Prediction Tool",
            Page::Performance => "Model Performance",
            Page::Hypothesis => "Project Hypothesis & Validation",
        }
    }

    /// Short name used on the command line.
    pub fn key(self) -> &'static str {
        match self {
            Page::Summary => "summary",
            Page::Correlation => "correlation",
            Page::Inherited => "inherited",
            Page::Live => "live",
            Page::Performance => "performance",
            Page::Hypothesis => "hypothesis",
        }
    }

    pub fn render(self, ctx: &mut PageContext<'_>, interaction: &Interaction) -> PageView {
        log::debug!("Rendering page '{}'", self.key());
        match self {
            Page::Summary => summary::render(ctx),
            Page::Correlation => correlation::render(ctx, interaction),
            Page::Inherited => inherited::render(ctx, interaction),
            Page::Live => live::render(ctx, interaction),
            Page::Performance => performance::render(ctx),
            Page::Hypothesis => hypothesis::render(interaction),
        }
    }
}

/// What a page may read while rendering.
pub struct PageContext<'a> {
    pub config: &'a DashboardConfig,
    pub cache: &'a mut ArtifactCache,
    pub defaults: &'a FeatureDefaults,
}

/// The user's state for one render: form values, toggles and open sections.
#[derive(Clone, Debug, Default)]
pub struct Interaction {
    pub live_inputs: LiveInputs,
    /// Set for the render that follows a press of the predict action.
    pub predict_requested: bool,
    pub show_inputs: bool,
    pub expand_all: bool,
    pub open_sections: BTreeSet<String>,
}

impl Interaction {
    pub fn is_open(&self, label: &str) -> bool {
        self.expand_all || self.open_sections.contains(label)
    }

    pub fn toggle_section(&mut self, label: &str) {
        if !self.open_sections.remove(label) {
            self.open_sections.insert(label.to_string());
        }
    }
}

/// The three ways a page can fail, as shown to the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    Load,
    SchemaMismatch,
    Computation,
}

impl FailureKind {
    pub fn label(self) -> &'static str {
        match self {
            FailureKind::Load => "Could not load",
            FailureKind::SchemaMismatch => "Input schema mismatch",
            FailureKind::Computation => "Computation failed",
        }
    }
}

#[derive(Error, Debug)]
pub enum PageError {
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Stats(#[from] StatsError),
}

impl PageError {
    pub fn kind(&self) -> FailureKind {
        match self {
            PageError::Data(DataError::ColumnNotFound(_))
            | PageError::Data(DataError::ColumnWrongType { .. }) => FailureKind::SchemaMismatch,
            PageError::Data(_) => FailureKind::Load,
            PageError::Pipeline(
                PipelineError::IoError(_)
                | PipelineError::TomlParseError(_)
                | PipelineError::InvalidArtifact(_),
            ) => FailureKind::Load,
            PageError::Pipeline(PipelineError::SchemaMismatch { .. }) => {
                FailureKind::SchemaMismatch
            }
            PageError::Pipeline(_) | PageError::Stats(_) => FailureKind::Computation,
        }
    }
}

impl PageView {
    /// Reports `err` as an error callout, `what` naming the failed step.
    pub fn failure(&mut self, what: &str, err: &PageError) -> &mut Self {
        log::warn!("{what}: {err}");
        let text = format!("{} {what}: {err}", err.kind().label());
        self.error(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_and_titles_are_unique() {
        let keys: BTreeSet<&str> = Page::ALL.iter().map(|p| p.key()).collect();
        let titles: BTreeSet<&str> = Page::ALL.iter().map(|p| p.title()).collect();
        assert_eq!(keys.len(), 6);
        assert_eq!(titles.len(), 6);
    }

    #[test]
    fn failures_map_to_user_facing_kinds() {
        let missing = PageError::from(DataError::ColumnNotFound("SalePrice".to_string()));
        assert_eq!(missing.kind(), FailureKind::SchemaMismatch);

        let io = PageError::from(PipelineError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "gone",
        )));
        assert_eq!(io.kind(), FailureKind::Load);

        let nan = PageError::from(PipelineError::NonFiniteOutput { row: 3 });
        assert_eq!(nan.kind(), FailureKind::Computation);
    }

    #[test]
    fn sections_toggle_and_expand_all_overrides() {
        let mut interaction = Interaction::default();
        assert!(!interaction.is_open("Inspect House Sales Dataset"));
        interaction.toggle_section("Inspect House Sales Dataset");
        assert!(interaction.is_open("Inspect House Sales Dataset"));
        interaction.toggle_section("Inspect House Sales Dataset");
        assert!(!interaction.is_open("Inspect House Sales Dataset"));
        interaction.expand_all = true;
        assert!(interaction.is_open("Anything"));
    }
}
