//! Live price prediction: the input form and the page that scores it.

use super::view::{PageView, Table};
use super::{Interaction, PageContext, PageError};
use crate::assemble::predict_live;
use crate::data::format_number;
use crate::types::{LiveOverrides, format_currency};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("{feature} must be between {min} and {max}, got {value}.")]
    OutOfRange {
        feature: String,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("{feature} takes whole numbers, got {value}.")]
    NotWholeNumber { feature: String, value: f64 },
    #[error("{feature} must be one of {options}, got {value}.")]
    NotAnOption {
        feature: String,
        value: f64,
        options: String,
    },
    #[error("'{0}' is not an input of the live form.")]
    UnknownFeature(String),
    #[error("Expected NAME=VALUE with a numeric value, got '{0}'.")]
    Malformed(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum ControlKind {
    Number { min: f64, max: f64, step: f64 },
    Choice { options: Vec<f64> },
}

/// One form control. The value is always inside the control's bounds.
#[derive(Clone, Debug, PartialEq)]
pub struct Control {
    pub feature: &'static str,
    pub label: &'static str,
    pub kind: ControlKind,
    value: f64,
}

impl Control {
    fn number(
        feature: &'static str,
        label: &'static str,
        min: f64,
        max: f64,
        step: f64,
        initial: f64,
    ) -> Self {
        Self {
            feature,
            label,
            kind: ControlKind::Number { min, max, step },
            value: initial,
        }
    }

    fn choice(
        feature: &'static str,
        label: &'static str,
        options: Vec<f64>,
        index: usize,
    ) -> Self {
        let value = options[index];
        Self {
            feature,
            label,
            kind: ControlKind::Choice { options },
            value,
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn set(&mut self, value: f64) -> Result<(), InputError> {
        match &self.kind {
            ControlKind::Number { min, max, step } => {
                if !value.is_finite() || value < *min || value > *max {
                    return Err(InputError::OutOfRange {
                        feature: self.feature.to_string(),
                        value,
                        min: *min,
                        max: *max,
                    });
                }
                // Integer bounds and step make an integer control.
                let whole = [min, max, step].iter().all(|b| b.fract() == 0.0);
                if whole && value.fract() != 0.0 {
                    return Err(InputError::NotWholeNumber {
                        feature: self.feature.to_string(),
                        value,
                    });
                }
            }
            ControlKind::Choice { options } => {
                if !options.contains(&value) {
                    return Err(InputError::NotAnOption {
                        feature: self.feature.to_string(),
                        value,
                        options: options
                            .iter()
                            .map(|o| format_number(*o))
                            .collect::<Vec<_>>()
                            .join(", "),
                    });
                }
            }
        }
        self.value = value;
        Ok(())
    }

    /// Moves by `steps` increments. Numbers clamp at their bounds; choices
    /// wrap around.
    pub fn step(&mut self, steps: i32) {
        match &self.kind {
            ControlKind::Number { min, max, step } => {
                self.value = (self.value + step * steps as f64).clamp(*min, *max);
            }
            ControlKind::Choice { options } => {
                let len = options.len() as i64;
                let current = options.iter().position(|o| *o == self.value).unwrap_or(0) as i64;
                let next = (current + steps as i64).rem_euclid(len) as usize;
                self.value = options[next];
            }
        }
    }

    pub fn allowed(&self) -> String {
        match &self.kind {
            ControlKind::Number { min, max, step } => format!(
                "{} to {} (step {})",
                format_number(*min),
                format_number(*max),
                format_number(*step)
            ),
            ControlKind::Choice { options } => match (options.first(), options.last()) {
                (Some(first), Some(last)) => {
                    format!("one of {}..{}", format_number(*first), format_number(*last))
                }
                _ => String::new(),
            },
        }
    }
}

/// The controls of the live form, in display order, plus the selected one.
#[derive(Clone, Debug, PartialEq)]
pub struct LiveInputs {
    controls: Vec<Control>,
    selected: usize,
}

impl Default for LiveInputs {
    fn default() -> Self {
        let qualities = (1..=10).map(f64::from).collect();
        Self {
            controls: vec![
                Control::number(
                    "GrLivArea",
                    "Ground Living Area (sq ft)",
                    300.0,
                    6000.0,
                    10.0,
                    1500.0,
                ),
                Control::number(
                    "TotalBsmtSF",
                    "Total Basement Area (sq ft)",
                    0.0,
                    3000.0,
                    10.0,
                    1000.0,
                ),
                Control::choice(
                    "OverallQual",
                    "Overall Quality (1 = Very Poor, 10 = Excellent)",
                    qualities,
                    6,
                ),
                Control::number(
                    "GarageArea",
                    "Garage Size (sq ft)",
                    0.0,
                    1500.0,
                    10.0,
                    500.0,
                ),
                Control::number(
                    "YearBuilt",
                    "Year the House was Built",
                    1800.0,
                    2024.0,
                    1.0,
                    2000.0,
                ),
                Control::number(
                    "1stFlrSF",
                    "First Floor (sq ft)",
                    300.0,
                    4000.0,
                    10.0,
                    1000.0,
                ),
            ],
            selected: 0,
        }
    }
}

impl LiveInputs {
    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    pub fn control(&self, feature: &str) -> Option<&Control> {
        self.controls.iter().find(|c| c.feature == feature)
    }

    pub fn set(&mut self, feature: &str, value: f64) -> Result<(), InputError> {
        self.controls
            .iter_mut()
            .find(|c| c.feature == feature)
            .ok_or_else(|| InputError::UnknownFeature(feature.to_string()))?
            .set(value)
    }

    /// Applies a `NAME=VALUE` assignment from the command line.
    pub fn apply_assignment(&mut self, assignment: &str) -> Result<(), InputError> {
        let malformed = || InputError::Malformed(assignment.to_string());
        let (name, value) = assignment.split_once('=').ok_or_else(malformed)?;
        let value: f64 = value.trim().parse().map_err(|_| malformed())?;
        self.set(name.trim(), value)
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn select_next(&mut self) {
        self.selected = (self.selected + 1) % self.controls.len();
    }

    pub fn select_previous(&mut self) {
        self.selected = (self.selected + self.controls.len() - 1) % self.controls.len();
    }

    pub fn step_selected(&mut self, steps: i32) {
        if let Some(control) = self.controls.get_mut(self.selected) {
            control.step(steps);
        }
    }

    /// The current form state as overrides for assembly.
    pub fn snapshot(&self) -> LiveOverrides {
        let mut overrides = LiveOverrides::new();
        for control in &self.controls {
            overrides.insert(control.feature, control.value);
        }
        overrides
    }

    fn values_table(&self) -> Table {
        Table::key_values(
            ["Feature", "Value"],
            self.controls
                .iter()
                .map(|c| (c.feature, format_number(c.value))),
        )
    }
}

pub const DETAILS_SECTION: &str = "Prediction Details";

pub fn render(ctx: &mut PageContext<'_>, interaction: &Interaction) -> PageView {
    let mut view = PageView::new("Live House Price Prediction Tool");
    view.heading(2, "Live House Price Prediction Tool");
    view.info(
        "- This tool predicts the sale price for any house in Ames, Iowa.\n\
         - Enter the house attributes below and request a prediction to get an estimate.\n\
         - The prediction comes from the trained model fitted on historical sales data.",
    );

    let pipeline = match ctx.cache.pipeline(&ctx.config.paths.pipeline) {
        Ok(pipeline) => pipeline,
        Err(err) => {
            view.failure("prediction pipeline", &PageError::from(err));
            return view;
        }
    };

    view.separator();
    view.heading(3, "Enter House Details");
    let inputs = &interaction.live_inputs;
    let mut form = Table::new(["Feature", "Description", "Value", "Allowed"]);
    for control in inputs.controls() {
        form.push_row([
            control.feature.to_string(),
            control.label.to_string(),
            format_number(control.value()),
            control.allowed(),
        ]);
    }
    view.table(form);

    if interaction.show_inputs {
        view.text("Current Input Values:");
        view.table(inputs.values_table());
    }

    if !interaction.predict_requested {
        return view;
    }

    view.heading(3, "Prediction Results");
    match predict_live(&inputs.snapshot(), ctx.defaults, pipeline.as_ref()) {
        Ok(prediction) => {
            view.success(format!(
                "Predicted Sale Price: {}",
                format_currency(prediction.price)
            ));
            view.expander(DETAILS_SECTION, interaction.is_open(DETAILS_SECTION), |inner| {
                inner.text("Key Features Entered:");
                inner.table(inputs.values_table());
                inner.separator();
                inner.text(
                    "Note: Other features were filled with typical values from the \
                     training dataset to make the prediction.",
                );
            });
        }
        Err(err) => {
            view.failure("live prediction", &PageError::from(err));
        }
    }
    view
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FeatureValue;

    #[test]
    fn initial_form_matches_documented_controls() {
        let inputs = LiveInputs::default();
        let features: Vec<&str> = inputs.controls().iter().map(|c| c.feature).collect();
        assert_eq!(
            features,
            vec![
                "GrLivArea",
                "TotalBsmtSF",
                "OverallQual",
                "GarageArea",
                "YearBuilt",
                "1stFlrSF",
            ]
        );
        let snapshot = inputs.snapshot();
        assert_eq!(
            snapshot.get("OverallQual"),
            Some(&FeatureValue::Number(7.0))
        );
        assert_eq!(
            snapshot.get("YearBuilt"),
            Some(&FeatureValue::Number(2000.0))
        );
        assert_eq!(snapshot.len(), 6);
    }

    #[test]
    fn out_of_range_numbers_are_rejected() {
        let mut inputs = LiveInputs::default();
        let err = inputs.set("GrLivArea", 250.0).unwrap_err();
        assert!(matches!(
            err,
            InputError::OutOfRange { min, max, .. } if min == 300.0 && max == 6000.0
        ));
        assert!(inputs.set("GrLivArea", f64::NAN).is_err());
        assert_eq!(inputs.control("GrLivArea").unwrap().value(), 1500.0);
        inputs.set("GrLivArea", 6000.0).unwrap();
    }

    #[test]
    fn integer_controls_reject_fractions() {
        let mut inputs = LiveInputs::default();
        assert!(matches!(
            inputs.apply_assignment("YearBuilt=1995.5"),
            Err(InputError::NotWholeNumber { .. })
        ));
        let err = inputs.set("GrLivArea", 1500.25).unwrap_err();
        assert_eq!(
            err.to_string(),
            "GrLivArea takes whole numbers, got 1500.25."
        );
        assert_eq!(inputs.control("YearBuilt").unwrap().value(), 2000.0);
        assert_eq!(inputs.control("GrLivArea").unwrap().value(), 1500.0);

        inputs.apply_assignment("YearBuilt=1995").unwrap();
        assert_eq!(inputs.control("YearBuilt").unwrap().value(), 1995.0);
    }

    #[test]
    fn choices_reject_non_options() {
        let mut inputs = LiveInputs::default();
        assert!(matches!(
            inputs.set("OverallQual", 7.5),
            Err(InputError::NotAnOption { .. })
        ));
        assert!(matches!(
            inputs.set("OverallQual", 11.0),
            Err(InputError::NotAnOption { .. })
        ));
        inputs.set("OverallQual", 9.0).unwrap();
    }

    #[test]
    fn stepping_clamps_numbers_and_wraps_choices() {
        let mut inputs = LiveInputs::default();
        inputs.step_selected(-200);
        assert_eq!(inputs.control("GrLivArea").unwrap().value(), 300.0);

        inputs.select_next();
        inputs.select_next();
        inputs.step_selected(4);
        assert_eq!(inputs.control("OverallQual").unwrap().value(), 1.0);

        inputs.select_previous();
        inputs.step_selected(1);
        assert_eq!(inputs.control("TotalBsmtSF").unwrap().value(), 1010.0);
    }

    #[test]
    fn assignments_are_parsed_and_validated() {
        let mut inputs = LiveInputs::default();
        inputs.apply_assignment("YearBuilt=1995").unwrap();
        assert_eq!(inputs.control("YearBuilt").unwrap().value(), 1995.0);
        assert!(matches!(
            inputs.apply_assignment("PoolArea=10"),
            Err(InputError::UnknownFeature(_))
        ));
        assert!(matches!(
            inputs.apply_assignment("YearBuilt"),
            Err(InputError::Malformed(_))
        ));
        assert!(matches!(
            inputs.apply_assignment("YearBuilt=new"),
            Err(InputError::Malformed(_))
        ));
    }
}
