//! # Prediction Assembly
//!
//! Builds the single record the pipeline scores for a live prediction. The
//! dashboard only exposes a handful of inputs; every other feature the
//! pipeline was fitted on comes from the default table.

use crate::defaults::FeatureDefaults;
use crate::pipeline::{PipelineError, PricePredictor};
use crate::types::{FeatureVector, LiveOverrides, LivePrediction};

/// Overlays `overrides` on `defaults` and reindexes the result to `schema`.
///
/// The returned record holds exactly the names in `schema`, in that order.
/// Override keys not present in the defaults still take part and survive if
/// the schema asks for them. Names outside the schema (the `SalePrice` entry
/// of the default table, for one) are dropped.
pub fn assemble(
    overrides: &LiveOverrides,
    defaults: &FeatureDefaults,
    schema: &[String],
) -> Result<FeatureVector, PipelineError> {
    let mut seeded = defaults.to_vector();
    for (name, value) in overrides.iter() {
        seeded.set(name, value.clone());
    }

    let missing: Vec<String> = schema
        .iter()
        .filter(|name| !seeded.contains(name))
        .cloned()
        .collect();
    if !missing.is_empty() {
        log::warn!(
            "Cannot assemble a live record; missing features: {}",
            missing.join(", ")
        );
        return Err(PipelineError::SchemaMismatch { missing });
    }

    Ok(schema
        .iter()
        .filter_map(|name| {
            seeded
                .get(name)
                .map(|value| (name.clone(), value.clone()))
        })
        .collect())
}

/// Assembles the live record and scores it with exactly one call to the
/// predictor. The raw output is returned unrounded.
pub fn predict_live<P: PricePredictor + ?Sized>(
    overrides: &LiveOverrides,
    defaults: &FeatureDefaults,
    predictor: &P,
) -> Result<LivePrediction, PipelineError> {
    let features = assemble(overrides, defaults, predictor.feature_names_in())?;
    let price = predictor.predict_record(&features)?;
    log::debug!(
        "Live prediction from {} overrides: {price}",
        overrides.len()
    );
    Ok(LivePrediction { price, features })
}
