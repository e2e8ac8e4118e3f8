use serde::{Deserialize, Serialize};
use std::fmt;

/// A single cell of house data: either a measured quantity or a category label.
///
/// Deserialized untagged so that TOML assets can write `OverallQual = 6.1` and
/// `KitchenQual = "TA"` side by side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Number(f64),
    Category(String),
}

impl FeatureValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Category(_) => None,
        }
    }

    pub fn as_category(&self) -> Option<&str> {
        match self {
            Self::Number(_) => None,
            Self::Category(label) => Some(label),
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Self::Number(_))
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Category(label) => f.write_str(label),
        }
    }
}

impl From<f64> for FeatureValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for FeatureValue {
    fn from(label: &str) -> Self {
        Self::Category(label.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(label: String) -> Self {
        Self::Category(label)
    }
}

/// An ordered, single-row feature record.
///
/// Order is significant: once assembled against a pipeline it mirrors the
/// pipeline's declared input schema exactly.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureVector {
    entries: Vec<(String, FeatureValue)>,
}

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the value for `name` in place, or appends it at the end.
    pub fn set(&mut self, name: &str, value: FeatureValue) {
        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing == name)
        {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureValue)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, FeatureValue)> for FeatureVector {
    fn from_iter<I: IntoIterator<Item = (String, FeatureValue)>>(iter: I) -> Self {
        let mut vector = Self::new();
        for (name, value) in iter {
            vector.set(&name, value);
        }
        vector
    }
}

/// Values entered through the live form during one interaction.
///
/// Holds only the features the form exposes; everything else comes from the
/// default table at assembly time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LiveOverrides {
    values: FeatureVector,
}

impl LiveOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: impl Into<FeatureValue>) {
        self.values.set(name, value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.values.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_vector(&self) -> &FeatureVector {
        &self.values
    }
}

/// The outcome of one live prediction: the raw pipeline output and the exact
/// record that produced it.
#[derive(Clone, Debug, PartialEq)]
pub struct LivePrediction {
    pub price: f64,
    pub features: FeatureVector,
}

/// Formats a price as whole dollars with thousands separators, e.g. `$208,500`.
///
/// Rounding happens here and nowhere else; callers keep the raw value.
pub fn format_currency(value: f64) -> String {
    if !value.is_finite() {
        return format!("${value}");
    }
    let rounded = value.round();
    let sign = if rounded < 0.0 { "-" } else { "" };
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{sign}${grouped}")
}
