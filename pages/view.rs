//! # Page View Model
//!
//! A page renders into a flat list of blocks. Front ends decide how a block
//! looks; pages decide only what it says. All numbers are formatted before
//! they reach a block, except chart data, which stays raw.

use crate::data::FeatureTable;
use crate::stats::{FiveNumber, Histogram};
use crate::types::format_currency;
use ndarray::Array2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tone {
    Info,
    Success,
    Warning,
    Error,
}

impl Tone {
    pub fn tag(self) -> &'static str {
        match self {
            Tone::Info => "INFO",
            Tone::Success => "OK",
            Tone::Warning => "WARN",
            Tone::Error => "ERROR",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row<S: Into<String>>(&mut self, cells: impl IntoIterator<Item = S>) {
        self.rows.push(cells.into_iter().map(Into::into).collect());
    }

    /// Every column and row of `table`, missing cells left blank.
    pub fn from_features(table: &FeatureTable) -> Self {
        let mut out = Self::new(table.column_names());
        for row in 0..table.height() {
            out.push_row(table.column_names().map(|name| table.cell_text(name, row)));
        }
        out
    }

    /// Rows of `(name, value)` pairs, the vertical layout used for a single
    /// record.
    pub fn key_values<K: Into<String>, V: Into<String>>(
        headers: [&str; 2],
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        let mut out = Self::new(headers);
        for (key, value) in pairs {
            out.push_row([key.into(), value.into()]);
        }
        out
    }

    pub fn column(&self, header: &str) -> Option<Vec<&str>> {
        let index = self.headers.iter().position(|h| h == header)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(index).map_or("", String::as_str))
                .collect(),
        )
    }
}

/// How a bar's value is printed next to it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueFormat {
    Currency,
    /// Fixed point with this many decimals.
    Decimal(usize),
}

impl ValueFormat {
    pub fn format(self, value: f64) -> String {
        match self {
            ValueFormat::Currency => format_currency(value),
            ValueFormat::Decimal(places) => format!("{value:.places$}"),
        }
    }
}

/// A straight segment drawn over a scatter plot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReferenceLine {
    pub from: (f64, f64),
    pub to: (f64, f64),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Chart {
    Scatter {
        title: String,
        x_label: String,
        y_label: String,
        points: Vec<(f64, f64)>,
        reference: Option<ReferenceLine>,
        annotation: Option<String>,
    },
    Bar {
        title: String,
        y_label: String,
        bars: Vec<(String, f64)>,
        format: ValueFormat,
    },
    Histogram {
        title: String,
        x_label: String,
        histogram: Histogram,
    },
    Heatmap {
        title: String,
        labels: Vec<String>,
        values: Array2<f64>,
    },
    BoxPlot {
        title: String,
        y_label: String,
        groups: Vec<(String, FiveNumber)>,
    },
}

impl Chart {
    pub fn title(&self) -> &str {
        match self {
            Chart::Scatter { title, .. }
            | Chart::Bar { title, .. }
            | Chart::Histogram { title, .. }
            | Chart::Heatmap { title, .. }
            | Chart::BoxPlot { title, .. } => title,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Block {
    /// Level 1 is the page title; 2 and 3 are sections.
    Heading { level: u8, text: String },
    Text(String),
    Callout { tone: Tone, text: String },
    Table(Table),
    Chart(Chart),
    Separator,
    /// A collapsible section. Closed sections carry no content; pages skip
    /// the work behind them.
    Expander {
        label: String,
        open: bool,
        blocks: Vec<Block>,
    },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PageView {
    pub title: String,
    pub blocks: Vec<Block>,
}

impl PageView {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            blocks: Vec::new(),
        }
    }

    pub fn push(&mut self, block: Block) -> &mut Self {
        self.blocks.push(block);
        self
    }

    pub fn heading(&mut self, level: u8, text: impl Into<String>) -> &mut Self {
        self.push(Block::Heading {
            level,
            text: text.into(),
        })
    }

    pub fn text(&mut self, text: impl Into<String>) -> &mut Self {
        self.push(Block::Text(text.into()))
    }

    pub fn callout(&mut self, tone: Tone, text: impl Into<String>) -> &mut Self {
        self.push(Block::Callout {
            tone,
            text: text.into(),
        })
    }

    pub fn info(&mut self, text: impl Into<String>) -> &mut Self {
        self.callout(Tone::Info, text)
    }

    pub fn success(&mut self, text: impl Into<String>) -> &mut Self {
        self.callout(Tone::Success, text)
    }

    pub fn warning(&mut self, text: impl Into<String>) -> &mut Self {
        self.callout(Tone::Warning, text)
    }

    pub fn error(&mut self, text: impl Into<String>) -> &mut Self {
        self.callout(Tone::Error, text)
    }

    pub fn table(&mut self, table: Table) -> &mut Self {
        self.push(Block::Table(table))
    }

    pub fn chart(&mut self, chart: Chart) -> &mut Self {
        self.push(Block::Chart(chart))
    }

    pub fn separator(&mut self) -> &mut Self {
        self.push(Block::Separator)
    }

    /// Adds a section whose content is built by `fill` only when `open`.
    pub fn expander(
        &mut self,
        label: &str,
        open: bool,
        fill: impl FnOnce(&mut PageView),
    ) -> &mut Self {
        let mut inner = PageView::new(label);
        if open {
            fill(&mut inner);
        }
        self.push(Block::Expander {
            label: label.to_string(),
            open,
            blocks: inner.blocks,
        })
    }

    /// Every block, depth first, including those inside open sections.
    pub fn walk(&self) -> Vec<&Block> {
        fn visit<'a>(blocks: &'a [Block], out: &mut Vec<&'a Block>) {
            for block in blocks {
                out.push(block);
                if let Block::Expander { blocks, .. } = block {
                    visit(blocks, out);
                }
            }
        }
        let mut out = Vec::new();
        visit(&self.blocks, &mut out);
        out
    }

    pub fn callouts(&self, tone: Tone) -> Vec<&str> {
        self.walk()
            .into_iter()
            .filter_map(|block| match block {
                Block::Callout { tone: t, text } if *t == tone => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn tables(&self) -> Vec<&Table> {
        self.walk()
            .into_iter()
            .filter_map(|block| match block {
                Block::Table(table) => Some(table),
                _ => None,
            })
            .collect()
    }

    pub fn charts(&self) -> Vec<&Chart> {
        self.walk()
            .into_iter()
            .filter_map(|block| match block {
                Block::Chart(chart) => Some(chart),
                _ => None,
            })
            .collect()
    }

    /// Labels of the page's top-level sections, open or closed, in order.
    pub fn section_labels(&self) -> Vec<&str> {
        self.blocks
            .iter()
            .filter_map(|block| match block {
                Block::Expander { label, .. } => Some(label.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn has_errors(&self) -> bool {
        !self.callouts(Tone::Error).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_expanders_skip_their_content() {
        let mut view = PageView::new("Demo");
        let mut ran = false;
        view.expander("Closed", false, |inner| {
            ran = true;
            inner.text("never");
        });
        view.expander("Open", true, |inner| {
            inner.warning("inside");
        });
        assert!(!ran);
        assert_eq!(view.callouts(Tone::Warning), vec!["inside"]);
        assert_eq!(view.walk().len(), 3);
        assert_eq!(view.section_labels(), vec!["Closed", "Open"]);
    }

    #[test]
    fn value_formats_do_not_depend_on_magnitude() {
        assert_eq!(ValueFormat::Currency.format(950.0), "$950");
        assert_eq!(ValueFormat::Currency.format(180_000.0), "$180,000");
        assert_eq!(ValueFormat::Decimal(3).format(1234.5), "1234.500");
        assert_eq!(ValueFormat::Decimal(3).format(0.25), "0.250");
    }

    #[test]
    fn key_value_tables_are_vertical() {
        let table = Table::key_values(
            ["Feature", "Value"],
            [("GrLivArea", "1500"), ("OverallQual", "7")],
        );
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.column("Value"), Some(vec!["1500", "7"]));
        assert_eq!(table.column("Missing"), None);
    }
}
