//! # Plain-Text Rendering
//!
//! Turns a page view into lines of text: tables are column-aligned, charts
//! become compact character plots or summary tables. The terminal dashboard
//! reuses [`leaf_lines`] for everything except its own widgets.

use crate::data::format_number;
use crate::pages::view::{Block, Chart, PageView, Table, Tone};
use itertools::Itertools;

const BAR_WIDTH: usize = 40;
const PLOT_WIDTH: usize = 60;
const PLOT_HEIGHT: usize = 16;
const RULE_WIDTH: usize = 72;

/// The whole page, title first, one trailing newline.
pub fn render_page(view: &PageView) -> String {
    let mut lines = vec![
        view.title.clone(),
        "=".repeat(view.title.chars().count()),
        String::new(),
    ];
    push_blocks(&view.blocks, 0, &mut lines);
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn push_blocks(blocks: &[Block], indent: usize, out: &mut Vec<String>) {
    let pad = " ".repeat(indent);
    for block in blocks {
        match block {
            Block::Expander {
                label,
                open,
                blocks,
            } => {
                out.push(format!("{pad}{}", expander_header(label, *open)));
                if *open {
                    push_blocks(blocks, indent + 4, out);
                }
            }
            leaf => {
                out.extend(leaf_lines(leaf).into_iter().map(|line| format!("{pad}{line}")));
            }
        }
        out.push(String::new());
    }
}

pub fn expander_header(label: &str, open: bool) -> String {
    if open {
        format!("[-] {label}")
    } else {
        format!("[+] {label}")
    }
}

/// Lines for any block other than an expander.
pub fn leaf_lines(block: &Block) -> Vec<String> {
    match block {
        Block::Heading { level, text } => {
            let rule = if *level <= 2 { '-' } else { '~' };
            vec![text.clone(), rule.to_string().repeat(text.chars().count())]
        }
        Block::Text(text) => text.lines().map(str::to_string).collect(),
        Block::Callout { tone, text } => callout_lines(*tone, text),
        Block::Table(table) => table_lines(table),
        Block::Chart(chart) => chart_lines(chart),
        Block::Separator => vec!["-".repeat(RULE_WIDTH)],
        Block::Expander { label, open, .. } => vec![expander_header(label, *open)],
    }
}

fn callout_lines(tone: Tone, text: &str) -> Vec<String> {
    let tag = format!("[{}] ", tone.tag());
    let pad = " ".repeat(tag.len());
    text.lines()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                format!("{tag}{line}")
            } else if line.is_empty() {
                String::new()
            } else {
                format!("{pad}{line}")
            }
        })
        .collect()
}

pub fn table_lines(table: &Table) -> Vec<String> {
    let columns = table
        .rows
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(table.headers.len()))
        .max()
        .unwrap_or(0);
    let widths: Vec<usize> = (0..columns)
        .map(|c| {
            std::iter::once(&table.headers)
                .chain(&table.rows)
                .filter_map(|row| row.get(c))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();
    let format_row = |row: &[String]| {
        (0..columns)
            .map(|c| {
                let cell = row.get(c).map_or("", String::as_str);
                format!("{cell:<width$}", width = widths[c])
            })
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut out = vec![format_row(&table.headers)];
    out.push(widths.iter().map(|w| "-".repeat(*w)).join("-+-"));
    out.extend(table.rows.iter().map(|row| format_row(row)));
    out
}

fn chart_lines(chart: &Chart) -> Vec<String> {
    let mut out = vec![format!("Chart: {}", chart.title())];
    match chart {
        Chart::Scatter {
            x_label,
            y_label,
            points,
            reference,
            annotation,
            ..
        } => {
            out.push(format!(
                "{} points, x = {x_label}, y = {y_label}",
                points.len()
            ));
            if let Some(note) = annotation {
                out.push(note.clone());
            }
            if let Some(line) = reference {
                out.push(format!(
                    "Reference line from ({}, {}) to ({}, {})",
                    format_number(line.from.0),
                    format_number(line.from.1),
                    format_number(line.to.0),
                    format_number(line.to.1)
                ));
            }
            out.extend(scatter_grid(points));
        }
        Chart::Bar {
            y_label,
            bars,
            format,
            ..
        } => {
            out.push(format!("y = {y_label}"));
            let label_width = bars
                .iter()
                .map(|(l, _)| l.chars().count())
                .max()
                .unwrap_or(0);
            let peak = bars.iter().map(|(_, v)| v.abs()).fold(0.0, f64::max);
            for (label, value) in bars {
                let length = if peak > 0.0 {
                    ((value.abs() / peak) * BAR_WIDTH as f64).round() as usize
                } else {
                    0
                };
                out.push(format!(
                    "{label:<label_width$} | {} {}",
                    "#".repeat(length),
                    format.format(*value)
                ));
            }
        }
        Chart::Histogram {
            x_label, histogram, ..
        } => {
            out.push(format!("x = {x_label}"));
            let peak = histogram.counts.iter().copied().max().unwrap_or(0);
            for (i, count) in histogram.counts.iter().enumerate() {
                let length = if peak > 0 { count * BAR_WIDTH / peak } else { 0 };
                out.push(format!(
                    "{:>14} .. {:<14} | {} {count}",
                    format_number(histogram.edges[i]),
                    format_number(histogram.edges[i + 1]),
                    "#".repeat(length)
                ));
            }
        }
        Chart::Heatmap { labels, values, .. } => {
            let mut table =
                Table::new(std::iter::once(String::new()).chain(labels.iter().cloned()));
            for (i, label) in labels.iter().enumerate() {
                let cells: Vec<String> = values
                    .row(i)
                    .iter()
                    .map(|r| {
                        if r.is_nan() {
                            String::new()
                        } else {
                            format!("{r:.2}")
                        }
                    })
                    .collect();
                table.push_row(std::iter::once(label.clone()).chain(cells));
            }
            out.extend(table_lines(&table));
        }
        Chart::BoxPlot { y_label, groups, .. } => {
            out.push(format!("y = {y_label}"));
            let mut table = Table::new(["group", "count", "min", "q1", "median", "q3", "max"]);
            for (label, s) in groups {
                table.push_row([
                    label.clone(),
                    s.count.to_string(),
                    format_number(s.min),
                    format_number(s.q1),
                    format_number(s.median),
                    format_number(s.q3),
                    format_number(s.max),
                ]);
            }
            out.extend(table_lines(&table));
        }
    }
    out
}

/// A coarse character plot; each cell shows whether any point falls in it.
fn scatter_grid(points: &[(f64, f64)]) -> Vec<String> {
    let finite: Vec<(f64, f64)> = points
        .iter()
        .copied()
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();
    let (Some((x_min, x_max)), Some((y_min, y_max))) = (
        finite
            .iter()
            .map(|p| p.0)
            .minmax_by(f64::total_cmp)
            .into_option(),
        finite
            .iter()
            .map(|p| p.1)
            .minmax_by(f64::total_cmp)
            .into_option(),
    ) else {
        return Vec::new();
    };
    let x_span = (x_max - x_min).max(f64::EPSILON);
    let y_span = (y_max - y_min).max(f64::EPSILON);
    let mut grid = vec![vec![' '; PLOT_WIDTH]; PLOT_HEIGHT];
    for (x, y) in finite {
        let col = (((x - x_min) / x_span) * (PLOT_WIDTH - 1) as f64).round() as usize;
        let row = (((y_max - y) / y_span) * (PLOT_HEIGHT - 1) as f64).round() as usize;
        grid[row.min(PLOT_HEIGHT - 1)][col.min(PLOT_WIDTH - 1)] = '*';
    }
    let mut out: Vec<String> = grid
        .into_iter()
        .enumerate()
        .map(|(i, row)| {
            let axis = match i {
                0 => format_number(y_max),
                r if r == PLOT_HEIGHT - 1 => format_number(y_min),
                _ => String::new(),
            };
            format!(
                "{axis:>12} |{}",
                row.into_iter().collect::<String>().trim_end()
            )
        })
        .collect();
    out.push(format!("{:>12} +{}", "", "-".repeat(PLOT_WIDTH)));
    out.push(format!(
        "{:>12}  {:<w$}{}",
        "",
        format_number(x_min),
        format_number(x_max),
        w = PLOT_WIDTH - format_number(x_max).chars().count().min(PLOT_WIDTH)
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::view::ValueFormat;

    #[test]
    fn tables_align_columns() {
        let mut table = Table::new(["Feature", "Value"]);
        table.push_row(["GrLivArea", "1500"]);
        table.push_row(["1stFlrSF", "1000"]);
        let lines = table_lines(&table);
        assert_eq!(lines[0], "Feature   | Value");
        assert_eq!(lines[1], "----------+------");
        assert_eq!(lines[2], "GrLivArea | 1500");
    }

    #[test]
    fn callouts_and_closed_sections_render_as_tags() {
        let mut view = PageView::new("Live House Price Prediction Tool");
        view.success("Predicted Sale Price: $208,500");
        view.expander("Prediction Details", false, |inner| {
            inner.text("hidden");
        });
        let text = render_page(&view);
        assert!(text.contains("[OK] Predicted Sale Price: $208,500"));
        assert!(text.contains("[+] Prediction Details"));
        assert!(!text.contains("hidden"));
    }

    #[test]
    fn bars_scale_to_the_largest_value() {
        let chart = Chart::Bar {
            title: "Prices".to_string(),
            y_label: "Predicted Price ($)".to_string(),
            bars: vec![
                ("House 1".to_string(), 200_000.0),
                ("House 2".to_string(), 100_000.0),
            ],
            format: ValueFormat::Currency,
        };
        let lines = chart_lines(&chart);
        assert_eq!(
            lines[2],
            format!("House 1 | {} $200,000", "#".repeat(BAR_WIDTH))
        );
        assert_eq!(
            lines[3],
            format!("House 2 | {} $100,000", "#".repeat(BAR_WIDTH / 2))
        );
    }

    #[test]
    fn bar_values_print_in_the_chart_format() {
        let prices = Chart::Bar {
            title: "Prices".to_string(),
            y_label: "Predicted Price ($)".to_string(),
            bars: vec![("House 1".to_string(), 950.0)],
            format: ValueFormat::Currency,
        };
        assert!(
            chart_lines(&prices)[2].ends_with(" $950"),
            "{:?}",
            chart_lines(&prices)
        );

        let scores = Chart::Bar {
            title: "PPS".to_string(),
            y_label: "PPS".to_string(),
            bars: vec![("GrLivArea".to_string(), 0.42)],
            format: ValueFormat::Decimal(3),
        };
        assert!(chart_lines(&scores)[2].ends_with(" 0.420"));
    }
}
