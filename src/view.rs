// 🔎 View Filters - What a dashboard panel shows
// Shared by the terminal dashboard and the HTTP API

use crate::metrics::{GrowthKind, GrowthRow, MergedMetrics};
use crate::period::YearMonth;
use serde::{Deserialize, Serialize};

/// MetricFilter - Date range + group selection
///
/// `None` means "no restriction" for every field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricFilter {
    pub from: Option<YearMonth>,
    pub to: Option<YearMonth>,
    /// Group labels (see `GroupKey::label`)
    pub groups: Option<Vec<String>>,
}

impl MetricFilter {
    pub fn matches(&self, row: &GrowthRow) -> bool {
        if self.from.map_or(false, |from| row.period < from) {
            return false;
        }
        if self.to.map_or(false, |to| row.period > to) {
            return false;
        }
        match &self.groups {
            Some(groups) => groups.contains(&row.group.label()),
            None => true,
        }
    }

    pub fn apply<'a>(&self, metrics: &'a MergedMetrics) -> Vec<&'a GrowthRow> {
        metrics.rows.iter().filter(|row| self.matches(row)).collect()
    }
}

/// One line on a chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub label: String,
    pub points: Vec<(YearMonth, f64)>,
}

/// Group rows into chart lines; undefined growth values are skipped.
///
/// Lines keep the order in which their group first appears in `rows`.
pub fn series(rows: &[&GrowthRow], kind: GrowthKind) -> Vec<ChartSeries> {
    let mut lines: Vec<ChartSeries> = Vec::new();

    for row in rows {
        let label = row.group.label();
        let idx = match lines.iter().position(|s| s.label == label) {
            Some(idx) => idx,
            None => {
                lines.push(ChartSeries {
                    label,
                    points: Vec::new(),
                });
                lines.len() - 1
            }
        };

        if let Some(value) = row.metric(kind) {
            lines[idx].points.push((row.period, value));
        }
    }

    lines
}

/// Earliest and latest period across several tables
pub fn period_bounds<'a>(tables: impl IntoIterator<Item = &'a MergedMetrics>) -> Option<(YearMonth, YearMonth)> {
    tables
        .into_iter()
        .flat_map(|t| t.rows.iter().map(|r| r.period))
        .fold(None, |acc, p| match acc {
            None => Some((p, p)),
            Some((lo, hi)) => Some((lo.min(p), hi.max(p))),
        })
}

/// Smallest and largest plotted value
pub fn value_bounds(lines: &[ChartSeries]) -> Option<(f64, f64)> {
    lines
        .iter()
        .flat_map(|s| s.points.iter().map(|&(_, v)| v))
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Group labels in table order
pub fn group_labels(metrics: &MergedMetrics) -> Vec<String> {
    metrics.groups().iter().map(|g| g.label()).collect()
}
