// 📈 Growth Metrics - YoY / QoQ percent change per series
//
// Pipeline (one pass per stage, no shared state):
// 1. Normalize:   validate rows, parse periods, stable sort by period
// 2. Aggregate:   sum values per (group, period)
// 3. Densify:     per-group monthly axis from first to last observed period
// 4. Pct change:  value vs. value N months earlier (N=12 YoY, N=3 QoQ)
// 5. Reshape:     long format, one metric per (group, period)
// 6. Merge:       join YoY and QoQ tables on (group, period)

use crate::error::MetricsError;
use crate::period::YearMonth;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Column name for year-over-year growth in the output table
pub const YOY_COLUMN: &str = "YoY_Growth_%";

/// Column name for quarter-over-quarter growth in the output table
pub const QOQ_COLUMN: &str = "QoQ_Growth_%";

/// One untyped input row: field name → raw cell text
pub type Record = HashMap<String, String>;

// ============================================================================
// CORE TYPES
// ============================================================================

/// GroupKey - Values of the group fields, in group-field order
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupKey(pub Vec<String>);

impl GroupKey {
    pub fn new<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        GroupKey(values.into_iter().map(Into::into).collect())
    }

    pub fn values(&self) -> &[String] {
        &self.0
    }

    /// Display label used for chart legends and filters
    pub fn label(&self) -> String {
        self.0.join(" / ")
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Observation - A validated input row
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub group: GroupKey,
    pub period: YearMonth,
    pub value: f64,
    /// Position in the original input (0-based)
    pub row: usize,
}

/// GrowthKind - Which lag a growth table is computed against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GrowthKind {
    YearOverYear,
    QuarterOverQuarter,
}

impl GrowthKind {
    /// Lag in months
    pub fn lag(&self) -> i64 {
        match self {
            GrowthKind::YearOverYear => 12,
            GrowthKind::QuarterOverQuarter => 3,
        }
    }

    /// Output column name
    pub fn column(&self) -> &'static str {
        match self {
            GrowthKind::YearOverYear => YOY_COLUMN,
            GrowthKind::QuarterOverQuarter => QOQ_COLUMN,
        }
    }

    /// Human-readable name for display
    pub fn name(&self) -> &'static str {
        match self {
            GrowthKind::YearOverYear => "YoY Growth (%)",
            GrowthKind::QuarterOverQuarter => "QoQ Growth (%)",
        }
    }

    /// The other kind (dashboard metric toggle)
    pub fn toggled(&self) -> Self {
        match self {
            GrowthKind::YearOverYear => GrowthKind::QuarterOverQuarter,
            GrowthKind::QuarterOverQuarter => GrowthKind::YearOverYear,
        }
    }
}

impl FromStr for GrowthKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yoy" | "year_over_year" => Ok(GrowthKind::YearOverYear),
            "qoq" | "quarter_over_quarter" => Ok(GrowthKind::QuarterOverQuarter),
            other => Err(format!("unknown metric '{}' (expected yoy or qoq)", other)),
        }
    }
}

/// Series - One group's values on a dense monthly axis
///
/// `values[i]` belongs to `start + i` months; `None` marks a month with no
/// input rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub group: GroupKey,
    pub start: YearMonth,
    pub values: Vec<Option<f64>>,
}

impl Series {
    pub fn period_at(&self, index: usize) -> YearMonth {
        self.start.add_months(index as i64)
    }

    pub fn end(&self) -> YearMonth {
        self.period_at(self.values.len().saturating_sub(1))
    }
}

/// One long-format growth value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthEntry {
    pub group: GroupKey,
    pub period: YearMonth,
    pub value: Option<f64>,
}

/// GrowthTable - Long-format percent changes for one lag
#[derive(Debug, Clone, PartialEq)]
pub struct GrowthTable {
    pub kind: GrowthKind,
    pub entries: Vec<GrowthEntry>,
}

/// One merged output row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthRow {
    pub group: GroupKey,
    pub period: YearMonth,
    pub yoy: Option<f64>,
    pub qoq: Option<f64>,
}

impl GrowthRow {
    pub fn metric(&self, kind: GrowthKind) -> Option<f64> {
        match kind {
            GrowthKind::YearOverYear => self.yoy,
            GrowthKind::QuarterOverQuarter => self.qoq,
        }
    }
}

/// MergedMetrics - Final table: group fields, period, YoY, QoQ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedMetrics {
    pub period_field: String,
    pub group_fields: Vec<String>,
    pub rows: Vec<GrowthRow>,
}

impl MergedMetrics {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Header row for the flat-file form
    pub fn headers(&self) -> Vec<String> {
        let mut headers = self.group_fields.clone();
        headers.push(self.period_field.clone());
        headers.push(YOY_COLUMN.to_string());
        headers.push(QOQ_COLUMN.to_string());
        headers
    }

    /// Distinct groups in table order
    pub fn groups(&self) -> Vec<GroupKey> {
        let mut seen = Vec::new();
        for row in &self.rows {
            if !seen.contains(&row.group) {
                seen.push(row.group.clone());
            }
        }
        seen
    }
}

/// JoinPolicy - How YoY and QoQ tables are combined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinPolicy {
    /// Keep only (group, period) keys present in both tables
    #[default]
    Inner,
    /// Keep keys from either table; the missing side is undefined
    Outer,
}

impl FromStr for JoinPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "inner" => Ok(JoinPolicy::Inner),
            "outer" => Ok(JoinPolicy::Outer),
            other => Err(format!("unknown join policy '{}' (expected inner or outer)", other)),
        }
    }
}

// ============================================================================
// CALCULATOR
// ============================================================================

/// GrowthMetricsCalculator - Pure transformation from rows to MergedMetrics
#[derive(Debug, Clone, Default)]
pub struct GrowthMetricsCalculator {
    join: JoinPolicy,
}

impl GrowthMetricsCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_join(join: JoinPolicy) -> Self {
        GrowthMetricsCalculator { join }
    }

    pub fn join_policy(&self) -> JoinPolicy {
        self.join
    }

    /// Compute YoY and QoQ growth for every series in `rows`.
    ///
    /// # Errors
    /// * `NoGroupFields` - `group_fields` is empty
    /// * `EmptyInput` - `rows` is empty
    /// * `MissingField` / `MalformedPeriod` / `InvalidValue` - first bad row
    pub fn compute<S: AsRef<str>>(
        &self,
        rows: &[Record],
        period_field: &str,
        group_fields: &[S],
        value_field: &str,
    ) -> Result<MergedMetrics, MetricsError> {
        let observations = normalize(rows, period_field, group_fields, value_field)?;
        let series = aggregate(&observations);

        let yoy = growth_table(&series, GrowthKind::YearOverYear);
        let qoq = growth_table(&series, GrowthKind::QuarterOverQuarter);

        Ok(MergedMetrics {
            period_field: period_field.to_string(),
            group_fields: group_fields.iter().map(|f| f.as_ref().to_string()).collect(),
            rows: merge(&yoy, &qoq, self.join),
        })
    }
}

/// Compute with the default (inner) join
pub fn compute<S: AsRef<str>>(
    rows: &[Record],
    period_field: &str,
    group_fields: &[S],
    value_field: &str,
) -> Result<MergedMetrics, MetricsError> {
    GrowthMetricsCalculator::new().compute(rows, period_field, group_fields, value_field)
}

// ============================================================================
// PIPELINE STAGES
// ============================================================================

fn required_cell<'a>(record: &'a Record, row: usize, field: &str) -> Result<&'a str, MetricsError> {
    match record.get(field).map(|v| v.trim()) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(MetricsError::MissingField {
            row,
            field: field.to_string(),
        }),
    }
}

/// Validate every row and return observations sorted by period.
///
/// The sort is stable, so rows sharing a period keep their input order.
pub fn normalize<S: AsRef<str>>(
    rows: &[Record],
    period_field: &str,
    group_fields: &[S],
    value_field: &str,
) -> Result<Vec<Observation>, MetricsError> {
    if group_fields.is_empty() {
        return Err(MetricsError::NoGroupFields);
    }
    if rows.is_empty() {
        return Err(MetricsError::EmptyInput);
    }

    let mut observations = Vec::with_capacity(rows.len());

    for (row, record) in rows.iter().enumerate() {
        let raw_period = required_cell(record, row, period_field)?;
        let period: YearMonth = raw_period.parse().map_err(|_| MetricsError::MalformedPeriod {
            row,
            field: period_field.to_string(),
            value: raw_period.to_string(),
        })?;

        let group = group_fields
            .iter()
            .map(|field| required_cell(record, row, field.as_ref()).map(str::to_string))
            .collect::<Result<Vec<_>, _>>()?;

        let raw_value = required_cell(record, row, value_field)?;
        let value = raw_value
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| MetricsError::InvalidValue {
                row,
                field: value_field.to_string(),
                value: raw_value.to_string(),
            })?;

        observations.push(Observation {
            group: GroupKey(group),
            period,
            value,
            row,
        });
    }

    observations.sort_by_key(|obs| obs.period);
    Ok(observations)
}

/// Sum per (group, period) and lay each group out on a dense monthly axis.
///
/// Groups come back in order of their first row in the original input.
pub fn aggregate(observations: &[Observation]) -> Vec<Series> {
    let mut index: HashMap<&GroupKey, usize> = HashMap::new();
    let mut groups: Vec<(&GroupKey, usize, BTreeMap<YearMonth, f64>)> = Vec::new();

    for obs in observations {
        let slot = *index.entry(&obs.group).or_insert_with(|| {
            groups.push((&obs.group, obs.row, BTreeMap::new()));
            groups.len() - 1
        });

        let (_, first_row, totals) = &mut groups[slot];
        *first_row = (*first_row).min(obs.row);
        *totals.entry(obs.period).or_insert(0.0) += obs.value;
    }

    groups.sort_by_key(|(_, first_row, _)| *first_row);

    groups
        .into_iter()
        .filter_map(|(group, _, totals)| densify(group, &totals))
        .collect()
}

fn densify(group: &GroupKey, totals: &BTreeMap<YearMonth, f64>) -> Option<Series> {
    let start = *totals.keys().next()?;
    let end = *totals.keys().next_back()?;

    let values = YearMonth::range_inclusive(start, end)
        .into_iter()
        .map(|period| totals.get(&period).copied())
        .collect();

    Some(Series {
        group: group.clone(),
        start,
        values,
    })
}

/// Percent change from `lagged` to `current`.
///
/// Undefined when either side is missing, the lagged value is zero, or the
/// result is not finite (a monthly total that overflowed).
pub fn pct_change(current: Option<f64>, lagged: Option<f64>) -> Option<f64> {
    match (current, lagged) {
        (Some(v), Some(lag)) if lag != 0.0 => Some((v - lag) / lag * 100.0).filter(|g| g.is_finite()),
        _ => None,
    }
}

/// Percent change against the value `kind.lag()` months earlier, in long format.
pub fn growth_table(series: &[Series], kind: GrowthKind) -> GrowthTable {
    let lag = kind.lag() as usize;

    let entries = series
        .iter()
        .flat_map(|s| {
            s.values.iter().enumerate().map(move |(i, current)| {
                let lagged = i.checked_sub(lag).and_then(|j| s.values[j]);
                GrowthEntry {
                    group: s.group.clone(),
                    period: s.period_at(i),
                    value: pct_change(*current, lagged),
                }
            })
        })
        .collect();

    GrowthTable { kind, entries }
}

/// Join a YoY table with a QoQ table on (group, period).
///
/// Output keeps groups in first-appearance order and periods ascending
/// within each group.
pub fn merge(yoy: &GrowthTable, qoq: &GrowthTable, join: JoinPolicy) -> Vec<GrowthRow> {
    let qoq_by_key: HashMap<(&GroupKey, YearMonth), Option<f64>> = qoq
        .entries
        .iter()
        .map(|e| ((&e.group, e.period), e.value))
        .collect();

    let mut rows: Vec<GrowthRow> = Vec::with_capacity(yoy.entries.len());
    let mut matched: HashSet<(&GroupKey, YearMonth)> = HashSet::new();

    for entry in &yoy.entries {
        let key = (&entry.group, entry.period);
        match qoq_by_key.get(&key) {
            Some(qoq_value) => {
                matched.insert(key);
                rows.push(GrowthRow {
                    group: entry.group.clone(),
                    period: entry.period,
                    yoy: entry.value,
                    qoq: *qoq_value,
                });
            }
            None if join == JoinPolicy::Outer => rows.push(GrowthRow {
                group: entry.group.clone(),
                period: entry.period,
                yoy: entry.value,
                qoq: None,
            }),
            None => {}
        }
    }

    if join == JoinPolicy::Outer {
        for entry in &qoq.entries {
            if !matched.contains(&(&entry.group, entry.period)) {
                rows.push(GrowthRow {
                    group: entry.group.clone(),
                    period: entry.period,
                    yoy: None,
                    qoq: entry.value,
                });
            }
        }
    }

    // Rank groups by first appearance across both tables
    let mut rank: HashMap<GroupKey, usize> = HashMap::new();
    for entry in yoy.entries.iter().chain(&qoq.entries) {
        let next = rank.len();
        rank.entry(entry.group.clone()).or_insert(next);
    }
    rows.sort_by_key(|row| (rank.get(&row.group).copied().unwrap_or(usize::MAX), row.period));

    rows
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: Option<f64>, expected: f64) {
        let actual = actual.expect("growth value should be defined");
        assert!((actual - expected).abs() < 1e-9, "{} != {}", actual, expected);
    }

    fn record(group: &str, period: &str, value: &str) -> Record {
        let mut r = Record::new();
        r.insert("vehicle_type".to_string(), group.to_string());
        r.insert("year_month".to_string(), period.to_string());
        r.insert("registration_count".to_string(), value.to_string());
        r
    }

    fn monthly(group: &str, start: &str, months: usize, value: impl Fn(usize) -> f64) -> Vec<Record> {
        let start: YearMonth = start.parse().unwrap();
        (0..months)
            .map(|i| record(group, &start.add_months(i as i64).to_string(), &value(i).to_string()))
            .collect()
    }

    fn run(rows: &[Record]) -> Result<MergedMetrics, MetricsError> {
        compute(rows, "year_month", &["vehicle_type"], "registration_count")
    }

    fn ym(s: &str) -> YearMonth {
        s.parse().unwrap()
    }

    fn row_for<'a>(metrics: &'a MergedMetrics, group: &str, period: &str) -> &'a GrowthRow {
        metrics
            .rows
            .iter()
            .find(|r| r.group.values() == [group] && r.period == ym(period))
            .unwrap()
    }

    #[test]
    fn test_flat_series_yoy_is_zero() {
        let rows = monthly("2W", "2020-01", 13, |_| 100.0);
        let metrics = run(&rows).unwrap();

        assert_eq!(metrics.len(), 13);
        let jan_2021 = row_for(&metrics, "2W", "2021-01");
        assert_eq!(jan_2021.yoy, Some(0.0));
        assert_eq!(jan_2021.qoq, Some(0.0));

        // Everything before Jan 2021 has no value 12 months back
        assert!(metrics.rows[..12].iter().all(|r| r.yoy.is_none()));

        println!("✅ Flat series test PASSED");
    }

    #[test]
    fn test_growth_values() {
        // 100, 110, 121, ... (10% per month)
        let rows = monthly("4W", "2020-01", 16, |i| 100.0 * 1.1f64.powi(i as i32));
        let metrics = run(&rows).unwrap();

        let apr = row_for(&metrics, "4W", "2020-04");
        assert_close(apr.qoq, (1.1f64.powi(3) - 1.0) * 100.0);
        assert!(apr.yoy.is_none());

        let apr_next = row_for(&metrics, "4W", "2021-04");
        assert_close(apr_next.yoy, (1.1f64.powi(12) - 1.0) * 100.0);
    }

    #[test]
    fn test_short_series_boundaries() {
        let rows = monthly("3W", "2022-01", 12, |i| 50.0 + i as f64);
        let metrics = run(&rows).unwrap();
        assert_eq!(metrics.len(), 12);
        assert!(metrics.rows.iter().all(|r| r.yoy.is_none()), "12 periods → no YoY");

        let rows = monthly("3W", "2022-01", 3, |i| 50.0 + i as f64);
        let metrics = run(&rows).unwrap();
        assert!(metrics.rows.iter().all(|r| r.qoq.is_none()), "3 periods → no QoQ");

        let rows = monthly("3W", "2022-01", 4, |i| 50.0 + i as f64);
        let metrics = run(&rows).unwrap();
        assert_eq!(metrics.rows.iter().filter(|r| r.qoq.is_some()).count(), 1);
    }

    #[test]
    fn test_zero_lag_is_undefined() {
        let mut rows = monthly("2W", "2020-01", 4, |_| 10.0);
        rows[0] = record("2W", "2020-01", "0");
        let metrics = run(&rows).unwrap();

        let apr = row_for(&metrics, "2W", "2020-04");
        assert_eq!(apr.qoq, None);

        // Current value of zero is fine: -100%
        let mut rows = monthly("2W", "2020-01", 4, |_| 10.0);
        rows[3] = record("2W", "2020-04", "0");
        let metrics = run(&rows).unwrap();
        assert_close(row_for(&metrics, "2W", "2020-04").qoq, -100.0);
    }

    #[test]
    fn test_gap_months_are_undefined_not_zero() {
        // Feb and Mar missing; May compares against Feb
        let rows = vec![
            record("2W", "2020-01", "100"),
            record("2W", "2020-04", "150"),
            record("2W", "2020-05", "160"),
        ];
        let metrics = run(&rows).unwrap();

        let periods: Vec<String> = metrics.rows.iter().map(|r| r.period.to_string()).collect();
        assert_eq!(periods, vec!["2020-01", "2020-02", "2020-03", "2020-04", "2020-05"]);

        assert_close(row_for(&metrics, "2W", "2020-04").qoq, 50.0);
        assert_eq!(row_for(&metrics, "2W", "2020-05").qoq, None);
        assert_eq!(row_for(&metrics, "2W", "2020-02").qoq, None);
    }

    #[test]
    fn test_duplicate_rows_are_summed() {
        let rows = vec![
            record("2W", "2020-01", "40"),
            record("2W", "2020-01", "60"),
            record("2W", "2020-02", "100"),
            record("2W", "2020-03", "100"),
            record("2W", "2020-04", "150"),
        ];
        let metrics = run(&rows).unwrap();

        assert_eq!(metrics.len(), 4);
        assert_close(row_for(&metrics, "2W", "2020-04").qoq, 50.0);
    }

    #[test]
    fn test_disjoint_groups_stay_independent() {
        let mut rows = monthly("2W", "2020-01", 6, |i| 100.0 + i as f64 * 10.0);
        rows.extend(monthly("4W", "2021-01", 6, |_| 500.0));

        let metrics = run(&rows).unwrap();
        assert_eq!(metrics.len(), 12);
        assert_eq!(
            metrics.groups(),
            vec![GroupKey::new(["2W"]), GroupKey::new(["4W"])]
        );

        let two_w: Vec<_> = metrics.rows.iter().filter(|r| r.group.values() == ["2W"]).collect();
        assert_eq!(two_w.first().unwrap().period, ym("2020-01"));
        assert_eq!(two_w.last().unwrap().period, ym("2020-06"));
        assert_close(row_for(&metrics, "2W", "2020-04").qoq, 30.0);

        assert_eq!(row_for(&metrics, "4W", "2021-04").qoq, Some(0.0));
        assert!(metrics
            .rows
            .iter()
            .filter(|r| r.group.values() == ["4W"])
            .all(|r| r.period >= ym("2021-01")));
    }

    #[test]
    fn test_one_row_per_group_period() {
        let mut rows = monthly("2W", "2020-01", 20, |i| 100.0 + i as f64);
        rows.extend(monthly("3W", "2020-06", 20, |i| 80.0 + i as f64));
        rows.extend(monthly("2W", "2020-01", 20, |_| 1.0)); // duplicates to aggregate

        let metrics = run(&rows).unwrap();
        let keys: HashSet<_> = metrics.rows.iter().map(|r| (r.group.clone(), r.period)).collect();
        assert_eq!(keys.len(), metrics.len());
        assert_eq!(metrics.len(), 40);
    }

    #[test]
    fn test_ordering_follows_first_appearance_and_period() {
        // 4W appears first in the input even though 2W has earlier periods
        let rows = vec![
            record("4W", "2021-03", "10"),
            record("2W", "2020-02", "10"),
            record("4W", "2021-01", "10"),
            record("2W", "2020-01", "10"),
        ];
        let metrics = run(&rows).unwrap();

        let order: Vec<(String, String)> = metrics
            .rows
            .iter()
            .map(|r| (r.group.label(), r.period.to_string()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("4W".to_string(), "2021-01".to_string()),
                ("4W".to_string(), "2021-02".to_string()),
                ("4W".to_string(), "2021-03".to_string()),
                ("2W".to_string(), "2020-01".to_string()),
                ("2W".to_string(), "2020-02".to_string()),
            ]
        );
    }

    #[test]
    fn test_compute_is_idempotent() {
        let mut rows = monthly("2W", "2020-01", 30, |i| 1000.0 / (i as f64 + 3.0));
        rows.extend(monthly("4W", "2019-07", 30, |i| (i * i) as f64 + 0.1));

        let first = run(&rows).unwrap();
        let second = run(&rows).unwrap();

        assert_eq!(first.len(), second.len());
        for (a, b) in first.rows.iter().zip(&second.rows) {
            assert_eq!(a.group, b.group);
            assert_eq!(a.period, b.period);
            assert_eq!(a.yoy.map(f64::to_bits), b.yoy.map(f64::to_bits));
            assert_eq!(a.qoq.map(f64::to_bits), b.qoq.map(f64::to_bits));
        }
    }

    #[test]
    fn test_multiple_group_fields() {
        let mut rows = Vec::new();
        for (mfg, vt) in [("Honda", "2W"), ("Toyota", "4W")] {
            for i in 0..4 {
                let mut r = Record::new();
                r.insert("manufacturer".to_string(), mfg.to_string());
                r.insert("vehicle_type".to_string(), vt.to_string());
                r.insert("year_month".to_string(), ym("2020-01").add_months(i).to_string());
                r.insert("registration_count".to_string(), "10".to_string());
                rows.push(r);
            }
        }

        let metrics = compute(&rows, "year_month", &["manufacturer", "vehicle_type"], "registration_count").unwrap();
        assert_eq!(
            metrics.headers(),
            vec!["manufacturer", "vehicle_type", "year_month", YOY_COLUMN, QOQ_COLUMN]
        );
        assert_eq!(metrics.groups()[1], GroupKey::new(["Toyota", "4W"]));
        assert_eq!(metrics.groups()[1].label(), "Toyota / 4W");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(run(&[]).unwrap_err(), MetricsError::EmptyInput);
    }

    #[test]
    fn test_no_group_fields() {
        let rows = monthly("2W", "2020-01", 2, |_| 1.0);
        let empty: [&str; 0] = [];
        let err = compute(&rows, "year_month", &empty, "registration_count").unwrap_err();
        assert_eq!(err, MetricsError::NoGroupFields);
    }

    #[test]
    fn test_malformed_period_detected_up_front() {
        let mut rows = monthly("2W", "2020-01", 5, |_| 1.0);
        rows.push(record("2W", "2021/01", "1"));
        // A later row with a bad value must not be reported first
        rows.push(record("2W", "2021-02", "lots"));

        let err = run(&rows).unwrap_err();
        assert_eq!(
            err,
            MetricsError::MalformedPeriod {
                row: 5,
                field: "year_month".to_string(),
                value: "2021/01".to_string(),
            }
        );
    }

    #[test]
    fn test_missing_and_invalid_value() {
        let mut rows = monthly("2W", "2020-01", 2, |_| 1.0);
        rows[1].remove("registration_count");
        assert_eq!(
            run(&rows).unwrap_err(),
            MetricsError::MissingField {
                row: 1,
                field: "registration_count".to_string()
            }
        );

        let mut rows = monthly("2W", "2020-01", 2, |_| 1.0);
        rows[0].insert("registration_count".to_string(), "  ".to_string());
        assert!(matches!(run(&rows).unwrap_err(), MetricsError::MissingField { row: 0, .. }));

        let mut rows = monthly("2W", "2020-01", 2, |_| 1.0);
        rows[1].insert("registration_count".to_string(), "NaN".to_string());
        assert!(matches!(run(&rows).unwrap_err(), MetricsError::InvalidValue { row: 1, .. }));

        let mut rows = monthly("2W", "2020-01", 2, |_| 1.0);
        rows[0].remove("vehicle_type");
        assert!(matches!(run(&rows).unwrap_err(), MetricsError::MissingField { row: 0, .. }));
    }

    #[test]
    fn test_pct_change() {
        assert!((pct_change(Some(110.0), Some(100.0)).unwrap() - 10.0).abs() < 1e-9);
        assert_eq!(pct_change(Some(50.0), Some(100.0)), Some(-50.0));
        assert_eq!(pct_change(Some(5.0), Some(0.0)), None);
        assert_eq!(pct_change(None, Some(1.0)), None);
        assert_eq!(pct_change(Some(1.0), None), None);
    }

    #[test]
    fn test_overflowing_total_is_undefined() {
        let rows = vec![
            record("2W", "2020-01", "1e308"),
            record("2W", "2020-01", "1e308"),
            record("2W", "2020-02", "1"),
            record("2W", "2020-03", "1"),
            record("2W", "2020-04", "5"),
        ];
        let metrics = run(&rows).unwrap();

        // Jan total overflows to inf; growth against it must not be NaN/inf
        assert_eq!(row_for(&metrics, "2W", "2020-04").qoq, None);
        assert!(metrics
            .rows
            .iter()
            .flat_map(|r| [r.yoy, r.qoq])
            .flatten()
            .all(f64::is_finite));

        assert_eq!(pct_change(Some(f64::MAX), Some(-f64::MAX)), None);
        assert_eq!(pct_change(Some(f64::INFINITY), Some(1.0)), None);
    }

    #[test]
    fn test_merge_inner_vs_outer() {
        let g = GroupKey::new(["2W"]);
        let entry = |period: &str, value: f64| GrowthEntry {
            group: g.clone(),
            period: ym(period),
            value: Some(value),
        };

        let yoy = GrowthTable {
            kind: GrowthKind::YearOverYear,
            entries: vec![entry("2021-01", 1.0), entry("2021-02", 2.0)],
        };
        let qoq = GrowthTable {
            kind: GrowthKind::QuarterOverQuarter,
            entries: vec![entry("2021-02", 20.0), entry("2021-03", 30.0)],
        };

        let inner = merge(&yoy, &qoq, JoinPolicy::Inner);
        assert_eq!(inner.len(), 1);
        assert_eq!(inner[0].period, ym("2021-02"));
        assert_eq!((inner[0].yoy, inner[0].qoq), (Some(2.0), Some(20.0)));

        let outer = merge(&yoy, &qoq, JoinPolicy::Outer);
        let summary: Vec<_> = outer.iter().map(|r| (r.period.to_string(), r.yoy, r.qoq)).collect();
        assert_eq!(
            summary,
            vec![
                ("2021-01".to_string(), Some(1.0), None),
                ("2021-02".to_string(), Some(2.0), Some(20.0)),
                ("2021-03".to_string(), None, Some(30.0)),
            ]
        );
    }

    #[test]
    fn test_growth_kind_parse_and_toggle() {
        assert_eq!("YoY".parse::<GrowthKind>().unwrap(), GrowthKind::YearOverYear);
        assert_eq!("qoq".parse::<GrowthKind>().unwrap(), GrowthKind::QuarterOverQuarter);
        assert!("mom".parse::<GrowthKind>().is_err());
        assert_eq!(GrowthKind::YearOverYear.toggled(), GrowthKind::QuarterOverQuarter);
        assert_eq!(GrowthKind::QuarterOverQuarter.column(), "QoQ_Growth_%");
    }

    #[test]
    fn test_join_policy_parse() {
        assert_eq!("inner".parse::<JoinPolicy>().unwrap(), JoinPolicy::Inner);
        assert_eq!("OUTER".parse::<JoinPolicy>().unwrap(), JoinPolicy::Outer);
        assert!("left".parse::<JoinPolicy>().is_err());
        assert_eq!(JoinPolicy::default(), JoinPolicy::Inner);
    }
}
