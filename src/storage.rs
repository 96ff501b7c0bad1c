// 💾 Flat-file storage - CSV in, CSV out
//
// Layout (see Config):
//   data/vehicle_type/<name>.csv            raw generated rows
//   data/vehicle_type/monthly_agg_<name>.csv  sum by (year_month, vehicle_type)
//   data/metrics/<subject>_yoy_qoq_metrics.csv

use crate::config::Config;
use crate::generator::{RegistrationRecord, SummaryReport};
use crate::metrics::{GroupKey, GrowthRow, MergedMetrics, Record, QOQ_COLUMN, YOY_COLUMN};
use crate::period::YearMonth;
use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Suffix shared by every metrics file
pub const METRICS_SUFFIX: &str = "_yoy_qoq_metrics.csv";

/// Create every directory the pipeline writes into
pub fn create_directories(config: &Config) -> Result<()> {
    for dir in config.directories() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }
    Ok(())
}

/// Current local time as `YYYY-MM-DD_HHMMSS` for file names
pub fn timestamp() -> String {
    Local::now().format("%Y-%m-%d_%H%M%S").to_string()
}

// ============================================================================
// REGISTRATION FILES
// ============================================================================

/// Monthly total per vehicle type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyAggregate {
    pub year_month: YearMonth,
    pub vehicle_type: String,
    pub registration_count: u64,
}

impl From<&MonthlyAggregate> for Record {
    fn from(agg: &MonthlyAggregate) -> Self {
        let mut record = Record::new();
        record.insert("year_month".to_string(), agg.year_month.to_string());
        record.insert("vehicle_type".to_string(), agg.vehicle_type.clone());
        record.insert("registration_count".to_string(), agg.registration_count.to_string());
        record
    }
}

/// Sum registrations by (year_month, vehicle_type), sorted by both keys
pub fn monthly_aggregate(records: &[RegistrationRecord]) -> Vec<MonthlyAggregate> {
    let mut totals: BTreeMap<(YearMonth, &str), u64> = BTreeMap::new();
    for record in records {
        *totals
            .entry((record.period(), record.vehicle_type.as_str()))
            .or_insert(0) += record.registration_count;
    }

    totals
        .into_iter()
        .map(|((year_month, vehicle_type), registration_count)| MonthlyAggregate {
            year_month,
            vehicle_type: vehicle_type.to_string(),
            registration_count,
        })
        .collect()
}

/// Basic statistics printed after a save
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveSummary {
    pub total_records: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub total_registrations: u64,
    /// Only for manufacturer-wise data
    pub manufacturers: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct SavedFiles {
    pub data_path: PathBuf,
    pub monthly_path: PathBuf,
    pub monthly: Vec<MonthlyAggregate>,
    pub summary: SaveSummary,
}

fn registration_headers(with_manufacturer: bool) -> Vec<&'static str> {
    let mut headers = Vec::with_capacity(7);
    if with_manufacturer {
        headers.push("manufacturer");
    }
    headers.extend(["vehicle_type", "registration_count", "date", "year", "month", "year_month"]);
    headers
}

/// Write generated rows plus the `monthly_agg_` companion file into `dir`.
pub fn save_registrations(
    records: &[RegistrationRecord],
    filename: &str,
    dir: &Path,
) -> Result<SavedFiles> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory {}", dir.display()))?;

    let with_manufacturer = records.iter().any(|r| r.manufacturer.is_some());

    let data_path = dir.join(filename);
    let mut wtr = csv::Writer::from_path(&data_path)
        .with_context(|| format!("Failed to create {}", data_path.display()))?;
    wtr.write_record(registration_headers(with_manufacturer))?;

    for record in records {
        let period = record.period();
        let mut row = Vec::with_capacity(7);
        if with_manufacturer {
            row.push(record.manufacturer.clone().unwrap_or_default());
        }
        row.push(record.vehicle_type.clone());
        row.push(record.registration_count.to_string());
        row.push(record.date.format("%Y-%m-%d").to_string());
        row.push(period.year().to_string());
        row.push(period.month().to_string());
        row.push(period.to_string());
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    tracing::info!(path = %data_path.display(), records = records.len(), "saved registration data");

    let monthly = monthly_aggregate(records);
    let monthly_path = dir.join(format!("monthly_agg_{}", filename));
    let mut wtr = csv::Writer::from_path(&monthly_path)
        .with_context(|| format!("Failed to create {}", monthly_path.display()))?;
    for agg in &monthly {
        wtr.serialize(agg)?;
    }
    wtr.flush()?;
    tracing::info!(path = %monthly_path.display(), rows = monthly.len(), "saved monthly aggregate");

    let mut manufacturers: Vec<&str> = records.iter().filter_map(|r| r.manufacturer.as_deref()).collect();
    manufacturers.sort_unstable();
    manufacturers.dedup();

    let summary = SaveSummary {
        total_records: records.len(),
        first_date: records.iter().map(|r| r.date).min(),
        last_date: records.iter().map(|r| r.date).max(),
        total_registrations: records.iter().map(|r| r.registration_count).sum(),
        manufacturers: with_manufacturer.then_some(manufacturers.len()),
    };

    Ok(SavedFiles {
        data_path,
        monthly_path,
        monthly,
        summary,
    })
}

/// Load any CSV file as untyped records (header → cell)
pub fn load_records(path: &Path) -> Result<Vec<Record>> {
    let mut rdr = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open CSV file {}", path.display()))?;

    let mut records = Vec::new();
    for (line, result) in rdr.deserialize().enumerate() {
        let record: Record =
            result.with_context(|| format!("Failed to read row {} of {}", line + 1, path.display()))?;
        records.push(record);
    }

    Ok(records)
}

// ============================================================================
// METRICS FILES
// ============================================================================

/// `<dir>/<subject>_yoy_qoq_metrics.csv`
pub fn metrics_path(dir: &Path, subject: &str) -> PathBuf {
    dir.join(format!("{}{}", subject, METRICS_SUFFIX))
}

fn format_metric(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn parse_metric(cell: &str, column: &str, line: usize) -> Result<Option<f64>> {
    let cell = cell.trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    cell.parse::<f64>()
        .map(Some)
        .with_context(|| format!("row {}: '{}' is not a number in {}", line, cell, column))
}

/// Write the merged table; never called with a partially computed table.
pub fn write_metrics(metrics: &MergedMetrics, dir: &Path, subject: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    let path = metrics_path(dir, subject);

    let mut wtr = csv::Writer::from_path(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    wtr.write_record(metrics.headers())?;

    for row in &metrics.rows {
        let mut cells: Vec<String> = row.group.values().to_vec();
        cells.push(row.period.to_string());
        cells.push(format_metric(row.yoy));
        cells.push(format_metric(row.qoq));
        wtr.write_record(&cells)?;
    }
    wtr.flush()?;

    tracing::info!(path = %path.display(), rows = metrics.len(), "wrote metrics");
    Ok(path)
}

/// Read a metrics file back; every column other than the period and the two
/// growth columns is treated as a group field.
pub fn load_metrics(path: &Path, period_field: &str) -> Result<MergedMetrics> {
    let mut rdr = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open metrics file {}", path.display()))?;
    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();

    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| anyhow!("{} has no '{}' column", path.display(), name))
    };
    let period_idx = position(period_field)?;
    let yoy_idx = position(YOY_COLUMN)?;
    let qoq_idx = position(QOQ_COLUMN)?;

    let group_idx: Vec<usize> = (0..headers.len())
        .filter(|i| ![period_idx, yoy_idx, qoq_idx].contains(i))
        .collect();
    if group_idx.is_empty() {
        return Err(anyhow!("{} has no group columns", path.display()));
    }

    let mut rows = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let line = i + 1;
        let record = result.with_context(|| format!("Failed to read row {} of {}", line, path.display()))?;
        let cell = |idx: usize| record.get(idx).unwrap_or("");

        let period: YearMonth = cell(period_idx)
            .trim()
            .parse()
            .with_context(|| format!("row {} of {}", line, path.display()))?;

        rows.push(GrowthRow {
            group: GroupKey::new(group_idx.iter().map(|&idx| cell(idx))),
            period,
            yoy: parse_metric(cell(yoy_idx), YOY_COLUMN, line)?,
            qoq: parse_metric(cell(qoq_idx), QOQ_COLUMN, line)?,
        });
    }

    Ok(MergedMetrics {
        period_field: period_field.to_string(),
        group_fields: group_idx.iter().map(|&idx| headers[idx].clone()).collect(),
        rows,
    })
}

/// Subjects with a metrics file in `dir`, sorted by name
pub fn list_subjects(dir: &Path) -> Result<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut subjects = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))? {
        let name = entry?.file_name().to_string_lossy().into_owned();
        if let Some(subject) = name.strip_suffix(METRICS_SUFFIX) {
            if !subject.is_empty() {
                subjects.push(subject.to_string());
            }
        }
    }
    subjects.sort();
    Ok(subjects)
}

// ============================================================================
// SUMMARY REPORT
// ============================================================================

/// Write `summary_report_<stamp>.txt` as `key: value` lines
pub fn write_summary_report(report: &SummaryReport, dir: &Path, stamp: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    let path = dir.join(format!("summary_report_{}.txt", stamp));

    let mut file = fs::File::create(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for (key, value) in report.lines() {
        writeln!(file, "{}: {}", key, value)?;
    }

    Ok(path)
}

// ============================================================================
// TESTS
// ============================================================================
