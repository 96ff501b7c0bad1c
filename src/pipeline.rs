// 🔁 Pipeline - generate → aggregate → growth metrics → metrics files
//
// Each step returns its output; nothing is written for a subject whose
// computation fails.

use crate::config::Config;
use crate::error::report_error;
use crate::generator::{
    ManufacturerSource, RegistrationRecord, RegistrationSource, SummaryReport, VehicleTypeSource,
};
use crate::metrics::{GrowthMetricsCalculator, JoinPolicy, MergedMetrics, Record};
use crate::period::YearMonth;
use crate::storage::{
    create_directories, load_records, save_registrations, timestamp, write_metrics,
    write_summary_report, SavedFiles,
};
use anyhow::Result;
use std::path::{Path, PathBuf};

/// What `generate` wrote
#[derive(Debug, Clone)]
pub struct GenerationOutput {
    pub vehicle: SavedFiles,
    pub manufacturer: SavedFiles,
    pub report: SummaryReport,
    pub report_path: PathBuf,
}

/// Result of computing metrics for one subject
#[derive(Debug)]
pub struct SubjectOutcome {
    pub subject: String,
    pub result: Result<(MergedMetrics, PathBuf)>,
}

/// Generate both synthetic datasets and the summary report.
pub fn generate(config: &Config) -> Result<GenerationOutput> {
    config.validate()?;
    create_directories(config)?;

    let months = YearMonth::range_inclusive(config.start, config.end);
    let stamp = timestamp();
    let span = format!("{}_{}", config.start.year(), config.end.year());

    let save = |source: &dyn RegistrationSource, dir: &Path| -> Result<(Vec<RegistrationRecord>, SavedFiles)> {
        let records = source.generate(&months);
        let filename = format!("{}_data_{}_{}.csv", source.subject(), span, stamp);
        tracing::info!(subject = source.subject(), records = records.len(), "generated registrations");
        let saved = save_registrations(&records, &filename, dir)?;
        Ok((records, saved))
    };

    let (vehicle_records, vehicle) = save(&VehicleTypeSource, &config.vehicle_type_dir)?;
    let (manufacturer_records, manufacturer) = save(&ManufacturerSource, &config.manufacturer_dir)?;

    let report = SummaryReport::build(
        &vehicle_records,
        &manufacturer_records,
        config.start,
        config.end,
        &config.generated_by,
    );
    let report_path = write_summary_report(&report, &config.data_dir, &stamp)?;

    Ok(GenerationOutput {
        vehicle,
        manufacturer,
        report,
        report_path,
    })
}

/// Compute and write metrics for one subject from in-memory rows.
pub fn compute_subject(
    config: &Config,
    subject: &str,
    rows: &[Record],
    group_fields: &[String],
    join: JoinPolicy,
) -> Result<(MergedMetrics, PathBuf)> {
    let calculator = GrowthMetricsCalculator::with_join(join);
    let metrics = calculator.compute(rows, &config.period_field, group_fields, &config.value_field)?;
    let path = write_metrics(&metrics, &config.metrics_dir, subject)?;
    Ok((metrics, path))
}

/// Compute and write metrics for one subject from a CSV file.
pub fn compute_file(
    config: &Config,
    input: &Path,
    subject: &str,
    group_fields: &[String],
    join: JoinPolicy,
) -> Result<(MergedMetrics, PathBuf)> {
    let rows = load_records(input)?;
    tracing::info!(input = %input.display(), rows = rows.len(), "loaded input rows");
    compute_subject(config, subject, &rows, group_fields, join)
}

/// Full run: generate data, then metrics for every subject.
///
/// A failing subject is logged to the error log and skipped; the other
/// subject still gets its file.
pub fn run(config: &Config) -> Result<(GenerationOutput, Vec<SubjectOutcome>)> {
    let generated = generate(config)?;

    let subjects = [
        ("vehicle_type", &generated.vehicle),
        ("manufacturer", &generated.manufacturer),
    ];

    let outcomes = subjects
        .into_iter()
        .map(|(subject, saved)| {
            let rows: Vec<Record> = saved.monthly.iter().map(Record::from).collect();
            let result = compute_subject(config, subject, &rows, &config.group_fields, config.join);

            if let Err(err) = &result {
                let message = format!("Error computing {} metrics", subject);
                if let Err(log_err) = report_error(err, &message, &config.logs_dir) {
                    tracing::warn!(error = %log_err, "could not write error log");
                }
            }

            SubjectOutcome {
                subject: subject.to_string(),
                result,
            }
        })
        .collect();

    Ok((generated, outcomes))
}
