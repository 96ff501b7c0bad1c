// Vahan Growth - Core Library
// Exposes all modules for use in CLI, dashboard, API server, and tests

pub mod period;    // Calendar months (YYYY-MM)
pub mod error;     // Error taxonomy + error log
pub mod metrics;   // YoY / QoQ growth calculator
pub mod config;    // vahan.toml + environment
pub mod generator; // Synthetic registration data
pub mod storage;   // CSV files in and out
pub mod cache;     // Fingerprinted metrics cache
pub mod view;      // Dashboard filters and chart series
pub mod pipeline;  // generate → metrics

// Re-export commonly used types
pub use period::{PeriodError, YearMonth};
pub use error::{report_error, MetricsError};
pub use metrics::{
    GroupKey, GrowthKind, GrowthMetricsCalculator, GrowthRow, GrowthTable,
    JoinPolicy, MergedMetrics, Record, QOQ_COLUMN, YOY_COLUMN,
};
pub use config::Config;
pub use generator::{
    ManufacturerSource, RegistrationRecord, RegistrationSource, SummaryReport,
    VehicleTypeSource,
};
pub use storage::{
    list_subjects, load_metrics, load_records, metrics_path, write_metrics,
    MonthlyAggregate, SavedFiles,
};
pub use cache::MetricsCache;
pub use view::{ChartSeries, MetricFilter};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Subjects the pipeline produces metrics for
pub const SUBJECTS: [&str; 2] = ["vehicle_type", "manufacturer"];
