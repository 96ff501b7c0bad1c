// 🏭 Registration Generator - Synthetic monthly registration series
//
// Counts come from closed-form trend formulas: a yearly growth factor, an
// intra-year drift and (for manufacturers) a seasonal swing. No network.

use crate::period::YearMonth;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

/// Year the growth factor is anchored to (factor 1.0)
pub const BASE_YEAR: i32 = 2020;

/// Vehicle categories and their base monthly registrations
pub const VEHICLE_TYPES: [(&str, f64); 3] = [("2W", 25000.0), ("3W", 15000.0), ("4W", 35000.0)];

/// Manufacturers with their typical vehicle type and base monthly registrations
pub const MANUFACTURERS: [(&str, &str, f64); 14] = [
    ("Maruti Suzuki", "4W", 12500.0),
    ("Honda", "2W", 8500.0),
    ("Tata Motors", "4W", 7500.0),
    ("Hyundai", "4W", 6800.0),
    ("Hero MotoCorp", "2W", 9200.0),
    ("Bajaj Auto", "2W", 7800.0),
    ("TVS Motor", "2W", 6500.0),
    ("Mahindra", "4W", 5500.0),
    ("Royal Enfield", "2W", 4200.0),
    ("Kia Motors", "4W", 4800.0),
    ("Toyota", "4W", 4200.0),
    ("MG Motors", "4W", 3500.0),
    ("Yamaha", "2W", 4100.0),
    ("Suzuki", "2W", 3800.0),
];

// ============================================================================
// RECORD
// ============================================================================

/// RegistrationRecord - One generated row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationRecord {
    /// Only set for manufacturer-wise data
    pub manufacturer: Option<String>,
    pub vehicle_type: String,
    pub registration_count: u64,
    /// Always the first day of the month
    pub date: NaiveDate,
}

impl RegistrationRecord {
    pub fn period(&self) -> YearMonth {
        YearMonth::from_date(self.date)
    }
}

// ============================================================================
// TREND FORMULAS
// ============================================================================

/// +10% per year since BASE_YEAR
pub fn year_factor(period: YearMonth) -> f64 {
    (period.year() - BASE_YEAR) as f64 * 0.1 + 1.0
}

/// Up to +5% drift through the year
pub fn month_factor(period: YearMonth) -> f64 {
    (period.month() as f64 / 12.0) * 0.05 + 1.0
}

/// ±20% swing; December is the trough, June the neutral point
pub fn seasonal_factor(period: YearMonth) -> f64 {
    1.0 + 0.2 * (((period.month() % 12) as f64 - 6.0) / 6.0)
}

// ============================================================================
// SOURCES
// ============================================================================

/// RegistrationSource - Anything that can produce a monthly registration table
pub trait RegistrationSource {
    /// Subject name used in file names ("vehicle_type", "manufacturer")
    fn subject(&self) -> &str;

    /// Rows for every month in `months`
    fn generate(&self, months: &[YearMonth]) -> Vec<RegistrationRecord>;
}

/// Category-wise data (2W/3W/4W)
#[derive(Debug, Clone, Default)]
pub struct VehicleTypeSource;

impl RegistrationSource for VehicleTypeSource {
    fn subject(&self) -> &str {
        "vehicle_type"
    }

    fn generate(&self, months: &[YearMonth]) -> Vec<RegistrationRecord> {
        let mut records = Vec::with_capacity(months.len() * VEHICLE_TYPES.len());

        for &period in months {
            let yf = year_factor(period);
            let mf = month_factor(period);

            for (vehicle_type, base) in VEHICLE_TYPES {
                records.push(RegistrationRecord {
                    manufacturer: None,
                    vehicle_type: vehicle_type.to_string(),
                    registration_count: (base * yf * mf) as u64,
                    date: period.first_day(),
                });
            }
        }

        records
    }
}

/// Manufacturer-wise data
#[derive(Debug, Clone, Default)]
pub struct ManufacturerSource;

impl RegistrationSource for ManufacturerSource {
    fn subject(&self) -> &str {
        "manufacturer"
    }

    fn generate(&self, months: &[YearMonth]) -> Vec<RegistrationRecord> {
        let mut records = Vec::with_capacity(months.len() * MANUFACTURERS.len());

        for &period in months {
            let yf = year_factor(period);
            let mf = month_factor(period);
            let sf = seasonal_factor(period);

            for (manufacturer, vehicle_type, base) in MANUFACTURERS {
                records.push(RegistrationRecord {
                    manufacturer: Some(manufacturer.to_string()),
                    vehicle_type: vehicle_type.to_string(),
                    registration_count: (base * yf * mf * sf) as u64,
                    date: period.first_day(),
                });
            }
        }

        records
    }
}

// ============================================================================
// SUMMARY REPORT
// ============================================================================

/// SummaryReport - What a generation run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryReport {
    pub run_id: String,
    pub vehicle_type_records: usize,
    pub manufacturer_records: usize,
    pub date_range: String,
    pub vehicle_types: Vec<String>,
    pub total_manufacturers: usize,
    pub generated_on: String,
    pub generated_by: String,
}

impl SummaryReport {
    pub fn build(
        vehicle: &[RegistrationRecord],
        manufacturer: &[RegistrationRecord],
        start: YearMonth,
        end: YearMonth,
        generated_by: &str,
    ) -> Self {
        let mut vehicle_types: Vec<String> = Vec::new();
        for record in vehicle {
            if !vehicle_types.contains(&record.vehicle_type) {
                vehicle_types.push(record.vehicle_type.clone());
            }
        }

        let mut manufacturers: Vec<&str> = manufacturer
            .iter()
            .filter_map(|r| r.manufacturer.as_deref())
            .collect();
        manufacturers.sort_unstable();
        manufacturers.dedup();

        SummaryReport {
            run_id: uuid::Uuid::new_v4().to_string(),
            vehicle_type_records: vehicle.len(),
            manufacturer_records: manufacturer.len(),
            date_range: format!("{} to {}", start.first_day(), end.last_day()),
            vehicle_types,
            total_manufacturers: manufacturers.len(),
            generated_on: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            generated_by: generated_by.to_string(),
        }
    }

    /// Report as ordered `(label, value)` pairs
    pub fn lines(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Run ID", self.run_id.clone()),
            ("Total Records - Vehicle Type", self.vehicle_type_records.to_string()),
            ("Total Records - Manufacturer", self.manufacturer_records.to_string()),
            ("Date Range", self.date_range.clone()),
            ("Vehicle Types", format!("{:?}", self.vehicle_types)),
            ("Total Manufacturers", self.total_manufacturers.to_string()),
            ("Data Generated On", self.generated_on.clone()),
            ("Generated By", self.generated_by.clone()),
        ]
    }
}

// ============================================================================
// TESTS
// ============================================================================
