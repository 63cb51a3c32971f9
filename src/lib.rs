// Vahan Insights - Core Library
// Vehicle registration analytics: sample data, quarterly growth, dashboard summary.
// Shared by the CLI/TUI binary, the API server and the tests.

pub mod model;
pub mod roster;
pub mod generator;
pub mod filter;
pub mod growth;
pub mod insights;
pub mod error;
pub mod dataset;
pub mod db;
pub mod config;
pub mod telemetry;

// Re-export commonly used types
pub use model::{
    Category, Growth, Quarter, QuarterlyAggregate, RegistrationRecord, YearMonth,
};
pub use generator::{
    generate_sample_data, GeneratorConfig, SampleDataGenerator,
};
pub use filter::{DateRange, RecordFilter};
pub use growth::{
    category_growth, compute_quarterly_growth, latest_per_series, manufacturer_growth,
    quarterly_growth, SeriesGrowth,
};
pub use insights::{DashboardSummary, GrowthMatrixPoint, RankedTotal, TrendPoint};
pub use error::LoadError;
pub use dataset::{load_csv, load_or_generate, read_records, save_csv};
pub use db::{
    get_all_records, insert_records, setup_database, verify_count, ImportStats,
};
pub use config::AppConfig;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
