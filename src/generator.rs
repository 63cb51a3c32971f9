// 🎲 Sample Data Generator
// Fabricates a monthly registration table for every roster series with a
// per-series baseline, a compounding growth trend, bounded noise and a
// category-specific seasonal profile.

use crate::model::{Category, RegistrationRecord, YearMonth};
use crate::roster;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

/// Multiplicative noise is drawn from [1 - NOISE, 1 + NOISE]
const NOISE: f64 = 0.10;

/// Per-manufacturer deviation from the category trend
const TREND_JITTER: f64 = 0.02;

pub const DEFAULT_YEARS: i32 = 3;

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Trailing years of history; non-positive yields an empty table
    pub years: i32,
    /// Last month of the series (inclusive)
    pub end: YearMonth,
    /// Fixed seed for reproducible output
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            years: DEFAULT_YEARS,
            end: YearMonth::current(),
            seed: None,
        }
    }
}

/// Shape of one (category, manufacturer) series
#[derive(Debug, Clone)]
struct SeriesProfile {
    category: Category,
    manufacturer: &'static str,
    baseline: f64,
    annual_growth: f64,
}

// ============================================================================
// GENERATOR
// ============================================================================

pub struct SampleDataGenerator {
    config: GeneratorConfig,
}

impl SampleDataGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        SampleDataGenerator { config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Number of months covered by the window
    pub fn month_count(&self) -> u32 {
        if self.config.years <= 0 {
            0
        } else {
            (self.config.years as u32).saturating_mul(12)
        }
    }

    /// First month of the window, if the window is non-empty
    pub fn start(&self) -> Option<YearMonth> {
        match self.month_count() {
            0 => None,
            months => Some(self.config.end.add_months(-(months as i64 - 1))),
        }
    }

    /// Produce one record per (month, category, manufacturer) in the window.
    ///
    /// Records come out month by month, then in category and roster order.
    pub fn generate(&self) -> Vec<RegistrationRecord> {
        let start = match self.start() {
            Some(start) => start,
            None => {
                debug!(years = self.config.years, "non-positive year count, empty table");
                return Vec::new();
            }
        };
        let months = self.month_count();

        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let profiles: Vec<SeriesProfile> = roster::all_series()
            .map(|(category, manufacturer)| SeriesProfile {
                category,
                manufacturer,
                baseline: rng.gen_range(roster::baseline_range(category)) as f64,
                annual_growth: roster::annual_trend(category)
                    + rng.gen_range(-TREND_JITTER..=TREND_JITTER),
            })
            .collect();

        let mut records = Vec::with_capacity(months as usize * profiles.len());

        for offset in 0..months {
            let period = start.add_months(offset as i64);
            let elapsed_years = offset as f64 / 12.0;

            for profile in &profiles {
                let trend = (1.0 + profile.annual_growth).powf(elapsed_years);
                let noise = rng.gen_range((1.0 - NOISE)..=(1.0 + NOISE));
                let seasonal = roster::seasonal_factor(profile.category, period.month());

                let volume = (profile.baseline * trend * noise * seasonal).round().max(0.0);

                records.push(RegistrationRecord::new(
                    period,
                    profile.category,
                    profile.manufacturer,
                    volume as u64,
                ));
            }
        }

        info!(
            start = %start,
            end = %self.config.end,
            series = profiles.len(),
            records = records.len(),
            seeded = self.config.seed.is_some(),
            "generated sample registration data"
        );

        records
    }
}

/// Generate `years` of history ending in the current month
pub fn generate_sample_data(years: i32, seed: Option<u64>) -> Vec<RegistrationRecord> {
    SampleDataGenerator::new(GeneratorConfig {
        years,
        seed,
        ..GeneratorConfig::default()
    })
    .generate()
}

// ============================================================================
// TESTS
// ============================================================================
