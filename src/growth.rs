// 📈 Growth Metrics Calculator
// Aggregates monthly registrations into quarters and computes
// Quarter-over-Quarter and Year-over-Year percentage change.
//
//   qoq = (total(Q) - total(Q-1)) / total(Q-1) * 100
//   yoy = (total(Q) - total(Q-4)) / total(Q-4) * 100
//
// A missing or zero comparison total gives Growth::NotAvailable, never 0%.
// So does a comparison quarter covered by different months than the current
// one (a partial quarter at either edge of the data or of the date range).

use crate::filter::RecordFilter;
use crate::model::{Growth, Quarter, QuarterlyAggregate, RegistrationRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

// ============================================================================
// AGGREGATION
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Bucket {
    total: u64,
    /// Bit n set when month n of the quarter contributed
    month_mask: u8,
}

impl Bucket {
    fn add(&mut self, record: &RegistrationRecord) {
        self.total = self.total.saturating_add(record.count);
        self.month_mask |= 1 << ((record.period.month() - 1) % 3);
    }

    fn months(&self) -> u8 {
        self.month_mask.count_ones() as u8
    }
}

type Buckets<K> = BTreeMap<(K, Quarter), Bucket>;

fn aggregate<'a, K, I, F>(records: I, key: F) -> Buckets<K>
where
    K: Ord,
    I: IntoIterator<Item = &'a RegistrationRecord>,
    F: Fn(&RegistrationRecord) -> K,
{
    let mut buckets = BTreeMap::new();
    for record in records {
        buckets
            .entry((key(record), record.quarter()))
            .or_insert_with(Bucket::default)
            .add(record);
    }
    buckets
}

struct GrowthRow<K> {
    key: K,
    quarter: Quarter,
    bucket: Bucket,
    qoq: Growth,
    yoy: Growth,
}

/// Growth of each `current` bucket against the prior quarters found in `baseline`.
///
/// A prior quarter only counts when the same months of it contributed.
fn attach_growth<K: Ord + Clone>(current: &Buckets<K>, baseline: &Buckets<K>) -> Vec<GrowthRow<K>> {
    let prior_total = |key: &K, quarter: Quarter, bucket: &Bucket| {
        baseline
            .get(&(key.clone(), quarter))
            .filter(|prior| prior.month_mask == bucket.month_mask)
            .map(|prior| prior.total)
    };

    current
        .iter()
        .map(|((key, quarter), bucket)| GrowthRow {
            key: key.clone(),
            quarter: *quarter,
            bucket: *bucket,
            qoq: Growth::between(bucket.total, prior_total(key, quarter.previous(), bucket)),
            yoy: Growth::between(bucket.total, prior_total(key, quarter.year_ago(), bucket)),
        })
        .collect()
}

/// Aggregate the filtered series and compute growth.
///
/// The category/manufacturer part of `filter` selects the series. Totals come
/// from the records inside the date range; prior-quarter totals come from the
/// whole timeline of the selected series, so the first quarter of a narrowed
/// range still compares against data outside it.
fn grouped_growth<K, F>(records: &[RegistrationRecord], filter: &RecordFilter, key: F) -> Vec<GrowthRow<K>>
where
    K: Ord + Clone,
    F: Fn(&RegistrationRecord) -> K,
{
    let series: Vec<&RegistrationRecord> = records
        .iter()
        .filter(|r| filter.matches_series(r.category, &r.manufacturer))
        .collect();

    let baseline = aggregate(series.iter().copied(), &key);

    let rows = match filter.date_range {
        None => attach_growth(&baseline, &baseline),
        Some(range) => {
            let in_range = series.iter().copied().filter(|r| range.contains(&r.period));
            let current = aggregate(in_range, &key);
            attach_growth(&current, &baseline)
        }
    };

    debug!(
        input = records.len(),
        selected = series.len(),
        quarters = rows.len(),
        "computed quarterly growth"
    );

    rows
}

// ============================================================================
// PER (CATEGORY, MANUFACTURER)
// ============================================================================

/// Quarterly totals and growth for each (quarter, category, manufacturer)
/// present in `records` after filtering. Empty filter result gives an empty list.
pub fn compute_quarterly_growth(
    records: &[RegistrationRecord],
    filter: &RecordFilter,
) -> Vec<QuarterlyAggregate> {
    grouped_growth(records, filter, |r| (r.category, r.manufacturer.clone()))
        .into_iter()
        .map(|row| {
            let (category, manufacturer) = row.key;
            QuarterlyAggregate {
                quarter: row.quarter,
                category,
                manufacturer,
                total: row.bucket.total,
                months: row.bucket.months(),
                qoq_growth: row.qoq,
                yoy_growth: row.yoy,
            }
        })
        .collect()
}

/// Growth computed against the given table alone
pub fn quarterly_growth(records: &[RegistrationRecord]) -> Vec<QuarterlyAggregate> {
    compute_quarterly_growth(records, &RecordFilter::all())
}

// ============================================================================
// ROLL-UPS (by category only, by manufacturer only)
// ============================================================================

/// Quarterly growth of a rolled-up series (a whole category, or a
/// manufacturer summed across categories)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesGrowth {
    pub quarter: Quarter,
    pub series: String,
    pub total: u64,
    pub months: u8,
    pub qoq_growth: Growth,
    pub yoy_growth: Growth,
}

impl SeriesGrowth {
    fn from_row<K>(row: GrowthRow<K>, series: String) -> Self {
        SeriesGrowth {
            quarter: row.quarter,
            series,
            total: row.bucket.total,
            months: row.bucket.months(),
            qoq_growth: row.qoq,
            yoy_growth: row.yoy,
        }
    }

    pub fn is_partial(&self) -> bool {
        self.months < 3
    }
}

pub fn category_growth(records: &[RegistrationRecord], filter: &RecordFilter) -> Vec<SeriesGrowth> {
    grouped_growth(records, filter, |r| r.category)
        .into_iter()
        .map(|row| {
            let label = row.key.code().to_string();
            SeriesGrowth::from_row(row, label)
        })
        .collect()
}

pub fn manufacturer_growth(records: &[RegistrationRecord], filter: &RecordFilter) -> Vec<SeriesGrowth> {
    grouped_growth(records, filter, |r| r.manufacturer.clone())
        .into_iter()
        .map(|row| {
            let label = row.key.clone();
            SeriesGrowth::from_row(row, label)
        })
        .collect()
}

/// Most recent quarter of each series.
///
/// Prefers the latest complete quarter; a series with only partial quarters
/// falls back to its latest partial one.
pub fn latest_per_series(rows: &[SeriesGrowth]) -> Vec<SeriesGrowth> {
    let mut latest: HashMap<&str, &SeriesGrowth> = HashMap::new();

    for row in rows {
        let better = match latest.get(row.series.as_str()) {
            None => true,
            Some(current) => match (current.is_partial(), row.is_partial()) {
                (true, false) => true,
                (false, true) => false,
                _ => row.quarter > current.quarter,
            },
        };
        if better {
            latest.insert(row.series.as_str(), row);
        }
    }

    let mut result: Vec<SeriesGrowth> = latest.into_values().cloned().collect();
    result.sort_by(|a, b| a.series.cmp(&b.series));
    result
}

// ============================================================================
// TESTS
// ============================================================================
