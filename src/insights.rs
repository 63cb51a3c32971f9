// 💡 Dashboard summary
// Key performance indicators, rankings and plain-language insights computed
// over a filtered registration table.

use crate::filter::RecordFilter;
use crate::growth::{self, SeriesGrowth};
use crate::model::{Category, Growth, RegistrationRecord, YearMonth};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

const TOP_MANUFACTURERS: usize = 10;
const GROWTH_MATRIX_SIZE: usize = 5;
const RECENT_QUARTERS: usize = 15;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedTotal {
    pub name: String,
    pub total: u64,
}

/// Monthly total for one category (one point of a trend line)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub period: YearMonth,
    pub category: Category,
    pub total: u64,
}

/// One point of the YoY-vs-QoQ scatter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthMatrixPoint {
    pub manufacturer: String,
    pub total: u64,
    pub yoy_growth: Growth,
    pub qoq_growth: Growth,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub record_count: usize,
    pub total_registrations: u64,
    pub avg_monthly_registrations: f64,
    pub top_category: Option<Category>,
    pub top_manufacturer: Option<String>,
    pub top_manufacturers: Vec<RankedTotal>,
    pub category_trends: Vec<TrendPoint>,
    pub latest_category_growth: Vec<SeriesGrowth>,
    pub growth_matrix: Vec<GrowthMatrixPoint>,
    pub recent_quarters: Vec<SeriesGrowth>,
    pub insights: Vec<String>,
}

impl DashboardSummary {
    pub fn build(records: &[RegistrationRecord], filter: &RecordFilter) -> Self {
        let selected = filter.apply(records);

        let total_registrations = selected
            .iter()
            .fold(0u64, |acc, r| acc.saturating_add(r.count));

        let mut per_month: BTreeMap<YearMonth, u64> = BTreeMap::new();
        let mut per_category: BTreeMap<Category, u64> = BTreeMap::new();
        let mut per_manufacturer: HashMap<&str, u64> = HashMap::new();
        let mut trends: BTreeMap<(YearMonth, Category), u64> = BTreeMap::new();

        for record in &selected {
            add_count(per_month.entry(record.period).or_default(), record.count);
            add_count(per_category.entry(record.category).or_default(), record.count);
            add_count(per_manufacturer.entry(record.manufacturer.as_str()).or_default(), record.count);
            add_count(trends.entry((record.period, record.category)).or_default(), record.count);
        }

        let avg_monthly_registrations = if per_month.is_empty() {
            0.0
        } else {
            per_month.values().map(|v| *v as f64).sum::<f64>() / per_month.len() as f64
        };

        let top_category = per_category
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(category, _)| *category);

        let ranked = rank(per_manufacturer);
        let top_manufacturer = ranked.first().map(|r| r.name.clone());
        let top_manufacturers: Vec<RankedTotal> =
            ranked.iter().take(TOP_MANUFACTURERS).cloned().collect();

        let category_trends = trends
            .into_iter()
            .map(|((period, category), total)| TrendPoint {
                period,
                category,
                total,
            })
            .collect();

        let category_rows = growth::category_growth(records, filter);
        let latest_category_growth = growth::latest_per_series(&category_rows);

        let growth_matrix = build_growth_matrix(records, filter, &ranked);

        let mut recent_quarters = category_rows;
        recent_quarters.sort_by(|a, b| a.quarter.cmp(&b.quarter).then_with(|| a.series.cmp(&b.series)));
        let skip = recent_quarters.len().saturating_sub(RECENT_QUARTERS);
        let recent_quarters = recent_quarters.split_off(skip);

        let mut summary = DashboardSummary {
            record_count: selected.len(),
            total_registrations,
            avg_monthly_registrations,
            top_category,
            top_manufacturer,
            top_manufacturers,
            category_trends,
            latest_category_growth,
            growth_matrix,
            recent_quarters,
            insights: Vec::new(),
        };
        summary.insights = summary.compose_insights(&per_category);
        summary
    }

    pub fn is_empty(&self) -> bool {
        self.record_count == 0
    }

    fn compose_insights(&self, per_category: &BTreeMap<Category, u64>) -> Vec<String> {
        if self.is_empty() {
            return vec!["No registrations match the selected filters".to_string()];
        }

        let mut insights = vec![format!(
            "Dataset contains {} registration records",
            format_thousands(self.record_count as u64)
        )];

        if let Some(category) = self.top_category {
            let total = per_category.get(&category).copied().unwrap_or(0);
            insights.push(format!(
                "{} segment leads with {} registrations",
                category.label(),
                format_thousands(total)
            ));
        }

        if let Some(manufacturer) = &self.top_manufacturer {
            insights.push(format!("{} is the top manufacturer by volume", manufacturer));
        }

        let fastest = self
            .latest_category_growth
            .iter()
            .filter_map(|row| row.yoy_growth.percent().map(|p| (row, p)))
            .max_by(|a, b| a.1.total_cmp(&b.1));
        if let Some((row, _)) = fastest {
            insights.push(format!(
                "{} shows the strongest YoY growth ({}) in {}",
                row.series, row.yoy_growth, row.quarter
            ));
        }

        insights
    }
}

fn add_count(total: &mut u64, count: u64) {
    *total = total.saturating_add(count);
}

/// Manufacturers by total, descending; ties by name
fn rank(totals: HashMap<&str, u64>) -> Vec<RankedTotal> {
    let mut ranked: Vec<RankedTotal> = totals
        .into_iter()
        .map(|(name, total)| RankedTotal {
            name: name.to_string(),
            total,
        })
        .collect();
    ranked.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name)));
    ranked
}

/// Latest YoY and QoQ for the top manufacturers, summed across categories
fn build_growth_matrix(
    records: &[RegistrationRecord],
    filter: &RecordFilter,
    ranked: &[RankedTotal],
) -> Vec<GrowthMatrixPoint> {
    let leaders: Vec<&str> = ranked
        .iter()
        .take(GROWTH_MATRIX_SIZE)
        .map(|r| r.name.as_str())
        .collect();
    if leaders.is_empty() {
        return Vec::new();
    }

    let mut leader_filter = filter.clone();
    leader_filter.manufacturers = Some(leaders.iter().map(|name| name.to_string()).collect());

    let rows = growth::manufacturer_growth(records, &leader_filter);
    let latest = growth::latest_per_series(&rows);

    leaders
        .iter()
        .filter_map(|name| latest.iter().find(|row| row.series == *name))
        .map(|row| GrowthMatrixPoint {
            manufacturer: row.series.clone(),
            total: ranked
                .iter()
                .find(|r| r.name == row.series)
                .map_or(0, |r| r.total),
            yoy_growth: row.yoy_growth,
            qoq_growth: row.qoq_growth,
        })
        .collect()
}

/// 1234567 -> "1,234,567"
pub fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::DateRange;
    use crate::generator::{GeneratorConfig, SampleDataGenerator};

    fn ym(year: i32, month: u32) -> YearMonth {
        YearMonth::new(year, month).unwrap()
    }

    fn small_table() -> Vec<RegistrationRecord> {
        vec![
            RegistrationRecord::new(ym(2024, 1), Category::TwoWheeler, "Honda", 500),
            RegistrationRecord::new(ym(2024, 1), Category::FourWheeler, "Kia", 300),
            RegistrationRecord::new(ym(2024, 2), Category::TwoWheeler, "Honda", 700),
            RegistrationRecord::new(ym(2024, 2), Category::FourWheeler, "Kia", 100),
            RegistrationRecord::new(ym(2024, 2), Category::ThreeWheeler, "Bajaj", 200),
            RegistrationRecord::new(ym(2024, 2), Category::TwoWheeler, "Bajaj", 200),
        ]
    }

    #[test]
    fn test_kpis() {
        let summary = DashboardSummary::build(&small_table(), &RecordFilter::all());

        assert_eq!(summary.record_count, 6);
        assert_eq!(summary.total_registrations, 2000);
        // January 800, February 1200
        assert!((summary.avg_monthly_registrations - 1000.0).abs() < 1e-9);
        assert_eq!(summary.top_category, Some(Category::TwoWheeler));
        assert_eq!(summary.top_manufacturer.as_deref(), Some("Honda"));
    }

    #[test]
    fn test_manufacturer_ranking_sums_across_categories() {
        let summary = DashboardSummary::build(&small_table(), &RecordFilter::all());
        let names: Vec<&str> = summary.top_manufacturers.iter().map(|r| r.name.as_str()).collect();

        assert_eq!(names, vec!["Honda", "Bajaj", "Kia"]);
        assert_eq!(summary.top_manufacturers[1].total, 400);
    }

    #[test]
    fn test_category_trends_are_monthly_per_category() {
        let summary = DashboardSummary::build(&small_table(), &RecordFilter::all());
        let feb_2w = summary
            .category_trends
            .iter()
            .find(|p| p.period == ym(2024, 2) && p.category == Category::TwoWheeler)
            .unwrap();
        assert_eq!(feb_2w.total, 900);
        assert_eq!(summary.category_trends.len(), 5);
    }

    #[test]
    fn test_empty_filter_gives_empty_state() {
        let filter = RecordFilter::all().with_manufacturers(["Nobody"]);
        let summary = DashboardSummary::build(&small_table(), &filter);

        assert!(summary.is_empty());
        assert_eq!(summary.total_registrations, 0);
        assert_eq!(summary.avg_monthly_registrations, 0.0);
        assert!(summary.top_category.is_none());
        assert!(summary.top_manufacturer.is_none());
        assert!(summary.growth_matrix.is_empty());
        assert_eq!(summary.insights.len(), 1);
    }

    #[test]
    fn test_growth_sections_on_generated_data() {
        let records = SampleDataGenerator::new(GeneratorConfig {
            years: 3,
            end: ym(2024, 12),
            seed: Some(10),
        })
        .generate();

        let summary = DashboardSummary::build(&records, &RecordFilter::all());

        assert_eq!(summary.top_manufacturers.len(), 10);
        assert_eq!(summary.latest_category_growth.len(), 3);
        for row in &summary.latest_category_growth {
            assert_eq!(row.quarter.to_string(), "2024-Q4");
            assert!(row.yoy_growth.is_available());
        }

        assert_eq!(summary.growth_matrix.len(), 5);
        assert_eq!(summary.growth_matrix[0].manufacturer, summary.top_manufacturers[0].name);

        assert_eq!(summary.recent_quarters.len(), 15);
        assert_eq!(summary.recent_quarters.last().unwrap().quarter.to_string(), "2024-Q4");
        assert!(summary.insights.iter().any(|i| i.contains("YoY")));
    }

    #[test]
    fn test_date_range_narrows_totals() {
        let filter = RecordFilter::all().with_date_range(DateRange::new(ym(2024, 2), ym(2024, 2)).unwrap());
        let summary = DashboardSummary::build(&small_table(), &filter);
        assert_eq!(summary.total_registrations, 1200);
        assert_eq!(summary.record_count, 4);
    }

    #[test]
    fn test_totals_saturate_instead_of_overflowing() {
        let records = vec![
            RegistrationRecord::new(ym(2024, 1), Category::FourWheeler, "Kia", u64::MAX),
            RegistrationRecord::new(ym(2024, 2), Category::FourWheeler, "Kia", 1),
        ];
        let summary = DashboardSummary::build(&records, &RecordFilter::all());

        assert_eq!(summary.total_registrations, u64::MAX);
        assert_eq!(summary.top_manufacturers[0].total, u64::MAX);
    }

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1000), "1,000");
        assert_eq!(format_thousands(1234567), "1,234,567");
    }
}
