// Manufacturer roster and per-category market shape used by the sample generator

use crate::model::Category;
use std::ops::Range;

const TWO_WHEELER_MAKERS: &[&str] = &["Hero MotoCorp", "Honda", "TVS", "Bajaj", "Yamaha"];
const THREE_WHEELER_MAKERS: &[&str] = &["Bajaj", "Mahindra", "TVS", "Piaggio", "Atul Auto"];
const FOUR_WHEELER_MAKERS: &[&str] = &["Maruti Suzuki", "Hyundai", "Tata", "Mahindra", "Kia"];

// Seasonal multipliers, January first.
// Two-wheelers: monsoon dip, festive (Oct-Nov) peak.
const TWO_WHEELER_SEASON: [f64; 12] = [
    0.95, 0.93, 1.02, 1.00, 0.98, 0.90, 0.88, 0.94, 1.05, 1.18, 1.15, 0.97,
];
// Three-wheelers: fairly flat, fiscal year-end push in March.
const THREE_WHEELER_SEASON: [f64; 12] = [
    0.98, 1.00, 1.10, 0.96, 0.97, 0.95, 0.96, 0.98, 1.00, 1.04, 1.03, 1.01,
];
// Four-wheelers: March and festive peaks, calendar year-end discounting.
const FOUR_WHEELER_SEASON: [f64; 12] = [
    1.02, 0.97, 1.12, 0.95, 0.96, 0.94, 0.93, 0.97, 1.03, 1.12, 1.06, 0.99,
];

/// Manufacturers tracked for a category, in display order
pub fn manufacturers(category: Category) -> &'static [&'static str] {
    match category {
        Category::TwoWheeler => TWO_WHEELER_MAKERS,
        Category::ThreeWheeler => THREE_WHEELER_MAKERS,
        Category::FourWheeler => FOUR_WHEELER_MAKERS,
    }
}

/// Every (category, manufacturer) series, in category then roster order
pub fn all_series() -> impl Iterator<Item = (Category, &'static str)> {
    Category::ALL
        .into_iter()
        .flat_map(|category| manufacturers(category).iter().map(move |m| (category, *m)))
}

/// Range a series' baseline monthly volume is drawn from
pub fn baseline_range(category: Category) -> Range<u64> {
    match category {
        Category::TwoWheeler => 8_000..15_000,
        Category::ThreeWheeler => 1_000..3_000,
        Category::FourWheeler => 5_000..12_000,
    }
}

/// Long-run annual growth rate (0.05 = 5% a year)
pub fn annual_trend(category: Category) -> f64 {
    match category {
        Category::TwoWheeler => 0.05,
        Category::ThreeWheeler => 0.08,
        Category::FourWheeler => 0.06,
    }
}

/// Seasonal multiplier for a calendar month (1..=12)
pub fn seasonal_factor(category: Category, month: u32) -> f64 {
    let profile = match category {
        Category::TwoWheeler => &TWO_WHEELER_SEASON,
        Category::ThreeWheeler => &THREE_WHEELER_SEASON,
        Category::FourWheeler => &FOUR_WHEELER_SEASON,
    };
    let index = (month.clamp(1, 12) - 1) as usize;
    profile[index]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roster_has_five_makers_per_category() {
        for category in Category::ALL {
            assert_eq!(manufacturers(category).len(), 5);
        }
        assert_eq!(all_series().count(), 15);
    }

    #[test]
    fn test_seasonal_profiles_differ_by_category() {
        let october_2w = seasonal_factor(Category::TwoWheeler, 10);
        let october_3w = seasonal_factor(Category::ThreeWheeler, 10);
        assert!(october_2w > october_3w);

        let march_4w = seasonal_factor(Category::FourWheeler, 3);
        let july_4w = seasonal_factor(Category::FourWheeler, 7);
        assert!(march_4w > july_4w);
    }
}
