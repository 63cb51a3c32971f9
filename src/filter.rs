// Record selection passed explicitly into the calculators.
// `None` means "no restriction"; an empty set matches nothing.

use crate::model::{Category, RegistrationRecord, YearMonth};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Inclusive range of months
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: YearMonth,
    pub end: YearMonth,
}

impl DateRange {
    pub fn new(start: YearMonth, end: YearMonth) -> Result<Self, String> {
        if start > end {
            return Err(format!("date range start {} is after end {}", start, end));
        }
        Ok(DateRange { start, end })
    }

    pub fn contains(&self, period: &YearMonth) -> bool {
        self.start <= *period && *period <= self.end
    }

    /// Smallest range covering every record, if any
    pub fn spanning(records: &[RegistrationRecord]) -> Option<Self> {
        let start = records.iter().map(|r| r.period).min()?;
        let end = records.iter().map(|r| r.period).max()?;
        Some(DateRange { start, end })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordFilter {
    pub date_range: Option<DateRange>,
    pub categories: Option<BTreeSet<Category>>,
    pub manufacturers: Option<BTreeSet<String>>,
}

impl RecordFilter {
    /// Matches every record
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    pub fn with_categories<I: IntoIterator<Item = Category>>(mut self, categories: I) -> Self {
        self.categories = Some(categories.into_iter().collect());
        self
    }

    pub fn with_manufacturers<I, S>(mut self, manufacturers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.manufacturers = Some(manufacturers.into_iter().map(Into::into).collect());
        self
    }

    /// Category and manufacturer restriction only
    pub fn matches_series(&self, category: Category, manufacturer: &str) -> bool {
        let category_ok = self
            .categories
            .as_ref()
            .map_or(true, |set| set.contains(&category));
        let manufacturer_ok = self
            .manufacturers
            .as_ref()
            .map_or(true, |set| set.contains(manufacturer));

        category_ok && manufacturer_ok
    }

    pub fn matches_period(&self, period: &YearMonth) -> bool {
        self.date_range.map_or(true, |range| range.contains(period))
    }

    pub fn matches(&self, record: &RegistrationRecord) -> bool {
        self.matches_period(&record.period)
            && self.matches_series(record.category, &record.manufacturer)
    }

    pub fn apply<'a>(&self, records: &'a [RegistrationRecord]) -> Vec<&'a RegistrationRecord> {
        records.iter().filter(|r| self.matches(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ym(year: i32, month: u32) -> YearMonth {
        YearMonth::new(year, month).unwrap()
    }

    fn sample() -> Vec<RegistrationRecord> {
        vec![
            RegistrationRecord::new(ym(2024, 1), Category::TwoWheeler, "Honda", 10),
            RegistrationRecord::new(ym(2024, 2), Category::FourWheeler, "Kia", 20),
            RegistrationRecord::new(ym(2024, 3), Category::FourWheeler, "Tata", 30),
            RegistrationRecord::new(ym(2024, 4), Category::ThreeWheeler, "Bajaj", 40),
        ]
    }

    #[test]
    fn test_default_filter_matches_everything() {
        let records = sample();
        assert_eq!(RecordFilter::all().apply(&records).len(), 4);
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let records = sample();
        let range = DateRange::new(ym(2024, 2), ym(2024, 3)).unwrap();
        let filtered = RecordFilter::all().with_date_range(range).apply(&records);

        assert_eq!(filtered.len(), 2);
        assert!(filtered.iter().all(|r| range.contains(&r.period)));
    }

    #[test]
    fn test_inverted_range_rejected() {
        assert!(DateRange::new(ym(2024, 5), ym(2024, 4)).is_err());
    }

    #[test]
    fn test_category_and_manufacturer_filters_combine() {
        let records = sample();
        let filter = RecordFilter::all()
            .with_categories([Category::FourWheeler])
            .with_manufacturers(["Kia", "Honda"]);

        let filtered = filter.apply(&records);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].manufacturer, "Kia");
    }

    #[test]
    fn test_empty_selection_matches_nothing() {
        let records = sample();
        let filter = RecordFilter::all().with_categories(Vec::<Category>::new());
        assert!(filter.apply(&records).is_empty());
    }

    #[test]
    fn test_spanning_range() {
        let range = DateRange::spanning(&sample()).unwrap();
        assert_eq!(range.start, ym(2024, 1));
        assert_eq!(range.end, ym(2024, 4));
        assert!(DateRange::spanning(&[]).is_none());
    }
}
