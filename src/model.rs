// 🚗 Registration Data Model
// Monthly registration counts keyed by (month, category, manufacturer),
// plus the quarterly view derived from them.

use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// VEHICLE CATEGORY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "2W")]
    TwoWheeler,
    #[serde(rename = "3W")]
    ThreeWheeler,
    #[serde(rename = "4W")]
    FourWheeler,
}

impl Category {
    pub const ALL: [Category; 3] = [
        Category::TwoWheeler,
        Category::ThreeWheeler,
        Category::FourWheeler,
    ];

    /// Short code used in CSV files and the API ("2W", "3W", "4W")
    pub fn code(&self) -> &'static str {
        match self {
            Category::TwoWheeler => "2W",
            Category::ThreeWheeler => "3W",
            Category::FourWheeler => "4W",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::TwoWheeler => "Two-Wheeler",
            Category::ThreeWheeler => "Three-Wheeler",
            Category::FourWheeler => "Four-Wheeler",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "2w" | "twowheeler" => Ok(Category::TwoWheeler),
            "3w" | "threewheeler" => Ok(Category::ThreeWheeler),
            "4w" | "fourwheeler" => Ok(Category::FourWheeler),
            _ => Err(format!("unknown vehicle category '{}'", s.trim())),
        }
    }
}

// ============================================================================
// CALENDAR MONTH
// ============================================================================

/// A calendar month. Ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    /// Returns `None` unless `month` is in 1..=12
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Some(YearMonth { year, month })
        } else {
            None
        }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        YearMonth {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Month containing today's local date
    pub fn current() -> Self {
        Self::from_date(Local::now().date_naive())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Months since year 0, used for arithmetic
    fn ordinal(&self) -> i64 {
        self.year as i64 * 12 + (self.month as i64 - 1)
    }

    fn from_ordinal(ordinal: i64) -> Self {
        YearMonth {
            year: ordinal.div_euclid(12) as i32,
            month: ordinal.rem_euclid(12) as u32 + 1,
        }
    }

    /// Shift by `n` months (negative goes back in time)
    pub fn add_months(&self, n: i64) -> Self {
        Self::from_ordinal(self.ordinal() + n)
    }

    pub fn quarter(&self) -> Quarter {
        Quarter {
            year: self.year,
            number: ((self.month - 1) / 3 + 1) as u8,
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = String;

    /// Accepts "YYYY-MM" or a full ISO date "YYYY-MM-DD" (day is dropped)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(Self::from_date(date));
        }

        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| format!("invalid month '{}', expected YYYY-MM", s))?;

        let year: i32 = year
            .parse()
            .map_err(|_| format!("invalid year in '{}'", s))?;
        let month: u32 = month
            .parse()
            .map_err(|_| format!("invalid month in '{}'", s))?;

        YearMonth::new(year, month).ok_or_else(|| format!("month out of range in '{}'", s))
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// QUARTER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Quarter {
    pub year: i32,
    /// 1..=4
    pub number: u8,
}

impl Quarter {
    pub fn new(year: i32, number: u8) -> Option<Self> {
        if (1..=4).contains(&number) {
            Some(Quarter { year, number })
        } else {
            None
        }
    }

    /// Chronologically preceding quarter (Q1 of Y follows Q4 of Y-1)
    pub fn previous(&self) -> Quarter {
        if self.number == 1 {
            Quarter {
                year: self.year - 1,
                number: 4,
            }
        } else {
            Quarter {
                year: self.year,
                number: self.number - 1,
            }
        }
    }

    /// Same quarter number, one year earlier
    pub fn year_ago(&self) -> Quarter {
        Quarter {
            year: self.year - 1,
            number: self.number,
        }
    }

    /// The three months composing this quarter
    pub fn months(&self) -> [YearMonth; 3] {
        let first = (self.number as u32 - 1) * 3 + 1;
        [
            YearMonth { year: self.year, month: first },
            YearMonth { year: self.year, month: first + 1 },
            YearMonth { year: self.year, month: first + 2 },
        ]
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-Q{}", self.year, self.number)
    }
}

// ============================================================================
// GROWTH VALUE
// ============================================================================

/// Percentage change, or an explicit "no data" marker.
///
/// `NotAvailable` is used when there is no comparison period or the
/// comparison total is zero. It is never the same thing as 0%.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Growth {
    Percent(f64),
    NotAvailable,
}

impl Growth {
    /// Percentage change from `previous` to `current`
    pub fn between(current: u64, previous: Option<u64>) -> Growth {
        match previous {
            Some(prev) if prev > 0 => {
                Growth::Percent((current as f64 - prev as f64) / prev as f64 * 100.0)
            }
            _ => Growth::NotAvailable,
        }
    }

    pub fn percent(&self) -> Option<f64> {
        match self {
            Growth::Percent(p) => Some(*p),
            Growth::NotAvailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Growth::Percent(_))
    }
}

impl fmt::Display for Growth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Growth::Percent(p) => write!(f, "{:+.1}%", p),
            Growth::NotAvailable => f.write_str("N/A"),
        }
    }
}

// ============================================================================
// RECORDS
// ============================================================================

/// One observation: registrations in a month for a (category, manufacturer).
///
/// Serialized field names match the CSV columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRecord {
    #[serde(rename = "date")]
    pub period: YearMonth,

    pub category: Category,

    pub manufacturer: String,

    #[serde(rename = "registrations")]
    pub count: u64,
}

impl RegistrationRecord {
    pub fn new(period: YearMonth, category: Category, manufacturer: &str, count: u64) -> Self {
        RegistrationRecord {
            period,
            category,
            manufacturer: manufacturer.to_string(),
            count,
        }
    }

    pub fn quarter(&self) -> Quarter {
        self.period.quarter()
    }

    /// Uniqueness key of the table
    pub fn key(&self) -> (YearMonth, Category, &str) {
        (self.period, self.category, self.manufacturer.as_str())
    }
}

/// Quarterly total for one (category, manufacturer) with its growth rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarterlyAggregate {
    pub quarter: Quarter,
    pub category: Category,
    pub manufacturer: String,
    pub total: u64,
    /// Distinct months that contributed to `total` (3 for a full quarter)
    pub months: u8,
    pub qoq_growth: Growth,
    pub yoy_growth: Growth,
}

impl QuarterlyAggregate {
    pub fn is_partial(&self) -> bool {
        self.months < 3
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ym(year: i32, month: u32) -> YearMonth {
        YearMonth::new(year, month).unwrap()
    }

    #[test]
    fn test_category_parsing_accepts_codes_and_names() {
        assert_eq!("2W".parse::<Category>().unwrap(), Category::TwoWheeler);
        assert_eq!("3w".parse::<Category>().unwrap(), Category::ThreeWheeler);
        assert_eq!("FourWheeler".parse::<Category>().unwrap(), Category::FourWheeler);
        assert_eq!("two-wheeler".parse::<Category>().unwrap(), Category::TwoWheeler);
        assert!("5W".parse::<Category>().is_err());
    }

    #[test]
    fn test_year_month_parsing() {
        assert_eq!("2024-03".parse::<YearMonth>().unwrap(), ym(2024, 3));
        assert_eq!("2024-03-17".parse::<YearMonth>().unwrap(), ym(2024, 3));
        assert!("2024-13".parse::<YearMonth>().is_err());
        assert!("March 2024".parse::<YearMonth>().is_err());
        assert_eq!(ym(2024, 3).to_string(), "2024-03");
    }

    #[test]
    fn test_month_arithmetic_crosses_years() {
        assert_eq!(ym(2024, 1).add_months(-1), ym(2023, 12));
        assert_eq!(ym(2023, 11).add_months(3), ym(2024, 2));
    }

    #[test]
    fn test_quarter_of_month() {
        assert_eq!(ym(2024, 1).quarter(), Quarter::new(2024, 1).unwrap());
        assert_eq!(ym(2024, 6).quarter(), Quarter::new(2024, 2).unwrap());
        assert_eq!(ym(2024, 12).quarter(), Quarter::new(2024, 4).unwrap());
    }

    #[test]
    fn test_quarter_previous_and_year_ago() {
        let q1 = Quarter::new(2024, 1).unwrap();
        assert_eq!(q1.previous(), Quarter::new(2023, 4).unwrap());
        assert_eq!(q1.year_ago(), Quarter::new(2023, 1).unwrap());
        assert_eq!(Quarter::new(2024, 3).unwrap().previous(), Quarter::new(2024, 2).unwrap());
        assert_eq!(q1.months(), [ym(2024, 1), ym(2024, 2), ym(2024, 3)]);
        assert_eq!(q1.to_string(), "2024-Q1");
    }

    #[test]
    fn test_growth_between() {
        let growth = Growth::between(420, Some(330));
        assert!((growth.percent().unwrap() - 27.2727).abs() < 0.001);

        assert_eq!(Growth::between(100, None), Growth::NotAvailable);
        assert_eq!(Growth::between(100, Some(0)), Growth::NotAvailable);
        assert_eq!(Growth::between(100, Some(100)), Growth::Percent(0.0));
    }

    #[test]
    fn test_growth_display_and_json() {
        assert_eq!(Growth::Percent(12.345).to_string(), "+12.3%");
        assert_eq!(Growth::Percent(-4.0).to_string(), "-4.0%");
        assert_eq!(Growth::NotAvailable.to_string(), "N/A");

        assert_eq!(serde_json::to_string(&Growth::NotAvailable).unwrap(), "null");
        assert_eq!(serde_json::to_string(&Growth::Percent(5.5)).unwrap(), "5.5");
    }

    #[test]
    fn test_record_serializes_with_csv_column_names() {
        let record = RegistrationRecord::new(ym(2024, 2), Category::FourWheeler, "Kia", 8120);
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["date"], "2024-02");
        assert_eq!(json["category"], "4W");
        assert_eq!(json["manufacturer"], "Kia");
        assert_eq!(json["registrations"], 8120);
    }
}
