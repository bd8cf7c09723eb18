//! Date-of-birth parsing and age computation.
//!
//! Parses already-extracted date text against an ordered list of templates.
//! Day-month-year comes first to match the document locale; the first
//! template that parses wins.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;
use time::macros::format_description;
use time::{Date, Month};

/// Why a date of birth could not be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DobError {
    /// No template matched the text.
    #[error("no supported date format matched")]
    NoMatch,
    /// The date parsed but the resulting age is implausible.
    #[error("implausible age {0}")]
    InvalidAge(i32),
}

/// Date templates in preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateTemplate {
    /// `DD-MM-YYYY`
    DayMonthYear,
    /// `YYYY-MM-DD`
    YearMonthDay,
    /// `MM-DD-YYYY`
    MonthDayYear,
    /// `DD-MM-YY`, century resolved by the pivot year.
    DayMonthShortYear,
}

impl DateTemplate {
    /// All templates, most preferred first.
    pub const ALL: [Self; 4] = [
        Self::DayMonthYear,
        Self::YearMonthDay,
        Self::MonthDayYear,
        Self::DayMonthShortYear,
    ];

    /// Whether dates parsed with this template carry century ambiguity.
    #[must_use]
    pub const fn is_ambiguous(self) -> bool {
        matches!(self, Self::DayMonthShortYear)
    }
}

/// Configuration for date-of-birth parsing.
#[derive(Debug, Clone)]
pub struct DobParserConfig {
    /// Two-digit years below this are read as 20xx, others as 19xx.
    pub two_digit_year_pivot: u8,
    /// Ages above this are rejected.
    pub max_age: u32,
}

impl Default for DobParserConfig {
    fn default() -> Self {
        Self {
            two_digit_year_pivot: 50,
            max_age: 150,
        }
    }
}

/// A parsed date together with the template that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedDob {
    /// Calendar date.
    pub date: Date,
    /// Template that matched. Serves as a confidence hint.
    pub template: DateTemplate,
}

/// Date-of-birth parser.
#[derive(Debug, Clone, Default)]
pub struct DobParser {
    config: DobParserConfig,
}

impl DobParser {
    /// Creates a parser with the given configuration.
    #[must_use]
    pub const fn new(config: DobParserConfig) -> Self {
        Self { config }
    }

    /// Parses free date text.
    ///
    /// # Errors
    ///
    /// Returns [`DobError::NoMatch`] if no template parses the text.
    pub fn parse(&self, text: &str) -> Result<ParsedDob, DobError> {
        let normalized = text.trim().replace('/', "-");

        DateTemplate::ALL
            .into_iter()
            .find_map(|template| {
                self.parse_with(template, &normalized)
                    .map(|date| ParsedDob { date, template })
            })
            .ok_or(DobError::NoMatch)
    }

    /// Parses the text and derives the age on `as_of`.
    ///
    /// # Errors
    ///
    /// Returns [`DobError::NoMatch`] if the text does not parse and
    /// [`DobError::InvalidAge`] if the age falls outside `0..=max_age`.
    pub fn parse_with_age(&self, text: &str, as_of: Date) -> Result<(ParsedDob, u32), DobError> {
        let parsed = self.parse(text)?;
        let age = self.age(parsed.date, as_of)?;
        Ok((parsed, age))
    }

    /// Whole years elapsed between `dob` and `as_of`, sanity-checked.
    ///
    /// # Errors
    ///
    /// Returns [`DobError::InvalidAge`] if the age falls outside `0..=max_age`.
    pub fn age(&self, dob: Date, as_of: Date) -> Result<u32, DobError> {
        let years = age_on(dob, as_of);
        u32::try_from(years)
            .ok()
            .filter(|age| *age <= self.config.max_age)
            .ok_or(DobError::InvalidAge(years))
    }

    fn parse_with(&self, template: DateTemplate, text: &str) -> Option<Date> {
        match template {
            DateTemplate::DayMonthYear => {
                let format = format_description!("[day]-[month]-[year]");
                Date::parse(text, &format).ok()
            }
            DateTemplate::YearMonthDay => {
                let format = format_description!("[year]-[month]-[day]");
                Date::parse(text, &format).ok()
            }
            DateTemplate::MonthDayYear => {
                let format = format_description!("[month]-[day]-[year]");
                Date::parse(text, &format).ok()
            }
            DateTemplate::DayMonthShortYear => self.parse_short_year(text),
        }
    }

    // `time` cannot resolve a century from two digits, so this one is by hand.
    fn parse_short_year(&self, text: &str) -> Option<Date> {
        static SHORT: OnceLock<Option<Regex>> = OnceLock::new();
        let re = SHORT
            .get_or_init(|| Regex::new(r"^(\d{2})-(\d{2})-(\d{2})$").ok())
            .as_ref()?;

        let caps = re.captures(text)?;
        let day: u8 = caps[1].parse().ok()?;
        let month: u8 = caps[2].parse().ok()?;
        let short: u8 = caps[3].parse().ok()?;

        let century = if short < self.config.two_digit_year_pivot {
            2000
        } else {
            1900
        };
        let month = Month::try_from(month).ok()?;
        Date::from_calendar_date(century + i32::from(short), month, day).ok()
    }
}

/// Whole years between `dob` and `as_of`, minus one if the birthday has not
/// been reached yet that year. Negative for future dates.
#[must_use]
pub fn age_on(dob: Date, as_of: Date) -> i32 {
    let before_birthday = (u8::from(as_of.month()), as_of.day()) < (u8::from(dob.month()), dob.day());
    as_of.year() - dob.year() - i32::from(before_birthday)
}
