use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};
use crate::page::PeriodOption;

static SEMESTER_WEEK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Wk (\d+).*starting (\d+-[A-Za-z]+-\d+)").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Semester {
    First,
    Second,
}

impl Semester {
    /// Reads the semester from the period selector's current value.
    pub fn from_period_value(value: Option<&str>) -> Result<Self> {
        match value {
            Some("sem1") => Ok(Self::First),
            Some("sem2") => Ok(Self::Second),
            _ => Err(Error::Configuration("Please select Semester 1 or 2.".into())),
        }
    }

    pub fn number(self) -> u32 {
        match self {
            Self::First => 1,
            Self::Second => 2,
        }
    }
}

impl fmt::Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sem {}", self.number())
    }
}

/// Week number to the first day of that academic week.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeekIndex(BTreeMap<u32, NaiveDate>);

impl WeekIndex {
    /// Collects the weeks of `semester` from the period selector's options.
    ///
    /// Options for the other semester, labels that don't follow the
    /// `Wk <n> ... starting <dd-MON-yyyy>` pattern and unparseable dates are
    /// skipped. A week listed twice keeps its last date.
    pub fn build(semester: Semester, options: &[PeriodOption]) -> Self {
        let prefix = format!("{semester} - Wk");

        let weeks = options
            .iter()
            .filter(|option| option.label.contains(&prefix))
            .filter_map(|option| {
                let entry = parse_label(&option.label);
                if entry.is_none() {
                    log::debug!("Skipping period option {:?}", option.label);
                }
                entry
            })
            .collect::<BTreeMap<_, _>>();

        log::debug!("Indexed {} weeks for {semester}", weeks.len());

        Self(weeks)
    }

    pub fn get(&self, week: u32) -> Option<NaiveDate> {
        self.0.get(&week).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(u32, NaiveDate)> for WeekIndex {
    fn from_iter<I: IntoIterator<Item = (u32, NaiveDate)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn parse_label(label: &str) -> Option<(u32, NaiveDate)> {
    let captures = SEMESTER_WEEK.captures(label)?;
    let week = captures[1].parse().ok()?;
    let date = parse_date(&captures[2])?;

    Some((week, date))
}

/// Parses `08-JAN-2024` or `08-JAN-24`, in any letter case.
fn parse_date(s: &str) -> Option<NaiveDate> {
    // `%Y` would happily read "24" as the year 24, so two digit years go first.
    NaiveDate::parse_from_str(s, "%d-%b-%y")
        .or_else(|_| NaiveDate::parse_from_str(s, "%d-%b-%Y"))
        .ok()
}
