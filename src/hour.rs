//! Code for working with hours of the year.
//!
//! Every hour-indexed quantity in the model (demand, capacity factors, grid prices, storage
//! state) is keyed by the hour of a non-leap 365-day year. Only a sample of the year's hours is
//! modelled, to keep the size of the optimisation problem tractable.
use crate::error::OffGridError;
use anyhow::Result;
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use itertools::Itertools;
use serde::Deserialize;

/// An hour of the year, between 0 and [`HOURS_IN_YEAR`] - 1
pub type Hour = u32;

/// The number of hours in a day
pub const HOURS_IN_DAY: u32 = 24;

/// The number of days in a (non-leap) year
pub const DAYS_IN_YEAR: u32 = 365;

/// The number of hours in a (non-leap) year
pub const HOURS_IN_YEAR: u32 = DAYS_IN_YEAR * HOURS_IN_DAY;

/// The average number of hours in a month
pub const HOURS_IN_MONTH: f64 = HOURS_IN_YEAR as f64 / 12.0;

/// Number of days in each month of a non-leap year
const DAYS_IN_MONTH: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Get the hour of the year for a timestamp.
///
/// Timestamps in leap years are mapped onto the non-leap calendar: 29 February has no
/// corresponding hour and yields `None`, and later dates are shifted back by one day.
pub fn hour_of_year(timestamp: &NaiveDateTime) -> Option<Hour> {
    let date = timestamp.date();
    let mut day = date.ordinal0();
    if is_leap_year(date.year()) {
        if date.month() == 2 && date.day() == 29 {
            return None;
        }
        if date.month() > 2 {
            day -= 1;
        }
    }

    Some(day * HOURS_IN_DAY + timestamp.hour())
}

fn is_leap_year(year: i32) -> bool {
    NaiveDate::from_ymd_opt(year, 2, 29).is_some()
}

/// Get the first hour of the year for the given month (1-12)
fn first_hour_of_month(month: u32) -> Hour {
    DAYS_IN_MONTH[..(month - 1) as usize].iter().sum::<u32>() * HOURS_IN_DAY
}

/// Get the month (1-12), day of the month (1-31) and hour of the day (0-23) for an hour
pub fn calendar_position(hour: Hour) -> (u32, u32, u32) {
    let mut day = hour / HOURS_IN_DAY;
    let mut month = 1;
    for days in DAYS_IN_MONTH {
        if day < days {
            break;
        }
        day -= days;
        month += 1;
    }

    (month, day + 1, hour % HOURS_IN_DAY)
}

/// A human-readable label for an hour (e.g. "03-01 14:00")
pub fn hour_label(hour: Hour) -> String {
    let (month, day, hour_of_day) = calendar_position(hour);
    format!("{month:02}-{day:02} {hour_of_day:02}:00")
}

/// Check that a sequence of hours can be modelled.
///
/// The sequence must be non-empty, within the year and strictly increasing, because storage
/// balances are accumulated over it in order.
pub fn check_hours(hours: &[Hour]) -> Result<()> {
    if hours.is_empty() {
        Err(OffGridError::Configuration(
            "No hours selected for modelling".into(),
        ))?;
    }

    if let Some(hour) = hours.iter().find(|&&hour| hour >= HOURS_IN_YEAR) {
        Err(OffGridError::Configuration(format!(
            "Hour {hour} is outside the year (must be less than {HOURS_IN_YEAR})"
        )))?;
    }

    if !hours.iter().tuple_windows().all(|(h1, h2)| h1 < h2) {
        Err(OffGridError::Configuration(
            "Modelled hours must be strictly increasing".into(),
        ))?;
    }

    Ok(())
}

/// The strategy used to select which hours of the year are modelled
#[derive(Debug, Deserialize, PartialEq, Clone, Default)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum HourSampling {
    /// The first day of every month
    #[default]
    OneDayEachMonth,
    /// Every hour of every day of a single month
    EveryDayOfMonth {
        /// The month to model (1-12)
        month: u32,
    },
    /// Every nth hour of the year
    EveryNthHour {
        /// The step between modelled hours
        n: u32,
        /// The first modelled hour
        #[serde(default)]
        offset: Hour,
    },
    /// The whole year
    AllHours,
    /// An explicit list of hours
    Explicit {
        /// The hours to model, in increasing order
        hours: Vec<Hour>,
    },
}

impl HourSampling {
    /// Get the ordered sequence of hours to model for this strategy
    pub fn hours(&self) -> Result<Vec<Hour>> {
        let hours = match self {
            Self::OneDayEachMonth => (1..=12)
                .flat_map(|month| {
                    let start = first_hour_of_month(month);
                    start..start + HOURS_IN_DAY
                })
                .collect(),
            Self::EveryDayOfMonth { month } => {
                if !(1..=12).contains(month) {
                    Err(OffGridError::Configuration(format!(
                        "Invalid month for hour sampling: {month}"
                    )))?;
                }
                let start = first_hour_of_month(*month);
                let end = start + DAYS_IN_MONTH[(*month - 1) as usize] * HOURS_IN_DAY;
                (start..end).collect()
            }
            Self::EveryNthHour { n, offset } => {
                if *n == 0 {
                    Err(OffGridError::Configuration(
                        "Hour sampling step cannot be zero".into(),
                    ))?;
                }
                (*offset..HOURS_IN_YEAR).step_by(*n as usize).collect()
            }
            Self::AllHours => (0..HOURS_IN_YEAR).collect(),
            Self::Explicit { hours } => hours.clone(),
        };

        check_hours(&hours)?;
        Ok(hours)
    }
}
