//! Hourly lookup tables for demand and renewable capacity factors.
//!
//! Profiles are built once from timestamped historical records and never change afterwards.
use crate::error::OffGridError;
use crate::hour::{HOURS_IN_DAY, HOURS_IN_YEAR, Hour, calendar_position, hour_of_year};
use crate::product::EnergyType;
use anyhow::{Result, ensure};
use chrono::{Datelike, NaiveDateTime, Timelike};
use indexmap::IndexMap;
use serde_string_enum::DeserializeLabeledStringEnum;

/// How timestamped records are reduced to a value for each hour of the year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, DeserializeLabeledStringEnum)]
pub enum Aggregation {
    /// Average all records with the same month and hour of the day
    #[default]
    #[string = "month_hour"]
    MonthHour,
    /// Average all records falling on the same hour of the year
    #[string = "hour_of_year"]
    HourOfYear,
}

/// A value for every hour of the year
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyProfile {
    values: Vec<f64>,
}

/// A running mean
#[derive(Default, Clone, Copy)]
struct Mean {
    total: f64,
    count: u32,
}

impl Mean {
    fn add(&mut self, value: f64) {
        self.total += value;
        self.count += 1;
    }

    fn get(self) -> Option<f64> {
        (self.count > 0).then(|| self.total / self.count as f64)
    }
}

impl HourlyProfile {
    /// A profile with the same value in every hour
    pub fn constant(value: f64) -> Self {
        Self {
            values: vec![value; HOURS_IN_YEAR as usize],
        }
    }

    /// Create a profile from one value per hour of the year
    pub fn from_values(values: Vec<f64>) -> Result<Self> {
        ensure!(
            values.len() == HOURS_IN_YEAR as usize,
            "Hourly profile must have {HOURS_IN_YEAR} values, but {} were given",
            values.len()
        );
        ensure!(
            values.iter().all(|value| value.is_finite()),
            "Hourly profile values must be finite"
        );

        Ok(Self { values })
    }

    /// Create a profile from timestamped records.
    ///
    /// Records on 29 February are skipped. Every bucket used by the aggregation (each month and
    /// hour of the day, or each hour of the year) must contain at least one record.
    pub fn from_records<I>(records: I, aggregation: Aggregation) -> Result<Self>
    where
        I: IntoIterator<Item = (NaiveDateTime, f64)>,
    {
        let values = match aggregation {
            Aggregation::MonthHour => {
                let mut buckets = [[Mean::default(); HOURS_IN_DAY as usize]; 12];
                for (timestamp, value) in records {
                    if hour_of_year(&timestamp).is_some() {
                        buckets[timestamp.month0() as usize][timestamp.hour() as usize].add(value);
                    }
                }

                let mut means = [[0.0; HOURS_IN_DAY as usize]; 12];
                for (month, row) in buckets.iter().enumerate() {
                    for (hour, mean) in row.iter().enumerate() {
                        means[month][hour] = mean.get().ok_or_else(|| {
                            anyhow::anyhow!(
                                "No records for hour {hour:02}:00 in month {}",
                                month + 1
                            )
                        })?;
                    }
                }

                (0..HOURS_IN_YEAR)
                    .map(|hour| {
                        let (month, _, hour_of_day) = calendar_position(hour);
                        means[(month - 1) as usize][hour_of_day as usize]
                    })
                    .collect()
            }
            Aggregation::HourOfYear => {
                let mut buckets = vec![Mean::default(); HOURS_IN_YEAR as usize];
                for (timestamp, value) in records {
                    if let Some(hour) = hour_of_year(&timestamp) {
                        buckets[hour as usize].add(value);
                    }
                }

                buckets
                    .into_iter()
                    .enumerate()
                    .map(|(hour, mean)| {
                        mean.get()
                            .ok_or_else(|| anyhow::anyhow!("No records for hour {hour} of year"))
                    })
                    .collect::<Result<_>>()?
            }
        };

        Self::from_values(values)
    }

    /// The value at the given hour
    pub fn at(&self, hour: Hour) -> f64 {
        self.values[hour as usize]
    }

    /// Add a constant to every value
    pub fn offset(mut self, amount: f64) -> Self {
        for value in &mut self.values {
            *value += amount;
        }
        self
    }

    /// The smallest value in the profile
    pub fn min(&self) -> f64 {
        self.values.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// The largest value in the profile
    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Capacity factors for weather-dependent energy types
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CapacityProfile {
    factors: IndexMap<EnergyType, HourlyProfile>,
}

impl CapacityProfile {
    /// Create a new [`CapacityProfile`].
    ///
    /// Every capacity factor must lie between 0 and 1.
    pub fn new(factors: IndexMap<EnergyType, HourlyProfile>) -> Result<Self> {
        for (energy_type, profile) in &factors {
            if profile.min() < 0.0 || profile.max() > 1.0 {
                Err(OffGridError::Configuration(format!(
                    "Capacity factors for {energy_type} must be between 0 and 1"
                )))?;
            }
        }

        Ok(Self { factors })
    }

    /// Whether there is a profile for the given energy type
    pub fn contains(&self, energy_type: EnergyType) -> bool {
        self.factors.contains_key(&energy_type)
    }

    /// The fraction of nameplate capacity available at the given hour.
    ///
    /// Energy types without a profile (e.g. geothermal) are always fully available.
    pub fn factor(&self, hour: Hour, energy_type: EnergyType) -> f64 {
        self.factors
            .get(&energy_type)
            .map_or(1.0, |profile| profile.at(hour))
    }
}

/// Hourly electricity demand
#[derive(Debug, Clone, PartialEq)]
pub struct DemandProfile(HourlyProfile);

impl DemandProfile {
    /// Create a new [`DemandProfile`], checking that demand is never negative
    pub fn new(profile: HourlyProfile) -> Result<Self> {
        if profile.min() < 0.0 {
            Err(OffGridError::Configuration(
                "Demand cannot be negative".into(),
            ))?;
        }

        Ok(Self(profile))
    }

    /// The same demand in every hour
    pub fn flat(demand: f64) -> Result<Self> {
        Self::new(HourlyProfile::constant(demand))
    }

    /// The demand at the given hour
    pub fn demand_at(&self, hour: Hour) -> f64 {
        self.0.at(hour)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use chrono::{Duration, NaiveDate};
    use float_cmp::assert_approx_eq;

    /// Hourly records for a whole (leap) year, where value = hour of day + 100 * month
    fn year_of_records(year: i32) -> Vec<(NaiveDateTime, f64)> {
        let start = NaiveDate::from_ymd_opt(year, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let mut records = Vec::new();
        let mut timestamp = start;
        while timestamp.year() == year {
            records.push((
                timestamp,
                timestamp.hour() as f64 + 100.0 * timestamp.month() as f64,
            ));
            timestamp += Duration::hours(1);
        }
        records
    }

    #[test]
    fn test_month_hour_aggregation() {
        let mut records = year_of_records(2019);
        records.extend(
            year_of_records(2019)
                .into_iter()
                .map(|(timestamp, value)| (timestamp, value + 2.0)),
        );
        let profile = HourlyProfile::from_records(records, Aggregation::MonthHour).unwrap();
        assert_approx_eq!(f64, profile.at(0), 101.0); // 1 Jan 00:00
        assert_approx_eq!(f64, profile.at(59 * 24 + 14), 315.0); // 1 Mar 14:00
        assert_approx_eq!(f64, profile.at(8759), 1224.0);
    }

    #[test]
    fn test_hour_of_year_aggregation_skips_leap_day() {
        let profile =
            HourlyProfile::from_records(year_of_records(2020), Aggregation::HourOfYear).unwrap();
        assert_approx_eq!(f64, profile.at(58 * 24), 200.0); // 28 Feb
        assert_approx_eq!(f64, profile.at(59 * 24), 300.0); // 1 Mar
    }

    #[test]
    fn test_missing_bucket() {
        let records: Vec<_> = year_of_records(2019)
            .into_iter()
            .filter(|(timestamp, _)| !(timestamp.month() == 6 && timestamp.hour() == 3))
            .collect();
        assert_error!(
            HourlyProfile::from_records(records.clone(), Aggregation::MonthHour),
            "No records for hour 03:00 in month 6"
        );
        assert!(HourlyProfile::from_records(records, Aggregation::HourOfYear).is_err());
    }

    #[test]
    fn test_from_values_length() {
        assert!(HourlyProfile::from_values(vec![0.0; 8760]).is_ok());
        assert_error!(
            HourlyProfile::from_values(vec![0.0; 24]),
            "Hourly profile must have 8760 values, but 24 were given"
        );
    }

    #[test]
    fn test_capacity_factor() {
        let profile = CapacityProfile::new(IndexMap::from([(
            EnergyType::Solar,
            HourlyProfile::constant(0.25),
        )]))
        .unwrap();
        assert!(profile.contains(EnergyType::Solar));
        assert_approx_eq!(f64, profile.factor(10, EnergyType::Solar), 0.25);
        assert_approx_eq!(f64, profile.factor(10, EnergyType::Geothermal), 1.0);
    }

    #[test]
    fn test_capacity_factor_out_of_range() {
        assert_error!(
            CapacityProfile::new(IndexMap::from([(
                EnergyType::Wind,
                HourlyProfile::constant(1.5)
            )])),
            "Configuration error: Capacity factors for wind must be between 0 and 1"
        );
    }

    #[test]
    fn test_demand_profile() {
        let demand = DemandProfile::new(HourlyProfile::constant(3.0).offset(5.0)).unwrap();
        assert_approx_eq!(f64, demand.demand_at(100), 8.0);
        assert_error!(
            DemandProfile::flat(-1.0),
            "Configuration error: Demand cannot be negative"
        );
    }
}
