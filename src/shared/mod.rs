use std::{fmt, str::FromStr};

use chrono::Duration;
use serde::Deserialize;
use strum::{Display, EnumString};

use upbit_sdk::models::CandleGranularity;

pub mod error;

use error::{ConfigError, TimeframeError};

/// Minute units Upbit serves directly via `/candles/minutes/{unit}`.
pub const UPBIT_MINUTE_UNITS: [u32; 7] = [1, 3, 5, 15, 30, 60, 240];

/// Unit token of a timeframe label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum TimeframeUnit {
    #[strum(serialize = "m")]
    Minute,
    #[strum(serialize = "d")]
    Day,
    #[strum(serialize = "w")]
    Week,
    #[strum(serialize = "M")]
    Month,
    #[strum(serialize = "y")]
    Year,
}

/// A candle timeframe such as `1m`, `240m`, `1d` or `1M`.
///
/// Minute, day and week timeframes have a fixed [`duration`]; month and year
/// timeframes are calendar-sized and can only be produced by aggregating
/// daily candles.
///
/// [`duration`]: Timeframe::duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct Timeframe {
    value: u32,
    unit: TimeframeUnit,
}

impl Timeframe {
    pub fn new(value: u32, unit: TimeframeUnit) -> Result<Self, TimeframeError> {
        if value == 0 {
            return Err(TimeframeError::NonPositiveValue {
                raw: format!("0{unit}"),
            });
        }

        Ok(Self { value, unit })
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn unit(&self) -> TimeframeUnit {
        self.unit
    }

    /// Canonical label, e.g. `60m`.
    pub fn label(&self) -> String {
        format!("{}{}", self.value, self.unit)
    }

    /// Fixed bucket duration; `None` for calendar units.
    pub fn duration(&self) -> Option<Duration> {
        match self.unit {
            TimeframeUnit::Minute => Some(Duration::minutes(self.value as i64)),
            TimeframeUnit::Day => Some(Duration::days(self.value as i64)),
            TimeframeUnit::Week => Some(Duration::weeks(self.value as i64)),
            TimeframeUnit::Month | TimeframeUnit::Year => None,
        }
    }

    /// Like [`duration`], but a configuration error for calendar units.
    ///
    /// [`duration`]: Timeframe::duration
    pub(crate) fn duration_checked(&self) -> Result<Duration, ConfigError> {
        self.duration()
            .ok_or_else(|| ConfigError::TimeframeWithoutDuration { label: self.label() })
    }

    /// Exact bucket length in minutes; `None` for calendar units.
    pub fn minutes(&self) -> Option<i64> {
        self.duration().map(|duration| duration.num_minutes())
    }

    /// Monotone ordering key in minutes, approximating months as 30 days and
    /// years as 365. Used only for ordering and source selection, never for
    /// bucket arithmetic.
    pub fn sort_key(&self) -> i64 {
        let unit_minutes = match self.unit {
            TimeframeUnit::Minute => 1,
            TimeframeUnit::Day => 60 * 24,
            TimeframeUnit::Week => 60 * 24 * 7,
            TimeframeUnit::Month => 60 * 24 * 30,
            TimeframeUnit::Year => 60 * 24 * 365,
        };

        self.value as i64 * unit_minutes
    }

    /// Whether candles of this timeframe can be rolled up into `target`.
    ///
    /// Fixed-duration targets require a strictly larger, integral multiple
    /// of the source bucket. Month and year targets are only producible from
    /// `1d`.
    pub fn can_aggregate_to(&self, target: Timeframe) -> bool {
        if *self == target {
            return false;
        }

        match target.unit {
            TimeframeUnit::Minute | TimeframeUnit::Day | TimeframeUnit::Week => {
                let (Some(source_minutes), Some(target_minutes)) =
                    (self.minutes(), target.minutes())
                else {
                    return false;
                };

                target_minutes > source_minutes && target_minutes % source_minutes == 0
            }
            TimeframeUnit::Month | TimeframeUnit::Year => {
                self.unit == TimeframeUnit::Day && self.value == 1
            }
        }
    }

    /// Whether this timeframe is a granularity Upbit serves directly.
    pub fn is_supported_base(&self) -> bool {
        match self.unit {
            TimeframeUnit::Minute => UPBIT_MINUTE_UNITS.contains(&self.value),
            TimeframeUnit::Day
            | TimeframeUnit::Week
            | TimeframeUnit::Month
            | TimeframeUnit::Year => self.value == 1,
        }
    }

    /// Granularity path selector for the exchange client.
    pub(crate) fn granularity(&self) -> CandleGranularity {
        match self.unit {
            TimeframeUnit::Minute => CandleGranularity::Minutes(self.value),
            TimeframeUnit::Day => CandleGranularity::Days,
            TimeframeUnit::Week => CandleGranularity::Weeks,
            TimeframeUnit::Month => CandleGranularity::Months,
            TimeframeUnit::Year => CandleGranularity::Years,
        }
    }
}

impl FromStr for Timeframe {
    type Err = TimeframeError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(TimeframeError::Empty);
        }

        let (unit_at, _) = raw
            .char_indices()
            .last()
            .expect("non-empty after trim");

        let unit = TimeframeUnit::from_str(&raw[unit_at..]).map_err(|_| {
            TimeframeError::UnknownUnit {
                raw: raw.to_string(),
            }
        })?;

        let value_part = &raw[..unit_at];
        if !value_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TimeframeError::InvalidValue {
                raw: raw.to_string(),
            });
        }

        let value: u32 = value_part.parse().map_err(|_| TimeframeError::InvalidValue {
            raw: raw.to_string(),
        })?;

        if value == 0 {
            return Err(TimeframeError::NonPositiveValue {
                raw: raw.to_string(),
            });
        }

        Ok(Self { value, unit })
    }
}

impl TryFrom<String> for Timeframe {
    type Error = TimeframeError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit)
    }
}
