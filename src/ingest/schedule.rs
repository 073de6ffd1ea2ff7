use chrono::{DateTime, Utc};
use croner::Cron;

use upbit_sdk::KST;

use crate::shared::{Timeframe, TimeframeUnit, error::ConfigError};

/// Collection schedule derived from the smallest configured base timeframe.
///
/// Cycles fire on aligned wall-clock boundaries in the exchange zone:
/// `*/N * * * *` for sub-hour minute bases dividing 60, `0 * * * *` for
/// hourly, `0 */H * * *` for whole-hour multiples. Anything else is refused
/// at startup; day-or-coarser bases must be triggered externally.
pub(crate) struct CycleSchedule {
    expression: String,
    cron: Cron,
}

impl CycleSchedule {
    pub fn derive(min_base: Timeframe) -> Result<Self, ConfigError> {
        let expression = cron_expression(min_base)?;

        let cron = expression
            .parse::<Cron>()
            .map_err(|e| ConfigError::ScheduleExpression {
                expression: expression.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self { expression, cron })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Next boundary strictly after `now`.
    pub fn next_occurrence(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, ConfigError> {
        let next = self
            .cron
            .find_next_occurrence(&now.with_timezone(&KST), false)
            .map_err(|e| ConfigError::ScheduleExpression {
                expression: self.expression.clone(),
                reason: e.to_string(),
            })?;

        Ok(next.with_timezone(&Utc))
    }
}

fn cron_expression(min_base: Timeframe) -> Result<String, ConfigError> {
    if min_base.unit() != TimeframeUnit::Minute {
        return Err(ConfigError::UnschedulableBase {
            label: min_base.label(),
        });
    }

    let minutes = min_base.value();

    if minutes < 60 && 60 % minutes == 0 {
        Ok(format!("*/{minutes} * * * *"))
    } else if minutes == 60 {
        Ok("0 * * * *".to_string())
    } else if minutes > 60 && minutes % 60 == 0 {
        Ok(format!("0 */{} * * *", minutes / 60))
    } else {
        Err(ConfigError::UnschedulableInterval {
            label: min_base.label(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tf(raw: &str) -> Timeframe {
        raw.parse().expect("valid timeframe")
    }

    fn utc(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw)
            .expect("valid timestamp")
            .with_timezone(&Utc)
    }

    #[test]
    fn derives_cron_expressions() {
        assert_eq!(
            CycleSchedule::derive(tf("15m")).unwrap().expression(),
            "*/15 * * * *"
        );
        assert_eq!(
            CycleSchedule::derive(tf("60m")).unwrap().expression(),
            "0 * * * *"
        );
        assert_eq!(
            CycleSchedule::derive(tf("240m")).unwrap().expression(),
            "0 */4 * * *"
        );
        assert_eq!(
            CycleSchedule::derive(tf("1m")).unwrap().expression(),
            "*/1 * * * *"
        );
    }

    #[test]
    fn refuses_unschedulable_bases() {
        assert!(matches!(
            CycleSchedule::derive(tf("1d")),
            Err(ConfigError::UnschedulableBase { .. })
        ));
        assert!(matches!(
            CycleSchedule::derive(tf("1w")),
            Err(ConfigError::UnschedulableBase { .. })
        ));
        assert!(matches!(
            CycleSchedule::derive(tf("45m")),
            Err(ConfigError::UnschedulableInterval { .. })
        ));
        assert!(matches!(
            CycleSchedule::derive(tf("90m")),
            Err(ConfigError::UnschedulableInterval { .. })
        ));
    }

    #[test]
    fn next_occurrence_hits_quarter_hours() {
        let schedule = CycleSchedule::derive(tf("15m")).unwrap();

        assert_eq!(
            schedule.next_occurrence(utc("2025-01-01T10:07:00Z")).unwrap(),
            utc("2025-01-01T10:15:00Z")
        );

        // Strictly after: a boundary input advances to the next one.
        assert_eq!(
            schedule.next_occurrence(utc("2025-01-01T10:15:00Z")).unwrap(),
            utc("2025-01-01T10:30:00Z")
        );
    }

    #[test]
    fn hour_steps_fire_on_seoul_wall_clock() {
        let schedule = CycleSchedule::derive(tf("240m")).unwrap();

        // 01:30 UTC is 10:30 KST; the next */4 hour in Seoul is 12:00 KST,
        // i.e. 03:00 UTC.
        assert_eq!(
            schedule.next_occurrence(utc("2025-01-01T01:30:00Z")).unwrap(),
            utc("2025-01-01T03:00:00Z")
        );
    }
}
