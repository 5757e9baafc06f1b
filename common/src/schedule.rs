// Schedule expression handling
//
// The cron parser itself is consumed from the `cron` crate; this module only
// pairs a parsed expression with the timezone it is evaluated in.

use crate::errors::ScheduleError;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule as CronSchedule;
use std::str::FromStr;

/// A validated rotation schedule: a cron expression plus the timezone its
/// fields are interpreted in. Parsed once at job-install time.
#[derive(Debug, Clone)]
pub struct RotationSchedule {
    expression: String,
    schedule: CronSchedule,
    timezone: Tz,
}

impl RotationSchedule {
    /// Parse and validate a cron expression for the given timezone.
    pub fn parse(expression: &str, timezone: Tz) -> Result<Self, ScheduleError> {
        let schedule =
            CronSchedule::from_str(expression).map_err(|e| ScheduleError::InvalidExpression {
                expression: expression.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            expression: expression.to_string(),
            schedule,
            timezone,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Next fire instant strictly after `after`, or `None` when the
    /// expression has no further fire times.
    pub fn next_fire(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let after_in_tz = after.with_timezone(&self.timezone);
        self.schedule
            .after(&after_in_tz)
            .next()
            .map(|fire| fire.with_timezone(&Utc))
    }

    /// Next fire instant from now, as an error when the schedule is
    /// exhausted (a year-bounded expression entirely in the past).
    pub fn upcoming(&self) -> Result<DateTime<Utc>, ScheduleError> {
        self.next_fire(Utc::now())
            .ok_or_else(|| ScheduleError::NoUpcomingFire {
                expression: self.expression.clone(),
            })
    }
}

/// Parse a timezone name from guild configuration.
pub fn parse_timezone(name: &str) -> Result<Tz, ScheduleError> {
    Tz::from_str(name).map_err(|_| ScheduleError::InvalidTimezone(name.to_string()))
}
