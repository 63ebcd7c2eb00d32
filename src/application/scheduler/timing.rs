//! Boundary-aligned firing times.
//!
//! A task with interval N runs on the cron schedule `*/N` over minutes, in
//! UTC. Intervals that do not divide 60 therefore restart at the top of each
//! hour, and intervals of 60 or more fire once an hour at minute 0.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;

use crate::application::errors::ScheduleError;

/// Cron expression (with seconds field) for an interval in minutes
pub fn cron_expression(interval_minutes: u64) -> String {
    if interval_minutes >= 60 {
        "0 0 * * * *".to_string()
    } else {
        format!("0 */{} * * * *", interval_minutes.max(1))
    }
}

pub fn minute_schedule(interval_minutes: u64) -> Result<Schedule, ScheduleError> {
    let expr = cron_expression(interval_minutes);
    Schedule::from_str(&expr).map_err(|e| ScheduleError::InvalidSchedule(format!("{}: {}", expr, e)))
}

/// First firing time strictly after `after`
pub fn next_fire_after(schedule: &Schedule, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
    schedule.after(&after).next()
}

/// How the task actually fires, for listings
pub fn describe_interval(interval_minutes: u64) -> String {
    match interval_minutes {
        1 => "every minute".to_string(),
        m if m >= 60 => "hourly at :00".to_string(),
        m if 60 % m == 0 => format!("every {} min", m),
        m => format!("every {} min from :00", m),
    }
}
