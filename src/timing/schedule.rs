use chrono::NaiveTime;
use thiserror::Error as ThisError;

use super::daily::DayHours;

/// Canonical order of a weekly schedule. Every stored week follows it.
pub const DAYS_OF_WEEK: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum ScheduleError {
    #[error("A week needs exactly 7 days, got {0}")]
    WrongLength(usize),

    #[error("Expected {expected} at position {position}, found {found}")]
    WrongDay {
        position: usize,
        expected: &'static str,
        found: String,
    },

    #[error("Malformed time '{time}' for {day}")]
    MalformedTime { day: String, time: String },
}

/// The 09:00 - 17:00 week used before anything has been saved.
pub fn default_hours() -> Vec<DayHours> {
    DAYS_OF_WEEK
        .iter()
        .map(|day| DayHours::new_open(day, "09:00", "17:00"))
        .collect()
}

/**
Copies the hours of the day at `index` onto every day of the week.

Each day keeps its own name. Returns `None` if `index` is out of range.
*/
pub fn copy_to_all(hours: &[DayHours], index: usize) -> Option<Vec<DayHours>> {
    let source = hours.get(index)?;
    let copied = hours
        .iter()
        .map(|day| DayHours {
            day: day.day.clone(),
            open_time: source.open_time.clone(),
            close_time: source.close_time.clone(),
            is_closed: source.is_closed,
        })
        .collect();
    Some(copied)
}

/// "HH:MM" with both fields zero-padded, so that string order is time order.
fn is_padded_time(time: &str) -> bool {
    time.len() == 5 && NaiveTime::parse_from_str(time, "%H:%M").is_ok()
}

/**
Checks that `hours` is a full Monday-first week before it is stored.

The grouping and validation functions don't do this themselves, they work
positionally over whatever they are handed. Times on open days must be empty or
"HH:MM"; empty ones are left for `validate_hours` to report.
*/
pub fn check_week(hours: &[DayHours]) -> Result<(), ScheduleError> {
    if hours.len() != DAYS_OF_WEEK.len() {
        return Err(ScheduleError::WrongLength(hours.len()));
    }
    for (position, (day, expected)) in hours.iter().zip(DAYS_OF_WEEK).enumerate() {
        if day.day != expected {
            return Err(ScheduleError::WrongDay {
                position,
                expected,
                found: day.day.clone(),
            });
        }
        if day.is_closed {
            continue;
        }
        for time in [&day.open_time, &day.close_time] {
            if !time.is_empty() && !is_padded_time(time) {
                return Err(ScheduleError::MalformedTime {
                    day: day.day.clone(),
                    time: time.clone(),
                });
            }
        }
    }
    Ok(())
}
