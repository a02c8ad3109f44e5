use serde::Serialize;
use thiserror::Error as ThisError;

use super::daily::DayHours;

/// A run of consecutive days sharing the same hours, ready for display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DisplayGroup {
    pub days: String,
    pub hours: String,
    pub is_closed: bool,
}

/// schema.org `OpeningHoursSpecification` fragment for one open day.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OpeningHoursSpecification {
    #[serde(rename = "@type")]
    pub kind: &'static str,
    #[serde(rename = "dayOfWeek")]
    pub day_of_week: String,
    pub opens: String,
    pub closes: String,
}

#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum HoursError {
    #[error("Please set both open and close times for {day}")]
    MissingTimes { day: String },

    #[error("Closing time must be after opening time for {day}")]
    CloseBeforeOpen { day: String },
}

/**
Converts a 24 hour "HH:MM" time to the 12 hour clock, e.g. "17:30" to "5:30 PM".

An empty string stays empty. The minutes are not touched. Anything that doesn't
have a numeric hour between 0 and 23 followed by a colon is returned verbatim.
*/
pub fn format_time_display(time: &str) -> String {
    if time.is_empty() {
        return String::new();
    }
    let mut parts = time.split(':');
    let (Some(hours), Some(minutes)) = (parts.next(), parts.next()) else {
        return time.to_string();
    };
    let hour: u32 = match hours.parse() {
        Ok(hour) if hour < 24 => hour,
        _ => return time.to_string(),
    };

    let ampm = if hour >= 12 { "PM" } else { "AM" };
    let display_hour = match hour {
        0 => 12,
        13..=23 => hour - 12,
        _ => hour,
    };
    format!("{}:{} {}", display_hour, minutes, ampm)
}

/**
Merges adjacent days with identical hours into display groups.

The input is scanned once in the given order, nothing is sorted. Two days end
up in the same group only if they are neighbours and `DayHours::same_hours`
holds for them.
*/
pub fn group_consecutive_days(hours: &[DayHours]) -> Vec<DisplayGroup> {
    hours
        .chunk_by(|previous, current| previous.same_hours(current))
        .map(format_group)
        .collect()
}

fn format_group(group: &[DayHours]) -> DisplayGroup {
    // chunk_by never yields an empty slice
    let first = &group[0];
    let last = &group[group.len() - 1];

    let days = match group.len() {
        1 => first.day.clone(),
        2 => format!("{} & {}", first.day, last.day),
        _ => format!("{} - {}", first.day, last.day),
    };

    let hours = if first.is_closed {
        "Closed".to_string()
    } else {
        format!(
            "{} - {}",
            format_time_display(&first.open_time),
            format_time_display(&first.close_time)
        )
    };

    DisplayGroup {
        days,
        hours,
        is_closed: first.is_closed,
    }
}

/// Returns the first problem found, in day order. Closed days are skipped.
pub fn validate_hours(hours: &[DayHours]) -> Result<(), HoursError> {
    for day in hours.iter().filter(|day| !day.is_closed) {
        if day.open_time.is_empty() || day.close_time.is_empty() {
            return Err(HoursError::MissingTimes {
                day: day.day.clone(),
            });
        }
        if day.open_time >= day.close_time {
            return Err(HoursError::CloseBeforeOpen {
                day: day.day.clone(),
            });
        }
    }
    Ok(())
}

/// Structured data for the open days only, with the raw 24 hour times.
pub fn convert_to_structured_data(hours: &[DayHours]) -> Vec<OpeningHoursSpecification> {
    hours
        .iter()
        .filter(|day| !day.is_closed)
        .map(|day| OpeningHoursSpecification {
            kind: "OpeningHoursSpecification",
            day_of_week: day.day.clone(),
            opens: day.open_time.clone(),
            closes: day.close_time.clone(),
        })
        .collect()
}
