use serde::{Deserialize, Serialize};

/// One weekday's opening times.
///
/// Times are kept as the "HH:MM" strings the settings editor produces. When
/// `is_closed` is set the times are ignored but still stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayHours {
    pub day: String,
    #[serde(default)]
    pub open_time: String,
    #[serde(default)]
    pub close_time: String,
    #[serde(default)]
    pub is_closed: bool,
}

impl DayHours {
    pub fn new_open(day: &str, open_time: &str, close_time: &str) -> Self {
        Self {
            day: day.to_string(),
            open_time: open_time.to_string(),
            close_time: close_time.to_string(),
            is_closed: false,
        }
    }

    #[cfg(test)]
    pub fn new_closed(day: &str) -> Self {
        Self {
            day: day.to_string(),
            open_time: String::new(),
            close_time: String::new(),
            is_closed: true,
        }
    }

    /// Two days share hours when the closed flag and both times match exactly.
    pub fn same_hours(&self, other: &DayHours) -> bool {
        self.is_closed == other.is_closed
            && self.open_time == other.open_time
            && self.close_time == other.close_time
    }
}
