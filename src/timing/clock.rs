use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::ISO_FORMAT;

/// Current wall-clock time in the restaurant's time zone.
pub fn local_now(timezone: Tz) -> DateTime<Tz> {
    Utc::now().with_timezone(&timezone)
}

/// Timestamp string stored in `created_at` / `updated_at` columns.
pub fn timestamp(timezone: Tz) -> String {
    local_now(timezone).format(ISO_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;

    use super::*;

    #[test]
    fn timestamp_is_iso_without_offset() {
        let stamp = timestamp(chrono_tz::Europe::London);
        assert!(NaiveDateTime::parse_from_str(&stamp, ISO_FORMAT).is_ok());
        assert!(!stamp.contains('+'));
    }
}
