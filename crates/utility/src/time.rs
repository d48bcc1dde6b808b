use chrono::{DateTime, Duration, TimeZone, Timelike};

/// Combines `base`'s calendar date with a clock-time `(hour, minute)`,
/// preserving `base`'s timezone. Seconds and sub-second fields are zeroed.
pub fn combine_with_clock<Tz: TimeZone>(base: &DateTime<Tz>, hour: u32, minute: u32) -> DateTime<Tz> {
    base.with_hour(hour)
        .and_then(|d| d.with_minute(minute))
        .and_then(|d| d.with_second(0))
        .and_then(|d| d.with_nanosecond(0))
        .unwrap_or_else(|| base.clone())
}

/// Rolls `candidate` forward by one day if it falls strictly before
/// `reference`, modelling a departure that is scheduled "tomorrow" relative
/// to a time of day that has already passed today.
pub fn roll_forward_if_before<Tz: TimeZone>(
    candidate: DateTime<Tz>,
    reference: &DateTime<Tz>,
) -> DateTime<Tz> {
    if candidate < *reference {
        candidate + Duration::days(1)
    } else {
        candidate
    }
}

/// Extracts the `(hour, minute)` clock time of `dt` in its own timezone.
pub fn clock_of<Tz: TimeZone>(dt: &DateTime<Tz>) -> (u32, u32) {
    (dt.hour(), dt.minute())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;
    use chrono_tz::Europe::Kyiv;

    #[test]
    fn combine_preserves_timezone_and_date() {
        let base = Kyiv.with_ymd_and_hms(2026, 7, 28, 23, 0, 0).unwrap();
        let combined = combine_with_clock(&base, 5, 30);
        assert_eq!(combined.date_naive(), base.date_naive());
        assert_eq!(clock_of(&combined), (5, 30));
        assert_eq!(combined.timezone(), base.timezone());
    }

    #[test]
    fn rolls_forward_past_midnight() {
        let reference = Kyiv.with_ymd_and_hms(2026, 7, 28, 23, 50, 0).unwrap();
        let candidate = Kyiv.with_ymd_and_hms(2026, 7, 28, 0, 10, 0).unwrap();
        let rolled = roll_forward_if_before(candidate, &reference);
        assert!(rolled > reference);
        assert_eq!(clock_of(&rolled), (0, 10));
    }

    #[test]
    fn does_not_roll_when_already_after_reference() {
        let reference = Kyiv.with_ymd_and_hms(2026, 7, 28, 5, 0, 0).unwrap();
        let candidate = Kyiv.with_ymd_and_hms(2026, 7, 28, 5, 30, 0).unwrap();
        let rolled = roll_forward_if_before(candidate, &reference);
        assert_eq!(rolled, candidate);
    }
}
