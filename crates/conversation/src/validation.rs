use model::MetroError;

/// Parses a custom-time entry against `^\d{1,2}:\d{2}$` with ranges
/// `[0,23]` and `[0,59]` — the one piece of free-form input the engine
/// accepts (spec §4.G).
pub fn parse_custom_time(input: &str) -> Result<(u8, u8), MetroError> {
    let invalid = || MetroError::InvalidInput(format!("not a valid HH:MM time: '{input}'"));

    let (hour_str, minute_str) = input.trim().split_once(':').ok_or_else(invalid)?;

    if hour_str.is_empty() || hour_str.len() > 2 || !hour_str.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    if minute_str.len() != 2 || !minute_str.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let hour: u8 = hour_str.parse().map_err(|_| invalid())?;
    let minute: u8 = minute_str.parse().map_err(|_| invalid())?;
    if hour > 23 || minute > 59 {
        return Err(invalid());
    }

    Ok((hour, minute))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_one_and_two_digit_hours() {
        assert_eq!(parse_custom_time("9:05").unwrap(), (9, 5));
        assert_eq!(parse_custom_time("23:59").unwrap(), (23, 59));
    }

    #[test]
    fn rejects_out_of_range_and_malformed_input() {
        assert!(parse_custom_time("24:00").is_err());
        assert!(parse_custom_time("12:60").is_err());
        assert!(parse_custom_time("12-30").is_err());
        assert!(parse_custom_time("1:3").is_err());
        assert!(parse_custom_time("abc").is_err());
    }
}
