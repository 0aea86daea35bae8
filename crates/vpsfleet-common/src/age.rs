//! Human-readable age formatting

use chrono::Duration;

/// Format an age as `"[D days, ][H hours, ]M minutes, S seconds"`.
///
/// Days and hours are omitted while zero; hours are always shown once days
/// are. Negative ages clamp to zero.
pub fn format_age(age: Duration) -> String {
    let mut secs = age.num_seconds().max(0);

    let days = secs / 86_400;
    secs %= 86_400;
    let hours = secs / 3_600;
    secs %= 3_600;
    let mins = secs / 60;
    secs %= 60;

    let mut out = String::new();
    if days > 0 {
        out.push_str(&format!("{days} days, "));
    }
    if days > 0 || hours > 0 {
        out.push_str(&format!("{hours} hours, "));
    }
    out.push_str(&format!("{mins} minutes, {secs} seconds"));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_only() {
        assert_eq!(format_age(Duration::seconds(42)), "0 minutes, 42 seconds");
    }

    #[test]
    fn minutes_and_seconds() {
        assert_eq!(
            format_age(Duration::seconds(3 * 60 + 5)),
            "3 minutes, 5 seconds"
        );
    }

    #[test]
    fn hours_shown_when_nonzero() {
        assert_eq!(
            format_age(Duration::seconds(2 * 3600 + 60 + 1)),
            "2 hours, 1 minutes, 1 seconds"
        );
    }

    #[test]
    fn days_force_hours() {
        assert_eq!(
            format_age(Duration::seconds(86_400 + 30)),
            "1 days, 0 hours, 0 minutes, 30 seconds"
        );
    }

    #[test]
    fn negative_clamps_to_zero() {
        assert_eq!(format_age(Duration::seconds(-5)), "0 minutes, 0 seconds");
    }
}
