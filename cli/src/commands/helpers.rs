use anyhow::{Result, bail};
use chrono::{Local, NaiveDate, TimeDelta};

/// Parse a date argument into `YYYY-MM-DD`, defaulting to today.
/// Accepts `today`, `yesterday`, `tomorrow`, or an explicit `YYYY-MM-DD`.
pub(crate) fn parse_date(date: Option<String>) -> Result<String> {
    let today = Local::now().date_naive();
    let date = match date.as_deref() {
        None | Some("today") => today,
        Some("yesterday") => today - TimeDelta::days(1),
        Some("tomorrow") => today + TimeDelta::days(1),
        Some(s) => match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            Ok(d) => d,
            Err(_) => bail!("Invalid date '{s}'. Use YYYY-MM-DD, today, yesterday, or tomorrow"),
        },
    };
    Ok(date.format("%Y-%m-%d").to_string())
}

/// Render an optional text column.
pub(crate) fn dash(value: Option<&str>) -> String {
    value.map_or_else(|| "-".to_string(), ToString::to_string)
}

/// How long ago a timestamp was, in whole local days.
pub(crate) fn days_ago(created_at: &str) -> String {
    let Ok(ts) = chrono::DateTime::parse_from_rfc3339(created_at) else {
        return created_at.to_string();
    };
    let days = (Local::now().date_naive() - ts.with_timezone(&Local).date_naive()).num_days();
    match days {
        d if d <= 0 => "today".to_string(),
        1 => "1 day ago".to_string(),
        d => format!("{d} days ago"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_explicit() {
        assert_eq!(parse_date(Some("2024-06-15".to_string())).unwrap(), "2024-06-15");
    }

    #[test]
    fn test_parse_date_default_is_today() {
        let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
        assert_eq!(parse_date(None).unwrap(), today);
        assert_eq!(parse_date(Some("today".to_string())).unwrap(), today);
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert!(parse_date(Some("June 15th".to_string())).is_err());
    }

    #[test]
    fn test_dash() {
        assert_eq!(dash(None), "-");
        assert_eq!(dash(Some("kg")), "kg");
    }

    #[test]
    fn test_days_ago() {
        let now = Local::now();
        assert_eq!(days_ago(&now.to_rfc3339()), "today");
        assert_eq!(days_ago(&(now - TimeDelta::days(1)).to_rfc3339()), "1 day ago");
        assert_eq!(days_ago(&(now - TimeDelta::days(5)).to_rfc3339()), "5 days ago");
        // Unparseable timestamps fall through unchanged.
        assert_eq!(days_ago("2024-06-01"), "2024-06-01");
    }
}
