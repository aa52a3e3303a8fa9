use chrono::NaiveDate;

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format an optional string, returning a default if None
pub fn format_optional(value: &Option<String>, default: &str) -> String {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
        .to_string()
}

/// Format a date for display, e.g. "Mar 10, 2025"
pub fn format_date(date: NaiveDate) -> String {
    date.format("%b %d, %Y").to_string()
}

/// Format a class period; open-ended classes have no completion date
pub fn format_period(start: NaiveDate, end: Option<NaiveDate>) -> String {
    match end {
        Some(end) => format!("{} → {}", format_date(start), format_date(end)),
        None => format!("{} → open", format_date(start)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
        assert_eq!(truncate_string("Introdução à segurança", 10), "Introdu...");
    }

    #[test]
    fn test_format_optional() {
        assert_eq!(format_optional(&Some("x".into()), "-"), "x");
        assert_eq!(format_optional(&Some(String::new()), "-"), "-");
        assert_eq!(format_optional(&None, "-"), "-");
    }

    #[test]
    fn test_format_period() {
        let start = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 4, 2).unwrap();
        assert_eq!(format_period(start, Some(end)), "Mar 10, 2025 → Apr 02, 2025");
        assert_eq!(format_period(start, None), "Mar 10, 2025 → open");
    }
}
