use chrono::{Local, NaiveDate};

/// Parse a `YYYY-MM-DD` date string.
pub fn parse_ymd(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// The day after `date`, as `YYYY-MM-DD`.
///
/// Date-range filters are inclusive of the end day: queries advance the end
/// date by one day and compare with a strict `<`, so purchases dated on the
/// end day match regardless of any time component. Unparseable input is
/// returned unchanged, which degrades to an exclusive bound.
pub fn day_after(date: &str) -> String {
    match parse_ymd(date) {
        Some(d) => (d + chrono::Duration::days(1))
            .format("%Y-%m-%d")
            .to_string(),
        None => date.to_string(),
    }
}

/// Today's date as `YYYY-MM-DD`, used to prefill the registration form and
/// to stamp export filenames.
pub fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// Render a stored `YYYY-MM-DD` date for display.
///
/// Day-first for locales that write dates that way (the deployment default
/// is pt-BR), month-first otherwise. Unparseable dates pass through.
pub fn display_date(date: &str, locale: &str) -> String {
    let Some(d) = parse_ymd(date) else {
        return date.to_string();
    };
    if day_first_locale(locale) {
        d.format("%d/%m/%Y").to_string()
    } else {
        d.format("%m/%d/%Y").to_string()
    }
}

fn day_first_locale(locale: &str) -> bool {
    !matches!(locale, "en-US" | "en-PH")
}

/// Human label for a report period, e.g. "2026-05-01 to 2026-05-15".
pub fn period_label(from: Option<&str>, to: Option<&str>, locale: &str) -> Option<String> {
    match (from, to) {
        (Some(f), Some(t)) => Some(format!(
            "{} to {}",
            display_date(f, locale),
            display_date(t, locale)
        )),
        (Some(f), None) => Some(format!("from {}", display_date(f, locale))),
        (None, Some(t)) => Some(format!("until {}", display_date(t, locale))),
        (None, None) => None,
    }
}
