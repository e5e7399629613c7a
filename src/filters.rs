//! Money and percentage formatting for display.
//!
//! Format: currency symbol + number with locale-aware separators. Amounts in
//! this application are always positive (purchases only), so there is no
//! sign or color handling.

/// Format cents as a currency amount, e.g. `R$1.234,56` for pt-BR.
pub fn format_money(cents: i64, currency: &str, locale: &str) -> String {
    let abs_cents = cents.abs();
    let whole = abs_cents / 100;
    let fractional = abs_cents % 100;

    let (thousands_sep, decimal_sep) = locale_separators(locale);
    let whole_str = format_with_thousands(whole, thousands_sep);
    let symbol = currency_symbol(currency);

    format!("{}{}{}{:02}", symbol, whole_str, decimal_sep, fractional)
}

/// Share of `part_cents` in `total_cents` as a percentage.
///
/// Returns 0 when the total is zero so empty data sets render as "0.00%"
/// instead of propagating NaN.
pub fn percent_of(part_cents: i64, total_cents: i64) -> f64 {
    if total_cents == 0 {
        0.0
    } else {
        part_cents as f64 / total_cents as f64 * 100.0
    }
}

/// Format a percentage share with two decimal places and a locale-aware
/// decimal separator. Example: 12.345 -> "12.35%" (en-US) or "12,35%" (pt-BR).
pub fn format_percent(value: f64, locale: &str) -> String {
    let (_, decimal_sep) = locale_separators(locale);
    let scaled = (value * 100.0).round() as i64;
    let whole = scaled / 100;
    let fractional = (scaled % 100).abs();

    format!("{}{}{:02}%", whole, decimal_sep, fractional)
}

/// Format an item quantity, trimming trailing zeros: 2.0 -> "2", 1.5 -> "1,5"
/// under a comma-decimal locale.
pub fn format_quantity(quantity: f64, locale: &str) -> String {
    let (_, decimal_sep) = locale_separators(locale);
    let s = format!("{:.3}", quantity);
    let trimmed = s.trim_end_matches('0').trim_end_matches('.');
    trimmed.replace('.', &decimal_sep.to_string())
}

/// Get thousands and decimal separators based on locale.
fn locale_separators(locale: &str) -> (char, char) {
    // Locales that use period as thousands separator and comma as decimal
    match locale {
        "de-DE" | "de-AT" | "de-CH" | "fr-FR" | "fr-BE" | "fr-CA" | "es-ES" | "es-AR" | "it-IT"
        | "pt-BR" | "pt-PT" | "nl-NL" | "nl-BE" | "pl-PL" | "ru-RU" | "tr-TR" | "vi-VN"
        | "id-ID" | "da-DK" | "nb-NO" | "sv-SE" | "fi-FI" | "cs-CZ" | "sk-SK" | "hu-HU"
        | "ro-RO" | "bg-BG" | "uk-UA" | "el-GR" => ('.', ','),
        // Most English-speaking countries and others use comma as thousands, period as decimal
        _ => (',', '.'),
    }
}

/// Format a number with thousands separators.
fn format_with_thousands(n: i64, sep: char) -> String {
    if n == 0 {
        return "0".to_string();
    }

    let s = n.to_string();
    let chars: Vec<char> = s.chars().rev().collect();
    let mut result = Vec::new();

    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(sep);
        }
        result.push(*c);
    }

    result.iter().rev().collect()
}

/// Get currency symbol for a currency code.
fn currency_symbol(currency: &str) -> &'static str {
    match currency.to_uppercase().as_str() {
        "USD" => "$",
        "EUR" => "\u{20ac}",
        "GBP" => "\u{00a3}",
        "JPY" => "\u{00a5}",
        "CAD" => "C$",
        "AUD" => "A$",
        "CHF" => "CHF\u{00a0}",
        "INR" => "\u{20b9}",
        "BRL" => "R$",
        "MXN" => "MX$",
        "PLN" => "z\u{0142}\u{00a0}",
        "SEK" => "kr\u{00a0}",
        _ => "$",
    }
}
