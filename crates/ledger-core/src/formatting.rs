use chrono::{DateTime, Utc};

/// Format a floating-point number with thousands separators and a fixed number
/// of decimal places.
///
/// # Examples
///
/// ```
/// use ledger_core::formatting::format_number;
///
/// assert_eq!(format_number(1234.5,  1), "1,234.5");
/// assert_eq!(format_number(1234567.0, 0), "1,234,567");
/// assert_eq!(format_number(0.0, 2), "0.00");
/// assert_eq!(format_number(-9876.5, 1), "-9,876.5");
/// ```
pub fn format_number(value: f64, decimals: u32) -> String {
    let negative = value < 0.0;
    let abs_value = value.abs();

    // Nudge by half an ULP at the target precision so exact midpoints such
    // as 1.005 round away from zero.
    let factor = 10_f64.powi(decimals as i32);
    let epsilon = f64::EPSILON * abs_value * factor;
    let rounded = ((abs_value * factor) + epsilon).round() / factor;

    let integer_part = rounded.trunc() as u64;
    let grouped = group_thousands(&integer_part.to_string());

    let result = if decimals == 0 {
        grouped
    } else {
        let frac_str = format!("{:.prec$}", rounded.fract(), prec = decimals as usize);
        // "0.50" -> ".50"
        format!("{}{}", grouped, &frac_str[1..])
    };

    if negative {
        format!("-{}", result)
    } else {
        result
    }
}

/// Format a USD amount with a dollar sign and thousands separators.
///
/// Per-user API spend is frequently below a cent, so `decimals` is left to
/// the caller.
///
/// # Examples
///
/// ```
/// use ledger_core::formatting::format_currency;
///
/// assert_eq!(format_currency(1234.56, 2), "$1,234.56");
/// assert_eq!(format_currency(0.0615, 4),  "$0.0615");
/// assert_eq!(format_currency(-9.99, 2),   "$-9.99");
/// ```
pub fn format_currency(amount: f64, decimals: u32) -> String {
    if amount < 0.0 {
        format!("$-{}", format_number(amount.abs(), decimals))
    } else {
        format!("${}", format_number(amount, decimals))
    }
}

/// Format a token count with thousands separators.
///
/// ```
/// use ledger_core::formatting::format_tokens;
///
/// assert_eq!(format_tokens(1_250_000), "1,250,000");
/// ```
pub fn format_tokens(tokens: u64) -> String {
    group_thousands(&tokens.to_string())
}

/// Render a usage period as `"YYYY-MM-DD HH:MM → YYYY-MM-DD HH:MM"` (UTC).
pub fn format_period(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    format!(
        "{} → {}",
        start.format("%Y-%m-%d %H:%M"),
        end.format("%Y-%m-%d %H:%M")
    )
}

/// Pad or truncate `s` to exactly `width` characters, left-aligned.
pub fn fit_left(s: &str, width: usize) -> String {
    let count = s.chars().count();
    if count > width {
        let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    } else {
        format!("{}{}", s, " ".repeat(width - count))
    }
}

/// Right-align `s` in a field of `width` characters. Longer strings are
/// returned unchanged.
pub fn fit_right(s: &str, width: usize) -> String {
    let count = s.chars().count();
    if count >= width {
        s.to_string()
    } else {
        format!("{}{}", " ".repeat(width - count), s)
    }
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Insert commas every three digits from the right of an integer string.
fn group_thousands(s: &str) -> String {
    if s.len() <= 3 {
        return s.to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    let remainder = chars.len() % 3;
    for (i, &c) in chars.iter().enumerate() {
        if i != 0 && (i % 3 == remainder) {
            result.push(',');
        }
        result.push(c);
    }
    result
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    // ── format_number ────────────────────────────────────────────────────────

    #[test]
    fn test_format_number_zero() {
        assert_eq!(format_number(0.0, 0), "0");
        assert_eq!(format_number(0.0, 2), "0.00");
    }

    #[test]
    fn test_format_number_with_thousands() {
        assert_eq!(format_number(1_234.5, 1), "1,234.5");
        assert_eq!(format_number(1_000.0, 0), "1,000");
    }

    #[test]
    fn test_format_number_negative() {
        assert_eq!(format_number(-9_876.5, 1), "-9,876.5");
    }

    #[test]
    fn test_format_number_rounds_up() {
        assert_eq!(format_number(1.005, 2), "1.01");
    }

    // ── format_currency ──────────────────────────────────────────────────────

    #[test]
    fn test_format_currency_cents() {
        assert_eq!(format_currency(1_234.56, 2), "$1,234.56");
        assert_eq!(format_currency(0.0, 2), "$0.00");
    }

    #[test]
    fn test_format_currency_sub_cent() {
        assert_eq!(format_currency(0.06, 4), "$0.0600");
        assert_eq!(format_currency(0.000002, 6), "$0.000002");
    }

    #[test]
    fn test_format_currency_negative() {
        assert_eq!(format_currency(-9.99, 2), "$-9.99");
    }

    // ── format_tokens ────────────────────────────────────────────────────────

    #[test]
    fn test_format_tokens() {
        assert_eq!(format_tokens(0), "0");
        assert_eq!(format_tokens(999), "999");
        assert_eq!(format_tokens(1_234), "1,234");
        assert_eq!(format_tokens(12_345_678), "12,345,678");
    }

    // ── format_period ────────────────────────────────────────────────────────

    #[test]
    fn test_format_period() {
        let start = Utc.with_ymd_and_hms(2023, 11, 1, 8, 5, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2023, 11, 30, 23, 59, 59).unwrap();
        assert_eq!(
            format_period(start, end),
            "2023-11-01 08:05 → 2023-11-30 23:59"
        );
    }

    // ── column helpers ───────────────────────────────────────────────────────

    #[test]
    fn test_fit_left_pads_and_truncates() {
        assert_eq!(fit_left("abc", 5), "abc  ");
        assert_eq!(fit_left("abcdef", 4), "abc…");
        assert_eq!(fit_left("abcd", 4), "abcd");
    }

    #[test]
    fn test_fit_right() {
        assert_eq!(fit_right("42", 5), "   42");
        assert_eq!(fit_right("123456", 3), "123456");
    }
}
