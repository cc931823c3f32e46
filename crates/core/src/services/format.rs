//! Display formatting for money, prices and percentages.
//!
//! Money is shown in whole New Taiwan dollars, prices with two decimals and
//! percentages (given in percent units, `2.5` = 2.5 %) with two decimals.
//! All three group thousands with commas.

const CURRENCY_PREFIX: &str = "NT$";

/// Group the integer digits of an already formatted, unsigned decimal.
fn group_thousands(unsigned: &str) -> String {
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(f) => format!("{grouped}.{f}"),
        None => grouped,
    }
}

/// Fixed-decimal formatting with grouping and a leading minus. A value that
/// rounds to zero never shows as `-0`.
fn format_fixed(value: f64, decimals: usize) -> (bool, String) {
    if !value.is_finite() {
        return (false, "0".to_string());
    }
    let text = format!("{:.*}", decimals, value.abs());
    let is_zero = text.chars().all(|c| c == '0' || c == '.');
    (value < 0.0 && !is_zero, group_thousands(&text))
}

/// `NT$1,235`, `-NT$40`.
#[must_use]
pub fn format_currency(value: f64) -> String {
    let (negative, digits) = format_fixed(value, 0);
    if negative {
        format!("-{CURRENCY_PREFIX}{digits}")
    } else {
        format!("{CURRENCY_PREFIX}{digits}")
    }
}

/// Currency with an explicit `+` on gains, used for diffs.
#[must_use]
pub fn format_signed_currency(value: f64) -> String {
    let text = format_currency(value);
    if value > 0.0 && text != format_currency(0.0) {
        format!("+{text}")
    } else {
        text
    }
}

/// `1,234.50`.
#[must_use]
pub fn format_number(value: f64) -> String {
    let (negative, digits) = format_fixed(value, 2);
    if negative {
        format!("-{digits}")
    } else {
        digits
    }
}

/// Share counts: up to three decimals, trailing zeros dropped.
#[must_use]
pub fn format_shares(value: f64) -> String {
    let (negative, digits) = format_fixed(value, 3);
    let trimmed = if digits.contains('.') {
        digits.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        digits
    };
    if negative {
        format!("-{trimmed}")
    } else {
        trimmed
    }
}

/// `2.50%` from `2.5`.
#[must_use]
pub fn format_percent(percent_units: f64) -> String {
    format!("{}%", format_number(percent_units))
}

/// `0.025` → `2.50%`, for ratios computed locally.
#[must_use]
pub fn format_ratio(ratio: f64) -> String {
    format_percent(ratio * 100.0)
}

/// Escape markup so backend-supplied text can be shown as rich content
/// without executing anything. Markdown syntax passes through untouched.
#[must_use]
pub fn sanitize_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
