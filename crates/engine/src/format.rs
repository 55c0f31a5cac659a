// Number rendering shared by display, chart labels and summary statistics

/// Render a number the way a browser's `String(n)` does: integral values have
/// no fractional part, negative zero prints as `0`, and magnitudes outside
/// `[1e-6, 1e21)` use exponent form (`1e+21`, `1.5e-7`).
pub fn format_number(n: f64) -> String {
    if n == 0.0 {
        return "0".to_string();
    }
    let magnitude = n.abs();
    if n.is_finite() && (magnitude >= 1e21 || magnitude < 1e-6) {
        let sci = format!("{:e}", n);
        return match sci.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
            _ => sci,
        };
    }
    format!("{}", n)
}

/// Largest magnitude at which every integer is exactly representable in an f64
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// JSON number with JavaScript's shape: integral values serialize without a
/// fractional part. Non-finite values become null.
pub fn json_number(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        return serde_json::Value::from(n as i64);
    }
    serde_json::Number::from_f64(n)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

/// Render an aggregate for display: `N/A` for null, otherwise at most two
/// fractional digits with thousands grouping (`1234.5678` -> `1,234.57`).
/// Only the presentation is rounded; callers keep the exact value.
pub fn format_aggregate(value: Option<f64>) -> String {
    let Some(n) = value else {
        return "N/A".to_string();
    };

    let fixed = format!("{:.2}", n.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let frac_part = frac_part.trim_end_matches('0');

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let is_zero = int_part.chars().all(|c| c == '0') && frac_part.is_empty();
    let sign = if n < 0.0 && !is_zero { "-" } else { "" };

    if frac_part.is_empty() {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped}.{frac_part}")
    }
}
