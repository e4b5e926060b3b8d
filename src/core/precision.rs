//! Significant-digit formatting with JavaScript `toPrecision` rules.
//!
//! Fragments are shared with a browser front end, so amounts must print the
//! same way on both sides: exponential notation when the decimal exponent is
//! below -6 or at least the precision, ties rounded away from zero, and the
//! non-finite values spelled `NaN`, `Infinity`, `-Infinity`.

/// Significant digits used for every displayed amount.
pub const DISPLAY_PRECISION: usize = 4;

/// Enough digits to print any f64 exactly.
const EXACT_DIGITS: usize = 767;

/// Format `value` with `precision` significant digits (clamped to 1..=100).
pub fn to_precision(value: f64, precision: usize) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        let s = if value > 0.0 { "Infinity" } else { "-Infinity" };
        return s.to_string();
    }

    let precision = precision.clamp(1, 100);
    let negative = value < 0.0;
    let magnitude = value.abs();

    let (digits, exponent) = if magnitude == 0.0 {
        (vec![0u8; precision], 0)
    } else {
        round_significant(magnitude, precision)
    };

    let body = layout(&digits, exponent, precision);
    if negative {
        format!("-{}", body)
    } else {
        body
    }
}

/// Shorthand for `to_precision(value, DISPLAY_PRECISION)`.
pub fn display_amount(value: f64) -> String {
    to_precision(value, DISPLAY_PRECISION)
}

/// Round a positive finite value to `precision` decimal digits.
/// Returns the digits and the decimal exponent of the first one.
fn round_significant(magnitude: f64, precision: usize) -> (Vec<u8>, i32) {
    let exact = format!("{:.*e}", EXACT_DIGITS - 1, magnitude);
    let (mantissa, exp) = exact.split_once('e').unwrap_or((exact.as_str(), "0"));
    let mut exponent: i32 = exp.parse().unwrap_or(0);

    let all: Vec<u8> = mantissa
        .bytes()
        .filter(u8::is_ascii_digit)
        .map(|b| b - b'0')
        .collect();
    let mut kept: Vec<u8> = all.iter().copied().take(precision).collect();
    kept.resize(precision, 0);

    let round_up = all.get(precision).is_some_and(|&d| d >= 5);
    if round_up {
        let mut i = precision;
        loop {
            if i == 0 {
                // 9.99.. carried into a new leading digit
                kept.insert(0, 1);
                kept.pop();
                exponent += 1;
                break;
            }
            i -= 1;
            if kept[i] == 9 {
                kept[i] = 0;
            } else {
                kept[i] += 1;
                break;
            }
        }
    }

    (kept, exponent)
}

fn layout(digits: &[u8], exponent: i32, precision: usize) -> String {
    let text: String = digits.iter().map(|d| char::from(b'0' + d)).collect();

    if exponent < -6 || exponent >= precision as i32 {
        let mut out = text[..1].to_string();
        if precision > 1 {
            out.push('.');
            out.push_str(&text[1..]);
        }
        let sign = if exponent < 0 { '-' } else { '+' };
        return format!("{}e{}{}", out, sign, exponent.unsigned_abs());
    }

    if exponent >= 0 {
        let int_len = exponent as usize + 1;
        if int_len == precision {
            return text;
        }
        return format!("{}.{}", &text[..int_len], &text[int_len..]);
    }

    let zeros = "0".repeat((-exponent - 1) as usize);
    format!("0.{}{}", zeros, text)
}
