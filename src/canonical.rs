//! Canonical forms and exact decimal arithmetic.
//!
//! `enum` and `uniqueItems` compare values through [`canonical_form`], so
//! `{"a":1,"b":2}` equals `{"b":2,"a":1.0}`. `multipleOf` goes through
//! [`is_multiple_of`], which works on the shortest decimal text of both
//! numbers instead of binary floats.
use std::fmt::Write;

use serde_json::{Number, Value};

/// Serialized representation with sorted object keys and integral numbers
/// printed without a fractional part.
pub fn canonical_form(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

/// Structural equality through canonical forms.
pub fn canonical_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => number_text(x) == number_text(y),
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => {
            canonical_form(a) == canonical_form(b)
        }
        _ => false,
    }
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => {
            let _ = write!(out, "{value}");
        }
        Value::Number(n) => out.push_str(&number_text(n)),
        Value::Array(xs) => {
            out.push('[');
            for (i, x) in xs.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(x, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys = map.keys().collect::<Vec<_>>();
            keys.sort();
            out.push('{');
            for (i, k) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                let _ = write!(out, "{}:", Value::from(k.as_str()));
                write_canonical(&map[k], out);
            }
            out.push('}');
        }
    }
}

fn number_text(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 9.007_199_254_740_992e15 => format!("{}", f as i64),
        _ => n.to_string(),
    }
}

// ————————————————————————————————————————————————————————————————————————————
// DECIMALS
// ————————————————————————————————————————————————————————————————————————————

/// `digits × 10^-scale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Decimal {
    digits: i128,
    scale: u32,
}

impl Decimal {
    fn parse(text: &str) -> Option<Decimal> {
        let (mantissa, exp) = match text.find(['e', 'E']) {
            Some(at) => (&text[..at], text[at + 1..].parse::<i32>().ok()?),
            None => (text, 0),
        };
        let (negative, mantissa) = match mantissa.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, mantissa),
        };
        let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        let frac_part = frac_part.trim_end_matches('0');
        let all_digits = format!("{int_part}{frac_part}");
        if all_digits.is_empty() || !all_digits.bytes().all(|b| b.is_ascii_digit()) || all_digits.len() > 36 {
            return None;
        }
        let mut digits = all_digits.parse::<i128>().ok()?;
        if negative {
            digits = -digits;
        }
        let scale = frac_part.len() as i32 - exp;
        if scale >= 0 {
            Some(Decimal { digits, scale: scale as u32 })
        } else {
            let factor = 10i128.checked_pow((-scale) as u32)?;
            Some(Decimal { digits: digits.checked_mul(factor)?, scale: 0 })
        }
    }

    fn rescale(self, scale: u32) -> Option<i128> {
        let factor = 10i128.checked_pow(scale.checked_sub(self.scale)?)?;
        self.digits.checked_mul(factor)
    }
}

/// `value` is an integer multiple of `divisor`.
///
/// Both numbers are scaled by 10^d, where d is the larger decimal-place
/// count, and compared with integer modulus. Values beyond `i128` range fall
/// back to a tolerance check on the float quotient. A non-positive divisor
/// imposes no constraint.
pub fn is_multiple_of(value: &Number, divisor: &Number) -> bool {
    let Some(div_f) = divisor.as_f64() else { return true };
    if div_f <= 0.0 {
        return true;
    }
    let exact = Decimal::parse(&value.to_string()).zip(Decimal::parse(&divisor.to_string())).and_then(|(v, d)| {
        let scale = v.scale.max(d.scale);
        Some((v.rescale(scale)?, d.rescale(scale)?))
    });
    match exact {
        Some((_, 0)) => true,
        Some((v, d)) => v % d == 0,
        None => {
            let Some(v) = value.as_f64() else { return false };
            let q = v / div_f;
            q.is_finite() && (q - q.round()).abs() <= 1e-9 * q.abs().max(1.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn num(v: Value) -> Number {
        match v {
            Value::Number(n) => n,
            _ => unreachable!(),
        }
    }

    #[test]
    fn canonical_sorts_keys_and_normalizes_numbers() {
        let a = json!({"b": [1, {"y": 2.0, "x": null}], "a": "s"});
        let b = json!({"a": "s", "b": [1.0, {"x": null, "y": 2}]});
        assert_eq!(canonical_form(&a), canonical_form(&b));
        assert_eq!(canonical_form(&a), r#"{"a":"s","b":[1,{"x":null,"y":2}]}"#);
        assert!(canonical_eq(&json!(1), &json!(1.0)));
        assert!(!canonical_eq(&json!(1), &json!("1")));
        assert!(!canonical_eq(&json!([1, 2]), &json!([2, 1])));
    }

    #[test]
    fn multiple_of_decimal_divisor() {
        assert!(is_multiple_of(&num(json!(0.07)), &num(json!(0.01))));
        assert!(!is_multiple_of(&num(json!(0.075)), &num(json!(0.01))));
        assert!(is_multiple_of(&num(json!(19.99)), &num(json!(0.01))));
        assert!(is_multiple_of(&num(json!(1.2)), &num(json!(0.3))));
    }

    #[test]
    fn multiple_of_integers() {
        assert!(is_multiple_of(&num(json!(10)), &num(json!(5))));
        assert!(!is_multiple_of(&num(json!(7)), &num(json!(2))));
        assert!(is_multiple_of(&num(json!(-9)), &num(json!(3))));
        assert!(is_multiple_of(&num(json!(4.0)), &num(json!(2))));
        assert!(!is_multiple_of(&num(json!(4.5)), &num(json!(2))));
    }

    #[test]
    fn multiple_of_exponent_forms() {
        assert!(is_multiple_of(&num(json!(3e-7)), &num(json!(1e-7))));
        assert!(is_multiple_of(&num(json!(1e21)), &num(json!(1000))));
    }

    #[test]
    fn decimal_parse() {
        assert_eq!(Decimal::parse("-0.070"), Some(Decimal { digits: -7, scale: 2 }));
        assert_eq!(Decimal::parse("1.5e3"), Some(Decimal { digits: 1500, scale: 0 }));
        assert_eq!(Decimal::parse("12e-2"), Some(Decimal { digits: 12, scale: 2 }));
    }
}
