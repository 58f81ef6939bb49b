//! Generation option parsing.
//!
//! Each numeric field is parsed on its own: a malformed value falls back to
//! that field's default and never fails the whole request.  Parsing is
//! lenient the way form inputs usually are: surrounding whitespace is ignored
//! and a leading number is accepted even with trailing junk ("30 steps" -> 30).

use imagegen_proto::protocol::{
    GenerationOptions, DEFAULT_GUIDANCE_SCALE, DEFAULT_HEIGHT, DEFAULT_SEED, DEFAULT_STEPS,
    DEFAULT_WIDTH,
};

/// Current values of the option inputs, as typed.
/// `None` means the field is absent from the form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawOptions {
    pub steps: Option<String>,
    pub guidance_scale: Option<String>,
    pub width: Option<String>,
    pub height: Option<String>,
    pub seed: Option<String>,
    pub optimize_speed: bool,
    pub optimize_memory: bool,
}

impl RawOptions {
    pub fn parse(&self) -> GenerationOptions {
        GenerationOptions {
            steps: positive_u32(self.steps.as_deref()).unwrap_or(DEFAULT_STEPS),
            guidance_scale: positive_f64(self.guidance_scale.as_deref())
                .unwrap_or(DEFAULT_GUIDANCE_SCALE),
            width: positive_u32(self.width.as_deref()).unwrap_or(DEFAULT_WIDTH),
            height: positive_u32(self.height.as_deref()).unwrap_or(DEFAULT_HEIGHT),
            seed: leading_int(self.seed.as_deref())
                .and_then(|v| u64::try_from(v).ok())
                .unwrap_or(DEFAULT_SEED),
            optimize_speed: self.optimize_speed,
            optimize_memory: self.optimize_memory,
        }
    }
}

fn positive_u32(raw: Option<&str>) -> Option<u32> {
    leading_int(raw)
        .filter(|v| *v > 0)
        .and_then(|v| u32::try_from(v).ok())
}

fn positive_f64(raw: Option<&str>) -> Option<f64> {
    leading_float(raw).filter(|v| v.is_finite() && *v > 0.0)
}

/// Longest leading integer, e.g. `" 42px"` -> 42, `"abc"` -> None.
fn leading_int(raw: Option<&str>) -> Option<i64> {
    let s = raw?.trim();
    let sign_len = usize::from(s.starts_with(['+', '-']));
    let digits = s[sign_len..]
        .bytes()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if digits == 0 {
        return None;
    }
    s[..sign_len + digits].parse().ok()
}

/// Longest leading decimal, e.g. `"7.5x"` -> 7.5, `".5"` -> 0.5, `"1e1"` -> 10.
/// An exponent only counts when it has digits: `"2e"` -> 2.
fn leading_float(raw: Option<&str>) -> Option<f64> {
    let s = raw?.trim();
    let sign_len = usize::from(s.starts_with(['+', '-']));
    let mut seen_dot = false;
    let mut seen_digit = false;
    let mut end = sign_len;
    for b in s[sign_len..].bytes() {
        match b {
            b'0'..=b'9' => seen_digit = true,
            b'.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end += 1;
    }
    if !seen_digit {
        return None;
    }
    let rest = &s.as_bytes()[end..];
    if matches!(rest.first(), Some(b'e' | b'E')) {
        let exp_sign = usize::from(matches!(rest.get(1), Some(b'+' | b'-')));
        let exp_digits = rest[1 + exp_sign..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if exp_digits > 0 {
            end += 1 + exp_sign + exp_digits;
        }
    }
    s[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(steps: &str, guidance: &str, width: &str, height: &str, seed: &str) -> RawOptions {
        RawOptions {
            steps: Some(steps.into()),
            guidance_scale: Some(guidance.into()),
            width: Some(width.into()),
            height: Some(height.into()),
            seed: Some(seed.into()),
            optimize_speed: true,
            optimize_memory: false,
        }
    }

    #[test]
    fn test_absent_fields_use_defaults() {
        let opts = RawOptions::default().parse();
        assert_eq!(opts, GenerationOptions::default());
    }

    #[test]
    fn test_bad_steps_only_defaults_steps() {
        let opts = raw("lots", "5.5", "768", "512", "42").parse();
        assert_eq!(opts.steps, 20);
        assert_eq!(opts.guidance_scale, 5.5);
        assert_eq!(opts.width, 768);
        assert_eq!(opts.height, 512);
        assert_eq!(opts.seed, 42);
        assert!(opts.optimize_speed);
        assert!(!opts.optimize_memory);
    }

    #[test]
    fn test_leading_number_is_coerced() {
        let opts = raw(" 30 steps", "8.25x", "640px", "480", "7abc").parse();
        assert_eq!(opts.steps, 30);
        assert_eq!(opts.guidance_scale, 8.25);
        assert_eq!(opts.width, 640);
        assert_eq!(opts.height, 480);
        assert_eq!(opts.seed, 7);
    }

    #[test]
    fn test_guidance_accepts_exponent() {
        assert_eq!(leading_float(Some("1e1")), Some(10.0));
        assert_eq!(leading_float(Some("2.5E-1x")), Some(0.25));
        assert_eq!(leading_float(Some("3e+2")), Some(300.0));
        assert_eq!(leading_float(Some("2e")), Some(2.0));
        assert_eq!(leading_float(Some("4e-")), Some(4.0));
        assert_eq!(leading_float(Some("5.")), Some(5.0));
        let opts = raw("20", "1e1", "1024", "1024", "0").parse();
        assert_eq!(opts.guidance_scale, 10.0);
    }

    #[test]
    fn test_out_of_range_values_fall_back() {
        let opts = raw("0", "-1", "-512", "99999999999", "-3").parse();
        assert_eq!(opts.steps, 20);
        assert_eq!(opts.guidance_scale, 7.5);
        assert_eq!(opts.width, 1024);
        assert_eq!(opts.height, 1024);
        assert_eq!(opts.seed, 0);
    }

    #[test]
    fn test_float_forms() {
        assert_eq!(leading_float(Some(".5")), Some(0.5));
        assert_eq!(leading_float(Some("3.")), Some(3.0));
        assert_eq!(leading_float(Some("1.2.3")), Some(1.2));
        assert_eq!(leading_float(Some(".")), None);
        assert_eq!(leading_float(Some("")), None);
    }

    #[test]
    fn test_int_forms() {
        assert_eq!(leading_int(Some("+12")), Some(12));
        assert_eq!(leading_int(Some("-")), None);
        assert_eq!(leading_int(Some("  ")), None);
        assert_eq!(leading_int(None), None);
    }
}
