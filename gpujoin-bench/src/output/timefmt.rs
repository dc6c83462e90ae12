/// Render seconds as `[H hrs ][M min ]S.SSSS sec`.
///
/// Sub-0.1ms values are printed in scientific notation with one significant
/// digit (`5e-05 sec`).
pub fn human_duration(secs: f64) -> String {
    let mut out = String::new();

    let t = secs / 3600.0;
    let hrs = t.trunc();
    if hrs != 0.0 {
        out.push_str(&format!("{} hrs ", hrs as i64));
    }

    let t = (t - hrs) * 60.0;
    let mins = t.trunc();
    if mins != 0.0 {
        out.push_str(&format!("{} min ", mins as i64));
    }

    let s = (t - mins) * 60.0;
    if (s * 10_000.0).trunc() != 0.0 {
        out.push_str(&format!("{:.4} sec", s));
    } else {
        out.push_str(&format!("{} sec", scientific(s)));
    }
    out
}

/// `{:.0e}` with a signed, two-digit exponent (`5e-05`, `0e+00`).
fn scientific(v: f64) -> String {
    let raw = format!("{:.0e}", v);
    match raw.split_once('e') {
        Some((mantissa, exp)) => match exp.parse::<i32>() {
            Ok(e) => {
                let sign = if e < 0 { '-' } else { '+' };
                format!("{}e{}{:02}", mantissa, sign, e.abs())
            }
            Err(_) => raw,
        },
        None => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_only() {
        assert_eq!(human_duration(1.5), "1.5000 sec");
        assert_eq!(human_duration(0.0123), "0.0123 sec");
    }

    #[test]
    fn test_hours_and_minutes() {
        assert_eq!(human_duration(3723.0), "1 hrs 2 min 3.0000 sec");
        assert_eq!(human_duration(61.25), "1 min 1.2500 sec");
    }

    #[test]
    fn test_tiny_values_are_scientific() {
        assert_eq!(human_duration(0.00005), "5e-05 sec");
        assert_eq!(human_duration(0.0), "0e+00 sec");
    }
}
