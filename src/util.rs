/// Compact human-readable rendering of an arbitrary positive magnitude.
/// Large values collapse to k/M/B/T suffixes; tiny ones keep significant
/// digits instead of rounding to zero.
pub fn format_magnitude(value: f64) -> String {
    const SUFFIXES: [(f64, &str); 4] = [
        (1e12, "T"),
        (1e9, "B"),
        (1e6, "M"),
        (1e3, "k"),
    ];

    if !value.is_finite() {
        return value.to_string();
    }

    let magnitude = value.abs();
    for (threshold, suffix) in SUFFIXES {
        if magnitude >= threshold {
            return format!("{:.2}{}", value / threshold, suffix);
        }
    }

    if magnitude >= 100.0 {
        format!("{value:.0}")
    } else if magnitude >= 1.0 {
        format!("{value:.2}")
    } else {
        format!("{value:.4}")
    }
}

pub fn format_magnitude_with_units(value: f64, units: Option<&str>) -> String {
    match units {
        Some(units) => format!("{} {units}", format_magnitude(value)),
        None => format_magnitude(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_suffix_by_scale() {
        assert_eq!(format_magnitude(1_500.0), "1.50k");
        assert_eq!(format_magnitude(139_820.0), "139.82k");
        assert_eq!(format_magnitude(2_500_000.0), "2.50M");
        assert_eq!(format_magnitude(7.2e9), "7.20B");
        assert_eq!(format_magnitude(1.4e13), "14.00T");
    }

    #[test]
    fn small_values_keep_precision() {
        assert_eq!(format_magnitude(250.0), "250");
        assert_eq!(format_magnitude(2.5), "2.50");
        assert_eq!(format_magnitude(0.0314), "0.0314");
    }

    #[test]
    fn units_are_appended() {
        assert_eq!(
            format_magnitude_with_units(12_742.0, Some("km")),
            "12.74k km"
        );
        assert_eq!(format_magnitude_with_units(42.0, None), "42.00");
    }
}
