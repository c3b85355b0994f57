pub fn format_count(value: f64) -> String {
    if !value.is_finite() {
        return "n/a".to_owned();
    }

    let rounded = value.round();
    let digits = format!("{}", rounded.abs() as u64);
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0.0 {
        grouped.push('-');
    }

    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    grouped
}

pub fn format_compact(value: f64) -> String {
    const UNITS: [&str; 4] = ["", "K", "M", "B"];

    let mut scaled = value;
    let mut unit = 0usize;
    while scaled.abs() >= 1000.0 && unit < UNITS.len() - 1 {
        scaled /= 1000.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{scaled:.0}")
    } else {
        format!("{scaled:.1}{}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_thousands() {
        assert_eq!(format_count(0.0), "0");
        assert_eq!(format_count(999.0), "999");
        assert_eq!(format_count(1000.0), "1,000");
        assert_eq!(format_count(39_536_653.0), "39,536,653");
        assert_eq!(format_count(-12_345.4), "-12,345");
        assert_eq!(format_count(f64::NAN), "n/a");
    }

    #[test]
    fn compact_units() {
        assert_eq!(format_compact(950.0), "950");
        assert_eq!(format_compact(71_805.0), "71.8K");
        assert_eq!(format_compact(39_536_653.0), "39.5M");
    }
}
