const UNITS: [&str; 9] = ["B", "kB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

/// Formats a byte count with decimal SI units and three significant digits.
///
/// `0 B`, `999 B`, `1 kB`, `70.5 kB`, `1.23 MB`.
pub fn format_size(bytes: u64) -> String {
    if bytes < 1000 {
        return format!("{bytes} B");
    }

    let mut value = bytes as f64;
    let mut exponent = 0;
    while value >= 1000.0 && exponent < UNITS.len() - 1 {
        value /= 1000.0;
        exponent += 1;
    }

    // Three significant digits: value is in [1, 1000).
    let decimals = 2usize.saturating_sub(value.log10().floor() as usize);
    let mut text = format!("{value:.decimals$}");
    if text.contains('.') {
        text = text.trim_end_matches('0').trim_end_matches('.').to_string();
    }
    format!("{text} {}", UNITS[exponent])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_below_one_kilobyte() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1), "1 B");
        assert_eq!(format_size(999), "999 B");
    }

    #[test]
    fn kilobytes() {
        assert_eq!(format_size(1000), "1 kB");
        assert_eq!(format_size(1500), "1.5 kB");
        assert_eq!(format_size(70_500), "70.5 kB");
        assert_eq!(format_size(123_456), "123 kB");
    }

    #[test]
    fn larger_units() {
        assert_eq!(format_size(1_234_567), "1.23 MB");
        assert_eq!(format_size(5_000_000_000), "5 GB");
    }

    #[test]
    fn no_trailing_zeros_on_integers() {
        assert_eq!(format_size(10_000), "10 kB");
        assert_eq!(format_size(100_000), "100 kB");
    }
}
