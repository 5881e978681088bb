//! Human-readable byte formatting (§8): binary (1024-based) units with
//! three significant digits, used by `/api/info/datastats` to summarize
//! approximate storage footprint.

const UNITS: [&str; 9] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB", "ZiB", "YiB"];

pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes}B");
    }
    let mut value = bytes as f64;
    let mut unit_idx = 0;
    while value >= 1024.0 && unit_idx < UNITS.len() - 1 {
        value /= 1024.0;
        unit_idx += 1;
    }
    let decimals = if value >= 100.0 {
        0
    } else if value >= 10.0 {
        1
    } else {
        2
    };
    format!("{:.*}{}", decimals, value, UNITS[unit_idx])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_kibibyte_has_no_decimal() {
        assert_eq!(format_bytes(1023), "1023B");
    }

    #[test]
    fn exact_kibibyte_uses_two_decimals() {
        assert_eq!(format_bytes(1024), "1.00KiB");
    }

    #[test]
    fn hundred_kibibytes_drops_decimals() {
        assert_eq!(format_bytes(102_400), "100KiB");
    }

    #[test]
    fn ten_kibibytes_uses_one_decimal() {
        assert_eq!(format_bytes(10_240), "10.0KiB");
    }
}
