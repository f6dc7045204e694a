//! Order number format: `{prefix}/{YYYYMMDD}/{sequence:04}`.

use chrono::NaiveDate;

/// Key under which the per-prefix, per-day sequence is allocated.
pub fn sequence_key(prefix: &str, date: NaiveDate) -> String {
    format!("warehouse_order:{prefix}:{}", date.format("%Y%m%d"))
}

pub fn format_order_number(prefix: &str, date: NaiveDate, sequence: u64) -> String {
    format!("{prefix}/{}/{sequence:04}", date.format("%Y%m%d"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_sequence_to_four_digits() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        assert_eq!(format_order_number("WO", date, 7), "WO/20261019/0007");
        assert_eq!(format_order_number("WO", date, 12345), "WO/20261019/12345");
    }

    #[test]
    fn sequence_key_is_per_prefix_and_day() {
        let d1 = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2026, 10, 20).unwrap();
        assert_ne!(sequence_key("WO", d1), sequence_key("WO", d2));
        assert_ne!(sequence_key("WO", d1), sequence_key("RQ", d1));
    }
}
