#[cfg(test)]
mod tests {
    use crate::logic::{format_slot, generate_slots};
    use chrono::{Duration, NaiveTime};
    use std::collections::HashSet;

    fn t(raw: &str) -> NaiveTime {
        NaiveTime::parse_from_str(raw, "%H:%M").expect("valid test time")
    }

    fn slots(start: &str, end: &str, taken: &[&str]) -> Vec<String> {
        let taken: HashSet<NaiveTime> = taken.iter().map(|s| t(s)).collect();
        generate_slots(t(start), t(end), Duration::minutes(30), &taken)
            .into_iter()
            .map(format_slot)
            .collect()
    }

    #[test]
    fn test_generate_slots_empty_taken_set() {
        assert_eq!(slots("09:00", "10:00", &[]), vec!["09:00", "09:30"]);
    }

    #[test]
    fn test_generate_slots_excludes_taken() {
        assert_eq!(slots("09:00", "10:00", &["09:30"]), vec!["09:00"]);
    }

    #[test]
    fn test_generate_slots_drops_trailing_partial_slot() {
        // 09:00-09:20 cannot fit a 30-minute slot at all.
        assert!(slots("09:00", "09:20", &[]).is_empty());
        // 09:00-10:15 fits two full slots; the 15-minute remainder is dropped.
        assert_eq!(slots("09:00", "10:15", &[]), vec!["09:00", "09:30"]);
    }

    #[test]
    fn test_generate_slots_ascending_over_full_day() {
        let generated = slots("09:00", "17:00", &[]);
        assert_eq!(generated.len(), 16);
        assert_eq!(generated.first().map(String::as_str), Some("09:00"));
        assert_eq!(generated.last().map(String::as_str), Some("16:30"));
        let mut sorted = generated.clone();
        sorted.sort();
        assert_eq!(generated, sorted);
    }

    #[test]
    fn test_generate_slots_inverted_window_is_empty() {
        assert!(slots("17:00", "09:00", &[]).is_empty());
        assert!(slots("09:00", "09:00", &[]).is_empty());
    }

    #[test]
    fn test_generate_slots_taken_not_on_grid_is_ignored() {
        // A taken time between grid points doesn't remove any grid slot.
        assert_eq!(
            slots("09:00", "10:00", &["09:15"]),
            vec!["09:00", "09:30"]
        );
    }

    #[test]
    fn test_generate_slots_window_ending_at_midnight() {
        // 23:00-23:59 fits a single 30-minute slot; the second would wrap
        // past midnight and is dropped.
        assert_eq!(slots("23:00", "23:59", &[]), vec!["23:00"]);
    }

    #[test]
    fn test_generate_slots_zero_granularity_is_empty() {
        let taken = HashSet::new();
        assert!(generate_slots(t("09:00"), t("17:00"), Duration::minutes(0), &taken).is_empty());
    }

    #[test]
    fn test_generate_slots_all_taken() {
        assert!(slots("09:00", "10:00", &["09:00", "09:30"]).is_empty());
    }
}
