#[cfg(test)]
mod proptests {
    use crate::logic::generate_slots;
    use chrono::{Duration, NaiveTime};
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn minute_of_day() -> impl Strategy<Value = u32> {
        0u32..(24 * 60)
    }

    fn time_from_minutes(minutes: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0).unwrap()
    }

    proptest! {
        #[test]
        fn slots_are_ascending_within_window_and_disjoint_from_taken(
            start in minute_of_day(),
            end in minute_of_day(),
            granularity in 5i64..180,
            taken_minutes in proptest::collection::hash_set(0u32..(24 * 60), 0..16),
        ) {
            let window_start = time_from_minutes(start);
            let window_end = time_from_minutes(end);
            let granularity = Duration::minutes(granularity);
            let taken: HashSet<NaiveTime> =
                taken_minutes.into_iter().map(time_from_minutes).collect();

            let slots = generate_slots(window_start, window_end, granularity, &taken);

            // Ascending, no duplicates
            for pair in slots.windows(2) {
                prop_assert!(pair[0] < pair[1]);
            }
            for slot in &slots {
                // Every emitted slot fits entirely inside the window
                prop_assert!(*slot >= window_start);
                let (slot_end, wrapped) = slot.overflowing_add_signed(granularity);
                prop_assert_eq!(wrapped, 0);
                prop_assert!(slot_end <= window_end);
                // Never a taken start time
                prop_assert!(!taken.contains(slot));
                // Always on the granularity grid relative to the window start
                let offset = *slot - window_start;
                prop_assert_eq!(
                    offset.num_minutes() % granularity.num_minutes(),
                    0
                );
            }
        }

        #[test]
        fn generator_is_pure(
            start in minute_of_day(),
            end in minute_of_day(),
            granularity in 5i64..180,
        ) {
            let window_start = time_from_minutes(start);
            let window_end = time_from_minutes(end);
            let granularity = Duration::minutes(granularity);
            let taken = HashSet::new();

            let first = generate_slots(window_start, window_end, granularity, &taken);
            let second = generate_slots(window_start, window_end, granularity, &taken);
            prop_assert_eq!(first, second);
        }
    }
}
