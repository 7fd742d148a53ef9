//! Property-based tests for the interval index and run accumulation.
//!
//! - Forward scans are ordered by start, reverse scans by descending end
//! - Priority filter and intersection rule hold for every returned interval
//! - Accumulated runs are contiguous and stop as soon as the target is reached

use std::collections::HashSet;

use proptest::prelude::*;

use spanstore::engine::{accumulate_run, Direction, GapFill, IntervalIndex};
use spanstore::model::{Interval, Ms, Span};

const BASE: Ms = 1_767_225_600_000;

fn arb_intervals() -> impl Strategy<Value = Vec<Interval>> {
    prop::collection::vec((0i64..1_000, 1i64..200, 0u8..5), 0..40).prop_map(|raw| {
        raw.into_iter()
            .enumerate()
            .map(|(n, (offset, len, prio))| {
                let start = BASE + offset;
                Interval::new(
                    n as u64 + 1,
                    Span::new(start, start + len),
                    prio as f64,
                    vec![prio],
                )
            })
            .collect()
    })
}

fn arb_window() -> impl Strategy<Value = Span> {
    (0i64..1_200, 0i64..600).prop_map(|(offset, len)| Span::new(BASE + offset, BASE + offset + len))
}

fn build(intervals: &[Interval]) -> IntervalIndex {
    let mut index = IntervalIndex::new();
    for interval in intervals {
        index.insert(interval.clone()).unwrap();
    }
    index
}

fn direction() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::Forward), Just(Direction::Reverse)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn forward_scan_is_ordered_filtered_and_complete(
        intervals in arb_intervals(),
        window in arb_window(),
        max_priority in 0u8..5,
    ) {
        let index = build(&intervals);
        let max_priority = max_priority as f64;
        let found: Vec<_> = index.scan_fwd(window, max_priority).collect();

        for pair in found.windows(2) {
            prop_assert!((pair[0].span.start, pair[0].id) < (pair[1].span.start, pair[1].id));
        }
        for interval in &found {
            prop_assert!(interval.priority <= max_priority);
            prop_assert!(interval.span.start < window.end && interval.span.end > window.start);
        }

        let expected: HashSet<u64> = intervals
            .iter()
            .filter(|i| i.priority <= max_priority)
            .filter(|i| i.span.start < window.end && i.span.end > window.start)
            .map(|i| i.id)
            .collect();
        let got: HashSet<u64> = found.iter().map(|i| i.id).collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn reverse_scan_mirrors_forward(
        intervals in arb_intervals(),
        window in arb_window(),
        max_priority in 0u8..5,
    ) {
        let index = build(&intervals);
        let max_priority = max_priority as f64;
        let rev: Vec<_> = index.scan_rev(window, max_priority).collect();

        for pair in rev.windows(2) {
            prop_assert!((pair[0].span.end, pair[0].id) > (pair[1].span.end, pair[1].id));
        }
        let fwd: HashSet<u64> = index.scan_fwd(window, max_priority).map(|i| i.id).collect();
        let rev: HashSet<u64> = rev.iter().map(|i| i.id).collect();
        prop_assert_eq!(fwd, rev);
    }

    #[test]
    fn accumulated_run_is_contiguous_and_minimal(
        intervals in arb_intervals(),
        window in arb_window(),
        direction in direction(),
        min_duration in 0i64..400,
        fill_gaps in any::<bool>(),
    ) {
        let index = build(&intervals);
        let run = match (direction, fill_gaps) {
            (Direction::Forward, false) => accumulate_run(index.scan_fwd(window, 2.0), min_duration),
            (Direction::Reverse, false) => accumulate_run(index.scan_rev(window, 2.0), min_duration),
            (Direction::Forward, true) => {
                accumulate_run(GapFill::new(index.scan_fwd(window, f64::INFINITY), 2.0), min_duration)
            }
            (Direction::Reverse, true) => {
                accumulate_run(GapFill::new(index.scan_rev(window, f64::INFINITY), 2.0), min_duration)
            }
        };

        if let Some(run) = run {
            prop_assert!(!run.is_empty());
            for pair in run.windows(2) {
                prop_assert!(direction.touches(&pair[0], &pair[1]));
            }
            let total: Ms = run.iter().map(|i| i.duration_ms()).sum();
            prop_assert!(total >= min_duration);
            if run.len() > 1 {
                let last = run.last().unwrap().duration_ms();
                prop_assert!(total - last < min_duration);
            }
            prop_assert!(run.iter().all(|i| i.priority <= 2.0));
        }
    }

    #[test]
    fn gap_fill_covers_window_exactly_when_unfiltered(
        intervals in arb_intervals(),
        window in arb_window(),
        direction in direction(),
    ) {
        let index = build(&intervals);
        let filled: Vec<_> = match direction {
            Direction::Forward => GapFill::new(index.scan_fwd(window, f64::INFINITY), f64::INFINITY).collect(),
            Direction::Reverse => GapFill::new(index.scan_rev(window, f64::INFINITY), f64::INFINITY).collect(),
        };

        // Every millisecond of the window is covered by something in the filled stream.
        if !window.is_empty() {
            let mut covered = vec![false; window.duration_ms() as usize];
            for interval in &filled {
                let from = interval.span.start.max(window.start);
                let to = interval.span.end.min(window.end);
                for t in from..to {
                    covered[(t - window.start) as usize] = true;
                }
            }
            prop_assert!(covered.iter().all(|&c| c));
        } else {
            prop_assert!(filled.is_empty());
        }

        // Synthetic gaps never overlap stored intervals.
        for gap in filled.iter().filter(|i| i.synthetic) {
            prop_assert!(gap.is_free());
            prop_assert!(intervals.iter().all(|i| !i.span.overlaps(&gap.span)));
        }
    }
}
