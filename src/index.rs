//! Time to line lookups over a sorted slice of segments.

use crate::Segment;

/// Returns the line playing at `time_ms`.
///
/// Finds the rightmost line starting at or before `time_ms` and reports it
/// only if `time_ms` is still before its end. Gaps, times before the first
/// line and times past the last one all yield `None`.
pub fn find_active(segments: &[Segment], time_ms: u64) -> Option<usize> {
    let upper = segments.partition_point(|segment| segment.start_time_ms <= time_ms);
    let index = upper.checked_sub(1)?;

    (time_ms < segments[index].end_time_ms).then_some(index)
}

/// Best-guess line for `time_ms` when no line is playing.
///
/// Lines are scored by their distance to `time_ms`; lines that already ended
/// get their distance multiplied by `passed_discount`, so a line just heard
/// beats one that is equally far ahead. Ties go to the earlier line.
pub fn best_segment(segments: &[Segment], time_ms: u64, passed_discount: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;

    for (index, segment) in segments.iter().enumerate() {
        let score = distance_score(segment, time_ms, passed_discount);
        match best {
            Some((_, best_score)) if best_score <= score => {}
            _ => best = Some((index, score)),
        }
    }

    best.map(|(index, _)| index)
}

fn distance_score(segment: &Segment, time_ms: u64, passed_discount: f64) -> f64 {
    if segment.contains(time_ms) {
        0.0
    } else if segment.end_time_ms <= time_ms {
        (time_ms - segment.end_time_ms) as f64 * passed_discount
    } else {
        (segment.start_time_ms - time_ms) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::{best_segment, find_active};
    use crate::Segment;

    fn line(start: u64, end: u64) -> Segment {
        Segment {
            start_time_ms: start,
            end_time_ms: end,
            native: String::new(),
            transliteration: String::new(),
            translation: String::new(),
        }
    }

    fn sample() -> Vec<Segment> {
        vec![line(0, 2000), line(2500, 4000), line(4000, 6000)]
    }

    #[test]
    fn finds_line_inside_bounds() {
        let segments = sample();

        assert_eq!(find_active(&segments, 0), Some(0));
        assert_eq!(find_active(&segments, 1000), Some(0));
        assert_eq!(find_active(&segments, 1999), Some(0));
        assert_eq!(find_active(&segments, 3999), Some(1));
        assert_eq!(find_active(&segments, 5999), Some(2));
    }

    #[test]
    fn shared_boundary_goes_to_later_line() {
        assert_eq!(find_active(&sample(), 4000), Some(2));
    }

    #[test]
    fn gaps_and_edges_miss() {
        let segments = sample();

        assert_eq!(find_active(&segments, 2000), None);
        assert_eq!(find_active(&segments, 2200), None);
        assert_eq!(find_active(&segments, 6000), None);
        assert_eq!(find_active(&segments, 90_000), None);
        assert_eq!(find_active(&[], 10), None);
    }

    #[test]
    fn leading_gap_misses() {
        let segments = vec![line(500, 1000)];
        assert_eq!(find_active(&segments, 499), None);
    }

    #[test]
    fn every_time_inside_a_line_maps_back_to_it() {
        let segments = vec![line(100, 900), line(1200, 1300), line(1300, 5000), line(7000, 7001)];

        for (expected, segment) in segments.iter().enumerate() {
            for time in segment.start_time_ms..segment.end_time_ms {
                assert_eq!(find_active(&segments, time), Some(expected));
                assert_eq!(find_active(&segments, time), Some(expected));
            }
        }

        for gap in (0..100).chain(900..1200).chain(5000..7000) {
            assert_eq!(find_active(&segments, gap), None);
        }
    }

    #[test]
    fn best_segment_prefers_recently_passed_line() {
        let segments = sample();

        // 2300 is 300ms after line 0 (scored 150) and 200ms before line 1.
        assert_eq!(best_segment(&segments, 2300, 0.5), Some(0));
        // 2450 is 450ms after line 0 (scored 225) and 50ms before line 1.
        assert_eq!(best_segment(&segments, 2450, 0.5), Some(1));
    }

    #[test]
    fn best_segment_breaks_ties_towards_earlier_line() {
        let segments = vec![line(0, 1000), line(1400, 2000)];

        // 200ms past line 0 scores 100, 100ms before line 1 scores 100.
        assert_eq!(best_segment(&segments, 1200, 0.5), Some(0));
    }

    #[test]
    fn best_segment_on_empty_is_none() {
        assert_eq!(best_segment(&[], 500, 0.5), None);
    }
}
