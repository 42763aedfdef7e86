//! Fixed-width time bucketing of match events for charting.
//!
//! Buckets partition `[0, match duration)` without gaps, so a chart gets a
//! continuous time axis even for intervals with no events.

use serde::Serialize;

use crate::model::MatchEvent;

/// Events whose timestamp falls in `[start_seconds, end_seconds)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment<'a> {
    pub index: usize,
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub events: Vec<&'a MatchEvent>,
}

impl Segment<'_> {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Most buckets a single layout may have.
pub const MAX_SEGMENTS: usize = 10_000;

/// Number of buckets `segment_events_by_time` lays out for these spans, or
/// `None` when either span is not a positive finite number, the spans do
/// not fit in seconds, or more than [`MAX_SEGMENTS`] buckets would be
/// needed.
pub fn segment_count(interval_minutes: f64, match_duration_minutes: f64) -> Option<usize> {
    if !is_positive_span(interval_minutes) || !is_positive_span(match_duration_minutes) {
        return None;
    }

    let interval_seconds = interval_minutes * 60.0;
    let match_duration_seconds = match_duration_minutes * 60.0;
    if !interval_seconds.is_finite() || !match_duration_seconds.is_finite() {
        return None;
    }

    let count = (match_duration_seconds / interval_seconds).ceil();
    if !(1.0..=MAX_SEGMENTS as f64).contains(&count) {
        return None;
    }
    Some(count as usize)
}

/// Split `events` into `ceil(duration / interval)` contiguous buckets.
///
/// Returns no buckets at all when `events` is empty or [`segment_count`]
/// rejects the spans. Negative timestamps are skipped, as are events past
/// the end of the match; an event exactly at the final whistle goes into
/// the last bucket. Input order is kept within each bucket.
pub fn segment_events_by_time(
    events: &[MatchEvent],
    interval_minutes: f64,
    match_duration_minutes: f64,
) -> Vec<Segment<'_>> {
    if events.is_empty() {
        return Vec::new();
    }
    let Some(segment_count) = segment_count(interval_minutes, match_duration_minutes) else {
        return Vec::new();
    };

    let interval_seconds = interval_minutes * 60.0;
    let match_duration_seconds = match_duration_minutes * 60.0;

    let mut segments: Vec<Segment<'_>> = (0..segment_count)
        .map(|index| {
            let start_seconds = index as f64 * interval_seconds;
            Segment {
                index,
                start_seconds,
                end_seconds: (start_seconds + interval_seconds).min(match_duration_seconds),
                events: Vec::new(),
            }
        })
        .collect();

    for event in events {
        let timestamp = event.timestamp;
        if !timestamp.is_finite() || timestamp < 0.0 {
            continue;
        }

        let index = (timestamp / interval_seconds).floor();
        if index < segment_count as f64 {
            segments[index as usize].events.push(event);
        } else if timestamp == match_duration_seconds && index == segment_count as f64 {
            segments[segment_count - 1].events.push(event);
        }
    }

    segments
}

fn is_positive_span(minutes: f64) -> bool {
    minutes.is_finite() && minutes > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Coordinates, EventType, Team};
    use serde_json::Map;

    fn event(id: &str, timestamp: f64) -> MatchEvent {
        MatchEvent {
            id: id.to_string(),
            match_id: "match1".to_string(),
            event_type: EventType::Pass,
            timestamp,
            team: Some(Team::Home),
            player_id: Some(1),
            coordinates: Coordinates::default(),
            created_by: "tracker".to_string(),
            created_at: None,
            event_data: Map::new(),
        }
    }

    fn ids<'a>(segment: &Segment<'a>) -> Vec<&'a str> {
        segment.events.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn empty_input_yields_no_segments() {
        assert!(segment_events_by_time(&[], 5.0, 90.0).is_empty());
    }

    #[test]
    fn non_positive_spans_yield_no_segments() {
        let events = vec![event("e1", 60.0)];
        assert!(segment_events_by_time(&events, 0.0, 90.0).is_empty());
        assert!(segment_events_by_time(&events, -5.0, 90.0).is_empty());
        assert!(segment_events_by_time(&events, 5.0, 0.0).is_empty());
        assert!(segment_events_by_time(&events, 5.0, -90.0).is_empty());
        assert!(segment_events_by_time(&events, f64::NAN, 90.0).is_empty());
        assert!(segment_events_by_time(&events, 5.0, f64::INFINITY).is_empty());
    }

    #[test]
    fn five_minute_buckets_over_ten_minutes() {
        let events = vec![
            event("e1", 50.0),
            event("e2", 299.0),
            event("e3", 300.0),
            event("e4", 599.0),
        ];

        let segments = segment_events_by_time(&events, 5.0, 10.0);
        assert_eq!(segments.len(), 2);
        assert_eq!(ids(&segments[0]), vec!["e1", "e2"]);
        assert_eq!(ids(&segments[1]), vec!["e3", "e4"]);
        assert_eq!(segments[1].start_seconds, 300.0);
        assert_eq!(segments[1].end_seconds, 600.0);
    }

    #[test]
    fn events_on_interval_boundaries_open_the_next_bucket() {
        let events = vec![event("e1", 0.0), event("e2", 300.0), event("e3", 600.0)];

        let segments = segment_events_by_time(&events, 5.0, 15.0);
        assert_eq!(segments.len(), 3);
        assert_eq!(ids(&segments[0]), vec!["e1"]);
        assert_eq!(ids(&segments[1]), vec!["e2"]);
        assert_eq!(ids(&segments[2]), vec!["e3"]);
    }

    #[test]
    fn event_at_final_whistle_lands_in_last_bucket() {
        let events = vec![event("e1", 599.0), event("e2", 600.0)];

        let segments = segment_events_by_time(&events, 5.0, 10.0);
        assert_eq!(segments.len(), 2);
        assert!(segments[0].is_empty());
        assert_eq!(ids(&segments[1]), vec!["e1", "e2"]);
    }

    #[test]
    fn final_whistle_with_partial_last_bucket() {
        // 10 minutes in 4 minute buckets: [0,240) [240,480) [480,600)
        let events = vec![event("end", 600.0)];

        let segments = segment_events_by_time(&events, 4.0, 10.0);
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[2].end_seconds, 600.0);
        // floor(600 / 240) = 2, an ordinary in-range index
        assert_eq!(ids(&segments[2]), vec!["end"]);
    }

    #[test]
    fn duration_shorter_than_interval_gives_one_bucket() {
        let events = vec![event("e1", 50.0), event("e2", 100.0)];

        let segments = segment_events_by_time(&events, 15.0, 10.0);
        assert_eq!(segments.len(), 1);
        assert_eq!(ids(&segments[0]), vec!["e1", "e2"]);
        assert_eq!(segments[0].end_seconds, 600.0);
    }

    #[test]
    fn events_after_the_match_are_dropped() {
        let events = vec![event("e1", 50.0), event("e2", 650.0)];

        let segments = segment_events_by_time(&events, 5.0, 10.0);
        assert_eq!(segments.len(), 2);
        assert_eq!(ids(&segments[0]), vec!["e1"]);
        assert!(segments[1].is_empty());
    }

    #[test]
    fn negative_and_non_finite_timestamps_are_skipped() {
        let events = vec![
            event("neg", -10.0),
            event("ok", 50.0),
            event("nan", f64::NAN),
            event("inf", f64::INFINITY),
        ];

        let segments = segment_events_by_time(&events, 5.0, 10.0);
        assert_eq!(segments.len(), 2);
        assert_eq!(ids(&segments[0]), vec!["ok"]);
        assert!(segments[1].is_empty());
    }

    #[test]
    fn full_match_in_quarter_hours() {
        let events: Vec<MatchEvent> = [10, 20, 40, 50, 70, 85]
            .iter()
            .enumerate()
            .map(|(i, minute)| event(&format!("e{}", i + 1), (*minute * 60) as f64))
            .collect();

        let segments = segment_events_by_time(&events, 15.0, 90.0);
        assert_eq!(segments.len(), 6);
        for (i, segment) in segments.iter().enumerate() {
            assert_eq!(segment.len(), 1);
            let expected = (events[i].timestamp / 900.0).floor() as usize;
            assert_eq!(segment.index, expected);
            assert_eq!(segment.events[0].id, events[i].id);
        }
    }

    #[test]
    fn unsorted_input_keeps_relative_order_per_bucket() {
        let events = vec![event("late", 200.0), event("early", 10.0), event("mid", 100.0)];

        let segments = segment_events_by_time(&events, 5.0, 5.0);
        assert_eq!(ids(&segments[0]), vec!["late", "early", "mid"]);
    }

    #[test]
    fn same_input_same_output() {
        let events = vec![event("e1", 30.0), event("e2", 400.0)];
        assert_eq!(
            segment_events_by_time(&events, 5.0, 10.0),
            segment_events_by_time(&events, 5.0, 10.0)
        );
    }

    #[test]
    fn spans_that_overflow_seconds_yield_no_segments() {
        let events = vec![event("e1", 30.0)];
        assert!(segment_events_by_time(&events, 1.0, 1e307).is_empty());
        assert!(segment_events_by_time(&events, 1e307, 1.0).is_empty());
        assert_eq!(segment_count(1.0, 1e307), None);
    }

    #[test]
    fn too_many_buckets_yield_no_segments() {
        let events = vec![event("e1", 30.0)];
        assert!(segment_events_by_time(&events, 1e-300, 1.0).is_empty());
        assert!(segment_events_by_time(&events, 0.001, 90.0).is_empty());
        assert_eq!(segment_count(0.001, 90.0), None);
    }

    #[test]
    fn bucket_cap_is_inclusive() {
        let duration = MAX_SEGMENTS as f64;
        assert_eq!(segment_count(1.0, duration), Some(MAX_SEGMENTS));
        assert_eq!(segment_count(1.0, duration + 1.0), None);
        assert_eq!(segment_count(15.0, 90.0), Some(6));
    }

    #[test]
    fn vanishing_ratio_yields_no_segments() {
        let events = vec![event("e1", 0.0)];
        assert_eq!(segment_count(1e300, 1e-300), None);
        assert!(segment_events_by_time(&events, 1e300, 1e-300).is_empty());
    }
}
