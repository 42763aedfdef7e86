pub mod aggregate;
pub mod segmenter;
pub mod stats;

pub use aggregate::{aggregate_match_events, aggregate_segments, AggregatedStats, PlayerStats, SegmentStats, TeamStats};
pub use segmenter::{segment_count, segment_events_by_time, Segment, MAX_SEGMENTS};
pub use stats::{recent, MatchStatistics, SuccessRate, TeamRates};
